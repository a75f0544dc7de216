//! Pool configuration options

use crate::errors::{PoolError, PoolResult};

/// Multiplier applied to the available hardware parallelism when no explicit
/// retention limit is configured.
pub const DEFAULT_RETAINED_PER_CPU: usize = 2;

/// Configuration for object pool behavior
///
/// # Examples
///
/// ```
/// use atomic_objectpool::PoolConfiguration;
///
/// let config = PoolConfiguration::new()
///     .with_maximum_retained(16);
///
/// assert_eq!(config.maximum_retained, 16);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PoolConfiguration {
    /// Maximum number of idle instances the pool keeps, including the fast slot
    pub maximum_retained: usize,
}

impl Default for PoolConfiguration {
    fn default() -> Self {
        Self {
            maximum_retained: default_maximum_retained(),
        }
    }
}

impl PoolConfiguration {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of retained instances
    ///
    /// # Examples
    ///
    /// ```
    /// use atomic_objectpool::PoolConfiguration;
    ///
    /// let config = PoolConfiguration::new().with_maximum_retained(3);
    /// assert_eq!(config.maximum_retained, 3);
    /// ```
    pub fn with_maximum_retained(mut self, maximum_retained: usize) -> Self {
        self.maximum_retained = maximum_retained;
        self
    }

    /// Check that the configuration describes a usable pool
    pub fn validate(&self) -> PoolResult<()> {
        if self.maximum_retained == 0 {
            return Err(PoolError::InvalidMaximumRetained(self.maximum_retained));
        }
        Ok(())
    }
}

fn default_maximum_retained() -> usize {
    let cpus = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    cpus.saturating_mul(DEFAULT_RETAINED_PER_CPU)
}
