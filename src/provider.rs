//! Factories that build pools sharing one configuration

use crate::config::PoolConfiguration;
use crate::errors::PoolResult;
use crate::policy::{PooledObjectPolicy, StringPooledObjectPolicy};
use crate::pool::DefaultObjectPool;

/// Something that can build object pools for any policy.
pub trait ObjectPoolProvider {
    /// Build a pool driven by `policy`
    fn create<T, P>(&self, policy: P) -> DefaultObjectPool<T, P>
    where
        P: PooledObjectPolicy<T>;

    /// Build a pool of reusable `String` buffers
    fn create_string_pool(&self) -> DefaultObjectPool<String, StringPooledObjectPolicy> {
        self.create(StringPooledObjectPolicy::default())
    }
}

/// Provider that hands every pool the same retention limit
///
/// # Examples
///
/// ```
/// use atomic_objectpool::{DefaultObjectPoolProvider, ObjectPoolProvider, PoolConfiguration};
///
/// let provider = DefaultObjectPoolProvider::new(
///     PoolConfiguration::new().with_maximum_retained(8),
/// ).unwrap();
///
/// let strings = provider.create_string_pool();
/// assert_eq!(strings.maximum_retained(), 8);
/// ```
#[derive(Debug, Clone, Default)]
pub struct DefaultObjectPoolProvider {
    config: PoolConfiguration,
}

impl DefaultObjectPoolProvider {
    /// Create a provider, rejecting unusable configurations up front
    pub fn new(config: PoolConfiguration) -> PoolResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Configuration applied to every pool this provider creates
    pub fn configuration(&self) -> &PoolConfiguration {
        &self.config
    }
}

impl ObjectPoolProvider for DefaultObjectPoolProvider {
    fn create<T, P>(&self, policy: P) -> DefaultObjectPool<T, P>
    where
        P: PooledObjectPolicy<T>,
    {
        DefaultObjectPool::from_validated(policy, self.config.maximum_retained)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::PoolError;
    use crate::policy::DefaultPooledObjectPolicy;

    #[test]
    fn test_provider_rejects_zero() {
        let result = DefaultObjectPoolProvider::new(PoolConfiguration::new().with_maximum_retained(0));
        assert_eq!(result.unwrap_err(), PoolError::InvalidMaximumRetained(0));
    }

    #[test]
    fn test_provider_applies_limit() {
        let provider =
            DefaultObjectPoolProvider::new(PoolConfiguration::new().with_maximum_retained(2))
                .unwrap();
        let pool = provider.create(DefaultPooledObjectPolicy::<Vec<u8>>::new());
        assert_eq!(pool.maximum_retained(), 2);

        let items: Vec<_> = (0..3).map(|_| pool.acquire()).collect();
        for item in items {
            pool.release(item);
        }
        assert_eq!(pool.retained_count(), 2);
    }

    #[test]
    fn test_default_provider() {
        let provider = DefaultObjectPoolProvider::default();
        let pool = provider.create_string_pool();
        assert_eq!(
            pool.maximum_retained(),
            PoolConfiguration::default().maximum_retained
        );

        let mut s = pool.acquire();
        s.push_str("abc");
        pool.release(s);
        assert!(pool.acquire().is_empty());
    }
}
