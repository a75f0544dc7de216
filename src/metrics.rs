//! Metrics collection and export for object pools

use std::collections::HashMap;
#[cfg(feature = "prometheus")]
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Point-in-time counters for a pool
///
/// # Examples
///
/// ```
/// use atomic_objectpool::{DefaultObjectPool, DefaultPooledObjectPolicy};
///
/// let pool = DefaultObjectPool::new(DefaultPooledObjectPolicy::<Vec<u8>>::new());
///
/// let buf = pool.acquire();
/// pool.release(buf);
/// let _again = pool.acquire();
///
/// let metrics = pool.get_metrics();
/// assert_eq!(metrics.total_created, 1);
/// assert_eq!(metrics.total_hits, 1);
/// assert_eq!(metrics.total_returned, 1);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct PoolMetrics {
    /// Instances built by the policy because the pool had nothing to hand out
    pub total_created: usize,

    /// Acquisitions served from a slot
    pub total_hits: usize,

    /// Instances stored back into a slot
    pub total_returned: usize,

    /// Instances the policy refused on return
    pub total_rejected: usize,

    /// Instances dropped because every slot was occupied
    pub total_dropped: usize,

    /// Occupied slots when the snapshot was taken
    pub retained_objects: usize,

    /// Configured retention limit
    pub maximum_retained: usize,
}

impl PoolMetrics {
    /// Fraction of acquisitions served without calling `create` (0.0 to 1.0)
    pub fn hit_rate(&self) -> f64 {
        let total = self.total_hits + self.total_created;
        if total == 0 {
            0.0
        } else {
            self.total_hits as f64 / total as f64
        }
    }

    /// Export metrics as a HashMap
    pub fn export(&self) -> HashMap<String, String> {
        let mut metrics = HashMap::new();
        metrics.insert("total_created".to_string(), self.total_created.to_string());
        metrics.insert("total_hits".to_string(), self.total_hits.to_string());
        metrics.insert("total_returned".to_string(), self.total_returned.to_string());
        metrics.insert("total_rejected".to_string(), self.total_rejected.to_string());
        metrics.insert("total_dropped".to_string(), self.total_dropped.to_string());
        metrics.insert("retained_objects".to_string(), self.retained_objects.to_string());
        metrics.insert("maximum_retained".to_string(), self.maximum_retained.to_string());
        metrics.insert("hit_rate".to_string(), format!("{:.2}", self.hit_rate()));
        metrics
    }
}

/// Metrics exporter for Prometheus
pub struct MetricsExporter;

impl MetricsExporter {
    /// Export metrics in Prometheus exposition format
    ///
    /// # Examples
    ///
    /// ```
    /// use atomic_objectpool::{DefaultObjectPool, DefaultPooledObjectPolicy};
    /// use std::collections::HashMap;
    ///
    /// let pool = DefaultObjectPool::new(DefaultPooledObjectPolicy::<String>::new());
    ///
    /// let mut tags = HashMap::new();
    /// tags.insert("service".to_string(), "api".to_string());
    ///
    /// let output = pool.export_metrics_prometheus("my_pool", Some(&tags));
    /// assert!(output.contains("objectpool_objects_retained"));
    /// assert!(output.contains("service=\"api\""));
    /// ```
    pub fn export_prometheus(
        metrics: &PoolMetrics,
        pool_name: &str,
        tags: Option<&HashMap<String, String>>,
    ) -> String {
        let mut output = String::new();
        let labels = Self::format_labels(pool_name, tags);

        // Gauge metrics
        output.push_str("# HELP objectpool_objects_retained Instances currently held by the pool\n");
        output.push_str("# TYPE objectpool_objects_retained gauge\n");
        output.push_str(&format!("objectpool_objects_retained{{{}}} {}\n", labels, metrics.retained_objects));

        output.push_str("# HELP objectpool_maximum_retained Configured retention limit\n");
        output.push_str("# TYPE objectpool_maximum_retained gauge\n");
        output.push_str(&format!("objectpool_maximum_retained{{{}}} {}\n", labels, metrics.maximum_retained));

        output.push_str("# HELP objectpool_hit_rate Share of acquisitions served from the pool\n");
        output.push_str("# TYPE objectpool_hit_rate gauge\n");
        output.push_str(&format!("objectpool_hit_rate{{{}}} {:.2}\n", labels, metrics.hit_rate()));

        // Counter metrics
        output.push_str("# HELP objectpool_objects_created_total Instances built by the policy\n");
        output.push_str("# TYPE objectpool_objects_created_total counter\n");
        output.push_str(&format!("objectpool_objects_created_total{{{}}} {}\n", labels, metrics.total_created));

        output.push_str("# HELP objectpool_hits_total Acquisitions served from a slot\n");
        output.push_str("# TYPE objectpool_hits_total counter\n");
        output.push_str(&format!("objectpool_hits_total{{{}}} {}\n", labels, metrics.total_hits));

        output.push_str("# HELP objectpool_objects_returned_total Instances stored back into the pool\n");
        output.push_str("# TYPE objectpool_objects_returned_total counter\n");
        output.push_str(&format!("objectpool_objects_returned_total{{{}}} {}\n", labels, metrics.total_returned));

        output.push_str("# HELP objectpool_objects_rejected_total Instances refused by the policy\n");
        output.push_str("# TYPE objectpool_objects_rejected_total counter\n");
        output.push_str(&format!("objectpool_objects_rejected_total{{{}}} {}\n", labels, metrics.total_rejected));

        output.push_str("# HELP objectpool_objects_dropped_total Instances dropped with every slot occupied\n");
        output.push_str("# TYPE objectpool_objects_dropped_total counter\n");
        output.push_str(&format!("objectpool_objects_dropped_total{{{}}} {}\n", labels, metrics.total_dropped));

        output
    }

    fn format_labels(pool_name: &str, tags: Option<&HashMap<String, String>>) -> String {
        let mut labels = vec![format!("pool=\"{}\"", pool_name)];

        if let Some(tags) = tags {
            let mut sorted: Vec<_> = tags.iter().collect();
            sorted.sort();
            for (key, value) in sorted {
                labels.push(format!("{}=\"{}\"", key, value));
            }
        }

        labels.join(",")
    }
}

/// Internal metrics tracker
#[derive(Debug, Default)]
pub(crate) struct MetricsTracker {
    pub total_created: AtomicUsize,
    pub total_hits: AtomicUsize,
    pub total_returned: AtomicUsize,
    pub total_rejected: AtomicUsize,
    pub total_dropped: AtomicUsize,
    /// Instances stored by warm-up rather than by a release
    pub total_prefilled: AtomicUsize,
}

impl MetricsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn record(counter: &AtomicUsize) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Slots filled minus slots emptied. Exact once the pool is quiescent,
    /// approximate while stores and takes are in flight.
    pub fn retained_estimate(&self) -> usize {
        let stored = self.total_returned.load(Ordering::Relaxed)
            + self.total_prefilled.load(Ordering::Relaxed);
        stored.saturating_sub(self.total_hits.load(Ordering::Relaxed))
    }

    pub fn get_metrics(&self, retained: usize, maximum_retained: usize) -> PoolMetrics {
        PoolMetrics {
            total_created: self.total_created.load(Ordering::Relaxed),
            total_hits: self.total_hits.load(Ordering::Relaxed),
            total_returned: self.total_returned.load(Ordering::Relaxed),
            total_rejected: self.total_rejected.load(Ordering::Relaxed),
            total_dropped: self.total_dropped.load(Ordering::Relaxed),
            retained_objects: retained,
            maximum_retained,
        }
    }
}

#[cfg(feature = "prometheus")]
#[derive(Clone, Copy)]
enum Kind {
    Counter,
    Gauge,
}

#[cfg(feature = "prometheus")]
const FAMILIES: [(&str, &str, Kind); 7] = [
    ("objectpool_objects_retained", "Instances currently held by the pool", Kind::Gauge),
    ("objectpool_maximum_retained", "Configured retention limit", Kind::Gauge),
    ("objectpool_objects_created_total", "Instances built by the policy", Kind::Counter),
    ("objectpool_hits_total", "Acquisitions served from a slot", Kind::Counter),
    ("objectpool_objects_returned_total", "Instances stored back into the pool", Kind::Counter),
    ("objectpool_objects_rejected_total", "Instances refused by the policy", Kind::Counter),
    ("objectpool_objects_dropped_total", "Instances dropped with every slot occupied", Kind::Counter),
];

/// Prometheus collector that reads a pool's counters at scrape time
///
/// Obtained from `DefaultObjectPool::collector` and registered once; every
/// `Registry::gather` afterwards reports the live values.
///
/// # Examples
///
/// ```
/// use atomic_objectpool::{DefaultObjectPool, DefaultPooledObjectPolicy};
///
/// let pool = DefaultObjectPool::new(DefaultPooledObjectPolicy::<Vec<u8>>::new());
/// let registry = prometheus::Registry::new();
/// pool.register_metrics("buffers", &registry).unwrap();
///
/// let buf = pool.acquire();
/// pool.release(buf);
///
/// let families = registry.gather();
/// let created = families
///     .iter()
///     .find(|f| f.get_name() == "objectpool_objects_created_total")
///     .unwrap();
/// assert_eq!(created.get_metric()[0].get_counter().get_value(), 1.0);
/// ```
#[cfg(feature = "prometheus")]
pub struct PoolCollector {
    tracker: Arc<MetricsTracker>,
    maximum_retained: usize,
    pool_name: String,
    descs: Vec<prometheus::core::Desc>,
}

#[cfg(feature = "prometheus")]
impl PoolCollector {
    pub(crate) fn new(
        tracker: Arc<MetricsTracker>,
        maximum_retained: usize,
        pool_name: &str,
    ) -> prometheus::Result<Self> {
        use prometheus::core::Collector;

        let mut descs = Vec::with_capacity(FAMILIES.len());
        for (name, help, kind) in FAMILIES {
            let opts = Self::opts(pool_name, name, help);
            match kind {
                Kind::Counter => {
                    let counter = prometheus::IntCounter::with_opts(opts)?;
                    descs.extend(counter.desc().into_iter().cloned());
                }
                Kind::Gauge => {
                    let gauge = prometheus::IntGauge::with_opts(opts)?;
                    descs.extend(gauge.desc().into_iter().cloned());
                }
            }
        }

        Ok(Self {
            tracker,
            maximum_retained,
            pool_name: pool_name.to_string(),
            descs,
        })
    }

    fn opts(pool_name: &str, name: &str, help: &str) -> prometheus::Opts {
        prometheus::Opts::new(name, help).const_label("pool", pool_name)
    }

    fn values(&self) -> [usize; 7] {
        let metrics = self
            .tracker
            .get_metrics(self.tracker.retained_estimate(), self.maximum_retained);
        [
            metrics.retained_objects,
            metrics.maximum_retained,
            metrics.total_created,
            metrics.total_hits,
            metrics.total_returned,
            metrics.total_rejected,
            metrics.total_dropped,
        ]
    }
}

#[cfg(feature = "prometheus")]
impl prometheus::core::Collector for PoolCollector {
    fn desc(&self) -> Vec<&prometheus::core::Desc> {
        self.descs.iter().collect()
    }

    fn collect(&self) -> Vec<prometheus::proto::MetricFamily> {
        let mut families = Vec::with_capacity(FAMILIES.len());

        for ((name, help, kind), value) in FAMILIES.into_iter().zip(self.values()) {
            let opts = Self::opts(&self.pool_name, name, help);
            // Options were validated in `new`, so construction cannot fail here.
            match kind {
                Kind::Counter => {
                    if let Ok(counter) = prometheus::IntCounter::with_opts(opts) {
                        counter.inc_by(value as u64);
                        families.extend(counter.collect());
                    }
                }
                Kind::Gauge => {
                    if let Ok(gauge) = prometheus::IntGauge::with_opts(opts) {
                        gauge.set(i64::try_from(value).unwrap_or(i64::MAX));
                        families.extend(gauge.collect());
                    }
                }
            }
        }

        families
    }
}
