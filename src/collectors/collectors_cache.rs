use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};

use prometheus::core::Collector;
use prometheus::{Histogram, HistogramOpts, IntCounter, IntGauge, Opts, Registry};

use crate::MyHttpClientError;

use super::{CollectorConfig, HistogramCollectorConfig};

lazy_static::lazy_static! {
    pub static ref DEFAULT_REGISTRY: Arc<Registry> = Arc::new(Registry::new());

    static ref HISTOGRAMS: CollectorsCache<Histogram> = CollectorsCache::new();
    static ref IN_PROGRESS_GAUGES: CollectorsCache<IntGauge> = CollectorsCache::new();
    static ref COUNTERS: CollectorsCache<IntCounter> = CollectorsCache::new();
}

type SubCache<TCollector> = Arc<Mutex<HashMap<String, TCollector>>>;

// Registries are keyed by allocation identity and held weakly. An entry
// disappears once nobody else holds a strong reference to the registry.
pub struct CollectorsCache<TCollector: Clone> {
    registries: Mutex<Vec<(Weak<Registry>, SubCache<TCollector>)>>,
}

impl<TCollector: Clone> CollectorsCache<TCollector> {
    pub fn new() -> Self {
        Self {
            registries: Mutex::new(Vec::new()),
        }
    }

    fn resolve_sub_cache(&self, registry: &Arc<Registry>) -> SubCache<TCollector> {
        let mut registries = self.registries.lock().unwrap();

        registries.retain(|(registry, _)| registry.strong_count() > 0);

        for (itm, sub_cache) in registries.iter() {
            if std::ptr::eq(itm.as_ptr(), Arc::as_ptr(registry)) {
                return sub_cache.clone();
            }
        }

        let sub_cache: SubCache<TCollector> = Arc::new(Mutex::new(HashMap::new()));
        registries.push((Arc::downgrade(registry), sub_cache.clone()));
        sub_cache
    }

    // The factory runs at most once per (registry, name) pair. The sub cache
    // lock is held across the factory call, so concurrent first accesses for
    // the same name can not both register.
    pub fn get_or_create(
        &self,
        registry: &Arc<Registry>,
        name: &str,
        factory: impl FnOnce() -> Result<TCollector, prometheus::Error>,
    ) -> Result<TCollector, MyHttpClientError> {
        let sub_cache = self.resolve_sub_cache(registry);

        let mut collectors = sub_cache.lock().unwrap();

        if let Some(existing) = collectors.get(name) {
            return Ok(existing.clone());
        }

        let created = factory()
            .map_err(|err| MyHttpClientError::CollectorRegistration(err.to_string()))?;

        collectors.insert(name.to_string(), created.clone());

        tracing::debug!(collector = name, "Registered metrics collector");

        Ok(created)
    }

    #[cfg(test)]
    pub fn registries_count(&self) -> usize {
        let mut registries = self.registries.lock().unwrap();
        registries.retain(|(registry, _)| registry.strong_count() > 0);
        registries.len()
    }
}

impl<TCollector: Collector + Clone + 'static> CollectorsCache<TCollector> {
    fn remove_registry(&self, registry: &Arc<Registry>) {
        let removed = {
            let mut registries = self.registries.lock().unwrap();

            let mut removed = None;

            registries.retain(|(itm, sub_cache)| {
                if std::ptr::eq(itm.as_ptr(), Arc::as_ptr(registry)) {
                    removed = Some(sub_cache.clone());
                    return false;
                }

                itm.strong_count() > 0
            });

            removed
        };

        let Some(removed) = removed else {
            return;
        };

        let collectors = removed.lock().unwrap();

        for collector in collectors.values() {
            let _ = registry.unregister(Box::new(collector.clone()));
        }
    }
}

pub fn get_or_create_histogram(
    registry: &Arc<Registry>,
    config: &HistogramCollectorConfig,
) -> Result<Histogram, MyHttpClientError> {
    HISTOGRAMS.get_or_create(registry, config.name.as_str(), || {
        let mut opts =
            HistogramOpts::new(config.name.clone(), config.name.clone()).buckets(config.buckets.clone());

        for (key, value) in config.labels.iter() {
            opts = opts.const_label(key.clone(), value.clone());
        }

        let histogram = Histogram::with_opts(opts)?;
        registry.register(Box::new(histogram.clone()))?;
        Ok(histogram)
    })
}

pub fn get_or_create_in_progress_gauge(
    registry: &Arc<Registry>,
    config: &CollectorConfig,
) -> Result<IntGauge, MyHttpClientError> {
    IN_PROGRESS_GAUGES.get_or_create(registry, config.name.as_str(), || {
        let gauge = IntGauge::with_opts(build_opts(config))?;
        registry.register(Box::new(gauge.clone()))?;
        Ok(gauge)
    })
}

pub fn get_or_create_counter(
    registry: &Arc<Registry>,
    config: &CollectorConfig,
) -> Result<IntCounter, MyHttpClientError> {
    COUNTERS.get_or_create(registry, config.name.as_str(), || {
        let counter = IntCounter::with_opts(build_opts(config))?;
        registry.register(Box::new(counter.clone()))?;
        Ok(counter)
    })
}

fn build_opts(config: &CollectorConfig) -> Opts {
    let mut opts = Opts::new(config.name.clone(), config.name.clone());

    for (key, value) in config.labels.iter() {
        opts = opts.const_label(key.clone(), value.clone());
    }

    opts
}

// Unregisters every collector created through this module from the registry
// and purges the caches for it. A backend built afterwards against the same
// registry registers its collectors from scratch.
//
// Collectors registered with the registry directly, bypassing this module,
// stay untouched.
pub fn clear(registry: &Arc<Registry>) {
    HISTOGRAMS.remove_registry(registry);
    IN_PROGRESS_GAUGES.remove_registry(registry);
    COUNTERS.remove_registry(registry);

    tracing::debug!("Cleared metrics collectors for registry");
}
