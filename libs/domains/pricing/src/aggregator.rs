//! Live fan-out across provider adapters

use futures::future::join_all;
use observability::PricingMetrics;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::models::{CloudPlan, PlanQuery};
use crate::providers::{FetchFilters, PlanProvider, ProviderRegistry};

/// Queries every requested adapter concurrently and merges their plans.
#[derive(Clone)]
pub struct Aggregator {
    registry: Arc<ProviderRegistry>,
    timeout: Duration,
}

impl Aggregator {
    pub fn new(registry: ProviderRegistry, timeout: Duration) -> Self {
        Self {
            registry: Arc::new(registry),
            timeout,
        }
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Plans from the requested providers (all registered ones by default),
    /// concatenated in registry order, then range-filtered.
    ///
    /// Never fails: a provider that errors or misses its deadline simply
    /// contributes nothing.
    pub async fn aggregate(&self, query: &PlanQuery) -> Vec<CloudPlan> {
        let start = Instant::now();
        let filters = FetchFilters::from(query);
        let adapters = self.registry.select(&query.providers);

        let fetches = adapters
            .iter()
            .map(|adapter| self.fetch_with_deadline(*adapter, &filters));
        let plans: Vec<CloudPlan> = join_all(fetches).await.into_iter().flatten().collect();

        let plans = apply_range_filters(plans, query);
        PricingMetrics::record_aggregation(adapters.len(), plans.len(), start.elapsed().as_secs_f64());
        debug!(providers = adapters.len(), plans = plans.len(), "Aggregated live plans");
        plans
    }

    async fn fetch_with_deadline(
        &self,
        adapter: &dyn PlanProvider,
        filters: &FetchFilters,
    ) -> Vec<CloudPlan> {
        match tokio::time::timeout(self.timeout, adapter.plans(filters)).await {
            Ok(plans) => plans,
            Err(_) => {
                let provider = adapter.provider();
                warn!(
                    provider = %provider,
                    timeout_secs = self.timeout.as_secs(),
                    "Provider fetch timed out"
                );
                PricingMetrics::record_provider_failure(&provider.to_string(), "timeout");
                Vec::new()
            }
        }
    }
}

/// Inclusive cpu and ram bounds; unset bounds are ignored.
pub fn apply_range_filters(plans: Vec<CloudPlan>, query: &PlanQuery) -> Vec<CloudPlan> {
    plans
        .into_iter()
        .filter(|p| query.min_cpu.is_none_or(|min| p.cpu >= min))
        .filter(|p| query.max_cpu.is_none_or(|max| p.cpu <= max))
        .filter(|p| query.min_ram_gb.is_none_or(|min| p.ram_gb >= min))
        .filter(|p| query.max_ram_gb.is_none_or(|max| p.ram_gb <= max))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CloudProvider;
    use crate::providers::{ProviderError, ProviderResult};
    use async_trait::async_trait;

    struct FakeProvider {
        provider: CloudProvider,
        plans: Vec<CloudPlan>,
        fail: bool,
        delay: Duration,
    }

    impl FakeProvider {
        fn ok(provider: CloudProvider, plans: Vec<CloudPlan>) -> Self {
            Self {
                provider,
                plans,
                fail: false,
                delay: Duration::ZERO,
            }
        }

        fn failing(provider: CloudProvider) -> Self {
            Self {
                fail: true,
                ..Self::ok(provider, Vec::new())
            }
        }
    }

    #[async_trait]
    impl PlanProvider for FakeProvider {
        fn provider(&self) -> CloudProvider {
            self.provider
        }

        fn default_regions(&self) -> Vec<String> {
            Vec::new()
        }

        async fn fetch_plans(&self, _filters: &FetchFilters) -> ProviderResult<Vec<CloudPlan>> {
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if self.fail {
                return Err(ProviderError::Parse("unexpected payload".into()));
            }
            Ok(self.plans.clone())
        }
    }

    fn plan(provider: CloudProvider, name: &str, cpu: i32, ram_gb: f64) -> CloudPlan {
        CloudPlan::vm(provider, name, "r1", cpu, ram_gb, 0.01, 7.3)
    }

    fn aggregator(adapters: Vec<FakeProvider>, timeout: Duration) -> Aggregator {
        let mut registry = ProviderRegistry::new();
        for adapter in adapters {
            registry.register(Box::new(adapter));
        }
        Aggregator::new(registry, timeout)
    }

    #[tokio::test]
    async fn test_concatenates_in_registry_order() {
        let aggregator = aggregator(
            vec![
                FakeProvider::ok(CloudProvider::Hetzner, vec![plan(CloudProvider::Hetzner, "cx22", 2, 4.0)]),
                FakeProvider::failing(CloudProvider::Aws),
                FakeProvider::ok(
                    CloudProvider::Scaleway,
                    vec![
                        plan(CloudProvider::Scaleway, "DEV1-S", 2, 2.0),
                        plan(CloudProvider::Scaleway, "DEV1-M", 3, 4.0),
                    ],
                ),
            ],
            Duration::from_secs(5),
        );

        let names: Vec<_> = aggregator
            .aggregate(&PlanQuery::default())
            .await
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["cx22", "DEV1-S", "DEV1-M"]);
    }

    #[tokio::test]
    async fn test_all_adapters_failing_yields_empty() {
        let aggregator = aggregator(
            vec![
                FakeProvider::failing(CloudProvider::Aws),
                FakeProvider::failing(CloudProvider::Azure),
            ],
            Duration::from_secs(5),
        );
        assert!(aggregator.aggregate(&PlanQuery::default()).await.is_empty());
    }

    #[tokio::test]
    async fn test_only_requested_providers_are_queried() {
        let aggregator = aggregator(
            vec![
                FakeProvider::ok(CloudProvider::Hetzner, vec![plan(CloudProvider::Hetzner, "cx22", 2, 4.0)]),
                FakeProvider::ok(CloudProvider::Aws, vec![plan(CloudProvider::Aws, "t3.large", 2, 8.0)]),
            ],
            Duration::from_secs(5),
        );

        let plans = aggregator
            .aggregate(&PlanQuery::for_providers(vec![CloudProvider::Aws]))
            .await;
        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].provider, CloudProvider::Aws);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_adapter_times_out_without_blocking_others() {
        let slow = FakeProvider {
            delay: Duration::from_secs(120),
            ..FakeProvider::ok(CloudProvider::Azure, vec![plan(CloudProvider::Azure, "Standard_B2s", 2, 8.0)])
        };
        let aggregator = aggregator(
            vec![
                FakeProvider::ok(CloudProvider::Hetzner, vec![plan(CloudProvider::Hetzner, "cx22", 2, 4.0)]),
                slow,
            ],
            Duration::from_secs(30),
        );

        let plans = aggregator.aggregate(&PlanQuery::default()).await;
        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].provider, CloudProvider::Hetzner);
    }

    #[test]
    fn test_range_filters_are_inclusive_and_idempotent() {
        let plans = vec![
            plan(CloudProvider::Aws, "small", 1, 2.0),
            plan(CloudProvider::Aws, "medium", 2, 4.0),
            plan(CloudProvider::Aws, "large", 4, 16.0),
        ];
        let query = PlanQuery {
            min_cpu: Some(2),
            max_cpu: Some(4),
            min_ram_gb: Some(4.0),
            max_ram_gb: Some(8.0),
            ..PlanQuery::default()
        };

        let once = apply_range_filters(plans, &query);
        assert_eq!(once.len(), 1);
        assert_eq!(once[0].name, "medium");

        let twice = apply_range_filters(once.clone(), &query);
        assert_eq!(twice, once);
    }

    #[test]
    fn test_range_filters_without_bounds_keep_everything() {
        let plans = vec![plan(CloudProvider::Aws, "small", 1, 2.0)];
        assert_eq!(apply_range_filters(plans.clone(), &PlanQuery::default()), plans);
    }
}
