use observability::{PricingMetrics, PricingTimer};
use serde::Serialize;
use std::sync::Arc;

use crate::aggregator::Aggregator;
use crate::config::PlanSource;
use crate::error::PricingResult;
use crate::models::{CloudPlan, CloudProvider, PlanQuery, PlanStats, PricingResponse};
use crate::repository::PlanRepository;
use crate::selector::PlanSelector;

/// A pricing lookup: candidate filter plus optional selector guidance.
#[derive(Debug, Clone, Default)]
pub struct PricingRequest {
    pub query: PlanQuery,
    pub custom_prompt: Option<String>,
}

/// Per-provider readiness, as reported by `pricing-sync status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderStatus {
    pub provider: CloudProvider,
    pub configured: bool,
    pub stored_plans: u64,
}

/// Service layer for pricing lookups
pub struct PricingService<R: PlanRepository> {
    aggregator: Aggregator,
    repository: Arc<R>,
    selector: Arc<dyn PlanSelector>,
    source: PlanSource,
}

impl<R: PlanRepository> PricingService<R> {
    pub fn new(
        aggregator: Aggregator,
        repository: Arc<R>,
        selector: Arc<dyn PlanSelector>,
        source: PlanSource,
    ) -> Self {
        Self {
            aggregator,
            repository,
            selector,
            source,
        }
    }

    pub fn source(&self) -> PlanSource {
        self.source
    }

    /// Candidates from the configured source, split into recommendations
    /// and the remaining plans.
    pub async fn get_pricing(&self, request: PricingRequest) -> PricingResult<PricingResponse> {
        let mut timer = PricingTimer::new("get_pricing");

        let candidates = match self.source {
            PlanSource::Database => self.repository.list(request.query).await?,
            PlanSource::Live => self.aggregator.aggregate(&request.query).await,
        };
        PricingMetrics::record_request(&self.source.to_string(), candidates.len());

        let recommended = self
            .selector
            .select(&candidates, request.custom_prompt.as_deref())
            .await;
        PricingMetrics::record_selection(&self.selector.policy().to_string(), recommended.len());

        let plans = candidates
            .into_iter()
            .filter(|plan| !recommended.iter().any(|r| r.same_offering(plan)))
            .collect();

        let duration_ms = timer.stop();
        tracing::debug!(
            recommended = recommended.len(),
            duration_ms = duration_ms,
            "Served pricing request"
        );

        Ok(PricingResponse {
            llm_recomendation: recommended,
            plans,
        })
    }

    /// Live plans straight from the providers, never stored.
    pub async fn live_plans(&self, query: &PlanQuery) -> Vec<CloudPlan> {
        self.aggregator.aggregate(query).await
    }

    pub async fn stats(&self) -> PricingResult<PlanStats> {
        self.repository.stats().await
    }

    /// Configured flag and stored count for every registered provider.
    pub async fn provider_status(&self) -> PricingResult<Vec<ProviderStatus>> {
        let stats = self.repository.stats().await?;

        Ok(self
            .aggregator
            .registry()
            .all()
            .map(|adapter| {
                let provider = adapter.provider();
                ProviderStatus {
                    provider,
                    configured: adapter.is_configured(),
                    stored_plans: stats
                        .by_provider
                        .get(&provider.to_string())
                        .copied()
                        .unwrap_or(0),
                }
            })
            .collect())
    }
}
