//! Fetch live plans and persist them

use observability::PricingMetrics;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use crate::aggregator::Aggregator;
use crate::error::PricingResult;
use crate::models::{CloudProvider, OperatingSystem, PlanQuery};
use crate::repository::PlanRepository;

#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    /// Empty means every registered provider
    pub providers: Vec<CloudProvider>,
    /// Delete stored plans before inserting
    pub clear: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub fetched: usize,
    pub inserted: usize,
    pub cleared: u64,
    pub batches: usize,
    pub duration_ms: u64,
}

pub struct PlanSync<R: PlanRepository> {
    aggregator: Aggregator,
    repository: Arc<R>,
}

impl<R: PlanRepository> PlanSync<R> {
    pub fn new(aggregator: Aggregator, repository: Arc<R>) -> Self {
        Self {
            aggregator,
            repository,
        }
    }

    /// One sync pass over every operating system the providers price.
    ///
    /// Plans are fetched before anything is touched, so a run where every
    /// provider fails leaves the stored plans as they were, even with
    /// `clear` set.
    pub async fn run(&self, options: &SyncOptions) -> PricingResult<SyncReport> {
        let start = Instant::now();

        info!(providers = ?options.providers, clear = options.clear, "Fetching pricing data from providers");
        let query = PlanQuery {
            operating_system: Some(OperatingSystem::All),
            ..PlanQuery::for_providers(options.providers.clone())
        };
        let plans = self.aggregator.aggregate(&query).await;
        let fetched = plans.len();
        info!(fetched = fetched, "Found {fetched} plans");

        if plans.is_empty() {
            warn!("No plans to sync");
            PricingMetrics::record_sync_skipped();
            return Ok(SyncReport {
                duration_ms: start.elapsed().as_millis() as u64,
                ..SyncReport::default()
            });
        }

        let outcome = match self.repository.store_plans(plans, options.clear).await {
            Ok(outcome) => outcome,
            Err(e) => {
                PricingMetrics::record_sync_failed(&e.to_string());
                return Err(e);
            }
        };

        let elapsed = start.elapsed();
        PricingMetrics::record_sync_completed(fetched, outcome.inserted, elapsed.as_secs_f64());
        info!(inserted = outcome.inserted, "Successfully synced {} pricing plans", outcome.inserted);

        Ok(SyncReport {
            fetched,
            inserted: outcome.inserted,
            cleared: outcome.cleared,
            batches: outcome.batches,
            duration_ms: elapsed.as_millis() as u64,
        })
    }
}
