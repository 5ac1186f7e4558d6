use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::PricingResult;
use crate::models::{CloudPlan, OperatingSystem, PlanQuery, PlanStats};

/// What a store pass wrote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreOutcome {
    pub inserted: usize,
    /// Rows removed before inserting; 0 unless clearing was requested.
    pub cleared: u64,
    pub batches: usize,
}

/// Repository trait for stored cloud plans
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PlanRepository: Send + Sync {
    /// Stored plans matching `query`, ordered by provider then monthly price.
    async fn list(&self, query: PlanQuery) -> PricingResult<Vec<CloudPlan>>;

    /// Insert `plans` atomically, optionally deleting every stored plan
    /// first. Nothing is written if any step fails.
    async fn store_plans(&self, plans: Vec<CloudPlan>, clear: bool) -> PricingResult<StoreOutcome>;

    /// Total count plus per-provider counts.
    async fn stats(&self) -> PricingResult<PlanStats>;
}

/// Whether a stored plan satisfies `query`.
///
/// Provider and region are set membership, OS must match exactly unless
/// `All` (or nothing) was asked for, ranges are inclusive.
pub fn matches_query(plan: &CloudPlan, query: &PlanQuery) -> bool {
    query.wants_provider(plan.provider)
        && (query.regions.is_empty() || query.regions.contains(&plan.region))
        && query
            .operating_system
            .is_none_or(|os| os == OperatingSystem::All || os == plan.operating_system)
        && (query.instance_types.is_empty() || query.instance_types.contains(&plan.name))
        && query.min_cpu.is_none_or(|min| plan.cpu >= min)
        && query.max_cpu.is_none_or(|max| plan.cpu <= max)
        && query.min_ram_gb.is_none_or(|min| plan.ram_gb >= min)
        && query.max_ram_gb.is_none_or(|max| plan.ram_gb <= max)
}

/// In-memory implementation of PlanRepository (for development/testing)
#[derive(Debug, Default, Clone)]
pub struct InMemoryPlanRepository {
    plans: Arc<RwLock<Vec<CloudPlan>>>,
}

impl InMemoryPlanRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Repository preloaded as if `plans` had been synced.
    pub async fn with_plans(plans: Vec<CloudPlan>) -> PricingResult<Self> {
        let repo = Self::new();
        repo.store_plans(plans, false).await?;
        Ok(repo)
    }
}

#[async_trait]
impl PlanRepository for InMemoryPlanRepository {
    async fn list(&self, query: PlanQuery) -> PricingResult<Vec<CloudPlan>> {
        let plans = self.plans.read().await;

        let mut result: Vec<CloudPlan> = plans
            .iter()
            .filter(|p| matches_query(p, &query))
            .cloned()
            .collect();
        result.sort_by(|a, b| {
            a.provider
                .to_string()
                .cmp(&b.provider.to_string())
                .then(a.price_monthly.total_cmp(&b.price_monthly))
        });

        Ok(result)
    }

    async fn store_plans(&self, plans: Vec<CloudPlan>, clear: bool) -> PricingResult<StoreOutcome> {
        let mut stored = self.plans.write().await;

        let cleared = if clear {
            let count = stored.len() as u64;
            stored.clear();
            count
        } else {
            0
        };

        let now = chrono::Utc::now();
        let inserted = plans.len();
        stored.extend(plans.into_iter().map(|mut plan| {
            plan.id = Some(Uuid::now_v7());
            plan.created_at = Some(now);
            plan.updated_at = Some(now);
            plan
        }));

        Ok(StoreOutcome {
            inserted,
            cleared,
            batches: usize::from(inserted > 0),
        })
    }

    async fn stats(&self) -> PricingResult<PlanStats> {
        let plans = self.plans.read().await;

        let mut by_provider = BTreeMap::new();
        for plan in plans.iter() {
            *by_provider.entry(plan.provider.to_string()).or_insert(0u64) += 1;
        }

        Ok(PlanStats {
            total: plans.len() as u64,
            by_provider,
        })
    }
}
