//! PostgreSQL round-trip tests
//!
//! These need Docker for the testcontainers Postgres instance:
//! `cargo test -p domain_pricing -- --ignored`

use async_trait::async_trait;
use domain_pricing::providers::{FetchFilters, ProviderResult};
use domain_pricing::*;
use std::sync::Arc;
use std::time::Duration;
use test_utils::TestDatabase;

struct FixedProvider(Vec<CloudPlan>);

#[async_trait]
impl PlanProvider for FixedProvider {
    fn provider(&self) -> CloudProvider {
        self.0[0].provider
    }

    fn default_regions(&self) -> Vec<String> {
        Vec::new()
    }

    async fn fetch_plans(&self, _filters: &FetchFilters) -> ProviderResult<Vec<CloudPlan>> {
        Ok(self.0.clone())
    }
}

fn fetched() -> Vec<CloudPlan> {
    vec![
        CloudPlan::vm(CloudProvider::Azure, "Standard_D4s_v3", "westeurope", 4, 16.0, 0.192, 140.16)
            .with_operating_system(OperatingSystem::Windows),
        CloudPlan::vm(CloudProvider::Azure, "Standard_B2s", "eastus", 2, 8.0, 0.0416, 30.368)
            .with_storage_gb(Some(8.0))
            .with_bandwidth_tb(Some(0.5)),
    ]
}

fn sync_for(db: &TestDatabase, batch_size: usize) -> (PlanSync<PgPlanRepository>, Arc<PgPlanRepository>) {
    sync_with(db, fetched(), batch_size)
}

fn sync_with(
    db: &TestDatabase,
    plans: Vec<CloudPlan>,
    batch_size: usize,
) -> (PlanSync<PgPlanRepository>, Arc<PgPlanRepository>) {
    let mut registry = ProviderRegistry::new();
    registry.register(Box::new(FixedProvider(plans)));
    let repository = Arc::new(PgPlanRepository::new(db.connection()).with_batch_size(batch_size));
    let sync = PlanSync::new(Aggregator::new(registry, Duration::from_secs(5)), repository.clone());
    (sync, repository)
}

fn without_store_fields(mut plan: CloudPlan) -> CloudPlan {
    plan.id = None;
    plan.created_at = None;
    plan.updated_at = None;
    plan
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_sync_then_list_reproduces_plans() {
    let db = TestDatabase::new().await;
    let (sync, repository) = sync_for(&db, 1);

    let report = sync.run(&SyncOptions::default()).await.unwrap();
    assert_eq!(report.fetched, 2);
    assert_eq!(report.inserted, 2);
    assert_eq!(report.batches, 2);

    let stored = repository.list(PlanQuery::default()).await.unwrap();
    assert!(stored.iter().all(|p| p.id.is_some() && p.created_at.is_some()));

    let mut stored: Vec<_> = stored.into_iter().map(without_store_fields).collect();
    let mut expected = fetched();
    stored.sort_by(|a, b| a.name.cmp(&b.name));
    expected.sort_by(|a, b| a.name.cmp(&b.name));
    assert_eq!(stored, expected);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_clear_replaces_previous_sync() {
    let db = TestDatabase::new().await;
    let (sync, repository) = sync_for(&db, 100);

    sync.run(&SyncOptions::default()).await.unwrap();
    sync.run(&SyncOptions::default()).await.unwrap();
    assert_eq!(repository.stats().await.unwrap().total, 4);

    let report = sync
        .run(&SyncOptions {
            providers: Vec::new(),
            clear: true,
        })
        .await
        .unwrap();
    assert_eq!(report.cleared, 4);

    let stats = repository.stats().await.unwrap();
    assert_eq!(stats.total, 2);
    assert_eq!(stats.by_provider.get("Azure"), Some(&2));
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_list_filters_in_sql() {
    let db = TestDatabase::new().await;
    let (sync, repository) = sync_for(&db, 100);
    sync.run(&SyncOptions::default()).await.unwrap();

    let windows = repository
        .list(PlanQuery {
            operating_system: Some(OperatingSystem::Windows),
            min_cpu: Some(4),
            ..PlanQuery::default()
        })
        .await
        .unwrap();
    assert_eq!(windows.len(), 1);
    assert_eq!(windows[0].name, "Standard_D4s_v3");

    let none = repository
        .list(PlanQuery {
            regions: vec!["eastus".into()],
            max_ram_gb: Some(4.0),
            ..PlanQuery::default()
        })
        .await
        .unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_failed_batch_rolls_back_clear_and_earlier_batches() {
    let db = TestDatabase::new().await;
    let (seed, repository) = sync_for(&db, 100);
    seed.run(&SyncOptions::default()).await.unwrap();

    // Second batch violates the 255-character name column
    let replacement = vec![
        CloudPlan::vm(CloudProvider::Azure, "Standard_B1s", "eastus", 1, 4.0, 0.0104, 7.592),
        CloudPlan::vm(CloudProvider::Azure, "x".repeat(300), "eastus", 2, 8.0, 0.0416, 30.368),
    ];
    let (failing, _) = sync_with(&db, replacement, 1);

    let result = failing
        .run(&SyncOptions {
            providers: Vec::new(),
            clear: true,
        })
        .await;
    assert!(matches!(result, Err(PricingError::Database(_))));

    let mut names: Vec<_> = repository
        .list(PlanQuery::default())
        .await
        .unwrap()
        .into_iter()
        .map(|plan| plan.name)
        .collect();
    names.sort();
    assert_eq!(names, vec!["Standard_B2s", "Standard_D4s_v3"]);
}
