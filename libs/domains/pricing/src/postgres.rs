use async_trait::async_trait;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, FromQueryResult, QueryFilter, QueryOrder,
    QuerySelect, TransactionTrait,
};
use std::collections::BTreeMap;
use tracing::info;

use crate::{
    entity,
    error::PricingResult,
    models::{CloudPlan, OperatingSystem, PlanQuery, PlanStats},
    repository::{PlanRepository, StoreOutcome},
};

/// Default rows per `INSERT`
pub const DEFAULT_BATCH_SIZE: usize = 100;

pub struct PgPlanRepository {
    db: DatabaseConnection,
    batch_size: usize,
}

impl PgPlanRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }
}

#[derive(Debug, FromQueryResult)]
struct ProviderCount {
    provider: String,
    count: i64,
}

#[async_trait]
impl PlanRepository for PgPlanRepository {
    async fn list(&self, query: PlanQuery) -> PricingResult<Vec<CloudPlan>> {
        let mut select = entity::Entity::find();

        if !query.providers.is_empty() {
            select = select.filter(
                entity::Column::Provider.is_in(query.providers.iter().map(|p| p.to_string())),
            );
        }

        if !query.regions.is_empty() {
            select = select.filter(entity::Column::Region.is_in(query.regions.clone()));
        }

        if let Some(os) = query.operating_system.filter(|os| *os != OperatingSystem::All) {
            select = select.filter(entity::Column::OperatingSystem.eq(os.to_string()));
        }

        if !query.instance_types.is_empty() {
            select = select.filter(entity::Column::Name.is_in(query.instance_types.clone()));
        }

        if let Some(min_cpu) = query.min_cpu {
            select = select.filter(entity::Column::Cpu.gte(min_cpu));
        }

        if let Some(max_cpu) = query.max_cpu {
            select = select.filter(entity::Column::Cpu.lte(max_cpu));
        }

        if let Some(min_ram) = query.min_ram_gb {
            select = select.filter(entity::Column::RamGb.gte(min_ram));
        }

        if let Some(max_ram) = query.max_ram_gb {
            select = select.filter(entity::Column::RamGb.lte(max_ram));
        }

        let models = select
            .order_by_asc(entity::Column::Provider)
            .order_by_asc(entity::Column::PriceMonthly)
            .all(&self.db)
            .await?;

        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn store_plans(&self, plans: Vec<CloudPlan>, clear: bool) -> PricingResult<StoreOutcome> {
        let total = plans.len();
        let mut outcome = StoreOutcome::default();

        // Dropping the transaction on an early return rolls it back
        let txn = self.db.begin().await?;

        if clear {
            outcome.cleared = entity::Entity::delete_many().exec(&txn).await?.rows_affected;
            info!(rows = outcome.cleared, "Cleared stored plans");
        }

        for batch in plans.chunks(self.batch_size) {
            let models: Vec<entity::ActiveModel> = batch.iter().cloned().map(Into::into).collect();
            entity::Entity::insert_many(models)
                .exec_without_returning(&txn)
                .await?;

            outcome.inserted += batch.len();
            outcome.batches += 1;
            info!("Progress: {}/{} plans inserted", outcome.inserted, total);
        }

        txn.commit().await?;
        Ok(outcome)
    }

    async fn stats(&self) -> PricingResult<PlanStats> {
        let rows = entity::Entity::find()
            .select_only()
            .column(entity::Column::Provider)
            .column_as(entity::Column::Id.count(), "count")
            .group_by(entity::Column::Provider)
            .into_model::<ProviderCount>()
            .all(&self.db)
            .await?;

        let by_provider: BTreeMap<String, u64> = rows
            .into_iter()
            .map(|row| (row.provider, row.count.max(0) as u64))
            .collect();

        Ok(PlanStats {
            total: by_provider.values().sum(),
            by_provider,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PricingError;
    use crate::models::{CloudProvider, PlanType};
    use sea_orm::{DatabaseBackend, DbErr, MockDatabase, MockExecResult, Value};
    use uuid::Uuid;

    fn model(provider: CloudProvider, name: &str, monthly: f64) -> entity::Model {
        let now = chrono::Utc::now();
        entity::Model {
            id: Uuid::now_v7(),
            provider,
            name: name.into(),
            region: "eu-central".into(),
            operating_system: OperatingSystem::Linux,
            cpu: 2,
            ram_gb: 4.0,
            storage_gb: Some(40.0),
            bandwidth_tb: None,
            price_hourly: monthly / 730.0,
            price_monthly: monthly,
            plan_type: PlanType::Vm,
            created_at: now.into(),
            updated_at: now.into(),
        }
    }

    fn plans(count: usize) -> Vec<CloudPlan> {
        (0..count)
            .map(|i| {
                CloudPlan::vm(CloudProvider::Hetzner, format!("cx{i}"), "eu-central", 2, 4.0, 0.006, 3.79)
            })
            .collect()
    }

    fn exec(rows_affected: u64) -> MockExecResult {
        MockExecResult {
            last_insert_id: 0,
            rows_affected,
        }
    }

    #[tokio::test]
    async fn test_list_maps_rows_to_stored_plans() {
        let rows = vec![
            model(CloudProvider::Aws, "t3.medium", 30.4),
            model(CloudProvider::Hetzner, "cx22", 3.79),
        ];
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([rows.clone()])
            .into_connection();

        let repo = PgPlanRepository::new(db);
        let plans = repo
            .list(PlanQuery {
                providers: vec![CloudProvider::Aws, CloudProvider::Hetzner],
                operating_system: Some(OperatingSystem::All),
                min_cpu: Some(2),
                ..PlanQuery::default()
            })
            .await
            .unwrap();

        assert_eq!(plans.len(), 2);
        assert_eq!(plans[0].id, Some(rows[0].id));
        assert_eq!(plans[1].name, "cx22");
        assert!(plans[1].created_at.is_some());
    }

    #[tokio::test]
    async fn test_store_plans_batches_inside_one_transaction() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([exec(7), exec(2), exec(2), exec(1)])
            .into_connection();

        let repo = PgPlanRepository::new(db).with_batch_size(2);
        let outcome = repo.store_plans(plans(5), true).await.unwrap();

        assert_eq!(
            outcome,
            StoreOutcome {
                inserted: 5,
                cleared: 7,
                batches: 3,
            }
        );
    }

    #[tokio::test]
    async fn test_store_plans_without_clear_skips_delete() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([exec(3)])
            .into_connection();

        let outcome = PgPlanRepository::new(db).store_plans(plans(3), false).await.unwrap();
        assert_eq!(outcome.cleared, 0);
        assert_eq!(outcome.batches, 1);
    }

    #[tokio::test]
    async fn test_store_plans_failure_propagates() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([exec(2)])
            .append_exec_errors([DbErr::Custom("disk full".into())])
            .into_connection();

        let result = PgPlanRepository::new(db)
            .with_batch_size(2)
            .store_plans(plans(4), false)
            .await;
        assert!(matches!(result, Err(PricingError::Database(_))));
    }

    #[tokio::test]
    async fn test_stats_sums_provider_counts() {
        let rows = vec![
            BTreeMap::from([
                ("provider", Value::from("AWS")),
                ("count", Value::from(12i64)),
            ]),
            BTreeMap::from([
                ("provider", Value::from("Hetzner")),
                ("count", Value::from(5i64)),
            ]),
        ];
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([rows])
            .into_connection();

        let stats = PgPlanRepository::new(db).stats().await.unwrap();
        assert_eq!(stats.total, 17);
        assert_eq!(stats.by_provider.get("AWS"), Some(&12));
        assert_eq!(stats.by_provider.get("Hetzner"), Some(&5));
    }
}
