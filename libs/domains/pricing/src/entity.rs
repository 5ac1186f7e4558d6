use crate::models::{CloudPlan, CloudProvider, OperatingSystem, PlanType};
use sea_orm::ActiveValue::Set;
use sea_orm::entity::prelude::*;

/// Sea-ORM Entity for the cloud_plans table
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "cloud_plans")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub provider: CloudProvider,
    pub name: String,
    pub region: String,
    pub operating_system: OperatingSystem,
    pub cpu: i32,
    #[sea_orm(column_type = "Double")]
    pub ram_gb: f64,
    #[sea_orm(column_type = "Double", nullable)]
    pub storage_gb: Option<f64>,
    #[sea_orm(column_type = "Double", nullable)]
    pub bandwidth_tb: Option<f64>,
    #[sea_orm(column_type = "Double")]
    pub price_hourly: f64,
    #[sea_orm(column_type = "Double")]
    pub price_monthly: f64,
    #[sea_orm(column_name = "type")]
    pub plan_type: PlanType,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for CloudPlan {
    fn from(model: Model) -> Self {
        Self {
            id: Some(model.id),
            provider: model.provider,
            name: model.name,
            region: model.region,
            operating_system: model.operating_system,
            cpu: model.cpu,
            ram_gb: model.ram_gb,
            storage_gb: model.storage_gb,
            bandwidth_tb: model.bandwidth_tb,
            price_hourly: model.price_hourly,
            price_monthly: model.price_monthly,
            plan_type: model.plan_type,
            created_at: Some(model.created_at.into()),
            updated_at: Some(model.updated_at.into()),
        }
    }
}

// New row for a fetched plan; any id already on the plan is ignored.
impl From<CloudPlan> for ActiveModel {
    fn from(plan: CloudPlan) -> Self {
        let now = chrono::Utc::now();

        ActiveModel {
            id: Set(Uuid::now_v7()),
            provider: Set(plan.provider),
            name: Set(plan.name),
            region: Set(plan.region),
            operating_system: Set(plan.operating_system),
            cpu: Set(plan.cpu),
            ram_gb: Set(plan.ram_gb),
            storage_gb: Set(plan.storage_gb),
            bandwidth_tb: Set(plan.bandwidth_tb),
            price_hourly: Set(plan.price_hourly),
            price_monthly: Set(plan.price_monthly),
            plan_type: Set(plan.plan_type),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::ActiveValue;

    #[test]
    fn test_model_into_plan_keeps_exact_values() {
        let now = chrono::Utc::now();
        let model = Model {
            id: Uuid::now_v7(),
            provider: CloudProvider::Hetzner,
            name: "cx22".into(),
            region: "eu-central".into(),
            operating_system: OperatingSystem::Linux,
            cpu: 2,
            ram_gb: 4.0,
            storage_gb: Some(40.0),
            bandwidth_tb: None,
            price_hourly: 0.006_000_000_000_000_1,
            price_monthly: 3.79,
            plan_type: PlanType::Vm,
            created_at: now.into(),
            updated_at: now.into(),
        };

        let plan: CloudPlan = model.clone().into();
        assert_eq!(plan.id, Some(model.id));
        assert_eq!(plan.price_hourly.to_bits(), model.price_hourly.to_bits());
        assert_eq!(plan.created_at, Some(now));
    }

    #[test]
    fn test_active_model_gets_fresh_v7_id() {
        let mut plan = CloudPlan::vm(CloudProvider::Aws, "t3.large", "us-east-1", 2, 8.0, 0.0832, 60.736);
        plan.id = Some(Uuid::nil());

        let active: ActiveModel = plan.into();
        let ActiveValue::Set(id) = active.id else {
            panic!("id not set");
        };
        assert_ne!(id, Uuid::nil());
        assert_eq!(id.get_version_num(), 7);
    }
}
