use chrono::{DateTime, Utc};
use sea_orm::{DeriveActiveEnum, EnumIter, entity::prelude::StringLen};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

/// Hours used to turn an hourly rate into a monthly one.
pub const HOURS_PER_MONTH: f64 = 730.0;

/// Cloud provider enumeration
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    DeriveActiveEnum,
    EnumIter,
    ToSchema,
    TS,
)]
#[ts(export)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[strum(ascii_case_insensitive)]
pub enum CloudProvider {
    #[sea_orm(string_value = "AWS")]
    #[serde(rename = "AWS")]
    #[strum(serialize = "AWS")]
    Aws,
    #[sea_orm(string_value = "DigitalOcean")]
    DigitalOcean,
    #[sea_orm(string_value = "GCP")]
    #[serde(rename = "GCP")]
    #[strum(serialize = "GCP")]
    Gcp,
    #[sea_orm(string_value = "Azure")]
    Azure,
    #[sea_orm(string_value = "Hetzner")]
    Hetzner,
    #[sea_orm(string_value = "Scaleway")]
    Scaleway,
    #[sea_orm(string_value = "OVH")]
    #[serde(rename = "OVH")]
    #[strum(serialize = "OVH")]
    Ovh,
    #[sea_orm(string_value = "Linode")]
    Linode,
}

/// Operating system a plan is priced for
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    DeriveActiveEnum,
    EnumIter,
    ToSchema,
    TS,
)]
#[ts(export)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[strum(ascii_case_insensitive)]
pub enum OperatingSystem {
    #[default]
    #[sea_orm(string_value = "Linux")]
    Linux,
    #[sea_orm(string_value = "Windows")]
    Windows,
    #[sea_orm(string_value = "All")]
    All,
}

impl OperatingSystem {
    /// Whether a plan priced for `other` satisfies a request for `self`.
    pub fn accepts(self, other: OperatingSystem) -> bool {
        self == OperatingSystem::All || self == other
    }

    /// Concrete systems to query when a provider prices each one separately.
    pub fn concrete(self) -> &'static [OperatingSystem] {
        match self {
            OperatingSystem::Linux => &[OperatingSystem::Linux],
            OperatingSystem::Windows => &[OperatingSystem::Windows],
            OperatingSystem::All => &[OperatingSystem::Linux, OperatingSystem::Windows],
        }
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    DeriveActiveEnum,
    EnumIter,
    ToSchema,
    TS,
)]
#[ts(export)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum PlanType {
    #[default]
    #[sea_orm(string_value = "VM")]
    #[serde(rename = "VM")]
    #[strum(serialize = "VM")]
    Vm,
    #[sea_orm(string_value = "Serverless")]
    Serverless,
    #[sea_orm(string_value = "Static")]
    Static,
    #[sea_orm(string_value = "Container")]
    Container,
}

/// One priced compute offering from a provider in one region.
///
/// `id` and the timestamps are only set once the plan has been stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, TS)]
#[ts(export)]
pub struct CloudPlan {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    pub provider: CloudProvider,
    /// Provider SKU or slug
    pub name: String,
    pub region: String,
    #[serde(default)]
    pub operating_system: OperatingSystem,
    pub cpu: i32,
    pub ram_gb: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_gb: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bandwidth_tb: Option<f64>,
    /// USD
    pub price_hourly: f64,
    /// USD
    pub price_monthly: f64,
    #[serde(rename = "type", default)]
    pub plan_type: PlanType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl CloudPlan {
    /// A Linux VM plan with no storage or bandwidth figures.
    pub fn vm(
        provider: CloudProvider,
        name: impl Into<String>,
        region: impl Into<String>,
        cpu: i32,
        ram_gb: f64,
        price_hourly: f64,
        price_monthly: f64,
    ) -> Self {
        Self {
            id: None,
            provider,
            name: name.into(),
            region: region.into(),
            operating_system: OperatingSystem::Linux,
            cpu,
            ram_gb,
            storage_gb: None,
            bandwidth_tb: None,
            price_hourly,
            price_monthly,
            plan_type: PlanType::Vm,
            created_at: None,
            updated_at: None,
        }
    }

    pub fn with_operating_system(mut self, os: OperatingSystem) -> Self {
        self.operating_system = os;
        self
    }

    pub fn with_storage_gb(mut self, storage_gb: Option<f64>) -> Self {
        self.storage_gb = storage_gb;
        self
    }

    pub fn with_bandwidth_tb(mut self, bandwidth_tb: Option<f64>) -> Self {
        self.bandwidth_tb = bandwidth_tb;
        self
    }

    /// Both prices and both capacities must be strictly positive.
    pub fn is_valid(&self) -> bool {
        self.cpu > 0
            && self.ram_gb.is_finite()
            && self.ram_gb > 0.0
            && self.price_hourly.is_finite()
            && self.price_hourly > 0.0
            && self.price_monthly.is_finite()
            && self.price_monthly > 0.0
    }

    /// Value heuristic: `(cpu + ram_gb) / price_monthly`, higher is better.
    pub fn score(&self) -> f64 {
        (f64::from(self.cpu) + self.ram_gb) / self.price_monthly
    }

    /// Same offering, by id when both are stored, otherwise by
    /// provider, name, region and operating system.
    pub fn same_offering(&self, other: &CloudPlan) -> bool {
        match (self.id, other.id) {
            (Some(a), Some(b)) => a == b,
            _ => {
                self.provider == other.provider
                    && self.name == other.name
                    && self.region == other.region
                    && self.operating_system == other.operating_system
            }
        }
    }
}

/// Filter contract shared by the live aggregate and the stored-plan query.
///
/// Empty vectors and `None` mean "no constraint".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlanQuery {
    pub providers: Vec<CloudProvider>,
    pub regions: Vec<String>,
    pub operating_system: Option<OperatingSystem>,
    pub instance_types: Vec<String>,
    pub min_cpu: Option<i32>,
    pub max_cpu: Option<i32>,
    pub min_ram_gb: Option<f64>,
    pub max_ram_gb: Option<f64>,
    pub include_gpu: bool,
}

impl PlanQuery {
    pub fn for_providers(providers: Vec<CloudProvider>) -> Self {
        Self {
            providers,
            ..Self::default()
        }
    }

    /// Whether `provider` was requested (all are when none are named).
    pub fn wants_provider(&self, provider: CloudProvider) -> bool {
        self.providers.is_empty() || self.providers.contains(&provider)
    }
}

/// Response body of `GET /pricing`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PricingResponse {
    /// Field name kept as published to existing clients.
    #[serde(rename = "llmRecomendation")]
    pub llm_recomendation: Vec<CloudPlan>,
    pub plans: Vec<CloudPlan>,
}

/// Stored plan counts.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PlanStats {
    pub total: u64,
    pub by_provider: std::collections::BTreeMap<String, u64>,
}
