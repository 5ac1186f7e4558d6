//! Hetzner Cloud server types adapter (bearer token required)

use async_trait::async_trait;
use core_config::{ConfigError, FromEnv, env_optional, env_or_default};
use reqwest::Client;
use serde::Deserialize;

use super::{FetchFilters, PlanProvider, ProviderError, ProviderResult, base_url, fetch_json};
use crate::models::{CloudPlan, CloudProvider, OperatingSystem};

const DEFAULT_BASE_URL: &str = "https://api.hetzner.cloud";
const TOKEN_VAR: &str = "HETZNER_API_TOKEN";
const REGION: &str = "eu-central";

#[derive(Debug, Clone)]
pub struct HetznerConfig {
    pub base_url: String,
    pub api_token: Option<String>,
}

impl Default for HetznerConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_token: None,
        }
    }
}

impl FromEnv for HetznerConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: env_or_default("HETZNER_API_URL", DEFAULT_BASE_URL),
            api_token: env_optional(TOKEN_VAR),
        })
    }
}

pub struct HetznerProvider {
    config: HetznerConfig,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct ServerTypesResponse {
    #[serde(default)]
    server_types: Vec<ServerType>,
}

#[derive(Debug, Deserialize)]
struct ServerType {
    name: String,
    cores: i32,
    /// GB
    memory: f64,
    /// GB
    disk: Option<f64>,
    #[serde(default)]
    deprecated: Option<bool>,
    #[serde(default)]
    prices: Vec<PriceTier>,
}

#[derive(Debug, Deserialize)]
struct PriceTier {
    price_hourly: Amount,
    price_monthly: Amount,
}

/// Decimal amounts arrive as strings, e.g. `"0.0060000000000000"`.
#[derive(Debug, Deserialize)]
struct Amount {
    gross: String,
}

impl Amount {
    fn value(&self) -> f64 {
        self.gross.trim().parse().unwrap_or(0.0)
    }
}

impl HetznerProvider {
    pub fn new(config: HetznerConfig, client: Client) -> Self {
        Self { config, client }
    }
}

#[async_trait]
impl PlanProvider for HetznerProvider {
    fn provider(&self) -> CloudProvider {
        CloudProvider::Hetzner
    }

    fn is_configured(&self) -> bool {
        self.config.api_token.is_some()
    }

    fn default_regions(&self) -> Vec<String> {
        vec![REGION.to_string()]
    }

    async fn fetch_plans(&self, filters: &FetchFilters) -> ProviderResult<Vec<CloudPlan>> {
        let token = self
            .config
            .api_token
            .as_deref()
            .ok_or(ProviderError::NotConfigured(TOKEN_VAR))?;

        if !filters.operating_system.accepts(OperatingSystem::Linux) || !filters.wants_region(REGION) {
            return Ok(Vec::new());
        }

        let url = format!("{}/v1/server_types", base_url(&self.config.base_url));
        let response: ServerTypesResponse =
            fetch_json(self.client.get(&url).bearer_auth(token)).await?;

        Ok(response
            .server_types
            .into_iter()
            .filter(|t| !t.deprecated.unwrap_or(false))
            .filter_map(plan_from_server_type)
            .collect())
    }
}

fn plan_from_server_type(server_type: ServerType) -> Option<CloudPlan> {
    let tier = server_type.prices.first()?;
    let price_hourly = tier.price_hourly.value();
    let price_monthly = tier.price_monthly.value();
    if price_hourly <= 0.0 || price_monthly <= 0.0 {
        return None;
    }

    Some(
        CloudPlan::vm(
            CloudProvider::Hetzner,
            server_type.name,
            REGION,
            server_type.cores,
            server_type.memory,
            price_hourly,
            price_monthly,
        )
        .with_storage_gb(server_type.disk),
    )
}
