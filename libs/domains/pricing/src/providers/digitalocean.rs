//! DigitalOcean droplet sizes adapter (bearer token required)

use async_trait::async_trait;
use core_config::{ConfigError, FromEnv, env_optional, env_or_default};
use reqwest::Client;
use serde::Deserialize;

use super::{FetchFilters, PlanProvider, ProviderError, ProviderResult, base_url, fetch_json};
use crate::models::{CloudPlan, CloudProvider, OperatingSystem};

const DEFAULT_BASE_URL: &str = "https://api.digitalocean.com";
const TOKEN_VAR: &str = "DIGITALOCEAN_API_TOKEN";
/// Region used for sizes that list none
const FALLBACK_REGION: &str = "nyc1";

#[derive(Debug, Clone)]
pub struct DigitalOceanConfig {
    pub base_url: String,
    pub api_token: Option<String>,
}

impl Default for DigitalOceanConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_token: None,
        }
    }
}

impl FromEnv for DigitalOceanConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: env_or_default("DIGITALOCEAN_API_URL", DEFAULT_BASE_URL),
            api_token: env_optional(TOKEN_VAR),
        })
    }
}

pub struct DigitalOceanProvider {
    config: DigitalOceanConfig,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct SizesResponse {
    #[serde(default)]
    sizes: Vec<Size>,
}

#[derive(Debug, Deserialize)]
struct Size {
    slug: String,
    /// MiB
    memory: f64,
    vcpus: i32,
    /// GB
    disk: Option<f64>,
    /// TB
    transfer: Option<f64>,
    price_monthly: f64,
    price_hourly: f64,
    #[serde(default)]
    regions: Vec<String>,
    #[serde(default)]
    available: bool,
}

impl DigitalOceanProvider {
    pub fn new(config: DigitalOceanConfig, client: Client) -> Self {
        Self { config, client }
    }
}

#[async_trait]
impl PlanProvider for DigitalOceanProvider {
    fn provider(&self) -> CloudProvider {
        CloudProvider::DigitalOcean
    }

    fn is_configured(&self) -> bool {
        self.config.api_token.is_some()
    }

    fn default_regions(&self) -> Vec<String> {
        Vec::new()
    }

    async fn fetch_plans(&self, filters: &FetchFilters) -> ProviderResult<Vec<CloudPlan>> {
        let token = self
            .config
            .api_token
            .as_deref()
            .ok_or(ProviderError::NotConfigured(TOKEN_VAR))?;

        // Droplets are Linux only
        if !filters.operating_system.accepts(OperatingSystem::Linux) {
            return Ok(Vec::new());
        }

        let url = format!("{}/v2/sizes", base_url(&self.config.base_url));
        let response: SizesResponse = fetch_json(
            self.client
                .get(&url)
                .query(&[("per_page", "200")])
                .bearer_auth(token),
        )
        .await?;

        Ok(plans_from_sizes(response.sizes, filters))
    }
}

fn plans_from_sizes(sizes: Vec<Size>, filters: &FetchFilters) -> Vec<CloudPlan> {
    let mut plans = Vec::new();

    for size in sizes {
        if !size.available || (!filters.include_gpu && size.slug.contains("gpu")) {
            continue;
        }

        let regions = if size.regions.is_empty() {
            vec![FALLBACK_REGION.to_string()]
        } else {
            size.regions.clone()
        };

        for region in regions.into_iter().filter(|r| filters.wants_region(r)) {
            plans.push(
                CloudPlan::vm(
                    CloudProvider::DigitalOcean,
                    size.slug.clone(),
                    region,
                    size.vcpus,
                    size.memory / 1024.0,
                    size.price_hourly,
                    size.price_monthly,
                )
                .with_storage_gb(size.disk)
                .with_bandwidth_tb(size.transfer),
            );
        }
    }

    plans
}
