//! Scaleway Instances adapter, one public product catalogue per zone

use async_trait::async_trait;
use core_config::{ConfigError, FromEnv, env_list, env_or_default};
use reqwest::Client;
use serde::Deserialize;
use std::collections::BTreeMap;

use super::{FetchFilters, PlanProvider, ProviderResult, base_url, fetch_json, per_region};
use crate::models::{CloudPlan, CloudProvider, OperatingSystem};

const DEFAULT_BASE_URL: &str = "https://api.scaleway.com";
const DEFAULT_ZONES: [&str; 4] = ["fr-par-1", "fr-par-2", "nl-ams-1", "pl-waw-1"];
const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

#[derive(Debug, Clone)]
pub struct ScalewayConfig {
    pub base_url: String,
    pub zones: Vec<String>,
}

impl Default for ScalewayConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            zones: DEFAULT_ZONES.iter().map(|z| z.to_string()).collect(),
        }
    }
}

impl FromEnv for ScalewayConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: env_or_default("SCALEWAY_API_URL", DEFAULT_BASE_URL),
            zones: env_list("SCALEWAY_ZONES", &DEFAULT_ZONES),
        })
    }
}

pub struct ScalewayProvider {
    config: ScalewayConfig,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct ServersResponse {
    /// Keyed by commercial type, e.g. `DEV1-S`
    #[serde(default)]
    servers: BTreeMap<String, Server>,
}

#[derive(Debug, Deserialize)]
struct Server {
    #[serde(default)]
    arch: Option<String>,
    #[serde(default)]
    ncpus: i32,
    /// Bytes
    #[serde(default)]
    ram: f64,
    #[serde(default)]
    hourly_price: f64,
    #[serde(default)]
    monthly_price: f64,
    #[serde(default)]
    volumes_constraint: Option<VolumesConstraint>,
}

#[derive(Debug, Deserialize)]
struct VolumesConstraint {
    /// Bytes
    max_size: Option<f64>,
}

impl ScalewayProvider {
    pub fn new(config: ScalewayConfig, client: Client) -> Self {
        Self { config, client }
    }

    async fn fetch_zone(&self, zone: &str, include_arm: bool) -> ProviderResult<Vec<CloudPlan>> {
        let url = format!(
            "{}/instance/v1/zones/{}/products/servers",
            base_url(&self.config.base_url),
            zone
        );
        let response: ServersResponse = fetch_json(self.client.get(&url)).await?;
        Ok(plans_from_servers(response.servers, zone, include_arm))
    }
}

#[async_trait]
impl PlanProvider for ScalewayProvider {
    fn provider(&self) -> CloudProvider {
        CloudProvider::Scaleway
    }

    fn default_regions(&self) -> Vec<String> {
        self.config.zones.clone()
    }

    async fn fetch_plans(&self, filters: &FetchFilters) -> ProviderResult<Vec<CloudPlan>> {
        if !filters.operating_system.accepts(OperatingSystem::Linux) {
            return Ok(Vec::new());
        }

        let zones = filters.regions_or(&self.config.zones);
        // The gpu flag also lifts the ARM exclusion.
        let include_arm = filters.include_gpu;
        Ok(per_region(CloudProvider::Scaleway, zones, |zone| async move {
            self.fetch_zone(&zone, include_arm).await
        })
        .await)
    }
}

fn plans_from_servers(
    servers: BTreeMap<String, Server>,
    zone: &str,
    include_arm: bool,
) -> Vec<CloudPlan> {
    servers
        .into_iter()
        .filter(|(_, server)| {
            include_arm || !server.arch.as_deref().is_some_and(|arch| arch.contains("arm"))
        })
        .filter_map(|(name, server)| {
            let ram_gb = server.ram / BYTES_PER_GB;
            if server.ncpus <= 0 || ram_gb <= 0.0 || server.hourly_price <= 0.0 {
                return None;
            }

            let storage_gb = server
                .volumes_constraint
                .and_then(|v| v.max_size)
                .filter(|size| *size > 0.0)
                .map(|size| size / BYTES_PER_GB);

            Some(
                CloudPlan::vm(
                    CloudProvider::Scaleway,
                    name,
                    zone,
                    server.ncpus,
                    ram_gb,
                    server.hourly_price,
                    server.monthly_price,
                )
                .with_storage_gb(storage_gb),
            )
        })
        .collect()
}
