//! Azure Retail Prices adapter
//!
//! The retail prices API is public. Memory is not published there, so
//! `ram_gb` is estimated as 4 GB per vCPU.

use async_trait::async_trait;
use core_config::{ConfigError, FromEnv, env_list, env_or_default};
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use std::sync::LazyLock;

use super::{FetchFilters, PlanProvider, ProviderResult, base_url, fetch_json, per_region};
use crate::models::{CloudPlan, CloudProvider, HOURS_PER_MONTH, OperatingSystem};

const DEFAULT_BASE_URL: &str = "https://prices.azure.com";
const DEFAULT_REGIONS: [&str; 6] = [
    "eastus",
    "eastus2",
    "westus2",
    "westeurope",
    "northeurope",
    "southeastasia",
];
/// Items kept per (region, OS) page
const MAX_ITEMS: usize = 50;
const RAM_GB_PER_VCPU: f64 = 4.0;

static SKU_CPU: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Standard_([A-Z])(\d+)").expect("valid SKU pattern"));

#[derive(Debug, Clone)]
pub struct AzureConfig {
    pub base_url: String,
    pub regions: Vec<String>,
}

impl Default for AzureConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            regions: DEFAULT_REGIONS.iter().map(|r| r.to_string()).collect(),
        }
    }
}

impl FromEnv for AzureConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: env_or_default("AZURE_PRICING_URL", DEFAULT_BASE_URL),
            regions: env_list("AZURE_REGIONS", &DEFAULT_REGIONS),
        })
    }
}

pub struct AzureProvider {
    config: AzureConfig,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct PricesPage {
    #[serde(rename = "Items", default)]
    items: Vec<PriceItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PriceItem {
    #[serde(default)]
    product_name: String,
    #[serde(default)]
    sku_name: String,
    arm_sku_name: Option<String>,
    arm_region_name: Option<String>,
    #[serde(default)]
    retail_price: f64,
}

impl PriceItem {
    fn is_windows(&self) -> bool {
        self.sku_name.contains("Windows") || self.product_name.contains("Windows")
    }

    fn is_candidate(&self, os: OperatingSystem) -> bool {
        let item_os = if self.is_windows() {
            OperatingSystem::Windows
        } else {
            OperatingSystem::Linux
        };

        self.product_name.contains("Virtual Machines")
            && !self.sku_name.is_empty()
            && !self.sku_name.contains("Low Priority")
            && !self.sku_name.contains("Spot")
            && item_os == os
    }
}

impl AzureProvider {
    pub fn new(config: AzureConfig, client: Client) -> Self {
        Self { config, client }
    }

    async fn fetch_region(
        &self,
        region: &str,
        systems: &[OperatingSystem],
    ) -> ProviderResult<Vec<CloudPlan>> {
        let filter = format!(
            "serviceName eq 'Virtual Machines' and priceType eq 'Consumption' and armRegionName eq '{region}'"
        );
        let url = format!(
            "{}/api/retail/prices?$filter={}",
            base_url(&self.config.base_url),
            urlencoding::encode(&filter)
        );

        // OS is not part of the filter; one page serves every requested OS
        let page: PricesPage = fetch_json(self.client.get(&url)).await?;
        Ok(systems
            .iter()
            .flat_map(|&os| plans_from_items(&page.items, region, os))
            .collect())
    }
}

#[async_trait]
impl PlanProvider for AzureProvider {
    fn provider(&self) -> CloudProvider {
        CloudProvider::Azure
    }

    fn default_regions(&self) -> Vec<String> {
        self.config.regions.clone()
    }

    async fn fetch_plans(&self, filters: &FetchFilters) -> ProviderResult<Vec<CloudPlan>> {
        let regions = filters.regions_or(&self.config.regions);
        let systems = filters.operating_system.concrete();
        Ok(per_region(CloudProvider::Azure, regions, |region| async move {
            self.fetch_region(&region, systems).await
        })
        .await)
    }
}

fn plans_from_items(items: &[PriceItem], region: &str, os: OperatingSystem) -> Vec<CloudPlan> {
    items
        .iter()
        .filter(|item| item.is_candidate(os))
        .take(MAX_ITEMS)
        .map(|item| {
            let cpu = cpu_from_sku(item.arm_sku_name.as_deref().unwrap_or_default());
            let name = item
                .arm_sku_name
                .as_deref()
                .filter(|n| !n.is_empty())
                .unwrap_or(&item.sku_name);
            let region = item.arm_region_name.as_deref().unwrap_or(region);

            CloudPlan::vm(
                CloudProvider::Azure,
                name,
                region,
                cpu,
                f64::from(cpu) * RAM_GB_PER_VCPU,
                item.retail_price,
                item.retail_price * HOURS_PER_MONTH,
            )
            .with_operating_system(os)
        })
        .collect()
}

/// vCPU count from the leading size digits, e.g. `Standard_D4s_v3` -> 4.
fn cpu_from_sku(sku: &str) -> i32 {
    SKU_CPU
        .captures(sku)
        .and_then(|c| c.get(2))
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn item(region: &str, product: &str, sku: &str, arm_sku: &str, price: f64) -> serde_json::Value {
        json!({
            "currencyCode": "USD",
            "retailPrice": price,
            "armRegionName": region,
            "productName": product,
            "skuName": sku,
            "armSkuName": arm_sku,
            "serviceName": "Virtual Machines",
            "type": "Consumption"
        })
    }

    fn page(region: &str) -> serde_json::Value {
        json!({
            "Items": [
                item(region, "Virtual Machines Dv3 Series", "D4s v3", "Standard_D4s_v3", 0.192),
                item(region, "Virtual Machines Dv3 Series Windows", "D4s v3", "Standard_D4s_v3", 0.376),
                item(region, "Virtual Machines Dv3 Series", "D4s v3 Low Priority", "Standard_D4s_v3", 0.038),
                item(region, "Virtual Machines Dv3 Series", "D4s v3 Spot", "Standard_D4s_v3", 0.021),
                item(region, "Storage", "P10", "", 1.0),
                item(region, "Virtual Machines A Series Basic", "A0", "", 0.018)
            ],
            "NextPageLink": null
        })
    }

    async fn server_for(region: &str) -> MockServer {
        let server = MockServer::start().await;
        mock_page(region).mount(&server).await;
        server
    }

    fn mock_page(region: &str) -> Mock {
        Mock::given(method("GET"))
            .and(path("/api/retail/prices"))
            .and(query_param(
                "$filter",
                format!(
                    "serviceName eq 'Virtual Machines' and priceType eq 'Consumption' and armRegionName eq '{region}'"
                ),
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(page(region)))
    }

    fn provider(server: &MockServer, regions: &[&str]) -> AzureProvider {
        AzureProvider::new(
            AzureConfig {
                base_url: server.uri(),
                regions: regions.iter().map(|r| r.to_string()).collect(),
            },
            Client::new(),
        )
    }

    #[test]
    fn test_cpu_from_sku() {
        assert_eq!(cpu_from_sku("Standard_D4s_v3"), 4);
        assert_eq!(cpu_from_sku("Standard_E64as_v5"), 64);
        assert_eq!(cpu_from_sku("Basic_A0"), 1);
        assert_eq!(cpu_from_sku(""), 1);
    }

    #[tokio::test]
    async fn test_linux_items_with_estimated_ram() {
        let server = server_for("eastus").await;
        let plans = provider(&server, &["eastus"]).plans(&FetchFilters::default()).await;

        assert_eq!(plans.len(), 2);
        let d4 = &plans[0];
        assert_eq!(d4.name, "Standard_D4s_v3");
        assert_eq!(d4.cpu, 4);
        assert_eq!(d4.ram_gb, 16.0);
        assert_eq!(d4.region, "eastus");
        assert_eq!(d4.operating_system, OperatingSystem::Linux);
        assert!((d4.price_monthly - 0.192 * 730.0).abs() < 1e-9);

        // No ARM SKU name: falls back to skuName and one vCPU
        assert_eq!(plans[1].name, "A0");
        assert_eq!(plans[1].cpu, 1);
    }

    #[tokio::test]
    async fn test_all_expands_to_linux_and_windows() {
        let server = server_for("eastus").await;
        let plans = provider(&server, &["eastus"])
            .plans(&FetchFilters {
                operating_system: OperatingSystem::All,
                ..FetchFilters::default()
            })
            .await;

        let windows: Vec<_> = plans
            .iter()
            .filter(|p| p.operating_system == OperatingSystem::Windows)
            .collect();
        assert_eq!(plans.len(), 3);
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].price_hourly, 0.376);
    }

    #[tokio::test]
    async fn test_all_fetches_each_region_once() {
        let server = MockServer::start().await;
        mock_page("westeurope").expect(1).mount(&server).await;

        let plans = provider(&server, &["westeurope"])
            .fetch_plans(&FetchFilters {
                operating_system: OperatingSystem::All,
                ..FetchFilters::default()
            })
            .await
            .unwrap();

        assert_eq!(plans.len(), 3);
        server.verify().await;
    }

    #[tokio::test]
    async fn test_spot_meters_are_skipped() {
        let server = server_for("eastus").await;
        let plans = provider(&server, &["eastus"]).plans(&FetchFilters::default()).await;

        assert!(plans.iter().all(|p| p.price_hourly != 0.021));
        assert!(plans.iter().all(|p| p.price_hourly != 0.038));
    }

    #[test]
    fn test_caps_items_per_page() {
        let items: Vec<PriceItem> = (0..80)
            .map(|i| {
                serde_json::from_value(item(
                    "eastus",
                    "Virtual Machines Bs Series",
                    &format!("B{i}ms"),
                    "Standard_B2ms",
                    0.1,
                ))
                .unwrap()
            })
            .collect();

        assert_eq!(plans_from_items(&items, "eastus", OperatingSystem::Linux).len(), 50);
    }

    #[tokio::test]
    async fn test_failed_region_is_isolated() {
        let server = server_for("westeurope").await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let plans = provider(&server, &["eastus", "westeurope"])
            .plans(&FetchFilters::default())
            .await;
        assert_eq!(plans.len(), 2);
        assert!(plans.iter().all(|p| p.region == "westeurope"));
    }
}
