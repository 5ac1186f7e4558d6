//! AWS EC2 adapter
//!
//! Reads the public per-region EC2 offer file from the AWS Price List bulk
//! API. No credential is needed.

use async_trait::async_trait;
use core_config::{ConfigError, FromEnv, env_list, env_or_default};
use reqwest::Client;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;
use tracing::debug;

use super::{FetchFilters, PlanProvider, ProviderResult, base_url, fetch_json, per_region};
use crate::models::{CloudPlan, CloudProvider, HOURS_PER_MONTH, OperatingSystem};

const DEFAULT_BASE_URL: &str = "https://pricing.us-east-1.amazonaws.com";
const DEFAULT_REGIONS: [&str; 6] = [
    "us-east-1",
    "us-east-2",
    "us-west-1",
    "us-west-2",
    "eu-west-1",
    "eu-central-1",
];

/// Instance types considered; everything else in the offer file is ignored.
pub const ALLOWED_INSTANCE_TYPES: [&str; 14] = [
    "t3.micro",
    "t3.small",
    "t3.medium",
    "t3.large",
    "t3.xlarge",
    "t3.2xlarge",
    "m5.large",
    "m5.xlarge",
    "m5.2xlarge",
    "m5.4xlarge",
    "c5.large",
    "c5.xlarge",
    "c5.2xlarge",
    "c5.4xlarge",
];

#[derive(Debug, Clone)]
pub struct AwsConfig {
    pub base_url: String,
    pub regions: Vec<String>,
}

impl Default for AwsConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            regions: DEFAULT_REGIONS.iter().map(|r| r.to_string()).collect(),
        }
    }
}

impl FromEnv for AwsConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: env_or_default("AWS_PRICING_URL", DEFAULT_BASE_URL),
            regions: env_list("AWS_REGIONS", &DEFAULT_REGIONS),
        })
    }
}

pub struct AwsProvider {
    config: AwsConfig,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct OfferFile {
    #[serde(default)]
    products: BTreeMap<String, Product>,
    #[serde(default)]
    terms: Terms,
}

#[derive(Debug, Deserialize)]
struct Product {
    sku: String,
    #[serde(rename = "productFamily")]
    product_family: Option<String>,
    #[serde(default)]
    attributes: Attributes,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Attributes {
    instance_type: Option<String>,
    operating_system: Option<String>,
    tenancy: Option<String>,
    pre_installed_sw: Option<String>,
    vcpu: Option<String>,
    memory: Option<String>,
    region_code: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Terms {
    /// sku -> term code -> term
    #[serde(rename = "OnDemand", default)]
    on_demand: HashMap<String, BTreeMap<String, Term>>,
}

#[derive(Debug, Deserialize)]
struct Term {
    #[serde(rename = "priceDimensions", default)]
    price_dimensions: BTreeMap<String, PriceDimension>,
}

#[derive(Debug, Deserialize)]
struct PriceDimension {
    #[serde(rename = "pricePerUnit", default)]
    price_per_unit: HashMap<String, String>,
}

impl AwsProvider {
    pub fn new(config: AwsConfig, client: Client) -> Self {
        Self { config, client }
    }

    async fn fetch_region(&self, region: &str, os: OperatingSystem) -> ProviderResult<Vec<CloudPlan>> {
        let url = format!(
            "{}/offers/v1.0/aws/AmazonEC2/current/{}/index.json",
            base_url(&self.config.base_url),
            region
        );
        debug!(region = region, "Fetching AWS EC2 offer file");

        let offer: OfferFile = fetch_json(self.client.get(&url)).await?;
        Ok(plans_from_offer(offer, region, os))
    }
}

#[async_trait]
impl PlanProvider for AwsProvider {
    fn provider(&self) -> CloudProvider {
        CloudProvider::Aws
    }

    fn default_regions(&self) -> Vec<String> {
        self.config.regions.clone()
    }

    async fn fetch_plans(&self, filters: &FetchFilters) -> ProviderResult<Vec<CloudPlan>> {
        let regions = filters.regions_or(&self.config.regions);
        let os = filters.operating_system;
        Ok(per_region(CloudProvider::Aws, regions, |region| async move {
            self.fetch_region(&region, os).await
        })
        .await)
    }
}

fn plans_from_offer(offer: OfferFile, region: &str, os: OperatingSystem) -> Vec<CloudPlan> {
    offer
        .products
        .values()
        .filter_map(|product| plan_from_product(product, &offer.terms, region, os))
        .collect()
}

fn plan_from_product(
    product: &Product,
    terms: &Terms,
    region: &str,
    requested_os: OperatingSystem,
) -> Option<CloudPlan> {
    let attrs = &product.attributes;
    if product.product_family.as_deref() != Some("Compute Instance")
        || attrs.tenancy.as_deref() != Some("Shared")
        || attrs.pre_installed_sw.as_deref() != Some("NA")
    {
        return None;
    }

    let instance_type = attrs.instance_type.as_deref()?;
    if !ALLOWED_INSTANCE_TYPES.contains(&instance_type) {
        return None;
    }

    // Only exact Linux/Windows products; RHEL, SUSE and friends do not parse.
    let os = OperatingSystem::from_str(attrs.operating_system.as_deref()?).ok()?;
    if os == OperatingSystem::All || !requested_os.accepts(os) {
        return None;
    }

    let cpu: i32 = attrs.vcpu.as_deref()?.trim().parse().ok()?;
    let ram_gb: f64 = attrs
        .memory
        .as_deref()?
        .trim_end_matches(" GiB")
        .trim()
        .parse()
        .ok()?;

    let price_hourly = first_on_demand_usd(terms, &product.sku)?;
    if price_hourly <= 0.0 {
        return None;
    }

    let region = attrs.region_code.as_deref().unwrap_or(region);
    Some(
        CloudPlan::vm(
            CloudProvider::Aws,
            instance_type,
            region,
            cpu,
            ram_gb,
            price_hourly,
            price_hourly * HOURS_PER_MONTH,
        )
        .with_operating_system(os),
    )
}

/// USD rate of the first on-demand term's first price dimension.
fn first_on_demand_usd(terms: &Terms, sku: &str) -> Option<f64> {
    let term = terms.on_demand.get(sku)?.values().next()?;
    let dimension = term.price_dimensions.values().next()?;
    dimension.price_per_unit.get("USD")?.parse().ok()
}
