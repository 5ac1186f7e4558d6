//! Provider adapters
//!
//! One small adapter per cloud provider, each translating a public pricing
//! API into [`CloudPlan`] records. Adapters are registered in a
//! [`ProviderRegistry`] and fanned out by the aggregator.

pub mod aws;
pub mod azure;
pub mod digitalocean;
pub mod hetzner;
pub mod scaleway;

use async_trait::async_trait;
use observability::PricingMetrics;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::time::Instant;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::config::ProvidersConfig;
use crate::models::{CloudPlan, CloudProvider, OperatingSystem, PlanQuery};

pub use aws::AwsProvider;
pub use azure::AzureProvider;
pub use digitalocean::DigitalOceanProvider;
pub use hetzner::HetznerProvider;
pub use scaleway::ScalewayProvider;

/// Error type for adapter fetches; never leaves [`PlanProvider::plans`].
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} returned HTTP {status}")]
    Status { status: u16, url: String },

    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// Holds the name of the missing credential variable
    #[error("{0} not set")]
    NotConfigured(&'static str),
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Optional hints passed to every adapter. Empty means "no hint".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchFilters {
    pub regions: Vec<String>,
    pub operating_system: OperatingSystem,
    pub instance_types: Vec<String>,
    pub include_gpu: bool,
}

impl FetchFilters {
    /// Requested regions, or the adapter's defaults when none were given.
    pub fn regions_or(&self, defaults: &[String]) -> Vec<String> {
        if self.regions.is_empty() {
            defaults.to_vec()
        } else {
            self.regions.clone()
        }
    }

    pub fn wants_region(&self, region: &str) -> bool {
        self.regions.is_empty() || self.regions.iter().any(|r| r == region)
    }

    pub fn wants_instance_type(&self, name: &str) -> bool {
        self.instance_types.is_empty() || self.instance_types.iter().any(|t| t == name)
    }
}

impl From<&PlanQuery> for FetchFilters {
    fn from(query: &PlanQuery) -> Self {
        Self {
            regions: query.regions.clone(),
            operating_system: query.operating_system.unwrap_or_default(),
            instance_types: query.instance_types.clone(),
            include_gpu: query.include_gpu,
        }
    }
}

/// A provider-specific pricing source.
#[async_trait]
pub trait PlanProvider: Send + Sync {
    fn provider(&self) -> CloudProvider;

    /// False when a required credential is missing.
    fn is_configured(&self) -> bool {
        true
    }

    /// Regions (or zones) fetched when no region hint is given.
    fn default_regions(&self) -> Vec<String>;

    /// Raw fetch; may fail.
    async fn fetch_plans(&self, filters: &FetchFilters) -> ProviderResult<Vec<CloudPlan>>;

    /// Fetch that never fails: errors are logged and yield no plans.
    ///
    /// Also drops any plan that breaks the positive price/capacity invariant
    /// or misses the instance-type hint.
    async fn plans(&self, filters: &FetchFilters) -> Vec<CloudPlan> {
        let provider = self.provider();
        let start = Instant::now();

        match self.fetch_plans(filters).await {
            Ok(plans) => {
                let plans: Vec<CloudPlan> = plans
                    .into_iter()
                    .filter(|p| p.is_valid() && filters.wants_instance_type(&p.name))
                    .collect();
                let elapsed = start.elapsed();
                info!(
                    provider = %provider,
                    count = plans.len(),
                    duration_ms = elapsed.as_millis() as u64,
                    "Fetched plans"
                );
                PricingMetrics::record_provider_fetch(
                    &provider.to_string(),
                    plans.len(),
                    elapsed.as_secs_f64(),
                );
                plans
            }
            Err(ProviderError::NotConfigured(var)) => {
                warn!(provider = %provider, "{var} not set, skipping {provider} pricing");
                PricingMetrics::record_provider_failure(&provider.to_string(), "not_configured");
                Vec::new()
            }
            Err(e) => {
                error!(provider = %provider, error = %e, "Failed to fetch plans");
                PricingMetrics::record_provider_failure(&provider.to_string(), "error");
                Vec::new()
            }
        }
    }
}

/// Lookup table of adapters, kept in registration order.
pub struct ProviderRegistry {
    providers: Vec<Box<dyn PlanProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
        }
    }

    /// The five live adapters sharing one HTTP client.
    pub fn from_config(config: &ProvidersConfig, client: reqwest::Client) -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(AwsProvider::new(config.aws.clone(), client.clone())));
        registry.register(Box::new(DigitalOceanProvider::new(
            config.digitalocean.clone(),
            client.clone(),
        )));
        registry.register(Box::new(HetznerProvider::new(config.hetzner.clone(), client.clone())));
        registry.register(Box::new(ScalewayProvider::new(
            config.scaleway.clone(),
            client.clone(),
        )));
        registry.register(Box::new(AzureProvider::new(config.azure.clone(), client)));
        registry
    }

    /// Register an adapter, replacing any previous one for the same provider.
    pub fn register(&mut self, adapter: Box<dyn PlanProvider>) {
        let provider = adapter.provider();
        match self.providers.iter().position(|p| p.provider() == provider) {
            Some(index) => self.providers[index] = adapter,
            None => self.providers.push(adapter),
        }
    }

    pub fn get(&self, provider: CloudProvider) -> Option<&dyn PlanProvider> {
        self.providers
            .iter()
            .find(|p| p.provider() == provider)
            .map(|p| p.as_ref())
    }

    /// Adapters for `requested`, or all of them when `requested` is empty.
    /// Providers without an adapter are skipped.
    pub fn select(&self, requested: &[CloudProvider]) -> Vec<&dyn PlanProvider> {
        self.providers
            .iter()
            .filter(|p| requested.is_empty() || requested.contains(&p.provider()))
            .map(|p| p.as_ref())
            .collect()
    }

    pub fn all(&self) -> impl Iterator<Item = &dyn PlanProvider> {
        self.providers.iter().map(|p| p.as_ref())
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Send `request` and decode a JSON body; non-2xx is an error.
pub(crate) async fn fetch_json<T: DeserializeOwned>(
    request: reqwest::RequestBuilder,
) -> ProviderResult<T> {
    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(ProviderError::Status {
            status: status.as_u16(),
            url: response.url().to_string(),
        });
    }

    let body = response.bytes().await?;
    serde_json::from_slice(&body).map_err(|e| ProviderError::Parse(e.to_string()))
}

/// Fetch region by region; a failing region is logged and skipped so the
/// others still contribute.
pub(crate) async fn per_region<F, Fut>(
    provider: CloudProvider,
    regions: Vec<String>,
    mut fetch: F,
) -> Vec<CloudPlan>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = ProviderResult<Vec<CloudPlan>>>,
{
    let mut plans = Vec::new();
    for region in regions {
        match fetch(region.clone()).await {
            Ok(mut found) => plans.append(&mut found),
            Err(e) => {
                warn!(provider = %provider, region = %region, error = %e, "Region fetch failed, skipping");
            }
        }
    }
    plans
}

/// Trim a configured base URL so paths can be appended with `/`.
pub(crate) fn base_url(url: &str) -> &str {
    url.trim_end_matches('/')
}
