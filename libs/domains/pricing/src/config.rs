//! Environment-driven configuration for the pricing domain

use core_config::{ConfigError, FromEnv, env_optional, env_or_default, env_parse};
use std::str::FromStr;
use std::time::Duration;
use strum::{Display, EnumString};

use crate::providers::aws::AwsConfig;
use crate::providers::azure::AzureConfig;
use crate::providers::digitalocean::DigitalOceanConfig;
use crate::providers::hetzner::HetznerConfig;
use crate::providers::scaleway::ScalewayConfig;

const DEFAULT_LLM_MODEL: &str = "llama3.1";

/// Adapter endpoints, credentials and the per-adapter deadline.
#[derive(Debug, Clone)]
pub struct ProvidersConfig {
    pub aws: AwsConfig,
    pub digitalocean: DigitalOceanConfig,
    pub hetzner: HetznerConfig,
    pub scaleway: ScalewayConfig,
    pub azure: AzureConfig,
    pub timeout_secs: u64,
}

impl ProvidersConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            aws: AwsConfig::default(),
            digitalocean: DigitalOceanConfig::default(),
            hetzner: HetznerConfig::default(),
            scaleway: ScalewayConfig::default(),
            azure: AzureConfig::default(),
            timeout_secs: 30,
        }
    }
}

impl FromEnv for ProvidersConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            aws: AwsConfig::from_env()?,
            digitalocean: DigitalOceanConfig::from_env()?,
            hetzner: HetznerConfig::from_env()?,
            scaleway: ScalewayConfig::from_env()?,
            azure: AzureConfig::from_env()?,
            timeout_secs: env_parse("PROVIDER_TIMEOUT_SECS", 30)?,
        })
    }
}

/// How recommendations are picked from the candidate plans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum SelectionPolicy {
    /// Best score per provider
    #[default]
    PerProvider,
    /// Global top four by score
    Top,
    /// Delegated to an LLM endpoint
    Llm,
}

/// Where `GET /pricing` reads plans from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum PlanSource {
    #[default]
    Database,
    Live,
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl LlmConfig {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            model: DEFAULT_LLM_MODEL.to_string(),
            timeout_secs: 60,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// `None` when `LLM_API_URL` is unset.
    pub fn from_env_optional() -> Result<Option<Self>, ConfigError> {
        let Some(api_url) = env_optional("LLM_API_URL") else {
            return Ok(None);
        };

        Ok(Some(Self {
            api_url,
            model: env_or_default("LLM_MODEL", DEFAULT_LLM_MODEL),
            timeout_secs: env_parse("LLM_TIMEOUT_SECS", 60)?,
        }))
    }
}

#[derive(Debug, Clone)]
pub struct PricingConfig {
    pub providers: ProvidersConfig,
    pub selection: SelectionPolicy,
    pub llm: Option<LlmConfig>,
    pub source: PlanSource,
    pub sync_batch_size: usize,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            providers: ProvidersConfig::default(),
            selection: SelectionPolicy::default(),
            llm: None,
            source: PlanSource::default(),
            sync_batch_size: 100,
        }
    }
}

impl FromEnv for PricingConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let selection = parse_enum("SELECTION_POLICY", SelectionPolicy::default())?;
        let llm = LlmConfig::from_env_optional()?;
        if selection == SelectionPolicy::Llm && llm.is_none() {
            return Err(ConfigError::MissingEnvVar("LLM_API_URL".to_string()));
        }

        let sync_batch_size: usize = env_parse("SYNC_BATCH_SIZE", 100)?;
        if sync_batch_size == 0 {
            return Err(ConfigError::ParseError {
                key: "SYNC_BATCH_SIZE".to_string(),
                details: "must be greater than zero".to_string(),
            });
        }

        Ok(Self {
            providers: ProvidersConfig::from_env()?,
            selection,
            llm,
            source: parse_enum("PRICING_SOURCE", PlanSource::default())?,
            sync_batch_size,
        })
    }
}

fn parse_enum<T: FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    match env_optional(key) {
        Some(raw) => T::from_str(raw.trim()).map_err(|_| ConfigError::ParseError {
            key: key.to_string(),
            details: format!("unsupported value '{raw}'"),
        }),
        None => Ok(default),
    }
}
