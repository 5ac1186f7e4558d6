//! Configuration for the sync job

use core_config::{Environment, FromEnv};
use database::postgres::PostgresConfig;
use domain_pricing::PricingConfig;

#[derive(Debug, Clone)]
pub struct Config {
    pub environment: Environment,
    pub pricing: PricingConfig,
}

impl Config {
    /// Provider and batch settings; the database is loaded separately
    /// because `preview` never connects.
    pub fn from_env() -> eyre::Result<Self> {
        Ok(Self {
            environment: Environment::from_env(),
            pricing: PricingConfig::from_env()?,
        })
    }

    pub fn database() -> eyre::Result<PostgresConfig> {
        Ok(PostgresConfig::from_env()?)
    }
}
