use core_config::{AppInfo, FromEnv, app_info, server::ServerConfig};
use database::postgres::PostgresConfig;
use domain_pricing::PricingConfig;

pub use core_config::Environment;

/// Application-specific configuration
/// Composes shared config components from the `config` library
#[derive(Clone, Debug)]
pub struct Config {
    pub app: AppInfo,
    pub database: PostgresConfig,
    pub server: ServerConfig,
    pub pricing: PricingConfig,
    pub environment: Environment,
}

impl Config {
    pub fn from_env() -> eyre::Result<Self> {
        let environment = Environment::from_env();
        let database = PostgresConfig::from_env()?; // Required - will fail if not set
        let server = ServerConfig::from_env()?; // Uses defaults: HOST=0.0.0.0, PORT=8080
        let pricing = PricingConfig::from_env()?;

        Ok(Self {
            app: app_info!(),
            database,
            server,
            pricing,
            environment,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain_pricing::{PlanSource, SelectionPolicy};

    #[test]
    fn test_requires_database_url() {
        temp_env::with_var_unset("DATABASE_URL", || {
            let err = Config::from_env().unwrap_err();
            assert!(err.to_string().contains("DATABASE_URL"));
        });
    }

    #[test]
    fn test_defaults() {
        temp_env::with_vars(
            [
                ("DATABASE_URL", Some("postgresql://localhost/plans")),
                ("PORT", None),
                ("SELECTION_POLICY", None),
                ("PRICING_SOURCE", None),
                ("LLM_API_URL", None),
            ],
            || {
                let config = Config::from_env().unwrap();
                assert_eq!(config.app.name, "pricing-api");
                assert_eq!(config.server.port, 8080);
                assert_eq!(config.pricing.selection, SelectionPolicy::PerProvider);
                assert_eq!(config.pricing.source, PlanSource::Database);
            },
        );
    }

    #[test]
    fn test_llm_policy_without_url_fails() {
        temp_env::with_vars(
            [
                ("DATABASE_URL", Some("postgresql://localhost/plans")),
                ("SELECTION_POLICY", Some("llm")),
                ("LLM_API_URL", None),
            ],
            || {
                let err = Config::from_env().unwrap_err();
                assert!(err.to_string().contains("LLM_API_URL"));
            },
        );
    }
}
