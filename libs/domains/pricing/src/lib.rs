//! Cloud Pricing Domain
//!
//! Aggregates compute pricing from several cloud providers into one
//! [`CloudPlan`] shape, recommends best-value plans and keeps a flat
//! PostgreSQL copy refreshed by a sync job.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐
//! │  Handlers   │  ← GET /pricing, GET /pricing/stats
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐     ┌────────────┐
//! │   Service   │ ──► │  Selector  │  ← per-provider, top-N or delegated
//! └──┬───────┬──┘     └────────────┘
//!    │       │
//! ┌──▼───┐ ┌─▼──────────┐
//! │ Repo │ │ Aggregator │  ← concurrent fan-out with per-adapter deadline
//! └──────┘ └─┬──────────┘
//!            │
//!     ┌──────▼──────┐
//!     │  Providers  │  ← AWS, DigitalOcean, Hetzner, Scaleway, Azure
//!     └─────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use domain_pricing::{
//!     Aggregator, PgPlanRepository, PricingConfig, PricingService, ProviderRegistry,
//!     handlers, selector::selector_from_config,
//! };
//! use std::sync::Arc;
//!
//! # async fn example(db: sea_orm::DatabaseConnection) -> Result<(), Box<dyn std::error::Error>> {
//! let config = PricingConfig::default();
//! let client = reqwest::Client::new();
//!
//! let registry = ProviderRegistry::from_config(&config.providers, client.clone());
//! let aggregator = Aggregator::new(registry, config.providers.timeout());
//! let selector = selector_from_config(&config, client)?;
//!
//! let service = PricingService::new(
//!     aggregator,
//!     Arc::new(PgPlanRepository::new(db)),
//!     selector,
//!     config.source,
//! );
//! let router = handlers::router(service);
//! # Ok(())
//! # }
//! ```

pub mod aggregator;
pub mod config;
pub mod entity;
pub mod error;
pub mod handlers;
pub mod models;
pub mod postgres;
pub mod providers;
pub mod repository;
pub mod selector;
pub mod service;
pub mod sync;

// Re-export commonly used types
pub use aggregator::Aggregator;
pub use config::{LlmConfig, PlanSource, PricingConfig, ProvidersConfig, SelectionPolicy};
pub use error::{PricingError, PricingResult};
pub use models::{
    CloudPlan, CloudProvider, OperatingSystem, PlanQuery, PlanStats, PlanType, PricingResponse,
};
pub use postgres::PgPlanRepository;
pub use providers::{PlanProvider, ProviderRegistry};
pub use repository::{InMemoryPlanRepository, PlanRepository};
pub use selector::PlanSelector;
pub use service::{PricingRequest, PricingService, ProviderStatus};
pub use sync::{PlanSync, SyncOptions, SyncReport};
