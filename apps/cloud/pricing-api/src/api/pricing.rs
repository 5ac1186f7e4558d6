use axum::Router;
use core_config::ConfigError;
use domain_pricing::{
    Aggregator, PgPlanRepository, PricingService, ProviderRegistry, handlers,
    selector::selector_from_config,
};
use std::sync::Arc;

use crate::state::AppState;

/// Wire adapters, selector and the Postgres store into the pricing service.
pub fn service(state: &AppState) -> Result<PricingService<PgPlanRepository>, ConfigError> {
    let pricing = &state.config.pricing;

    let registry = ProviderRegistry::from_config(&pricing.providers, state.http.clone());
    let aggregator = Aggregator::new(registry, pricing.providers.timeout());
    let selector = selector_from_config(pricing, state.http.clone())?;
    let repository = PgPlanRepository::new(state.db.clone()).with_batch_size(pricing.sync_batch_size);

    tracing::info!(
        providers = aggregator.registry().len(),
        selection = %pricing.selection,
        source = %pricing.source,
        "Pricing service ready"
    );

    Ok(PricingService::new(aggregator, Arc::new(repository), selector, pricing.source))
}

pub fn router(state: &AppState) -> Result<Router, ConfigError> {
    Ok(handlers::router(service(state)?))
}
