use axum::{Router, middleware, routing::get};
use axum_helpers::server::{create_router, health_router};
use core_config::ConfigError;

use crate::openapi::ApiDoc;
use crate::state::AppState;

pub mod health;
pub mod pricing;

/// Creates the API routes without the `/api` prefix.
/// The `/api` prefix will be added by the `create_router` helper.
pub fn routes(state: &AppState) -> Result<Router, ConfigError> {
    Ok(Router::new().merge(pricing::router(state)?))
}

/// Creates a router with the /ready endpoint that checks the database.
pub fn ready_router(state: AppState) -> Router {
    Router::new()
        .route("/ready", get(health::ready_handler))
        .with_state(state)
}

pub fn metrics_router() -> Router {
    Router::new().route("/metrics", get(observability::metrics_handler))
}

/// The complete application: documented API routes with request metrics,
/// plus `/health`, `/ready` and `/metrics`.
pub fn app(state: AppState) -> eyre::Result<Router> {
    let router = create_router::<ApiDoc>(routes(&state)?, &state.config.server)?
        .route_layer(middleware::from_fn(observability::metrics_middleware));

    Ok(router
        .merge(health_router(state.config.app))
        .merge(ready_router(state))
        .merge(metrics_router()))
}
