use axum::{
    Json, Router,
    extract::State,
    response::IntoResponse,
    routing::get,
};
use axum_extra::extract::{Query, QueryRejection};
use axum_helpers::ErrorResponse;
use serde::Deserialize;
use std::str::FromStr;
use std::sync::Arc;
use utoipa::{IntoParams, OpenApi};
use validator::Validate;

use crate::{
    error::{PricingError, PricingResult},
    models::{CloudPlan, CloudProvider, OperatingSystem, PlanQuery, PlanStats, PlanType, PricingResponse},
    repository::PlanRepository,
    service::{PricingRequest, PricingService},
};

/// OpenAPI documentation for the pricing API
#[derive(OpenApi)]
#[openapi(
    paths(get_pricing, get_stats),
    components(schemas(
        CloudPlan,
        CloudProvider,
        OperatingSystem,
        PlanType,
        PricingResponse,
        PlanStats,
        ErrorResponse
    )),
    tags(
        (name = "pricing", description = "Cloud compute plan pricing and recommendations")
    )
)]
pub struct ApiDoc;

const NOT_A_NUMBER: &str = "Invalid query: cpu and ramGb must be numbers";

/// Query string of `GET /pricing`.
///
/// Numbers arrive as strings so a malformed value can be reported with a
/// stable message instead of a deserializer error.
#[derive(Debug, Default, Deserialize, IntoParams, Validate)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct PricingParams {
    /// Minimum vCPUs; fractional values round up
    #[param(value_type = Option<f64>)]
    pub cpu: Option<String>,
    /// Minimum memory in GB
    #[param(value_type = Option<f64>)]
    pub ram_gb: Option<String>,
    /// Repeatable, case-insensitive
    #[serde(default)]
    pub provider: Vec<String>,
    /// Repeatable
    #[serde(default)]
    pub region: Vec<String>,
    /// Linux, Windows or All
    pub os: Option<String>,
    /// Free-text guidance for delegated selection
    #[validate(length(max = 2000))]
    pub custom_prompt: Option<String>,
}

impl PricingParams {
    pub fn into_request(self) -> PricingResult<PricingRequest> {
        if self.validate().is_err() {
            return Err(PricingError::InvalidQuery(
                "Invalid query: customPrompt must be at most 2000 characters".into(),
            ));
        }

        let min_cpu = parse_number(self.cpu.as_deref())?
            .map(cpu_count)
            .transpose()?;
        let min_ram_gb = parse_number(self.ram_gb.as_deref())?;

        let providers = self
            .provider
            .iter()
            .flat_map(|value| value.split(','))
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(|name| {
                CloudProvider::from_str(name).map_err(|_| {
                    PricingError::InvalidQuery(format!("Invalid query: unknown provider '{name}'"))
                })
            })
            .collect::<PricingResult<Vec<_>>>()?;

        // Unset means Linux, for stored and live plans alike
        let operating_system = match self.os.as_deref().map(str::trim).filter(|os| !os.is_empty()) {
            Some(os) => OperatingSystem::from_str(os).map_err(|_| {
                PricingError::InvalidQuery(format!("Invalid query: unknown os '{os}'"))
            })?,
            None => OperatingSystem::Linux,
        };

        Ok(PricingRequest {
            query: PlanQuery {
                providers,
                regions: self.region,
                operating_system: Some(operating_system),
                min_cpu,
                min_ram_gb,
                ..PlanQuery::default()
            },
            custom_prompt: self.custom_prompt.filter(|prompt| !prompt.trim().is_empty()),
        })
    }
}

/// Blank means unset; anything else must be a finite number.
fn parse_number(value: Option<&str>) -> PricingResult<Option<f64>> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(raw) => match raw.parse::<f64>() {
            Ok(n) if n.is_finite() => Ok(Some(n)),
            _ => Err(PricingError::InvalidQuery(NOT_A_NUMBER.into())),
        },
    }
}

/// Whole vCPUs, rounded up. Values outside `i32` are rejected.
fn cpu_count(cpu: f64) -> PricingResult<i32> {
    let cpu = cpu.ceil();
    if (f64::from(i32::MIN)..=f64::from(i32::MAX)).contains(&cpu) {
        Ok(cpu as i32)
    } else {
        Err(PricingError::InvalidQuery(NOT_A_NUMBER.into()))
    }
}

/// Create Axum router for pricing endpoints
pub fn router<R>(service: PricingService<R>) -> Router
where
    R: PlanRepository + 'static,
{
    let service = Arc::new(service);

    Router::new()
        .route("/pricing", get(get_pricing))
        .route("/pricing/stats", get(get_stats))
        .with_state(service)
}

/// Recommended plans plus every other candidate matching the requirements
#[utoipa::path(
    get,
    path = "/api/pricing",
    tag = "pricing",
    params(PricingParams),
    responses(
        (status = 200, description = "Recommendations and remaining plans", body = PricingResponse),
        (status = 422, description = "Malformed query", body = ErrorResponse),
        (status = 500, description = "Store unavailable", body = ErrorResponse)
    )
)]
async fn get_pricing<R>(
    State(service): State<Arc<PricingService<R>>>,
    params: Result<Query<PricingParams>, QueryRejection>,
) -> PricingResult<impl IntoResponse>
where
    R: PlanRepository,
{
    let Query(params) = params.map_err(|e| {
        tracing::debug!(error = %e, "Rejected pricing query");
        PricingError::InvalidQuery(NOT_A_NUMBER.into())
    })?;

    let response = service.get_pricing(params.into_request()?).await?;
    Ok(Json(response))
}

/// Stored plan counts, total and per provider
#[utoipa::path(
    get,
    path = "/api/pricing/stats",
    tag = "pricing",
    responses(
        (status = 200, description = "Stored plan counts", body = PlanStats),
        (status = 500, description = "Store unavailable", body = ErrorResponse)
    )
)]
async fn get_stats<R>(
    State(service): State<Arc<PricingService<R>>>,
) -> PricingResult<impl IntoResponse>
where
    R: PlanRepository,
{
    let stats = service.stats().await?;
    Ok(Json(stats))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(cpu: Option<&str>, ram_gb: Option<&str>) -> PricingParams {
        PricingParams {
            cpu: cpu.map(Into::into),
            ram_gb: ram_gb.map(Into::into),
            ..PricingParams::default()
        }
    }

    fn message(result: PricingResult<PricingRequest>) -> String {
        match result {
            Err(PricingError::InvalidQuery(msg)) => msg,
            other => panic!("expected invalid query, got {other:?}"),
        }
    }

    #[test]
    fn test_cpu_rounds_up_and_ram_kept() {
        let request = params(Some("1.5"), Some("3.75")).into_request().unwrap();
        assert_eq!(request.query.min_cpu, Some(2));
        assert_eq!(request.query.min_ram_gb, Some(3.75));
    }

    #[test]
    fn test_blank_numbers_are_unset() {
        let request = params(Some(""), Some("  ")).into_request().unwrap();
        assert_eq!(
            request.query,
            PlanQuery {
                operating_system: Some(OperatingSystem::Linux),
                ..PlanQuery::default()
            }
        );
    }

    #[test]
    fn test_non_numeric_rejected() {
        assert_eq!(message(params(Some("two"), None).into_request()), NOT_A_NUMBER);
        assert_eq!(message(params(None, Some("NaN")).into_request()), NOT_A_NUMBER);
        assert_eq!(message(params(Some("inf"), None).into_request()), NOT_A_NUMBER);
    }

    #[test]
    fn test_cpu_outside_i32_rejected() {
        assert_eq!(message(params(Some("1e20"), None).into_request()), NOT_A_NUMBER);
        assert_eq!(message(params(Some("-1e20"), None).into_request()), NOT_A_NUMBER);
        assert_eq!(
            params(Some("2147483647"), None).into_request().unwrap().query.min_cpu,
            Some(i32::MAX)
        );
    }

    #[test]
    fn test_os_defaults_to_linux() {
        let request = PricingParams::default().into_request().unwrap();
        assert_eq!(request.query.operating_system, Some(OperatingSystem::Linux));

        let all = PricingParams {
            os: Some("all".into()),
            ..PricingParams::default()
        }
        .into_request()
        .unwrap();
        assert_eq!(all.query.operating_system, Some(OperatingSystem::All));
    }

    #[test]
    fn test_providers_case_insensitive_and_comma_separated() {
        let request = PricingParams {
            provider: vec!["aws,HETZNER".into(), "digitalocean".into()],
            ..PricingParams::default()
        }
        .into_request()
        .unwrap();

        assert_eq!(
            request.query.providers,
            vec![CloudProvider::Aws, CloudProvider::Hetzner, CloudProvider::DigitalOcean]
        );
    }

    #[test]
    fn test_unknown_provider_named_in_message() {
        let result = PricingParams {
            provider: vec!["aws".into(), "oracle".into()],
            ..PricingParams::default()
        }
        .into_request();

        assert_eq!(message(result), "Invalid query: unknown provider 'oracle'");
    }

    #[test]
    fn test_os_and_prompt() {
        let request = PricingParams {
            os: Some("windows".into()),
            custom_prompt: Some("   ".into()),
            ..PricingParams::default()
        }
        .into_request()
        .unwrap();
        assert_eq!(request.query.operating_system, Some(OperatingSystem::Windows));
        assert_eq!(request.custom_prompt, None);

        let too_long = PricingParams {
            custom_prompt: Some("x".repeat(2001)),
            ..PricingParams::default()
        };
        assert!(message(too_long.into_request()).contains("customPrompt"));
    }
}
