use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(info(
    title = "Cloud Pricing API",
    description = "Compute plans aggregated across cloud providers, with best-value recommendations"
))]
struct ApiInfo;

/// Document served at `/api-docs/openapi.json` and rendered at `/scalar`.
pub struct ApiDoc;

impl OpenApi for ApiDoc {
    fn openapi() -> utoipa::openapi::OpenApi {
        ApiInfo::openapi().merge_from(domain_pricing::handlers::ApiDoc::openapi())
    }
}
