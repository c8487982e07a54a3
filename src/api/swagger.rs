use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Greenlight API",
        version = "1.0.0",
        description = "REST endpoints of the Greenlight case-management API.\n\nThe main surface is GraphQL at `/api/graphql` (POST for operations, GET for GraphiQL, websocket upgrade for subscriptions). Most operations require a JWT Bearer token."
    ),
    paths(
        crate::api::health::health_check,
        crate::api::contacts::list_contacts,
    ),
    components(
        schemas(
            crate::api::health::HealthResponse,
            crate::api::contacts::ContactSummary,
            crate::api::contacts::ContactListResponse,
        )
    ),
    tags(
        (name = "Health", description = "Service and database health."),
        (name = "Contacts", description = "Sample REST listing, independent of the GraphQL data."),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("Token returned by the authenticate mutation"))
                        .build(),
                ),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn documents_rest_paths() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/health"));
        assert!(doc.paths.paths.contains_key("/api/contacts"));
    }
}
