use crate::graphql::AppSchema;
use crate::middleware::auth::{bearer_token, context_for_request, context_for_token};
use crate::services::Services;
use actix_web::{web, HttpRequest, HttpResponse};
use async_graphql::http::GraphiQLSource;
use async_graphql::Data;
use async_graphql_actix_web::{GraphQLRequest, GraphQLResponse, GraphQLSubscription};
use serde_json::Value;
use std::sync::Arc;

pub const GRAPHQL_PATH: &str = "/api/graphql";

pub async fn graphql(
    schema: web::Data<AppSchema>,
    services: web::Data<Arc<Services>>,
    req: HttpRequest,
    request: GraphQLRequest,
) -> GraphQLResponse {
    let ctx = context_for_request(&services, &req).await;
    schema.execute(request.into_inner().data(ctx)).await.into()
}

pub async fn graphiql() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(
            GraphiQLSource::build()
                .endpoint(GRAPHQL_PATH)
                .subscription_endpoint(GRAPHQL_PATH)
                .finish(),
        )
}

/// Token sent in the websocket `connection_init` payload. Clients send
/// either `authToken`, an `Authorization` header value, or the same nested
/// under `headers`.
pub fn connection_token(payload: &Value) -> Option<String> {
    let field = |v: &Value, key: &str| v.get(key).and_then(Value::as_str).map(str::to_string);
    if let Some(token) = field(payload, "authToken").filter(|t| !t.is_empty()) {
        return Some(token);
    }
    let header = field(payload, "Authorization")
        .or_else(|| field(payload, "authorization"))
        .or_else(|| payload.get("headers").and_then(|h| field(h, "Authorization")));
    header.and_then(|h| bearer_token(Some(&h)).map(str::to_string))
}

pub async fn subscriptions(
    schema: web::Data<AppSchema>,
    services: web::Data<Arc<Services>>,
    req: HttpRequest,
    payload: web::Payload,
) -> actix_web::Result<HttpResponse> {
    let services = Arc::clone(services.get_ref());
    let accept_language = req
        .headers()
        .get("Accept-Language")
        .and_then(|v| v.to_str().ok());
    let locale = services.localization.negotiate(accept_language);

    GraphQLSubscription::new(AppSchema::clone(&schema))
        .on_connection_init(move |value| async move {
            let token = connection_token(&value);
            let ctx = context_for_token(&services, token.as_deref(), locale).await;
            if ctx.identity.is_none() {
                log::debug!("Anonymous websocket connection");
            }
            let mut data = Data::default();
            data.insert(ctx);
            Ok::<_, async_graphql::Error>(data)
        })
        .start(&req, payload)
}
