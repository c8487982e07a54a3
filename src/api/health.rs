use crate::database::MongoDB;
use actix_web::{web, HttpResponse, Responder};
use serde::{Deserialize, Serialize};

/// Storage backing the running server, reported by `/health`.
#[derive(Clone)]
pub enum StoreHealth {
    Mongo(MongoDB),
    Memory,
}

impl StoreHealth {
    async fn database(&self) -> &'static str {
        match self {
            StoreHealth::Mongo(db) if db.health_check().await => "connected",
            StoreHealth::Mongo(_) => "unreachable",
            StoreHealth::Memory => "memory",
        }
    }
}

#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub database: String,
    pub timestamp: i64,
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
        (status = 503, description = "Database unreachable", body = HealthResponse)
    )
)]
pub async fn health_check(store: web::Data<StoreHealth>) -> impl Responder {
    let database = store.database().await;
    let healthy = database != "unreachable";
    let body = HealthResponse {
        status: if healthy { "healthy" } else { "degraded" }.to_string(),
        service: "greenlight-api".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: database.to_string(),
        timestamp: chrono::Utc::now().timestamp(),
    };
    if healthy {
        HttpResponse::Ok().json(body)
    } else {
        log::warn!("⚠️  Health check degraded: database unreachable");
        HttpResponse::ServiceUnavailable().json(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test, App};

    #[actix_rt::test]
    async fn memory_store_reports_healthy() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(StoreHealth::Memory))
                .route("/health", web::get().to(health_check)),
        )
        .await;
        let response: HealthResponse =
            test::call_and_read_body_json(&app, test::TestRequest::get().uri("/health").to_request()).await;
        assert_eq!(response.status, "healthy");
        assert_eq!(response.database, "memory");
    }
}
