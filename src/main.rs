mod api;
mod config;
mod database;
mod graphql;
mod interactors;
mod middleware;
mod models;
mod seeds;
mod services;
mod utils;

use actix_cors::Cors;
use actix_web::{guard, middleware::Logger, web, App, HttpServer};
use api::health::StoreHealth;
use config::AppConfig;
use database::{Collections, MongoDB};
use dotenv::dotenv;
use services::Services;
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load environment variables
    dotenv().ok();

    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("❌ {}", e);
            std::process::exit(1);
        }
    };

    log::info!("🚀 Starting Greenlight API...");

    let (collections, store_health) = if config.uses_memory_store() {
        log::warn!("⚠️  Using the in-memory store, data is lost on restart");
        (Collections::memory(), StoreHealth::Memory)
    } else {
        let db = match MongoDB::new(&config.database_url).await {
            Ok(db) => db,
            Err(e) => {
                log::error!("❌ Failed to connect to MongoDB: {}", e);
                std::process::exit(1);
            }
        };
        log::info!("✅ MongoDB connected successfully");
        (Collections::mongo(&db), StoreHealth::Mongo(db))
    };

    // 🌱 Startup migrations
    if let Err(e) = seeds::run(&collections).await {
        log::error!("❌ Seeding failed: {}", e);
    }

    let host = config.host.clone();
    let port = config.port;
    let origin = config.origin.clone();

    let services = Arc::new(Services::from_config(config, collections));
    let schema = graphql::build_schema(Arc::clone(&services));

    let services_data = web::Data::new(services);
    let schema_data = web::Data::new(schema);
    let store_health = web::Data::new(store_health);

    log::info!("🌐 Server starting on {}:{}", host, port);
    log::info!("🔮 GraphQL at: http://{}:{}{}", host, port, api::graphql::GRAPHQL_PATH);
    log::info!("📚 Swagger UI available at: http://{}:{}/swagger-ui/", host, port);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin(&origin)
            .allowed_methods(vec!["GET", "POST", "OPTIONS"])
            .allowed_headers(vec![
                actix_web::http::header::AUTHORIZATION,
                actix_web::http::header::CONTENT_TYPE,
                actix_web::http::header::ACCEPT,
                actix_web::http::header::ACCEPT_LANGUAGE,
            ])
            .supports_credentials()
            .max_age(3600);

        let openapi = api::swagger::ApiDoc::openapi();

        App::new()
            .app_data(services_data.clone())
            .app_data(schema_data.clone())
            .app_data(store_health.clone())
            .wrap(cors)
            .wrap(middleware::SecurityHeaders)
            .wrap(Logger::default())
            .service(SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", openapi))
            .route("/health", web::get().to(api::health::health_check))
            .service(
                web::resource(api::graphql::GRAPHQL_PATH)
                    .route(web::post().to(api::graphql::graphql))
                    .route(
                        web::get()
                            .guard(guard::Header("upgrade", "websocket"))
                            .to(api::graphql::subscriptions),
                    )
                    .route(web::get().to(api::graphql::graphiql)),
            )
            .route("/api/contacts", web::get().to(api::contacts::list_contacts))
    })
    .bind(format!("{}:{}", host, port))?
    .run()
    .await
}
