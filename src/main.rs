mod api;
mod config;
mod database;
mod jobs;
mod middleware;
mod models;
mod seeds;
mod services;
mod utils;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use dotenv::dotenv;
use std::io::{Error, ErrorKind};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::AppConfig;
use crate::utils::AppError;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load environment variables
    dotenv().ok();

    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    api::metrics::mark_started();

    let config = AppConfig::from_env().map_err(|e| {
        log::error!("❌ Configuration error: {}", e);
        Error::new(ErrorKind::InvalidInput, e)
    })?;

    log::info!("🚀 Starting aQRo Service...");

    // Initialize MongoDB connection
    let db = database::MongoDB::new(&config.database_url).await.map_err(|e| {
        log::error!("❌ Failed to connect to MongoDB: {}", e);
        Error::new(ErrorKind::ConnectionRefused, e.to_string())
    })?;
    log::info!("✅ MongoDB connected successfully");

    let db_data = web::Data::new(db.clone());

    // 🌱 Seeds
    seeds::container_types_seed::seed_default_container_types(&db).await;
    seeds::container_types_seed::seed_admin(&db, &config).await;

    // 🧭 Background jobs
    jobs::abandoned_sweep::start_abandoned_sweep(db.clone(), config.lost_after_days);

    let bind_address = config.bind_address();
    log::info!("🌐 Server starting on {}", bind_address);
    log::info!("📚 Swagger UI available at: http://{}/swagger-ui/", bind_address);
    log::info!("📄 OpenAPI spec at: http://{}/api-docs/openapi.json", bind_address);

    let allowed_origins = config.allowed_origins.clone();

    // Start HTTP server
    HttpServer::new(move || {
        let cors = allowed_origins
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
            .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
            .allowed_headers(vec![
                actix_web::http::header::AUTHORIZATION,
                actix_web::http::header::CONTENT_TYPE,
                actix_web::http::header::ACCEPT,
                actix_web::http::header::CACHE_CONTROL,
            ])
            .expose_headers(vec![
                actix_web::http::header::CONTENT_TYPE,
            ])
            .supports_credentials()
            .max_age(3600);

        // Malformed bodies/queries use the same JSON error envelope as the handlers
        let json_config = web::JsonConfig::default()
            .error_handler(|err, _req| AppError::InvalidRequest(err.to_string()).into());
        let query_config = web::QueryConfig::default()
            .error_handler(|err, _req| AppError::InvalidRequest(err.to_string()).into());

        let openapi = api::swagger::ApiDoc::openapi();

        App::new()
            .app_data(db_data.clone())
            .app_data(json_config)
            .app_data(query_config)
            .wrap(cors)
            .wrap(middleware::SecurityHeaders)
            .wrap(Logger::default())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", openapi)
            )
            // Health check
            .route("/health", web::get().to(api::health::health_check))
            // Metrics
            .route("/metrics", web::get().to(api::metrics::get_metrics))
            // Auth endpoints
            .service(
                web::scope("/api/v1/auth")
                    .route("/login", web::post().to(api::auth::login))
                    .route("/register", web::post().to(api::auth::register))
                    .route("/refresh", web::post().to(api::auth::refresh_token))
                    .route("/verify", web::get().to(api::auth::verify_token))
                    .service(
                        web::resource("/me")
                            .wrap(middleware::auth::AuthMiddleware)
                            .route(web::get().to(api::auth::get_me))
                    )
            )

            // ==================== CATALOG ====================

            .service(
                web::scope("/api/v1/restaurants")
                    .wrap(middleware::auth::AuthMiddleware)
                    .service(api::restaurants::get_restaurants)
                    .service(api::restaurants::get_restaurant)
                    .service(api::restaurants::create_restaurant)
                    .service(api::restaurants::update_restaurant)
                    .service(api::restaurants::delete_restaurant)
                    .service(api::restaurants::set_rebate)
                    .service(api::restaurants::remove_rebate)
            )
            .service(
                web::scope("/api/v1/container-types")
                    .wrap(middleware::auth::AuthMiddleware)
                    .service(api::container_types::get_container_types)
                    .service(api::container_types::get_container_type)
                    .service(api::container_types::create_container_type)
                    .service(api::container_types::update_container_type)
                    .service(api::container_types::delete_container_type)
            )

            // ==================== CONTAINER LIFECYCLE ====================

            .service(
                web::scope("/api/v1/containers")
                    .wrap(middleware::auth::AuthMiddleware)
                    .service(api::containers::get_containers)
                    .service(api::containers::get_container_stats)
                    .service(api::containers::get_container_by_qr)
                    .service(api::containers::get_container) // depois de /stats e /qr
                    .service(api::containers::generate_containers)
                    .service(api::containers::register_container)
                    .service(api::containers::process_rebate)
                    .service(api::containers::update_container_status)
                    .service(api::containers::delete_container)
            )

            // ==================== ACCOUNTS ====================

            .service(
                web::scope("/api/v1/users")
                    .wrap(middleware::auth::AuthMiddleware)
                    .service(api::users::get_users)
                    .service(api::users::get_user)
                    .service(api::users::get_user_summary)
                    .service(api::users::create_user)
                    .service(api::users::update_user)
                    .service(api::users::delete_user)
            )
            .service(
                web::scope("/api/v1/activities")
                    .wrap(middleware::auth::AuthMiddleware)
                    .service(api::activities::get_activities)
                    .service(api::activities::create_activity)
                    .service(api::activities::delete_activity)
            )
            .service(
                web::scope("/api/v1/chat-history")
                    .wrap(middleware::auth::AuthMiddleware)
                    .service(api::chat_histories::get_chat_history)
                    .service(api::chat_histories::append_chat_message)
                    .service(api::chat_histories::clear_chat_history)
            )
    })
    .bind(bind_address)?
    .run()
    .await
}
