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
use middleware::{AuthMiddleware, RateLimit};
use services::{
    email_service::{LogMailer, Mailer, SmtpMailer},
    genius_service::GeniusClient,
    spotify_service::SpotifyClient,
    storage_service::{ObjectStorage, MAX_IMAGE_BYTES},
};
use std::sync::Arc;
use std::time::Duration;
use utils::RateLimiter;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

fn build_mailer(config: &config::AppConfig) -> Arc<dyn Mailer> {
    match &config.smtp {
        Some(smtp) => match SmtpMailer::new(smtp) {
            Ok(mailer) => {
                log::info!("📧 SMTP mailer ready ({}:{})", smtp.host, smtp.port);
                Arc::new(mailer)
            }
            Err(e) => {
                log::error!("❌ SMTP setup failed, OTP codes will only be logged: {}", e);
                Arc::new(LogMailer)
            }
        },
        None => {
            log::warn!("⚠️  SMTP_HOST not set, OTP codes will only be logged");
            Arc::new(LogMailer)
        }
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load environment variables
    dotenv().ok();

    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = config::AppConfig::from_env().map_err(|e| {
        log::error!("❌ {}", e);
        std::io::Error::other(e.to_string())
    })?;

    log::info!("🚀 Starting Musical Odyssey...");

    // Initialize MongoDB connection
    let db = database::MongoDB::new(&config.database_url).await.map_err(|e| {
        log::error!("❌ Failed to connect to MongoDB: {}", e);
        std::io::Error::other(e.to_string())
    })?;
    log::info!("✅ MongoDB connected successfully");

    // 🌱 Promote the configured admin account
    seeds::admin_seed::promote_configured_admin(&db, &config).await;

    // 📅 Background jobs
    jobs::user_growth_job::start_user_growth_job(db.clone()).await;

    let spotify = SpotifyClient::new(config.spotify.clone());
    if !spotify.is_configured() {
        log::warn!("⚠️  SPOTIFY_CLIENT_ID/SPOTIFY_CLIENT_SECRET not set, catalog routes will fail");
    }

    let db_data = web::Data::new(db);
    let spotify_data = web::Data::new(spotify);
    let genius_data = web::Data::new(GeniusClient::new(config.genius.clone()));
    let storage_data = web::Data::new(ObjectStorage::new(config.storage.clone()));
    let mailer_data: web::Data<dyn Mailer> = web::Data::from(build_mailer(&config));
    let limiter_data = web::Data::new(RateLimiter::new(
        config.rate_limit.max_requests,
        Duration::from_secs(config.rate_limit.window_secs),
    ));

    if config.rate_limit.trust_proxy {
        log::info!("🚦 Rate limiter keys clients on forwarded headers (RATE_LIMIT_TRUST_PROXY)");
    }

    let bind_address = config.bind_address();
    let config_data = web::Data::new(config);

    log::info!("🌐 Server starting on {}", bind_address);
    log::info!("📚 Swagger UI available at: http://{}/swagger-ui/", bind_address);
    log::info!("📄 OpenAPI spec at: http://{}/api-docs/openapi.json", bind_address);

    // Start HTTP server
    HttpServer::new(move || {
        let mut cors = Cors::default()
            .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
            .allowed_headers(vec![
                actix_web::http::header::AUTHORIZATION,
                actix_web::http::header::CONTENT_TYPE,
                actix_web::http::header::ACCEPT,
                actix_web::http::header::CACHE_CONTROL,
            ])
            .expose_headers(vec![
                actix_web::http::header::CONTENT_TYPE,
                actix_web::http::header::RETRY_AFTER,
            ])
            .supports_credentials()
            .max_age(3600);
        for origin in &config_data.cors_origins {
            cors = cors.allowed_origin(origin);
        }

        let auth_limit = RateLimit::new(limiter_data.clone().into_inner())
            .trust_forwarded(config_data.rate_limit.trust_proxy);

        // Generate OpenAPI specification
        let openapi = api::swagger::ApiDoc::openapi();

        App::new()
            .app_data(config_data.clone())
            .app_data(db_data.clone())
            .app_data(spotify_data.clone())
            .app_data(genius_data.clone())
            .app_data(storage_data.clone())
            .app_data(mailer_data.clone())
            .app_data(limiter_data.clone())
            .app_data(api::json_config())
            .app_data(api::query_config())
            .app_data(api::path_config())
            .wrap(cors)
            .wrap(middleware::SecurityHeaders)
            .wrap(middleware::RequestMetrics)
            .wrap(Logger::default())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", openapi.clone())
            )
            // Health check
            .route("/health", web::get().to(api::health::health_check))
            // Metrics
            .route("/metrics", web::get().to(api::metrics::get_metrics))
            // Auth endpoints
            .service(
                web::scope("/api/v1/auth")
                    .service(
                        web::resource("/me")
                            .wrap(AuthMiddleware::user())
                            .route(web::get().to(api::auth::get_me))
                    )
                    .service(
                        web::resource("/delete-account")
                            .wrap(AuthMiddleware::user())
                            .route(web::delete().to(api::auth::delete_account))
                    )
                    // Credential endpoints, rate limited per client address
                    .service(
                        web::scope("")
                            .wrap(auth_limit)
                            .route("/register", web::post().to(api::auth::register))
                            .route("/verify-otp", web::post().to(api::auth::verify_otp))
                            .route("/resend-otp", web::post().to(api::auth::resend_otp))
                            .route("/login", web::post().to(api::auth::login))
                            .route("/refresh", web::post().to(api::auth::refresh_token))
                    )
            )
            // Profile
            .service(
                web::scope("/api/v1/profile")
                    .wrap(AuthMiddleware::user())
                    .route("", web::put().to(api::profile::update_profile))
                    .service(
                        web::resource("/image")
                            .app_data(web::PayloadConfig::new(MAX_IMAGE_BYTES))
                            .route(web::post().to(api::profile::upload_image))
                    )
            )
            // ==================== MUSIC CATALOG ====================
            .service(
                web::scope("/api/v1/catalog")
                    .wrap(AuthMiddleware::user())
                    .route("/search", web::get().to(api::catalog::search_albums))
                    .route("/albums/{id}", web::get().to(api::catalog::get_album))
                    .route("/playlists/{id}", web::get().to(api::catalog::get_playlist))
            )
            .service(
                web::scope("/api/v1/lyrics")
                    .wrap(AuthMiddleware::user())
                    .route("/search", web::get().to(api::lyrics::search))
                    .route("/songs/{id}", web::get().to(api::lyrics::song_credits))
            )
            // ==================== RATINGS ====================
            .service(
                web::scope("/api/v1/ratings")
                    .wrap(AuthMiddleware::user())
                    .route("", web::post().to(api::ratings::submit_rating))
                    .route("", web::get().to(api::ratings::list_ratings))
                    .route("/{album_id}", web::get().to(api::ratings::get_rating))
                    .route("/{album_id}", web::put().to(api::ratings::update_rating))
                    .route("/{album_id}", web::delete().to(api::ratings::delete_rating))
                    .route("/{album_id}/history", web::get().to(api::ratings::rating_history))
            )
            .service(
                web::scope("/api/v1/artists")
                    .wrap(AuthMiddleware::user())
                    .route("", web::get().to(api::artists::list_artists))
            )
            // ==================== PLAYLISTS & RANKINGS ====================
            .service(
                web::scope("/api/v1/playlists")
                    .wrap(AuthMiddleware::user())
                    .route("/predefined", web::get().to(api::playlists::list_predefined))
                    .route("", web::get().to(api::playlists::list_mine))
                    .route("", web::post().to(api::playlists::link_playlist))
                    .route("/{id}", web::delete().to(api::playlists::delete_playlist))
            )
            .service(
                web::scope("/api/v1/rankings")
                    .wrap(AuthMiddleware::user())
                    .route("", web::post().to(api::rankings::submit_ranking))
                    .route("/{list_type}", web::get().to(api::rankings::latest_ranking))
                    .route("/{list_type}/history", web::get().to(api::rankings::ranking_history))
            )
            // ==================== ADMIN ====================
            .service(
                web::scope("/api/v1/admin")
                    .wrap(AuthMiddleware::admin())
                    .route("/users", web::get().to(api::admin::list_users))
                    .route("/users/{omid}/admin", web::put().to(api::admin::set_admin))
                    .route("/users/{omid}", web::delete().to(api::admin::delete_user))
                    .route("/analytics", web::get().to(api::admin::analytics))
                    .route("/playlists", web::post().to(api::admin::create_predefined_playlist))
            )
    })
    .bind(bind_address)?
    .run()
    .await
}
