mod config;
mod db;
mod dtos;
mod error;
mod handler;
mod mail;
mod middleware;
mod models;
mod routes;
mod tracing_config;
mod utils;

use axum::{
    Router,
    http::{
        HeaderName, HeaderValue, Method,
        header::{ACCEPT, AUTHORIZATION, CACHE_CONTROL, CONTENT_TYPE},
    },
};
use config::Config;
use db::DBClient;
use dotenv::dotenv;
use error::{ErrorMessage, HttpError};
use mail::sendmail::EmailService;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use utils::token::TokenService;

#[derive(Clone)]
pub struct AppState {
    pub env: Arc<Config>,
    /// `None` when the store could not be reached at startup.
    pub db_client: Option<DBClient>,
    pub mailer: EmailService,
    pub tokens: TokenService,
}

impl AppState {
    /// The store, or 503 when the server is running without one.
    pub fn db(&self) -> Result<&DBClient, HttpError> {
        self.db_client.as_ref().ok_or_else(|| {
            HttpError::service_unavailable(ErrorMessage::DatabaseUnavailable.to_string())
        })
    }
}

fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("Ignoring invalid CORS origin {:?}: {}", origin, e);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            AUTHORIZATION,
            ACCEPT,
            CONTENT_TYPE,
            CACHE_CONTROL,
            HeaderName::from_static("x-requested-with"),
        ])
}

/// The router with CORS on top. The OPTIONS layer sits outside CORS so it
/// also rewrites preflight answers.
fn build_app(app_state: AppState) -> Router {
    let cors = cors_layer(&app_state.env);
    routes::create_router(app_state)
        .layer(cors)
        .layer(axum::middleware::from_fn(middleware::options_no_content))
}

#[tokio::main]
async fn main() {
    dotenv().ok();

    let _guard = tracing_config::init_tracing();

    let config = Config::init();

    let db_client = match db::connect_with_retry(&config.database_url).await {
        Some(pool) => {
            let report = db::migrate::run_migrations(&pool).await;
            tracing::info!(
                applied = report.applied.len(),
                skipped = report.skipped.len(),
                failed = report.failed.len(),
                "Migrations finished"
            );
            Some(DBClient::new(pool))
        }
        None => {
            tracing::error!("Starting without a database, store-backed endpoints will answer 503");
            None
        }
    };

    // Held for the life of the process so the cleanup job keeps running.
    let _scheduler = match &db_client {
        Some(db_client) => match db_client.start_cleanup_task().await {
            Ok(scheduler) => Some(scheduler),
            Err(e) => {
                tracing::error!("Failed to start cleanup scheduler: {:?}", e);
                None
            }
        },
        None => None,
    };

    let mailer = match EmailService::from_config(&config) {
        Ok(mailer) => mailer,
        Err(e) => {
            tracing::error!("Invalid mail configuration: {}", e);
            std::process::exit(1);
        }
    };

    let app_state = AppState {
        env: Arc::new(config.clone()),
        db_client,
        mailer,
        tokens: TokenService::new(&config.jwt_secret, config.jwt_maxage),
    };

    let app = build_app(app_state);

    let addr = format!("{}:{}", config.server_host, config.port);
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    tracing::info!("Server is running on http://{}", addr);

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Server error: {}", e);
    }
}

#[cfg(test)]
impl AppState {
    pub(crate) fn for_tests(db_client: Option<DBClient>) -> Self {
        let config = Config::for_tests();
        AppState {
            mailer: EmailService::from_config(&config).unwrap(),
            tokens: TokenService::new(&config.jwt_secret, config.jwt_maxage),
            env: Arc::new(config),
            db_client,
        }
    }
}
