//! Kompenzo backend server
//!
//! Serves the ticket/claim API, proxies the carrier's public endpoints,
//! and runs per-user delay monitoring that auto-files refund claims.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    http::{header, HeaderValue, Method},
    Router,
};
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use kompenzo_server::app_state::AppState;
use kompenzo_server::auth::AuthService;
use kompenzo_server::carrier_api::CarrierApiClient;
use kompenzo_server::claim_service::ClaimService;
use kompenzo_server::config::Config;
use kompenzo_server::delay_monitor::{DelayMonitorService, MonitorScheduler};
use kompenzo_server::notifications::Notifier;
use kompenzo_server::routes;
use kompenzo_server::ticket_service::TicketService;

#[tokio::main]
async fn main() {
    // Load environment variables before anything reads them
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("kompenzo_server=info,tower_http=warn")),
        )
        .init();

    let config = Config::from_env();

    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await
        .expect("Failed to connect to database");

    let auth_service = Arc::new(AuthService::new(db_pool.clone(), config.jwt_secret.clone()));
    let ticket_service = Arc::new(TicketService::new(db_pool.clone()));
    let claim_service = Arc::new(ClaimService::new(db_pool.clone()));
    let carrier_api = Arc::new(CarrierApiClient::new(config.carrier_api_base_url.clone()));
    let notifier = Notifier::new();
    let delay_monitor = Arc::new(DelayMonitorService::new(
        ticket_service.clone(),
        claim_service.clone(),
        carrier_api.clone(),
        notifier.clone(),
    ));

    let state = AppState {
        auth_service,
        ticket_service,
        claim_service,
        carrier_api,
        delay_monitor,
        monitor_scheduler: Arc::new(MonitorScheduler::new()),
        notifier,
        jwt_secret: config.jwt_secret.clone(),
        monitor_interval_minutes: config.monitor_interval_minutes,
    };

    let app = Router::new()
        .merge(routes::base_routes())
        .merge(routes::auth_routes())
        .merge(routes::ticket_routes())
        .merge(routes::claim_routes())
        .merge(routes::carrier_routes())
        .merge(routes::monitor_routes())
        .merge(routes::analytics_routes())
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer(&config.cors_allowed_origins))
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Server starting on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listener");
    axum::serve(listener, app).await.expect("Server error");
}

fn build_cors_layer(allowed_origins: &str) -> CorsLayer {
    let allowed_origins = allowed_origins
        .split(',')
        .filter_map(|origin| origin.trim().parse::<HeaderValue>().ok())
        .collect::<Vec<_>>();

    CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .allow_credentials(false)
}
