//! Route definitions for the Kompenzo API

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::app_state::AppState;
use crate::handlers::*;

// Auth routes
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/me", get(me))
        .route("/api/auth/profile", put(update_profile))
        .route("/api/auth/change-password", post(change_password))
}

// Ticket routes
pub fn ticket_routes() -> Router<AppState> {
    Router::new()
        .route("/api/tickets", post(create_ticket))
        .route("/api/tickets", get(list_tickets))
        .route(
            "/api/tickets/:id",
            get(get_ticket).put(update_ticket).delete(delete_ticket),
        )
}

// Claim routes
pub fn claim_routes() -> Router<AppState> {
    Router::new()
        .route("/api/claims", post(create_claim))
        .route("/api/claims", get(list_claims))
        .route(
            "/api/claims/:id",
            get(get_claim).put(update_claim).delete(delete_claim),
        )
}

// Carrier API routes
pub fn carrier_routes() -> Router<AppState> {
    Router::new()
        .route("/api/carrier/locations", get(search_locations))
        .route("/api/carrier/connections", get(search_connections))
        .route("/api/carrier/delay", get(train_delay))
}

// Delay monitor routes
pub fn monitor_routes() -> Router<AppState> {
    Router::new()
        .route("/api/monitor/start", post(start_monitoring))
        .route("/api/monitor/stop", post(stop_monitoring))
        .route("/api/monitor/run", post(run_monitoring_pass))
        .route("/api/monitor/events", get(monitor_events))
}

// Analytics routes
pub fn analytics_routes() -> Router<AppState> {
    Router::new().route("/api/analytics/summary", get(dashboard_summary))
}

/// Routes that need no shared state, split out so they stay testable
/// without a database.
pub fn base_routes<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::util::ServiceExt;

    #[tokio::test]
    async fn health_endpoint_answers_ok() {
        let app = base_routes::<()>();

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"OK");
    }
}
