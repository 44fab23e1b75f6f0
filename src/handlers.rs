//! API handlers for the Kompenzo backend

use axum::{
    extract::{Path, Query, State, WebSocketUpgrade},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::app_state::AppState;
use crate::auth::{AuthenticatedUser, AuthError};
use crate::auth::{
    ChangePasswordRequest, LoginRequest, RegisterRequest, SessionResponse, UpdateProfileRequest,
};
use crate::carrier_api::{CarrierConnection, CarrierLocation};
use crate::claim_service::ClaimError;
use crate::models::{
    ApiResponse, ClaimWithTicket, CreateClaimRequest, CreateTicketRequest, DashboardSummary,
    ListTicketsQuery, MonitorReport, RefundClaim, Ticket, UpdateClaimRequest, UpdateTicketRequest,
    User,
};
use crate::notifications::stream_events;

type ApiResult<T> = Result<Json<ApiResponse<T>>, (StatusCode, Json<ApiResponse<T>>)>;

fn failure<T>(status: StatusCode, message: impl Into<String>) -> (StatusCode, Json<ApiResponse<T>>) {
    (status, Json(ApiResponse::err(message)))
}

fn auth_failure<T>(e: AuthError) -> (StatusCode, Json<ApiResponse<T>>) {
    let status = match e {
        AuthError::EmailTaken => StatusCode::CONFLICT,
        AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
        AuthError::UserNotFound => StatusCode::NOT_FOUND,
        AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    failure(status, e.to_string())
}

pub async fn root() -> &'static str {
    "Kompenzo API Server"
}

pub async fn health_check() -> &'static str {
    "OK"
}

// ===== Auth Handlers =====

/// Register an account and open a session; monitoring starts with it
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> ApiResult<SessionResponse> {
    if let Err(e) = request.validate() {
        return Err(failure(
            StatusCode::BAD_REQUEST,
            format!("Validation error: {}", e),
        ));
    }

    match state.auth_service.register(request).await {
        Ok(session) => {
            state.monitor_scheduler.start(
                state.delay_monitor.clone(),
                session.user.id,
                state.monitor_interval_minutes,
            );
            Ok(Json(ApiResponse::ok(session)))
        }
        Err(e) => Err(auth_failure(e)),
    }
}

/// Verify credentials and open a session; monitoring starts with it
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<SessionResponse> {
    match state.auth_service.login(request).await {
        Ok(session) => {
            state.monitor_scheduler.start(
                state.delay_monitor.clone(),
                session.user.id,
                state.monitor_interval_minutes,
            );
            Ok(Json(ApiResponse::ok(session)))
        }
        Err(e) => Err(auth_failure(e)),
    }
}

/// Close the session: stop the user's delay monitoring loop
pub async fn logout(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
) -> ApiResult<serde_json::Value> {
    let stopped = state.monitor_scheduler.stop(&user_id);
    Ok(Json(ApiResponse::ok(json!({ "monitoring_stopped": stopped }))))
}

/// Current user's profile
pub async fn me(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
) -> ApiResult<User> {
    match state.auth_service.get_user(&user_id).await {
        Ok(Some(user)) => Ok(Json(ApiResponse::ok(user))),
        Ok(None) => Err(failure(StatusCode::NOT_FOUND, "User not found")),
        Err(e) => Err(auth_failure(e)),
    }
}

/// Update profile fields
pub async fn update_profile(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    Json(request): Json<UpdateProfileRequest>,
) -> ApiResult<User> {
    match state.auth_service.update_profile(&user_id, request).await {
        Ok(user) => Ok(Json(ApiResponse::ok(user))),
        Err(e) => Err(auth_failure(e)),
    }
}

/// Change the account password
pub async fn change_password(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    Json(request): Json<ChangePasswordRequest>,
) -> ApiResult<()> {
    if let Err(e) = request.validate() {
        return Err(failure(
            StatusCode::BAD_REQUEST,
            format!("Validation error: {}", e),
        ));
    }

    match state.auth_service.change_password(&user_id, request).await {
        Ok(()) => Ok(Json(ApiResponse::ok(()))),
        Err(e) => Err(auth_failure(e)),
    }
}

// ===== Ticket Handlers =====

/// Register a new ticket
pub async fn create_ticket(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    Json(request): Json<CreateTicketRequest>,
) -> ApiResult<Ticket> {
    if let Err(e) = request.validate() {
        return Err(failure(
            StatusCode::BAD_REQUEST,
            format!("Validation error: {}", e),
        ));
    }

    match state.ticket_service.create_ticket(user_id, request).await {
        Ok(ticket) => Ok(Json(ApiResponse::ok(ticket))),
        Err(e) => Err(failure(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to create ticket: {}", e),
        )),
    }
}

/// List the user's tickets with filtering and pagination
pub async fn list_tickets(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    Query(query): Query<ListTicketsQuery>,
) -> ApiResult<Vec<Ticket>> {
    match state.ticket_service.list_tickets(&user_id, query).await {
        Ok(tickets) => Ok(Json(ApiResponse::ok(tickets))),
        Err(e) => Err(failure(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to list tickets: {}", e),
        )),
    }
}

/// Get a single ticket owned by the user
pub async fn get_ticket(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Ticket> {
    match state.ticket_service.get_ticket(&id).await {
        Ok(Some(ticket)) if ticket.user_id == user_id => Ok(Json(ApiResponse::ok(ticket))),
        Ok(_) => Err(failure(StatusCode::NOT_FOUND, "Ticket not found")),
        Err(e) => Err(failure(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Database error: {}", e),
        )),
    }
}

/// Update a ticket owned by the user
pub async fn update_ticket(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateTicketRequest>,
) -> ApiResult<Ticket> {
    match state.ticket_service.get_ticket(&id).await {
        Ok(Some(ticket)) if ticket.user_id == user_id => {}
        Ok(_) => return Err(failure(StatusCode::NOT_FOUND, "Ticket not found")),
        Err(e) => {
            return Err(failure(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Database error: {}", e),
            ))
        }
    }

    match state.ticket_service.update_ticket(&id, request).await {
        Ok(Some(ticket)) => Ok(Json(ApiResponse::ok(ticket))),
        Ok(None) => Err(failure(StatusCode::NOT_FOUND, "Ticket not found")),
        Err(e) => Err(failure(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to update ticket: {}", e),
        )),
    }
}

/// Delete a ticket owned by the user
pub async fn delete_ticket(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> ApiResult<()> {
    match state.ticket_service.get_ticket(&id).await {
        Ok(Some(ticket)) if ticket.user_id == user_id => {}
        Ok(_) => return Err(failure(StatusCode::NOT_FOUND, "Ticket not found")),
        Err(e) => {
            return Err(failure(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Database error: {}", e),
            ))
        }
    }

    match state.ticket_service.delete_ticket(&id).await {
        Ok(true) => Ok(Json(ApiResponse::ok(()))),
        Ok(false) => Err(failure(StatusCode::NOT_FOUND, "Ticket not found")),
        Err(e) => Err(failure(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to delete ticket: {}", e),
        )),
    }
}

// ===== Claim Handlers =====

/// Submit a refund claim for a delayed ticket
pub async fn create_claim(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    Json(request): Json<CreateClaimRequest>,
) -> ApiResult<RefundClaim> {
    match state
        .claim_service
        .create_claim(&request.ticket_id, &user_id)
        .await
    {
        Ok(claim) => Ok(Json(ApiResponse::ok(claim))),
        Err(e @ ClaimError::TicketNotFound) => Err(failure(StatusCode::NOT_FOUND, e.to_string())),
        Err(e @ (ClaimError::NoRecordedDelay | ClaimError::NoMatchingRule)) => {
            Err(failure(StatusCode::BAD_REQUEST, e.to_string()))
        }
        Err(ClaimError::Storage(e)) => Err(failure(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to create claim: {}", e),
        )),
    }
}

/// List the user's claims with their tickets
pub async fn list_claims(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
) -> ApiResult<Vec<ClaimWithTicket>> {
    match state.claim_service.get_claims_with_tickets(&user_id).await {
        Ok(claims) => Ok(Json(ApiResponse::ok(claims))),
        Err(e) => Err(failure(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to list claims: {}", e),
        )),
    }
}

/// Get a single claim owned by the user
pub async fn get_claim(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> ApiResult<RefundClaim> {
    match state.claim_service.get_claim(&id).await {
        Ok(Some(claim)) if claim.user_id == user_id => Ok(Json(ApiResponse::ok(claim))),
        Ok(_) => Err(failure(StatusCode::NOT_FOUND, "Claim not found")),
        Err(e) => Err(failure(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Database error: {}", e),
        )),
    }
}

/// Update a claim owned by the user
pub async fn update_claim(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateClaimRequest>,
) -> ApiResult<RefundClaim> {
    match state.claim_service.get_claim(&id).await {
        Ok(Some(claim)) if claim.user_id == user_id => {}
        Ok(_) => return Err(failure(StatusCode::NOT_FOUND, "Claim not found")),
        Err(e) => {
            return Err(failure(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Database error: {}", e),
            ))
        }
    }

    match state.claim_service.update_claim(&id, request).await {
        Ok(Some(claim)) => Ok(Json(ApiResponse::ok(claim))),
        Ok(None) => Err(failure(StatusCode::NOT_FOUND, "Claim not found")),
        Err(e) => Err(failure(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to update claim: {}", e),
        )),
    }
}

/// Delete a claim owned by the user
pub async fn delete_claim(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> ApiResult<()> {
    match state.claim_service.get_claim(&id).await {
        Ok(Some(claim)) if claim.user_id == user_id => {}
        Ok(_) => return Err(failure(StatusCode::NOT_FOUND, "Claim not found")),
        Err(e) => {
            return Err(failure(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Database error: {}", e),
            ))
        }
    }

    match state.claim_service.delete_claim(&id).await {
        Ok(true) => Ok(Json(ApiResponse::ok(()))),
        Ok(false) => Err(failure(StatusCode::NOT_FOUND, "Claim not found")),
        Err(e) => Err(failure(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to delete claim: {}", e),
        )),
    }
}

// ===== Carrier Handlers =====

#[derive(Debug, Deserialize)]
pub struct LocationSearchQuery {
    pub query: String,
}

#[derive(Debug, Deserialize)]
pub struct ConnectionSearchQuery {
    pub from: String,
    pub to: String,
    pub date: NaiveDate,
}

#[derive(Debug, Deserialize)]
pub struct TrainDelayQuery {
    pub train_number: u32,
    pub date: NaiveDate,
}

/// Search carrier stations by name
pub async fn search_locations(
    State(state): State<AppState>,
    Query(query): Query<LocationSearchQuery>,
) -> Json<ApiResponse<Vec<CarrierLocation>>> {
    let locations = state.carrier_api.search_locations(&query.query).await;
    Json(ApiResponse::ok(locations))
}

/// Search connections between two locations on a date
pub async fn search_connections(
    State(state): State<AppState>,
    Query(query): Query<ConnectionSearchQuery>,
) -> Json<ApiResponse<Vec<CarrierConnection>>> {
    let connections = state
        .carrier_api
        .search_connections(&query.from, &query.to, query.date)
        .await;
    Json(ApiResponse::ok(connections))
}

/// Current carrier-reported delay for a train; 0 when unavailable
pub async fn train_delay(
    State(state): State<AppState>,
    Query(query): Query<TrainDelayQuery>,
) -> Json<ApiResponse<serde_json::Value>> {
    use crate::carrier_api::DelayProvider;

    let delay = state
        .carrier_api
        .train_delay(query.train_number, query.date)
        .await;
    Json(ApiResponse::ok(json!({ "delay": delay })))
}

// ===== Monitor Handlers =====

#[derive(Debug, Deserialize, Default)]
pub struct StartMonitoringRequest {
    pub interval_minutes: Option<u64>,
}

/// Start the periodic delay monitoring loop for the current user
pub async fn start_monitoring(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    request: Option<Json<StartMonitoringRequest>>,
) -> ApiResult<serde_json::Value> {
    let interval = request
        .and_then(|Json(body)| body.interval_minutes)
        .unwrap_or(state.monitor_interval_minutes);

    let started = state
        .monitor_scheduler
        .start(state.delay_monitor.clone(), user_id, interval);

    Ok(Json(ApiResponse::ok(json!({
        "started": started,
        "interval_minutes": interval,
    }))))
}

/// Stop the current user's monitoring loop; in-flight passes finish
pub async fn stop_monitoring(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
) -> ApiResult<serde_json::Value> {
    let stopped = state.monitor_scheduler.stop(&user_id);
    Ok(Json(ApiResponse::ok(json!({ "stopped": stopped }))))
}

/// Run one monitoring pass immediately and report its deltas
pub async fn run_monitoring_pass(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
) -> ApiResult<MonitorReport> {
    let report = state.delay_monitor.monitor_user_tickets(&user_id).await;
    Ok(Json(ApiResponse::ok(report)))
}

/// Stream monitor events (delay updates, auto-filed claims) over WebSocket
pub async fn monitor_events(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let notifier = state.notifier.clone();
    ws.on_upgrade(move |socket| stream_events(socket, notifier))
}

// ===== Analytics Handlers =====

/// Ticket and claim counts for the dashboard
pub async fn dashboard_summary(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
) -> ApiResult<DashboardSummary> {
    match state.claim_service.dashboard_summary(&user_id).await {
        Ok(summary) => Ok(Json(ApiResponse::ok(summary))),
        Err(e) => Err(failure(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to load summary: {}", e),
        )),
    }
}
