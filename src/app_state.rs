//! Application state shared across handlers

use std::sync::Arc;

use axum::extract::FromRef;

use crate::auth::AuthService;
use crate::carrier_api::CarrierApiClient;
use crate::claim_service::ClaimService;
use crate::delay_monitor::{DelayMonitorService, MonitorScheduler};
use crate::notifications::Notifier;
use crate::ticket_service::TicketService;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub auth_service: Arc<AuthService>,
    pub ticket_service: Arc<TicketService>,
    pub claim_service: Arc<ClaimService>,
    pub carrier_api: Arc<CarrierApiClient>,
    pub delay_monitor: Arc<DelayMonitorService>,
    pub monitor_scheduler: Arc<MonitorScheduler>,
    pub notifier: Notifier,
    pub jwt_secret: String,
    pub monitor_interval_minutes: u64,
}

impl FromRef<AppState> for Notifier {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.notifier.clone()
    }
}

impl FromRef<AppState> for Arc<TicketService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.ticket_service.clone()
    }
}

impl FromRef<AppState> for Arc<ClaimService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.claim_service.clone()
    }
}

impl FromRef<AppState> for Arc<DelayMonitorService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.delay_monitor.clone()
    }
}
