//! Data models for the Kompenzo backend

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, Utc};
use uuid::Uuid;
use validator::Validate;

/// Transport modes a ticket can cover
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "transport_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TransportType {
    Train,
    Bus,
}

/// How the ticket entered the system
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "ticket_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TicketType {
    Digital,
    Scanned,
}

/// Ticket lifecycle status
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "ticket_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    Active,
    Used,
    Expired,
    Cancelled,
    Delayed,
}

/// Refund claim lifecycle status
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "refund_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RefundStatus {
    Pending,
    Approved,
    Rejected,
    Paid,
}

/// Carrier identifiers. `CdEticket` and `Default` are rule-table keys more
/// than real operators: digital CD tickets are re-keyed to `CdEticket` by the
/// refund calculator, and `Default` is the claim-creation fallback rule set.
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "carrier_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Carrier {
    Cd,
    CdEticket,
    Regiojet,
    Flixbus,
    Other,
    Default,
}

/// Ticket model
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Ticket {
    pub id: Uuid,
    pub user_id: Uuid,
    pub ticket_type: TicketType,
    pub transport_type: TransportType,
    pub carrier: Carrier,
    pub route_number: String,
    pub departure_station: String,
    pub arrival_station: String,
    pub departure_date: NaiveDate,
    pub departure_time: NaiveTime,
    pub arrival_date: NaiveDate,
    pub arrival_time: NaiveTime,
    pub status: TicketStatus,
    pub delay_minutes: i32,
    pub price: i32,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Refund claim model
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct RefundClaim {
    pub id: Uuid,
    pub ticket_id: Uuid,
    pub user_id: Uuid,
    pub status: RefundStatus,
    pub amount: i32,
    pub submission_date: DateTime<Utc>,
    pub resolution_date: Option<DateTime<Utc>>,
    pub carrier: Carrier,
    pub bank_account: Option<String>,
    pub notes: Option<String>,
}

/// Claim joined with the ticket it compensates, for list views
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct ClaimWithTicket {
    pub id: Uuid,
    pub ticket_id: Uuid,
    pub user_id: Uuid,
    pub status: RefundStatus,
    pub amount: i32,
    pub submission_date: DateTime<Utc>,
    pub resolution_date: Option<DateTime<Utc>>,
    pub carrier: Carrier,
    pub bank_account: Option<String>,
    pub notes: Option<String>,
    pub route_number: String,
    pub departure_station: String,
    pub arrival_station: String,
    pub departure_date: NaiveDate,
    pub ticket_price: i32,
    pub ticket_delay_minutes: i32,
}

/// User profile. The password hash never leaves the server.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub bank_account: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// API response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

// ===== Request / query DTOs =====

/// Request DTO for registering a ticket
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTicketRequest {
    pub ticket_type: TicketType,
    pub transport_type: TransportType,
    pub carrier: Carrier,
    #[validate(length(min = 1, message = "route number must not be empty"))]
    pub route_number: String,
    #[validate(length(min = 1, message = "departure station must not be empty"))]
    pub departure_station: String,
    #[validate(length(min = 1, message = "arrival station must not be empty"))]
    pub arrival_station: String,
    pub departure_date: NaiveDate,
    pub departure_time: NaiveTime,
    pub arrival_date: NaiveDate,
    pub arrival_time: NaiveTime,
    #[validate(range(min = 0, message = "price must not be negative"))]
    pub price: i32,
    pub image_url: Option<String>,
}

/// Partial-update DTO for a ticket
#[derive(Debug, Deserialize, Default)]
pub struct UpdateTicketRequest {
    pub status: Option<TicketStatus>,
    pub delay_minutes: Option<i32>,
    pub route_number: Option<String>,
    pub departure_station: Option<String>,
    pub arrival_station: Option<String>,
    pub departure_date: Option<NaiveDate>,
    pub departure_time: Option<NaiveTime>,
    pub arrival_date: Option<NaiveDate>,
    pub arrival_time: Option<NaiveTime>,
    pub price: Option<i32>,
    pub image_url: Option<String>,
}

/// Query parameters for listing tickets
#[derive(Debug, Deserialize, Default)]
pub struct ListTicketsQuery {
    pub status: Option<TicketStatus>,
    pub carrier: Option<Carrier>,
    pub page: Option<i32>,
    pub limit: Option<i32>,
}

/// Request DTO for submitting a claim
#[derive(Debug, Deserialize)]
pub struct CreateClaimRequest {
    pub ticket_id: Uuid,
}

/// Partial-update DTO for a claim
#[derive(Debug, Deserialize, Default)]
pub struct UpdateClaimRequest {
    pub status: Option<RefundStatus>,
    pub amount: Option<i32>,
    pub resolution_date: Option<DateTime<Utc>>,
    pub bank_account: Option<String>,
    pub notes: Option<String>,
}

/// One monitoring pass over a user's eligible tickets
#[derive(Debug, Serialize, Default, Clone, Copy, PartialEq, Eq)]
pub struct MonitorReport {
    pub updated_tickets: u32,
    pub new_claims: u32,
}

/// Dashboard summary counts
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct DashboardSummary {
    pub total_tickets: i64,
    pub active_tickets: i64,
    pub delayed_tickets: i64,
    pub total_claims: i64,
    pub pending_claims: i64,
    pub pending_amount: i64,
}
