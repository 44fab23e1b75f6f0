//! Ticket service layer - storage access for registered tickets

use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{
    CreateTicketRequest, ListTicketsQuery, Ticket, TicketStatus, UpdateTicketRequest,
};

/// Ticket service for managing ticket lifecycle
pub struct TicketService {
    db_pool: PgPool,
}

impl TicketService {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }

    /// Register a new ticket for a user
    pub async fn create_ticket(&self, user_id: Uuid, request: CreateTicketRequest) -> Result<Ticket> {
        let ticket = sqlx::query_as::<_, Ticket>(
            r#"
            INSERT INTO tickets (
                id, user_id, ticket_type, transport_type, carrier, route_number,
                departure_station, arrival_station, departure_date, departure_time,
                arrival_date, arrival_time, status, delay_minutes, price, image_url,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(request.ticket_type)
        .bind(request.transport_type)
        .bind(request.carrier)
        .bind(&request.route_number)
        .bind(&request.departure_station)
        .bind(&request.arrival_station)
        .bind(request.departure_date)
        .bind(request.departure_time)
        .bind(request.arrival_date)
        .bind(request.arrival_time)
        .bind(TicketStatus::Active)
        .bind(0i32)
        .bind(request.price)
        .bind(&request.image_url)
        .bind(Utc::now())
        .bind(Utc::now())
        .fetch_one(&self.db_pool)
        .await
        .context("Failed to insert ticket into database")?;

        Ok(ticket)
    }

    /// Get a single ticket by ID
    pub async fn get_ticket(&self, id: &Uuid) -> Result<Option<Ticket>> {
        let ticket = sqlx::query_as::<_, Ticket>("SELECT * FROM tickets WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db_pool)
            .await?;

        Ok(ticket)
    }

    /// All tickets for a user, newest first
    pub async fn get_tickets_for_user(&self, user_id: &Uuid) -> Result<Vec<Ticket>> {
        let tickets = sqlx::query_as::<_, Ticket>(
            "SELECT * FROM tickets WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.db_pool)
        .await?;

        Ok(tickets)
    }

    /// List a user's tickets with filtering and pagination
    pub async fn list_tickets(&self, user_id: &Uuid, query: ListTicketsQuery) -> Result<Vec<Ticket>> {
        let page = query.page.unwrap_or(1).max(1);
        let limit = query.limit.unwrap_or(20).clamp(1, 100);
        let offset = (page - 1) * limit;

        let mut query_builder: sqlx::QueryBuilder<sqlx::Postgres> =
            sqlx::QueryBuilder::new("SELECT * FROM tickets WHERE user_id = ");
        query_builder.push_bind(user_id);

        if let Some(status) = query.status {
            query_builder.push(" AND status = ");
            query_builder.push_bind(status);
        }
        if let Some(carrier) = query.carrier {
            query_builder.push(" AND carrier = ");
            query_builder.push_bind(carrier);
        }

        query_builder.push(" ORDER BY created_at DESC LIMIT ");
        query_builder.push_bind(i64::from(limit));
        query_builder.push(" OFFSET ");
        query_builder.push_bind(i64::from(offset));

        let tickets = query_builder
            .build_query_as::<Ticket>()
            .fetch_all(&self.db_pool)
            .await?;

        Ok(tickets)
    }

    /// Partially update a ticket. Returns `None` when the ticket does not exist.
    pub async fn update_ticket(
        &self,
        id: &Uuid,
        data: UpdateTicketRequest,
    ) -> Result<Option<Ticket>> {
        let mut query_builder: sqlx::QueryBuilder<sqlx::Postgres> =
            sqlx::QueryBuilder::new("UPDATE tickets SET updated_at = ");
        query_builder.push_bind(Utc::now());

        if let Some(status) = data.status {
            query_builder.push(", status = ");
            query_builder.push_bind(status);
        }
        if let Some(delay_minutes) = data.delay_minutes {
            query_builder.push(", delay_minutes = ");
            query_builder.push_bind(delay_minutes);
        }
        if let Some(route_number) = data.route_number {
            query_builder.push(", route_number = ");
            query_builder.push_bind(route_number);
        }
        if let Some(departure_station) = data.departure_station {
            query_builder.push(", departure_station = ");
            query_builder.push_bind(departure_station);
        }
        if let Some(arrival_station) = data.arrival_station {
            query_builder.push(", arrival_station = ");
            query_builder.push_bind(arrival_station);
        }
        if let Some(departure_date) = data.departure_date {
            query_builder.push(", departure_date = ");
            query_builder.push_bind(departure_date);
        }
        if let Some(departure_time) = data.departure_time {
            query_builder.push(", departure_time = ");
            query_builder.push_bind(departure_time);
        }
        if let Some(arrival_date) = data.arrival_date {
            query_builder.push(", arrival_date = ");
            query_builder.push_bind(arrival_date);
        }
        if let Some(arrival_time) = data.arrival_time {
            query_builder.push(", arrival_time = ");
            query_builder.push_bind(arrival_time);
        }
        if let Some(price) = data.price {
            query_builder.push(", price = ");
            query_builder.push_bind(price);
        }
        if let Some(image_url) = data.image_url {
            query_builder.push(", image_url = ");
            query_builder.push_bind(image_url);
        }

        query_builder.push(" WHERE id = ");
        query_builder.push_bind(id);
        query_builder.push(" RETURNING *");

        let ticket = query_builder
            .build_query_as::<Ticket>()
            .fetch_optional(&self.db_pool)
            .await?;

        Ok(ticket)
    }

    /// Delete a ticket. Returns whether a row was removed.
    pub async fn delete_ticket(&self, id: &Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM tickets WHERE id = $1")
            .bind(id)
            .execute(&self.db_pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
