//! Account service - registration, login, profile maintenance

use anyhow::Context;
use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;
use validator::Validate;

use crate::models::User;

use super::jwt::generate_access_token;

/// Why an account operation failed
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("email is already registered")]
    EmailTaken,
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("user not found")]
    UserNotFound,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Registration payload
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, message = "name must not be empty"))]
    pub name: String,
    #[validate(email(message = "invalid email address"))]
    pub email: String,
    #[validate(length(min = 8, message = "password must be at least 8 characters"))]
    pub password: String,
}

/// Login payload
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Profile update payload
#[derive(Debug, Deserialize, Default)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub bank_account: Option<String>,
}

/// Password change payload
#[derive(Debug, Deserialize, Validate)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    #[validate(length(min = 8, message = "password must be at least 8 characters"))]
    pub new_password: String,
}

/// Login/registration result handed to clients
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub token: String,
    pub user: User,
}

/// Account service backed by the users table
pub struct AuthService {
    db_pool: PgPool,
    jwt_secret: String,
}

impl AuthService {
    pub fn new(db_pool: PgPool, jwt_secret: String) -> Self {
        Self {
            db_pool,
            jwt_secret,
        }
    }

    /// Create an account and open a session
    pub async fn register(&self, request: RegisterRequest) -> Result<SessionResponse, AuthError> {
        let existing = sqlx::query_as::<_, (Uuid,)>("SELECT id FROM users WHERE email = $1")
            .bind(&request.email)
            .fetch_optional(&self.db_pool)
            .await
            .context("Failed to check for an existing account")?;

        if existing.is_some() {
            return Err(AuthError::EmailTaken);
        }

        let password_hash = hash(&request.password, DEFAULT_COST)
            .context("Failed to hash password")?;

        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, email, name, password_hash, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&request.email)
        .bind(&request.name)
        .bind(&password_hash)
        .bind(Utc::now())
        .bind(Utc::now())
        .fetch_one(&self.db_pool)
        .await
        .context("Failed to insert user into database")?;

        self.open_session(user)
    }

    /// Verify credentials and open a session
    pub async fn login(&self, request: LoginRequest) -> Result<SessionResponse, AuthError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(&request.email)
            .fetch_optional(&self.db_pool)
            .await
            .context("Failed to load user")?
            .ok_or(AuthError::InvalidCredentials)?;

        let password_ok = verify(&request.password, &user.password_hash)
            .context("Failed to verify password")?;
        if !password_ok {
            return Err(AuthError::InvalidCredentials);
        }

        self.open_session(user)
    }

    /// Current profile for a user id
    pub async fn get_user(&self, user_id: &Uuid) -> Result<Option<User>, AuthError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.db_pool)
            .await
            .context("Failed to load user")?;

        Ok(user)
    }

    /// Update profile fields
    pub async fn update_profile(
        &self,
        user_id: &Uuid,
        data: UpdateProfileRequest,
    ) -> Result<User, AuthError> {
        let mut query_builder: sqlx::QueryBuilder<sqlx::Postgres> =
            sqlx::QueryBuilder::new("UPDATE users SET updated_at = ");
        query_builder.push_bind(Utc::now());

        if let Some(name) = data.name {
            query_builder.push(", name = ");
            query_builder.push_bind(name);
        }
        if let Some(phone) = data.phone {
            query_builder.push(", phone = ");
            query_builder.push_bind(phone);
        }
        if let Some(address) = data.address {
            query_builder.push(", address = ");
            query_builder.push_bind(address);
        }
        if let Some(bank_account) = data.bank_account {
            query_builder.push(", bank_account = ");
            query_builder.push_bind(bank_account);
        }

        query_builder.push(" WHERE id = ");
        query_builder.push_bind(user_id);
        query_builder.push(" RETURNING *");

        let user = query_builder
            .build_query_as::<User>()
            .fetch_optional(&self.db_pool)
            .await
            .context("Failed to update profile")?
            .ok_or(AuthError::UserNotFound)?;

        Ok(user)
    }

    /// Change the password after re-verifying the current one
    pub async fn change_password(
        &self,
        user_id: &Uuid,
        request: ChangePasswordRequest,
    ) -> Result<(), AuthError> {
        let user = self
            .get_user(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        let current_ok = verify(&request.current_password, &user.password_hash)
            .context("Failed to verify password")?;
        if !current_ok {
            return Err(AuthError::InvalidCredentials);
        }

        let password_hash = hash(&request.new_password, DEFAULT_COST)
            .context("Failed to hash password")?;

        sqlx::query("UPDATE users SET password_hash = $1, updated_at = $2 WHERE id = $3")
            .bind(&password_hash)
            .bind(Utc::now())
            .bind(user_id)
            .execute(&self.db_pool)
            .await
            .context("Failed to store new password")?;

        Ok(())
    }

    fn open_session(&self, user: User) -> Result<SessionResponse, AuthError> {
        let token = generate_access_token(user.id, &self.jwt_secret)?;
        Ok(SessionResponse { token, user })
    }
}
