//! Bearer-token extractor for protected handlers

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    Json, RequestPartsExt,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use uuid::Uuid;

use crate::app_state::AppState;
use crate::models::ApiResponse;

use super::jwt::verify_token;

/// The user id proven by the request's bearer token
pub struct AuthenticatedUser(pub Uuid);

fn unauthorized(message: &str) -> (StatusCode, Json<ApiResponse<()>>) {
    (StatusCode::UNAUTHORIZED, Json(ApiResponse::err(message)))
}

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = (StatusCode, Json<ApiResponse<()>>);

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|_| unauthorized("Missing bearer token"))?;

        let claims = verify_token(bearer.token(), &state.jwt_secret)
            .map_err(|_| unauthorized("Invalid or expired token"))?;

        Ok(AuthenticatedUser(claims.sub))
    }
}
