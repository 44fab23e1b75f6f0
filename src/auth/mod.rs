//! Authentication module for the Kompenzo backend
//!
//! Email+password identity with JWT bearer sessions:
//! - bcrypt password hashes, never returned to clients
//! - access token generation and validation
//! - an axum extractor resolving the bearer token to a user id

mod extractor;
mod jwt;
mod service;

pub use extractor::AuthenticatedUser;
pub use jwt::{generate_access_token, verify_token, Claims};
pub use service::{
    AuthError, AuthService, ChangePasswordRequest, LoginRequest, RegisterRequest, SessionResponse,
    UpdateProfileRequest,
};
