//! API module for shared HTTP API functionality
//!
//! # Design Principle
//!
//! This module contains ONLY:
//! - Pure functions (no HTTP framework dependencies)
//! - Database operations (via sqlx)
//! - Shared types
//!
//! The catalog service wraps these with axum extractors and middleware.

pub mod auth;
pub mod types;

pub use auth::{
    generate_token, hash_token, listing_cap, parse_bearer, require_role,
    ApiAuthError, SearchUsage,
};
pub use types::{CreateUserRequest, CreatedUserResponse, ErrorResponse};
