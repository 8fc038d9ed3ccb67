//! Bearer token authentication
//!
//! [`resolve_user`] runs on every request: a valid `Authorization: Bearer`
//! token attaches the matching [`User`] to the request, an invalid one is
//! rejected with 401, and no header at all leaves the request anonymous.
//! Handlers state what they need through the extractors below.

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use lumen_common::api::auth::{load_user_by_token, parse_bearer, require_role, ApiAuthError};
use lumen_common::models::User;
use lumen_common::Role;
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::AppState;

/// Authentication middleware
pub async fn resolve_user(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let Some(header) = request.headers().get(AUTHORIZATION) else {
        return next.run(request).await;
    };

    let token = match header.to_str().ok().and_then(parse_bearer) {
        Some(token) => token.to_string(),
        None => return ApiError::from(ApiAuthError::InvalidToken).into_response(),
    };

    match load_user_by_token(&state.db, &token).await {
        Ok(user) => {
            debug!(user = %user.email, role = %user.role, "Authenticated request");
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(e) => {
            if let ApiAuthError::DatabaseError(ref msg) = e {
                warn!("Token lookup failed: {}", msg);
            }
            ApiError::from(e).into_response()
        }
    }
}

/// The caller, if authenticated
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<User>);

impl MaybeUser {
    pub fn role(&self) -> Option<Role> {
        self.0.as_ref().map(|u| u.role)
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for MaybeUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(parts.extensions.get::<User>().cloned()))
    }
}

/// An authenticated caller of any role
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<User>()
            .cloned()
            .map(CurrentUser)
            .ok_or_else(|| ApiAuthError::MissingToken.into())
    }
}

/// An authenticated admin
#[derive(Debug, Clone)]
pub struct AdminUser(pub User);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = parts.extensions.get::<User>().cloned();
        require_role(user.as_ref().map(|u| u.role), Role::Admin)?;
        // require_role only succeeds with a user present
        user.map(AdminUser)
            .ok_or_else(|| ApiAuthError::MissingToken.into())
    }
}
