//! Account endpoints

use axum::{extract::State, http::StatusCode, Json};
use lumen_common::api::auth::create_user as insert_user;
use lumen_common::api::{CreateUserRequest, CreatedUserResponse};
use lumen_common::models::User;
use tracing::info;

use crate::api::auth::{AdminUser, CurrentUser};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// GET /api/me
pub async fn get_me(CurrentUser(user): CurrentUser) -> Json<User> {
    Json(user)
}

/// POST /api/users
///
/// The plaintext token is only ever returned here.
pub async fn create_user(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Json(request): Json<CreateUserRequest>,
) -> ApiResult<(StatusCode, Json<CreatedUserResponse>)> {
    let email = request.email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(ApiError::BadRequest(format!("Invalid email: '{}'", email)));
    }

    let (user, token) = insert_user(&state.db, email, request.role)
        .await
        .map_err(|e| match e {
            lumen_common::Error::Database(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                ApiError::BadRequest(format!("User already exists: {}", email))
            }
            other => other.into(),
        })?;

    info!(by = %admin.email, role = %user.role, "Created user {}", user.email);
    Ok((StatusCode::CREATED, Json(CreatedUserResponse { user, token })))
}
