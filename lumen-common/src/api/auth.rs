//! API token authentication and role checks
//!
//! # Architecture
//!
//! - Every account has an opaque bearer token (64 hex chars)
//! - Only the SHA-256 of a token is stored
//! - Tokens resolve to a user and that user's [`Role`]
//! - Free accounts have a daily image-search quota
//!
//! # Pure Functions
//!
//! Token and role logic here is framework-free; database operations,
//! including the search quota, are behind the `sqlx` feature. HTTP
//! middleware lives in the service crate.

use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::models::{Role, User};

#[cfg(feature = "sqlx")]
use sqlx::{Row, SqlitePool};

// ========================================
// Error Types
// ========================================

/// Authentication error types
#[derive(Debug, Clone, PartialEq)]
pub enum ApiAuthError {
    /// No bearer token on a route that needs one
    MissingToken,

    /// Token does not resolve to a user
    InvalidToken,

    /// Authenticated, but the role is insufficient
    Forbidden { required: Role, actual: Role },

    /// Free account exhausted its daily searches
    QuotaExceeded { limit: u32 },

    /// Database error loading the user
    DatabaseError(String),
}

impl std::fmt::Display for ApiAuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiAuthError::MissingToken => write!(f, "Missing bearer token"),
            ApiAuthError::InvalidToken => write!(f, "Invalid token"),
            ApiAuthError::Forbidden { required, actual } => {
                write!(f, "Role '{}' required (have '{}')", required, actual)
            }
            ApiAuthError::QuotaExceeded { limit } => {
                write!(f, "Daily search limit reached ({}/{})", limit, limit)
            }
            ApiAuthError::DatabaseError(err) => write!(f, "Database error: {}", err),
        }
    }
}

impl std::error::Error for ApiAuthError {}

// ========================================
// Tokens
// ========================================

/// Generate a new random API token (64 hex chars)
pub fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// SHA-256 of a token as 64 hex characters
///
/// # Examples
///
/// ```
/// use lumen_common::api::auth::hash_token;
///
/// let hash = hash_token("secret-token");
/// assert_eq!(hash.len(), 64);
/// assert_eq!(hash, hash_token("secret-token"));
/// ```
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Extract the token from an `Authorization` header value
///
/// Accepts `Bearer <token>` with any scheme capitalization.
pub fn parse_bearer(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

// ========================================
// Role checks
// ========================================

/// Require `required` from an optional authenticated role
pub fn require_role(actual: Option<Role>, required: Role) -> Result<Role, ApiAuthError> {
    let actual = actual.ok_or(ApiAuthError::MissingToken)?;
    if actual.satisfies(required) {
        Ok(actual)
    } else {
        Err(ApiAuthError::Forbidden { required, actual })
    }
}

/// Cap on listed results for a role
///
/// Free and anonymous callers see a tenth of the catalog, but never fewer
/// than ten items.
pub fn listing_cap(role: Option<Role>, total: i64) -> Option<i64> {
    match role {
        Some(role) if !role.is_limited() => None,
        _ => Some((total / 10).max(10)),
    }
}

// ========================================
// Search quota
// ========================================

/// A search slot claimed by [`reserve_search`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchUsage {
    /// Searches used today after this one
    pub count: u32,
    /// Daily limit, `None` when unlimited
    pub limit: Option<u32>,
    pub day: String,
}

impl SearchUsage {
    pub fn remaining(&self) -> Option<u32> {
        self.limit.map(|limit| limit.saturating_sub(self.count))
    }
}

// ========================================
// Database operations
// ========================================

#[cfg(feature = "sqlx")]
fn user_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<User, ApiAuthError> {
    let role: String = row.get("role");
    Ok(User {
        guid: row.get("guid"),
        email: row.get("email"),
        role: role
            .parse()
            .map_err(|e: crate::Error| ApiAuthError::DatabaseError(e.to_string()))?,
        search_count: row.get("search_count"),
        last_search_date: row.get("last_search_date"),
    })
}

/// Resolve a plaintext token to its user
#[cfg(feature = "sqlx")]
pub async fn load_user_by_token(db: &SqlitePool, token: &str) -> Result<User, ApiAuthError> {
    let row = sqlx::query(
        "SELECT guid, email, role, search_count, last_search_date FROM users WHERE token_hash = ?",
    )
    .bind(hash_token(token))
    .fetch_optional(db)
    .await
    .map_err(|e| ApiAuthError::DatabaseError(e.to_string()))?;

    match row {
        Some(row) => user_from_row(&row),
        None => Err(ApiAuthError::InvalidToken),
    }
}

/// Create a user and return it with its plaintext token
///
/// The token is not recoverable afterwards.
#[cfg(feature = "sqlx")]
pub async fn create_user(db: &SqlitePool, email: &str, role: Role) -> crate::Result<(User, String)> {
    let token = generate_token();
    let guid = crate::uuid_utils::generate_id();

    sqlx::query("INSERT INTO users (guid, email, role, token_hash) VALUES (?, ?, ?, ?)")
        .bind(&guid)
        .bind(email)
        .bind(role.as_str())
        .bind(hash_token(&token))
        .execute(db)
        .await?;

    let user = User {
        guid,
        email: email.to_string(),
        role,
        search_count: 0,
        last_search_date: None,
    };

    Ok((user, token))
}

/// Claim one image search for `today`
///
/// The quota check and the counter bump are a single conditional UPDATE, so
/// concurrent searches by one free account cannot overshoot `daily_limit`.
/// The counter restarts at 1 on a new day. Unlimited roles are counted too.
#[cfg(feature = "sqlx")]
pub async fn reserve_search(
    db: &SqlitePool,
    user: &User,
    today: &str,
    daily_limit: u32,
) -> Result<SearchUsage, ApiAuthError> {
    let count: Option<i64> = sqlx::query_scalar(
        r#"
        UPDATE users
        SET search_count = CASE WHEN last_search_date = ? THEN search_count + 1 ELSE 1 END,
            last_search_date = ?,
            updated_at = CURRENT_TIMESTAMP
        WHERE guid = ?
          AND (role <> 'free' OR last_search_date IS NOT ? OR search_count < ?)
        RETURNING search_count
        "#,
    )
    .bind(today)
    .bind(today)
    .bind(&user.guid)
    .bind(today)
    .bind(i64::from(daily_limit))
    .fetch_optional(db)
    .await
    .map_err(|e| ApiAuthError::DatabaseError(e.to_string()))?;

    let count = count.ok_or(ApiAuthError::QuotaExceeded { limit: daily_limit })?;
    Ok(SearchUsage {
        count: u32::try_from(count).unwrap_or(u32::MAX),
        limit: user.role.is_limited().then_some(daily_limit),
        day: today.to_string(),
    })
}

/// Give back a slot whose search never got an answer
///
/// Only touches the counter of the day the slot was taken on.
#[cfg(feature = "sqlx")]
pub async fn release_search(db: &SqlitePool, user_guid: &str, usage: &SearchUsage) -> crate::Result<()> {
    sqlx::query(
        "UPDATE users SET search_count = MAX(search_count - 1, 0), updated_at = CURRENT_TIMESTAMP \
         WHERE guid = ? AND last_search_date = ?",
    )
    .bind(user_guid)
    .bind(&usage.day)
    .execute(db)
    .await?;

    Ok(())
}

/// Whether any admin account exists
#[cfg(feature = "sqlx")]
pub async fn admin_exists(db: &SqlitePool) -> crate::Result<bool> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE role = 'admin')")
        .fetch_one(db)
        .await?;
    Ok(exists)
}

// ========================================
// Tests
// ========================================
