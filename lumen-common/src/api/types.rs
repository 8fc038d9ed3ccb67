//! Shared API request/response types

use serde::{Deserialize, Serialize};

use crate::models::{Role, User};

// ========================================
// Error Response Types
// ========================================

/// Error payload: `{"error": {"code": ..., "message": ...}}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Machine-readable error code (e.g. `NOT_FOUND`)
    pub code: String,
    /// Human-readable error message
    pub message: String,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
        }
    }
}

// ========================================
// Account Types
// ========================================

/// Request body for account creation
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CreateUserRequest {
    pub email: String,
    #[serde(default = "default_role")]
    pub role: Role,
}

fn default_role() -> Role {
    Role::Free
}

/// Account creation response, the only place a plaintext token appears
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedUserResponse {
    pub user: User,
    pub token: String,
}
