//! Catalog models
//!
//! JSON field names are camelCase to match the catalog's web clients.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// A luminaire (lighting fixture) record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Luminaire {
    pub id: String,
    pub name: String,
    /// Artist name, often with life dates ("Émile Gallé (1846-1904)")
    #[serde(default)]
    pub artist: Option<String>,
    /// Free-text year, see [`crate::year`]
    #[serde(default)]
    pub year: Option<String>,
    #[serde(default)]
    pub specialty: Option<String>,
    /// Notable work or partner
    #[serde(default)]
    pub collaboration: Option<String>,
    #[serde(default)]
    pub signed: Option<String>,
    #[serde(default)]
    pub image_path: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub dimensions: Option<String>,
    #[serde(default)]
    pub estimation: Option<String>,
    #[serde(default)]
    pub materials: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl Luminaire {
    /// Minimal luminaire with an id and a name
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    /// Apply every field present in `patch`
    pub fn apply(&mut self, patch: LuminairePatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        merge(&mut self.artist, patch.artist);
        merge(&mut self.year, patch.year);
        merge(&mut self.specialty, patch.specialty);
        merge(&mut self.collaboration, patch.collaboration);
        merge(&mut self.signed, patch.signed);
        merge(&mut self.image_url, patch.image_url);
        merge(&mut self.filename, patch.filename);
        merge(&mut self.dimensions, patch.dimensions);
        merge(&mut self.estimation, patch.estimation);
        merge(&mut self.materials, patch.materials);
        merge(&mut self.description, patch.description);
        merge(&mut self.url, patch.url);
    }
}

fn merge(field: &mut Option<String>, value: Option<String>) {
    if value.is_some() {
        *field = value;
    }
}

/// Partial luminaire used for creation, edits and imports
///
/// Absent fields are left untouched on update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LuminairePatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub artist: Option<String>,
    #[serde(default)]
    pub year: Option<String>,
    #[serde(default)]
    pub specialty: Option<String>,
    #[serde(default)]
    pub collaboration: Option<String>,
    #[serde(default)]
    pub signed: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub dimensions: Option<String>,
    #[serde(default)]
    pub estimation: Option<String>,
    #[serde(default)]
    pub materials: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

/// A designer profile
///
/// Designers are keyed by name; luminaires reference them through their
/// `artist` text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Designer {
    pub name: String,
    /// Portrait filename from the designers CSV, used to match uploads
    #[serde(default)]
    pub image_file: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub image_path: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub collaboration: Option<String>,
}

/// Partial designer used for upserts
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesignerPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub image_file: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub collaboration: Option<String>,
}

/// Descriptive text attached to a timeline period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineDescription {
    pub period_name: String,
    pub description: String,
}

/// Account role
///
/// Roles are ordered: `Admin` satisfies every requirement, `Premium`
/// satisfies `Premium` and `Free`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Free,
    Premium,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Free => "free",
            Role::Premium => "premium",
            Role::Admin => "admin",
        }
    }

    /// Whether this role grants access to something requiring `required`
    pub fn satisfies(self, required: Role) -> bool {
        self >= required
    }

    /// Free accounts are subject to listing caps and search quotas
    pub fn is_limited(self) -> bool {
        self == Role::Free
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "free" => Ok(Role::Free),
            "premium" => Ok(Role::Premium),
            "admin" => Ok(Role::Admin),
            other => Err(Error::InvalidInput(format!("Unknown role: {}", other))),
        }
    }
}

/// Catalog user account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub guid: String,
    pub email: String,
    pub role: Role,
    pub search_count: i64,
    pub last_search_date: Option<String>,
}
