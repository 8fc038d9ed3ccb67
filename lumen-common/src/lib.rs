//! # Lumen Common Library
//!
//! Shared code for the Lumen luminaire catalog:
//! - Catalog models (luminaires, designers, timeline, users)
//! - Similarity ranking of luminaires
//! - Repository interface over catalog snapshots
//! - Configuration loading
//! - Database initialization
//! - API token authentication primitives

pub mod api;
pub mod config;
#[cfg(feature = "sqlx")]
pub mod db;
pub mod error;
pub mod models;
pub mod repository;
pub mod similarity;
pub mod time;
pub mod uuid_utils;
pub mod year;

pub use error::{Error, Result};
pub use models::{Designer, Luminaire, Role};
pub use similarity::{find_similar, rank, Ranked, SimilarityMode};
