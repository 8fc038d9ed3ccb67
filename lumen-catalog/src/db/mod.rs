//! Database access layer for lumen-catalog
//!
//! Schema creation lives in `lumen_common::db`; these modules hold the
//! catalog queries.

pub mod designers;
pub mod favorites;
pub mod luminaires;
pub mod timeline;
