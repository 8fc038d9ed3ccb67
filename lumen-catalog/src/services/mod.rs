//! Clients for services outside the catalog

pub mod image_search;

pub use image_search::{ImageMatch, ImageSearchClient, ImageSearchError};
