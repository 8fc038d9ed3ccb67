//! HTTP API handlers for lumen-catalog

pub mod auth;
pub mod designers;
pub mod export;
pub mod favorites;
pub mod health;
pub mod image_search;
pub mod imports;
pub mod luminaires;
pub mod timeline;
pub mod uploads;
pub mod users;

pub use auth::resolve_user;
pub use designers::{create_designer, get_designer, list_designers, upsert_designer};
pub use export::export_csv;
pub use favorites::{list_favorites, toggle_favorite};
pub use health::health_routes;
pub use image_search::search_by_image;
pub use imports::upload_csv;
pub use luminaires::{
    create_luminaire, delete_luminaire, get_luminaire, list_luminaires, similar_luminaires,
    update_luminaire,
};
pub use timeline::{get_descriptions, get_timeline, set_description};
pub use uploads::{get_welcome_video, upload_images, upload_video};
pub use users::{create_user, get_me};
