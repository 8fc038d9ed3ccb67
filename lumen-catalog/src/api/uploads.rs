//! Image and video uploads
//!
//! Files are written under the uploads folder with a unique suffix and
//! served back from `/uploads/...`. Uploaded images are attached to the
//! luminaire or designer they were named after.

use axum::{
    extract::{Multipart, State},
    Json,
};
use lumen_common::db::{get_setting, set_setting};
use lumen_common::time::now_millis;
use lumen_common::{Designer, Luminaire};
use serde::Serialize;
use serde_json::{json, Value};
use std::path::Path;
use tracing::{info, warn};

use crate::api::auth::AdminUser;
use crate::db::{designers, luminaires};
use crate::error::{ApiError, ApiResult};
use crate::import::ImportKind;
use crate::AppState;

/// Largest accepted image
pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

/// Largest accepted video
pub const MAX_VIDEO_BYTES: usize = 100 * 1024 * 1024;

const WELCOME_VIDEO_SETTING: &str = "welcome_video_url";

/// Split a file name into `(stem, extension with dot)`
fn split_name(file_name: &str) -> (&str, &str) {
    match file_name.rfind('.') {
        Some(dot) if dot > 0 => file_name.split_at(dot),
        _ => (file_name, ""),
    }
}

/// Keep only the final path component and replace unsafe characters
fn sanitize(file_name: &str) -> String {
    let base = Path::new(file_name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload");
    let cleaned: String = base
        .chars()
        .map(|c| if c.is_alphanumeric() || matches!(c, '-' | '_' | '.') { c } else { '_' })
        .collect();
    if cleaned.trim_matches('.').is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}

/// `<stem>-<millis>-<random><ext>`, unique per upload
fn unique_name(file_name: &str) -> String {
    let clean = sanitize(file_name);
    let (stem, ext) = split_name(&clean);
    let random = uuid::Uuid::new_v4().simple().to_string();
    format!("{}-{}-{}{}", stem, now_millis(), &random[..8], ext.to_lowercase())
}

/// Content type declared by the client, else guessed from the extension
fn content_type(declared: Option<&str>, file_name: &str) -> String {
    declared
        .filter(|ct| !ct.is_empty() && *ct != "application/octet-stream")
        .map(str::to_string)
        .unwrap_or_else(|| mime_guess::from_path(file_name).first_or_octet_stream().to_string())
}

/// Does an uploaded file name refer to `stored`?
///
/// Matches with or without the extension, ignoring case.
fn same_file(stored: Option<&str>, file_name: &str) -> bool {
    let Some(stored) = stored.map(str::trim).filter(|s| !s.is_empty()) else {
        return false;
    };
    let stored = stored.to_lowercase();
    let file_name = file_name.to_lowercase();
    stored == file_name || stored == split_name(&file_name).0
}

fn name_contains_stem(name: &str, file_name: &str) -> bool {
    let stem = split_name(file_name).0.to_lowercase();
    !stem.is_empty() && name.to_lowercase().contains(&stem)
}

/// Luminaire an uploaded image belongs to
///
/// Filename matches win over name matches; the first hit in storage order
/// is taken.
pub fn match_luminaire<'a>(file_name: &str, items: &'a [Luminaire]) -> Option<&'a Luminaire> {
    items
        .iter()
        .find(|l| same_file(l.filename.as_deref(), file_name))
        .or_else(|| items.iter().find(|l| name_contains_stem(&l.name, file_name)))
}

/// Designer a portrait belongs to
pub fn match_designer<'a>(file_name: &str, items: &'a [Designer]) -> Option<&'a Designer> {
    items
        .iter()
        .find(|d| same_file(d.image_file.as_deref(), file_name))
        .or_else(|| items.iter().find(|d| name_contains_stem(&d.name, file_name)))
}

struct UploadedFile {
    file_name: String,
    content_type: String,
    data: Vec<u8>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredFile {
    pub original_name: String,
    pub filename: String,
    pub url: String,
    /// Id of the luminaire or name of the designer the file was attached to
    pub matched: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ImageUploadResponse {
    pub message: String,
    pub files: Vec<StoredFile>,
}

/// POST /api/upload/images
///
/// Multipart fields: `images` (repeated) and `type` (`luminaires` or
/// `designers`). Without a type the files are stored unattached.
pub async fn upload_images(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    mut multipart: Multipart,
) -> ApiResult<Json<ImageUploadResponse>> {
    let mut files = Vec::new();
    let mut kind: Option<ImportKind> = None;

    while let Some(field) = multipart.next_field().await? {
        let field_name = field.name().unwrap_or_default().to_string();
        match field_name.as_str() {
            "images" => {
                let file_name = field.file_name().unwrap_or("image").to_string();
                let content_type = content_type(field.content_type(), &file_name);
                if !content_type.starts_with("image/") {
                    return Err(ApiError::BadRequest(format!(
                        "Only images are accepted ({}: {})",
                        file_name, content_type
                    )));
                }
                let data = field.bytes().await?;
                if data.len() > MAX_IMAGE_BYTES {
                    return Err(ApiError::BadRequest(format!(
                        "{} exceeds the {} MB image limit",
                        file_name,
                        MAX_IMAGE_BYTES / (1024 * 1024)
                    )));
                }
                files.push(UploadedFile {
                    file_name,
                    content_type,
                    data: data.to_vec(),
                });
            }
            "type" => {
                let text = field.text().await?;
                kind = Some(text.parse()?);
            }
            other => warn!("Ignoring unexpected upload field '{}'", other),
        }
    }

    if files.is_empty() {
        return Err(ApiError::BadRequest("No image provided".to_string()));
    }

    let catalog = match kind {
        Some(ImportKind::Luminaires) => luminaires::list_all(&state.db).await?,
        _ => Vec::new(),
    };
    let profiles = match kind {
        Some(ImportKind::Designers) => designers::list_all(&state.db).await?,
        _ => Vec::new(),
    };

    let images_dir = state.config.folders().images_path();
    tokio::fs::create_dir_all(&images_dir).await?;

    let mut stored = Vec::with_capacity(files.len());
    for file in files {
        let filename = unique_name(&file.file_name);
        let path = images_dir.join(&filename);
        tokio::fs::write(&path, &file.data).await?;

        let url = format!("/uploads/images/{}", filename);
        let path_text = path.to_string_lossy().to_string();

        let matched = match kind {
            Some(ImportKind::Luminaires) => match match_luminaire(&file.file_name, &catalog) {
                Some(l) => {
                    luminaires::set_image(&state.db, &l.id, &url, &path_text).await?;
                    Some(l.id.clone())
                }
                None => None,
            },
            Some(ImportKind::Designers) => match match_designer(&file.file_name, &profiles) {
                Some(d) => {
                    designers::set_image(&state.db, &d.name, &url, &path_text).await?;
                    Some(d.name.clone())
                }
                None => None,
            },
            None => None,
        };

        info!(
            file = %file.file_name,
            content_type = %file.content_type,
            matched = ?matched,
            "Stored image {}",
            filename
        );

        stored.push(StoredFile {
            original_name: file.file_name,
            filename,
            url,
            matched,
        });
    }

    info!(by = %admin.email, "Uploaded {} images", stored.len());
    Ok(Json(ImageUploadResponse {
        message: format!("{} images uploaded", stored.len()),
        files: stored,
    }))
}

/// POST /api/upload/video
///
/// Stores the `video` field and makes it the welcome video.
pub async fn upload_video(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    mut multipart: Multipart,
) -> ApiResult<Json<Value>> {
    let mut upload: Option<UploadedFile> = None;

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("video") {
            continue;
        }
        let file_name = field.file_name().unwrap_or("video").to_string();
        let content_type = content_type(field.content_type(), &file_name);
        if !content_type.starts_with("video/") {
            return Err(ApiError::BadRequest(format!(
                "Only videos are accepted ({}: {})",
                file_name, content_type
            )));
        }
        let data = field.bytes().await?;
        if data.len() > MAX_VIDEO_BYTES {
            return Err(ApiError::BadRequest(format!(
                "{} exceeds the {} MB video limit",
                file_name,
                MAX_VIDEO_BYTES / (1024 * 1024)
            )));
        }
        upload = Some(UploadedFile {
            file_name,
            content_type,
            data: data.to_vec(),
        });
    }

    let upload = upload.ok_or_else(|| ApiError::BadRequest("No video provided".to_string()))?;

    let videos_dir = state.config.folders().videos_path();
    tokio::fs::create_dir_all(&videos_dir).await?;

    let (_, ext) = split_name(&upload.file_name);
    let filename = unique_name(&format!("welcome-video{}", ext));
    tokio::fs::write(videos_dir.join(&filename), &upload.data).await?;

    let url = format!("/uploads/videos/{}", filename);
    set_setting(&state.db, WELCOME_VIDEO_SETTING, &url).await?;
    info!(
        by = %admin.email,
        content_type = %upload.content_type,
        "Welcome video set to {}",
        url
    );

    Ok(Json(json!({ "message": "Welcome video updated", "videoUrl": url })))
}

/// GET /api/welcome-video
pub async fn get_welcome_video(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let url = get_setting(&state.db, WELCOME_VIDEO_SETTING)
        .await?
        .filter(|u| !u.is_empty());
    Ok(Json(json!({ "videoUrl": url })))
}
