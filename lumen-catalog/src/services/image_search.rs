//! Client for the external image-similarity API
//!
//! The API takes a multipart upload (`image`, `top_k`) and answers
//! `{"results": [{image_id, similarity, image_url, metadata}]}`. Results
//! are normalized here and matched to local luminaires by filename.

use lumen_common::Luminaire;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

const USER_AGENT: &str = concat!("lumen-catalog/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT_SECS: u64 = 60;

/// Image search client errors
#[derive(Debug, Error)]
pub enum ImageSearchError {
    /// Configured URL is unusable
    #[error("Invalid image search URL: {0}")]
    InvalidUrl(String),

    /// Network communication error
    #[error("Network error: {0}")]
    NetworkError(String),

    /// API returned an error status
    #[error("API error {0}: {1}")]
    ApiError(u16, String),

    /// Response body did not have the expected shape
    #[error("Parse error: {0}")]
    ParseError(String),
}

/// One result as the API sends it
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawResult {
    #[serde(default)]
    pub image_id: Option<Value>,
    #[serde(default)]
    pub similarity: Option<f64>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub metadata: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    results: Option<Vec<RawResult>>,
}

/// A normalized search hit
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageMatch {
    /// Image id without any `#fragment`
    pub image_id: String,
    /// Image id without its extension
    pub slug: String,
    /// Absolute image URL, `None` when the API gave none
    pub image_url: Option<String>,
    pub similarity: f64,
    pub metadata: Value,
    /// Local luminaire whose filename matches the image id
    pub luminaire: Option<Luminaire>,
}

fn strip_fragment(s: &str) -> &str {
    s.split('#').next().unwrap_or_default()
}

/// File name without its final extension
pub fn strip_extension(name: &str) -> &str {
    match name.rfind('.') {
        Some(dot) if dot > 0 => &name[..dot],
        _ => name,
    }
}

/// Make an image URL absolute against the API origin
///
/// Absolute URLs are kept, rooted paths get the origin prepended, bare
/// names are looked up under `/images/`.
pub fn resolve_image_url(raw: Option<&str>, origin: &str) -> Option<String> {
    let url = raw.map(str::trim).filter(|u| !u.is_empty())?;
    let url = strip_fragment(url);

    if url.starts_with("http://") || url.starts_with("https://") {
        Some(url.to_string())
    } else if url.starts_with('/') {
        Some(format!("{}{}", origin, url))
    } else {
        Some(format!("{}/images/{}", origin, url))
    }
}

/// First luminaire whose filename equals `image_id` or contains its stem
///
/// Comparison ignores case. Luminaires without a filename never match, and
/// neither does an image id with an empty stem.
pub fn find_local_match<'a>(image_id: &str, luminaires: &'a [Luminaire]) -> Option<&'a Luminaire> {
    let wanted = image_id.to_lowercase();
    let stem = strip_extension(&wanted);
    if stem.is_empty() {
        return None;
    }

    luminaires.iter().find(|l| {
        let local = l.filename.as_deref().unwrap_or_default().to_lowercase();
        !local.is_empty() && (local == wanted || local.contains(stem))
    })
}

/// Normalize one raw API result
pub fn normalize(raw: RawResult, index: usize, origin: &str, luminaires: &[Luminaire]) -> ImageMatch {
    let image_id = match raw.image_id {
        Some(Value::String(s)) if !s.is_empty() => s,
        Some(Value::Number(n)) => n.to_string(),
        _ => format!("result_{}", index),
    };
    let image_id = strip_fragment(&image_id).to_string();

    ImageMatch {
        slug: strip_extension(&image_id).to_string(),
        image_url: resolve_image_url(raw.image_url.as_deref(), origin),
        similarity: raw.similarity.unwrap_or(0.0),
        metadata: raw.metadata.unwrap_or_else(|| Value::Object(Default::default())),
        luminaire: find_local_match(&image_id, luminaires).cloned(),
        image_id,
    }
}

/// Image-similarity API client
#[derive(Debug, Clone)]
pub struct ImageSearchClient {
    http_client: reqwest::Client,
    search_url: String,
    origin: String,
}

impl ImageSearchClient {
    /// Client for the search endpoint at `search_url`
    pub fn new(search_url: &str) -> Result<Self, ImageSearchError> {
        let parsed = reqwest::Url::parse(search_url)
            .map_err(|e| ImageSearchError::InvalidUrl(format!("{}: {}", search_url, e)))?;
        let origin = parsed.origin().ascii_serialization();
        if origin == "null" {
            return Err(ImageSearchError::InvalidUrl(search_url.to_string()));
        }

        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| ImageSearchError::NetworkError(e.to_string()))?;

        Ok(Self {
            http_client,
            search_url: search_url.to_string(),
            origin,
        })
    }

    /// `scheme://host[:port]` of the API, used to resolve relative URLs
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Send one image and return the raw results
    pub async fn search(
        &self,
        image: Vec<u8>,
        file_name: &str,
        content_type: &str,
        top_k: u32,
    ) -> Result<Vec<RawResult>, ImageSearchError> {
        let part = Part::bytes(image)
            .file_name(file_name.to_string())
            .mime_str(content_type)
            .map_err(|e| ImageSearchError::NetworkError(e.to_string()))?;
        let form = Form::new().part("image", part).text("top_k", top_k.to_string());

        tracing::debug!(url = %self.search_url, file = %file_name, top_k, "Querying image search API");

        let response = self
            .http_client
            .post(&self.search_url)
            .header(reqwest::header::ACCEPT, "application/json")
            .multipart(form)
            .send()
            .await
            .map_err(|e| ImageSearchError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ImageSearchError::ApiError(status.as_u16(), error_text));
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| ImageSearchError::ParseError(e.to_string()))?;

        body.results
            .ok_or_else(|| ImageSearchError::ParseError("response has no results array".to_string()))
    }
}
