//! Integration tests for lumen-catalog API endpoints
//!
//! Tests cover:
//! - Health endpoint
//! - Similar luminaires (scored and coarse, with and without SQL pre-filter)
//! - Catalog listing, free-tier cap and pagination
//! - Admin edits, CSV import and export
//! - Designers and timeline
//! - Favorites and accounts
//! - Uploads and the welcome video
//! - Image search against a stand-in similarity API

use axum::{
    body::Body,
    extract::Multipart,
    http::{header, Request, StatusCode},
    routing::post,
    Json, Router,
};
use lumen_catalog::{build_router, AppState};
use lumen_common::api::auth::create_user;
use lumen_common::config::ServiceConfig;
use lumen_common::db::{init_database, set_setting};
use lumen_common::Role;
use serde_json::{json, Value};
use sqlx::SqlitePool;
use tempfile::TempDir;
use tower::util::ServiceExt; // for `oneshot` method

struct TestApp {
    dir: TempDir,
    db: SqlitePool,
    app: Router,
    admin: String,
    free: String,
    premium: String,
}

/// Test helper: fresh database, one user per role
async fn setup_with(image_search_url: Option<String>) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let mut config = ServiceConfig::for_root(dir.path().to_path_buf());
    config.image_search_url = image_search_url;
    config.folders().ensure_directory_exists().unwrap();

    let db = init_database(&config.folders().database_path()).await.unwrap();
    let (_, admin) = create_user(&db, "admin@example.org", Role::Admin).await.unwrap();
    let (_, free) = create_user(&db, "free@example.org", Role::Free).await.unwrap();
    let (_, premium) = create_user(&db, "premium@example.org", Role::Premium).await.unwrap();

    let app = build_router(AppState::new(db.clone(), config));
    TestApp {
        dir,
        db,
        app,
        admin,
        free,
        premium,
    }
}

async fn setup() -> TestApp {
    setup_with(None).await
}

/// Test helper: request with optional bearer token and JSON body
fn request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Test helper: send and decode a JSON response (Null for empty bodies)
async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Should read body");
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

/// Test helper: create a luminaire as admin and return its id
async fn create(t: &TestApp, body: Value) -> String {
    let (status, created) = send(&t.app, request("POST", "/api/luminaires", Some(&t.admin), Some(body))).await;
    assert_eq!(status, StatusCode::CREATED, "create failed: {}", created);
    created["id"].as_str().unwrap().to_string()
}

/// Test helper: multipart body from `(field, file name, content type, data)`
fn multipart(parts: &[(&str, Option<&str>, Option<&str>, &[u8])]) -> (String, Vec<u8>) {
    let boundary = "lumen-test-boundary";
    let mut body = Vec::new();
    for (name, file_name, content_type, data) in parts {
        body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
        match file_name {
            Some(file_name) => body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                    name, file_name
                )
                .as_bytes(),
            ),
            None => body.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{}\"\r\n", name).as_bytes(),
            ),
        }
        if let Some(content_type) = content_type {
            body.extend_from_slice(format!("Content-Type: {}\r\n", content_type).as_bytes());
        }
        body.extend_from_slice(b"\r\n");
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", boundary).as_bytes());
    (format!("multipart/form-data; boundary={}", boundary), body)
}

fn multipart_request(uri: &str, token: &str, parts: &[(&str, Option<&str>, Option<&str>, &[u8])]) -> Request<Body> {
    let (content_type, body) = multipart(parts);
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(header::CONTENT_TYPE, content_type)
        .body(Body::from(body))
        .unwrap()
}

/// Target plus candidates A, B, C (target id reused is impossible over HTTP) and D
async fn seed_similarity(t: &TestApp) -> (String, String, String, String) {
    let target = create(
        t,
        json!({"name": "Cible", "artist": "Gallé", "specialty": "verrerie", "year": "1900"}),
    )
    .await;
    let a = create(t, json!({"name": "A", "artist": "Gallé", "year": "1905"})).await;
    let b = create(t, json!({"name": "B", "specialty": "verrerie"})).await;
    let d = create(t, json!({"name": "D", "artist": "gallé"})).await;
    create(t, json!({"name": "Sans rapport", "artist": "Daum", "year": ""})).await;
    (target, a, b, d)
}

fn ids(items: &Value) -> Vec<String> {
    items
        .as_array()
        .unwrap()
        .iter()
        .map(|entry| entry["luminaire"]["id"].as_str().unwrap().to_string())
        .collect()
}

// =============================================================================
// Health Endpoint
// =============================================================================

#[tokio::test]
async fn test_health_endpoint_no_auth_required() {
    let t = setup().await;
    let (status, body) = send(&t.app, request("GET", "/health", None, None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "lumen-catalog");
    assert!(body["version"].is_string());
}

// =============================================================================
// Similar Luminaires
// =============================================================================

#[tokio::test]
async fn test_similar_scored_order() {
    let t = setup().await;
    let (target, a, b, d) = seed_similarity(&t).await;

    let (status, body) = send(
        &t.app,
        request("GET", &format!("/api/luminaires/similar/{}", target), None, None),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&body), vec![a, d, b]);
    let scores: Vec<u64> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["score"].as_u64().unwrap())
        .collect();
    assert_eq!(scores, vec![4, 3, 2]);
}

#[tokio::test]
async fn test_similar_prefiltered_matches_full_scan() {
    let t = setup().await;
    let (target, ..) = seed_similarity(&t).await;
    let uri = format!("/api/luminaires/similar/{}", target);

    let (_, full) = send(&t.app, request("GET", &uri, None, None)).await;

    set_setting(&t.db, "similarity_prefilter_threshold", "0").await.unwrap();
    let (status, prefiltered) = send(&t.app, request("GET", &uri, None, None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(full, prefiltered);
}

#[tokio::test]
async fn test_similar_limit() {
    let t = setup().await;
    let (target, a, _, _) = seed_similarity(&t).await;

    let (_, body) = send(
        &t.app,
        request("GET", &format!("/api/luminaires/similar/{}?limit=1", target), None, None),
    )
    .await;
    assert_eq!(ids(&body), vec![a]);

    let (_, body) = send(
        &t.app,
        request("GET", &format!("/api/luminaires/similar/{}?limit=0", target), None, None),
    )
    .await;
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn test_similar_coarse_storage_order_without_scores() {
    let t = setup().await;
    let (target, a, b, d) = seed_similarity(&t).await;

    let (status, body) = send(
        &t.app,
        request("GET", &format!("/api/luminaires/similar/{}?mode=coarse", target), None, None),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&body), vec![a.clone(), b, d]);
    assert!(body[0].get("score").is_none());

    let (_, limited) = send(
        &t.app,
        request(
            "GET",
            &format!("/api/luminaires/similar/{}?mode=coarse&limit=1", target),
            None,
            None,
        ),
    )
    .await;
    assert_eq!(ids(&limited), vec![a]);
}

#[tokio::test]
async fn test_similar_unconstrained_target_coarse_returns_everything_else() {
    let t = setup().await;
    let bare = create(&t, json!({"name": "Nue"})).await;
    let other = create(&t, json!({"name": "Autre", "artist": "Daum"})).await;

    let (_, coarse) = send(
        &t.app,
        request("GET", &format!("/api/luminaires/similar/{}?mode=coarse", bare), None, None),
    )
    .await;
    assert_eq!(ids(&coarse), vec![other]);

    let (_, scored) = send(
        &t.app,
        request("GET", &format!("/api/luminaires/similar/{}", bare), None, None),
    )
    .await;
    assert_eq!(scored, json!([]));
}

#[tokio::test]
async fn test_similar_overlong_year() {
    let t = setup().await;
    let odd = create(&t, json!({"name": "Datée", "year": "99999999999999999999"})).await;
    let twin = create(&t, json!({"name": "Jumelle", "year": "99999999999999999999"})).await;
    create(&t, json!({"name": "Ancienne", "year": "1900"})).await;

    for mode in ["scored", "coarse"] {
        let (status, body) = send(
            &t.app,
            request(
                "GET",
                &format!("/api/luminaires/similar/{}?mode={}", odd, mode),
                None,
                None,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "mode {}", mode);
        assert_eq!(ids(&body), vec![twin.clone()], "mode {}", mode);
    }
}

#[tokio::test]
async fn test_similar_errors() {
    let t = setup().await;
    let (target, ..) = seed_similarity(&t).await;

    let (status, body) = send(&t.app, request("GET", "/api/luminaires/similar/nope", None, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");

    let (status, _) = send(
        &t.app,
        request("GET", &format!("/api/luminaires/similar/{}?mode=fuzzy", target), None, None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// =============================================================================
// Listing
// =============================================================================

async fn seed_many(t: &TestApp, n: usize) {
    for i in 0..n {
        create(t, json!({"name": format!("Lampe {:02}", i), "year": (1900 + i).to_string()})).await;
    }
}

#[tokio::test]
async fn test_listing_free_cap() {
    let t = setup().await;
    seed_many(&t, 25).await;

    for token in [None, Some(t.free.as_str())] {
        let (status, body) = send(&t.app, request("GET", "/api/luminaires", token, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 10);
        assert_eq!(body["luminaires"].as_array().unwrap().len(), 10);
        assert_eq!(body["hasMore"], false);

        let (_, page2) = send(&t.app, request("GET", "/api/luminaires?page=2&limit=5", token, None)).await;
        assert_eq!(page2["luminaires"].as_array().unwrap().len(), 5);
        assert_eq!(page2["hasMore"], false);
    }

    let (_, body) = send(&t.app, request("GET", "/api/luminaires", Some(&t.premium), None)).await;
    assert_eq!(body["total"], 25);
    assert_eq!(body["luminaires"].as_array().unwrap().len(), 25);
}

#[tokio::test]
async fn test_listing_pagination_and_sort() {
    let t = setup().await;
    seed_many(&t, 25).await;

    let (_, body) = send(
        &t.app,
        request("GET", "/api/luminaires?limit=10&page=3&sort=name-asc", Some(&t.premium), None),
    )
    .await;
    assert_eq!(body["page"], 3);
    assert_eq!(body["totalPages"], 3);
    assert_eq!(body["hasMore"], false);
    assert_eq!(body["luminaires"].as_array().unwrap().len(), 5);
    assert_eq!(body["luminaires"][0]["name"], "Lampe 20");

    let (_, body) = send(
        &t.app,
        request("GET", "/api/luminaires?limit=2&sort=year-desc", Some(&t.premium), None),
    )
    .await;
    assert_eq!(body["luminaires"][0]["year"], "1924");
    assert_eq!(body["hasMore"], true);
}

#[tokio::test]
async fn test_listing_filters() {
    let t = setup().await;
    create(&t, json!({"name": "Tulipe", "artist": "Gallé", "year": "1895"})).await;
    create(&t, json!({"name": "Arco", "artist": "Castiglioni", "year": "1962"})).await;
    create(&t, json!({"name": "Tizio", "artist": "Sapper", "year": "1972"})).await;

    let names = |body: &Value| -> Vec<String> {
        body["luminaires"]
            .as_array()
            .unwrap()
            .iter()
            .map(|l| l["name"].as_str().unwrap().to_string())
            .collect()
    };

    let (_, body) = send(&t.app, request("GET", "/api/luminaires?artist=gall%C3%A9", Some(&t.admin), None)).await;
    assert_eq!(names(&body), vec!["Tulipe"]);

    let (_, body) = send(&t.app, request("GET", "/api/luminaires?artist=all", Some(&t.admin), None)).await;
    assert_eq!(body["total"], 3);

    let (_, body) = send(
        &t.app,
        request("GET", "/api/luminaires?yearMin=1960&yearMax=1970", Some(&t.admin), None),
    )
    .await;
    assert_eq!(names(&body), vec!["Arco"]);

    let (_, body) = send(
        &t.app,
        request("GET", "/api/luminaires?period=1970%20-%201979", Some(&t.admin), None),
    )
    .await;
    assert_eq!(names(&body), vec!["Tizio"]);

    let (_, body) = send(&t.app, request("GET", "/api/luminaires?search=arc", Some(&t.admin), None)).await;
    assert_eq!(names(&body), vec!["Arco"]);
}

// =============================================================================
// Admin edits
// =============================================================================

#[tokio::test]
async fn test_update_and_delete_luminaire() {
    let t = setup().await;
    let id = create(&t, json!({"name": "Lampe", "year": "1950"})).await;
    let uri = format!("/api/luminaires/{}", id);

    let (status, body) = send(
        &t.app,
        request("PUT", &uri, Some(&t.admin), Some(json!({"artist": "Mouille"}))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["artist"], "Mouille");
    assert_eq!(body["year"], "1950");

    let (status, _) = send(&t.app, request("DELETE", &uri, Some(&t.admin), None)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&t.app, request("GET", &uri, None, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&t.app, request("DELETE", &uri, Some(&t.admin), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_create_requires_name() {
    let t = setup().await;
    let (status, body) = send(
        &t.app,
        request("POST", "/api/luminaires", Some(&t.admin), Some(json!({"artist": "X"}))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

// =============================================================================
// CSV import / export
// =============================================================================

#[tokio::test]
async fn test_csv_import_and_designers() {
    let t = setup().await;

    let (status, body) = send(
        &t.app,
        request(
            "POST",
            "/api/upload/csv",
            Some(&t.admin),
            Some(json!({
                "type": "luminaires",
                "data": [
                    {"Nom luminaire": "Libellule", "Artiste / Dates": "Émile Gallé", "Année": "1900"},
                    {"Nom luminaire": "Champignon", "Artiste / Dates": "Émile Gallé", "Année": "1904"},
                    {"name": "Arco", "artist": "Achille Castiglioni", "year": "1962"},
                    {"Artiste / Dates": "sans nom"}
                ]
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 3);
    assert_eq!(body["skipped"], 1);

    let (status, body) = send(
        &t.app,
        request(
            "POST",
            "/api/upload/csv",
            Some(&t.admin),
            Some(json!({
                "type": "designers",
                "data": [
                    {"Nom": "Achille Castiglioni", "imagedesigner": "castiglioni.jpg"},
                    {"Nom": "Émile Gallé"}
                ]
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);

    let (_, designers) = send(&t.app, request("GET", "/api/designers?sort=count-desc", None, None)).await;
    let designers = designers.as_array().unwrap();
    assert_eq!(designers[0]["name"], "Émile Gallé");
    assert_eq!(designers[0]["count"], 2);
    assert_eq!(designers[0]["slug"], "%C3%89mile%20Gall%C3%A9");
    assert_eq!(designers[0]["luminaires"].as_array().unwrap().len(), 2);
    assert_eq!(designers[1]["imageFile"], "castiglioni.jpg");

    let (status, detail) = send(
        &t.app,
        request("GET", "/api/designers/%C3%89mile%20Gall%C3%A9", None, None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["name"], "Émile Gallé");
    assert_eq!(detail["count"], 2);
    assert_eq!(detail["image"], "");

    let (status, _) = send(
        &t.app,
        request("POST", "/api/upload/csv", Some(&t.admin), Some(json!({"type": "lamps", "data": []}))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_designer_without_profile_resolves() {
    let t = setup().await;
    create(&t, json!({"name": "Spider", "artist": "Joe Colombo"})).await;

    let (status, detail) = send(&t.app, request("GET", "/api/designers/Joe%20Colombo", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["count"], 1);
    assert_eq!(detail["specialty"], "");
}

#[tokio::test]
async fn test_designer_upsert() {
    let t = setup().await;

    let (status, _) = send(
        &t.app,
        request("POST", "/api/designers", Some(&t.admin), Some(json!({"name": "Flos"}))),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(
        &t.app,
        request(
            "PUT",
            "/api/designers/Flos",
            Some(&t.admin),
            Some(json!({"description": "Éditeur"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["description"], "Éditeur");
}

#[tokio::test]
async fn test_export_csv() {
    let t = setup().await;
    create(&t, json!({"name": "Lampe \"Bouillotte\"", "materials": "bronze, tôle"})).await;

    let response = t
        .app
        .clone()
        .oneshot(request("GET", "/api/export/csv", Some(&t.admin), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/csv"));

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let csv = String::from_utf8(bytes.to_vec()).unwrap();
    let mut lines = csv.lines();
    assert!(lines.next().unwrap().starts_with("\"ID\",\"Nom du luminaire\",\"Artiste / Dates\""));
    let row = lines.next().unwrap();
    assert!(row.contains("\"Lampe \"\"Bouillotte\"\"\""));
    assert!(row.contains("\"bronze, tôle\""));
}

// =============================================================================
// Timeline
// =============================================================================

#[tokio::test]
async fn test_timeline_groups_and_descriptions() {
    let t = setup().await;
    let id = create(&t, json!({"name": "Vase lampe", "year": "1895"})).await;

    let (status, _) = send(
        &t.app,
        request(
            "POST",
            "/api/timeline/descriptions",
            Some(&t.admin),
            Some(json!({"periodName": "Art Nouveau", "description": "Courbes et libellules"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, timeline) = send(&t.app, request("GET", "/api/timeline", None, None)).await;
    let periods = timeline.as_array().unwrap();
    let find = |name: &str| periods.iter().find(|p| p["name"] == name).unwrap().clone();

    assert_eq!(find("XIXe siècle")["luminaires"][0]["id"], id.as_str());
    assert_eq!(find("Art Nouveau")["luminaires"][0]["id"], id.as_str());
    assert_eq!(find("Art Nouveau")["description"], "Courbes et libellules");
    assert!(find("Art Déco")["luminaires"].as_array().unwrap().is_empty());

    let (_, descriptions) = send(&t.app, request("GET", "/api/timeline/descriptions", None, None)).await;
    assert_eq!(descriptions["Art Nouveau"], "Courbes et libellules");
}

// =============================================================================
// Favorites and accounts
// =============================================================================

#[tokio::test]
async fn test_favorites_toggle_and_filter() {
    let t = setup().await;
    let liked = create(&t, json!({"name": "Aimée"})).await;
    create(&t, json!({"name": "Ignorée"})).await;
    let uri = format!("/api/favorites/{}", liked);

    let (status, body) = send(&t.app, request("POST", &uri, Some(&t.free), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["favorite"], true);

    let (_, list) = send(&t.app, request("GET", "/api/favorites", Some(&t.free), None)).await;
    assert_eq!(list[0]["id"], liked.as_str());

    let (_, filtered) = send(&t.app, request("GET", "/api/luminaires?favorites=true", Some(&t.free), None)).await;
    assert_eq!(filtered["total"], 1);

    let (_, body) = send(&t.app, request("POST", &uri, Some(&t.free), None)).await;
    assert_eq!(body["favorite"], false);

    let (status, _) = send(&t.app, request("POST", "/api/favorites/missing", Some(&t.free), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&t.app, request("GET", "/api/luminaires?favorites=true", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_create_user_and_me() {
    let t = setup().await;

    let (status, body) = send(
        &t.app,
        request(
            "POST",
            "/api/users",
            Some(&t.admin),
            Some(json!({"email": "new@example.org", "role": "premium"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let token = body["token"].as_str().unwrap().to_string();

    let (status, me) = send(&t.app, request("GET", "/api/me", Some(&token), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["email"], "new@example.org");
    assert_eq!(me["role"], "premium");

    let (status, _) = send(
        &t.app,
        request(
            "POST",
            "/api/users",
            Some(&t.admin),
            Some(json!({"email": "new@example.org"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// =============================================================================
// Uploads
// =============================================================================

#[tokio::test]
async fn test_image_upload_attaches_and_serves() {
    let t = setup().await;
    let id = create(&t, json!({"name": "Arco", "filename": "arco_01.jpg"})).await;
    let png: &[u8] = b"\x89PNG\r\n\x1a\nfake";

    let (status, body) = send(
        &t.app,
        multipart_request(
            "/api/upload/images",
            &t.admin,
            &[
                ("type", None, None, b"luminaires"),
                ("images", Some("arco_01.jpg"), Some("image/jpeg"), png),
            ],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["files"][0]["matched"], id.as_str());

    let url = body["files"][0]["url"].as_str().unwrap().to_string();
    let (_, luminaire) = send(&t.app, request("GET", &format!("/api/luminaires/{}", id), None, None)).await;
    assert_eq!(luminaire["imageUrl"], url.as_str());

    let response = t.app.clone().oneshot(request("GET", &url, None, None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let served = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&served[..], png);

    assert!(t.dir.path().join("uploads/images").read_dir().unwrap().count() == 1);
}

#[tokio::test]
async fn test_image_upload_rejects_non_images() {
    let t = setup().await;
    let (status, _) = send(
        &t.app,
        multipart_request(
            "/api/upload/images",
            &t.admin,
            &[("images", Some("notes.txt"), Some("text/plain"), b"hello")],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_welcome_video() {
    let t = setup().await;

    let (_, body) = send(&t.app, request("GET", "/api/welcome-video", None, None)).await;
    assert_eq!(body["videoUrl"], Value::Null);

    let (status, uploaded) = send(
        &t.app,
        multipart_request(
            "/api/upload/video",
            &t.admin,
            &[("video", Some("intro.mp4"), Some("video/mp4"), b"\x00\x00\x00\x18ftypmp42")],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let url = uploaded["videoUrl"].as_str().unwrap();
    assert!(url.starts_with("/uploads/videos/welcome-video-"));
    assert!(url.ends_with(".mp4"));

    let (_, body) = send(&t.app, request("GET", "/api/welcome-video", None, None)).await;
    assert_eq!(body["videoUrl"], url);
}

// =============================================================================
// Image search
// =============================================================================

/// Serve `router` on an ephemeral port and return its search URL
async fn spawn_api(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}/api/search", addr)
}

/// Stand-in for the external similarity API
async fn spawn_similarity_api() -> String {
    async fn search(mut multipart: Multipart) -> Json<Value> {
        let mut top_k = 0;
        let mut got_image = false;
        while let Some(field) = multipart.next_field().await.unwrap() {
            match field.name() {
                Some("image") => got_image = !field.bytes().await.unwrap().is_empty(),
                Some("top_k") => top_k = field.text().await.unwrap().parse().unwrap(),
                _ => {}
            }
        }
        assert!(got_image);
        // Slow enough for concurrent callers to overlap
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        Json(json!({
            "results": [
                {"image_id": "arco_01.jpg#3", "similarity": 0.93, "image_url": "/images/arco_01.jpg"},
                {"image_id": "inconnu.jpg", "similarity": 0.41, "image_url": "inconnu.jpg"}
            ],
            "top_k": top_k
        }))
    }

    spawn_api(Router::new().route("/api/search", post(search))).await
}

/// Similarity API that always fails
async fn spawn_failing_api() -> String {
    async fn search() -> (StatusCode, &'static str) {
        (StatusCode::INTERNAL_SERVER_ERROR, "model not loaded")
    }

    spawn_api(Router::new().route("/api/search", post(search))).await
}

fn image_search_request(token: &str) -> Request<Body> {
    multipart_request(
        "/api/search/image",
        token,
        &[
            ("image", Some("photo.jpg"), Some("image/jpeg"), b"jpeg"),
            ("top_k", None, None, b"5"),
        ],
    )
}

async fn search_count(db: &SqlitePool, email: &str) -> i64 {
    sqlx::query_scalar("SELECT search_count FROM users WHERE email = ?")
        .bind(email)
        .fetch_one(db)
        .await
        .unwrap()
}

#[tokio::test]
async fn test_image_search_disabled_without_url() {
    let t = setup().await;
    let (status, body) = send(
        &t.app,
        multipart_request(
            "/api/search/image",
            &t.free,
            &[("image", Some("photo.jpg"), Some("image/jpeg"), b"jpeg")],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"]["code"], "UNAVAILABLE");
}

#[tokio::test]
async fn test_image_search_matches_and_quota() {
    let api = spawn_similarity_api().await;
    let t = setup_with(Some(api.clone())).await;
    let id = create(&t, json!({"name": "Arco", "filename": "ARCO_01.jpg"})).await;
    let origin = api.trim_end_matches("/api/search");

    let search = image_search_request;

    let (status, body) = send(&t.app, search(&t.free)).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["remaining"], 2);
    assert_eq!(body["results"][0]["imageId"], "arco_01.jpg");
    assert_eq!(body["results"][0]["slug"], "arco_01");
    assert_eq!(body["results"][0]["luminaire"]["id"], id.as_str());
    assert_eq!(
        body["results"][0]["imageUrl"],
        format!("{}/images/arco_01.jpg", origin).as_str()
    );
    assert_eq!(
        body["results"][1]["imageUrl"],
        format!("{}/images/inconnu.jpg", origin).as_str()
    );
    assert_eq!(body["results"][1]["luminaire"], Value::Null);

    send(&t.app, search(&t.free)).await;
    let (status, body) = send(&t.app, search(&t.free)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["remaining"], 0);

    let (status, body) = send(&t.app, search(&t.free)).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"]["code"], "TOO_MANY_REQUESTS");

    for _ in 0..4 {
        let (status, body) = send(&t.app, search(&t.premium)).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.get("remaining").is_none());
    }
}

#[tokio::test]
async fn test_concurrent_image_searches_respect_quota() {
    let t = setup_with(Some(spawn_similarity_api().await)).await;

    let handles: Vec<_> = (0..6)
        .map(|_| {
            let app = t.app.clone();
            let request = image_search_request(&t.free);
            tokio::spawn(async move { app.oneshot(request).await.unwrap().status() })
        })
        .collect();

    let mut statuses = Vec::new();
    for handle in handles {
        statuses.push(handle.await.unwrap());
    }

    let ok = statuses.iter().filter(|s| **s == StatusCode::OK).count();
    let limited = statuses
        .iter()
        .filter(|s| **s == StatusCode::TOO_MANY_REQUESTS)
        .count();
    assert_eq!((ok, limited), (3, 3), "statuses: {:?}", statuses);
    assert_eq!(search_count(&t.db, "free@example.org").await, 3);
}

#[tokio::test]
async fn test_failed_image_search_does_not_count() {
    let t = setup_with(Some(spawn_failing_api().await)).await;

    for _ in 0..4 {
        let (status, body) = send(&t.app, image_search_request(&t.free)).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"]["code"], "UPSTREAM_ERROR");
    }
    assert_eq!(search_count(&t.db, "free@example.org").await, 0);
}
