//! HTTP-level tests for `/api/upload`.

mod common;

use axum::body::Body;
use axum::http::{header::CONTENT_TYPE, Request, StatusCode};
use common::{body_json, logo_png, multipart_body, multipart_request, TestApp, STORAGE_BASE};

#[tokio::test]
async fn get_reports_the_route_is_alive() {
    let app = TestApp::new().await;
    let response = app.get("/api/upload").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["method"], "GET");
}

#[tokio::test]
async fn png_is_stored_under_a_dated_uuid_key() {
    let app = TestApp::new().await;
    let body = multipart_body("file", Some("logo.png"), "image/png", &logo_png());
    let response = app.send(multipart_request(body)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["contentType"], "image/png");

    let url = json["url"].as_str().unwrap();
    let key = url
        .strip_prefix(&format!("{}/uploads/", STORAGE_BASE))
        .expect("upload lands in the uploads bucket");
    let parts: Vec<&str> = key.split('/').collect();
    assert_eq!(parts.len(), 2, "key is yyyy-mm-dd/uuid.ext: {}", key);
    assert!(chrono::NaiveDate::parse_from_str(parts[0], "%Y-%m-%d").is_ok());
    let (stem, ext) = parts[1].rsplit_once('.').unwrap();
    assert!(uuid::Uuid::parse_str(stem).is_ok());
    assert_eq!(ext, "png");

    let (stored, content_type) = app.store.get(url).unwrap();
    assert_eq!(content_type, "image/png");
    assert!(image::load_from_memory(&stored).is_ok());
}

#[tokio::test]
async fn svg_keeps_its_mime_type() {
    let app = TestApp::new().await;
    let svg = b"<svg xmlns='http://www.w3.org/2000/svg' width='4' height='4'/>";
    let body = multipart_body("file", Some("logo.svg"), "image/svg+xml", svg);
    let response = app.send(multipart_request(body)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["contentType"], "image/svg+xml");
    let url = json["url"].as_str().unwrap();
    assert!(url.ends_with(".svg"));
    assert_eq!(app.store.get(url).unwrap().0, svg.to_vec());
}

#[tokio::test]
async fn json_body_is_rejected() {
    let app = TestApp::new().await;
    let response = app
        .send(
            Request::post("/api/upload")
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from("{}"))
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(app.store.urls().is_empty());
}

#[tokio::test]
async fn missing_file_part_is_a_bad_request() {
    let app = TestApp::new().await;

    // A text field called "file" carries no filename.
    let body = multipart_body("file", None, "text/plain", b"hello");
    let response = app.send(multipart_request(body)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "missing_file");

    let body = multipart_body("other", Some("logo.png"), "image/png", &logo_png());
    let response = app.send(multipart_request(body)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "missing_file");
}

#[tokio::test]
async fn truncated_file_part_is_a_client_error() {
    let app = TestApp::new().await;
    let mut body = multipart_body("file", Some("logo.png"), "image/png", &logo_png());
    // Drop the closing boundary so the part never terminates.
    let closing = format!("\r\n--{}--\r\n", common::BOUNDARY).len();
    body.truncate(body.len() - closing);

    let response = app.send(multipart_request(body)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(response)
        .await["error"]
        .as_str()
        .unwrap()
        .starts_with("Failed to read file"));
    assert!(app.store.urls().is_empty());
}
