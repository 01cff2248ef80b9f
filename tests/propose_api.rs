//! HTTP-level tests for `/api/propose`.

mod common;

use axum::body::Body;
use axum::http::{header::CONTENT_TYPE, Request, StatusCode};
use common::{body_json, TestApp};
use dumb_goodies::entities::{concept, project};
use sea_orm::{EntityTrait, PaginatorTrait};
use serde_json::json;

#[tokio::test]
async fn brand_alone_gets_two_concepts() {
    let app = TestApp::new().await;
    let response = app.post_json("/api/propose", json!({ "brand": "Acme" })).await;
    assert_eq!(response.status(), StatusCode::OK);

    let header = response
        .headers()
        .get("x-project-id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .expect("project id header");
    let json = body_json(response).await;
    assert_eq!(json["projectId"], header.as_str());

    let concepts = json["concepts"].as_array().unwrap();
    assert_eq!(concepts.len(), 2);
    assert_ne!(concepts[0]["label"], concepts[1]["label"]);
    for c in concepts {
        assert!(!c["prompt_base"].as_str().unwrap().is_empty());
    }

    let project_id = uuid::Uuid::parse_str(&header).unwrap();
    let stored = project::Entity::find_by_id(project_id)
        .one(&app.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.brand, "Acme");
    assert_eq!(concept::Entity::find().count(&app.db).await.unwrap(), 2);
}

#[tokio::test]
async fn hint_becomes_the_only_concept() {
    let app = TestApp::new().await;
    let response = app
        .post_json(
            "/api/propose",
            json!({ "brand": "Acme", "product_hint": "  inflatable anvil " }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    let concepts = json["concepts"].as_array().unwrap();
    assert_eq!(concepts.len(), 1);
    assert_eq!(concepts[0]["label"], "inflatable anvil");
    assert_eq!(concepts[0]["prompt_base"], "inflatable anvil");
}

#[tokio::test]
async fn reference_photo_becomes_a_custom_product() {
    let app = TestApp::new().await;
    let response = app
        .post_json(
            "/api/propose",
            json!({
                "brand": "Acme",
                "logoUrl": "http://storage.test/uploads/logo.png",
                "product_ref_url": "http://storage.test/uploads/mug.jpg"
            }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    let concepts = json["concepts"].as_array().unwrap();
    assert_eq!(concepts.len(), 1);
    assert_eq!(concepts[0]["prompt_base"], "custom product");
}

#[tokio::test]
async fn invalid_input_is_rejected() {
    let app = TestApp::new().await;

    let response = app.post_json("/api/propose", json!({ "brand": "   " })).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app.post_json("/api/propose", json!({ "brand": "hitler mugs" })).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "Brand not allowed");

    let response = app
        .post_json("/api/propose", json!({ "brand": "Acme", "logoUrl": "not a url" }))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app.post_json("/api/propose", json!({})).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .send(
            Request::post("/api/propose")
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(response).await["error"].is_string());

    assert_eq!(project::Entity::find().count(&app.db).await.unwrap(), 0);
}
