mod common;

use axum::http::StatusCode;
use common::TestApp;
use serde_json::{json, Value};

fn material_body(name: &str, cas_number: &str) -> Value {
    json!({
        "name": name,
        "cas_number": cas_number,
        "unit": "kg",
        "concentration": 37,
        "category": "acid",
        "storage_condition": "ventilated cabinet",
        "min_stock_threshold": 25
    })
}

#[tokio::test]
async fn material_crud() {
    let app = TestApp::new().await;

    let (status, created) = app
        .post("/materials", material_body("Hydrochloric acid", "7647-01-0"))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{created}");
    let id = created["material_id"].as_i64().unwrap();

    let (status, material) = app.get(&format!("/materials/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(material["name"], "Hydrochloric acid");
    assert_eq!(material["stock"], json!(0.0));
    assert_eq!(material["concentration"], json!(37.0));

    let mut update = material_body("Hydrochloric acid", "7647-01-0");
    update["concentration"] = json!(32.5);
    let (status, _) = app.put(&format!("/materials/{id}"), update).await;
    assert_eq!(status, StatusCode::OK);

    let (_, material) = app.get(&format!("/materials/{id}")).await;
    assert_eq!(material["concentration"], json!(32.5));
    assert_eq!(material["stock"], json!(0.0));

    let (status, list) = app.get("/materials").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 1);

    let (status, _) = app.delete(&format!("/materials/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    let (status, err) = app.get(&format!("/materials/{id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(err["code"], "not_found");
}

#[tokio::test]
async fn duplicate_cas_number_conflicts() {
    let app = TestApp::new().await;
    app.seed_material("Acetone", "67-64-1").await;

    let (status, err) = app
        .post("/materials", material_body("Dimethyl ketone", "67-64-1"))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(err["code"], "conflict");
    assert_eq!(app.count("chemical_materials").await, 1);
}

#[tokio::test]
async fn concentration_must_be_a_percentage() {
    let app = TestApp::new().await;
    let mut body = material_body("Oleum", "8014-95-7");
    body["concentration"] = json!(104);

    let (status, err) = app.post("/materials", body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["field"], "concentration");
    assert_eq!(err["reason"], "must be between 0 and 100");
}

#[tokio::test]
async fn blank_text_field_is_rejected() {
    let app = TestApp::new().await;
    let mut body = material_body("Toluene", "108-88-3");
    body["category"] = json!("   ");

    let (status, err) = app.post("/materials", body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["field"], "category");
    assert_eq!(err["reason"], "must not be empty");
}

#[tokio::test]
async fn updating_missing_material_is_not_found() {
    let app = TestApp::new().await;
    let (status, _) = app
        .put("/materials/99", material_body("Ghost", "0-00-0"))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn product_crud_and_hazard_rating() {
    let app = TestApp::new().await;

    let (status, err) = app
        .post(
            "/products",
            json!({"name": "Bleach", "unit": "L", "hazard_rating": "X"}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["field"], "hazard_rating");

    let id = app.seed_product("Bleach").await;
    let (status, err) = app
        .post(
            "/products",
            json!({"name": "Bleach", "unit": "L", "hazard_rating": "I"}),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(err["code"], "conflict");

    let (status, _) = app
        .put(
            &format!("/products/{id}"),
            json!({"name": "Bleach 5%", "unit": "L", "hazard_rating": "III"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, product) = app.get(&format!("/products/{id}")).await;
    assert_eq!(product["name"], "Bleach 5%");
    assert_eq!(product["hazard_rating"], "III");
    assert_eq!(product["stock"], json!(0.0));

    let (status, _) = app.delete(&format!("/products/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.delete(&format!("/products/{id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn health_endpoints() {
    let app = TestApp::new().await;

    let (status, body) = app.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "up");

    let (status, body) = app.get("/health/ready").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ready"], true);
}

#[tokio::test]
async fn openapi_document_is_served() {
    let app = TestApp::new().await;
    let (status, doc) = app.get("/api-docs/openapi.json").await;
    assert_eq!(status, StatusCode::OK);
    assert!(doc["paths"]["/purchase_records"].is_object());
}
