mod common;

use axum::http::{Method, StatusCode};
use common::{read, TestApp};
use serde_json::{json, Value};

struct Fixture {
    app: TestApp,
    supplier_id: i32,
    buyer_id: i32,
    acid: i32,
    base: i32,
}

async fn fixture() -> Fixture {
    let app = TestApp::new().await;
    let supplier_id = app.seed_supplier("Sinochem Trading").await;
    let buyer_id = app.seed_buyer("Zhang Min").await;
    let acid = app.seed_material("Sulfuric acid", "7664-93-9").await;
    let base = app.seed_material("Sodium hydroxide", "1310-73-2").await;
    Fixture {
        app,
        supplier_id,
        buyer_id,
        acid,
        base,
    }
}

fn purchase(f: &Fixture, materials: Value) -> Value {
    json!({
        "supplier_id": f.supplier_id,
        "date": "2024-01-15",
        "employee_id": f.buyer_id,
        "materials": materials
    })
}

#[tokio::test]
async fn creates_record_with_all_lines() {
    let f = fixture().await;

    let (status, body) = f
        .app
        .post(
            "/purchase_records",
            purchase(
                &f,
                json!([
                    {"material_id": f.acid, "quantity": 100, "unit_price": 12.5},
                    {"material_id": f.base, "quantity": "40", "unit_price": "3.25"}
                ]),
            ),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert!(body["message"].is_string());
    let record_id = body["new_record_id"].as_i64().unwrap();

    let (status, lines) = f
        .app
        .get(&format!("/purchase_records/{record_id}/materials"))
        .await;
    assert_eq!(status, StatusCode::OK);
    let lines = lines.as_array().unwrap();
    assert_eq!(lines.len(), 2);

    let mut submitted: Vec<(i64, f64, f64)> = lines
        .iter()
        .map(|l| {
            (
                l["material_id"].as_i64().unwrap(),
                l["quantity"].as_f64().unwrap(),
                l["unit_price"].as_f64().unwrap(),
            )
        })
        .collect();
    submitted.sort_by_key(|(id, _, _)| *id);
    let mut expected = vec![
        (f.acid as i64, 100.0, 12.5),
        (f.base as i64, 40.0, 3.25),
    ];
    expected.sort_by_key(|(id, _, _)| *id);
    assert_eq!(submitted, expected);
    assert_eq!(lines[0]["unit"], "kg");

    let (status, detail) = f
        .app
        .get(&format!("/purchase_records/{record_id}"))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["supplier_name"], "Sinochem Trading");
    assert_eq!(detail["employee_name"], "Zhang Min");
    assert_eq!(detail["date"], "2024-01-15");
}

#[tokio::test]
async fn unknown_material_rejects_whole_record() {
    let f = fixture().await;

    let (status, body) = f
        .app
        .post(
            "/purchase_records",
            purchase(
                &f,
                json!([
                    {"material_id": f.acid, "quantity": 10, "unit_price": 1},
                    {"material_id": 9001, "quantity": 10, "unit_price": 1},
                    {"material_id": 9002, "quantity": 10, "unit_price": 1}
                ]),
            ),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "missing_reference");
    assert_eq!(
        body["missing"],
        json!([{"entity": "material", "ids": [9001, 9002]}])
    );
    assert_eq!(f.app.count("purchase_records").await, 0);
    assert_eq!(f.app.count("purchase_materials").await, 0);
}

#[tokio::test]
async fn unknown_supplier_and_buyer_are_both_reported() {
    let f = fixture().await;

    let (status, body) = f
        .app
        .post(
            "/purchase_records",
            json!({
                "supplier_id": 77,
                "date": "2024-01-15",
                "employee_id": 88,
                "materials": [{"material_id": f.acid, "quantity": 1, "unit_price": 1}]
            }),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let entities: Vec<&str> = body["missing"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["entity"].as_str().unwrap())
        .collect();
    assert_eq!(entities, vec!["supplier", "buyer"]);
}

#[tokio::test]
async fn missing_header_field_is_named() {
    let f = fixture().await;
    let mut body = purchase(
        &f,
        json!([{"material_id": f.acid, "quantity": 1, "unit_price": 1}]),
    );
    body.as_object_mut().unwrap().remove("supplier_id");

    let (status, err) = f.app.post("/purchase_records", body).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["code"], "validation_error");
    assert_eq!(err["field"], "supplier_id");
    assert_eq!(err["reason"], "missing");
}

#[tokio::test]
async fn empty_materials_is_rejected() {
    let f = fixture().await;

    let (status, err) = f
        .app
        .post("/purchase_records", purchase(&f, json!([])))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["field"], "materials");
    assert_eq!(f.app.count("purchase_records").await, 0);
}

#[tokio::test]
async fn line_field_errors_carry_index() {
    let f = fixture().await;

    let (status, err) = f
        .app
        .post(
            "/purchase_records",
            purchase(
                &f,
                json!([
                    {"material_id": f.acid, "quantity": 1, "unit_price": 1},
                    {"material_id": f.base, "quantity": "lots", "unit_price": 1}
                ]),
            ),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["field"], "materials[1].quantity");
    assert_eq!(err["reason"], "not numeric");
}

#[tokio::test]
async fn invalid_date_is_rejected() {
    let f = fixture().await;
    let mut body = purchase(
        &f,
        json!([{"material_id": f.acid, "quantity": 1, "unit_price": 1}]),
    );
    body["date"] = json!("15/01/2024");

    let (status, err) = f.app.post("/purchase_records", body).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["field"], "date");
    assert_eq!(err["reason"], "invalid date");
}

#[tokio::test]
async fn non_positive_lines_follow_configuration() {
    let lenient = fixture().await;
    let (status, _) = lenient
        .app
        .post(
            "/purchase_records",
            purchase(
                &lenient,
                json!([{"material_id": lenient.acid, "quantity": 0, "unit_price": 5}]),
            ),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let app = TestApp::with_config(|cfg| cfg.purchase_require_positive = true).await;
    let supplier_id = app.seed_supplier("Acme").await;
    let buyer_id = app.seed_buyer("Li").await;
    let acid = app.seed_material("Nitric acid", "7697-37-2").await;
    let (status, err) = app
        .post(
            "/purchase_records",
            json!({
                "supplier_id": supplier_id,
                "date": "2024-01-15",
                "employee_id": buyer_id,
                "materials": [{"material_id": acid, "quantity": 0, "unit_price": 5}]
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["field"], "materials[0].quantity");
    assert_eq!(err["reason"], "must be greater than 0");
}

#[tokio::test]
async fn duplicate_material_line_is_a_constraint_violation() {
    let f = fixture().await;

    let (status, err) = f
        .app
        .post(
            "/purchase_records",
            purchase(
                &f,
                json!([
                    {"material_id": f.acid, "quantity": 1, "unit_price": 1},
                    {"material_id": f.acid, "quantity": 2, "unit_price": 1}
                ]),
            ),
        )
        .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(err["code"], "constraint_violation");
    assert_eq!(err["stage"], "line[1]");
    assert_eq!(err["store_error"], "unique_violation");
    assert_eq!(f.app.count("purchase_records").await, 0);
}

#[tokio::test]
async fn malformed_json_is_a_validation_error() {
    let f = fixture().await;
    let response = f
        .app
        .request_raw(Method::POST, "/purchase_records", "{\"supplier_id\": ")
        .await;
    let (status, err) = read(response).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["field"], "body");
}

#[tokio::test]
async fn delete_cascades_to_lines() {
    let f = fixture().await;
    let (_, body) = f
        .app
        .post(
            "/purchase_records",
            purchase(
                &f,
                json!([{"material_id": f.acid, "quantity": 5, "unit_price": 2}]),
            ),
        )
        .await;
    let record_id = body["new_record_id"].as_i64().unwrap();

    let (status, _) = f.app.delete(&format!("/purchase_records/{record_id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(f.app.count("purchase_materials").await, 0);

    let (status, _) = f.app.get(&format!("/purchase_records/{record_id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = f.app.delete(&format!("/purchase_records/{record_id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn lines_of_unknown_record_are_empty() {
    let f = fixture().await;
    let (status, body) = f.app.get("/purchase_records/404/materials").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn responses_echo_request_id() {
    let f = fixture().await;
    let response = f.app.request(Method::GET, "/purchase_records", None).await;
    assert!(response.headers().contains_key("x-request-id"));
    let (status, body) = read(response).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}
