#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    response::Response,
    Router,
};
use chem_factory_api::{
    config::AppConfig,
    db,
    entities::{buyer, customer, distributor, production_line, supplier},
    AppState,
};
use sea_orm::{ActiveModelTrait, ConnectionTrait, DatabaseBackend, Set, Statement};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

/// Application router backed by a fresh, migrated SQLite file.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    _dir: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Construct a test application after adjusting the default test config.
    pub async fn with_config(adjust: impl FnOnce(&mut AppConfig)) -> Self {
        let dir = tempfile::tempdir().expect("temp dir for test database");
        let db_path = dir.path().join("chem_factory_test.db");

        let mut cfg = AppConfig::new(
            format!("sqlite://{}?mode=rwc", db_path.display()),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        cfg.auto_migrate = true;
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;
        adjust(&mut cfg);

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let state = AppState::new(Arc::new(pool), cfg);
        let router = chem_factory_api::app_router(state.clone());

        Self {
            router,
            state,
            _dir: dir,
        }
    }

    /// Send a request against the router.
    pub async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Send a request with a raw, possibly malformed, body.
    pub async fn request_raw(&self, method: Method, uri: &str, body: &str) -> Response {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        read(self.request(Method::GET, uri, None).await).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        read(self.request(Method::POST, uri, Some(body)).await).await
    }

    pub async fn put(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        read(self.request(Method::PUT, uri, Some(body)).await).await
    }

    pub async fn delete(&self, uri: &str) -> (StatusCode, Value) {
        read(self.request(Method::DELETE, uri, None).await).await
    }

    /// Row count of a table, read straight from the store.
    pub async fn count(&self, table: &str) -> i64 {
        let row = self
            .state
            .db
            .query_one(Statement::from_string(
                DatabaseBackend::Sqlite,
                format!("SELECT COUNT(*) AS n FROM {table}"),
            ))
            .await
            .expect("count query")
            .expect("count row");
        row.try_get::<i64>("", "n").expect("count value")
    }

    pub async fn seed_supplier(&self, name: &str) -> i32 {
        supplier::ActiveModel {
            name: Set(name.to_string()),
            ..Default::default()
        }
        .insert(&*self.state.db)
        .await
        .expect("seed supplier")
        .supplier_id
    }

    pub async fn seed_customer(&self, name: &str) -> i32 {
        customer::ActiveModel {
            name: Set(name.to_string()),
            ..Default::default()
        }
        .insert(&*self.state.db)
        .await
        .expect("seed customer")
        .customer_id
    }

    pub async fn seed_buyer(&self, name: &str) -> i32 {
        buyer::ActiveModel {
            name: Set(name.to_string()),
            ..Default::default()
        }
        .insert(&*self.state.db)
        .await
        .expect("seed buyer")
        .employee_id
    }

    pub async fn seed_distributor(&self, name: &str) -> i32 {
        distributor::ActiveModel {
            name: Set(name.to_string()),
            ..Default::default()
        }
        .insert(&*self.state.db)
        .await
        .expect("seed distributor")
        .employee_id
    }

    pub async fn seed_line(&self, name: &str) -> i32 {
        production_line::ActiveModel {
            name: Set(name.to_string()),
            ..Default::default()
        }
        .insert(&*self.state.db)
        .await
        .expect("seed production line")
        .line_id
    }

    /// Creates a material through the API and returns its id.
    pub async fn seed_material(&self, name: &str, cas_number: &str) -> i32 {
        let (status, body) = self
            .post(
                "/materials",
                json!({
                    "name": name,
                    "cas_number": cas_number,
                    "unit": "kg",
                    "concentration": 98.5,
                    "category": "acid",
                    "storage_condition": "cool, dry",
                    "min_stock_threshold": 10
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "seed material: {body}");
        body["material_id"].as_i64().expect("material_id") as i32
    }

    /// Creates a product through the API and returns its id.
    pub async fn seed_product(&self, name: &str) -> i32 {
        let (status, body) = self
            .post(
                "/products",
                json!({"name": name, "unit": "L", "hazard_rating": "II"}),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "seed product: {body}");
        body["product_id"].as_i64().expect("product_id") as i32
    }
}

/// Splits a response into status and JSON body (`Null` when empty).
pub async fn read(response: Response) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read response body");
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };
    (status, body)
}
