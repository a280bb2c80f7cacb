//! Chemical Factory API Library
//!
//! REST service recording a chemical plant's material purchases, product
//! sales and production runs, plus the material and product catalogs they
//! reference.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod handlers;
pub mod health;
pub mod middleware_helpers;
pub mod migrator;
pub mod openapi;
pub mod services;
pub mod tracing;
pub mod validation;

use axum::{routing::get, Router};
use std::sync::Arc;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<db::DbPool>,
    pub config: config::AppConfig,
    pub services: handlers::AppServices,
}

impl AppState {
    pub fn new(db: Arc<db::DbPool>, config: config::AppConfig) -> Self {
        let services = handlers::AppServices::new(db.clone(), &config);
        Self {
            db,
            config,
            services,
        }
    }
}

/// Resource routes without middleware or state.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(handlers::materials::material_routes())
        .merge(handlers::products::product_routes())
        .merge(handlers::purchase_records::purchase_record_routes())
        .merge(handlers::sale_records::sale_record_routes())
        .merge(handlers::production_records::production_record_routes())
}

/// Full application router: resources, health, Swagger UI, request ids and
/// HTTP tracing. CORS and compression are left to the binary.
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { "chem-factory-api up" }))
        .merge(api_routes())
        .nest("/health", health::health_routes(state.db.clone()))
        .merge(openapi::swagger_ui())
        // HTTP tracing layer for consistent request/response telemetry
        .layer(tracing::configure_http_tracing())
        // Ensure every request carries a request id for traceability
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id::request_id_middleware,
        ))
        .with_state(state)
}
