//! Omni Orders API Library
//!
//! Token-gated order import with products and order line items.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod auth;
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

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::{auth::AccessGate, errors::ServiceError, handlers::AppServices};

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub gate: AccessGate,
    pub services: AppServices,
}

impl AppState {
    pub fn new(db: Arc<DatabaseConnection>, config: &config::AppConfig) -> Self {
        Self {
            gate: AccessGate::from_config(config),
            services: AppServices::new(db.clone()),
            db,
        }
    }
}

/// Routes mounted under `/api`. Paths keep their trailing slash.
pub fn api_routes() -> Router<AppState> {
    use crate::handlers::{order_items, orders, products};

    Router::new()
        .route("/orders/", post(orders::import_order))
        .route("/orders/list/", get(orders::list_orders))
        .route("/orders/:id/update/", put(orders::update_order))
        .route("/orders/:id/delete/", delete(orders::delete_order))
        // Older clients still use the single-resource import paths
        .route("/import-order/", post(orders::import_order))
        .route("/import-order/list/", get(orders::list_orders))
        .route("/import-order/:id/update/", put(orders::update_order))
        .route("/import-order/:id/delete/", delete(orders::delete_order))
        .route("/products/", post(products::create_product))
        .route("/products/list/", get(products::list_products))
        .route("/products/:id/update/", put(products::update_product))
        .route("/products/:id/delete/", delete(products::delete_product))
        .route("/order-items/", post(order_items::create_order_item))
        .route("/order-items/list/", get(order_items::list_order_items))
        .route("/order-items/:id/update/", put(order_items::update_order_item))
        .route("/order-items/:id/delete/", delete(order_items::delete_order_item))
}

async fn route_not_found() -> ServiceError {
    ServiceError::NotFound("Resource not found.".to_string())
}

/// Full application router: API, health probes and the OpenAPI document,
/// wrapped in request-id and HTTP tracing layers.
pub fn app_router(state: AppState) -> Router {
    let db = state.db.clone();

    Router::new()
        .nest("/api", api_routes())
        .with_state(state)
        .nest("/health", health::health_routes(db))
        .merge(openapi::openapi_routes())
        .fallback(route_not_found)
        // HTTP tracing layer for consistent request/response telemetry
        .layer(crate::tracing::configure_http_tracing())
        // Ensure every request carries a request id for traceability
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id_middleware,
        ))
}
