#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{Method, Request, StatusCode},
    response::Response,
    Router,
};
use omni_orders_api::{config::AppConfig, db, AppState};
use serde_json::{json, Value};
use tower::ServiceExt;

/// Token the test application accepts
pub const TEST_TOKEN: &str = "omni_pretest_token";

/// Helper harness for spinning up the full router backed by an in-memory SQLite database.
pub struct TestApp {
    router: Router,
    pub state: AppState,
}

impl TestApp {
    /// Construct a new test application with a fresh, migrated database.
    pub async fn new() -> Self {
        let mut cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            TEST_TOKEN.to_string(),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        // Every pooled connection to `sqlite::memory:` would see its own database
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let state = AppState::new(Arc::new(pool), &cfg);
        let router = omni_orders_api::app_router(state.clone());

        Self { router, state }
    }

    /// Send a raw request; `body` is sent verbatim when given.
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        body: Option<Body>,
        headers: &[(&str, &str)],
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }

        let request = builder
            .body(body.unwrap_or_else(Body::empty))
            .expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Send a JSON request and decode the JSON response.
    pub async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let response = match body {
            Some(json) => {
                let bytes = serde_json::to_vec(&json).expect("failed to serialize json request body");
                self.send(
                    method,
                    uri,
                    Some(Body::from(bytes)),
                    &[("content-type", "application/json")],
                )
                .await
            }
            None => self.send(method, uri, None, &[]).await,
        };
        read_json(response).await
    }

    /// JSON request whose body carries the accepted token.
    pub async fn authorized(&self, method: Method, uri: &str, body: Value) -> (StatusCode, Value) {
        self.request(method, uri, Some(with_token(body, TEST_TOKEN))).await
    }

    /// GET a list endpoint with the token and the given `id` filter values.
    pub async fn list(&self, path: &str, ids: &[&str]) -> (StatusCode, Value) {
        let mut uri = format!("{path}?access_token={TEST_TOKEN}");
        for id in ids {
            uri.push_str("&id=");
            uri.push_str(id);
        }
        self.request(Method::GET, &uri, None).await
    }

    pub async fn create_product(&self, name: &str, price: &str) -> Value {
        let (status, body) = self
            .authorized(Method::POST, "/api/products/", json!({"name": name, "price": price}))
            .await;
        assert_eq!(status, StatusCode::CREATED, "create product failed: {body}");
        body
    }

    pub async fn create_order(&self, order_number: &str, total_price: &str) -> Value {
        let (status, body) = self
            .authorized(
                Method::POST,
                "/api/orders/",
                json!({"order_number": order_number, "total_price": total_price}),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create order failed: {body}");
        body
    }

    pub async fn create_order_item(&self, order_id: &Value, product_id: &Value, quantity: i64) -> Value {
        let (status, body) = self
            .authorized(
                Method::POST,
                "/api/order-items/",
                json!({"order_id": order_id, "product_id": product_id, "quantity": quantity}),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create order item failed: {body}");
        body
    }
}

/// Returns `body` with `access_token` set.
pub fn with_token(mut body: Value, token: &str) -> Value {
    if let Value::Object(fields) = &mut body {
        fields.insert("access_token".to_string(), Value::String(token.to_string()));
    }
    body
}

pub async fn read_json(response: Response) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read response body");
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("parse response body")
    };
    (status, value)
}
