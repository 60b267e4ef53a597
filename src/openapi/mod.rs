use axum::{routing::get, Json, Router};
use utoipa::OpenApi;

/// Route serving the generated document
pub const OPENAPI_JSON_PATH: &str = "/api-docs/openapi.json";

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Omni Orders API",
        version = "0.1.0",
        description = r#"
# Omni Orders API

Imports orders and manages products and order line items.

## Authentication

Every endpoint under `/api` requires the shared access token. Send it as the
`access_token` field of the JSON body or as the `access_token` query
parameter. A missing or wrong token yields `403` before any other check.

## Identifier filters

List endpoints take the repeated `id` query key, e.g. `?id=1&id=2`.

## Errors

```json
{
  "error": "Order not found.",
  "code": "not_found",
  "request_id": "0f1c...",
  "timestamp": "2025-01-01T00:00:00+00:00"
}
```
        "#
    ),
    tags(
        (name = "Orders", description = "Order import and maintenance"),
        (name = "Products", description = "Product catalogue"),
        (name = "Order items", description = "Order line items with snapshotted prices")
    ),
    paths(
        crate::handlers::orders::import_order,
        crate::handlers::orders::list_orders,
        crate::handlers::orders::update_order,
        crate::handlers::orders::delete_order,
        crate::handlers::products::create_product,
        crate::handlers::products::list_products,
        crate::handlers::products::update_product,
        crate::handlers::products::delete_product,
        crate::handlers::order_items::create_order_item,
        crate::handlers::order_items::list_order_items,
        crate::handlers::order_items::update_order_item,
        crate::handlers::order_items::delete_order_item,
    ),
    components(
        schemas(
            crate::services::MessageResponse,
            crate::services::orders::CreateOrderRequest,
            crate::services::orders::UpdateOrderRequest,
            crate::services::orders::OrderResponse,
            crate::handlers::orders::ImportOrderResponse,
            crate::handlers::orders::UpdateOrderResponse,
            crate::services::products::CreateProductRequest,
            crate::services::products::UpdateProductRequest,
            crate::services::products::ProductResponse,
            crate::handlers::products::CreateProductResponse,
            crate::handlers::products::UpdateProductResponse,
            crate::services::order_items::CreateOrderItemRequest,
            crate::services::order_items::UpdateOrderItemRequest,
            crate::services::order_items::OrderItemResponse,
            crate::services::order_items::OrderItemListing,
            crate::handlers::order_items::CreateOrderItemResponse,
            crate::handlers::order_items::UpdateOrderItemResponse,
            crate::errors::ErrorResponse
        )
    )
)]
pub struct ApiDoc;

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

pub fn openapi_routes() -> Router {
    Router::new().route(OPENAPI_JSON_PATH, get(openapi_json))
}
