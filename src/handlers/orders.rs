use axum::{
    extract::{Path, State},
    response::Response,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    errors::ServiceError,
    handlers::common::{created_response, path_id, success_response, ApiRequest},
    services::{
        orders::{CreateOrderRequest, OrderResponse, UpdateOrderRequest, ORDER_NOT_FOUND},
        MessageResponse,
    },
    AppState,
};

pub const ORDER_IMPORTED: &str = "Order imported successfully.";
pub const ORDER_UPDATED: &str = "Order updated successfully.";
pub const ORDER_DELETED: &str = "Order deleted successfully.";

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ImportOrderResponse {
    #[schema(example = "Order imported successfully.")]
    pub message: String,
    #[serde(flatten)]
    pub order: OrderResponse,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UpdateOrderResponse {
    #[schema(example = "Order updated successfully.")]
    pub message: String,
    pub order: OrderResponse,
}

/// Import a new order
#[utoipa::path(
    post,
    path = "/api/orders/",
    summary = "Import order",
    description = "Creates an order. The access token travels in the body (`access_token`) or the query string.",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Order imported", body = ImportOrderResponse),
        (status = 400, description = "Missing fields or duplicate order number", body = crate::errors::ErrorResponse),
        (status = 403, description = "Invalid access token", body = crate::errors::ErrorResponse),
    ),
    tag = "Orders"
)]
pub async fn import_order(
    State(state): State<AppState>,
    request: ApiRequest,
) -> Result<Response, ServiceError> {
    let ctx = request.authorize(&state.gate)?;
    let payload: CreateOrderRequest = request.json()?;

    let order = state.services.orders.create_order(&ctx, payload).await?;
    Ok(created_response(ImportOrderResponse {
        message: ORDER_IMPORTED.to_string(),
        order,
    }))
}

/// List orders, optionally filtered by repeated `id` parameters
#[utoipa::path(
    get,
    path = "/api/orders/list/",
    summary = "List orders",
    params(
        ("access_token" = String, Query, description = "Shared access token"),
        ("id" = Option<Vec<i32>>, Query, description = "Order id; repeat the key to ask for several"),
    ),
    responses(
        (status = 200, description = "Matching orders, by id ascending", body = Vec<OrderResponse>),
        (status = 400, description = "Malformed id", body = crate::errors::ErrorResponse),
        (status = 403, description = "Invalid access token", body = crate::errors::ErrorResponse),
        (status = 404, description = "No order matches the filter", body = crate::errors::ErrorResponse),
    ),
    tag = "Orders"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    request: ApiRequest,
) -> Result<Response, ServiceError> {
    let ctx = request.authorize(&state.gate)?;
    let ids = request.query().ids()?;

    let orders = state.services.orders.list_orders(&ctx, &ids).await?;
    Ok(success_response(orders))
}

/// Update an order; omitted fields keep their values
#[utoipa::path(
    put,
    path = "/api/orders/{id}/update/",
    summary = "Update order",
    params(("id" = i32, Path, description = "Order id")),
    request_body = UpdateOrderRequest,
    responses(
        (status = 200, description = "Order updated", body = UpdateOrderResponse),
        (status = 400, description = "Invalid field or duplicate order number", body = crate::errors::ErrorResponse),
        (status = 403, description = "Invalid access token", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    tag = "Orders"
)]
pub async fn update_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
    request: ApiRequest,
) -> Result<Response, ServiceError> {
    let ctx = request.authorize(&state.gate)?;
    let order_id = path_id(&id, ORDER_NOT_FOUND)?;
    let payload: UpdateOrderRequest = request.json()?;

    let order = state
        .services
        .orders
        .update_order(&ctx, order_id, payload)
        .await?;
    Ok(success_response(UpdateOrderResponse {
        message: ORDER_UPDATED.to_string(),
        order,
    }))
}

/// Delete an order and its items
#[utoipa::path(
    delete,
    path = "/api/orders/{id}/delete/",
    summary = "Delete order",
    params(("id" = i32, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order deleted", body = MessageResponse),
        (status = 403, description = "Invalid access token", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    tag = "Orders"
)]
pub async fn delete_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
    request: ApiRequest,
) -> Result<Response, ServiceError> {
    let ctx = request.authorize(&state.gate)?;
    let order_id = path_id(&id, ORDER_NOT_FOUND)?;

    state.services.orders.delete_order(&ctx, order_id).await?;
    Ok(success_response(MessageResponse::new(ORDER_DELETED)))
}
