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
        order_items::{
            CreateOrderItemRequest, OrderItemListing, OrderItemResponse, UpdateOrderItemRequest,
            ORDER_ITEM_NOT_FOUND,
        },
        MessageResponse,
    },
    AppState,
};

pub const ORDER_ITEM_CREATED: &str = "Order item created successfully.";
pub const ORDER_ITEM_UPDATED: &str = "Order item updated successfully.";
pub const ORDER_ITEM_DELETED: &str = "Order item deleted successfully.";

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateOrderItemResponse {
    pub message: String,
    #[serde(flatten)]
    pub order_item: OrderItemResponse,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UpdateOrderItemResponse {
    pub message: String,
    pub order_item: OrderItemResponse,
}

/// Add an item to an order at the product's current price
#[utoipa::path(
    post,
    path = "/api/order-items/",
    summary = "Create order item",
    request_body = CreateOrderItemRequest,
    responses(
        (status = 201, description = "Order item created", body = CreateOrderItemResponse),
        (status = 400, description = "Missing fields or non-integer quantity", body = crate::errors::ErrorResponse),
        (status = 403, description = "Invalid access token", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order or product not found", body = crate::errors::ErrorResponse),
    ),
    tag = "Order items"
)]
pub async fn create_order_item(
    State(state): State<AppState>,
    request: ApiRequest,
) -> Result<Response, ServiceError> {
    let ctx = request.authorize(&state.gate)?;
    let payload: CreateOrderItemRequest = request.json()?;

    let order_item = state
        .services
        .order_items
        .create_order_item(&ctx, payload)
        .await?;
    Ok(created_response(CreateOrderItemResponse {
        message: ORDER_ITEM_CREATED.to_string(),
        order_item,
    }))
}

/// Look up one order item, or list all of them
#[utoipa::path(
    get,
    path = "/api/order-items/list/",
    summary = "List order items",
    params(
        ("access_token" = String, Query, description = "Shared access token"),
        ("id" = Option<i32>, Query, description = "Order item id; returns a single object"),
    ),
    responses(
        (status = 200, description = "One item when `id` is given, otherwise all items", body = OrderItemListing),
        (status = 400, description = "Malformed id", body = crate::errors::ErrorResponse),
        (status = 403, description = "Invalid access token", body = crate::errors::ErrorResponse),
        (status = 404, description = "Item not found, or no items exist", body = crate::errors::ErrorResponse),
    ),
    tag = "Order items"
)]
pub async fn list_order_items(
    State(state): State<AppState>,
    request: ApiRequest,
) -> Result<Response, ServiceError> {
    let ctx = request.authorize(&state.gate)?;
    let ids = request.query().ids()?;

    let listing = state
        .services
        .order_items
        .list_order_items(&ctx, &ids)
        .await?;
    Ok(success_response(listing))
}

#[utoipa::path(
    put,
    path = "/api/order-items/{id}/update/",
    summary = "Update order item",
    params(("id" = i32, Path, description = "Order item id")),
    request_body = UpdateOrderItemRequest,
    responses(
        (status = 200, description = "Order item updated", body = UpdateOrderItemResponse),
        (status = 400, description = "Invalid quantity or price", body = crate::errors::ErrorResponse),
        (status = 403, description = "Invalid access token", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order item not found", body = crate::errors::ErrorResponse),
    ),
    tag = "Order items"
)]
pub async fn update_order_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
    request: ApiRequest,
) -> Result<Response, ServiceError> {
    let ctx = request.authorize(&state.gate)?;
    let item_id = path_id(&id, ORDER_ITEM_NOT_FOUND)?;
    let payload: UpdateOrderItemRequest = request.json()?;

    let order_item = state
        .services
        .order_items
        .update_order_item(&ctx, item_id, payload)
        .await?;
    Ok(success_response(UpdateOrderItemResponse {
        message: ORDER_ITEM_UPDATED.to_string(),
        order_item,
    }))
}

#[utoipa::path(
    delete,
    path = "/api/order-items/{id}/delete/",
    summary = "Delete order item",
    params(("id" = i32, Path, description = "Order item id")),
    responses(
        (status = 200, description = "Order item deleted", body = MessageResponse),
        (status = 403, description = "Invalid access token", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order item not found", body = crate::errors::ErrorResponse),
    ),
    tag = "Order items"
)]
pub async fn delete_order_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
    request: ApiRequest,
) -> Result<Response, ServiceError> {
    let ctx = request.authorize(&state.gate)?;
    let item_id = path_id(&id, ORDER_ITEM_NOT_FOUND)?;

    state
        .services
        .order_items
        .delete_order_item(&ctx, item_id)
        .await?;
    Ok(success_response(MessageResponse::new(ORDER_ITEM_DELETED)))
}
