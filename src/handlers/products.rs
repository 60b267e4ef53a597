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
        products::{CreateProductRequest, ProductResponse, UpdateProductRequest, PRODUCT_NOT_FOUND},
        MessageResponse,
    },
    AppState,
};

pub const PRODUCT_CREATED: &str = "Product created successfully.";
pub const PRODUCT_UPDATED: &str = "Product updated successfully.";
pub const PRODUCT_DELETED: &str = "Product deleted successfully.";

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateProductResponse {
    pub message: String,
    #[serde(flatten)]
    pub product: ProductResponse,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UpdateProductResponse {
    pub message: String,
    pub product: ProductResponse,
}

#[utoipa::path(
    post,
    path = "/api/products/",
    summary = "Create product",
    request_body = CreateProductRequest,
    responses(
        (status = 201, description = "Product created", body = CreateProductResponse),
        (status = 400, description = "Missing or invalid fields", body = crate::errors::ErrorResponse),
        (status = 403, description = "Invalid access token", body = crate::errors::ErrorResponse),
    ),
    tag = "Products"
)]
pub async fn create_product(
    State(state): State<AppState>,
    request: ApiRequest,
) -> Result<Response, ServiceError> {
    let ctx = request.authorize(&state.gate)?;
    let payload: CreateProductRequest = request.json()?;

    let product = state.services.products.create_product(&ctx, payload).await?;
    Ok(created_response(CreateProductResponse {
        message: PRODUCT_CREATED.to_string(),
        product,
    }))
}

#[utoipa::path(
    get,
    path = "/api/products/list/",
    summary = "List products",
    params(
        ("access_token" = String, Query, description = "Shared access token"),
        ("id" = Option<Vec<i32>>, Query, description = "Product id; repeat the key to ask for several"),
    ),
    responses(
        (status = 200, description = "Matching products, by id ascending", body = Vec<ProductResponse>),
        (status = 400, description = "Malformed id", body = crate::errors::ErrorResponse),
        (status = 403, description = "Invalid access token", body = crate::errors::ErrorResponse),
        (status = 404, description = "No product matches the filter", body = crate::errors::ErrorResponse),
    ),
    tag = "Products"
)]
pub async fn list_products(
    State(state): State<AppState>,
    request: ApiRequest,
) -> Result<Response, ServiceError> {
    let ctx = request.authorize(&state.gate)?;
    let ids = request.query().ids()?;

    let products = state.services.products.list_products(&ctx, &ids).await?;
    Ok(success_response(products))
}

#[utoipa::path(
    put,
    path = "/api/products/{id}/update/",
    summary = "Update product",
    params(("id" = i32, Path, description = "Product id")),
    request_body = UpdateProductRequest,
    responses(
        (status = 200, description = "Product updated", body = UpdateProductResponse),
        (status = 400, description = "Invalid field", body = crate::errors::ErrorResponse),
        (status = 403, description = "Invalid access token", body = crate::errors::ErrorResponse),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse),
    ),
    tag = "Products"
)]
pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
    request: ApiRequest,
) -> Result<Response, ServiceError> {
    let ctx = request.authorize(&state.gate)?;
    let product_id = path_id(&id, PRODUCT_NOT_FOUND)?;
    let payload: UpdateProductRequest = request.json()?;

    let product = state
        .services
        .products
        .update_product(&ctx, product_id, payload)
        .await?;
    Ok(success_response(UpdateProductResponse {
        message: PRODUCT_UPDATED.to_string(),
        product,
    }))
}

/// Delete a product no order item refers to
#[utoipa::path(
    delete,
    path = "/api/products/{id}/delete/",
    summary = "Delete product",
    params(("id" = i32, Path, description = "Product id")),
    responses(
        (status = 200, description = "Product deleted", body = MessageResponse),
        (status = 400, description = "Product is still referenced by order items", body = crate::errors::ErrorResponse),
        (status = 403, description = "Invalid access token", body = crate::errors::ErrorResponse),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse),
    ),
    tag = "Products"
)]
pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
    request: ApiRequest,
) -> Result<Response, ServiceError> {
    let ctx = request.authorize(&state.gate)?;
    let product_id = path_id(&id, PRODUCT_NOT_FOUND)?;

    state.services.products.delete_product(&ctx, product_id).await?;
    Ok(success_response(MessageResponse::new(PRODUCT_DELETED)))
}
