use crate::{
    auth::AuthContext,
    db::DbPool,
    entities::order_item::{self, Entity as OrderItemEntity},
    entities::product::{self, ActiveModel as ProductActiveModel, Entity as ProductEntity, Model as ProductModel},
    errors::ServiceError,
    services::{checked_money, fields, key_ids, missing_fields, money},
};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DbErr, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    Set, SqlErr, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use validator::Validate;

pub const PRODUCT_NOT_FOUND: &str = "Product not found.";
pub const NO_MATCHING_PRODUCTS: &str = "No matching products found.";
pub const PRODUCT_IN_USE: &str = "Product is referenced by existing order items.";

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct CreateProductRequest {
    #[serde(default, deserialize_with = "fields::optional_string")]
    #[validate(length(max = 100, message = "name must be at most 100 characters."))]
    #[schema(example = "Widget")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "fields::optional_decimal")]
    #[schema(example = "10.00")]
    pub price: Option<Decimal>,
}

/// Partial update; existing order items keep their snapshotted price.
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateProductRequest {
    #[serde(default, deserialize_with = "fields::optional_string")]
    #[validate(length(max = 100, message = "name must be at most 100 characters."))]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "fields::optional_decimal")]
    pub price: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProductResponse {
    pub id: i32,
    pub name: String,
    #[schema(example = "10.00")]
    pub price: Decimal,
}

impl From<ProductModel> for ProductResponse {
    fn from(model: ProductModel) -> Self {
        Self {
            id: model.id,
            name: model.name,
            price: money(model.price),
        }
    }
}

#[derive(Clone)]
pub struct ProductService {
    db_pool: Arc<DbPool>,
}

impl ProductService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    #[instrument(skip(self, _ctx, request))]
    pub async fn create_product(
        &self,
        _ctx: &AuthContext,
        request: CreateProductRequest,
    ) -> Result<ProductResponse, ServiceError> {
        request.validate()?;
        let (name, price) = match (request.name.filter(|n| !n.is_empty()), request.price) {
            (Some(name), Some(price)) => (name, price),
            _ => {
                warn!("Product creation is missing required fields");
                return Err(missing_fields());
            }
        };

        let model = ProductActiveModel {
            name: Set(name),
            price: Set(checked_money(price, "price")?),
            ..Default::default()
        }
        .insert(&*self.db_pool)
        .await?;

        info!(product_id = model.id, "Product created");
        Ok(model.into())
    }

    /// Lists products by id ascending. An empty `ids` slice means every product.
    #[instrument(skip(self, _ctx))]
    pub async fn list_products(
        &self,
        _ctx: &AuthContext,
        ids: &[i64],
    ) -> Result<Vec<ProductResponse>, ServiceError> {
        let mut query = ProductEntity::find().order_by_asc(product::Column::Id);
        if !ids.is_empty() {
            query = query.filter(product::Column::Id.is_in(key_ids(ids)));
        }

        let products = query.all(&*self.db_pool).await?;
        if !ids.is_empty() && products.is_empty() {
            return Err(ServiceError::NotFound(NO_MATCHING_PRODUCTS.to_string()));
        }

        Ok(products.into_iter().map(ProductResponse::from).collect())
    }

    #[instrument(skip(self, _ctx, request), fields(product_id = product_id))]
    pub async fn update_product(
        &self,
        _ctx: &AuthContext,
        product_id: i32,
        request: UpdateProductRequest,
    ) -> Result<ProductResponse, ServiceError> {
        request.validate()?;

        let existing = ProductEntity::find_by_id(product_id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(PRODUCT_NOT_FOUND.to_string()))?;

        let mut active: ProductActiveModel = existing.into();
        if let Some(name) = request.name {
            if name.is_empty() {
                return Err(ServiceError::ValidationError(
                    "name must not be empty.".to_string(),
                ));
            }
            active.name = Set(name);
        }
        if let Some(price) = request.price {
            active.price = Set(checked_money(price, "price")?);
        }

        let model = active.update(&*self.db_pool).await?;
        info!(product_id, "Product updated");
        Ok(model.into())
    }

    /// Deletes a product that no order item references.
    #[instrument(skip(self, _ctx), fields(product_id = product_id))]
    pub async fn delete_product(
        &self,
        _ctx: &AuthContext,
        product_id: i32,
    ) -> Result<(), ServiceError> {
        let txn = self.db_pool.begin().await.map_err(|e| {
            error!(error = %e, "Failed to start transaction for product deletion");
            ServiceError::DatabaseError(e)
        })?;

        let existing = ProductEntity::find_by_id(product_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(PRODUCT_NOT_FOUND.to_string()))?;

        let references = OrderItemEntity::find()
            .filter(order_item::Column::ProductId.eq(existing.id))
            .count(&txn)
            .await?;
        if references > 0 {
            warn!(product_id, references, "Refusing to delete referenced product");
            return Err(ServiceError::Conflict(PRODUCT_IN_USE.to_string()));
        }

        // A reference added after the count still trips the RESTRICT foreign key
        ProductEntity::delete_by_id(existing.id)
            .exec(&txn)
            .await
            .map_err(delete_error)?;

        txn.commit().await.map_err(|e| {
            error!(error = %e, product_id, "Failed to commit product deletion");
            ServiceError::DatabaseError(e)
        })?;

        info!(product_id, "Product deleted");
        Ok(())
    }
}

/// Maps a failed product delete; a foreign-key violation means it is still referenced.
fn delete_error(err: DbErr) -> ServiceError {
    match err.sql_err() {
        Some(SqlErr::ForeignKeyConstraintViolation(_)) => {
            ServiceError::Conflict(PRODUCT_IN_USE.to_string())
        }
        _ => ServiceError::DatabaseError(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn response_rescales_price() {
        let body = serde_json::to_value(ProductResponse::from(ProductModel {
            id: 3,
            name: "Widget".into(),
            price: dec!(10),
        }))
        .unwrap();
        assert_eq!(body, json!({"id": 3, "name": "Widget", "price": "10.00"}));
    }

    #[tokio::test]
    async fn referenced_product_delete_maps_foreign_key_violation() {
        use crate::entities::{
            order::ActiveModel as OrderActiveModel, order_item::ActiveModel as OrderItemActiveModel,
        };

        let pool = crate::db::memory_pool().await;
        let product = ProductActiveModel {
            name: Set("Widget".into()),
            price: Set(dec!(10.00)),
            ..Default::default()
        }
        .insert(&pool)
        .await
        .unwrap();
        let order = OrderActiveModel {
            order_number: Set("O-1".into()),
            total_price: Set(dec!(0)),
            ..Default::default()
        }
        .insert(&pool)
        .await
        .unwrap();
        OrderItemActiveModel {
            order_id: Set(order.id),
            product_id: Set(product.id),
            quantity: Set(1),
            price_at_order: Set(dec!(10.00)),
            ..Default::default()
        }
        .insert(&pool)
        .await
        .unwrap();

        // Skips the reference count and hits the RESTRICT key directly
        let err = ProductEntity::delete_by_id(product.id)
            .exec(&pool)
            .await
            .unwrap_err();
        assert!(matches!(
            delete_error(err),
            ServiceError::Conflict(msg) if msg == PRODUCT_IN_USE
        ));
        assert!(ProductEntity::find_by_id(product.id)
            .one(&pool)
            .await
            .unwrap()
            .is_some());
    }

    #[test]
    fn other_delete_errors_stay_database_errors() {
        assert!(matches!(
            delete_error(DbErr::Custom("disk I/O error".into())),
            ServiceError::DatabaseError(_)
        ));
    }

    #[test]
    fn overlong_name_fails_validation() {
        let request = CreateProductRequest {
            name: Some("n".repeat(101)),
            price: Some(dec!(1)),
        };
        let err = ServiceError::from(request.validate().unwrap_err());
        assert_eq!(
            err.response_message(),
            "name must be at most 100 characters."
        );
    }
}
