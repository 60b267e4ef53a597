use crate::{
    auth::AuthContext,
    db::DbPool,
    entities::order::{self, ActiveModel as OrderActiveModel, Entity as OrderEntity, Model as OrderModel},
    entities::order_item::{self, Entity as OrderItemEntity},
    errors::ServiceError,
    services::{checked_money, fields, key_ids, missing_fields, money},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use validator::Validate;

pub const ORDER_NOT_FOUND: &str = "Order not found.";
pub const DUPLICATE_ORDER_NUMBER: &str = "Order number already exists.";
pub const NO_MATCHING_ORDERS: &str = "No matching orders found.";

/// Body of `POST /orders/`
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct CreateOrderRequest {
    /// Unique, case-sensitive order reference
    #[serde(default, deserialize_with = "fields::optional_string")]
    #[validate(length(max = 100, message = "order_number must be at most 100 characters."))]
    #[schema(example = "O-1")]
    pub order_number: Option<String>,
    #[serde(default, deserialize_with = "fields::optional_decimal")]
    #[schema(example = "99.90")]
    pub total_price: Option<Decimal>,
    #[serde(default, deserialize_with = "fields::optional_string")]
    #[validate(length(max = 100, message = "customer_name must be at most 100 characters."))]
    pub customer_name: Option<String>,
    /// Defaults to `pending`
    #[serde(default, deserialize_with = "fields::optional_string")]
    #[validate(length(max = 20, message = "status must be at most 20 characters."))]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "fields::optional_string")]
    pub note: Option<String>,
}

/// Body of `PUT /orders/{id}/update/`; omitted fields stay unchanged.
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateOrderRequest {
    #[serde(default, deserialize_with = "fields::optional_string")]
    #[validate(length(max = 100, message = "order_number must be at most 100 characters."))]
    pub order_number: Option<String>,
    #[serde(default, deserialize_with = "fields::optional_decimal")]
    pub total_price: Option<Decimal>,
    /// An empty string clears the name
    #[serde(default, deserialize_with = "fields::optional_string")]
    #[validate(length(max = 100, message = "customer_name must be at most 100 characters."))]
    pub customer_name: Option<String>,
    #[serde(default, deserialize_with = "fields::optional_string")]
    #[validate(length(max = 20, message = "status must be at most 20 characters."))]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "fields::optional_string")]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderResponse {
    pub order_id: i32,
    pub order_number: String,
    #[schema(example = "99.90")]
    pub total_price: Decimal,
    pub created_time: DateTime<Utc>,
    pub customer_name: Option<String>,
    pub status: String,
    pub note: String,
}

impl From<OrderModel> for OrderResponse {
    fn from(model: OrderModel) -> Self {
        Self {
            order_id: model.id,
            order_number: model.order_number,
            total_price: money(model.total_price),
            created_time: model.created_time,
            customer_name: model.customer_name,
            status: model.status,
            note: model.note,
        }
    }
}

/// Service for importing and maintaining orders
#[derive(Clone)]
pub struct OrderService {
    db_pool: Arc<DbPool>,
}

impl OrderService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// Imports a new order. The order number must not be taken yet.
    #[instrument(skip(self, _ctx, request), fields(order_number = ?request.order_number))]
    pub async fn create_order(
        &self,
        _ctx: &AuthContext,
        request: CreateOrderRequest,
    ) -> Result<OrderResponse, ServiceError> {
        let CreateOrderRequest {
            order_number,
            total_price,
            customer_name,
            status,
            note,
        } = &request;

        let (order_number, total_price) =
            match (order_number.as_deref().filter(|n| !n.is_empty()), total_price) {
                (Some(number), Some(price)) => (number.to_string(), *price),
                _ => {
                    warn!("Order import is missing required fields");
                    return Err(missing_fields());
                }
            };
        request.validate()?;
        let total_price = checked_money(total_price, "total_price")?;
        if matches!(status.as_deref(), Some("")) {
            return Err(ServiceError::ValidationError(
                "status must not be empty.".to_string(),
            ));
        }

        let txn = self.db_pool.begin().await.map_err(|e| {
            error!(error = %e, "Failed to start transaction for order import");
            ServiceError::DatabaseError(e)
        })?;

        if order_number_taken(&txn, &order_number, None).await? {
            warn!(order_number = %order_number, "Order number already exists");
            return Err(ServiceError::Conflict(DUPLICATE_ORDER_NUMBER.to_string()));
        }

        let mut active = OrderActiveModel {
            order_number: Set(order_number),
            total_price: Set(total_price),
            customer_name: Set(customer_name.clone().filter(|name| !name.is_empty())),
            ..Default::default()
        };
        if let Some(status) = status {
            active.status = Set(status.clone());
        }
        if let Some(note) = note {
            active.note = Set(note.clone());
        }

        // The unique index still guards against a concurrent import of the same number
        let model = active
            .insert(&txn)
            .await
            .map_err(|e| ServiceError::from_write(e, DUPLICATE_ORDER_NUMBER))?;

        txn.commit().await.map_err(|e| {
            error!(error = %e, order_id = model.id, "Failed to commit order import");
            ServiceError::from_write(e, DUPLICATE_ORDER_NUMBER)
        })?;

        info!(order_id = model.id, order_number = %model.order_number, "Order imported");
        Ok(model.into())
    }

    /// Lists orders by id ascending. An empty `ids` slice means every order.
    #[instrument(skip(self, _ctx))]
    pub async fn list_orders(
        &self,
        _ctx: &AuthContext,
        ids: &[i64],
    ) -> Result<Vec<OrderResponse>, ServiceError> {
        let mut query = OrderEntity::find().order_by_asc(order::Column::Id);
        if !ids.is_empty() {
            query = query.filter(order::Column::Id.is_in(key_ids(ids)));
        }

        let orders = query.all(&*self.db_pool).await?;
        if !ids.is_empty() && orders.is_empty() {
            return Err(ServiceError::NotFound(NO_MATCHING_ORDERS.to_string()));
        }

        Ok(orders.into_iter().map(OrderResponse::from).collect())
    }

    /// Applies a partial update; fields left out of the request keep their values.
    #[instrument(skip(self, _ctx, request), fields(order_id = order_id))]
    pub async fn update_order(
        &self,
        _ctx: &AuthContext,
        order_id: i32,
        request: UpdateOrderRequest,
    ) -> Result<OrderResponse, ServiceError> {
        request.validate()?;

        let txn = self.db_pool.begin().await.map_err(|e| {
            error!(error = %e, "Failed to start transaction for order update");
            ServiceError::DatabaseError(e)
        })?;

        let existing = OrderEntity::find_by_id(order_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(ORDER_NOT_FOUND.to_string()))?;

        let mut active: OrderActiveModel = existing.into();

        if let Some(order_number) = request.order_number {
            if order_number.is_empty() {
                return Err(ServiceError::ValidationError(
                    "order_number must not be empty.".to_string(),
                ));
            }
            if order_number_taken(&txn, &order_number, Some(order_id)).await? {
                warn!(order_number = %order_number, "Order number already exists");
                return Err(ServiceError::Conflict(DUPLICATE_ORDER_NUMBER.to_string()));
            }
            active.order_number = Set(order_number);
        }
        if let Some(total_price) = request.total_price {
            active.total_price = Set(checked_money(total_price, "total_price")?);
        }
        if let Some(customer_name) = request.customer_name {
            active.customer_name = Set(Some(customer_name).filter(|name| !name.is_empty()));
        }
        if let Some(status) = request.status {
            if status.is_empty() {
                return Err(ServiceError::ValidationError(
                    "status must not be empty.".to_string(),
                ));
            }
            active.status = Set(status);
        }
        if let Some(note) = request.note {
            active.note = Set(note);
        }

        let model = active
            .update(&txn)
            .await
            .map_err(|e| ServiceError::from_write(e, DUPLICATE_ORDER_NUMBER))?;

        txn.commit().await.map_err(|e| {
            error!(error = %e, order_id, "Failed to commit order update");
            ServiceError::from_write(e, DUPLICATE_ORDER_NUMBER)
        })?;

        info!(order_id, "Order updated");
        Ok(model.into())
    }

    /// Deletes an order together with every item it owns.
    #[instrument(skip(self, _ctx), fields(order_id = order_id))]
    pub async fn delete_order(&self, _ctx: &AuthContext, order_id: i32) -> Result<(), ServiceError> {
        let txn = self.db_pool.begin().await.map_err(|e| {
            error!(error = %e, "Failed to start transaction for order deletion");
            ServiceError::DatabaseError(e)
        })?;

        let existing = OrderEntity::find_by_id(order_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(ORDER_NOT_FOUND.to_string()))?;

        let items = OrderItemEntity::delete_many()
            .filter(order_item::Column::OrderId.eq(existing.id))
            .exec(&txn)
            .await?;
        OrderEntity::delete_by_id(existing.id).exec(&txn).await?;

        txn.commit().await.map_err(|e| {
            error!(error = %e, order_id, "Failed to commit order deletion");
            ServiceError::DatabaseError(e)
        })?;

        info!(order_id, items_removed = items.rows_affected, "Order deleted");
        Ok(())
    }
}

async fn order_number_taken<C: ConnectionTrait>(
    conn: &C,
    order_number: &str,
    except_id: Option<i32>,
) -> Result<bool, ServiceError> {
    let mut query = OrderEntity::find().filter(order::Column::OrderNumber.eq(order_number));
    if let Some(id) = except_id {
        query = query.filter(order::Column::Id.ne(id));
    }
    Ok(query.one(conn).await?.is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn response_uses_order_id_and_two_decimal_total() {
        let model = OrderModel {
            id: 7,
            order_number: "O-7".into(),
            total_price: dec!(12.5),
            created_time: Utc.with_ymd_and_hms(2025, 1, 1, 10, 0, 0).unwrap(),
            customer_name: None,
            status: "pending".into(),
            note: String::new(),
        };

        let body = serde_json::to_value(OrderResponse::from(model)).unwrap();
        assert_eq!(body["order_id"], 7);
        assert_eq!(body["total_price"], "12.50");
        assert_eq!(body["status"], "pending");
        assert!(body["customer_name"].is_null());
    }

    #[tokio::test]
    async fn duplicate_insert_maps_unique_violation_to_conflict() {
        let pool = crate::db::memory_pool().await;
        let draft = || OrderActiveModel {
            order_number: Set("O-RACE".into()),
            total_price: Set(dec!(1.00)),
            ..Default::default()
        };

        draft().insert(&pool).await.unwrap();
        // Straight to the table, as a creator that raced past the pre-check would
        let err = draft().insert(&pool).await.unwrap_err();

        assert!(matches!(
            ServiceError::from_write(err, DUPLICATE_ORDER_NUMBER),
            ServiceError::Conflict(msg) if msg == DUPLICATE_ORDER_NUMBER
        ));
        assert_eq!(OrderEntity::find().all(&pool).await.unwrap().len(), 1);
    }

    #[test]
    fn create_request_rejects_overlong_fields() {
        let request: CreateOrderRequest = serde_json::from_value(json!({
            "order_number": "O-1",
            "total_price": 1,
            "status": "x".repeat(21),
        }))
        .unwrap();
        assert!(request.validate().is_err());
    }

    #[test]
    fn update_request_fields_default_to_unchanged() {
        let request: UpdateOrderRequest =
            serde_json::from_value(json!({"access_token": "ignored"})).unwrap();
        assert!(request.order_number.is_none());
        assert!(request.total_price.is_none());
        assert!(request.note.is_none());
    }
}
