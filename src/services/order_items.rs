use crate::{
    auth::AuthContext,
    db::DbPool,
    entities::order::Entity as OrderEntity,
    entities::order_item::{self, ActiveModel as OrderItemActiveModel, Entity as OrderItemEntity, Model as OrderItemModel},
    entities::product::Entity as ProductEntity,
    errors::ServiceError,
    services::{
        checked_money, fields, missing_fields, money, orders::ORDER_NOT_FOUND,
        products::PRODUCT_NOT_FOUND,
    },
};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, EntityTrait, QueryOrder, Set, TransactionTrait};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;

pub const ORDER_ITEM_NOT_FOUND: &str = "Order item not found.";
pub const NO_ORDER_ITEMS: &str = "No order items found.";
pub const SINGLE_ID_ONLY: &str = "Order items can only be looked up by a single id.";

/// Body of `POST /order-items/`. The price is always taken from the product.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CreateOrderItemRequest {
    #[serde(default, deserialize_with = "fields::optional_integer")]
    pub order_id: Option<i32>,
    #[serde(default, deserialize_with = "fields::optional_integer")]
    pub product_id: Option<i32>,
    /// Whole number of units, at least 1. Numeric strings are accepted.
    #[serde(default, deserialize_with = "fields::optional_integer")]
    #[schema(example = 4)]
    pub quantity: Option<i32>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateOrderItemRequest {
    #[serde(default, deserialize_with = "fields::optional_integer")]
    pub quantity: Option<i32>,
    /// Explicit replacement for the snapshotted price; never derived from the product
    #[serde(default, deserialize_with = "fields::optional_decimal")]
    pub price_at_order: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderItemResponse {
    pub id: i32,
    pub order_id: i32,
    pub product_id: i32,
    pub quantity: i32,
    #[schema(example = "10.00")]
    pub price_at_order: Decimal,
    /// `quantity * price_at_order`
    #[schema(example = "40.00")]
    pub subtotal: Decimal,
}

impl From<OrderItemModel> for OrderItemResponse {
    fn from(model: OrderItemModel) -> Self {
        let price_at_order = money(model.price_at_order);
        Self {
            id: model.id,
            order_id: model.order_id,
            product_id: model.product_id,
            quantity: model.quantity,
            price_at_order,
            subtotal: order_item::subtotal(model.quantity, price_at_order),
        }
    }
}

/// A lookup by id yields one item, a plain listing yields all of them.
#[derive(Debug, Serialize, ToSchema)]
#[serde(untagged)]
pub enum OrderItemListing {
    One(OrderItemResponse),
    Many(Vec<OrderItemResponse>),
}

fn checked_quantity(quantity: i32) -> Result<i32, ServiceError> {
    if quantity < 1 {
        return Err(ServiceError::ValidationError(
            "quantity must be at least 1.".to_string(),
        ));
    }
    Ok(quantity)
}

#[derive(Clone)]
pub struct OrderItemService {
    db_pool: Arc<DbPool>,
}

impl OrderItemService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// Adds an item to an order, snapshotting the product's current price.
    #[instrument(skip(self, _ctx, request), fields(order_id = ?request.order_id, product_id = ?request.product_id))]
    pub async fn create_order_item(
        &self,
        _ctx: &AuthContext,
        request: CreateOrderItemRequest,
    ) -> Result<OrderItemResponse, ServiceError> {
        let (order_id, product_id, quantity) =
            match (request.order_id, request.product_id, request.quantity) {
                (Some(order_id), Some(product_id), Some(quantity)) => {
                    (order_id, product_id, quantity)
                }
                _ => {
                    warn!("Order item creation is missing required fields");
                    return Err(missing_fields());
                }
            };
        let quantity = checked_quantity(quantity)?;

        let txn = self.db_pool.begin().await.map_err(|e| {
            error!(error = %e, "Failed to start transaction for order item creation");
            ServiceError::DatabaseError(e)
        })?;

        let order = OrderEntity::find_by_id(order_id).one(&txn).await?;
        if order.is_none() {
            warn!(order_id, "Order item refers to a missing order");
            return Err(ServiceError::NotFound(ORDER_NOT_FOUND.to_string()));
        }

        let product = ProductEntity::find_by_id(product_id)
            .one(&txn)
            .await?
            .ok_or_else(|| {
                warn!(product_id, "Order item refers to a missing product");
                ServiceError::NotFound(PRODUCT_NOT_FOUND.to_string())
            })?;

        let model = OrderItemActiveModel {
            order_id: Set(order_id),
            product_id: Set(product.id),
            quantity: Set(quantity),
            price_at_order: Set(money(product.price)),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        txn.commit().await.map_err(|e| {
            error!(error = %e, order_id, "Failed to commit order item creation");
            ServiceError::DatabaseError(e)
        })?;

        info!(order_item_id = model.id, order_id, product_id, "Order item created");
        Ok(model.into())
    }

    /// Looks up one item by id, or lists every item when `ids` is empty.
    ///
    /// An empty table is reported as not found rather than as an empty list.
    #[instrument(skip(self, _ctx))]
    pub async fn list_order_items(
        &self,
        _ctx: &AuthContext,
        ids: &[i64],
    ) -> Result<OrderItemListing, ServiceError> {
        match ids {
            [] => {
                let items = OrderItemEntity::find()
                    .order_by_asc(order_item::Column::Id)
                    .all(&*self.db_pool)
                    .await?;
                if items.is_empty() {
                    return Err(ServiceError::NotFound(NO_ORDER_ITEMS.to_string()));
                }
                Ok(OrderItemListing::Many(
                    items.into_iter().map(OrderItemResponse::from).collect(),
                ))
            }
            [id] => {
                let id = i32::try_from(*id)
                    .map_err(|_| ServiceError::NotFound(ORDER_ITEM_NOT_FOUND.to_string()))?;
                let item = self.find_item(id).await?;
                Ok(OrderItemListing::One(item.into()))
            }
            _ => Err(ServiceError::ValidationError(SINGLE_ID_ONLY.to_string())),
        }
    }

    /// Changes quantity and, only when given, the snapshotted price.
    #[instrument(skip(self, _ctx, request), fields(order_item_id = item_id))]
    pub async fn update_order_item(
        &self,
        _ctx: &AuthContext,
        item_id: i32,
        request: UpdateOrderItemRequest,
    ) -> Result<OrderItemResponse, ServiceError> {
        let existing = self.find_item(item_id).await?;

        let mut active: OrderItemActiveModel = existing.into();
        if let Some(quantity) = request.quantity {
            active.quantity = Set(checked_quantity(quantity)?);
        }
        if let Some(price_at_order) = request.price_at_order {
            active.price_at_order = Set(checked_money(price_at_order, "price_at_order")?);
        }

        let model = active.update(&*self.db_pool).await?;
        info!(order_item_id = item_id, quantity = model.quantity, "Order item updated");
        Ok(model.into())
    }

    /// Removes a single item. The parent order's total is left as stored.
    #[instrument(skip(self, _ctx), fields(order_item_id = item_id))]
    pub async fn delete_order_item(&self, _ctx: &AuthContext, item_id: i32) -> Result<(), ServiceError> {
        let existing = self.find_item(item_id).await?;
        OrderItemEntity::delete_by_id(existing.id)
            .exec(&*self.db_pool)
            .await?;

        info!(order_item_id = item_id, "Order item deleted");
        Ok(())
    }

    async fn find_item(&self, item_id: i32) -> Result<OrderItemModel, ServiceError> {
        OrderItemEntity::find_by_id(item_id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(ORDER_ITEM_NOT_FOUND.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn item(quantity: i32, price_at_order: Decimal) -> OrderItemModel {
        OrderItemModel {
            id: 1,
            order_id: 2,
            product_id: 3,
            quantity,
            price_at_order,
        }
    }

    #[test]
    fn response_carries_snapshot_price_and_subtotal() {
        let body = serde_json::to_value(OrderItemResponse::from(item(3, dec!(25.5)))).unwrap();
        assert_eq!(body["price_at_order"], "25.50");
        assert_eq!(body["subtotal"], "76.50");
        assert_eq!(body["quantity"], 3);
    }

    #[test]
    fn listing_serializes_single_item_as_object() {
        let one = OrderItemListing::One(item(1, dec!(1)).into());
        assert!(serde_json::to_value(one).unwrap().is_object());

        let many = OrderItemListing::Many(vec![item(1, dec!(1)).into()]);
        assert!(serde_json::to_value(many).unwrap().is_array());
    }

    #[test]
    fn client_price_is_not_part_of_create_request() {
        let request: CreateOrderItemRequest = serde_json::from_value(json!({
            "order_id": 1,
            "product_id": "2",
            "quantity": "4",
            "price_at_order": "0.01",
        }))
        .unwrap();
        assert_eq!(request.product_id, Some(2));
        assert_eq!(request.quantity, Some(4));
    }

    #[test]
    fn quantity_must_be_positive() {
        assert_matches!(checked_quantity(0), Err(ServiceError::ValidationError(_)));
        assert_matches!(checked_quantity(-3), Err(ServiceError::ValidationError(_)));
        assert_eq!(checked_quantity(1).unwrap(), 1);
    }
}
