pub mod common;
pub mod order_items;
pub mod orders;
pub mod products;

use crate::{
    db::DbPool,
    services::{OrderItemService, OrderService, ProductService},
};
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub orders: Arc<OrderService>,
    pub products: Arc<ProductService>,
    pub order_items: Arc<OrderItemService>,
}

impl AppServices {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self {
            orders: Arc::new(OrderService::new(db_pool.clone())),
            products: Arc::new(ProductService::new(db_pool.clone())),
            order_items: Arc::new(OrderItemService::new(db_pool)),
        }
    }
}
