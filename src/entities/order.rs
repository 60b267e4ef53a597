use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set};
use serde::{Deserialize, Serialize};

pub const DEFAULT_STATUS: &str = "pending";

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub order_number: String,
    pub total_price: Decimal,
    pub created_time: DateTime<Utc>,
    pub customer_name: Option<String>,
    pub status: String,
    #[sea_orm(column_type = "Text")]
    pub note: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::order_item::Entity")]
    OrderItems,
}

impl Related<super::order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItems.def()
    }
}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active_model = self;

        // created_time is stamped once and never rewritten
        if insert {
            active_model.created_time = Set(Utc::now());

            if let ActiveValue::NotSet = active_model.status {
                active_model.status = Set(DEFAULT_STATUS.to_string());
            }
            if let ActiveValue::NotSet = active_model.note {
                active_model.note = Set(String::new());
            }
        }

        Ok(active_model)
    }
}
