use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::enums::{Rarity, ShopCategory};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "shop_items")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub name: String,
    pub description: String,
    pub category: ShopCategory,
    pub price_points: i64,
    pub icon: String,
    pub rarity: Rarity,
    pub is_available: bool,
    pub effect_type: Option<String>,
    pub effect_value: Option<i32>,
    /// `None` for permanent items
    pub duration_days: Option<i32>,
    pub created_at: String,
}

impl Model {
    pub fn is_permanent(&self) -> bool {
        self.duration_days.is_none()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::user_purchase::Entity")]
    Purchases,
}

impl Related<super::user_purchase::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Purchases.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
