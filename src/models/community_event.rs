use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::enums::EventType;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "community_events")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub title: String,
    pub description: String,
    pub event_type: EventType,
    pub host_id: i32,
    pub start_time: DateTimeUtc,
    pub end_time: DateTimeUtc,
    pub max_participants: Option<i32>,
    pub is_online: bool,
    pub meeting_url: Option<String>,
    pub location: Option<String>,
    pub price_points: i64,
    pub is_active: bool,
    pub created_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::HostId",
        to = "super::user::Column::Id"
    )]
    Host,
    #[sea_orm(has_many = "super::event_participant::Entity")]
    Participants,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Host.def()
    }
}

impl Related<super::event_participant::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Participants.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
