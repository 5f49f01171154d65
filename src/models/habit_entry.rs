use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::progress::EntryRecord;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "habit_entries")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub habit_id: i32,
    pub entry_date: Date,
    pub completed: bool,
    pub notes: Option<String>,
    #[serde(skip_serializing)]
    pub points_awarded: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::habit::Entity",
        from = "Column::HabitId",
        to = "super::habit::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Habit,
}

impl Related<super::habit::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Habit.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Model> for EntryRecord {
    fn from(entry: &Model) -> Self {
        EntryRecord {
            date: entry.entry_date,
            completed: entry.completed,
        }
    }
}
