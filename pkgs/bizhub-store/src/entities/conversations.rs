//! Conversation entity

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "conversations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub participant1_id: String, // initiator
    pub participant2_id: String,
    pub business_id: Option<String>,
    pub participant_low: String,  // min(participant1_id, participant2_id)
    pub participant_high: String, // max(participant1_id, participant2_id)
    pub business_key: String,     // business_id or "" (NULLs never collide in UNIQUE)
    pub last_message_at: i64,     // microseconds, list ordering
    pub created_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::messages::Entity")]
    Messages,
}

impl Related<super::messages::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Messages.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
