use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Free-form report about search quality, not tied to a stored answer
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "search_feedback")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[sea_orm(column_type = "Text")]
    pub question: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub additional: Option<String>,

    pub client_id: Option<Uuid>,

    #[sea_orm(indexed)]
    pub timestamp: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
