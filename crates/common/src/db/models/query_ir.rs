//! Stored answers of the search pipeline

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "queries_ir")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[sea_orm(column_type = "Text")]
    pub query: String,

    #[sea_orm(column_type = "Text")]
    pub brief: String,

    #[sea_orm(column_type = "Text")]
    pub response: String,

    /// Formatted references as a JSON array of strings, in display order
    #[sea_orm(column_type = "JsonBinary")]
    pub references: Json,

    #[sea_orm(column_type = "Text")]
    pub expanded_query: String,

    pub model: String,

    pub backend_version: Option<String>,

    /// Anonymous analytics client identifier
    pub client_id: Option<Uuid>,

    pub user_id: Option<String>,

    #[sea_orm(indexed)]
    pub timestamp: DateTimeWithTimeZone,

    /// Seconds spent producing the answer
    pub response_time: f64,
}

impl Model {
    /// References decoded back into strings; non-string entries are skipped
    pub fn reference_list(&self) -> Vec<String> {
        self.references
            .as_array()
            .map(|refs| {
                refs.iter()
                    .filter_map(|r| r.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_one = "super::feedback::Entity")]
    Feedback,
}

impl Related<super::feedback::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Feedback.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
