use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

pub const ROLE_ADMIN: &str = "ADMIN";
pub const ROLE_STUDENT: &str = "STUDENT";

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub full_name: String,
    #[sea_orm(unique)]
    pub email: String,
    pub role: String,
    pub institution: Option<String>,
    pub created_at: DateTimeUtc,
}

impl Model {
    pub fn is_admin(&self) -> bool {
        self.role == ROLE_ADMIN
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::summaries::Entity")]
    Summaries,
    #[sea_orm(has_many = "super::ratings::Entity")]
    Ratings,
}

impl Related<super::summaries::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Summaries.def()
    }
}

impl Related<super::ratings::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Ratings.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
