use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

pub const KIND_LOCAL: &str = "local";
pub const KIND_REMOTE: &str = "remote";

/// Where the bytes of one accepted upload live
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "stored_files")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// "local" or "remote"
    pub kind: String,
    /// Relative path such as `uploads/summary-...pdf`, set for local files
    pub local_path: Option<String>,
    /// Provider of a remote object ("google_drive", "s3")
    pub provider: Option<String>,
    pub remote_id: Option<String>,
    pub remote_url: Option<String>,
    pub mime_type: String,
    pub size: i64,
    pub sha256: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_one = "super::summaries::Entity")]
    Summaries,
}

impl Related<super::summaries::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Summaries.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
