use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Central registry record. Lives in the shared schema, never in a partition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Tenant {
    pub id: i64,
    pub slug: String,
    pub display_name: String,
    /// Fixed at creation; renaming the restaurant never changes it
    #[serde(skip_serializing, default)]
    pub partition: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
