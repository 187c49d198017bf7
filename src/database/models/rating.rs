use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::database::repository::Entity;
use crate::database::schema::{TableDef, RATINGS};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    pub id: i64,
    pub order_id: i64,
    pub score: i64,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRating {
    pub order_id: i64,
    pub score: i64,
    #[serde(default)]
    pub comment: Option<String>,
}

impl Entity for Rating {
    const TABLE: &'static TableDef = &RATINGS;
    type New = NewRating;
}
