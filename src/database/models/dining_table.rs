use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::database::repository::Entity;
use crate::database::schema::{TableDef, DINING_TABLES};
use crate::tenancy::TenantError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiningTable {
    pub id: i64,
    pub label: String,
    pub seats: i64,
    /// Opaque token encoded into the table's QR code
    pub qr_token: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDiningTable {
    pub label: String,
    pub seats: i64,
    pub qr_token: String,
}

impl NewDiningTable {
    pub fn new(label: impl Into<String>, seats: i64) -> Result<Self, TenantError> {
        let label = label.into();
        if label.trim().is_empty() {
            return Err(TenantError::Validation("table label is required".to_string()));
        }
        if seats <= 0 {
            return Err(TenantError::Validation("table must seat at least one guest".to_string()));
        }
        Ok(Self {
            label,
            seats,
            qr_token: Uuid::new_v4().simple().to_string(),
        })
    }
}

impl Entity for DiningTable {
    const TABLE: &'static TableDef = &DINING_TABLES;
    type New = NewDiningTable;
}
