use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::default_true;
use crate::database::repository::Entity;
use crate::database::schema::{TableDef, MENU_ITEMS};
use crate::tenancy::TenantError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuItem {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    /// Price in the smallest currency unit
    pub price_paise: i64,
    pub is_available: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMenuItem {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    pub price_paise: i64,
    #[serde(default = "default_true")]
    pub is_available: bool,
}

impl NewMenuItem {
    pub fn validate(&self) -> Result<(), TenantError> {
        if self.name.trim().is_empty() {
            return Err(TenantError::Validation("menu item name is required".to_string()));
        }
        if self.price_paise < 0 {
            return Err(TenantError::Validation("menu item price cannot be negative".to_string()));
        }
        Ok(())
    }
}

impl Entity for MenuItem {
    const TABLE: &'static TableDef = &MENU_ITEMS;
    type New = NewMenuItem;
}
