use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::default_true;
use crate::database::repository::Entity;
use crate::database::schema::{TableDef, USERS};
use crate::tenancy::TenantError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StaffRole {
    Owner,
    Manager,
    Captain,
    Kitchen,
    #[default]
    Staff,
}

/// Restaurant staff account (admin, captain and kitchen front ends)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaffUser {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: StaffRole,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewStaffUser {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub role: StaffRole,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl NewStaffUser {
    pub fn validate(&self) -> Result<(), TenantError> {
        if self.name.trim().is_empty() {
            return Err(TenantError::Validation("user name is required".to_string()));
        }
        if !self.email.contains('@') {
            return Err(TenantError::Validation("a valid email is required".to_string()));
        }
        Ok(())
    }
}

impl Entity for StaffUser {
    const TABLE: &'static TableDef = &USERS;
    type New = NewStaffUser;
}
