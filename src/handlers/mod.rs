pub mod health;
pub mod root;
pub mod tenant;

use serde::Deserialize;

/// Record id segment shared by tenant routes (`.../:id`)
#[derive(Debug, Deserialize)]
pub struct IdPath {
    pub id: i64,
}
