use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::database::repository::Entity;
use crate::database::schema::{TableDef, ORDERS, ORDER_ITEMS};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Placed,
    Preparing,
    Served,
    Paid,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub table_id: Option<i64>,
    pub customer_name: Option<String>,
    pub status: OrderStatus,
    pub total_paise: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrder {
    pub table_id: Option<i64>,
    pub customer_name: Option<String>,
    pub status: OrderStatus,
    pub total_paise: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub menu_item_id: i64,
    pub quantity: i64,
    pub unit_price_paise: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrderItem {
    pub order_id: i64,
    pub menu_item_id: i64,
    pub quantity: i64,
    pub unit_price_paise: i64,
}

/// One requested line of a new order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderLine {
    pub menu_item_id: i64,
    pub quantity: i64,
}

/// Order request as submitted by a customer or captain
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceOrder {
    #[serde(default)]
    pub table_id: Option<i64>,
    #[serde(default)]
    pub customer_name: Option<String>,
    pub items: Vec<OrderLine>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderDetails {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}

impl Entity for Order {
    const TABLE: &'static TableDef = &ORDERS;
    type New = NewOrder;
}

impl Entity for OrderItem {
    const TABLE: &'static TableDef = &ORDER_ITEMS;
    type New = NewOrderItem;
}
