//! Cross-entity operations of a bound handle. Every reference is resolved
//! through collections of the same partition, so a foreign id from another
//! tenant simply does not exist here.

use serde_json::{json, Value};
use tracing::{debug, warn};

use super::error::TenantError;
use crate::database::models::{
    DiningTable, MenuItem, NewOrder, NewOrderItem, NewRating, Order, OrderDetails, OrderItem,
    OrderStatus, PlaceOrder, Rating,
};
use crate::database::{where_eq, Collection, Row};

pub const MIN_SCORE: i64 = 1;
pub const MAX_SCORE: i64 = 5;

/// Orders with their line items, menu and dining-table references
#[derive(Clone)]
pub struct Orders {
    orders: Collection<Order>,
    items: Collection<OrderItem>,
    menu_items: Collection<MenuItem>,
    tables: Collection<DiningTable>,
}

impl Orders {
    pub(crate) fn new(
        orders: Collection<Order>,
        items: Collection<OrderItem>,
        menu_items: Collection<MenuItem>,
        tables: Collection<DiningTable>,
    ) -> Self {
        Self {
            orders,
            items,
            menu_items,
            tables,
        }
    }

    pub async fn list(&self) -> Result<Vec<Order>, TenantError> {
        Ok(self.orders.list().await?)
    }

    pub async fn get(&self, id: i64) -> Result<OrderDetails, TenantError> {
        let order = self.orders.select_404(id).await?;
        let items = self.items.select_any(where_eq("order_id", id)).await?;
        Ok(OrderDetails { order, items })
    }

    /// Price and store an order. Menu items are priced from their current
    /// rows, never from the request.
    pub async fn place(&self, request: PlaceOrder) -> Result<OrderDetails, TenantError> {
        if request.items.is_empty() {
            return Err(TenantError::Validation("an order needs at least one item".to_string()));
        }

        if let Some(table_id) = request.table_id {
            if self.tables.select_one(table_id).await?.is_none() {
                warn!("Order references unknown dining table {}", table_id);
                return Err(TenantError::Relationship(format!(
                    "dining table {} does not exist",
                    table_id
                )));
            }
        }

        let mut priced = Vec::with_capacity(request.items.len());
        let mut total: i64 = 0;
        for line in &request.items {
            if line.quantity <= 0 {
                return Err(TenantError::Validation(format!(
                    "quantity for menu item {} must be positive",
                    line.menu_item_id
                )));
            }

            let item = self
                .menu_items
                .select_one(line.menu_item_id)
                .await?
                .ok_or_else(|| {
                    warn!("Order references unknown menu item {}", line.menu_item_id);
                    TenantError::Relationship(format!(
                        "menu item {} does not exist",
                        line.menu_item_id
                    ))
                })?;
            if !item.is_available {
                return Err(TenantError::Validation(format!("{} is not available", item.name)));
            }

            total = item
                .price_paise
                .checked_mul(line.quantity)
                .and_then(|line_total| total.checked_add(line_total))
                .ok_or_else(|| TenantError::Validation("order total is too large".to_string()))?;
            priced.push((item, line.quantity));
        }

        let order = self
            .orders
            .create(&NewOrder {
                table_id: request.table_id,
                customer_name: request.customer_name,
                status: OrderStatus::Placed,
                total_paise: total,
            })
            .await?;

        let mut items = Vec::with_capacity(priced.len());
        for (menu_item, quantity) in priced {
            let created = self
                .items
                .create(&NewOrderItem {
                    order_id: order.id,
                    menu_item_id: menu_item.id,
                    quantity,
                    unit_price_paise: menu_item.price_paise,
                })
                .await;

            match created {
                Ok(item) => items.push(item),
                Err(e) => {
                    // Line items cascade with the order
                    if let Err(cleanup) = self.orders.delete(order.id).await {
                        warn!("Failed to remove partial order {}: {}", order.id, cleanup);
                    }
                    return Err(e.into());
                }
            }
        }

        debug!("Placed order {} with {} items", order.id, items.len());
        Ok(OrderDetails { order, items })
    }

    pub async fn set_status(&self, id: i64, status: OrderStatus) -> Result<Order, TenantError> {
        let mut patch = Row::new();
        patch.insert("status".to_string(), json!(status));

        self.orders
            .update(id, patch)
            .await?
            .ok_or_else(|| TenantError::Relationship(format!("order {} does not exist", id)))
    }
}

/// Ratings, each referencing an order of the same restaurant
#[derive(Clone)]
pub struct Ratings {
    ratings: Collection<Rating>,
    orders: Collection<Order>,
}

impl Ratings {
    pub(crate) fn new(ratings: Collection<Rating>, orders: Collection<Order>) -> Self {
        Self { ratings, orders }
    }

    pub async fn list(&self) -> Result<Vec<Rating>, TenantError> {
        Ok(self.ratings.list().await?)
    }

    pub async fn for_order(&self, order_id: i64) -> Result<Vec<Rating>, TenantError> {
        Ok(self
            .ratings
            .select_any(where_eq("order_id", Value::from(order_id)))
            .await?)
    }

    pub async fn submit(&self, rating: NewRating) -> Result<Rating, TenantError> {
        if !(MIN_SCORE..=MAX_SCORE).contains(&rating.score) {
            return Err(TenantError::Validation(format!(
                "score must be between {} and {}",
                MIN_SCORE, MAX_SCORE
            )));
        }
        if self.orders.select_one(rating.order_id).await?.is_none() {
            warn!("Rating references unknown order {}", rating.order_id);
            return Err(TenantError::Relationship(format!(
                "order {} does not exist",
                rating.order_id
            )));
        }

        Ok(self.ratings.create(&rating).await?)
    }
}
