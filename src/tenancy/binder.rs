use std::fmt;
use std::sync::Arc;

use tracing::{debug, error};

use super::error::TenantError;
use super::namer::PartitionName;
use super::relations::{Orders, Ratings};
use crate::database::models::{DiningTable, MenuItem, StaffUser};
use crate::database::{Collection, TenantConnection};

/// Builds tenant handles from raw connections.
pub struct TenantBinder;

impl TenantBinder {
    /// Bind `connection` to `partition` and wire every collection and
    /// relationship against it. A fresh handle is built on every call; nothing
    /// is shared with earlier bindings.
    pub fn bind(
        connection: Arc<dyn TenantConnection>,
        partition: &PartitionName,
    ) -> Result<TenantHandle, TenantError> {
        if connection.partition() != partition {
            error!(
                bound = %connection.partition(),
                attempted = %partition,
                "Refusing to bind a connection to a foreign partition"
            );
            return Err(TenantError::CrossTenantAccessAttempt {
                bound: connection.partition().to_string(),
                attempted: partition.to_string(),
            });
        }

        let menu_items = Collection::new(connection.clone(), partition.clone());
        let tables = Collection::new(connection.clone(), partition.clone());
        let users = Collection::new(connection.clone(), partition.clone());
        let orders = Collection::new(connection.clone(), partition.clone());
        let order_items = Collection::new(connection.clone(), partition.clone());
        let ratings = Collection::new(connection.clone(), partition.clone());

        let bound = Bound {
            orders: Orders::new(orders.clone(), order_items, menu_items.clone(), tables.clone()),
            ratings: Ratings::new(ratings, orders),
            menu_items,
            tables,
            users,
            partition: partition.clone(),
            connection,
        };

        debug!("Bound tenant handle to {}", partition);
        Ok(TenantHandle {
            inner: Arc::new(bound),
        })
    }
}

struct Bound {
    partition: PartitionName,
    connection: Arc<dyn TenantConnection>,
    menu_items: Collection<MenuItem>,
    tables: Collection<DiningTable>,
    users: Collection<StaffUser>,
    orders: Orders,
    ratings: Ratings,
}

/// Immutable data-access handle scoped to one tenant partition.
///
/// Cloning is cheap and every clone shares the same binding. No accessor takes
/// a partition or tenant argument.
#[derive(Clone)]
pub struct TenantHandle {
    inner: Arc<Bound>,
}

impl TenantHandle {
    pub fn partition(&self) -> &PartitionName {
        &self.inner.partition
    }

    pub fn menu_items(&self) -> &Collection<MenuItem> {
        &self.inner.menu_items
    }

    pub fn tables(&self) -> &Collection<DiningTable> {
        &self.inner.tables
    }

    pub fn users(&self) -> &Collection<StaffUser> {
        &self.inner.users
    }

    pub fn orders(&self) -> &Orders {
        &self.inner.orders
    }

    pub fn ratings(&self) -> &Ratings {
        &self.inner.ratings
    }

    pub async fn ping(&self) -> Result<(), TenantError> {
        Ok(self.inner.connection.ping().await?)
    }

    /// Whether both handles came from the same `bind` call
    pub fn same_binding(&self, other: &TenantHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) async fn close(&self) {
        self.inner.connection.close().await;
    }
}

impl fmt::Debug for TenantHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TenantHandle")
            .field("partition", &self.inner.partition)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::{NewDiningTable, NewMenuItem, NewRating, OrderLine, PlaceOrder};
    use crate::database::{MemoryBackend, StorageBackend, TENANT_TABLES};
    use crate::tenancy::{partition_name, TenantSlug};

    async fn handle_for(backend: &MemoryBackend, slug: &str) -> TenantHandle {
        let partition = partition_name(&TenantSlug::parse(slug).unwrap());
        backend.create_partition(&partition).await.unwrap();
        backend.create_tables(&partition, TENANT_TABLES).await.unwrap();
        let conn = backend.connect(&partition).await.unwrap();
        TenantBinder::bind(conn, &partition).unwrap()
    }

    fn dish(name: &str, price: i64) -> NewMenuItem {
        NewMenuItem {
            name: name.to_string(),
            description: None,
            category: Some("mains".to_string()),
            price_paise: price,
            is_available: true,
        }
    }

    #[tokio::test]
    async fn bind_rejects_foreign_partition() {
        let backend = MemoryBackend::new();
        let a = partition_name(&TenantSlug::parse("alpha").unwrap());
        let b = partition_name(&TenantSlug::parse("beta").unwrap());
        backend.create_partition(&a).await.unwrap();

        let conn = backend.connect(&a).await.unwrap();
        let err = TenantBinder::bind(conn, &b).unwrap_err();
        assert!(matches!(err, TenantError::CrossTenantAccessAttempt { .. }));
    }

    #[tokio::test]
    async fn each_bind_produces_a_fresh_handle() {
        let backend = MemoryBackend::new();
        let first = handle_for(&backend, "alpha").await;
        let conn = backend.connect(first.partition()).await.unwrap();
        let second = TenantBinder::bind(conn, first.partition()).unwrap();

        assert!(!first.same_binding(&second));
        assert!(first.same_binding(&first.clone()));
    }

    #[tokio::test]
    async fn place_order_prices_from_menu() {
        let backend = MemoryBackend::new();
        let handle = handle_for(&backend, "alpha").await;

        let dosa = handle.menu_items().create(&dish("Dosa", 9000)).await.unwrap();
        let chai = handle.menu_items().create(&dish("Chai", 2500)).await.unwrap();
        let table = handle
            .tables()
            .create(&NewDiningTable::new("T1", 4).unwrap())
            .await
            .unwrap();

        let details = handle
            .orders()
            .place(PlaceOrder {
                table_id: Some(table.id),
                customer_name: Some("Asha".to_string()),
                items: vec![
                    OrderLine { menu_item_id: dosa.id, quantity: 2 },
                    OrderLine { menu_item_id: chai.id, quantity: 1 },
                ],
            })
            .await
            .unwrap();

        assert_eq!(details.order.total_paise, 20_500);
        assert_eq!(details.items.len(), 2);

        let fetched = handle.orders().get(details.order.id).await.unwrap();
        assert_eq!(fetched, details);
    }

    #[tokio::test]
    async fn order_cannot_reference_another_tenants_menu() {
        let backend = MemoryBackend::new();
        let alpha = handle_for(&backend, "alpha").await;
        let beta = handle_for(&backend, "beta").await;

        // Ids restart per partition, so use an id only beta has
        beta.menu_items().create(&dish("Idli", 5000)).await.unwrap();
        let foreign = beta.menu_items().create(&dish("Vada", 4000)).await.unwrap();
        alpha.menu_items().create(&dish("Dosa", 9000)).await.unwrap();

        let err = alpha
            .orders()
            .place(PlaceOrder {
                table_id: None,
                customer_name: None,
                items: vec![OrderLine { menu_item_id: foreign.id, quantity: 1 }],
            })
            .await
            .unwrap_err();

        assert!(matches!(err, TenantError::Relationship(_)));
        assert!(alpha.orders().list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unavailable_items_and_bad_quantities_are_rejected() {
        let backend = MemoryBackend::new();
        let handle = handle_for(&backend, "alpha").await;
        let mut sold_out = dish("Biryani", 30000);
        sold_out.is_available = false;
        let item = handle.menu_items().create(&sold_out).await.unwrap();

        let unavailable = handle
            .orders()
            .place(PlaceOrder {
                table_id: None,
                customer_name: None,
                items: vec![OrderLine { menu_item_id: item.id, quantity: 1 }],
            })
            .await
            .unwrap_err();
        assert!(matches!(unavailable, TenantError::Validation(_)));

        let zero = handle
            .orders()
            .place(PlaceOrder {
                table_id: None,
                customer_name: None,
                items: vec![OrderLine { menu_item_id: item.id, quantity: 0 }],
            })
            .await
            .unwrap_err();
        assert!(matches!(zero, TenantError::Validation(_)));

        let empty = handle
            .orders()
            .place(PlaceOrder { table_id: None, customer_name: None, items: vec![] })
            .await
            .unwrap_err();
        assert!(matches!(empty, TenantError::Validation(_)));
    }

    #[tokio::test]
    async fn ratings_reference_local_orders() {
        let backend = MemoryBackend::new();
        let handle = handle_for(&backend, "alpha").await;
        let item = handle.menu_items().create(&dish("Dosa", 9000)).await.unwrap();
        let placed = handle
            .orders()
            .place(PlaceOrder {
                table_id: None,
                customer_name: None,
                items: vec![OrderLine { menu_item_id: item.id, quantity: 1 }],
            })
            .await
            .unwrap();

        let rating = handle
            .ratings()
            .submit(NewRating { order_id: placed.order.id, score: 5, comment: None })
            .await
            .unwrap();
        assert_eq!(rating.order_id, placed.order.id);
        assert_eq!(handle.ratings().for_order(placed.order.id).await.unwrap().len(), 1);

        let missing = handle
            .ratings()
            .submit(NewRating { order_id: 999, score: 4, comment: None })
            .await
            .unwrap_err();
        assert!(matches!(missing, TenantError::Relationship(_)));

        let out_of_range = handle
            .ratings()
            .submit(NewRating { order_id: placed.order.id, score: 6, comment: None })
            .await
            .unwrap_err();
        assert!(matches!(out_of_range, TenantError::Validation(_)));
    }

    #[tokio::test]
    async fn set_status_updates_order() {
        let backend = MemoryBackend::new();
        let handle = handle_for(&backend, "alpha").await;
        let item = handle.menu_items().create(&dish("Dosa", 9000)).await.unwrap();
        let placed = handle
            .orders()
            .place(PlaceOrder {
                table_id: None,
                customer_name: None,
                items: vec![OrderLine { menu_item_id: item.id, quantity: 1 }],
            })
            .await
            .unwrap();

        let served = handle
            .orders()
            .set_status(placed.order.id, crate::database::models::OrderStatus::Served)
            .await
            .unwrap();
        assert_eq!(served.status, crate::database::models::OrderStatus::Served);
    }
}
