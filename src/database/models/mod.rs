pub mod dining_table;
pub mod menu_item;
pub mod order;
pub mod rating;
pub mod tenant;
pub mod user;

pub use dining_table::{DiningTable, NewDiningTable};
pub use menu_item::{MenuItem, NewMenuItem};
pub use order::{NewOrder, NewOrderItem, Order, OrderDetails, OrderItem, OrderLine, OrderStatus, PlaceOrder};
pub use rating::{NewRating, Rating};
pub use tenant::Tenant;
pub use user::{NewStaffUser, StaffRole, StaffUser};

pub(crate) fn default_true() -> bool {
    true
}
