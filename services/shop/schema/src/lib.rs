//! sea-orm entities for the shop database.

pub mod order_items;
pub mod orders;
pub mod payments;
pub mod products;
pub mod users;
