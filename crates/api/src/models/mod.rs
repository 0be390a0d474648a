//! Domain models shared between repositories and route handlers.

pub mod cart;
pub mod order;
pub mod product;
pub mod user;

pub use cart::CartLine;
pub use order::{Order, OrderItem, ShippingAddress};
pub use product::{Product, Review};
pub use user::User;
