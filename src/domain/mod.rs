//! Domain row types and the order status state machine.

pub mod cart;
pub mod order;
pub mod product;
pub mod review;
pub mod user;
pub mod wishlist;
