//! Storefront Backend
//!
//! Self-hosted e-commerce service: catalog, cart, wishlists, orders
//! and reviews over Postgres.
//!
//! ## Features
//! - Product catalog with seller management
//! - Shopping cart with merge-on-add semantics
//! - Cash-on-delivery and card-payment checkout
//! - Transactional stock reconciliation
//! - Wishlists and product reviews

pub mod api;
pub mod auth;
pub mod checkout;
pub mod config;
pub mod domain;
pub mod error;
pub mod events;
pub mod extract;
pub mod mailer;
pub mod payments;
pub mod state;
pub mod stock;

pub use config::Config;
pub use error::{ApiError, ApiResult};
pub use state::AppState;
