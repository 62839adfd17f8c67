//! Shared application state.

use std::sync::Arc;

use crate::config::Config;
use crate::mailer::Mailer;
use crate::payments::PaymentGateway;

#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::PgPool,
    pub config: Arc<Config>,
    pub payments: Arc<dyn PaymentGateway>,
    pub mailer: Arc<dyn Mailer>,
    pub nats: Option<async_nats::Client>,
}
