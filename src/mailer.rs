//! Outbound mail, fire-and-forget from the order's perspective.

use async_trait::async_trait;

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str);
}

/// Logs instead of delivering. Real delivery is an external concern; the
/// workflow never waits on it.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, to: &str, subject: &str, _body: &str) {
        tracing::info!(to, subject, "mail delivery skipped (log mailer)");
    }
}
