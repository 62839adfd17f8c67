//! External payment-session gateway.
//!
//! The checkout workflow only depends on the [`PaymentGateway`] trait;
//! [`StripeGateway`] is the production implementation and tests substitute
//! fakes. Session creation is the one external call whose failure must
//! abort order exposure (see `checkout::place_order_card`).

use async_trait::async_trait;
use serde::Deserialize;

const STRIPE_SESSIONS_URL: &str = "https://api.stripe.com/v1/checkout/sessions";
const CURRENCY: &str = "usd";

/// One payment-session line item, amounts in minor currency units.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionLine {
    pub name: String,
    pub unit_amount: i64,
    pub quantity: i64,
}

#[derive(Clone, Debug)]
pub struct SessionRequest {
    pub line_items: Vec<SessionLine>,
    pub success_url: String,
    pub cancel_url: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_checkout_session(&self, req: SessionRequest)
        -> anyhow::Result<CheckoutSession>;
}

pub struct StripeGateway {
    client: reqwest::Client,
    secret_key: String,
}

impl StripeGateway {
    pub fn new(secret_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            secret_key,
        }
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_checkout_session(
        &self,
        req: SessionRequest,
    ) -> anyhow::Result<CheckoutSession> {
        let mut form: Vec<(String, String)> = vec![
            ("mode".into(), "payment".into()),
            ("success_url".into(), req.success_url),
            ("cancel_url".into(), req.cancel_url),
        ];
        for (i, line) in req.line_items.iter().enumerate() {
            form.push((
                format!("line_items[{i}][price_data][currency]"),
                CURRENCY.into(),
            ));
            form.push((
                format!("line_items[{i}][price_data][product_data][name]"),
                line.name.clone(),
            ));
            form.push((
                format!("line_items[{i}][price_data][unit_amount]"),
                line.unit_amount.to_string(),
            ));
            form.push((format!("line_items[{i}][quantity]"), line.quantity.to_string()));
        }

        let resp = self
            .client
            .post(STRIPE_SESSIONS_URL)
            .bearer_auth(&self.secret_key)
            .form(&form)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("stripe returned {status}: {body}");
        }

        Ok(resp.json::<CheckoutSession>().await?)
    }
}
