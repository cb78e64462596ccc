use anyhow::Context;
use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::config::StripeConfig;

pub const CURRENCY: &str = "usd";

#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Creates a card-only payment intent; returns the provider's object as-is.
    async fn create_payment_intent(&self, amount: i64, currency: &str) -> anyhow::Result<Value>;
}

/// Converts a major-unit price to minor units (cents).
pub fn to_minor_units(price: f64) -> i64 {
    (price * 100.0).round() as i64
}

#[derive(Clone)]
pub struct StripeClient {
    client: reqwest::Client,
    api_base: String,
    secret_key: String,
}

impl StripeClient {
    pub fn new(cfg: &StripeConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: cfg.api_base.trim_end_matches('/').to_string(),
            secret_key: cfg.secret_key.clone(),
        }
    }
}

#[async_trait]
impl PaymentProvider for StripeClient {
    #[instrument(skip(self))]
    async fn create_payment_intent(&self, amount: i64, currency: &str) -> anyhow::Result<Value> {
        let url = format!("{}/v1/payment_intents", self.api_base);
        let amount = amount.to_string();
        let form = [
            ("amount", amount.as_str()),
            ("currency", currency),
            ("payment_method_types[]", "card"),
        ];

        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.secret_key)
            .form(&form)
            .send()
            .await
            .context("send payment intent request")?;
        let status = res.status();
        let body: Value = res.json().await.context("decode payment intent response")?;

        if !status.is_success() {
            let msg = body
                .pointer("/error/message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error");
            anyhow::bail!("stripe returned {status}: {msg}");
        }
        debug!(id = ?body.get("id"), "payment intent created");
        Ok(body)
    }
}
