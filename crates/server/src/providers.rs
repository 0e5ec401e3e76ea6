//! External provider collaborators
//!
//! Payment capture and identity verification are SaaS collaborators. Both
//! are injected into [`crate::state::AppState`] as trait objects so the
//! lifecycle is explicit and tests can substitute fakes; nothing here is a
//! process-global.
//!
//! The ledger never moves money on a provider's behalf before the provider
//! confirms: checkout creation returns a session and stops, and credits only
//! happen in the webhook path after the digest check.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::time::Duration;

/// Timeout for every provider round trip.
const PROVIDER_TIMEOUT: Duration = Duration::from_secs(30);

/// A checkout session created at the payment provider.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    pub session_id: String,
    pub checkout_url: String,
}

/// An identity-verification session at the verification provider.
#[derive(Debug, Clone, Deserialize)]
pub struct VerificationSession {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub requires_manual_review: bool,
}

#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Creates a hosted checkout session for a wallet top-up.
    async fn create_checkout_session(
        &self,
        wallet_binding_id: &str,
        amount_cents: i64,
    ) -> Result<CheckoutSession>;

    /// Verifies the webhook signature over the raw body.
    fn verify_webhook(&self, body: &[u8], signature: &str) -> bool;
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn start_session(&self, wallet_binding_id: &str) -> Result<VerificationSession>;
    async fn fetch_session(&self, session_id: &str) -> Result<VerificationSession>;
}

/// Hex digest binding the webhook secret to the exact body bytes.
pub fn webhook_digest(secret: &str, body: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hasher.update(b".");
    hasher.update(body);
    hex::encode(hasher.finalize())
}

// ============================================================================
// HTTP IMPLEMENTATIONS
// ============================================================================

pub struct HttpPaymentProvider {
    client: Client,
    base_url: String,
    api_key: String,
    webhook_secret: String,
}

impl HttpPaymentProvider {
    pub fn new(base_url: &str, api_key: &str, webhook_secret: &str) -> Result<Self> {
        Ok(Self {
            client: Client::builder().timeout(PROVIDER_TIMEOUT).build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            webhook_secret: webhook_secret.to_string(),
        })
    }
}

#[async_trait]
impl PaymentProvider for HttpPaymentProvider {
    async fn create_checkout_session(
        &self,
        wallet_binding_id: &str,
        amount_cents: i64,
    ) -> Result<CheckoutSession> {
        let resp = self
            .client
            .post(format!("{}/v1/checkout/sessions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({
                "amount_total": amount_cents,
                "currency": "usd",
                "metadata": { "wallet_binding_id": wallet_binding_id },
            }))
            .send()
            .await
            .map_err(|e| anyhow!("payment provider unreachable: {e}"))?;

        if !resp.status().is_success() {
            return Err(anyhow!(
                "payment provider rejected checkout: {}",
                resp.status()
            ));
        }

        let session = resp
            .json::<CheckoutSession>()
            .await
            .map_err(|e| anyhow!("payment provider returned malformed session: {e}"))?;
        Ok(session)
    }

    fn verify_webhook(&self, body: &[u8], signature: &str) -> bool {
        if self.webhook_secret.is_empty() {
            return false;
        }
        webhook_digest(&self.webhook_secret, body) == signature.trim().to_lowercase()
    }
}

pub struct HttpIdentityProvider {
    client: Client,
    base_url: String,
    api_key: String,
}

impl HttpIdentityProvider {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self> {
        Ok(Self {
            client: Client::builder().timeout(PROVIDER_TIMEOUT).build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn start_session(&self, wallet_binding_id: &str) -> Result<VerificationSession> {
        let resp = self
            .client
            .post(format!("{}/v1/verification/sessions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({ "reference": wallet_binding_id }))
            .send()
            .await
            .map_err(|e| anyhow!("identity provider unreachable: {e}"))?;

        if !resp.status().is_success() {
            return Err(anyhow!(
                "identity provider rejected session: {}",
                resp.status()
            ));
        }

        Ok(resp
            .json::<VerificationSession>()
            .await
            .map_err(|e| anyhow!("identity provider returned malformed session: {e}"))?)
    }

    async fn fetch_session(&self, session_id: &str) -> Result<VerificationSession> {
        let resp = self
            .client
            .get(format!(
                "{}/v1/verification/sessions/{session_id}",
                self.base_url
            ))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| anyhow!("identity provider unreachable: {e}"))?;

        if !resp.status().is_success() {
            return Err(anyhow!(
                "identity provider lookup failed: {}",
                resp.status()
            ));
        }

        Ok(resp
            .json::<VerificationSession>()
            .await
            .map_err(|e| anyhow!("identity provider returned malformed session: {e}"))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedPaymentProvider {
        secret: String,
    }

    #[async_trait]
    impl PaymentProvider for FixedPaymentProvider {
        async fn create_checkout_session(
            &self,
            wallet_binding_id: &str,
            amount_cents: i64,
        ) -> Result<CheckoutSession> {
            Ok(CheckoutSession {
                session_id: format!("cs_{wallet_binding_id}_{amount_cents}"),
                checkout_url: "https://pay.example/session".to_string(),
            })
        }

        fn verify_webhook(&self, body: &[u8], signature: &str) -> bool {
            webhook_digest(&self.secret, body) == signature
        }
    }

    #[test]
    fn digest_binds_secret_and_body() {
        let a = webhook_digest("secret-a", b"{\"session_id\":\"cs_1\"}");
        let b = webhook_digest("secret-b", b"{\"session_id\":\"cs_1\"}");
        let c = webhook_digest("secret-a", b"{\"session_id\":\"cs_2\"}");
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_eq!(a, webhook_digest("secret-a", b"{\"session_id\":\"cs_1\"}"));
    }

    #[tokio::test]
    async fn fake_provider_round_trip() {
        let provider = FixedPaymentProvider {
            secret: "whsec_test".to_string(),
        };
        let session = provider.create_checkout_session("wb_1", 2500).await.unwrap();
        assert_eq!(session.session_id, "cs_wb_1_2500");

        let body = b"{\"amount_total\":2500}";
        let signature = webhook_digest("whsec_test", body);
        assert!(provider.verify_webhook(body, &signature));
        assert!(!provider.verify_webhook(b"tampered", &signature));
    }

    #[test]
    fn empty_secret_never_verifies() {
        let provider = HttpPaymentProvider::new("https://pay.example", "sk_test", "").unwrap();
        let body = b"{}";
        assert!(!provider.verify_webhook(body, &webhook_digest("", body)));
    }
}
