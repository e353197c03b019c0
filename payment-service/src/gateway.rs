use serde::Deserialize;
use thiserror::Error;

use crate::settings::MerchantCredentials;

/// Intent as reserved on the gateway side, amounts in minor units.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayIntent {
    pub id: String,
    pub amount: i64,
    pub currency: String,
}

pub struct IntentRequest<'a> {
    pub amount_minor: i64,
    pub currency: &'a str,
    pub receipt: &'a str,
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("gateway rejected the request: {0}")]
    Rejected(String),
    #[error("gateway unreachable: {0}")]
    Transport(String),
}

#[async_trait::async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_intent(
        &self,
        credentials: &MerchantCredentials,
        request: IntentRequest<'_>,
    ) -> Result<GatewayIntent, GatewayError>;
}

/// Real gateway integration over HTTP basic auth.
pub struct HttpGateway {
    client: reqwest::Client,
    base_url: String,
}

impl HttpGateway {
    pub fn new(base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }
}

#[derive(Debug, Deserialize)]
struct GatewayErrorBody {
    #[serde(default)]
    error: Option<GatewayErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct GatewayErrorDetail {
    #[serde(default)]
    description: Option<String>,
}

#[async_trait::async_trait]
impl PaymentGateway for HttpGateway {
    async fn create_intent(
        &self,
        credentials: &MerchantCredentials,
        request: IntentRequest<'_>,
    ) -> Result<GatewayIntent, GatewayError> {
        let response = self
            .client
            .post(format!("{}/v1/orders", self.base_url))
            .basic_auth(&credentials.key_id, Some(&credentials.key_secret))
            .json(&serde_json::json!({
                "amount": request.amount_minor,
                "currency": request.currency,
                "receipt": request.receipt,
            }))
            .send()
            .await
            .map_err(|err| GatewayError::Transport(err.to_string()))?;

        if !response.status().is_success() {
            let description = response
                .json::<GatewayErrorBody>()
                .await
                .ok()
                .and_then(|body| body.error)
                .and_then(|detail| detail.description)
                .unwrap_or_else(|| "payment intent was declined".to_string());
            return Err(GatewayError::Rejected(description));
        }

        response
            .json::<GatewayIntent>()
            .await
            .map_err(|err| GatewayError::Rejected(format!("malformed gateway response: {err}")))
    }
}

/// In-process stand-in used by tests and local development.
pub struct StubGateway;

impl StubGateway {
    pub fn new() -> Self {
        Self
    }
}

impl Default for StubGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl PaymentGateway for StubGateway {
    async fn create_intent(
        &self,
        _credentials: &MerchantCredentials,
        request: IntentRequest<'_>,
    ) -> Result<GatewayIntent, GatewayError> {
        Ok(GatewayIntent {
            id: format!("intent_{}", request.receipt),
            amount: request.amount_minor,
            currency: request.currency.to_string(),
        })
    }
}
