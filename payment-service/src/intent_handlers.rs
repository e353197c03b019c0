use axum::extract::State;
use axum::Json;
use bigdecimal::BigDecimal;
use chrono::Utc;
use common_auth::AuthContext;
use common_http_errors::{ApiError, ApiResult};
use common_money::to_minor_units;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::app::AppState;
use crate::gateway::{GatewayError, IntentRequest};
use crate::settings::{resolve_credentials, CredentialError};

pub const DEFAULT_CURRENCY: &str = "INR";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateIntentRequest {
    /// Amount in major units (rupees), converted to the gateway's minor-unit
    /// convention before the call.
    pub amount: BigDecimal,
    #[serde(default)]
    pub currency: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateIntentResponse {
    pub intent_id: String,
    pub amount_minor: i64,
    pub currency: String,
    pub key_id: String,
}

/// Merchant receipt reference: monotonic millis plus a random suffix.
/// Unique per merchant account, which is all the gateway requires.
pub fn receipt_token() -> String {
    format!(
        "rcpt_{}_{:08x}",
        Utc::now().timestamp_millis(),
        rand::random::<u32>()
    )
}

pub async fn create_payment_intent(
    State(state): State<AppState>,
    _auth: AuthContext,
    Json(req): Json<CreateIntentRequest>,
) -> ApiResult<Json<CreateIntentResponse>> {
    if req.amount < BigDecimal::from(1) {
        return Err(ApiError::bad_request("invalid_amount"));
    }
    let amount_minor = to_minor_units(&req.amount)
        .ok_or_else(|| ApiError::bad_request("invalid_amount"))?;
    let currency = req
        .currency
        .unwrap_or_else(|| DEFAULT_CURRENCY.to_string());

    let credentials = resolve_credentials(&state.db).await.map_err(|err| match err {
        CredentialError::Missing => ApiError::config("credentials_missing", err.to_string()),
        CredentialError::Placeholder => ApiError::config("credentials_invalid", err.to_string()),
        CredentialError::Db(db) => {
            error!(error = %db, "credential lookup failed");
            ApiError::internal(None)
        }
    })?;

    let receipt = receipt_token();
    let intent = state
        .gateway
        .create_intent(
            &credentials,
            IntentRequest {
                amount_minor,
                currency: &currency,
                receipt: &receipt,
            },
        )
        .await
        .map_err(|err| match err {
            GatewayError::Rejected(description) => {
                warn!(description = %description, "gateway rejected intent");
                ApiError::bad_gateway(description)
            }
            GatewayError::Transport(detail) => {
                warn!(detail = %detail, "gateway unreachable");
                ApiError::bad_gateway("payment gateway unavailable")
            }
        })?;

    info!(intent_id = %intent.id, amount_minor, "payment intent created");
    Ok(Json(CreateIntentResponse {
        intent_id: intent.id,
        amount_minor: intent.amount,
        currency: intent.currency,
        key_id: credentials.key_id,
    }))
}
