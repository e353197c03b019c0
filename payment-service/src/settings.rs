use std::env;

use sqlx::PgPool;
use thiserror::Error;

/// Merchant credential pair for the payment gateway. `key_id` is shared with
/// the client to complete the checkout; `key_secret` never leaves the server.
#[derive(Debug, Clone)]
pub struct MerchantCredentials {
    pub key_id: String,
    pub key_secret: String,
}

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("merchant credentials are not configured")]
    Missing,
    #[error("merchant credentials are placeholder values")]
    Placeholder,
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

const PLACEHOLDER_MARKERS: &[&str] = &["YOUR_", "changeme", "xxxxxxxx"];

/// Sample values shipped in docs and dotenv templates must never reach the
/// gateway; they get a distinct, operator-actionable error.
pub fn is_placeholder(value: &str) -> bool {
    PLACEHOLDER_MARKERS
        .iter()
        .any(|marker| value.contains(marker))
}

/// Resolve merchant credentials: per-deployment settings record first,
/// process environment second, field by field. Resolved on every call so a
/// rotated settings row takes effect without a restart; validation happens
/// here at the edge rather than at each call site.
pub async fn resolve_credentials(pool: &PgPool) -> Result<MerchantCredentials, CredentialError> {
    let row: Option<(String, String)> = sqlx::query_as(
        "SELECT key_id, key_secret FROM payment_settings ORDER BY updated_at DESC LIMIT 1",
    )
    .fetch_optional(pool)
    .await?;

    let (row_key_id, row_key_secret) = row.unwrap_or_default();
    let key_id = non_empty(row_key_id).or_else(|| env_var("GATEWAY_KEY_ID"));
    let key_secret = non_empty(row_key_secret).or_else(|| env_var("GATEWAY_KEY_SECRET"));

    let (Some(key_id), Some(key_secret)) = (key_id, key_secret) else {
        return Err(CredentialError::Missing);
    };
    if is_placeholder(&key_id) || is_placeholder(&key_secret) {
        return Err(CredentialError::Placeholder);
    }

    Ok(MerchantCredentials { key_id, key_secret })
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok().and_then(non_empty)
}
