use axum::extract::State;
use axum::Json;
use common_http_errors::{ApiError, ApiResult};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::repo::{self, MarkPaid};
use crate::settings::{resolve_credentials, CredentialError};

type HmacSha256 = Hmac<Sha256>;

/// Signature the gateway hands to the client on completion: lowercase-hex
/// HMAC-SHA256 over `intent_id|payment_id` keyed with the merchant secret.
pub fn payment_signature(intent_id: &str, payment_id: &str, key_secret: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(key_secret.as_bytes())
        .expect("HMAC-SHA256 accepts keys of any length");
    mac.update(intent_id.as_bytes());
    mac.update(b"|");
    mac.update(payment_id.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Timing-safe comparison; a forged confirmation must not learn how many
/// leading bytes it got right.
pub fn signature_matches(expected_hex: &str, provided: &str) -> bool {
    expected_hex
        .as_bytes()
        .ct_eq(provided.as_bytes())
        .unwrap_u8()
        == 1
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VerifyRequest {
    pub intent_id: String,
    pub payment_id: String,
    pub signature: String,
    pub order_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub message: String,
    pub order_id: Uuid,
}

/// Reached by the client redirect after gateway checkout; the signature is
/// the authentication, so the route itself is unauthenticated.
pub async fn verify_payment(
    State(state): State<AppState>,
    Json(req): Json<VerifyRequest>,
) -> ApiResult<Json<VerifyResponse>> {
    let credentials = resolve_credentials(&state.db).await.map_err(|err| match err {
        CredentialError::Missing => ApiError::config("credentials_missing", err.to_string()),
        CredentialError::Placeholder => ApiError::config("credentials_invalid", err.to_string()),
        CredentialError::Db(db) => {
            error!(error = %db, "credential lookup failed");
            ApiError::internal(None)
        }
    })?;

    let expected = payment_signature(&req.intent_id, &req.payment_id, &credentials.key_secret);
    if !signature_matches(&expected, &req.signature) {
        warn!(order_id = %req.order_id, intent_id = %req.intent_id, "payment signature mismatch");
        return Err(ApiError::bad_request("invalid_signature"));
    }

    match repo::mark_order_paid(&state.db, req.order_id, &req.payment_id)
        .await
        .map_err(|err| {
            error!(error = %err, order_id = %req.order_id, "failed to mark order paid");
            ApiError::internal(None)
        })? {
        MarkPaid::Applied => {
            info!(order_id = %req.order_id, payment_id = %req.payment_id, "payment verified");
            Ok(Json(VerifyResponse {
                message: "payment verified".to_string(),
                order_id: req.order_id,
            }))
        }
        MarkPaid::NotFound => Err(ApiError::not_found("order_not_found")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // HMAC-SHA256("order_abc|pay_xyz", "s3cr3t"), precomputed.
    const GOLDEN: &str = "ee21698235c31aef5bb049b86d1c00014db7de75dbe78cb4ed9ffa8e90855655";

    #[test]
    fn golden_signature_value() {
        assert_eq!(payment_signature("order_abc", "pay_xyz", "s3cr3t"), GOLDEN);
    }

    #[test]
    fn signature_is_deterministic() {
        let a = payment_signature("order_abc", "pay_xyz", "s3cr3t");
        let b = payment_signature("order_abc", "pay_xyz", "s3cr3t");
        assert_eq!(a, b);
    }

    #[test]
    fn any_single_byte_change_breaks_the_match() {
        let expected = payment_signature("order_abc", "pay_xyz", "s3cr3t");
        assert!(signature_matches(&expected, GOLDEN));

        for i in 0..GOLDEN.len() {
            let mut tampered = GOLDEN.as_bytes().to_vec();
            tampered[i] = if tampered[i] == b'0' { b'1' } else { b'0' };
            let tampered = String::from_utf8(tampered).unwrap();
            assert!(!signature_matches(&expected, &tampered), "offset {i}");
        }
    }

    #[test]
    fn different_secret_or_message_changes_the_signature() {
        assert_ne!(payment_signature("order_abc", "pay_xyz", "other"), GOLDEN);
        assert_ne!(payment_signature("order_abd", "pay_xyz", "s3cr3t"), GOLDEN);
        assert_ne!(payment_signature("order_abc", "pay_xyw", "s3cr3t"), GOLDEN);
    }

    #[test]
    fn length_mismatch_is_not_a_match() {
        let expected = payment_signature("order_abc", "pay_xyz", "s3cr3t");
        assert!(!signature_matches(&expected, &expected[..expected.len() - 1]));
        assert!(!signature_matches(&expected, ""));
    }
}
