use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AuthError, AuthResult};
use crate::roles::Role;

/// Reserved subject claim for the break-glass administrative credential.
/// Tokens carrying it are valid sessions but do not reference a `users` row;
/// order ownership resolution substitutes a persisted admin for them.
pub const FALLBACK_SUBJECT: &str = "fallback-admin";

/// The identity a verified token speaks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase", tag = "kind", content = "id")]
pub enum Subject {
    User(Uuid),
    Fallback,
}

impl Subject {
    pub fn user_id(&self) -> Option<Uuid> {
        match self {
            Subject::User(id) => Some(*id),
            Subject::Fallback => None,
        }
    }
}

/// Application-focused representation of verified JWT claims.
#[derive(Debug, Clone, Serialize)]
pub struct Claims {
    pub subject: Subject,
    pub role: Role,
    pub expires_at: DateTime<Utc>,
    pub issued_at: Option<DateTime<Utc>>,
    pub issuer: String,
    pub audience: Vec<String>,
    pub raw: serde_json::Value,
}

impl Claims {
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

#[derive(Debug, Deserialize)]
struct ClaimsRepr {
    sub: String,
    role: String,
    exp: i64,
    #[serde(default)]
    iat: Option<i64>,
    iss: String,
    #[serde(default)]
    aud: Option<AudienceRepr>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AudienceRepr {
    Single(String),
    Many(Vec<String>),
}

impl TryFrom<ClaimsRepr> for Claims {
    type Error = AuthError;

    fn try_from(value: ClaimsRepr) -> AuthResult<Self> {
        let role = Role::parse(&value.role)
            .ok_or_else(|| AuthError::InvalidClaim("role", value.role.clone()))?;

        let subject = if value.sub == FALLBACK_SUBJECT {
            // Only an administrative session may ride the break-glass credential.
            if role != Role::Admin {
                return Err(AuthError::InvalidClaim("sub", value.sub.clone()));
            }
            Subject::Fallback
        } else {
            Subject::User(
                Uuid::parse_str(&value.sub)
                    .map_err(|_| AuthError::InvalidClaim("sub", value.sub.clone()))?,
            )
        };

        let expires_at = Utc
            .timestamp_opt(value.exp, 0)
            .single()
            .ok_or_else(|| AuthError::InvalidClaim("exp", value.exp.to_string()))?;

        let issued_at = match value.iat {
            Some(iat) => Some(
                Utc.timestamp_opt(iat, 0)
                    .single()
                    .ok_or_else(|| AuthError::InvalidClaim("iat", iat.to_string()))?,
            ),
            None => None,
        };

        let audience = match value.aud {
            Some(AudienceRepr::Single(item)) => vec![item],
            Some(AudienceRepr::Many(items)) => items,
            None => Vec::new(),
        };

        Ok(Self {
            subject,
            role,
            expires_at,
            issued_at,
            issuer: value.iss,
            audience,
            raw: serde_json::Value::Null,
        })
    }
}

impl TryFrom<serde_json::Value> for Claims {
    type Error = AuthError;

    fn try_from(value: serde_json::Value) -> AuthResult<Self> {
        let repr: ClaimsRepr = serde_json::from_value(value.clone())
            .map_err(|err| AuthError::InvalidJson(err.to_string()))?;
        let mut claims = Claims::try_from(repr)?;
        claims.raw = value;
        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(sub: &str, role: &str) -> serde_json::Value {
        json!({
            "sub": sub,
            "role": role,
            "iss": "https://auth.kirana.local",
            "aud": "kirana-storefront",
            "exp": 4_102_444_800i64,
            "iat": 1_700_000_000i64,
        })
    }

    #[test]
    fn parses_user_subject_and_role() {
        let id = Uuid::new_v4();
        let claims = Claims::try_from(payload(&id.to_string(), "customer")).expect("claims");
        assert_eq!(claims.subject, Subject::User(id));
        assert_eq!(claims.role, Role::Customer);
        assert!(!claims.is_admin());
    }

    #[test]
    fn fallback_subject_requires_admin_role() {
        let claims = Claims::try_from(payload(FALLBACK_SUBJECT, "admin")).expect("claims");
        assert_eq!(claims.subject, Subject::Fallback);
        assert!(claims.is_admin());

        let err = Claims::try_from(payload(FALLBACK_SUBJECT, "customer")).expect_err("reject");
        assert!(matches!(err, AuthError::InvalidClaim("sub", _)));
    }

    #[test]
    fn rejects_unknown_role_and_malformed_subject() {
        let err = Claims::try_from(payload(&Uuid::new_v4().to_string(), "root")).expect_err("role");
        assert!(matches!(err, AuthError::InvalidClaim("role", _)));

        let err = Claims::try_from(payload("not-a-uuid", "customer")).expect_err("sub");
        assert!(matches!(err, AuthError::InvalidClaim("sub", _)));
    }
}
