use std::collections::HashMap;

use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};

use crate::claims::Claims;
use crate::config::JwtConfig;
use crate::error::{AuthError, AuthResult};

/// Verifies RS256 tokens against a fixed set of PEM-configured keys,
/// selected by the token's `kid` header.
pub struct JwtVerifier {
    keys: HashMap<String, DecodingKey>,
    validation: Validation,
}

impl JwtVerifier {
    pub fn builder(config: JwtConfig) -> JwtVerifierBuilder {
        JwtVerifierBuilder {
            config,
            keys: HashMap::new(),
        }
    }

    pub fn verify(&self, token: &str) -> AuthResult<Claims> {
        let header =
            decode_header(token).map_err(|err| AuthError::InvalidHeader(err.to_string()))?;
        let kid = header.kid.ok_or(AuthError::MissingKeyId)?;
        let key = self
            .keys
            .get(&kid)
            .ok_or_else(|| AuthError::UnknownKeyId(kid.clone()))?;

        let data = decode::<serde_json::Value>(token, key, &self.validation)?;
        Claims::try_from(data.claims)
    }
}

pub struct JwtVerifierBuilder {
    config: JwtConfig,
    keys: HashMap<String, DecodingKey>,
}

impl JwtVerifierBuilder {
    pub fn with_rsa_pem(mut self, kid: &str, pem: &[u8]) -> AuthResult<Self> {
        let key = DecodingKey::from_rsa_pem(pem)
            .map_err(|err| AuthError::KeyParse(kid.to_string(), err.to_string()))?;
        self.keys.insert(kid.to_string(), key);
        Ok(self)
    }

    pub fn build(self) -> JwtVerifier {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[&self.config.issuer]);
        validation.set_audience(&[&self.config.audience]);
        validation.leeway = u64::from(self.config.leeway_seconds);

        JwtVerifier {
            keys: self.keys,
            validation,
        }
    }
}
