pub mod claims;
pub mod config;
pub mod error;
pub mod extractors;
pub mod roles;
pub mod verifier;

pub use claims::{Claims, Subject, FALLBACK_SUBJECT};
pub use config::JwtConfig;
pub use error::{AuthError, AuthResult};
pub use extractors::AuthContext;
pub use roles::Role;
pub use verifier::{JwtVerifier, JwtVerifierBuilder};
