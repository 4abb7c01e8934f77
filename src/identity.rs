//! Caller identity.
//!
//! Tokens are HS256 JWTs carrying the user id in `sub` and the role in `role`.
//! The auth service that issues them in production is outside this crate;
//! [`JwtIdentityProvider::issue_token`] exists for tests and local tooling.

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Customer,
    Seller,
    Admin,
}

/// Authenticated caller of an API route.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Caller {
    pub id: Uuid,
    pub role: Role,
}

impl Caller {
    pub fn is_seller(&self) -> bool {
        self.role == Role::Seller
    }
}

/// Resolves a raw token into a caller.
pub trait IdentityProvider: Send + Sync {
    fn resolve_caller(&self, token: &str) -> Result<Caller>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: Role,
    pub exp: i64,
    pub iat: i64,
}

#[derive(Clone)]
pub struct JwtIdentityProvider {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtIdentityProvider {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    pub fn issue_token(&self, caller: Caller, ttl: Duration) -> Result<String> {
        let now = Utc::now();
        let claims = Claims { sub: caller.id.to_string(), role: caller.role, exp: (now + ttl).timestamp(), iat: now.timestamp() };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key).map_err(|e| Error::Internal(format!("token generation failed: {e}")))
    }
}

impl IdentityProvider for JwtIdentityProvider {
    fn resolve_caller(&self, token: &str) -> Result<Caller> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["sub", "exp"]);

        let data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => Error::unauthenticated("Token expired"),
            _ => {
                tracing::debug!(error = %e, "token rejected");
                Error::unauthenticated("Invalid token")
            }
        })?;
        let id = Uuid::parse_str(&data.claims.sub).map_err(|_| Error::unauthenticated("Invalid token subject"))?;
        Ok(Caller { id, role: data.claims.role })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_and_resolve() {
        let provider = JwtIdentityProvider::new("test-secret-that-is-long-enough-for-hs256");
        let caller = Caller { id: Uuid::new_v4(), role: Role::Seller };
        let token = provider.issue_token(caller, Duration::minutes(5)).unwrap();
        let resolved = provider.resolve_caller(&token).unwrap();
        assert_eq!(resolved, caller);
        assert!(resolved.is_seller());
    }

    #[test]
    fn test_rejects_foreign_and_expired_tokens() {
        let provider = JwtIdentityProvider::new("one-secret-one-secret-one-secret");
        let other = JwtIdentityProvider::new("another-secret-another-secret-xx");
        let caller = Caller { id: Uuid::new_v4(), role: Role::Customer };

        let foreign = other.issue_token(caller, Duration::minutes(5)).unwrap();
        assert!(matches!(provider.resolve_caller(&foreign), Err(Error::Unauthenticated(_))));

        let expired = provider.issue_token(caller, Duration::minutes(-10)).unwrap();
        assert!(matches!(provider.resolve_caller(&expired), Err(Error::Unauthenticated(ref m)) if m == "Token expired"));

        assert!(matches!(provider.resolve_caller("not-a-jwt"), Err(Error::Unauthenticated(_))));
    }
}
