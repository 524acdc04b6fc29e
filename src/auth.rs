//! Bearer credential verification.
//!
//! Tokens are HS256 JWTs carrying at least `sub`, `email` and `exp`. Handlers that need
//! a verified caller take an [`AuthenticatedUser`] argument.

use crate::{
    domain::{Identity, IdentityVerifier},
    errors::{AppError, AuthError},
    AppState,
};
use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
}

pub struct JwtVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    pub fn new(secret: &str, issuer: Option<&str>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        if let Some(issuer) = issuer {
            validation.set_issuer(&[issuer]);
            // Without this a token that omits `iss` skips the issuer check.
            validation.set_required_spec_claims(&["exp", "iss"]);
        }
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }
}

#[async_trait]
impl IdentityVerifier for JwtVerifier {
    async fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| AuthError::Rejected(e.to_string()))?;
        if data.claims.email.is_empty() {
            return Err(AuthError::Rejected("token carries no email claim".to_string()));
        }
        Ok(Identity {
            subject: data.claims.sub,
            email: data.claims.email,
        })
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header value.
fn bearer_token(header: &str) -> Result<&str, AuthError> {
    match header.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.trim()),
        _ => Err(AuthError::MalformedCredential),
    }
}

/// A caller whose bearer credential has been verified.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub Identity);

impl AuthenticatedUser {
    /// The caller may only act on behalf of the email they were verified as.
    pub fn ensure_email(&self, requested: Option<&str>) -> Result<(), AppError> {
        match requested {
            Some(email) if email == self.0.email => Ok(()),
            _ => Err(AppError::Forbidden(format!(
                "{} may not access data for {:?}",
                self.0.email, requested
            ))),
        }
    }
}

impl FromRequestParts<Arc<AppState>> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or(AuthError::MissingCredential)?
            .to_str()
            .map_err(|_| AuthError::MalformedCredential)?;
        let token = bearer_token(header)?;

        let identity = state.verifier.verify(token).await.map_err(|e| {
            tracing::warn!(error = %e, "Rejected bearer credential");
            e
        })?;
        tracing::debug!(email = %identity.email, "Verified caller");
        Ok(AuthenticatedUser(identity))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use jsonwebtoken::{encode, EncodingKey, Header};

    pub const TEST_SECRET: &str = "histotrack-test-secret";

    pub fn mint_token(secret: &str, email: &str, ttl: Duration) -> String {
        mint_token_from(secret, email, ttl, None)
    }

    fn mint_token_from(secret: &str, email: &str, ttl: Duration, issuer: Option<&str>) -> String {
        let claims = Claims {
            sub: format!("uid-{}", email),
            email: email.to_string(),
            exp: (Utc::now() + ttl).timestamp(),
            iss: issuer.map(str::to_string),
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes())).unwrap()
    }

    #[tokio::test]
    async fn valid_token_yields_identity() {
        let verifier = JwtVerifier::new(TEST_SECRET, None);
        let token = mint_token(TEST_SECRET, "u@x.com", Duration::hours(1));
        let identity = verifier.verify(&token).await.unwrap();
        assert_eq!(identity.email, "u@x.com");
        assert_eq!(identity.subject, "uid-u@x.com");
    }

    #[tokio::test]
    async fn expired_or_foreign_tokens_are_rejected() {
        let verifier = JwtVerifier::new(TEST_SECRET, None);
        let expired = mint_token(TEST_SECRET, "u@x.com", Duration::hours(-2));
        assert!(matches!(verifier.verify(&expired).await, Err(AuthError::Rejected(_))));

        let foreign = mint_token("another-secret", "u@x.com", Duration::hours(1));
        assert!(matches!(verifier.verify(&foreign).await, Err(AuthError::Rejected(_))));
    }

    #[tokio::test]
    async fn issuer_is_enforced_when_configured() {
        let issuer = "https://id.histotrack.example";
        let verifier = JwtVerifier::new(TEST_SECRET, Some(issuer));

        let without_iss = mint_token(TEST_SECRET, "u@x.com", Duration::hours(1));
        assert!(matches!(verifier.verify(&without_iss).await, Err(AuthError::Rejected(_))));

        let other_iss = mint_token_from(TEST_SECRET, "u@x.com", Duration::hours(1), Some("https://evil.example"));
        assert!(matches!(verifier.verify(&other_iss).await, Err(AuthError::Rejected(_))));

        let matching = mint_token_from(TEST_SECRET, "u@x.com", Duration::hours(1), Some(issuer));
        assert_eq!(verifier.verify(&matching).await.unwrap().email, "u@x.com");
    }

    #[test]
    fn bearer_header_parsing() {
        assert_eq!(bearer_token("Bearer abc.def").unwrap(), "abc.def");
        assert!(matches!(bearer_token("Basic dXNlcg=="), Err(AuthError::MalformedCredential)));
        assert!(matches!(bearer_token("Bearer   "), Err(AuthError::MalformedCredential)));
    }

    #[test]
    fn email_gate() {
        let user = AuthenticatedUser(Identity {
            subject: "uid".into(),
            email: "u@x.com".into(),
        });
        assert!(user.ensure_email(Some("u@x.com")).is_ok());
        assert!(matches!(user.ensure_email(Some("v@x.com")), Err(AppError::Forbidden(_))));
        assert!(matches!(user.ensure_email(None), Err(AppError::Forbidden(_))));
    }
}
