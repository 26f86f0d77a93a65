//! Bearer token verification (RS256).
//!
//! The verifier is a pure function of `(token, key, now)`. It never touches
//! storage; identity synchronization happens after a token is accepted.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header};
use thiserror::Error;

use crate::claims::{IdentityClaims, JwtClaims, TokenValidationError, validate_claims};

/// Why a token was rejected.
///
/// Every variant maps to 401 at the HTTP boundary; the distinction is for
/// logs only and is never shown to the caller.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VerifyError {
    #[error("malformed token")]
    Malformed,

    #[error("invalid token signature")]
    InvalidSignature,

    #[error("token has expired")]
    Expired,

    #[error("token not yet valid")]
    NotYetValid,
}

impl From<TokenValidationError> for VerifyError {
    fn from(value: TokenValidationError) -> Self {
        match value {
            TokenValidationError::Expired => VerifyError::Expired,
            TokenValidationError::NotYetValid => VerifyError::NotYetValid,
            TokenValidationError::InvalidTimeWindow => VerifyError::Malformed,
        }
    }
}

#[derive(Debug, Error)]
#[error("invalid RSA public key: {0}")]
pub struct KeyError(#[from] jsonwebtoken::errors::Error);

/// Token validation seam used by the HTTP layer.
pub trait JwtValidator: Send + Sync {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<IdentityClaims, VerifyError>;
}

/// RS256 validator backed by a single RSA public key.
pub struct Rs256JwtValidator {
    key: DecodingKey,
    issuer: Option<String>,
    audience: Option<String>,
}

impl Rs256JwtValidator {
    /// Build a validator from a PEM encoded RSA public key (PKCS#1 or SPKI).
    pub fn from_rsa_pem(pem: &[u8]) -> Result<Self, KeyError> {
        Ok(Self {
            key: DecodingKey::from_rsa_pem(pem)?,
            issuer: None,
            audience: None,
        })
    }

    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = Some(audience.into());
        self
    }

    fn signature_validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::RS256);
        // Time window is checked by `validate_claims` against the injected clock.
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.required_spec_claims = HashSet::new();
        match &self.audience {
            Some(aud) => validation.set_audience(&[aud]),
            None => validation.validate_aud = false,
        }
        if let Some(iss) = &self.issuer {
            validation.set_issuer(&[iss]);
        }
        validation
    }
}

fn unverified_validation() -> Validation {
    let mut validation = Validation::new(Algorithm::RS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.validate_aud = false;
    validation.required_spec_claims = HashSet::new();
    validation
}

fn map_jwt_error(err: jsonwebtoken::errors::Error) -> VerifyError {
    match err.kind() {
        ErrorKind::InvalidSignature => VerifyError::InvalidSignature,
        ErrorKind::ExpiredSignature => VerifyError::Expired,
        ErrorKind::ImmatureSignature => VerifyError::NotYetValid,
        _ => VerifyError::Malformed,
    }
}

impl JwtValidator for Rs256JwtValidator {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<IdentityClaims, VerifyError> {
        if token.split('.').count() != 3 {
            return Err(VerifyError::Malformed);
        }

        let header = decode_header(token).map_err(|_| VerifyError::Malformed)?;
        if header.alg != Algorithm::RS256 {
            return Err(VerifyError::Malformed);
        }

        // Read the time window before checking the signature so that an
        // expired token reports `Expired` whatever key signed it.
        let unverified = decode::<JwtClaims>(token, &DecodingKey::from_secret(&[]), &unverified_validation())
            .map_err(|_| VerifyError::Malformed)?;
        validate_claims(&unverified.claims, now)?;

        let verified = decode::<JwtClaims>(token, &self.key, &self.signature_validation())
            .map_err(map_jwt_error)?;

        Ok(verified.claims.into_identity())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use feedback_core::UserId;
    use jsonwebtoken::{EncodingKey, Header, encode};

    const PRIVATE_KEY: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/../../testdata/signing_key.pem"));
    const PUBLIC_KEY: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/../../testdata/signing_key.pub.pem"));
    const OTHER_PRIVATE_KEY: &str =
        include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/../../testdata/other_signing_key.pem"));

    fn validator() -> Rs256JwtValidator {
        Rs256JwtValidator::from_rsa_pem(PUBLIC_KEY.as_bytes()).unwrap()
    }

    fn claims(exp: DateTime<Utc>) -> JwtClaims {
        JwtClaims {
            sub: UserId::new(),
            email: "ada@example.com".into(),
            name: "Ada".into(),
            exp,
            nbf: None,
            iat: None,
            iss: None,
        }
    }

    fn sign(claims: &JwtClaims, private_pem: &str) -> String {
        encode(
            &Header::new(Algorithm::RS256),
            claims,
            &EncodingKey::from_rsa_pem(private_pem.as_bytes()).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn valid_token_yields_payload_claims() {
        let now = Utc::now();
        let c = claims(now + Duration::minutes(10));
        let token = sign(&c, PRIVATE_KEY);

        let identity = validator().validate(&token, now).unwrap();
        assert_eq!(identity.subject, c.sub);
        assert_eq!(identity.email, "ada@example.com");
        assert_eq!(identity.name, "Ada");
    }

    #[test]
    fn foreign_key_is_invalid_signature() {
        let now = Utc::now();
        let token = sign(&claims(now + Duration::minutes(10)), OTHER_PRIVATE_KEY);
        assert_eq!(validator().validate(&token, now), Err(VerifyError::InvalidSignature));
    }

    #[test]
    fn expired_regardless_of_signer() {
        let now = Utc::now();
        let c = claims(now - Duration::seconds(1));
        assert_eq!(validator().validate(&sign(&c, PRIVATE_KEY), now), Err(VerifyError::Expired));
        assert_eq!(validator().validate(&sign(&c, OTHER_PRIVATE_KEY), now), Err(VerifyError::Expired));
    }

    #[test]
    fn not_before_is_enforced() {
        let now = Utc::now();
        let mut c = claims(now + Duration::minutes(10));
        c.nbf = Some(now + Duration::minutes(1));
        assert_eq!(validator().validate(&sign(&c, PRIVATE_KEY), now), Err(VerifyError::NotYetValid));
    }

    #[test]
    fn structural_garbage_is_malformed() {
        let now = Utc::now();
        let v = validator();
        assert_eq!(v.validate("not-a-token", now), Err(VerifyError::Malformed));
        assert_eq!(v.validate("a.b.c", now), Err(VerifyError::Malformed));
        assert_eq!(v.validate("", now), Err(VerifyError::Malformed));
    }

    #[test]
    fn symmetric_algorithms_are_refused() {
        let now = Utc::now();
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims(now + Duration::minutes(10)),
            &EncodingKey::from_secret(b"secret"),
        )
        .unwrap();
        assert_eq!(validator().validate(&token, now), Err(VerifyError::Malformed));
    }

    #[test]
    fn issuer_mismatch_is_rejected() {
        let now = Utc::now();
        let mut c = claims(now + Duration::minutes(10));
        c.iss = Some("someone-else".into());
        let v = validator().with_issuer("https://auth.example.com");
        assert_eq!(v.validate(&sign(&c, PRIVATE_KEY), now), Err(VerifyError::Malformed));

        c.iss = Some("https://auth.example.com".into());
        assert!(v.validate(&sign(&c, PRIVATE_KEY), now).is_ok());
    }
}
