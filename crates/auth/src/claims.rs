use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use feedback_core::UserId;

/// JWT claims model (wire format).
///
/// Timestamps use the registered numeric-date encoding (seconds since the
/// epoch). The subject must be a UUID; it doubles as the local user id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject / user identifier.
    pub sub: UserId,

    #[serde(default)]
    pub email: String,

    #[serde(default)]
    pub name: String,

    /// Expiration timestamp.
    #[serde(with = "chrono::serde::ts_seconds")]
    pub exp: DateTime<Utc>,

    /// Not-before timestamp.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "chrono::serde::ts_seconds_option"
    )]
    pub nbf: Option<DateTime<Utc>>,

    /// Issued-at timestamp.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "chrono::serde::ts_seconds_option"
    )]
    pub iat: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
}

impl JwtClaims {
    pub fn into_identity(self) -> IdentityClaims {
        IdentityClaims {
            subject: self.sub,
            email: self.email,
            name: self.name,
        }
    }
}

/// Identity extracted from a verified token. Immutable for a request's lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityClaims {
    pub subject: UserId,
    pub email: String,
    pub name: String,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (nbf is in the future)")]
    NotYetValid,

    #[error("invalid token time window (exp <= iat)")]
    InvalidTimeWindow,
}

/// Deterministically validate the time window of JWT claims.
///
/// Expiry is checked first: a token past `exp` is `Expired` no matter what
/// else is wrong with it. Signature verification happens elsewhere.
pub fn validate_claims(claims: &JwtClaims, now: DateTime<Utc>) -> Result<(), TokenValidationError> {
    if now >= claims.exp {
        return Err(TokenValidationError::Expired);
    }
    if let Some(iat) = claims.iat {
        if claims.exp <= iat {
            return Err(TokenValidationError::InvalidTimeWindow);
        }
    }
    if let Some(nbf) = claims.nbf {
        if now < nbf {
            return Err(TokenValidationError::NotYetValid);
        }
    }
    Ok(())
}
