//! `feedback-auth`: authentication/authorization boundary.
//!
//! This crate is intentionally decoupled from HTTP and storage: it verifies
//! tokens, derives session principals and evaluates the role policy table.
//! Persisting users and resolving API keys happen in `feedback-infra`.

pub mod action;
pub mod authorize;
pub mod claims;
pub mod policy;
pub mod principal;
pub mod roles;
pub mod user;
pub mod verifier;

pub use action::Action;
pub use authorize::{authorize, AuthzError};
pub use claims::{IdentityClaims, JwtClaims, TokenValidationError, validate_claims};
pub use policy::{PolicyError, PolicyRule, PolicyTable, ResourcePattern, DEFAULT_POLICY};
pub use principal::SessionPrincipal;
pub use roles::Role;
pub use user::LocalUser;
pub use verifier::{JwtValidator, KeyError, Rs256JwtValidator, VerifyError};
