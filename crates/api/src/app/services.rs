use std::sync::Arc;

use thiserror::Error;

use feedback_auth::{JwtValidator, KeyError, PolicyError, PolicyTable, Rs256JwtValidator};
use feedback_infra::{ApplicationStore, FeedbackStore, InMemoryStore, PostgresStore, StoreError, UserStore};

use crate::config::{ApiConfig, Persistence};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid JWT public key: {0}")]
    Key(#[from] KeyError),

    #[error("invalid access policy: {0}")]
    Policy(#[from] PolicyError),

    #[error("failed to read policy file {path}: {source}")]
    PolicyFile {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to connect to the database: {0}")]
    Store(#[from] StoreError),
}

/// Everything the handlers and gates share. Built once at startup, read-only after.
pub struct AppServices {
    pub users: Arc<dyn UserStore>,
    pub applications: Arc<dyn ApplicationStore>,
    pub feedback: Arc<dyn FeedbackStore>,
    pub verifier: Arc<dyn JwtValidator>,
    pub policy: Arc<PolicyTable>,
}

impl AppServices {
    /// All three stores backed by one in-process store.
    pub fn in_memory(verifier: Arc<dyn JwtValidator>, policy: PolicyTable) -> Self {
        Self::with_store(Arc::new(InMemoryStore::new()), verifier, policy)
    }

    pub fn with_store<S>(store: Arc<S>, verifier: Arc<dyn JwtValidator>, policy: PolicyTable) -> Self
    where
        S: UserStore + ApplicationStore + FeedbackStore + 'static,
    {
        Self {
            users: store.clone(),
            applications: store.clone(),
            feedback: store,
            verifier,
            policy: Arc::new(policy),
        }
    }

    pub async fn from_config(config: &ApiConfig) -> Result<Self, StartupError> {
        let mut validator = Rs256JwtValidator::from_rsa_pem(config.jwt_public_key.as_bytes())?;
        if let Some(issuer) = &config.jwt_issuer {
            validator = validator.with_issuer(issuer.clone());
        }
        if let Some(audience) = &config.jwt_audience {
            validator = validator.with_audience(audience.clone());
        }
        let verifier: Arc<dyn JwtValidator> = Arc::new(validator);

        let policy = match &config.policy_path {
            Some(path) => {
                let source = std::fs::read_to_string(path).map_err(|source| StartupError::PolicyFile {
                    path: path.clone(),
                    source,
                })?;
                PolicyTable::parse(&source)?
            }
            None => PolicyTable::embedded()?,
        };
        tracing::info!(rules = policy.rules().len(), "access policy loaded");

        Ok(match &config.persistence {
            Persistence::InMemory => {
                tracing::warn!("using in-memory stores; data is lost on restart");
                Self::in_memory(verifier, policy)
            }
            Persistence::Postgres { url, max_connections } => {
                let store = PostgresStore::connect(url, *max_connections).await?;
                tracing::info!(max_connections, "connected to postgres");
                Self::with_store(Arc::new(store), verifier, policy)
            }
        })
    }
}
