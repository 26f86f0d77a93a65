use base64::Engine;
use base64::engine::general_purpose::URL_SAFE;
use rand::RngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const KEY_BYTES: usize = 32;

#[derive(Debug, Error)]
#[error("failed to read from the OS random source: {0}")]
pub struct ApiKeyError(#[from] rand::Error);

/// Opaque tenant credential.
///
/// `Debug` is redacted so keys never end up in logs by accident.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApiKey(String);

impl ApiKey {
    /// 32 bytes from the OS RNG, URL-safe base64 encoded.
    pub fn generate() -> Result<Self, ApiKeyError> {
        let mut buf = [0u8; KEY_BYTES];
        OsRng.try_fill_bytes(&mut buf)?;
        Ok(Self(URL_SAFE.encode(buf)))
    }

    pub fn from_string(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl core::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("ApiKey(***)")
    }
}
