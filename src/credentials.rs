//! API key management.
//!
//! Keys come from a JSON object in `API_KEYS` (the deployment secret) and,
//! for anything still missing, from individual environment variables.
//! Construction fails fast when a required key is absent from both.

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;
use zeroize::Zeroizing;

pub const ENV_API_KEYS: &str = "API_KEYS";
pub const GROQ_API_KEY: &str = "GROQ_API_KEY";
pub const GOOGLE_API_KEY: &str = "GOOGLE_API_KEY";

/// Keys that must be present before any model is loaded.
pub const REQUIRED_KEYS: &[&str] = &[GROQ_API_KEY, GOOGLE_API_KEY];

/// Characters shown when logging a key.
const MASK_PREFIX_LEN: usize = 6;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CredentialError {
    #[error("Missing API keys: {}", missing.join(", "))]
    MissingCredential { missing: Vec<String> },

    #[error("API key '{0}' is not loaded")]
    UnknownKey(String),
}

/// Loaded API keys. Values are zeroed on drop and never printed.
pub struct ApiKeyManager {
    keys: BTreeMap<String, Zeroizing<String>>,
}

impl fmt::Debug for ApiKeyManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKeyManager")
            .field("keys", &self.keys.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ApiKeyManager {
    /// Load keys from the process environment.
    pub fn from_env() -> Result<Self, CredentialError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load keys through an injected variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, CredentialError> {
        Self::with_required(lookup, REQUIRED_KEYS)
    }

    /// Load keys, checking a custom set of required names.
    pub fn with_required(
        lookup: impl Fn(&str) -> Option<String>,
        required: &[&str],
    ) -> Result<Self, CredentialError> {
        let mut keys: BTreeMap<String, Zeroizing<String>> = BTreeMap::new();

        if let Some(raw) = lookup(ENV_API_KEYS).filter(|r| !r.trim().is_empty()) {
            match parse_secret_blob(&raw) {
                Ok(parsed) => {
                    keys.extend(parsed);
                    tracing::info!("API keys loaded from {ENV_API_KEYS} secret");
                }
                Err(reason) => {
                    tracing::warn!(error = %reason, "Failed to parse {ENV_API_KEYS}");
                }
            }
        }

        for &name in required {
            if keys.contains_key(name) {
                continue;
            }
            if let Some(value) = lookup(name).filter(|v| !v.is_empty()) {
                keys.insert(name.to_string(), Zeroizing::new(value));
                tracing::info!(key = name, "API key loaded from environment variable");
            }
        }

        let missing: Vec<String> = required
            .iter()
            .filter(|name| !keys.contains_key(**name))
            .map(|name| name.to_string())
            .collect();
        if !missing.is_empty() {
            tracing::error!(missing_keys = ?missing, "Missing required API keys");
            return Err(CredentialError::MissingCredential { missing });
        }

        let manager = Self { keys };
        tracing::info!(keys = ?manager.masked(), "API keys successfully loaded");
        Ok(manager)
    }

    /// Retrieve a key by name.
    pub fn get(&self, name: &str) -> Result<&str, CredentialError> {
        self.keys
            .get(name)
            .map(|v| v.as_str())
            .ok_or_else(|| CredentialError::UnknownKey(name.to_string()))
    }

    /// Key names mapped to their masked values.
    pub fn masked(&self) -> BTreeMap<&str, String> {
        self.keys
            .iter()
            .map(|(k, v)| (k.as_str(), mask(v)))
            .collect()
    }
}

fn mask(value: &str) -> String {
    let prefix: String = value.chars().take(MASK_PREFIX_LEN).collect();
    format!("{prefix}...")
}

/// Parse the `API_KEYS` blob. Only string values are kept.
fn parse_secret_blob(raw: &str) -> Result<BTreeMap<String, Zeroizing<String>>, String> {
    let value: serde_json::Value = serde_json::from_str(raw).map_err(|e| e.to_string())?;
    let object = value
        .as_object()
        .ok_or_else(|| format!("{ENV_API_KEYS} must be a JSON object"))?;

    Ok(object
        .iter()
        .filter_map(|(k, v)| {
            v.as_str()
                .map(|s| (k.clone(), Zeroizing::new(s.to_string())))
        })
        .collect())
}
