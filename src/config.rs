//! Environment configuration for the bundled collaborator implementations.

use std::path::PathBuf;

const DEFAULT_STORAGE_PATH: &str = ".parishboard/auth.json";

/// REST identity backend configuration loaded from environment.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub base_url: String,
    pub api_key: String,
}

impl BackendConfig {
    /// Load from `PARISHBOARD_BACKEND_URL` and `PARISHBOARD_BACKEND_KEY`.
    /// Returns `None` if either is missing (the REST backend is disabled).
    #[must_use]
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Lookup-injected constructor so tests avoid mutating process env.
    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let base_url = lookup("PARISHBOARD_BACKEND_URL")?;
        let api_key = lookup("PARISHBOARD_BACKEND_KEY")?;
        Some(Self {
            base_url: base_url.trim_end_matches('/').to_owned(),
            api_key,
        })
    }
}

/// Durable storage configuration. Always resolves: a missing variable
/// falls back to the default namespaced path.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub path: PathBuf,
}

impl StorageConfig {
    /// Load from `PARISHBOARD_STORAGE_PATH`, defaulting to
    /// `.parishboard/auth.json`.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let path = lookup("PARISHBOARD_STORAGE_PATH")
            .map_or_else(|| PathBuf::from(DEFAULT_STORAGE_PATH), PathBuf::from);
        Self { path }
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
