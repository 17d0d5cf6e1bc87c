//! API key registry
//!
//! Holds the user's provider credentials and answers "which providers are
//! configured right now". The router snapshots the registry at the start of
//! every route call, so a key saved in settings takes effect on the next
//! request without any restart or cache invalidation.
//!
//! Persisted as a small TOML file:
//!
//! ```toml
//! [keys]
//! gemini = "AIza..."
//! openai = "sk-..."
//! ```

use crate::error::{AppError, AppResult};
use crate::provider::ProviderId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{PoisonError, RwLock};

/// On-disk shape of the key store
#[derive(Debug, Default, Serialize, Deserialize)]
struct KeyStoreFile {
    #[serde(default)]
    keys: BTreeMap<ProviderId, String>,
}

/// Thread-safe store of per-provider API keys
///
/// Blank values are treated as "not configured" everywhere: `set` with a
/// blank key removes the entry, and `is_configured` trims before checking.
#[derive(Debug, Default)]
pub struct KeyRegistry {
    keys: RwLock<BTreeMap<ProviderId, String>>,
}

impl KeyRegistry {
    /// Empty registry: no provider configured
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry seeded with the given keys (primarily for tests)
    pub fn from_keys(keys: impl IntoIterator<Item = (ProviderId, String)>) -> Self {
        let registry = Self::new();
        for (provider, key) in keys {
            registry.set(provider, key);
        }
        registry
    }

    /// Load the registry from a TOML key store
    ///
    /// A missing file is not an error: a fresh install simply has no keys
    /// yet. Read and parse failures are reported with the path.
    pub fn load(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::new());
            }
            Err(err) => {
                return Err(AppError::KeyStoreRead {
                    path: path.display().to_string(),
                    source: err,
                });
            }
        };

        let file: KeyStoreFile =
            toml::from_str(&contents).map_err(|err| AppError::KeyStoreParse {
                path: path.display().to_string(),
                source: err,
            })?;

        let registry = Self::new();
        for (provider, key) in file.keys {
            registry.set(provider, key);
        }
        Ok(registry)
    }

    /// Write the current keys back to a TOML key store
    pub fn persist(&self, path: impl AsRef<Path>) -> AppResult<()> {
        let path = path.as_ref();
        let file = KeyStoreFile {
            keys: self.snapshot(),
        };
        let contents = toml::to_string_pretty(&file)
            .map_err(|err| AppError::Config(format!("failed to serialize key store: {err}")))?;
        std::fs::write(path, contents).map_err(|err| AppError::KeyStoreWrite {
            path: path.display().to_string(),
            source: err,
        })
    }

    /// Store a key for a provider. A blank key clears the entry.
    pub fn set(&self, provider: ProviderId, key: impl Into<String>) {
        let key = key.into();
        let mut keys = self
            .keys
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if key.trim().is_empty() {
            keys.remove(&provider);
        } else {
            keys.insert(provider, key);
        }
    }

    /// Current key for a provider, if configured
    pub fn get(&self, provider: ProviderId) -> Option<String> {
        self.keys
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&provider)
            .cloned()
    }

    /// Whether the provider has a non-blank key
    pub fn is_configured(&self, provider: ProviderId) -> bool {
        self.keys
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&provider)
            .is_some_and(|key| !key.trim().is_empty())
    }

    /// Providers that currently have a key, in `ProviderId::ALL` order
    pub fn configured(&self) -> Vec<ProviderId> {
        ProviderId::ALL
            .into_iter()
            .filter(|provider| self.is_configured(*provider))
            .collect()
    }

    /// Copy of the whole key map, taken once per route call
    pub fn snapshot(&self) -> BTreeMap<ProviderId, String> {
        self.keys
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_registry_has_no_providers() {
        let registry = KeyRegistry::new();
        assert!(registry.configured().is_empty());
        assert!(!registry.is_configured(ProviderId::Gemini));
        assert_eq!(registry.get(ProviderId::OpenAI), None);
    }

    #[test]
    fn test_set_and_get() {
        let registry = KeyRegistry::new();
        registry.set(ProviderId::Gemini, "AIza-test");
        assert_eq!(registry.get(ProviderId::Gemini).as_deref(), Some("AIza-test"));
        assert!(registry.is_configured(ProviderId::Gemini));
    }

    #[test]
    fn test_blank_key_clears_entry() {
        let registry = KeyRegistry::new();
        registry.set(ProviderId::OpenAI, "sk-test");
        registry.set(ProviderId::OpenAI, "   ");
        assert!(!registry.is_configured(ProviderId::OpenAI));
        assert_eq!(registry.get(ProviderId::OpenAI), None);
    }

    #[test]
    fn test_configured_order_follows_declaration_order() {
        let registry = KeyRegistry::from_keys([
            (ProviderId::Grok, "xai-test".to_string()),
            (ProviderId::Gemini, "AIza-test".to_string()),
        ]);
        assert_eq!(
            registry.configured(),
            vec![ProviderId::Gemini, ProviderId::Grok]
        );
    }

    #[test]
    fn test_missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let registry = KeyRegistry::load(dir.path().join("keys.toml")).unwrap();
        assert!(registry.configured().is_empty());
    }

    #[test]
    fn test_persist_then_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keys.toml");

        let registry = KeyRegistry::from_keys([
            (ProviderId::Gemini, "AIza-test".to_string()),
            (ProviderId::OpenAI, "sk-test".to_string()),
        ]);
        registry.persist(&path).unwrap();

        let loaded = KeyRegistry::load(&path).unwrap();
        assert_eq!(loaded.get(ProviderId::Gemini).as_deref(), Some("AIza-test"));
        assert_eq!(loaded.get(ProviderId::OpenAI).as_deref(), Some("sk-test"));
        assert!(!loaded.is_configured(ProviderId::Grok));
    }

    #[test]
    fn test_load_rejects_malformed_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keys.toml");
        std::fs::write(&path, "[keys\ngemini = ").unwrap();

        let err = KeyRegistry::load(&path).unwrap_err();
        assert!(matches!(err, AppError::KeyStoreParse { .. }));
        assert!(err.to_string().contains("keys.toml"));
    }

    #[test]
    fn test_snapshot_is_detached_copy() {
        let registry = KeyRegistry::from_keys([(ProviderId::Gemini, "v1".to_string())]);
        let snapshot = registry.snapshot();
        registry.set(ProviderId::Gemini, "v2");
        assert_eq!(snapshot.get(&ProviderId::Gemini).map(String::as_str), Some("v1"));
        assert_eq!(registry.get(ProviderId::Gemini).as_deref(), Some("v2"));
    }
}
