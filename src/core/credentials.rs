//! Provider API keys.
//!
//! Keys are only checked for shape here. Whether a key is actually accepted
//! is discovered by the first request that comes back with a 401.

use crate::core::catalog::Provider;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

/// Minimum trimmed length (exclusive) for a key to count as usable.
const MIN_KEY_LEN: usize = 8;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, String>", into = "BTreeMap<String, String>")]
pub struct CredentialStore {
    keys: BTreeMap<Provider, String>,
}

impl CredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a key. An empty or whitespace-only value removes the entry.
    pub fn set(&mut self, provider: Provider, value: impl Into<String>) {
        let value = value.into();
        if value.trim().is_empty() {
            self.keys.remove(&provider);
        } else {
            self.keys.insert(provider, value);
        }
    }

    pub fn get(&self, provider: Provider) -> Option<&str> {
        self.keys.get(&provider).map(String::as_str)
    }

    /// The trimmed key, but only when it passes the usability check.
    pub fn usable_key(&self, provider: Provider) -> Option<&str> {
        self.get(provider)
            .map(str::trim)
            .filter(|key| key.len() > MIN_KEY_LEN)
    }

    pub fn is_usable(&self, provider: Provider) -> bool {
        self.usable_key(provider).is_some()
    }

    /// Usable providers in declaration order.
    pub fn usable_providers(&self) -> Vec<Provider> {
        Provider::ALL
            .into_iter()
            .filter(|provider| self.is_usable(*provider))
            .collect()
    }
}

impl From<BTreeMap<String, String>> for CredentialStore {
    fn from(raw: BTreeMap<String, String>) -> Self {
        let mut store = CredentialStore::new();
        for (id, value) in raw {
            match Provider::from_id(&id) {
                Some(provider) => store.set(provider, value),
                None => warn!(provider = %id, "ignoring stored key for unknown provider"),
            }
        }
        store
    }
}

impl From<CredentialStore> for BTreeMap<String, String> {
    fn from(store: CredentialStore) -> Self {
        store
            .keys
            .into_iter()
            .map(|(provider, value)| (provider.id().to_string(), value))
            .collect()
    }
}
