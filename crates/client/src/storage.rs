//! Persistent key-value store with a namespace prefix and optional expiry.
//!
//! One JSON file per entry under the configured data directory, filename
//! `{prefix}{key}.json`. Expiry is lazy: there is no background sweep, an
//! expired entry is purged by the read that discovers it.
//!
//! This component never propagates failures. Serialization errors, missing
//! directories, and quota/permission problems are logged and degrade to a
//! `false`/`None`/empty result; session and cart correctness must not depend
//! on local persistence succeeding.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::warn;

/// A single persisted entry.
#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct Entry {
    value: serde_json::Value,
    stored_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expires_at: Option<DateTime<Utc>>,
}

/// Namespaced file-backed key-value store.
///
/// Cheaply cloneable; clones share the same directory and prefix.
#[derive(Debug, Clone)]
pub struct KvStore {
    inner: Arc<KvStoreInner>,
}

#[derive(Debug)]
struct KvStoreInner {
    dir: PathBuf,
    prefix: String,
}

impl KvStore {
    /// Open a store rooted at `dir` with the given namespace prefix.
    ///
    /// The directory is created if missing; failure to create it is logged
    /// and every subsequent operation degrades to a miss.
    #[must_use]
    pub fn open(dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        let dir = dir.into();
        if let Err(e) = fs::create_dir_all(&dir) {
            warn!(dir = %dir.display(), error = %e, "failed to create storage directory");
        }
        Self {
            inner: Arc::new(KvStoreInner {
                dir,
                prefix: prefix.into(),
            }),
        }
    }

    /// Store a value under `key`, optionally expiring after `expiry_days`.
    ///
    /// `expiry_days = Some(0)` produces an entry that is already expired.
    /// Returns `false` (after logging) if the value cannot be serialized or
    /// written.
    pub fn set<T: Serialize>(&self, key: &str, value: &T, expiry_days: Option<i64>) -> bool {
        let value = match serde_json::to_value(value) {
            Ok(v) => v,
            Err(e) => {
                warn!(key, error = %e, "storage set: serialization failed");
                return false;
            }
        };

        let now = Utc::now();
        let entry = Entry {
            value,
            stored_at: now,
            expires_at: expiry_days.map(|days| now + Duration::days(days)),
        };

        let json = match serde_json::to_vec(&entry) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(key, error = %e, "storage set: entry encoding failed");
                return false;
            }
        };

        match fs::write(self.path_for(key), json) {
            Ok(()) => true,
            Err(e) => {
                warn!(key, error = %e, "storage set: write failed");
                false
            }
        }
    }

    /// Read a value, treating an expired entry as absent and purging it.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let entry = self.read_live_entry(key)?;
        match serde_json::from_value(entry.value) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key, error = %e, "storage get: value has unexpected shape");
                None
            }
        }
    }

    /// Remove a single entry. Missing entries are not an error.
    pub fn remove(&self, key: &str) {
        let path = self.path_for(key);
        if let Err(e) = fs::remove_file(&path)
            && e.kind() != std::io::ErrorKind::NotFound
        {
            warn!(key, error = %e, "storage remove failed");
        }
    }

    /// Remove every entry under this store's namespace prefix.
    ///
    /// Entries written by other namespaces in the same directory are left
    /// alone.
    pub fn clear(&self) {
        for key in self.keys() {
            self.remove(&key);
        }
    }

    /// List the unprefixed keys currently present (live or expired).
    ///
    /// Keys are derived from filenames, so exotic characters in keys come
    /// back in sanitized form. All keys the SDK itself uses are plain
    /// identifiers for which sanitization is the identity.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        let entries = match fs::read_dir(&self.inner.dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(error = %e, "storage keys: cannot read directory");
                return Vec::new();
            }
        };

        entries
            .filter_map(std::result::Result::ok)
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter_map(|name| {
                name.strip_prefix(&self.inner.prefix)
                    .and_then(|rest| rest.strip_suffix(".json"))
                    .map(ToOwned::to_owned)
            })
            .collect()
    }

    /// Whether a live (non-expired) entry exists. Purges an expired one.
    pub fn has(&self, key: &str) -> bool {
        self.read_live_entry(key).is_some()
    }

    /// Number of entries under this namespace.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys().len()
    }

    /// Whether the namespace holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys().is_empty()
    }

    /// Read an entry, purging and reporting absence if it has expired.
    fn read_live_entry(&self, key: &str) -> Option<Entry> {
        let path = self.path_for(key);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!(key, error = %e, "storage get: read failed");
                }
                return None;
            }
        };

        let entry: Entry = match serde_json::from_slice(&bytes) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(key, error = %e, "storage get: corrupt entry, purging");
                self.remove(key);
                return None;
            }
        };

        if let Some(expires_at) = entry.expires_at
            && Utc::now() >= expires_at
        {
            self.remove(key);
            return None;
        }

        Some(entry)
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let sanitized: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        Path::new(&self.inner.dir).join(format!("{}{sanitized}.json", self.inner.prefix))
    }
}
