//! Offline object cache backed by an embedded [`redb`] database.
//!
//! Holds the last known good copy of catalog and account data so screens can
//! render without connectivity. Every operation is fail-soft: an unopenable
//! or corrupt database degrades to cache misses, never to errors surfaced at
//! the call site. Service code decides freshness; the cache only stores and
//! returns what it was given.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use redb::{Database, ReadableTable, TableDefinition, TableError};
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::warn;

const MEALS_TABLE: TableDefinition<'static, &'static str, &'static [u8]> =
    TableDefinition::new("meals");
const MENUS_TABLE: TableDefinition<'static, &'static str, &'static [u8]> =
    TableDefinition::new("menus");
const ORDERS_TABLE: TableDefinition<'static, &'static str, &'static [u8]> =
    TableDefinition::new("orders");
const USER_TABLE: TableDefinition<'static, &'static str, &'static [u8]> =
    TableDefinition::new("user");

/// The four cache partitions. Each maps to its own table so clearing one
/// cannot touch another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Partition {
    Meals,
    Menus,
    Orders,
    User,
}

impl Partition {
    const ALL: [Self; 4] = [Self::Meals, Self::Menus, Self::Orders, Self::User];

    const fn table(self) -> TableDefinition<'static, &'static str, &'static [u8]> {
        match self {
            Self::Meals => MEALS_TABLE,
            Self::Menus => MENUS_TABLE,
            Self::Orders => ORDERS_TABLE,
            Self::User => USER_TABLE,
        }
    }
}

#[derive(Debug, Error)]
enum CacheError {
    #[error(transparent)]
    Database(#[from] redb::DatabaseError),
    #[error(transparent)]
    Transaction(#[from] redb::TransactionError),
    #[error(transparent)]
    Table(#[from] redb::TableError),
    #[error(transparent)]
    Storage(#[from] redb::StorageError),
    #[error(transparent)]
    Commit(#[from] redb::CommitError),
    #[error(transparent)]
    Serde(#[from] serde_json::Error),
    #[error("record has no string `id` field")]
    MissingId,
}

/// Cheaply cloneable handle to the offline cache.
///
/// The database file is opened lazily on first use, so constructing the
/// cache never touches the filesystem.
#[derive(Clone)]
pub struct OfflineCache {
    inner: Arc<CacheInner>,
}

struct CacheInner {
    path: PathBuf,
    db: Mutex<DbSlot>,
}

enum DbSlot {
    Unopened,
    Open(Arc<Database>),
    /// A previous open attempt failed; stay degraded instead of retrying
    /// on every call.
    Broken,
}

impl OfflineCache {
    /// Create a cache that will store its database at `path`.
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                path,
                db: Mutex::new(DbSlot::Unopened),
            }),
        }
    }

    /// Store a batch of records, keyed by each record's `id` field.
    /// Records without a string `id` are skipped.
    pub fn put_many<T: Serialize>(&self, partition: Partition, items: &[T]) {
        self.fail_soft("put_many", |db| {
            let txn = db.begin_write()?;
            {
                let mut table = txn.open_table(partition.table())?;
                for item in items {
                    let value = serde_json::to_value(item)?;
                    let Some(id) = value.get("id").and_then(serde_json::Value::as_str) else {
                        warn!(partition = ?partition, "skipping cache record with no id");
                        continue;
                    };
                    let bytes = serde_json::to_vec(&value)?;
                    table.insert(id, bytes.as_slice())?;
                }
            }
            txn.commit()?;
            Ok(())
        });
    }

    /// Store a single record, keyed by its `id` field.
    pub fn put_entity<T: Serialize>(&self, partition: Partition, item: &T) {
        self.fail_soft("put_entity", |db| {
            let value = serde_json::to_value(item)?;
            let id = value
                .get("id")
                .and_then(serde_json::Value::as_str)
                .ok_or(CacheError::MissingId)?;
            let bytes = serde_json::to_vec(&value)?;

            let txn = db.begin_write()?;
            {
                let mut table = txn.open_table(partition.table())?;
                table.insert(id, bytes.as_slice())?;
            }
            txn.commit()?;
            Ok(())
        });
    }

    /// Store a value under an explicit key, for data with no natural id
    /// (the current menu, the signed-in profile).
    pub fn put_keyed<T: Serialize>(&self, partition: Partition, key: &str, value: &T) {
        self.fail_soft("put_keyed", |db| {
            let bytes = serde_json::to_vec(value)?;
            let txn = db.begin_write()?;
            {
                let mut table = txn.open_table(partition.table())?;
                table.insert(key, bytes.as_slice())?;
            }
            txn.commit()?;
            Ok(())
        });
    }

    /// Fetch one record. `None` on miss, decode failure, or a degraded cache.
    #[must_use]
    pub fn get<T: DeserializeOwned>(&self, partition: Partition, key: &str) -> Option<T> {
        self.fail_soft("get", |db| {
            let txn = db.begin_read()?;
            let table = match txn.open_table(partition.table()) {
                Ok(table) => table,
                Err(TableError::TableDoesNotExist(_)) => return Ok(None),
                Err(e) => return Err(e.into()),
            };
            match table.get(key)? {
                Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
                None => Ok(None),
            }
        })
        .flatten()
    }

    /// Fetch every record in a partition. Records that fail to decode are
    /// dropped rather than poisoning the whole read.
    #[must_use]
    pub fn get_all<T: DeserializeOwned>(&self, partition: Partition) -> Vec<T> {
        self.fail_soft("get_all", |db| {
            let txn = db.begin_read()?;
            let table = match txn.open_table(partition.table()) {
                Ok(table) => table,
                Err(TableError::TableDoesNotExist(_)) => return Ok(Vec::new()),
                Err(e) => return Err(e.into()),
            };
            let mut out = Vec::new();
            for entry in table.iter()? {
                let (_, value) = entry?;
                match serde_json::from_slice(value.value()) {
                    Ok(item) => out.push(item),
                    Err(e) => warn!(partition = ?partition, error = %e, "dropping undecodable cache record"),
                }
            }
            Ok(out)
        })
        .unwrap_or_default()
    }

    /// Whether a record exists under `key`.
    #[must_use]
    pub fn has(&self, partition: Partition, key: &str) -> bool {
        self.fail_soft("has", |db| {
            let txn = db.begin_read()?;
            let table = match txn.open_table(partition.table()) {
                Ok(table) => table,
                Err(TableError::TableDoesNotExist(_)) => return Ok(false),
                Err(e) => return Err(e.into()),
            };
            Ok(table.get(key)?.is_some())
        })
        .unwrap_or(false)
    }

    /// Remove one record. Removing a missing key is not an error.
    pub fn delete(&self, partition: Partition, key: &str) {
        self.fail_soft("delete", |db| {
            let txn = db.begin_write()?;
            {
                let mut table = txn.open_table(partition.table())?;
                table.remove(key)?;
            }
            txn.commit()?;
            Ok(())
        });
    }

    /// Drop every record in one partition; the others are untouched.
    pub fn clear(&self, partition: Partition) {
        self.fail_soft("clear", |db| {
            let txn = db.begin_write()?;
            txn.delete_table(partition.table())?;
            txn.commit()?;
            Ok(())
        });
    }

    /// Drop every record in every partition. Used on logout.
    pub fn clear_all(&self) {
        self.fail_soft("clear_all", |db| {
            let txn = db.begin_write()?;
            for partition in Partition::ALL {
                txn.delete_table(partition.table())?;
            }
            txn.commit()?;
            Ok(())
        });
    }

    fn fail_soft<T>(
        &self,
        op: &'static str,
        body: impl FnOnce(&Database) -> Result<T, CacheError>,
    ) -> Option<T> {
        let db = self.open()?;
        match body(&db) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(op, error = %e, "offline cache operation failed");
                None
            }
        }
    }

    fn open(&self) -> Option<Arc<Database>> {
        let mut slot = match self.inner.db.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        match &*slot {
            DbSlot::Open(db) => Some(Arc::clone(db)),
            DbSlot::Broken => None,
            DbSlot::Unopened => {
                if let Some(parent) = self.inner.path.parent()
                    && let Err(e) = std::fs::create_dir_all(parent)
                {
                    warn!(error = %e, "could not create cache directory");
                }
                match Database::create(&self.inner.path) {
                    Ok(db) => {
                        let db = Arc::new(db);
                        *slot = DbSlot::Open(Arc::clone(&db));
                        Some(db)
                    }
                    Err(e) => {
                        warn!(error = %e, path = %self.inner.path.display(), "could not open offline cache");
                        *slot = DbSlot::Broken;
                        None
                    }
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Record {
        id: String,
        name: String,
    }

    fn temp_cache() -> OfflineCache {
        let path = std::env::temp_dir()
            .join(format!("prepbox-cache-{}", uuid::Uuid::new_v4()))
            .join("cache.redb");
        OfflineCache::new(path)
    }

    #[test]
    fn test_put_many_then_get_all() {
        let cache = temp_cache();
        let records = vec![
            Record {
                id: "a".into(),
                name: "Couscous".into(),
            },
            Record {
                id: "b".into(),
                name: "Ojja".into(),
            },
        ];
        cache.put_many(Partition::Meals, &records);

        let mut all: Vec<Record> = cache.get_all(Partition::Meals);
        all.sort_by(|x, y| x.id.cmp(&y.id));
        assert_eq!(all, records);
    }

    #[test]
    fn test_put_entity_keys_by_id() {
        let cache = temp_cache();
        let record = Record {
            id: "m1".into(),
            name: "Lablabi".into(),
        };
        cache.put_entity(Partition::Orders, &record);

        let fetched: Option<Record> = cache.get(Partition::Orders, "m1");
        assert_eq!(fetched, Some(record));
        assert!(cache.has(Partition::Orders, "m1"));
    }

    #[test]
    fn test_put_keyed_for_singletons() {
        let cache = temp_cache();
        cache.put_keyed(Partition::User, "profile", &serde_json::json!({"email": "a@b.tn"}));
        let value: Option<serde_json::Value> = cache.get(Partition::User, "profile");
        assert_eq!(value.unwrap()["email"], "a@b.tn");
    }

    #[test]
    fn test_clear_is_partition_scoped() {
        let cache = temp_cache();
        cache.put_keyed(Partition::Meals, "k", &1u32);
        cache.put_keyed(Partition::Menus, "k", &2u32);

        cache.clear(Partition::Meals);

        assert!(!cache.has(Partition::Meals, "k"));
        assert_eq!(cache.get::<u32>(Partition::Menus, "k"), Some(2));
    }

    #[test]
    fn test_clear_all_empties_every_partition() {
        let cache = temp_cache();
        for partition in Partition::ALL {
            cache.put_keyed(partition, "k", &true);
        }
        cache.clear_all();
        for partition in Partition::ALL {
            assert!(!cache.has(partition, "k"));
        }
    }

    #[test]
    fn test_get_on_empty_partition_is_none() {
        let cache = temp_cache();
        assert_eq!(cache.get::<Record>(Partition::Meals, "nope"), None);
        assert!(cache.get_all::<Record>(Partition::Menus).is_empty());
    }

    #[test]
    fn test_unwritable_path_degrades_to_misses() {
        let cache = OfflineCache::new(PathBuf::from("/dev/null/nope/cache.redb"));
        cache.put_keyed(Partition::User, "k", &1u32);
        assert_eq!(cache.get::<u32>(Partition::User, "k"), None);
    }

    #[test]
    fn test_delete_single_record() {
        let cache = temp_cache();
        cache.put_keyed(Partition::Orders, "o1", &"x");
        cache.put_keyed(Partition::Orders, "o2", &"y");

        cache.delete(Partition::Orders, "o1");

        assert!(!cache.has(Partition::Orders, "o1"));
        assert!(cache.has(Partition::Orders, "o2"));
    }
}
