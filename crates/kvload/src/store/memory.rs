//! In-process key-value store
//!
//! Backs `--dry-run` (validate a file and count what would be inserted
//! without touching the remote table) and the test suite. Lookups and puts
//! can be made to fail for chosen keys.

use super::{KeyValueStore, StoreError};
use crate::record::{AttributeValue, Item, PrimaryKey};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

#[derive(Default)]
struct State {
    tables: HashMap<String, HashMap<AttributeValue, Item>>,
    failing_lookups: HashSet<AttributeValue>,
    failing_puts: HashSet<AttributeValue>,
}

/// Tables held in memory, keyed by one primary-key attribute
pub struct InMemoryStore {
    key_attribute: String,
    state: Mutex<State>,
    lookups: AtomicU64,
    puts: AtomicU64,
}

impl InMemoryStore {
    pub fn new(key_attribute: impl Into<String>) -> Self {
        Self {
            key_attribute: key_attribute.into(),
            state: Mutex::new(State::default()),
            lookups: AtomicU64::new(0),
            puts: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, State>, StoreError> {
        self.state
            .lock()
            .map_err(|e| StoreError::Init(format!("in-memory store poisoned: {}", e)))
    }

    fn key_of(&self, item: &Item) -> Result<AttributeValue, StoreError> {
        item.get(&self.key_attribute).cloned().ok_or_else(|| {
            StoreError::InvalidItem(format!("missing key attribute '{}'", self.key_attribute))
        })
    }

    /// Seed an item without counting it as a put
    pub fn insert_existing(&self, table: &str, item: Item) -> Result<(), StoreError> {
        let key = self.key_of(&item)?;
        self.lock()?
            .tables
            .entry(table.to_string())
            .or_default()
            .insert(key, item);
        Ok(())
    }

    /// Make every lookup of `key` fail with a service error
    pub fn fail_lookups_for(&self, key: AttributeValue) -> Result<(), StoreError> {
        self.lock()?.failing_lookups.insert(key);
        Ok(())
    }

    /// Make every put of an item with `key` fail with a service error
    pub fn fail_puts_for(&self, key: AttributeValue) -> Result<(), StoreError> {
        self.lock()?.failing_puts.insert(key);
        Ok(())
    }

    pub fn get(&self, table: &str, key: &AttributeValue) -> Option<Item> {
        self.lock()
            .ok()?
            .tables
            .get(table)
            .and_then(|t| t.get(key))
            .cloned()
    }

    pub fn len(&self, table: &str) -> usize {
        self.lock()
            .map(|s| s.tables.get(table).map_or(0, HashMap::len))
            .unwrap_or(0)
    }

    pub fn is_empty(&self, table: &str) -> bool {
        self.len(table) == 0
    }

    /// Lookups served so far, failed ones included
    pub fn lookup_count(&self) -> u64 {
        self.lookups.load(Ordering::Relaxed)
    }

    /// Puts attempted so far, failed ones included
    pub fn put_count(&self) -> u64 {
        self.puts.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl KeyValueStore for InMemoryStore {
    async fn contains_key(&self, table: &str, key: &PrimaryKey) -> Result<bool, StoreError> {
        self.lookups.fetch_add(1, Ordering::Relaxed);
        let state = self.lock()?;

        if state.failing_lookups.contains(&key.value) {
            return Err(StoreError::service("GetItem", table, "injected lookup failure"));
        }

        Ok(state
            .tables
            .get(table)
            .is_some_and(|t| t.contains_key(&key.value)))
    }

    async fn put_item(&self, table: &str, item: &Item) -> Result<(), StoreError> {
        self.puts.fetch_add(1, Ordering::Relaxed);
        let key = self.key_of(item)?;
        let mut state = self.lock()?;

        if state.failing_puts.contains(&key) {
            return Err(StoreError::service("PutItem", table, "injected put failure"));
        }

        state
            .tables
            .entry(table.to_string())
            .or_default()
            .insert(key, item.clone());
        Ok(())
    }
}
