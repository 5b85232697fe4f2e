//! Target store abstraction
//!
//! The loader needs exactly two calls from the key-value service: a point
//! lookup that projects only the key attribute, and an unconditional put.
//! Retries belong to the client behind this trait, never to the loader.

pub mod dynamodb;
pub mod memory;

use crate::record::{Item, PrimaryKey};
use async_trait::async_trait;
use thiserror::Error;

pub use dynamodb::{DynamoConfig, DynamoStore};
pub use memory::InMemoryStore;

/// Errors surfaced by a store implementation
#[derive(Error, Debug)]
pub enum StoreError {
    /// Transport or service failure after the client's own retries
    #[error("{operation} on table '{table}' failed: {message}")]
    Service {
        operation: &'static str,
        table: String,
        message: String,
    },

    /// Item rejected before it reached the service
    #[error("item rejected: {0}")]
    InvalidItem(String),

    #[error("store client initialization failed: {0}")]
    Init(String),
}

impl StoreError {
    pub fn service(
        operation: &'static str,
        table: impl Into<String>,
        message: impl std::fmt::Display,
    ) -> Self {
        Self::Service {
            operation,
            table: table.into(),
            message: message.to_string(),
        }
    }
}

/// Key-value table operations used by the loader (dependency injection)
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Point lookup by primary key, requesting only the key attribute back.
    /// Returns whether an item with that key exists.
    async fn contains_key(&self, table: &str, key: &PrimaryKey) -> Result<bool, StoreError>;

    /// Write the full item. Overwrites silently if the key already exists.
    async fn put_item(&self, table: &str, item: &Item) -> Result<(), StoreError>;
}

#[async_trait]
impl<T: KeyValueStore + ?Sized> KeyValueStore for Box<T> {
    async fn contains_key(&self, table: &str, key: &PrimaryKey) -> Result<bool, StoreError> {
        (**self).contains_key(table, key).await
    }

    async fn put_item(&self, table: &str, item: &Item) -> Result<(), StoreError> {
        (**self).put_item(table, item).await
    }
}

#[async_trait]
impl<T: KeyValueStore + ?Sized> KeyValueStore for std::sync::Arc<T> {
    async fn contains_key(&self, table: &str, key: &PrimaryKey) -> Result<bool, StoreError> {
        (**self).contains_key(table, key).await
    }

    async fn put_item(&self, table: &str, item: &Item) -> Result<(), StoreError> {
        (**self).put_item(table, item).await
    }
}
