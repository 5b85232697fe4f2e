//! DynamoDB-backed store
//!
//! Credentials come from the standard AWS provider chain. Retries with
//! exponential backoff are configured on the SDK client (by default 3
//! retries starting at 1200 ms), so a failure seen here is final for the
//! record.

use super::{KeyValueStore, StoreError};
use crate::record::{AttributeValue, Item, PrimaryKey};
use async_trait::async_trait;
use aws_config::{retry::RetryConfig, BehaviorVersion};
use aws_sdk_dynamodb::{
    config::Region,
    error::DisplayErrorContext,
    primitives::Blob,
    types::AttributeValue as SdkAttributeValue,
    Client,
};
use kvload_common::error::env_parse;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Default attempts per call, first try included
pub const DEFAULT_MAX_ATTEMPTS: u32 = 4;

/// Default backoff before the first retry
pub const DEFAULT_INITIAL_BACKOFF_MS: u64 = 1200;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DynamoConfig {
    /// Region; falls back to the provider chain (`AWS_REGION`, profile)
    pub region: Option<String>,
    /// Custom endpoint, e.g. a local emulator
    pub endpoint: Option<String>,
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
}

impl Default for DynamoConfig {
    fn default() -> Self {
        Self {
            region: None,
            endpoint: None,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_backoff_ms: DEFAULT_INITIAL_BACKOFF_MS,
        }
    }
}

impl DynamoConfig {
    /// Load from environment variables
    ///
    /// - `KVLOAD_REGION`: region override
    /// - `KVLOAD_ENDPOINT`: endpoint override
    /// - `KVLOAD_MAX_ATTEMPTS`: attempts per call
    /// - `KVLOAD_INITIAL_BACKOFF_MS`: first retry delay
    pub fn from_env() -> kvload_common::Result<Self> {
        let mut config = Self::default();

        if let Ok(region) = std::env::var("KVLOAD_REGION") {
            config.region = Some(region);
        }
        if let Ok(endpoint) = std::env::var("KVLOAD_ENDPOINT") {
            config.endpoint = Some(endpoint);
        }
        if let Some(attempts) = env_parse("KVLOAD_MAX_ATTEMPTS")? {
            config.max_attempts = attempts;
        }
        if let Some(backoff) = env_parse("KVLOAD_INITIAL_BACKOFF_MS")? {
            config.initial_backoff_ms = backoff;
        }

        Ok(config)
    }

    fn retry_config(&self) -> RetryConfig {
        RetryConfig::standard()
            .with_max_attempts(self.max_attempts.max(1))
            .with_initial_backoff(Duration::from_millis(self.initial_backoff_ms))
    }
}

#[derive(Clone)]
pub struct DynamoStore {
    client: Client,
}

impl DynamoStore {
    /// Build a client from the AWS environment plus `config` overrides
    pub async fn connect(config: DynamoConfig) -> Result<Self, StoreError> {
        debug!("Initializing DynamoDB client with config: {:?}", config);

        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .retry_config(config.retry_config());

        if let Some(region) = &config.region {
            loader = loader.region(Region::new(region.clone()));
        }
        if let Some(endpoint) = &config.endpoint {
            loader = loader.endpoint_url(endpoint);
        }

        let sdk_config = loader.load().await;
        let region = sdk_config
            .region()
            .ok_or_else(|| {
                StoreError::Init(
                    "no AWS region configured (set KVLOAD_REGION, AWS_REGION or --region)"
                        .to_string(),
                )
            })?
            .to_string();

        info!(
            region = %region,
            endpoint = ?config.endpoint,
            max_attempts = config.max_attempts,
            "DynamoDB client initialized"
        );

        Ok(Self::from_client(Client::new(&sdk_config)))
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl KeyValueStore for DynamoStore {
    #[instrument(skip(self, key), fields(key = %key))]
    async fn contains_key(&self, table: &str, key: &PrimaryKey) -> Result<bool, StoreError> {
        let output = self
            .client
            .get_item()
            .table_name(table)
            .key(key.name.clone(), to_sdk(&key.value))
            .projection_expression("#k")
            .expression_attribute_names("#k", key.name.clone())
            .send()
            .await
            .map_err(|e| StoreError::service("GetItem", table, DisplayErrorContext(&e)))?;

        Ok(output.item().is_some())
    }

    #[instrument(skip(self, item), fields(attributes = item.len()))]
    async fn put_item(&self, table: &str, item: &Item) -> Result<(), StoreError> {
        self.client
            .put_item()
            .table_name(table)
            .set_item(Some(to_sdk_item(item)))
            .send()
            .await
            .map_err(|e| StoreError::service("PutItem", table, DisplayErrorContext(&e)))?;

        Ok(())
    }
}

/// Convert an item to the SDK's attribute map
pub fn to_sdk_item(item: &Item) -> HashMap<String, SdkAttributeValue> {
    item.iter()
        .map(|(name, value)| (name.clone(), to_sdk(value)))
        .collect()
}

/// Convert one typed value to the SDK representation
pub fn to_sdk(value: &AttributeValue) -> SdkAttributeValue {
    match value {
        AttributeValue::Binary(b) => SdkAttributeValue::B(Blob::new(b.as_bytes().to_vec())),
        AttributeValue::BinarySet(set) => SdkAttributeValue::Bs(
            set.iter()
                .map(|b| Blob::new(b.as_bytes().to_vec()))
                .collect(),
        ),
        AttributeValue::Bool(b) => SdkAttributeValue::Bool(*b),
        AttributeValue::String(s) => SdkAttributeValue::S(s.clone()),
        AttributeValue::StringSet(set) => SdkAttributeValue::Ss(set.clone()),
        AttributeValue::Number(n) => SdkAttributeValue::N(n.as_str().to_string()),
        AttributeValue::NumberSet(set) => {
            SdkAttributeValue::Ns(set.iter().map(|n| n.as_str().to_string()).collect())
        },
        AttributeValue::Null(b) => SdkAttributeValue::Null(*b),
        AttributeValue::List(values) => SdkAttributeValue::L(values.iter().map(to_sdk).collect()),
        AttributeValue::Map(map) => SdkAttributeValue::M(
            map.iter()
                .map(|(name, value)| (name.clone(), to_sdk(value)))
                .collect(),
        ),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::record::Record;
    use serial_test::serial;

    #[test]
    fn test_to_sdk_item_decodes_binary() {
        let record = Record::parse(
            r#"{"fileId":{"B":"ZmlsZTE="},"size":{"N":"12"},"tags":{"SS":["a"]},"meta":{"M":{"ok":{"BOOL":true},"parts":{"L":[{"NULL":true}]}}}}"#,
        )
        .unwrap();

        let sdk = to_sdk_item(record.item());

        assert_eq!(sdk["fileId"], SdkAttributeValue::B(Blob::new(b"file1".to_vec())));
        assert_eq!(sdk["size"], SdkAttributeValue::N("12".to_string()));
        assert_eq!(sdk["tags"], SdkAttributeValue::Ss(vec!["a".to_string()]));

        let SdkAttributeValue::M(meta) = &sdk["meta"] else {
            panic!("expected map");
        };
        assert_eq!(meta["ok"], SdkAttributeValue::Bool(true));
        assert_eq!(
            meta["parts"],
            SdkAttributeValue::L(vec![SdkAttributeValue::Null(true)])
        );
    }

    #[test]
    fn test_default_retry_policy() {
        let config = DynamoConfig::default();
        assert_eq!(config.max_attempts, 4);
        assert_eq!(config.initial_backoff_ms, 1200);

        let retry = config.retry_config();
        assert_eq!(retry.max_attempts(), 4);
        assert_eq!(retry.initial_backoff(), Duration::from_millis(1200));
    }

    #[test]
    #[serial]
    fn test_from_env() {
        std::env::set_var("KVLOAD_ENDPOINT", "http://localhost:4566");
        std::env::set_var("KVLOAD_MAX_ATTEMPTS", "2");

        let config = DynamoConfig::from_env().unwrap();
        assert_eq!(config.endpoint.as_deref(), Some("http://localhost:4566"));
        assert_eq!(config.max_attempts, 2);

        std::env::remove_var("KVLOAD_ENDPOINT");
        std::env::remove_var("KVLOAD_MAX_ATTEMPTS");
    }
}
