//! Typed-wrapper record model
//!
//! Every attribute value in a source line is a single-key object mapping a
//! type tag to the raw value, e.g. `{"S": "hello"}` or `{"B": "ZmlsZTE="}`.
//! Serde's externally tagged enums have exactly that shape, so an item
//! deserializes straight into [`Item`]. Only canonical (uppercase) tags are
//! accepted; lowercase input must be normalized first.

use crate::error::RecordError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Attribute name → typed value
pub type Item = BTreeMap<String, AttributeValue>;

/// One typed-wrapper value
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttributeValue {
    #[serde(rename = "B")]
    Binary(Binary),
    #[serde(rename = "BS")]
    BinarySet(Vec<Binary>),
    #[serde(rename = "BOOL")]
    Bool(bool),
    #[serde(rename = "S")]
    String(String),
    #[serde(rename = "SS")]
    StringSet(Vec<String>),
    #[serde(rename = "N")]
    Number(Number),
    #[serde(rename = "NS")]
    NumberSet(Vec<Number>),
    #[serde(rename = "NULL")]
    Null(bool),
    #[serde(rename = "L")]
    List(Vec<AttributeValue>),
    #[serde(rename = "M")]
    Map(BTreeMap<String, AttributeValue>),
}

impl AttributeValue {
    /// Canonical type tag
    pub fn tag(&self) -> &'static str {
        match self {
            AttributeValue::Binary(_) => "B",
            AttributeValue::BinarySet(_) => "BS",
            AttributeValue::Bool(_) => "BOOL",
            AttributeValue::String(_) => "S",
            AttributeValue::StringSet(_) => "SS",
            AttributeValue::Number(_) => "N",
            AttributeValue::NumberSet(_) => "NS",
            AttributeValue::Null(_) => "NULL",
            AttributeValue::List(_) => "L",
            AttributeValue::Map(_) => "M",
        }
    }

    /// Whether the value can address an item (B, S or N)
    pub fn is_key_type(&self) -> bool {
        matches!(
            self,
            AttributeValue::Binary(_) | AttributeValue::String(_) | AttributeValue::Number(_)
        )
    }
}

/// Binary payload, carried as base64 text on the wire
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Binary(pub Vec<u8>);

impl Binary {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.0)
    }
}

impl Serialize for Binary {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base64())
    }
}

impl<'de> Deserialize<'de> for Binary {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        STANDARD
            .decode(text.as_bytes())
            .map(Binary)
            .map_err(|e| de::Error::custom(format!("invalid base64 in binary value: {}", e)))
    }
}

/// Decimal number kept as text so no precision is lost in transit.
///
/// Accepts either `"12.5"` or `12.5` on input and always serializes as a
/// string, which is what the store's wire encoding expects.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Number(pub String);

impl Number {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for Number {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Json(serde_json::Number),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Text(text) => Ok(Number(text)),
            Raw::Json(number) => Ok(Number(number.to_string())),
        }
    }
}

/// Primary key of one record: attribute name plus its typed value
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PrimaryKey {
    pub name: String,
    pub value: AttributeValue,
}

impl fmt::Display for PrimaryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            AttributeValue::Binary(b) => write!(f, "{}={{B:{}}}", self.name, b.to_base64()),
            AttributeValue::String(s) => write!(f, "{}={{S:{}}}", self.name, s),
            AttributeValue::Number(n) => write!(f, "{}={{N:{}}}", self.name, n.as_str()),
            other => write!(f, "{}={{{}}}", self.name, other.tag()),
        }
    }
}

/// One parsed source line
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    item: Item,
}

impl Record {
    /// Parse a normalized line into a record
    pub fn parse(normalized: &str) -> Result<Self, RecordError> {
        let item: Item = serde_json::from_str(normalized).map_err(RecordError::malformed)?;
        Ok(Self { item })
    }

    /// Extract the primary key attribute
    pub fn primary_key(&self, attribute: &str) -> Result<PrimaryKey, RecordError> {
        let value = self
            .item
            .get(attribute)
            .ok_or_else(|| RecordError::MissingPrimaryKey(attribute.to_string()))?;

        if !value.is_key_type() {
            return Err(RecordError::malformed(format!(
                "primary key '{}' must be B, S or N, found {}",
                attribute,
                value.tag()
            )));
        }

        Ok(PrimaryKey {
            name: attribute.to_string(),
            value: value.clone(),
        })
    }

    pub fn item(&self) -> &Item {
        &self.item
    }

    pub fn into_item(self) -> Item {
        self.item
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_binary_key() {
        let record = Record::parse(r#"{"fileId":{"B":"ZmlsZTE="}}"#).unwrap();
        let key = record.primary_key("fileId").unwrap();

        assert_eq!(key.value, AttributeValue::Binary(Binary(b"file1".to_vec())));
        assert_eq!(key.to_string(), "fileId={B:ZmlsZTE=}");
    }

    #[test]
    fn test_parse_nested_item() {
        let line = r#"{"fileId":{"B":"ZmlsZTE="},"tags":{"SS":["a","b"]},"meta":{"M":{"size":{"N":"42"},"gone":{"NULL":true}}},"parts":{"L":[{"S":"x"},{"BOOL":false}]}}"#;
        let record = Record::parse(line).unwrap();
        let item = record.item();

        assert_eq!(
            item["tags"],
            AttributeValue::StringSet(vec!["a".into(), "b".into()])
        );
        let AttributeValue::Map(meta) = &item["meta"] else {
            panic!("expected map");
        };
        assert_eq!(meta["size"], AttributeValue::Number(Number("42".into())));
        assert_eq!(meta["gone"], AttributeValue::Null(true));
        assert_eq!(
            item["parts"],
            AttributeValue::List(vec![
                AttributeValue::String("x".into()),
                AttributeValue::Bool(false)
            ])
        );
    }

    #[test]
    fn test_number_accepts_json_number() {
        let record = Record::parse(r#"{"fileId":{"N":17},"ratio":{"NS":[1.5,"2"]}}"#).unwrap();

        assert_eq!(
            record.item()["fileId"],
            AttributeValue::Number(Number("17".into()))
        );
        assert_eq!(
            record.item()["ratio"],
            AttributeValue::NumberSet(vec![Number("1.5".into()), Number("2".into())])
        );
    }

    #[test]
    fn test_lowercase_tag_is_malformed() {
        let err = Record::parse(r#"{"fileId":{"b":"ZmlsZTE="}}"#).unwrap_err();
        assert!(matches!(err, RecordError::MalformedRecord(_)));
    }

    #[test]
    fn test_invalid_base64_is_malformed() {
        let err = Record::parse(r#"{"fileId":{"B":"not base64!"}}"#).unwrap_err();
        assert!(matches!(err, RecordError::MalformedRecord(ref m) if m.contains("base64")));
    }

    #[test]
    fn test_not_json_is_malformed() {
        assert!(matches!(
            Record::parse("not-json"),
            Err(RecordError::MalformedRecord(_))
        ));
        assert!(matches!(
            Record::parse(""),
            Err(RecordError::MalformedRecord(_))
        ));
    }

    #[test]
    fn test_missing_primary_key() {
        let record = Record::parse(r#"{"name":{"S":"x"}}"#).unwrap();
        assert!(matches!(
            record.primary_key("fileId"),
            Err(RecordError::MissingPrimaryKey(ref name)) if name == "fileId"
        ));
    }

    #[test]
    fn test_non_scalar_primary_key_rejected() {
        let record = Record::parse(r#"{"fileId":{"L":[]}}"#).unwrap();
        assert!(matches!(
            record.primary_key("fileId"),
            Err(RecordError::MalformedRecord(_))
        ));
    }

    #[test]
    fn test_serializes_back_to_canonical_wrappers() {
        let line = r#"{"fileId":{"B":"ZmlsZTE="},"n":{"N":"1"}}"#;
        let record = Record::parse(line).unwrap();
        assert_eq!(serde_json::to_string(record.item()).unwrap(), line);
    }
}
