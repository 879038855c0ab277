//! Per-record audit envelope.
//!
//! Every row written by the loader carries a `meta` column holding a
//! [`MetaEnvelope`]: the list of fields that were changed on the way to the
//! destination and why, plus free-form properties such as the sync id.

use crate::values::FailureKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Property key under which the owning sync id is stored.
pub const SYNC_ID_PROPERTY: &str = "syncId";

/// What happened to a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Change {
    Nulled,
    Truncated,
}

/// Why a field was changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Reason {
    SourceRecordSizeLimitation,
    DestinationRecordSizeLimitation,
    SourceFieldSizeLimitation,
    DestinationFieldSizeLimitation,
    SourceRetrievalError,
    SourceSerializationError,
    DestinationSerializationError,
}

impl From<FailureKind> for Reason {
    fn from(kind: FailureKind) -> Self {
        match kind {
            FailureKind::Overflow => Reason::DestinationFieldSizeLimitation,
            FailureKind::Missing | FailureKind::Serialization => {
                Reason::DestinationSerializationError
            }
        }
    }
}

/// One audited change of one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecord {
    pub field: String,
    pub change: Change,
    pub reason: Reason,
}

impl ChangeRecord {
    pub fn new(field: impl Into<String>, change: Change, reason: Reason) -> Self {
        Self {
            field: field.into(),
            change,
            reason,
        }
    }

    /// A field that was replaced by null.
    pub fn nulled(field: impl Into<String>, reason: Reason) -> Self {
        Self::new(field, Change::Nulled, reason)
    }
}

/// Audit record serialized into the `meta` system column.
///
/// Serializes as `{"changes":[...], <properties...>}`; properties are
/// flattened next to `changes` in key order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetaEnvelope {
    pub changes: Vec<ChangeRecord>,

    #[serde(flatten)]
    pub properties: BTreeMap<String, serde_json::Value>,
}

impl MetaEnvelope {
    /// Empty envelope for a record of the given sync.
    pub fn for_sync(sync_id: impl Into<String>) -> Self {
        let mut envelope = Self::default();
        envelope.properties.insert(
            SYNC_ID_PROPERTY.to_string(),
            serde_json::Value::String(sync_id.into()),
        );
        envelope
    }

    /// Append a change.
    pub fn push(&mut self, change: ChangeRecord) {
        self.changes.push(change);
    }

    /// The sync id property, if set.
    pub fn sync_id(&self) -> Option<&str> {
        self.properties
            .get(SYNC_ID_PROPERTY)
            .and_then(|v| v.as_str())
    }

    /// Textual form stored in the `meta` column.
    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse the textual form read back from the `meta` column.
    pub fn from_json_str(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_envelope_serialization() {
        let envelope = MetaEnvelope::for_sync("s1");
        assert_eq!(
            envelope.to_json_string().unwrap(),
            r#"{"changes":[],"syncId":"s1"}"#
        );
    }

    #[test]
    fn test_change_serialization_order_and_case() {
        let mut envelope = MetaEnvelope::for_sync("s1");
        envelope.push(ChangeRecord::nulled(
            "id",
            Reason::DestinationSerializationError,
        ));
        assert_eq!(
            envelope.to_json_string().unwrap(),
            r#"{"changes":[{"field":"id","change":"NULLED","reason":"DESTINATION_SERIALIZATION_ERROR"}],"syncId":"s1"}"#
        );
    }

    #[test]
    fn test_reason_from_failure_kind() {
        assert_eq!(
            Reason::from(FailureKind::Overflow),
            Reason::DestinationFieldSizeLimitation
        );
        assert_eq!(
            Reason::from(FailureKind::Missing),
            Reason::DestinationSerializationError
        );
        assert_eq!(
            Reason::from(FailureKind::Serialization),
            Reason::DestinationSerializationError
        );
    }

    #[test]
    fn test_parse_back() {
        let text = r#"{"changes":[{"field":"a","change":"TRUNCATED","reason":"SOURCE_FIELD_SIZE_LIMITATION"}],"syncId":"s9","extra":1}"#;
        let envelope = MetaEnvelope::from_json_str(text).unwrap();
        assert_eq!(envelope.sync_id(), Some("s9"));
        assert_eq!(envelope.changes[0].change, Change::Truncated);
        assert_eq!(envelope.properties.get("extra"), Some(&serde_json::json!(1)));
    }
}
