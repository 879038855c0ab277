//! Incoming records.

use crate::meta::ChangeRecord;
use crate::values::AbstractValue;

/// One unit of data received for a stream.
///
/// A record is bound exactly once and dropped afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Payload; expected to be an [`AbstractValue::Object`]
    pub data: AbstractValue,

    /// Emission time in milliseconds since the Unix epoch
    pub emitted_at_ms: i64,

    /// Generation the record belongs to
    pub generation_id: i64,

    /// Sync that produced the record
    pub sync_id: String,

    /// Changes already applied upstream before the record reached the loader
    pub changes: Vec<ChangeRecord>,
}

impl Record {
    pub fn new(
        data: AbstractValue,
        emitted_at_ms: i64,
        generation_id: i64,
        sync_id: impl Into<String>,
    ) -> Self {
        Self {
            data,
            emitted_at_ms,
            generation_id,
            sync_id: sync_id.into(),
            changes: Vec::new(),
        }
    }

    /// Attach upstream changes.
    pub fn with_changes(mut self, changes: Vec<ChangeRecord>) -> Self {
        self.changes = changes;
        self
    }

    /// Value of a top-level field; `None` when absent or when `data` is not
    /// an object.
    pub fn field(&self, name: &str) -> Option<&AbstractValue> {
        self.data.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meta::{ChangeRecord, Reason};

    #[test]
    fn test_field_lookup() {
        let record = Record::new(
            AbstractValue::object([("id", AbstractValue::Integer(42))]),
            1000,
            7,
            "s1",
        );
        assert_eq!(record.field("id"), Some(&AbstractValue::Integer(42)));
        assert_eq!(record.field("name"), None);
        assert!(record.changes.is_empty());
    }

    #[test]
    fn test_non_object_payload_has_no_fields() {
        let record = Record::new(AbstractValue::from("scalar"), 0, 0, "s1");
        assert_eq!(record.field("anything"), None);
    }

    #[test]
    fn test_with_changes() {
        let record = Record::new(AbstractValue::object::<String, _>([]), 0, 0, "s1")
            .with_changes(vec![ChangeRecord::nulled(
                "blob",
                Reason::SourceFieldSizeLimitation,
            )]);
        assert_eq!(record.changes.len(), 1);
    }
}
