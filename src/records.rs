//! JSONL record messages.
//!
//! One message per line:
//!
//! ```json
//! {"data": {"id": 1}, "emitted_at": 1700000000000, "changes": []}
//! ```

use crate::catalog::StreamConfig;
use anyhow::Context;
use serde::Deserialize;
use std::io::BufRead;
use std::path::Path;
use sync_core::{AbstractType, AbstractValue, ChangeRecord, Record};

#[derive(Debug, Clone, Deserialize)]
pub struct RecordMessage {
    pub data: serde_json::Value,

    /// Epoch milliseconds
    pub emitted_at: i64,

    /// Changes already applied by the source
    #[serde(default)]
    pub changes: Vec<ChangeRecord>,
}

impl RecordMessage {
    /// Turn the message into a record of `stream`, typing `data` by the
    /// stream's declared type.
    pub fn into_record(self, stream: &StreamConfig, declared: &AbstractType) -> Record {
        let data = AbstractValue::from_json_typed(self.data, declared);
        Record::new(data, self.emitted_at, stream.generation_id, stream.sync_id.as_str())
            .with_changes(self.changes)
    }
}

/// Read every message of a JSONL file. Blank lines are skipped.
pub fn read_messages<P: AsRef<Path>>(path: P) -> anyhow::Result<Vec<RecordMessage>> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open records file: {path:?}"))?;
    parse_messages(std::io::BufReader::new(file))
        .with_context(|| format!("Failed to read records file: {path:?}"))
}

pub fn parse_messages<R: BufRead>(reader: R) -> anyhow::Result<Vec<RecordMessage>> {
    let mut messages = Vec::new();
    for (line_number, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let message: RecordMessage = serde_json::from_str(&line)
            .with_context(|| format!("Invalid record on line {}", line_number + 1))?;
        messages.push(message);
    }
    Ok(messages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sync_core::{Change, Reason};

    #[test]
    fn test_parse_messages() {
        let input = concat!(
            r#"{"data":{"id":1},"emitted_at":5}"#,
            "\n\n",
            r#"{"data":{"id":2},"emitted_at":6,"changes":[{"field":"x","change":"TRUNCATED","reason":"SOURCE_FIELD_SIZE_LIMITATION"}]}"#,
            "\n"
        );
        let messages = parse_messages(input.as_bytes()).unwrap();
        assert_eq!(messages.len(), 2);
        assert!(messages[0].changes.is_empty());
        assert_eq!(
            messages[1].changes,
            vec![ChangeRecord::new("x", Change::Truncated, Reason::SourceFieldSizeLimitation)]
        );
    }

    #[test]
    fn test_bad_line_is_reported() {
        let err = parse_messages("{}\n".as_bytes()).unwrap_err();
        assert!(format!("{err:#}").contains("line 1"));
    }
}
