use std::io;
use std::path::Path;

use serde_json::Value;
use thiserror::Error;

/// Errors raised while interpreting a trigger event.
#[derive(Debug, Error)]
pub enum InvalidEvent {
    #[error("failed to read event file: {0}")]
    Unreadable(#[source] io::Error),
    #[error("event is not valid JSON: {0}")]
    Malformed(#[source] serde_json::Error),
    /// An object storage record without `s3.object.key`.
    #[error("object storage record has no object key")]
    MissingObjectKey,
}

/// What a single run of the loader should do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    /// Load every table of the plan.
    FullLoad,
    /// Load only the table owning this artifact key.
    Artifact { key: String },
}

impl Invocation {
    /// Interprets an event document.
    ///
    /// An object storage notification (`Records[0].s3.object.key`) selects the artifact mode.
    /// Any other document, including a first record without `s3`, is a full load.
    pub fn from_event(event: &Value) -> Result<Invocation, InvalidEvent> {
        let Some(record) = event
            .get("Records")
            .and_then(Value::as_array)
            .and_then(|records| records.first())
        else {
            return Ok(Invocation::FullLoad);
        };

        let Some(s3) = record.get("s3") else {
            return Ok(Invocation::FullLoad);
        };

        match s3.pointer("/object/key").and_then(Value::as_str) {
            Some(key) => Ok(Invocation::Artifact {
                key: key.to_owned(),
            }),
            None => Err(InvalidEvent::MissingObjectKey),
        }
    }

    /// Reads and interprets the event document stored at `path`.
    pub fn from_event_file(path: &Path) -> Result<Invocation, InvalidEvent> {
        let raw = std::fs::read_to_string(path).map_err(InvalidEvent::Unreadable)?;
        let event: Value = serde_json::from_str(&raw).map_err(InvalidEvent::Malformed)?;

        Self::from_event(&event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn object_notification_selects_artifact_mode() {
        let event = json!({
            "Records": [{"s3": {"bucket": {"name": "processed"}, "object": {"key": "fact_sales_order/batch1.parquet"}}}]
        });

        assert_eq!(
            Invocation::from_event(&event).unwrap(),
            Invocation::Artifact {
                key: "fact_sales_order/batch1.parquet".to_owned()
            }
        );
    }

    #[test]
    fn scheduled_and_manual_events_run_a_full_load() {
        assert_eq!(Invocation::from_event(&json!({})).unwrap(), Invocation::FullLoad);
        assert_eq!(
            Invocation::from_event(&json!({"source": "aws.events", "Records": []})).unwrap(),
            Invocation::FullLoad
        );
        assert_eq!(
            Invocation::from_event(&json!({"Records": [{"eventSource": "aws:sqs"}]})).unwrap(),
            Invocation::FullLoad
        );
    }

    #[test]
    fn object_record_without_key_is_rejected() {
        let event = json!({"Records": [{"s3": {"object": {}}}]});

        assert!(matches!(
            Invocation::from_event(&event),
            Err(InvalidEvent::MissingObjectKey)
        ));
    }
}
