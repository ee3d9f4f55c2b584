//! JSON Event Sink
//!
//! Outputs deploy events as NDJSON for CI/automation consumption.

use std::io::{self, Write};

use parking_lot::Mutex;

use crate::domain::ports::{DeployEvent, DeployEventSink};

/// Event sink that outputs NDJSON events to stdout
pub struct JsonEventSink {
    writer: Mutex<Box<dyn Write + Send>>,
}

impl JsonEventSink {
    /// Create a new JSON event sink writing to stdout
    pub fn stdout() -> Self {
        Self {
            writer: Mutex::new(Box::new(io::stdout())),
        }
    }

    /// Create a JSON event sink writing to a custom writer
    pub fn with_writer<W: Write + Send + 'static>(writer: W) -> Self {
        Self {
            writer: Mutex::new(Box::new(writer)),
        }
    }

    fn write_event(&self, event: serde_json::Value) {
        let mut writer = self.writer.lock();
        let _ = writeln!(writer, "{}", event);
        let _ = writer.flush();
    }
}

/// Render one event as its NDJSON object.
pub fn event_to_json(event: &DeployEvent) -> serde_json::Value {
    match event {
        DeployEvent::PhaseChanged { phase } => serde_json::json!({
            "event": "phase",
            "command": "deploy",
            "phase": phase,
        }),

        DeployEvent::Scanned {
            asset_count,
            total_bytes,
            duplicate_groups,
        } => serde_json::json!({
            "event": "scanned",
            "command": "deploy",
            "asset_count": asset_count,
            "total_bytes": total_bytes,
            "duplicate_groups": duplicate_groups,
        }),

        DeployEvent::Planned {
            to_upload,
            to_delete,
            unchanged,
            retained,
            remote_count,
        } => serde_json::json!({
            "event": "planned",
            "command": "deploy",
            "to_upload": to_upload,
            "to_delete": to_delete,
            "unchanged": unchanged,
            "retained": retained,
            "remote_count": remote_count,
        }),

        DeployEvent::ObjectUploaded {
            key,
            bytes,
            attempts,
        } => serde_json::json!({
            "event": "item_uploaded",
            "command": "deploy",
            "key": key,
            "bytes": bytes,
            "attempts": attempts,
        }),

        DeployEvent::ObjectDeleted { key, attempts } => serde_json::json!({
            "event": "item_deleted",
            "command": "deploy",
            "key": key,
            "attempts": attempts,
        }),

        DeployEvent::ObjectFailed {
            key,
            operation,
            kind,
            error,
            attempts,
        } => serde_json::json!({
            "event": "item_error",
            "command": "deploy",
            "key": key,
            "operation": operation,
            "kind": kind,
            "error": error,
            "attempts": attempts,
        }),

        DeployEvent::InvalidationSubmitted {
            distribution,
            batch_ids,
            path_count,
        } => serde_json::json!({
            "event": "invalidation_submitted",
            "command": "deploy",
            "distribution": distribution,
            "batch_ids": batch_ids,
            "path_count": path_count,
        }),

        DeployEvent::InvalidationFailed {
            distribution,
            error,
        } => serde_json::json!({
            "event": "invalidation_failed",
            "command": "deploy",
            "distribution": distribution,
            "error": error,
        }),

        DeployEvent::Completed {
            status,
            uploaded,
            deleted,
            skipped,
            errors,
        } => serde_json::json!({
            "event": "complete",
            "command": "deploy",
            "status": status,
            "uploaded": uploaded,
            "deleted": deleted,
            "skipped": skipped,
            "errors": errors,
        }),
    }
}

impl DeployEventSink for JsonEventSink {
    fn on_event(&self, event: DeployEvent) {
        self.write_event(event_to_json(&event));
    }

    fn wants_detailed_events(&self) -> bool {
        true // JSON mode wants all events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::SyncOperation;
    use crate::domain::value_objects::{DeployPhase, DeployStatus, ErrorKind, ObjectKey};
    use std::sync::Arc;

    struct TestWriter {
        buffer: Arc<Mutex<Vec<u8>>>,
    }

    impl TestWriter {
        fn new() -> (Self, Arc<Mutex<Vec<u8>>>) {
            let buffer = Arc::new(Mutex::new(Vec::new()));
            (
                Self {
                    buffer: buffer.clone(),
                },
                buffer,
            )
        }
    }

    impl Write for TestWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.buffer.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn lines(buffer: &Arc<Mutex<Vec<u8>>>) -> Vec<serde_json::Value> {
        String::from_utf8(buffer.lock().clone())
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn json_sink_outputs_one_object_per_line() {
        let (writer, buffer) = TestWriter::new();
        let sink = JsonEventSink::with_writer(writer);

        sink.on_event(DeployEvent::PhaseChanged {
            phase: DeployPhase::Scanning,
        });
        sink.on_event(DeployEvent::Scanned {
            asset_count: 5,
            total_bytes: 1024,
            duplicate_groups: 0,
        });

        let events = lines(&buffer);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0]["event"], "phase");
        assert_eq!(events[0]["phase"], "scanning");
        assert_eq!(events[1]["asset_count"], 5);
    }

    #[test]
    fn json_sink_outputs_failure_details() {
        let (writer, buffer) = TestWriter::new();
        let sink = JsonEventSink::with_writer(writer);

        sink.on_event(DeployEvent::ObjectFailed {
            key: ObjectKey::parse("img/logo.png").unwrap(),
            operation: SyncOperation::Upload,
            kind: ErrorKind::Transient,
            error: "503".to_string(),
            attempts: 3,
        });

        let event = &lines(&buffer)[0];
        assert_eq!(event["event"], "item_error");
        assert_eq!(event["key"], "img/logo.png");
        assert_eq!(event["operation"], "upload");
        assert_eq!(event["kind"], "transient");
        assert_eq!(event["attempts"], 3);
    }

    #[test]
    fn json_sink_outputs_complete_event() {
        let (writer, buffer) = TestWriter::new();
        let sink = JsonEventSink::with_writer(writer);

        sink.on_event(DeployEvent::Completed {
            status: DeployStatus::PartiallyFailed,
            uploaded: 9,
            deleted: 0,
            skipped: 3,
            errors: 1,
        });

        let event = &lines(&buffer)[0];
        assert_eq!(event["event"], "complete");
        assert_eq!(event["status"], "partially_failed");
        assert_eq!(event["uploaded"], 9);
    }
}
