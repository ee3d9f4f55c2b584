//! Deploy event sinks

mod json;
mod tracing_sink;

pub use json::{event_to_json, JsonEventSink};
pub use tracing_sink::TracingEventSink;
