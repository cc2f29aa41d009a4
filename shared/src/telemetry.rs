//! Per-invocation telemetry events.
//!
//! An [`Event`] collects fields for the lifetime of one request and is sent to
//! its sink when dropped, so every exit path of a handler reports exactly one
//! event.

use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::info;

/// Destination for finished telemetry events.
pub trait TelemetrySink: Send + Sync {
    /// Deliver one event. Fire-and-forget: failures are not surfaced.
    fn send(&self, dataset: &str, fields: Map<String, Value>);
}

/// Writes events as structured log records on the `telemetry` target.
#[derive(Debug, Default, Clone)]
pub struct TracingSink;

impl TelemetrySink for TracingSink {
    fn send(&self, dataset: &str, fields: Map<String, Value>) {
        let event = Value::Object(fields);
        info!(target: "telemetry", dataset, event = %event);
    }
}

/// Factory for events bound to a dataset and sink.
#[derive(Clone)]
pub struct Telemetry {
    dataset: String,
    sink: Arc<dyn TelemetrySink>,
}

impl Telemetry {
    pub fn new(dataset: impl Into<String>, sink: Arc<dyn TelemetrySink>) -> Self {
        Self {
            dataset: dataset.into(),
            sink,
        }
    }

    /// Telemetry that logs through `tracing`.
    pub fn tracing(dataset: impl Into<String>) -> Self {
        Self::new(dataset, Arc::new(TracingSink))
    }

    /// Start a new event. It is sent when the returned value is dropped.
    pub fn new_event(&self) -> Event {
        Event {
            dataset: self.dataset.clone(),
            fields: Map::new(),
            sink: Arc::clone(&self.sink),
        }
    }
}

/// A telemetry event under construction.
pub struct Event {
    dataset: String,
    fields: Map<String, Value>,
    sink: Arc<dyn TelemetrySink>,
}

impl Event {
    /// Set a single field, replacing any previous value.
    pub fn add_field(&mut self, key: &str, value: impl Into<Value>) {
        self.fields.insert(key.to_string(), value.into());
    }

    /// Set several fields at once.
    pub fn add<K, V, I>(&mut self, fields: I)
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        for (key, value) in fields {
            self.fields.insert(key.into(), value.into());
        }
    }
}

impl Drop for Event {
    fn drop(&mut self) {
        let fields = std::mem::take(&mut self.fields);
        self.sink.send(&self.dataset, fields);
    }
}

/// Sink that keeps events in memory, for tests.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: std::sync::Mutex<Vec<(String, Map<String, Value>)>>,
}

impl MemorySink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Every event sent so far, in send order.
    pub fn events(&self) -> Vec<Map<String, Value>> {
        self.events
            .lock()
            .map(|events| events.iter().map(|(_, fields)| fields.clone()).collect())
            .unwrap_or_default()
    }
}

impl TelemetrySink for MemorySink {
    fn send(&self, dataset: &str, fields: Map<String, Value>) {
        if let Ok(mut events) = self.events.lock() {
            events.push((dataset.to_string(), fields));
        }
    }
}
