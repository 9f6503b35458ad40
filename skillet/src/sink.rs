//! Telemetry event sink: the capability handlers use to forward structured
//! records to the tracing backend.
//!
//! The sink is an explicitly owned object injected into [`crate::AppState`]
//! rather than ambient global state, so the validator and aggregator stay
//! pure and tests can swap in an in-memory sink. The production
//! implementation emits each record as a `tracing` event; when OTLP export is
//! enabled those events leave the process through the OpenTelemetry layer set
//! up in [`crate::telemetry`].

use serde_json::{Value, json};
use uuid::Uuid;

/// One structured record headed for the telemetry backend.
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryEvent {
    /// Logical event name, e.g. `validate-json` or `log-trace`
    pub name: &'static str,
    pub session_id: Option<String>,
    pub trace_id: Option<String>,
    /// Structured payload (metrics, artifacts, metadata)
    pub payload: Value,
}

/// Identifiers of the backend a sink forwards to, reported by the health
/// endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendInfo {
    pub project: String,
    pub entity: String,
}

/// Append-only telemetry capability.
///
/// `record_event` is fire-and-forget: the sink imposes no ordering beyond
/// "each call forwards exactly one record" and never reports delivery
/// failures back to the request path.
pub trait EventSink: Send + Sync {
    fn record_event(&self, event: TelemetryEvent);

    /// Readiness probe for the health endpoint.
    fn is_ready(&self) -> bool;

    fn backend(&self) -> BackendInfo;

    /// Flush and close. Called once at process teardown.
    fn shutdown(&self);
}

/// Forward an internal fault to the sink as an error event, tagged with the
/// originating trace when known.
pub fn record_error(sink: &dyn EventSink, category: &str, message: &str, trace_id: Option<&str>) {
    sink.record_event(TelemetryEvent {
        name: "error",
        session_id: None,
        trace_id: trace_id.map(str::to_string),
        payload: json!({
            "error": {
                "type": category,
                "message": message,
                "trace_id": trace_id.unwrap_or("N/A"),
            }
        }),
    });
}

/// Production sink backed by the `tracing` pipeline.
///
/// Each process gets a fresh run id so downstream dashboards can group
/// records by service instance.
pub struct TracingEventSink {
    project: String,
    entity: String,
    run_id: Uuid,
}

impl TracingEventSink {
    /// Build a sink for the given project/entity. Expects
    /// [`crate::telemetry::init_telemetry`] to have run already, otherwise
    /// events only reach stderr.
    pub fn new(project: impl Into<String>, entity: impl Into<String>) -> Self {
        let sink = Self {
            project: project.into(),
            entity: entity.into(),
            run_id: Uuid::new_v4(),
        };
        tracing::info!(
            project = %sink.project,
            entity = %sink.entity,
            run_id = %sink.run_id,
            "telemetry sink initialized"
        );
        sink
    }
}

impl EventSink for TracingEventSink {
    fn record_event(&self, event: TelemetryEvent) {
        tracing::info!(
            target: "skillet::events",
            event = event.name,
            project = %self.project,
            run_id = %self.run_id,
            session_id = event.session_id.as_deref().unwrap_or(""),
            trace_id = event.trace_id.as_deref().unwrap_or(""),
            payload = %event.payload,
            "telemetry event"
        );
    }

    fn is_ready(&self) -> bool {
        // The sink is constructed after telemetry init succeeds; once built
        // it can always accept events.
        true
    }

    fn backend(&self) -> BackendInfo {
        BackendInfo {
            project: self.project.clone(),
            entity: self.entity.clone(),
        }
    }

    fn shutdown(&self) {
        tracing::info!(run_id = %self.run_id, "telemetry sink shutting down");
        crate::telemetry::shutdown_telemetry();
    }
}

#[cfg(test)]
pub mod memory {
    //! In-memory sink for tests.

    use super::*;
    use std::sync::Mutex;

    /// Captures events instead of forwarding them, with a switchable
    /// readiness flag for exercising the health endpoint's failure path.
    pub struct MemorySink {
        events: Mutex<Vec<TelemetryEvent>>,
        ready: bool,
    }

    impl MemorySink {
        pub fn new() -> Self {
            Self {
                events: Mutex::new(Vec::new()),
                ready: true,
            }
        }

        pub fn not_ready() -> Self {
            Self {
                events: Mutex::new(Vec::new()),
                ready: false,
            }
        }

        pub fn events(&self) -> Vec<TelemetryEvent> {
            self.events.lock().expect("sink poisoned").clone()
        }
    }

    impl EventSink for MemorySink {
        fn record_event(&self, event: TelemetryEvent) {
            self.events.lock().expect("sink poisoned").push(event);
        }

        fn is_ready(&self) -> bool {
            self.ready
        }

        fn backend(&self) -> BackendInfo {
            BackendInfo {
                project: "test-project".to_string(),
                entity: "test-entity".to_string(),
            }
        }

        fn shutdown(&self) {}
    }
}
