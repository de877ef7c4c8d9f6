//! In-memory event recording for logging assertions
//!
//! [`init_test_capture`] installs a recording layer as the global subscriber
//! of the test binary. Every event is kept, including the `debug` details
//! the object model emits while restoring, diffing and patching, so tests
//! can check both the boundary lifecycle and the core's internal reports.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, OnceLock};

use strata_core_types::schema::{
    EVENT_END, EVENT_END_ERROR, EVENT_START, FIELD_COMPONENT, FIELD_EVENT, FIELD_NODE_UUID, FIELD_OP,
};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

/// One recorded event: level, target and every field rendered as text
#[derive(Clone, Debug)]
pub struct CapturedEvent {
    pub level: Level,
    pub target: String,
    pub fields: BTreeMap<String, String>,
}

impl CapturedEvent {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn op(&self) -> Option<&str> {
        self.field(FIELD_OP)
    }

    /// Lifecycle marker (`start`, `end`, `end_error`), if any.
    pub fn event(&self) -> Option<&str> {
        self.field(FIELD_EVENT)
    }

    pub fn component(&self) -> Option<&str> {
        self.field(FIELD_COMPONENT)
    }

    /// Uuid of the node the event is about.
    pub fn node_uuid(&self) -> Option<&str> {
        self.field(FIELD_NODE_UUID)
    }
}

#[derive(Default)]
struct Fields(BTreeMap<String, String>);

impl Visit for Fields {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.0.insert(field.name().to_string(), format!("{:?}", value));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.0.insert(field.name().to_string(), value.to_string());
    }
}

struct RecordingLayer {
    sink: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl<S: Subscriber> Layer<S> for RecordingLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut fields = Fields::default();
        event.record(&mut fields);
        let metadata = event.metadata();
        let captured = CapturedEvent {
            level: *metadata.level(),
            target: metadata.target().to_string(),
            fields: fields.0,
        };
        if let Ok(mut sink) = self.sink.lock() {
            sink.push(captured);
        }
    }
}

/// Shared view on the recorded events
#[derive(Clone)]
pub struct TestCapture {
    sink: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl TestCapture {
    /// Snapshot of everything recorded so far.
    pub fn events(&self) -> Vec<CapturedEvent> {
        self.sink.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Events carrying `op`, in emission order.
    pub fn events_for_op(&self, op: &str) -> Vec<CapturedEvent> {
        self.filtered(|e| e.op() == Some(op))
    }

    /// Lifecycle markers emitted for `op`, in order.
    pub fn lifecycle(&self, op: &str) -> Vec<String> {
        self.events_for_op(op)
            .iter()
            .filter_map(|e| e.event().map(str::to_string))
            .collect()
    }

    /// Events whose field `name` has exactly `value`.
    pub fn with_field(&self, name: &str, value: &str) -> Vec<CapturedEvent> {
        self.filtered(|e| e.field(name) == Some(value))
    }

    pub fn count_events(&self, predicate: impl Fn(&CapturedEvent) -> bool) -> usize {
        self.filtered(predicate).len()
    }

    pub fn clear(&self) {
        if let Ok(mut sink) = self.sink.lock() {
            sink.clear();
        }
    }

    /// # Panics
    ///
    /// If `op` has no event with the lifecycle marker `event`.
    pub fn assert_event_exists(&self, op: &str, event: &str) {
        let lifecycle = self.lifecycle(op);
        assert!(
            lifecycle.iter().any(|e| e == event),
            "no '{}' event for op '{}' (saw {:?})",
            event,
            op,
            lifecycle
        );
    }

    /// # Panics
    ///
    /// Unless `op` logged exactly one start followed by exactly one end or
    /// end_error.
    pub fn assert_lifecycle_closed(&self, op: &str) {
        let lifecycle = self.lifecycle(op);
        let closed = matches!(
            lifecycle.as_slice(),
            [start, end] if start == EVENT_START && (end == EVENT_END || end == EVENT_END_ERROR)
        );
        assert!(closed, "op '{}' has lifecycle {:?}", op, lifecycle);
    }

    fn filtered(&self, predicate: impl Fn(&CapturedEvent) -> bool) -> Vec<CapturedEvent> {
        self.events().into_iter().filter(|e| predicate(e)).collect()
    }
}

static CAPTURE: OnceLock<TestCapture> = OnceLock::new();

/// Install the recording subscriber once per test binary and return a handle
/// to it.
///
/// Tests share the recorder, so each should use op names or property idents
/// of its own.
///
/// # Example
///
/// ```
/// use strata_core::log_op_start;
/// use strata_core::logging_facility::test_capture::init_test_capture;
///
/// let capture = init_test_capture();
/// log_op_start!("restore");
/// capture.assert_event_exists("restore", "start");
/// ```
pub fn init_test_capture() -> TestCapture {
    CAPTURE
        .get_or_init(|| {
            let sink = Arc::new(Mutex::new(Vec::new()));
            tracing_subscriber::registry()
                .with(RecordingLayer { sink: sink.clone() })
                .init();
            TestCapture { sink }
        })
        .clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(fields: &[(&str, &str)]) -> CapturedEvent {
        CapturedEvent {
            level: Level::DEBUG,
            target: "strata_core::memento::restore".to_string(),
            fields: fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    #[test]
    fn test_accessors_read_canonical_fields() {
        let e = event(&[("op", "patch"), ("event", "end"), ("node_uuid", "{x}")]);

        assert_eq!(e.op(), Some("patch"));
        assert_eq!(e.event(), Some("end"));
        assert_eq!(e.node_uuid(), Some("{x}"));
        assert_eq!(e.component(), None);
    }
}
