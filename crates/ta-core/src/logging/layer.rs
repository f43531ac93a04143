//! Custom tracing layer for JSONL output.
//!
//! This layer produces machine-parseable JSONL logs on stderr while
//! keeping stdout clean for command payloads. Each line is a serialized
//! [`LogEvent`].

use std::io::{self, Write};
use std::sync::Mutex;

use tracing::span::{Attributes, Id};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Layer;

use super::events::{Level, LogEvent, Stage};

/// Correlation fields recorded on a span.
#[derive(Debug, Clone, Default)]
struct SpanContext {
    run_id: Option<String>,
    source: Option<String>,
    stage: Option<Stage>,
}

impl SpanContext {
    /// Record one correlation field; returns false for any other name.
    fn record(&mut self, name: &str, value: String) -> bool {
        match name {
            "run_id" => self.run_id = Some(value),
            "source" => self.source = Some(value),
            "stage" => self.stage = value.parse().ok(),
            _ => return false,
        }
        true
    }

    fn fill_missing(&mut self, parent: &SpanContext) {
        if self.run_id.is_none() {
            self.run_id.clone_from(&parent.run_id);
        }
        if self.source.is_none() {
            self.source.clone_from(&parent.source);
        }
        if self.stage.is_none() {
            self.stage = parent.stage;
        }
    }
}

/// A visitor that extracts field values from tracing events and spans.
#[derive(Default)]
struct JsonFieldVisitor {
    context: SpanContext,
    event: Option<String>,
    message: Option<String>,
    fields: serde_json::Map<String, serde_json::Value>,
}

impl JsonFieldVisitor {
    fn record_string(&mut self, field: &tracing::field::Field, value: String) {
        match field.name() {
            "message" => self.message = Some(value),
            "event" => self.event = Some(value),
            name => {
                if !self.context.record(name, value.clone()) {
                    self.fields
                        .insert(name.to_string(), serde_json::Value::String(value));
                }
            }
        }
    }
}

impl tracing::field::Visit for JsonFieldVisitor {
    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.record_string(field, value.to_string());
    }

    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.record_string(field, format!("{:?}", value));
    }

    fn record_i64(&mut self, field: &tracing::field::Field, value: i64) {
        self.fields
            .insert(field.name().to_string(), serde_json::Value::from(value));
    }

    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.fields
            .insert(field.name().to_string(), serde_json::Value::from(value));
    }

    fn record_f64(&mut self, field: &tracing::field::Field, value: f64) {
        if let Some(n) = serde_json::Number::from_f64(value) {
            self.fields
                .insert(field.name().to_string(), serde_json::Value::Number(n));
        }
    }

    fn record_bool(&mut self, field: &tracing::field::Field, value: bool) {
        self.fields
            .insert(field.name().to_string(), serde_json::Value::Bool(value));
    }
}

/// JSONL tracing layer that outputs to stderr.
pub struct JsonlLayer<W = io::Stderr> {
    writer: Mutex<W>,
}

impl JsonlLayer<io::Stderr> {
    /// Create a new JSONL layer writing to stderr.
    pub fn stderr() -> Self {
        JsonlLayer {
            writer: Mutex::new(io::stderr()),
        }
    }
}

impl<W: Write> JsonlLayer<W> {
    /// Create a new JSONL layer with a custom writer.
    pub fn new(writer: W) -> Self {
        JsonlLayer {
            writer: Mutex::new(writer),
        }
    }
}

impl<S, W> Layer<S> for JsonlLayer<W>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: Write + 'static,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let mut visitor = JsonFieldVisitor::default();
        attrs.record(&mut visitor);

        if let Some(span) = ctx.span(id) {
            span.extensions_mut().insert(visitor.context);
        }
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let mut visitor = JsonFieldVisitor::default();
        event.record(&mut visitor);

        // Event fields win; spans fill whatever the event left out, innermost first.
        let mut context = visitor.context;
        if let Some(scope) = ctx.event_scope(event) {
            for span in scope {
                if let Some(span_ctx) = span.extensions().get::<SpanContext>() {
                    context.fill_missing(span_ctx);
                }
            }
        }

        let level: Level = (*event.metadata().level()).into();
        let name = visitor
            .event
            .unwrap_or_else(|| event.metadata().target().to_string());
        let mut record = LogEvent::new(level, name);
        record.run_id = context.run_id;
        record.source = context.source;
        record.stage = context.stage;
        record.message = visitor.message;
        record.fields = visitor.fields.into_iter().collect();

        if let Ok(mut writer) = self.writer.lock() {
            let _ = writeln!(writer, "{}", record.to_jsonl());
        }
    }
}
