use std::fmt::{self, Write as _};
use std::sync::PoisonError;

use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;

use crate::log::{LogLevel, SharedEventLog};

/// `tracing` layer copying events into an [`EventLog`](crate::EventLog).
///
/// Only events at `INFO` or above whose target starts with one of the
/// configured prefixes are kept, so dependency chatter (hyper, reqwest)
/// stays out of the operator log.
pub struct EventLogLayer {
    log: SharedEventLog,
    targets: Vec<String>,
}

impl EventLogLayer {
    /// Creates a layer forwarding the given target prefixes into `log`.
    pub fn new<I, T>(log: SharedEventLog, targets: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            log,
            targets: targets.into_iter().map(Into::into).collect(),
        }
    }

    fn accepts(&self, target: &str, level: &Level) -> bool {
        *level <= Level::INFO && self.targets.iter().any(|t| target.starts_with(t.as_str()))
    }
}

impl<S> Layer<S> for EventLogLayer
where
    S: Subscriber,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let meta = event.metadata();
        if !self.accepts(meta.target(), meta.level()) {
            return;
        }

        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);

        let level = match *meta.level() {
            Level::ERROR => LogLevel::Error,
            Level::WARN => LogLevel::Warn,
            _ => LogLevel::Info,
        };
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(level, visitor.finish());
    }
}

/// Collects the `message` field plus `key=value` pairs for the rest.
#[derive(Default)]
struct MessageVisitor {
    message: String,
    fields: String,
}

impl MessageVisitor {
    fn finish(self) -> String {
        match (self.message.is_empty(), self.fields.is_empty()) {
            (_, true) => self.message,
            (true, false) => self.fields,
            (false, false) => format!("{} {}", self.message, self.fields),
        }
    }

    fn push_field(&mut self, name: &str, value: fmt::Arguments<'_>) {
        if !self.fields.is_empty() {
            self.fields.push(' ');
        }
        let _ = write!(self.fields, "{name}={value}");
    }
}

impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.push_field(field.name(), format_args!("{value}"));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        } else {
            self.push_field(field.name(), format_args!("{value:?}"));
        }
    }
}
