//! Observability for the provisioning core
//!
//! - Structured logging (JSON lines on stderr)
//! - Typed lifecycle events
//! - Begin/complete scopes for multi-step operations
//!
//! Observability is read-only: it never changes the outcome of the
//! operation it describes, and a failed log write is ignored.

mod events;
mod logger;
mod scope;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use scope::ObservationScope;

/// Log a lifecycle event against one instance
pub fn log_event(event: Event, instance: &str, fields: &[(&str, &str)]) {
    let severity = if event.needs_attention() {
        Severity::Warn
    } else {
        Severity::Info
    };
    let mut all_fields = Vec::with_capacity(fields.len() + 1);
    all_fields.push(("instance", instance));
    all_fields.extend(fields.iter().copied());
    Logger::log(severity, event.as_str(), &all_fields);
}

/// Log a per-step detail event against one instance at TRACE
pub fn trace_event(event: Event, instance: &str, fields: &[(&str, &str)]) {
    let mut all_fields = Vec::with_capacity(fields.len() + 1);
    all_fields.push(("instance", instance));
    all_fields.extend(fields.iter().copied());
    Logger::trace(event.as_str(), &all_fields);
}
