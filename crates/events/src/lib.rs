#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Event system for async communication in plaudit
//!
//! All output goes through events - no direct logging or printing is allowed
//! outside the CLI. The progress sink of an audit run is the receiving end of
//! an event channel.
//!
//! ## Architecture
//!
//! - **Domain-driven events**: Events grouped by functional domain (Fetch, Repo, Audit, ...)
//! - **Unified `EventEmitter` trait**: Single, consistent API for all event emissions
//! - **Metadata envelope**: Every event travels with an [`EventMeta`] for tracing correlation

pub mod meta;
pub use meta::{EventLevel, EventMeta, EventSource};

pub mod events;
pub use events::{
    AppEvent, AuditEvent, FailureContext, FetchEvent, GeneralEvent, ProgressEvent, RepoEvent,
};

use plaudit_types::{AuditSummary, RunPhase};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

/// An event together with its emission metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventMessage {
    pub meta: EventMeta,
    pub event: AppEvent,
}

impl EventMessage {
    /// Wrap an event, deriving level and source from the event itself
    #[must_use]
    pub fn new(event: AppEvent) -> Self {
        let meta = EventMeta::new(event.log_level(), event.event_source());
        Self { meta, event }
    }

    /// Wrap an event with a correlation id (typically the plugin id)
    #[must_use]
    pub fn correlated(event: AppEvent, correlation_id: impl Into<String>) -> Self {
        let mut message = Self::new(event);
        message.meta = message.meta.with_correlation_id(correlation_id);
        message
    }
}

/// Type alias for event sender
pub type EventSender = UnboundedSender<EventMessage>;

/// Type alias for event receiver
pub type EventReceiver = UnboundedReceiver<EventMessage>;

/// Create a new event channel
#[must_use]
pub fn channel() -> (EventSender, EventReceiver) {
    tokio::sync::mpsc::unbounded_channel()
}

/// The unified trait for emitting events throughout plaudit
///
/// This trait provides a single, consistent API for emitting events regardless of
/// whether you have a raw `EventSender` or a struct that contains one.
pub trait EventEmitter {
    /// Get the event sender for this emitter
    fn event_sender(&self) -> Option<&EventSender>;

    /// Emit an event through this emitter
    fn emit(&self, event: AppEvent) {
        self.emit_message(EventMessage::new(event));
    }

    /// Emit a fully built message
    fn emit_message(&self, message: EventMessage) {
        if let Some(sender) = self.event_sender() {
            // Ignore send errors - if receiver is dropped, we just continue
            let _ = sender.send(message);
        }
    }

    /// Emit an event correlated with one plugin
    fn emit_for_plugin(&self, plugin_id: &str, event: AppEvent) {
        self.emit_message(EventMessage::correlated(event, plugin_id));
    }

    /// Emit a debug log event
    fn emit_debug(&self, message: impl Into<String>) {
        self.emit(AppEvent::General(GeneralEvent::debug(message)));
    }

    /// Emit a warning event
    fn emit_warning(&self, message: impl Into<String>) {
        self.emit(AppEvent::General(GeneralEvent::warning(message)));
    }

    /// Emit a warning event with context
    fn emit_warning_with_context(&self, message: impl Into<String>, context: impl Into<String>) {
        self.emit(AppEvent::General(GeneralEvent::warning_with_context(
            message, context,
        )));
    }

    /// Emit an operation started event
    fn emit_operation_started(&self, operation: impl Into<String>) {
        self.emit(AppEvent::General(GeneralEvent::OperationStarted {
            operation: operation.into(),
        }));
    }

    /// Emit an operation completed event
    fn emit_operation_completed(&self, operation: impl Into<String>, success: bool) {
        self.emit(AppEvent::General(GeneralEvent::OperationCompleted {
            operation: operation.into(),
            success,
        }));
    }

    /// Emit a progress update to the progress sink
    fn emit_progress(
        &self,
        phase: RunPhase,
        percent: u8,
        message: impl Into<String>,
        summary: Option<AuditSummary>,
    ) {
        self.emit(AppEvent::Progress(ProgressEvent::Updated {
            phase,
            percent: percent.min(100),
            message: message.into(),
            summary,
        }));
    }
}

/// Implementation of `EventEmitter` for the raw `EventSender`
/// This allows `EventSender` to be used directly where `EventEmitter` is expected
impl EventEmitter for EventSender {
    fn event_sender(&self) -> Option<&EventSender> {
        Some(self)
    }
}

/// An emitter that may or may not be connected to a receiver
impl EventEmitter for Option<EventSender> {
    fn event_sender(&self) -> Option<&EventSender> {
        self.as_ref()
    }
}
