//! Structured logging integration for events
//!
//! Converts run events into tracing records with structured fields so the
//! JSON debug log carries the same information as the console.

use plaudit_events::{AppEvent, AuditEvent, EventMessage, FetchEvent, GeneralEvent, ProgressEvent, RepoEvent};
use tracing::{debug, error, info, trace, warn};

/// Log an event through tracing with structured fields
pub fn log_event_with_tracing(message: &EventMessage) {
    let event = &message.event;
    let meta = &message.meta;

    match event {
        AppEvent::Fetch(fetch_event) => match fetch_event {
            FetchEvent::Probed {
                path,
                url,
                exists,
                last_modified,
            } => {
                debug!(
                    source = meta.source.as_str(),
                    event_id = %meta.event_id,
                    correlation = ?meta.correlation_id,
                    path = %path,
                    url = %url,
                    exists = exists,
                    last_modified = ?last_modified,
                    "Remote probed"
                );
            }
            FetchEvent::CacheHit { path } => {
                debug!(
                    source = meta.source.as_str(),
                    correlation = ?meta.correlation_id,
                    path = %path,
                    "Cached copy reused"
                );
            }
            FetchEvent::Downloaded { path, url, bytes } => {
                info!(
                    source = meta.source.as_str(),
                    event_id = %meta.event_id,
                    correlation = ?meta.correlation_id,
                    path = %path,
                    url = %url,
                    bytes = bytes,
                    "Downloaded"
                );
            }
            FetchEvent::Missing { path, url } => {
                info!(
                    source = meta.source.as_str(),
                    correlation = ?meta.correlation_id,
                    path = %path,
                    url = %url,
                    "Remote file absent"
                );
            }
            FetchEvent::Failed { path, url, failure } => {
                warn!(
                    source = meta.source.as_str(),
                    event_id = %meta.event_id,
                    correlation = ?meta.correlation_id,
                    path = %path,
                    url = %url,
                    retryable = failure.retryable,
                    code = ?failure.code,
                    message = %failure.message,
                    "Fetch failed"
                );
            }
        },

        AppEvent::Repo(repo_event) => match repo_event {
            RepoEvent::ResolveStarted { plugin, repo } => {
                debug!(
                    source = meta.source.as_str(),
                    plugin = %plugin,
                    repo = %repo,
                    "Resolving repository"
                );
            }
            RepoEvent::Resolved {
                plugin,
                repo,
                branch,
                changed,
            } => {
                info!(
                    source = meta.source.as_str(),
                    event_id = %meta.event_id,
                    plugin = %plugin,
                    repo = %repo,
                    branch = %branch,
                    changed = changed,
                    "Repository resolved"
                );
            }
            RepoEvent::ResolveFailed {
                plugin,
                repo,
                failure,
                fallback,
            } => {
                warn!(
                    source = meta.source.as_str(),
                    event_id = %meta.event_id,
                    plugin = %plugin,
                    repo = %repo,
                    code = ?failure.code,
                    message = %failure.message,
                    fallback = fallback,
                    "Repository lookup failed"
                );
            }
        },

        AppEvent::Audit(audit_event) => match audit_event {
            AuditEvent::PluginCompleted {
                plugin,
                category,
                severity,
            } => {
                info!(
                    source = meta.source.as_str(),
                    event_id = %meta.event_id,
                    plugin = %plugin,
                    category = ?category,
                    severity = ?severity,
                    "Plugin audited"
                );
            }
            AuditEvent::LockfileSynthesisFailed { plugin, failure } => {
                warn!(
                    source = meta.source.as_str(),
                    plugin = %plugin,
                    code = ?failure.code,
                    message = %failure.message,
                    "Lockfile generation failed"
                );
            }
            AuditEvent::RunCompleted {
                plugins_audited,
                summary,
            } => {
                info!(
                    source = meta.source.as_str(),
                    event_id = %meta.event_id,
                    plugins = plugins_audited,
                    summary = %summary,
                    "Audit pass completed"
                );
            }
            other => {
                debug!(source = meta.source.as_str(), event = ?other, "Audit event");
            }
        },

        AppEvent::Progress(progress_event) => match progress_event {
            ProgressEvent::Updated {
                phase,
                percent,
                message,
                ..
            } => {
                trace!(
                    source = meta.source.as_str(),
                    phase = %phase,
                    percent = percent,
                    message = %message,
                    "Progress"
                );
            }
            ProgressEvent::Completed {
                message,
                summary,
                duration,
            } => {
                info!(
                    source = meta.source.as_str(),
                    event_id = %meta.event_id,
                    message = %message,
                    summary = %summary,
                    duration_ms = duration.as_millis(),
                    "Run completed"
                );
            }
            ProgressEvent::Failed { message, failure } => {
                error!(
                    source = meta.source.as_str(),
                    event_id = %meta.event_id,
                    message = %message,
                    code = ?failure.code,
                    hint = ?failure.hint,
                    "Run failed"
                );
            }
        },

        AppEvent::General(general_event) => match general_event {
            GeneralEvent::Warning { message, context } => {
                warn!(
                    source = meta.source.as_str(),
                    event_id = %meta.event_id,
                    correlation = ?meta.correlation_id,
                    message = %message,
                    context = ?context,
                    "Warning"
                );
            }
            GeneralEvent::Debug { message } => {
                debug!(
                    source = meta.source.as_str(),
                    correlation = ?meta.correlation_id,
                    message = %message,
                    "Debug"
                );
            }
            GeneralEvent::OperationStarted { operation } => {
                info!(source = meta.source.as_str(), operation = %operation, "Operation started");
            }
            GeneralEvent::OperationCompleted { operation, success } => {
                if *success {
                    info!(source = meta.source.as_str(), operation = %operation, "Operation completed");
                } else {
                    warn!(source = meta.source.as_str(), operation = %operation, "Operation completed with issues");
                }
            }
        },
    }
}
