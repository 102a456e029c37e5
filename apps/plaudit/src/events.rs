//! Event handling and progress display

use console::{style, Term};
use plaudit_events::{AppEvent, AuditEvent, EventMessage, GeneralEvent, ProgressEvent, RepoEvent};

/// Renders run events on stderr
pub struct EventHandler {
    term: Term,
    colors: bool,
    /// Rewrite a single status line instead of printing one line per update
    live: bool,
    /// Suppress all console output (JSON mode)
    quiet: bool,
    line_open: bool,
}

impl EventHandler {
    pub fn new(colors: bool, live: bool, quiet: bool) -> Self {
        let term = Term::stderr();
        let live = live && term.is_term();
        Self {
            term,
            colors,
            live,
            quiet,
            line_open: false,
        }
    }

    /// Handle incoming event
    pub fn handle_event(&mut self, message: &EventMessage) {
        crate::logging::log_event_with_tracing(message);
        if self.quiet {
            return;
        }

        match &message.event {
            AppEvent::Progress(progress) => self.handle_progress(progress),
            AppEvent::General(GeneralEvent::Warning { message, context }) => {
                let text = match context {
                    Some(context) => format!("{message}: {context}"),
                    None => message.clone(),
                };
                self.show_warning(&text);
            }
            AppEvent::Repo(RepoEvent::ResolveFailed {
                plugin,
                failure,
                fallback,
                ..
            }) => {
                if *fallback {
                    self.show_warning(&format!(
                        "{plugin}: {} (using previous files)",
                        failure.message
                    ));
                } else {
                    self.show_warning(&format!("{plugin}: {}", failure.message));
                }
            }
            AppEvent::Audit(AuditEvent::LockfileSynthesisFailed { plugin, failure }) => {
                self.show_warning(&format!(
                    "{plugin}: could not generate lockfile: {}",
                    failure.message
                ));
            }
            _ => {}
        }
    }

    fn handle_progress(&mut self, event: &ProgressEvent) {
        match event {
            ProgressEvent::Updated {
                percent, message, ..
            } => {
                let line = format!("[{percent:>3}%] {message}");
                if self.live {
                    let _ = self.term.clear_line();
                    let _ = self.term.write_str(&line);
                    self.line_open = true;
                } else {
                    let _ = self.term.write_line(&line);
                }
            }
            ProgressEvent::Completed { message, duration, .. } => {
                self.close_line();
                let line = format!("{message} ({:.1}s)", duration.as_secs_f64());
                let _ = self
                    .term
                    .write_line(&style(line).green().force_styling(self.colors).to_string());
            }
            ProgressEvent::Failed { message, failure } => {
                self.close_line();
                let text = match &failure.hint {
                    Some(hint) => format!("{message}\n  Hint: {hint}"),
                    None => message.clone(),
                };
                self.show_error(&text);
            }
        }
    }

    fn close_line(&mut self) {
        if self.line_open {
            let _ = self.term.clear_line();
            self.line_open = false;
        }
    }

    fn show_warning(&mut self, message: &str) {
        self.close_line();
        let _ = self.term.write_line(
            &style(format!("warning: {message}"))
                .yellow()
                .force_styling(self.colors)
                .to_string(),
        );
    }

    fn show_error(&mut self, message: &str) {
        self.close_line();
        let _ = self.term.write_line(
            &style(format!("error: {message}"))
                .red()
                .force_styling(self.colors)
                .to_string(),
        );
    }
}
