//! Output rendering and formatting

use comfy_table::{presets::UTF8_FULL, Attribute, Cell, Color, ContentArrangement, Table};
use console::Term;
use plaudit_ops::{OperationResult, RunResult};
use plaudit_types::{AuditOutcome, AuditResults, AuditSummary, ColorChoice, PluginAudit, PluginRecord, Severity};
use std::collections::HashMap;
use std::io;

/// Output renderer for CLI results
#[derive(Clone)]
pub struct OutputRenderer {
    /// Use JSON output format
    json_output: bool,
    /// Color configuration
    color_choice: ColorChoice,
    /// Terminal instance
    term: Term,
}

impl OutputRenderer {
    /// Create new output renderer
    pub fn new(json_output: bool, color_choice: ColorChoice) -> Self {
        Self {
            json_output,
            color_choice,
            term: Term::stdout(),
        }
    }

    /// Render operation result
    pub fn render_result(&self, result: &OperationResult) -> io::Result<()> {
        if self.json_output {
            self.render_json(result)
        } else {
            self.render_table(result)
        }
    }

    fn render_json(&self, result: &OperationResult) -> io::Result<()> {
        let json = result.to_json().map_err(io::Error::other)?;
        self.term.write_line(&json)
    }

    fn render_table(&self, result: &OperationResult) -> io::Result<()> {
        match result {
            OperationResult::AuditRun(run) => self.render_run(run),
            OperationResult::Report { results, plugins } => self.render_report(results, plugins),
            OperationResult::Log(log) => self.render_log(log),
        }
    }

    fn render_run(&self, run: &RunResult) -> io::Result<()> {
        if run.plugins.is_empty() {
            return self.term.write_line(&run.message);
        }

        let links: HashMap<&str, &PluginRecord> =
            run.records.iter().map(|r| (r.id.as_str(), r)).collect();
        let mut plugins: Vec<&PluginAudit> = run.plugins.iter().collect();
        plugins.sort_by_key(|p| std::cmp::Reverse(p.outcome.severity()));

        let mut table = self.table(&["Plugin", "Result", "Support"]);
        for plugin in plugins {
            let support = links
                .get(plugin.id.as_str())
                .and_then(|r| r.support_link.as_deref())
                .unwrap_or("-");
            table.add_row(vec![
                Cell::new(&plugin.name),
                self.outcome_cell(&plugin.outcome),
                Cell::new(support),
            ]);
        }
        self.term.write_line(&table.to_string())?;
        self.term.write_line("")?;
        self.render_summary(&run.summary)
    }

    fn render_report(&self, results: &AuditResults, plugins: &[PluginAudit]) -> io::Result<()> {
        self.term.write_line(&format!(
            "Last audit: {}",
            results.completed_at.format("%Y-%m-%d %H:%M:%S UTC")
        ))?;
        self.term.write_line("")?;

        if plugins.is_empty() {
            self.term.write_line("No plugins match.")?;
        } else {
            let mut table = self.table(&["Plugin", "Id", "Result"]);
            for plugin in plugins {
                table.add_row(vec![
                    Cell::new(&plugin.name),
                    Cell::new(&plugin.id),
                    self.outcome_cell(&plugin.outcome),
                ]);
            }
            self.term.write_line(&table.to_string())?;
        }
        self.term.write_line("")?;
        self.render_summary(&results.summary)
    }

    fn render_log(&self, log: &str) -> io::Result<()> {
        if log.is_empty() {
            return self.term.write_line("The last run produced no audit log.");
        }
        self.term.write_str(log)
    }

    fn render_summary(&self, summary: &AuditSummary) -> io::Result<()> {
        let rows = [
            ("Critical", summary.critical, Some(Severity::Critical)),
            ("High", summary.high, Some(Severity::High)),
            ("Moderate", summary.moderate, Some(Severity::Moderate)),
            ("Low", summary.low, Some(Severity::Low)),
            ("Info", summary.info, Some(Severity::Info)),
            ("No issues", summary.no_issues, Some(Severity::Clean)),
            ("Failed download", summary.failed_download, None),
            ("Audit incomplete", summary.audit_incomplete, None),
            ("No repository", summary.no_repo, None),
        ];

        let mut table = self.table(&["Category", "Plugins"]);
        for (label, count, severity) in rows {
            let mut label = Cell::new(label);
            if let (Some(severity), true) = (severity, count > 0) {
                label = self.color(label, severity);
            }
            table.add_row(vec![label, Cell::new(count)]);
        }
        table.add_row(vec![
            Cell::new("Total").add_attribute(Attribute::Bold),
            Cell::new(summary.total()).add_attribute(Attribute::Bold),
        ]);
        self.term.write_line(&table.to_string())
    }

    fn table(&self, headers: &[&str]) -> Table {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic);
        if !self.supports_color() {
            table.force_no_tty();
        }
        table.set_header(
            headers
                .iter()
                .map(|h| Cell::new(h).add_attribute(Attribute::Bold))
                .collect::<Vec<_>>(),
        );
        table
    }

    fn outcome_cell(&self, outcome: &AuditOutcome) -> Cell {
        match outcome {
            AuditOutcome::Audited { severity, .. } => {
                self.color(Cell::new(format_severity(*severity)), *severity)
            }
            AuditOutcome::DownloadFailed { reason } => {
                Cell::new(format!("download failed: {reason}"))
            }
            AuditOutcome::AuditIncomplete { reason } => {
                Cell::new(format!("audit incomplete: {reason}"))
            }
            AuditOutcome::NoRepository => Cell::new("no repository"),
        }
    }

    fn color(&self, cell: Cell, severity: Severity) -> Cell {
        if !self.supports_color() {
            return cell;
        }
        match severity {
            Severity::Critical => cell.fg(Color::Red).add_attribute(Attribute::Bold),
            Severity::High => cell.fg(Color::Red),
            Severity::Moderate => cell.fg(Color::Yellow),
            Severity::Low | Severity::Info => cell.fg(Color::Cyan),
            Severity::Clean => cell.fg(Color::Green),
        }
    }

    /// Check if color output is supported
    fn supports_color(&self) -> bool {
        match self.color_choice {
            ColorChoice::Always => true,
            ColorChoice::Never => false,
            ColorChoice::Auto => self.term.features().colors_supported(),
        }
    }
}

fn format_severity(severity: Severity) -> &'static str {
    match severity {
        Severity::Clean => "no issues",
        other => other.as_str(),
    }
}
