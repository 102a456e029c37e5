//! The audit run state machine
//!
//! `Idle -> ResolvingInstalledList -> BuildingManifest -> AcquiringFiles ->
//! RunningAudits -> Persisting -> Done`, with `Failed` reachable from any
//! state on a structural error. Per-plugin failures become outcomes.

use crate::{OpsCtx, RunContext, RunResult};
use chrono::Utc;
use futures::stream::{self, StreamExt};
use plaudit_acquire::{build_records, load_registry, ManifestAcquirer};
use plaudit_audit::{emit_plugin_completed, fold, AuditRunner};
use plaudit_errors::{Error, NetworkError, OpsError};
use plaudit_events::{
    AppEvent, AuditEvent, EventEmitter, FailureContext, ProgressEvent, RepoEvent,
};
use plaudit_store::{
    read_installed_list, read_manifest, write_log, write_manifest, write_results, FetchCache,
    MANIFEST_FILE,
};
use plaudit_types::{AuditOutcome, AuditSummary, PluginAudit, PluginRecord, RunPhase};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Instant;

const RESOLVING: (u8, u8) = (0, 5);
const MANIFEST: (u8, u8) = (5, 10);
const ACQUIRING: (u8, u8) = (10, 60);
const AUDITING: (u8, u8) = (60, 95);
const PERSISTING: (u8, u8) = (95, 100);

/// Where a plugin stands after the acquisition pass
enum Staged {
    /// Working directory ready for the audit tool
    Ready(PathBuf),
    /// Outcome already decided
    Decided(AuditOutcome),
}

/// Percentage of the way through `band` after `done` of `total` steps
fn band_percent((start, end): (u8, u8), done: usize, total: usize) -> u8 {
    if total == 0 {
        return end;
    }
    let span = usize::from(end - start);
    let offset = span * done.min(total) / total;
    start + u8::try_from(offset).unwrap_or(end - start)
}

/// Run one audit end to end
///
/// # Errors
///
/// Returns structural errors (unreadable installed list, unwritable cache
/// directory) and `Error::Cancelled` when the run was cancelled. Per-plugin
/// failures never surface here.
pub async fn run_audit(ctx: &OpsCtx, run: RunContext) -> Result<RunResult, Error> {
    ctx.tx.emit_operation_started("audit");
    let mut orchestrator = Orchestrator::new(ctx, run);
    let started = Instant::now();
    let result = orchestrator.execute().await;
    ctx.tx.emit_operation_completed("audit", result.is_ok());

    match &result {
        Ok(outcome) => {
            ctx.tx.emit(AppEvent::Progress(ProgressEvent::Completed {
                message: outcome.message.clone(),
                summary: outcome.summary,
                duration: started.elapsed(),
            }));
        }
        Err(e) => orchestrator.fail(e),
    }
    result
}

/// Drives one run through its phases
pub struct Orchestrator<'a> {
    ctx: &'a OpsCtx,
    run: RunContext,
    phase: RunPhase,
    percent: AtomicU8,
}

impl<'a> Orchestrator<'a> {
    #[must_use]
    pub fn new(ctx: &'a OpsCtx, run: RunContext) -> Self {
        Self {
            ctx,
            run,
            phase: RunPhase::Idle,
            percent: AtomicU8::new(0),
        }
    }

    #[must_use]
    pub fn phase(&self) -> &RunPhase {
        &self.phase
    }

    fn transition(&mut self, phase: RunPhase, percent: u8, message: impl Into<String>) {
        self.phase = phase;
        self.report(percent, message, None);
    }

    fn report(&self, percent: u8, message: impl Into<String>, summary: Option<AuditSummary>) {
        // Never move backwards
        let percent = percent.min(100);
        let current = self.percent.fetch_max(percent, Ordering::Relaxed).max(percent);
        self.ctx
            .tx
            .emit_progress(self.phase.clone(), current, message, summary);
    }

    fn fail(&mut self, error: &Error) {
        let message = match error {
            Error::Cancelled => "Audit cancelled".to_string(),
            other => other.to_string(),
        };
        self.phase = RunPhase::Failed(message.clone());
        self.ctx.tx.emit(AppEvent::Progress(ProgressEvent::Failed {
            message,
            failure: FailureContext::from_error(error),
        }));
    }

    fn check_cancelled(&self) -> Result<(), Error> {
        if self.run.cancel.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Execute every phase
    ///
    /// # Errors
    ///
    /// See [`run_audit`].
    pub async fn execute(&mut self) -> Result<RunResult, Error> {
        self.transition(
            RunPhase::ResolvingInstalledList,
            RESOLVING.0,
            "Reading installed plugins",
        );
        let installed = read_installed_list(&self.run.installed_plugins).await?;

        if installed.is_empty() {
            self.ensure_cache_dir().await?;
            self.transition(RunPhase::Done, 100, "No plugins installed");
            return Ok(RunResult {
                completed_at: Utc::now(),
                message: "No plugins installed".to_string(),
                summary: AuditSummary::default(),
                plugins: Vec::new(),
                records: Vec::new(),
                log: String::new(),
            });
        }

        self.transition(
            RunPhase::BuildingManifest,
            MANIFEST.0,
            format!("Building manifest for {} plugins", installed.len()),
        );
        self.ensure_cache_dir().await?;
        let cache = Arc::new(self.load_fetch_cache().await);
        let records = self.build_manifest(&installed, &cache).await?;
        self.check_cancelled()?;

        self.transition(
            RunPhase::AcquiringFiles,
            ACQUIRING.0,
            "Fetching plugin manifests",
        );
        let (records, staged) = self.acquire_all(records, cache).await?;
        // Watermarks match the files on disk from here on, even if cancelled
        write_manifest(&self.ctx.layout, &records).await?;

        self.transition(RunPhase::RunningAudits, AUDITING.0, "Running audits");
        let audits = self.audit_all(&records, staged).await?;

        self.transition(RunPhase::Persisting, PERSISTING.0, "Saving results");
        let (summary, log) = fold(&audits);
        let result = RunResult {
            completed_at: Utc::now(),
            message: format!("Audit complete: {summary}"),
            summary,
            plugins: audits,
            records,
            log: log.render(),
        };
        self.persist(&result).await?;

        self.phase = RunPhase::Done;
        self.report(100, result.message.clone(), Some(summary));
        Ok(result)
    }

    async fn ensure_cache_dir(&self) -> Result<(), Error> {
        self.ctx.layout.ensure().await.map_err(|e| {
            OpsError::Structural {
                message: format!(
                    "cannot create cache directory {}: {e}",
                    self.ctx.layout.root().display()
                ),
            }
            .into()
        })
    }

    async fn load_fetch_cache(&self) -> FetchCache {
        let path = self.ctx.layout.cache_metadata();
        match FetchCache::load(path.clone()).await {
            Ok(cache) => cache,
            Err(e) => {
                self.ctx
                    .tx
                    .emit_warning_with_context("discarding unreadable fetch cache", e.to_string());
                FetchCache::empty(path)
            }
        }
    }

    async fn build_manifest(
        &self,
        installed: &[String],
        cache: &FetchCache,
    ) -> Result<Vec<PluginRecord>, Error> {
        let prior = match read_manifest(&self.ctx.layout).await {
            Ok(prior) => prior,
            Err(e) => {
                self.ctx
                    .tx
                    .emit_warning_with_context("discarding unreadable installed manifest", e.to_string());
                Vec::new()
            }
        };

        let registry = load_registry(
            &self.ctx.net,
            cache,
            &self.ctx.layout,
            &self.ctx.config.network.registry_url,
            &self.ctx.tx,
        )
        .await?;
        if registry.is_none() {
            self.ctx
                .tx
                .emit_warning("no registry snapshot available, using previous manifest");
        }

        let records = build_records(installed, registry.as_deref(), &prior);
        self.report(MANIFEST.1, format!("Manifest ready: {} plugins", records.len()), None);
        Ok(records)
    }

    async fn acquire_all(
        &self,
        records: Vec<PluginRecord>,
        cache: Arc<FetchCache>,
    ) -> Result<(Vec<PluginRecord>, Vec<Staged>), Error> {
        let acquirer = ManifestAcquirer::new(
            self.ctx.net.clone(),
            cache,
            self.ctx.layout.clone(),
            self.ctx.config.network.raw_base.clone(),
        )
        .with_synthesizer(self.ctx.audit_tool.clone());

        let total = records.len();
        let jobs = self.run.jobs.max(1);
        let acquirer = &acquirer;

        // `buffered` keeps input order while running up to `jobs` tasks
        let mut tasks = stream::iter(records.into_iter().map(|record| async move {
            if self.run.cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
            self.acquire_plugin(acquirer, record).await
        }))
        .buffered(jobs);

        let mut records = Vec::with_capacity(total);
        let mut staged = Vec::with_capacity(total);
        while let Some(result) = tasks.next().await {
            let (record, stage) = result?;
            self.report(
                band_percent(ACQUIRING, records.len() + 1, total),
                format!("Fetched {}", record.name),
                None,
            );
            records.push(record);
            staged.push(stage);
        }
        Ok((records, staged))
    }

    async fn acquire_plugin(
        &self,
        acquirer: &ManifestAcquirer,
        mut record: PluginRecord,
    ) -> Result<(PluginRecord, Staged), Error> {
        let tx = &self.ctx.tx;
        let slug = match record.slug() {
            Ok(Some(slug)) => slug,
            Ok(None) => return Ok((record, Staged::Decided(AuditOutcome::NoRepository))),
            Err(e) => {
                return Ok((
                    record,
                    Staged::Decided(AuditOutcome::download_failed(e.to_string())),
                ))
            }
        };

        let resolution = self
            .ctx
            .resolver
            .resolve_for_plugin(
                &record.id,
                &slug,
                record.last_updated,
                self.run.credential.as_deref(),
                tx,
            )
            .await;

        let resolution = match resolution {
            Ok(resolution) => resolution,
            Err(e) => {
                let stage = self.fallback(acquirer, &record, &e).await;
                tx.emit_for_plugin(
                    &record.id,
                    AppEvent::Repo(RepoEvent::ResolveFailed {
                        plugin: record.id.clone(),
                        repo: slug.to_string(),
                        failure: FailureContext::from_error(&e),
                        fallback: matches!(stage, Staged::Ready(_)),
                    }),
                );
                return Ok((record, stage));
            }
        };

        record.default_branch = Some(resolution.branch.clone());
        match acquirer
            .acquire(&record.id, &slug, &resolution.branch, resolution.changed, tx)
            .await
        {
            Ok(status) if status.primary_ok => {
                record.last_updated = resolution.pushed_at;
                let dir = acquirer.working_dir(&record.id)?;
                Ok((record, Staged::Ready(dir)))
            }
            Ok(_) => {
                let reason = format!(
                    "{MANIFEST_FILE} not found in {slug} on branch {}",
                    resolution.branch
                );
                Ok((record, Staged::Decided(AuditOutcome::download_failed(reason))))
            }
            Err(e @ (Error::Storage(_) | Error::Io { .. })) => Err(OpsError::Structural {
                message: format!("cannot write cache directory: {e}"),
            }
            .into()),
            Err(e) => Ok((
                record,
                Staged::Decided(AuditOutcome::download_failed(e.to_string())),
            )),
        }
    }

    /// Reuse the previous run's working directory after a recoverable lookup failure
    async fn fallback(
        &self,
        acquirer: &ManifestAcquirer,
        record: &PluginRecord,
        error: &Error,
    ) -> Staged {
        let recoverable = match error {
            Error::Repo(e) => e.allows_cache_fallback(),
            Error::Network(NetworkError::InvalidUrl(_)) => false,
            Error::Network(_) => true,
            _ => false,
        };
        let failed = || Staged::Decided(AuditOutcome::download_failed(error.to_string()));

        if !recoverable || record.default_branch.is_none() {
            return failed();
        }
        let Ok(dir) = acquirer.working_dir(&record.id) else {
            return failed();
        };
        if tokio::fs::try_exists(dir.join(MANIFEST_FILE))
            .await
            .unwrap_or(false)
        {
            self.ctx.tx.emit_warning_with_context(
                format!("{}: using cached files from the previous run", record.id),
                error.to_string(),
            );
            Staged::Ready(dir)
        } else {
            failed()
        }
    }

    async fn audit_all(
        &self,
        records: &[PluginRecord],
        staged: Vec<Staged>,
    ) -> Result<Vec<PluginAudit>, Error> {
        let runner = AuditRunner::new(self.ctx.audit_tool.clone());
        let total = records.len();
        self.ctx.tx.emit(AppEvent::Audit(AuditEvent::RunStarted {
            plugin_count: total,
        }));

        let mut audits: Vec<PluginAudit> = Vec::with_capacity(total);
        for (index, (record, stage)) in records.iter().zip(staged).enumerate() {
            self.check_cancelled()?;

            let outcome = match stage {
                Staged::Decided(outcome) => outcome,
                Staged::Ready(dir) => {
                    self.ctx.tx.emit_for_plugin(
                        &record.id,
                        AppEvent::Audit(AuditEvent::PluginStarted {
                            plugin: record.id.clone(),
                        }),
                    );
                    runner.audit(&dir).await
                }
            };

            let audit = PluginAudit {
                id: record.id.clone(),
                name: record.name.clone(),
                outcome,
            };
            emit_plugin_completed(&self.ctx.tx, &audit);
            audits.push(audit);

            let running = AuditSummary::from_outcomes(audits.iter().map(|a| &a.outcome));
            self.report(
                band_percent(AUDITING, index + 1, total),
                format!("Audited {}", record.name),
                Some(running),
            );
        }

        self.ctx.tx.emit(AppEvent::Audit(AuditEvent::RunCompleted {
            plugins_audited: audits.len(),
            summary: AuditSummary::from_outcomes(audits.iter().map(|a| &a.outcome)),
        }));
        Ok(audits)
    }

    async fn persist(&self, result: &RunResult) -> Result<(), Error> {
        let layout = &self.ctx.layout;
        write_results(layout, &result.to_results()).await?;
        write_log(layout, &result.log).await?;
        Ok(())
    }
}
