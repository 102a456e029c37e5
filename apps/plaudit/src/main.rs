//! plaudit - dependency audits for installed Obsidian community plugins
//!
//! The CLI loads configuration, wires the operations context and renders
//! whatever the ops crate returns while streaming run events to the console.

mod cli;
mod display;
mod error;
mod events;
mod logging;

use crate::cli::{Cli, Commands};
use crate::display::OutputRenderer;
use crate::error::CliError;
use crate::events::EventHandler;
use clap::Parser;
use plaudit_config::Config;
use plaudit_events::{EventReceiver, EventSender};
use plaudit_ops::{OperationResult, OpsContextBuilder, OpsCtx, RunContext};
use plaudit_types::{ColorChoice, OutputFormat};
use std::path::Path;
use std::process;
use tokio::select;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Exit status when `--fail-on` is reached
const EXIT_THRESHOLD: i32 = 2;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let json_mode = cli.global.json;

    match run(cli).await {
        Ok(code) => process::exit(code),
        Err(e) => {
            error!("Application error: {}", e);
            if !json_mode {
                eprintln!("Error: {e}");
            }
            process::exit(1);
        }
    }
}

/// Main application logic, returns the process exit status
async fn run(cli: Cli) -> Result<i32, CliError> {
    // 1. File config (or defaults)
    let mut config = Config::load_or_default(cli.global.config.as_deref())
        .await
        .map_err(CliError::Config)?;

    // 2. Environment
    config.merge_env().map_err(CliError::Config)?;

    // 3. CLI flags (highest precedence)
    apply_cli_config(&mut config, &cli.global, &cli.command)?;

    let json_mode = cli.global.json || config.general.default_output == OutputFormat::Json;
    init_tracing(json_mode, cli.global.debug, &config.logs_dir());
    info!("Starting plaudit v{}", env!("CARGO_PKG_VERSION"));

    let (event_sender, event_receiver) = plaudit_events::channel();
    let ops_ctx = build_ops_context(event_sender, config.clone())?;

    let renderer = OutputRenderer::new(json_mode, config.general.color);
    let colors_enabled = match config.general.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => console::Term::stderr().features().colors_supported(),
    };
    let live = config.general.default_output == OutputFormat::Tty;
    let mut event_handler = EventHandler::new(colors_enabled, live, json_mode);

    let cancel = CancellationToken::new();
    spawn_interrupt_handler(cancel.clone());

    let threshold = cli.command.fail_threshold();
    let result = execute_command_with_events(
        cli.command,
        &ops_ctx,
        cancel,
        event_receiver,
        &mut event_handler,
    )
    .await?;

    renderer.render_result(&result)?;

    if let (Some(threshold), OperationResult::AuditRun(run)) = (threshold, &result) {
        if plaudit_ops::exceeds_threshold(&run.plugins, threshold) {
            info!("Severity threshold {} reached", threshold);
            return Ok(EXIT_THRESHOLD);
        }
    }

    info!("Command completed successfully");
    Ok(0)
}

/// Cancel the run on Ctrl-C; in-flight work finishes its current step
fn spawn_interrupt_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, cancelling");
            cancel.cancel();
        }
    });
}

/// Execute command with concurrent event handling
async fn execute_command_with_events(
    command: Commands,
    ctx: &OpsCtx,
    cancel: CancellationToken,
    mut event_receiver: EventReceiver,
    event_handler: &mut EventHandler,
) -> Result<OperationResult, CliError> {
    let mut command_future = Box::pin(execute_command(command, ctx, cancel));

    loop {
        select! {
            result = &mut command_future => {
                // Drain any remaining events
                while let Ok(event) = event_receiver.try_recv() {
                    event_handler.handle_event(&event);
                }
                return result;
            }

            event = event_receiver.recv() => {
                if let Some(event) = event {
                    event_handler.handle_event(&event);
                }
            }
        }
    }
}

/// Execute the specified command
async fn execute_command(
    command: Commands,
    ctx: &OpsCtx,
    cancel: CancellationToken,
) -> Result<OperationResult, CliError> {
    match command {
        Commands::Audit {
            installed,
            token,
            jobs,
            fail_on: _,
        } => {
            let installed = installed.unwrap_or_else(|| ctx.config.installed_plugins_path());
            let run = RunContext::new(installed)
                .with_credential(token.or_else(|| ctx.config.network.github_token.clone()))
                .with_jobs(jobs.unwrap_or(ctx.config.general.parallel_fetches))
                .with_cancellation(cancel);
            let result = plaudit_ops::run_audit(ctx, run).await?;
            Ok(OperationResult::AuditRun(result))
        }

        Commands::Report { min_severity } => {
            let results = plaudit_ops::load_results(ctx).await?;
            let plugins = plaudit_ops::select_plugins(&results, min_severity);
            Ok(OperationResult::Report { results, plugins })
        }

        Commands::Log => {
            let log = plaudit_ops::read_log(ctx).await?;
            Ok(OperationResult::Log(log))
        }
    }
}

/// Build operations context with all required components
fn build_ops_context(event_sender: EventSender, config: Config) -> Result<OpsCtx, CliError> {
    let ctx = OpsContextBuilder::new()
        .with_event_sender(event_sender)
        .with_config(config)
        .build()?;
    Ok(ctx)
}

/// Initialize tracing/logging
fn init_tracing(json_mode: bool, debug_enabled_flag: bool, log_dir: &Path) {
    let debug_enabled = std::env::var("RUST_LOG").is_ok() || debug_enabled_flag;

    if debug_enabled {
        // Debug mode: structured JSON logs to file
        if let Err(e) = std::fs::create_dir_all(log_dir) {
            if !json_mode {
                eprintln!("Warning: Failed to create log directory: {e}");
            }
        }

        let log_file = log_dir.join(format!(
            "plaudit-{}.log",
            chrono::Utc::now().format("%Y%m%d-%H%M%S")
        ));

        match std::fs::File::create(&log_file) {
            Ok(file) => {
                tracing_subscriber::fmt()
                    .json()
                    .with_writer(file)
                    .with_env_filter(
                        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(
                            |_| tracing_subscriber::EnvFilter::new("info,plaudit=debug,plaudit_ops=debug"),
                        ),
                    )
                    .init();

                if !json_mode {
                    eprintln!("Debug logging enabled: {}", log_file.display());
                }
                return;
            }
            Err(e) => {
                if !json_mode {
                    eprintln!("Warning: Failed to create log file: {e}");
                }
            }
        }
    }

    if json_mode {
        // Keep stdout clean for the JSON document
        tracing_subscriber::fmt()
            .with_writer(std::io::sink)
            .with_env_filter("off")
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                    tracing_subscriber::EnvFilter::new("warn,plaudit=warn,plaudit_ops=warn")
                }),
            )
            .init();
    }
}

/// Apply CLI configuration overrides (highest precedence)
fn apply_cli_config(
    config: &mut Config,
    global: &cli::GlobalArgs,
    command: &Commands,
) -> Result<(), CliError> {
    if let Some(color) = global.color {
        config.general.color = color;
    }
    if global.json {
        config.general.default_output = OutputFormat::Json;
    }
    if let Some(dir) = &global.cache_dir {
        config.paths.cache_dir = Some(dir.clone());
    }

    if let Commands::Audit { jobs: Some(jobs), .. } = command {
        if *jobs == 0 {
            return Err(CliError::InvalidArguments(
                "--jobs must be at least 1".to_string(),
            ));
        }
        config.general.parallel_fetches = *jobs;
    }

    Ok(())
}
