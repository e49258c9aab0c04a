//! AMP - command line entry point
//!
//! Loads configuration, initializes logging, queues one job per source and
//! renders queue events until the run ends.

use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;

use amp_core::config::ConfigManager;
use amp_core::logging::{init_tracing, init_tracing_with_file, LogLevel};
use amp_core::orchestrator::{JobOutcome, QueueController, QueueEvent, QueueSummary};

mod cli;

use cli::{Cli, Command, ConfigCommand, RunArgs};

const EXIT_SUCCESS: i32 = 0;
const EXIT_FAILURE: i32 = 1;
/// 128 + SIGINT
const EXIT_CANCELLED: i32 = 130;

/// Default config path: .config/settings.toml (relative to current working directory)
fn default_config_path() -> PathBuf {
    PathBuf::from(".config").join("settings.toml")
}

fn main() {
    let cli = Cli::parse();

    let code = match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {:#}", e);
            EXIT_FAILURE
        }
    };
    std::process::exit(code);
}

fn run(cli: Cli) -> Result<i32> {
    let config_path = cli.config.unwrap_or_else(default_config_path);

    match cli.command {
        Command::Config { command } => {
            run_config(command, config_path)?;
            Ok(EXIT_SUCCESS)
        }
        Command::Run(args) => run_jobs(cli.log_level, &args, config_path),
    }
}

fn run_config(command: ConfigCommand, config_path: PathBuf) -> Result<()> {
    match command {
        ConfigCommand::Show => {
            let mut manager = ConfigManager::new(&config_path);
            manager
                .load_or_create()
                .with_context(|| format!("loading {}", config_path.display()))?;
            let content = fs::read_to_string(&config_path)
                .with_context(|| format!("reading {}", config_path.display()))?;
            println!("# {}", config_path.display());
            print!("{}", content);
        }
        ConfigCommand::Init { force } => {
            if config_path.exists() && !force {
                bail!(
                    "{} already exists (use --force to overwrite)",
                    config_path.display()
                );
            }
            ConfigManager::new(&config_path)
                .save()
                .with_context(|| format!("writing {}", config_path.display()))?;
            println!("Wrote default config to {}", config_path.display());
        }
    }
    Ok(())
}

fn run_jobs(log_level: Option<LogLevel>, args: &RunArgs, config_path: PathBuf) -> Result<i32> {
    // Config first: it names the logs directory.
    let mut config_manager = ConfigManager::new(&config_path);
    if let Err(e) = config_manager.load_or_create() {
        eprintln!("Warning: Failed to load config: {}. Using defaults.", e);
    }
    let settings = config_manager.settings().clone();

    let level = log_level.unwrap_or(settings.logging.level);
    let _log_guard = if settings.logging.log_to_file {
        match init_tracing_with_file(level, config_manager.logs_folder()) {
            Ok(guard) => Some(guard),
            Err(e) => {
                eprintln!("Warning: Failed to open log file: {}", e);
                init_tracing(level);
                None
            }
        }
    } else {
        init_tracing(level);
        None
    };

    tracing::info!("AMP starting");
    tracing::info!("Config: {}", config_path.display());
    tracing::info!("Core version: {}", amp_core::version());

    if let Err(e) = config_manager.ensure_dirs_exist() {
        tracing::error!("Failed to create directories: {}", e);
    }

    let default_output = PathBuf::from(&settings.paths.default_output);
    let controller = QueueController::new(settings.clone());

    for source in &args.sources {
        let params = args.to_params(&settings.defaults, source, &default_output);
        match controller.submit_job(params) {
            Ok(id) => println!("Queued {} [{}]", source, id.short()),
            Err(e) => {
                eprintln!("error: {}: {}", source, e);
                return Ok(EXIT_FAILURE);
            }
        }
    }

    let token = controller.cancel_token();
    if let Err(e) = ctrlc::set_handler(move || {
        tracing::info!("Interrupt received, stopping queue");
        token.cancel();
    }) {
        tracing::warn!("Failed to install Ctrl+C handler: {}", e);
    }

    controller.start().context("starting queue")?;
    let summary = render_events(&controller, args.verbose);
    let summary = controller.wait().or(summary).unwrap_or_default();

    Ok(exit_code(&summary))
}

/// Print events until the queue reports completion.
fn render_events(controller: &QueueController, verbose: bool) -> Option<QueueSummary> {
    for event in controller.events().iter() {
        match event {
            QueueEvent::JobStarted {
                position,
                total,
                queue_percent,
                ..
            } => {
                println!(
                    "=== Job {}/{} (queue {:.0}%) ===",
                    position, total, queue_percent
                );
            }
            QueueEvent::Progress { event, .. } => println!("{}", event),
            QueueEvent::Log { line, .. } => {
                if verbose {
                    println!("  {}", line);
                }
            }
            QueueEvent::JobFinished { outcome, .. } => match outcome {
                JobOutcome::Succeeded { outputs } => {
                    for output in outputs {
                        println!("Wrote {}", output.display());
                    }
                }
                JobOutcome::Failed { message, detail } => {
                    eprintln!("Job failed: {}", message);
                    if let Some(detail) = detail {
                        eprintln!("{}", detail);
                    }
                }
                JobOutcome::Cancelled => eprintln!("Job cancelled"),
            },
            QueueEvent::QueueFinished(summary) => {
                println!(
                    "Queue finished: {} completed, {} remaining",
                    summary.completed, summary.remaining
                );
                return Some(summary);
            }
        }
    }
    None
}

fn exit_code(summary: &QueueSummary) -> i32 {
    if summary.cancelled {
        EXIT_CANCELLED
    } else if summary.failed_job.is_some() {
        EXIT_FAILURE
    } else {
        EXIT_SUCCESS
    }
}
