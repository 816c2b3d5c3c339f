//! trickle - Lazy log pipelines and retried operations from the command line
//!
//! Streams synthetic log records through composable filter stages and
//! wraps a scripted flaky operation in a bounded retry policy.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod cmd;
mod config;

use config::Config;

#[derive(Parser)]
#[command(name = "trickle")]
#[command(about = "Lazy log pipelines and retried operations")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Config file path (default: ./trickle.toml or ~/.config/trickle/config.toml)
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Retry a scripted flaky operation
    Retry(cmd::retry::RetryArgs),
    /// Stream synthetic log lines through search and status filters
    Logs(cmd::logs::LogsArgs),
    /// Run the retry and pipeline demos with their stock settings
    Demo,
    /// Show current configuration
    Config,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let progress = Arc::new(trickle_core::ProgressContext::new());
    let multi = if progress.is_tty() {
        Some(progress.multi())
    } else {
        None
    };
    let verbosity = trickle_core::Verbosity::from_flags(cli.quiet, cli.debug);
    if let Err(e) = trickle_core::init_logging(verbosity, multi) {
        eprintln!("Failed to initialize logging: {e}");
        return ExitCode::from(2);
    }

    setup_signal_handler();

    match run(cli, &progress) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("Fatal error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli, progress: &trickle_core::SharedProgress) -> Result<()> {
    let config = if let Some(path) = cli.config {
        Config::from_file(&path)?
    } else {
        Config::load()?
    };

    match cli.command {
        Command::Retry(args) => cmd::retry::run(args, &config, progress),
        Command::Logs(args) => cmd::logs::run(args, &config, progress),
        Command::Demo => cmd::demo::run(progress),
        Command::Config => {
            use comfy_table::{
                Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL,
            };

            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .apply_modifier(UTF8_ROUND_CORNERS)
                .set_header(vec![
                    Cell::new("Setting").fg(Color::Cyan),
                    Cell::new("Value").fg(Color::Cyan),
                ]);

            table.add_row(vec![
                "Max attempts",
                &config.retry.max_attempts.to_string(),
            ]);
            table.add_row(vec!["Retry delay", &format!("{}ms", config.retry.delay_ms)]);
            table.add_row(vec![
                "Record count",
                &trickle_core::fmt_num(config.pipeline.count),
            ]);
            table.add_row(vec!["Search needle", &config.pipeline.needle]);
            table.add_row(vec!["Status filter", &config.pipeline.status]);
            table.add_row(vec!["Result limit", &config.pipeline.limit.to_string()]);

            eprintln!("\n{table}");
            Ok(())
        }
    }
}

fn setup_signal_handler() {
    // First signal: request shutdown (driver stops, retry pauses cancel)
    // Second signal: force exit
    // SAFETY: AtomicBool::swap and process::exit are async-signal-safe
    for signal in [signal_hook::consts::SIGTERM, signal_hook::consts::SIGINT] {
        let registered = unsafe {
            signal_hook::low_level::register(signal, || {
                if trickle_core::request_shutdown() {
                    std::process::exit(130);
                }
            })
        };
        if let Err(e) = registered {
            log::warn!("Failed to register handler for signal {signal}: {e}");
        }
    }
}
