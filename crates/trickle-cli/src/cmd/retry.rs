//! Retry subcommand - wrap a scripted flaky operation

use std::cell::Cell;

use anyhow::{Context, Result};
use clap::Args;

use trickle_core::{Failure, LogNotifier, ProgressNotifier, RetryPolicy, SharedProgress, wrap};

use crate::config::Config;

/// Name the scripted operation reports in notices.
pub const OPERATION: &str = "flaky_network_call";

#[derive(Args, Debug)]
pub struct RetryArgs {
    /// Failures before the operation succeeds
    #[arg(short, long, default_value_t = 2)]
    pub failures: u32,

    /// Maximum attempts, including the first
    #[arg(short, long)]
    pub max_attempts: Option<u32>,

    /// Pause between attempts in milliseconds
    #[arg(short, long)]
    pub delay_ms: Option<u64>,

    /// Fail with a non-transient error instead of a transient one
    #[arg(long)]
    pub fatal: bool,

    /// Make a single attempt and never retry
    #[arg(long, conflicts_with_all = ["max_attempts", "delay_ms"])]
    pub once: bool,
}

impl RetryArgs {
    /// Policy from `--once`, or from config with command-line overrides.
    pub fn policy(&self, config: &Config) -> Result<RetryPolicy> {
        if self.once {
            return Ok(RetryPolicy::no_retry());
        }
        config.retry.policy(self.max_attempts, self.delay_ms)
    }
}

/// Scripted outcome: fails `remaining` more times, then succeeds.
#[derive(Debug)]
pub struct Script {
    remaining: Cell<u32>,
    fatal: bool,
}

impl Script {
    pub fn new(failures: u32, fatal: bool) -> Self {
        Self {
            remaining: Cell::new(failures),
            fatal,
        }
    }
}

/// Simulated network call following `script`.
pub fn flaky_network_call(script: &Script) -> Result<String, Failure> {
    let remaining = script.remaining.get();
    if remaining == 0 {
        return Ok("Success!".to_string());
    }
    script.remaining.set(remaining - 1);
    if script.fatal {
        Err(Failure::non_transient("Request rejected!"))
    } else {
        Err(Failure::transient("Network down!"))
    }
}

pub fn run(args: RetryArgs, config: &Config, progress: &SharedProgress) -> Result<()> {
    let policy = args.policy(config)?;
    let value = run_scripted(&Script::new(args.failures, args.fatal), policy, progress)?;
    println!("Result: {value}");
    Ok(())
}

/// Run the scripted call under `policy`, mirroring retries on a spinner.
pub fn run_scripted(script: &Script, policy: RetryPolicy, progress: &SharedProgress) -> Result<String> {
    let pb = progress.status_line("retry");
    pb.set_message(OPERATION);
    let notifier = ProgressNotifier::new(pb.clone(), LogNotifier);

    let mut wrapped = wrap(OPERATION, flaky_network_call, policy).with_notifier(notifier);
    log::debug!(
        "{}: max_attempts={} delay={:?}",
        wrapped.name(),
        wrapped.policy().max_attempts(),
        wrapped.policy().delay()
    );
    let result = wrapped.call(script);
    pb.finish_and_clear();
    result.with_context(|| format!("{OPERATION} did not succeed"))
}
