//! Demo subcommand - both walkthroughs with their stock settings

use std::time::Duration;

use anyhow::Result;

use trickle_core::{RetryPolicy, SharedProgress};

use super::logs::{LogsSettings, print_report};
use super::retry::{Script, run_scripted};

const DEMO_FAILURES: u32 = 2;
const DEMO_DELAY: Duration = Duration::from_millis(500);

pub fn run(progress: &SharedProgress) -> Result<()> {
    let policy = RetryPolicy::new(3, DEMO_DELAY)?;
    let value = run_scripted(&Script::new(DEMO_FAILURES, false), policy, progress)?;
    println!("Result: {value}");

    println!();
    let settings = LogsSettings {
        count: 1_000_000,
        status: "OK".to_string(),
        needle: "logline".to_string(),
        limit: 5,
        statuses: Vec::new(),
    };
    print_report(&settings, progress)?;

    println!();
    println!("No log line is stored: each is created, filtered, and discarded on demand.");
    Ok(())
}
