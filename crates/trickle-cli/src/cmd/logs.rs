//! Logs subcommand - stream synthetic log lines through filters

use std::cell::Cell;
use std::rc::Rc;

use anyhow::{Context, Result};
use clap::Args;

use trickle_core::{
    DriveSummary, Pipeline, Record, SearchStage, Sequence, SharedProgress, StatusStage,
    drive, fmt_num, is_shutdown_requested, produce, produce_cycling,
};

use crate::config::{Config, PipelineConfig};

#[derive(Args, Debug, Default)]
pub struct LogsArgs {
    /// Number of records the source will produce
    #[arg(short = 'n', long)]
    pub count: Option<u64>,

    /// Keep only records with this status (empty: any status)
    #[arg(short, long)]
    pub status: Option<String>,

    /// Keep only records containing this text (empty: no search)
    #[arg(long)]
    pub needle: Option<String>,

    /// Stop after this many results
    #[arg(short = 'l', long)]
    pub limit: Option<usize>,

    /// Status labels to cycle through (comma-separated, default: all OK)
    #[arg(long, value_delimiter = ',')]
    pub statuses: Vec<String>,
}

/// Effective settings after applying command-line overrides to config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogsSettings {
    pub count: u64,
    pub status: String,
    pub needle: String,
    pub limit: usize,
    pub statuses: Vec<String>,
}

impl LogsSettings {
    pub fn resolve(args: LogsArgs, config: &PipelineConfig) -> Self {
        Self {
            count: args.count.unwrap_or(config.count),
            status: args.status.unwrap_or_else(|| config.status.clone()),
            needle: args.needle.unwrap_or_else(|| config.needle.clone()),
            limit: args.limit.unwrap_or(config.limit),
            statuses: args.statuses,
        }
    }
}

/// What a run produced and how much upstream work it caused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogsReport {
    pub lines: Vec<String>,
    pub summary: DriveSummary,
    pub realized: u64,
}

pub fn run(args: LogsArgs, config: &Config, progress: &SharedProgress) -> Result<()> {
    let settings = LogsSettings::resolve(args, &config.pipeline);
    print_report(&settings, progress)
}

/// Run the pipeline and print the leading results plus a summary.
pub fn print_report(settings: &LogsSettings, progress: &SharedProgress) -> Result<()> {
    let pb = progress.status_line("logs");
    pb.set_message(format!(
        "{} records, search '{}', status={}",
        fmt_num(settings.count),
        settings.needle,
        settings.status
    ));

    println!("First {} filtered log lines:", settings.limit);
    let report = collect(settings, |line| println!("{line}"));
    pb.finish_and_clear();
    let report = report?;

    progress.println(format!(
        "Consumed {} of {} requested lines; realized {} of {} source records{}",
        report.summary.consumed,
        settings.limit,
        fmt_num(report.realized),
        fmt_num(settings.count),
        if report.summary.stopped_early {
            " (stopped early)"
        } else {
            ""
        }
    ));
    if is_shutdown_requested() {
        progress.println("Interrupted: results above are partial");
    }
    Ok(())
}

/// Search then status filter, leaving out any whose setting is empty.
pub fn build_pipeline(settings: &LogsSettings) -> Pipeline {
    let mut pipeline = Pipeline::new();
    if !settings.needle.is_empty() {
        pipeline.push(Box::new(SearchStage::new(settings.needle.as_str())));
    }
    if !settings.status.is_empty() {
        pipeline.push(Box::new(StatusStage::new(settings.status.as_str())));
    }
    pipeline
}

/// Compose Source -> Search(needle) -> Filter(status) and drive it.
pub fn collect(settings: &LogsSettings, mut on_line: impl FnMut(&str)) -> Result<LogsReport> {
    let realized = Rc::new(Cell::new(0u64));
    let counter = realized.clone();

    let source: Sequence = if settings.statuses.is_empty() {
        Box::new(produce(settings.count))
    } else {
        Box::new(produce_cycling(settings.count, &settings.statuses).context("Invalid --statuses")?)
    };
    let source = source.inspect(move |_| counter.set(counter.get() + 1));

    let pipeline = build_pipeline(settings);
    if pipeline.is_empty() {
        log::debug!("logs: no filters, passing source through");
    } else {
        log::debug!("logs: stages {}", pipeline.stage_names().join(" -> "));
    }

    let mut lines = Vec::new();
    let summary = drive(pipeline.run(source), Some(settings.limit), |record: Record| {
        on_line(record.payload());
        lines.push(record.payload().to_string());
    })
    .context("Pipeline failed")?;

    log::debug!(
        "logs: consumed {} records, realized {} upstream",
        summary.consumed,
        realized.get()
    );
    Ok(LogsReport {
        lines,
        summary,
        realized: realized.get(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(count: u64, limit: usize) -> LogsSettings {
        LogsSettings {
            count,
            status: "OK".to_string(),
            needle: "logline".to_string(),
            limit,
            statuses: Vec::new(),
        }
    }

    #[test]
    fn resolve_prefers_args() {
        let args = LogsArgs {
            count: Some(10),
            status: Some("WARN".to_string()),
            ..Default::default()
        };
        let resolved = LogsSettings::resolve(args, &PipelineConfig::default());
        assert_eq!(resolved.count, 10);
        assert_eq!(resolved.status, "WARN");
        assert_eq!(resolved.needle, "logline");
        assert_eq!(resolved.limit, 5);
        assert!(resolved.statuses.is_empty());
    }

    #[test]
    fn first_five_of_a_million() {
        let report = collect(&settings(1_000_000, 5), |_| {}).unwrap();
        assert_eq!(
            report.lines,
            vec![
                "logline 0 - status=OK",
                "logline 1 - status=OK",
                "logline 2 - status=OK",
                "logline 3 - status=OK",
                "logline 4 - status=OK",
            ]
        );
        assert!(report.summary.stopped_early);
        assert!(report.realized <= 6);
    }

    #[test]
    fn cycling_statuses_filtered() {
        let mut s = settings(10, 10);
        s.statuses = vec!["OK".to_string(), "ERROR".to_string()];
        s.status = "ERROR".to_string();
        let report = collect(&s, |_| {}).unwrap();
        assert_eq!(report.lines.len(), 5);
        assert!(report.lines.iter().all(|l| l.ends_with("status=ERROR")));
        assert!(!report.summary.stopped_early);
        assert_eq!(report.realized, 10);
    }

    #[test]
    fn callback_sees_each_line() {
        let mut seen = 0;
        collect(&settings(3, 10), |_| seen += 1).unwrap();
        assert_eq!(seen, 3);
    }

    #[test]
    fn zero_count_yields_nothing() {
        let report = collect(&settings(0, 5), |_| {}).unwrap();
        assert!(report.lines.is_empty());
        assert_eq!(report.realized, 0);
        assert!(!report.summary.stopped_early);
    }

    #[test]
    fn empty_settings_drop_their_stage() {
        let mut s = settings(10, 5);
        assert_eq!(
            build_pipeline(&s).stage_names(),
            vec!["search(logline)".to_string(), "status=OK".to_string()]
        );

        s.needle.clear();
        assert_eq!(build_pipeline(&s).stage_names(), vec!["status=OK".to_string()]);

        s.status.clear();
        assert!(build_pipeline(&s).is_empty());
    }

    #[test]
    fn no_filters_passes_every_status() {
        let mut s = settings(6, 10);
        s.needle.clear();
        s.status.clear();
        s.statuses = vec!["OK".to_string(), "WARN".to_string(), "ERROR".to_string()];
        let report = collect(&s, |_| {}).unwrap();
        assert_eq!(report.lines.len(), 6);
        assert_eq!(report.lines[1], "logline 1 - status=WARN");
        assert_eq!(report.realized, 6);
    }

    #[test]
    fn no_match_drains_source() {
        let mut s = settings(20, 5);
        s.status = "ERROR".to_string();
        let report = collect(&s, |_| {}).unwrap();
        assert!(report.lines.is_empty());
        assert_eq!(report.realized, 20);
    }
}
