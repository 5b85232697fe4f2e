//! kvload - idempotent NDJSON table loader

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::Parser;
use kvload::failure_sink::FailureSink;
use kvload::progress::LoadProgress;
use kvload::shutdown::{ctrl_c_stream, watch_interrupts, Interrupts};
use kvload::store::{DynamoStore, InMemoryStore, KeyValueStore};
use kvload::{Cli, LoadStats, Loader};
use kvload_common::logging::{init_logging, LogConfig, LogLevel, LogOutput};
use kvload_common::stamp::RunStamp;
use std::process;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => e.exit(),
        Err(e) => {
            let _ = e.print();
            eprintln!("please give the source file; it also names the target table.");
            process::exit(1);
        },
    };

    if !cli.source.is_file() {
        eprintln!("ERROR: source file '{}' does not exist", cli.source.display());
        process::exit(1);
    }

    let stamp = RunStamp::now();

    let log_config = LogConfig::builder()
        .level(if cli.verbose { LogLevel::Debug } else { LogLevel::Info })
        .output(LogOutput::Both)
        .log_file_name(stamp.file_name("kvload", "log"))
        .filter_directives("aws_smithy_runtime=warn,aws_config=warn,hyper=warn")
        .build();

    // Environment variables take precedence over defaults, flags over both
    let mut log_config = match log_config.clone().merge_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Warning: ignoring logging environment: {}", e);
            log_config
        },
    };
    if let Some(dir) = &cli.log_dir {
        log_config.log_dir = dir.clone();
    }

    let guard = match init_logging(&log_config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Error: failed to initialize logging: {:#}", e);
            process::exit(1);
        },
    };

    let code = match run(&cli, stamp).await {
        Ok(stats) => {
            println!("{}", stats.completion_message());
            0
        },
        Err(e) => {
            error!(error = %format!("{:#}", e), "Load aborted");
            eprintln!("Error: {:#}", e);
            1
        },
    };

    // Flush the log file before exiting
    drop(guard);
    process::exit(code);
}

async fn run(cli: &Cli, stamp: RunStamp) -> Result<LoadStats> {
    info!("================== START ==================");

    let config = cli.loader_config().context("Invalid configuration")?;
    let table = cli.table_name();
    info!(source = %cli.source.display(), table = %table, dry_run = cli.dry_run, "args");

    let sink = FailureSink::open(config.error_dir.join(stamp.file_name("errorData", "txt")))?;

    let store: Box<dyn KeyValueStore> = if cli.dry_run {
        warn!("Dry run: loading into an empty in-memory table");
        Box::new(InMemoryStore::new(config.key_attribute.clone()))
    } else {
        let dynamo = cli.dynamo_config().context("Invalid store configuration")?;
        Box::new(DynamoStore::connect(dynamo).await?)
    };

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if watch_interrupts(ctrl_c_stream(), cancel).await == Interrupts::Forced {
                eprintln!("interrupted twice, exiting without waiting for in-flight records");
                process::exit(130);
            }
        }
    });

    let source_label = cli.source.to_string_lossy().into_owned();
    let stats = Loader::new(store, table, &config, sink)
        .with_progress(LoadProgress::spinner(&source_label))
        .with_cancellation(cancel)
        .run(&cli.source)
        .await?;

    if stats.reached_end {
        println!("source file ended and closed...");
    }

    Ok(stats)
}
