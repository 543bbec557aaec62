//! keel - drive one symbol's quoting engine from stdin
//!
//! Reads newline-delimited JSON envelopes (`{"topic": ..., "data": ...}`)
//! from stdin and quotes through a throttled dry-run execution adapter.

use keel_clock::SystemClock;
use keel_gateway::{DryRunExecution, InboundMessage, ThrottledExecution};
use keel_runner::{EngineConfig, RunnerError, RuntimeConfig, SymbolEngine, SymbolRuntime};
use log::{error, info, warn};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

fn print_help() {
    eprintln!(
        r#"keel - order-book market-making engine (dry run)

USAGE:
    keel [OPTIONS] [CONFIG]

OPTIONS:
    --config <PATH>     Load configuration from JSON file
    --help              Print this help message

ENVIRONMENT VARIABLES:
    KEEL_CONFIG         Config path when none is given on the command line
    RUST_LOG            Log level filter (default: info)

EXAMPLES:
    keel config/btcusdt.json < feed.jsonl
"#
    );
}

/// Config path from `--config`, a positional argument, or `KEEL_CONFIG`
fn config_path() -> Result<Option<String>, RunnerError> {
    let args: Vec<String> = std::env::args().collect();
    let mut path: Option<String> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                return Ok(None);
            }
            "--config" | "-c" => {
                i += 1;
                let value = args
                    .get(i)
                    .ok_or_else(|| RunnerError::Usage("--config requires a path argument".to_string()))?;
                path = Some(value.clone());
            }
            arg if !arg.starts_with('-') && path.is_none() => path = Some(arg.to_string()),
            arg => {
                print_help();
                return Err(RunnerError::Usage(format!("unknown argument: {}", arg)));
            }
        }
        i += 1;
    }

    match path.or_else(|| std::env::var("KEEL_CONFIG").ok()) {
        Some(path) => Ok(Some(path)),
        None => {
            print_help();
            Err(RunnerError::Usage("no config given".to_string()))
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), RunnerError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let Some(path) = config_path()? else {
        return Ok(());
    };
    info!("Loading configuration from: {}", path);
    let config = EngineConfig::from_file(&path)?;
    let engine = SymbolEngine::from_config(&config)?;

    let dry_run = Arc::new(DryRunExecution::new());
    let execution = Arc::new(ThrottledExecution::new(
        dry_run,
        config.execution.capacity,
        config.execution.refill_per_sec,
    ));

    let (runtime, mut handle) = SymbolRuntime::new(
        engine,
        execution,
        Arc::new(SystemClock::new()),
        RuntimeConfig::from(&config),
    );
    let runtime = tokio::spawn(runtime.run());

    let inbound = handle.inbound.clone();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl-C received");
                break;
            }
            Some(symbol) = handle.snapshot_requests.recv() => {
                // No venue session here: the feed producer has to resend a snapshot
                warn!("[{}] snapshot needed to resume book updates", symbol);
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    info!("Input closed");
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }
                match InboundMessage::from_json(&line) {
                    Ok(message) => {
                        if inbound.send(message).await.is_err() {
                            error!("Runtime stopped accepting messages");
                            break;
                        }
                    }
                    Err(e) => warn!("Skipping line: {}", e),
                }
            }
        }
    }

    handle.shutdown();
    let engine = runtime.await?;
    info!(
        "[{}] session pnl {} position {}",
        engine.symbol(),
        engine.risk().session_pnl(),
        engine.position().size
    );
    Ok(())
}
