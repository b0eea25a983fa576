//! JSON-lines front end for the engine worker.
//!
//! Reads one request object per line on stdin and writes one response
//! object per line on stdout. Logs go to stderr.

use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};
use clap::Parser;
use gridcalc::{EngineWorker, EvalConfig, Request, Response};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "gridcalc-worker", about = "Spreadsheet formula engine over stdin/stdout")]
struct Cli {
    /// Number of addressable rows.
    #[arg(long, default_value_t = 100)]
    max_rows: u32,

    /// Number of addressable columns (26 is Z).
    #[arg(long, default_value_t = 26)]
    max_cols: u32,

    /// Log filter used when RUST_LOG is unset, e.g. `debug` or `gridcalc_eval=trace`.
    #[arg(long, default_value = "warn")]
    log_level: String,
}

fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn emit(out: &mut impl Write, response: &Response) -> Result<()> {
    serde_json::to_writer(&mut *out, response).context("encoding response")?;
    out.write_all(b"\n")?;
    out.flush()?;
    Ok(())
}

/// Decode one input line. `Ok(None)` for a blank line; `Err` carries the
/// message for an `error` response.
fn decode_line(raw: &[u8]) -> Result<Option<Request>, String> {
    let line = std::str::from_utf8(raw).map_err(|err| format!("malformed request: {err}"))?;
    if line.trim().is_empty() {
        return Ok(None);
    }
    serde_json::from_str(line)
        .map(Some)
        .map_err(|err| format!("malformed request: {err}"))
}

/// Pump requests from `input` to the worker until end of input. Only I/O
/// failures and a dead worker end the loop early.
fn serve_lines(worker: &EngineWorker, mut input: impl BufRead, out: &mut impl Write) -> Result<()> {
    let mut raw = Vec::new();
    loop {
        raw.clear();
        if input.read_until(b'\n', &mut raw).context("reading stdin")? == 0 {
            return Ok(());
        }
        match decode_line(&raw) {
            Ok(None) => {}
            Ok(Some(request)) => {
                for response in worker.call(request)? {
                    emit(out, &response)?;
                }
            }
            Err(message) => {
                tracing::warn!(%message, "malformed request line");
                emit(out, &Response::Error { message })?;
            }
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    let config = EvalConfig::default()
        .with_max_rows(cli.max_rows)
        .with_max_cols(cli.max_cols);
    let worker = EngineWorker::spawn(config).context("starting engine thread")?;
    tracing::info!(max_rows = cli.max_rows, max_cols = cli.max_cols, "engine worker started");

    let stdout = io::stdout();
    let mut out = stdout.lock();
    emit(&mut out, &worker.recv()?)?;
    serve_lines(&worker, io::stdin().lock(), &mut out)?;

    worker.shutdown()?;
    Ok(())
}
