//! Pipe command implementation.
//!
//! Copies standard input into a rotating log, one line per write so that no
//! line is split across two files, while the reaper runs on its interval.

use crate::error::CliResult;
use crate::settings::Settings;
use logroll_core::{CancellationToken, LogResult, RotatingWriter};
use std::io::{self, BufRead};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{info, warn};

/// Runs the pipe command until standard input ends or Ctrl-C.
pub fn run(settings: Settings) -> CliResult<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("logroll-runtime")
        .build()?;
    let result = runtime.block_on(pipe_stdin(settings));
    // The stdin reader may still be blocked in a read.
    runtime.shutdown_background();
    result
}

async fn pipe_stdin(settings: Settings) -> CliResult<()> {
    let writer = Arc::new(RotatingWriter::open(settings.config)?);
    pipe_into(writer, settings.reap_interval, || io::stdin().lock()).await
}

/// Copies the reader returned by `open_input` into `writer` with the reaper
/// running, then stops the reaper and closes the writer. The shutdown runs
/// whether the copy succeeded, failed or was interrupted.
async fn pipe_into<F, R>(
    writer: Arc<RotatingWriter>,
    reap_interval: Duration,
    open_input: F,
) -> CliResult<()>
where
    F: FnOnce() -> R + Send + 'static,
    R: BufRead,
{
    let token = CancellationToken::new();

    let mut reaper = writer.reaper().spawn(token.clone(), reap_interval)?;
    let errors = tokio::spawn(async move {
        while let Some(err) = reaper.next_error().await {
            warn!(error = %err, "failed to reap archives");
        }
    });

    let (done_tx, done_rx) = oneshot::channel();
    let copier = Arc::clone(&writer);
    std::thread::Builder::new()
        .name("logroll-stdin".to_string())
        .spawn(move || {
            let result = copy_lines(open_input(), &copier);
            let _ = done_tx.send(result);
        })?;

    let copied = tokio::select! {
        result = done_rx => result.ok(),
        _ = tokio::signal::ctrl_c() => {
            info!("interrupted");
            None
        }
    };

    token.cancel();
    let _ = errors.await;
    writer.close()?;
    match copied {
        Some(Ok(bytes)) => {
            info!(bytes, rotations = writer.rotations(), "input finished");
            Ok(())
        }
        Some(Err(err)) => Err(err.into()),
        None => Ok(()),
    }
}

/// Writes `reader` line by line into `writer`. Returns the bytes copied.
pub fn copy_lines(mut reader: impl BufRead, writer: &RotatingWriter) -> LogResult<u64> {
    let mut line = Vec::with_capacity(256);
    let mut copied = 0u64;
    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line)? == 0 {
            return Ok(copied);
        }
        writer.write(&line)?;
        copied += line.len() as u64;
    }
}
