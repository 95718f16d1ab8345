//! Run — feed input lines through the decode stage and write records out.

use std::sync::Arc;
use anyhow::{Context, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{info, warn};

use crate::conf::{DecoderConfig, MalformedPolicy, OutputFormat};
use crate::parser::{DecodeStage, LogRecord, MetricsSnapshot, StageMetrics};

/// Decode every line of `input`, writing one JSON document per accepted
/// line to `output`. Malformed lines are skipped or abort the run,
/// depending on `config.on_malformed`.
pub async fn run<R, W>(config: &DecoderConfig, mut input: R, mut output: W) -> Result<MetricsSnapshot>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let metrics = Arc::new(StageMetrics::new());
    let stage = DecodeStage::haproxy()
        .context("Failed to build HAProxy log grammar")?
        .with_metrics(Arc::clone(&metrics));

    let mut buf = Vec::new();
    let mut line_no: u64 = 0;

    while let Some(line) = next_line(&mut input, &mut buf).await.context("Failed to read input")? {
        line_no += 1;
        match stage.process(&line).await {
            Ok(record) => write_record(&mut output, &record, config.output).await?,
            Err(e) => match config.on_malformed {
                MalformedPolicy::Skip => {
                    warn!(line_no, line = e.line(), "skipping malformed log line");
                }
                MalformedPolicy::Abort => {
                    return Err(anyhow::Error::new(e).context(format!("Aborted at input line {line_no}")));
                }
            },
        }
    }

    output.flush().await.context("Failed to flush output")?;

    let snapshot = metrics.snapshot();
    if config.report_metrics {
        info!(
            decoded = snapshot.decoded,
            malformed = snapshot.malformed,
            avg_decode_time_us = snapshot.avg_decode_time_us,
            success_rate = snapshot.success_rate,
            "input exhausted"
        );
    }
    Ok(snapshot)
}

/// Read one line, stripping `\n` or `\r\n`. Invalid UTF-8 is replaced
/// with U+FFFD so the line still reaches the decoder.
async fn next_line<R>(input: &mut R, buf: &mut Vec<u8>) -> std::io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    buf.clear();
    if input.read_until(b'\n', buf).await? == 0 {
        return Ok(None);
    }
    if buf.last() == Some(&b'\n') {
        buf.pop();
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
    }
    Ok(Some(String::from_utf8_lossy(buf).into_owned()))
}

async fn write_record<W>(output: &mut W, record: &LogRecord, format: OutputFormat) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut buf = match format {
        OutputFormat::Json => serde_json::to_vec(record),
        OutputFormat::Pretty => serde_json::to_vec_pretty(record),
    }
    .context("Failed to serialize record")?;
    buf.push(b'\n');

    output.write_all(&buf).await.context("Failed to write record")?;
    Ok(())
}
