//! Streaming decode stage.
//!
//! A stage decodes exactly one line at a time, in arrival order, and holds
//! no state between lines apart from the decoder's immutable grammar. Each
//! completion yields to the scheduler before it is reported, so a long burst
//! of input cannot monopolize the runtime thread. The stage buffers nothing:
//! [`DecodeStage::decode_stream`] pulls the next line only when its consumer
//! polls for the next result.

use std::sync::Arc;
use std::time::Instant;
use tokio_stream::{Stream, StreamExt};
use crate::parser::haproxy::HaproxyLogDecoder;
use crate::parser::metrics::StageMetrics;
use crate::parser::model::GrammarError;
use crate::parser::traits::{DecodeError, LineDecoder, LogRecord};

/// Async line-at-a-time decoding over a shared [`LineDecoder`].
#[derive(Debug)]
pub struct DecodeStage<D = HaproxyLogDecoder> {
    decoder: Arc<D>,
    metrics: Option<Arc<StageMetrics>>,
}

impl<D> Clone for DecodeStage<D> {
    fn clone(&self) -> Self {
        Self {
            decoder: Arc::clone(&self.decoder),
            metrics: self.metrics.clone(),
        }
    }
}

impl DecodeStage<HaproxyLogDecoder> {
    /// Stage over the process-wide HAProxy grammar
    pub fn haproxy() -> Result<Self, GrammarError> {
        Ok(Self::new(HaproxyLogDecoder::new()?))
    }
}

impl<D: LineDecoder> DecodeStage<D> {
    pub fn new(decoder: D) -> Self {
        Self {
            decoder: Arc::new(decoder),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<StageMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn metrics(&self) -> Option<&Arc<StageMetrics>> {
        self.metrics.as_ref()
    }

    pub fn decoder(&self) -> &D {
        &self.decoder
    }

    /// Decode one line synchronously.
    pub fn decode_line(&self, line: &str) -> Result<LogRecord, DecodeError> {
        let started = Instant::now();
        let result = self.decoder.decode(line);

        match &result {
            Ok(_) => {
                if let Some(ref m) = self.metrics {
                    m.record_decoded(started.elapsed().as_nanos() as u64);
                }
                tracing::trace!(bytes = line.len(), "decoded line");
            }
            Err(e) => {
                if let Some(ref m) = self.metrics {
                    m.record_malformed();
                }
                tracing::debug!(line = e.line(), "line does not match grammar");
            }
        }

        result
    }

    /// Decode one line, signalling completion on the next scheduling turn.
    pub async fn process(&self, line: &str) -> Result<LogRecord, DecodeError> {
        let result = self.decode_line(line);
        tokio::task::yield_now().await;
        result
    }

    /// Turn a stream of lines into a stream of per-line results.
    ///
    /// Results come out in input order, one per line. A malformed line is
    /// reported as an `Err` item and the stream carries on with the next
    /// line; whether to stop is up to the consumer.
    pub fn decode_stream<S>(self, lines: S) -> impl Stream<Item = Result<LogRecord, DecodeError>>
    where
        S: Stream<Item = String>,
    {
        async_stream::stream! {
            let mut lines = std::pin::pin!(lines);
            while let Some(line) = lines.next().await {
                let result = self.process(&line).await;
                yield result;
            }
        }
    }
}
