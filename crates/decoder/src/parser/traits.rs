pub use super::model::{DecodeError, LogRecord};

pub trait LineDecoder: Send + Sync {
    /// decode one raw log line (no trailing newline) into a record
    fn decode(&self, line: &str) -> Result<LogRecord, DecodeError>;
}
