use std::sync::Arc;
use crate::parser::field::decode_field;
use crate::parser::grammar::Grammar;
use crate::parser::model::{FieldValue, GrammarError};
use crate::parser::traits::{DecodeError, LineDecoder, LogRecord};

/// Decoder for HAProxy HTTP log lines in the base (no optional fields) format.
///
/// Holds only the immutable grammar, so one instance can decode from any
/// number of tasks.
#[derive(Debug, Clone)]
pub struct HaproxyLogDecoder {
    grammar: Arc<Grammar>,
}

impl HaproxyLogDecoder {
    /// Decoder over the process-wide grammar
    pub fn new() -> Result<Self, GrammarError> {
        Ok(Self::with_grammar(Grammar::shared()?))
    }

    pub fn with_grammar(grammar: Arc<Grammar>) -> Self {
        Self { grammar }
    }

    pub fn grammar(&self) -> &Arc<Grammar> {
        &self.grammar
    }
}

impl LineDecoder for HaproxyLogDecoder {
    fn decode(&self, line: &str) -> Result<LogRecord, DecodeError> {
        let caps = self.grammar.captures(line).ok_or_else(|| DecodeError::MalformedLine {
            line: line.to_string(),
            pattern: self.grammar.pattern_arc(),
        })?;

        let fields: Vec<(&'static str, FieldValue)> = self
            .grammar
            .descriptors()
            .iter()
            .map(|d| {
                // optional groups that matched nothing still report ""
                let raw = caps.get(d.capture_index).map_or("", |m| m.as_str());
                (d.name, decode_field(raw, d.field_type))
            })
            .collect();

        Ok(LogRecord::from_fields(fields))
    }
}
