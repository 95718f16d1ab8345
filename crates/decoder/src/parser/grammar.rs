//! Line grammar for the base HAProxy HTTP log format.
//!
//! The pattern and the descriptor table are built together, one field at a
//! time, so capture group `i` always belongs to descriptor `i - 1`. Each group
//! is also named after its field, and [`Grammar::build`] checks the compiled
//! pattern against the table before handing it out.
//!
//! Only the format without optional fields is recognized:
//!
//! ```text
//! <date> <host> haproxy[<pid>]: <ip>:<port> [<accept_date>] <frontend> <backend>/<server>
//!     <Tq>/<Tw>/<Tc>/<Tr>/[+]<Tt> <status> <bytes> - - <term_state>
//!     <actconn>/<feconn>/<beconn>/<srv_conn>/[+]<retries> <srv_queue>/<backend_queue> "<request>"
//! ```

use std::sync::{Arc, OnceLock};
use regex::{Captures, Regex};
use super::model::{FieldDescriptor, FieldType, GrammarError};

const CLS_NOT_SPACE: &str = "[^ ]+";
const CLS_DIGITS: &str = "[0-9]+";
const CLS_IPADDR: &str = r"[:a-f0-9\.]+";
const CLS_DIGITS_OR_MINUS_ONE: &str = "[0-9]+|-1";
const CLS_BACKEND: &str = "[^ /]+";
const CLS_FLAG: &str = r"\+?";
const CLS_TERMINATION_STATE: &str = "....";
const CLS_QUOTED: &str = r#"[^"]*"#;

/// Compiled line pattern plus the field table that reads its captures.
#[derive(Debug)]
pub struct Grammar {
    regex: Regex,
    pattern: Arc<str>,
    descriptors: Vec<FieldDescriptor>,
}

impl Grammar {
    /// Build and verify the grammar.
    pub fn build() -> Result<Self, GrammarError> {
        let mut b = GrammarBuilder::new();

        b.group(CLS_NOT_SPACE, "syslog_date", FieldType::Date)
            .literal(" ")
            .group(CLS_NOT_SPACE, "syslog_hostname", FieldType::String)
            .literal(" haproxy[")
            .group(CLS_DIGITS, "pid", FieldType::Number)
            .literal("]: ")
            .group(CLS_IPADDR, "client_ip", FieldType::Ip)
            .literal(":")
            .group(CLS_DIGITS, "client_port", FieldType::Number)
            .literal(" [")
            .group(CLS_NOT_SPACE, "accept_date", FieldType::String)
            .literal("] ")
            .group(CLS_NOT_SPACE, "frontend_name", FieldType::String)
            .literal(" ")
            .group(CLS_BACKEND, "backend_name", FieldType::String)
            .literal("/")
            .group(CLS_NOT_SPACE, "server_name", FieldType::String);

        // Timers use the 1.5 names (Tq/Tw/Tc/Tr/Tt); 1.7 renamed Tq to TR.
        b.literal(" ")
            .group(CLS_DIGITS_OR_MINUS_ONE, "Tq", FieldType::Number)
            .literal("/")
            .group(CLS_DIGITS_OR_MINUS_ONE, "Tw", FieldType::Number)
            .literal("/")
            .group(CLS_DIGITS_OR_MINUS_ONE, "Tc", FieldType::Number)
            .literal("/")
            .group(CLS_DIGITS_OR_MINUS_ONE, "Tr", FieldType::Number)
            .literal("/")
            .group(CLS_FLAG, "Tt_logasap", FieldType::Boolean)
            .group(CLS_DIGITS, "Tt", FieldType::Number);

        b.literal(" ")
            .group(CLS_DIGITS_OR_MINUS_ONE, "status_code", FieldType::Number)
            .literal(" ")
            .group(CLS_DIGITS, "bytes_read", FieldType::Number)
            .literal(" - - ")
            .group(CLS_TERMINATION_STATE, "termination_state", FieldType::TerminationState);

        b.literal(" ")
            .group(CLS_DIGITS, "actconn", FieldType::Number)
            .literal("/")
            .group(CLS_DIGITS, "feconn", FieldType::Number)
            .literal("/")
            .group(CLS_DIGITS, "beconn", FieldType::Number)
            .literal("/")
            .group(CLS_DIGITS, "srv_conn", FieldType::Number)
            .literal("/")
            .group(CLS_FLAG, "retries_redispatch", FieldType::Boolean)
            .group(CLS_DIGITS, "retries", FieldType::Number);

        b.literal(" ")
            .group(CLS_DIGITS, "srv_queue", FieldType::Number)
            .literal("/")
            .group(CLS_DIGITS, "backend_queue", FieldType::Number);

        b.literal(" \"")
            .group(CLS_QUOTED, "http_request", FieldType::String)
            .literal("\"");

        b.finish()
    }

    /// Process-wide grammar, built on first use.
    pub fn shared() -> Result<Arc<Self>, GrammarError> {
        static SHARED: OnceLock<Arc<Grammar>> = OnceLock::new();

        if let Some(grammar) = SHARED.get() {
            return Ok(Arc::clone(grammar));
        }
        let grammar = Arc::new(Self::build()?);
        Ok(Arc::clone(SHARED.get_or_init(|| grammar)))
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub(crate) fn pattern_arc(&self) -> Arc<str> {
        Arc::clone(&self.pattern)
    }

    pub fn descriptors(&self) -> &[FieldDescriptor] {
        &self.descriptors
    }

    pub fn captures<'h>(&self, line: &'h str) -> Option<Captures<'h>> {
        self.regex.captures(line)
    }

    pub fn is_match(&self, line: &str) -> bool {
        self.regex.is_match(line)
    }
}

struct GrammarBuilder {
    pattern: String,
    descriptors: Vec<FieldDescriptor>,
}

impl GrammarBuilder {
    fn new() -> Self {
        Self {
            pattern: String::from("^"),
            descriptors: Vec::new(),
        }
    }

    /// Append a capture group; its index is the next 1-based position.
    fn group(&mut self, class: &str, name: &'static str, field_type: FieldType) -> &mut Self {
        let capture_index = self.descriptors.len() + 1;
        self.pattern.push_str(&format!("(?P<{name}>{class})"));
        self.descriptors.push(FieldDescriptor {
            name,
            field_type,
            capture_index,
        });
        self
    }

    /// Append text that must appear verbatim.
    fn literal(&mut self, text: &str) -> &mut Self {
        self.pattern.push_str(&regex::escape(text));
        self
    }

    fn finish(mut self) -> Result<Grammar, GrammarError> {
        self.pattern.push('$');
        let regex = Regex::new(&self.pattern)?;
        verify_alignment(&regex, &self.descriptors)?;

        tracing::debug!(
            groups = self.descriptors.len(),
            "haproxy grammar built"
        );

        Ok(Grammar {
            regex,
            pattern: Arc::from(self.pattern),
            descriptors: self.descriptors,
        })
    }
}

/// Check that capture group `i` is descriptor `i - 1`, for every group.
fn verify_alignment(regex: &Regex, descriptors: &[FieldDescriptor]) -> Result<(), GrammarError> {
    // group 0 is the whole match
    let groups = regex.captures_len() - 1;
    if groups != descriptors.len() {
        return Err(GrammarError::GroupCount {
            groups,
            descriptors: descriptors.len(),
        });
    }

    for (position, descriptor) in descriptors.iter().enumerate() {
        let index = position + 1;
        let found = regex.capture_names().nth(index).flatten();
        if descriptor.capture_index != index || found != Some(descriptor.name) {
            return Err(GrammarError::Desynchronized {
                index,
                expected: descriptor.name,
                found: found.map(str::to_string),
            });
        }
    }

    Ok(())
}
