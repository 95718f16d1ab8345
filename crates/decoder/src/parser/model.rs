use std::sync::Arc;
use thiserror::Error;
use serde::{Serialize, Serializer};
use chrono::{DateTime, Utc};
use super::serde_utils::serialize_fields_as_map;
use super::termination::TerminationState;

/// How a captured substring is coerced into a [`FieldValue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    /// Opaque token, kept verbatim
    String,
    /// Base-10 integer (`-1` marks an unmeasured timer or status)
    Number,
    /// Syslog timestamp token
    Date,
    /// Peer address, IPv4-mapped IPv6 folded to plain IPv4
    Ip,
    /// Optional single-character flag, true when present
    Boolean,
    /// 4-character session state at disconnection
    TerminationState,
}

/// One capture group of the line grammar.
///
/// `capture_index` is 1-based and equals the descriptor's position in the
/// grammar's descriptor table plus one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub field_type: FieldType,
    pub capture_index: usize,
}

/// A decoded field value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// No value: a sentinel token or an unparseable date
    Null,
    String(String),
    Number(i64),
    Date(DateTime<Utc>),
    Ip(String),
    Boolean(bool),
    TerminationState(TerminationState),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// String content of `String` and `Ip` values
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) | FieldValue::Ip(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<&DateTime<Utc>> {
        match self {
            FieldValue::Date(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_termination_state(&self) -> Option<&TerminationState> {
        match self {
            FieldValue::TerminationState(ts) => Some(ts),
            _ => None,
        }
    }
}

/// String fields whose literal token stands for "no value".
const NULL_SENTINELS: [(&str, &str); 2] = [
    // no backend server was selected
    ("server_name", "<NOSRV>"),
    // the proxy could not parse the request line
    ("http_request", "<BADREQ>"),
];

/// One decoded log line: field name -> value, in line order.
///
/// Serializes as a JSON object keyed by field name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    fields: Vec<(&'static str, FieldValue)>,
}

impl LogRecord {
    /// Assemble a record and apply the sentinel substitutions.
    pub(crate) fn from_fields(mut fields: Vec<(&'static str, FieldValue)>) -> Self {
        for (name, value) in fields.iter_mut() {
            let is_sentinel = NULL_SENTINELS
                .iter()
                .any(|(field, token)| *field == *name && value.as_str() == Some(*token));
            if is_sentinel {
                *value = FieldValue::Null;
            }
        }
        Self { fields }
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.iter().find(|(k, _)| *k == name).map(|(_, v)| v)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn fields(&self) -> &[(&'static str, FieldValue)] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn number(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(FieldValue::as_i64)
    }

    pub fn string(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(FieldValue::as_str)
    }

    pub fn flag(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(FieldValue::as_bool)
    }

    pub fn client_ip(&self) -> Option<&str> {
        self.string("client_ip")
    }

    /// `None` when the proxy logged `<NOSRV>`
    pub fn server_name(&self) -> Option<&str> {
        self.string("server_name")
    }

    /// `None` when the proxy logged `<BADREQ>`
    pub fn http_request(&self) -> Option<&str> {
        self.string("http_request")
    }

    pub fn termination_state(&self) -> Option<&TerminationState> {
        self.get("termination_state").and_then(FieldValue::as_termination_state)
    }
}

impl Serialize for LogRecord {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serialize_fields_as_map(&self.fields, serializer)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("malformed log line: \"{line}\" (does not match {pattern})")]
    MalformedLine { line: String, pattern: Arc<str> },
}

impl DecodeError {
    /// The rejected input line
    pub fn line(&self) -> &str {
        match self {
            DecodeError::MalformedLine { line, .. } => line,
        }
    }
}

#[derive(Debug, Error)]
pub enum GrammarError {
    #[error("Invalid grammar pattern: {0}")]
    Compile(#[from] regex::Error),

    #[error("Pattern has {groups} capture groups but {descriptors} field descriptors")]
    GroupCount { groups: usize, descriptors: usize },

    #[error("Capture group {index} is {found:?}, expected field {expected}")]
    Desynchronized {
        index: usize,
        expected: &'static str,
        found: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(fields: Vec<(&'static str, FieldValue)>) -> LogRecord {
        LogRecord::from_fields(fields)
    }

    #[test]
    fn test_nosrv_becomes_null() {
        let rec = record(vec![("server_name", FieldValue::String("<NOSRV>".into()))]);
        assert!(rec.get("server_name").unwrap().is_null());
        assert_eq!(rec.server_name(), None);
    }

    #[test]
    fn test_badreq_becomes_null() {
        let rec = record(vec![("http_request", FieldValue::String("<BADREQ>".into()))]);
        assert!(rec.get("http_request").unwrap().is_null());
    }

    #[test]
    fn test_sentinel_only_applies_to_its_field() {
        // <NOSRV> in the backend column is an ordinary name
        let rec = record(vec![
            ("backend_name", FieldValue::String("<NOSRV>".into())),
            ("http_request", FieldValue::String("<NOSRV>".into())),
        ]);
        assert_eq!(rec.string("backend_name"), Some("<NOSRV>"));
        assert_eq!(rec.http_request(), Some("<NOSRV>"));
    }

    #[test]
    fn test_serialize_in_field_order() {
        let rec = record(vec![
            ("pid", FieldValue::Number(42)),
            ("server_name", FieldValue::String("<NOSRV>".into())),
            ("Tt_logasap", FieldValue::Boolean(true)),
        ]);
        let json = serde_json::to_string(&rec).unwrap();
        assert_eq!(json, r#"{"pid":42,"server_name":null,"Tt_logasap":true}"#);
    }

    #[test]
    fn test_accessor_type_mismatch() {
        let rec = record(vec![("pid", FieldValue::Number(7))]);
        assert_eq!(rec.number("pid"), Some(7));
        assert_eq!(rec.string("pid"), None);
        assert_eq!(rec.flag("missing"), None);
    }

    #[test]
    fn test_malformed_line_display() {
        let err = DecodeError::MalformedLine {
            line: "garbage".into(),
            pattern: Arc::from("^x$"),
        };
        assert_eq!(err.to_string(), r#"malformed log line: "garbage" (does not match ^x$)"#);
        assert_eq!(err.line(), "garbage");
    }
}
