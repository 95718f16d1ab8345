//! Session state at disconnection.
//!
//! HAProxy logs a 4-character code describing how a session ended: the
//! cause, the session state when it ended, and the client and server
//! persistence-cookie status. The proxy documentation calls the backend
//! process the "server"; the names here say BACKEND for it and PROXY for
//! HAProxy itself.
//!
//! Unrecognized characters decode to `UNKNOWN(<char>)` instead of failing,
//! so newer proxy versions with additional codes still decode.

use std::fmt;
use serde::{Serialize, Serializer};

/// Why the session ended (first character).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TerminationCause {
    ClientAbort,
    BackendAbort,
    ProxyAbortOrReject,
    HandledByProxy,
    ResourceExhaustion,
    InternalError,
    Failover,
    Failback,
    AdminAbort,
    ClientDataTimeout,
    BackendDataTimeout,
    Normal,
    Unknown(char),
}

/// Termination cause codes (section 8.5 of the HAProxy 1.5 configuration manual)
const TERMINATION_CAUSES: [(char, TerminationCause); 12] = [
    ('C', TerminationCause::ClientAbort),
    ('S', TerminationCause::BackendAbort),
    ('P', TerminationCause::ProxyAbortOrReject),
    ('L', TerminationCause::HandledByProxy),
    ('R', TerminationCause::ResourceExhaustion),
    ('I', TerminationCause::InternalError),
    // session killed because its server was detected down
    ('D', TerminationCause::Failover),
    ('U', TerminationCause::Failback),
    ('K', TerminationCause::AdminAbort),
    ('c', TerminationCause::ClientDataTimeout),
    ('s', TerminationCause::BackendDataTimeout),
    ('-', TerminationCause::Normal),
];

impl TerminationCause {
    pub fn from_code(code: char) -> Self {
        TERMINATION_CAUSES
            .iter()
            .find(|(c, _)| *c == code)
            .map(|(_, cause)| *cause)
            .unwrap_or(TerminationCause::Unknown(code))
    }

    /// Symbolic name, `None` for unrecognized codes
    pub fn name(&self) -> Option<&'static str> {
        let name = match self {
            TerminationCause::ClientAbort => "CLIENT_ABORT",
            TerminationCause::BackendAbort => "BACKEND_ABORT",
            TerminationCause::ProxyAbortOrReject => "PROXY_ABORT_OR_REJECT",
            TerminationCause::HandledByProxy => "HANDLED_BY_PROXY",
            TerminationCause::ResourceExhaustion => "RESOURCE_EXHAUSTION",
            TerminationCause::InternalError => "INTERNAL_ERROR",
            TerminationCause::Failover => "FAILOVER",
            TerminationCause::Failback => "FAILBACK",
            TerminationCause::AdminAbort => "ADMIN_ABORT",
            TerminationCause::ClientDataTimeout => "CLIENT_DATA_TIMEOUT",
            TerminationCause::BackendDataTimeout => "BACKEND_DATA_TIMEOUT",
            TerminationCause::Normal => "NORMAL",
            TerminationCause::Unknown(_) => return None,
        };
        Some(name)
    }
}

impl fmt::Display for TerminationCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminationCause::Unknown(c) => write!(f, "UNKNOWN({c})"),
            known => f.write_str(known.name().unwrap_or_default()),
        }
    }
}

/// What the session was doing when it ended (second character).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateAtClose {
    PreClientRequest,
    QueuedForBackend,
    PreBackendConnection,
    WaitingForResponseHeaders,
    DataTransfer,
    FinalDataTransfer,
    Tarpitted,
    Normal,
    Unknown(char),
}

const STATES_AT_CLOSE: [(char, StateAtClose); 8] = [
    ('R', StateAtClose::PreClientRequest),
    ('Q', StateAtClose::QueuedForBackend),
    ('C', StateAtClose::PreBackendConnection),
    ('H', StateAtClose::WaitingForResponseHeaders),
    ('D', StateAtClose::DataTransfer),
    ('L', StateAtClose::FinalDataTransfer),
    ('T', StateAtClose::Tarpitted),
    ('-', StateAtClose::Normal),
];

impl StateAtClose {
    pub fn from_code(code: char) -> Self {
        STATES_AT_CLOSE
            .iter()
            .find(|(c, _)| *c == code)
            .map(|(_, state)| *state)
            .unwrap_or(StateAtClose::Unknown(code))
    }

    pub fn name(&self) -> Option<&'static str> {
        let name = match self {
            StateAtClose::PreClientRequest => "PRE_CLIENT_REQUEST",
            StateAtClose::QueuedForBackend => "QUEUED_FOR_BACKEND",
            StateAtClose::PreBackendConnection => "PRE_BACKEND_CONNECTION",
            StateAtClose::WaitingForResponseHeaders => "WAITING_FOR_RESPONSE_HEADERS",
            StateAtClose::DataTransfer => "DATA_TRANSFER",
            StateAtClose::FinalDataTransfer => "FINAL_DATA_TRANSFER",
            StateAtClose::Tarpitted => "TARPITTED",
            StateAtClose::Normal => "NORMAL",
            StateAtClose::Unknown(_) => return None,
        };
        Some(name)
    }
}

impl fmt::Display for StateAtClose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateAtClose::Unknown(c) => write!(f, "UNKNOWN({c})"),
            known => f.write_str(known.name().unwrap_or_default()),
        }
    }
}

/// Persistence-cookie status (third and fourth characters).
///
/// Only `-` (no cookie handling) has a fixed meaning in the base format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CookieStatus {
    NotApplicable,
    Unknown(char),
}

impl CookieStatus {
    pub fn from_code(code: char) -> Self {
        match code {
            '-' => CookieStatus::NotApplicable,
            other => CookieStatus::Unknown(other),
        }
    }
}

impl fmt::Display for CookieStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CookieStatus::NotApplicable => f.write_str("N/A"),
            CookieStatus::Unknown(c) => write!(f, "UNKNOWN({c})"),
        }
    }
}

fn serialize_display<T, S>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
where
    T: fmt::Display,
    S: Serializer,
{
    serializer.collect_str(value)
}

/// Decoded termination-state field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TerminationState {
    /// The 4 characters as logged
    pub raw: String,
    #[serde(serialize_with = "serialize_display")]
    pub termination_cause: TerminationCause,
    #[serde(serialize_with = "serialize_display")]
    pub state_at_close: StateAtClose,
    #[serde(serialize_with = "serialize_display")]
    pub persistence_cookie_client: CookieStatus,
    #[serde(serialize_with = "serialize_display")]
    pub persistence_cookie_server: CookieStatus,
}

impl TerminationState {
    /// Decode a termination-state token. Never fails; positions past the
    /// end of a short token decode as `UNKNOWN(?)`.
    pub fn decode(raw: &str) -> Self {
        let mut codes = raw.chars();
        let mut next = || codes.next().unwrap_or('?');

        let termination_cause = TerminationCause::from_code(next());
        let state_at_close = StateAtClose::from_code(next());
        let persistence_cookie_client = CookieStatus::from_code(next());
        let persistence_cookie_server = CookieStatus::from_code(next());

        Self {
            raw: raw.to_string(),
            termination_cause,
            state_at_close,
            persistence_cookie_client,
            persistence_cookie_server,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_client_data_timeout() {
        let ts = TerminationState::decode("cD--");
        assert_eq!(ts.raw, "cD--");
        assert_eq!(ts.termination_cause, TerminationCause::ClientDataTimeout);
        assert_eq!(ts.state_at_close, StateAtClose::DataTransfer);
        assert_eq!(ts.persistence_cookie_client, CookieStatus::NotApplicable);
        assert_eq!(ts.persistence_cookie_server, CookieStatus::NotApplicable);
    }

    #[test]
    fn test_decode_normal_session() {
        let ts = TerminationState::decode("----");
        assert_eq!(ts.termination_cause.to_string(), "NORMAL");
        assert_eq!(ts.state_at_close.to_string(), "NORMAL");
    }

    #[test]
    fn test_d_cause_is_failover() {
        let ts = TerminationState::decode("DC--");
        assert_eq!(ts.termination_cause, TerminationCause::Failover);
        assert_eq!(ts.state_at_close, StateAtClose::PreBackendConnection);
    }

    #[test]
    fn test_unknown_codes_keep_the_character() {
        let ts = TerminationState::decode("XZNI");
        assert_eq!(ts.termination_cause.to_string(), "UNKNOWN(X)");
        assert_eq!(ts.state_at_close.to_string(), "UNKNOWN(Z)");
        assert_eq!(ts.persistence_cookie_client.to_string(), "UNKNOWN(N)");
        assert_eq!(ts.persistence_cookie_server.to_string(), "UNKNOWN(I)");
    }

    #[test]
    fn test_every_table_entry_has_a_name() {
        for (code, cause) in TERMINATION_CAUSES {
            assert_eq!(TerminationCause::from_code(code), cause);
            assert!(cause.name().is_some(), "missing name for {code}");
        }
        for (code, state) in STATES_AT_CLOSE {
            assert_eq!(StateAtClose::from_code(code), state);
            assert!(state.name().is_some(), "missing name for {code}");
        }
    }

    #[test]
    fn test_short_token_does_not_panic() {
        let ts = TerminationState::decode("C");
        assert_eq!(ts.termination_cause, TerminationCause::ClientAbort);
        assert_eq!(ts.state_at_close, StateAtClose::Unknown('?'));
        assert_eq!(ts.persistence_cookie_server, CookieStatus::Unknown('?'));
    }

    #[test]
    fn test_serialize_symbolic_names() {
        let ts = TerminationState::decode("sQ-x");
        let json = serde_json::to_value(&ts).unwrap();
        assert_eq!(json["raw"], "sQ-x");
        assert_eq!(json["termination_cause"], "BACKEND_DATA_TIMEOUT");
        assert_eq!(json["state_at_close"], "QUEUED_FOR_BACKEND");
        assert_eq!(json["persistence_cookie_client"], "N/A");
        assert_eq!(json["persistence_cookie_server"], "UNKNOWN(x)");
    }
}
