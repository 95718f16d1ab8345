use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use super::model::{FieldType, FieldValue};
use super::termination::TerminationState;

/// Coerce one captured substring into a typed value.
///
/// The grammar's character classes already guarantee the substring is
/// syntactically valid for its type, so this never fails. A date token that
/// is not a timestamp decodes to [`FieldValue::Null`].
pub fn decode_field(raw: &str, field_type: FieldType) -> FieldValue {
    match field_type {
        FieldType::String => FieldValue::String(raw.to_string()),
        FieldType::Number => FieldValue::Number(parse_number(raw)),
        FieldType::Date => parse_date(raw).map_or(FieldValue::Null, FieldValue::Date),
        FieldType::Ip => FieldValue::Ip(normalize_ip(raw).to_string()),
        FieldType::Boolean => FieldValue::Boolean(!raw.is_empty()),
        FieldType::TerminationState => FieldValue::TerminationState(TerminationState::decode(raw)),
    }
}

/// Digit runs longer than `i64` saturate.
fn parse_number(raw: &str) -> i64 {
    match raw.parse::<i64>() {
        Ok(n) => n,
        Err(e) => {
            let saturated = if raw.starts_with('-') { i64::MIN } else { i64::MAX };
            tracing::warn!(value = raw, error = %e, saturated, "number out of range");
            saturated
        }
    }
}

/// Offset forms tried after RFC 3339 (`+0100` has no colon).
const OFFSET_DATE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%dT%H:%M%z"];

/// Forms without an offset, taken as UTC.
const NAIVE_DATE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

/// ISO-8601 timestamp or calendar date. A bare date is midnight UTC.
fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in OFFSET_DATE_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(raw, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    for fmt in NAIVE_DATE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// HAProxy sometimes logs IPv4 peers as IPv4-mapped IPv6 (`::ffff:A.B.C.D`).
/// Return the IPv4 part in that case, the input unchanged otherwise.
pub fn normalize_ip(ip: &str) -> &str {
    match ip.strip_prefix("::ffff:") {
        Some(v4) if is_dotted_quad(v4) => v4,
        _ => ip,
    }
}

fn is_dotted_quad(s: &str) -> bool {
    let mut octets = 0;
    for part in s.split('.') {
        if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
            return false;
        }
        octets += 1;
    }
    octets == 4
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_ipv4_mapped_is_folded() {
        assert_eq!(normalize_ip("::ffff:10.0.0.1"), "10.0.0.1");
    }

    #[test]
    fn test_plain_ipv4_unchanged() {
        assert_eq!(normalize_ip("10.0.0.1"), "10.0.0.1");
    }

    #[test]
    fn test_ipv6_unchanged() {
        assert_eq!(normalize_ip("fe80::1"), "fe80::1");
        assert_eq!(normalize_ip("::ffff:abcd"), "::ffff:abcd");
        assert_eq!(normalize_ip("::ffff:10.0.1"), "::ffff:10.0.1");
    }

    #[test]
    fn test_number_and_unknown_timer() {
        assert_eq!(decode_field("1500", FieldType::Number), FieldValue::Number(1500));
        assert_eq!(decode_field("-1", FieldType::Number), FieldValue::Number(-1));
    }

    #[test]
    fn test_number_saturates() {
        let v = decode_field("99999999999999999999999", FieldType::Number);
        assert_eq!(v, FieldValue::Number(i64::MAX));
    }

    #[test]
    fn test_boolean_flag() {
        assert_eq!(decode_field("+", FieldType::Boolean), FieldValue::Boolean(true));
        assert_eq!(decode_field("", FieldType::Boolean), FieldValue::Boolean(false));
    }

    #[test]
    fn test_date_rfc3339() {
        let v = decode_field("2017-03-16T23:31:07+01:00", FieldType::Date);
        let expected = Utc.with_ymd_and_hms(2017, 3, 16, 22, 31, 7).unwrap();
        assert_eq!(v.as_date(), Some(&expected));
    }

    #[test]
    fn test_date_without_offset_is_utc() {
        let v = decode_field("2017-03-16T22:31:07.250", FieldType::Date);
        let d = v.as_date().unwrap();
        assert_eq!(d.timestamp(), Utc.with_ymd_and_hms(2017, 3, 16, 22, 31, 7).unwrap().timestamp());
        assert_eq!(d.timestamp_subsec_millis(), 250);
    }

    #[test]
    fn test_date_offset_without_colon() {
        let v = decode_field("2017-03-16T23:31:07+0100", FieldType::Date);
        let expected = Utc.with_ymd_and_hms(2017, 3, 16, 22, 31, 7).unwrap();
        assert_eq!(v.as_date(), Some(&expected));
    }

    #[test]
    fn test_date_without_seconds() {
        let v = decode_field("2017-03-16T22:31", FieldType::Date);
        let expected = Utc.with_ymd_and_hms(2017, 3, 16, 22, 31, 0).unwrap();
        assert_eq!(v.as_date(), Some(&expected));
    }

    #[test]
    fn test_bare_date_is_midnight_utc() {
        let v = decode_field("2017-03-16", FieldType::Date);
        let expected = Utc.with_ymd_and_hms(2017, 3, 16, 0, 0, 0).unwrap();
        assert_eq!(v.as_date(), Some(&expected));
    }

    #[test]
    fn test_date_with_microseconds() {
        let v = decode_field("2017-03-16T22:31:07.123456Z", FieldType::Date);
        assert_eq!(v.as_date().unwrap().timestamp_subsec_micros(), 123456);
    }

    #[test]
    fn test_invalid_date_is_null() {
        assert!(decode_field("Mar", FieldType::Date).is_null());
        assert!(decode_field("2017-13-45", FieldType::Date).is_null());
        assert!(decode_field("Mar", FieldType::Date).is_null());
    }

    #[test]
    fn test_string_verbatim() {
        let v = decode_field("GET /a%20b HTTP/1.1", FieldType::String);
        assert_eq!(v.as_str(), Some("GET /a%20b HTTP/1.1"));
    }

    #[test]
    fn test_termination_state_delegates() {
        let v = decode_field("CR--", FieldType::TerminationState);
        let ts = v.as_termination_state().unwrap();
        assert_eq!(ts.termination_cause.to_string(), "CLIENT_ABORT");
        assert_eq!(ts.state_at_close.to_string(), "PRE_CLIENT_REQUEST");
    }
}
