use serde::{Serialize, Serializer};
use serde::ser::SerializeMap;

/// Serialize ordered `(name, value)` pairs as a map, keeping their order.
pub fn serialize_fields_as_map<S, K, V>(fields: &[(K, V)], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    K: AsRef<str>,
    V: Serialize,
{
    let mut map = serializer.serialize_map(Some(fields.len()))?;
    for (k, v) in fields {
        map.serialize_entry(k.as_ref(), v)?;
    }
    map.end()
}

#[cfg(test)]
mod tests {
    use super::*;

    // Helper: serialize fields via serde_json
    fn serialize_fields<V: Serialize>(fields: &[(&str, V)]) -> String {
        let mut buf = Vec::new();
        serialize_fields_as_map(fields, &mut serde_json::Serializer::new(&mut buf)).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_serialize_empty_fields() {
        let json = serialize_fields::<i64>(&[]);
        assert_eq!(json, "{}");
    }

    #[test]
    fn test_serialize_keeps_order() {
        let fields = [("z", 1), ("a", 2), ("m", 3)];
        let json = serialize_fields(&fields);
        assert_eq!(json, r#"{"z":1,"a":2,"m":3}"#);
    }

    #[test]
    fn test_serialize_special_characters() {
        let fields = [
            ("http_request", "GET /api/users?id=123&name=\"foo\" HTTP/1.1"),
            ("path", "line with \\backslashes"),
        ];
        let json = serialize_fields(&fields);
        // Should be valid JSON
        let v: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(v["path"], "line with \\backslashes");
    }
}
