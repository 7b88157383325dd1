//! Query-string model with stable parameter order.
//!
//! Values are percent-encoded on output. Besides the RFC 3986 unreserved set,
//! `,` `:` `/` `@` and `!` stay literal so coordinate pairs and dates remain
//! readable in shared links. Decoding accepts `+` as a space and keeps
//! malformed escapes verbatim.

use std::fmt;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses `?a=1&b=2` or `a=1&b=2`. A repeated key keeps its first
    /// position and its last value.
    pub fn parse(search: &str) -> Self {
        let mut params = QueryParams::new();
        let query = search.strip_prefix('?').unwrap_or(search);
        for segment in query.split('&') {
            if segment.is_empty() {
                continue;
            }
            let (key, value) = segment.split_once('=').unwrap_or((segment, ""));
            let key = decode_component(key);
            if key.is_empty() {
                continue;
            }
            params.set(key, decode_component(value));
        }
        params
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Replaces the value in place, or appends a new parameter.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.pairs.iter_mut().find(|(k, _)| *k == key) {
            Some((_, v)) => *v = value,
            None => self.pairs.push((key, value)),
        }
    }

    pub fn remove(&mut self, key: &str) -> bool {
        let before = self.pairs.len();
        self.pairs.retain(|(k, _)| k != key);
        self.pairs.len() != before
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Serialized form without the leading `?`; empty when there are no params.
    pub fn to_query_string(&self) -> String {
        self.pairs
            .iter()
            .map(|(k, v)| format!("{}={}", encode_component(k), encode_component(v)))
            .collect::<Vec<_>>()
            .join("&")
    }
}

impl fmt::Display for QueryParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_query_string())
    }
}

fn is_literal(b: u8) -> bool {
    b.is_ascii_alphanumeric()
        || matches!(
            b,
            b'-' | b'_' | b'.' | b'~' | b',' | b':' | b'/' | b'@' | b'!'
        )
}

pub fn encode_component(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for b in raw.bytes() {
        if is_literal(b) {
            out.push(b as char);
        } else {
            out.push_str(&format!("%{b:02X}"));
        }
    }
    out
}

pub fn decode_component(raw: &str) -> String {
    let bytes = raw.as_bytes();
    let mut out: Vec<u8> = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b'%' if i + 2 < bytes.len() => {
                match (hex_value(bytes[i + 1]), hex_value(bytes[i + 2])) {
                    (Some(hi), Some(lo)) => {
                        out.push(hi << 4 | lo);
                        i += 3;
                    }
                    _ => {
                        out.push(b'%');
                        i += 1;
                    }
                }
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parse_strips_question_mark_and_decodes() {
        let q = QueryParams::parse("?center=10.5,20&colorMap=rd%20bu&empty=&flag");
        assert_eq!(q.get("center"), Some("10.5,20"));
        assert_eq!(q.get("colorMap"), Some("rd bu"));
        assert_eq!(q.get("empty"), Some(""));
        assert_eq!(q.get("flag"), Some(""));
        assert_eq!(q.get("missing"), None);
    }

    #[test]
    fn set_keeps_position_and_remove_drops() {
        let mut q = QueryParams::parse("a=1&b=2");
        q.set("a", "3");
        q.set("c", "4");
        assert_eq!(q.to_query_string(), "a=3&b=2&c=4");
        assert!(q.remove("b"));
        assert!(!q.remove("b"));
        assert_eq!(q.to_query_string(), "a=3&c=4");
    }

    #[test]
    fn encodes_reserved_characters() {
        assert_eq!(encode_component("10.000000,-5.250000"), "10.000000,-5.250000");
        assert_eq!(encode_component("1,2|3,4"), "1,2%7C3,4");
        assert_eq!(encode_component(r#"{"a":["x y"]}"#), "%7B%22a%22:%5B%22x%20y%22%5D%7D");
        assert_eq!(encode_component("a+b&c=d"), "a%2Bb%26c%3Dd");
    }

    #[test]
    fn decode_is_lenient() {
        assert_eq!(decode_component("a+b"), "a b");
        assert_eq!(decode_component("100%"), "100%");
        assert_eq!(decode_component("%zz"), "%zz");
        assert_eq!(decode_component("%7C"), "|");
        assert_eq!(decode_component("caf%C3%A9"), "café");
    }

    #[test]
    fn encoded_values_parse_back() {
        let mut q = QueryParams::new();
        q.set("taxonomy", r#"{"Topics":["air quality"]}"#);
        q.set("aoi", "1,2|3,4|5,6");
        let back = QueryParams::parse(&q.to_query_string());
        assert_eq!(back, q);
    }
}
