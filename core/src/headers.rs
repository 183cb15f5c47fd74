//! Response header block decoding.
//!
//! # Design
//! The decoder works on the raw header bytes exactly as they came off the
//! wire: the status line is dropped, every other non-blank line must be
//! `Name: Value`. One bad line fails the whole block so callers never see a
//! half-decoded map.
//!
//! `Link` is the only header with structure. Its value is kept verbatim under
//! `_raw` and every `<url>; rel="name"` pair found in it becomes a relation
//! entry. Header names are compared case-sensitively.

use std::collections::{BTreeMap, HashMap};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::error::ParseError;

/// Name of the header that gets relation parsing.
pub const LINK_HEADER: &str = "Link";

/// Key under which the untouched `Link` value is exposed.
pub const RAW_KEY: &str = "_raw";

static LINK_RELATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<(.*?)>\s*;\s*rel\s*=\s*"(.*?)"\s*"#).expect("link relation pattern is valid")
});

/// A parsed `Link` header value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkHeader {
    raw: String,
    relations: BTreeMap<String, String>,
}

impl LinkHeader {
    /// Extract every `<url>; rel="name"` pair from `raw`. A relation name
    /// that appears twice keeps the later URL.
    pub fn parse(raw: &str) -> Self {
        let relations = LINK_RELATION
            .captures_iter(raw)
            .map(|caps| (caps[2].to_string(), caps[1].to_string()))
            .collect();
        Self {
            raw: raw.to_string(),
            relations,
        }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Target URL for relation `rel`, e.g. `"next"`.
    pub fn get(&self, rel: &str) -> Option<&str> {
        self.relations.get(rel).map(String::as_str)
    }

    pub fn relations(&self) -> &BTreeMap<String, String> {
        &self.relations
    }

    /// Flatten into the `{_raw: .., rel: url, ..}` shape. A relation literally
    /// named `_raw` replaces the raw entry.
    pub fn to_map(&self) -> BTreeMap<String, String> {
        let mut map = BTreeMap::new();
        map.insert(RAW_KEY.to_string(), self.raw.clone());
        map.extend(self.relations.clone());
        map
    }
}

impl Serialize for LinkHeader {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let flat = self.to_map();
        let mut map = serializer.serialize_map(Some(flat.len()))?;
        for (key, value) in &flat {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// A single decoded header value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderValue {
    Text(String),
    Link(LinkHeader),
}

impl HeaderValue {
    /// The value as it appeared on the wire.
    pub fn as_str(&self) -> &str {
        match self {
            HeaderValue::Text(value) => value,
            HeaderValue::Link(link) => link.raw(),
        }
    }
}

impl Serialize for HeaderValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            HeaderValue::Text(value) => serializer.serialize_str(value),
            HeaderValue::Link(link) => link.serialize(serializer),
        }
    }
}

/// Decoded response headers, keyed by the name exactly as sent.
///
/// Lookups are case-sensitive. A transport that normalises names hands them
/// over in `Title-Case`, so irregular names arrive as `Etag` and
/// `Www-Authenticate` rather than `ETag` and `WWW-Authenticate`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderMap {
    entries: HashMap<String, HeaderValue>,
}

impl HeaderMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` under `name`, replacing any earlier value.
    pub fn insert(&mut self, name: impl Into<String>, value: HeaderValue) {
        self.entries.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&HeaderValue> {
        self.entries.get(name)
    }

    /// Header value as a string slice. For `Link` this is the raw value.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).map(HeaderValue::as_str)
    }

    /// The parsed `Link` header, if the response had one.
    pub fn link(&self) -> Option<&LinkHeader> {
        match self.entries.get(LINK_HEADER) {
            Some(HeaderValue::Link(link)) => Some(link),
            _ => None,
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &HeaderValue)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value))
    }
}

impl Serialize for HeaderMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, value) in &self.entries {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Decode a raw header block (status line included) into a `HeaderMap`.
pub fn parse_headers(block: &str) -> Result<HeaderMap, ParseError> {
    let mut headers = HeaderMap::new();

    for line in block.split("\r\n").skip(1) {
        let line = line.trim_start();
        if line.trim_end().is_empty() {
            continue;
        }

        // The separator is looked up before trimming so `Name: ` keeps its
        // empty value. A bare trailing `:` is the same header with the
        // padding already stripped.
        let (name, value) = match line.split_once(": ") {
            Some((name, value)) => (name, value.trim()),
            None => match line.trim_end().strip_suffix(':') {
                Some(name) if !name.is_empty() => (name, ""),
                _ => {
                    return Err(ParseError::MalformedLine {
                        line: line.trim_end().to_string(),
                    })
                }
            },
        };

        let value = if name == LINK_HEADER {
            HeaderValue::Link(LinkHeader::parse(value))
        } else {
            HeaderValue::Text(value.to_string())
        };
        headers.insert(name, value);
    }

    Ok(headers)
}
