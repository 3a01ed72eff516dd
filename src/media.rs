//! # Media Types
//!
//! [`MediaType`] is the MIME value object used throughout a service definition:
//! handlers and definitions list what they produce and consume, and the
//! dispatch bridge negotiates against the request's `Accept` and
//! `Content-Type` headers.
//!
//! Negotiation is deliberately simple. Parameters other than `q` are ignored,
//! wildcards (`*/*`, `text/*`) are honoured on either side, and the first
//! acceptable entry in header order wins.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

/// A MIME type split into its `type` and `subtype` halves.
///
/// Both halves are stored lowercase so equality and hashing are
/// case-insensitive, as RFC 6838 requires.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MediaType {
    kind: Cow<'static, str>,
    subtype: Cow<'static, str>,
}

impl MediaType {
    /// `application/json`
    pub const APPLICATION_JSON: MediaType = MediaType::from_static("application", "json");
    /// `application/xml`
    pub const APPLICATION_XML: MediaType = MediaType::from_static("application", "xml");
    /// `text/plain`
    pub const TEXT_PLAIN: MediaType = MediaType::from_static("text", "plain");
    /// `application/x-www-form-urlencoded`
    pub const FORM_URLENCODED: MediaType =
        MediaType::from_static("application", "x-www-form-urlencoded");
    /// `*/*`
    pub const WILDCARD: MediaType = MediaType::from_static("*", "*");

    const fn from_static(kind: &'static str, subtype: &'static str) -> Self {
        MediaType {
            kind: Cow::Borrowed(kind),
            subtype: Cow::Borrowed(subtype),
        }
    }

    /// Create a media type from its two halves.
    pub fn new(kind: impl Into<String>, subtype: impl Into<String>) -> Self {
        Self {
            kind: Cow::Owned(kind.into().to_ascii_lowercase()),
            subtype: Cow::Owned(subtype.into().to_ascii_lowercase()),
        }
    }

    /// The primary type, e.g. `application`.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// The subtype, e.g. `json`.
    pub fn subtype(&self) -> &str {
        &self.subtype
    }

    /// Render as `type/subtype`.
    pub fn to_media_type(&self) -> String {
        format!("{}/{}", self.kind, self.subtype)
    }

    /// Whether two media types are compatible, honouring `*` on either side.
    pub fn matches(&self, other: &MediaType) -> bool {
        let kind_ok = self.kind == "*" || other.kind == "*" || self.kind == other.kind;
        let subtype_ok =
            self.subtype == "*" || other.subtype == "*" || self.subtype == other.subtype;
        kind_ok && subtype_ok
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.subtype)
    }
}

/// Error returned when a string is not a `type/subtype` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaTypeError {
    /// The rejected input
    pub input: String,
}

impl fmt::Display for MediaTypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid media type '{}': expected type/subtype", self.input)
    }
}

impl std::error::Error for MediaTypeError {}

impl FromStr for MediaType {
    type Err = MediaTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let essence = s.split(';').next().unwrap_or("").trim();
        let mut halves = essence.splitn(2, '/');
        match (halves.next(), halves.next()) {
            (Some(kind), Some(subtype))
                if !kind.is_empty() && !subtype.is_empty() && !subtype.contains('/') =>
            {
                Ok(MediaType::new(kind.trim(), subtype.trim()))
            }
            _ => Err(MediaTypeError {
                input: s.to_string(),
            }),
        }
    }
}

/// One entry of an `Accept` header.
#[derive(Debug, Clone, PartialEq)]
struct AcceptEntry {
    media: MediaType,
    quality: f32,
}

fn parse_accept(header: &str) -> Vec<AcceptEntry> {
    header
        .split(',')
        .filter_map(|part| {
            let part = part.trim();
            if part.is_empty() {
                return None;
            }
            let media = part.parse::<MediaType>().ok()?;
            let quality = part
                .split(';')
                .skip(1)
                .filter_map(|p| p.trim().strip_prefix("q="))
                .find_map(|q| q.trim().parse::<f32>().ok())
                .unwrap_or(1.0);
            Some(AcceptEntry { media, quality })
        })
        .collect()
}

/// Pick the media type to respond with.
///
/// With no `Accept` header (or an empty one) the first producible type is
/// used. Otherwise entries are tried in descending quality, header order
/// breaking ties, and the first producible type compatible with an entry is
/// chosen. Entries with `q=0` are refusals and never match.
pub fn negotiate(accept: Option<&str>, produces: &[MediaType]) -> Option<MediaType> {
    let accept = match accept.map(str::trim) {
        Some(a) if !a.is_empty() => a,
        _ => return produces.first().cloned(),
    };

    let mut entries = parse_accept(accept);
    if entries.is_empty() {
        return None;
    }
    // stable sort keeps header order among equal qualities
    entries.sort_by(|a, b| {
        b.quality
            .partial_cmp(&a.quality)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    entries
        .iter()
        .filter(|e| e.quality > 0.0)
        .find_map(|e| produces.iter().find(|p| e.media.matches(p)).cloned())
}

/// Whether a request `Content-Type` is one of the consumable types.
pub fn accepts(content_type: &str, consumes: &[MediaType]) -> bool {
    match content_type.parse::<MediaType>() {
        Ok(ct) => consumes.iter().any(|c| c.matches(&ct)),
        Err(_) => false,
    }
}
