//! Rendering of invocation results in the negotiated media type.

use crate::error::DispatchError;
use crate::media::MediaType;
use serde_json::Value;

/// Render `value` as `media`.
///
/// JSON (`application/json`, `*+json`, or an unresolved `*/*`) goes through
/// `serde_json`; XML (`application/xml`, `text/xml`, `*+xml`) through
/// [`to_xml`]; any other `text/*` type gets the plain string form.
pub fn render(value: &Value, media: &MediaType) -> Result<String, DispatchError> {
    let subtype = media.subtype();
    if subtype == "json" || subtype.ends_with("+json") || media == &MediaType::WILDCARD {
        return serde_json::to_string(value).map_err(|e| DispatchError::Render {
            media: media.clone(),
            reason: e.to_string(),
        });
    }
    if subtype == "xml" || subtype.ends_with("+xml") {
        return Ok(to_xml(value));
    }
    if media.kind() == "text" {
        return Ok(match value {
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        });
    }
    Err(DispatchError::Render {
        media: media.clone(),
        reason: "no renderer for this media type".to_string(),
    })
}

/// Serialize a JSON value as an XML document rooted at `<response>`.
///
/// Object keys become element names, array items become `<item>` elements
/// and `null` becomes an empty element.
pub fn to_xml(value: &Value) -> String {
    let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>");
    write_element(&mut out, "response", value);
    out
}

fn write_element(out: &mut String, name: &str, value: &Value) {
    if value.is_null() {
        out.push('<');
        out.push_str(name);
        out.push_str("/>");
        return;
    }
    out.push('<');
    out.push_str(name);
    out.push('>');
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                write_element(out, &element_name(key), child);
            }
        }
        Value::Array(items) => {
            for item in items {
                write_element(out, "item", item);
            }
        }
        Value::String(s) => escape_into(out, s),
        other => escape_into(out, &other.to_string()),
    }
    out.push_str("</");
    out.push_str(name);
    out.push('>');
}

fn element_name(key: &str) -> String {
    let mut name: String = key
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '_' | '-' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if !name.starts_with(|c: char| c.is_alphabetic() || c == '_') {
        name.insert(0, '_');
    }
    name
}

fn escape_into(out: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
}
