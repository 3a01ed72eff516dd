use crate::dispatcher::{HeaderVec, RequestBody};
use crate::media::MediaType;
use crate::router::ParamVec;
use may_minihttp::Request;
use std::io::Read;
use std::sync::Arc;
use tracing::{debug, info};

/// Parsed HTTP request data used by `AppService`.
#[derive(Debug, PartialEq)]
pub struct ParsedRequest {
    pub method: String,
    /// Request path without the query string
    pub path: String,
    /// HTTP headers (lowercase names)
    pub headers: HeaderVec,
    pub query_params: ParamVec,
    pub body: RequestBody,
}

/// Parse query string parameters from a URL path.
///
/// Everything after the first `?` is URL-decoded; repeated names are kept
/// in order.
pub fn parse_query_params(path: &str) -> ParamVec {
    match path.split_once('?') {
        Some((_, query)) => url::form_urlencoded::parse(query.as_bytes())
            .map(|(k, v)| (Arc::from(k.as_ref()), v.into_owned()))
            .collect(),
        None => ParamVec::new(),
    }
}

/// Classify a request entity by its content type.
///
/// Form-encoded bodies become [`RequestBody::Form`]; anything else is kept
/// as text. An empty body is [`RequestBody::Empty`] whatever the header says.
pub fn parse_body(content_type: Option<&str>, text: String) -> RequestBody {
    if text.is_empty() {
        return RequestBody::Empty;
    }
    let is_form = content_type
        .and_then(|ct| ct.parse::<MediaType>().ok())
        .is_some_and(|mt| mt == MediaType::FORM_URLENCODED);
    if is_form {
        RequestBody::Form(
            url::form_urlencoded::parse(text.as_bytes())
                .map(|(k, v)| (Arc::from(k.as_ref()), v.into_owned()))
                .collect(),
        )
    } else {
        RequestBody::Raw {
            content_type: content_type.map(str::to_string),
            text,
        }
    }
}

/// Extract method, path, headers, query and body from a `may_minihttp::Request`.
pub fn parse_request(req: Request) -> ParsedRequest {
    let method = req.method().to_string();
    let raw_path = req.path().to_string();
    let path = raw_path.split('?').next().unwrap_or("/").to_string();

    // R1: Headers extracted
    let headers: HeaderVec = req
        .headers()
        .iter()
        .map(|h| {
            (
                Arc::from(h.name.to_ascii_lowercase().as_str()),
                String::from_utf8_lossy(h.value).to_string(),
            )
        })
        .collect();
    debug!(
        header_count = headers.len(),
        header_names = ?headers.iter().map(|(k, _)| k.as_ref()).collect::<Vec<_>>(),
        "Headers extracted"
    );

    // R2: Query params parsed
    let query_params = parse_query_params(&raw_path);
    debug!(
        param_count = query_params.len(),
        query_params = ?query_params,
        "Query params parsed"
    );

    let content_type = headers
        .iter()
        .find(|(k, _)| k.as_ref() == "content-type")
        .map(|(_, v)| v.clone());

    // R3: Request body read
    let mut text = String::new();
    let body = match req.body().read_to_string(&mut text) {
        Ok(size) => {
            if size > 0 {
                info!(
                    body_size_bytes = size,
                    content_type = content_type.as_deref().unwrap_or(""),
                    "Request body read"
                );
            }
            parse_body(content_type.as_deref(), text)
        }
        Err(e) => {
            debug!(error = %e, "Request body unreadable");
            RequestBody::Empty
        }
    };

    // R4: HTTP request parsed
    info!(
        method = %method,
        path = %path,
        headers_count = headers.len(),
        "HTTP request parsed"
    );

    ParsedRequest {
        method,
        path,
        headers,
        query_params,
        body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_query_params() {
        let q = parse_query_params("/p?x=1&y=a%20b");
        assert_eq!(q.len(), 2);
        assert_eq!(q[0].0.as_ref(), "x");
        assert_eq!(q[1].1, "a b");
        assert!(parse_query_params("/p").is_empty());
    }

    #[test]
    fn test_parse_form_body() {
        let body = parse_body(
            Some("application/x-www-form-urlencoded; charset=utf-8"),
            "update=foo&update2=bar+baz".to_string(),
        );
        assert_eq!(body.form_field("update"), Some("foo"));
        assert_eq!(body.form_field("update2"), Some("bar baz"));
    }

    #[test]
    fn test_parse_raw_and_empty_body() {
        let raw = parse_body(Some("application/json"), "{\"entries\":[]}".to_string());
        assert!(matches!(raw, RequestBody::Raw { ref content_type, .. }
            if content_type.as_deref() == Some("application/json")));
        assert_eq!(
            parse_body(Some("application/json"), String::new()),
            RequestBody::Empty
        );
    }
}
