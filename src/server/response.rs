use crate::dispatcher::{HandlerResponse, ResponseBody};
use dashmap::DashMap;
use may_minihttp::Response;
use serde_json::Value;
use std::sync::OnceLock;

pub(crate) fn status_reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        400 => "Bad Request",
        401 => "Unauthorized",
        404 => "Not Found",
        405 => "Method Not Allowed",
        406 => "Not Acceptable",
        415 => "Unsupported Media Type",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "OK",
    }
}

/// `may_minihttp` only takes `'static` header lines. Each distinct line is
/// leaked once and reused; handlers emit a small fixed set of content types.
fn intern_header(name: &str, value: &str) -> &'static str {
    static LINES: OnceLock<DashMap<String, &'static str>> = OnceLock::new();
    let lines = LINES.get_or_init(DashMap::new);
    let line = format!("{name}: {value}");
    if let Some(found) = lines.get(&line) {
        return *found;
    }
    *lines
        .entry(line.clone())
        .or_insert_with(|| Box::leak(line.into_boxed_str()))
}

/// Write a dispatcher response to the wire.
pub fn write_handler_response(res: &mut Response, hr: HandlerResponse) {
    res.status_code(hr.status as usize, status_reason(hr.status));
    for (name, value) in &hr.headers {
        res.header(intern_header(name, value));
    }
    match hr.body {
        ResponseBody::Empty => {}
        ResponseBody::Text(text) => res.body_vec(text.into_bytes()),
        ResponseBody::Json(value) => match serde_json::to_vec(&value) {
            Ok(bytes) => res.body_vec(bytes),
            Err(e) => res.body_vec(
                serde_json::json!({ "error": e.to_string() })
                    .to_string()
                    .into_bytes(),
            ),
        },
    }
}

pub fn write_json_error(res: &mut Response, status: u16, body: Value) {
    res.status_code(status as usize, status_reason(status));
    res.header("Content-Type: application/json");
    res.body_vec(body.to_string().into_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_reason() {
        assert_eq!(status_reason(200), "OK");
        assert_eq!(status_reason(406), "Not Acceptable");
        assert_eq!(status_reason(415), "Unsupported Media Type");
    }

    #[test]
    fn test_intern_header_reuses_lines() {
        let a = intern_header("content-type", "application/xml");
        let b = intern_header("content-type", "application/xml");
        assert_eq!(a, "content-type: application/xml");
        assert!(std::ptr::eq(a, b));
    }
}
