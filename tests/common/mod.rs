#![allow(dead_code)]

use restdef::cli::bind_address_books;
use restdef::config::AppConfig;
use restdef::definition::ServiceDefinition;
use restdef::generator::{Host, InstallStyle};
use restdef::middleware::{MetricsMiddleware, Middleware, TracingMiddleware};
use restdef::server::{serve, AppService, ServerHandle};
use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::{Arc, Once};
use std::time::Duration;

static INIT: Once = Once::new();

/// Coroutine stack size and a test-writer subscriber, once per test binary.
pub fn setup() {
    INIT.call_once(|| {
        may::config().set_stack_size(0x8000);
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .try_init();
    });
}

/// A running server with the address books bound on it.
pub struct TestServer {
    pub addr: SocketAddr,
    pub host: Host,
    pub metrics: Arc<MetricsMiddleware>,
    pub definitions: Vec<ServiceDefinition>,
    handle: Option<ServerHandle>,
}

impl TestServer {
    pub fn start(style: InstallStyle, form_params: &[&str]) -> Self {
        let mut config = AppConfig::default();
        config.server.style = style;
        config.service.form_params = form_params.iter().map(|p| p.to_string()).collect();
        Self::with_config(&config)
    }

    pub fn with_config(config: &AppConfig) -> Self {
        setup();
        let host = Host::new();
        let metrics = Arc::new(MetricsMiddleware::new());
        host.add_middleware(Arc::new(TracingMiddleware)).unwrap();
        host.add_middleware(Arc::clone(&metrics) as Arc<dyn Middleware>)
            .unwrap();
        let definitions = bind_address_books(config, &host).unwrap();
        Self::serve(host, metrics, definitions)
    }

    /// Serve an already populated host.
    pub fn serve(
        host: Host,
        metrics: Arc<MetricsMiddleware>,
        definitions: Vec<ServiceDefinition>,
    ) -> Self {
        setup();
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let mut service = AppService::from_host(&host);
        service.set_metrics_middleware(Arc::clone(&metrics));
        let handle = serve(service, addr).unwrap();
        handle.wait_ready(Duration::from_secs(2)).unwrap();
        Self {
            addr,
            host,
            metrics,
            definitions,
            handle: Some(handle),
        }
    }

    pub fn send(&self, req: &str) -> TestResponse {
        parse_response(&send_request(&self.addr, req))
    }

    pub fn get(&self, path: &str, accept: &str) -> TestResponse {
        self.send(&format!(
            "GET {path} HTTP/1.1\r\nHost: localhost\r\nAccept: {accept}\r\n\r\n"
        ))
    }

    pub fn put(&self, path: &str) -> TestResponse {
        self.send(&format!(
            "PUT {path} HTTP/1.1\r\nHost: localhost\r\nContent-Length: 0\r\n\r\n"
        ))
    }

    pub fn delete(&self, path: &str) -> TestResponse {
        self.send(&format!("DELETE {path} HTTP/1.1\r\nHost: localhost\r\n\r\n"))
    }

    pub fn post(&self, path: &str, content_type: &str, body: &str) -> TestResponse {
        self.send(&format!(
            "POST {path} HTTP/1.1\r\nHost: localhost\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\n\r\n{body}",
            body.len()
        ))
    }

    pub fn post_form(&self, path: &str, body: &str) -> TestResponse {
        self.post(path, "application/x-www-form-urlencoded", body)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.stop();
        }
    }
}

#[derive(Debug)]
pub struct TestResponse {
    pub status: u16,
    /// Lowercase header names
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl TestResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).unwrap_or_default()
    }
}

/// Write `req` and read one response, using `Content-Length` to find its end.
pub fn send_request(addr: &SocketAddr, req: &str) -> String {
    let mut stream = TcpStream::connect(addr).unwrap();
    stream.write_all(req.as_bytes()).unwrap();
    stream
        .set_read_timeout(Some(Duration::from_millis(2000)))
        .unwrap();
    let mut buf = Vec::new();
    loop {
        let mut tmp = [0u8; 1024];
        match stream.read(&mut tmp) {
            Ok(0) => break,
            Ok(n) => {
                buf.extend_from_slice(&tmp[..n]);
                if response_complete(&buf) {
                    break;
                }
            }
            Err(ref e)
                if e.kind() == std::io::ErrorKind::WouldBlock
                    || e.kind() == std::io::ErrorKind::TimedOut =>
            {
                break
            }
            Err(e) => panic!("read error: {e:?}"),
        }
    }
    String::from_utf8_lossy(&buf).to_string()
}

fn response_complete(buf: &[u8]) -> bool {
    let text = String::from_utf8_lossy(buf);
    let Some(split) = text.find("\r\n\r\n") else {
        return false;
    };
    let content_length = text[..split]
        .lines()
        .filter_map(|l| l.split_once(':'))
        .find(|(k, _)| k.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.trim().parse::<usize>().ok())
        .unwrap_or(0);
    buf.len() >= split + 4 + content_length
}

pub fn parse_response(resp: &str) -> TestResponse {
    let (head, body) = resp.split_once("\r\n\r\n").unwrap_or((resp, ""));
    let mut lines = head.lines();
    let status = lines
        .next()
        .and_then(|l| l.split_whitespace().nth(1))
        .and_then(|s| s.parse().ok())
        .unwrap_or(0);
    let headers = lines
        .filter_map(|l| l.split_once(':'))
        .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
        .collect();
    TestResponse {
        status,
        headers,
        body: body.to_string(),
    }
}
