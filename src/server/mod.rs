pub mod listener;
pub mod request;
pub mod response;
pub mod service;

pub use listener::{serve, ServerHandle};
pub use request::{parse_body, parse_query_params, parse_request, ParsedRequest};
pub use response::{write_handler_response, write_json_error};
pub use service::{health_endpoint, metrics_endpoint, AppService};
