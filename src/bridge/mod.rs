//! # Dispatch Bridge
//!
//! The request-time half of a bound definition. A [`DispatchResource`] looks
//! up the handler for the request's service token, checks the verb and media
//! types, calls the resolved entity method or action, and renders the
//! result. Route installers wrap it into host handlers and translate
//! [`DispatchError`](crate::error::DispatchError)s into replies.
//!
//! Status codes on success:
//!
//! | verb   | status                          |
//! |--------|---------------------------------|
//! | GET    | 200                             |
//! | PUT    | 201, body omitted when `null`   |
//! | POST   | 200, or 204 when `null`         |
//! | DELETE | 200, echoing the returned value |

mod core;
mod invoker;
mod render;

pub use core::{DispatchRequest, DispatchResource, DispatchResponse, ID_PARAM, SERVICE_PARAM};
pub use invoker::{resolve_invoker, Invoker};
pub use render::{render, to_xml};
