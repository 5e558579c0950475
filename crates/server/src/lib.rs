//! HTTP transport for the receiver page's bridge calls.

mod http;

pub use http::{Server, router};
