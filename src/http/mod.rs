//! Shared HTTP plumbing: transport seam, retrying client, result shaping and polling.

pub mod client;
pub mod endpoint;
pub mod headers;
pub mod poll;
pub mod result;
pub mod transport;

pub use client::HttpClient;
pub use result::RequestResult;
pub use transport::{HttpTransport, OutgoingRequest, RawResponse, ReqwestTransport, TransportError};
