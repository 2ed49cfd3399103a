//! # HTTP
//!
//! Request templates, the builder that resolves them, the resolved
//! request/response values and the transport seam.

pub mod builder;
pub mod client;
pub mod method;
pub mod request;
pub mod response;
pub mod template;

pub use builder::RequestBuilder;
pub use client::{ReqwestTransport, Transport};
pub use method::HttpMethod;
pub use request::{Body, Request};
pub use response::Response;
pub use template::RequestTemplate;
