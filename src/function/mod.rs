//! The HTTP-triggered function
//!
//! Independent of the server: it receives an [`InboundRequest`], may call the
//! [`Upstream`] once, and always yields a [`FunctionResponse`].

pub mod request;
pub mod response;
pub mod trigger;
pub mod upstream;

pub use request::{parse_body, InboundRequest};
pub use response::FunctionResponse;
pub use trigger::invoke;
pub use upstream::{HyperUpstream, Upstream};
