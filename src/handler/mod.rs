//! Request handler module
//!
//! Turns HTTP requests into function invocations and back.

pub mod router;

// Re-export main entry point
pub use router::handle_request;
