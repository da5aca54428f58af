//! HTTP protocol layer module
//!
//! Response builders shared by the router, decoupled from the function itself.

pub mod response;

pub use response::{
    build_404_response, build_405_response, build_413_response, build_function_response,
    build_health_response, build_options_response,
};
