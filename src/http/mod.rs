//! HTTP protocol layer module
//!
//! Request-field decoding and response building, decoupled from routing.

pub mod form;
pub mod response;

// Re-export commonly used types
pub use form::{build_query, is_form_content_type, parse_urlencoded};
pub use response::{
    build_400_response, build_404_response, build_413_response, build_500_response, Reply,
};
