pub mod auth;
pub mod directives;
pub mod security_headers;

pub use security_headers::SecurityHeaders;
