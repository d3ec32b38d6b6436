//! HTTP clients for the session endpoints.

pub mod http;

pub use http::HttpSessionApi;
