//! Integration tests for estate-console.

mod realtime_test;
mod session_test;
