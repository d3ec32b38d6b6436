//! # estate-core
//!
//! Core crate for the estate console session layer. Contains the
//! configuration schemas, the collaborator traits the host UI implements,
//! shared types, and the unified error system.
//!
//! This crate has **no** internal dependencies on other estate crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::{AppError, Disposition, ErrorKind};
pub use result::AppResult;
