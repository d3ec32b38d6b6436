//! Convenience result type alias for the estate console.

use crate::error::AppError;

/// A specialized `Result` type for estate console operations.
pub type AppResult<T> = Result<T, AppError>;
