//! Centralized error handling for audio-mirror
//!
//! Errors are split by layer so callers can tell a broken configuration
//! apart from an upstream that is merely down:
//!
//! - **Configuration errors**: missing endpoint definitions, missing API
//!   names, invalid mapping tables. Fatal to the calling operation.
//! - **Transport errors**: network failures and non-2xx responses. Never
//!   retried here; aggregators collect them and keep going.
//! - **Decode errors**: the payload did not have the shape the mapping
//!   expects. Fatal for that single decode call.
//! - **Cache errors**: filesystem failures in the staleness cache. Reads
//!   degrade to a miss, writes are reported without dropping fetched data.
//!
//! # Usage
//!
//! ```rust
//! use audio_mirror::errors::{ApiError, ApiResult};
//!
//! fn require_name(name: &str) -> ApiResult<&str> {
//!     if name.is_empty() {
//!         return Err(ApiError::configuration("name is required"));
//!     }
//!     Ok(name)
//! }
//! ```

pub mod types;

pub use types::*;

/// Convenience type alias for Results using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Convenience type alias for engine Results
pub type ApiResult<T> = Result<T, ApiError>;

/// Convenience type alias for path resolution Results
pub type ResolveResult<T> = Result<T, ResolveError>;
