//! Web plumbing shared by fairgate's HTTP surface.
//!
//! - [`AppError`]: bridges domain errors to HTTP responses
//! - [`AuthUser`]: JWT bearer extractor (the minimal interface to the
//!   external auth system)
//! - [`CorrelationId`]: request correlation extractor
//! - [`middleware::correlation_id_layer`]: per-request tracing span and
//!   correlation header echo

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod extractors;
pub mod middleware;

pub use error::AppError;
pub use extractors::{AuthUser, CorrelationId, JwtDecoder};
pub use middleware::correlation_id_layer;
