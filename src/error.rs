//! Module containing the universal error type for this crate
use thiserror::Error;

/// Universal error type for polygonization entry points
///
/// The pipeline itself is total; errors are only produced when validating
/// caller-supplied arguments or writing output.
#[derive(Error, Debug)]
pub enum Error {
    #[error("resolution must be positive and finite on every axis")]
    InvalidResolution,

    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),
}
