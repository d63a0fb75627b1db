//! Error Types for loghub Core
//!
//! Errors that can occur while validating or decoding core types. Anything
//! transport- or storage-specific lives in the server and client crates;
//! this enum only covers the shared vocabulary.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid log level: {0}")]
    InvalidLevel(String),

    #[error("malformed message: {0}")]
    MalformedMessage(String),
}

pub type Result<T> = std::result::Result<T, Error>;
