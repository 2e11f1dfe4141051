//! Configuration error types

use thiserror::Error;

/// A raw configuration string could not be converted to its typed value
#[derive(Error, Debug)]
pub enum ConversionError {
    #[error("Can't convert '{0}' to Boolean. Valid values are 'true' and 'false'")]
    InvalidBoolean(String),

    #[error("Can't convert '{literal}' to {target}: {reason}")]
    InvalidNumber {
        literal: String,
        target: &'static str,
        reason: std::num::ParseIntError,
    },

    #[error("Invalid regex pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: Box<regex::Error>,
    },

    #[error("Invalid regex map entry '{0}', expected 'pattern: replacement'")]
    MalformedMapEntry(String),
}

/// Errors raised while building, binding or looking up configuration options
#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("Configuration option key must not be empty")]
    MissingKey,

    #[error("Configuration option '{0}' has no default value")]
    MissingDefault(String),

    #[error("Configuration option '{0}' is already bound to its sources")]
    AlreadyBound(String),

    #[error("Configuration option '{0}' is registered twice")]
    DuplicateKey(String),

    #[error("Unknown configuration option '{0}'")]
    UnknownKey(String),

    #[error(transparent)]
    Conversion(#[from] ConversionError),
}
