//! Configuration resolution
//!
//! Named, typed options resolved from an ordered list of sources:
//! - [`converter`] maps raw strings to typed values for a closed set of types
//! - [`source`] defines where raw strings come from
//! - [`option`] holds one resolved, atomically published value
//! - [`registry`] binds options to sources and drives dynamic reloads

pub mod converter;
mod error;
pub mod option;
pub mod registry;
pub mod source;

pub use converter::{RegexMap, ValueConverter};
pub use error::{ConfigurationError, ConversionError};
pub use option::{ConfigurationOption, ConfigurationOptionBuilder, ResolvedValue};
pub use registry::{Configuration, OptionDescriptor};
pub use source::{ConfigurationSource, EnvironmentSource, JsonFileSource, SimpleSource};
