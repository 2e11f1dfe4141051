//! String <-> typed value converters for configuration options
//!
//! The set of converters is closed: [`ValueConverter`] is sealed and only the
//! types in this module implement it.

use std::collections::BTreeSet;

use regex::Regex;

use super::error::ConversionError;

/// Ordered `pattern -> replacement` pairs, as produced by [`RegexMapConverter`]
pub type RegexMap = Vec<(Regex, String)>;

mod sealed {
    pub trait Sealed {}
}

/// Bidirectional mapping between a configuration string and a typed value.
///
/// `parse(format(x))` yields a value equal to `x` for every `x` that
/// `parse` can produce.
pub trait ValueConverter<T>: sealed::Sealed + Send + Sync {
    /// Convert a raw configuration string
    fn parse(&self, value: &str) -> Result<T, ConversionError>;

    /// Render a value in the form `parse` accepts
    fn format(&self, value: &T) -> String;

    /// Short type name shown in option descriptors
    fn type_name(&self) -> &'static str;
}

// =============================================================================
// String
// =============================================================================

/// Identity conversion, no normalization
#[derive(Debug, Clone, Copy, Default)]
pub struct StringConverter;

impl sealed::Sealed for StringConverter {}

impl ValueConverter<String> for StringConverter {
    fn parse(&self, value: &str) -> Result<String, ConversionError> {
        Ok(value.to_string())
    }

    fn format(&self, value: &String) -> String {
        value.clone()
    }

    fn type_name(&self) -> &'static str {
        "String"
    }
}

// =============================================================================
// String sets
// =============================================================================

/// Comma separated set of strings, optionally folded to lower case
#[derive(Debug, Clone, Copy, Default)]
pub struct StringsConverter {
    lower_case: bool,
}

impl StringsConverter {
    pub const fn new() -> Self {
        Self { lower_case: false }
    }

    pub const fn lower_case() -> Self {
        Self { lower_case: true }
    }
}

impl sealed::Sealed for StringsConverter {}

impl ValueConverter<BTreeSet<String>> for StringsConverter {
    fn parse(&self, value: &str) -> Result<BTreeSet<String>, ConversionError> {
        Ok(split_entries(value)
            .map(|entry| {
                if self.lower_case {
                    entry.to_lowercase()
                } else {
                    entry.to_string()
                }
            })
            .collect())
    }

    fn format(&self, value: &BTreeSet<String>) -> String {
        value.iter().map(String::as_str).collect::<Vec<_>>().join(",")
    }

    fn type_name(&self) -> &'static str {
        "Collection"
    }
}

// =============================================================================
// Regex list
// =============================================================================

/// Comma separated list of regular expressions
#[derive(Debug, Clone, Copy, Default)]
pub struct RegexListConverter;

impl sealed::Sealed for RegexListConverter {}

impl ValueConverter<Vec<Regex>> for RegexListConverter {
    fn parse(&self, value: &str) -> Result<Vec<Regex>, ConversionError> {
        split_entries(value).map(compile).collect()
    }

    fn format(&self, value: &Vec<Regex>) -> String {
        value.iter().map(Regex::as_str).collect::<Vec<_>>().join(",")
    }

    fn type_name(&self) -> &'static str {
        "List"
    }
}

// =============================================================================
// Regex map
// =============================================================================

/// Comma separated `pattern: replacement` pairs.
///
/// The first colon not preceded by a backslash separates pattern and
/// replacement, so `\:` writes a literal colon into the pattern.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegexMapConverter;

impl sealed::Sealed for RegexMapConverter {}

impl ValueConverter<RegexMap> for RegexMapConverter {
    fn parse(&self, value: &str) -> Result<RegexMap, ConversionError> {
        split_entries(value)
            .map(|entry| {
                let delimiter = find_unescaped_colon(entry)
                    .ok_or_else(|| ConversionError::MalformedMapEntry(entry.to_string()))?;
                let pattern = entry[..delimiter].trim().replace("\\:", ":");
                if pattern.is_empty() {
                    return Err(ConversionError::MalformedMapEntry(entry.to_string()));
                }
                let replacement = entry[delimiter + 1..].trim().to_string();
                Ok((compile(&pattern)?, replacement))
            })
            .collect()
    }

    fn format(&self, value: &RegexMap) -> String {
        value
            .iter()
            .map(|(pattern, replacement)| {
                format!("{}: {}", pattern.as_str().replace(':', "\\:"), replacement)
            })
            .collect::<Vec<_>>()
            .join(",")
    }

    fn type_name(&self) -> &'static str {
        "Map"
    }
}

fn find_unescaped_colon(entry: &str) -> Option<usize> {
    let mut previous = None;
    for (index, c) in entry.char_indices() {
        if c == ':' && previous != Some('\\') {
            return Some(index);
        }
        previous = Some(c);
    }
    None
}

// =============================================================================
// Scalars
// =============================================================================

/// Case-insensitive `true` / `false`
#[derive(Debug, Clone, Copy, Default)]
pub struct BooleanConverter;

impl sealed::Sealed for BooleanConverter {}

impl ValueConverter<bool> for BooleanConverter {
    fn parse(&self, value: &str) -> Result<bool, ConversionError> {
        if value.eq_ignore_ascii_case("true") {
            Ok(true)
        } else if value.eq_ignore_ascii_case("false") {
            Ok(false)
        } else {
            Err(ConversionError::InvalidBoolean(value.to_string()))
        }
    }

    fn format(&self, value: &bool) -> String {
        value.to_string()
    }

    fn type_name(&self) -> &'static str {
        "Boolean"
    }
}

/// Decimal 32-bit integer
#[derive(Debug, Clone, Copy, Default)]
pub struct IntegerConverter;

impl sealed::Sealed for IntegerConverter {}

impl ValueConverter<i32> for IntegerConverter {
    fn parse(&self, value: &str) -> Result<i32, ConversionError> {
        value
            .parse()
            .map_err(|reason| ConversionError::InvalidNumber {
                literal: value.to_string(),
                target: "Integer",
                reason,
            })
    }

    fn format(&self, value: &i32) -> String {
        value.to_string()
    }

    fn type_name(&self) -> &'static str {
        "Integer"
    }
}

/// Decimal 64-bit integer
#[derive(Debug, Clone, Copy, Default)]
pub struct LongConverter;

impl sealed::Sealed for LongConverter {}

impl ValueConverter<i64> for LongConverter {
    fn parse(&self, value: &str) -> Result<i64, ConversionError> {
        value
            .parse()
            .map_err(|reason| ConversionError::InvalidNumber {
                literal: value.to_string(),
                target: "Long",
                reason,
            })
    }

    fn format(&self, value: &i64) -> String {
        value.to_string()
    }

    fn type_name(&self) -> &'static str {
        "Long"
    }
}

fn split_entries(value: &str) -> impl Iterator<Item = &str> {
    value.split(',').map(str::trim).filter(|entry| !entry.is_empty())
}

fn compile(pattern: &str) -> Result<Regex, ConversionError> {
    Regex::new(pattern).map_err(|source| ConversionError::InvalidPattern {
        pattern: pattern.to_string(),
        source: Box::new(source),
    })
}
