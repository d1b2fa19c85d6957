//! Key Codec Module
//!
//! Derives stable cache keys from a namespace and a set of named parameters.
//!
//! Keys look like `summary:month:3|userId:u1|year:2024`: parameters are sorted
//! by name in byte order, absent parameters are left out entirely, and a key
//! with no parameters is just the namespace.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::{CacheError, CacheResult};

/// Separates the namespace from the parameter list and each name from its value.
pub const PART_SEPARATOR: char = ':';

/// Separates parameters from each other.
pub const PARAM_DELIMITER: char = '|';

// == Param Value ==
/// A single parameter value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    Str(String),
    Int(i64),
    UInt(u64),
    Bool(bool),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Str(s) => f.write_str(s),
            ParamValue::Int(n) => write!(f, "{}", n),
            ParamValue::UInt(n) => write!(f, "{}", n),
            ParamValue::Bool(b) => write!(f, "{}", b),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Str(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Str(value)
    }
}

impl From<i32> for ParamValue {
    fn from(value: i32) -> Self {
        ParamValue::Int(value.into())
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Int(value)
    }
}

impl From<u32> for ParamValue {
    fn from(value: u32) -> Self {
        ParamValue::UInt(value.into())
    }
}

impl From<u64> for ParamValue {
    fn from(value: u64) -> Self {
        ParamValue::UInt(value)
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Bool(value)
    }
}

// == Key Params ==
/// Named parameters for a cache key.
///
/// Backed by a `BTreeMap`, so insertion order never affects the key. Setting
/// the same name twice keeps the last value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyParams {
    params: BTreeMap<String, ParamValue>,
}

impl KeyParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a parameter.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Adds a parameter only when a value is present.
    ///
    /// `None` leaves the parameter out, which yields the same key as never
    /// mentioning it.
    pub fn with_opt<T: Into<ParamValue>>(self, name: impl Into<String>, value: Option<T>) -> Self {
        match value {
            Some(value) => self.with(name, value),
            None => self,
        }
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    fn iter(&self) -> impl Iterator<Item = (&String, &ParamValue)> {
        self.params.iter()
    }
}

impl<K, V> FromIterator<(K, Option<V>)> for KeyParams
where
    K: Into<String>,
    V: Into<ParamValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, Option<V>)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(KeyParams::new(), |params, (name, value)| params.with_opt(name, value))
    }
}

// == Cache Key ==
/// A generated cache key together with the namespace it was built from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    namespace: String,
    key: String,
}

impl CacheKey {
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn as_str(&self) -> &str {
        &self.key
    }

    pub fn into_string(self) -> String {
        self.key
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.key
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}

// == Generate Key ==
/// Builds the cache key for `namespace` and `params`.
///
/// Pure: equal parameter sets always produce the same key, whatever order
/// they were added in.
///
/// # Errors
/// `InvalidArgument` when the namespace or a parameter name is empty or
/// contains `:` or `|`, or when a string value contains `|`. Either would let
/// two different parameter sets render to the same key.
pub fn generate_key(namespace: &str, params: &KeyParams) -> CacheResult<CacheKey> {
    validate_part("namespace", namespace)?;

    let mut key = String::from(namespace);
    for (index, (name, value)) in params.iter().enumerate() {
        validate_part("parameter name", name)?;
        if let ParamValue::Str(s) = value {
            if s.contains(PARAM_DELIMITER) {
                return Err(CacheError::InvalidArgument(format!(
                    "value of parameter '{}' contains reserved delimiter '{}'",
                    name, PARAM_DELIMITER
                )));
            }
        }

        key.push(if index == 0 { PART_SEPARATOR } else { PARAM_DELIMITER });
        key.push_str(name);
        key.push(PART_SEPARATOR);
        key.push_str(&value.to_string());
    }

    Ok(CacheKey {
        namespace: namespace.to_string(),
        key,
    })
}

fn validate_part(what: &str, part: &str) -> CacheResult<()> {
    if part.is_empty() {
        return Err(CacheError::InvalidArgument(format!("{} cannot be empty", what)));
    }
    if part.contains(PART_SEPARATOR) || part.contains(PARAM_DELIMITER) {
        return Err(CacheError::InvalidArgument(format!(
            "{} '{}' contains a reserved character",
            what, part
        )));
    }
    Ok(())
}
