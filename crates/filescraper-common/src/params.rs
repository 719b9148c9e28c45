//! Caller-supplied scraping parameters.
//!
//! Parameters are a loose key/value mapping: `mimetype` and `version` force
//! the reported file type, everything else is read by the individual
//! scrapers that understand it (`schematron`, `delimiter`, `fields`, ...).

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

use crate::{Error, Result};

/// Key for a forced MIME type.
pub const MIMETYPE: &str = "mimetype";
/// Key for a forced version.
pub const VERSION: &str = "version";

/// Parameter mapping passed from the caller to every scraper.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Params(BTreeMap<String, JsonValue>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<JsonValue>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        self.0.get(key)
    }

    /// True when the key exists and is not `null`.
    pub fn has(&self, key: &str) -> bool {
        self.0.get(key).is_some_and(|v| !v.is_null())
    }

    /// String parameter. `null` and the empty string read as absent.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        match self.0.get(key) {
            Some(JsonValue::String(s)) if !s.is_empty() => Some(s),
            _ => None,
        }
    }

    /// Boolean parameter, accepting JSON booleans and the strings
    /// `true`/`false`/`1`/`0` as they arrive from the command line.
    pub fn get_bool(&self, key: &str) -> Result<Option<bool>> {
        match self.0.get(key) {
            None | Some(JsonValue::Null) => Ok(None),
            Some(JsonValue::Bool(b)) => Ok(Some(*b)),
            Some(JsonValue::String(s)) => match s.to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" => Ok(Some(true)),
                "false" | "0" | "no" => Ok(Some(false)),
                _ => Err(Error::invalid_parameter(key, format!("not a boolean: {s}"))),
            },
            Some(other) => Err(Error::invalid_parameter(
                key,
                format!("not a boolean: {other}"),
            )),
        }
    }

    /// List-of-strings parameter. A plain string is split on commas.
    pub fn get_list(&self, key: &str) -> Result<Option<Vec<String>>> {
        match self.0.get(key) {
            None | Some(JsonValue::Null) => Ok(None),
            Some(JsonValue::Array(items)) => Ok(Some(
                items
                    .iter()
                    .map(|item| match item {
                        JsonValue::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect(),
            )),
            Some(JsonValue::String(s)) => {
                Ok(Some(s.split(',').map(|part| part.trim().to_string()).collect()))
            }
            Some(other) => Err(Error::invalid_parameter(
                key,
                format!("expected a list, found {other}"),
            )),
        }
    }

    /// Parse a `KEY=VALUE` pair as given on the command line.
    pub fn parse_pair(pair: &str) -> Result<(String, JsonValue)> {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| Error::invalid_parameter(pair, "expected KEY=VALUE"))?;
        let key = key.trim();
        if key.is_empty() {
            return Err(Error::invalid_parameter(pair, "empty key"));
        }
        Ok((key.to_string(), JsonValue::String(value.to_string())))
    }
}

impl FromIterator<(String, JsonValue)> for Params {
    fn from_iter<T: IntoIterator<Item = (String, JsonValue)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}
