//! Per-resource-type settings
//!
//! Free-form key/value toggles from the configuration file, injected into
//! each listed resource before filtering. A value is either a bool or a
//! string; resources read the keys they understand and ignore the rest.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum SettingValue {
    Bool(bool),
    Str(String),
}

impl From<bool> for SettingValue {
    fn from(v: bool) -> Self {
        SettingValue::Bool(v)
    }
}

impl From<&str> for SettingValue {
    fn from(v: &str) -> Self {
        SettingValue::Str(v.to_string())
    }
}

impl From<String> for SettingValue {
    fn from(v: String) -> Self {
        SettingValue::Str(v)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Settings(HashMap<String, SettingValue>);

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<SettingValue>) -> &mut Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// The key's bool value; None when absent or not a bool
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.0.get(key) {
            Some(SettingValue::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    /// The key's string value; None when absent or not a string
    pub fn get_str(&self, key: &str) -> Option<&str> {
        match self.0.get(key) {
            Some(SettingValue::Str(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
