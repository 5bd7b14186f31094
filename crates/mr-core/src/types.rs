use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub message: String,
    pub location: Option<SourceLocation>,
}

impl Diagnostic {
    pub fn new(message: impl Into<String>, location: Option<SourceLocation>) -> Self {
        Self {
            message: message.into(),
            location,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.location {
            Some(location) => write!(
                f,
                "{} (line {}, column {})",
                self.message, location.line, location.column
            ),
            None => f.write_str(&self.message),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineLimits {
    pub max_string_size: usize,
    pub max_array_size: usize,
    pub max_map_size: usize,
    pub max_call_levels: Option<usize>,
}

pub const DEFAULT_MAX_STRING_SIZE: usize = 16 * 1024 * 1024;
pub const DEFAULT_MAX_COLLECTION_SIZE: usize = 1024 * 1024;

impl Default for EngineLimits {
    fn default() -> Self {
        Self {
            max_string_size: DEFAULT_MAX_STRING_SIZE,
            max_array_size: DEFAULT_MAX_COLLECTION_SIZE,
            max_map_size: DEFAULT_MAX_COLLECTION_SIZE,
            max_call_levels: None,
        }
    }
}

impl EngineLimits {
    pub fn exhausted_budget(&self) -> Option<&'static str> {
        if self.max_string_size == 0 {
            return Some("max_string_size");
        }
        if self.max_array_size == 0 {
            return Some("max_array_size");
        }
        if self.max_map_size == 0 {
            return Some("max_map_size");
        }
        if self.max_call_levels == Some(0) {
            return Some("max_call_levels");
        }
        None
    }
}
