use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HostValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    List(Vec<HostValue>),
    Map(BTreeMap<String, HostValue>),
}

impl HostValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Integer(_) => "integer",
            Self::Float(_) => "float",
            Self::Text(_) => "text",
            Self::List(_) => "list",
            Self::Map(_) => "map",
        }
    }
}

impl From<i64> for HostValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for HostValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for HostValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for HostValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for HostValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

#[cfg(test)]
mod value_tests {
    use super::*;

    #[test]
    fn accessors_match_variant() {
        assert_eq!(HostValue::Integer(2).as_integer(), Some(2));
        assert_eq!(HostValue::Float(2.5).as_float(), Some(2.5));
        assert_eq!(HostValue::from("hi").as_text(), Some("hi"));
        assert!(HostValue::Null.is_null());
        assert_eq!(HostValue::Integer(2).as_float(), None);
    }

    #[test]
    fn serializes_untagged_json() {
        let value = HostValue::List(vec![
            HostValue::Null,
            HostValue::Integer(1),
            HostValue::Float(1.5),
            HostValue::from("a"),
        ]);
        assert_eq!(
            serde_json::to_string(&value).expect("serialize"),
            r#"[null,1,1.5,"a"]"#
        );
        assert_eq!(HostValue::Map(BTreeMap::new()).type_name(), "map");
    }
}
