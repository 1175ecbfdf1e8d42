//! ---
//! lab_section: "02-topology-model"
//! lab_subsection: "module"
//! lab_type: "source"
//! lab_scope: "code"
//! lab_description: "Freeform attribute values attached to nodes and links."
//! lab_version: "v0.1.0"
//! lab_owner: "tbd"
//! ---
use std::fmt;

use indexmap::IndexMap;
use serde::Serialize;

/// Ordered attribute mapping attached to a node or link declaration.
///
/// There is no fixed schema: interpretation of the keys is backend and
/// node-type dependent. The parser only enforces the presence of `type`
/// on nodes.
pub type AttributeSet = IndexMap<String, AttributeValue>;

/// A single attribute value as written in the description.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AttributeValue {
    /// Bare token, e.g. `type=host`.
    Token(String),
    /// Double-quoted string, e.g. `name="Host 1"`.
    Quoted(String),
    /// Bare token that parses as a number, e.g. `ram=1024`.
    Number(f64),
}

impl AttributeValue {
    /// Textual content for token and quoted values.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::Token(s) | AttributeValue::Quoted(s) => Some(s),
            AttributeValue::Number(_) => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            AttributeValue::Number(n) => Some(*n),
            _ => None,
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Token(s) => write!(f, "{}", s),
            AttributeValue::Quoted(s) => write!(f, "\"{}\"", s),
            AttributeValue::Number(n) => {
                if n.fract() == 0.0 {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{}", n)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accessors_match_variant() {
        assert_eq!(AttributeValue::Token("host".into()).as_str(), Some("host"));
        assert_eq!(
            AttributeValue::Quoted("Host 1".into()).as_str(),
            Some("Host 1")
        );
        assert_eq!(AttributeValue::Number(8.0).as_number(), Some(8.0));
        assert_eq!(AttributeValue::Number(8.0).as_str(), None);
    }

    #[test]
    fn display_round_trips_forms() {
        assert_eq!(AttributeValue::Token("host".into()).to_string(), "host");
        assert_eq!(
            AttributeValue::Quoted("Host 1".into()).to_string(),
            "\"Host 1\""
        );
        assert_eq!(AttributeValue::Number(8.0).to_string(), "8");
        assert_eq!(AttributeValue::Number(0.5).to_string(), "0.5");
    }
}
