//! Session-export document tree

use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

/// A typed node of the session-export tree
///
/// ```json
/// { "type": "Input", "position": 3,
///   "properties": { "name": "Kick", "ioType": "Analog", "stereo": false } }
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionNode {
    #[serde(rename = "type")]
    pub node_type: String,
    /// Relative position attribute (number or numeric string)
    #[serde(default)]
    pub position: Option<Value>,
    #[serde(default)]
    pub properties: HashMap<String, Value>,
    #[serde(default)]
    pub children: Vec<SessionNode>,
}

impl SessionNode {
    /// Parse a session export from JSON text
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Depth-first search for every node of the given type (self included)
    pub fn find_all<'a>(&'a self, node_type: &str, out: &mut Vec<&'a SessionNode>) {
        if self.node_type == node_type {
            out.push(self);
        }
        for child in &self.children {
            child.find_all(node_type, out);
        }
    }

    /// Direct children of the given type
    pub fn children_of_type<'a>(
        &'a self,
        node_type: &'a str,
    ) -> impl Iterator<Item = &'a SessionNode> + 'a {
        self.children
            .iter()
            .filter(move |c| c.node_type == node_type)
    }

    /// String property; numbers are rendered, empty strings count as absent
    pub fn text(&self, key: &str) -> Option<String> {
        match self.properties.get(key)? {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Boolean property; accepts bools, non-zero numbers and `true`/`1`/`yes`
    pub fn flag(&self, key: &str) -> bool {
        match self.properties.get(key) {
            Some(Value::Bool(b)) => *b,
            Some(Value::Number(n)) => n.as_f64().is_some_and(|v| v != 0.0),
            Some(Value::String(s)) => matches!(
                s.trim().to_ascii_lowercase().as_str(),
                "true" | "1" | "yes"
            ),
            _ => false,
        }
    }

    /// Integer position attribute, if it parses
    pub fn position_index(&self) -> Option<i64> {
        match self.position.as_ref()? {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}
