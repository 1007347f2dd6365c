use serde_json::Value;

use crate::error::{Result, SpanlensError};
use crate::model::span::Span;
use crate::model::tree::{SpanTreeNode, flatten_tree};

/// A decoded span collection in whichever shape the producer sent.
#[derive(Debug, Clone, PartialEq)]
pub enum SpanDocument {
    Flat(Vec<Span>),
    Tree(Vec<SpanTreeNode>),
}

impl SpanDocument {
    /// Accepts a bare array of spans or tree nodes, `{"spans": [..]}` or
    /// `{"roots": [..]}`. An array is a tree as soon as one element carries
    /// a `children` key.
    pub fn parse(raw: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(raw)
            .map_err(|e| SpanlensError::Parse(format!("invalid span document: {e}")))?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Array(items) => {
                let nested = items
                    .iter()
                    .any(|item| item.get("children").is_some_and(Value::is_array));
                if nested {
                    decode(Value::Array(items)).map(Self::Tree)
                } else {
                    decode(Value::Array(items)).map(Self::Flat)
                }
            }
            Value::Object(mut obj) => {
                if let Some(roots) = obj.remove("roots") {
                    decode(roots).map(Self::Tree)
                } else if let Some(spans) = obj.remove("spans") {
                    Self::from_value(spans)
                } else {
                    Err(SpanlensError::Parse(
                        "span document object needs a `spans` or `roots` array".to_string(),
                    ))
                }
            }
            Value::Null => Ok(Self::Flat(Vec::new())),
            other => Err(SpanlensError::Parse(format!(
                "span document must be an array or object, got {}",
                kind_of(&other)
            ))),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Flat(spans) => spans.is_empty(),
            Self::Tree(roots) => roots.is_empty(),
        }
    }

    pub fn to_flat(&self) -> Vec<Span> {
        match self {
            Self::Flat(spans) => spans.clone(),
            Self::Tree(roots) => flatten_tree(roots),
        }
    }

    /// Trace ids in first-seen order.
    pub fn trace_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = Vec::new();
        let mut push = |id: &str| {
            if !ids.iter().any(|known| known == id) {
                ids.push(id.to_string());
            }
        };
        match self {
            Self::Flat(spans) => spans.iter().for_each(|s| push(&s.trace_id)),
            Self::Tree(roots) => roots.iter().for_each(|r| push(&r.span.trace_id)),
        }
        ids
    }

    /// Narrows the document to one trace. Tree documents are narrowed by
    /// their roots' trace ids.
    pub fn select_trace(&self, trace_id: &str) -> Self {
        match self {
            Self::Flat(spans) => Self::Flat(
                spans
                    .iter()
                    .filter(|s| s.trace_id == trace_id)
                    .cloned()
                    .collect(),
            ),
            Self::Tree(roots) => Self::Tree(
                roots
                    .iter()
                    .filter(|r| r.span.trace_id == trace_id)
                    .cloned()
                    .collect(),
            ),
        }
    }
}

fn decode<T: serde::de::DeserializeOwned>(value: Value) -> Result<T> {
    serde_json::from_value(value)
        .map_err(|e| SpanlensError::Parse(format!("invalid span record: {e}")))
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
