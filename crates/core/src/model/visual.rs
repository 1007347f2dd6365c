use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::model::span::Attribute;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum SpanStatus {
    Ok,
    Error,
    #[default]
    Unset,
}

impl SpanStatus {
    /// Maps a raw status value onto the closed set. `"0"` aliases ok and
    /// `"2"` aliases error; anything unrecognized is unset.
    pub fn parse(raw: &str) -> Self {
        let lowered = raw.trim().to_ascii_lowercase();
        let value = lowered.strip_prefix("status_code_").unwrap_or(lowered.as_str());
        match value {
            "ok" | "0" => Self::Ok,
            "error" | "2" => Self::Error,
            "" | "unset" => Self::Unset,
            other => {
                tracing::trace!(status = other, "unrecognized span status, treating as unset");
                Self::Unset
            }
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Error => "error",
            Self::Unset => "unset",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VisualizationEvent {
    pub name: String,
    pub timestamp_ms: f64,
    pub attributes: BTreeMap<String, Value>,
}

/// A span positioned inside its trace window.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VisualizationSpan {
    pub trace_id: String,
    pub span_id: String,
    pub parent_span_id: Option<String>,
    pub name: String,
    pub service: String,
    pub start_ms: f64,
    pub end_ms: f64,
    pub duration_ms: f64,
    pub depth: usize,
    pub start_percent: f64,
    pub width_percent: f64,
    pub status: SpanStatus,
    pub attributes: BTreeMap<String, Value>,
    /// The attribute sequence exactly as received, for order-preserving display.
    pub raw_attributes: Vec<Attribute>,
    pub events: Vec<VisualizationEvent>,
    pub resource: Map<String, Value>,
    pub flags: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WaterfallData {
    pub trace_id: String,
    pub spans: Vec<VisualizationSpan>,
    pub trace_start_ms: f64,
    pub total_duration_ms: f64,
    pub span_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_aliases() {
        assert_eq!(SpanStatus::parse("ok"), SpanStatus::Ok);
        assert_eq!(SpanStatus::parse("OK"), SpanStatus::Ok);
        assert_eq!(SpanStatus::parse("0"), SpanStatus::Ok);
        assert_eq!(SpanStatus::parse("error"), SpanStatus::Error);
        assert_eq!(SpanStatus::parse("2"), SpanStatus::Error);
        assert_eq!(SpanStatus::parse("STATUS_CODE_ERROR"), SpanStatus::Error);
        assert_eq!(SpanStatus::parse("1"), SpanStatus::Unset);
        assert_eq!(SpanStatus::parse("weird"), SpanStatus::Unset);
        assert_eq!(SpanStatus::parse(""), SpanStatus::Unset);
    }

    #[test]
    fn status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&SpanStatus::Error).unwrap(),
            "\"error\""
        );
    }
}
