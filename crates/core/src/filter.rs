use glob::Pattern;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SpanlensError};
use crate::model::span::value_to_text;
use crate::model::visual::{VisualizationSpan, WaterfallData};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AttrFilter {
    pub key: String,
    pub value_glob: String,
}

impl AttrFilter {
    pub fn parse(input: &str) -> Result<Self> {
        let (key, value_glob) = input
            .split_once('=')
            .ok_or_else(|| SpanlensError::Parse(format!("invalid where filter: {input}")))?;

        if key.trim().is_empty() || value_glob.trim().is_empty() {
            return Err(SpanlensError::Parse(format!("invalid where filter: {input}")));
        }
        validate_glob(value_glob.trim())?;

        Ok(Self {
            key: key.trim().trim_start_matches("attrs.").to_string(),
            value_glob: value_glob.trim().to_string(),
        })
    }

    pub fn matches(&self, value: &str) -> bool {
        glob_matches(&self.value_glob, value)
    }
}

/// Row filter over an already positioned waterfall.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SpanFilter {
    pub service_glob: Option<String>,
    pub attr_filters: Vec<AttrFilter>,
}

impl SpanFilter {
    pub fn new(service_glob: Option<String>, attr_filters: Vec<AttrFilter>) -> Result<Self> {
        if let Some(glob) = &service_glob {
            validate_glob(glob)?;
        }
        Ok(Self {
            service_glob,
            attr_filters,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.service_glob.is_none() && self.attr_filters.is_empty()
    }

    pub fn matches(&self, span: &VisualizationSpan) -> bool {
        if let Some(glob) = &self.service_glob
            && !glob_matches(glob, &span.service)
        {
            return false;
        }
        self.attr_filters.iter().all(|filter| {
            span.attributes
                .get(&filter.key)
                .map(value_to_text)
                .is_some_and(|value| filter.matches(&value))
        })
    }

    /// Keeps matching rows. Positions and the trace window are left as they
    /// were, so kept rows still line up against the full trace.
    pub fn apply(&self, data: &WaterfallData) -> WaterfallData {
        if self.is_empty() {
            return data.clone();
        }
        let spans: Vec<VisualizationSpan> = data
            .spans
            .iter()
            .filter(|span| self.matches(span))
            .cloned()
            .collect();
        WaterfallData {
            trace_id: data.trace_id.clone(),
            span_count: spans.len(),
            spans,
            trace_start_ms: data.trace_start_ms,
            total_duration_ms: data.total_duration_ms,
        }
    }
}

fn validate_glob(glob: &str) -> Result<()> {
    Pattern::new(glob)
        .map(|_| ())
        .map_err(|e| SpanlensError::Parse(format!("invalid glob {glob}: {e}")))
}

fn glob_matches(glob: &str, value: &str) -> bool {
    Pattern::new(glob)
        .map(|p| p.matches(value))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::span::{Attribute, Span};
    use crate::waterfall::build_waterfall;

    fn sample() -> WaterfallData {
        let spans = vec![
            Span {
                trace_id: "t".into(),
                span_id: "root".into(),
                name: "api.handle".into(),
                start_time: 0.0,
                end_time: 100.0,
                attributes: vec![Attribute::new("http.method", "GET")],
                ..Span::default()
            },
            Span {
                trace_id: "t".into(),
                span_id: "q".into(),
                parent_span_id: Some("root".into()),
                name: "db.query".into(),
                start_time: 50.0,
                end_time: 75.0,
                attributes: vec![Attribute::new("peer", "redis:6379")],
                ..Span::default()
            },
        ];
        build_waterfall(&spans).unwrap()
    }

    #[test]
    fn attr_filter_parse_and_match() {
        let f = AttrFilter::parse("attrs.peer=redis:*").unwrap();
        assert_eq!(f.key, "peer");
        assert!(f.matches("redis:6379"));
        assert!(!f.matches("postgres:5432"));
        assert!(AttrFilter::parse("peer").is_err());
        assert!(AttrFilter::parse("=x").is_err());
        assert!(AttrFilter::parse("peer=[").is_err());
    }

    #[test]
    fn filters_rows_but_keeps_window() {
        let data = sample();
        let filter = SpanFilter::new(Some("db*".into()), vec![]).unwrap();
        let out = filter.apply(&data);
        assert_eq!(out.span_count, 1);
        assert_eq!(out.spans[0].span_id, "q");
        assert_eq!(out.total_duration_ms, 100.0);
        assert_eq!(out.spans[0].start_percent, 50.0);
    }

    #[test]
    fn attribute_filters_require_the_key() {
        let data = sample();
        let filter =
            SpanFilter::new(None, vec![AttrFilter::parse("http.method=G*").unwrap()]).unwrap();
        let out = filter.apply(&data);
        assert_eq!(out.span_count, 1);
        assert_eq!(out.spans[0].span_id, "root");
    }

    #[test]
    fn empty_filter_is_identity() {
        let data = sample();
        assert_eq!(SpanFilter::default().apply(&data), data);
    }
}
