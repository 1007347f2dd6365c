use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::model::span::Span;
use crate::model::visual::SpanStatus;
use crate::service_graph::resolve_service;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TraceSummary {
    pub trace_id: String,
    pub root_name: String,
    pub root_service: String,
    pub start_ms: f64,
    pub duration_ms: f64,
    pub span_count: usize,
    pub error_count: usize,
    pub status: SpanStatus,
}

pub fn filter_trace(spans: &[Span], trace_id: &str) -> Vec<Span> {
    spans
        .iter()
        .filter(|s| s.trace_id == trace_id)
        .cloned()
        .collect()
}

/// Splits a mixed collection by `trace_id`, traces in first-seen order and
/// spans in input order within each trace.
pub fn group_traces(spans: &[Span]) -> Vec<(String, Vec<Span>)> {
    let mut groups: Vec<(String, Vec<Span>)> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();
    for span in spans {
        let idx = *index.entry(span.trace_id.as_str()).or_insert_with(|| {
            groups.push((span.trace_id.clone(), Vec::new()));
            groups.len() - 1
        });
        groups[idx].1.push(span.clone());
    }
    groups
}

/// Summary line for a single trace; `None` when there are no spans.
///
/// The root is the earliest-starting span whose parent is not part of the
/// collection.
pub fn summarize_trace(spans: &[Span]) -> Option<TraceSummary> {
    let first = spans.first()?;
    let ids: HashSet<&str> = spans.iter().map(|s| s.span_id.as_str()).collect();
    let root = spans
        .iter()
        .filter(|s| {
            s.parent_span_id
                .as_deref()
                .is_none_or(|parent| !ids.contains(parent) || parent == s.span_id)
        })
        .min_by(|a, b| a.start_ms().total_cmp(&b.start_ms()))
        .unwrap_or(first);

    let start_ms = spans
        .iter()
        .map(Span::start_ms)
        .fold(f64::INFINITY, f64::min);
    let end_ms = spans
        .iter()
        .map(Span::end_ms)
        .fold(f64::NEG_INFINITY, f64::max);
    let duration_ms = (end_ms - start_ms).max(0.0);
    let error_count = spans.iter().filter(|s| s.is_error()).count();
    let status = if error_count > 0 {
        SpanStatus::Error
    } else {
        root.normalized_status()
    };

    Some(TraceSummary {
        trace_id: first.trace_id.clone(),
        root_name: root.name.clone(),
        root_service: resolve_service(root),
        start_ms,
        duration_ms,
        span_count: spans.len(),
        error_count,
        status,
    })
}
