use std::path::{Path, PathBuf};

use chrono::{Duration, TimeZone, Utc};
use spanlens_core::model::span::{Attribute, Span, SpanEvent};
use spanlens_core::model::tree::SpanTreeNode;

fn ms_at(offset_ms: i64) -> f64 {
    let base = Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap();
    (base + Duration::milliseconds(offset_ms)).timestamp_millis() as f64
}

fn span(
    trace_id: &str,
    span_id: &str,
    parent: Option<&str>,
    service: &str,
    name: &str,
    (start, end): (i64, i64),
) -> Span {
    Span {
        trace_id: trace_id.to_string(),
        span_id: span_id.to_string(),
        parent_span_id: parent.map(str::to_string),
        name: name.to_string(),
        start_time: ms_at(start),
        end_time: ms_at(end),
        service_name: Some(service.to_string()),
        ..Span::default()
    }
}

fn sample_spans(trace_id: &str) -> (Span, Span, Span, Span) {
    let mut root = span(trace_id, "root", None, "api", "GET /v1/orders", (0, 1800));
    root.status = "ERROR".to_string();
    root.attributes = vec![Attribute::new("http.method", "GET")];

    let orders = span(
        trace_id,
        "orders",
        Some("root"),
        "orders",
        "orders.list",
        (100, 700),
    );
    let query = span(
        trace_id,
        "query",
        Some("orders"),
        "orders",
        "SELECT orders",
        (150, 450),
    );

    let mut cache = span(
        trace_id,
        "cache",
        Some("root"),
        "redis",
        "cache.get redis",
        (900, 1600),
    );
    cache.status = "2".to_string();
    cache.attributes = vec![Attribute::new("peer", "redis:6379")];
    cache.events = vec![SpanEvent {
        name: "retry".to_string(),
        timestamp: ms_at(950),
        attributes: vec![Attribute::new("attempt", 2)],
    }];

    (root, orders, query, cache)
}

/// A checkout request fanning out from `api` to `orders` and `redis`. The
/// cache lookup fails after one retry.
pub fn sample_trace(trace_id: &str) -> Vec<Span> {
    let (root, orders, query, cache) = sample_spans(trace_id);
    vec![root, orders, query, cache]
}

/// The same trace as [`sample_trace`], pre-nested.
pub fn sample_tree(trace_id: &str) -> Vec<SpanTreeNode> {
    let (root, orders, query, cache) = sample_spans(trace_id);
    vec![SpanTreeNode::with_children(
        root,
        vec![
            SpanTreeNode::with_children(orders, vec![SpanTreeNode::leaf(query)]),
            SpanTreeNode::leaf(cache),
        ],
    )]
}

pub fn write_json(dir: &Path, file_name: &str, value: &serde_json::Value) -> anyhow::Result<PathBuf> {
    let path = dir.join(file_name);
    std::fs::write(&path, serde_json::to_vec_pretty(value)?)?;
    Ok(path)
}

/// Writes `spans` as a bare JSON array.
pub fn write_spans(dir: &Path, file_name: &str, spans: &[Span]) -> anyhow::Result<PathBuf> {
    write_json(dir, file_name, &serde_json::to_value(spans)?)
}

/// Writes `roots` as `{"roots": [...]}`.
pub fn write_tree(
    dir: &Path,
    file_name: &str,
    roots: &[SpanTreeNode],
) -> anyhow::Result<PathBuf> {
    write_json(dir, file_name, &serde_json::json!({ "roots": roots }))
}
