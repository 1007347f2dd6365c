use crate::depth::{DepthResolver, SpanDepth, resolve_tree_depths};
use crate::model::span::{Span, fold_attributes};
use crate::model::tree::SpanTreeNode;
use crate::model::visual::{VisualizationEvent, VisualizationSpan, WaterfallData};
use crate::service_graph::resolve_service;
use crate::time::to_ms;

/// Builds the waterfall for a flat span collection of one trace.
///
/// Returns `None` for an empty collection.
pub fn build_waterfall(spans: &[Span]) -> Option<WaterfallData> {
    if spans.is_empty() {
        return None;
    }
    let mut resolver = DepthResolver::new(spans);
    let entries = spans
        .iter()
        .map(|span| SpanDepth {
            span,
            parent_span_id: span.parent_span_id.as_deref(),
            depth: resolver.depth_of(&span.span_id),
        })
        .collect();
    Some(assemble(entries))
}

/// Builds the waterfall for pre-nested spans. Depth is the nesting level and
/// each row's parent is the node it is nested under.
pub fn build_waterfall_from_tree(roots: &[SpanTreeNode]) -> Option<WaterfallData> {
    let entries = resolve_tree_depths(roots);
    if entries.is_empty() {
        return None;
    }
    Some(assemble(entries))
}

struct TraceWindow {
    start_ms: f64,
    total_ms: f64,
}

impl TraceWindow {
    fn of<'a>(spans: impl Iterator<Item = &'a Span>) -> Self {
        let (min_start, max_end) = spans
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), s| {
                (lo.min(s.start_ms()), hi.max(s.end_ms()))
            });
        let total = max_end - min_start;
        Self {
            start_ms: if min_start.is_finite() { min_start } else { 0.0 },
            total_ms: if total.is_finite() && total > 0.0 { total } else { 0.0 },
        }
    }

    fn start_percent(&self, start_ms: f64) -> f64 {
        if self.total_ms > 0.0 {
            (start_ms - self.start_ms) / self.total_ms * 100.0
        } else {
            0.0
        }
    }

    fn width_percent(&self, duration_ms: f64) -> f64 {
        if self.total_ms > 0.0 {
            duration_ms / self.total_ms * 100.0
        } else {
            100.0
        }
    }
}

fn assemble(entries: Vec<SpanDepth<'_>>) -> WaterfallData {
    let window = TraceWindow::of(entries.iter().map(|entry| entry.span));
    let trace_id = entries
        .first()
        .map(|entry| entry.span.trace_id.clone())
        .unwrap_or_default();

    let mut spans: Vec<VisualizationSpan> = entries
        .into_iter()
        .map(|entry| visualize(&entry, &window))
        .collect();

    // Stable: spans sharing start and depth keep their input order.
    spans.sort_by(|a, b| {
        a.start_ms
            .total_cmp(&b.start_ms)
            .then_with(|| a.depth.cmp(&b.depth))
    });

    tracing::debug!(
        trace_id = %trace_id,
        spans = spans.len(),
        total_duration_ms = window.total_ms,
        "built waterfall"
    );

    WaterfallData {
        trace_id,
        span_count: spans.len(),
        spans,
        trace_start_ms: window.start_ms,
        total_duration_ms: window.total_ms,
    }
}

fn visualize(entry: &SpanDepth<'_>, window: &TraceWindow) -> VisualizationSpan {
    let span = entry.span;
    let start_ms = span.start_ms();
    let duration_ms = span.duration_ms();
    VisualizationSpan {
        trace_id: span.trace_id.clone(),
        span_id: span.span_id.clone(),
        parent_span_id: entry.parent_span_id.map(str::to_string),
        name: span.name.clone(),
        service: resolve_service(span),
        start_ms,
        end_ms: span.end_ms(),
        duration_ms,
        depth: entry.depth,
        start_percent: window.start_percent(start_ms),
        width_percent: window.width_percent(duration_ms),
        status: span.normalized_status(),
        attributes: span.attribute_map(),
        raw_attributes: span.attributes.clone(),
        events: span
            .events
            .iter()
            .map(|event| VisualizationEvent {
                name: event.name.clone(),
                timestamp_ms: to_ms(event.timestamp),
                attributes: fold_attributes(&event.attributes),
            })
            .collect(),
        resource: span.resource.clone(),
        flags: span.flags,
    }
}
