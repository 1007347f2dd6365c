use serde::Serialize;

use crate::model::span::Span;

/// Parent, direct children and approximate self time of one span.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SpanContext<'a> {
    pub span: &'a Span,
    pub parent: Option<&'a Span>,
    pub children: Vec<&'a Span>,
    pub duration_ms: f64,
    pub child_duration_ms: f64,
    pub self_time_ms: f64,
}

/// Computes the context of `selected` within its trace. A span naming itself
/// as parent is treated as a root.
///
/// Self time is the span duration minus the plain sum of its children's
/// durations, floored at zero. Overlapping children are counted twice, so
/// a span fanning out concurrently can report zero self time.
pub fn calculate_span_context<'a>(selected: &'a Span, spans: &'a [Span]) -> SpanContext<'a> {
    let parent = selected
        .parent_span_id
        .as_deref()
        .filter(|parent_id| *parent_id != selected.span_id)
        .and_then(|parent_id| spans.iter().find(|s| s.span_id == parent_id));

    let children: Vec<&Span> = spans
        .iter()
        .filter(|s| s.span_id != selected.span_id)
        .filter(|s| s.parent_span_id.as_deref() == Some(selected.span_id.as_str()))
        .collect();

    let duration_ms = selected.duration_ms();
    let child_duration_ms: f64 = children.iter().map(|c| c.duration_ms()).sum();
    let self_time_ms = (duration_ms - child_duration_ms).max(0.0);

    SpanContext {
        span: selected,
        parent,
        children,
        duration_ms,
        child_duration_ms,
        self_time_ms,
    }
}

/// Looks the span up by id first; `None` when it is not in the collection.
pub fn span_context_by_id<'a>(span_id: &str, spans: &'a [Span]) -> Option<SpanContext<'a>> {
    let selected = spans.iter().find(|s| s.span_id == span_id)?;
    Some(calculate_span_context(selected, spans))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(id: &str, parent: Option<&str>, start: f64, end: f64) -> Span {
        Span {
            span_id: id.to_string(),
            parent_span_id: parent.map(str::to_string),
            start_time: start,
            end_time: end,
            ..Span::default()
        }
    }

    #[test]
    fn sequential_children_leave_self_time() {
        let spans = vec![
            span("root", None, 0.0, 100.0),
            span("a", Some("root"), 0.0, 30.0),
            span("b", Some("root"), 40.0, 60.0),
        ];
        let ctx = span_context_by_id("root", &spans).unwrap();
        assert!(ctx.parent.is_none());
        assert_eq!(ctx.children.len(), 2);
        assert_eq!(ctx.child_duration_ms, 50.0);
        assert_eq!(ctx.self_time_ms, 50.0);
    }

    #[test]
    fn overlapping_children_clamp_to_zero() {
        let spans = vec![
            span("root", None, 0.0, 100.0),
            span("a", Some("root"), 0.0, 80.0),
            span("b", Some("root"), 10.0, 80.0),
        ];
        let ctx = calculate_span_context(&spans[0], &spans);
        assert_eq!(ctx.child_duration_ms, 150.0);
        assert_eq!(ctx.self_time_ms, 0.0);
    }

    #[test]
    fn finds_parent_and_ignores_grandchildren() {
        let spans = vec![
            span("root", None, 0.0, 100.0),
            span("mid", Some("root"), 10.0, 90.0),
            span("leaf", Some("mid"), 20.0, 30.0),
        ];
        let ctx = span_context_by_id("mid", &spans).unwrap();
        assert_eq!(ctx.parent.map(|p| p.span_id.as_str()), Some("root"));
        assert_eq!(ctx.children.len(), 1);
        assert_eq!(ctx.self_time_ms, 70.0);
    }

    #[test]
    fn dangling_parent_and_unknown_id() {
        let spans = vec![span("orphan", Some("gone"), 0.0, 10.0)];
        let ctx = span_context_by_id("orphan", &spans).unwrap();
        assert!(ctx.parent.is_none());
        assert_eq!(ctx.self_time_ms, 10.0);
        assert!(span_context_by_id("nope", &spans).is_none());
    }

    #[test]
    fn self_parent_is_not_its_own_child() {
        let spans = vec![span("loop", Some("loop"), 0.0, 10.0)];
        let ctx = span_context_by_id("loop", &spans).unwrap();
        assert!(ctx.parent.is_none());
        assert!(ctx.children.is_empty());
        assert_eq!(ctx.self_time_ms, 10.0);
    }
}
