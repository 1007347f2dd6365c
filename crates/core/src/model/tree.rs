use serde::{Deserialize, Serialize};

use crate::model::span::Span;

/// A span with its children already nested by the trace store.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SpanTreeNode {
    #[serde(flatten)]
    pub span: Span,
    #[serde(default)]
    pub children: Vec<SpanTreeNode>,
}

impl SpanTreeNode {
    pub fn leaf(span: Span) -> Self {
        Self {
            span,
            children: Vec::new(),
        }
    }

    pub fn with_children(span: Span, children: Vec<SpanTreeNode>) -> Self {
        Self { span, children }
    }
}

/// Flattens a forest into pre-order spans whose `parent_span_id` points at
/// the structural parent. Roots keep the parent reference they came with.
pub fn flatten_tree(roots: &[SpanTreeNode]) -> Vec<Span> {
    let mut out = Vec::new();
    let mut stack: Vec<(&SpanTreeNode, Option<&str>)> =
        roots.iter().rev().map(|node| (node, None)).collect();

    while let Some((node, parent)) = stack.pop() {
        let mut span = node.span.clone();
        if let Some(parent) = parent {
            span.parent_span_id = Some(parent.to_string());
        }
        out.push(span);
        stack.extend(
            node.children
                .iter()
                .rev()
                .map(|child| (child, Some(node.span.span_id.as_str()))),
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(id: &str, parent: Option<&str>) -> Span {
        Span {
            span_id: id.to_string(),
            parent_span_id: parent.map(str::to_string),
            ..Span::default()
        }
    }

    #[test]
    fn flattens_in_pre_order_with_structural_parents() {
        let roots = vec![
            SpanTreeNode::with_children(
                span("a", None),
                vec![
                    SpanTreeNode::with_children(
                        span("b", Some("stale")),
                        vec![SpanTreeNode::leaf(span("c", None))],
                    ),
                    SpanTreeNode::leaf(span("d", None)),
                ],
            ),
            SpanTreeNode::leaf(span("e", Some("elsewhere"))),
        ];

        let flat = flatten_tree(&roots);
        let ids: Vec<_> = flat.iter().map(|s| s.span_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c", "d", "e"]);
        assert_eq!(flat[1].parent_span_id.as_deref(), Some("a"));
        assert_eq!(flat[2].parent_span_id.as_deref(), Some("b"));
        assert_eq!(flat[4].parent_span_id.as_deref(), Some("elsewhere"));
    }

    #[test]
    fn decodes_nested_json() {
        let roots: Vec<SpanTreeNode> = serde_json::from_str(
            r#"[{"span_id":"a","start_time":0,"end_time":10,
                 "children":[{"span_id":"b","start_time":1,"end_time":4}]}]"#,
        )
        .unwrap();
        assert_eq!(roots[0].children[0].span.span_id, "b");
        assert_eq!(roots[0].children[0].span.end_ms(), 4.0);
    }
}
