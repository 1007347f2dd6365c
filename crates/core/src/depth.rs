use std::collections::{HashMap, HashSet};

use crate::model::span::Span;
use crate::model::tree::SpanTreeNode;

/// Resolves nesting depth for a flat span collection by walking
/// `parent_span_id` references.
///
/// Depths are memoized per span id, so siblings sharing an ancestor chain
/// only walk it once. The walk is iterative and tracks the ids on the
/// current chain: when a parent reference would re-enter the chain, the
/// span holding that reference is pinned to depth 0. A parent id that is
/// not part of the collection also makes the span a root.
pub struct DepthResolver<'a> {
    by_id: HashMap<&'a str, &'a Span>,
    memo: HashMap<&'a str, usize>,
}

impl<'a> DepthResolver<'a> {
    pub fn new(spans: &'a [Span]) -> Self {
        let mut by_id = HashMap::with_capacity(spans.len());
        for span in spans {
            by_id.entry(span.span_id.as_str()).or_insert(span);
        }
        Self {
            by_id,
            memo: HashMap::with_capacity(spans.len()),
        }
    }

    pub fn depth_of(&mut self, span_id: &str) -> usize {
        let Some((&key, _)) = self.by_id.get_key_value(span_id) else {
            return 0;
        };
        if let Some(&depth) = self.memo.get(key) {
            return depth;
        }

        let mut chain: Vec<&'a str> = Vec::new();
        let mut on_chain: HashSet<&'a str> = HashSet::new();
        let mut cursor = key;

        // Depth of the last id pushed onto `chain`.
        let top_depth = loop {
            if let Some(&known) = self.memo.get(cursor) {
                break known + 1;
            }
            chain.push(cursor);
            on_chain.insert(cursor);

            match self.parent_of(cursor) {
                None => break 0,
                Some(parent) if on_chain.contains(parent) => {
                    tracing::debug!(
                        span_id = cursor,
                        parent_span_id = parent,
                        "parent cycle detected, pinning span to depth 0"
                    );
                    break 0;
                }
                Some(parent) => cursor = parent,
            }
        };

        for (offset, id) in chain.iter().rev().enumerate() {
            self.memo.insert(*id, top_depth + offset);
        }
        self.memo.get(key).copied().unwrap_or(0)
    }

    fn parent_of(&self, span_id: &str) -> Option<&'a str> {
        let span: &'a Span = *self.by_id.get(span_id)?;
        let parent = span.parent_span_id.as_deref()?;
        match self.by_id.get_key_value(parent) {
            Some((&parent_key, _)) => Some(parent_key),
            None => {
                tracing::trace!(span_id, parent_span_id = parent, "dangling parent reference");
                None
            }
        }
    }
}

/// Depth of every span, aligned with the input order.
pub fn resolve_flat_depths(spans: &[Span]) -> Vec<usize> {
    let mut resolver = DepthResolver::new(spans);
    spans
        .iter()
        .map(|span| resolver.depth_of(&span.span_id))
        .collect()
}

/// A span paired with the parent it hangs under and its resolved depth.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpanDepth<'a> {
    pub span: &'a Span,
    pub parent_span_id: Option<&'a str>,
    pub depth: usize,
}

/// Pre-order walk of a span forest, pairing each span with its nesting level
/// and its structural parent. Roots keep the parent reference they came with.
///
/// A node whose id already appears on its own ancestor path restarts at
/// depth 0, mirroring the flat resolver's cycle rule.
pub fn resolve_tree_depths(roots: &[SpanTreeNode]) -> Vec<SpanDepth<'_>> {
    let mut out = Vec::new();
    // Ids from the root down to the last visited node, and how often each
    // id occurs on that path.
    let mut path: Vec<&str> = Vec::new();
    let mut on_path: HashMap<&str, usize> = HashMap::new();
    // (node, nesting level, depth, structural parent)
    let mut stack: Vec<(&SpanTreeNode, usize, usize, Option<&str>)> = roots
        .iter()
        .rev()
        .map(|root| (root, 0, 0, None))
        .collect();

    while let Some((node, level, depth, parent)) = stack.pop() {
        while path.len() > level {
            let Some(left) = path.pop() else {
                break;
            };
            let remaining = on_path.get(left).copied().unwrap_or(0).saturating_sub(1);
            if remaining == 0 {
                on_path.remove(left);
            } else {
                on_path.insert(left, remaining);
            }
        }

        let id = node.span.span_id.as_str();
        let depth = if on_path.contains_key(id) {
            tracing::debug!(span_id = id, "span id repeats on its ancestor path");
            0
        } else {
            depth
        };
        out.push(SpanDepth {
            span: &node.span,
            parent_span_id: parent.or(node.span.parent_span_id.as_deref()),
            depth,
        });
        path.push(id);
        *on_path.entry(id).or_insert(0) += 1;

        for child in node.children.iter().rev() {
            stack.push((child, level + 1, depth + 1, Some(id)));
        }
    }
    out
}
