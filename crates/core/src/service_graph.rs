use std::collections::HashMap;
use std::f64::consts::PI;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::LayoutConfig;
use crate::model::span::Span;
use crate::model::tree::{SpanTreeNode, flatten_tree};

pub const UNKNOWN_SERVICE: &str = "unknown";

const RESOURCE_SERVICE_KEYS: &[&str] = &["service.name", "service_name", "serviceName"];

/// One way of deriving a service label from a span. Strategies run in
/// order and the first `Some` wins.
pub type ServiceLabelStrategy = fn(&Span) -> Option<String>;

pub const SERVICE_LABEL_STRATEGIES: &[ServiceLabelStrategy] =
    &[explicit_service_name, resource_service_name, name_prefix];

pub fn explicit_service_name(span: &Span) -> Option<String> {
    span.service_name
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

pub fn resource_service_name(span: &Span) -> Option<String> {
    RESOURCE_SERVICE_KEYS
        .iter()
        .filter_map(|key| span.resource.get(*key))
        .find_map(|value| match value {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            _ => None,
        })
}

pub fn name_prefix(span: &Span) -> Option<String> {
    span.name
        .split('.')
        .next()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

pub fn resolve_service(span: &Span) -> String {
    resolve_service_with(span, SERVICE_LABEL_STRATEGIES)
}

pub fn resolve_service_with(span: &Span, strategies: &[ServiceLabelStrategy]) -> String {
    strategies
        .iter()
        .find_map(|strategy| strategy(span))
        .unwrap_or_else(|| UNKNOWN_SERVICE.to_string())
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceNode {
    pub id: String,
    pub name: String,
    pub span_count: usize,
    pub total_duration_ms: f64,
    pub error_count: usize,
    pub x: f64,
    pub y: f64,
    pub color: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceEdge {
    pub from: String,
    pub to: String,
    pub call_count: usize,
    pub total_duration_ms: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ServiceGraph {
    pub nodes: Vec<ServiceNode>,
    pub edges: Vec<ServiceEdge>,
}

impl ServiceGraph {
    pub fn node(&self, id: &str) -> Option<&ServiceNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn edge(&self, from: &str, to: &str) -> Option<&ServiceEdge> {
        self.edges.iter().find(|e| e.from == from && e.to == to)
    }
}

/// Builds the service call graph of one trace.
///
/// Nodes come out in service discovery order (first span seen per
/// service), which also fixes their slot on the layout circle. Edges come
/// out in the order their first call was observed.
pub fn build_service_graph(spans: &[Span], layout: &LayoutConfig) -> ServiceGraph {
    let services: Vec<String> = spans.iter().map(resolve_service).collect();

    let mut nodes: Vec<ServiceNode> = Vec::new();
    let mut node_index: HashMap<&str, usize> = HashMap::new();
    for (span, service) in spans.iter().zip(&services) {
        let idx = *node_index.entry(service.as_str()).or_insert_with(|| {
            nodes.push(ServiceNode {
                id: service.clone(),
                name: service.clone(),
                span_count: 0,
                total_duration_ms: 0.0,
                error_count: 0,
                x: 0.0,
                y: 0.0,
                color: String::new(),
            });
            nodes.len() - 1
        });
        let node = &mut nodes[idx];
        node.span_count += 1;
        node.total_duration_ms += span.duration_ms();
        if span.is_error() {
            node.error_count += 1;
        }
    }

    let mut service_by_span: HashMap<&str, &str> = HashMap::with_capacity(spans.len());
    for (span, service) in spans.iter().zip(&services) {
        service_by_span
            .entry(span.span_id.as_str())
            .or_insert(service.as_str());
    }

    let mut edges: Vec<ServiceEdge> = Vec::new();
    let mut edge_index: HashMap<(&str, &str), usize> = HashMap::new();
    for (span, service) in spans.iter().zip(&services) {
        let Some(parent_service) = span
            .parent_span_id
            .as_deref()
            .and_then(|parent| service_by_span.get(parent).copied())
        else {
            continue;
        };
        if parent_service == service.as_str() {
            continue;
        }
        let idx = *edge_index
            .entry((parent_service, service.as_str()))
            .or_insert_with(|| {
                edges.push(ServiceEdge {
                    from: parent_service.to_string(),
                    to: service.clone(),
                    call_count: 0,
                    total_duration_ms: 0.0,
                });
                edges.len() - 1
            });
        edges[idx].call_count += 1;
        edges[idx].total_duration_ms += span.duration_ms();
    }

    place_on_circle(&mut nodes, layout);
    ServiceGraph { nodes, edges }
}

pub fn build_service_graph_from_tree(roots: &[SpanTreeNode], layout: &LayoutConfig) -> ServiceGraph {
    build_service_graph(&flatten_tree(roots), layout)
}

/// Evenly spaces nodes on a circle, first node at twelve o'clock, going
/// clockwise in screen coordinates. Coordinates are rounded to 0.01.
fn place_on_circle(nodes: &mut [ServiceNode], layout: &LayoutConfig) {
    let count = nodes.len();
    if count == 0 {
        return;
    }
    let radius = layout.radius_for(count);
    for (i, node) in nodes.iter_mut().enumerate() {
        let angle = 2.0 * PI * i as f64 / count as f64 - PI / 2.0;
        node.x = round2(layout.center_x + radius * angle.cos());
        node.y = round2(layout.center_y + radius * angle.sin());
        node.color = layout.color_for(i);
    }
}

fn round2(v: f64) -> f64 {
    let rounded = (v * 100.0).round() / 100.0;
    // Avoid -0.0 leaking into output.
    if rounded == 0.0 { 0.0 } else { rounded }
}

#[cfg(test)]
mod tests {
    use serde_json::Map;

    use super::*;

    fn span(id: &str, parent: Option<&str>, service: &str, start: f64, end: f64) -> Span {
        Span {
            trace_id: "t1".to_string(),
            span_id: id.to_string(),
            parent_span_id: parent.map(str::to_string),
            name: format!("{service}.op"),
            start_time: start,
            end_time: end,
            service_name: Some(service.to_string()),
            ..Span::default()
        }
    }

    #[test]
    fn same_service_parent_child_has_no_edge() {
        let spans = vec![
            span("a", None, "api", 0.0, 100.0),
            span("b", Some("a"), "api", 10.0, 50.0),
        ];
        let graph = build_service_graph(&spans, &LayoutConfig::default());
        assert_eq!(graph.nodes.len(), 1);
        assert!(graph.edges.is_empty());
        assert_eq!(graph.nodes[0].span_count, 2);
        assert_eq!(graph.nodes[0].total_duration_ms, 140.0);
    }

    #[test]
    fn cross_service_call_creates_one_edge() {
        let spans = vec![
            span("a", None, "api", 0.0, 100.0),
            span("b", Some("a"), "db", 10.0, 50.0),
        ];
        let graph = build_service_graph(&spans, &LayoutConfig::default());
        assert_eq!(graph.edges.len(), 1);
        let edge = graph.edge("api", "db").unwrap();
        assert_eq!(edge.call_count, 1);
        assert_eq!(edge.total_duration_ms, 40.0);
    }

    #[test]
    fn edges_aggregate_repeated_calls() {
        let spans = vec![
            span("a", None, "api", 0.0, 100.0),
            span("b", Some("a"), "db", 10.0, 20.0),
            span("c", Some("a"), "db", 30.0, 60.0),
            span("d", Some("c"), "cache", 31.0, 32.0),
            span("e", Some("missing"), "cache", 40.0, 41.0),
        ];
        let graph = build_service_graph(&spans, &LayoutConfig::default());
        let ids: Vec<_> = graph.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["api", "db", "cache"]);
        assert_eq!(graph.edges.len(), 2);
        assert_eq!(graph.edges[0].from, "api");
        assert_eq!(graph.edges[0].call_count, 2);
        assert_eq!(graph.edges[0].total_duration_ms, 40.0);
        assert_eq!(graph.edges[1].from, "db");
        assert_eq!(graph.edges[1].to, "cache");
        assert_eq!(graph.node("cache").unwrap().span_count, 2);
    }

    #[test]
    fn counts_errors_per_service() {
        let mut failing = span("b", Some("a"), "db", 0.0, 1.0);
        failing.status = "2".to_string();
        let spans = vec![span("a", None, "api", 0.0, 5.0), failing];
        let graph = build_service_graph(&spans, &LayoutConfig::default());
        assert_eq!(graph.node("api").unwrap().error_count, 0);
        assert_eq!(graph.node("db").unwrap().error_count, 1);
    }

    #[test]
    fn label_resolution_falls_through_in_order() {
        let mut resource = Map::new();
        resource.insert("service.name".to_string(), Value::from("checkout"));

        let explicit = Span {
            service_name: Some("billing".into()),
            resource: resource.clone(),
            name: "orders.create".into(),
            ..Span::default()
        };
        let from_resource = Span {
            service_name: Some("  ".into()),
            resource,
            name: "orders.create".into(),
            ..Span::default()
        };
        let from_name = Span {
            name: "orders.create".into(),
            ..Span::default()
        };
        let nothing = Span::default();

        assert_eq!(resolve_service(&explicit), "billing");
        assert_eq!(resolve_service(&from_resource), "checkout");
        assert_eq!(resolve_service(&from_name), "orders");
        assert_eq!(resolve_service(&nothing), UNKNOWN_SERVICE);
        assert_eq!(
            resolve_service_with(&explicit, &[name_prefix]),
            "orders".to_string()
        );
    }

    #[test]
    fn layout_is_deterministic_for_fixed_discovery_order() {
        let spans = vec![
            span("a", None, "api", 0.0, 1.0),
            span("b", Some("a"), "db", 0.0, 1.0),
            span("c", Some("a"), "cache", 0.0, 1.0),
            span("d", Some("a"), "queue", 0.0, 1.0),
        ];
        let graph = build_service_graph(&spans, &LayoutConfig::default());
        // Four services: radius 4 * 40 = 160 around (400, 300).
        let coords: Vec<_> = graph.nodes.iter().map(|n| (n.x, n.y)).collect();
        assert_eq!(
            coords,
            vec![(400.0, 140.0), (560.0, 300.0), (400.0, 460.0), (240.0, 300.0)]
        );
        assert_eq!(graph.nodes[0].color, "#4e79a7");
        assert_eq!(graph.nodes[1].color, "#f28e2b");
    }

    #[test]
    fn single_service_sits_on_min_radius() {
        let spans = vec![span("a", None, "api", 0.0, 1.0)];
        let graph = build_service_graph(&spans, &LayoutConfig::default());
        assert_eq!((graph.nodes[0].x, graph.nodes[0].y), (400.0, 180.0));
    }

    #[test]
    fn empty_input_gives_empty_graph() {
        let graph = build_service_graph(&[], &LayoutConfig::default());
        assert_eq!(graph, ServiceGraph::default());
    }
}
