//! Pure transforms from raw trace spans to the views a trace viewer draws:
//! a positioned waterfall, a service call graph and per-span self time.
//!
//! Nothing here performs I/O apart from [`config::Config::load`]; every
//! transform is a deterministic function of its input and degrades
//! malformed data to safe defaults instead of failing.

pub mod config;
pub mod context;
pub mod depth;
pub mod error;
pub mod filter;
pub mod model;
pub mod service_graph;
pub mod time;
pub mod trace;
pub mod waterfall;

pub use config::{Config, LayoutConfig};
pub use context::{SpanContext, calculate_span_context, span_context_by_id};
pub use error::{Result, SpanlensError};
pub use filter::{AttrFilter, SpanFilter};
pub use model::document::SpanDocument;
pub use model::span::{Attribute, Span, SpanEvent};
pub use model::tree::{SpanTreeNode, flatten_tree};
pub use model::visual::{SpanStatus, VisualizationEvent, VisualizationSpan, WaterfallData};
pub use service_graph::{
    ServiceEdge, ServiceGraph, ServiceNode, build_service_graph, build_service_graph_from_tree,
    resolve_service,
};
pub use time::{NANO_THRESHOLD_MS, calculate_duration_ms, format_duration_ms, to_ms};
pub use trace::{TraceSummary, filter_trace, group_traces, summarize_trace};
pub use waterfall::{build_waterfall, build_waterfall_from_tree};
