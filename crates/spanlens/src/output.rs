use std::time::Duration;

use chrono::{SecondsFormat, TimeZone, Utc};
use owo_colors::OwoColorize;
use spanlens_core::context::SpanContext;
use spanlens_core::model::span::value_to_text;
use spanlens_core::model::visual::{SpanStatus, WaterfallData};
use spanlens_core::service_graph::ServiceGraph;
use spanlens_core::time::format_duration_ms;
use spanlens_core::trace::TraceSummary;

pub fn print_no_data(json: bool) {
    if json {
        println!("null");
    } else {
        println!("no data");
    }
}

pub fn print_traces_human(v: &[TraceSummary], color: bool) {
    for item in v {
        println!(
            "trace={} start={} duration={} spans={} errors={} status={} root=\"{} {}\"",
            item.trace_id,
            timestamp_label(item.start_ms),
            trace_duration_label(item.duration_ms),
            item.span_count,
            item.error_count,
            status_label(item.status, color),
            item.root_service,
            item.root_name
        );
    }
    println!("-- {} traces --", v.len());
}

pub fn print_waterfall_human(v: &WaterfallData, color: bool) {
    println!(
        "TRACE {} start={} duration={} spans={}",
        v.trace_id,
        timestamp_label(v.trace_start_ms),
        trace_duration_label(v.total_duration_ms),
        v.span_count
    );
    for span in &v.spans {
        let indent = "  ".repeat(span.depth);
        let service = if color {
            span.service.cyan().to_string()
        } else {
            span.service.clone()
        };
        println!(
            "{indent}{service} {} [{:.1}% +{:.1}%] {} {}",
            span.name,
            span.start_percent,
            span.width_percent,
            format_duration_ms(span.duration_ms),
            status_label(span.status, color)
        );
    }
}

pub fn print_graph_human(v: &ServiceGraph) {
    for node in &v.nodes {
        println!(
            "node={} spans={} errors={} total={} at=({:.2},{:.2}) color={}",
            node.id,
            node.span_count,
            node.error_count,
            format_duration_ms(node.total_duration_ms),
            node.x,
            node.y,
            node.color
        );
    }
    for edge in &v.edges {
        println!(
            "edge={} -> {} calls={} total={}",
            edge.from,
            edge.to,
            edge.call_count,
            format_duration_ms(edge.total_duration_ms)
        );
    }
    println!("-- {} services, {} edges --", v.nodes.len(), v.edges.len());
}

pub fn print_span_human(v: &SpanContext<'_>, color: bool) {
    let span = v.span;
    println!(
        "SPAN {} name={} status={} duration={}",
        span.span_id,
        span.name,
        status_label(span.normalized_status(), color),
        format_duration_ms(v.duration_ms)
    );
    match v.parent {
        Some(parent) => println!("parent={} {}", parent.span_id, parent.name),
        None => println!("parent=-"),
    }
    println!(
        "children={} child_time={} self_time={}",
        v.children.len(),
        format_duration_ms(v.child_duration_ms),
        format_duration_ms(v.self_time_ms)
    );
    for child in &v.children {
        println!(
            "  {} {} ({})",
            child.span_id,
            child.name,
            format_duration_ms(child.duration_ms())
        );
    }
    for attr in &span.attributes {
        println!("attr {}={}", attr.key, value_to_text(&attr.value));
    }
    for event in &span.events {
        println!("event {}", event.name);
    }
}

fn status_label(status: SpanStatus, color: bool) -> String {
    let label = status.as_str().to_ascii_uppercase();
    if !color {
        return label;
    }
    match status {
        SpanStatus::Ok => label.green().to_string(),
        SpanStatus::Error => label.red().to_string(),
        SpanStatus::Unset => label.bright_black().to_string(),
    }
}

fn trace_duration_label(ms: f64) -> String {
    if !ms.is_finite() || ms <= 0.0 {
        return "0ms".to_string();
    }
    let micros = (ms * 1000.0).round() as u64;
    humantime::format_duration(Duration::from_micros(micros)).to_string()
}

fn timestamp_label(ms: f64) -> String {
    if !ms.is_finite() {
        return "-".to_string();
    }
    Utc.timestamp_millis_opt(ms.round() as i64)
        .single()
        .map(|ts| ts.to_rfc3339_opts(SecondsFormat::Millis, true))
        .unwrap_or_else(|| format!("{ms}ms"))
}
