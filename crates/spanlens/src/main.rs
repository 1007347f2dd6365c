mod input;
mod output;
mod telemetry;

use std::io::IsTerminal;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde::Serialize;
use spanlens_core::config::Config;
use spanlens_core::context::span_context_by_id;
use spanlens_core::filter::{AttrFilter, SpanFilter};
use spanlens_core::model::document::SpanDocument;
use spanlens_core::service_graph::{build_service_graph, build_service_graph_from_tree};
use spanlens_core::trace::{group_traces, summarize_trace};
use spanlens_core::waterfall::{build_waterfall, build_waterfall_from_tree};

use crate::input::{read_document, select_trace};
use crate::output::{
    print_graph_human, print_no_data, print_span_human, print_traces_human,
    print_waterfall_human,
};
use crate::telemetry::init_cli_tracing;

#[derive(Parser, Debug)]
#[command(name = "spanlens")]
#[command(about = "Waterfall, service graph and span context views over trace span dumps")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, global = true)]
    json: bool,

    #[arg(long, global = true, help = "Layout config file (default: SPANLENS_CONFIG or XDG path)")]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(about = "List the traces in a span dump")]
    Traces {
        #[arg(help = "Span JSON file, or - for stdin")]
        input: String,
    },
    #[command(about = "Show a trace as a positioned waterfall")]
    Waterfall {
        input: String,
        #[arg(long)]
        trace: Option<String>,
        #[arg(long, help = "Only show rows whose service matches this glob")]
        service: Option<String>,
        #[arg(long = "where", help = "Attribute filter key=glob, repeatable")]
        where_filters: Vec<String>,
    },
    #[command(about = "Show the service call graph of a trace")]
    Graph {
        input: String,
        #[arg(long)]
        trace: Option<String>,
    },
    #[command(about = "Show parent, children and self time of one span")]
    Span {
        input: String,
        span_id: String,
        #[arg(long)]
        trace: Option<String>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_cli_tracing();
    let color = !cli.json && std::io::stdout().is_terminal();

    match cli.command {
        Commands::Traces { input } => {
            let doc = read_document(&input)?;
            let summaries: Vec<_> = group_traces(&doc.to_flat())
                .iter()
                .filter_map(|(_, spans)| summarize_trace(spans))
                .collect();
            if summaries.is_empty() {
                print_no_data(cli.json);
            } else if cli.json {
                print_json(&summaries)?;
            } else {
                print_traces_human(&summaries, color);
            }
        }
        Commands::Waterfall {
            input,
            trace,
            service,
            where_filters,
        } => {
            let filter = SpanFilter::new(
                service,
                where_filters
                    .iter()
                    .map(|f| AttrFilter::parse(f))
                    .collect::<spanlens_core::Result<Vec<_>>>()?,
            )?;
            let doc = read_document(&input)?;
            let data = select_trace(&doc, trace.as_deref()).and_then(|selected| match &selected {
                SpanDocument::Flat(spans) => build_waterfall(spans),
                SpanDocument::Tree(roots) => build_waterfall_from_tree(roots),
            });
            match data.map(|d| filter.apply(&d)) {
                None => print_no_data(cli.json),
                Some(data) if cli.json => print_json(&data)?,
                Some(data) => print_waterfall_human(&data, color),
            }
        }
        Commands::Graph { input, trace } => {
            let config = load_config(cli.config)?;
            let doc = read_document(&input)?;
            let graph = select_trace(&doc, trace.as_deref()).map(|selected| match &selected {
                SpanDocument::Flat(spans) => build_service_graph(spans, &config.layout),
                SpanDocument::Tree(roots) => build_service_graph_from_tree(roots, &config.layout),
            });
            match graph {
                None => print_no_data(cli.json),
                Some(graph) if cli.json => print_json(&graph)?,
                Some(graph) => print_graph_human(&graph),
            }
        }
        Commands::Span {
            input,
            span_id,
            trace,
        } => {
            let doc = read_document(&input)?;
            let Some(selected) = select_trace(&doc, trace.as_deref()) else {
                print_no_data(cli.json);
                return Ok(());
            };
            let spans = selected.to_flat();
            let ctx = span_context_by_id(&span_id, &spans)
                .ok_or_else(|| anyhow::anyhow!("span not found: {span_id}"))?;
            if cli.json {
                print_json(&ctx)?;
            } else {
                print_span_human(&ctx, color);
            }
        }
    }

    Ok(())
}

fn load_config(path: Option<PathBuf>) -> anyhow::Result<Config> {
    let config = match path {
        Some(path) => Config::load_with_file(&path)?,
        None => Config::load()?,
    };
    tracing::debug!(
        radius_per_service = config.layout.radius_per_service,
        palette = config.layout.palette.len(),
        "loaded layout config"
    );
    Ok(config)
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
