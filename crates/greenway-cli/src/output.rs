//! Output formatting for command results.
//!
//! Every command builds a serializable output struct and hands it to
//! [`OutputFormat`], which renders either human-readable text or JSON.

use std::io::{self, Write};

use clap::ValueEnum;
use serde::Serialize;

use greenway_lib::cache::CacheInfo;
use greenway_lib::{OptimizationReport, RouteResult};

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Result of `fetch`.
#[derive(Debug, Clone, Serialize)]
pub struct FetchOutput {
    pub url: String,
    pub features: usize,
    pub nodes: usize,
    pub edges: usize,
    pub cache_dir: Option<String>,
}

/// Result of `optimize`.
#[derive(Debug, Clone, Serialize)]
pub struct OptimizeOutput {
    pub input: String,
    pub output: String,
    pub report: OptimizationReport,
    pub nodes: usize,
    pub edges: usize,
    pub stored_in_cache: bool,
}

/// Result of `route`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteOutput {
    pub from_cache: bool,
    #[serde(flatten)]
    pub route: RouteResult,
}

/// Result of `cache info`.
#[derive(Debug, Clone, Serialize)]
pub struct CacheInfoOutput {
    pub cache_dir: Option<String>,
    pub schema_version: String,
    pub processed: CacheInfo,
}

impl OutputFormat {
    pub fn render_fetch(self, output: &FetchOutput) -> io::Result<()> {
        self.write_fetch(&mut io::stdout().lock(), output)
    }

    pub fn render_optimize(self, output: &OptimizeOutput) -> io::Result<()> {
        self.write_optimize(&mut io::stdout().lock(), output)
    }

    pub fn render_route(self, output: &RouteOutput) -> io::Result<()> {
        self.write_route(&mut io::stdout().lock(), output)
    }

    pub fn render_cache_info(self, output: &CacheInfoOutput) -> io::Result<()> {
        self.write_cache_info(&mut io::stdout().lock(), output)
    }

    pub fn write_fetch(self, out: &mut dyn Write, output: &FetchOutput) -> io::Result<()> {
        match self {
            OutputFormat::Json => write_json(out, output),
            OutputFormat::Text => {
                writeln!(out, "Loaded {}", output.url)?;
                writeln!(
                    out,
                    "Network: {} features, {} nodes, {} edges",
                    output.features, output.nodes, output.edges
                )?;
                match &output.cache_dir {
                    Some(dir) => writeln!(out, "Cached under {dir}"),
                    None => writeln!(out, "Caching disabled"),
                }
            }
        }
    }

    pub fn write_optimize(self, out: &mut dyn Write, output: &OptimizeOutput) -> io::Result<()> {
        match self {
            OutputFormat::Json => write_json(out, output),
            OutputFormat::Text => {
                let report = &output.report;
                writeln!(out, "Optimized {} -> {}", output.input, output.output)?;
                writeln!(
                    out,
                    "Features: {} in, {} kept, {} too short, {} invalid",
                    report.input_features, report.kept, report.dropped_short, report.dropped_invalid
                )?;
                writeln!(out, "Graph: {} nodes, {} edges", output.nodes, output.edges)?;
                if output.stored_in_cache {
                    writeln!(out, "Processed network stored in cache")?;
                }
                Ok(())
            }
        }
    }

    pub fn write_route(self, out: &mut dyn Write, output: &RouteOutput) -> io::Result<()> {
        match self {
            OutputFormat::Json => write_json(out, output),
            OutputFormat::Text => {
                let route = &output.route;
                let source = if output.from_cache {
                    "processed cache"
                } else {
                    "fresh build"
                };
                writeln!(out, "Network source: {source}")?;
                writeln!(
                    out,
                    "Snapped start: {:.6},{:.6}",
                    route.start_coords[1], route.start_coords[0]
                )?;
                writeln!(
                    out,
                    "Snapped end: {:.6},{:.6}",
                    route.end_coords[1], route.end_coords[0]
                )?;

                if route.path.is_empty() {
                    return writeln!(out, "No route found");
                }

                writeln!(
                    out,
                    "Route: {} nodes, {:.1} m",
                    route.path.len(),
                    route.distance_m
                )?;
                for [lng, lat] in &route.path {
                    writeln!(out, "- {lat:.6},{lng:.6}")?;
                }
                writeln!(out, "Segments:")?;
                for segment in &route.route_segments {
                    writeln!(out, "- {segment}")?;
                }
                Ok(())
            }
        }
    }

    pub fn write_cache_info(self, out: &mut dyn Write, output: &CacheInfoOutput) -> io::Result<()> {
        match self {
            OutputFormat::Json => write_json(out, output),
            OutputFormat::Text => {
                match &output.cache_dir {
                    Some(dir) => writeln!(out, "Cache directory: {dir}")?,
                    None => writeln!(out, "Cache directory: <disabled>")?,
                }
                let processed = &output.processed;
                if !processed.exists {
                    return writeln!(out, "Processed network: none");
                }
                writeln!(
                    out,
                    "Processed network: {} bytes, version {} (current {})",
                    processed.size_bytes,
                    processed.version.as_deref().unwrap_or("unreadable"),
                    output.schema_version
                )?;
                if let Some(timestamp) = processed.timestamp {
                    writeln!(out, "Written at: {timestamp} ms since epoch")?;
                }
                Ok(())
            }
        }
    }
}

fn write_json<T: Serialize>(out: &mut dyn Write, value: &T) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)
}
