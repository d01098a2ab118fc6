//! CLI binary for md2doc.
//!
//! A thin shim over the library crate that maps CLI flags to `ExportConfig`
//! and writes the artifact.

use anyhow::{Context, Result};
use clap::Parser;
use md2doc::{export_to_file, ExportConfig, ExportFormat};
use std::io::Read;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

/// Convert extracted text to a PDF or DOCX document.
#[derive(Parser, Debug)]
#[command(name = "md2doc", version, about)]
struct Cli {
    /// Input text file, or `-` to read stdin.
    input: String,

    /// Output path. Defaults to the conventional filename for the format.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Export format: `pdf` or `docx`.
    #[arg(short, long, default_value = "pdf")]
    format: String,

    /// Page size in millimetres, as `WIDTHxHEIGHT`. Default: A4 (210x297).
    #[arg(long)]
    page_size: Option<String>,

    /// All four page margins in millimetres.
    #[arg(long, default_value_t = 10.0)]
    margins: f32,

    /// Raster resolution multiplier for the PDF path (1–4 is sensible).
    #[arg(long, default_value_t = 2.0)]
    scale: f32,

    /// Base body font size in CSS pixels.
    #[arg(long, default_value_t = 16.0)]
    font_size: f32,

    /// Document title stored in the artifact metadata.
    #[arg(long)]
    title: Option<String>,

    /// Print run statistics as JSON on stdout.
    #[arg(long)]
    json: bool,

    /// Verbose logging (also honours RUST_LOG).
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let raw = read_input(&cli.input)?;
    let format: ExportFormat = cli.format.parse()?;
    let config = build_config(&cli)?;
    let path = cli
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(format.suggested_filename()));

    let output = export_to_file(raw, format, &config, &path).await?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&output.stats)?);
    } else {
        let pages = match output.stats.page_count {
            Some(n) => format!("{n} pages, "),
            None => String::new(),
        };
        eprintln!(
            "{} {} {}",
            green("✓"),
            bold(&path.display().to_string()),
            dim(&format!(
                "({}{} bytes, {} ms)",
                pages,
                output.bytes.len(),
                output.stats.total_duration_ms
            ))
        );
    }
    Ok(())
}

fn read_input(input: &str) -> Result<String> {
    if input == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read stdin")?;
        Ok(buf)
    } else {
        std::fs::read_to_string(input).with_context(|| format!("failed to read '{input}'"))
    }
}

fn build_config(cli: &Cli) -> Result<ExportConfig> {
    let mut builder = ExportConfig::builder()
        .margins_mm(cli.margins)
        .raster_scale(cli.scale)
        .base_font_px(cli.font_size);
    if let Some(size) = &cli.page_size {
        let (w, h) = size
            .split_once(['x', 'X'])
            .and_then(|(w, h)| Some((w.trim().parse::<f32>().ok()?, h.trim().parse::<f32>().ok()?)))
            .with_context(|| format!("invalid --page-size '{size}' (expected WIDTHxHEIGHT)"))?;
        builder = builder.page_size_mm(w, h);
    }
    if let Some(title) = &cli.title {
        builder = builder.title(title.clone());
    }
    Ok(builder.build()?)
}
