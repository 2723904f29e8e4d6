use clap::Parser;
use log::info;
use serde::Serialize;
use std::path::{Path, PathBuf};

use malaria_scan::batch::{run_batch_annotated, BatchSummary};
use malaria_scan::{DetectionResult, Pipeline, PipelineParameters};

#[derive(Parser)]
#[command(name = "malaria-scan")]
#[command(about = "Count infected and normal red blood cells in blood-smear images")]
struct Cli {
    /// Input image files
    #[arg(value_name = "IMAGE", required_unless_present = "print_config")]
    images: Vec<PathBuf>,

    /// JSON file with pipeline parameters (missing fields use defaults)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Save stage images to directory (must be empty)
    #[arg(long, value_name = "DIR")]
    debug_out: Option<PathBuf>,

    /// Save an annotated copy of every image to directory
    #[arg(long, value_name = "DIR")]
    annotate_out: Option<PathBuf>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Print the default parameters as JSON and exit
    #[arg(long)]
    print_config: bool,
}

#[derive(Serialize)]
struct ImageReport<'a> {
    path: &'a Path,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<&'a DetectionResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    annotated: Option<&'a Path>,
    #[serde(skip_serializing_if = "Option::is_none")]
    annotation_error: Option<String>,
}

#[derive(Serialize)]
struct Report<'a> {
    images: Vec<ImageReport<'a>>,
    summary: BatchSummary,
}

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    if args.print_config {
        println!("{}", serde_json::to_string_pretty(&PipelineParameters::default())?);
        return Ok(());
    }

    let params = match &args.config {
        Some(path) => PipelineParameters::load_json(path)?,
        None => PipelineParameters::default(),
    };

    let mut pipeline = Pipeline::new(params)?;
    if let Some(debug_dir) = args.debug_out {
        pipeline = pipeline.with_debug(debug_dir)?;
    }

    if let Some(dir) = &args.annotate_out {
        std::fs::create_dir_all(dir)?;
    }

    info!("Scanning {} image(s)", args.images.len());
    let items = run_batch_annotated(&pipeline, &args.images, args.annotate_out.as_deref());
    let summary = BatchSummary::from_items(&items);

    if args.json {
        let report = Report {
            images: items
                .iter()
                .map(|item| ImageReport {
                    path: &item.path,
                    result: item.outcome.as_ref().ok(),
                    error: item.outcome.as_ref().err().map(|e| e.to_string()),
                    annotated: item
                        .annotated
                        .as_ref()
                        .and_then(|a| a.as_ref().ok())
                        .map(PathBuf::as_path),
                    annotation_error: item.annotation_error().map(|e| e.to_string()),
                })
                .collect(),
            summary: summary.clone(),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("\n=== Parasitemia Results ===");
        for item in &items {
            match &item.outcome {
                Ok(result) => println!(
                    "  {}: {} infected, {} normal, parasitemia {:.1}%",
                    item.path.display(),
                    result.infected_count(),
                    result.normal_count(),
                    result.parasitemia_rate * 100.0
                ),
                Err(err) => println!("  {}: FAILED ({})", item.path.display(), err),
            }
            if let Some(err) = item.annotation_error() {
                println!("  {}: annotation FAILED ({})", item.path.display(), err);
            }
        }
        println!(
            "\nTotal: {} infected, {} normal across {} image(s), parasitemia {:.1}%",
            summary.infected,
            summary.normal,
            summary.images - summary.failed,
            summary.parasitemia_rate * 100.0
        );
    }

    if summary.failed > 0 {
        anyhow::bail!("{} of {} image(s) failed", summary.failed, summary.images);
    }
    if summary.annotation_failed > 0 {
        anyhow::bail!(
            "{} of {} annotated image(s) could not be written",
            summary.annotation_failed,
            summary.images
        );
    }

    Ok(())
}
