use std::path::PathBuf;

use anyhow::Context;
use chrono::{Local, NaiveDateTime};
use clap::{ArgGroup, Parser, Subcommand};
use tracing::info;

mod analysis;
mod config;
mod error;
mod insights;
mod models;
mod report;
mod workspace;

use crate::config::Settings;
use crate::insights::InsightEngine;
use crate::models::{AnalyzedImage, Insight, Milestone, MilestoneDetails, WeeklySummary};

#[derive(Parser)]
#[command(name = "grow-assistant")]
#[command(about = "Grow documentation assistant: image health, data insights and update posts", long_about = None)]
struct Cli {
    /// Path to the YAML configuration file
    #[arg(long, global = true, default_value = "config.yaml")]
    config: PathBuf,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the workspace directories
    Init,
    /// Analyze images waiting in the upload directory
    Analyze {
        /// Analyze this directory instead of the configured uploads
        #[arg(long)]
        dir: Option<PathBuf>,
        /// Leave analyzed images in place
        #[arg(long)]
        keep: bool,
        /// Also write a CSV summary to this path
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// Evaluate the JSON data files and print insights
    Evaluate,
    /// Analyze uploads, evaluate data and write an update post
    Run,
    /// Write a growth milestone post
    #[command(group(
        ArgGroup::new("details")
            .args(["detail", "note"])
            .multiple(false)
    ))]
    Milestone {
        /// germination, vegetative, flowering, harvest or any other label
        kind: String,
        /// Detail line as key=value (repeatable)
        #[arg(long, value_parser = parse_detail)]
        detail: Vec<(String, String)>,
        /// A single free-text detail
        #[arg(long)]
        note: Option<String>,
    },
    /// Write a weekly summary post
    Weekly {
        /// JSON file with any of images_processed, avg_health, growth_rate, notes
        #[arg(long)]
        from: Option<PathBuf>,
        #[arg(long)]
        images_processed: Option<u32>,
        #[arg(long)]
        avg_health: Option<String>,
        #[arg(long)]
        growth_rate: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },
}

fn parse_detail(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got `{raw}`"))?;
    Ok((key.trim().to_string(), value.trim().to_string()))
}

fn file_safe(label: &str) -> String {
    label
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "grow_assistant=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let settings = Settings::load(&cli.config)
        .with_context(|| format!("failed to load configuration from {}", cli.config.display()))?;

    match cli.command {
        Commands::Init => {
            workspace::ensure_directories(&settings.directories)?;
            println!("Workspace ready.");
        }
        Commands::Analyze { dir, keep, csv } => {
            let source = dir.unwrap_or_else(|| settings.directories.uploads.clone());
            let results = process_images(&settings, &source, !keep)?;

            if results.is_empty() {
                println!("No images to analyze in {}.", source.display());
                return Ok(());
            }

            for image in &results {
                let analysis = &image.analysis;
                match analysis.color_analysis.green_dominance() {
                    Some(ratio) => println!(
                        "- {}: {} (green dominance {:.2}, brightness {:.1})",
                        image.filename, analysis.estimated_health, ratio, analysis.brightness
                    ),
                    None => println!(
                        "- {}: {} (brightness {:.1})",
                        image.filename, analysis.estimated_health, analysis.brightness
                    ),
                }
            }

            let path =
                workspace::save_analyses(&settings.directories.output, now(), &results)?;
            println!("Analysis written to {}.", path.display());

            if let Some(csv) = csv {
                let written = workspace::export_csv(&csv, &results)?;
                println!("Exported {written} rows to {}.", csv.display());
            }
        }
        Commands::Evaluate => {
            let insights = evaluate_data(&settings)?;
            for insight in &insights {
                println!(
                    "- [{:?}/{:?}] {}",
                    insight.kind, insight.category, insight.message
                );
            }
            let path =
                workspace::save_insights(&settings.directories.output, now(), &insights)?;
            println!("Insights written to {}.", path.display());
        }
        Commands::Run => {
            info!("starting processing cycle");
            let uploads = settings.directories.uploads.clone();
            let images = process_images(&settings, &uploads, true)?;
            let insights = evaluate_data(&settings)?;

            if images.is_empty() && insights.is_empty() {
                println!("No new content to process.");
                return Ok(());
            }

            let timestamp = now();
            let post = report::build_update(timestamp, &images, &insights);
            let path =
                workspace::save_post(&settings.directories.output, "post", timestamp, &post)?;
            println!("{post}");
            println!("Post written to {}.", path.display());
            info!("processing cycle complete");
        }
        Commands::Milestone { kind, detail, note } => {
            let milestone = Milestone::parse(&kind);
            let details = match note {
                Some(note) => Some(MilestoneDetails::Note(note)),
                None if !detail.is_empty() => Some(MilestoneDetails::Fields(detail)),
                None => None,
            };

            let timestamp = now();
            let post = report::build_milestone(timestamp, &milestone, details.as_ref());
            let path = workspace::save_post(
                &settings.directories.output,
                &format!("milestone_{}", file_safe(milestone.label())),
                timestamp,
                &post,
            )?;
            println!("{post}");
            println!("Milestone post written to {}.", path.display());
        }
        Commands::Weekly {
            from,
            images_processed,
            avg_health,
            growth_rate,
            notes,
        } => {
            let mut summary = match from {
                Some(path) => {
                    let raw = std::fs::read_to_string(&path)
                        .with_context(|| format!("failed to read {}", path.display()))?;
                    serde_json::from_str::<WeeklySummary>(&raw)
                        .with_context(|| format!("invalid weekly data in {}", path.display()))?
                }
                None => WeeklySummary::default(),
            };
            summary.images_processed = images_processed.or(summary.images_processed);
            summary.avg_health = avg_health.or(summary.avg_health);
            summary.growth_rate = growth_rate.or(summary.growth_rate);
            summary.notes = notes.or(summary.notes);

            let timestamp = now();
            let post = report::build_weekly_summary(timestamp, &summary);
            let path =
                workspace::save_post(&settings.directories.output, "weekly", timestamp, &post)?;
            println!("{post}");
            println!("Weekly summary written to {}.", path.display());
        }
    }

    Ok(())
}

fn process_images(
    settings: &Settings,
    source: &std::path::Path,
    move_when_done: bool,
) -> anyhow::Result<Vec<AnalyzedImage>> {
    let files = workspace::discover(source, settings.supported_formats())?;
    info!(count = files.len(), dir = %source.display(), "found images to analyze");

    let entries = files
        .iter()
        .map(|path| (workspace::file_name(path), analysis::PixelBuffer::open(path)));
    let results = analysis::batch_analyze(entries, now());

    if move_when_done && !results.is_empty() {
        move_analyzed(settings, source, &results)?;
    }

    Ok(results)
}

fn move_analyzed(
    settings: &Settings,
    source: &std::path::Path,
    results: &[AnalyzedImage],
) -> anyhow::Result<()> {
    let analyzed = &settings.directories.analyzed;
    std::fs::create_dir_all(analyzed)
        .with_context(|| format!("failed to create {}", analyzed.display()))?;
    let names: Vec<&str> = results.iter().map(|r| r.filename.as_str()).collect();
    workspace::move_processed(source, analyzed, &names);
    Ok(())
}

fn evaluate_data(settings: &Settings) -> anyhow::Result<Vec<Insight>> {
    let sources = workspace::read_data_files(&settings.directories.data)?;
    let engine = InsightEngine::new(settings.thresholds());
    let insights = engine.evaluate_sources(sources);
    info!(count = insights.len(), "generated insights");
    Ok(insights)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detail_splits_on_first_equals() {
        assert_eq!(
            parse_detail("ratio = 1:2=ok").unwrap(),
            ("ratio".to_string(), "1:2=ok".to_string())
        );
        assert!(parse_detail("no separator").is_err());
    }

    #[test]
    fn milestone_labels_become_file_safe() {
        assert_eq!(file_safe("first leaf/day 3"), "first_leaf_day_3");
    }

    #[test]
    fn cli_rejects_detail_and_note_together() {
        let parsed = Cli::try_parse_from([
            "grow-assistant",
            "milestone",
            "flowering",
            "--detail",
            "day=40",
            "--note",
            "buds",
        ]);
        assert!(parsed.is_err());
    }
}
