use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::DirectoryConfig;
use crate::models::{AnalyzedImage, ColorAnalysis, Insight, InsightSnapshot};

pub fn ensure_directories(dirs: &DirectoryConfig) -> anyhow::Result<()> {
    for dir in [
        &dirs.uploads,
        &dirs.analyzed,
        &dirs.archive,
        &dirs.data,
        &dirs.docs,
        &dirs.output,
    ] {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create directory {}", dir.display()))?;
        debug!(dir = %dir.display(), "ensured directory exists");
    }
    Ok(())
}

/// Files directly inside `dir` whose extension matches one of `extensions`,
/// case-insensitively, sorted by name.
pub fn discover(dir: &Path, extensions: &[String]) -> anyhow::Result<Vec<PathBuf>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in
        fs::read_dir(dir).with_context(|| format!("failed to list {}", dir.display()))?
    {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let matches = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
            .unwrap_or(false);
        if matches {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}

pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Moves each named file from `from` into `to`; a failed move is logged and
/// the file stays where it was.
pub fn move_processed(from: &Path, to: &Path, filenames: &[&str]) -> usize {
    let mut moved = 0usize;
    for name in filenames {
        let target = to.join(name);
        match fs::rename(from.join(name), &target) {
            Ok(()) => {
                info!(file = %name, target = %target.display(), "moved to analyzed");
                moved += 1;
            }
            Err(err) => warn!(file = %name, error = %err, "failed to move analyzed image"),
        }
    }
    moved
}

/// Reads every data file; unreadable files are logged and skipped.
pub fn read_data_files(dir: &Path) -> anyhow::Result<Vec<(String, String)>> {
    let mut sources = Vec::new();
    for path in discover(dir, &["json".to_string()])? {
        match fs::read_to_string(&path) {
            Ok(raw) => sources.push((file_name(&path), raw)),
            Err(err) => warn!(file = %path.display(), error = %err, "failed to read data file"),
        }
    }
    Ok(sources)
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let body = serde_json::to_string_pretty(value)?;
    fs::write(path, body).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

pub fn save_insights(
    output_dir: &Path,
    timestamp: NaiveDateTime,
    insights: &[Insight],
) -> anyhow::Result<PathBuf> {
    let path = output_dir.join("insights.json");
    let snapshot = InsightSnapshot {
        timestamp,
        insights: insights.to_vec(),
    };
    write_json(&path, &snapshot)?;
    info!(path = %path.display(), "insights saved");
    Ok(path)
}

pub fn save_analyses(
    output_dir: &Path,
    timestamp: NaiveDateTime,
    analyses: &[AnalyzedImage],
) -> anyhow::Result<PathBuf> {
    let path = output_dir.join(format!("analysis_{}.json", timestamp.format("%Y%m%d_%H%M%S")));
    write_json(&path, &analyses)?;
    info!(path = %path.display(), "analysis results saved");
    Ok(path)
}

pub fn save_post(
    output_dir: &Path,
    prefix: &str,
    timestamp: NaiveDateTime,
    text: &str,
) -> anyhow::Result<PathBuf> {
    fs::create_dir_all(output_dir)?;
    let path = output_dir.join(format!("{prefix}_{}.txt", timestamp.format("%Y%m%d_%H%M%S")));
    fs::write(&path, text).with_context(|| format!("failed to write {}", path.display()))?;
    info!(path = %path.display(), "post saved");
    Ok(path)
}

pub fn export_csv(path: &Path, analyses: &[AnalyzedImage]) -> anyhow::Result<usize> {
    #[derive(Serialize)]
    struct CsvRow<'a> {
        filename: &'a str,
        analyzed_at: NaiveDateTime,
        width: u32,
        height: u32,
        format: &'a str,
        mode: &'a str,
        avg_red: Option<f64>,
        avg_green: Option<f64>,
        avg_blue: Option<f64>,
        green_dominance: Option<f64>,
        brightness: f64,
        health: String,
    }

    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    let mut written = 0usize;

    for image in analyses {
        let analysis = &image.analysis;
        let (rgb, green_dominance) = match &analysis.color_analysis {
            ColorAnalysis::Available {
                average_rgb,
                green_dominance,
            } => (Some(*average_rgb), Some(*green_dominance)),
            ColorAnalysis::Unavailable { .. } => (None, None),
        };

        writer.serialize(CsvRow {
            filename: &image.filename,
            analyzed_at: image.analyzed_at,
            width: analysis.dimensions.width,
            height: analysis.dimensions.height,
            format: &analysis.format,
            mode: &analysis.mode,
            avg_red: rgb.map(|c| c.red),
            avg_green: rgb.map(|c| c.green),
            avg_blue: rgb.map(|c| c.blue),
            green_dominance,
            brightness: analysis.brightness,
            health: analysis.estimated_health.to_string(),
        })?;
        written += 1;
    }

    writer.flush()?;
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{analyze, PixelBuffer};
    use chrono::NaiveDate;

    fn timestamp() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 6, 1)
            .unwrap()
            .and_hms_opt(7, 5, 9)
            .unwrap()
    }

    fn dirs(root: &Path) -> DirectoryConfig {
        DirectoryConfig {
            uploads: root.join("images/uploads"),
            analyzed: root.join("images/analyzed"),
            archive: root.join("images/archive"),
            data: root.join("data"),
            docs: root.join("docs"),
            output: root.join("output"),
        }
    }

    fn sample(filename: &str, channels: u8) -> AnalyzedImage {
        let samples = vec![90; channels as usize];
        let buffer = PixelBuffer::new(1, 1, channels, samples, "PNG");
        AnalyzedImage {
            filename: filename.to_string(),
            analysis: analyze(&buffer).unwrap(),
            analyzed_at: timestamp(),
        }
    }

    #[test]
    fn creates_all_workspace_directories() {
        let root = tempfile::tempdir().unwrap();
        let dirs = dirs(root.path());
        ensure_directories(&dirs).unwrap();

        assert!(dirs.uploads.is_dir());
        assert!(dirs.archive.is_dir());
        assert!(dirs.output.is_dir());
    }

    #[test]
    fn discovers_matching_extensions_in_name_order() {
        let root = tempfile::tempdir().unwrap();
        for name in ["b.PNG", "a.jpg", "notes.txt", "c.jpeg"] {
            fs::write(root.path().join(name), b"x").unwrap();
        }
        fs::create_dir(root.path().join("nested.png")).unwrap();

        let formats = vec!["jpg".to_string(), "jpeg".to_string(), "png".to_string()];
        let found: Vec<String> = discover(root.path(), &formats)
            .unwrap()
            .iter()
            .map(|p| file_name(p))
            .collect();
        assert_eq!(found, vec!["a.jpg", "b.PNG", "c.jpeg"]);
    }

    #[test]
    fn missing_directory_discovers_nothing() {
        let root = tempfile::tempdir().unwrap();
        let found = discover(&root.path().join("absent"), &["png".to_string()]).unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn moves_processed_files_and_skips_missing() {
        let root = tempfile::tempdir().unwrap();
        let dirs = dirs(root.path());
        ensure_directories(&dirs).unwrap();
        fs::write(dirs.uploads.join("leaf.png"), b"x").unwrap();

        let moved = move_processed(&dirs.uploads, &dirs.analyzed, &["leaf.png", "gone.png"]);
        assert_eq!(moved, 1);
        assert!(dirs.analyzed.join("leaf.png").exists());
        assert!(!dirs.uploads.join("leaf.png").exists());
    }

    #[test]
    fn reads_only_json_data_files() {
        let root = tempfile::tempdir().unwrap();
        fs::write(root.path().join("day1.json"), "{}").unwrap();
        fs::write(root.path().join("readme.md"), "# notes").unwrap();

        let sources = read_data_files(root.path()).unwrap();
        assert_eq!(sources, vec![("day1.json".to_string(), "{}".to_string())]);
    }

    #[test]
    fn saved_insights_round_trip_with_timestamp() {
        let root = tempfile::tempdir().unwrap();
        let insights = crate::insights::welcome_insights();
        let path = save_insights(root.path(), timestamp(), &insights).unwrap();

        let snapshot: InsightSnapshot =
            serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(snapshot.timestamp, timestamp());
        assert_eq!(snapshot.insights, insights);
    }

    #[test]
    fn post_file_name_carries_timestamp() {
        let root = tempfile::tempdir().unwrap();
        let path = save_post(root.path(), "post", timestamp(), "hello").unwrap();
        assert_eq!(file_name(&path), "post_20260601_070509.txt");
        assert_eq!(fs::read_to_string(path).unwrap(), "hello");
    }

    #[test]
    fn csv_export_leaves_color_columns_blank_for_grayscale() {
        let root = tempfile::tempdir().unwrap();
        let path = root.path().join("analysis.csv");
        let written = export_csv(&path, &[sample("rgb.png", 3), sample("gray.png", 1)]).unwrap();
        assert_eq!(written, 2);

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(&headers[0], "filename");
        assert_eq!(&headers[11], "health");

        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(&rows[0][11], "Poor");
        assert_eq!(&rows[1][0], "gray.png");
        assert_eq!(&rows[1][9], "");
        assert_eq!(&rows[1][11], "Unknown");
    }
}
