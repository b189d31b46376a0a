use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use crate::model::{Dataset, Segment};

/// Display-resolution files come either as a bare segment array or as an
/// object carrying `segments` / `displaySegments`.
#[derive(Deserialize)]
#[serde(untagged)]
enum DisplayFile {
    Segments(Vec<Segment>),
    Object {
        #[serde(default)]
        segments: Vec<Segment>,
        #[serde(default, rename = "displaySegments", alias = "display_segments")]
        display_segments: Vec<Segment>,
    },
}

pub fn load_dataset(path: &Path) -> Result<Dataset> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read dataset: {}", path.display()))?;
    let dataset: Dataset = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse dataset: {}", path.display()))?;
    debug!(
        "loaded {}: {} paths, {} segments, {} aircraft",
        path.display(),
        dataset.paths.len(),
        dataset.segments.len(),
        dataset.aircraft.len()
    );
    Ok(dataset)
}

pub fn load_display_segments(path: &Path) -> Result<Vec<Segment>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read display segments: {}", path.display()))?;
    let file: DisplayFile = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse display segments: {}", path.display()))?;
    let segments = match file {
        DisplayFile::Segments(segments) => segments,
        DisplayFile::Object {
            segments,
            display_segments,
        } => {
            if display_segments.is_empty() {
                segments
            } else {
                display_segments
            }
        }
    };
    Ok(segments)
}

/// Loads the dataset and, when `display_file` is non-empty, replaces its
/// display-resolution segments with the ones from that file.
pub fn load_inputs(data_file: &str, display_file: &str) -> Result<Dataset> {
    let mut dataset = load_dataset(Path::new(data_file))?;
    let display_file = display_file.trim();
    if !display_file.is_empty() {
        dataset.display_segments = load_display_segments(Path::new(display_file))?;
    }
    info!(
        "data ready: {} paths, {} segments ({} display)",
        dataset.paths.len(),
        dataset.segments.len(),
        dataset.display_segments.len()
    );
    Ok(dataset)
}
