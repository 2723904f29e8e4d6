//! Parallel scanning of many image files.
//!
//! Each file is an independent unit of work: it is decoded, validated and
//! scanned on its own, and its failure is recorded next to its path without
//! touching the other files.

use image::{DynamicImage, ImageReader};
use log::{debug, warn};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::annotate;
use crate::detection::quantify::parasitemia_rate;
use crate::error::{Result, ScanError};
use crate::models::DetectionResult;
use crate::pipeline::Pipeline;

/// Outcome for one input file
#[derive(Debug)]
pub struct BatchItem {
    pub path: PathBuf,
    /// Unique within the batch; names the debug sub-directory and the
    /// annotated copy
    pub label: String,
    pub outcome: Result<DetectionResult>,
    /// Where the annotated copy went, if one was requested and the scan
    /// succeeded
    pub annotated: Option<Result<PathBuf>>,
}

impl BatchItem {
    pub fn annotation_error(&self) -> Option<&ScanError> {
        self.annotated.as_ref().and_then(|a| a.as_ref().err())
    }
}

/// Aggregate over a whole batch
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchSummary {
    pub images: usize,
    pub failed: usize,
    pub annotation_failed: usize,
    pub infected: usize,
    pub normal: usize,
    pub parasitemia_rate: f64,
}

impl BatchSummary {
    pub fn from_items(items: &[BatchItem]) -> Self {
        let mut summary = Self {
            images: items.len(),
            failed: 0,
            annotation_failed: 0,
            infected: 0,
            normal: 0,
            parasitemia_rate: 0.0,
        };
        for item in items {
            match &item.outcome {
                Ok(result) => {
                    summary.infected += result.infected_count();
                    summary.normal += result.normal_count();
                }
                Err(_) => summary.failed += 1,
            }
            if item.annotation_error().is_some() {
                summary.annotation_failed += 1;
            }
        }
        summary.parasitemia_rate = parasitemia_rate(summary.infected, summary.normal);
        summary
    }
}

/// One label per input: the file stem, with `_2`, `_3`, ... appended when
/// an earlier input already took it.
pub fn unique_labels(paths: &[PathBuf]) -> Vec<String> {
    let mut taken = HashSet::new();
    paths
        .iter()
        .map(|path| {
            let stem = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "image".to_string());
            let mut label = stem.clone();
            let mut n = 2;
            while !taken.insert(label.clone()) {
                label = format!("{stem}_{n}");
                n += 1;
            }
            label
        })
        .collect()
}

fn decode(path: &Path) -> Result<DynamicImage> {
    Ok(ImageReader::open(path)?.with_guessed_format()?.decode()?)
}

fn save_annotated(img: &DynamicImage, result: &DetectionResult, out: PathBuf) -> Result<PathBuf> {
    annotate::render(img, result).save(&out)?;
    debug!("annotated image saved to {}", out.display());
    Ok(out)
}

fn scan_one(
    pipeline: &Pipeline,
    path: &Path,
    label: String,
    annotate_dir: Option<&Path>,
) -> BatchItem {
    let (outcome, annotated) = match decode(path) {
        Ok(img) => {
            let outcome = pipeline.run_labeled(&img, &label);
            let annotated = match (&outcome, annotate_dir) {
                (Ok(result), Some(dir)) => {
                    let out = dir.join(format!("{label}_annotated.png"));
                    Some(save_annotated(&img, result, out))
                }
                _ => None,
            };
            (outcome, annotated)
        }
        Err(err) => (Err(err), None),
    };

    if let Err(err) = &outcome {
        warn!("{}: {}", path.display(), err);
    }
    if let Some(Err(err)) = &annotated {
        warn!("{}: annotation failed: {}", path.display(), err);
    }

    BatchItem {
        path: path.to_path_buf(),
        label,
        outcome,
        annotated,
    }
}

/// Scan all `paths` in parallel; results come back in input order
pub fn run_batch(pipeline: &Pipeline, paths: &[PathBuf]) -> Vec<BatchItem> {
    run_batch_annotated(pipeline, paths, None)
}

/// Like [`run_batch`], additionally writing `<label>_annotated.png` into
/// `annotate_dir` for every successful scan. A failed write is recorded on
/// its item and does not affect the others.
pub fn run_batch_annotated(
    pipeline: &Pipeline,
    paths: &[PathBuf],
    annotate_dir: Option<&Path>,
) -> Vec<BatchItem> {
    let labels = unique_labels(paths);
    paths
        .par_iter()
        .zip(labels)
        .map(|(path, label)| scan_one(pipeline, path, label, annotate_dir))
        .collect()
}
