pub mod preprocessing;
pub mod color;
pub mod separation;
pub mod hough;
pub mod overlap;
pub mod quantify;

use image::DynamicImage;
use log::debug;

use crate::config::PipelineParameters;
use crate::error::ScanError;
use crate::models::{CellClass, DetectionResult};
use hough::CircleDetector;
use preprocessing::EdgeStages;
use separation::ClassMasks;

/// Every artifact produced while scanning one image
#[derive(Debug, Clone)]
pub struct DetectionStages {
    pub edges: EdgeStages,
    pub classes: ClassMasks,
    pub result: DetectionResult,
}

/// Run all detection stages on an already validated image.
///
/// Stages run strictly in order and each one only reads what the previous
/// produced; intermediates are returned for inspection.
pub fn detect(
    img: &DynamicImage,
    params: &PipelineParameters,
) -> Result<DetectionStages, ScanError> {
    // Step 1: Edge mask
    let edges = preprocessing::preprocess_stages(img, &params.edge);
    debug!(
        "edge mask: {} of {} pixels after cleanup ({} before)",
        edges.mask.count(),
        img.width() as u64 * img.height() as u64,
        edges.binary.count()
    );

    // Step 2: Parasite stain, and the candidate cell region
    let stained = color::segment(img, &params.infected_color);
    let candidate = match &params.cell_color {
        Some(cell_color) => edges.mask.union(&color::segment(img, cell_color))?,
        None => edges.mask.clone(),
    };
    debug!(
        "stained pixels: {}, candidate region: {}",
        stained.count(),
        candidate.count()
    );

    // Step 3: Class masks
    let classes = separation::separate(&stained, &candidate)?;

    // Step 4: Circle candidates per class
    let find = |class: CellClass| {
        let mask = match class {
            CellClass::Infected => &classes.infected,
            CellClass::Normal => &classes.normal,
        };
        CircleDetector::new(
            class,
            params.radius_range(class),
            params.hough,
            params.max_accumulator_bytes,
        )
        .detect(mask)
    };
    let infected_candidates = find(CellClass::Infected)?;
    let normal_candidates = find(CellClass::Normal)?;

    // Step 5: Overlaps within and across classes
    let (infected, normal) = overlap::resolve_classes(
        infected_candidates,
        normal_candidates,
        params.overlap_factor,
    );

    // Step 6: Counts
    let result = quantify::quantify(infected, normal);
    debug!(
        "detected {} infected and {} normal cells, parasitemia {:.3}",
        result.infected_count(),
        result.normal_count(),
        result.parasitemia_rate
    );

    Ok(DetectionStages {
        edges,
        classes,
        result,
    })
}
