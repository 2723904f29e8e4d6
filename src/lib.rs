pub mod annotate;
pub mod batch;
pub mod config;
pub mod detection;
pub mod error;
pub mod models;
pub mod pipeline;

pub use batch::{run_batch, run_batch_annotated, BatchItem, BatchSummary};
pub use config::{
    ColorThreshold, EdgeParams, HoughParams, Interval, PipelineParameters, RadiusRange,
};
pub use detection::hough::CircleDetector;
pub use detection::DetectionStages;
pub use error::{ConfigurationError, InvalidInputError, ScanError};
pub use models::{CellClass, Circle, DetectionResult, Mask};
pub use pipeline::{DebugConfig, Pipeline};
