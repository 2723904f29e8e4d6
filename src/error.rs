use image::ColorType;

/// Parameter set rejected before any image is processed.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    #[error("{channel} interval is inverted: lower {lower} > upper {upper}")]
    InvertedInterval {
        channel: &'static str,
        lower: f32,
        upper: f32,
    },
    #[error("{channel} interval [{lower}, {upper}] must lie within [0, 1]")]
    IntervalOutOfRange {
        channel: &'static str,
        lower: f32,
        upper: f32,
    },
    #[error("{class} radius range is invalid: min {min}, max {max}")]
    InvalidRadiusRange {
        class: &'static str,
        min: u32,
        max: u32,
    },
    #[error("parameter `{name}` = {value} is out of range ({expected})")]
    OutOfRange {
        name: &'static str,
        value: f32,
        expected: &'static str,
    },
    #[error(
        "{class} Hough accumulator needs {required} bytes for {width}x{height}, limit is {limit}"
    )]
    AccumulatorTooLarge {
        class: &'static str,
        width: u32,
        height: u32,
        required: u64,
        limit: u64,
    },
}

/// Input that the pipeline refuses to process.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum InvalidInputError {
    #[error("image is empty ({width}x{height})")]
    Empty { width: u32, height: u32 },
    #[error("image has no color channels ({0:?}); a color smear image is required")]
    NotColor(ColorType),
    #[error("non-finite pixel value at ({x}, {y})")]
    NonFinite { x: u32, y: u32 },
    #[error("mask dimensions differ: expected {expected:?}, got {actual:?}")]
    DimensionMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },
}

/// Anything that can fail while scanning an image.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    InvalidInput(#[from] InvalidInputError),
    #[error(transparent)]
    Image(#[from] image::ImageError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("debug directory is not empty: {0}")]
    DebugDirNotEmpty(std::path::PathBuf),
}

pub type Result<T, E = ScanError> = std::result::Result<T, E>;
