//! # Scan Configuration Module
//!
//! This module defines configuration structures for the answer-sheet pipeline,
//! one per stage, plus the limits applied when loading images from disk.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

use crate::errors::{AppError, AppResult};

// Constants for scan configuration
pub const DEFAULT_OPTIONS_PER_ROW: usize = 5;
pub const DEFAULT_REFERENCE_WIDTH: u32 = 500;
pub const FORMAT_DETECTION_BUFFER_SIZE: usize = 32;
pub const MIN_FORMAT_BYTES: usize = 8;
pub const MAX_FILE_SIZE: u64 = 20 * 1024 * 1024; // 20MB limit for image files

/// Edge map parameters (Gaussian smoothing followed by Canny hysteresis)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EdgeConfig {
    /// Gaussian sigma; 1.1 matches a 5x5 kernel
    pub blur_sigma: f32,
    /// Weak hysteresis threshold
    pub canny_low: f32,
    /// Strong hysteresis threshold
    pub canny_high: f32,
}

impl Default for EdgeConfig {
    fn default() -> Self {
        Self {
            blur_sigma: 1.1,
            canny_low: 75.0,
            canny_high: 200.0,
        }
    }
}

/// Document boundary search parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalizerConfig {
    /// Polygon approximation tolerance as a fraction of the contour perimeter
    pub epsilon_ratio: f64,
}

impl Default for LocalizerConfig {
    fn default() -> Self {
        Self {
            epsilon_ratio: 0.02,
        }
    }
}

/// Guards against degenerate perspective mappings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RectifierConfig {
    /// Minimum `area / perimeter²` of the quadrilateral (a square is 1/16)
    pub min_area_ratio: f64,
    /// Minimum width and height of the rectified canvas in pixels
    pub min_side: u32,
}

impl Default for RectifierConfig {
    fn default() -> Self {
        Self {
            min_area_ratio: 1e-3,
            min_side: 2,
        }
    }
}

/// Size and shape window for bubble candidates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BubbleFilterConfig {
    /// Minimum bubble side in pixels at the reference width
    pub min_size: f32,
    /// Maximum bubble side in pixels at the reference width
    pub max_size: f32,
    /// Allowed deviation of width/height from 1.0
    pub aspect_tolerance: f32,
    /// Sheet width the size window is expressed at; `None` keeps absolute pixels
    pub reference_width: Option<u32>,
    /// Discard foreground connected to the image border before contour search
    pub clear_border: bool,
}

impl Default for BubbleFilterConfig {
    fn default() -> Self {
        Self {
            min_size: 20.0,
            max_size: 50.0,
            aspect_tolerance: 0.1,
            reference_width: Some(DEFAULT_REFERENCE_WIDTH),
            clear_border: true,
        }
    }
}

impl BubbleFilterConfig {
    /// Returns the `(min, max)` bubble side in pixels for a sheet of the given width.
    pub fn size_window(&self, sheet_width: u32) -> (f32, f32) {
        let scale = match self.reference_width {
            Some(reference) if reference > 0 => sheet_width as f32 / reference as f32,
            _ => 1.0,
        };
        (self.min_size * scale, self.max_size * scale)
    }

    /// Returns true when a `width` x `height` box is a bubble candidate.
    pub fn accepts(&self, width: u32, height: u32, window: (f32, f32)) -> bool {
        if height == 0 {
            return false;
        }
        let (min, max) = window;
        let (w, h) = (width as f32, height as f32);
        let aspect_ratio = w / h;

        (min..=max).contains(&w)
            && (min..=max).contains(&h)
            && (1.0 - self.aspect_tolerance..=1.0 + self.aspect_tolerance).contains(&aspect_ratio)
    }
}

/// Answer grid layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Options per question (bubbles per row)
    pub options_per_row: usize,
    /// Number of questions printed on the sheet, if known
    pub expected_questions: Option<usize>,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            options_per_row: DEFAULT_OPTIONS_PER_ROW,
            expected_questions: None,
        }
    }
}

/// Limits applied when reading images from disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageIoConfig {
    /// Maximum allowed file size in bytes
    pub max_file_size: u64,
    /// Buffer size for format detection in bytes
    pub buffer_size: usize,
    /// Minimum bytes required for format detection
    pub min_format_bytes: usize,
}

impl Default for ImageIoConfig {
    fn default() -> Self {
        Self {
            max_file_size: MAX_FILE_SIZE,
            buffer_size: FORMAT_DETECTION_BUFFER_SIZE,
            min_format_bytes: MIN_FORMAT_BYTES,
        }
    }
}

/// Configuration structure for the scan pipeline
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub edges: EdgeConfig,
    pub localizer: LocalizerConfig,
    pub rectifier: RectifierConfig,
    pub bubbles: BubbleFilterConfig,
    pub grid: GridConfig,
    pub io: ImageIoConfig,
}

impl ScanConfig {
    /// Load configuration from `OMR_*` environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            edges: EdgeConfig {
                blur_sigma: env_parse("OMR_BLUR_SIGMA", defaults.edges.blur_sigma),
                canny_low: env_parse("OMR_CANNY_LOW", defaults.edges.canny_low),
                canny_high: env_parse("OMR_CANNY_HIGH", defaults.edges.canny_high),
            },
            localizer: LocalizerConfig {
                epsilon_ratio: env_parse("OMR_EPSILON_RATIO", defaults.localizer.epsilon_ratio),
            },
            rectifier: RectifierConfig {
                min_area_ratio: env_parse(
                    "OMR_MIN_AREA_RATIO",
                    defaults.rectifier.min_area_ratio,
                ),
                min_side: env_parse("OMR_MIN_SIDE", defaults.rectifier.min_side),
            },
            bubbles: BubbleFilterConfig {
                min_size: env_parse("OMR_BUBBLE_MIN_SIZE", defaults.bubbles.min_size),
                max_size: env_parse("OMR_BUBBLE_MAX_SIZE", defaults.bubbles.max_size),
                aspect_tolerance: env_parse(
                    "OMR_BUBBLE_ASPECT_TOLERANCE",
                    defaults.bubbles.aspect_tolerance,
                ),
                reference_width: env_optional(
                    "OMR_REFERENCE_WIDTH",
                    defaults.bubbles.reference_width,
                ),
                clear_border: env_parse("OMR_CLEAR_BORDER", defaults.bubbles.clear_border),
            },
            grid: GridConfig {
                options_per_row: env_parse("OMR_OPTIONS_PER_ROW", defaults.grid.options_per_row),
                expected_questions: env_optional(
                    "OMR_EXPECTED_QUESTIONS",
                    defaults.grid.expected_questions,
                ),
            },
            io: ImageIoConfig {
                max_file_size: env_parse("OMR_MAX_FILE_SIZE", defaults.io.max_file_size),
                ..defaults.io
            },
        }
    }

    /// Load configuration from a JSON file; missing fields take their defaults.
    pub fn from_json_file(path: &Path) -> AppResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!(
                "Failed to read scan config '{}': {}",
                path.display(),
                e
            ))
        })?;
        let config: ScanConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate scan configuration parameters
    pub fn validate(&self) -> AppResult<()> {
        if !(self.edges.blur_sigma > 0.0 && self.edges.blur_sigma <= 5.0) {
            return Err(AppError::Config(format!(
                "blur_sigma must be in (0, 5], got {}",
                self.edges.blur_sigma
            )));
        }
        if self.edges.canny_low <= 0.0 {
            return Err(AppError::Config(
                "canny_low must be greater than 0".to_string(),
            ));
        }
        if self.edges.canny_high < self.edges.canny_low {
            return Err(AppError::Config(format!(
                "canny_high ({}) must be >= canny_low ({})",
                self.edges.canny_high, self.edges.canny_low
            )));
        }
        if !(self.localizer.epsilon_ratio > 0.0 && self.localizer.epsilon_ratio < 0.5) {
            return Err(AppError::Config(format!(
                "epsilon_ratio must be in (0, 0.5), got {}",
                self.localizer.epsilon_ratio
            )));
        }
        if self.rectifier.min_area_ratio < 0.0 {
            return Err(AppError::Config(
                "min_area_ratio cannot be negative".to_string(),
            ));
        }
        if self.rectifier.min_side < 2 {
            return Err(AppError::Config(
                "min_side must be at least 2 pixels".to_string(),
            ));
        }
        if self.bubbles.min_size <= 0.0 {
            return Err(AppError::Config(
                "bubble min_size must be greater than 0".to_string(),
            ));
        }
        if self.bubbles.max_size < self.bubbles.min_size {
            return Err(AppError::Config(format!(
                "bubble max_size ({}) must be >= min_size ({})",
                self.bubbles.max_size, self.bubbles.min_size
            )));
        }
        if !(0.0..1.0).contains(&self.bubbles.aspect_tolerance) {
            return Err(AppError::Config(format!(
                "aspect_tolerance must be in [0, 1), got {}",
                self.bubbles.aspect_tolerance
            )));
        }
        if self.bubbles.reference_width == Some(0) {
            return Err(AppError::Config(
                "reference_width must be greater than 0 when set".to_string(),
            ));
        }
        if self.grid.options_per_row < 2 {
            return Err(AppError::Config(
                "options_per_row must be at least 2".to_string(),
            ));
        }
        if self.grid.expected_questions == Some(0) {
            return Err(AppError::Config(
                "expected_questions must be greater than 0 when set".to_string(),
            ));
        }
        if self.io.max_file_size == 0 {
            return Err(AppError::Config(
                "max_file_size must be greater than 0".to_string(),
            ));
        }
        if self.io.buffer_size < self.io.min_format_bytes {
            return Err(AppError::Config(format!(
                "buffer_size ({}) must be >= min_format_bytes ({})",
                self.io.buffer_size, self.io.min_format_bytes
            )));
        }
        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(default)
}

/// Like `env_parse`, but "none" (or an empty value) clears the setting.
fn env_optional<T: std::str::FromStr>(key: &str, default: Option<T>) -> Option<T> {
    match env::var(key) {
        Ok(value) if value.trim().is_empty() || value.trim().eq_ignore_ascii_case("none") => None,
        Ok(value) => value.trim().parse().ok().or(default),
        Err(_) => default,
    }
}
