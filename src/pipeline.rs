//! # Scan Pipeline
//!
//! Runs the recognition stages in order on one photo:
//! edge map, document localization, perspective rectification, bubble
//! segmentation, grid reconstruction and answer extraction.
//!
//! The pipeline is an immutable value: it holds only its configuration and
//! every scan allocates its own buffers.

use image::{DynamicImage, GrayImage};
use serde::Serialize;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::info;

use crate::errors::{error_logging, AppResult};
use crate::image_io;
use crate::observability::{
    record_error_metrics, record_scan_metrics, record_stage_metrics, scan_span, stage_span,
};
use crate::omr::{
    extract_answers, locate_document, reconstruct_grid, rectify, segment_bubbles, AnswerResult,
    BubbleRow, DocumentOutline, GradeReport, Point2D, RectifiedImage, RowReading,
    SegmentationResult,
};
use crate::preprocessing::build_edge_map_from_gray;
use crate::scan_config::ScanConfig;
use crate::scan_errors::ScanError;

/// Wall-clock time spent in each stage, in milliseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct StageTimings {
    pub edge_map_ms: u64,
    pub localize_ms: u64,
    pub rectify_ms: u64,
    pub segment_ms: u64,
    pub grid_ms: u64,
    pub extract_ms: u64,
    pub total_ms: u64,
}

/// What was read from a rectified sheet.
#[derive(Debug, Clone)]
pub struct SheetReading {
    pub segmentation: SegmentationResult,
    pub rows: Vec<BubbleRow>,
    pub answers: AnswerResult,
}

/// Everything produced by a successful scan.
#[derive(Debug, Clone)]
pub struct ScanOutcome {
    pub outline: DocumentOutline,
    pub rectified: RectifiedImage,
    pub reading: SheetReading,
    pub timings: StageTimings,
}

impl ScanOutcome {
    pub fn answers(&self) -> &AnswerResult {
        &self.reading.answers
    }
}

/// Serializable summary of one scanned image.
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub source: String,
    pub answers: Vec<usize>,
    pub rows: Vec<RowReading>,
    /// Document corners: top-left, top-right, bottom-right, bottom-left
    pub corners: [Point2D; 4],
    pub rectified_size: (u32, u32),
    pub bubbles_detected: usize,
    pub timings: StageTimings,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grade: Option<GradeReport>,
}

impl ScanReport {
    pub fn new(source: &str, outcome: &ScanOutcome, grade: Option<GradeReport>) -> Self {
        Self {
            source: source.to_string(),
            answers: outcome.answers().selections(),
            rows: outcome.answers().rows.clone(),
            corners: outcome.rectified.quadrilateral.corners(),
            rectified_size: (outcome.rectified.width, outcome.rectified.height),
            bubbles_detected: outcome.reading.segmentation.regions.len(),
            timings: outcome.timings,
            grade,
        }
    }
}

/// The answer sheet recognition pipeline.
///
/// # Examples
///
/// ```
/// use answer_sheet_scanner::pipeline::ScanPipeline;
/// use answer_sheet_scanner::scan_config::ScanConfig;
/// use answer_sheet_scanner::scan_errors::ScanError;
/// use image::{DynamicImage, GrayImage, Luma};
///
/// let pipeline = ScanPipeline::new(ScanConfig::default()).unwrap();
/// let blank = DynamicImage::ImageLuma8(GrayImage::from_pixel(64, 64, Luma([255])));
/// assert!(matches!(
///     pipeline.scan(&blank),
///     Err(ScanError::DocumentNotFound { .. })
/// ));
/// ```
#[derive(Debug, Clone)]
pub struct ScanPipeline {
    config: ScanConfig,
}

impl ScanPipeline {
    /// Creates a pipeline after validating `config`.
    pub fn new(config: ScanConfig) -> AppResult<Self> {
        config.validate().map_err(|e| {
            error_logging::log_config_error(&e, "scan", "pipeline_init");
            e
        })?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Scans an in-memory photo of an answer sheet.
    pub fn scan(&self, image: &DynamicImage) -> Result<ScanOutcome, ScanError> {
        let span = scan_span("memory");
        let _enter = span.enter();
        self.scan_recorded(image, None)
    }

    /// Loads and scans the photo at `path`.
    pub fn scan_file(&self, path: &Path) -> Result<ScanOutcome, ScanError> {
        let source = path.display().to_string();
        let span = scan_span(&source);
        let _enter = span.enter();

        let start_time = Instant::now();
        let image = image_io::load_image(path, &self.config.io).map_err(|e| {
            let elapsed = start_time.elapsed();
            record_scan_metrics(false, elapsed, 0);
            record_error_metrics(e.kind(), "image_io");
            error_logging::log_scan_error(
                &e,
                "load_image",
                Some(source.as_str()),
                Some(elapsed),
            );
            e
        })?;
        self.scan_recorded(&image, Some(source.as_str()))
    }

    /// Reads the answers from a sheet that is already rectified.
    ///
    /// This is the second half of [`ScanPipeline::scan`], usable on its own
    /// for flatbed scans that need no perspective correction.
    pub fn read_rectified(&self, sheet: &GrayImage) -> Result<SheetReading, ScanError> {
        let mut timings = StageTimings::default();
        self.read_sheet(sheet, &mut timings)
    }

    fn scan_recorded(
        &self,
        image: &DynamicImage,
        source: Option<&str>,
    ) -> Result<ScanOutcome, ScanError> {
        let start_time = Instant::now();
        let result = self.run(image);
        let elapsed = start_time.elapsed();

        match &result {
            Ok(outcome) => {
                record_scan_metrics(true, elapsed, outcome.answers().len());
                info!(
                    questions = outcome.answers().len(),
                    duration_ms = elapsed.as_millis() as u64,
                    "Answer sheet scanned"
                );
            }
            Err(e) => {
                record_scan_metrics(false, elapsed, 0);
                record_error_metrics(e.kind(), "pipeline");
                error_logging::log_scan_error(e, "scan", source, Some(elapsed));
            }
        }
        result
    }

    fn run(&self, image: &DynamicImage) -> Result<ScanOutcome, ScanError> {
        let start_time = Instant::now();
        let mut timings = StageTimings::default();

        let gray = image.to_luma8();

        let (edges, elapsed) =
            timed("edge_map", || build_edge_map_from_gray(&gray, &self.config.edges));
        timings.edge_map_ms = as_ms(elapsed);

        let (outline, elapsed) =
            timed("localize", || locate_document(&edges.image, &self.config.localizer));
        timings.localize_ms = as_ms(elapsed);
        let outline = outline?;

        let (rectified, elapsed) =
            timed("rectify", || rectify(&gray, outline.vertices, &self.config.rectifier));
        timings.rectify_ms = as_ms(elapsed);
        let rectified = rectified?;

        let reading = self.read_sheet(&rectified.image, &mut timings)?;
        timings.total_ms = as_ms(start_time.elapsed());

        Ok(ScanOutcome {
            outline,
            rectified,
            reading,
            timings,
        })
    }

    fn read_sheet(
        &self,
        sheet: &GrayImage,
        timings: &mut StageTimings,
    ) -> Result<SheetReading, ScanError> {
        let (segmentation, elapsed) =
            timed("segment", || segment_bubbles(sheet, &self.config.bubbles));
        timings.segment_ms = as_ms(elapsed);

        let (rows, elapsed) = timed("grid", || {
            reconstruct_grid(segmentation.regions.clone(), &self.config.grid)
        });
        timings.grid_ms = as_ms(elapsed);
        let rows = rows?;

        let (answers, elapsed) = timed("extract", || {
            extract_answers(&rows, &segmentation.binary.image)
        });
        timings.extract_ms = as_ms(elapsed);

        Ok(SheetReading {
            segmentation,
            rows,
            answers,
        })
    }
}

/// Runs one stage inside its span and records its duration.
fn timed<T>(stage: &'static str, f: impl FnOnce() -> T) -> (T, Duration) {
    let span = stage_span(stage);
    let _enter = span.enter();
    let start_time = Instant::now();
    let output = f();
    let elapsed = start_time.elapsed();
    record_stage_metrics(stage, elapsed);
    (output, elapsed)
}

fn as_ms(duration: Duration) -> u64 {
    duration.as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::AppError;
    use image::Luma;

    #[test]
    fn test_new_rejects_invalid_config() {
        let mut config = ScanConfig::default();
        config.localizer.epsilon_ratio = 0.0;
        assert!(matches!(
            ScanPipeline::new(config),
            Err(AppError::Config(_))
        ));
    }

    #[test]
    fn test_blank_photo_has_no_document() {
        let pipeline = ScanPipeline::new(ScanConfig::default()).expect("default config is valid");
        let blank = DynamicImage::ImageLuma8(GrayImage::from_pixel(120, 90, Luma([240])));

        assert_eq!(
            pipeline.scan(&blank).err(),
            Some(ScanError::DocumentNotFound {
                contours_examined: 0
            })
        );
    }

    #[derive(Default)]
    struct KeyLog(std::sync::Mutex<Vec<String>>);

    impl KeyLog {
        fn keys(&self) -> Vec<String> {
            self.0.lock().map(|keys| keys.clone()).unwrap_or_default()
        }

        fn push(&self, key: &::metrics::Key) {
            let labels: Vec<String> = key
                .labels()
                .map(|label| format!("{}={}", label.key(), label.value()))
                .collect();
            if let Ok(mut keys) = self.0.lock() {
                keys.push(format!("{}{{{}}}", key.name(), labels.join(",")));
            }
        }
    }

    impl ::metrics::Recorder for KeyLog {
        fn describe_counter(
            &self,
            _: ::metrics::KeyName,
            _: Option<::metrics::Unit>,
            _: ::metrics::SharedString,
        ) {
        }
        fn describe_gauge(
            &self,
            _: ::metrics::KeyName,
            _: Option<::metrics::Unit>,
            _: ::metrics::SharedString,
        ) {
        }
        fn describe_histogram(
            &self,
            _: ::metrics::KeyName,
            _: Option<::metrics::Unit>,
            _: ::metrics::SharedString,
        ) {
        }

        fn register_counter(
            &self,
            key: &::metrics::Key,
            _: &::metrics::Metadata<'_>,
        ) -> ::metrics::Counter {
            self.push(key);
            ::metrics::Counter::noop()
        }

        fn register_gauge(
            &self,
            key: &::metrics::Key,
            _: &::metrics::Metadata<'_>,
        ) -> ::metrics::Gauge {
            self.push(key);
            ::metrics::Gauge::noop()
        }

        fn register_histogram(
            &self,
            key: &::metrics::Key,
            _: &::metrics::Metadata<'_>,
        ) -> ::metrics::Histogram {
            self.push(key);
            ::metrics::Histogram::noop()
        }
    }

    #[test]
    fn test_failed_load_counts_as_failed_scan() {
        let pipeline = ScanPipeline::new(ScanConfig::default()).expect("default config is valid");
        let recorder = KeyLog::default();

        let result = ::metrics::with_local_recorder(&recorder, || {
            pipeline.scan_file(Path::new("/definitely/not/here.png"))
        });
        assert!(matches!(result, Err(ScanError::ImageLoad(_))));

        let keys = recorder.keys();
        assert!(keys.contains(&"scan_operations_total{result=failure}".to_string()));
        assert!(keys.contains(&"scan_duration_seconds{}".to_string()));
        assert!(keys
            .contains(&"scan_errors_total{kind=image_load,component=image_io}".to_string()));
    }

    #[derive(Clone, Default)]
    struct WarnCounter(std::sync::Arc<std::sync::atomic::AtomicUsize>);

    impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for WarnCounter {
        fn on_event(
            &self,
            event: &tracing::Event<'_>,
            _: tracing_subscriber::layer::Context<'_, S>,
        ) {
            if *event.metadata().level() == tracing::Level::WARN {
                self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            }
        }
    }

    #[test]
    fn test_unclear_row_is_warned_once() {
        use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut};
        use imageproc::rect::Rect;
        use tracing_subscriber::prelude::*;

        let mut sheet = GrayImage::from_pixel(500, 400, Luma([240]));
        for (row, y) in [100, 200].into_iter().enumerate() {
            for option in 0..5 {
                let x = 100 + 70 * option;
                if row == 0 && option == 0 {
                    draw_filled_rect_mut(&mut sheet, Rect::at(x, y).of_size(30, 30), Luma([20]));
                } else {
                    for inset in 0..3 {
                        let side = 30 - 2 * inset as u32;
                        let rect = Rect::at(x + inset, y + inset).of_size(side, side);
                        draw_hollow_rect_mut(&mut sheet, rect, Luma([20]));
                    }
                }
            }
        }

        let counter = WarnCounter::default();
        let subscriber = tracing_subscriber::registry().with(counter.clone());
        let pipeline = ScanPipeline::new(ScanConfig::default()).expect("default config is valid");

        let reading = tracing::subscriber::with_default(subscriber, || {
            pipeline.read_rectified(&sheet)
        })
        .expect("two complete rows should be readable");

        assert_eq!(reading.answers.selections(), vec![0, 0]);
        assert!(reading.answers.rows[1].is_tied());
        assert_eq!(counter.0.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[test]
    fn test_blank_rectified_sheet_has_no_grid() {
        let pipeline = ScanPipeline::new(ScanConfig::default()).expect("default config is valid");
        let sheet = GrayImage::from_pixel(500, 400, Luma([240]));

        assert!(matches!(
            pipeline.read_rectified(&sheet),
            Err(ScanError::BubbleGridMismatch { found: 0, .. })
        ));
    }
}
