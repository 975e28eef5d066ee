//! Background removal processor
//!
//! Runs the full pipeline for one input: validate, decode, bound, pack,
//! infer, composite and encode. At most one run is in flight per processor.

use crate::{
    compositor::MaskCompositor,
    config::RemovalConfig,
    error::{PixelForgeError, Result},
    inference::InferenceBackend,
    services::{
        ImageIOService, InputFormat, InputImage, NoOpProgressReporter, ProcessingStage,
        ProgressReporter, ProgressTracker,
    },
    types::{ProcessingTimings, RemovalResult, SegmentationMask},
    utils::{resize_to_bound, ImagePreprocessor},
};
use instant::Instant;
use log::{debug, info};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use tracing::{instrument, span, Instrument, Level};

/// Holds the in-flight flag for the lifetime of one run
///
/// The flag is cleared on drop, so every exit path releases it, including
/// errors and cancellation of the awaiting future.
struct InFlightGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> InFlightGuard<'a> {
    fn claim(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Background removal pipeline bound to one inference backend
pub struct BackgroundRemovalProcessor {
    backend: Arc<dyn InferenceBackend>,
    config: RemovalConfig,
    reporter: Arc<dyn ProgressReporter>,
    in_flight: AtomicBool,
}

impl BackgroundRemovalProcessor {
    /// Create a processor for `backend`
    ///
    /// # Errors
    /// - `InvalidConfig` if the config is invalid or its model input size
    ///   disagrees with the backend's
    pub fn new(backend: Arc<dyn InferenceBackend>, config: RemovalConfig) -> Result<Self> {
        config.validate()?;
        if backend.input_size() != config.model_input_size {
            return Err(PixelForgeError::invalid_config(format!(
                "Backend '{}' expects {}x{} input but config requests {}x{}",
                backend.name(),
                backend.input_size(),
                backend.input_size(),
                config.model_input_size,
                config.model_input_size
            )));
        }

        Ok(Self {
            backend,
            config,
            reporter: Arc::new(NoOpProgressReporter),
            in_flight: AtomicBool::new(false),
        })
    }

    /// Report stages of every run to `reporter`
    #[must_use]
    pub fn with_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    #[must_use]
    pub fn config(&self) -> &RemovalConfig {
        &self.config
    }

    #[must_use]
    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Whether a run is currently in flight
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Remove the background from one input image
    ///
    /// The returned raster is bounded to `max_image_dimension` and carries the
    /// model's mask in its alpha channel. Nothing is retained between runs.
    ///
    /// # Errors
    /// - `UnsupportedFormat` / `OversizeInput` before any decoding
    /// - `Busy` if another run on this processor has not finished
    /// - `DecodeFailure`, `InferenceFailure` or `EncodeFailure` from the
    ///   corresponding pipeline step
    #[instrument(skip(self, input), fields(backend = self.backend.name(), bytes = input.len()))]
    pub async fn process(&self, input: &InputImage) -> Result<RemovalResult> {
        let format = ImageIOService::validate(input, self.config.max_input_bytes)?;

        let Some(_guard) = InFlightGuard::claim(&self.in_flight) else {
            debug!("Dropping background removal request: another run is in flight");
            return Err(PixelForgeError::Busy);
        };

        let mut tracker = ProgressTracker::new(Arc::clone(&self.reporter));
        match self.run(input, format, &mut tracker).await {
            Ok(result) => {
                tracker.report_stage(ProcessingStage::Completed);
                tracker.report_completion(result.timings.clone());
                Ok(result)
            },
            Err(e) => {
                tracker.report_error(&e.to_string());
                Err(e)
            },
        }
    }

    async fn run(
        &self,
        input: &InputImage,
        format: InputFormat,
        tracker: &mut ProgressTracker,
    ) -> Result<RemovalResult> {
        let total_start = Instant::now();
        let mut timings = ProcessingTimings::default();

        tracker.report_stage(ProcessingStage::ImageLoading);
        let decode_start = Instant::now();
        let original = ImageIOService::decode(&input.bytes, format)?;
        timings.image_decode_ms = decode_start.elapsed().as_millis() as u64;
        info!(
            "Decoded {}x{} image in {}ms",
            original.width(),
            original.height(),
            timings.image_decode_ms
        );

        tracker.report_stage(ProcessingStage::Preparing);
        let preprocess_start = Instant::now();
        let mut raster = {
            let _span = span!(
                Level::DEBUG,
                "preparing",
                width = original.width(),
                height = original.height(),
                max_dimension = self.config.max_image_dimension
            )
            .entered();
            resize_to_bound(&original, self.config.max_image_dimension)
        };

        tracker.report_stage(ProcessingStage::Preprocessing);
        let tensor = {
            let _span = span!(
                Level::DEBUG,
                "preprocessing",
                model_input_size = self.config.model_input_size
            )
            .entered();
            ImagePreprocessor::pack(&raster, self.config.model_input_size)?
        };
        timings.preprocessing_ms = preprocess_start.elapsed().as_millis() as u64;

        tracker.report_stage(ProcessingStage::Inference);
        let inference_start = Instant::now();
        let values = self
            .backend
            .infer(tensor)
            .instrument(span!(Level::INFO, "inference", backend = self.backend.name()))
            .await?;
        timings.inference_ms = inference_start.elapsed().as_millis() as u64;
        debug!("Inference completed in {}ms", timings.inference_ms);

        tracker.report_stage(ProcessingStage::MaskGeneration);
        let postprocess_start = Instant::now();
        let mask = SegmentationMask::from_model_output(values, self.config.model_input_size)?;
        let foreground_ratio = mask.foreground_ratio();

        tracker.report_stage(ProcessingStage::ApplyingTransparency);
        MaskCompositor::composite(&mut raster, &mask)?;
        timings.postprocessing_ms = postprocess_start.elapsed().as_millis() as u64;

        tracker.report_stage(ProcessingStage::Finalizing);
        let encode_start = Instant::now();
        let png = ImageIOService::encode_png(&raster)?;
        timings.image_encode_ms = encode_start.elapsed().as_millis() as u64;
        timings.total_ms = total_start.elapsed().as_millis() as u64;

        info!(
            "Background removed: {}x{} output, {:.1}% foreground, {}",
            raster.width(),
            raster.height(),
            foreground_ratio * 100.0,
            timings.summary()
        );

        Ok(RemovalResult {
            original,
            image: raster,
            png,
            foreground_ratio,
            timings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::test_utils::MockBackend;
    use image::Rgba;

    fn png_input(width: u32, height: u32) -> InputImage {
        let image = crate::types::RasterImage::from_pixel(width, height, Rgba([90, 60, 30, 255]));
        InputImage::new(ImageIOService::encode_png(&image).unwrap(), "image/png")
    }

    fn processor(backend: MockBackend, max_dim: u32) -> BackgroundRemovalProcessor {
        let config = RemovalConfig::builder()
            .model_input_size(backend.input_size())
            .max_image_dimension(max_dim)
            .build()
            .unwrap();
        BackgroundRemovalProcessor::new(Arc::new(backend), config).unwrap()
    }

    #[tokio::test]
    async fn test_process_bounds_and_composites() {
        let processor = processor(MockBackend::constant(8, 1.0), 16);
        let result = processor.process(&png_input(40, 20)).await.unwrap();

        assert_eq!(result.original_dimensions(), (40, 20));
        assert_eq!(result.dimensions(), (16, 8));
        assert!(result.image.pixels().all(|p| p[3] == 255 && p[0] == 90));
        assert!((result.foreground_ratio - 1.0).abs() < f32::EPSILON);
        assert_eq!(&result.png[..4], b"\x89PNG");
        assert!(!processor.is_busy());
    }

    #[tokio::test]
    async fn test_unsupported_format_skips_inference() {
        let backend = MockBackend::constant(4, 1.0);
        let processor = processor(backend.clone(), 16);
        let input = InputImage::new(vec![1, 2, 3], "image/gif");

        let err = processor.process(&input).await.unwrap_err();
        assert!(matches!(err, PixelForgeError::UnsupportedFormat(_)));
        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test]
    async fn test_inference_failure_releases_guard() {
        let processor = processor(MockBackend::failing(4), 16);

        let err = processor.process(&png_input(8, 8)).await.unwrap_err();
        assert!(matches!(err, PixelForgeError::InferenceFailure(_)));
        assert!(!processor.is_busy());
    }

    #[tokio::test]
    async fn test_mismatched_model_size_rejected() {
        let config = RemovalConfig::builder().model_input_size(32).build().unwrap();
        let result = BackgroundRemovalProcessor::new(Arc::new(MockBackend::constant(16, 0.0)), config);
        assert!(matches!(result, Err(PixelForgeError::InvalidConfig(_))));
    }

    #[test]
    fn test_guard_claims_once() {
        let flag = AtomicBool::new(false);
        let first = InFlightGuard::claim(&flag);
        assert!(first.is_some());
        assert!(InFlightGuard::claim(&flag).is_none());
        drop(first);
        assert!(InFlightGuard::claim(&flag).is_some());
    }
}
