//! Background removal session state
//!
//! Keeps the most recent result for before/after display and download.

use crate::{
    error::Result,
    processor::BackgroundRemovalProcessor,
    services::{ExportAsset, InputImage, ResultSink},
    types::RemovalResult,
};
use std::sync::Arc;

/// Explicit per-user context for background removal
pub struct RemovalSession {
    processor: Arc<BackgroundRemovalProcessor>,
    result: Option<RemovalResult>,
}

impl RemovalSession {
    #[must_use]
    pub fn new(processor: Arc<BackgroundRemovalProcessor>) -> Self {
        Self {
            processor,
            result: None,
        }
    }

    /// Process `input`, replacing any previous result
    ///
    /// The previous result is released before any work starts. On failure the
    /// session is left empty.
    ///
    /// # Errors
    /// - Any error from [`BackgroundRemovalProcessor::process`]
    pub async fn process(&mut self, input: &InputImage) -> Result<&RemovalResult> {
        self.result = None;
        let result = self.processor.process(input).await?;
        Ok(self.result.insert(result))
    }

    /// Most recent successful result
    #[must_use]
    pub fn result(&self) -> Option<&RemovalResult> {
        self.result.as_ref()
    }

    /// Drop the held original and result
    pub fn reset(&mut self) {
        if self.result.take().is_some() {
            log::debug!("Released background removal result");
        }
    }

    /// Encoded result ready for download, if any
    #[must_use]
    pub fn download(&self) -> Option<ExportAsset> {
        self.result.as_ref().map(|result| {
            ExportAsset::new(
                self.processor.config().output_file_name.clone(),
                result.png.clone(),
            )
        })
    }

    /// Deliver the current result to `sink`
    ///
    /// Returns `false` when there is nothing to deliver.
    ///
    /// # Errors
    /// - Any error from the sink
    pub fn deliver(&self, sink: &dyn ResultSink) -> Result<bool> {
        match self.download() {
            Some(asset) => {
                sink.deliver(&asset)?;
                Ok(true)
            },
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::test_utils::MockBackend;
    use crate::config::RemovalConfig;
    use crate::error::PixelForgeError;
    use crate::inference::InferenceBackend;
    use crate::services::{FileSink, ImageIOService};
    use image::{Rgba, RgbaImage};

    fn session(backend: MockBackend) -> RemovalSession {
        let config = RemovalConfig::builder()
            .model_input_size(backend.input_size())
            .build()
            .unwrap();
        let processor = BackgroundRemovalProcessor::new(Arc::new(backend), config).unwrap();
        RemovalSession::new(Arc::new(processor))
    }

    fn png_input() -> InputImage {
        let image = RgbaImage::from_pixel(12, 6, Rgba([1, 2, 3, 255]));
        InputImage::new(ImageIOService::encode_png(&image).unwrap(), "image/png")
    }

    #[tokio::test]
    async fn test_download_uses_fixed_name() {
        let mut session = session(MockBackend::circle(8));
        assert!(session.download().is_none());

        session.process(&png_input()).await.unwrap();
        let asset = session.download().unwrap();
        assert_eq!(asset.file_name, "background-removed.png");
        assert_eq!(asset.bytes, session.result().unwrap().png);
    }

    #[tokio::test]
    async fn test_failure_clears_previous_result() {
        let mut session = session(MockBackend::constant(8, 1.0));
        session.process(&png_input()).await.unwrap();
        assert!(session.result().is_some());

        let bad = InputImage::new(b"garbage".to_vec(), "image/png");
        let err = session.process(&bad).await.unwrap_err();
        assert!(matches!(err, PixelForgeError::DecodeFailure(_)));
        assert!(session.result().is_none());
    }

    #[tokio::test]
    async fn test_reset_and_deliver() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FileSink::new(dir.path());
        let mut session = session(MockBackend::constant(8, 0.0));

        assert!(!session.deliver(&sink).unwrap());
        session.process(&png_input()).await.unwrap();
        assert!(session.deliver(&sink).unwrap());
        assert!(dir.path().join("background-removed.png").exists());

        session.reset();
        assert!(session.result().is_none());
        assert!(session.download().is_none());
    }
}
