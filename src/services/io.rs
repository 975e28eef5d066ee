//! Image decode/encode boundary
//!
//! Validates declared type and size before any decoding, converts accepted
//! bytes into RGBA8 rasters, and encodes rasters back to PNG.

use crate::{
    config::SUPPORTED_MIME_TYPES,
    error::{PixelForgeError, Result},
    types::RasterImage,
};
use image::{codecs::png::PngEncoder, ExtendedColorType, ImageEncoder, ImageFormat};
use std::path::Path;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Raw input bytes with their declared MIME type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputImage {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl InputImage {
    #[must_use]
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes,
            mime_type: mime_type.into(),
        }
    }

    /// Read a file, declaring its MIME type from the extension
    ///
    /// The declared type and the file length are checked before any bytes
    /// are read.
    ///
    /// # Errors
    /// - `UnsupportedFormat` if the extension is not PNG or JPEG
    /// - `OversizeInput` if the file is larger than `max_bytes`
    /// - `Io` if the file cannot be read
    pub async fn from_path<P: AsRef<Path>>(path: P, max_bytes: usize) -> Result<Self> {
        let path = path.as_ref();
        let mime_type = mime_type_for_path(path);
        InputFormat::from_mime_type(mime_type)?;

        let size = usize::try_from(tokio::fs::metadata(path).await?.len()).unwrap_or(usize::MAX);
        if size > max_bytes {
            return Err(PixelForgeError::OversizeInput {
                size,
                limit: max_bytes,
            });
        }

        let bytes = tokio::fs::read(path).await?;
        log::debug!(
            "Read {} bytes from {} ({})",
            bytes.len(),
            path.display(),
            mime_type
        );
        let input = Self::new(bytes, mime_type);
        // The file may have grown between the metadata call and the read
        ImageIOService::validate(&input, max_bytes)?;
        Ok(input)
    }

    /// Read an input stream of a declared MIME type
    ///
    /// At most `max_bytes + 1` bytes are pulled from `reader`. An
    /// unsupported type is rejected without reading at all.
    ///
    /// # Errors
    /// - `UnsupportedFormat` if `mime_type` is not PNG or JPEG
    /// - `OversizeInput` if the stream holds more than `max_bytes`
    /// - `Io` if reading fails
    pub async fn from_reader<R: AsyncRead + Unpin>(
        reader: R,
        mime_type: &str,
        max_bytes: usize,
    ) -> Result<Self> {
        InputFormat::from_mime_type(mime_type)?;

        let limit = u64::try_from(max_bytes).unwrap_or(u64::MAX).saturating_add(1);
        let mut bytes = Vec::new();
        reader.take(limit).read_to_end(&mut bytes).await?;
        if bytes.len() > max_bytes {
            return Err(PixelForgeError::OversizeInput {
                size: bytes.len(),
                limit: max_bytes,
            });
        }
        Ok(Self::new(bytes, mime_type))
    }

    /// Size of the raw input in bytes
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Declared MIME type for a file path, based on its extension
#[must_use]
pub fn mime_type_for_path(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        Some("bmp") => "image/bmp",
        Some("tif" | "tiff") => "image/tiff",
        _ => "application/octet-stream",
    }
}

/// Accepted input encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Png,
    Jpeg,
}

impl InputFormat {
    /// Map a declared MIME type to an accepted format
    ///
    /// # Errors
    /// - `UnsupportedFormat` for anything outside the allowed set
    pub fn from_mime_type(mime_type: &str) -> Result<Self> {
        let normalized = mime_type.trim().to_ascii_lowercase();
        if !SUPPORTED_MIME_TYPES.contains(&normalized.as_str()) {
            return Err(PixelForgeError::unsupported_format(mime_type));
        }
        Ok(if normalized == "image/png" {
            Self::Png
        } else {
            Self::Jpeg
        })
    }

    #[must_use]
    pub fn image_format(self) -> ImageFormat {
        match self {
            Self::Png => ImageFormat::Png,
            Self::Jpeg => ImageFormat::Jpeg,
        }
    }
}

/// Service for image validation, decoding and encoding
pub struct ImageIOService;

impl ImageIOService {
    /// Check the declared type and size of an input before any decoding
    ///
    /// # Errors
    /// - `UnsupportedFormat` if the MIME type is not PNG or JPEG
    /// - `OversizeInput` if the input exceeds `max_bytes`
    pub fn validate(input: &InputImage, max_bytes: usize) -> Result<InputFormat> {
        let format = InputFormat::from_mime_type(&input.mime_type)?;
        if input.len() > max_bytes {
            return Err(PixelForgeError::OversizeInput {
                size: input.len(),
                limit: max_bytes,
            });
        }
        Ok(format)
    }

    /// Decode validated bytes into an RGBA8 raster
    ///
    /// # Errors
    /// - `DecodeFailure` if the bytes are not a valid image of `format`
    pub fn decode(bytes: &[u8], format: InputFormat) -> Result<RasterImage> {
        let image = image::load_from_memory_with_format(bytes, format.image_format())
            .map_err(|e| PixelForgeError::decode_failure(format!("{format:?}: {e}")))?;

        let raster = image.to_rgba8();
        if raster.width() == 0 || raster.height() == 0 {
            return Err(PixelForgeError::decode_failure("Decoded image has no pixels"));
        }
        Ok(raster)
    }

    /// Validate then decode an input
    ///
    /// # Errors
    /// - Any error from [`Self::validate`] or [`Self::decode`]
    pub fn load(input: &InputImage, max_bytes: usize) -> Result<RasterImage> {
        let format = Self::validate(input, max_bytes)?;
        Self::decode(&input.bytes, format)
    }

    /// Encode a raster as PNG, keeping the alpha channel
    ///
    /// # Errors
    /// - `EncodeFailure` if the encoder rejects the buffer
    pub fn encode_png(image: &RasterImage) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        PngEncoder::new(&mut buffer)
            .write_image(
                image.as_raw(),
                image.width(),
                image.height(),
                ExtendedColorType::Rgba8,
            )
            .map_err(|e| PixelForgeError::encode_failure(format!("PNG: {e}")))?;
        Ok(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use std::pin::Pin;
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };
    use std::task::{Context, Poll};
    use tokio::io::ReadBuf;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let image = RasterImage::from_pixel(width, height, Rgba([10, 200, 30, 255]));
        ImageIOService::encode_png(&image).unwrap()
    }

    #[test]
    fn test_mime_type_mapping() {
        assert_eq!(InputFormat::from_mime_type("image/png").unwrap(), InputFormat::Png);
        assert_eq!(InputFormat::from_mime_type("image/jpeg").unwrap(), InputFormat::Jpeg);
        assert_eq!(InputFormat::from_mime_type("image/jpg").unwrap(), InputFormat::Jpeg);
        assert_eq!(InputFormat::from_mime_type("IMAGE/PNG").unwrap(), InputFormat::Png);

        let err = InputFormat::from_mime_type("image/webp").unwrap_err();
        assert!(matches!(err, PixelForgeError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_mime_type_for_path() {
        assert_eq!(mime_type_for_path(Path::new("a/photo.JPG")), "image/jpeg");
        assert_eq!(mime_type_for_path(Path::new("cat.png")), "image/png");
        assert_eq!(mime_type_for_path(Path::new("clip.webp")), "image/webp");
        assert_eq!(mime_type_for_path(Path::new("noext")), "application/octet-stream");
    }

    #[test]
    fn test_validate_checks_type_before_size() {
        let input = InputImage::new(vec![0; 100], "image/gif");
        let err = ImageIOService::validate(&input, 10).unwrap_err();
        assert!(matches!(err, PixelForgeError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_validate_rejects_oversize() {
        let input = InputImage::new(vec![0; 101], "image/png");
        let err = ImageIOService::validate(&input, 100).unwrap_err();
        assert!(matches!(
            err,
            PixelForgeError::OversizeInput { size: 101, limit: 100 }
        ));

        let at_limit = InputImage::new(vec![0; 100], "image/png");
        assert!(ImageIOService::validate(&at_limit, 100).is_ok());
    }

    #[test]
    fn test_decode_roundtrip_dimensions() {
        let input = InputImage::new(png_bytes(7, 3), "image/png");
        let raster = ImageIOService::load(&input, 1024 * 1024).unwrap();
        assert_eq!(raster.dimensions(), (7, 3));
        assert_eq!(raster.as_raw().len(), 7 * 3 * 4);
        assert_eq!(raster.get_pixel(0, 0), &Rgba([10, 200, 30, 255]));
    }

    #[test]
    fn test_decode_failure_on_garbage() {
        let input = InputImage::new(b"definitely not a png".to_vec(), "image/png");
        let err = ImageIOService::load(&input, 1024).unwrap_err();
        assert!(matches!(err, PixelForgeError::DecodeFailure(_)));
    }

    #[test]
    fn test_png_declared_as_jpeg_fails_decode() {
        let input = InputImage::new(png_bytes(2, 2), "image/jpeg");
        let err = ImageIOService::load(&input, 1024 * 1024).unwrap_err();
        assert!(matches!(err, PixelForgeError::DecodeFailure(_)));
    }

    #[test]
    fn test_encode_png_signature() {
        let bytes = png_bytes(1, 1);
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
    }

    /// Reader that counts every byte handed out
    struct CountingReader {
        remaining: usize,
        read: Arc<AtomicUsize>,
    }

    impl AsyncRead for CountingReader {
        fn poll_read(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<std::io::Result<()>> {
            let n = self.remaining.min(buf.remaining()).min(8192);
            buf.put_slice(&vec![0; n]);
            self.remaining -= n;
            self.read.fetch_add(n, Ordering::SeqCst);
            Poll::Ready(Ok(()))
        }
    }

    fn counting_reader(len: usize) -> (CountingReader, Arc<AtomicUsize>) {
        let read = Arc::new(AtomicUsize::new(0));
        (
            CountingReader {
                remaining: len,
                read: read.clone(),
            },
            read,
        )
    }

    #[tokio::test]
    async fn test_from_reader_rejects_type_without_reading() {
        let (reader, read) = counting_reader(1024 * 1024);

        let err = InputImage::from_reader(reader, "image/gif", 1024).await.unwrap_err();

        assert!(matches!(err, PixelForgeError::UnsupportedFormat(_)));
        assert_eq!(read.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_from_reader_stops_past_the_cap() {
        let (reader, read) = counting_reader(10 * 1024 * 1024);

        let err = InputImage::from_reader(reader, "image/png", 1000).await.unwrap_err();

        assert!(matches!(
            err,
            PixelForgeError::OversizeInput { size: 1001, limit: 1000 }
        ));
        assert_eq!(read.load(Ordering::SeqCst), 1001);
    }

    #[tokio::test]
    async fn test_from_reader_accepts_stream_at_cap() {
        let (reader, read) = counting_reader(1000);

        let input = InputImage::from_reader(reader, "image/jpeg", 1000).await.unwrap();

        assert_eq!(input.len(), 1000);
        assert_eq!(input.mime_type, "image/jpeg");
        assert_eq!(read.load(Ordering::SeqCst), 1000);
    }

    #[tokio::test]
    async fn test_from_path_reads_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("input.png");
        std::fs::write(&path, png_bytes(4, 4)).unwrap();

        let input = InputImage::from_path(&path, 1024 * 1024).await.unwrap();
        assert_eq!(input.mime_type, "image/png");
        assert!(!input.is_empty());
    }

    #[tokio::test]
    async fn test_from_path_checks_size_and_type_first() {
        let dir = tempfile::tempdir().unwrap();
        let large = dir.path().join("large.png");
        std::fs::write(&large, vec![0; 2048]).unwrap();

        let err = InputImage::from_path(&large, 1024).await.unwrap_err();
        assert!(matches!(
            err,
            PixelForgeError::OversizeInput { size: 2048, limit: 1024 }
        ));

        // Unsupported extensions are refused even when the file is missing
        let err = InputImage::from_path(dir.path().join("missing.gif"), 1024)
            .await
            .unwrap_err();
        assert!(matches!(err, PixelForgeError::UnsupportedFormat(_)));
    }
}
