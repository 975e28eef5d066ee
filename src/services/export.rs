//! Export boundary for encoded results

use crate::error::Result;
use std::path::PathBuf;

/// Encoded result paired with its download file name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportAsset {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl ExportAsset {
    #[must_use]
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }
}

/// Capability the core hands finished assets to
pub trait ResultSink: Send + Sync {
    /// Deliver an asset to its destination
    ///
    /// # Errors
    /// - Destination-specific write failures
    fn deliver(&self, asset: &ExportAsset) -> Result<()>;
}

/// Writes assets to the filesystem
///
/// If the target is an existing directory, the asset's own file name is
/// appended to it.
#[derive(Debug, Clone)]
pub struct FileSink {
    target: PathBuf,
}

impl FileSink {
    #[must_use]
    pub fn new<P: Into<PathBuf>>(target: P) -> Self {
        Self {
            target: target.into(),
        }
    }

    /// Resolve the final path for `asset`
    #[must_use]
    pub fn destination(&self, asset: &ExportAsset) -> PathBuf {
        if self.target.is_dir() {
            self.target.join(&asset.file_name)
        } else {
            self.target.clone()
        }
    }
}

impl ResultSink for FileSink {
    fn deliver(&self, asset: &ExportAsset) -> Result<()> {
        let path = self.destination(asset);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, &asset.bytes)?;
        log::info!("Wrote {} bytes to {}", asset.bytes.len(), path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directory_target_uses_asset_name() {
        let dir = tempfile::tempdir().unwrap();
        let asset = ExportAsset::new("background-removed.png", vec![1, 2, 3]);
        let sink = FileSink::new(dir.path());

        sink.deliver(&asset).unwrap();

        let written = std::fs::read(dir.path().join("background-removed.png")).unwrap();
        assert_eq!(written, vec![1, 2, 3]);
    }

    #[test]
    fn test_file_target_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("nested/out/result.png");
        let sink = FileSink::new(&target);

        sink.deliver(&ExportAsset::new("ignored.png", vec![9])).unwrap();

        assert_eq!(std::fs::read(&target).unwrap(), vec![9]);
        assert_eq!(
            sink.destination(&ExportAsset::new("x.png", Vec::new())),
            target
        );
    }
}
