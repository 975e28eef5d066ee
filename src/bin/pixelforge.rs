//! PixelForge CLI Tool
//!
//! Command-line interface for background removal and watermarking, built on
//! the pixelforge library with Tract and ONNX Runtime backends.

#[cfg(feature = "cli")]
use pixelforge::cli;

#[cfg(feature = "cli")]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    cli::main().await
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("CLI feature not enabled. Please rebuild with --features cli");
    std::process::exit(1);
}
