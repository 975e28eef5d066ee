//! Boundary services: image I/O, progress reporting and result export

pub mod export;
pub mod io;
pub mod progress;

pub use export::{ExportAsset, FileSink, ResultSink};
pub use io::{ImageIOService, InputFormat, InputImage};
pub use progress::{
    ConsoleProgressReporter, NoOpProgressReporter, ProcessingStage, ProgressReporter,
    ProgressTracker, ProgressUpdate,
};
