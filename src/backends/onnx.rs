//! ONNX Runtime backend for the segmentation model
//!
//! Supports CPU, CUDA and CoreML execution providers. The model's tensors are
//! addressed by name (`input` / `output`).

use crate::config::{ExecutionProvider, RemovalConfig};
use crate::error::{PixelForgeError, Result};
use crate::inference::{check_input_shape, InferenceBackend, INPUT_NAME, OUTPUT_NAME};
use crate::types::Tensor;
use async_trait::async_trait;
use instant::Instant;
use ort::execution_providers::{
    CUDAExecutionProvider, CoreMLExecutionProvider, ExecutionProvider as OrtExecutionProvider,
    ExecutionProviderDispatch,
};
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Value;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// ONNX Runtime backend running a local segmentation model
#[derive(Debug, Clone)]
pub struct OnnxBackend {
    session: Arc<Mutex<Session>>,
    input_size: u32,
}

impl OnnxBackend {
    /// List ONNX Runtime execution providers with availability status
    ///
    /// Returns `(name, available, description)` tuples.
    pub fn list_providers() -> Vec<(String, bool, String)> {
        let cuda_available =
            OrtExecutionProvider::is_available(&CUDAExecutionProvider::default()).unwrap_or(false);
        let coreml_available =
            OrtExecutionProvider::is_available(&CoreMLExecutionProvider::default())
                .unwrap_or(false);

        vec![
            (
                "CPU".to_string(),
                true,
                "Always available, uses CPU for inference".to_string(),
            ),
            (
                "CUDA".to_string(),
                cuda_available,
                "NVIDIA GPU acceleration (requires CUDA toolkit and compatible GPU)".to_string(),
            ),
            (
                "CoreML".to_string(),
                coreml_available,
                "Apple Silicon GPU acceleration (macOS only)".to_string(),
            ),
        ]
    }

    /// Create a session for the model file at `model_path`
    ///
    /// # Errors
    /// - `Model` if the session cannot be built or the file cannot be loaded
    pub fn from_path<P: AsRef<Path>>(model_path: P, config: &RemovalConfig) -> Result<Self> {
        let model_path = model_path.as_ref();
        let load_start = Instant::now();

        let intra_threads = if config.intra_threads > 0 {
            config.intra_threads
        } else {
            std::thread::available_parallelism()
                .map(std::num::NonZeroUsize::get)
                .unwrap_or(4)
        };

        let mut builder = Session::builder()
            .map_err(|e| PixelForgeError::model(format!("Failed to create session builder: {e}")))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| {
                PixelForgeError::model(format!("Failed to set optimization level: {e}"))
            })?;

        let providers = Self::execution_providers(config.execution_provider);
        if !providers.is_empty() {
            builder = builder.with_execution_providers(providers).map_err(|e| {
                PixelForgeError::model(format!("Failed to set execution providers: {e}"))
            })?;
        }

        let session = builder
            .with_intra_threads(intra_threads)
            .map_err(|e| PixelForgeError::model(format!("Failed to set intra threads: {e}")))?
            .commit_from_file(model_path)
            .map_err(|e| {
                PixelForgeError::model_error_with_context(
                    "load",
                    model_path,
                    &e.to_string(),
                    &["check the file is an ONNX model", "check the path exists"],
                )
            })?;

        log::info!(
            "ONNX Runtime session ready in {}ms (provider {}, {} intra-op threads)",
            load_start.elapsed().as_millis(),
            config.execution_provider,
            intra_threads
        );

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            input_size: config.model_input_size,
        })
    }

    /// Resolve the requested provider to the dispatch list, falling back to CPU
    fn execution_providers(provider: ExecutionProvider) -> Vec<ExecutionProviderDispatch> {
        let cuda = || {
            let cuda_provider = CUDAExecutionProvider::default();
            OrtExecutionProvider::is_available(&cuda_provider)
                .unwrap_or(false)
                .then(|| cuda_provider.build())
        };
        let coreml = || {
            let coreml_provider = CoreMLExecutionProvider::default().with_subgraphs(true);
            OrtExecutionProvider::is_available(&coreml_provider)
                .unwrap_or(false)
                .then(|| coreml_provider.build())
        };

        let providers: Vec<ExecutionProviderDispatch> = match provider {
            ExecutionProvider::Auto => cuda().into_iter().chain(coreml()).collect(),
            ExecutionProvider::Cpu => Vec::new(),
            ExecutionProvider::Cuda => cuda().into_iter().collect(),
            ExecutionProvider::CoreMl => coreml().into_iter().collect(),
        };

        if providers.is_empty() && provider != ExecutionProvider::Cpu {
            log::warn!("{provider} execution provider not available, falling back to CPU");
        }
        providers
    }

    fn run_blocking(session: &Mutex<Session>, input: Tensor) -> Result<Vec<f32>> {
        let mut session = session
            .lock()
            .map_err(|_| PixelForgeError::inference("ONNX session lock poisoned"))?;

        let input_value = Value::from_array(input).map_err(|e| {
            PixelForgeError::inference(format!("Failed to convert input tensor: {e}"))
        })?;

        let outputs = session
            .run(ort::inputs![INPUT_NAME => input_value])
            .map_err(|e| PixelForgeError::inference(format!("ONNX inference failed: {e}")))?;

        let output = outputs.get(OUTPUT_NAME).ok_or_else(|| {
            PixelForgeError::inference(format!("Model has no '{OUTPUT_NAME}' output"))
        })?;

        let view = output.try_extract_array::<f32>().map_err(|e| {
            PixelForgeError::inference(format!("Failed to extract output tensor: {e}"))
        })?;

        Ok(view.iter().copied().collect())
    }
}

#[async_trait]
impl InferenceBackend for OnnxBackend {
    fn name(&self) -> &'static str {
        "onnx"
    }

    fn input_size(&self) -> u32 {
        self.input_size
    }

    async fn infer(&self, input: Tensor) -> Result<Vec<f32>> {
        check_input_shape(&input, self.input_size)?;
        log::debug!("Running ONNX inference on {:?}", input.shape());

        let session = Arc::clone(&self.session);
        let start = Instant::now();
        let values = tokio::task::spawn_blocking(move || Self::run_blocking(&session, input))
            .await
            .map_err(|e| PixelForgeError::inference(format!("Inference task failed: {e}")))??;

        log::debug!(
            "ONNX inference produced {} values in {}ms",
            values.len(),
            start.elapsed().as_millis()
        );
        Ok(values)
    }
}
