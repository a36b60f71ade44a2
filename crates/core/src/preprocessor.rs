//! Contract of the external vision preprocessing routine.
//!
//! The routine turns a video file into serialized model inputs plus a metadata
//! mapping. Each worker owns its own [`VideoPreprocessor`], created on first use
//! by a shared [`PreprocessorFactory`].

use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::{fs, process::Command};

use crate::{
    config::PixelBounds,
    error::{PrepError, Result},
    layout::{IMAGE_INPUTS_FILE, VIDEO_INPUTS_FILE},
};

/// Metadata key every preprocessor must report.
pub const FPS_KEY: &str = "fps";

#[derive(Debug, Clone, Default)]
pub struct PreprocessedVideo {
    /// Serialized image tensor, when the routine produces one.
    pub image_inputs: Option<Vec<u8>>,
    /// Serialized video tensor.
    pub video_inputs: Vec<u8>,
    pub video_kwargs: Map<String, Value>,
}

impl PreprocessedVideo {
    pub fn fps(&self, video_path: &Path) -> Result<&Value> {
        self.video_kwargs
            .get(FPS_KEY)
            .ok_or_else(|| PrepError::MissingMetadata {
                video_path: video_path.to_path_buf(),
                key: FPS_KEY.to_string(),
            })
    }
}

#[async_trait]
pub trait VideoPreprocessor: Send {
    async fn preprocess(
        &mut self,
        video_path: &Path,
        bounds: PixelBounds,
    ) -> Result<PreprocessedVideo>;
}

/// Creates one preprocessor per worker. A failing `create` aborts the run.
pub trait PreprocessorFactory: Send + Sync {
    fn create(&self) -> Result<Box<dyn VideoPreprocessor>>;
}

/// Factory for [`CommandPreprocessor`].
#[derive(Debug, Clone)]
pub struct CommandPreprocessorFactory {
    program: String,
    args: Vec<String>,
    model: Option<String>,
}

impl CommandPreprocessorFactory {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            model: None,
        }
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    pub fn with_model(mut self, model: Option<String>) -> Self {
        self.model = model;
        self
    }
}

impl PreprocessorFactory for CommandPreprocessorFactory {
    fn create(&self) -> Result<Box<dyn VideoPreprocessor>> {
        let program = which::which(&self.program).map_err(|e| PrepError::PreprocessorInit {
            reason: format!("{}: {}", self.program, e),
        })?;

        Ok(Box::new(CommandPreprocessor {
            program,
            args: self.args.clone(),
            model: self.model.clone(),
        }))
    }
}

/// Runs an external program once per video.
///
/// The program is called as
/// `<program> [args..] [--model M] --video P --max-pixels N --min-pixels N --output T --image-output I`.
/// It writes the video tensor to `T`, optionally an image tensor to `I`, and prints
/// the metadata JSON object on stdout. The child is killed if the call is dropped.
#[derive(Debug)]
pub struct CommandPreprocessor {
    program: PathBuf,
    args: Vec<String>,
    model: Option<String>,
}

impl CommandPreprocessor {
    fn failed(video_path: &Path, reason: impl Into<String>) -> PrepError {
        PrepError::PreprocessFailed {
            video_path: video_path.to_path_buf(),
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl VideoPreprocessor for CommandPreprocessor {
    async fn preprocess(
        &mut self,
        video_path: &Path,
        bounds: PixelBounds,
    ) -> Result<PreprocessedVideo> {
        let scratch = tempfile::Builder::new().prefix("vidground-").tempdir()?;
        let video_output = scratch.path().join(VIDEO_INPUTS_FILE);
        let image_output = scratch.path().join(IMAGE_INPUTS_FILE);

        let mut command = Command::new(&self.program);
        command.args(&self.args);
        if let Some(model) = &self.model {
            command.arg("--model").arg(model);
        }

        let output = command
            .arg("--video")
            .arg(video_path)
            .arg("--max-pixels")
            .arg(bounds.max_pixels.to_string())
            .arg("--min-pixels")
            .arg(bounds.min_pixels.to_string())
            .arg("--output")
            .arg(&video_output)
            .arg("--image-output")
            .arg(&image_output)
            .kill_on_drop(true)
            .output()
            .await?;

        if !output.status.success() {
            return Err(Self::failed(
                video_path,
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        let video_kwargs: Map<String, Value> = serde_json::from_slice(&output.stdout)
            .map_err(|e| Self::failed(video_path, format!("invalid metadata on stdout: {}", e)))?;

        let video_inputs = fs::read(&video_output)
            .await
            .map_err(|e| Self::failed(video_path, format!("missing video tensor: {}", e)))?;

        let image_inputs = match fs::read(&image_output).await {
            Ok(bytes) => Some(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };

        Ok(PreprocessedVideo {
            image_inputs,
            video_inputs,
            video_kwargs,
        })
    }
}
