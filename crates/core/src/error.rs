use std::{path::PathBuf, time::Duration};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PrepError {
    #[error("Failed to read annotation file {path}: {source}")]
    AnnotationRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Malformed annotation file {path}: {source}")]
    AnnotationParse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Video {video_id} has zero duration, timestamps cannot be normalized")]
    ZeroDuration { video_id: String },

    #[error("Preprocessor initialization failed: {reason}")]
    PreprocessorInit { reason: String },

    #[error("Preprocessing failed for {video_path}: {reason}")]
    PreprocessFailed { video_path: PathBuf, reason: String },

    #[error("Preprocessing timed out for {video_path} after {timeout:?}")]
    Timeout {
        video_path: PathBuf,
        timeout: Duration,
    },

    #[error("Preprocessor metadata for {video_path} is missing key \"{key}\"")]
    MissingMetadata { video_path: PathBuf, key: String },

    #[error("Worker pool failed: {reason}")]
    WorkerPool { reason: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PrepError>;
