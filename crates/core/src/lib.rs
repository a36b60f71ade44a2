//! Vidground Core Library
//!
//! Turns video grounding annotations and their clips into a pre-tokenized
//! dataset: per-example tensor artifacts on disk plus a manifest per split.

pub mod annotation;
pub mod config;
pub mod dataset;
pub mod error;
pub mod executor;
pub mod format;
pub mod layout;
pub mod pipeline;
pub mod preprocessor;
pub mod progress;
pub mod queue;
pub mod tasks;
pub mod types;

// Re-export commonly used items at crate root
pub use annotation::{AnnotationFile, load_annotations};
pub use config::{PipelineConfig, PixelBounds, default_output_dir};
pub use dataset::{DatasetDict, DatasetRow, SplitDataset, SplitOutcome, aggregate};
pub use error::{PrepError, Result};
pub use executor::{ResultStream, WorkerPool, WorkerSettings};
pub use format::{format_dataset_dict, format_duration, format_split_summary};
pub use pipeline::{process_split, run_all};
pub use preprocessor::{
    CommandPreprocessor, CommandPreprocessorFactory, PreprocessedVideo, PreprocessorFactory,
    VideoPreprocessor,
};
pub use progress::{CompletionCounter, NoProgress, ProgressReporter};
pub use tasks::{build_tasks, normalize_sentence};
pub use types::{
    AnnotationRecord, FailedExample, ProcessedExample, ProcessingResult, Split, TargetSpan,
    TaskDescriptor, VideoAnnotation,
};
