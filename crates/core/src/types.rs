use std::{fmt, path::PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::PixelBounds;

/// Normalized `(start, end)` window within a video, as fractions of its duration.
pub type TargetSpan = (f64, f64);

/// Per-video entry of an annotation file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoAnnotation {
    pub timestamps: Vec<[f64; 2]>,
    pub sentences: Vec<String>,
    pub duration: f64,
}

/// One grounding span of one video, flattened out of a [`VideoAnnotation`].
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationRecord {
    pub video_id: String,
    pub sentence_index: usize,
    pub timestamp_start: f64,
    pub timestamp_end: f64,
    pub sentence: String,
    pub duration: f64,
}

impl VideoAnnotation {
    /// Zip timestamps with sentences. Extra elements of the longer list are dropped.
    pub fn records<'a>(&'a self, video_id: &'a str) -> impl Iterator<Item = AnnotationRecord> + 'a {
        self.timestamps
            .iter()
            .zip(self.sentences.iter())
            .enumerate()
            .map(move |(sentence_index, ([start, end], sentence))| AnnotationRecord {
                video_id: video_id.to_string(),
                sentence_index,
                timestamp_start: *start,
                timestamp_end: *end,
                sentence: sentence.clone(),
                duration: self.duration,
            })
    }
}

/// Self-contained unit of work handed to exactly one worker.
#[derive(Debug, Clone)]
pub struct TaskDescriptor {
    pub video_path: PathBuf,
    pub bounds: PixelBounds,
    pub output_dir: PathBuf,
    pub label: String,
    pub target_span: TargetSpan,
    pub duration: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedExample {
    pub label: String,
    pub target_span: TargetSpan,
    pub artifact_dir: PathBuf,
    pub duration: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FailedExample {
    pub video_path: PathBuf,
    pub error_message: String,
}

/// Outcome of one task, produced at the worker boundary.
pub type ProcessingResult = Result<ProcessedExample, FailedExample>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Split {
    Train,
    Eval,
}

impl Split {
    pub const ALL: [Split; 2] = [Split::Train, Split::Eval];

    pub fn name(&self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Eval => "eval",
        }
    }
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_zip_and_drop_extra_sentences() {
        let annotation = VideoAnnotation {
            timestamps: vec![[1.0, 2.0], [3.0, 4.0]],
            sentences: vec!["a".into(), "b".into(), "c".into()],
            duration: 10.0,
        };

        let records: Vec<_> = annotation.records("v1").collect();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].sentence_index, 1);
        assert_eq!(records[1].sentence, "b");
        assert_eq!(records[1].timestamp_start, 3.0);
        assert_eq!(records[1].video_id, "v1");
    }

    #[test]
    fn split_names() {
        assert_eq!(Split::Train.to_string(), "train");
        assert_eq!(Split::Eval.name(), "eval");
    }
}
