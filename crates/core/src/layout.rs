//! On-disk naming conventions for inputs and preprocessed artifacts.

use std::path::{Path, PathBuf};

use crate::types::Split;

/// Video container extensions probed in priority order.
pub const VIDEO_EXTENSIONS: [&str; 3] = ["mp4", "mkv", "webm"];

pub const VIDEO_INPUTS_FILE: &str = "video_inputs.pt";
pub const IMAGE_INPUTS_FILE: &str = "image_inputs.pt";
pub const VIDEO_KWARGS_FILE: &str = "video_kwargs.json";
pub const MANIFEST_FILE: &str = "manifest.jsonl";
pub const DATASET_DICT_FILE: &str = "dataset_dict.json";

/// Find the video file for `video_id` in `video_folder`. First existing extension wins.
pub fn find_video(video_folder: &Path, video_id: &str) -> Option<PathBuf> {
    VIDEO_EXTENSIONS
        .iter()
        .map(|ext| video_folder.join(format!("{}.{}", video_id, ext)))
        .find(|candidate| candidate.is_file())
}

pub fn get_split_dir(output_dir: &Path, split: Split) -> PathBuf {
    output_dir.join(split.name())
}

/// Artifact directory for one grounding span, unique per video and sentence.
pub fn get_example_dir(split_dir: &Path, video_id: &str, sentence_index: usize) -> PathBuf {
    split_dir.join(format!("{}_{}", video_id, sentence_index))
}

pub fn get_manifest_path(split_dir: &Path) -> PathBuf {
    split_dir.join(MANIFEST_FILE)
}

pub fn get_dataset_dict_path(output_dir: &Path) -> PathBuf {
    output_dir.join(DATASET_DICT_FILE)
}
