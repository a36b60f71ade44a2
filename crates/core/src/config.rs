use std::{path::PathBuf, time::Duration};

/// Side of one vision patch in pixels. Pixel bounds are usually given in patches.
pub const PATCH_SIZE: u64 = 28;

pub const DEFAULT_MAX_PATCHES: u64 = 3584;
pub const DEFAULT_MIN_PATCHES: u64 = 16;
pub const DEFAULT_WORKER_COUNT: usize = 16;
pub const DEFAULT_DATASET_NAME: &str = "charades";

/// Pixel-area bounds forwarded to the video preprocessor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelBounds {
    pub max_pixels: u64,
    pub min_pixels: u64,
}

impl PixelBounds {
    pub fn from_patches(max_patches: u64, min_patches: u64) -> Self {
        Self {
            max_pixels: max_patches * PATCH_SIZE * PATCH_SIZE,
            min_pixels: min_patches * PATCH_SIZE * PATCH_SIZE,
        }
    }
}

impl Default for PixelBounds {
    fn default() -> Self {
        Self::from_patches(DEFAULT_MAX_PATCHES, DEFAULT_MIN_PATCHES)
    }
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub train_data_path: PathBuf,
    pub eval_data_path: PathBuf,
    pub video_folder: PathBuf,
    pub output_dir: PathBuf,
    pub bounds: PixelBounds,
    pub worker_count: usize,
    /// Upper bound for a single preprocessing call. `None` waits forever.
    pub task_timeout: Option<Duration>,
    pub save_image_inputs: bool,
}

impl PipelineConfig {
    pub fn new(
        train_data_path: impl Into<PathBuf>,
        eval_data_path: impl Into<PathBuf>,
        video_folder: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            train_data_path: train_data_path.into(),
            eval_data_path: eval_data_path.into(),
            video_folder: video_folder.into(),
            output_dir: output_dir.into(),
            bounds: PixelBounds::default(),
            worker_count: DEFAULT_WORKER_COUNT,
            task_timeout: None,
            save_image_inputs: false,
        }
    }
}

/// Output directory named after the dataset and its max patch budget.
pub fn default_output_dir(dataset: &str, max_patches: u64) -> PathBuf {
    PathBuf::from(format!(
        "./{}_preprocessed_data_maxpix_{}",
        dataset, max_patches
    ))
}
