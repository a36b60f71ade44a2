use std::path::Path;

use tracing::warn;

use crate::{
    annotation::AnnotationFile,
    config::PixelBounds,
    error::{PrepError, Result},
    layout::{find_video, get_example_dir},
    types::{AnnotationRecord, TargetSpan, TaskDescriptor},
};

/// Trim, lowercase and drop one trailing period.
pub fn normalize_sentence(sentence: &str) -> String {
    let sentence = sentence.trim().to_lowercase();
    match sentence.strip_suffix('.') {
        Some(stripped) => stripped.to_string(),
        None => sentence,
    }
}

/// Timestamps as fractions of the video duration. No clamping is applied.
pub fn target_span(record: &AnnotationRecord) -> Result<TargetSpan> {
    if record.duration == 0.0 {
        return Err(PrepError::ZeroDuration {
            video_id: record.video_id.clone(),
        });
    }

    Ok((
        record.timestamp_start / record.duration,
        record.timestamp_end / record.duration,
    ))
}

/// Build one task per annotated span whose video exists in `video_folder`.
///
/// Spans without a video are skipped with a warning. A zero duration aborts the
/// whole build.
pub fn build_tasks(
    annotations: &AnnotationFile,
    video_folder: &Path,
    split_dir: &Path,
    bounds: PixelBounds,
) -> Result<Vec<TaskDescriptor>> {
    let mut tasks = Vec::new();

    for (video_id, annotation) in annotations {
        for record in annotation.records(video_id) {
            let label = normalize_sentence(&record.sentence);

            let Some(video_path) = find_video(video_folder, video_id) else {
                warn!(video_id = %video_id, "Video file not found");
                continue;
            };

            let target_span = target_span(&record)?;

            tasks.push(TaskDescriptor {
                video_path,
                bounds,
                output_dir: get_example_dir(split_dir, video_id, record.sentence_index),
                label,
                target_span,
                duration: record.duration,
            });
        }
    }

    Ok(tasks)
}
