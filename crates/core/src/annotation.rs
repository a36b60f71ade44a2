use std::{collections::BTreeMap, path::Path};

use tokio::fs;

use crate::{
    error::{PrepError, Result},
    types::VideoAnnotation,
};

/// Annotation file contents keyed by video id.
pub type AnnotationFile = BTreeMap<String, VideoAnnotation>;

/// Load an annotation file. A malformed file is fatal, nothing is recovered from it.
pub async fn load_annotations(path: &Path) -> Result<AnnotationFile> {
    let json_content =
        fs::read_to_string(path)
            .await
            .map_err(|source| PrepError::AnnotationRead {
                path: path.to_path_buf(),
                source,
            })?;

    parse_annotations(path, &json_content)
}

pub fn parse_annotations(path: &Path, json_content: &str) -> Result<AnnotationFile> {
    serde_json::from_str(json_content).map_err(|source| PrepError::AnnotationParse {
        path: path.to_path_buf(),
        source,
    })
}
