use std::path::Path;

use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::info;

use crate::{
    error::Result,
    executor::ResultStream,
    layout::{get_dataset_dict_path, get_manifest_path, get_split_dir},
    progress::ProgressReporter,
    types::{FailedExample, ProcessedExample, ProcessingResult, Split, TargetSpan},
};

/// One training example pointing at its preprocessed artifacts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetRow {
    pub problem: String,
    pub solution: TargetSpan,
    pub preprocessed_path: String,
    pub duration: f64,
}

impl From<ProcessedExample> for DatasetRow {
    fn from(example: ProcessedExample) -> Self {
        Self {
            problem: example.label,
            solution: example.target_span,
            preprocessed_path: example.artifact_dir.to_string_lossy().into_owned(),
            duration: example.duration,
        }
    }
}

/// Rows of one split. Row order follows task completion and carries no meaning.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SplitDataset {
    rows: Vec<DatasetRow>,
}

impl SplitDataset {
    pub fn new(rows: Vec<DatasetRow>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[DatasetRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Write the split manifest as JSON Lines, sorted by artifact path.
    pub async fn save(&self, split_dir: &Path) -> Result<()> {
        let mut rows: Vec<&DatasetRow> = self.rows.iter().collect();
        rows.sort_by(|a, b| a.preprocessed_path.cmp(&b.preprocessed_path));

        let mut manifest = String::new();
        for row in rows {
            manifest.push_str(&serde_json::to_string(row)?);
            manifest.push('\n');
        }

        fs::create_dir_all(split_dir).await?;
        fs::write(get_manifest_path(split_dir), manifest).await?;
        Ok(())
    }

    pub async fn load(split_dir: &Path) -> Result<Self> {
        let manifest = fs::read_to_string(get_manifest_path(split_dir)).await?;
        let rows = manifest
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(serde_json::from_str::<DatasetRow>)
            .collect::<std::result::Result<Vec<DatasetRow>, _>>()?;
        Ok(Self { rows })
    }
}

/// What a split run produced: the dataset plus the failures it left out.
#[derive(Debug, Clone, Default)]
pub struct SplitOutcome {
    pub dataset: SplitDataset,
    pub failures: Vec<FailedExample>,
}

impl SplitOutcome {
    pub fn failed_count(&self) -> usize {
        self.failures.len()
    }

    pub fn successful_count(&self) -> usize {
        self.dataset.len()
    }

    /// `(failed, successful)`
    pub fn tally(&self) -> (usize, usize) {
        (self.failed_count(), self.successful_count())
    }

    pub fn push(&mut self, result: ProcessingResult) {
        match result {
            Ok(example) => self.dataset.rows.push(example.into()),
            Err(failure) => self.failures.push(failure),
        }
    }
}

/// Drain a result stream into a [`SplitOutcome`], reporting each completion.
pub async fn aggregate(
    split: Split,
    mut results: ResultStream,
    progress: &dyn ProgressReporter,
) -> Result<SplitOutcome> {
    let mut outcome = SplitOutcome::default();

    while let Some(result) = results.next().await {
        outcome.push(result?);
        progress.task_completed(split);
    }

    let (failed, successful) = outcome.tally();
    info!(
        split = %split,
        failed,
        successful,
        "Preprocessing for split finished"
    );
    Ok(outcome)
}

/// The train and eval splits of a preprocessed dataset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatasetDict {
    pub train: SplitDataset,
    pub eval: SplitDataset,
}

#[derive(Serialize, Deserialize)]
struct DatasetDictIndex {
    splits: Vec<String>,
}

impl DatasetDict {
    pub fn get(&self, split: Split) -> &SplitDataset {
        match split {
            Split::Train => &self.train,
            Split::Eval => &self.eval,
        }
    }

    /// Write `dataset_dict.json` naming the splits. Split manifests are written per split.
    pub async fn write_index(&self, output_dir: &Path) -> Result<()> {
        let index = DatasetDictIndex {
            splits: Split::ALL.iter().map(|s| s.name().to_string()).collect(),
        };
        fs::write(
            get_dataset_dict_path(output_dir),
            serde_json::to_string_pretty(&index)?,
        )
        .await?;
        Ok(())
    }

    pub async fn load(output_dir: &Path) -> Result<Self> {
        Ok(Self {
            train: SplitDataset::load(&get_split_dir(output_dir, Split::Train)).await?,
            eval: SplitDataset::load(&get_split_dir(output_dir, Split::Eval)).await?,
        })
    }
}
