use std::{path::Path, sync::Arc};

use tokio::fs;
use tracing::info;

use crate::{
    annotation::load_annotations,
    config::PipelineConfig,
    dataset::{DatasetDict, SplitOutcome, aggregate},
    error::Result,
    executor::{WorkerPool, WorkerSettings},
    layout::get_split_dir,
    preprocessor::PreprocessorFactory,
    progress::ProgressReporter,
    tasks::build_tasks,
    types::Split,
};

/// Load, build, run and aggregate one split, then write its manifest.
pub async fn process_split(
    split: Split,
    annotation_path: &Path,
    config: &PipelineConfig,
    pool: &WorkerPool,
    progress: &dyn ProgressReporter,
) -> Result<SplitOutcome> {
    let split_dir = get_split_dir(&config.output_dir, split);
    fs::create_dir_all(&split_dir).await?;

    let annotations = load_annotations(annotation_path).await?;
    let tasks = build_tasks(
        &annotations,
        &config.video_folder,
        &split_dir,
        config.bounds,
    )?;

    info!(
        split = %split,
        tasks = tasks.len(),
        workers = pool.worker_count(),
        "Preprocessing split"
    );
    progress.split_started(split, tasks.len());

    let outcome = aggregate(split, pool.run(tasks), progress).await?;
    outcome.dataset.save(&split_dir).await?;

    let (failed, successful) = outcome.tally();
    progress.split_finished(split, failed, successful);
    Ok(outcome)
}

/// Preprocess the train and eval splits into `config.output_dir`.
pub async fn run_all(
    config: &PipelineConfig,
    factory: Arc<dyn PreprocessorFactory>,
    progress: &dyn ProgressReporter,
) -> Result<DatasetDict> {
    fs::create_dir_all(&config.output_dir).await?;

    let pool = WorkerPool::new(factory, config.worker_count).with_settings(WorkerSettings {
        task_timeout: config.task_timeout,
        save_image_inputs: config.save_image_inputs,
    });

    let train = process_split(
        Split::Train,
        &config.train_data_path,
        config,
        &pool,
        progress,
    )
    .await?;
    let eval = process_split(
        Split::Eval,
        &config.eval_data_path,
        config,
        &pool,
        progress,
    )
    .await?;

    let dataset = DatasetDict {
        train: train.dataset,
        eval: eval.dataset,
    };
    dataset.write_index(&config.output_dir).await?;

    Ok(dataset)
}
