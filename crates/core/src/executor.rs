//! Fixed-size worker pool running tasks through the video preprocessor.
//!
//! Workers pull from a shared [`TaskQueue`] and report one [`ProcessingResult`]
//! per task over a channel bounded by the pool size. Per-task errors never leave
//! the worker; only a failed preprocessor initialization or a crashed worker is
//! surfaced as an error from [`ResultStream::next`].

use std::{path::Path, sync::Arc, time::Duration};

use tokio::{fs, sync::mpsc, task::JoinSet};
use tracing::{debug, warn};

use crate::{
    error::{PrepError, Result},
    layout::{IMAGE_INPUTS_FILE, VIDEO_INPUTS_FILE, VIDEO_KWARGS_FILE},
    preprocessor::{PreprocessedVideo, PreprocessorFactory, VideoPreprocessor},
    queue::TaskQueue,
    types::{FailedExample, ProcessedExample, ProcessingResult, TaskDescriptor},
};

#[derive(Debug, Clone, Default)]
pub struct WorkerSettings {
    /// Preprocessing calls running longer than this become failures.
    pub task_timeout: Option<Duration>,
    pub save_image_inputs: bool,
}

enum WorkerMessage {
    Completed(ProcessingResult),
    InitFailed(PrepError),
}

pub struct WorkerPool {
    factory: Arc<dyn PreprocessorFactory>,
    worker_count: usize,
    settings: WorkerSettings,
}

impl WorkerPool {
    pub fn new(factory: Arc<dyn PreprocessorFactory>, worker_count: usize) -> Self {
        Self {
            factory,
            worker_count: worker_count.max(1),
            settings: WorkerSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: WorkerSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Start processing `tasks`. Results arrive in completion order.
    ///
    /// Must be called inside a tokio runtime. Dropping the returned stream
    /// aborts the remaining work.
    pub fn run(&self, tasks: Vec<TaskDescriptor>) -> ResultStream {
        let total = tasks.len();
        let queue = TaskQueue::new(tasks);
        let (tx, rx) = mpsc::channel(self.worker_count);
        let mut workers = JoinSet::new();

        for worker_id in 0..self.worker_count.min(total) {
            workers.spawn(run_worker(
                worker_id,
                queue.clone(),
                Arc::clone(&self.factory),
                self.settings.clone(),
                tx.clone(),
            ));
        }

        ResultStream { rx, workers, total }
    }
}

/// Lazy sequence of task results produced by a running [`WorkerPool`].
pub struct ResultStream {
    rx: mpsc::Receiver<WorkerMessage>,
    workers: JoinSet<()>,
    total: usize,
}

impl ResultStream {
    /// Number of tasks submitted to the pool.
    pub fn total(&self) -> usize {
        self.total
    }

    /// Wait for the next completed task. `None` once every worker has exited.
    pub async fn next(&mut self) -> Option<Result<ProcessingResult>> {
        if let Some(message) = self.rx.recv().await {
            return Some(match message {
                WorkerMessage::Completed(result) => Ok(result),
                WorkerMessage::InitFailed(e) => Err(e),
            });
        }

        while let Some(joined) = self.workers.join_next().await {
            if let Err(e) = joined {
                return Some(Err(PrepError::WorkerPool {
                    reason: e.to_string(),
                }));
            }
        }
        None
    }
}

async fn run_worker(
    worker_id: usize,
    queue: TaskQueue<TaskDescriptor>,
    factory: Arc<dyn PreprocessorFactory>,
    settings: WorkerSettings,
    tx: mpsc::Sender<WorkerMessage>,
) {
    let mut preprocessor: Option<Box<dyn VideoPreprocessor>> = None;

    while let Some(task) = queue.pop() {
        if preprocessor.is_none() {
            debug!(worker_id, "Initializing preprocessor");
            match factory.create() {
                Ok(created) => preprocessor = Some(created),
                Err(e) => {
                    queue.clear();
                    let _ = tx.send(WorkerMessage::InitFailed(e)).await;
                    return;
                }
            }
        }
        let Some(processor) = preprocessor.as_deref_mut() else {
            return;
        };

        let result = process_task(processor, task, &settings).await;
        if tx.send(WorkerMessage::Completed(result)).await.is_err() {
            return;
        }
    }

    debug!(worker_id, "Task queue drained");
}

/// Run one task and convert any error into a [`FailedExample`].
pub async fn process_task(
    preprocessor: &mut dyn VideoPreprocessor,
    task: TaskDescriptor,
    settings: &WorkerSettings,
) -> ProcessingResult {
    match preprocess_and_write(preprocessor, &task, settings).await {
        Ok(()) => Ok(ProcessedExample {
            label: task.label,
            target_span: task.target_span,
            artifact_dir: task.output_dir,
            duration: task.duration,
        }),
        Err(e) => {
            warn!(
                video_path = %task.video_path.display(),
                error = %e,
                "Preprocessing failed, skipping"
            );
            Err(FailedExample {
                video_path: task.video_path,
                error_message: e.to_string(),
            })
        }
    }
}

async fn preprocess_and_write(
    preprocessor: &mut dyn VideoPreprocessor,
    task: &TaskDescriptor,
    settings: &WorkerSettings,
) -> Result<()> {
    let call = preprocessor.preprocess(&task.video_path, task.bounds);
    let video = match settings.task_timeout {
        Some(timeout) => tokio::time::timeout(timeout, call).await.map_err(|_| {
            PrepError::Timeout {
                video_path: task.video_path.clone(),
                timeout,
            }
        })??,
        None => call.await?,
    };

    video.fps(&task.video_path)?;
    write_artifacts(&task.output_dir, &video, settings.save_image_inputs).await
}

/// Persist preprocessor output into `dir`, creating it if needed.
pub async fn write_artifacts(
    dir: &Path,
    video: &PreprocessedVideo,
    save_image_inputs: bool,
) -> Result<()> {
    fs::create_dir_all(dir).await?;
    fs::write(dir.join(VIDEO_INPUTS_FILE), &video.video_inputs).await?;
    if save_image_inputs && let Some(image_inputs) = &video.image_inputs {
        fs::write(dir.join(IMAGE_INPUTS_FILE), image_inputs).await?;
    }
    fs::write(
        dir.join(VIDEO_KWARGS_FILE),
        serde_json::to_vec(&video.video_kwargs)?,
    )
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::{
        path::PathBuf,
        sync::atomic::{AtomicUsize, Ordering},
    };

    use async_trait::async_trait;
    use serde_json::{Map, Value};

    use super::*;
    use crate::config::PixelBounds;

    #[derive(Default)]
    struct FakeFactory {
        fail_on: Option<&'static str>,
        hang_on: Option<&'static str>,
        panic_on: Option<&'static str>,
        omit_fps: bool,
        broken: bool,
        created: AtomicUsize,
    }

    struct FakePreprocessor {
        fail_on: Option<&'static str>,
        hang_on: Option<&'static str>,
        panic_on: Option<&'static str>,
        omit_fps: bool,
    }

    impl PreprocessorFactory for FakeFactory {
        fn create(&self) -> Result<Box<dyn VideoPreprocessor>> {
            if self.broken {
                return Err(PrepError::PreprocessorInit {
                    reason: "model not found".into(),
                });
            }
            self.created.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(FakePreprocessor {
                fail_on: self.fail_on,
                hang_on: self.hang_on,
                panic_on: self.panic_on,
                omit_fps: self.omit_fps,
            }))
        }
    }

    #[async_trait]
    impl VideoPreprocessor for FakePreprocessor {
        async fn preprocess(
            &mut self,
            video_path: &Path,
            _bounds: PixelBounds,
        ) -> Result<PreprocessedVideo> {
            let name = video_path.file_name().unwrap().to_str().unwrap();
            if self.fail_on == Some(name) {
                return Err(PrepError::PreprocessFailed {
                    video_path: video_path.to_path_buf(),
                    reason: "corrupt video".into(),
                });
            }
            if self.panic_on == Some(name) {
                panic!("decoder crashed on {name}");
            }
            if self.hang_on == Some(name) {
                tokio::time::sleep(Duration::from_secs(60)).await;
            }

            let mut video_kwargs = Map::new();
            if !self.omit_fps {
                video_kwargs.insert("fps".into(), Value::from(2.0));
            }
            Ok(PreprocessedVideo {
                image_inputs: Some(b"image".to_vec()),
                video_inputs: name.as_bytes().to_vec(),
                video_kwargs,
            })
        }
    }

    fn tasks(out: &Path, names: &[&str]) -> Vec<TaskDescriptor> {
        names
            .iter()
            .enumerate()
            .map(|(i, name)| TaskDescriptor {
                video_path: PathBuf::from(format!("videos/{name}")),
                bounds: PixelBounds::default(),
                output_dir: out.join(format!("v_{i}")),
                label: format!("label {i}"),
                target_span: (0.0, 0.5),
                duration: 10.0,
            })
            .collect()
    }

    async fn collect(mut stream: ResultStream) -> Result<Vec<ProcessingResult>> {
        let mut results = Vec::new();
        while let Some(result) = stream.next().await {
            results.push(result?);
        }
        Ok(results)
    }

    #[tokio::test]
    async fn writes_artifacts_for_every_task() {
        let out = tempfile::tempdir().unwrap();
        let pool = WorkerPool::new(Arc::new(FakeFactory::default()), 3);

        let results = collect(pool.run(tasks(out.path(), &["a.mp4", "b.mp4", "c.mkv"])))
            .await
            .unwrap();

        assert_eq!(results.len(), 3);
        for result in results {
            let example = result.unwrap();
            assert!(example.artifact_dir.join(VIDEO_INPUTS_FILE).is_file());
            let kwargs = std::fs::read_to_string(example.artifact_dir.join(VIDEO_KWARGS_FILE))
                .unwrap();
            assert_eq!(kwargs, r#"{"fps":2.0}"#);
            assert!(!example.artifact_dir.join(IMAGE_INPUTS_FILE).exists());
        }
    }

    #[tokio::test]
    async fn one_fault_leaves_other_tasks_intact() {
        let out = tempfile::tempdir().unwrap();
        let factory = FakeFactory {
            fail_on: Some("bad.mp4"),
            ..Default::default()
        };
        let pool = WorkerPool::new(Arc::new(factory), 2);

        let results = collect(pool.run(tasks(
            out.path(),
            &["a.mp4", "bad.mp4", "c.mp4", "d.mp4", "e.mp4"],
        )))
        .await
        .unwrap();

        let failures: Vec<_> = results.iter().filter_map(|r| r.as_ref().err()).collect();
        assert_eq!(results.len(), 5);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].video_path, Path::new("videos/bad.mp4"));
        assert!(failures[0].error_message.contains("corrupt video"));
        assert!(!out.path().join("v_1").exists());
    }

    #[tokio::test]
    async fn hung_call_times_out_as_failure() {
        let out = tempfile::tempdir().unwrap();
        let factory = FakeFactory {
            hang_on: Some("slow.mp4"),
            ..Default::default()
        };
        let pool = WorkerPool::new(Arc::new(factory), 2).with_settings(WorkerSettings {
            task_timeout: Some(Duration::from_millis(50)),
            save_image_inputs: false,
        });

        let results = collect(pool.run(tasks(out.path(), &["slow.mp4", "fast.mp4"])))
            .await
            .unwrap();

        let failures: Vec<_> = results.iter().filter_map(|r| r.as_ref().err()).collect();
        assert_eq!(results.len(), 2);
        assert_eq!(failures.len(), 1);
        assert!(failures[0].error_message.contains("timed out"));
    }

    #[tokio::test]
    async fn missing_fps_is_a_failure() {
        let out = tempfile::tempdir().unwrap();
        let factory = FakeFactory {
            omit_fps: true,
            ..Default::default()
        };
        let pool = WorkerPool::new(Arc::new(factory), 1);

        let results = collect(pool.run(tasks(out.path(), &["a.mp4"]))).await.unwrap();

        let failure = results[0].as_ref().unwrap_err();
        assert!(failure.error_message.contains("fps"));
    }

    #[tokio::test]
    async fn image_inputs_saved_on_request() {
        let out = tempfile::tempdir().unwrap();
        let pool =
            WorkerPool::new(Arc::new(FakeFactory::default()), 1).with_settings(WorkerSettings {
                task_timeout: None,
                save_image_inputs: true,
            });

        let results = collect(pool.run(tasks(out.path(), &["a.mp4"]))).await.unwrap();

        let example = results[0].as_ref().unwrap();
        assert_eq!(
            std::fs::read(example.artifact_dir.join(IMAGE_INPUTS_FILE)).unwrap(),
            b"image"
        );
    }

    #[tokio::test]
    async fn preprocessors_are_created_per_worker() {
        let out = tempfile::tempdir().unwrap();
        let factory = Arc::new(FakeFactory::default());
        let pool = WorkerPool::new(factory.clone(), 2);

        let names = ["a", "b", "c", "d", "e", "f"];
        let results = collect(pool.run(tasks(out.path(), &names))).await.unwrap();

        assert_eq!(results.len(), 6);
        let created = factory.created.load(Ordering::SeqCst);
        assert!((1..=2).contains(&created), "created {created} preprocessors");
    }

    #[tokio::test]
    async fn init_failure_aborts_the_stream() {
        let out = tempfile::tempdir().unwrap();
        let factory = FakeFactory {
            broken: true,
            ..Default::default()
        };
        let pool = WorkerPool::new(Arc::new(factory), 4);

        let err = collect(pool.run(tasks(out.path(), &["a.mp4", "b.mp4"])))
            .await
            .unwrap_err();
        assert!(matches!(err, PrepError::PreprocessorInit { .. }));
    }

    #[tokio::test]
    async fn worker_panic_surfaces_as_pool_error() {
        let out = tempfile::tempdir().unwrap();
        let factory = FakeFactory {
            panic_on: Some("crash.mp4"),
            ..Default::default()
        };
        let pool = WorkerPool::new(Arc::new(factory), 1);
        let mut stream = pool.run(tasks(out.path(), &["a.mp4", "crash.mp4"]));

        let first = stream.next().await.unwrap().unwrap();
        assert!(first.is_ok());

        let err = stream.next().await.unwrap().unwrap_err();
        match err {
            PrepError::WorkerPool { reason } => assert!(reason.contains("panic"), "{reason}"),
            other => panic!("unexpected error: {other}"),
        }
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn empty_task_list_finishes_immediately() {
        let pool = WorkerPool::new(Arc::new(FakeFactory::default()), 4);
        let mut stream = pool.run(Vec::new());
        assert_eq!(stream.total(), 0);
        assert!(stream.next().await.is_none());
    }
}
