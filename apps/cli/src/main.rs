use std::{
    path::PathBuf,
    sync::Arc,
    time::{Duration, Instant},
};

use anyhow::Result;
use clap::Parser;
use console::style;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use vidground_core::{
    CommandPreprocessorFactory, PipelineConfig, PixelBounds, PreprocessorFactory,
    config::{DEFAULT_DATASET_NAME, DEFAULT_MAX_PATCHES, DEFAULT_MIN_PATCHES, DEFAULT_WORKER_COUNT},
    default_output_dir, format_dataset_dict, format_duration, run_all,
};

use crate::progress::CliProgress;

mod progress;

#[derive(Parser)]
#[command(name = "vidground")]
#[command(about = "Preprocess video grounding annotations into a pre-tokenized training dataset")]
struct Cli {
    /// Train split annotation file
    #[arg(long)]
    train: PathBuf,

    /// Eval split annotation file
    #[arg(long)]
    eval: PathBuf,

    /// Folder holding `<video_id>.mp4`, `.mkv` or `.webm` files
    #[arg(long)]
    video_folder: PathBuf,

    /// Output directory. Defaults to ./<dataset>_preprocessed_data_maxpix_<max-patches>
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Dataset name used in the default output directory
    #[arg(long, default_value = DEFAULT_DATASET_NAME)]
    dataset: String,

    /// Upper pixel bound in 28x28 patches
    #[arg(long, default_value_t = DEFAULT_MAX_PATCHES)]
    max_patches: u64,

    /// Lower pixel bound in 28x28 patches
    #[arg(long, default_value_t = DEFAULT_MIN_PATCHES)]
    min_patches: u64,

    /// Number of concurrent preprocessing workers
    #[arg(short, long, default_value_t = DEFAULT_WORKER_COUNT)]
    workers: usize,

    /// Give up on a single video after this many seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Also keep image tensors returned by the preprocessor
    #[arg(long)]
    save_image_inputs: bool,

    /// External preprocessing program
    #[arg(long, default_value = "vidground-preprocess")]
    preprocessor: String,

    /// Extra argument for the preprocessing program (repeatable)
    #[arg(long = "preprocessor-arg", allow_hyphen_values = true)]
    preprocessor_args: Vec<String>,

    /// Model path or name forwarded to the preprocessing program
    #[arg(short, long)]
    model: Option<String>,
}

const DEFAULT_LOG_FILTER: &str = "info";

fn init_tracing() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false),
            )
            .with(env_filter)
            .init();
    }
}

fn log_run_parameters(config: &PipelineConfig) {
    info!(
        output_dir = %config.output_dir.display(),
        workers = config.worker_count,
        max_pixels = config.bounds.max_pixels,
        min_pixels = config.bounds.min_pixels,
        timeout = ?config.task_timeout,
        "Starting preprocessing"
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    if cli.workers == 0 {
        eprintln!("{} --workers must be at least 1", style("Error:").red().bold());
        std::process::exit(1);
    }

    let factory = CommandPreprocessorFactory::new(cli.preprocessor)
        .with_args(cli.preprocessor_args)
        .with_model(cli.model);

    // Validate the preprocessor early
    if let Err(e) = factory.create() {
        eprintln!("{} {}", style("Error:").red().bold(), e);
        std::process::exit(1);
    }

    let output_dir = cli
        .output_dir
        .unwrap_or_else(|| default_output_dir(&cli.dataset, cli.max_patches));

    let config = PipelineConfig {
        train_data_path: cli.train,
        eval_data_path: cli.eval,
        video_folder: cli.video_folder,
        output_dir,
        bounds: PixelBounds::from_patches(cli.max_patches, cli.min_patches),
        worker_count: cli.workers,
        task_timeout: cli.timeout_secs.map(Duration::from_secs),
        save_image_inputs: cli.save_image_inputs,
    };

    println!(
        "\n{}  {}\n",
        style("vidground").cyan().bold(),
        style("Grounding Dataset Preprocessor").dim()
    );
    println!(
        "{} {}",
        style("Output:").dim(),
        style(config.output_dir.display()).cyan()
    );
    println!(
        "{} {} workers, {}..{} pixels",
        style("Pool:").dim(),
        config.worker_count,
        config.bounds.min_pixels,
        config.bounds.max_pixels
    );
    println!("{}", style("─".repeat(60)).dim());
    log_run_parameters(&config);

    let total_start = Instant::now();
    let progress = CliProgress::default();

    let dataset = match run_all(&config, Arc::new(factory), &progress).await {
        Ok(dataset) => dataset,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            std::process::exit(1);
        }
    };

    println!(
        "\n{} {}",
        style("Total time:").dim(),
        style(format_duration(total_start.elapsed())).cyan().bold()
    );
    println!(
        "{} {}\n",
        style("Saved:").dim(),
        style(config.output_dir.display()).cyan()
    );
    println!("{}", style("─".repeat(60)).dim());
    println!("{}", format_dataset_dict(&dataset));

    Ok(())
}
