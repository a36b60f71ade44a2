use std::{
    sync::Mutex,
    time::{Duration, Instant},
};

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use vidground_core::{ProgressReporter, Split, format_duration, format_split_summary};

struct ActiveSplit {
    bar: ProgressBar,
    started: Instant,
}

/// One progress bar per split, replaced by a summary line when the split ends.
#[derive(Default)]
pub struct CliProgress {
    active: Mutex<Option<ActiveSplit>>,
}

fn create_bar(split: Split, total: usize) -> ProgressBar {
    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::with_template(
            "{spinner:.cyan} {msg} [{bar:30.cyan/blue}] {pos}/{len} {elapsed_precise} (eta {eta})",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
        .progress_chars("=> "),
    );
    pb.set_message(format!("Preprocessing {} split", split));
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

impl ProgressReporter for CliProgress {
    fn split_started(&self, split: Split, total: usize) {
        let Ok(mut active) = self.active.lock() else {
            return;
        };
        *active = Some(ActiveSplit {
            bar: create_bar(split, total),
            started: Instant::now(),
        });
    }

    fn task_completed(&self, _split: Split) {
        if let Ok(guard) = self.active.lock()
            && let Some(active) = guard.as_ref()
        {
            active.bar.inc(1);
        }
    }

    fn split_finished(&self, split: Split, failed: usize, successful: usize) {
        let Ok(mut active) = self.active.lock() else {
            return;
        };
        let Some(ActiveSplit { bar, started }) = active.take() else {
            return;
        };

        let marker = if failed == 0 {
            style("✓").green().bold()
        } else {
            style("!").yellow().bold()
        };
        bar.finish_and_clear();
        println!(
            "{} {} {}",
            marker,
            format_split_summary(split, failed, successful),
            style(format!("[{}]", format_duration(started.elapsed()))).dim()
        );
    }
}
