use std::time::Duration;

use crate::{dataset::DatasetDict, types::Split};

const ROW_FEATURES: &str = "problem, solution, preprocessed_path, duration";

/// Format an elapsed time as `12.3s` or `4m 5s`
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs < 60.0 {
        format!("{:.1}s", secs)
    } else {
        format!("{:.0}m {:.0}s", (secs / 60.0).floor(), secs % 60.0)
    }
}

pub fn format_split_summary(split: Split, failed: usize, successful: usize) -> String {
    format!(
        "Preprocessing for split '{}' finished. Failed videos: {}, Successful videos: {}",
        split, failed, successful
    )
}

/// Render the dataset splits and their row counts.
pub fn format_dataset_dict(dataset: &DatasetDict) -> String {
    let mut output = String::from("DatasetDict({\n");
    for split in Split::ALL {
        output.push_str(&format!(
            "    {}: Dataset({{\n        features: [{}],\n        num_rows: {}\n    }})\n",
            split,
            ROW_FEATURES,
            dataset.get(split).len()
        ));
    }
    output.push_str("})");
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn durations() {
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.5s");
        assert_eq!(format_duration(Duration::from_secs(125)), "2m 5s");
    }

    #[test]
    fn split_summary() {
        assert_eq!(
            format_split_summary(Split::Eval, 1, 9),
            "Preprocessing for split 'eval' finished. Failed videos: 1, Successful videos: 9"
        );
    }

    #[test]
    fn dataset_dict_lists_both_splits() {
        let rendered = format_dataset_dict(&DatasetDict::default());
        assert!(rendered.starts_with("DatasetDict({"));
        assert!(rendered.contains("train: Dataset"));
        assert!(rendered.contains("eval: Dataset"));
        assert!(rendered.contains("num_rows: 0"));
    }
}
