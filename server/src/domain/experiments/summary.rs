//! Rolling summary statistics
//!
//! Welford's online algorithm over per-metric score streams: mean, min,
//! max, sample variance (n−1 denominator), and count. Summaries update
//! incrementally per result and can be recomputed from scratch after
//! result replacements.

use std::collections::BTreeMap;

use crate::data::types::{ExperimentResult, SummaryStats};

/// Fold one score into a metric's running summary. Non-finite values are
/// ignored.
pub fn update_summary(summaries: &mut BTreeMap<String, SummaryStats>, metric: &str, value: f64) {
    if !value.is_finite() {
        return;
    }

    match summaries.get_mut(metric) {
        None => {
            summaries.insert(
                metric.to_string(),
                SummaryStats {
                    mean: value,
                    min: value,
                    max: value,
                    var: 0.0,
                    count: 1,
                },
            );
        }
        Some(stats) => {
            // M2 is reconstructed from the stored sample variance so a run
            // can continue from a persisted summary
            let m2 = stats.var * stats.count.saturating_sub(1) as f64;

            let count = stats.count + 1;
            let delta = value - stats.mean;
            let mean = stats.mean + delta / count as f64;
            let m2 = m2 + delta * (value - mean);

            stats.mean = mean;
            stats.count = count;
            stats.var = if count > 1 { m2 / (count - 1) as f64 } else { 0.0 };
            stats.min = stats.min.min(value);
            stats.max = stats.max.max(value);
        }
    }
}

/// Recompute all summaries from scratch over a result set.
/// Used after result entries are overwritten, where the incremental path
/// would double-count.
pub fn recalculate_summary_results(results: &[ExperimentResult]) -> BTreeMap<String, SummaryStats> {
    let mut summaries = BTreeMap::new();
    for result in results {
        for (metric, value) in &result.scores {
            update_summary(&mut summaries, metric, *value);
        }
    }
    summaries
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summarize(values: &[f64]) -> SummaryStats {
        let mut summaries = BTreeMap::new();
        for v in values {
            update_summary(&mut summaries, "m", *v);
        }
        summaries.remove("m").unwrap()
    }

    fn direct_mean(values: &[f64]) -> f64 {
        values.iter().sum::<f64>() / values.len() as f64
    }

    fn direct_sample_var(values: &[f64]) -> f64 {
        if values.len() < 2 {
            return 0.0;
        }
        let mean = direct_mean(values);
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64
    }

    #[test]
    fn test_single_value() {
        let stats = summarize(&[7.0]);
        assert_eq!(stats.mean, 7.0);
        assert_eq!(stats.min, 7.0);
        assert_eq!(stats.max, 7.0);
        assert_eq!(stats.var, 0.0);
        assert_eq!(stats.count, 1);
    }

    #[test]
    fn test_two_values() {
        let stats = summarize(&[2.0, 4.0]);
        assert!((stats.mean - 3.0).abs() < 1e-12);
        assert!((stats.var - 2.0).abs() < 1e-12);
        assert_eq!(stats.count, 2);
    }

    #[test]
    fn test_matches_direct_computation() {
        let values = [0.5, 1.5, 2.25, 9.75, 3.125, 0.0, 4.5, 8.875];
        let stats = summarize(&values);

        let mean = direct_mean(&values);
        let var = direct_sample_var(&values);
        assert!((stats.mean - mean).abs() / mean.abs() < 1e-9);
        assert!((stats.var - var).abs() / var.abs() < 1e-9);
        assert_eq!(stats.min, 0.0);
        assert_eq!(stats.max, 9.75);
        assert_eq!(stats.count, values.len() as u64);
    }

    #[test]
    fn test_non_finite_values_ignored() {
        let mut summaries = BTreeMap::new();
        update_summary(&mut summaries, "m", 1.0);
        update_summary(&mut summaries, "m", f64::NAN);
        update_summary(&mut summaries, "m", f64::INFINITY);
        update_summary(&mut summaries, "m", 3.0);

        let stats = &summaries["m"];
        assert_eq!(stats.count, 2);
        assert!((stats.mean - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_recalculate_agrees_with_incremental() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.5, -2.25];
        let incremental = summarize(&values);

        let results: Vec<ExperimentResult> = values
            .iter()
            .enumerate()
            .map(|(i, v)| ExperimentResult {
                example_id: format!("e{i}"),
                scores: BTreeMap::from([("m".to_string(), *v)]),
                ..Default::default()
            })
            .collect();
        let recalculated = recalculate_summary_results(&results);

        let stats = &recalculated["m"];
        assert!((stats.mean - incremental.mean).abs() < 1e-9);
        assert!((stats.var - incremental.var).abs() < 1e-9);
        assert_eq!(stats.count, incremental.count);
    }

    #[test]
    fn test_permutation_tolerance() {
        let values = [3.5, 1.25, 9.0, 0.125, 4.75, 2.0];
        let mut reversed = values;
        reversed.reverse();

        let a = summarize(&values);
        let b = summarize(&reversed);
        assert!((a.mean - b.mean).abs() < 1e-9);
        assert!((a.var - b.var).abs() < 1e-9);
    }

    #[test]
    fn test_multiple_metrics_tracked_independently() {
        let mut summaries = BTreeMap::new();
        update_summary(&mut summaries, "cost", 0.002);
        update_summary(&mut summaries, "duration", 120.0);
        update_summary(&mut summaries, "cost", 0.004);

        assert_eq!(summaries["cost"].count, 2);
        assert_eq!(summaries["duration"].count, 1);
    }

    #[test]
    fn test_summary_count_matches_scored_results() {
        // summaries[m].count equals the number of results carrying m
        let results = vec![
            ExperimentResult {
                example_id: "e1".into(),
                scores: BTreeMap::from([("m".into(), 1.0), ("n".into(), 2.0)]),
                ..Default::default()
            },
            ExperimentResult {
                example_id: "e2".into(),
                scores: BTreeMap::from([("m".into(), 3.0)]),
                ..Default::default()
            },
        ];
        let summaries = recalculate_summary_results(&results);
        assert_eq!(summaries["m"].count, 2);
        assert_eq!(summaries["n"].count, 1);
    }
}
