//! Statistics Calculator Module
//! Descriptive statistics and Welch's t-test over grouped numeric columns.

use polars::prelude::*;
use serde::Serialize;
use statrs::distribution::{ContinuousCDF, StudentsT};
use std::collections::{BTreeMap, BTreeSet};

/// Significance threshold for t-test
pub const SIGNIFICANCE_THRESHOLD: f64 = 0.05;

/// Statistics for a single group.
#[derive(Debug, Clone, Serialize)]
pub struct GroupStats {
    pub group_name: String,
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub std: f64,
    pub variance: f64,
    pub p05: f64,
    pub p25: f64,
    pub p75: f64,
    pub p95: f64,
    pub std_diff_from_control: Option<f64>,
    pub p_value: Option<f64>,
    pub is_significant: bool,
}

impl Default for GroupStats {
    fn default() -> Self {
        Self {
            group_name: String::new(),
            count: 0,
            mean: f64::NAN,
            median: f64::NAN,
            std: f64::NAN,
            variance: f64::NAN,
            p05: f64::NAN,
            p25: f64::NAN,
            p75: f64::NAN,
            p95: f64::NAN,
            std_diff_from_control: None,
            p_value: None,
            is_significant: false,
        }
    }
}

/// Statistics of one numeric column split by a grouping column.
#[derive(Debug, Clone, Serialize)]
pub struct GroupComparison {
    pub value_column: String,
    pub control_group: String,
    pub group_stats: BTreeMap<String, GroupStats>,
}

impl GroupComparison {
    /// Get groups ordered with control first.
    pub fn get_ordered_groups(&self) -> Vec<String> {
        let mut groups: Vec<String> = self.group_stats.keys().cloned().collect();

        if let Some(pos) = groups.iter().position(|g| g == &self.control_group) {
            groups.remove(pos);
            groups.insert(0, self.control_group.clone());
        }

        groups
    }

    /// Check if any group has significant p-value.
    pub fn has_significant_results(&self) -> bool {
        self.group_stats
            .iter()
            .any(|(name, gs)| name != &self.control_group && gs.is_significant)
    }
}

/// Handles statistical calculations.
pub struct StatsCalculator;

impl StatsCalculator {
    /// Compute descriptive statistics for an array of values.
    pub fn compute_descriptive_stats(values: &[f64]) -> GroupStats {
        let n = values.len();
        if n == 0 {
            return GroupStats::default();
        }

        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let mean = values.iter().sum::<f64>() / n as f64;
        let median = if n % 2 == 0 {
            (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
        } else {
            sorted[n / 2]
        };

        let variance = if n > 1 {
            values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1) as f64
        } else {
            0.0
        };

        GroupStats {
            count: n,
            mean,
            median,
            std: variance.sqrt(),
            variance,
            p05: Self::percentile(&sorted, 5.0),
            p25: Self::percentile(&sorted, 25.0),
            p75: Self::percentile(&sorted, 75.0),
            p95: Self::percentile(&sorted, 95.0),
            ..GroupStats::default()
        }
    }

    /// Calculate percentile using linear interpolation (NumPy compatible).
    fn percentile(sorted_values: &[f64], p: f64) -> f64 {
        let n = sorted_values.len();
        if n == 0 {
            return f64::NAN;
        }
        if n == 1 {
            return sorted_values[0];
        }

        let rank = (p / 100.0) * (n - 1) as f64;
        let lower = rank.floor() as usize;
        let upper = (rank.ceil() as usize).min(n - 1);
        let frac = rank - lower as f64;

        if lower == upper {
            sorted_values[lower]
        } else {
            sorted_values[lower] * (1.0 - frac) + sorted_values[upper] * frac
        }
    }

    /// Perform Welch's t-test (independent samples, unequal variance).
    pub fn perform_ttest(group_values: &[f64], control_values: &[f64]) -> (f64, bool) {
        let n1 = group_values.len() as f64;
        let n2 = control_values.len() as f64;

        if n1 < 2.0 || n2 < 2.0 {
            return (f64::NAN, false);
        }

        let mean1 = group_values.iter().sum::<f64>() / n1;
        let mean2 = control_values.iter().sum::<f64>() / n2;

        let var1 = group_values
            .iter()
            .map(|x| (x - mean1).powi(2))
            .sum::<f64>()
            / (n1 - 1.0);
        let var2 = control_values
            .iter()
            .map(|x| (x - mean2).powi(2))
            .sum::<f64>()
            / (n2 - 1.0);

        let se = (var1 / n1 + var2 / n2).sqrt();
        if se == 0.0 {
            return (1.0, false);
        }

        let t = (mean1 - mean2) / se;

        // Welch-Satterthwaite degrees of freedom
        let df_num = (var1 / n1 + var2 / n2).powi(2);
        let df_denom = (var1 / n1).powi(2) / (n1 - 1.0) + (var2 / n2).powi(2) / (n2 - 1.0);
        let df = df_num / df_denom;

        // Two-tailed p-value using t-distribution
        if let Ok(dist) = StudentsT::new(0.0, 1.0, df) {
            let p_value = 2.0 * (1.0 - dist.cdf(t.abs()));
            (p_value, p_value <= SIGNIFICANCE_THRESHOLD)
        } else {
            (f64::NAN, false)
        }
    }

    /// Non-null values of `value_col` for rows where `group_col == group`.
    pub fn get_values_for_group(
        df: &DataFrame,
        group_col: &str,
        value_col: &str,
        group: &str,
    ) -> PolarsResult<Vec<f64>> {
        let selected = df
            .clone()
            .lazy()
            .filter(col(group_col).eq(lit(group)))
            .select([col(value_col).cast(DataType::Float64)])
            .collect()?;

        Ok(selected
            .column(value_col)?
            .f64()?
            .into_iter()
            .flatten()
            .filter(|v| !v.is_nan())
            .collect())
    }

    /// Statistics of `value_col` for every group of `group_col`, each compared
    /// against `control_group`.
    pub fn compare_groups(
        df: &DataFrame,
        group_col: &str,
        value_col: &str,
        control_group: &str,
    ) -> PolarsResult<GroupComparison> {
        let group_names = df.column(group_col)?.cast(&DataType::String)?;
        let groups: BTreeSet<String> = group_names
            .str()?
            .into_iter()
            .flatten()
            .map(String::from)
            .collect();

        let mut group_stats: BTreeMap<String, GroupStats> = BTreeMap::new();

        // First compute control group stats
        let control_values = Self::get_values_for_group(df, group_col, value_col, control_group)?;
        let mut control_stats = Self::compute_descriptive_stats(&control_values);
        control_stats.group_name = control_group.to_string();
        let control_std = control_stats.std;
        let control_mean = control_stats.mean;
        group_stats.insert(control_group.to_string(), control_stats);

        for group_name in &groups {
            if group_name == control_group {
                continue;
            }

            let values = Self::get_values_for_group(df, group_col, value_col, group_name)?;
            let mut gs = Self::compute_descriptive_stats(&values);
            gs.group_name = group_name.clone();

            if control_std > 0.0 && !control_mean.is_nan() {
                gs.std_diff_from_control = Some((gs.mean - control_mean) / control_std);
            }

            if !control_values.is_empty() {
                let (p_value, is_significant) = Self::perform_ttest(&values, &control_values);
                gs.p_value = Some(p_value);
                gs.is_significant = is_significant;
            }

            group_stats.insert(group_name.clone(), gs);
        }

        Ok(GroupComparison {
            value_column: value_col.to_string(),
            control_group: control_group.to_string(),
            group_stats,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptive_stats_of_small_sample() {
        let stats = StatsCalculator::compute_descriptive_stats(&[4.0, 1.0, 3.0, 2.0]);

        assert_eq!(stats.count, 4);
        assert_eq!(stats.mean, 2.5);
        assert_eq!(stats.median, 2.5);
        assert!((stats.variance - 5.0 / 3.0).abs() < 1e-12);
        assert_eq!(stats.p25, 1.75);
        assert_eq!(stats.p75, 3.25);
    }

    #[test]
    fn empty_sample_is_nan() {
        let stats = StatsCalculator::compute_descriptive_stats(&[]);
        assert_eq!(stats.count, 0);
        assert!(stats.mean.is_nan());
    }

    #[test]
    fn ttest_needs_two_values_per_side() {
        let (p, significant) = StatsCalculator::perform_ttest(&[1.0], &[1.0, 2.0]);
        assert!(p.is_nan());
        assert!(!significant);
    }

    #[test]
    fn ttest_separates_distant_groups() {
        let low = [1.0, 1.1, 0.9, 1.05, 0.95];
        let high = [10.0, 10.2, 9.8, 10.1, 9.9];

        let (p, significant) = StatsCalculator::perform_ttest(&high, &low);
        assert!(p < 0.001);
        assert!(significant);

        let (p, significant) = StatsCalculator::perform_ttest(&low, &low);
        assert!(p > 0.5);
        assert!(!significant);
    }

    #[test]
    fn compares_paid_against_free() {
        let df = df!(
            "Type" => [Some("Free"), Some("Free"), Some("Paid"), Some("Paid"), None],
            "Installs" => [Some(1000.0), Some(3000.0), Some(10.0), None, Some(5.0)]
        )
        .unwrap();

        let comparison = StatsCalculator::compare_groups(&df, "Type", "Installs", "Free").unwrap();

        assert_eq!(comparison.get_ordered_groups(), vec!["Free", "Paid"]);
        let free = &comparison.group_stats["Free"];
        assert_eq!(free.count, 2);
        assert_eq!(free.mean, 2000.0);

        let paid = &comparison.group_stats["Paid"];
        assert_eq!(paid.count, 1);
        assert_eq!(paid.group_name, "Paid");
        assert!(paid.std_diff_from_control.unwrap() < 0.0);
        assert!(!comparison.has_significant_results());
    }
}
