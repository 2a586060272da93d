use crate::PlateError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One evaluated image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationRecord {
    pub file_name: String,
    pub ground_truth: String,
    pub prediction: String,
    pub edit_distance: usize,
}

impl EvaluationRecord {
    /// Builds a record, computing the Levenshtein distance between label and
    /// prediction. The prediction is expected to be normalized already.
    pub fn new(
        file_name: impl Into<String>,
        ground_truth: impl Into<String>,
        prediction: impl Into<String>,
    ) -> Self {
        let ground_truth = ground_truth.into();
        let prediction = prediction.into();
        let edit_distance = strsim::levenshtein(&ground_truth, &prediction);
        Self {
            file_name: file_name.into(),
            ground_truth,
            prediction,
            edit_distance,
        }
    }

    pub fn is_detected(&self) -> bool {
        !self.prediction.is_empty()
    }

    pub fn is_exact_match(&self) -> bool {
        self.prediction == self.ground_truth
    }
}

/// Integer counters folded over evaluation records. The order of `push` and
/// `merge` calls does not change the resulting report.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MetricsAccumulator {
    records: usize,
    detected: usize,
    exact_matches: usize,
    total_edit_distance: usize,
    total_ground_truth_chars: usize,
}

impl MetricsAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: &EvaluationRecord) {
        self.records += 1;
        self.detected += usize::from(record.is_detected());
        self.exact_matches += usize::from(record.is_exact_match());
        self.total_edit_distance += record.edit_distance;
        self.total_ground_truth_chars += record.ground_truth.chars().count();
    }

    pub fn merge(self, other: Self) -> Self {
        Self {
            records: self.records + other.records,
            detected: self.detected + other.detected,
            exact_matches: self.exact_matches + other.exact_matches,
            total_edit_distance: self.total_edit_distance + other.total_edit_distance,
            total_ground_truth_chars: self.total_ground_truth_chars
                + other.total_ground_truth_chars,
        }
    }

    pub fn records(&self) -> usize {
        self.records
    }

    /// Turns the counters into rates. `elapsed` is the wall time spent on the
    /// whole evaluation loop.
    pub fn finish(&self, elapsed: Duration) -> Result<MetricsReport, PlateError> {
        if self.records == 0 {
            return Err(PlateError::InvalidInput(
                "No evaluation records to aggregate".to_string(),
            ));
        }
        if self.total_ground_truth_chars == 0 {
            return Err(PlateError::InvalidInput(
                "Ground truth contains no characters, character error rate is undefined"
                    .to_string(),
            ));
        }

        let n = self.records as f64;
        // No false-positive notion exists in this harness: every non-empty
        // prediction counts as a correct detection.
        let precision = 1.0;
        let recall = self.detected as f64 / n;
        let f1 = if recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };

        let character_error_rate =
            self.total_edit_distance as f64 / self.total_ground_truth_chars as f64;

        let elapsed_seconds = elapsed.as_secs_f64();
        if !(elapsed_seconds > 0.0 && elapsed_seconds.is_finite()) {
            return Err(PlateError::InvalidInput(format!(
                "Elapsed time must be positive to derive throughput, got {elapsed:?}"
            )));
        }
        let throughput_fps = n / elapsed_seconds;
        let mean_latency_ms = elapsed_seconds / n * 1000.0;

        Ok(MetricsReport {
            total_images: self.records,
            true_positive_count: self.detected,
            false_negative_count: self.records - self.detected,
            precision,
            recall,
            f1,
            exact_match_count: self.exact_matches,
            plate_accuracy_rate: self.exact_matches as f64 / n,
            total_edit_distance: self.total_edit_distance,
            total_ground_truth_chars: self.total_ground_truth_chars,
            character_error_rate,
            character_accuracy_rate: 1.0 - character_error_rate,
            word_error_rate: (self.records - self.exact_matches) as f64 / n,
            average_edit_distance: self.total_edit_distance as f64 / n,
            elapsed_seconds,
            throughput_fps,
            mean_latency_ms,
        })
    }
}

impl<'a> Extend<&'a EvaluationRecord> for MetricsAccumulator {
    fn extend<I: IntoIterator<Item = &'a EvaluationRecord>>(&mut self, iter: I) {
        for record in iter {
            self.push(record);
        }
    }
}

impl<'a> FromIterator<&'a EvaluationRecord> for MetricsAccumulator {
    fn from_iter<I: IntoIterator<Item = &'a EvaluationRecord>>(iter: I) -> Self {
        let mut accumulator = Self::new();
        accumulator.extend(iter);
        accumulator
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsReport {
    pub total_images: usize,
    pub true_positive_count: usize,
    pub false_negative_count: usize,
    /// Always 1.0, see [`MetricsAccumulator::finish`]
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub exact_match_count: usize,
    pub plate_accuracy_rate: f64,
    pub total_edit_distance: usize,
    pub total_ground_truth_chars: usize,
    pub character_error_rate: f64,
    pub character_accuracy_rate: f64,
    pub word_error_rate: f64,
    pub average_edit_distance: f64,
    pub elapsed_seconds: f64,
    pub throughput_fps: f64,
    pub mean_latency_ms: f64,
}

impl MetricsReport {
    pub fn from_records(
        records: &[EvaluationRecord],
        elapsed: Duration,
    ) -> Result<Self, PlateError> {
        records.iter().collect::<MetricsAccumulator>().finish(elapsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-12;

    fn record(truth: &str, prediction: &str) -> EvaluationRecord {
        EvaluationRecord::new("placa.jpg", truth, prediction)
    }

    #[test]
    fn test_single_substitution() {
        let r = record("ABC-1234", "ABC-1235");
        assert_eq!(r.edit_distance, 1);
        let report = MetricsReport::from_records(&[r], Duration::from_secs(1)).unwrap();
        assert_eq!(report.total_edit_distance, 1);
        assert_eq!(report.total_ground_truth_chars, 8);
    }

    #[test]
    fn test_all_exact_matches() {
        let records = vec![record("ABC-1234", "ABC-1234"), record("XYZ-0001", "XYZ-0001")];
        let report = MetricsReport::from_records(&records, Duration::from_secs(2)).unwrap();
        assert!((report.plate_accuracy_rate - 1.0).abs() < EPS);
        assert!(report.character_error_rate.abs() < EPS);
        assert!((report.character_accuracy_rate - 1.0).abs() < EPS);
        assert!(report.word_error_rate.abs() < EPS);
        assert!(report.average_edit_distance.abs() < EPS);
        assert!((report.recall - 1.0).abs() < EPS);
        assert!((report.f1 - 1.0).abs() < EPS);
    }

    #[test]
    fn test_all_empty_predictions() {
        let records = vec![record("ABC-1234", ""), record("XYZ-0001", "")];
        let report = MetricsReport::from_records(&records, Duration::from_secs(1)).unwrap();
        assert_eq!(report.true_positive_count, 0);
        assert_eq!(report.false_negative_count, 2);
        assert!(report.recall.abs() < EPS);
        assert!(report.f1.abs() < EPS);
        assert!(report.plate_accuracy_rate.abs() < EPS);
        assert!((report.precision - 1.0).abs() < EPS);
        assert!((report.character_error_rate - 1.0).abs() < EPS);
        assert!((report.word_error_rate - 1.0).abs() < EPS);
    }

    #[test]
    fn test_character_error_rate_from_distances() {
        // distances 0, 2 and 4 over three 8 character labels
        let records = vec![
            record("ABC-1234", "ABC-1234"),
            record("ABC-1234", "ABD-1235"),
            record("ABC-1234", "XYZ-9234"),
        ];
        let distances: Vec<usize> = records.iter().map(|r| r.edit_distance).collect();
        assert_eq!(distances, vec![0, 2, 4]);

        let report = MetricsReport::from_records(&records, Duration::from_secs(3)).unwrap();
        assert!((report.character_error_rate - 0.25).abs() < EPS);
        assert!((report.character_accuracy_rate - 0.75).abs() < EPS);
        assert!((report.average_edit_distance - 2.0).abs() < EPS);
        assert!((report.plate_accuracy_rate - 1.0 / 3.0).abs() < EPS);
        assert!((report.word_error_rate - 2.0 / 3.0).abs() < EPS);
    }

    #[test]
    fn test_recall_and_f1_partial_detection() {
        let records = vec![
            record("ABC-1234", "ABC-1234"),
            record("ABC-1234", ""),
            record("ABC-1234", "A"),
            record("ABC-1234", ""),
        ];
        let report = MetricsReport::from_records(&records, Duration::from_secs(1)).unwrap();
        assert_eq!(report.true_positive_count, 2);
        assert!((report.recall - 0.5).abs() < EPS);
        assert!((report.f1 - 2.0 * 0.5 / 1.5).abs() < EPS);
    }

    #[test]
    fn test_throughput() {
        let records = vec![record("ABC-1234", "ABC-1234"); 4];
        let report = MetricsReport::from_records(&records, Duration::from_secs(2)).unwrap();
        assert!((report.throughput_fps - 2.0).abs() < EPS);
        assert!((report.mean_latency_ms - 500.0).abs() < EPS);
        assert!((report.elapsed_seconds - 2.0).abs() < EPS);
    }

    #[test]
    fn test_zero_elapsed_is_invalid_input() {
        let records = vec![record("ABC-1234", "ABC-1234")];
        let err = MetricsReport::from_records(&records, Duration::ZERO).unwrap_err();
        assert!(matches!(err, PlateError::InvalidInput(_)));

        let report = MetricsReport::from_records(&records, Duration::from_nanos(1)).unwrap();
        assert!(report.throughput_fps.is_finite() && report.throughput_fps > 0.0);
    }

    #[test]
    fn test_empty_ground_truth_is_invalid_input() {
        let records = vec![record("", ""), record("", "ABC")];
        let err = MetricsReport::from_records(&records, Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, PlateError::InvalidInput(_)));
    }

    #[test]
    fn test_no_records_is_invalid_input() {
        let err = MetricsReport::from_records(&[], Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, PlateError::InvalidInput(_)));
    }

    #[test]
    fn test_aggregation_is_order_independent() {
        let records = vec![
            record("ABC-1234", "ABC-1234"),
            record("DEF-5678", "DEF-567"),
            record("GHI-9012", ""),
            record("JKL-3456", "JKL-3465"),
            record("MNO-7890", "MN0-7890"),
        ];
        let forward = MetricsReport::from_records(&records, Duration::from_secs(5)).unwrap();

        let mut reversed = records.clone();
        reversed.reverse();
        let backward = MetricsReport::from_records(&reversed, Duration::from_secs(5)).unwrap();
        assert_eq!(forward, backward);

        let mut rotated = records.clone();
        rotated.rotate_left(2);
        let rotated = MetricsReport::from_records(&rotated, Duration::from_secs(5)).unwrap();
        assert_eq!(forward, rotated);
    }

    #[test]
    fn test_merge_matches_single_fold() {
        let records = vec![
            record("ABC-1234", "ABC-1234"),
            record("DEF-5678", "DEF-567"),
            record("GHI-9012", ""),
            record("JKL-3456", "JKL-3465"),
        ];
        let whole: MetricsAccumulator = records.iter().collect();
        let left: MetricsAccumulator = records[..1].iter().collect();
        let right: MetricsAccumulator = records[1..].iter().collect();
        assert_eq!(left.merge(right), whole);
        assert_eq!(right.merge(left), whole);
        assert_eq!(whole.records(), 4);
    }

    #[test]
    fn test_ground_truth_length_counts_characters() {
        let r = record("ÑBC-1234", "NBC-1234");
        assert_eq!(r.edit_distance, 1);
        let acc: MetricsAccumulator = std::iter::once(&r).collect();
        let report = acc.finish(Duration::from_secs(1)).unwrap();
        assert_eq!(report.total_ground_truth_chars, 8);
    }
}
