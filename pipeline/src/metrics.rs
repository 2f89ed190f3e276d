use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{
    dataset::Species,
    error::{ErrorKind, PipelineError, Result},
};

/// 3x3 confusion matrix in fixed species order.
///
/// Entry `(i, j)` counts rows whose actual class is `i` and predicted class
/// is `j`, with indices following [`Species::ALL`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    counts: [[usize; 3]; 3],
}

impl ConfusionMatrix {
    /// Builds the matrix from aligned actual/predicted label vectors.
    pub fn from_labels(actual: &[Species], predicted: &[Species]) -> Result<Self> {
        if actual.is_empty() {
            return Err(PipelineError::new(
                ErrorKind::DataQuality,
                "cannot evaluate an empty label vector",
            ));
        }
        if actual.len() != predicted.len() {
            return Err(PipelineError::new(
                ErrorKind::DataQuality,
                format!(
                    "actual length {} does not match predicted length {}",
                    actual.len(),
                    predicted.len()
                ),
            ));
        }
        let mut counts = [[0usize; 3]; 3];
        for (a, p) in actual.iter().zip(predicted) {
            counts[a.index()][p.index()] += 1;
        }
        Ok(Self { counts })
    }

    /// Count for an (actual, predicted) pair.
    #[must_use]
    pub const fn get(&self, actual: Species, predicted: Species) -> usize {
        self.counts[actual.index()][predicted.index()]
    }

    /// Raw counts, rows = actual, columns = predicted.
    #[must_use]
    pub const fn counts(&self) -> &[[usize; 3]; 3] {
        &self.counts
    }

    /// Total number of evaluated rows.
    #[must_use]
    pub fn total(&self) -> usize {
        self.counts.iter().flatten().sum()
    }

    /// Per-class row sums (actual-class support).
    #[must_use]
    pub fn row_sums(&self) -> [usize; 3] {
        std::array::from_fn(|row| self.counts[row].iter().sum())
    }

    /// Largest single cell count (used for rendering).
    #[must_use]
    pub fn max_count(&self) -> usize {
        self.counts.iter().flatten().copied().max().unwrap_or(0)
    }

    fn true_positives(&self, class: usize) -> usize {
        self.counts[class][class]
    }

    fn false_positives(&self, class: usize) -> usize {
        (0..3)
            .filter(|&row| row != class)
            .map(|row| self.counts[row][class])
            .sum()
    }

    fn false_negatives(&self, class: usize) -> usize {
        (0..3)
            .filter(|&col| col != class)
            .map(|col| self.counts[class][col])
            .sum()
    }

    /// Overall accuracy.
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        let correct: usize = (0..3).map(|c| self.true_positives(c)).sum();
        correct as f64 / total as f64
    }

    /// Precision for one class: `TP / (TP + FP)`, 0 when undefined.
    #[must_use]
    pub fn precision(&self, species: Species) -> f64 {
        let class = species.index();
        ratio(
            self.true_positives(class),
            self.true_positives(class) + self.false_positives(class),
        )
    }

    /// Recall for one class: `TP / (TP + FN)`, 0 when undefined.
    #[must_use]
    pub fn recall(&self, species: Species) -> f64 {
        let class = species.index();
        ratio(
            self.true_positives(class),
            self.true_positives(class) + self.false_negatives(class),
        )
    }

    /// F1 for one class: harmonic mean of precision and recall.
    #[must_use]
    pub fn f1(&self, species: Species) -> f64 {
        let p = self.precision(species);
        let r = self.recall(species);
        if p + r == 0.0 {
            0.0
        } else {
            2.0 * p * r / (p + r)
        }
    }

    fn weighted(&self, metric: impl Fn(Species) -> f64) -> f64 {
        let total = self.total() as f64;
        if total == 0.0 {
            return 0.0;
        }
        Species::ALL
            .into_iter()
            .map(|species| {
                let support = self.row_sums()[species.index()] as f64;
                metric(species) * support
            })
            .sum::<f64>()
            / total
    }

    /// Support-weighted precision across the three classes.
    #[must_use]
    pub fn precision_weighted(&self) -> f64 {
        self.weighted(|species| self.precision(species))
    }

    /// Support-weighted recall across the three classes.
    #[must_use]
    pub fn recall_weighted(&self) -> f64 {
        self.weighted(|species| self.recall(species))
    }

    /// Support-weighted F1 across the three classes.
    #[must_use]
    pub fn f1_weighted(&self) -> f64 {
        self.weighted(|species| self.f1(species))
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// Per-class precision/recall/F1 row in the metrics report.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassScores {
    /// Precision for the class.
    pub precision: f64,
    /// Recall for the class.
    pub recall: f64,
    /// F1 for the class.
    pub f1: f64,
    /// Number of actual rows of the class in the test partition.
    pub support: usize,
}

/// Evaluation report persisted alongside the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSummary {
    /// Overall accuracy.
    pub accuracy: f64,
    /// Weighted precision.
    pub precision: f64,
    /// Weighted recall.
    pub recall: f64,
    /// Weighted F1.
    pub f1: f64,
    /// Averaging policy used for the three scalars above.
    pub averaging: String,
    /// Per-class breakdown in fixed label order.
    pub per_class: IndexMap<String, ClassScores>,
    /// Confusion matrix the scalars were derived from.
    pub confusion_matrix: ConfusionMatrix,
}

impl MetricsSummary {
    /// Computes the full report from actual and predicted labels.
    pub fn from_labels(actual: &[Species], predicted: &[Species]) -> Result<Self> {
        let matrix = ConfusionMatrix::from_labels(actual, predicted)?;
        let supports = matrix.row_sums();
        let mut per_class = IndexMap::new();
        for species in Species::ALL {
            per_class.insert(
                species.label().to_string(),
                ClassScores {
                    precision: matrix.precision(species),
                    recall: matrix.recall(species),
                    f1: matrix.f1(species),
                    support: supports[species.index()],
                },
            );
        }
        Ok(Self {
            accuracy: matrix.accuracy(),
            precision: matrix.precision_weighted(),
            recall: matrix.recall_weighted(),
            f1: matrix.f1_weighted(),
            averaging: "weighted".to_string(),
            per_class,
            confusion_matrix: matrix,
        })
    }

    /// Log lines for the four scalars at the fixed 4-decimal precision.
    #[must_use]
    pub fn log_lines(&self) -> [String; 4] {
        [
            format!("Accuracy Score  : {:.4}", self.accuracy),
            format!("Precision Score : {:.4}", self.precision),
            format!("Recall Score    : {:.4}", self.recall),
            format!("F1 Score        : {:.4}", self.f1),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(counts: &[(Species, usize)]) -> Vec<Species> {
        counts.iter()
            .flat_map(|&(species, count)| std::iter::repeat(species).take(count))
            .collect()
    }

    #[test]
    fn perfect_predictions_score_one() {
        let actual = labels(&[
            (Species::Setosa, 10),
            (Species::Versicolor, 10),
            (Species::Virginica, 10),
        ]);
        let summary = MetricsSummary::from_labels(&actual, &actual).unwrap();
        assert!((summary.accuracy - 1.0).abs() < 1e-12);
        assert!((summary.precision - 1.0).abs() < 1e-12);
        assert!((summary.recall - 1.0).abs() < 1e-12);
        assert!((summary.f1 - 1.0).abs() < 1e-12);
        assert_eq!(summary.averaging, "weighted");
    }

    #[test]
    fn confusion_matrix_counts_misclassifications() {
        let actual = vec![Species::Setosa, Species::Setosa, Species::Versicolor];
        let predicted = vec![Species::Setosa, Species::Virginica, Species::Versicolor];
        let matrix = ConfusionMatrix::from_labels(&actual, &predicted).unwrap();
        assert_eq!(matrix.get(Species::Setosa, Species::Setosa), 1);
        assert_eq!(matrix.get(Species::Setosa, Species::Virginica), 1);
        assert_eq!(matrix.get(Species::Versicolor, Species::Versicolor), 1);
        assert_eq!(matrix.total(), 3);
        assert_eq!(matrix.row_sums(), [2, 1, 0]);
    }

    #[test]
    fn weighted_scores_follow_support() {
        // 9 setosa all correct, 1 versicolor misclassified as virginica.
        let actual = labels(&[(Species::Setosa, 9), (Species::Versicolor, 1)]);
        let mut predicted = labels(&[(Species::Setosa, 9)]);
        predicted.push(Species::Virginica);
        let matrix = ConfusionMatrix::from_labels(&actual, &predicted).unwrap();
        assert!((matrix.accuracy() - 0.9).abs() < 1e-12);
        // Weighted recall = (9/10)*1.0 + (1/10)*0.0 = 0.9.
        assert!((matrix.recall_weighted() - 0.9).abs() < 1e-12);
        // Virginica has zero support, so it contributes nothing.
        assert!((matrix.precision(Species::Virginica) - 0.0).abs() < 1e-12);
    }

    #[test]
    fn misaligned_labels_are_rejected() {
        let err = ConfusionMatrix::from_labels(
            &[Species::Setosa],
            &[Species::Setosa, Species::Virginica],
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DataQuality);
    }

    #[test]
    fn log_lines_use_four_decimals() {
        let actual = labels(&[
            (Species::Setosa, 1),
            (Species::Versicolor, 1),
            (Species::Virginica, 1),
        ]);
        let summary = MetricsSummary::from_labels(&actual, &actual).unwrap();
        assert_eq!(summary.log_lines()[0], "Accuracy Score  : 1.0000");
    }

    #[test]
    fn scalars_stay_in_unit_interval() {
        let actual = labels(&[
            (Species::Setosa, 5),
            (Species::Versicolor, 5),
            (Species::Virginica, 5),
        ]);
        let predicted = labels(&[(Species::Virginica, 15)]);
        let summary = MetricsSummary::from_labels(&actual, &predicted).unwrap();
        for value in [
            summary.accuracy,
            summary.precision,
            summary.recall,
            summary.f1,
        ] {
            assert!((0.0..=1.0).contains(&value));
        }
    }
}
