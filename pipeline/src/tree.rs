use serde::{Deserialize, Serialize};

use crate::{
    dataset::{FeatureRow, Species},
    error::{ErrorKind, PipelineError, Result},
};

/// Seam between the training stage and the estimator.
///
/// Anything satisfying this contract can replace the decision tree without
/// touching the rest of the pipeline.
pub trait Classifier {
    /// Fits the estimator on aligned features and targets.
    fn fit(&mut self, features: &[FeatureRow], targets: &[Species]) -> Result<()>;

    /// Predicts a species for every feature row.
    fn predict(&self, features: &[FeatureRow]) -> Result<Vec<Species>>;
}

/// Impurity criterion for split selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SplitCriterion {
    /// Gini impurity: `1 - sum(p_i^2)`.
    Gini,
    /// Shannon entropy.
    Entropy,
}

impl SplitCriterion {
    /// Impurity of a node given its per-class counts.
    #[must_use]
    pub fn compute(self, counts: &[usize; 3]) -> f64 {
        let total: usize = counts.iter().sum();
        if total == 0 {
            return 0.0;
        }
        let total = total as f64;
        match self {
            Self::Gini => {
                let sum_sq: f64 = counts
                    .iter()
                    .map(|&count| {
                        let p = count as f64 / total;
                        p * p
                    })
                    .sum();
                1.0 - sum_sq
            }
            Self::Entropy => counts
                .iter()
                .filter(|&&count| count > 0)
                .map(|&count| {
                    let p = count as f64 / total;
                    -p * p.ln()
                })
                .sum(),
        }
    }
}

/// Decision tree hyperparameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeConfig {
    /// Maximum tree depth.
    pub max_depth: usize,
    /// Minimum samples required to attempt a split.
    pub min_samples_split: usize,
    /// Minimum samples required in each child.
    pub min_samples_leaf: usize,
    /// Split criterion.
    pub criterion: SplitCriterion,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            max_depth: 30,
            min_samples_split: 2,
            min_samples_leaf: 1,
            criterion: SplitCriterion::Gini,
        }
    }
}

/// A node in the fitted tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Node {
    /// Internal split: left holds `feature <= threshold`.
    Internal {
        /// Index into the fixed feature order.
        feature_idx: usize,
        /// Split threshold (midpoint between adjacent observed values).
        threshold: f64,
        /// Subtree for rows at or below the threshold.
        left: Box<Node>,
        /// Subtree for rows above the threshold.
        right: Box<Node>,
    },
    /// Leaf holding the majority class of its training rows.
    Leaf {
        /// Predicted species.
        species: Species,
        /// Per-class training counts that reached this leaf.
        counts: [usize; 3],
    },
}

impl Node {
    fn predict(&self, features: &[f64; 4]) -> Species {
        match self {
            Self::Internal {
                feature_idx,
                threshold,
                left,
                right,
            } => {
                if features[*feature_idx] <= *threshold {
                    left.predict(features)
                } else {
                    right.predict(features)
                }
            }
            Self::Leaf { species, .. } => *species,
        }
    }

    /// Number of nodes in the subtree.
    #[must_use]
    pub fn count_nodes(&self) -> usize {
        match self {
            Self::Internal { left, right, .. } => 1 + left.count_nodes() + right.count_nodes(),
            Self::Leaf { .. } => 1,
        }
    }

    /// Depth of the subtree (0 for a leaf).
    #[must_use]
    pub fn depth(&self) -> usize {
        match self {
            Self::Internal { left, right, .. } => 1 + left.depth().max(right.depth()),
            Self::Leaf { .. } => 0,
        }
    }
}

/// CART-style decision tree over the four Iris features.
///
/// Split selection is fully deterministic: features are scanned in schema
/// order, candidate thresholds in ascending order, and a new best split must
/// strictly improve the gain. Refitting identical data yields an identical
/// tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTreeClassifier {
    root: Option<Node>,
    config: TreeConfig,
}

impl DecisionTreeClassifier {
    /// Creates an unfitted tree.
    #[must_use]
    pub const fn new(config: TreeConfig) -> Self {
        Self { root: None, config }
    }

    /// The hyperparameters the tree was created with.
    #[must_use]
    pub const fn config(&self) -> &TreeConfig {
        &self.config
    }

    /// Whether `fit` has been called successfully.
    #[must_use]
    pub const fn is_fitted(&self) -> bool {
        self.root.is_some()
    }

    /// Fitted root node, if any.
    #[must_use]
    pub const fn root(&self) -> Option<&Node> {
        self.root.as_ref()
    }

    /// Predicts a single feature row.
    pub fn predict_one(&self, row: &FeatureRow) -> Result<Species> {
        self.root.as_ref().map_or_else(
            || {
                Err(PipelineError::new(
                    ErrorKind::Training,
                    "predict called on an unfitted classifier",
                ))
            },
            |root| Ok(root.predict(&row.as_array())),
        )
    }

    fn build(
        &self,
        features: &[[f64; 4]],
        targets: &[usize],
        indices: &[usize],
        depth: usize,
    ) -> Node {
        let counts = class_counts(targets, indices);
        let should_stop = depth >= self.config.max_depth
            || indices.len() < self.config.min_samples_split
            || is_pure(&counts);
        if should_stop {
            return leaf(counts);
        }

        let Some((feature_idx, threshold)) = self.find_best_split(features, targets, indices)
        else {
            return leaf(counts);
        };
        let (left_idx, right_idx) = split_indices(features, indices, feature_idx, threshold);
        if left_idx.len() < self.config.min_samples_leaf
            || right_idx.len() < self.config.min_samples_leaf
        {
            return leaf(counts);
        }

        let left = Box::new(self.build(features, targets, &left_idx, depth + 1));
        let right = Box::new(self.build(features, targets, &right_idx, depth + 1));
        Node::Internal {
            feature_idx,
            threshold,
            left,
            right,
        }
    }

    fn find_best_split(
        &self,
        features: &[[f64; 4]],
        targets: &[usize],
        indices: &[usize],
    ) -> Option<(usize, f64)> {
        let parent_counts = class_counts(targets, indices);
        let parent_impurity = self.config.criterion.compute(&parent_counts);
        let total = indices.len() as f64;

        let mut best: Option<(usize, f64)> = None;
        let mut best_gain = 0.0f64;

        for feature_idx in 0..4 {
            let mut values: Vec<f64> = indices.iter().map(|&i| features[i][feature_idx]).collect();
            values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
            values.dedup();

            for pair in values.windows(2) {
                let threshold = (pair[0] + pair[1]) / 2.0;
                let (left_idx, right_idx) =
                    split_indices(features, indices, feature_idx, threshold);
                if left_idx.is_empty() || right_idx.is_empty() {
                    continue;
                }
                let left_counts = class_counts(targets, &left_idx);
                let right_counts = class_counts(targets, &right_idx);
                let weighted = (left_idx.len() as f64 / total)
                    * self.config.criterion.compute(&left_counts)
                    + (right_idx.len() as f64 / total)
                        * self.config.criterion.compute(&right_counts);
                let gain = parent_impurity - weighted;
                if gain > best_gain {
                    best_gain = gain;
                    best = Some((feature_idx, threshold));
                }
            }
        }
        best
    }
}

impl Classifier for DecisionTreeClassifier {
    fn fit(&mut self, features: &[FeatureRow], targets: &[Species]) -> Result<()> {
        if features.is_empty() {
            return Err(PipelineError::new(
                ErrorKind::Training,
                "cannot fit on an empty training partition",
            ));
        }
        if features.len() != targets.len() {
            return Err(PipelineError::new(
                ErrorKind::Training,
                format!(
                    "feature rows ({}) and targets ({}) are misaligned",
                    features.len(),
                    targets.len()
                ),
            ));
        }
        let matrix: Vec<[f64; 4]> = features.iter().map(FeatureRow::as_array).collect();
        let labels: Vec<usize> = targets.iter().map(|species| species.index()).collect();
        let indices: Vec<usize> = (0..matrix.len()).collect();
        self.root = Some(self.build(&matrix, &labels, &indices, 0));
        Ok(())
    }

    fn predict(&self, features: &[FeatureRow]) -> Result<Vec<Species>> {
        features.iter().map(|row| self.predict_one(row)).collect()
    }
}

impl Default for DecisionTreeClassifier {
    fn default() -> Self {
        Self::new(TreeConfig::default())
    }
}

fn class_counts(targets: &[usize], indices: &[usize]) -> [usize; 3] {
    let mut counts = [0usize; 3];
    for &idx in indices {
        counts[targets[idx]] += 1;
    }
    counts
}

fn is_pure(counts: &[usize; 3]) -> bool {
    counts.iter().filter(|&&count| count > 0).count() <= 1
}

fn leaf(counts: [usize; 3]) -> Node {
    // Majority class; ties resolve to the lowest class index.
    let majority = counts
        .iter()
        .enumerate()
        .max_by(|(ia, ca), (ib, cb)| ca.cmp(cb).then(ib.cmp(ia)))
        .map_or(0, |(idx, _)| idx);
    let species = Species::from_index(majority).unwrap_or(Species::Setosa);
    Node::Leaf { species, counts }
}

fn split_indices(
    features: &[[f64; 4]],
    indices: &[usize],
    feature_idx: usize,
    threshold: f64,
) -> (Vec<usize>, Vec<usize>) {
    let mut left = Vec::new();
    let mut right = Vec::new();
    for &idx in indices {
        if features[idx][feature_idx] <= threshold {
            left.push(idx);
        } else {
            right.push(idx);
        }
    }
    (left, right)
}
