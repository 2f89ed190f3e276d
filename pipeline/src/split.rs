use rand::{seq::SliceRandom, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::{
    dataset::{FeatureRow, RawDataset, Species},
    error::{ErrorKind, PipelineError, Result},
};

/// Split policy: plain random split with a fixed seed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SplitConfig {
    /// Fraction of rows held out for testing.
    pub test_ratio: f64,
    /// RNG seed for the row shuffle.
    pub seed: u64,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            test_ratio: 0.2,
            seed: 42,
        }
    }
}

/// The four containers produced by the train/test split.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Partitions {
    /// Training feature matrix.
    pub x_train: Vec<FeatureRow>,
    /// Test feature matrix.
    pub x_test: Vec<FeatureRow>,
    /// Training target vector.
    pub y_train: Vec<Species>,
    /// Test target vector.
    pub y_test: Vec<Species>,
}

impl Partitions {
    /// Total number of rows across both partitions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.x_train.len() + self.x_test.len()
    }

    /// Whether both partitions are empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.x_train.is_empty() && self.x_test.is_empty()
    }

    /// Checks row alignment and that no class is absent from either side.
    ///
    /// A class entirely missing from train or test makes evaluation
    /// meaningless, so it is surfaced as a data-quality error.
    pub fn validate(&self) -> Result<()> {
        if self.x_train.len() != self.y_train.len() || self.x_test.len() != self.y_test.len() {
            return Err(PipelineError::new(
                ErrorKind::DataQuality,
                "feature and target partitions are not row-aligned",
            ));
        }
        for species in Species::ALL {
            if !self.y_train.contains(&species) {
                return Err(PipelineError::new(
                    ErrorKind::DataQuality,
                    format!("degenerate split: class {species} absent from training partition"),
                ));
            }
            if !self.y_test.contains(&species) {
                return Err(PipelineError::new(
                    ErrorKind::DataQuality,
                    format!("degenerate split: class {species} absent from test partition"),
                ));
            }
        }
        Ok(())
    }
}

/// Splits the dataset into train/test partitions by a seeded row shuffle.
///
/// Identical dataset and config always produce identical partitions.
pub fn train_test_split(dataset: &RawDataset, config: SplitConfig) -> Result<Partitions> {
    if dataset.len() < 2 {
        return Err(PipelineError::new(
            ErrorKind::DataQuality,
            format!(
                "cannot split {} row(s) into train and test partitions",
                dataset.len()
            ),
        ));
    }
    if !(0.0..1.0).contains(&config.test_ratio) || config.test_ratio == 0.0 {
        return Err(PipelineError::new(
            ErrorKind::DataQuality,
            format!("test ratio {} outside (0, 1)", config.test_ratio),
        ));
    }

    let mut indices: Vec<usize> = (0..dataset.len()).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    indices.shuffle(&mut rng);

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let test_len = ((dataset.len() as f64 * config.test_ratio).round() as usize)
        .clamp(1, dataset.len() - 1);
    let (test_idx, train_idx) = indices.split_at(test_len);

    let mut partitions = Partitions {
        x_train: Vec::with_capacity(train_idx.len()),
        x_test: Vec::with_capacity(test_idx.len()),
        y_train: Vec::with_capacity(train_idx.len()),
        y_test: Vec::with_capacity(test_idx.len()),
    };
    for &idx in train_idx {
        partitions.x_train.push(dataset.features[idx]);
        partitions.y_train.push(dataset.species[idx]);
    }
    for &idx in test_idx {
        partitions.x_test.push(dataset.features[idx]);
        partitions.y_test.push(dataset.species[idx]);
    }
    Ok(partitions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::testutil;

    #[test]
    fn split_sizes_match_the_ratio() {
        let dataset = testutil::synthetic(50, 1);
        let partitions = train_test_split(&dataset, SplitConfig::default()).unwrap();
        assert_eq!(partitions.x_train.len(), 120);
        assert_eq!(partitions.x_test.len(), 30);
        assert_eq!(partitions.len(), dataset.len());
    }

    #[test]
    fn split_is_deterministic_for_a_fixed_seed() {
        let dataset = testutil::synthetic(50, 1);
        let first = train_test_split(&dataset, SplitConfig::default()).unwrap();
        let second = train_test_split(&dataset, SplitConfig::default()).unwrap();
        assert_eq!(first, second);
        let other_seed = train_test_split(
            &dataset,
            SplitConfig {
                seed: 43,
                ..SplitConfig::default()
            },
        )
        .unwrap();
        assert_ne!(first, other_seed);
    }

    #[test]
    fn partitions_are_disjoint_and_complete() {
        // Distinct sepal lengths per row make rows uniquely identifiable.
        let mut dataset = testutil::synthetic(10, 2);
        for (idx, row) in dataset.features.iter_mut().enumerate() {
            row.sepal_length_cm = idx as f64;
        }
        let partitions = train_test_split(&dataset, SplitConfig::default()).unwrap();
        let mut seen: Vec<u64> = partitions
            .x_train
            .iter()
            .chain(&partitions.x_test)
            .map(|row| row.sepal_length_cm.to_bits())
            .collect();
        seen.sort_unstable();
        seen.dedup();
        assert_eq!(seen.len(), dataset.len());
    }

    #[test]
    fn degenerate_partition_is_rejected() {
        let dataset = testutil::synthetic(2, 5);
        let row = dataset.features[0];
        let partitions = Partitions {
            x_train: vec![row; 3],
            x_test: vec![row; 3],
            y_train: vec![Species::Setosa; 3],
            y_test: Species::ALL.to_vec(),
        };
        let err = partitions.validate().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DataQuality);
        assert!(err.message().contains("training partition"));
    }

    #[test]
    fn datasets_below_two_rows_are_rejected() {
        let err = train_test_split(&RawDataset::default(), SplitConfig::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DataQuality);

        let mut single = testutil::synthetic(1, 4);
        single.features.truncate(1);
        single.species.truncate(1);
        let err = train_test_split(&single, SplitConfig::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DataQuality);
        assert!(err.message().contains("1 row(s)"));
    }

    #[test]
    fn invalid_ratio_is_rejected() {
        let dataset = testutil::synthetic(5, 9);
        let err = train_test_split(
            &dataset,
            SplitConfig {
                test_ratio: 1.5,
                ..SplitConfig::default()
            },
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DataQuality);
    }
}
