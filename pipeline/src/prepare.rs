use std::path::PathBuf;

use shared_logging::Logger;

use crate::{
    artefacts::ArtefactLayout,
    dataset::{FeatureColumn, RawDataset},
    error::{PipelineError, Result},
    outliers::repair_column,
    split::{train_test_split, Partitions, SplitConfig},
};

/// Data preparation stage: load, repair outliers, split, persist.
///
/// Completes as a unit. Any failure aborts the remaining steps before a
/// single partition file is placed, so the artefact directory is never left
/// half-updated.
#[derive(Debug)]
pub struct DataPreparation {
    raw_path: PathBuf,
    layout: ArtefactLayout,
    split: SplitConfig,
    logger: Option<Logger>,
}

impl DataPreparation {
    /// Creates the stage for a raw CSV path and artefact layout.
    #[must_use]
    pub fn new(raw_path: impl Into<PathBuf>, layout: ArtefactLayout) -> Self {
        Self {
            raw_path: raw_path.into(),
            layout,
            split: SplitConfig::default(),
            logger: None,
        }
    }

    /// Overrides the split policy.
    #[must_use]
    pub fn with_split(mut self, split: SplitConfig) -> Self {
        self.split = split;
        self
    }

    /// Attaches a logger for per-step progress lines.
    #[must_use]
    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Runs the full stage and returns the partitions that were persisted.
    pub fn run(&self) -> Result<Partitions> {
        let mut dataset = RawDataset::load(&self.raw_path)
            .map_err(|err| self.fail("reading raw data", err))?;
        self.info(format!(
            "Data read successfully. Rows: {}, feature columns: {}",
            dataset.len(),
            FeatureColumn::ALL.len()
        ));

        let repair = repair_column(&mut dataset, FeatureColumn::SepalWidth)
            .map_err(|err| self.fail("handling outliers", err))?;
        self.info(format!(
            "Outliers handled for column {}: {} value(s) replaced with median {:.2}",
            FeatureColumn::SepalWidth,
            repair.replaced,
            repair.median
        ));

        let partitions = train_test_split(&dataset, self.split)
            .map_err(|err| self.fail("splitting data", err))?;
        self.info(format!(
            "Data split successfully into train/test ({} train, {} test, seed {})",
            partitions.x_train.len(),
            partitions.x_test.len(),
            self.split.seed
        ));

        self.layout
            .save_partitions(&partitions)
            .map_err(|err| self.fail("saving processed files", err))?;
        self.info(format!(
            "Processed files saved successfully to {}",
            self.layout.processed_dir().display()
        ));
        Ok(partitions)
    }

    fn info(&self, message: String) {
        if let Some(logger) = &self.logger {
            let _ = logger.info(message);
        }
    }

    fn fail(&self, step: &str, err: PipelineError) -> PipelineError {
        if let Some(logger) = &self.logger {
            let _ = logger.error(format!("Error while {step}: {err}"));
        }
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::testutil;
    use std::fs;
    use tempfile::tempdir;

    fn write_raw(dir: &std::path::Path, per_class: usize, seed: u64) -> PathBuf {
        let dataset = testutil::synthetic(per_class, seed);
        let path = dir.join("data.csv");
        fs::write(&path, testutil::to_csv(&dataset)).unwrap();
        path
    }

    #[test]
    fn stage_writes_exactly_four_partition_files() {
        let dir = tempdir().unwrap();
        let raw = write_raw(dir.path(), 50, 17);
        let layout = ArtefactLayout::new(dir.path().join("artifacts"));
        let partitions = DataPreparation::new(&raw, layout.clone()).run().unwrap();
        assert_eq!(partitions.x_train.len(), 120);
        assert_eq!(partitions.x_test.len(), 30);
        let entries = fs::read_dir(layout.processed_dir()).unwrap().count();
        assert_eq!(entries, 4);
    }

    #[test]
    fn reruns_are_byte_identical() {
        let dir = tempdir().unwrap();
        let raw = write_raw(dir.path(), 30, 23);
        let layout = ArtefactLayout::new(dir.path().join("artifacts"));
        let stage = DataPreparation::new(&raw, layout.clone());
        stage.run().unwrap();
        let snapshot: Vec<Vec<u8>> = layout
            .partition_files()
            .iter()
            .map(|(_, path)| fs::read(path).unwrap())
            .collect();
        stage.run().unwrap();
        for ((_, path), before) in layout.partition_files().iter().zip(&snapshot) {
            assert_eq!(&fs::read(path).unwrap(), before);
        }
    }

    #[test]
    fn schema_failure_writes_no_partition_files() {
        let dir = tempdir().unwrap();
        let raw = dir.path().join("data.csv");
        fs::write(
            &raw,
            "Id,SepalLengthCm,SepalWidthCm,PetalLengthCm,Species\n1,5.1,3.5,1.4,Iris-setosa\n",
        )
        .unwrap();
        let layout = ArtefactLayout::new(dir.path().join("artifacts"));
        let err = DataPreparation::new(&raw, layout.clone()).run().unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Schema);
        assert!(!layout.processed_dir().exists());
    }

    #[test]
    fn missing_raw_file_is_a_data_load_error() {
        let dir = tempdir().unwrap();
        let layout = ArtefactLayout::new(dir.path().join("artifacts"));
        let err = DataPreparation::new(dir.path().join("absent.csv"), layout)
            .run()
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::DataLoad);
    }

    #[test]
    fn progress_is_logged_per_step() {
        let dir = tempdir().unwrap();
        let raw = write_raw(dir.path(), 20, 31);
        let layout = ArtefactLayout::new(dir.path().join("artifacts"));
        let logger = Logger::new(dir.path().join("pipeline.log"), false).unwrap();
        DataPreparation::new(&raw, layout)
            .with_logger(logger.clone())
            .run()
            .unwrap();
        let log = fs::read_to_string(logger.path()).unwrap();
        assert!(log.contains("Data read successfully"));
        assert!(log.contains("Outliers handled"));
        assert!(log.contains("Data split successfully"));
        assert!(log.contains("Processed files saved successfully"));
    }
}
