use shared_logging::Logger;

use crate::{
    artefacts::{save_json, save_text, ArtefactLayout},
    error::{PipelineError, Result},
    metrics::MetricsSummary,
    report::render_confusion_matrix,
    tree::{Classifier, DecisionTreeClassifier, TreeConfig},
};

/// Model training and evaluation stage.
///
/// Hard-wired to the partitions written by the data preparation stage; the
/// artefact layout is its only input. Fully deterministic: rerunning with
/// unchanged partitions reproduces identical metrics.
#[derive(Debug)]
pub struct ModelTraining {
    layout: ArtefactLayout,
    config: TreeConfig,
    logger: Option<Logger>,
}

impl ModelTraining {
    /// Creates the stage over an artefact layout.
    #[must_use]
    pub fn new(layout: ArtefactLayout) -> Self {
        Self {
            layout,
            config: TreeConfig::default(),
            logger: None,
        }
    }

    /// Overrides the tree hyperparameters.
    #[must_use]
    pub fn with_config(mut self, config: TreeConfig) -> Self {
        self.config = config;
        self
    }

    /// Attaches a logger for per-step progress lines.
    #[must_use]
    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Runs the full stage and returns the metrics summary.
    pub fn run(&self) -> Result<MetricsSummary> {
        let partitions = self
            .layout
            .load_partitions()
            .map_err(|err| self.fail("loading processed data", err))?;
        partitions
            .validate()
            .map_err(|err| self.fail("validating partitions", err))?;
        self.info(format!(
            "Processed data loaded successfully ({} train rows, {} test rows)",
            partitions.x_train.len(),
            partitions.x_test.len()
        ));

        let mut model = DecisionTreeClassifier::new(self.config);
        model
            .fit(&partitions.x_train, &partitions.y_train)
            .map_err(|err| self.fail("training model", err))?;
        save_json(self.layout.model(), &model)
            .map_err(|err| self.fail("saving model", err))?;
        self.info(format!(
            "Model trained and saved successfully to {}",
            self.layout.model().display()
        ));

        let predictions = model
            .predict(&partitions.x_test)
            .map_err(|err| self.fail("predicting on test data", err))?;
        let summary = MetricsSummary::from_labels(&partitions.y_test, &predictions)
            .map_err(|err| self.fail("evaluating model", err))?;
        for line in summary.log_lines() {
            self.info(line);
        }

        save_text(
            self.layout.confusion_matrix(),
            &render_confusion_matrix(&summary.confusion_matrix),
        )
        .map_err(|err| self.fail("saving confusion matrix", err))?;
        save_json(self.layout.metrics(), &summary)
            .map_err(|err| self.fail("saving metrics summary", err))?;
        self.info(format!(
            "Confusion matrix saved successfully to {}",
            self.layout.confusion_matrix().display()
        ));
        Ok(summary)
    }

    fn info(&self, message: impl Into<String>) {
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
    use crate::{
        dataset::{testutil, Species},
        error::ErrorKind,
        prepare::DataPreparation,
    };
    use std::fs;
    use tempfile::tempdir;

    fn prepared_layout(dir: &std::path::Path, per_class: usize, seed: u64) -> ArtefactLayout {
        let dataset = testutil::synthetic(per_class, seed);
        let raw = dir.join("data.csv");
        fs::write(&raw, testutil::to_csv(&dataset)).unwrap();
        let layout = ArtefactLayout::new(dir.join("artifacts"));
        DataPreparation::new(&raw, layout.clone()).run().unwrap();
        layout
    }

    #[test]
    fn end_to_end_produces_model_and_metrics() {
        let dir = tempdir().unwrap();
        let layout = prepared_layout(dir.path(), 50, 42);
        let summary = ModelTraining::new(layout.clone()).run().unwrap();

        for value in [
            summary.accuracy,
            summary.precision,
            summary.recall,
            summary.f1,
        ] {
            assert!((0.0..=1.0).contains(&value));
        }
        assert!(layout.model().exists());
        assert!(layout.confusion_matrix().exists());
        assert!(layout.metrics().exists());

        // Confusion-matrix row sums equal the per-class counts of y_test.
        let partitions = layout.load_partitions().unwrap();
        let row_sums = summary.confusion_matrix.row_sums();
        for species in Species::ALL {
            let support = partitions
                .y_test
                .iter()
                .filter(|s| **s == species)
                .count();
            assert_eq!(row_sums[species.index()], support);
        }
        assert_eq!(summary.confusion_matrix.total(), 30);
    }

    #[test]
    fn rerun_reproduces_identical_metrics() {
        let dir = tempdir().unwrap();
        let layout = prepared_layout(dir.path(), 40, 9);
        let first = ModelTraining::new(layout.clone()).run().unwrap();
        let second = ModelTraining::new(layout).run().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn missing_partition_fails_before_fitting() {
        let dir = tempdir().unwrap();
        let layout = prepared_layout(dir.path(), 20, 3);
        fs::remove_file(layout.partition_files()[1].1.clone()).unwrap();
        let err = ModelTraining::new(layout.clone()).run().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingArtefact);
        assert!(err.message().contains("X_test"));
        // Nothing was fitted or persisted.
        assert!(!layout.model().exists());
    }

    #[test]
    fn corrupt_partition_is_a_persistence_error() {
        let dir = tempdir().unwrap();
        let layout = prepared_layout(dir.path(), 20, 6);
        fs::write(layout.partition_files()[2].1.clone(), b"not json").unwrap();
        let err = ModelTraining::new(layout).run().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Persistence);
    }

    #[test]
    fn saved_model_predicts_like_the_fitted_one() {
        let dir = tempdir().unwrap();
        let layout = prepared_layout(dir.path(), 30, 12);
        ModelTraining::new(layout.clone()).run().unwrap();
        let model: DecisionTreeClassifier =
            crate::artefacts::load_json(layout.model()).unwrap();
        let partitions = layout.load_partitions().unwrap();
        let predictions = model.predict(&partitions.x_test).unwrap();
        assert_eq!(predictions.len(), partitions.y_test.len());
    }
}
