#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]

//! Iris classification pipeline: data preparation and model training stages
//! coupled only through a typed artefact layout on disk.

/// Typed artefact layout and JSON persistence.
pub mod artefacts;
/// Iris dataset schema and CSV ingestion.
pub mod dataset;
/// Uniform pipeline error shape.
pub mod error;
/// Classification metrics and confusion matrix.
pub mod metrics;
/// IQR-based outlier repair.
pub mod outliers;
/// Data preparation stage.
pub mod prepare;
/// Confusion-matrix rendering.
pub mod report;
/// Seeded train/test splitting.
pub mod split;
/// Model training and evaluation stage.
pub mod train;
/// Decision tree classifier.
pub mod tree;

pub use artefacts::ArtefactLayout;
pub use dataset::{FeatureColumn, FeatureRow, RawDataset, Species};
pub use error::{ErrorKind, PipelineError};
pub use metrics::{ConfusionMatrix, MetricsSummary};
pub use outliers::{IqrBounds, OutlierRepair};
pub use prepare::DataPreparation;
pub use split::{Partitions, SplitConfig};
pub use train::ModelTraining;
pub use tree::{Classifier, DecisionTreeClassifier, TreeConfig};
