use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{de::DeserializeOwned, Serialize};

use crate::{
    error::{ErrorKind, PipelineError, Result},
    split::Partitions,
};

/// Typed handoff describing where every pipeline artefact lives.
///
/// The two stages share no in-process state; this layout is the whole
/// contract between them (and with the external serving collaborator).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtefactLayout {
    root: PathBuf,
}

impl Default for ArtefactLayout {
    fn default() -> Self {
        Self::new("artifacts")
    }
}

impl ArtefactLayout {
    /// Creates a layout rooted at the given directory.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root artefact directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Default location of the raw input CSV.
    #[must_use]
    pub fn raw_data(&self) -> PathBuf {
        self.root.join("raw").join("data.csv")
    }

    /// Directory holding the four serialized partitions.
    #[must_use]
    pub fn processed_dir(&self) -> PathBuf {
        self.root.join("processed")
    }

    /// Directory holding the model and its evaluation artefacts.
    #[must_use]
    pub fn models_dir(&self) -> PathBuf {
        self.root.join("models")
    }

    /// Pipeline log file.
    #[must_use]
    pub fn log_file(&self) -> PathBuf {
        self.root.join("logs").join("pipeline.log")
    }

    /// Serialized fitted classifier.
    #[must_use]
    pub fn model(&self) -> PathBuf {
        self.models_dir().join("model.json")
    }

    /// Rendered confusion-matrix image.
    #[must_use]
    pub fn confusion_matrix(&self) -> PathBuf {
        self.models_dir().join("confusion_matrix.svg")
    }

    /// Metrics summary report.
    #[must_use]
    pub fn metrics(&self) -> PathBuf {
        self.models_dir().join("metrics.json")
    }

    /// The four partition files as `(name, path)` pairs, in fixed order.
    #[must_use]
    pub fn partition_files(&self) -> [(&'static str, PathBuf); 4] {
        let dir = self.processed_dir();
        [
            ("X_train", dir.join("X_train.json")),
            ("X_test", dir.join("X_test.json")),
            ("y_train", dir.join("y_train.json")),
            ("y_test", dir.join("y_test.json")),
        ]
    }

    /// Persists all four partitions.
    ///
    /// Every file is staged as `<name>.tmp` first and only renamed into
    /// place once all four writes succeeded, so a failure never leaves a
    /// partial partition set behind.
    pub fn save_partitions(&self, partitions: &Partitions) -> Result<()> {
        let [(_, x_train), (_, x_test), (_, y_train), (_, y_test)] = self.partition_files();
        let staged = [
            stage_json(&x_train, &partitions.x_train)?,
            stage_json(&x_test, &partitions.x_test)?,
            stage_json(&y_train, &partitions.y_train)?,
            stage_json(&y_test, &partitions.y_test)?,
        ];
        let finals = [x_train, x_test, y_train, y_test];
        for (tmp, path) in staged.iter().zip(&finals) {
            fs::rename(tmp, path).map_err(|err| {
                PipelineError::with_cause(
                    ErrorKind::Persistence,
                    format!("failed to place partition file {}", path.display()),
                    err,
                )
            })?;
        }
        Ok(())
    }

    /// Loads all four partitions, checking completeness first.
    ///
    /// Fails with a missing-artefact error naming every absent file before
    /// reading anything.
    pub fn load_partitions(&self) -> Result<Partitions> {
        let files = self.partition_files();
        let missing: Vec<String> = files
            .iter()
            .filter(|(_, path)| !path.exists())
            .map(|(name, _)| (*name).to_string())
            .collect();
        if !missing.is_empty() {
            return Err(PipelineError::new(
                ErrorKind::MissingArtefact,
                format!(
                    "partition files missing from {}: {}",
                    self.processed_dir().display(),
                    missing.join(", ")
                ),
            ));
        }
        let [(_, x_train), (_, x_test), (_, y_train), (_, y_test)] = files;
        Ok(Partitions {
            x_train: load_json(&x_train)?,
            x_test: load_json(&x_test)?,
            y_train: load_json(&y_train)?,
            y_test: load_json(&y_test)?,
        })
    }
}

fn stage_json<T: Serialize>(path: &Path, value: &T) -> Result<PathBuf> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|err| {
            PipelineError::with_cause(
                ErrorKind::Persistence,
                format!("failed to create artefact directory {}", parent.display()),
                err,
            )
        })?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    let data = serde_json::to_vec_pretty(value).map_err(|err| {
        PipelineError::with_cause(
            ErrorKind::Persistence,
            format!("failed to serialize artefact {}", path.display()),
            err,
        )
    })?;
    fs::write(&tmp, data).map_err(|err| {
        PipelineError::with_cause(
            ErrorKind::Persistence,
            format!("failed to write artefact {}", tmp.display()),
            err,
        )
    })?;
    Ok(tmp)
}

/// Serializes a value as pretty JSON, staged and atomically renamed into place.
pub fn save_json<T: Serialize>(path: impl AsRef<Path>, value: &T) -> Result<()> {
    let path = path.as_ref();
    let tmp = stage_json(path, value)?;
    fs::rename(&tmp, path).map_err(|err| {
        PipelineError::with_cause(
            ErrorKind::Persistence,
            format!("failed to place artefact {}", path.display()),
            err,
        )
    })
}

/// Deserializes a JSON artefact written by [`save_json`].
pub fn load_json<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(PipelineError::new(
            ErrorKind::MissingArtefact,
            format!("artefact {} does not exist", path.display()),
        ));
    }
    let data = fs::read(path).map_err(|err| {
        PipelineError::with_cause(
            ErrorKind::Persistence,
            format!("failed to read artefact {}", path.display()),
            err,
        )
    })?;
    serde_json::from_slice(&data).map_err(|err| {
        PipelineError::with_cause(
            ErrorKind::Persistence,
            format!("failed to parse artefact {}", path.display()),
            err,
        )
    })
}

/// Writes a text artefact (such as the rendered confusion matrix) in place.
pub fn save_text(path: impl AsRef<Path>, contents: &str) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|err| {
            PipelineError::with_cause(
                ErrorKind::Persistence,
                format!("failed to create artefact directory {}", parent.display()),
                err,
            )
        })?;
    }
    fs::write(path, contents).map_err(|err| {
        PipelineError::with_cause(
            ErrorKind::Persistence,
            format!("failed to write artefact {}", path.display()),
            err,
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dataset::testutil,
        split::{train_test_split, SplitConfig},
    };
    use tempfile::tempdir;

    fn sample_partitions() -> Partitions {
        let dataset = testutil::synthetic(10, 4);
        train_test_split(&dataset, SplitConfig::default()).unwrap()
    }

    #[test]
    fn partitions_round_trip() {
        let dir = tempdir().unwrap();
        let layout = ArtefactLayout::new(dir.path());
        let partitions = sample_partitions();
        layout.save_partitions(&partitions).unwrap();
        let loaded = layout.load_partitions().unwrap();
        assert_eq!(partitions, loaded);
    }

    #[test]
    fn save_is_idempotent_and_byte_identical() {
        let dir = tempdir().unwrap();
        let layout = ArtefactLayout::new(dir.path());
        let partitions = sample_partitions();
        layout.save_partitions(&partitions).unwrap();
        let first = fs::read(layout.partition_files()[0].1.clone()).unwrap();
        layout.save_partitions(&partitions).unwrap();
        let second = fs::read(layout.partition_files()[0].1.clone()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn incomplete_partition_set_is_a_missing_artefact_error() {
        let dir = tempdir().unwrap();
        let layout = ArtefactLayout::new(dir.path());
        layout.save_partitions(&sample_partitions()).unwrap();
        fs::remove_file(layout.partition_files()[3].1.clone()).unwrap();
        let err = layout.load_partitions().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingArtefact);
        assert!(err.message().contains("y_test"));
    }

    #[test]
    fn no_temp_files_remain_after_save() {
        let dir = tempdir().unwrap();
        let layout = ArtefactLayout::new(dir.path());
        layout.save_partitions(&sample_partitions()).unwrap();
        let leftovers: Vec<_> = fs::read_dir(layout.processed_dir())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .filter(|name| name.to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn layout_paths_are_stable() {
        let layout = ArtefactLayout::default();
        assert_eq!(
            layout.model(),
            PathBuf::from("artifacts").join("models").join("model.json")
        );
        assert_eq!(
            layout.partition_files()[0].1,
            PathBuf::from("artifacts")
                .join("processed")
                .join("X_train.json")
        );
    }
}
