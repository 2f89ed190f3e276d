use std::{fmt, fs, path::Path, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::{ErrorKind, PipelineError, Result};

/// The three known Iris species, in fixed label order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Species {
    /// Iris setosa.
    #[serde(rename = "Iris-setosa")]
    Setosa,
    /// Iris versicolor.
    #[serde(rename = "Iris-versicolor")]
    Versicolor,
    /// Iris virginica.
    #[serde(rename = "Iris-virginica")]
    Virginica,
}

impl Species {
    /// All species in the fixed order used by metrics and the confusion matrix.
    pub const ALL: [Self; 3] = [Self::Setosa, Self::Versicolor, Self::Virginica];

    /// Class index within [`Species::ALL`].
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Setosa => 0,
            Self::Versicolor => 1,
            Self::Virginica => 2,
        }
    }

    /// Species from a class index, if in range.
    #[must_use]
    pub const fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Self::Setosa),
            1 => Some(Self::Versicolor),
            2 => Some(Self::Virginica),
            _ => None,
        }
    }

    /// Canonical label string as it appears in the raw CSV.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Setosa => "Iris-setosa",
            Self::Versicolor => "Iris-versicolor",
            Self::Virginica => "Iris-virginica",
        }
    }
}

impl fmt::Display for Species {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Species {
    type Err = PipelineError;

    fn from_str(value: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|species| species.label() == value)
            .ok_or_else(|| {
                PipelineError::new(
                    ErrorKind::DataQuality,
                    format!("unknown species label {value:?}"),
                )
            })
    }
}

/// The four numeric feature columns, in fixed order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureColumn {
    /// `SepalLengthCm`.
    SepalLength,
    /// `SepalWidthCm`.
    SepalWidth,
    /// `PetalLengthCm`.
    PetalLength,
    /// `PetalWidthCm`.
    PetalWidth,
}

impl FeatureColumn {
    /// All feature columns in schema order.
    pub const ALL: [Self; 4] = [
        Self::SepalLength,
        Self::SepalWidth,
        Self::PetalLength,
        Self::PetalWidth,
    ];

    /// Column name as it appears in the CSV header.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::SepalLength => "SepalLengthCm",
            Self::SepalWidth => "SepalWidthCm",
            Self::PetalLength => "PetalLengthCm",
            Self::PetalWidth => "PetalWidthCm",
        }
    }
}

impl fmt::Display for FeatureColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One row of the feature matrix, columns in schema order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    /// `SepalLengthCm` value.
    #[serde(rename = "SepalLengthCm")]
    pub sepal_length_cm: f64,
    /// `SepalWidthCm` value.
    #[serde(rename = "SepalWidthCm")]
    pub sepal_width_cm: f64,
    /// `PetalLengthCm` value.
    #[serde(rename = "PetalLengthCm")]
    pub petal_length_cm: f64,
    /// `PetalWidthCm` value.
    #[serde(rename = "PetalWidthCm")]
    pub petal_width_cm: f64,
}

impl FeatureRow {
    /// Reads one column.
    #[must_use]
    pub const fn get(&self, column: FeatureColumn) -> f64 {
        match column {
            FeatureColumn::SepalLength => self.sepal_length_cm,
            FeatureColumn::SepalWidth => self.sepal_width_cm,
            FeatureColumn::PetalLength => self.petal_length_cm,
            FeatureColumn::PetalWidth => self.petal_width_cm,
        }
    }

    /// Writes one column.
    pub fn set(&mut self, column: FeatureColumn, value: f64) {
        match column {
            FeatureColumn::SepalLength => self.sepal_length_cm = value,
            FeatureColumn::SepalWidth => self.sepal_width_cm = value,
            FeatureColumn::PetalLength => self.petal_length_cm = value,
            FeatureColumn::PetalWidth => self.petal_width_cm = value,
        }
    }

    /// Values in schema order.
    #[must_use]
    pub const fn as_array(&self) -> [f64; 4] {
        [
            self.sepal_length_cm,
            self.sepal_width_cm,
            self.petal_length_cm,
            self.petal_width_cm,
        ]
    }
}

#[derive(Debug, Deserialize)]
struct CsvRecord {
    #[serde(rename = "Id")]
    #[allow(dead_code)]
    id: u64,
    #[serde(rename = "SepalLengthCm")]
    sepal_length_cm: f64,
    #[serde(rename = "SepalWidthCm")]
    sepal_width_cm: f64,
    #[serde(rename = "PetalLengthCm")]
    petal_length_cm: f64,
    #[serde(rename = "PetalWidthCm")]
    petal_width_cm: f64,
    #[serde(rename = "Species")]
    species: String,
}

/// In-memory raw dataset: feature matrix rows aligned with species labels.
///
/// The identifier column is validated on load and dropped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawDataset {
    /// Feature rows, aligned 1:1 with `species`.
    pub features: Vec<FeatureRow>,
    /// Species labels.
    pub species: Vec<Species>,
}

impl RawDataset {
    const EXPECTED_HEADERS: [&'static str; 6] = [
        "Id",
        "SepalLengthCm",
        "SepalWidthCm",
        "PetalLengthCm",
        "PetalWidthCm",
        "Species",
    ];

    /// Loads the dataset from a CSV file, validating the schema.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|err| {
            PipelineError::with_cause(
                ErrorKind::DataLoad,
                format!("failed to read data file {}", path.display()),
                err,
            )
        })?;
        if contents.trim().is_empty() {
            return Err(PipelineError::new(
                ErrorKind::DataLoad,
                format!("data file {} is empty", path.display()),
            ));
        }
        Self::from_csv(&contents)
    }

    /// Parses CSV text with a header row into a dataset.
    pub fn from_csv(contents: &str) -> Result<Self> {
        let mut reader = csv::Reader::from_reader(contents.as_bytes());
        let headers = reader.headers().map_err(|err| {
            PipelineError::with_cause(ErrorKind::DataLoad, "failed to read CSV header", err)
        })?;
        for expected in Self::EXPECTED_HEADERS {
            if !headers.iter().any(|header| header == expected) {
                return Err(PipelineError::new(
                    ErrorKind::Schema,
                    format!("missing column {expected:?} in CSV header"),
                ));
            }
        }

        let mut features = Vec::new();
        let mut species = Vec::new();
        for (row_idx, record) in reader.deserialize::<CsvRecord>().enumerate() {
            let record = record.map_err(|err| {
                PipelineError::with_cause(
                    ErrorKind::Schema,
                    format!("malformed CSV record at data row {}", row_idx + 1),
                    err,
                )
            })?;
            let row = FeatureRow {
                sepal_length_cm: record.sepal_length_cm,
                sepal_width_cm: record.sepal_width_cm,
                petal_length_cm: record.petal_length_cm,
                petal_width_cm: record.petal_width_cm,
            };
            if row.as_array().iter().any(|value| !value.is_finite()) {
                return Err(PipelineError::new(
                    ErrorKind::DataQuality,
                    format!("non-finite feature value at data row {}", row_idx + 1),
                ));
            }
            features.push(row);
            species.push(record.species.parse()?);
        }

        if features.is_empty() {
            return Err(PipelineError::new(
                ErrorKind::DataLoad,
                "CSV contains a header but no data rows",
            ));
        }
        Ok(Self { features, species })
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Whether the dataset holds no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Copies one feature column out as a vector.
    #[must_use]
    pub fn column(&self, column: FeatureColumn) -> Vec<f64> {
        self.features.iter().map(|row| row.get(column)).collect()
    }

    /// Overwrites one feature column from a vector of equal length.
    pub fn set_column(&mut self, column: FeatureColumn, values: &[f64]) -> Result<()> {
        if values.len() != self.features.len() {
            return Err(PipelineError::new(
                ErrorKind::DataQuality,
                format!(
                    "column {column} length {} does not match row count {}",
                    values.len(),
                    self.features.len()
                ),
            ));
        }
        for (row, value) in self.features.iter_mut().zip(values) {
            row.set(column, *value);
        }
        Ok(())
    }
}
