//! Datasets: a target collection plus the records to insert into it.
//!
//! Two datasets are built in, one per schema the hospital app has used:
//!
//! - `users`: `{name, specialization, role}` with `role` always `"doctor"`
//! - `doctors`: `{name, specialty}`
//!
//! Any other dataset can be supplied as a JSON file of the same shape as
//! [`Dataset`].

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::record::Record;

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("Failed to read dataset {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Malformed dataset {path}: {source}")]
    Malformed {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Dataset has an empty collection name")]
    EmptyCollection,
    #[error("Unknown built-in dataset {0:?} (expected \"users\" or \"doctors\")")]
    UnknownBuiltin(String),
}

/// Practitioners shared by the built-in datasets:
/// name, lower-case specialization, title-case specialty.
const PRACTITIONERS: [(&str, &str, &str); 10] = [
    ("Dr. John Smith", "general medicine", "General Medicine"),
    ("Dr. Alice Brown", "cardiology", "Cardiology"),
    ("Dr. Priya Patel", "dermatology", "Dermatology"),
    ("Dr. Rajesh Kumar", "orthopedics", "Orthopedics"),
    ("Dr. Emily Chen", "pediatrics", "Pediatrics"),
    ("Dr. Maria Garcia", "gynecology", "Gynecology"),
    ("Dr. David Lee", "neurology", "Neurology"),
    ("Dr. Fatima Noor", "psychiatry", "Psychiatry"),
    ("Dr. Ahmed Hassan", "radiology", "Radiology"),
    ("Dr. Sarah Wilson", "emergency medicine", "Emergency Medicine"),
];

pub const USERS_COLLECTION: &str = "users";
pub const DOCTORS_COLLECTION: &str = "doctors";

/// Records bound for one collection, inserted in list order.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Dataset {
    pub collection: String,
    pub records: Vec<Record>,
}

impl Dataset {
    pub fn new(collection: impl Into<String>, records: Vec<Record>) -> Self {
        Self {
            collection: collection.into(),
            records,
        }
    }

    /// Doctors as user accounts in `users`.
    pub fn users() -> Self {
        let records = PRACTITIONERS
            .iter()
            .map(|(name, specialization, _)| {
                Record::new()
                    .field("name", *name)
                    .field("specialization", *specialization)
                    .field("role", "doctor")
            })
            .collect();
        Self::new(USERS_COLLECTION, records)
    }

    /// Doctors directory in `doctors`.
    pub fn doctors() -> Self {
        let records = PRACTITIONERS
            .iter()
            .map(|(name, _, specialty)| {
                Record::new()
                    .field("name", *name)
                    .field("specialty", *specialty)
            })
            .collect();
        Self::new(DOCTORS_COLLECTION, records)
    }

    /// Looks up a built-in dataset by name.
    pub fn builtin(name: &str) -> Result<Self, DatasetError> {
        match name {
            USERS_COLLECTION => Ok(Self::users()),
            DOCTORS_COLLECTION => Ok(Self::doctors()),
            other => Err(DatasetError::UnknownBuiltin(other.to_string())),
        }
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, DatasetError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| DatasetError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let dataset: Self =
            serde_json::from_str(&contents).map_err(|source| DatasetError::Malformed {
                path: path.to_path_buf(),
                source,
            })?;
        if dataset.collection.trim().is_empty() {
            return Err(DatasetError::EmptyCollection);
        }
        debug!(
            path = %path.display(),
            collection = %dataset.collection,
            records = dataset.records.len(),
            "loaded dataset"
        );
        Ok(dataset)
    }

    /// Retargets the dataset at another collection.
    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Where the dataset for a run comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatasetSource {
    Builtin(String),
    File(PathBuf),
}

impl DatasetSource {
    /// Values with a path separator or a `.json` extension are file paths;
    /// anything else names a built-in dataset.
    pub fn parse(value: &str) -> Self {
        let path = Path::new(value);
        let is_file = value.contains(['/', '\\'])
            || path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_file {
            Self::File(path.to_path_buf())
        } else {
            Self::Builtin(value.to_string())
        }
    }

    pub fn load(&self) -> Result<Dataset, DatasetError> {
        match self {
            Self::Builtin(name) => Dataset::builtin(name),
            Self::File(path) => Dataset::from_json_file(path),
        }
    }
}

impl Default for DatasetSource {
    fn default() -> Self {
        Self::Builtin(USERS_COLLECTION.to_string())
    }
}
