//! Configuration for seeding runs.

use docstore::FirestoreConfig;
use std::path::PathBuf;

use crate::dataset::{Dataset, DatasetError, DatasetSource};

pub const DEFAULT_CREDENTIALS_PATH: &str = "serviceAccountKey.json";

/// Settings for one seeding run.
#[derive(Debug, Clone)]
pub struct SeedConfig {
    /// Service account key file.
    pub credentials_path: PathBuf,

    /// Which records to insert.
    pub dataset: DatasetSource,

    /// Target collection, overriding the dataset's own.
    pub collection: Option<String>,

    /// Insert into an in-memory store instead of the database.
    pub dry_run: bool,

    pub firestore: FirestoreConfig,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            credentials_path: PathBuf::from(DEFAULT_CREDENTIALS_PATH),
            dataset: DatasetSource::default(),
            collection: None,
            dry_run: false,
            firestore: FirestoreConfig::default(),
        }
    }
}

impl SeedConfig {
    /// Reads `SEED_CREDENTIALS`, `SEED_DATASET`, `SEED_COLLECTION`,
    /// `SEED_DRY_RUN` and the Firestore variables, using defaults for
    /// anything unset.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        Self {
            credentials_path: get("SEED_CREDENTIALS")
                .map(PathBuf::from)
                .unwrap_or(defaults.credentials_path),
            dataset: get("SEED_DATASET")
                .map(|v| DatasetSource::parse(v.trim()))
                .unwrap_or(defaults.dataset),
            collection: get("SEED_COLLECTION"),
            dry_run: get("SEED_DRY_RUN").is_some_and(|v| is_truthy(&v)),
            firestore: FirestoreConfig::from_env(),
        }
    }

    /// Loads the configured dataset and applies the collection override.
    pub fn load_dataset(&self) -> Result<Dataset, DatasetError> {
        let dataset = self.dataset.load()?;
        Ok(match &self.collection {
            Some(collection) => dataset.with_collection(collection.clone()),
            None => dataset,
        })
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
