//! Inserting datasets into a document store.

use docstore::{AuthenticationError, DocumentId, DocumentStore, MemoryStore, WriteError};
use std::io::Write;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::SeedConfig;
use crate::dataset::{Dataset, DatasetError};

/// Line printed once every record of a run has been inserted.
pub const CONFIRMATION: &str = "Doctors added to Firestore.";

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("Authentication failed: {0}")]
    Authentication(#[from] AuthenticationError),
    #[error("Dataset error: {0}")]
    Dataset(#[from] DatasetError),
    #[error(
        "Insert {position} into {collection:?} failed with {committed} records already committed: {source}"
    )]
    Write {
        collection: String,
        /// 1-based position of the failing record.
        position: usize,
        committed: usize,
        #[source]
        source: WriteError,
    },
    #[error("Failed to write confirmation: {0}")]
    Output(#[from] std::io::Error),
}

/// Ids of the documents a completed run created, in record order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedReport {
    pub collection: String,
    pub inserted: Vec<DocumentId>,
}

/// Seeds datasets through an injected store handle.
pub struct Seeder<S> {
    store: S,
}

impl<S: DocumentStore> Seeder<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Inserts every record of the dataset, one at a time and in order.
    ///
    /// Stops at the first failed insert. Records inserted before it stay in
    /// the store.
    pub async fn seed(&self, dataset: &Dataset) -> Result<SeedReport, SeedError> {
        info!(
            "Seeding {} records into {}...",
            dataset.len(),
            dataset.collection
        );

        let mut inserted = Vec::with_capacity(dataset.len());
        for (i, record) in dataset.records.iter().enumerate() {
            let id = self
                .store
                .create_record(&dataset.collection, record.fields())
                .await
                .map_err(|source| SeedError::Write {
                    collection: dataset.collection.clone(),
                    position: i + 1,
                    committed: inserted.len(),
                    source,
                })?;
            debug!(collection = %dataset.collection, %id, "inserted record {}", i + 1);
            inserted.push(id);
        }

        info!("Seeded {} records into {}", inserted.len(), dataset.collection);
        Ok(SeedReport {
            collection: dataset.collection.clone(),
            inserted,
        })
    }

    /// Seeds the dataset, then writes [`CONFIRMATION`] to `out`.
    ///
    /// Nothing is written when any insert fails.
    pub async fn run<W: Write>(
        &self,
        dataset: &Dataset,
        out: &mut W,
    ) -> Result<SeedReport, SeedError> {
        let report = self.seed(dataset).await?;
        writeln!(out, "{CONFIRMATION}")?;
        out.flush()?;
        Ok(report)
    }
}

/// Runs a whole seeding pass as configured: loads the dataset, connects
/// (unless dry-running), seeds and confirms on `out`.
///
/// Authentication happens before the first insert, so a rejected credential
/// leaves the database untouched.
pub async fn seed_from_config<W: Write>(
    config: &SeedConfig,
    out: &mut W,
) -> Result<SeedReport, SeedError> {
    let dataset = config.load_dataset()?;

    if config.dry_run {
        info!("Dry run: records go to an in-memory store");
        let seeder = Seeder::new(MemoryStore::new());
        let report = seeder.run(&dataset, out).await?;
        for doc in seeder.store().documents() {
            info!("  {}/{}: {:?}", doc.collection, doc.id, doc.fields);
        }
        return Ok(report);
    }

    let client = docstore::connect(&config.credentials_path, &config.firestore).await?;
    info!("Connected to project {}", client.project_id());

    Seeder::new(client).run(&dataset, out).await
}
