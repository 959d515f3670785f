//! Document database client for the hospital management seeders.
//!
//! [`connect`] authenticates with a service account key and returns a
//! [`FirestoreClient`]. Code that writes documents depends on the
//! [`DocumentStore`] trait so it can run against [`MemoryStore`] instead.

pub mod auth;
pub mod credentials;
pub mod errors;
pub mod firestore;
pub mod memory;
pub mod store;

pub use auth::{AccessToken, TokenProvider, TokenSource};
pub use credentials::ServiceAccountKey;
pub use errors::{AuthenticationError, WriteError};
pub use firestore::{FirestoreClient, FirestoreConfig, connect};
pub use memory::{MemoryStore, StoredDocument};
pub use store::{DocumentId, DocumentStore, Fields};
