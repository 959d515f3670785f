use async_trait::async_trait;
use rand::Rng;
use std::collections::BTreeMap;
use std::fmt;

use crate::errors::WriteError;

/// Flat string fields of one document.
pub type Fields = BTreeMap<String, String>;

/// Opaque identifier assigned to a created document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentId(pub String);

impl DocumentId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

const AUTO_ID_CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
const AUTO_ID_LEN: usize = 20;

/// Generates a 20 character alphanumeric document id, matching the ids
/// Firestore client libraries create for `add()`.
pub fn auto_id(rng: &mut impl Rng) -> DocumentId {
    let id = (0..AUTO_ID_LEN)
        .map(|_| AUTO_ID_CHARS[rng.gen_range(0..AUTO_ID_CHARS.len())] as char)
        .collect();
    DocumentId(id)
}

/// A document database that can append records to a collection.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Creates one document with the given fields in `collection`.
    async fn create_record(&self, collection: &str, fields: &Fields)
    -> Result<DocumentId, WriteError>;
}
