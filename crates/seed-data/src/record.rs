//! Doctor records.

use docstore::Fields;
use serde::Deserialize;

/// One practitioner as a flat mapping of string fields.
///
/// The schema is whatever the dataset says it is; no field is required.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Record(Fields);

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a field, replacing any previous value under the same name.
    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn fields(&self) -> &Fields {
        &self.0
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl From<Fields> for Record {
    fn from(fields: Fields) -> Self {
        Self(fields)
    }
}

impl<K: Into<String>, V: Into<String>, const N: usize> From<[(K, V); N]> for Record {
    fn from(pairs: [(K, V); N]) -> Self {
        Self(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}
