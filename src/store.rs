use std::collections::BTreeMap;
use std::io::Read;

use async_trait::async_trait;

use crate::models::{Collection, Record, TimeWindow};

#[derive(Debug, thiserror::Error)]
pub enum DataSourceError {
    #[error("query against {collection} failed: {source}")]
    Query {
        collection: Collection,
        #[source]
        source: sqlx::Error,
    },
    #[error("malformed {collection} record: {source}")]
    Decode {
        collection: Collection,
        #[source]
        source: serde_json::Error,
    },
}

impl DataSourceError {
    pub fn collection(&self) -> Collection {
        match self {
            DataSourceError::Query { collection, .. } | DataSourceError::Decode { collection, .. } => {
                *collection
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordQuery {
    pub window: TimeWindow,
    pub approved_only: bool,
}

impl RecordQuery {
    pub fn in_window(window: TimeWindow) -> Self {
        Self {
            window,
            approved_only: false,
        }
    }

    pub fn approved(window: TimeWindow) -> Self {
        Self {
            window,
            approved_only: true,
        }
    }

    pub fn matches(&self, record: &Record) -> bool {
        self.window.contains(record.created_at) && (!self.approved_only || record.is_approved())
    }
}

/// Read access to the dashboard's record collections.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn fetch(
        &self,
        collection: Collection,
        query: RecordQuery,
    ) -> Result<Vec<Record>, DataSourceError>;
}

/// Records held in memory, loaded from a JSON fixture keyed by collection name.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    collections: BTreeMap<Collection, Vec<Record>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_reader(reader: impl Read) -> serde_json::Result<Self> {
        let collections = serde_json::from_reader(reader)?;
        Ok(Self { collections })
    }

    pub fn with(mut self, collection: Collection, records: impl IntoIterator<Item = Record>) -> Self {
        self.collections
            .entry(collection)
            .or_default()
            .extend(records);
        self
    }

    pub fn len(&self, collection: Collection) -> usize {
        self.collections.get(&collection).map(Vec::len).unwrap_or(0)
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn fetch(
        &self,
        collection: Collection,
        query: RecordQuery,
    ) -> Result<Vec<Record>, DataSourceError> {
        let mut records: Vec<Record> = self
            .collections
            .get(&collection)
            .map(|records| {
                records
                    .iter()
                    .filter(|record| query.matches(record))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(records)
    }
}
