//! Outcomes of put and delete operations.

use std::collections::{BTreeSet, HashMap};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::Changes;

/// Outcome of putting one row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PutResult {
    Inserted { inserted_id: i64, table: String },
    Updated { rows_updated: u64, table: String },
}

impl PutResult {
    pub fn new_insert_result(inserted_id: i64, table: impl Into<String>) -> Self {
        PutResult::Inserted {
            inserted_id,
            table: table.into(),
        }
    }

    pub fn new_update_result(rows_updated: u64, table: impl Into<String>) -> Self {
        PutResult::Updated {
            rows_updated,
            table: table.into(),
        }
    }

    pub fn was_inserted(&self) -> bool {
        matches!(self, PutResult::Inserted { .. })
    }

    pub fn was_updated(&self) -> bool {
        matches!(self, PutResult::Updated { .. })
    }

    pub fn inserted_id(&self) -> Option<i64> {
        match self {
            PutResult::Inserted { inserted_id, .. } => Some(*inserted_id),
            PutResult::Updated { .. } => None,
        }
    }

    pub fn rows_updated(&self) -> Option<u64> {
        match self {
            PutResult::Updated { rows_updated, .. } => Some(*rows_updated),
            PutResult::Inserted { .. } => None,
        }
    }

    pub fn affected_table(&self) -> &str {
        match self {
            PutResult::Inserted { table, .. } | PutResult::Updated { table, .. } => table,
        }
    }
}

/// Outcome of deleting by one query.
///
/// The affected tables are recorded even when nothing was deleted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteResult {
    rows_deleted: u64,
    affected_tables: BTreeSet<String>,
}

impl DeleteResult {
    pub fn new<I, S>(rows_deleted: u64, affected_tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            rows_deleted,
            affected_tables: affected_tables.into_iter().map(Into::into).collect(),
        }
    }

    pub fn rows_deleted(&self) -> u64 {
        self.rows_deleted
    }

    pub fn affected_tables(&self) -> &BTreeSet<String> {
        &self.affected_tables
    }

    pub fn was_deleted(&self) -> bool {
        self.rows_deleted > 0
    }

    pub fn was_not_deleted(&self) -> bool {
        !self.was_deleted()
    }
}

/// Results that know which tables they touched.
pub trait AffectsTables {
    fn changes(&self) -> Changes;
}

impl AffectsTables for PutResult {
    fn changes(&self) -> Changes {
        Changes::table(self.affected_table())
    }
}

impl AffectsTables for DeleteResult {
    fn changes(&self) -> Changes {
        Changes::new(self.affected_tables.iter().cloned())
    }
}

/// Map key comparing `Arc`s by allocation, not by value.
struct ObjectRef<T>(Arc<T>);

impl<T> PartialEq for ObjectRef<T> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl<T> Eq for ObjectRef<T> {}

impl<T> Hash for ObjectRef<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::ptr::hash(Arc::as_ptr(&self.0), state);
    }
}

/// Per-object results of a batch, keyed by object identity.
///
/// Identity is the `Arc` allocation: two equal values in separate `Arc`s get
/// separate entries, the same `Arc` passed twice gets one (the later result).
/// Iteration order is unspecified.
pub struct BatchResult<T, R> {
    results: HashMap<ObjectRef<T>, R>,
}

pub type PutCollectionResult<T> = BatchResult<T, PutResult>;
pub type DeleteCollectionResult<T> = BatchResult<T, DeleteResult>;

impl<T, R> BatchResult<T, R> {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            results: HashMap::with_capacity(capacity),
        }
    }

    pub(crate) fn insert(&mut self, object: Arc<T>, result: R) {
        self.results.insert(ObjectRef(object), result);
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn get(&self, object: &Arc<T>) -> Option<&R> {
        self.results.get(&ObjectRef(Arc::clone(object)))
    }

    pub fn contains(&self, object: &Arc<T>) -> bool {
        self.get(object).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&T, &R)> {
        self.results.iter().map(|(key, result)| (key.0.as_ref(), result))
    }

    pub fn results(&self) -> impl Iterator<Item = &R> {
        self.results.values()
    }

    pub fn into_results(self) -> Vec<(Arc<T>, R)> {
        self.results
            .into_iter()
            .map(|(key, result)| (key.0, result))
            .collect()
    }
}

impl<T, R: AffectsTables> BatchResult<T, R> {
    /// Union of the tables touched by every result.
    pub fn changes(&self) -> Changes {
        self.results.values().fold(Changes::default(), |mut acc, result| {
            acc.merge(result.changes());
            acc
        })
    }
}

impl<T> BatchResult<T, PutResult> {
    pub fn number_of_inserts(&self) -> usize {
        self.results().filter(|r| r.was_inserted()).count()
    }

    pub fn number_of_updates(&self) -> usize {
        self.results().filter(|r| r.was_updated()).count()
    }
}

impl<T> BatchResult<T, DeleteResult> {
    /// False for objects that were not part of the batch.
    pub fn was_deleted(&self, object: &Arc<T>) -> bool {
        self.get(object).is_some_and(DeleteResult::was_deleted)
    }

    pub fn was_not_deleted(&self, object: &Arc<T>) -> bool {
        !self.was_deleted(object)
    }
}

impl<T: std::fmt::Debug, R: std::fmt::Debug> std::fmt::Debug for BatchResult<T, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_result_accessors() {
        let inserted = PutResult::new_insert_result(7, "users");
        assert!(inserted.was_inserted());
        assert_eq!(inserted.inserted_id(), Some(7));
        assert_eq!(inserted.rows_updated(), None);
        assert_eq!(inserted.affected_table(), "users");

        let updated = PutResult::new_update_result(1, "tweets");
        assert!(updated.was_updated());
        assert_eq!(updated.changes(), Changes::table("tweets"));
    }

    #[test]
    fn zero_row_delete_still_names_table() {
        let result = DeleteResult::new(0, ["users"]);
        assert!(result.was_not_deleted());
        assert_eq!(result.changes(), Changes::table("users"));
    }

    #[test]
    fn identity_not_value_keys_results() {
        let first = Arc::new("same".to_string());
        let second = Arc::new("same".to_string());

        let mut batch = BatchResult::with_capacity(3);
        batch.insert(Arc::clone(&first), DeleteResult::new(1, ["a"]));
        batch.insert(Arc::clone(&second), DeleteResult::new(0, ["b"]));
        batch.insert(Arc::clone(&first), DeleteResult::new(2, ["a"]));

        assert_eq!(batch.len(), 2);
        assert_eq!(batch.get(&first).map(DeleteResult::rows_deleted), Some(2));
        assert!(batch.was_deleted(&first));
        assert!(batch.was_not_deleted(&second));
        assert!(!batch.contains(&Arc::new("same".to_string())));
        assert_eq!(batch.changes(), Changes::new(["a", "b"]));
    }
}
