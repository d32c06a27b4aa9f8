//! Session-scoped in-memory storage for media and models.
//!
//! Each record kind has its own [`SubStore`] behind a single coarse lock.
//! Locks are held only for the lookup or mutation itself; validation and
//! backend calls happen before a record reaches the store.

pub mod record;

pub use record::{
    CreatedAt, Media, MediaEntry, MediaRecord, ModelRecord, ModelSummary, NewRecord, RecordBody,
    RecordKind, RecordMeta, Stored,
};

use crate::error::{AppError, Result};
use crate::identifiers::IdentifierFactory;
use crossbeam::sync::ShardedLock;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

/// Number of ids quoted back in a not-found error.
const AVAILABLE_SAMPLE: usize = 5;

struct Inner<T> {
    records: HashMap<String, Arc<Stored<T>>>,
    /// Ids of deleted records. Never reissued for the life of the store.
    retired: HashSet<String>,
    next_sequence: u64,
}

impl<T> Inner<T> {
    fn is_taken(&self, id: &str) -> bool {
        self.records.contains_key(id) || self.retired.contains(id)
    }
}

impl<T> Inner<T> {
    fn ordered(&self) -> Vec<&Arc<Stored<T>>> {
        let mut records: Vec<_> = self.records.values().collect();
        records.sort_by_key(|r| r.meta().created_at.sequence);
        records
    }
}

/// Keyed storage for one record kind.
pub struct SubStore<T> {
    inner: ShardedLock<Inner<T>>,
}

impl<T: RecordBody> Default for SubStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: RecordBody> SubStore<T> {
    pub fn new() -> Self {
        Self {
            inner: ShardedLock::new(Inner {
                records: HashMap::new(),
                retired: HashSet::new(),
                next_sequence: 0,
            }),
        }
    }

    // Records are immutable and inserts are single map operations, so a
    // poisoned lock never guards a half-written record.
    fn read(&self) -> crossbeam::sync::ShardedLockReadGuard<'_, Inner<T>> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> crossbeam::sync::ShardedLockWriteGuard<'_, Inner<T>> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert a new record.
    ///
    /// # Errors
    /// - `Conflict` if the id is present or belonged to a deleted record.
    /// - `Validation` if `derived_from` names a record that is not present.
    pub fn insert(&self, record: NewRecord<T>) -> Result<Arc<Stored<T>>> {
        let NewRecord {
            id,
            display_name,
            derived_from,
            body,
        } = record;
        let lineage = IdentifierFactory::parse_lineage_state(&id);

        let mut inner = self.write();

        if inner.is_taken(&id) {
            return Err(AppError::Conflict {
                kind: T::KIND.as_str(),
                id,
            });
        }
        if let Some(parent) = &derived_from {
            if !inner.records.contains_key(parent) {
                return Err(AppError::invalid(
                    "derived_from.exists",
                    format!(
                        "{} '{}' cannot derive from '{}', which is not in the store",
                        T::KIND,
                        id,
                        parent
                    ),
                ));
            }
        }

        let created_at = CreatedAt {
            sequence: inner.next_sequence,
            unix_ms: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis() as u64)
                .unwrap_or(0),
        };
        inner.next_sequence += 1;

        let stored = Arc::new(Stored::new(
            RecordMeta {
                id: id.clone(),
                display_name,
                created_at,
                derived_from,
                lineage,
            },
            body,
        ));
        inner.records.insert(id, Arc::clone(&stored));

        tracing::debug!(
            kind = %T::KIND,
            id = %stored.id(),
            sequence = created_at.sequence,
            "Record inserted"
        );

        Ok(stored)
    }

    pub fn get(&self, id: &str) -> Result<Arc<Stored<T>>> {
        self.with_snapshot(|snapshot| snapshot.get(id).cloned())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.read().records.contains_key(id)
    }

    /// Whether `id` is stored now or was stored and deleted.
    pub fn is_taken(&self, id: &str) -> bool {
        self.read().is_taken(id)
    }

    /// Remove a record. Records derived from it stay in place and its id is
    /// retired.
    pub fn delete(&self, id: &str) -> Result<Arc<Stored<T>>> {
        let mut inner = self.write();
        match inner.records.remove(id) {
            Some(removed) => {
                inner.retired.insert(removed.id().to_string());
                tracing::debug!(kind = %T::KIND, id, "Record deleted");
                Ok(removed)
            }
            None => Err(Self::not_found(&inner, id)),
        }
    }

    /// Records matching `predicate`, oldest first, from one consistent snapshot.
    pub fn list<P>(&self, predicate: P) -> Vec<Arc<Stored<T>>>
    where
        P: Fn(&Stored<T>) -> bool,
    {
        self.read()
            .ordered()
            .into_iter()
            .filter(|r| predicate(r))
            .cloned()
            .collect()
    }

    pub fn all(&self) -> Vec<Arc<Stored<T>>> {
        self.list(|_| true)
    }

    /// Up to `limit` ids, oldest first.
    pub fn sample_ids(&self, limit: usize) -> Vec<String> {
        Self::sample(&self.read(), limit)
    }

    pub fn len(&self) -> usize {
        self.read().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run `f` against a consistent view of the records. The read lock is
    /// held until `f` returns.
    pub(crate) fn with_snapshot<R>(&self, f: impl FnOnce(&Snapshot<'_, T>) -> R) -> R {
        let inner = self.read();
        f(&Snapshot { inner: &inner })
    }

    /// Drop every record, returning how many were removed. Their ids are
    /// retired.
    pub fn clear(&self) -> usize {
        let mut inner = self.write();
        let removed = inner.records.len();
        let ids: Vec<String> = inner.records.drain().map(|(id, _)| id).collect();
        inner.retired.extend(ids);
        removed
    }

    fn sample(inner: &Inner<T>, limit: usize) -> Vec<String> {
        inner
            .ordered()
            .into_iter()
            .take(limit)
            .map(|r| r.id().to_string())
            .collect()
    }

    fn not_found(inner: &Inner<T>, id: &str) -> AppError {
        AppError::NotFound {
            kind: T::KIND.as_str(),
            id: id.to_string(),
            available: Self::sample(inner, AVAILABLE_SAMPLE),
        }
    }
}

/// A read-locked view of one sub-store.
pub(crate) struct Snapshot<'a, T> {
    inner: &'a Inner<T>,
}

impl<T: RecordBody> Snapshot<'_, T> {
    /// Like [`SubStore::get`], without taking the lock again.
    pub(crate) fn get(&self, id: &str) -> Result<&Arc<Stored<T>>> {
        self.inner
            .records
            .get(id)
            .ok_or_else(|| SubStore::<T>::not_found(self.inner, id))
    }

    pub(crate) fn find(&self, id: &str) -> Option<&Arc<Stored<T>>> {
        self.inner.records.get(id)
    }
}

/// The session store: one sub-store per record kind plus the id factory.
#[derive(Default)]
pub struct ResourceStore {
    media: SubStore<Media>,
    models: SubStore<ModelSummary>,
    ids: IdentifierFactory,
}

impl ResourceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn media(&self) -> &SubStore<Media> {
        &self.media
    }

    pub fn models(&self) -> &SubStore<ModelSummary> {
        &self.models
    }

    pub fn ids(&self) -> &IdentifierFactory {
        &self.ids
    }

    /// Mint a root identifier for `kind`.
    pub fn mint(&self, kind: RecordKind) -> String {
        self.ids.new_root(kind.prefix())
    }

    pub fn len(&self) -> usize {
        self.media.len() + self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) -> usize {
        self.media.clear() + self.models.clear()
    }
}
