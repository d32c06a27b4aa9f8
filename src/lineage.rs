//! Derivation chains between stored records.

use crate::error::{AppError, Result};
use crate::identifiers::{IdentifierFactory, LineageState};
use crate::store::{RecordBody, Stored, SubStore};
use std::collections::HashSet;
use std::sync::Arc;

pub fn classify(id: &str) -> LineageState {
    IdentifierFactory::parse_lineage_state(id)
}

/// Records from the origin down to `id`, inclusive.
///
/// The walk runs against a single snapshot of the sub-store.
///
/// # Errors
/// - `NotFound` if `id` itself is absent.
/// - `LineageLinkMissing` if an ancestor was deleted.
pub fn chain<T: RecordBody>(store: &SubStore<T>, id: &str) -> Result<Vec<Arc<Stored<T>>>> {
    store.with_snapshot(|snapshot| -> Result<Vec<Arc<Stored<T>>>> {
        let target = snapshot.get(id)?;
        let mut chain = vec![Arc::clone(target)];
        let mut seen = HashSet::from([target.id()]);
        let mut cursor = target;

        while let Some(parent_id) = cursor.derived_from() {
            if !seen.insert(parent_id) {
                return Err(AppError::Internal(format!(
                    "derivation cycle through '{}'",
                    parent_id
                )));
            }
            let parent = snapshot
                .find(parent_id)
                .ok_or_else(|| AppError::LineageLinkMissing {
                    id: id.to_string(),
                    missing: parent_id.to_string(),
                })?;
            chain.push(Arc::clone(parent));
            cursor = parent;
        }

        chain.reverse();
        Ok(chain)
    })
}

/// Direct children of `id` still present in the store.
pub fn dependents<T: RecordBody>(store: &SubStore<T>, id: &str) -> Vec<Arc<Stored<T>>> {
    store.list(|r| r.derived_from() == Some(id))
}
