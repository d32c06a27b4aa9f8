//! Record types held by the resource store.

use crate::identifiers::LineageState;
use crate::validation::Violation;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

/// The logical sub-store a record lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Media,
    Model,
}

impl RecordKind {
    /// Prefix used for root identifiers of this kind.
    pub fn prefix(self) -> &'static str {
        match self {
            RecordKind::Media => "media",
            RecordKind::Model => "model",
        }
    }

    pub fn as_str(self) -> &'static str {
        self.prefix()
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload types that can be stored.
pub trait RecordBody: fmt::Debug + Send + Sync + 'static {
    const KIND: RecordKind;
}

/// When a record was inserted. `sequence` is the store-assigned ordering key;
/// `unix_ms` is informational only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct CreatedAt {
    pub sequence: u64,
    pub unix_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordMeta {
    pub id: String,
    pub display_name: Option<String>,
    pub created_at: CreatedAt,
    pub derived_from: Option<String>,
    /// Computed from `id` at insertion; `id` never changes afterwards.
    pub lineage: LineageState,
}

/// An immutable stored record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stored<T> {
    #[serde(flatten)]
    meta: RecordMeta,
    #[serde(flatten)]
    body: T,
}

impl<T> Stored<T> {
    pub(crate) fn new(meta: RecordMeta, body: T) -> Self {
        Self { meta, body }
    }

    pub fn meta(&self) -> &RecordMeta {
        &self.meta
    }

    pub fn body(&self) -> &T {
        &self.body
    }

    pub fn id(&self) -> &str {
        &self.meta.id
    }

    pub fn lineage(&self) -> LineageState {
        self.meta.lineage
    }

    pub fn derived_from(&self) -> Option<&str> {
        self.meta.derived_from.as_deref()
    }
}

/// A record waiting to be inserted; the store fills in creation time and lineage.
#[derive(Debug, Clone)]
pub struct NewRecord<T> {
    pub id: String,
    pub display_name: Option<String>,
    pub derived_from: Option<String>,
    pub body: T,
}

impl<T> NewRecord<T> {
    pub fn origin(id: String, body: T) -> Self {
        Self {
            id,
            display_name: None,
            derived_from: None,
            body,
        }
    }

    pub fn derived(id: String, parent_id: impl Into<String>, body: T) -> Self {
        Self {
            id,
            display_name: None,
            derived_from: Some(parent_id.into()),
            body,
        }
    }

    pub fn named(mut self, display_name: Option<String>) -> Self {
        self.display_name = display_name;
        self
    }
}

/// One compound of a medium with its exchange bounds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MediaEntry {
    pub compound_id: String,
    pub lower: f64,
    pub upper: f64,
}

impl MediaEntry {
    pub fn new(compound_id: impl Into<String>, lower: f64, upper: f64) -> Self {
        Self {
            compound_id: compound_id.into(),
            lower,
            upper,
        }
    }
}

/// Medium composition. Compound ids are unique and every pair satisfies
/// `lower < upper`; both hold from construction on.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Media {
    compounds: Vec<MediaEntry>,
}

impl Media {
    pub fn new(compounds: Vec<MediaEntry>) -> std::result::Result<Self, Vec<Violation>> {
        let mut seen = HashSet::new();
        let mut violations = Vec::new();

        for entry in &compounds {
            if !seen.insert(entry.compound_id.as_str()) {
                violations.push(Violation::with_value(
                    "media.unique_compounds",
                    format!("compound '{}' appears more than once", entry.compound_id),
                    entry.compound_id.as_str(),
                ));
            }
            // Written negated so NaN bounds are rejected too.
            if !(entry.lower < entry.upper) {
                violations.push(Violation::with_value(
                    "media.bounds_order",
                    format!(
                        "compound {}: lower bound ({}) must be less than upper bound ({})",
                        entry.compound_id, entry.lower, entry.upper
                    ),
                    entry.compound_id.as_str(),
                ));
            }
        }

        if violations.is_empty() {
            Ok(Self { compounds })
        } else {
            Err(violations)
        }
    }

    pub fn compounds(&self) -> &[MediaEntry] {
        &self.compounds
    }

    pub fn len(&self) -> usize {
        self.compounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.compounds.is_empty()
    }

    pub fn contains(&self, compound_id: &str) -> bool {
        self.compounds.iter().any(|e| e.compound_id == compound_id)
    }
}

impl RecordBody for Media {
    const KIND: RecordKind = RecordKind::Media;
}

/// Summary of a metabolic model as produced by the reconstruction backend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelSummary {
    pub reaction_count: usize,
    pub metabolite_count: usize,
    pub gene_count: usize,
    pub template: String,
    pub compartments: Vec<String>,
    /// Filled in by the tool that produced the model.
    pub has_growth_capability: bool,
}

impl RecordBody for ModelSummary {
    const KIND: RecordKind = RecordKind::Model;
}

pub type MediaRecord = Stored<Media>;
pub type ModelRecord = Stored<ModelSummary>;
