//! Identifier minting and lineage suffixes.
//!
//! Root identifiers look like `media_0001718000000123456_3f9a0c1e2b7d`: a prefix,
//! a zero-padded microsecond component that never repeats within one factory,
//! and 48 random bits. Derived identifiers append dot-separated tags to their
//! parent, e.g. `model_..._3f9a0c1e2b7d.draft.gf`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Separator between a parent identifier and each lineage tag.
pub const SUFFIX_SEPARATOR: char = '.';

/// Hex characters kept from a v4 UUID for the random component.
const RANDOM_HEX_LEN: usize = 12;

/// A processing step that can be recorded on an identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineageTag {
    Draft,
    Gapfilled,
}

impl LineageTag {
    pub fn as_str(self) -> &'static str {
        match self {
            LineageTag::Draft => "draft",
            LineageTag::Gapfilled => "gf",
        }
    }
}

/// Processing state derived from an identifier's suffix chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineageState {
    Origin,
    Draft,
    Gapfilled,
}

impl LineageState {
    pub fn as_str(self) -> &'static str {
        match self {
            LineageState::Origin => "origin",
            LineageState::Draft => "draft",
            LineageState::Gapfilled => "gapfilled",
        }
    }
}

impl fmt::Display for LineageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LineageState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "origin" => Ok(Self::Origin),
            "draft" => Ok(Self::Draft),
            "gapfilled" => Ok(Self::Gapfilled),
            other => Err(format!("unknown lineage state '{}'", other)),
        }
    }
}

/// Mints time-ordered identifiers.
///
/// The time component is wall-clock microseconds, bumped by one whenever the
/// clock has not advanced past the previous value, so two identifiers from the
/// same factory never share it.
#[derive(Debug, Default)]
pub struct IdentifierFactory {
    last_micros: AtomicU64,
}

impl IdentifierFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Produce `<prefix>_<time>_<random>`.
    pub fn new_root(&self, prefix: &str) -> String {
        debug_assert!(!prefix.contains(SUFFIX_SEPARATOR));
        let micros = self.next_micros();
        let random = Uuid::new_v4().simple().to_string();
        format!("{}_{:019}_{}", prefix, micros, &random[..RANDOM_HEX_LEN])
    }

    fn next_micros(&self) -> u64 {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_micros() as u64)
            .unwrap_or(0);

        let mut last = self.last_micros.load(Ordering::Relaxed);
        loop {
            let next = now.max(last + 1);
            match self.last_micros.compare_exchange_weak(
                last,
                next,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return next,
                Err(current) => last = current,
            }
        }
    }

    /// Append a lineage tag to an existing identifier.
    pub fn derive_suffixed(parent_id: &str, tag: LineageTag) -> String {
        format!("{}{}{}", parent_id, SUFFIX_SEPARATOR, tag.as_str())
    }

    /// Suffix tags in the order they were applied.
    pub fn suffix_chain(id: &str) -> impl Iterator<Item = &str> {
        id.split(SUFFIX_SEPARATOR).skip(1)
    }

    /// Classify an identifier. A gapfill tag anywhere in the chain wins, then
    /// draft; anything else is an origin.
    pub fn parse_lineage_state(id: &str) -> LineageState {
        let mut state = LineageState::Origin;
        for tag in Self::suffix_chain(id) {
            if tag == LineageTag::Gapfilled.as_str() {
                return LineageState::Gapfilled;
            }
            if tag == LineageTag::Draft.as_str() {
                state = LineageState::Draft;
            }
        }
        state
    }
}
