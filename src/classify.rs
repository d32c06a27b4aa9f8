//! Labels derived purely from record content.

use crate::store::{Media, MediaEntry};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Media with fewer compounds than this are `minimal`; at or above, `rich`.
pub const MINIMAL_MEDIA_THRESHOLD: usize = 50;

/// Compounds shown in a media summary.
pub const PREVIEW_LEN: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaType {
    Minimal,
    Rich,
}

impl MediaType {
    pub fn for_count(compound_count: usize) -> Self {
        if compound_count < MINIMAL_MEDIA_THRESHOLD {
            MediaType::Minimal
        } else {
            MediaType::Rich
        }
    }

    pub fn of(media: &Media) -> Self {
        Self::for_count(media.len())
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MediaType::Minimal => "minimal",
            MediaType::Rich => "rich",
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// First compounds of a medium, in their original order.
pub fn preview(media: &Media) -> &[MediaEntry] {
    let compounds = media.compounds();
    &compounds[..compounds.len().min(PREVIEW_LEN)]
}
