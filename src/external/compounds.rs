//! Compound name and formula lookup.
//!
//! The database is a ModelSEED-style tab-separated file. Only the `id`, `name`
//! and `formula` columns are read; their position is taken from the header.

use crate::error::{AppError, Result};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::Path;

const SERVICE: &str = "compound database";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CompoundInfo {
    pub name: String,
    pub formula: String,
}

pub trait CompoundLookup: Send + Sync {
    fn exists(&self, id: &str) -> bool;

    fn describe(&self, id: &str) -> Option<CompoundInfo>;
}

pub struct CompoundDatabase {
    compounds: HashMap<String, CompoundInfo>,
    /// SHA-256 of the source file, hex encoded.
    fingerprint: Option<String>,
}

impl CompoundDatabase {
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|e| AppError::ExternalService {
            service: SERVICE,
            message: format!("failed to read {}: {}", path.display(), e),
            retryable: false,
        })?;
        let text = std::str::from_utf8(&bytes)
            .map_err(|e| malformed(&format!("{} is not valid UTF-8: {}", path.display(), e)))?;
        let mut database = Self::parse(text)?;
        database.fingerprint = Some(format!("{:x}", Sha256::digest(&bytes)));

        tracing::info!(
            path = %path.display(),
            compounds = database.len(),
            "Compound database loaded"
        );

        Ok(database)
    }

    pub fn parse(text: &str) -> Result<Self> {
        let mut lines = text.lines().filter(|line| !line.trim().is_empty());
        let header = lines.next().ok_or_else(|| malformed("file is empty"))?;
        let columns: Vec<&str> = header.split('\t').map(str::trim).collect();
        let column = |name: &str| {
            columns
                .iter()
                .position(|c| *c == name)
                .ok_or_else(|| malformed(&format!("missing '{}' column", name)))
        };
        let (id_col, name_col, formula_col) = (column("id")?, column("name")?, column("formula")?);

        let mut compounds = HashMap::new();
        for (line_no, line) in lines.enumerate() {
            let fields: Vec<&str> = line.split('\t').collect();
            let Some(id) = fields.get(id_col).map(|s| s.trim()).filter(|s| !s.is_empty()) else {
                tracing::warn!(line = line_no + 2, "Skipping compound row without id");
                continue;
            };
            let field = |col: usize| fields.get(col).map(|s| s.trim()).unwrap_or("").to_string();
            compounds.insert(
                id.to_string(),
                CompoundInfo {
                    name: field(name_col),
                    formula: field(formula_col),
                },
            );
        }

        Ok(Self {
            compounds,
            fingerprint: None,
        })
    }

    /// Build an in-memory database from `(id, name, formula)` rows.
    pub fn from_entries<'a>(rows: impl IntoIterator<Item = (&'a str, &'a str, &'a str)>) -> Self {
        let compounds = rows
            .into_iter()
            .map(|(id, name, formula)| {
                (
                    id.to_string(),
                    CompoundInfo {
                        name: name.to_string(),
                        formula: formula.to_string(),
                    },
                )
            })
            .collect();

        Self {
            compounds,
            fingerprint: None,
        }
    }

    pub fn len(&self) -> usize {
        self.compounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.compounds.is_empty()
    }

    pub fn fingerprint(&self) -> Option<&str> {
        self.fingerprint.as_deref()
    }
}

impl CompoundLookup for CompoundDatabase {
    fn exists(&self, id: &str) -> bool {
        self.compounds.contains_key(id)
    }

    fn describe(&self, id: &str) -> Option<CompoundInfo> {
        self.compounds.get(id).cloned()
    }
}

fn malformed(reason: &str) -> AppError {
    AppError::ExternalService {
        service: SERVICE,
        message: format!("malformed compound table: {}", reason),
        retryable: false,
    }
}
