//! Reconstruction templates, loaded once at startup and read-only afterwards.

use crate::error::{AppError, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

const SERVICE: &str = "template cache";

#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    pub name: String,
    pub compartments: Vec<String>,
    pub reaction_count: usize,
}

impl Template {
    pub fn new(
        name: impl Into<String>,
        compartments: impl IntoIterator<Item = impl Into<String>>,
        reaction_count: usize,
    ) -> Self {
        Self {
            name: name.into(),
            compartments: compartments.into_iter().map(Into::into).collect(),
            reaction_count,
        }
    }
}

/// The subset of a ModelSEED template document this service reads.
#[derive(Deserialize)]
struct TemplateDocument {
    #[serde(default)]
    compartments: Vec<CompartmentDocument>,
    #[serde(default)]
    reactions: Vec<serde::de::IgnoredAny>,
}

#[derive(Deserialize)]
struct CompartmentDocument {
    id: String,
}

#[derive(Debug, Default)]
pub struct TemplateCache {
    templates: BTreeMap<String, Arc<Template>>,
}

impl TemplateCache {
    /// Load every `*.json` file in `dir`; the file stem is the template name.
    pub fn load_dir(dir: &Path) -> Result<Self> {
        let entries = std::fs::read_dir(dir).map_err(|e| load_error(dir, e))?;

        let mut templates = BTreeMap::new();
        for entry in entries {
            let path = entry.map_err(|e| load_error(dir, e))?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };

            let text = std::fs::read_to_string(&path).map_err(|e| load_error(&path, e))?;
            let document: TemplateDocument =
                serde_json::from_str(&text).map_err(|e| load_error(&path, e))?;

            let template = Template {
                name: name.to_string(),
                compartments: document.compartments.into_iter().map(|c| c.id).collect(),
                reaction_count: document.reactions.len(),
            };
            tracing::debug!(
                template = %template.name,
                reactions = template.reaction_count,
                "Template loaded"
            );
            templates.insert(template.name.clone(), Arc::new(template));
        }

        if templates.is_empty() {
            return Err(AppError::ExternalService {
                service: SERVICE,
                message: format!("no templates found in {}", dir.display()),
                retryable: false,
            });
        }

        tracing::info!(dir = %dir.display(), templates = templates.len(), "Template cache loaded");
        Ok(Self { templates })
    }

    pub fn from_templates(templates: impl IntoIterator<Item = Template>) -> Self {
        Self {
            templates: templates
                .into_iter()
                .map(|t| (t.name.clone(), Arc::new(t)))
                .collect(),
        }
    }

    pub fn get(&self, name: &str) -> Result<Arc<Template>> {
        self.templates
            .get(name)
            .cloned()
            .ok_or_else(|| AppError::NotFound {
                kind: "template",
                id: name.to_string(),
                available: self.templates.keys().cloned().collect(),
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    /// Template names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

fn load_error(path: &Path, err: impl std::fmt::Display) -> AppError {
    AppError::ExternalService {
        service: SERVICE,
        message: format!("failed to load {}: {}", path.display(), err),
        retryable: false,
    }
}
