//! Process-wide lifecycle for the session store and its read-only resources.
//!
//! A [`Registry`] starts uninitialized and moves to ready exactly once. It is
//! an ordinary value owned by the application state, not a hidden global.

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::external::{CompoundDatabase, CompoundLookup, TemplateCache};
use crate::store::ResourceStore;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("registry is already initialized")]
    AlreadyInitialized,

    #[error("failed to load {resource}: {source}")]
    Load {
        resource: &'static str,
        #[source]
        source: AppError,
    },
}

struct Resources {
    store: ResourceStore,
    compounds: Arc<dyn CompoundLookup>,
    templates: Arc<TemplateCache>,
    compound_fingerprint: Option<String>,
}

#[derive(Default)]
pub struct Registry {
    ready: OnceLock<Resources>,
    init: Mutex<()>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every external resource and create an empty store.
    ///
    /// Nothing becomes visible unless all resources load.
    pub fn initialize(&self, config: &Config) -> std::result::Result<(), RegistryError> {
        let _guard = self.init.lock().unwrap_or_else(PoisonError::into_inner);
        if self.is_ready() {
            return Err(RegistryError::AlreadyInitialized);
        }

        let compounds = CompoundDatabase::load(&config.compounds_path).map_err(|source| {
            RegistryError::Load {
                resource: "compound database",
                source,
            }
        })?;
        let templates = TemplateCache::load_dir(&config.templates_dir).map_err(|source| {
            RegistryError::Load {
                resource: "template cache",
                source,
            }
        })?;

        let fingerprint = compounds.fingerprint().map(str::to_string);
        self.install(Resources {
            store: ResourceStore::new(),
            compounds: Arc::new(compounds),
            templates: Arc::new(templates),
            compound_fingerprint: fingerprint,
        })
    }

    /// Initialize from handles that are already loaded.
    pub fn initialize_with(
        &self,
        compounds: Arc<dyn CompoundLookup>,
        templates: TemplateCache,
    ) -> std::result::Result<(), RegistryError> {
        let _guard = self.init.lock().unwrap_or_else(PoisonError::into_inner);
        self.install(Resources {
            store: ResourceStore::new(),
            compounds,
            templates: Arc::new(templates),
            compound_fingerprint: None,
        })
    }

    fn install(&self, resources: Resources) -> std::result::Result<(), RegistryError> {
        let templates = resources.templates.len();
        self.ready
            .set(resources)
            .map_err(|_| RegistryError::AlreadyInitialized)?;
        tracing::info!(templates, "Registry ready");
        Ok(())
    }

    pub fn is_ready(&self) -> bool {
        self.ready.get().is_some()
    }

    fn resources(&self, resource: &'static str) -> Result<&Resources> {
        self.ready
            .get()
            .ok_or(AppError::NotInitialized { resource })
    }

    pub fn store(&self) -> Result<&ResourceStore> {
        Ok(&self.resources("resource store")?.store)
    }

    pub fn compounds(&self) -> Result<Arc<dyn CompoundLookup>> {
        Ok(Arc::clone(&self.resources("compound database")?.compounds))
    }

    pub fn templates(&self) -> Result<Arc<TemplateCache>> {
        Ok(Arc::clone(&self.resources("template cache")?.templates))
    }

    pub fn compound_fingerprint(&self) -> Option<&str> {
        self.ready.get()?.compound_fingerprint.as_deref()
    }

    /// Drop every stored record. The registry stays ready; there is no way back
    /// to uninitialized.
    pub fn shutdown(&self) -> usize {
        let Some(resources) = self.ready.get() else {
            return 0;
        };
        let dropped = resources.store.clear();
        tracing::info!(dropped, "Session store cleared");
        dropped
    }
}
