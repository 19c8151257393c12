use indexmap::IndexMap;
use loraflow_core::{Adapter, AdapterId};
use parking_lot::RwLock;
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("reading adapter catalog {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing adapter catalog {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

/// On-disk shape of the adapter catalog file.
#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    adapter: Vec<Adapter>,
}

/// Thread-safe, in-memory adapter catalog.
///
/// Ordering is preserved in insertion/load order so that `list_active`
/// results are stable across calls, matching `ordinal` intent without
/// requiring a separate sort on every read.
#[derive(Clone)]
pub struct AdapterCatalog {
    inner: Arc<RwLock<IndexMap<AdapterId, Adapter>>>,
}

impl AdapterCatalog {
    pub fn empty() -> Self {
        Self {
            inner: Arc::new(RwLock::new(IndexMap::new())),
        }
    }

    pub fn from_adapters(adapters: impl IntoIterator<Item = Adapter>) -> Self {
        let catalog = Self::empty();
        {
            let mut map = catalog.inner.write();
            for adapter in adapters {
                map.insert(adapter.id.clone(), adapter);
            }
            map.sort_by(|_, a, _, b| a.ordinal.cmp(&b.ordinal));
        }
        catalog
    }

    /// Load a catalog from a TOML file of `[[adapter]]` tables.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let raw = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let parsed: CatalogFile = toml::from_str(&raw).map_err(|source| CatalogError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        Ok(Self::from_adapters(parsed.adapter))
    }

    pub fn get(&self, id: &AdapterId) -> Option<Adapter> {
        self.inner.read().get(id).cloned()
    }

    /// All adapters, active and inactive, in catalog order.
    pub fn list_all(&self) -> Vec<Adapter> {
        self.inner.read().values().cloned().collect()
    }

    /// Only active adapters, in catalog order — the set the coordinator
    /// should offer for selection and recommendation (spec §4.G, §4.H).
    pub fn list_active(&self) -> Vec<Adapter> {
        self.inner
            .read()
            .values()
            .filter(|a| a.active)
            .cloned()
            .collect()
    }

    pub fn insert(&self, adapter: Adapter) {
        let mut map = self.inner.write();
        map.insert(adapter.id.clone(), adapter);
        map.sort_by(|_, a, _, b| a.ordinal.cmp(&b.ordinal));
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}

impl Default for AdapterCatalog {
    fn default() -> Self {
        Self::empty()
    }
}
