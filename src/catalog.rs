//! Static collection data: bundled decks and lessons, or a user file.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::models::Collection;

/// Bundled vocabulary decks and grammar lessons.
const BUNDLED_COLLECTIONS: &str = include_str!("../bundled/collections.json");

/// Every collection available for drilling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Catalog {
    pub collections: Vec<Collection>,
}

impl Catalog {
    pub fn bundled() -> Result<Self> {
        Self::from_json(BUNDLED_COLLECTIONS).context("Bundled collections are invalid")
    }

    /// Load a catalog file.
    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read collections file: {:?}", path))?;
        Self::from_json(&json).with_context(|| format!("Failed to load collections from {:?}", path))
    }

    /// The file at `path` if given, otherwise the bundled catalog.
    pub fn load_or_bundled(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Self::bundled(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let catalog: Catalog = serde_json::from_str(json)?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Collection ids must be unique, and so must item ids within a collection.
    fn validate(&self) -> Result<()> {
        let mut ids = HashSet::new();
        for collection in &self.collections {
            if !ids.insert(collection.id.as_str()) {
                bail!("Duplicate collection id '{}'", collection.id);
            }
            let mut keys = HashSet::new();
            for key in collection.item_keys() {
                if !keys.insert(key.clone()) {
                    bail!("Duplicate item '{}' in collection '{}'", key.item_id, collection.id);
                }
            }
        }
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&Collection> {
        self.collections.iter().find(|c| c.id == id)
    }

    pub fn ids(&self) -> Vec<&str> {
        self.collections.iter().map(|c| c.id.as_str()).collect()
    }
}
