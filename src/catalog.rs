//! Model-code lookup table.
//!
//! Photo filenames carry a short model code (`TB`, `F150`, ...). The catalog
//! maps those codes to a make and model for display. A missing code is not an
//! error: the photo is still accepted, it just has no make/model attached.

use std::collections::HashMap;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Make and model for a model code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub make: String,
    pub model: String,
}

/// Result of resolving a model code. Both fields are `None` on a miss.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedModel {
    pub make: Option<String>,
    pub model: Option<String>,
}

/// Read-only model-code table, passed to whoever needs it.
#[derive(Debug, Clone, Default)]
pub struct ModelCatalog {
    entries: HashMap<String, ModelInfo>,
}

/// Codes the lot uses today.
const BUILTIN: &[(&str, &str, &str)] = &[
    ("TB", "Chevrolet", "Trailblazer"),
    ("EQ", "Chevrolet", "Equinox"),
    ("MAL", "Chevrolet", "Malibu"),
    ("SIL", "Chevrolet", "Silverado"),
    ("F150", "Ford", "F-150"),
    ("ESC", "Ford", "Escape"),
    ("FUS", "Ford", "Fusion"),
    ("CIV", "Honda", "Civic"),
    ("ACC", "Honda", "Accord"),
    ("CRV", "Honda", "CR-V"),
    ("CAM", "Toyota", "Camry"),
    ("COR", "Toyota", "Corolla"),
    ("RAV", "Toyota", "RAV4"),
    ("ALT", "Nissan", "Altima"),
    ("ROG", "Nissan", "Rogue"),
    ("ELA", "Hyundai", "Elantra"),
    ("SON", "Hyundai", "Sonata"),
    ("JGC", "Jeep", "Grand Cherokee"),
];

impl ModelCatalog {
    /// Build a catalog from `(code, info)` pairs. Later duplicates win.
    pub fn new<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (String, ModelInfo)>,
    {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    /// The dealer's stock table.
    pub fn builtin() -> Self {
        Self::new(BUILTIN.iter().map(|(code, make, model)| {
            (
                code.to_string(),
                ModelInfo {
                    make: make.to_string(),
                    model: model.to_string(),
                },
            )
        }))
    }

    /// Load a catalog from a JSON object of `code -> {"make", "model"}`.
    pub fn from_json_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading model catalog {}", path.display()))?;
        Self::from_json_str(&raw)
            .with_context(|| format!("parsing model catalog {}", path.display()))
    }

    /// Parse a catalog from a JSON object of `code -> {"make", "model"}`.
    pub fn from_json_str(raw: &str) -> anyhow::Result<Self> {
        let entries: HashMap<String, ModelInfo> = serde_json::from_str(raw)?;
        Ok(Self { entries })
    }

    pub fn lookup(&self, code: &str) -> Option<&ModelInfo> {
        self.entries.get(code)
    }

    /// Resolve a code to optional make/model fields.
    pub fn resolve(&self, code: &str) -> ResolvedModel {
        match self.lookup(code) {
            Some(info) => ResolvedModel {
                make: Some(info.make.clone()),
                model: Some(info.model.clone()),
            },
            None => ResolvedModel::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
