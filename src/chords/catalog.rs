//! Static guitar chord catalog in the chords-db `guitar.json` layout.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

static BUNDLED_JSON: &str = include_str!("guitar.json");

static BUNDLED: Lazy<ChordCatalog> = Lazy::new(|| {
    ChordCatalog::from_json(BUNDLED_JSON).expect("bundled chord catalog is valid JSON")
});

/// One fretting pattern for six-string standard tuning, low E first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Voicing {
    /// -1 muted, 0 open, otherwise fret relative to `base_fret`.
    pub frets: [i8; 6],
    #[serde(default)]
    pub fingers: [u8; 6],
    #[serde(default)]
    pub barres: Vec<u8>,
    #[serde(default)]
    pub capo: bool,
    #[serde(default = "default_base_fret")]
    pub base_fret: u8,
}

fn default_base_fret() -> u8 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChordEntry {
    pub key: String,
    pub suffix: String,
    pub positions: Vec<Voicing>,
}

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("catalog JSON error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("catalog I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Chords keyed by catalog root (`C`, `Csharp`, `Eb`, ...).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChordCatalog {
    chords: HashMap<String, Vec<ChordEntry>>,
}

impl ChordCatalog {
    pub fn bundled() -> &'static ChordCatalog {
        &BUNDLED
    }

    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let catalog = Self::from_json(&std::fs::read_to_string(path)?)?;
        tracing::info!(
            path = %path.display(),
            roots = catalog.chords.len(),
            "Loaded chord catalog"
        );
        Ok(catalog)
    }

    /// Exact lookup by catalog root key and suffix.
    pub fn lookup(&self, root: &str, suffix: &str) -> Option<&ChordEntry> {
        self.chords.get(root)?.iter().find(|c| c.suffix == suffix)
    }

    pub fn roots(&self) -> impl Iterator<Item = &str> {
        self.chords.keys().map(String::as_str)
    }
}
