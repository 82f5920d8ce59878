//! Named text/icon patterns persisted as JSON.
//!
//! File format: an object mapping pattern name to
//! `{"type": "text" | "icon", "value": "..."}`.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternKind {
    Text,
    Icon,
}

/// A stored target: literal text or an icon path.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pattern {
    #[serde(rename = "type")]
    pub kind: PatternKind,
    pub value: String,
}

/// JSON-file key-value store of patterns.
///
/// The whole map is rewritten on every save; callers sharing a store across
/// threads must serialize access themselves.
#[derive(Debug)]
pub struct PatternStore {
    path: PathBuf,
    patterns: BTreeMap<String, Pattern>,
}

impl PatternStore {
    /// Opens the store at `path`. A missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let patterns = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse {}", path.display()))?
        } else {
            BTreeMap::new()
        };
        Ok(Self { path, patterns })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes the store, creating the parent directory on first save.
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(&self.patterns)?;
        fs::write(&self.path, json)
            .with_context(|| format!("Failed to write {}", self.path.display()))?;
        Ok(())
    }

    /// Records a text pattern and saves.
    pub fn learn(&mut self, name: &str, text: &str) -> Result<()> {
        self.upsert(name, PatternKind::Text, text)
    }

    /// Records an icon pattern and saves.
    pub fn learn_icon(&mut self, name: &str, icon_path: &str) -> Result<()> {
        self.upsert(name, PatternKind::Icon, icon_path)
    }

    fn upsert(&mut self, name: &str, kind: PatternKind, value: &str) -> Result<()> {
        let pattern = Pattern {
            kind,
            value: value.to_string(),
        };
        let previous = self.patterns.insert(name.to_string(), pattern);
        if let Err(e) = self.save() {
            // Keep memory in step with the file
            match previous {
                Some(p) => self.patterns.insert(name.to_string(), p),
                None => self.patterns.remove(name),
            };
            return Err(e);
        }
        crate::log(&format!("Learned {:?} pattern '{}'", kind, name));
        Ok(())
    }

    /// Removes a pattern and saves. Returns the removed pattern, if any.
    pub fn remove(&mut self, name: &str) -> Result<Option<Pattern>> {
        let Some(removed) = self.patterns.remove(name) else {
            return Ok(None);
        };
        if let Err(e) = self.save() {
            self.patterns.insert(name.to_string(), removed);
            return Err(e);
        }
        Ok(Some(removed))
    }

    pub fn get(&self, name: &str) -> Option<&Pattern> {
        self.patterns.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Pattern)> {
        self.patterns.iter()
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}
