//! Saved positions for draggable elements
//!
//! Features:
//! - In-memory store for tests and headless runs
//! - JSON file store, written on every save
//! - Corrupt or missing files fall back to defaults

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::error::PersistenceError;

/// Position persistence collaborator
pub trait PositionStore {
    /// Stored position for `name`, or `default` when absent
    fn load_position(&self, name: &str, default: Vec2) -> Vec2;
    fn save_position(&mut self, name: &str, pos: Vec2);
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
struct SavedPosition {
    x: f32,
    y: f32,
}

impl From<Vec2> for SavedPosition {
    fn from(v: Vec2) -> Self {
        Self { x: v.x, y: v.y }
    }
}

impl From<SavedPosition> for Vec2 {
    fn from(p: SavedPosition) -> Self {
        Vec2::new(p.x, p.y)
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryPositionStore {
    positions: BTreeMap<String, Vec2>,
}

impl PositionStore for MemoryPositionStore {
    fn load_position(&self, name: &str, default: Vec2) -> Vec2 {
        self.positions.get(name).copied().unwrap_or(default)
    }

    fn save_position(&mut self, name: &str, pos: Vec2) {
        self.positions.insert(name.to_string(), pos);
    }
}

/// Positions kept in a single JSON object keyed by element name
#[derive(Debug, Clone)]
pub struct JsonPositionStore {
    path: PathBuf,
    positions: BTreeMap<String, SavedPosition>,
}

impl JsonPositionStore {
    /// Open the store at `path`. A missing or unreadable file starts empty.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let positions = match Self::read(&path) {
            Ok(positions) => positions,
            Err(PersistenceError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                BTreeMap::new()
            }
            Err(e) => {
                log::warn!("Ignoring saved positions in {}: {}", path.display(), e);
                BTreeMap::new()
            }
        };
        Self { path, positions }
    }

    fn read(path: &Path) -> Result<BTreeMap<String, SavedPosition>, PersistenceError> {
        let json = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Write all positions to disk
    pub fn flush(&self) -> Result<(), PersistenceError> {
        let json = serde_json::to_string_pretty(&self.positions)?;
        fs::write(&self.path, json)?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PositionStore for JsonPositionStore {
    fn load_position(&self, name: &str, default: Vec2) -> Vec2 {
        self.positions.get(name).copied().map_or(default, Vec2::from)
    }

    fn save_position(&mut self, name: &str, pos: Vec2) {
        self.positions.insert(name.to_string(), pos.into());
        if let Err(e) = self.flush() {
            log::warn!("Failed to save position for {}: {}", name, e);
        }
    }
}
