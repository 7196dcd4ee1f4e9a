//! Racer and arena assets from a user folder
//!
//! A racer is a `<Name>_Body.png` + `<Name>_Winner.png` pair. Optional
//! `<Name>_Bounce.mp3` and `<Name>_Winner.mp3` override that racer's sounds,
//! and files named after a cue (`Bounce.mp3`, `Music.mp3`, ...) override the
//! cue for everyone. Broken entries are skipped with a warning.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::audio::{Clip, SoundEffect};
use crate::error::AssetError;
use crate::sim::state::RacerProfile;

const PNG_MAGIC: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

const BODY_SUFFIX: &str = "_Body.png";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RacerAssets {
    pub name: String,
    pub body: PathBuf,
    pub winner: PathBuf,
    pub bounce_sound: Option<PathBuf>,
    pub winner_sound: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArenaAssets {
    pub level: Option<PathBuf>,
    pub background: Option<PathBuf>,
    pub start_flag: Option<PathBuf>,
    pub goal_flag: Option<PathBuf>,
    pub sound_overrides: HashMap<SoundEffect, PathBuf>,
}

impl ArenaAssets {
    /// Images found for the arena, labelled for the presentation layer
    pub fn images(&self) -> Vec<(&'static str, &Path)> {
        [
            ("level", &self.level),
            ("background", &self.background),
            ("start flag", &self.start_flag),
            ("goal flag", &self.goal_flag),
        ]
        .into_iter()
        .filter_map(|(label, path)| Some((label, path.as_deref()?)))
        .collect()
    }
}

/// Where racer and arena assets come from
pub trait AssetSource {
    /// Racer names, sorted
    fn roster(&self) -> Vec<String>;
    fn racer_assets(&self, name: &str) -> Option<RacerAssets>;
    fn arena_assets(&self) -> ArenaAssets;
}

/// Assets discovered in a single directory
#[derive(Debug, Clone)]
pub struct DirectoryAssets {
    root: PathBuf,
}

impl DirectoryAssets {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn optional(&self, file_name: &str) -> Option<PathBuf> {
        let path = self.root.join(file_name);
        match check_file(&path) {
            Ok(()) => Some(path),
            Err(AssetError::Missing(_)) => None,
            Err(e) => {
                log::warn!("Ignoring {}", e);
                None
            }
        }
    }

    fn optional_image(&self, file_name: &str) -> Option<PathBuf> {
        let path = self.root.join(file_name);
        match check_png(&path) {
            Ok(()) => Some(path),
            Err(AssetError::Missing(_)) => None,
            Err(e) => {
                log::warn!("Ignoring {}", e);
                None
            }
        }
    }
}

impl AssetSource for DirectoryAssets {
    fn roster(&self) -> Vec<String> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) => {
                log::warn!("Cannot read asset folder {}: {}", self.root.display(), e);
                return Vec::new();
            }
        };

        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let file_name = entry.file_name().into_string().ok()?;
                let name = file_name.strip_suffix(BODY_SUFFIX)?;
                (!name.is_empty()).then(|| name.to_string())
            })
            .filter(|name| self.racer_assets(name).is_some())
            .collect();
        names.sort();
        names
    }

    fn racer_assets(&self, name: &str) -> Option<RacerAssets> {
        let body = self.root.join(format!("{}{}", name, BODY_SUFFIX));
        let winner = self.root.join(format!("{}_Winner.png", name));
        for path in [&body, &winner] {
            if let Err(e) = check_png(path) {
                log::warn!("Skipping racer {}: {}", name, e);
                return None;
            }
        }
        Some(RacerAssets {
            name: name.to_string(),
            body,
            winner,
            bounce_sound: self.optional(&format!("{}_Bounce.mp3", name)),
            winner_sound: self.optional(&format!("{}_Winner.mp3", name)),
        })
    }

    fn arena_assets(&self) -> ArenaAssets {
        let effects = [
            SoundEffect::Countdown,
            SoundEffect::Bounce,
            SoundEffect::Kiss,
            SoundEffect::Winner,
            SoundEffect::Music,
        ];
        let sound_overrides = effects
            .into_iter()
            .filter_map(|effect| Some((effect, self.optional(effect.override_file_name())?)))
            .collect();

        ArenaAssets {
            level: self.optional_image("Level.png"),
            background: self.optional_image("Background.png"),
            start_flag: self.optional_image("StartFlag.png"),
            goal_flag: self.optional_image("GoalFlag.png"),
            sound_overrides,
        }
    }
}

/// Racer profiles for the whole roster with sound overrides applied
pub fn profiles(source: &dyn AssetSource) -> Vec<RacerProfile> {
    let arena = source.arena_assets();
    let shared_bounce = arena.sound_overrides.get(&SoundEffect::Bounce).cloned();

    source
        .roster()
        .into_iter()
        .filter_map(|name| source.racer_assets(&name))
        .map(|assets| RacerProfile {
            name: assets.name,
            bounce_clip: Clip::from_override(assets.bounce_sound.or_else(|| shared_bounce.clone())),
            winner_clip: assets.winner_sound.map(Clip::Override),
        })
        .collect()
}

fn check_file(path: &Path) -> Result<(), AssetError> {
    let meta = fs::metadata(path).map_err(|_| AssetError::Missing(path.to_path_buf()))?;
    if !meta.is_file() || meta.len() == 0 {
        return Err(AssetError::Unreadable(path.to_path_buf()));
    }
    Ok(())
}

fn check_png(path: &Path) -> Result<(), AssetError> {
    check_file(path)?;
    let bytes = fs::read(path).map_err(|_| AssetError::Unreadable(path.to_path_buf()))?;
    if !bytes.starts_with(&PNG_MAGIC) {
        return Err(AssetError::Unreadable(path.to_path_buf()));
    }
    Ok(())
}
