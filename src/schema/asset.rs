use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::scene::Speaker;

/// Opaque handle to a presentation asset (background image, sprite).
///
/// The engine never interprets it; it is passed through to the presentation
/// layer untouched.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetHandle(pub String);

impl AssetHandle {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AssetHandle {
    fn from(path: &str) -> Self {
        Self(path.to_string())
    }
}

/// Partial mapping from speaker name to sprite.
///
/// A missing entry is not an error: it means the speaker has no visual
/// representation, which is the normal case for narration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpriteRegistry {
    sprites: FxHashMap<String, AssetHandle>,
}

impl SpriteRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, speaker: impl Into<String>, sprite: AssetHandle) {
        self.sprites.insert(speaker.into(), sprite);
    }

    pub fn get(&self, name: &str) -> Option<&AssetHandle> {
        self.sprites.get(name)
    }

    /// Sprite for whoever is speaking; narration never has one.
    pub fn sprite_for(&self, speaker: &Speaker) -> Option<&AssetHandle> {
        speaker.name().and_then(|name| self.get(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.sprites.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.sprites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sprites.is_empty()
    }
}
