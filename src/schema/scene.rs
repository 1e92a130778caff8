use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

use super::asset::AssetHandle;

/// Newtype wrapper for scene IDs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SceneId(pub String);

impl SceneId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SceneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SceneId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl Borrow<str> for SceneId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Newtype wrapper for affinity labels (the hidden counters a choice nudges).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AffinityLabel(pub String);

impl AffinityLabel {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AffinityLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AffinityLabel {
    fn from(label: &str) -> Self {
        Self(label.to_string())
    }
}

/// Who is talking on a dialogue line.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Speaker {
    /// Narration: no speaker label, no sprite.
    Narrator,
    Character(String),
}

impl Speaker {
    /// Name used by story data for narration lines.
    pub const NARRATOR_NAME: &'static str = "Narrator";

    /// Map a raw speaker name to a `Speaker`. Empty or absent names and the
    /// literal "Narrator" are narration.
    pub fn from_name(name: Option<&str>) -> Self {
        match name.map(str::trim) {
            None | Some("") => Self::Narrator,
            Some(Self::NARRATOR_NAME) => Self::Narrator,
            Some(other) => Self::Character(other.to_string()),
        }
    }

    /// The display name, or `None` for narration.
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Narrator => None,
            Self::Character(name) => Some(name),
        }
    }

    pub fn is_narrator(&self) -> bool {
        matches!(self, Self::Narrator)
    }
}

/// A single line of dialogue inside a scene.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogueLine {
    pub speaker: Speaker,
    pub text: String,
}

impl DialogueLine {
    pub fn new(speaker: &str, text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::from_name(Some(speaker)),
            text: text.into(),
        }
    }

    pub fn narration(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::Narrator,
            text: text.into(),
        }
    }
}

/// A player choice offered at the end of a scene.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    pub text: String,
    pub affinity: AffinityLabel,
    pub destination: SceneId,
}

impl Choice {
    pub fn new(text: impl Into<String>, affinity: &str, destination: &str) -> Self {
        Self {
            text: text.into(),
            affinity: AffinityLabel::from(affinity),
            destination: SceneId::from(destination),
        }
    }
}

/// How a scene is left once its last line has been shown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Exit {
    /// Wait for the player to pick one of these.
    Choices(Vec<Choice>),
    /// Chain straight into another scene.
    AutoNext(SceneId),
    /// Terminal scene; offers a restart.
    Ending,
}

impl Exit {
    /// Every scene id this exit can lead to, in declaration order.
    pub fn targets(&self) -> Vec<&SceneId> {
        match self {
            Self::Choices(choices) => choices.iter().map(|c| &c.destination).collect(),
            Self::AutoNext(next) => vec![next],
            Self::Ending => Vec::new(),
        }
    }
}

/// A scene: a background, ordered dialogue, and exactly one exit mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scene {
    pub id: SceneId,
    pub background: AssetHandle,
    pub dialogue: Vec<DialogueLine>,
    pub exit: Exit,
}

impl Scene {
    pub fn new(id: &str, background: &str, dialogue: Vec<DialogueLine>, exit: Exit) -> Self {
        Self {
            id: SceneId::from(id),
            background: AssetHandle::from(background),
            dialogue,
            exit,
        }
    }

    pub fn line(&self, cursor: usize) -> Option<&DialogueLine> {
        self.dialogue.get(cursor)
    }

    /// The choices offered at the end of this scene; empty unless the exit
    /// is `Exit::Choices`.
    pub fn choices(&self) -> &[Choice] {
        match &self.exit {
            Exit::Choices(choices) => choices.as_slice(),
            _ => &[],
        }
    }

    pub fn is_ending(&self) -> bool {
        matches!(self.exit, Exit::Ending)
    }
}
