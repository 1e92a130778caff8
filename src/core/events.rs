/// Stimuli the controller accepts and notifications it emits.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::audio::AudioCue;
use crate::core::staging::Staging;
use crate::schema::asset::AssetHandle;
use crate::schema::scene::SceneId;

/// One external input to the playback controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stimulus {
    StartPlaythrough,
    Advance,
    /// Index into the current scene's choice list.
    SelectChoice(usize),
    Restart,
}

impl fmt::Display for Stimulus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StartPlaythrough => f.write_str("start"),
            Self::Advance => f.write_str("advance"),
            Self::SelectChoice(index) => write!(f, "select choice {}", index),
            Self::Restart => f.write_str("restart"),
        }
    }
}

/// A notification for the presentation layer, in emission order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PresentationEvent {
    /// A scene was entered; swap the background. The audio flags describe
    /// which tracks should be playing after this entry.
    SceneEntered {
        scene: SceneId,
        background: AssetHandle,
        battle_audio: bool,
        ambient_audio: bool,
    },
    /// Show a line. `speaker` is `None` for narration.
    LineShown {
        speaker: Option<String>,
        text: String,
        staging: Staging,
    },
    /// Show the choice labels, in order.
    ChoicesPresented(Vec<String>),
    /// The story is over; offer a restart.
    Ended,
    Audio(AudioCue),
}

impl PresentationEvent {
    pub fn is_line(&self) -> bool {
        matches!(self, Self::LineShown { .. })
    }
}
