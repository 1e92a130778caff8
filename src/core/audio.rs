/// Ambient/battle track bookkeeping and the scene-entry audio policy.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::schema::scene::{Scene, SceneId};

/// The two looping music tracks a story uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Track {
    Ambient,
    Battle,
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ambient => f.write_str("ambient"),
            Self::Battle => f.write_str("battle"),
        }
    }
}

/// An instruction for the audio collaborator. Fire-and-forget.
///
/// Music only. Per-input click sounds belong to the presentation layer,
/// which sees every stimulus it forwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AudioCue {
    /// Start a track from position zero.
    Play(Track),
    /// Pause a track where it is.
    Pause(Track),
    /// Stop every track.
    StopAll,
}

/// Which tracks are currently playing, as far as the engine has asked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioState {
    ambient: bool,
    battle: bool,
}

impl AudioState {
    pub fn ambient_playing(&self) -> bool {
        self.ambient
    }

    pub fn battle_playing(&self) -> bool {
        self.battle
    }

    pub fn is_silent(&self) -> bool {
        !self.ambient && !self.battle
    }

    /// A new playthrough always restarts ambient from zero.
    pub fn start_playthrough(&mut self) -> Vec<AudioCue> {
        let mut cues = Vec::with_capacity(2);
        if self.battle {
            self.battle = false;
            cues.push(AudioCue::Pause(Track::Battle));
        }
        self.ambient = true;
        cues.push(AudioCue::Play(Track::Ambient));
        cues
    }

    /// Cues for entering `scene`.
    ///
    /// Entering the battle scene swaps ambient for battle unless battle is
    /// already playing. Entering an ending stops everything, always. Any
    /// other scene leaves audio alone.
    pub fn enter_scene(&mut self, scene: &Scene, battle_scene: Option<&SceneId>) -> Vec<AudioCue> {
        let mut cues = Vec::new();
        if battle_scene == Some(&scene.id) && !self.battle {
            if self.ambient {
                self.ambient = false;
                cues.push(AudioCue::Pause(Track::Ambient));
            }
            self.battle = true;
            cues.push(AudioCue::Play(Track::Battle));
        }
        if scene.is_ending() {
            cues.push(self.stop_all());
        }
        cues
    }

    /// Stop only if something is still playing.
    pub fn settle(&mut self) -> Option<AudioCue> {
        (!self.is_silent()).then(|| self.stop_all())
    }

    fn stop_all(&mut self) -> AudioCue {
        self.ambient = false;
        self.battle = false;
        AudioCue::StopAll
    }
}
