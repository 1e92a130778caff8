/// The playback controller: walks a `StoryGraph` one stimulus at a time.
///
/// Every stimulus runs to completion, including any auto-advance chain,
/// before it returns the presentation events it produced. Rejected stimuli
/// leave the playback state untouched.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::core::affinity::AffinityCounters;
use crate::core::audio::AudioState;
use crate::core::events::{PresentationEvent, Stimulus};
use crate::core::graph::{MissingScene, StoryGraph};
use crate::core::staging::Staging;
use crate::schema::scene::{Choice, DialogueLine, Exit, Scene, SceneId};

#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("cannot {stimulus} while {phase} (scene: {})", scene_label(.scene))]
    InvalidTransition {
        stimulus: Stimulus,
        phase: Phase,
        scene: Option<SceneId>,
    },
    #[error("choice {index} is not available while {phase} in scene {} ({available} offered)", scene_label(.scene))]
    InvalidChoice {
        index: usize,
        available: usize,
        phase: Phase,
        scene: Option<SceneId>,
    },
    #[error("{stimulus} from scene {} failed: {missing}", scene_label(.scene))]
    MissingScene {
        #[source]
        missing: MissingScene,
        stimulus: Stimulus,
        scene: Option<SceneId>,
    },
}

impl PlaybackError {
    /// Whether the controller is still usable without a new playthrough.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::MissingScene { .. })
    }
}

fn scene_label(scene: &Option<SceneId>) -> &str {
    scene.as_ref().map_or("-", SceneId::as_str)
}

/// Where the controller is in its state machine.
///
/// Auto-advancing between scenes happens inside a single stimulus and is
/// never observable as a resting phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    /// No playthrough has started.
    Idle,
    PlayingDialogue,
    AwaitingChoice,
    Ended,
    /// A scene lookup failed mid-playthrough; only a new playthrough recovers.
    Faulted,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::PlayingDialogue => f.write_str("playing dialogue"),
            Self::AwaitingChoice => f.write_str("awaiting choice"),
            Self::Ended => f.write_str("ended"),
            Self::Faulted => f.write_str("faulted"),
        }
    }
}

/// Mutable state of one playthrough. Discarded when a new one starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackState {
    pub current_scene: SceneId,
    /// Index of the line on screen; equals the dialogue length once the
    /// scene's exit has been taken.
    pub cursor: usize,
    pub counters: AffinityCounters,
    /// 1 for the first playthrough, 2 after the first restart, and so on.
    pub playthrough: u32,
}

pub struct PlaybackController<'g> {
    graph: &'g StoryGraph,
    phase: Phase,
    state: Option<PlaybackState>,
    audio: AudioState,
    playthroughs: u32,
}

impl<'g> PlaybackController<'g> {
    pub fn new(graph: &'g StoryGraph) -> Self {
        Self {
            graph,
            phase: Phase::Idle,
            state: None,
            audio: AudioState::default(),
            playthroughs: 0,
        }
    }

    pub fn graph(&self) -> &'g StoryGraph {
        self.graph
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// The running (or just finished) playthrough, if any.
    pub fn state(&self) -> Option<&PlaybackState> {
        self.state.as_ref()
    }

    pub fn counters(&self) -> Option<&AffinityCounters> {
        self.state.as_ref().map(|s| &s.counters)
    }

    pub fn audio(&self) -> &AudioState {
        &self.audio
    }

    pub fn current_scene(&self) -> Option<&'g Scene> {
        let graph = self.graph;
        self.state
            .as_ref()
            .and_then(|s| graph.lookup(&s.current_scene).ok())
    }

    /// The line on screen while dialogue is playing.
    pub fn current_line(&self) -> Option<&'g DialogueLine> {
        if self.phase != Phase::PlayingDialogue {
            return None;
        }
        let cursor = self.state.as_ref()?.cursor;
        self.current_scene()?.line(cursor)
    }

    /// The choices on offer; empty unless awaiting a choice.
    pub fn current_choices(&self) -> &'g [Choice] {
        match (self.phase, self.current_scene()) {
            (Phase::AwaitingChoice, Some(scene)) => scene.choices(),
            _ => &[],
        }
    }

    /// Route a stimulus from an event-dispatch collaborator.
    pub fn dispatch(&mut self, stimulus: Stimulus) -> Result<Vec<PresentationEvent>, PlaybackError> {
        match stimulus {
            Stimulus::StartPlaythrough => self.start_playthrough(),
            Stimulus::Advance => self.advance(),
            Stimulus::SelectChoice(index) => self.select_choice(index),
            Stimulus::Restart => self.restart(),
        }
    }

    pub fn start_playthrough(&mut self) -> Result<Vec<PresentationEvent>, PlaybackError> {
        self.begin(
            Stimulus::StartPlaythrough,
            &[Phase::Idle, Phase::Ended, Phase::Faulted],
        )
    }

    pub fn restart(&mut self) -> Result<Vec<PresentationEvent>, PlaybackError> {
        self.begin(Stimulus::Restart, &[Phase::Ended])
    }

    /// Show the next line, or take the scene's exit after the last one.
    pub fn advance(&mut self) -> Result<Vec<PresentationEvent>, PlaybackError> {
        let stimulus = Stimulus::Advance;
        self.expect_phase(stimulus, &[Phase::PlayingDialogue])?;
        let scene = self.scene_for(stimulus)?;
        let Some(state) = self.state.as_mut() else {
            return Err(self.invalid_transition(stimulus));
        };

        let mut events = Vec::new();
        if state.cursor + 1 < scene.dialogue.len() {
            state.cursor += 1;
            if let Some(line) = scene.line(state.cursor) {
                events.push(self.line_event(line));
            }
            return Ok(events);
        }

        state.cursor = scene.dialogue.len();
        match &scene.exit {
            Exit::Choices(choices) => {
                tracing::debug!(scene = %scene.id, count = choices.len(), "presenting choices");
                self.phase = Phase::AwaitingChoice;
                events.push(PresentationEvent::ChoicesPresented(
                    choices.iter().map(|c| c.text.clone()).collect(),
                ));
            }
            Exit::AutoNext(next) => {
                tracing::debug!(from = %scene.id, to = %next, "auto-advancing");
                self.enter_scene(next, stimulus, &mut events)?;
            }
            Exit::Ending => {
                tracing::info!(scene = %scene.id, "story ended");
                self.phase = Phase::Ended;
                if let Some(cue) = self.audio.settle() {
                    events.push(PresentationEvent::Audio(cue));
                }
                events.push(PresentationEvent::Ended);
            }
        }
        Ok(events)
    }

    /// Take choice `index` of the current scene.
    pub fn select_choice(&mut self, index: usize) -> Result<Vec<PresentationEvent>, PlaybackError> {
        let stimulus = Stimulus::SelectChoice(index);
        if self.phase != Phase::AwaitingChoice {
            tracing::warn!(index, phase = %self.phase, "choice outside of a choice prompt");
            return Err(PlaybackError::InvalidChoice {
                index,
                available: 0,
                phase: self.phase,
                scene: self.current_scene_id(),
            });
        }

        let scene = self.scene_for(stimulus)?;
        let choices = scene.choices();
        let Some(choice) = choices.get(index) else {
            tracing::warn!(index, scene = %scene.id, offered = choices.len(), "no such choice");
            return Err(PlaybackError::InvalidChoice {
                index,
                available: choices.len(),
                phase: self.phase,
                scene: Some(scene.id.clone()),
            });
        };
        let Some(state) = self.state.as_mut() else {
            return Err(self.invalid_transition(stimulus));
        };

        let total = state.counters.record(&choice.affinity);
        tracing::debug!(
            scene = %scene.id,
            affinity = %choice.affinity,
            total = ?total,
            to = %choice.destination,
            "choice taken"
        );

        let mut events = Vec::new();
        self.enter_scene(&choice.destination, stimulus, &mut events)?;
        Ok(events)
    }

    fn begin(&mut self, stimulus: Stimulus, allowed: &[Phase]) -> Result<Vec<PresentationEvent>, PlaybackError> {
        self.expect_phase(stimulus, allowed)?;
        let graph = self.graph;

        self.playthroughs += 1;
        self.state = Some(PlaybackState {
            current_scene: graph.start().clone(),
            cursor: 0,
            counters: AffinityCounters::zeroed(graph.affinities()),
            playthrough: self.playthroughs,
        });
        tracing::info!(
            title = graph.title(),
            playthrough = self.playthroughs,
            "playthrough started"
        );

        let mut events: Vec<PresentationEvent> = self
            .audio
            .start_playthrough()
            .into_iter()
            .map(PresentationEvent::Audio)
            .collect();
        self.enter_scene(graph.start(), stimulus, &mut events)?;
        Ok(events)
    }

    /// Enter `target` at its first line, applying the audio policy.
    fn enter_scene(
        &mut self,
        target: &SceneId,
        stimulus: Stimulus,
        events: &mut Vec<PresentationEvent>,
    ) -> Result<(), PlaybackError> {
        let graph = self.graph;
        let scene = match graph.lookup(target) {
            Ok(scene) => scene,
            Err(missing) => return Err(self.fault(stimulus, missing)),
        };
        let Some(state) = self.state.as_mut() else {
            return Err(self.invalid_transition(stimulus));
        };
        state.current_scene = scene.id.clone();
        state.cursor = 0;
        self.phase = Phase::PlayingDialogue;

        let cues = self.audio.enter_scene(scene, graph.battle_scene());
        if !cues.is_empty() {
            tracing::debug!(scene = %scene.id, ?cues, "audio cues");
        }
        events.extend(cues.into_iter().map(PresentationEvent::Audio));
        events.push(PresentationEvent::SceneEntered {
            scene: scene.id.clone(),
            background: scene.background.clone(),
            battle_audio: self.audio.battle_playing(),
            ambient_audio: self.audio.ambient_playing(),
        });
        if let Some(line) = scene.line(0) {
            events.push(self.line_event(line));
        }
        tracing::debug!(scene = %scene.id, lines = scene.dialogue.len(), "entered scene");
        Ok(())
    }

    fn line_event(&self, line: &DialogueLine) -> PresentationEvent {
        PresentationEvent::LineShown {
            speaker: line.speaker.name().map(str::to_string),
            text: line.text.clone(),
            staging: Staging::for_line(line, self.graph.protagonist(), self.graph.sprites()),
        }
    }

    /// Look up the current scene, faulting the playthrough if it is gone.
    fn scene_for(&mut self, stimulus: Stimulus) -> Result<&'g Scene, PlaybackError> {
        let graph = self.graph;
        let Some(id) = self.current_scene_id() else {
            return Err(self.invalid_transition(stimulus));
        };
        graph.lookup(&id).map_err(|missing| self.fault(stimulus, missing))
    }

    fn current_scene_id(&self) -> Option<SceneId> {
        self.state.as_ref().map(|s| s.current_scene.clone())
    }

    fn expect_phase(&self, stimulus: Stimulus, allowed: &[Phase]) -> Result<(), PlaybackError> {
        if allowed.contains(&self.phase) {
            Ok(())
        } else {
            Err(self.invalid_transition(stimulus))
        }
    }

    fn invalid_transition(&self, stimulus: Stimulus) -> PlaybackError {
        tracing::warn!(%stimulus, phase = %self.phase, "stimulus rejected");
        PlaybackError::InvalidTransition {
            stimulus,
            phase: self.phase,
            scene: self.current_scene_id(),
        }
    }

    fn fault(&mut self, stimulus: Stimulus, missing: MissingScene) -> PlaybackError {
        tracing::error!(%stimulus, %missing, "playthrough faulted");
        self.phase = Phase::Faulted;
        PlaybackError::MissingScene {
            missing,
            stimulus,
            scene: self.current_scene_id(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::audio::{AudioCue, Track};

    fn lines(texts: &[&str]) -> Vec<DialogueLine> {
        texts.iter().map(|t| DialogueLine::new("Amari", *t)).collect()
    }

    /// academy --choice--> sim --auto--> hive --choice--> hive | end
    fn test_graph() -> StoryGraph {
        StoryGraph::builder()
            .title("Test")
            .start("academy")
            .battle_scene("hive")
            .protagonist("Amari")
            .affinities(&["Onyx", "Brian", "Amari"])
            .sprite("Amari", "amari.png")
            .scene(Scene::new(
                "academy",
                "academy.png",
                lines(&["One.", "Two.", "Three."]),
                Exit::Choices(vec![
                    Choice::new("Joke", "Onyx", "sim"),
                    Choice::new("Confide", "Amari", "sim"),
                    Choice::new("Focus", "Brian", "sim"),
                ]),
            ))
            .scene(Scene::new(
                "sim",
                "sim.png",
                lines(&["Pass."]),
                Exit::AutoNext("hive".into()),
            ))
            .scene(Scene::new(
                "hive",
                "hive.png",
                vec![DialogueLine::narration("It hums.")],
                Exit::Choices(vec![
                    Choice::new("Hold position", "Brian", "hive"),
                    Choice::new("Charge", "Onyx", "end"),
                ]),
            ))
            .scene(Scene::new(
                "end",
                "end.png",
                lines(&["Done."]),
                Exit::Ending,
            ))
            .build()
            .unwrap()
    }

    fn advance_to_choice(ctl: &mut PlaybackController<'_>) {
        while ctl.phase() == Phase::PlayingDialogue {
            ctl.advance().unwrap();
        }
    }

    #[test]
    fn starts_idle() {
        let graph = test_graph();
        let ctl = PlaybackController::new(&graph);
        assert_eq!(ctl.phase(), Phase::Idle);
        assert!(ctl.state().is_none());
        assert!(ctl.counters().is_none());
        assert!(ctl.current_line().is_none());
    }

    #[test]
    fn start_enters_first_scene() {
        let graph = test_graph();
        let mut ctl = PlaybackController::new(&graph);
        let events = ctl.start_playthrough().unwrap();

        assert_eq!(events[0], PresentationEvent::Audio(AudioCue::Play(Track::Ambient)));
        assert!(matches!(
            &events[1],
            PresentationEvent::SceneEntered { scene, ambient_audio: true, battle_audio: false, .. }
                if scene.as_str() == "academy"
        ));
        assert!(matches!(&events[2], PresentationEvent::LineShown { text, .. } if text == "One."));

        let state = ctl.state().unwrap();
        assert_eq!(ctl.phase(), Phase::PlayingDialogue);
        assert_eq!(state.current_scene.as_str(), "academy");
        assert_eq!(state.cursor, 0);
        assert_eq!(state.playthrough, 1);
        assert_eq!(ctl.counters().unwrap().choices_made(), 0);
    }

    #[test]
    fn cursor_moves_forward_then_leaves_dialogue() {
        let graph = test_graph();
        let mut ctl = PlaybackController::new(&graph);
        ctl.start_playthrough().unwrap();

        let mut last = 0;
        for _ in 0..2 {
            let events = ctl.advance().unwrap();
            let cursor = ctl.state().unwrap().cursor;
            assert!(cursor > last);
            last = cursor;
            assert_eq!(events.len(), 1);
            assert!(events[0].is_line());
        }
        assert_eq!(ctl.current_line().map(|l| l.text.as_str()), Some("Three."));

        let events = ctl.advance().unwrap();
        assert_eq!(ctl.phase(), Phase::AwaitingChoice);
        assert_eq!(
            events,
            vec![PresentationEvent::ChoicesPresented(vec![
                "Joke".to_string(),
                "Confide".to_string(),
                "Focus".to_string(),
            ])]
        );
        assert_eq!(ctl.current_choices().len(), 3);
        assert!(ctl.current_line().is_none());
    }

    #[test]
    fn choice_counts_affinity_and_moves() {
        let graph = test_graph();
        let mut ctl = PlaybackController::new(&graph);
        ctl.start_playthrough().unwrap();
        advance_to_choice(&mut ctl);

        let events = ctl.select_choice(0).unwrap();
        let state = ctl.state().unwrap();
        assert_eq!(state.counters.get("Onyx"), 1);
        assert_eq!(state.counters.get("Brian"), 0);
        assert_eq!(state.counters.get("Amari"), 0);
        assert_eq!(state.current_scene.as_str(), "sim");
        assert_eq!(state.cursor, 0);
        assert_eq!(ctl.phase(), Phase::PlayingDialogue);
        assert!(matches!(&events[0], PresentationEvent::SceneEntered { scene, .. } if scene.as_str() == "sim"));
    }

    #[test]
    fn auto_next_chains_without_extra_stimulus() {
        let graph = test_graph();
        let mut ctl = PlaybackController::new(&graph);
        ctl.start_playthrough().unwrap();
        advance_to_choice(&mut ctl);
        ctl.select_choice(1).unwrap();

        let events = ctl.advance().unwrap();
        assert_eq!(ctl.phase(), Phase::PlayingDialogue);
        assert_eq!(ctl.state().unwrap().current_scene.as_str(), "hive");
        assert_eq!(ctl.state().unwrap().cursor, 0);
        assert_eq!(
            events[..2],
            [
                PresentationEvent::Audio(AudioCue::Pause(Track::Ambient)),
                PresentationEvent::Audio(AudioCue::Play(Track::Battle)),
            ]
        );
        assert!(matches!(
            &events[2],
            PresentationEvent::SceneEntered { battle_audio: true, ambient_audio: false, .. }
        ));
        assert!(matches!(
            &events[3],
            PresentationEvent::LineShown { speaker: None, staging, .. }
                if staging.focus == crate::core::staging::Focus::Narration
        ));
    }

    #[test]
    fn battle_self_loop_starts_battle_once() {
        let graph = test_graph();
        let mut ctl = PlaybackController::new(&graph);
        let mut all = ctl.start_playthrough().unwrap();
        advance_to_choice(&mut ctl);
        all.extend(ctl.select_choice(2).unwrap());
        all.extend(ctl.advance().unwrap());
        for _ in 0..3 {
            all.extend(ctl.advance().unwrap());
            all.extend(ctl.select_choice(0).unwrap());
        }

        let battle_starts = all
            .iter()
            .filter(|e| **e == PresentationEvent::Audio(AudioCue::Play(Track::Battle)))
            .count();
        assert_eq!(battle_starts, 1);
        assert_eq!(ctl.counters().unwrap().get("Brian"), 4);
        assert!(ctl.audio().battle_playing());
    }

    #[test]
    fn ending_then_restart_resets() {
        let graph = test_graph();
        let mut ctl = PlaybackController::new(&graph);
        ctl.start_playthrough().unwrap();
        advance_to_choice(&mut ctl);
        ctl.select_choice(0).unwrap();
        ctl.advance().unwrap();
        ctl.advance().unwrap();

        let mut all = ctl.select_choice(1).unwrap();
        all.extend(ctl.advance().unwrap());
        assert_eq!(ctl.phase(), Phase::Ended);
        assert_eq!(all.last(), Some(&PresentationEvent::Ended));
        let stops = all
            .iter()
            .filter(|e| **e == PresentationEvent::Audio(AudioCue::StopAll))
            .count();
        assert_eq!(stops, 1);
        assert_eq!(ctl.counters().unwrap().get("Onyx"), 2);

        let events = ctl.restart().unwrap();
        let state = ctl.state().unwrap();
        assert_eq!(state.current_scene, *graph.start());
        assert_eq!(state.playthrough, 2);
        assert!(state.counters.iter().all(|(_, c)| c == 0));
        assert!(!events.contains(&PresentationEvent::Audio(AudioCue::StopAll)));
        assert_eq!(events[0], PresentationEvent::Audio(AudioCue::Play(Track::Ambient)));
    }

    #[test]
    fn invalid_transitions_leave_state_alone() {
        let graph = test_graph();
        let mut ctl = PlaybackController::new(&graph);

        assert!(matches!(
            ctl.advance(),
            Err(PlaybackError::InvalidTransition { phase: Phase::Idle, .. })
        ));
        assert!(matches!(ctl.restart(), Err(PlaybackError::InvalidTransition { .. })));

        ctl.start_playthrough().unwrap();
        advance_to_choice(&mut ctl);
        let before = ctl.state().cloned();

        let err = ctl.advance().unwrap_err();
        assert!(err.is_recoverable());
        assert!(matches!(
            err,
            PlaybackError::InvalidTransition { stimulus: Stimulus::Advance, phase: Phase::AwaitingChoice, scene: Some(ref s) }
                if s.as_str() == "academy"
        ));
        assert!(ctl.start_playthrough().is_err());
        assert_eq!(ctl.state().cloned(), before);
        assert_eq!(ctl.phase(), Phase::AwaitingChoice);
    }

    #[test]
    fn invalid_choice_is_recoverable() {
        let graph = test_graph();
        let mut ctl = PlaybackController::new(&graph);
        ctl.start_playthrough().unwrap();

        assert!(matches!(
            ctl.select_choice(0),
            Err(PlaybackError::InvalidChoice { phase: Phase::PlayingDialogue, .. })
        ));

        advance_to_choice(&mut ctl);
        let before = ctl.state().cloned();
        assert!(matches!(
            ctl.select_choice(3),
            Err(PlaybackError::InvalidChoice { index: 3, available: 3, .. })
        ));
        assert_eq!(ctl.state().cloned(), before);
        assert_eq!(ctl.phase(), Phase::AwaitingChoice);
        assert!(ctl.select_choice(2).is_ok());
    }

    #[test]
    fn dispatch_routes_stimuli() {
        let graph = test_graph();
        let mut ctl = PlaybackController::new(&graph);
        ctl.dispatch(Stimulus::StartPlaythrough).unwrap();
        ctl.dispatch(Stimulus::Advance).unwrap();
        ctl.dispatch(Stimulus::Advance).unwrap();
        ctl.dispatch(Stimulus::Advance).unwrap();
        ctl.dispatch(Stimulus::SelectChoice(2)).unwrap();
        assert_eq!(ctl.counters().unwrap().get("Brian"), 1);
        assert!(ctl.dispatch(Stimulus::Restart).is_err());
    }

    #[test]
    fn missing_scene_faults_playthrough() {
        let graph = StoryGraph::unchecked(
            "a",
            &["Onyx"],
            vec![Scene::new(
                "a",
                "a.png",
                lines(&["Hi."]),
                Exit::AutoNext("ghost".into()),
            )],
        );
        let mut ctl = PlaybackController::new(&graph);
        ctl.start_playthrough().unwrap();

        let err = ctl.advance().unwrap_err();
        assert!(!err.is_recoverable());
        assert!(matches!(
            &err,
            PlaybackError::MissingScene { missing, scene: Some(from), .. }
                if missing.0.as_str() == "ghost" && from.as_str() == "a"
        ));
        assert_eq!(ctl.phase(), Phase::Faulted);
        assert!(ctl.advance().is_err());

        ctl.start_playthrough().unwrap();
        assert_eq!(ctl.phase(), Phase::PlayingDialogue);
        assert_eq!(ctl.state().unwrap().playthrough, 2);
    }

    #[test]
    fn error_messages_name_scene_and_stimulus() {
        let graph = test_graph();
        let mut ctl = PlaybackController::new(&graph);
        let msg = ctl.advance().unwrap_err().to_string();
        assert_eq!(msg, "cannot advance while idle (scene: -)");

        ctl.start_playthrough().unwrap();
        let msg = ctl.select_choice(7).unwrap_err().to_string();
        assert!(msg.contains("academy"));
        assert!(msg.contains("choice 7"));
    }
}
