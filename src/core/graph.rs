/// Story graph: scene storage, construction-time validation, and RON loading.

use rustc_hash::{FxHashMap, FxHashSet};
use serde::Deserialize;
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use thiserror::Error;

use crate::schema::asset::{AssetHandle, SpriteRegistry};
use crate::schema::scene::{AffinityLabel, Choice, DialogueLine, Exit, Scene, SceneId, Speaker};

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("duplicate scene id '{0}'")]
    DuplicateScene(SceneId),
    #[error("scene '{0}' has no dialogue")]
    EmptyDialogue(SceneId),
    #[error("scene '{scene}' must define exactly one of choices, next, or end (found {found})")]
    MalformedExit { scene: SceneId, found: usize },
    #[error("scene '{0}' offers an empty choice list")]
    EmptyChoices(SceneId),
    #[error("scene '{scene}' uses unknown affinity label '{label}'")]
    UnknownAffinity { scene: SceneId, label: AffinityLabel },
    #[error("story declares no affinity labels")]
    NoAffinities,
    #[error("scene '{referenced_by}' points to missing scene '{target}'")]
    MissingScene {
        referenced_by: SceneId,
        target: SceneId,
    },
    #[error("start scene '{0}' does not exist")]
    MissingStart(SceneId),
    #[error("no start scene configured")]
    NoStart,
    #[error("battle scene '{0}' does not exist")]
    MissingBattleScene(SceneId),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
}

/// Lookup failure for a scene id that is not in the graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("scene not found: {0}")]
pub struct MissingScene(pub SceneId);

/// The immutable set of scenes making up one story.
///
/// Only `StoryGraphBuilder::build` and the RON loaders create a graph, and
/// both validate it first: every scene has dialogue and exactly one exit,
/// every choice uses a declared affinity label, and every destination
/// resolves. After construction nothing can mutate it.
#[derive(Debug, Clone)]
pub struct StoryGraph {
    title: String,
    scenes: Vec<Scene>,
    index: FxHashMap<SceneId, usize>,
    start: SceneId,
    battle_scene: Option<SceneId>,
    protagonist: Option<String>,
    affinities: Vec<AffinityLabel>,
    sprites: SpriteRegistry,
}

impl StoryGraph {
    pub fn builder() -> StoryGraphBuilder {
        StoryGraphBuilder::default()
    }

    /// Load a story from a RON file.
    pub fn load_from_ron(path: &Path) -> Result<StoryGraph, GraphError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    /// Parse a story from a RON string.
    pub fn parse_ron(input: &str) -> Result<StoryGraph, GraphError> {
        let raw: RonStory = ron::from_str(input)?;
        raw.into_builder()?.build()
    }

    pub fn lookup(&self, id: &SceneId) -> Result<&Scene, MissingScene> {
        self.index
            .get(id)
            .map(|&i| &self.scenes[i])
            .ok_or_else(|| MissingScene(id.clone()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn start(&self) -> &SceneId {
        &self.start
    }

    pub fn battle_scene(&self) -> Option<&SceneId> {
        self.battle_scene.as_ref()
    }

    pub fn protagonist(&self) -> Option<&str> {
        self.protagonist.as_deref()
    }

    pub fn affinities(&self) -> &[AffinityLabel] {
        &self.affinities
    }

    pub fn sprites(&self) -> &SpriteRegistry {
        &self.sprites
    }

    /// All scenes in declaration order.
    pub fn scenes(&self) -> &[Scene] {
        &self.scenes
    }

    pub fn len(&self) -> usize {
        self.scenes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }

    /// Ending scenes in declaration order.
    pub fn endings(&self) -> impl Iterator<Item = &Scene> {
        self.scenes.iter().filter(|s| s.is_ending())
    }

    /// Scene ids reachable from the start scene by following exits.
    pub fn reachable_from_start(&self) -> FxHashSet<SceneId> {
        let mut seen = FxHashSet::default();
        let mut queue = VecDeque::from([self.start.clone()]);
        while let Some(id) = queue.pop_front() {
            if !seen.insert(id.clone()) {
                continue;
            }
            if let Ok(scene) = self.lookup(&id) {
                for target in scene.exit.targets() {
                    if !seen.contains(target) {
                        queue.push_back(target.clone());
                    }
                }
            }
        }
        seen
    }

    /// Build without validation, for exercising runtime fault handling.
    #[cfg(test)]
    pub(crate) fn unchecked(start: &str, affinities: &[&str], scenes: Vec<Scene>) -> StoryGraph {
        let index = scenes
            .iter()
            .enumerate()
            .map(|(i, s)| (s.id.clone(), i))
            .collect();
        StoryGraph {
            title: String::new(),
            scenes,
            index,
            start: SceneId::from(start),
            battle_scene: None,
            protagonist: None,
            affinities: affinities.iter().map(|&a| AffinityLabel::from(a)).collect(),
            sprites: SpriteRegistry::new(),
        }
    }
}

/// Builder for assembling a `StoryGraph` in code.
#[derive(Debug, Default)]
pub struct StoryGraphBuilder {
    title: String,
    start: Option<SceneId>,
    battle_scene: Option<SceneId>,
    protagonist: Option<String>,
    affinities: Vec<AffinityLabel>,
    sprites: SpriteRegistry,
    scenes: Vec<Scene>,
}

impl StoryGraphBuilder {
    pub fn title(mut self, title: &str) -> Self {
        self.title = title.to_string();
        self
    }

    pub fn start(mut self, id: &str) -> Self {
        self.start = Some(SceneId::from(id));
        self
    }

    /// Scene whose entry switches the ambient track to the battle track.
    pub fn battle_scene(mut self, id: &str) -> Self {
        self.battle_scene = Some(SceneId::from(id));
        self
    }

    /// Character who always stands on the left of the stage.
    pub fn protagonist(mut self, name: &str) -> Self {
        self.protagonist = Some(name.to_string());
        self
    }

    pub fn affinity(mut self, label: &str) -> Self {
        let label = AffinityLabel::from(label);
        if !self.affinities.contains(&label) {
            self.affinities.push(label);
        }
        self
    }

    pub fn affinities(self, labels: &[&str]) -> Self {
        labels.iter().fold(self, |builder, label| builder.affinity(label))
    }

    pub fn sprite(mut self, speaker: &str, asset: &str) -> Self {
        self.sprites.register(speaker, AssetHandle::from(asset));
        self
    }

    pub fn scene(mut self, scene: Scene) -> Self {
        self.scenes.push(scene);
        self
    }

    pub fn build(self) -> Result<StoryGraph, GraphError> {
        if self.affinities.is_empty() {
            return Err(GraphError::NoAffinities);
        }

        let mut index = FxHashMap::default();
        for (i, scene) in self.scenes.iter().enumerate() {
            if index.insert(scene.id.clone(), i).is_some() {
                return Err(GraphError::DuplicateScene(scene.id.clone()));
            }
        }

        for scene in &self.scenes {
            if scene.dialogue.is_empty() {
                return Err(GraphError::EmptyDialogue(scene.id.clone()));
            }
            if let Exit::Choices(choices) = &scene.exit {
                if choices.is_empty() {
                    return Err(GraphError::EmptyChoices(scene.id.clone()));
                }
                if let Some(choice) = choices
                    .iter()
                    .find(|c| !self.affinities.contains(&c.affinity))
                {
                    return Err(GraphError::UnknownAffinity {
                        scene: scene.id.clone(),
                        label: choice.affinity.clone(),
                    });
                }
            }
            for target in scene.exit.targets() {
                if !index.contains_key(target) {
                    return Err(GraphError::MissingScene {
                        referenced_by: scene.id.clone(),
                        target: target.clone(),
                    });
                }
            }
        }

        let start = self.start.ok_or(GraphError::NoStart)?;
        if !index.contains_key(&start) {
            return Err(GraphError::MissingStart(start));
        }
        if let Some(battle) = &self.battle_scene {
            if !index.contains_key(battle) {
                return Err(GraphError::MissingBattleScene(battle.clone()));
            }
        }

        tracing::debug!(
            title = %self.title,
            scenes = self.scenes.len(),
            "story graph built"
        );

        Ok(StoryGraph {
            title: self.title,
            scenes: self.scenes,
            index,
            start,
            battle_scene: self.battle_scene,
            protagonist: self.protagonist,
            affinities: self.affinities,
            sprites: self.sprites,
        })
    }
}

// RON deserialization helpers. Story files keep the three exit fields
// side by side, so they go through intermediate structs and are folded
// into `Exit` here.

#[derive(Debug, Deserialize)]
#[serde(rename = "Story")]
struct RonStory {
    #[serde(default)]
    title: String,
    start: String,
    #[serde(default)]
    battle_scene: Option<String>,
    #[serde(default)]
    protagonist: Option<String>,
    affinities: Vec<String>,
    #[serde(default)]
    sprites: HashMap<String, String>,
    scenes: Vec<RonScene>,
}

#[derive(Debug, Deserialize)]
#[serde(rename = "Scene")]
struct RonScene {
    id: String,
    background: String,
    dialogue: Vec<RonLine>,
    #[serde(default)]
    choices: Option<Vec<RonChoice>>,
    #[serde(default)]
    next: Option<String>,
    #[serde(default)]
    end: bool,
}

/// `(speaker, text)`
#[derive(Debug, Deserialize)]
struct RonLine(String, String);

#[derive(Debug, Deserialize)]
struct RonChoice {
    text: String,
    affinity: String,
    next: String,
}

impl RonStory {
    fn into_builder(self) -> Result<StoryGraphBuilder, GraphError> {
        let mut builder = StoryGraph::builder()
            .title(&self.title)
            .start(&self.start);
        if let Some(battle) = &self.battle_scene {
            builder = builder.battle_scene(battle);
        }
        if let Some(protagonist) = &self.protagonist {
            builder = builder.protagonist(protagonist);
        }
        for label in &self.affinities {
            builder = builder.affinity(label);
        }
        for (speaker, asset) in &self.sprites {
            builder = builder.sprite(speaker, asset);
        }
        for scene in self.scenes {
            builder = builder.scene(scene.into_scene()?);
        }
        Ok(builder)
    }
}

impl RonScene {
    fn into_scene(self) -> Result<Scene, GraphError> {
        let id = SceneId::new(self.id);
        let found = usize::from(self.choices.is_some())
            + usize::from(self.next.is_some())
            + usize::from(self.end);
        if found != 1 {
            return Err(GraphError::MalformedExit { scene: id, found });
        }

        let exit = match (self.choices, self.next) {
            (Some(choices), _) if choices.is_empty() => {
                return Err(GraphError::EmptyChoices(id));
            }
            (Some(choices), _) => Exit::Choices(
                choices
                    .into_iter()
                    .map(|c| Choice::new(c.text, &c.affinity, &c.next))
                    .collect(),
            ),
            (None, Some(next)) => Exit::AutoNext(SceneId::new(next)),
            (None, None) => Exit::Ending,
        };

        let dialogue = self
            .dialogue
            .into_iter()
            .map(|RonLine(speaker, text)| DialogueLine {
                speaker: Speaker::from_name(Some(&speaker)),
                text,
            })
            .collect();

        Ok(Scene {
            id,
            background: AssetHandle(self.background),
            dialogue,
            exit,
        })
    }
}
