/// Sprite placement for a shown line.
///
/// The protagonist always stands on the left. Whoever else is speaking
/// stands on the right if they have a sprite. The speaking side is in focus;
/// narration puts neither side in focus.

use serde::{Deserialize, Serialize};

use crate::schema::asset::{AssetHandle, SpriteRegistry};
use crate::schema::scene::{DialogueLine, Speaker};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Focus {
    Left,
    Right,
    /// Both sides dimmed.
    Narration,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Staging {
    pub left: Option<AssetHandle>,
    pub right: Option<AssetHandle>,
    pub focus: Focus,
}

impl Staging {
    pub fn for_line(line: &DialogueLine, protagonist: Option<&str>, sprites: &SpriteRegistry) -> Self {
        let left = protagonist.and_then(|name| sprites.get(name)).cloned();

        let (right, focus) = match &line.speaker {
            Speaker::Narrator => (None, Focus::Narration),
            Speaker::Character(name) if Some(name.as_str()) == protagonist => (None, Focus::Left),
            Speaker::Character(name) => (sprites.get(name).cloned(), Focus::Right),
        };

        Self { left, right, focus }
    }
}
