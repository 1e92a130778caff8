//! Stories compiled into the crate.

use crate::core::graph::{GraphError, StoryGraph};

mod data {
    pub const AMARI_BUGS_OUT: &str = include_str!("../story_data/amari_bugs_out/story.ron");
}

/// "Amari Bugs Out": nine scenes of graduation day, a simulation that
/// auto-advances into the briefing, a hive battle, and three endings.
pub fn amari_bugs_out() -> Result<StoryGraph, GraphError> {
    StoryGraph::parse_ron(data::AMARI_BUGS_OUT)
}
