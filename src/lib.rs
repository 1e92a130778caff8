//! Novella: a scene/dialogue/choice state machine for visual novels.
//!
//! A story is a static graph of scenes. Each scene plays its dialogue lines
//! in order and then either offers choices (which nudge hidden affinity
//! counters), chains into a successor scene, or ends the story. The
//! playback controller walks that graph one player stimulus at a time and
//! tells the presentation layer what to show and play.

pub mod core;
pub mod schema;
pub mod stories;
