//! Story data types: scenes, dialogue, choices, and asset references.

pub mod asset;
pub mod scene;
