//! Story graph and the playback state machine that walks it.

pub mod affinity;
pub mod audio;
pub mod controller;
pub mod events;
pub mod graph;
pub mod staging;
