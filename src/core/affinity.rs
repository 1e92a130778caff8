/// Hidden affinity counters nudged by player choices.

use serde::{Deserialize, Serialize};

use crate::schema::scene::AffinityLabel;

/// Per-label choice counts for one playthrough.
///
/// Counts only ever grow within a playthrough; a new playthrough starts from
/// a fresh, zeroed set. Labels keep the order they were declared in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AffinityCounters {
    counts: Vec<(AffinityLabel, u32)>,
}

impl AffinityCounters {
    /// A counter at zero for every label.
    pub fn zeroed(labels: &[AffinityLabel]) -> Self {
        Self {
            counts: labels.iter().map(|l| (l.clone(), 0)).collect(),
        }
    }

    /// Count one more choice for `label` and return the new total for it.
    ///
    /// The label set is closed: a label outside it is not counted and
    /// yields `None`.
    pub fn record(&mut self, label: &AffinityLabel) -> Option<u32> {
        let Some((_, count)) = self.counts.iter_mut().find(|(l, _)| l == label) else {
            tracing::warn!(%label, "undeclared affinity label ignored");
            return None;
        };
        *count += 1;
        Some(*count)
    }

    /// Count for `label`; zero for labels never seen.
    pub fn get(&self, label: &str) -> u32 {
        self.counts
            .iter()
            .find(|(l, _)| l.as_str() == label)
            .map_or(0, |(_, count)| *count)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&AffinityLabel, u32)> {
        self.counts.iter().map(|(l, c)| (l, *c))
    }

    /// Total number of choices made.
    pub fn choices_made(&self) -> u32 {
        self.counts.iter().map(|(_, c)| c).sum()
    }

    /// The label with the strictly highest count, if there is one.
    ///
    /// Nothing in playback reads this; endings are chosen by destination.
    pub fn leading(&self) -> Option<&AffinityLabel> {
        let max = self.counts.iter().map(|(_, c)| *c).max()?;
        if max == 0 {
            return None;
        }
        let mut top = self.counts.iter().filter(|(_, c)| *c == max);
        match (top.next(), top.next()) {
            (Some((label, _)), None) => Some(label),
            _ => None,
        }
    }
}
