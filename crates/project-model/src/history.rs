//! Whole-state undo/redo history.
//!
//! Every undo step is a full [`TimelineState`] copy. Provider handles inside
//! clips are reference counted, so a snapshot copies records and bumps
//! counters but never reopens media.

use std::collections::{BTreeMap, VecDeque};

use crate::clip::ClipEntry;
use crate::ids::{ClipId, LayerId, TrackId};
use crate::text::TextLayer;
use crate::track::Track;

/// Default number of undo steps kept.
pub const DEFAULT_HISTORY_CAPACITY: usize = 50;

/// A complete copy of the project graph and its identity counters.
#[derive(Debug, Clone, PartialEq)]
pub struct TimelineState {
    pub clips: BTreeMap<ClipId, ClipEntry>,
    pub text_layers: BTreeMap<LayerId, TextLayer>,
    pub tracks: BTreeMap<TrackId, Track>,
    pub next_clip_id: ClipId,
    pub next_layer_id: LayerId,
    pub next_track_id: TrackId,
}

impl Default for TimelineState {
    fn default() -> Self {
        Self {
            clips: BTreeMap::new(),
            text_layers: BTreeMap::new(),
            tracks: BTreeMap::new(),
            next_clip_id: ClipId::FIRST,
            next_layer_id: LayerId::FIRST,
            next_track_id: TrackId::FIRST,
        }
    }
}

/// Two bounded LIFO stacks of snapshots.
#[derive(Debug, Clone)]
pub struct History {
    undo: VecDeque<TimelineState>,
    redo: Vec<TimelineState>,
    capacity: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

impl History {
    /// A history keeping at most `capacity` undo steps (at least 1).
    pub fn new(capacity: usize) -> Self {
        Self {
            undo: VecDeque::new(),
            redo: Vec::new(),
            capacity: capacity.max(1),
        }
    }

    /// Record the state *before* a mutation. Evicts the oldest snapshot when
    /// full and invalidates the redo stack.
    pub fn push(&mut self, snapshot: TimelineState) {
        self.undo.push_back(snapshot);
        while self.undo.len() > self.capacity {
            self.undo.pop_front();
        }
        self.redo.clear();
        tracing::debug!(undo_depth = self.undo.len(), "History snapshot pushed");
    }

    /// Step back: stores `current` for redo and returns the state to restore.
    pub fn undo(&mut self, current: TimelineState) -> Option<TimelineState> {
        let previous = self.undo.pop_back()?;
        self.redo.push(current);
        Some(previous)
    }

    /// Step forward: stores `current` for undo and returns the state to restore.
    pub fn redo(&mut self, current: TimelineState) -> Option<TimelineState> {
        let next = self.redo.pop()?;
        self.undo.push_back(current);
        while self.undo.len() > self.capacity {
            self.undo.pop_front();
        }
        Some(next)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn undo_depth(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_depth(&self) -> usize {
        self.redo.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drop both stacks.
    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn state(marker: u32) -> TimelineState {
        TimelineState {
            next_track_id: TrackId(marker),
            ..TimelineState::default()
        }
    }

    #[test]
    fn test_undo_redo_roundtrip() {
        let mut history = History::new(50);
        history.push(state(1));
        assert!(history.can_undo());
        assert!(!history.can_redo());

        let restored = history.undo(state(2)).unwrap();
        assert_eq!(restored.next_track_id, TrackId(1));
        assert!(history.can_redo());

        let forward = history.redo(state(1)).unwrap();
        assert_eq!(forward.next_track_id, TrackId(2));
        assert!(!history.can_redo());
    }

    #[test]
    fn test_empty_stacks() {
        let mut history = History::default();
        assert!(history.undo(state(1)).is_none());
        assert!(history.redo(state(1)).is_none());
        assert_eq!(history.redo_depth(), 0);
    }

    #[test]
    fn test_push_clears_redo() {
        let mut history = History::new(50);
        history.push(state(1));
        history.undo(state(2)).unwrap();
        assert!(history.can_redo());
        history.push(state(3));
        assert!(!history.can_redo());
    }

    #[test]
    fn test_clear() {
        let mut history = History::new(50);
        history.push(state(1));
        history.push(state(2));
        history.undo(state(3));
        history.clear();
        assert!(!history.can_undo());
        assert!(!history.can_redo());
    }

    proptest! {
        #[test]
        fn test_capacity_evicts_oldest(pushes in 1usize..120) {
            let mut history = History::new(DEFAULT_HISTORY_CAPACITY);
            for i in 0..pushes {
                history.push(state(i as u32));
            }
            prop_assert!(history.undo_depth() <= DEFAULT_HISTORY_CAPACITY);
            prop_assert_eq!(history.undo_depth(), pushes.min(DEFAULT_HISTORY_CAPACITY));

            let mut oldest = None;
            let mut current = state(u32::MAX);
            while let Some(prev) = history.undo(current.clone()) {
                oldest = Some(prev.next_track_id.0);
                current = prev;
            }
            let expected_oldest = pushes.saturating_sub(DEFAULT_HISTORY_CAPACITY) as u32;
            prop_assert_eq!(oldest, Some(expected_oldest));
        }
    }
}
