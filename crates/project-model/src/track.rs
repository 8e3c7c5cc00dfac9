//! Tracks and their display ordering.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::clip::ClipType;
use crate::ids::TrackId;

/// Maximum track name length in characters.
pub const MAX_TRACK_NAME_LEN: usize = 63;

/// Kind of content a track holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackType {
    Video,
    Audio,
    Text,
    Overlay,
}

impl TrackType {
    /// Name used for synthesized track names.
    pub fn label(self) -> &'static str {
        match self {
            Self::Video => "Video",
            Self::Audio => "Audio",
            Self::Text => "Text",
            Self::Overlay => "Overlay",
        }
    }

    /// Display group: text-like tracks first, then video, then audio.
    pub fn display_group(self) -> u8 {
        match self {
            Self::Text | Self::Overlay => 0,
            Self::Video => 1,
            Self::Audio => 2,
        }
    }

    pub fn accepts_clip(self, kind: ClipType) -> bool {
        matches!(
            (self, kind),
            (Self::Video, ClipType::Video) | (Self::Audio, ClipType::AudioOnly)
        )
    }

    pub fn accepts_text(self) -> bool {
        matches!(self, Self::Text | Self::Overlay)
    }
}

/// A typed lane on the timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: TrackId,
    pub kind: TrackType,
    pub name: String,
    /// Position in the track list (0 = top).
    pub display_order: u32,
    pub locked: bool,
    pub visible: bool,
    /// Opacity in [0, 1].
    pub opacity: f32,
}

impl Track {
    pub fn new(id: TrackId, kind: TrackType, name: impl Into<String>) -> Self {
        Self {
            id,
            kind,
            name: bounded_name(name.into()),
            display_order: 0,
            locked: false,
            visible: true,
            opacity: 1.0,
        }
    }
}

/// Truncate a name to [`MAX_TRACK_NAME_LEN`] characters.
pub(crate) fn bounded_name(name: String) -> String {
    bounded(name, MAX_TRACK_NAME_LEN)
}

pub(crate) fn bounded(s: String, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((cut, _)) => s[..cut].to_string(),
        None => s,
    }
}

/// Reassign every track's display order.
///
/// Groups are laid out text/overlay, video, audio; inside a group tracks are
/// ordered by identity. The map is keyed by identity, so iterating it once per
/// group yields the required order.
pub fn recompute_display_order(tracks: &mut BTreeMap<TrackId, Track>) {
    let mut order = 0u32;
    for group in 0..=2u8 {
        for track in tracks.values_mut().filter(|t| t.kind.display_group() == group) {
            track.display_order = order;
            order += 1;
        }
    }
}

/// Whether the stored display orders are exactly `0..n` with no repeats.
pub fn is_display_order_permutation(tracks: &BTreeMap<TrackId, Track>) -> bool {
    let mut seen = vec![false; tracks.len()];
    tracks.values().all(|t| {
        match seen.get_mut(t.display_order as usize) {
            Some(slot) if !*slot => {
                *slot = true;
                true
            }
            _ => false,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn track_type() -> impl Strategy<Value = TrackType> {
        prop_oneof![
            Just(TrackType::Video),
            Just(TrackType::Audio),
            Just(TrackType::Text),
            Just(TrackType::Overlay),
        ]
    }

    #[test]
    fn test_track_accepts() {
        assert!(TrackType::Video.accepts_clip(ClipType::Video));
        assert!(!TrackType::Video.accepts_clip(ClipType::AudioOnly));
        assert!(TrackType::Audio.accepts_clip(ClipType::AudioOnly));
        assert!(!TrackType::Text.accepts_clip(ClipType::Video));
        assert!(!TrackType::Overlay.accepts_clip(ClipType::AudioOnly));
        assert!(TrackType::Overlay.accepts_text());
        assert!(!TrackType::Audio.accepts_text());
    }

    #[test]
    fn test_name_is_bounded() {
        let track = Track::new(TrackId(1), TrackType::Video, "x".repeat(100));
        assert_eq!(track.name.chars().count(), MAX_TRACK_NAME_LEN);
        assert_eq!(bounded("héllo".to_string(), 2), "hé");
    }

    #[test]
    fn test_display_order_permutation_check() {
        let mut tracks = BTreeMap::new();
        for id in 1..=3 {
            tracks.insert(TrackId(id), Track::new(TrackId(id), TrackType::Video, "v"));
        }
        assert!(!is_display_order_permutation(&tracks));

        recompute_display_order(&mut tracks);
        assert!(is_display_order_permutation(&tracks));

        if let Some(t) = tracks.get_mut(&TrackId(1)) {
            t.display_order = 3;
        }
        assert!(!is_display_order_permutation(&tracks));
        assert!(is_display_order_permutation(&BTreeMap::new()));
    }

    #[test]
    fn test_display_order_groups() {
        let mut tracks = BTreeMap::new();
        for (id, kind) in [
            (1, TrackType::Audio),
            (2, TrackType::Video),
            (3, TrackType::Text),
            (4, TrackType::Video),
            (5, TrackType::Overlay),
        ] {
            tracks.insert(TrackId(id), Track::new(TrackId(id), kind, ""));
        }
        recompute_display_order(&mut tracks);
        let order: Vec<u32> = (1..=5).map(|id| tracks[&TrackId(id)].display_order).collect();
        assert_eq!(order, vec![4, 2, 0, 3, 1]);
    }

    proptest! {
        #[test]
        fn test_display_order_partitions(kinds in proptest::collection::vec(track_type(), 1..20)) {
            let mut tracks = BTreeMap::new();
            for (i, kind) in kinds.iter().enumerate() {
                let id = TrackId(i as u32 + 1);
                tracks.insert(id, Track::new(id, *kind, ""));
            }
            recompute_display_order(&mut tracks);

            let mut by_order: Vec<&Track> = tracks.values().collect();
            by_order.sort_by_key(|t| t.display_order);
            for pair in by_order.windows(2) {
                let (a, b) = (pair[0], pair[1]);
                prop_assert!(a.kind.display_group() <= b.kind.display_group());
                if a.kind.display_group() == b.kind.display_group() {
                    prop_assert!(a.id < b.id);
                }
            }
            let orders: Vec<u32> = by_order.iter().map(|t| t.display_order).collect();
            prop_assert_eq!(orders, (0..kinds.len() as u32).collect::<Vec<_>>());
        }
    }
}
