//! Project files.
//!
//! A project file is the JSON form of a timeline: tracks, clips, text layers
//! and the identity counters, plus render settings and timestamps. Provider
//! handles are not persisted; loading rebinds each clip to its source and
//! leaves it detached if the source no longer classifies as the same kind.

use std::path::Path;
use std::sync::Arc;

use clipforge_common::{ClipforgeError, ClipforgeResult};
use clipforge_media_core::{classify, MediaBackend, MediaKind};
use serde::{Deserialize, Serialize};

use crate::clip::{Clip, ClipEntry, ClipMedia, ClipType};
use crate::history::{TimelineState, DEFAULT_HISTORY_CAPACITY};
use crate::ids::{ClipId, LayerId, TrackId};
use crate::settings::{ExportSettings, RenderSettings};
use crate::text::TextLayer;
use crate::timeline::Timeline;
use crate::track::{is_display_order_permutation, recompute_display_order, Track};

pub const PROJECT_FILE_VERSION: &str = "1.0";

/// On-disk project (`*.clipforge.json`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectFile {
    /// Schema version.
    pub version: String,

    pub name: String,

    /// Creation timestamp (RFC 3339).
    pub created_at: String,

    /// Last modified timestamp (RFC 3339).
    pub modified_at: String,

    #[serde(default)]
    pub render: RenderSettings,

    #[serde(default)]
    pub export: ExportSettings,

    #[serde(default)]
    pub tracks: Vec<Track>,

    #[serde(default)]
    pub clips: Vec<Clip>,

    #[serde(default)]
    pub text_layers: Vec<TextLayer>,

    pub next_track_id: TrackId,
    pub next_clip_id: ClipId,
    pub next_layer_id: LayerId,
}

impl ProjectFile {
    /// An empty project.
    pub fn new(name: impl Into<String>) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            version: PROJECT_FILE_VERSION.to_string(),
            name: name.into(),
            created_at: now.clone(),
            modified_at: now,
            render: RenderSettings::default(),
            export: ExportSettings::default(),
            tracks: Vec::new(),
            clips: Vec::new(),
            text_layers: Vec::new(),
            next_track_id: TrackId::FIRST,
            next_clip_id: ClipId::FIRST,
            next_layer_id: LayerId::FIRST,
        }
    }

    pub fn load(path: impl AsRef<Path>) -> ClipforgeResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let project: Self = serde_json::from_str(&json)?;
        tracing::debug!(
            path = %path.display(),
            clips = project.clips.len(),
            tracks = project.tracks.len(),
            "Project loaded"
        );
        Ok(project)
    }

    /// Write the project, refreshing `modified_at`.
    pub fn save(&mut self, path: impl AsRef<Path>) -> ClipforgeResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        self.modified_at = chrono::Utc::now().to_rfc3339();
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        tracing::debug!(path = %path.display(), "Project saved");
        Ok(())
    }

    /// Replace the stored graph with `timeline`'s current state, keeping
    /// name, settings and creation time.
    pub fn update_from(&mut self, timeline: &Timeline) {
        let captured = timeline.to_project_file(self.name.clone());
        self.tracks = captured.tracks;
        self.clips = captured.clips;
        self.text_layers = captured.text_layers;
        self.next_track_id = captured.next_track_id;
        self.next_clip_id = captured.next_clip_id;
        self.next_layer_id = captured.next_layer_id;
    }

    /// Timeline span in milliseconds.
    pub fn duration_ms(&self) -> i64 {
        self.clips.iter().map(|c| c.end_ms).max().unwrap_or(0).max(0)
    }
}

impl Timeline {
    /// Capture the current state into a project file named `name`.
    ///
    /// Render and export settings start at their defaults.
    pub fn to_project_file(&self, name: impl Into<String>) -> ProjectFile {
        let state = self.state();
        let mut project = ProjectFile::new(name);
        project.tracks = state.tracks.values().cloned().collect();
        project.clips = state.clips.values().map(|e| e.clip.clone()).collect();
        project.text_layers = state.text_layers.values().cloned().collect();
        project.next_track_id = state.next_track_id;
        project.next_clip_id = state.next_clip_id;
        project.next_layer_id = state.next_layer_id;
        project
    }

    /// Rebuild a timeline from a project file with an empty history.
    ///
    /// Stored display orders are kept, so earlier swaps survive a reload; they
    /// are recomputed only when they do not form a permutation of `0..n`.
    pub fn from_project_file(
        project: &ProjectFile,
        backend: Arc<dyn MediaBackend>,
    ) -> ClipforgeResult<Self> {
        let mut state = TimelineState::default();

        for track in &project.tracks {
            if state.tracks.insert(track.id, track.clone()).is_some() {
                return Err(ClipforgeError::invalid_parameter(format!(
                    "duplicate track id {}",
                    track.id
                )));
            }
        }
        if !is_display_order_permutation(&state.tracks) {
            tracing::warn!("Stored track display order inconsistent, recomputing");
            recompute_display_order(&mut state.tracks);
        }

        for clip in &project.clips {
            let media = rebind(backend.as_ref(), clip);
            let entry = ClipEntry {
                clip: clip.clone(),
                media,
            };
            if state.clips.insert(clip.id, entry).is_some() {
                return Err(ClipforgeError::invalid_parameter(format!(
                    "duplicate clip id {}",
                    clip.id
                )));
            }
        }

        for layer in &project.text_layers {
            if state.text_layers.insert(layer.id, layer.clone()).is_some() {
                return Err(ClipforgeError::invalid_parameter(format!(
                    "duplicate text layer id {}",
                    layer.id
                )));
            }
        }

        // Counters never fall behind stored identities.
        state.next_track_id = resume_counter(
            "track",
            project.next_track_id,
            project.tracks.iter().map(|t| t.id.checked_next()),
        )?;
        state.next_clip_id = resume_counter(
            "clip",
            project.next_clip_id,
            project.clips.iter().map(|c| c.id.checked_next()),
        )?;
        state.next_layer_id = resume_counter(
            "text layer",
            project.next_layer_id,
            project.text_layers.iter().map(|l| l.id.checked_next()),
        )?;

        Ok(Timeline::from_state(state, backend, DEFAULT_HISTORY_CAPACITY))
    }
}

/// The larger of the stored counter and every identity's successor. A stored
/// identity of `u32::MAX` has no successor and is rejected.
fn resume_counter<T: Ord + Copy>(
    kind: &str,
    stored: T,
    successors: impl Iterator<Item = Option<T>>,
) -> ClipforgeResult<T> {
    successors.fold(Ok(stored), |acc, next| match (acc, next) {
        (Ok(acc), Some(next)) => Ok(acc.max(next)),
        (Ok(_), None) => Err(ClipforgeError::invalid_parameter(format!(
            "{kind} identity out of range"
        ))),
        (Err(e), _) => Err(e),
    })
}

fn rebind(backend: &dyn MediaBackend, clip: &Clip) -> ClipMedia {
    let media = match (clip.kind, classify(backend, &clip.path)) {
        (ClipType::Video, MediaKind::Video(v)) => ClipMedia::Video(v),
        (ClipType::AudioOnly, MediaKind::Audio(a)) => ClipMedia::Audio(a),
        (ClipType::AudioOnly, MediaKind::Video(_)) => match backend.open_audio(&clip.path) {
            Ok(a) => ClipMedia::Audio(a),
            Err(_) => ClipMedia::Detached,
        },
        _ => ClipMedia::Detached,
    };
    if media.is_detached() {
        tracing::warn!(
            clip_id = %clip.id,
            path = %clip.path.display(),
            "Clip source unavailable, clip left detached"
        );
    }
    media
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::track::TrackType;
    use clipforge_media_core::memory::{MemoryBackend, SolidVideo, ToneAudio};

    fn backend() -> Arc<MemoryBackend> {
        let backend = MemoryBackend::new();
        backend.add_video("a.mp4", SolidVideo::new(64, 36, 4_000, [255, 0, 0, 255]));
        backend.add_audio("b.wav", ToneAudio::constant(2_000, 0.5));
        Arc::new(backend)
    }

    fn sample_timeline(backend: Arc<MemoryBackend>) -> Timeline {
        let mut timeline = Timeline::new(backend);
        let video = timeline.add_track(TrackType::Video, None).unwrap();
        let audio = timeline.add_track(TrackType::Audio, Some("Music")).unwrap();
        let text = timeline.add_track(TrackType::Text, None).unwrap();
        timeline.add_clip("a.mp4", video, 0).unwrap();
        timeline.add_clip("b.wav", audio, 500).unwrap();
        timeline
            .add_text_layer(TextLayer::new(text, "HELLO", 0, 1_000))
            .unwrap();
        timeline
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("demo.clipforge.json");

        let timeline = sample_timeline(backend());
        let mut project = timeline.to_project_file("demo");
        project.save(&path).unwrap();

        let loaded = ProjectFile::load(&path).unwrap();
        assert_eq!(loaded.name, "demo");
        assert_eq!(loaded.version, PROJECT_FILE_VERSION);
        assert_eq!(loaded.tracks.len(), 3);
        assert_eq!(loaded.clips.len(), 2);
        assert_eq!(loaded.text_layers.len(), 1);
        assert_eq!(loaded.duration_ms(), 4_000);
        assert!(chrono::DateTime::parse_from_rfc3339(&loaded.modified_at).is_ok());
    }

    #[test]
    fn test_load_missing_file_is_invalid_file() {
        let err = ProjectFile::load("/nonexistent/clipforge/project.json").unwrap_err();
        assert_eq!(err.code(), clipforge_common::ErrorCode::InvalidFile);
    }

    #[test]
    fn test_rebuild_rebinds_providers() {
        let backend = backend();
        let timeline = sample_timeline(Arc::clone(&backend));
        let project = timeline.to_project_file("demo");

        let rebuilt = Timeline::from_project_file(&project, backend).unwrap();
        assert_eq!(rebuilt.all_clips(16), timeline.all_clips(16));
        assert_eq!(rebuilt.all_text_layers(16), timeline.all_text_layers(16));
        assert!(rebuilt.video_provider(ClipId(1)).is_some());
        assert!(rebuilt.audio_provider(ClipId(2)).is_some());
        assert_eq!(rebuilt.state().next_clip_id, ClipId(3));
        assert!(!rebuilt.can_undo());
    }

    #[test]
    fn test_missing_source_leaves_clip_detached() {
        let backend = backend();
        let timeline = sample_timeline(Arc::clone(&backend));
        let project = timeline.to_project_file("demo");
        backend.remove_source(Path::new("a.mp4"));

        let rebuilt = Timeline::from_project_file(&project, backend).unwrap();
        let entry = rebuilt.clip_entry(ClipId(1)).unwrap();
        assert!(entry.media.is_detached());
        assert_eq!(entry.clip.end_ms, 4_000);
    }

    #[test]
    fn test_swapped_display_order_survives_reload() {
        let backend = backend();
        let mut timeline = Timeline::new(backend.clone());
        let v1 = timeline.add_track(TrackType::Video, None).unwrap();
        let v2 = timeline.add_track(TrackType::Video, None).unwrap();
        timeline.swap_tracks(v1, v2).unwrap();

        let project = timeline.to_project_file("demo");
        let rebuilt = Timeline::from_project_file(&project, backend).unwrap();
        let order = |t: &Timeline, id| t.track(id).unwrap().display_order;
        assert_eq!((order(&rebuilt, v1), order(&rebuilt, v2)), (1, 0));
        let ids: Vec<TrackId> = rebuilt.tracks_in_display_order().iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![v2, v1]);
    }

    #[test]
    fn test_inconsistent_display_order_is_recomputed() {
        let timeline = sample_timeline(backend());
        let mut project = timeline.to_project_file("demo");
        for track in &mut project.tracks {
            track.display_order = 7;
        }

        let rebuilt = Timeline::from_project_file(&project, backend()).unwrap();
        let kinds: Vec<TrackType> = rebuilt.tracks_in_display_order().iter().map(|t| t.kind).collect();
        assert_eq!(kinds, vec![TrackType::Text, TrackType::Video, TrackType::Audio]);
    }

    #[test]
    fn test_exhausted_counter_rejects_insert() {
        let mut project = ProjectFile::new("demo");
        project.next_track_id = TrackId(u32::MAX);

        let mut rebuilt = Timeline::from_project_file(&project, backend()).unwrap();
        let err = rebuilt.add_track(TrackType::Video, None).unwrap_err();
        assert_eq!(err.code(), clipforge_common::ErrorCode::InvalidParameter);
        assert_eq!(rebuilt.track_count(), 0);
        assert!(!rebuilt.can_undo());
    }

    #[test]
    fn test_max_identity_is_rejected_on_load() {
        let timeline = sample_timeline(backend());
        let mut project = timeline.to_project_file("demo");
        project.clips[0].id = ClipId(u32::MAX);

        let err = Timeline::from_project_file(&project, backend()).err().unwrap();
        assert_eq!(err.code(), clipforge_common::ErrorCode::InvalidParameter);
    }

    #[test]
    fn test_counters_never_behind_ids() {
        let timeline = sample_timeline(backend());
        let mut project = timeline.to_project_file("demo");
        project.next_clip_id = ClipId(1);

        let rebuilt = Timeline::from_project_file(&project, backend()).unwrap();
        assert_eq!(rebuilt.state().next_clip_id, ClipId(3));
    }
}
