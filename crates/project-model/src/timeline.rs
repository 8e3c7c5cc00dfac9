//! The track/clip/text store.
//!
//! All structural mutations validate first, then push the pre-mutation state
//! onto the undo history, then apply. A rejected call leaves both the store
//! and the history untouched. `update_clip` is the one mutator that does not
//! snapshot; hosts batch updates and call [`Timeline::push_state`] themselves.

use std::path::Path;
use std::sync::Arc;

use clipforge_common::{ClipforgeError, ClipforgeResult};
use clipforge_media_core::{
    classify, AudioProvider, MediaBackend, MediaKind, VideoProvider,
};

use crate::clip::{Clip, ClipEntry, ClipMedia, ClipType, AUDIO_FALLBACK_DURATION_MS};
use crate::history::{History, TimelineState, DEFAULT_HISTORY_CAPACITY};
use crate::ids::{ClipId, LayerId, TrackId};
use crate::text::TextLayer;
use crate::track::{bounded_name, recompute_display_order, Track, TrackType};

/// An editable timeline bound to a media backend.
pub struct Timeline {
    state: TimelineState,
    history: History,
    backend: Arc<dyn MediaBackend>,
}

impl Timeline {
    pub fn new(backend: Arc<dyn MediaBackend>) -> Self {
        Self::with_history_capacity(backend, DEFAULT_HISTORY_CAPACITY)
    }

    pub fn with_history_capacity(backend: Arc<dyn MediaBackend>, capacity: usize) -> Self {
        Self::from_state(TimelineState::default(), backend, capacity)
    }

    pub(crate) fn from_state(
        state: TimelineState,
        backend: Arc<dyn MediaBackend>,
        capacity: usize,
    ) -> Self {
        Self {
            state,
            history: History::new(capacity),
            backend,
        }
    }

    pub fn backend(&self) -> &Arc<dyn MediaBackend> {
        &self.backend
    }

    /// The live project graph.
    pub fn state(&self) -> &TimelineState {
        &self.state
    }

    // ---- Tracks ----------------------------------------------------------

    /// Add a track. Without a name, one is synthesized as "<Type> <n>".
    pub fn add_track(&mut self, kind: TrackType, name: Option<&str>) -> ClipforgeResult<TrackId> {
        let id = self.state.next_track_id;
        let next = id.checked_next().ok_or_else(|| identities_exhausted("track"))?;
        let name = match name {
            Some(name) => name.to_string(),
            None => {
                let same_kind = self.state.tracks.values().filter(|t| t.kind == kind).count();
                format!("{} {}", kind.label(), same_kind + 1)
            }
        };

        self.snapshot();
        self.state.next_track_id = next;
        self.state.tracks.insert(id, Track::new(id, kind, name));
        recompute_display_order(&mut self.state.tracks);

        if let Some(track) = self.state.tracks.get(&id) {
            tracing::info!(
                track_id = %id,
                kind = ?kind,
                display_order = track.display_order,
                name = %track.name,
                "Track added"
            );
        }
        Ok(id)
    }

    /// Remove an empty track. Fails while any clip or text layer references it.
    pub fn remove_track(&mut self, id: TrackId) -> ClipforgeResult<()> {
        self.require_track(id)?;
        if self.state.clips.values().any(|e| e.clip.track == id) {
            return Err(ClipforgeError::invalid_parameter(format!(
                "track {id} still holds clips"
            )));
        }
        if self.state.text_layers.values().any(|l| l.track == id) {
            return Err(ClipforgeError::invalid_parameter(format!(
                "track {id} still holds text layers"
            )));
        }

        self.snapshot();
        self.state.tracks.remove(&id);
        recompute_display_order(&mut self.state.tracks);
        tracing::info!(track_id = %id, "Track removed");
        Ok(())
    }

    /// Exchange the display positions of two tracks.
    pub fn swap_tracks(&mut self, a: TrackId, b: TrackId) -> ClipforgeResult<()> {
        let order_a = self.require_track(a)?.display_order;
        let order_b = self.require_track(b)?.display_order;

        self.snapshot();
        if let Some(t) = self.state.tracks.get_mut(&a) {
            t.display_order = order_b;
        }
        if let Some(t) = self.state.tracks.get_mut(&b) {
            t.display_order = order_a;
        }
        tracing::debug!(track_a = %a, track_b = %b, "Tracks swapped");
        Ok(())
    }

    pub fn rename_track(&mut self, id: TrackId, name: &str) -> ClipforgeResult<()> {
        let name = bounded_name(name.to_string());
        self.mutate_track(id, |t| {
            t.name = name;
            Ok(())
        })
    }

    pub fn set_track_locked(&mut self, id: TrackId, locked: bool) -> ClipforgeResult<()> {
        self.mutate_track(id, |t| {
            t.locked = locked;
            Ok(())
        })
    }

    pub fn set_track_visible(&mut self, id: TrackId, visible: bool) -> ClipforgeResult<()> {
        self.mutate_track(id, |t| {
            t.visible = visible;
            Ok(())
        })
    }

    pub fn set_track_opacity(&mut self, id: TrackId, opacity: f32) -> ClipforgeResult<()> {
        self.mutate_track(id, |t| {
            if !(0.0..=1.0).contains(&opacity) {
                return Err(ClipforgeError::invalid_parameter(format!(
                    "track opacity must be within [0, 1], got {opacity}"
                )));
            }
            t.opacity = opacity;
            Ok(())
        })
    }

    pub fn track(&self, id: TrackId) -> Option<&Track> {
        self.state.tracks.get(&id)
    }

    pub fn track_count(&self) -> usize {
        self.state.tracks.len()
    }

    /// Up to `max` tracks in identity order.
    pub fn all_tracks(&self, max: usize) -> Vec<Track> {
        self.state.tracks.values().take(max).cloned().collect()
    }

    pub fn tracks(&self) -> impl Iterator<Item = &Track> {
        self.state.tracks.values()
    }

    /// Tracks sorted top to bottom.
    pub fn tracks_in_display_order(&self) -> Vec<&Track> {
        let mut tracks: Vec<&Track> = self.state.tracks.values().collect();
        tracks.sort_by_key(|t| (t.display_order, t.id));
        tracks
    }

    // ---- Clips -----------------------------------------------------------

    /// Add a clip for `path` on `track` starting at `start_ms`.
    ///
    /// The file is classified video-first, then audio. The clip covers the
    /// full source; audio sources without a readable duration get a 60 s
    /// placeholder. The destination track, if it exists, must accept the
    /// detected clip type.
    pub fn add_clip(
        &mut self,
        path: impl AsRef<Path>,
        track: TrackId,
        start_ms: i64,
    ) -> ClipforgeResult<ClipId> {
        let path = path.as_ref();
        if start_ms < 0 {
            return Err(ClipforgeError::invalid_parameter(format!(
                "clip start must be non-negative, got {start_ms}"
            )));
        }

        let (kind, duration_ms, media) = match classify(self.backend.as_ref(), path) {
            MediaKind::Video(video) => (ClipType::Video, video.duration_ms(), ClipMedia::Video(video)),
            MediaKind::Audio(audio) => {
                let duration = match audio.metadata() {
                    Ok(meta) => meta.duration_ms,
                    Err(e) => {
                        tracing::warn!(
                            path = %path.display(),
                            error = %e,
                            fallback_ms = AUDIO_FALLBACK_DURATION_MS,
                            "Audio duration unavailable, using placeholder"
                        );
                        AUDIO_FALLBACK_DURATION_MS
                    }
                };
                (ClipType::AudioOnly, duration, ClipMedia::Audio(audio))
            }
            MediaKind::Unrecognized => {
                return Err(ClipforgeError::invalid_file(
                    path,
                    "neither a video nor an audio source",
                ));
            }
        };
        self.check_clip_track(track, kind)?;
        let id = self.state.next_clip_id;
        let next = id.checked_next().ok_or_else(|| identities_exhausted("clip"))?;

        self.snapshot();
        self.state.next_clip_id = next;
        let clip = Clip::new(id, kind, path, track, start_ms, duration_ms);
        tracing::info!(
            clip_id = %id,
            kind = ?kind,
            track = %track,
            start_ms,
            end_ms = clip.end_ms,
            path = %path.display(),
            "Clip added"
        );
        self.state.clips.insert(id, ClipEntry { clip, media });
        Ok(id)
    }

    pub fn remove_clip(&mut self, id: ClipId) -> ClipforgeResult<()> {
        self.require_clip(id)?;
        self.snapshot();
        self.state.clips.remove(&id);
        tracing::info!(clip_id = %id, "Clip removed");
        Ok(())
    }

    /// Replace a clip's mutable fields without recording an undo step.
    ///
    /// Identity, type and source path are kept from the stored clip. Moving
    /// to an existing track re-validates type compatibility.
    pub fn update_clip(&mut self, id: ClipId, info: &Clip) -> ClipforgeResult<()> {
        let current = &self.require_clip(id)?.clip;
        let kind = current.kind;
        if info.track != current.track {
            self.check_clip_track(info.track, kind)?;
        }
        validate_speed(info.speed)?;
        validate_volume(info.volume)?;
        validate_trim(info.trim_start_ms, info.trim_end_ms)?;
        if info.end_ms < info.start_ms {
            return Err(ClipforgeError::invalid_parameter(format!(
                "clip end {} precedes start {}",
                info.end_ms, info.start_ms
            )));
        }

        if let Some(entry) = self.state.clips.get_mut(&id) {
            let path = std::mem::take(&mut entry.clip.path);
            let mut updated = info.clone();
            updated.id = id;
            updated.kind = kind;
            updated.path = path;
            updated.set_scale(info.scale_x, info.scale_y);
            entry.clip = updated;
        }
        tracing::debug!(clip_id = %id, "Clip updated");
        Ok(())
    }

    pub fn clip(&self, id: ClipId) -> Option<&Clip> {
        self.state.clips.get(&id).map(|e| &e.clip)
    }

    pub fn clip_entry(&self, id: ClipId) -> Option<&ClipEntry> {
        self.state.clips.get(&id)
    }

    pub fn clip_entries(&self) -> impl Iterator<Item = &ClipEntry> {
        self.state.clips.values()
    }

    pub fn clip_count(&self) -> usize {
        self.state.clips.len()
    }

    /// Up to `max` clips in identity order.
    pub fn all_clips(&self, max: usize) -> Vec<Clip> {
        self.state
            .clips
            .values()
            .take(max)
            .map(|e| e.clip.clone())
            .collect()
    }

    pub fn video_provider(&self, id: ClipId) -> Option<&Arc<dyn VideoProvider>> {
        self.state.clips.get(&id).and_then(|e| e.media.video())
    }

    pub fn audio_provider(&self, id: ClipId) -> Option<&Arc<dyn AudioProvider>> {
        self.state.clips.get(&id).and_then(|e| e.media.audio())
    }

    /// Split a clip at `at_ms`, returning the identity of the right half.
    ///
    /// The right half copies the original with a new identity, starts at the
    /// split point and skips the elapsed offset in its source; the original
    /// ends at the split point.
    pub fn split_clip(&mut self, id: ClipId, at_ms: i64) -> ClipforgeResult<ClipId> {
        let entry = self.require_clip(id)?;
        let original = &entry.clip;
        if at_ms <= original.start_ms || at_ms >= original.end_ms {
            return Err(ClipforgeError::invalid_parameter(format!(
                "split point {at_ms} outside clip ({}, {})",
                original.start_ms, original.end_ms
            )));
        }
        let split_source_ms = original.trim_start_ms + (at_ms - original.start_ms);
        let new_id = self.state.next_clip_id;
        let next = new_id
            .checked_next()
            .ok_or_else(|| identities_exhausted("clip"))?;

        let mut left = entry.clone();
        let mut right = entry.clone();
        left.clip.end_ms = at_ms;
        left.clip.trim_end_ms = split_source_ms;
        right.clip.id = new_id;
        right.clip.start_ms = at_ms;
        right.clip.trim_start_ms = split_source_ms;

        self.snapshot();
        self.state.next_clip_id = next;

        self.state.clips.insert(id, left);
        self.state.clips.insert(new_id, right);
        tracing::info!(clip_id = %id, new_clip_id = %new_id, at_ms, "Clip split");
        Ok(new_id)
    }

    /// Set the trim window; the clip's end follows the new window length.
    pub fn trim_clip(
        &mut self,
        id: ClipId,
        trim_start_ms: i64,
        trim_end_ms: i64,
    ) -> ClipforgeResult<()> {
        validate_trim(trim_start_ms, trim_end_ms)?;
        self.mutate_clip(id, |c| {
            c.trim_start_ms = trim_start_ms;
            c.trim_end_ms = trim_end_ms;
            c.end_ms = c.start_ms + (trim_end_ms - trim_start_ms);
            Ok(())
        })
    }

    pub fn set_clip_speed(&mut self, id: ClipId, speed: f64) -> ClipforgeResult<()> {
        validate_speed(speed)?;
        self.mutate_clip(id, |c| {
            c.speed = speed;
            Ok(())
        })
    }

    pub fn set_clip_volume(&mut self, id: ClipId, volume: f32) -> ClipforgeResult<()> {
        validate_volume(volume)?;
        self.mutate_clip(id, |c| {
            c.volume = volume;
            Ok(())
        })
    }

    pub fn mute_clip(&mut self, id: ClipId, muted: bool) -> ClipforgeResult<()> {
        self.mutate_clip(id, |c| {
            c.muted = muted;
            Ok(())
        })
    }

    /// Set both scale components, each clamped to [0.01, 5.0].
    pub fn set_clip_scale(&mut self, id: ClipId, scale_x: f32, scale_y: f32) -> ClipforgeResult<()> {
        self.mutate_clip(id, |c| {
            c.set_scale(scale_x, scale_y);
            Ok(())
        })
    }

    pub fn set_clip_aspect_lock(&mut self, id: ClipId, locked: bool) -> ClipforgeResult<()> {
        self.mutate_clip(id, |c| {
            c.set_aspect_lock(locked);
            Ok(())
        })
    }

    /// Latest clip end on the timeline, 0 when empty.
    pub fn total_duration_ms(&self) -> i64 {
        self.state
            .clips
            .values()
            .map(|e| e.clip.end_ms)
            .max()
            .unwrap_or(0)
            .max(0)
    }

    // ---- Text layers -----------------------------------------------------

    /// Add a text layer; its `id` field is ignored and a fresh one assigned.
    pub fn add_text_layer(&mut self, layer: TextLayer) -> ClipforgeResult<LayerId> {
        self.check_text_layer(&layer)?;
        let id = self.state.next_layer_id;
        let next = id
            .checked_next()
            .ok_or_else(|| identities_exhausted("text layer"))?;

        self.snapshot();
        self.state.next_layer_id = next;
        let mut layer = layer;
        layer.id = id;
        layer.bound_strings();
        tracing::info!(
            layer_id = %id,
            track = %layer.track,
            start_ms = layer.start_ms,
            end_ms = layer.end_ms,
            "Text layer added"
        );
        self.state.text_layers.insert(id, layer);
        Ok(id)
    }

    /// Replace a text layer's fields, keeping its identity.
    pub fn update_text_layer(&mut self, id: LayerId, layer: TextLayer) -> ClipforgeResult<()> {
        self.require_layer(id)?;
        self.check_text_layer(&layer)?;

        self.snapshot();
        let mut layer = layer;
        layer.id = id;
        layer.bound_strings();
        self.state.text_layers.insert(id, layer);
        tracing::debug!(layer_id = %id, "Text layer updated");
        Ok(())
    }

    pub fn remove_text_layer(&mut self, id: LayerId) -> ClipforgeResult<()> {
        self.require_layer(id)?;
        self.snapshot();
        self.state.text_layers.remove(&id);
        tracing::info!(layer_id = %id, "Text layer removed");
        Ok(())
    }

    pub fn text_layer(&self, id: LayerId) -> Option<&TextLayer> {
        self.state.text_layers.get(&id)
    }

    pub fn text_layers(&self) -> impl Iterator<Item = &TextLayer> {
        self.state.text_layers.values()
    }

    pub fn text_layer_count(&self) -> usize {
        self.state.text_layers.len()
    }

    /// Up to `max` text layers in identity order.
    pub fn all_text_layers(&self, max: usize) -> Vec<TextLayer> {
        self.state.text_layers.values().take(max).cloned().collect()
    }

    // ---- History ---------------------------------------------------------

    /// Record the current state as an undo step.
    pub fn push_state(&mut self) {
        self.snapshot();
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn undo(&mut self) -> ClipforgeResult<()> {
        let previous = self
            .history
            .undo(self.state.clone())
            .ok_or_else(|| ClipforgeError::invalid_parameter("nothing to undo"))?;
        self.state = previous;
        tracing::debug!(undo_depth = self.history.undo_depth(), "Undo");
        Ok(())
    }

    pub fn redo(&mut self) -> ClipforgeResult<()> {
        let next = self
            .history
            .redo(self.state.clone())
            .ok_or_else(|| ClipforgeError::invalid_parameter("nothing to redo"))?;
        self.state = next;
        tracing::debug!(redo_depth = self.history.redo_depth(), "Redo");
        Ok(())
    }

    /// Empty both history stacks; the current state is kept.
    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    // ---- Internals -------------------------------------------------------

    fn snapshot(&mut self) {
        self.history.push(self.state.clone());
    }

    fn require_track(&self, id: TrackId) -> ClipforgeResult<&Track> {
        self.state
            .tracks
            .get(&id)
            .ok_or_else(|| ClipforgeError::invalid_parameter(format!("no track {id}")))
    }

    fn require_clip(&self, id: ClipId) -> ClipforgeResult<&ClipEntry> {
        self.state
            .clips
            .get(&id)
            .ok_or_else(|| ClipforgeError::invalid_parameter(format!("no clip {id}")))
    }

    fn require_layer(&self, id: LayerId) -> ClipforgeResult<&TextLayer> {
        self.state
            .text_layers
            .get(&id)
            .ok_or_else(|| ClipforgeError::invalid_parameter(format!("no text layer {id}")))
    }

    /// Type compatibility against `track` when it exists.
    fn check_clip_track(&self, track: TrackId, kind: ClipType) -> ClipforgeResult<()> {
        match self.state.tracks.get(&track) {
            Some(t) if !t.kind.accepts_clip(kind) => Err(ClipforgeError::invalid_parameter(
                format!("{:?} track {track} does not accept {kind:?} clips", t.kind),
            )),
            _ => Ok(()),
        }
    }

    fn check_text_layer(&self, layer: &TextLayer) -> ClipforgeResult<()> {
        if let Some(t) = self.state.tracks.get(&layer.track) {
            if !t.kind.accepts_text() {
                return Err(ClipforgeError::invalid_parameter(format!(
                    "{:?} track {} does not accept text layers",
                    t.kind, layer.track
                )));
            }
        }
        if layer.end_ms < layer.start_ms {
            return Err(ClipforgeError::invalid_parameter(format!(
                "text layer end {} precedes start {}",
                layer.end_ms, layer.start_ms
            )));
        }
        Ok(())
    }

    /// Apply `f` to a copy of the clip and commit it with an undo step if
    /// `f` succeeds.
    fn mutate_clip(
        &mut self,
        id: ClipId,
        f: impl FnOnce(&mut Clip) -> ClipforgeResult<()>,
    ) -> ClipforgeResult<()> {
        let mut clip = self.require_clip(id)?.clip.clone();
        f(&mut clip)?;
        self.snapshot();
        if let Some(entry) = self.state.clips.get_mut(&id) {
            entry.clip = clip;
        }
        Ok(())
    }

    fn mutate_track(
        &mut self,
        id: TrackId,
        f: impl FnOnce(&mut Track) -> ClipforgeResult<()>,
    ) -> ClipforgeResult<()> {
        let mut track = self.require_track(id)?.clone();
        f(&mut track)?;
        self.snapshot();
        self.state.tracks.insert(id, track);
        Ok(())
    }
}

fn identities_exhausted(kind: &str) -> ClipforgeError {
    ClipforgeError::invalid_parameter(format!("{kind} identities exhausted"))
}

fn validate_speed(speed: f64) -> ClipforgeResult<()> {
    if !speed.is_finite() || speed <= 0.0 {
        return Err(ClipforgeError::invalid_parameter(format!(
            "clip speed must be positive, got {speed}"
        )));
    }
    Ok(())
}

fn validate_volume(volume: f32) -> ClipforgeResult<()> {
    if !volume.is_finite() || volume < 0.0 {
        return Err(ClipforgeError::invalid_parameter(format!(
            "clip volume must be non-negative, got {volume}"
        )));
    }
    Ok(())
}

fn validate_trim(trim_start_ms: i64, trim_end_ms: i64) -> ClipforgeResult<()> {
    if trim_start_ms < 0 || trim_end_ms < trim_start_ms {
        return Err(ClipforgeError::invalid_parameter(format!(
            "invalid trim window [{trim_start_ms}, {trim_end_ms}]"
        )));
    }
    Ok(())
}
