use std::path::{Path, PathBuf};

use tracing::warn;

use crate::script::Segment;

/// Trim applied to each overlay's bound audio so the renderer never reads one
/// sample past end-of-file on codecs with imprecise duration metadata. Layout
/// offsets use the full declared duration; only the bound audio is shortened,
/// which can truncate up to this much real audio per segment.
pub const AUDIO_TRIM_EPSILON_SEC: f64 = 0.010;

/// One caption, time-positioned within its scene and bound to its own audio
/// clip. Panel and text share this timing.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CaptionOverlay {
    pub text: String,
    /// Seconds from scene start; equals the sum of prior kept segments'
    /// declared durations.
    pub start_offset_sec: f64,
    /// Declared segment duration, used for layout.
    pub duration_sec: f64,
    pub audio_path: PathBuf,
    /// Declared duration minus [`AUDIO_TRIM_EPSILON_SEC`], never negative.
    pub audio_duration_sec: f64,
}

impl CaptionOverlay {
    pub fn end_offset_sec(&self) -> f64 {
        self.start_offset_sec + self.duration_sec
    }
}

/// Lays out a scene's segments as back-to-back caption overlays.
///
/// Segments without a resolvable audio file or with zero declared duration
/// are skipped with a warning; they neither halt the scene nor occupy
/// timeline space. Returns the overlays and the scene's total narration
/// duration (the final running offset).
pub fn compose(segments: &[Segment], project_root: &Path) -> (Vec<CaptionOverlay>, f64) {
    let (overlays, total) = segments.iter().fold(
        (Vec::with_capacity(segments.len()), 0.0_f64),
        |(mut overlays, offset), seg| {
            let duration_sec = seg.audio_duration_sec();
            if duration_sec <= 0.0 {
                warn!(segment = %seg.id, "segment has zero audio duration, skipping");
                return (overlays, offset);
            }

            let audio_path = project_root.join(&seg.audio_path);
            if !audio_path.is_file() {
                warn!(
                    segment = %seg.id,
                    path = %audio_path.display(),
                    "segment audio file not found, skipping"
                );
                return (overlays, offset);
            }

            overlays.push(CaptionOverlay {
                text: seg.text.clone(),
                start_offset_sec: offset,
                duration_sec,
                audio_path,
                audio_duration_sec: (duration_sec - AUDIO_TRIM_EPSILON_SEC).max(0.0),
            });
            (overlays, offset + duration_sec)
        },
    );
    (overlays, total)
}
