use std::path::Path;

use anyhow::Context as _;
use tracing::{info, warn};

use crate::error::{StorycutError, StorycutResult};

/// One sentence-level unit of narration with its own audio and visual hints.
///
/// The upstream script producer writes these as a JSON array. Field aliases
/// accept the producer's original column names alongside the canonical ones.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct Segment {
    pub id: String,

    #[serde(alias = "segment_order")]
    pub order: i64,

    #[serde(alias = "text_chunk")]
    pub text: String,

    /// Audio file path, relative to the project root.
    #[serde(alias = "actual_tts_audio_url")]
    pub audio_path: String,

    #[serde(alias = "actual_tts_duration_ms")]
    pub audio_duration_ms: u64,

    pub source_type: String,

    #[serde(default)]
    pub visual_type: VisualType,

    /// Visual asset path, relative to the project root.
    #[serde(default, alias = "visual_asset_url")]
    pub visual_asset_path: Option<String>,

    #[serde(default, alias = "visual_asset_url_is_loopable")]
    pub visual_loopable: bool,
}

impl Segment {
    pub fn audio_duration_sec(&self) -> f64 {
        self.audio_duration_ms as f64 / 1000.0
    }
}

/// Declared background kind for a segment. Unrecognized values degrade to the
/// color fallback rather than failing the parse; the resolver treats them the
/// same way.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case", from = "String")]
pub enum VisualType {
    StaticImage,
    StaticVideo,
    #[default]
    ColorFallback,
}

impl From<String> for VisualType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "static_image" => Self::StaticImage,
            "static_video" => Self::StaticVideo,
            // Absorbs "color_fallback", the producer's legacy
            // "color_background", and anything unrecognized.
            _ => Self::ColorFallback,
        }
    }
}

/// Loads and normalizes a script file: a JSON array of [`Segment`] records.
///
/// Segments are re-sorted by `order` so downstream stages can rely on script
/// order even if the producer wrote records out of sequence. A missing or
/// unparseable file and an empty array are both input-fatal.
pub fn load_script(path: &Path) -> StorycutResult<Vec<Segment>> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("failed to read script file '{}'", path.display()))
        .map_err(|e| StorycutError::script(format!("{e:#}")))?;

    let mut segments: Vec<Segment> = serde_json::from_slice(&bytes).map_err(|e| {
        StorycutError::script(format!("failed to parse script '{}': {e}", path.display()))
    })?;

    if segments.is_empty() {
        return Err(StorycutError::EmptyScript);
    }

    segments.sort_by_key(|s| s.order);
    for pair in segments.windows(2) {
        if pair[0].order == pair[1].order {
            warn!(
                order = pair[0].order,
                "script contains duplicate segment order values"
            );
        }
    }

    info!(
        path = %path.display(),
        segments = segments.len(),
        "loaded script"
    );
    Ok(segments)
}
