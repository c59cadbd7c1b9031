use crate::{
    narration::CaptionOverlay,
    visual::{BackgroundTrack, Resolution},
};

/// Styling for caption text and the translucent panel behind it. The panel is
/// sized by the renderer to the text's bounding box plus `panel_padding_px`,
/// guaranteeing legibility over arbitrary background content.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct CaptionStyle {
    pub font_size: u32,
    pub font_color: String,
    pub panel_rgb: [u8; 3],
    pub panel_alpha: f64,
    pub panel_padding_px: u32,
    /// Fraction of the frame width the caption block may occupy before
    /// wrapping onto a new line.
    pub max_width_frac: f64,
}

impl Default for CaptionStyle {
    fn default() -> Self {
        Self {
            font_size: 72,
            font_color: "white".to_string(),
            panel_rgb: [0, 0, 0],
            panel_alpha: 0.5,
            panel_padding_px: 24,
            max_width_frac: 0.75,
        }
    }
}

impl CaptionStyle {
    /// Approximate character budget per caption line for a given frame width.
    /// Drawn glyph width averages ~0.55em for the bundled sans fonts.
    pub fn max_line_chars(&self, resolution: Resolution) -> usize {
        let usable = f64::from(resolution.width) * self.max_width_frac;
        let per_char = f64::from(self.font_size) * 0.55;
        ((usable / per_char) as usize).max(8)
    }
}

/// Greedy word wrap to at most `max_chars` per line. Words longer than the
/// budget get a line of their own rather than being split.
pub fn wrap_text(text: &str, max_chars: usize) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        if current.is_empty() {
            current.push_str(word);
        } else if current.chars().count() + 1 + word.chars().count() <= max_chars {
            current.push(' ');
            current.push_str(word);
        } else {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines.join("\n")
}

/// A fully time-resolved scene: one silent background plus caption overlays
/// bound to their own audio. `duration_sec` is authoritative regardless of
/// any background or overlay micro-discrepancy.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct SceneUnit {
    pub name: String,
    pub background: BackgroundTrack,
    pub overlays: Vec<CaptionOverlay>,
    pub duration_sec: f64,
}

/// Merges one background track and one finalized overlay sequence into a
/// scene unit pinned to the scene's narration duration. Layer order is fixed:
/// background at z=0, captions above it.
pub fn compose_scene(
    name: impl Into<String>,
    background: BackgroundTrack,
    overlays: Vec<CaptionOverlay>,
    narration_duration_sec: f64,
) -> SceneUnit {
    SceneUnit {
        name: name.into(),
        background,
        overlays,
        duration_sec: narration_duration_sec,
    }
}
