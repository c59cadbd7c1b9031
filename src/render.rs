use std::{
    path::{Path, PathBuf},
    process::{Command, Stdio},
};

use anyhow::Context as _;
use tracing::{debug, info, warn};

use crate::{
    compose::{CaptionStyle, SceneUnit, wrap_text},
    error::{StorycutError, StorycutResult},
    timeline::{Timeline, TimelineItem},
    visual::{BackgroundSource, Resolution},
};

pub const AUDIO_SAMPLE_RATE: u32 = 44_100;

#[derive(Clone, Debug)]
pub struct RenderConfig {
    pub resolution: Resolution,
    pub fps: u32,
    pub out_path: PathBuf,
    pub overwrite: bool,
    pub caption_style: CaptionStyle,
}

impl RenderConfig {
    pub fn validate(&self) -> StorycutResult<()> {
        if self.resolution.width == 0 || self.resolution.height == 0 {
            return Err(StorycutError::validation(
                "render width/height must be non-zero",
            ));
        }
        if self.fps == 0 {
            return Err(StorycutError::validation("render fps must be non-zero"));
        }
        if !self.resolution.width.is_multiple_of(2) || !self.resolution.height.is_multiple_of(2) {
            // Default settings target yuv420p output for maximum compatibility.
            return Err(StorycutError::validation(
                "render width/height must be even (required for yuv420p mp4 output)",
            ));
        }
        Ok(())
    }

    pub fn with_out_path(mut self, out_path: impl Into<PathBuf>) -> Self {
        self.out_path = out_path.into();
        self
    }
}

pub fn default_mp4_config(out_path: impl Into<PathBuf>) -> RenderConfig {
    RenderConfig {
        resolution: Resolution::FULL_HD,
        fps: 24,
        out_path: out_path.into(),
        overwrite: true,
        caption_style: CaptionStyle::default(),
    }
}

pub fn is_ffmpeg_on_path() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

pub fn is_ffprobe_on_path() -> bool {
    Command::new("ffprobe")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

pub fn ensure_parent_dir(path: &Path) -> StorycutResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// Per-run scratch directory for intermediate parts and audio muxing.
/// Removed on drop, success and failure alike.
struct ScratchDir {
    path: PathBuf,
}

impl ScratchDir {
    fn create() -> StorycutResult<Self> {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.subsec_nanos())
            .unwrap_or(0);
        let path = std::env::temp_dir().join(format!(
            "storycut_render_{}_{nanos:08x}",
            std::process::id()
        ));
        std::fs::create_dir_all(&path)
            .with_context(|| format!("failed to create scratch directory '{}'", path.display()))?;
        Ok(Self { path })
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_dir_all(&self.path) {
            warn!(path = %self.path.display(), error = %e, "failed to remove scratch directory");
        }
    }
}

/// Renders the timeline to `cfg.out_path` via the system `ffmpeg` binary.
///
/// Each timeline item becomes an intermediate MP4 part in a scratch
/// directory; parts are then joined with the concat demuxer into a temporary
/// output which is renamed into place only on success, so a failed run never
/// leaves a half-written file at the final path.
pub fn render_timeline(timeline: &Timeline, cfg: &RenderConfig) -> StorycutResult<PathBuf> {
    cfg.validate()?;
    if timeline.items.is_empty() {
        return Err(StorycutError::no_renderable_content("timeline is empty"));
    }
    if !is_ffmpeg_on_path() {
        return Err(StorycutError::render(
            "ffmpeg is required for MP4 encoding, but was not found on PATH",
        ));
    }
    ensure_parent_dir(&cfg.out_path)?;
    if !cfg.overwrite && cfg.out_path.exists() {
        return Err(StorycutError::validation(format!(
            "output file '{}' already exists",
            cfg.out_path.display()
        )));
    }

    let scratch = ScratchDir::create()?;
    info!(
        items = timeline.items.len(),
        total_sec = timeline.total_duration_sec(),
        scratch = %scratch.path().display(),
        "rendering timeline"
    );

    let mut parts = Vec::with_capacity(timeline.items.len());
    for (idx, item) in timeline.items.iter().enumerate() {
        let part_path = scratch.path().join(format!("part_{idx:03}.mp4"));
        let args = match item {
            TimelineItem::Scene(unit) => scene_part_args(unit, cfg, &part_path),
            TimelineItem::Transition { duration_sec, rgb } => {
                transition_part_args(*duration_sec, *rgb, cfg, &part_path)
            }
        };
        run_ffmpeg(&args)?;
        debug!(part = %part_path.display(), "rendered timeline part");
        parts.push(part_path);
    }

    let list_path = scratch.path().join("concat.txt");
    std::fs::write(&list_path, concat_list_content(&parts))
        .with_context(|| format!("failed to write concat list '{}'", list_path.display()))?;

    let tmp_out = tmp_output_path(&cfg.out_path);
    let finalize = concat_parts(&list_path, &tmp_out).and_then(|()| {
        std::fs::rename(&tmp_out, &cfg.out_path)
            .with_context(|| {
                format!(
                    "failed to move rendered output into place at '{}'",
                    cfg.out_path.display()
                )
            })
            .map_err(StorycutError::from)
    });

    if let Err(e) = finalize {
        let _ = std::fs::remove_file(&tmp_out);
        return Err(e);
    }

    info!(out = %cfg.out_path.display(), "render complete");
    Ok(cfg.out_path.clone())
}

/// Builds the full ffmpeg argument list for one scene part: background input,
/// silent audio anchor pinning the exact scene duration, one audio input per
/// overlay, and a filter graph applying aspect-fill, duration fitting,
/// caption drawtext, and audio placement.
fn scene_part_args(unit: &SceneUnit, cfg: &RenderConfig, part_path: &Path) -> Vec<String> {
    let dur = fmt_sec(unit.duration_sec);
    let (w, h) = (cfg.resolution.width, cfg.resolution.height);

    let mut args: Vec<String> = vec!["-v".into(), "error".into(), "-y".into()];

    // Input 0: background.
    let mut video_steps: Vec<String> = Vec::new();
    match &unit.background.source {
        BackgroundSource::Color { rgb } => {
            args.extend([
                "-f".into(),
                "lavfi".into(),
                "-i".into(),
                format!(
                    "color=c={}:s={w}x{h}:r={}:d={dur}",
                    hex_color(*rgb),
                    cfg.fps
                ),
            ]);
        }
        BackgroundSource::Image { path, crop } => {
            args.extend([
                "-loop".into(),
                "1".into(),
                "-framerate".into(),
                cfg.fps.to_string(),
                "-t".into(),
                dur.clone(),
                "-i".into(),
                path.display().to_string(),
            ]);
            video_steps.push(format!(
                "scale={}:{}",
                crop.scaled_width, crop.scaled_height
            ));
            video_steps.push(format!("crop={w}:{h}:{}:{}", crop.offset_x, crop.offset_y));
        }
        BackgroundSource::Video { path, crop, fit, .. } => {
            if fit.extra_repeats > 0 {
                args.extend(["-stream_loop".into(), fit.extra_repeats.to_string()]);
            }
            args.extend(["-i".into(), path.display().to_string()]);
            video_steps.push(format!(
                "scale={}:{}",
                crop.scaled_width, crop.scaled_height
            ));
            video_steps.push(format!("crop={w}:{h}:{}:{}", crop.offset_x, crop.offset_y));
            if fit.hold_last_sec > 0.0 {
                video_steps.push(format!(
                    "tpad=stop_mode=clone:stop_duration={}",
                    fmt_sec(fit.hold_last_sec)
                ));
            }
            video_steps.push(format!("trim=duration={dur}"));
            video_steps.push("setpts=PTS-STARTPTS".into());
        }
    }

    // Input 1: silent stereo anchor spanning the whole scene. Mixed under the
    // overlay audio so the part's audio stream always has the exact scene
    // duration even when overlays were skipped or trimmed.
    args.extend([
        "-f".into(),
        "lavfi".into(),
        "-t".into(),
        dur.clone(),
        "-i".into(),
        format!("anullsrc=channel_layout=stereo:sample_rate={AUDIO_SAMPLE_RATE}"),
    ]);

    // Inputs 2..: one per overlay with bound audio.
    let audible: Vec<_> = unit
        .overlays
        .iter()
        .filter(|o| o.audio_duration_sec > 0.0)
        .collect();
    for overlay in &audible {
        args.extend(["-i".into(), overlay.audio_path.display().to_string()]);
    }

    // Captions draw over the fitted background in overlay order.
    let max_chars = cfg.caption_style.max_line_chars(cfg.resolution);
    for overlay in &unit.overlays {
        video_steps.push(drawtext_step(
            &wrap_text(&overlay.text, max_chars),
            overlay.start_offset_sec,
            overlay.end_offset_sec(),
            &cfg.caption_style,
        ));
    }
    video_steps.push("format=yuv420p".into());

    let mut filter = format!("[0:v]{}[vout]", video_steps.join(","));
    if audible.is_empty() {
        filter.push_str(";[1:a]anull[aout]");
    } else {
        let mut mix_inputs = String::from("[1:a]");
        for (i, overlay) in audible.iter().enumerate() {
            let delay_ms = (overlay.start_offset_sec * 1000.0).round() as u64;
            filter.push_str(&format!(
                ";[{}:a]atrim=0:{},asetpts=PTS-STARTPTS,adelay={delay_ms}|{delay_ms}[ao{i}]",
                i + 2,
                fmt_sec(overlay.audio_duration_sec),
            ));
            mix_inputs.push_str(&format!("[ao{i}]"));
        }
        filter.push_str(&format!(
            ";{mix_inputs}amix=inputs={}:duration=first:normalize=0[aout]",
            audible.len() + 1
        ));
    }

    args.extend([
        "-filter_complex".into(),
        filter,
        "-map".into(),
        "[vout]".into(),
        "-map".into(),
        "[aout]".into(),
    ]);
    args.extend(encode_args(cfg));
    args.extend(["-t".into(), dur, part_path.display().to_string()]);
    args
}

fn transition_part_args(
    duration_sec: f64,
    rgb: [u8; 3],
    cfg: &RenderConfig,
    part_path: &Path,
) -> Vec<String> {
    let dur = fmt_sec(duration_sec);
    let mut args: Vec<String> = vec![
        "-v".into(),
        "error".into(),
        "-y".into(),
        "-f".into(),
        "lavfi".into(),
        "-i".into(),
        format!(
            "color=c={}:s={}x{}:r={}:d={dur}",
            hex_color(rgb),
            cfg.resolution.width,
            cfg.resolution.height,
            cfg.fps
        ),
        "-f".into(),
        "lavfi".into(),
        "-t".into(),
        dur.clone(),
        "-i".into(),
        format!("anullsrc=channel_layout=stereo:sample_rate={AUDIO_SAMPLE_RATE}"),
        "-map".into(),
        "0:v".into(),
        "-map".into(),
        "1:a".into(),
    ];
    args.extend(encode_args(cfg));
    args.extend(["-t".into(), dur, part_path.display().to_string()]);
    args
}

fn encode_args(cfg: &RenderConfig) -> Vec<String> {
    vec![
        "-r".into(),
        cfg.fps.to_string(),
        "-c:v".into(),
        "libx264".into(),
        "-preset".into(),
        "medium".into(),
        "-pix_fmt".into(),
        "yuv420p".into(),
        "-c:a".into(),
        "aac".into(),
        "-ar".into(),
        AUDIO_SAMPLE_RATE.to_string(),
    ]
}

fn drawtext_step(text: &str, start_sec: f64, end_sec: f64, style: &CaptionStyle) -> String {
    format!(
        "drawtext=expansion=none:fontcolor={}:fontsize={}:box=1:boxcolor={}@{}:boxborderw={}:\
         x=(w-text_w)/2:y=(h-text_h)/2:enable='between(t,{},{})':text='{}'",
        style.font_color,
        style.font_size,
        hex_color(style.panel_rgb),
        style.panel_alpha,
        style.panel_padding_px,
        fmt_sec(start_sec),
        fmt_sec(end_sec),
        escape_caption(text),
    )
}

/// Caption text is carried inside a single-quoted filtergraph string with
/// drawtext expansion disabled, so only the quote character itself needs
/// handling; it is mapped to the typographic apostrophe.
fn escape_caption(text: &str) -> String {
    text.replace('\'', "\u{2019}")
}

fn hex_color(rgb: [u8; 3]) -> String {
    format!("0x{:02x}{:02x}{:02x}", rgb[0], rgb[1], rgb[2])
}

fn fmt_sec(sec: f64) -> String {
    format!("{sec:.6}")
}

fn concat_list_content(parts: &[PathBuf]) -> String {
    let mut out = String::new();
    for part in parts {
        out.push_str(&format!("file '{}'\n", part.display()));
    }
    out
}

fn tmp_output_path(out_path: &Path) -> PathBuf {
    out_path.with_extension("part.mp4")
}

fn concat_parts(list_path: &Path, tmp_out: &Path) -> StorycutResult<()> {
    // All parts share encode settings, so stream copy normally suffices.
    let copy_args: Vec<String> = vec![
        "-v".into(),
        "error".into(),
        "-y".into(),
        "-f".into(),
        "concat".into(),
        "-safe".into(),
        "0".into(),
        "-i".into(),
        list_path.display().to_string(),
        "-c".into(),
        "copy".into(),
        "-movflags".into(),
        "+faststart".into(),
        tmp_out.display().to_string(),
    ];
    if run_ffmpeg(&copy_args).is_ok() {
        return Ok(());
    }

    warn!("concat with stream copy failed, retrying with re-encode");
    let reencode_args: Vec<String> = vec![
        "-v".into(),
        "error".into(),
        "-y".into(),
        "-f".into(),
        "concat".into(),
        "-safe".into(),
        "0".into(),
        "-i".into(),
        list_path.display().to_string(),
        "-c:v".into(),
        "libx264".into(),
        "-preset".into(),
        "medium".into(),
        "-pix_fmt".into(),
        "yuv420p".into(),
        "-c:a".into(),
        "aac".into(),
        "-movflags".into(),
        "+faststart".into(),
        tmp_out.display().to_string(),
    ];
    run_ffmpeg(&reencode_args)
}

fn run_ffmpeg(args: &[String]) -> StorycutResult<()> {
    let out = Command::new("ffmpeg")
        .args(args)
        .stdin(Stdio::null())
        .output()
        .map_err(|e| StorycutError::render(format!("failed to spawn ffmpeg: {e}")))?;
    if !out.status.success() {
        return Err(StorycutError::render(format!(
            "ffmpeg exited with status {}: {}",
            out.status,
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }
    Ok(())
}
