use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::script::VisualType;

/// Target frame size.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const FULL_HD: Resolution = Resolution {
        width: 1920,
        height: 1080,
    };
}

/// Two-color palette used for flat-color fallbacks, keyed by scene index
/// parity so adjacent fallback scenes remain visually distinct.
pub const FALLBACK_PALETTE: [[u8; 3]; 2] = [[50, 50, 150], [150, 50, 50]];

pub fn fallback_color(scene_index: usize) -> [u8; 3] {
    FALLBACK_PALETTE[scene_index % 2]
}

/// Aspect-fill geometry: scale factors and the centered crop window that maps
/// a source frame onto the target, covering it fully with no letterboxing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CropSpec {
    pub scaled_width: u32,
    pub scaled_height: u32,
    pub offset_x: u32,
    pub offset_y: u32,
}

/// Scale-then-crop: scale so the shorter-fitting dimension covers the target,
/// then center-crop the overflow on the other axis.
pub fn aspect_fill(src_width: u32, src_height: u32, target: Resolution) -> CropSpec {
    let ratio = f64::max(
        f64::from(target.width) / f64::from(src_width),
        f64::from(target.height) / f64::from(src_height),
    );
    let scaled_width = ((f64::from(src_width) * ratio).round() as u32).max(target.width);
    let scaled_height = ((f64::from(src_height) * ratio).round() as u32).max(target.height);
    CropSpec {
        scaled_width,
        scaled_height,
        offset_x: (scaled_width - target.width) / 2,
        offset_y: (scaled_height - target.height) / 2,
    }
}

/// How a video source is fitted to the scene duration.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct VideoFit {
    /// Extra whole repeats of the source needed before truncation
    /// (`ffmpeg -stream_loop` count). Zero when the source already covers the
    /// target duration.
    pub extra_repeats: u32,
    /// Seconds of last-frame hold appended when the source is shorter than
    /// the target and not loopable.
    pub hold_last_sec: f64,
}

/// Decides looping/holding for a video of `native_sec` against a scene of
/// `target_sec`. Returns `None` when the native duration is unusable.
pub fn fit_video(native_sec: f64, target_sec: f64, loopable: bool) -> Option<VideoFit> {
    if !native_sec.is_finite() || native_sec <= 0.0 {
        return None;
    }
    if native_sec >= target_sec {
        return Some(VideoFit {
            extra_repeats: 0,
            hold_last_sec: 0.0,
        });
    }
    if loopable {
        let cycles = (target_sec / native_sec).ceil() as u32;
        Some(VideoFit {
            extra_repeats: cycles.saturating_sub(1),
            hold_last_sec: 0.0,
        })
    } else {
        // Non-loopable and short: hold the last frame for the remainder
        // rather than ending the background early inside a longer scene.
        Some(VideoFit {
            extra_repeats: 0,
            hold_last_sec: target_sec - native_sec,
        })
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum BackgroundSource {
    /// A still frame sustained for the whole duration.
    Image { path: PathBuf, crop: CropSpec },
    Video {
        path: PathBuf,
        crop: CropSpec,
        native_duration_sec: f64,
        fit: VideoFit,
    },
    Color { rgb: [u8; 3] },
}

/// A background resolved to exactly the scene's narration duration, framed to
/// the target resolution. The track itself is silent.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BackgroundTrack {
    pub source: BackgroundSource,
    pub duration_sec: f64,
}

impl BackgroundTrack {
    fn color(rgb: [u8; 3], duration_sec: f64) -> Self {
        Self {
            source: BackgroundSource::Color { rgb },
            duration_sec,
        }
    }

    pub fn is_color_fallback(&self) -> bool {
        matches!(self.source, BackgroundSource::Color { .. })
    }
}

/// Resolves a scene's declared visual into a duration-matched background.
///
/// Resolution priority, first matching branch wins:
/// 1. `static_image` with a readable image file: aspect-fill, still held.
/// 2. `static_video` with a probeable video file: aspect-fill, then
///    truncate / loop / hold-last-frame to the target duration.
/// 3. Anything else (missing path, unreadable asset, color fallback type):
///    flat color from the parity palette.
///
/// This never fails: every branch's precondition failure falls through to the
/// color fallback, so the caller always receives a usable track.
pub fn resolve(
    visual_type: VisualType,
    asset_path: Option<&Path>,
    target_duration_sec: f64,
    loopable: bool,
    resolution: Resolution,
    scene_index: usize,
) -> BackgroundTrack {
    let fallback = || BackgroundTrack::color(fallback_color(scene_index), target_duration_sec);

    let Some(path) = asset_path else {
        if visual_type != VisualType::ColorFallback {
            warn!(?visual_type, scene_index, "visual declared without asset path, using color fallback");
        }
        return fallback();
    };

    match visual_type {
        VisualType::StaticImage => match probe_image(path) {
            Some((w, h)) => {
                debug!(path = %path.display(), w, h, "resolved image background");
                BackgroundTrack {
                    source: BackgroundSource::Image {
                        path: path.to_path_buf(),
                        crop: aspect_fill(w, h, resolution),
                    },
                    duration_sec: target_duration_sec,
                }
            }
            None => {
                warn!(path = %path.display(), "image asset unreadable, using color fallback");
                fallback()
            }
        },
        VisualType::StaticVideo => match probe_video(path) {
            Some(info) => {
                match fit_video(info.duration_sec, target_duration_sec, loopable) {
                    Some(fit) => {
                        debug!(
                            path = %path.display(),
                            native = info.duration_sec,
                            repeats = fit.extra_repeats,
                            hold = fit.hold_last_sec,
                            "resolved video background"
                        );
                        BackgroundTrack {
                            source: BackgroundSource::Video {
                                path: path.to_path_buf(),
                                crop: aspect_fill(info.width, info.height, resolution),
                                native_duration_sec: info.duration_sec,
                                fit,
                            },
                            duration_sec: target_duration_sec,
                        }
                    }
                    None => {
                        warn!(path = %path.display(), "video has no usable duration, using color fallback");
                        fallback()
                    }
                }
            }
            None => {
                warn!(path = %path.display(), "video asset unreadable, using color fallback");
                fallback()
            }
        },
        VisualType::ColorFallback => fallback(),
    }
}

fn probe_image(path: &Path) -> Option<(u32, u32)> {
    if !path.is_file() {
        return None;
    }
    image::image_dimensions(path).ok()
}

#[derive(Clone, Debug)]
pub struct VideoSourceInfo {
    pub width: u32,
    pub height: u32,
    pub duration_sec: f64,
}

/// Probes a video via `ffprobe`. Returns `None` on any failure; the resolver
/// treats that as an unreadable asset.
pub fn probe_video(path: &Path) -> Option<VideoSourceInfo> {
    #[derive(serde::Deserialize)]
    struct ProbeStream {
        codec_type: Option<String>,
        width: Option<u32>,
        height: Option<u32>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeFormat {
        duration: Option<String>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeOut {
        streams: Vec<ProbeStream>,
        format: Option<ProbeFormat>,
    }

    if !path.is_file() {
        return None;
    }

    let out = std::process::Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_streams",
            "-show_format",
        ])
        .arg(path)
        .output()
        .ok()?;
    if !out.status.success() {
        warn!(
            path = %path.display(),
            stderr = %String::from_utf8_lossy(&out.stderr).trim(),
            "ffprobe failed"
        );
        return None;
    }

    let parsed: ProbeOut = serde_json::from_slice(&out.stdout).ok()?;
    let video_stream = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))?;
    let width = video_stream.width?;
    let height = video_stream.height?;
    if width == 0 || height == 0 {
        return None;
    }
    let duration_sec = parsed
        .format
        .as_ref()
        .and_then(|f| f.duration.as_ref())
        .and_then(|s| s.parse::<f64>().ok())
        .unwrap_or(0.0);

    Some(VideoSourceInfo {
        width,
        height,
        duration_sec,
    })
}
