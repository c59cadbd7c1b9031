#![forbid(unsafe_code)]

pub mod assemble;
pub mod compose;
pub mod error;
pub mod narration;
pub mod render;
pub mod scene;
pub mod script;
pub mod timeline;
pub mod visual;

pub use assemble::{AssemblyConfig, AssemblyOutcome, AssemblyStatus, assemble_timeline, assemble_video};
pub use compose::{CaptionStyle, SceneUnit, compose_scene};
pub use error::{StorycutError, StorycutResult};
pub use narration::{AUDIO_TRIM_EPSILON_SEC, CaptionOverlay};
pub use render::{RenderConfig, default_mp4_config, is_ffmpeg_on_path, is_ffprobe_on_path, render_timeline};
pub use scene::{Scene, group_scenes};
pub use script::{Segment, VisualType, load_script};
pub use timeline::{DEFAULT_TRANSITION_SEC, Timeline, TimelineItem, build_timeline};
pub use visual::{BackgroundSource, BackgroundTrack, CropSpec, Resolution, aspect_fill};
