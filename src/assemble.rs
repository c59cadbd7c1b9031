use std::path::PathBuf;

use tracing::{info, warn};

use crate::{
    compose::{CaptionStyle, SceneUnit, compose_scene},
    error::StorycutResult,
    narration,
    render::{RenderConfig, render_timeline},
    scene::group_scenes,
    script::load_script,
    timeline::{DEFAULT_TRANSITION_SEC, Timeline, build_timeline},
    visual::{self, Resolution},
};

/// Everything one assembly run needs. Asset paths inside the script are
/// resolved relative to `project_root`.
#[derive(Clone, Debug)]
pub struct AssemblyConfig {
    pub project_root: PathBuf,
    pub script_path: PathBuf,
    pub out_path: PathBuf,
    pub resolution: Resolution,
    pub fps: u32,
    pub transition_sec: f64,
    pub caption_style: CaptionStyle,
    pub overwrite: bool,
}

impl AssemblyConfig {
    pub fn new(
        project_root: impl Into<PathBuf>,
        script_path: impl Into<PathBuf>,
        out_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            project_root: project_root.into(),
            script_path: script_path.into(),
            out_path: out_path.into(),
            resolution: Resolution::FULL_HD,
            fps: 24,
            transition_sec: DEFAULT_TRANSITION_SEC,
            caption_style: CaptionStyle::default(),
            overwrite: true,
        }
    }

    /// Project-scoped path conventions used by the upstream script producer:
    /// `outputs/scripts/<id>/script_data.json` in, `outputs/videos/<id>/
    /// final_video.mp4` out.
    pub fn for_project(project_root: impl Into<PathBuf>, project_id: &str) -> Self {
        let root = project_root.into();
        let script_path = root
            .join("outputs/scripts")
            .join(project_id)
            .join("script_data.json");
        let out_path = root
            .join("outputs/videos")
            .join(project_id)
            .join("final_video.mp4");
        Self::new(root, script_path, out_path)
    }

    fn render_config(&self) -> RenderConfig {
        RenderConfig {
            resolution: self.resolution,
            fps: self.fps,
            out_path: self.out_path.clone(),
            overwrite: self.overwrite,
            caption_style: self.caption_style.clone(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum AssemblyStatus {
    Success,
    Failure,
}

/// Boundary result of one assembly run. The outer call never propagates an
/// error; anything that makes a valid output impossible lands here as a
/// failure message.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct AssemblyOutcome {
    pub status: AssemblyStatus,
    pub output_path: Option<PathBuf>,
    pub error_message: Option<String>,
}

impl AssemblyOutcome {
    fn success(output_path: PathBuf) -> Self {
        Self {
            status: AssemblyStatus::Success,
            output_path: Some(output_path),
            error_message: None,
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            status: AssemblyStatus::Failure,
            output_path: None,
            error_message: Some(message.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == AssemblyStatus::Success
    }
}

/// Runs every stage up to (but not including) the render: script load, scene
/// grouping, visual resolution, narration composition, scene composition,
/// timeline build. Errors here are the input-fatal conditions of the
/// pipeline; everything recoverable has already been absorbed as a skip or a
/// fallback.
pub fn assemble_timeline(cfg: &AssemblyConfig) -> StorycutResult<Timeline> {
    let segments = load_script(&cfg.script_path)?;
    let scenes = group_scenes(&segments)?;

    let mut units: Vec<SceneUnit> = Vec::with_capacity(scenes.len());
    for scene in &scenes {
        let (overlays, narration_sec) = narration::compose(&scene.segments, &cfg.project_root);
        if overlays.is_empty() {
            warn!(scene = %scene.name, "scene has no composable narration, dropping");
            continue;
        }

        let asset_path = scene
            .visual_asset_path
            .as_ref()
            .map(|p| cfg.project_root.join(p));
        let background = visual::resolve(
            scene.visual_type,
            asset_path.as_deref(),
            narration_sec,
            scene.visual_loopable,
            cfg.resolution,
            scene.index,
        );

        info!(
            scene = %scene.name,
            duration_sec = narration_sec,
            captions = overlays.len(),
            fallback = background.is_color_fallback(),
            "composed scene"
        );
        units.push(compose_scene(
            scene.name.clone(),
            background,
            overlays,
            narration_sec,
        ));
    }

    build_timeline(units, cfg.transition_sec)
}

/// Full assembly: timeline build plus render. This is the job boundary; it
/// always returns an outcome value, never an error.
pub fn assemble_video(cfg: &AssemblyConfig) -> AssemblyOutcome {
    let timeline = match assemble_timeline(cfg) {
        Ok(t) => t,
        Err(e) => {
            warn!(error = %e, "assembly aborted before render");
            return AssemblyOutcome::failure(e.to_string());
        }
    };

    match render_timeline(&timeline, &cfg.render_config()) {
        Ok(path) => AssemblyOutcome::success(path),
        Err(e) => {
            warn!(error = %e, "render failed");
            AssemblyOutcome::failure(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeline::TimelineItem;
    use std::path::Path;

    fn temp_project(tag: &str) -> PathBuf {
        let root = std::env::temp_dir().join(format!(
            "storycut_assemble_{tag}_{}",
            std::process::id()
        ));
        std::fs::create_dir_all(root.join("audio")).unwrap();
        root
    }

    fn write_script(root: &Path, json: &str) -> PathBuf {
        let path = root.join("script_data.json");
        std::fs::write(&path, json).unwrap();
        path
    }

    fn segment_json(id: &str, order: i64, source: &str, ms: u64) -> String {
        format!(
            r#"{{"id":"{id}","order":{order},"text":"text {id}","audio_path":"audio/{id}.mp3",
               "audio_duration_ms":{ms},"source_type":"{source}","visual_type":"color_fallback"}}"#
        )
    }

    fn touch_audio(root: &Path, id: &str) {
        std::fs::write(root.join("audio").join(format!("{id}.mp3")), b"x").unwrap();
    }

    #[test]
    fn one_scene_two_segments_lays_out_as_expected() {
        let root = temp_project("scenario_a");
        touch_audio(&root, "a");
        touch_audio(&root, "b");
        let script = write_script(
            &root,
            &format!(
                "[{},{}]",
                segment_json("a", 0, "title", 1200),
                segment_json("b", 1, "title", 800)
            ),
        );

        let cfg = AssemblyConfig::new(&root, script, root.join("out.mp4"));
        let timeline = assemble_timeline(&cfg).unwrap();

        assert_eq!(timeline.scene_count(), 1);
        let TimelineItem::Scene(unit) = &timeline.items[0] else {
            panic!("expected a scene first");
        };
        assert!((unit.duration_sec - 2.0).abs() < 1e-9);
        assert_eq!(unit.overlays.len(), 2);
        assert_eq!(unit.overlays[0].start_offset_sec, 0.0);
        assert!((unit.overlays[1].start_offset_sec - 1.2).abs() < 1e-9);
    }

    #[test]
    fn three_scenes_with_transitions_total_correctly() {
        let root = temp_project("scenario_b");
        for id in ["a", "b", "c"] {
            touch_audio(&root, id);
        }
        let script = write_script(
            &root,
            &format!(
                "[{},{},{}]",
                segment_json("a", 0, "title", 2000),
                segment_json("b", 1, "selftext", 3000),
                segment_json("c", 2, "comment_1", 1500)
            ),
        );

        let mut cfg = AssemblyConfig::new(&root, script, root.join("out.mp4"));
        cfg.transition_sec = 1.0;
        let timeline = assemble_timeline(&cfg).unwrap();

        assert_eq!(timeline.scene_count(), 3);
        assert_eq!(timeline.transition_count(), 2);
        assert!((timeline.total_duration_sec() - 8.5).abs() < 1e-9);
    }

    #[test]
    fn missing_visual_asset_degrades_to_color_fallback() {
        let root = temp_project("fallback");
        touch_audio(&root, "a");
        let script = write_script(
            &root,
            r#"[{"id":"a","order":0,"text":"t","audio_path":"audio/a.mp3",
                "audio_duration_ms":1500,"source_type":"title",
                "visual_type":"static_image","visual_asset_path":"assets/missing.png"}]"#,
        );

        let cfg = AssemblyConfig::new(&root, script, root.join("out.mp4"));
        let timeline = assemble_timeline(&cfg).unwrap();
        let TimelineItem::Scene(unit) = &timeline.items[0] else {
            panic!("expected a scene");
        };
        assert!(unit.background.is_color_fallback());
        assert!((unit.background.duration_sec - 1.5).abs() < 1e-9);
    }

    #[test]
    fn scene_with_no_composable_narration_is_dropped() {
        let root = temp_project("dropped");
        touch_audio(&root, "b");
        // Segment "a" has audio declared but no file on disk.
        let script = write_script(
            &root,
            &format!(
                "[{},{}]",
                segment_json("a", 0, "title", 1000),
                segment_json("b", 1, "selftext", 500)
            ),
        );

        let cfg = AssemblyConfig::new(&root, script, root.join("out.mp4"));
        let timeline = assemble_timeline(&cfg).unwrap();
        assert_eq!(timeline.scene_count(), 1);
    }

    #[test]
    fn all_scenes_dropped_escalates_to_failure_outcome() {
        let root = temp_project("all_dropped");
        let script = write_script(&root, &format!("[{}]", segment_json("a", 0, "title", 1000)));

        let cfg = AssemblyConfig::new(&root, script, root.join("out.mp4"));
        let outcome = assemble_video(&cfg);
        assert!(!outcome.is_success());
        assert!(outcome.output_path.is_none());
        assert!(
            outcome
                .error_message
                .as_deref()
                .unwrap()
                .contains("no renderable content")
        );
    }

    #[test]
    fn missing_script_is_a_failure_outcome_not_a_panic() {
        let root = temp_project("no_script");
        let cfg = AssemblyConfig::new(&root, root.join("nope.json"), root.join("out.mp4"));
        let outcome = assemble_video(&cfg);
        assert!(!outcome.is_success());
        assert!(outcome.error_message.is_some());
    }

    #[test]
    fn for_project_builds_producer_paths() {
        let cfg = AssemblyConfig::for_project("/srv/app", "proj_42");
        assert_eq!(
            cfg.script_path,
            PathBuf::from("/srv/app/outputs/scripts/proj_42/script_data.json")
        );
        assert_eq!(
            cfg.out_path,
            PathBuf::from("/srv/app/outputs/videos/proj_42/final_video.mp4")
        );
    }

    #[test]
    fn idempotent_layout_for_unchanged_inputs() {
        let root = temp_project("idempotent");
        touch_audio(&root, "a");
        touch_audio(&root, "b");
        let script = write_script(
            &root,
            &format!(
                "[{},{}]",
                segment_json("a", 0, "title", 1200),
                segment_json("b", 1, "selftext", 800)
            ),
        );

        let cfg = AssemblyConfig::new(&root, script, root.join("out.mp4"));
        let first = assemble_timeline(&cfg).unwrap();
        let second = assemble_timeline(&cfg).unwrap();
        assert_eq!(first.total_duration_sec(), second.total_duration_sec());
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }
}
