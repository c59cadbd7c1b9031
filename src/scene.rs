use tracing::{debug, warn};

use crate::{
    error::{StorycutError, StorycutResult},
    script::{Segment, VisualType},
};

/// A group of segments sharing one `source_type`, sharing one background.
///
/// Grouping is by value, not by contiguous run: if two non-adjacent ranges of
/// the script share a `source_type` they merge into one scene, each segment
/// keeping its original relative order. Scene order is first-seen order.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct Scene {
    /// The shared `source_type` value.
    pub name: String,
    /// First-seen position among all scenes, including ones later dropped for
    /// having no narration. Keys the fallback color parity.
    pub index: usize,
    pub segments: Vec<Segment>,
    /// Visual fields come from the scene's first segment; later segments'
    /// visual fields are ignored.
    pub visual_type: VisualType,
    pub visual_asset_path: Option<String>,
    pub visual_loopable: bool,
}

impl Scene {
    fn from_first_segment(index: usize, seg: &Segment) -> Self {
        Self {
            name: seg.source_type.clone(),
            index,
            segments: vec![seg.clone()],
            visual_type: seg.visual_type,
            visual_asset_path: seg.visual_asset_path.clone(),
            visual_loopable: seg.visual_loopable,
        }
    }

    /// Total declared narration time in seconds.
    pub fn narration_duration_sec(&self) -> f64 {
        self.segments
            .iter()
            .map(|s| s.audio_duration_ms)
            .sum::<u64>() as f64
            / 1000.0
    }
}

/// Partitions segments into scenes keyed by `source_type`, preserving
/// first-seen order. Scenes whose narration duration is zero carry no
/// renderable content and are dropped here; dropping every scene yields an
/// empty vec, not an error.
pub fn group_scenes(segments: &[Segment]) -> StorycutResult<Vec<Scene>> {
    if segments.is_empty() {
        return Err(StorycutError::EmptyScript);
    }

    let mut scenes: Vec<Scene> = Vec::new();
    for seg in segments {
        match scenes.iter_mut().find(|s| s.name == seg.source_type) {
            Some(scene) => scene.segments.push(seg.clone()),
            None => {
                let index = scenes.len();
                scenes.push(Scene::from_first_segment(index, seg));
            }
        }
    }

    let kept: Vec<Scene> = scenes
        .into_iter()
        .filter(|s| {
            if s.narration_duration_sec() > 0.0 {
                true
            } else {
                warn!(scene = %s.name, "dropping scene with zero narration duration");
                false
            }
        })
        .collect();

    debug!(scenes = kept.len(), "grouped script into scenes");
    Ok(kept)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(id: &str, order: i64, source: &str, ms: u64) -> Segment {
        Segment {
            id: id.to_string(),
            order,
            text: format!("text {id}"),
            audio_path: format!("audio/{id}.mp3"),
            audio_duration_ms: ms,
            source_type: source.to_string(),
            visual_type: VisualType::ColorFallback,
            visual_asset_path: None,
            visual_loopable: false,
        }
    }

    #[test]
    fn partitions_without_loss_and_preserves_first_seen_order() {
        let segments = vec![
            seg("a", 0, "title", 500),
            seg("b", 1, "selftext", 700),
            seg("c", 2, "selftext", 300),
            seg("d", 3, "comment_1", 900),
        ];
        let scenes = group_scenes(&segments).unwrap();
        assert_eq!(
            scenes.iter().map(|s| s.name.as_str()).collect::<Vec<_>>(),
            vec!["title", "selftext", "comment_1"]
        );
        let total: usize = scenes.iter().map(|s| s.segments.len()).sum();
        assert_eq!(total, segments.len());
    }

    #[test]
    fn non_adjacent_runs_merge_into_one_scene() {
        let segments = vec![
            seg("a", 0, "title", 500),
            seg("b", 1, "comment_1", 700),
            seg("c", 2, "title", 300),
        ];
        let scenes = group_scenes(&segments).unwrap();
        assert_eq!(scenes.len(), 2);
        assert_eq!(scenes[0].name, "title");
        assert_eq!(
            scenes[0]
                .segments
                .iter()
                .map(|s| s.id.as_str())
                .collect::<Vec<_>>(),
            vec!["a", "c"]
        );
    }

    #[test]
    fn visual_fields_come_from_first_segment() {
        let mut first = seg("a", 0, "title", 500);
        first.visual_type = VisualType::StaticImage;
        first.visual_asset_path = Some("assets/one.png".to_string());
        let mut second = seg("b", 1, "title", 500);
        second.visual_type = VisualType::StaticVideo;
        second.visual_asset_path = Some("assets/two.mp4".to_string());

        let scenes = group_scenes(&[first, second]).unwrap();
        assert_eq!(scenes[0].visual_type, VisualType::StaticImage);
        assert_eq!(scenes[0].visual_asset_path.as_deref(), Some("assets/one.png"));
    }

    #[test]
    fn narration_duration_sums_segment_audio() {
        let scenes = group_scenes(&[seg("a", 0, "title", 1200), seg("b", 1, "title", 800)]).unwrap();
        assert!((scenes[0].narration_duration_sec() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn zero_duration_scenes_are_dropped_not_fatal() {
        let segments = vec![seg("a", 0, "title", 0), seg("b", 1, "selftext", 100)];
        let scenes = group_scenes(&segments).unwrap();
        assert_eq!(scenes.len(), 1);
        assert_eq!(scenes[0].name, "selftext");
        // Parity index still reflects first-seen position.
        assert_eq!(scenes[0].index, 1);
    }

    #[test]
    fn all_zero_duration_yields_zero_scenes() {
        let scenes = group_scenes(&[seg("a", 0, "title", 0)]).unwrap();
        assert!(scenes.is_empty());
    }

    #[test]
    fn empty_input_is_an_error() {
        assert!(matches!(
            group_scenes(&[]).unwrap_err(),
            StorycutError::EmptyScript
        ));
    }
}
