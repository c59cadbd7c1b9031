use tracing::debug;

use crate::{
    compose::SceneUnit,
    error::{StorycutError, StorycutResult},
};

pub const DEFAULT_TRANSITION_SEC: f64 = 1.0;

/// Transition spacers are silent flat black.
pub const TRANSITION_RGB: [u8; 3] = [0, 0, 0];

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub enum TimelineItem {
    Scene(SceneUnit),
    /// A fixed-duration silent blank clip separating adjacent scenes.
    Transition { duration_sec: f64, rgb: [u8; 3] },
}

impl TimelineItem {
    pub fn duration_sec(&self) -> f64 {
        match self {
            TimelineItem::Scene(unit) => unit.duration_sec,
            TimelineItem::Transition { duration_sec, .. } => *duration_sec,
        }
    }
}

/// The fully time-resolved render plan: scene units in scene order with
/// transition spacers between adjacent pairs.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct Timeline {
    pub items: Vec<TimelineItem>,
}

impl Timeline {
    pub fn total_duration_sec(&self) -> f64 {
        self.items.iter().map(TimelineItem::duration_sec).sum()
    }

    pub fn scene_count(&self) -> usize {
        self.items
            .iter()
            .filter(|i| matches!(i, TimelineItem::Scene(_)))
            .count()
    }

    pub fn transition_count(&self) -> usize {
        self.items.len() - self.scene_count()
    }
}

/// Concatenates scene units in order, inserting one spacer between every
/// adjacent pair. No spacer before the first or after the last scene, none at
/// all for a single scene or a zero transition duration.
pub fn build_timeline(units: Vec<SceneUnit>, transition_sec: f64) -> StorycutResult<Timeline> {
    if units.is_empty() {
        return Err(StorycutError::no_renderable_content(
            "no scenes produced any renderable content",
        ));
    }

    let scene_count = units.len();
    let mut items = Vec::with_capacity(scene_count * 2 - 1);
    for unit in units {
        if !items.is_empty() && transition_sec > 0.0 {
            items.push(TimelineItem::Transition {
                duration_sec: transition_sec,
                rgb: TRANSITION_RGB,
            });
        }
        items.push(TimelineItem::Scene(unit));
    }

    let timeline = Timeline { items };
    debug!(
        scenes = scene_count,
        transitions = timeline.transition_count(),
        total_sec = timeline.total_duration_sec(),
        "built timeline"
    );
    Ok(timeline)
}
