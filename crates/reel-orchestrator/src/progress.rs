//! Snapshot to progress translation.

use reel_models::{JobSnapshot, Phase};

use crate::config::ProgressConfig;

/// Display values derived from one snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressUpdate {
    pub progress: u8,
    pub phase: Phase,
    /// Zero-based index of the scene being worked on
    pub current_scene_index: usize,
}

/// Derive progress, phase and current scene from a snapshot.
///
/// Stateless: a later snapshot may translate to a lower value. Never returns
/// more than `config.running_cap()`, so never 100.
pub fn translate(snapshot: &JobSnapshot, config: &ProgressConfig) -> ProgressUpdate {
    let cap = config.running_cap();
    let total = snapshot.scene_count();
    if total == 0 {
        return ProgressUpdate {
            progress: config.initializing_floor.min(cap),
            phase: Phase::Initializing,
            current_scene_index: 0,
        };
    }

    let audio = snapshot.audio_done().min(total);
    let video = snapshot.video_done().min(total);
    let last = total - 1;

    let (phase, current_scene_index) = if audio < total {
        (Phase::GeneratingAudio, audio.min(last))
    } else if video < total {
        (Phase::GeneratingVideo, video.min(last))
    } else {
        (Phase::Composing, last)
    };

    let share = |weight: u8, done: usize| -> u32 {
        (f64::from(weight) * done as f64 / total as f64).round() as u32
    };

    let progress = (u32::from(config.accepted_base)
        + share(config.audio_weight, audio)
        + share(config.video_weight, video))
    .min(u32::from(cap)) as u8;

    ProgressUpdate {
        progress,
        phase,
        current_scene_index,
    }
}
