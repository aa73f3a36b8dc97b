//! AirForceManager component (spec §4.M): maintains a ranked list of
//! air-raid targets, dispatches raids, and scrambles air support on demand
//! for a ground fight already in progress.

use crate::config::AaiConfig;
use crate::types::{Pos3, UnitId};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AirTarget {
    pub unit: UnitId,
    pub pos: Pos3,
    pub value: f32,
    pub last_seen_frame: u32,
}

#[derive(Clone, Debug, Default)]
pub struct AirForceManager {
    targets: Vec<AirTarget>,
}

/// A target not re-confirmed within this many frames is dropped (spec
/// §4.M refresh/drop logic).
const TARGET_STALE_FRAMES: u32 = 1800;

impl AirForceManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or refresh a target sighting, keeping the list sorted by value
    /// and capped at `cfg.max_air_targets`.
    pub fn observe_target(&mut self, target: AirTarget, cfg: &AaiConfig) {
        if let Some(existing) = self.targets.iter_mut().find(|t| t.unit == target.unit) {
            *existing = target;
        } else {
            self.targets.push(target);
        }
        self.targets.sort_by(|a, b| b.value.partial_cmp(&a.value).unwrap_or(std::cmp::Ordering::Equal));
        self.targets.truncate(cfg.max_air_targets as usize);
    }

    /// Drop targets not seen within the last [`TARGET_STALE_FRAMES`] frames,
    /// exactly one removal pass per call: every stale entry found this call
    /// is dropped together, rather than one-at-a-time, since staleness is
    /// evaluated against a single current frame and re-running the same
    /// check would find nothing new to remove until more time passes.
    pub fn refresh(&mut self, current_frame: u32) {
        self.targets
            .retain(|t| current_frame.saturating_sub(t.last_seen_frame) <= TARGET_STALE_FRAMES);
    }

    #[must_use]
    pub fn best_target(&self) -> Option<&AirTarget> {
        self.targets.first()
    }

    #[must_use]
    pub fn targets(&self) -> &[AirTarget] {
        &self.targets
    }

    /// Whether scrambling air support for a ground fight at `efficiency` is
    /// worthwhile (spec §4.M air-support-on-demand).
    #[must_use]
    pub fn should_scramble_support(efficiency: f32, cfg: &AaiConfig) -> bool {
        efficiency >= cfg.min_air_support_efficiency
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(unit: i32, value: f32, frame: u32) -> AirTarget {
        AirTarget { unit: UnitId(unit), pos: Pos3::default(), value, last_seen_frame: frame }
    }

    #[test]
    fn observe_target_keeps_list_sorted_and_capped() {
        let mut mgr = AirForceManager::new();
        let cfg = AaiConfig { max_air_targets: 2, ..AaiConfig::default() };
        mgr.observe_target(target(1, 10.0, 0), &cfg);
        mgr.observe_target(target(2, 50.0, 0), &cfg);
        mgr.observe_target(target(3, 30.0, 0), &cfg);
        assert_eq!(mgr.targets().len(), 2);
        assert_eq!(mgr.best_target().unwrap().unit, UnitId(2));
    }

    #[test]
    fn refresh_drops_stale_targets() {
        let mut mgr = AirForceManager::new();
        let cfg = AaiConfig::default();
        mgr.observe_target(target(1, 10.0, 0), &cfg);
        mgr.refresh(TARGET_STALE_FRAMES + 1);
        assert!(mgr.targets().is_empty());
    }

    #[test]
    fn scramble_threshold_matches_config() {
        let cfg = AaiConfig { min_air_support_efficiency: 0.5, ..AaiConfig::default() };
        assert!(AirForceManager::should_scramble_support(0.6, &cfg));
        assert!(!AirForceManager::should_scramble_support(0.4, &cfg));
    }
}
