//! Group component (spec §4.J): a homogeneous cluster of combat units
//! moving and fighting as one, used both standalone (area defence) and as
//! the building block of [`crate::attack::Attack`].

use crate::sector::SectorCoord;
use crate::types::{CombatPower, TargetType, UnitCategory, UnitDefId, UnitId};

/// A group's task, separate from its membership (spec §4.J).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GroupTask {
    Idle,
    Defending(SectorCoord),
    MovingTo(SectorCoord),
    Attacking(SectorCoord),
}

#[derive(Clone, Debug)]
pub struct Group {
    pub id: usize,
    pub category: UnitCategory,
    pub def: UnitDefId,
    pub members: Vec<UnitId>,
    pub task: GroupTask,
    pub target_type: TargetType,
    /// Back-reference to the [`crate::attack::Attack`] this group is
    /// currently assigned to, written by `Attack::add_group` and cleared by
    /// `AttackManager` on detach/retirement (spec invariant I7).
    pub attack: Option<usize>,
    /// Rally point this group heads to when idle/removed from an attack.
    pub rally_point: Option<SectorCoord>,
}

impl Group {
    #[must_use]
    pub fn new(id: usize, category: UnitCategory, def: UnitDefId, target_type: TargetType) -> Self {
        Group {
            id,
            category,
            def,
            members: Vec::new(),
            task: GroupTask::Idle,
            target_type,
            attack: None,
            rally_point: None,
        }
    }

    /// Whether this group is a pure anti-air group (its only combat role is
    /// against `TargetType::Air`).
    #[must_use]
    pub fn is_pure_anti_air(&self) -> bool {
        self.target_type == TargetType::Air
    }

    /// Available-for-attack predicate (spec §4.L): unattached, its members
    /// are all back at the rally point, and it carries either sufficient
    /// assault power or is a pure anti-air group.
    #[must_use]
    pub fn is_available_for_attack(&self, at_rally_point: bool, sufficient_attack_power: bool) -> bool {
        self.attack.is_none() && !self.is_empty() && at_rally_point && (self.is_pure_anti_air() || sufficient_attack_power)
    }

    /// Max size for this group's category, per spec §4.J table.
    #[must_use]
    pub fn max_size_for(category: UnitCategory, cfg: &crate::config::AaiConfig) -> u32 {
        match category {
            UnitCategory::AirCombat => cfg.max_air_group_size,
            UnitCategory::SubmarineCombat => cfg.max_submarine_group_size,
            UnitCategory::SeaCombat => cfg.max_naval_group_size,
            UnitCategory::MobileArtillery => cfg.max_arty_group_size,
            _ => cfg.max_group_size,
        }
    }

    #[must_use]
    pub fn is_full(&self, cfg: &crate::config::AaiConfig) -> bool {
        self.members.len() as u32 >= Self::max_size_for(self.category, cfg)
    }

    /// A new unit may only join if it matches this group's def exactly
    /// (homogeneous grouping, spec §4.J) and the group has room.
    #[must_use]
    pub fn can_accept(&self, def: UnitDefId, cfg: &crate::config::AaiConfig) -> bool {
        def == self.def && !self.is_full(cfg)
    }

    pub fn add_member(&mut self, unit: UnitId) {
        self.members.push(unit);
    }

    pub fn remove_member(&mut self, unit: UnitId) {
        self.members.retain(|&u| u != unit);
        if self.members.is_empty() {
            self.attack = None;
            self.task = GroupTask::Idle;
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn combat_power_sum(&self, per_unit: CombatPower, target: TargetType) -> f32 {
        per_unit.get(target) * self.members.len() as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AaiConfig;

    #[test]
    fn group_rejects_mixed_defs() {
        let cfg = AaiConfig::default();
        let g = Group::new(0, UnitCategory::GroundCombat, UnitDefId(1), TargetType::Surface);
        assert!(g.can_accept(UnitDefId(1), &cfg));
        assert!(!g.can_accept(UnitDefId(2), &cfg));
    }

    #[test]
    fn group_respects_category_size_cap() {
        let cfg = AaiConfig {
            max_air_group_size: 1,
            ..AaiConfig::default()
        };
        let mut g = Group::new(0, UnitCategory::AirCombat, UnitDefId(1), TargetType::Air);
        assert!(!g.is_full(&cfg));
        g.add_member(UnitId(1));
        assert!(g.is_full(&cfg));
        assert!(!g.can_accept(UnitDefId(1), &cfg));
    }

    proptest::proptest! {
        /// I6: a group only ever admits units that match its own def, and
        /// never grows past its category's max size.
        #[test]
        fn prop_group_stays_homogeneous_and_capped(
            cap in 1u32..6,
            own_def in 1u32..4,
            joiners in proptest::collection::vec((1u32..4, 1u32..50u32), 0..20),
        ) {
            let cfg = AaiConfig { max_group_size: cap, ..AaiConfig::default() };
            let mut g = Group::new(0, UnitCategory::GroundCombat, UnitDefId(own_def), TargetType::Surface);
            for (def, unit_id) in joiners {
                if g.can_accept(UnitDefId(def), &cfg) {
                    g.add_member(UnitId(unit_id));
                }
            }
            proptest::prop_assert!(g.members.len() as u32 <= cap);
            proptest::prop_assert_eq!(g.def, UnitDefId(own_def));
        }
    }
}
