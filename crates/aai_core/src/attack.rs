//! Attack component (spec §4.K): a coordinated assault made of one or more
//! [`crate::group::Group`]s moving through a chain of sectors toward a
//! target.

use crate::group::{Group, GroupTask};
use crate::sector::SectorCoord;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttackState {
    Forming,
    Moving,
    Fighting,
    /// Terminal: either the target fell or the attack was called off.
    Finished,
    /// Terminal: invariant I12 — once Failed, an attack never recovers.
    Failed,
}

#[derive(Clone, Debug)]
pub struct Attack {
    pub id: usize,
    pub groups: Vec<usize>,
    pub route: Vec<SectorCoord>,
    pub route_index: usize,
    pub state: AttackState,
    /// Consecutive ticks the attack has failed its continuation check;
    /// transitions to `Failed` once this crosses the threshold.
    fail_streak: u32,
    /// Set once a group has ever been attached; distinguishes "never staffed
    /// yet" (Forming) from "lost every group mid-attack" (a failure
    /// condition per spec §4.L).
    ever_had_groups: bool,
}

const FAIL_STREAK_THRESHOLD: u32 = 3;

impl Attack {
    #[must_use]
    pub fn new(id: usize, route: Vec<SectorCoord>) -> Self {
        Attack {
            id,
            groups: Vec::new(),
            route,
            route_index: 0,
            state: AttackState::Forming,
            fail_streak: 0,
            ever_had_groups: false,
        }
    }

    /// Attach `group` to this attack, writing the invariant-I7 back-reference
    /// onto the group itself so it can find its way back here without this
    /// crate ever holding a second mutable reference to the same group.
    pub fn add_group(&mut self, group: &mut Group) {
        debug_assert!(group.attack.is_none(), "group already belongs to an attack");
        self.groups.push(group.id);
        self.ever_had_groups = true;
        group.attack = Some(self.id);
        group.task = GroupTask::Attacking(self.current_destination().unwrap_or(SectorCoord { x: 0, y: 0 }));
    }

    /// Spec §4.L failure condition: an attack that was staffed with groups
    /// and has since lost every one of them (all members died or were
    /// pulled out) has no remaining way to take its objective.
    #[must_use]
    pub fn has_no_remaining_groups(&self) -> bool {
        self.ever_had_groups && self.groups.is_empty()
    }

    /// Detach `group` from this attack (e.g. on retreat or retirement),
    /// clearing the back-reference both sides.
    pub fn remove_group(&mut self, group: &mut Group) {
        self.groups.retain(|&g| g != group.id);
        group.attack = None;
        group.task = GroupTask::Idle;
    }

    #[must_use]
    pub fn current_destination(&self) -> Option<SectorCoord> {
        self.route.get(self.route_index).copied()
    }

    pub fn advance(&mut self) {
        if self.route_index + 1 < self.route.len() {
            self.route_index += 1;
        }
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self.state, AttackState::Finished | AttackState::Failed)
    }

    /// Monotone failure check (spec invariant I12): once `Failed`, further
    /// calls are no-ops regardless of `own_power`/`enemy_power`. Three
    /// consecutive unfavourable ticks (own power less than enemy power)
    /// fail the attack permanently.
    pub fn check_if_failed(&mut self, own_power: f32, enemy_power: f32) -> bool {
        if self.is_terminal() {
            return self.state == AttackState::Failed;
        }
        if own_power < enemy_power {
            self.fail_streak += 1;
        } else {
            self.fail_streak = 0;
        }
        if self.fail_streak >= FAIL_STREAK_THRESHOLD {
            self.state = AttackState::Failed;
            true
        } else {
            false
        }
    }

    pub fn finish(&mut self) {
        if !self.is_terminal() {
            self.state = AttackState::Finished;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn three_consecutive_losses_fail_the_attack() {
        let mut a = Attack::new(0, vec![SectorCoord { x: 0, y: 0 }]);
        assert!(!a.check_if_failed(1.0, 10.0));
        assert!(!a.check_if_failed(1.0, 10.0));
        assert!(a.check_if_failed(1.0, 10.0));
        assert_eq!(a.state, AttackState::Failed);
    }

    #[test]
    fn a_win_resets_the_streak() {
        let mut a = Attack::new(0, vec![SectorCoord { x: 0, y: 0 }]);
        a.check_if_failed(1.0, 10.0);
        a.check_if_failed(1.0, 10.0);
        assert!(!a.check_if_failed(10.0, 1.0));
        assert!(!a.check_if_failed(1.0, 10.0));
    }

    #[test]
    fn failed_state_is_permanent() {
        let mut a = Attack::new(0, vec![SectorCoord { x: 0, y: 0 }]);
        for _ in 0..FAIL_STREAK_THRESHOLD {
            a.check_if_failed(1.0, 10.0);
        }
        assert_eq!(a.state, AttackState::Failed);
        assert!(a.check_if_failed(100.0, 1.0));
        assert_eq!(a.state, AttackState::Failed);
    }

    #[test]
    fn advance_stops_at_end_of_route() {
        let mut a = Attack::new(0, vec![SectorCoord { x: 0, y: 0 }, SectorCoord { x: 1, y: 0 }]);
        a.advance();
        assert_eq!(a.current_destination(), Some(SectorCoord { x: 1, y: 0 }));
        a.advance();
        assert_eq!(a.current_destination(), Some(SectorCoord { x: 1, y: 0 }));
    }

    proptest::proptest! {
        /// I7: every group attached to an attack points its back-reference at
        /// that attack, and detaching clears it again, for any attach/detach
        /// interleaving.
        #[test]
        fn prop_group_back_reference_tracks_attachment(ops in proptest::collection::vec(proptest::prelude::any::<bool>(), 1..20)) {
            use crate::types::{TargetType, UnitCategory, UnitDefId};
            let mut attack = Attack::new(0, vec![SectorCoord { x: 0, y: 0 }]);
            let mut group = Group::new(1, UnitCategory::GroundCombat, UnitDefId(1), TargetType::Surface);
            group.add_member(crate::types::UnitId(1));
            for attach in ops {
                if attach {
                    if group.attack.is_none() {
                        attack.add_group(&mut group);
                    }
                } else {
                    attack.remove_group(&mut group);
                }
                if attack.groups.contains(&group.id) {
                    proptest::prop_assert_eq!(group.attack, Some(attack.id));
                } else {
                    proptest::prop_assert_eq!(group.attack, None);
                }
            }
        }

        /// I12: `check_if_failed` never reports the attack un-failing once it
        /// has failed, for any sequence of own/enemy power samples.
        #[test]
        fn prop_check_if_failed_is_monotone(powers in proptest::collection::vec((0.0f32..100.0, 0.0f32..100.0), 1..30)) {
            let mut a = Attack::new(0, vec![SectorCoord { x: 0, y: 0 }]);
            let mut ever_failed = false;
            for (own, enemy) in powers {
                let failed_now = a.check_if_failed(own, enemy);
                if ever_failed {
                    proptest::prop_assert!(failed_now);
                }
                ever_failed |= failed_now;
                proptest::prop_assert_eq!(a.state == AttackState::Failed, ever_failed);
            }
        }
    }
}
