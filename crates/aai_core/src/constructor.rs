//! Constructor agent state machine (spec §4.F): per-builder-unit activity
//! tracking, assistance search, and damage-triggered retreat.

use crate::types::{Pos3, UnitId};

/// A constructor's current activity. Legal transitions: `Idle ->
/// Constructing`, `Idle -> Assisting`, `Constructing|Assisting -> Idle` (on
/// completion/abort), and any state `-> Retreating` on critical damage,
/// `Retreating -> Idle` once safe.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Activity {
    Idle,
    /// Owns and is building `task`.
    Constructing { task: usize },
    /// Assisting someone else's construction at `task`.
    Assisting { task: usize },
    /// Fleeing from a damage event, remembers what it was doing so it can
    /// resume.
    Retreating { resume: Option<(bool, usize)> },
}

#[derive(Clone, Debug)]
pub struct Constructor {
    pub unit: UnitId,
    pub activity: Activity,
    pub pos: Pos3,
    pub health_fraction: f32,
}

impl Constructor {
    #[must_use]
    pub fn new(unit: UnitId, pos: Pos3) -> Self {
        Constructor {
            unit,
            activity: Activity::Idle,
            pos,
            health_fraction: 1.0,
        }
    }

    #[must_use]
    pub fn is_idle(&self) -> bool {
        matches!(self.activity, Activity::Idle)
    }

    pub fn start_construction(&mut self, task: usize) {
        debug_assert!(self.is_idle(), "construction assigned to busy constructor");
        self.activity = Activity::Constructing { task };
    }

    pub fn start_assisting(&mut self, task: usize) {
        debug_assert!(self.is_idle(), "assistance assigned to busy constructor");
        self.activity = Activity::Assisting { task };
    }

    /// Construction/assistance finished, aborted, or its target died: return
    /// to idle unconditionally.
    pub fn release(&mut self) {
        self.activity = Activity::Idle;
    }

    /// Damage callback (spec §4.F): below `retreat_health_fraction`, flee and
    /// remember what to resume once safe.
    pub fn on_damaged(&mut self, health_fraction: f32, retreat_health_fraction: f32) -> bool {
        self.health_fraction = health_fraction;
        if health_fraction >= retreat_health_fraction {
            return false;
        }
        let resume = match self.activity {
            Activity::Constructing { task } => Some((true, task)),
            Activity::Assisting { task } => Some((false, task)),
            Activity::Retreating { resume } => resume,
            Activity::Idle => None,
        };
        self.activity = Activity::Retreating { resume };
        true
    }

    /// Health recovered (or distance from danger restored): resume whatever
    /// was interrupted, if anything survived.
    pub fn recover(&mut self) {
        if let Activity::Retreating { resume } = self.activity {
            self.activity = match resume {
                Some((true, task)) => Activity::Constructing { task },
                Some((false, task)) => Activity::Assisting { task },
                None => Activity::Idle,
            };
        }
    }

    /// Whether this constructor, currently assisting/constructing `task`,
    /// should hand off to a closer idle constructor instead (spec §4.F
    /// `take_over_construction`): only applies when idle, since a busy
    /// constructor never takes over another's task.
    #[must_use]
    pub fn should_take_over(&self, task_pos: Pos3, current_owner_distance: f32) -> bool {
        self.is_idle() && self.pos.distance_2d(task_pos) < current_owner_distance
    }

    /// Check whether additional assistants are warranted for a task with
    /// `remaining_buildtime` frames left and `current_buildspeed` (spec
    /// §4.F `check_assistance`).
    #[must_use]
    pub fn check_assistance(remaining_buildtime: f32, current_buildspeed: f32, min_buildtime: f32, min_buildspeed: f32) -> bool {
        remaining_buildtime > min_buildtime && current_buildspeed < min_buildspeed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn damage_below_threshold_triggers_retreat_and_remembers_task() {
        let mut c = Constructor::new(UnitId(1), Pos3::default());
        c.start_construction(5);
        assert!(c.on_damaged(0.2, 0.3));
        assert!(matches!(c.activity, Activity::Retreating { resume: Some((true, 5)) }));
    }

    #[test]
    fn damage_above_threshold_does_not_retreat() {
        let mut c = Constructor::new(UnitId(1), Pos3::default());
        c.start_construction(5);
        assert!(!c.on_damaged(0.9, 0.3));
        assert!(matches!(c.activity, Activity::Constructing { task: 5 }));
    }

    #[test]
    fn recover_resumes_interrupted_activity() {
        let mut c = Constructor::new(UnitId(1), Pos3::default());
        c.start_assisting(2);
        c.on_damaged(0.1, 0.3);
        c.recover();
        assert!(matches!(c.activity, Activity::Assisting { task: 2 }));
    }

    #[test]
    fn idle_constructor_with_no_prior_task_returns_to_idle_on_recover() {
        let mut c = Constructor::new(UnitId(1), Pos3::default());
        c.on_damaged(0.1, 0.3);
        c.recover();
        assert!(c.is_idle());
    }

    #[test]
    fn check_assistance_requires_both_conditions() {
        assert!(Constructor::check_assistance(500.0, 10.0, 300.0, 50.0));
        assert!(!Constructor::check_assistance(100.0, 10.0, 300.0, 50.0));
        assert!(!Constructor::check_assistance(500.0, 80.0, 300.0, 50.0));
    }
}
