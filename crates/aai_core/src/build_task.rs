//! BuildTask lifecycle (spec §4.G): one entry per in-progress construction,
//! owning the Map blockmap reservation for its footprint until the task
//! completes or is aborted (invariants I4/I5).

use crate::types::{Pos3, UnitDefId, UnitId};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BuildTaskState {
    /// Placed on the map and blocked, waiting for a builder to start work.
    Queued,
    /// At least one constructor is actively building.
    InProgress,
    /// `unit_finished` fired; task is done and its block can be released.
    Finished,
    /// Builder died, target died, or timed out: block must still be
    /// released exactly once.
    Aborted,
}

#[derive(Clone, Debug)]
pub struct BuildTask {
    pub def: UnitDefId,
    pub pos: Pos3,
    pub footprint: (u32, u32),
    pub water: bool,
    pub owner: Option<UnitId>,
    pub assistants: Vec<UnitId>,
    pub state: BuildTaskState,
    pub started_frame: u32,
    pub target_unit: Option<UnitId>,
    /// True once [`Map::block_building`]/`add_block` has been applied for
    /// this task, so release is idempotent (invariant I4: never double free
    /// a block that was never taken).
    pub blocked: bool,
}

impl BuildTask {
    #[must_use]
    pub fn new(def: UnitDefId, pos: Pos3, footprint: (u32, u32), water: bool, started_frame: u32) -> Self {
        BuildTask {
            def,
            pos,
            footprint,
            water,
            owner: None,
            assistants: Vec::new(),
            state: BuildTaskState::Queued,
            started_frame,
            target_unit: None,
            blocked: false,
        }
    }

    pub fn assign_owner(&mut self, owner: UnitId) {
        self.owner = Some(owner);
        self.state = BuildTaskState::InProgress;
    }

    pub fn add_assistant(&mut self, unit: UnitId, max_assistants: u32) -> bool {
        if self.assistants.len() as u32 >= max_assistants || self.assistants.contains(&unit) {
            return false;
        }
        self.assistants.push(unit);
        true
    }

    pub fn remove_assistant(&mut self, unit: UnitId) {
        self.assistants.retain(|&u| u != unit);
    }

    /// The owning builder died: becomes Aborted unless an assistant can be
    /// promoted (caller's responsibility to call [`BuildTask::assign_owner`]
    /// again with a promoted assistant, in which case state stays
    /// `InProgress`).
    pub fn owner_lost(&mut self) {
        if let Some(next) = self.assistants.first().copied() {
            self.assistants.remove(0);
            self.assign_owner(next);
        } else {
            self.owner = None;
            self.state = BuildTaskState::Aborted;
        }
    }

    pub fn finish(&mut self, target_unit: UnitId) {
        self.target_unit = Some(target_unit);
        self.state = BuildTaskState::Finished;
    }

    pub fn abort(&mut self) {
        self.state = BuildTaskState::Aborted;
    }

    /// Whether this task's block should still be held on the map (spec
    /// invariant I5: a task's footprint is blocked from Queued through
    /// Finished/Aborted inclusive, only freed once — by
    /// [`BuildTask::release_block`]).
    #[must_use]
    pub fn holds_block(&self) -> bool {
        matches!(self.state, BuildTaskState::Queued | BuildTaskState::InProgress)
    }

    /// Mark the block released exactly once; returns `false` if it was
    /// already released or never taken (caller should skip calling
    /// `Map::unblock_building` in that case).
    pub fn release_block(&mut self) -> bool {
        if !self.blocked {
            return false;
        }
        self.blocked = false;
        true
    }

    pub fn mark_blocked(&mut self) {
        self.blocked = true;
    }

    #[must_use]
    pub fn timed_out(&self, current_frame: u32, timeout: u32) -> bool {
        self.state == BuildTaskState::InProgress && current_frame.saturating_sub(self.started_frame) > timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task() -> BuildTask {
        BuildTask::new(UnitDefId(1), Pos3::default(), (2, 2), false, 0)
    }

    #[test]
    fn owner_lost_promotes_first_assistant() {
        let mut t = task();
        t.assign_owner(UnitId(1));
        t.add_assistant(UnitId(2), 4);
        t.owner_lost();
        assert_eq!(t.owner, Some(UnitId(2)));
        assert_eq!(t.state, BuildTaskState::InProgress);
        assert!(t.assistants.is_empty());
    }

    #[test]
    fn owner_lost_with_no_assistants_aborts() {
        let mut t = task();
        t.assign_owner(UnitId(1));
        t.owner_lost();
        assert_eq!(t.state, BuildTaskState::Aborted);
        assert!(t.owner.is_none());
    }

    #[test]
    fn block_release_is_idempotent() {
        let mut t = task();
        t.mark_blocked();
        assert!(t.release_block());
        assert!(!t.release_block());
    }

    #[test]
    fn holds_block_only_while_active() {
        let mut t = task();
        assert!(t.holds_block());
        t.assign_owner(UnitId(1));
        assert!(t.holds_block());
        t.finish(UnitId(9));
        assert!(!t.holds_block());
    }

    #[test]
    fn add_assistant_respects_cap_and_dedup() {
        let mut t = task();
        assert!(t.add_assistant(UnitId(2), 1));
        assert!(!t.add_assistant(UnitId(2), 1));
        assert!(!t.add_assistant(UnitId(3), 1));
    }
}
