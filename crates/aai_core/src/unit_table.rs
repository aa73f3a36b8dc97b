//! UnitTable component (spec §4.E): the single registry of every unit id
//! this AI has ever seen, both on its own side and scouted enemies.

use std::collections::HashMap;

use crate::build_tree::BuildTree;
use crate::engine_api::EngineApi;
use crate::types::{Pos3, UnitCategory, UnitDefId, UnitId, UnitType};

/// Lifecycle state of one of the AI's own units (spec invariant I8: a unit
/// id transitions `Requested -> UnderConstruction -> Active -> (removed)`,
/// never skipping or reversing a step while alive).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UnitStatus {
    /// Queued in a build order but no engine unit id exists yet.
    Requested,
    /// Engine unit id exists but `unit_finished` has not fired.
    UnderConstruction,
    /// Fully built and operating.
    Active,
}

/// Registry entry for one of the AI's own units.
#[derive(Clone, Debug)]
pub struct UnitEntry {
    pub def: UnitDefId,
    pub category: UnitCategory,
    pub status: UnitStatus,
    pub pos: Pos3,
    pub health_fraction: f32,
    pub group: Option<usize>,
}

/// Registry entry for a scouted enemy unit. Enemy ids are the engine's own
/// unit ids for the enemy team (always non-negative, like friendly ids);
/// coexistence with friendly entries is resolved by keeping two separate
/// maps rather than reserving a second sentinel, since the engine never
/// hands out a colliding id across teams.
#[derive(Clone, Debug)]
pub struct EnemyUnitEntry {
    pub def: UnitDefId,
    pub category: UnitCategory,
    pub pos: Pos3,
    pub last_seen_frame: u32,
}

/// The AI's live-unit bookkeeping: per-id entries plus per-category active
/// counts used throughout Executor/Brain urgency calculations.
#[derive(Clone, Debug, Default)]
pub struct UnitTable {
    units: HashMap<UnitId, UnitEntry>,
    enemies: HashMap<UnitId, EnemyUnitEntry>,
    active_count: HashMap<UnitCategory, u32>,
    under_construction_count: HashMap<UnitCategory, u32>,
    requested_count: HashMap<UnitCategory, u32>,
    /// Per-def mirrors of the three counters above, used by Executor's
    /// per-type caps (e.g. `MAX_BUILDERS_PER_TYPE`, `MAX_FACTORIES_PER_TYPE`)
    /// which a per-category total can't express.
    active_def_count: HashMap<UnitDefId, u32>,
    under_construction_def_count: HashMap<UnitDefId, u32>,
    requested_def_count: HashMap<UnitDefId, u32>,
}

impl UnitTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a construction request before the engine has allocated a
    /// unit id (category counters only; no id exists yet).
    pub fn register_requested(&mut self, category: UnitCategory) {
        *self.requested_count.entry(category).or_insert(0) += 1;
    }

    /// Same as [`Self::register_requested`] but also bumps the per-def
    /// requested counter Executor's per-type caps read from
    /// [`Self::total_of_def`].
    pub fn register_requested_def(&mut self, category: UnitCategory, def: UnitDefId) {
        self.register_requested(category);
        *self.requested_def_count.entry(def).or_insert(0) += 1;
    }

    /// `unit_created` callback: a unit id now exists but is not finished.
    /// Consumes one `Requested` slot for this category/def if one is
    /// pending.
    pub fn unit_created(&mut self, unit: UnitId, def: UnitDefId, category: UnitCategory, pos: Pos3) {
        if let Some(c) = self.requested_count.get_mut(&category) {
            if *c > 0 {
                *c -= 1;
            }
        }
        if let Some(c) = self.requested_def_count.get_mut(&def) {
            if *c > 0 {
                *c -= 1;
            }
        }
        *self.under_construction_count.entry(category).or_insert(0) += 1;
        *self.under_construction_def_count.entry(def).or_insert(0) += 1;
        self.units.insert(
            unit,
            UnitEntry {
                def,
                category,
                status: UnitStatus::UnderConstruction,
                pos,
                health_fraction: 1.0,
                group: None,
            },
        );
    }

    /// `unit_finished` callback: moves a unit from UnderConstruction to
    /// Active. No-op (with a warning) if the unit isn't known or already
    /// active, which should never happen under normal callback ordering.
    pub fn unit_finished(&mut self, unit: UnitId) {
        let Some(entry) = self.units.get_mut(&unit) else {
            tracing::warn!(?unit, "unit_finished for unknown unit");
            return;
        };
        if entry.status == UnitStatus::Active {
            return;
        }
        if let Some(c) = self.under_construction_count.get_mut(&entry.category) {
            if *c > 0 {
                *c -= 1;
            }
        }
        if let Some(c) = self.under_construction_def_count.get_mut(&entry.def) {
            if *c > 0 {
                *c -= 1;
            }
        }
        *self.active_count.entry(entry.category).or_insert(0) += 1;
        *self.active_def_count.entry(entry.def).or_insert(0) += 1;
        entry.status = UnitStatus::Active;
    }

    /// `unit_destroyed` callback: removes the entry and decrements whichever
    /// counter it was last in.
    pub fn unit_destroyed(&mut self, unit: UnitId) -> Option<UnitEntry> {
        let entry = self.units.remove(&unit)?;
        let (counter, def_counter) = match entry.status {
            UnitStatus::Requested => (&mut self.requested_count, &mut self.requested_def_count),
            UnitStatus::UnderConstruction => (&mut self.under_construction_count, &mut self.under_construction_def_count),
            UnitStatus::Active => (&mut self.active_count, &mut self.active_def_count),
        };
        if let Some(c) = counter.get_mut(&entry.category) {
            if *c > 0 {
                *c -= 1;
            }
        }
        if let Some(c) = def_counter.get_mut(&entry.def) {
            if *c > 0 {
                *c -= 1;
            }
        }
        Some(entry)
    }

    pub fn update_health(&mut self, unit: UnitId, health_fraction: f32) {
        if let Some(e) = self.units.get_mut(&unit) {
            e.health_fraction = health_fraction.clamp(0.0, 1.0);
        }
    }

    pub fn update_pos(&mut self, unit: UnitId, pos: Pos3) {
        if let Some(e) = self.units.get_mut(&unit) {
            e.pos = pos;
        }
    }

    pub fn assign_group(&mut self, unit: UnitId, group: Option<usize>) {
        if let Some(e) = self.units.get_mut(&unit) {
            e.group = group;
        }
    }

    #[must_use]
    pub fn get(&self, unit: UnitId) -> Option<&UnitEntry> {
        self.units.get(&unit)
    }

    #[must_use]
    pub fn active_of(&self, category: UnitCategory) -> u32 {
        *self.active_count.get(&category).unwrap_or(&0)
    }

    #[must_use]
    pub fn under_construction_of(&self, category: UnitCategory) -> u32 {
        *self.under_construction_count.get(&category).unwrap_or(&0)
    }

    #[must_use]
    pub fn requested_of(&self, category: UnitCategory) -> u32 {
        *self.requested_count.get(&category).unwrap_or(&0)
    }

    /// Total committed (requested + under construction + active) of a
    /// category, the figure Executor compares against config caps.
    #[must_use]
    pub fn total_of(&self, category: UnitCategory) -> u32 {
        self.active_of(category) + self.under_construction_of(category) + self.requested_of(category)
    }

    /// Total committed (requested + under construction + active) count of a
    /// single def, the figure Executor's per-type caps
    /// (`MAX_BUILDERS_PER_TYPE`, `MAX_FACTORIES_PER_TYPE`) compare against.
    #[must_use]
    pub fn total_of_def(&self, def: UnitDefId) -> u32 {
        self.active_def_count.get(&def).copied().unwrap_or(0)
            + self.under_construction_def_count.get(&def).copied().unwrap_or(0)
            + self.requested_def_count.get(&def).copied().unwrap_or(0)
    }

    pub fn record_enemy_sighting(&mut self, unit: UnitId, def: UnitDefId, category: UnitCategory, pos: Pos3, frame: u32) {
        self.enemies.insert(unit, EnemyUnitEntry { def, category, pos, last_seen_frame: frame });
    }

    pub fn forget_enemy(&mut self, unit: UnitId) {
        self.enemies.remove(&unit);
    }

    #[must_use]
    pub fn enemy(&self, unit: UnitId) -> Option<&EnemyUnitEntry> {
        self.enemies.get(&unit)
    }

    #[must_use]
    pub fn enemies(&self) -> impl Iterator<Item = (&UnitId, &EnemyUnitEntry)> {
        self.enemies.iter()
    }

    /// Closest idle unit of a given def (spec §4.E `find_builder`), filtered
    /// by `status == Active`.
    #[must_use]
    pub fn find_closest_builder(&self, def: UnitDefId, pos: Pos3, idle_only: impl Fn(UnitId) -> bool) -> Option<UnitId> {
        self.units
            .iter()
            .filter(|(id, e)| e.def == def && e.status == UnitStatus::Active && idle_only(**id))
            .min_by(|(_, a), (_, b)| {
                a.pos.distance_sq_2d(pos).partial_cmp(&b.pos.distance_sq_2d(pos)).unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|(id, _)| *id)
    }

    /// Closest active unit able to assist (any builder-capable category)
    /// within `max_distance`, used by Constructor's assistance search.
    #[must_use]
    pub fn find_closest_assistant(
        &self,
        pos: Pos3,
        max_distance: f32,
        build_tree: &BuildTree,
        candidate: impl Fn(UnitId) -> bool,
    ) -> Option<UnitId> {
        let max_sq = max_distance * max_distance;
        self.units
            .iter()
            .filter(|(id, e)| {
                e.status == UnitStatus::Active
                    && e.category.is_constructor()
                    && build_tree
                        .properties(e.def)
                        .map(|p| p.unit_type.contains(UnitType::CONSTRUCTION_ASSIST))
                        .unwrap_or(false)
                    && e.pos.distance_sq_2d(pos) <= max_sq
                    && candidate(**id)
            })
            .min_by(|(_, a), (_, b)| {
                a.pos.distance_sq_2d(pos).partial_cmp(&b.pos.distance_sq_2d(pos)).unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|(id, _)| *id)
    }
}

/// Bulk-classify an engine def id to a [`UnitCategory`] via the build tree,
/// used by callback handlers constructing [`UnitTable`] entries.
#[must_use]
pub fn category_of(build_tree: &BuildTree, def: UnitDefId) -> UnitCategory {
    build_tree.properties(def).map(|p| p.category).unwrap_or_default()
}

#[must_use]
pub fn def_name<'a>(engine: &'a dyn EngineApi, def: UnitDefId) -> &'a str {
    engine.unit_def(def).map(|d| d.name.as_str()).unwrap_or("<unknown>")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Pos3;
    use proptest::strategy::Strategy as _;

    #[test]
    fn lifecycle_transitions_move_category_counters() {
        let mut table = UnitTable::new();
        table.register_requested(UnitCategory::GroundCombat);
        assert_eq!(table.requested_of(UnitCategory::GroundCombat), 1);

        table.unit_created(UnitId(1), UnitDefId(7), UnitCategory::GroundCombat, Pos3::default());
        assert_eq!(table.requested_of(UnitCategory::GroundCombat), 0);
        assert_eq!(table.under_construction_of(UnitCategory::GroundCombat), 1);

        table.unit_finished(UnitId(1));
        assert_eq!(table.under_construction_of(UnitCategory::GroundCombat), 0);
        assert_eq!(table.active_of(UnitCategory::GroundCombat), 1);

        table.unit_destroyed(UnitId(1));
        assert_eq!(table.active_of(UnitCategory::GroundCombat), 0);
        assert!(table.get(UnitId(1)).is_none());
    }

    #[test]
    fn total_of_sums_all_three_buckets() {
        let mut table = UnitTable::new();
        table.register_requested(UnitCategory::Scout);
        table.unit_created(UnitId(2), UnitDefId(1), UnitCategory::Scout, Pos3::default());
        assert_eq!(table.total_of(UnitCategory::Scout), 1);
        table.register_requested(UnitCategory::Scout);
        assert_eq!(table.total_of(UnitCategory::Scout), 2);
    }

    #[test]
    fn enemy_sightings_are_independent_of_friendly_ids() {
        let mut table = UnitTable::new();
        table.unit_created(UnitId(1), UnitDefId(1), UnitCategory::GroundCombat, Pos3::default());
        table.record_enemy_sighting(UnitId(1), UnitDefId(99), UnitCategory::GroundCombat, Pos3::default(), 10);
        assert!(table.get(UnitId(1)).is_some());
        assert!(table.enemy(UnitId(1)).is_some());
        table.forget_enemy(UnitId(1));
        assert!(table.enemy(UnitId(1)).is_none());
        assert!(table.get(UnitId(1)).is_some());
    }

    #[derive(Clone, Copy, Debug)]
    enum Op {
        Request,
        Create(u32),
        Finish(u32),
        Destroy(u32),
    }

    proptest::proptest! {
        /// I8: every counter stays non-negative and the three buckets for a
        /// single category always sum to the number of units currently
        /// tracked in one of those three states, for any interleaving of
        /// request/create/finish/destroy calls (including calls against
        /// unknown ids, which must be no-ops rather than underflow).
        #[test]
        fn prop_counters_never_go_negative_and_stay_consistent(
            ops in proptest::collection::vec(
                proptest::prop_oneof![
                    proptest::prelude::Just(Op::Request),
                    (0u32..6).prop_map(Op::Create),
                    (0u32..6).prop_map(Op::Finish),
                    (0u32..6).prop_map(Op::Destroy),
                ],
                0..40,
            ),
        ) {
            let category = UnitCategory::GroundCombat;
            let mut table = UnitTable::new();
            for op in ops {
                match op {
                    Op::Request => table.register_requested(category),
                    Op::Create(id) => {
                        if table.get(UnitId(id)).is_none() {
                            table.unit_created(UnitId(id), UnitDefId(1), category, Pos3::default());
                        }
                    }
                    Op::Finish(id) => table.unit_finished(UnitId(id)),
                    Op::Destroy(id) => { table.unit_destroyed(UnitId(id)); }
                }
                proptest::prop_assert!(table.requested_of(category) <= table.total_of(category));
                proptest::prop_assert!(table.under_construction_of(category) <= table.total_of(category));
                proptest::prop_assert!(table.active_of(category) <= table.total_of(category));
            }
        }
    }
}
