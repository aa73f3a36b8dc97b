//! Executor component (spec §4.I): turns Brain's category urgencies into
//! concrete build-queue entries and engine orders, rate-limiting how often
//! any single unit/group is re-ordered.

use std::collections::HashMap;

use crate::brain::Brain;
use crate::build_tree::BuildTree;
use crate::config::AaiConfig;
use crate::engine_api::{EngineApi, EngineCommand, OrderOptions};
use crate::types::{UnitCategory, UnitDefId, UnitId, UnitType};
use crate::unit_table::UnitTable;

/// Urgency growth factor applied every `tick_urgencies` call to a category
/// that wasn't satisfied last tick (spec §4.I): the longer a need goes
/// unmet, the more it presses.
const URGENCY_GROWTH: f32 = 1.02;
/// Clamp applied to every category's urgency after growth.
const MAX_URGENCY: f32 = 20.0;
/// Urgency level above which a queued build jumps to the front of the
/// buildqueue instead of joining the back (spec §4.I urgent-prepend).
const URGENT_THRESHOLD: f32 = 10.0;

/// Static/economy categories Executor tracks urgency for (spec §4.I). No
/// separate `StaticJammer` category exists in [`UnitCategory`] — jammer and
/// air-base urgency both fold into `StaticSupport`, see
/// `try_build_air_base`'s doc comment.
pub const URGENCY_CATEGORIES: [UnitCategory; 9] = [
    UnitCategory::PowerPlant,
    UnitCategory::MetalExtractor,
    UnitCategory::StaticDefence,
    UnitCategory::StaticConstructor,
    UnitCategory::StaticSensor,
    UnitCategory::StaticSupport,
    UnitCategory::StaticArtillery,
    UnitCategory::Storage,
    UnitCategory::MetalMaker,
];

/// A single factory's build queue state, used by the per-factory ranking
/// formula in [`Executor::factory_rank`].
#[derive(Clone, Copy, Debug, Default)]
pub struct FactoryQueueState {
    pub queue_len: u32,
    pub active: bool,
}

/// Per-unit order-rate limiter: an identical order is dropped if issued
/// again within [`Executor::UNIT_ORDER_COOLDOWN`] frames, and a
/// group-level order within [`Executor::GROUP_ORDER_COOLDOWN`] frames
/// (spec §4.I).
#[derive(Clone, Debug, Default)]
pub struct Executor {
    last_order_frame: HashMap<UnitId, u32>,
    last_group_order_frame: HashMap<usize, u32>,
    buildqueue: Vec<(UnitDefId, UnitCategory)>,
    urgencies: HashMap<UnitCategory, f32>,
    factory_queues: HashMap<UnitId, FactoryQueueState>,
}

impl Executor {
    pub const UNIT_ORDER_COOLDOWN: u32 = 5;
    pub const GROUP_ORDER_COOLDOWN: u32 = 30;

    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue an order to a single unit, suppressing repeats within the
    /// per-unit cooldown window.
    pub fn give_order(&mut self, engine: &mut dyn EngineApi, unit: UnitId, cmd: EngineCommand, opts: OrderOptions, frame: u32) -> bool {
        if let Some(&last) = self.last_order_frame.get(&unit) {
            if frame.saturating_sub(last) < Self::UNIT_ORDER_COOLDOWN {
                return false;
            }
        }
        engine.give_order(unit, cmd, opts);
        self.last_order_frame.insert(unit, frame);
        true
    }

    /// Issue an order to every member of a group, suppressing repeats within
    /// the per-group cooldown window. `opts` applies to every unit.
    pub fn give_group_order(
        &mut self,
        engine: &mut dyn EngineApi,
        group: usize,
        members: &[UnitId],
        cmd: EngineCommand,
        opts: OrderOptions,
        frame: u32,
    ) -> bool {
        if let Some(&last) = self.last_group_order_frame.get(&group) {
            if frame.saturating_sub(last) < Self::GROUP_ORDER_COOLDOWN {
                return false;
            }
        }
        for &unit in members {
            engine.give_order(unit, cmd.clone(), opts);
        }
        self.last_group_order_frame.insert(group, frame);
        true
    }

    #[must_use]
    pub fn urgency_of(&self, category: UnitCategory) -> f32 {
        *self.urgencies.get(&category).unwrap_or(&0.0)
    }

    fn reset_urgency(&mut self, category: UnitCategory) {
        self.urgencies.insert(category, 0.0);
    }

    /// Per-tick urgency update (spec §4.I): every tracked category's
    /// urgency grows by [`URGENCY_GROWTH`] and picks up this tick's
    /// resource-pressure seed, clamped to `[0, 20]`. A category whose
    /// `try_build_*` succeeds is reset to 0 by that call.
    pub fn tick_urgencies(&mut self, brain: &Brain, units: &UnitTable, cfg: &AaiConfig) {
        for &category in &URGENCY_CATEGORIES {
            let prev = self.urgency_of(category);
            let seed = Self::urgency_seed(category, brain, units, cfg);
            let next = (prev * URGENCY_GROWTH + seed).clamp(0.0, MAX_URGENCY);
            self.urgencies.insert(category, next);
        }
    }

    fn urgency_seed(category: UnitCategory, brain: &Brain, units: &UnitTable, cfg: &AaiConfig) -> f32 {
        match category {
            UnitCategory::PowerPlant => brain.energy_urgency(units.active_of(UnitCategory::PowerPlant)),
            UnitCategory::MetalExtractor => brain.metal_urgency(units.active_of(UnitCategory::MetalExtractor)),
            UnitCategory::MetalMaker => {
                if units.total_of(UnitCategory::MetalMaker) < cfg.max_metal_makers {
                    (brain.metal_urgency(units.active_of(UnitCategory::MetalExtractor))
                        - brain.energy_urgency(units.active_of(UnitCategory::PowerPlant)))
                    .max(0.0)
                } else {
                    0.0
                }
            }
            UnitCategory::StaticDefence => {
                if units.total_of(UnitCategory::StaticDefence) < cfg.max_defences {
                    0.3
                } else {
                    0.0
                }
            }
            UnitCategory::StaticConstructor => {
                if units.total_of(UnitCategory::StaticConstructor) < cfg.max_builders {
                    0.2
                } else {
                    0.0
                }
            }
            UnitCategory::StaticArtillery => {
                if units.total_of(UnitCategory::StaticArtillery) < cfg.max_stat_arty {
                    0.15
                } else {
                    0.0
                }
            }
            UnitCategory::Storage => {
                if units.total_of(UnitCategory::Storage) < cfg.max_storage {
                    0.1
                } else {
                    0.0
                }
            }
            UnitCategory::StaticSensor | UnitCategory::StaticSupport => 0.1,
            _ => 0.0,
        }
    }

    /// Whether building another `def` of `category` would exceed the
    /// configured per-category/per-type caps (spec §4.I `check_ressources`
    /// feeds into this alongside cost affordability, checked separately).
    #[must_use]
    pub fn under_cap(&self, units: &UnitTable, build_tree: &BuildTree, def: UnitDefId, category: UnitCategory, cfg: &AaiConfig) -> bool {
        let props = build_tree.properties(def);
        let cap = match category {
            UnitCategory::Scout => cfg.max_scouts,
            UnitCategory::StaticDefence => cfg.max_defences,
            UnitCategory::StaticArtillery => cfg.max_stat_arty,
            UnitCategory::Storage => cfg.max_storage,
            UnitCategory::MetalMaker => cfg.max_metal_makers,
            UnitCategory::MobileConstructor | UnitCategory::StaticConstructor => cfg.max_builders,
            _ => return true,
        };
        if units.total_of(category) >= cap {
            return false;
        }
        if matches!(category, UnitCategory::MobileConstructor | UnitCategory::StaticConstructor) {
            let per_type_cap = if props.is_some_and(|p| p.unit_type.contains(UnitType::FACTORY)) {
                cfg.max_factories_per_type
            } else {
                cfg.max_builders_per_type
            };
            if units.total_of_def(def) >= per_type_cap {
                return false;
            }
        }
        true
    }

    /// Whether current stockpiles can afford to start building `def` right
    /// now (spec §4.I `check_ressources`): always allowed for builders and
    /// scouts (they pay for themselves), otherwise gated on either a
    /// healthy metal buffer or a below-average cost for the category.
    #[must_use]
    pub fn can_afford(&self, engine: &dyn EngineApi, build_tree: &BuildTree, def: UnitDefId, category: UnitCategory) -> bool {
        if matches!(category, UnitCategory::MobileConstructor | UnitCategory::StaticConstructor | UnitCategory::Scout) {
            return true;
        }
        let Some(props) = build_tree.properties(def) else { return false };
        if engine.metal() >= 50.0 {
            return true;
        }
        let avg_cost = build_tree
            .statistics(props.side, category)
            .map_or(f32::INFINITY, |s| s.cost.avg);
        props.total_cost < avg_cost
    }

    /// Queue `def` for construction. `urgent` entries jump to the front of
    /// the queue (spec §4.I); the queue cap is only enforced for non-urgent
    /// entries, matching the original's "urgent always gets a slot" rule.
    pub fn add_unit_to_buildqueue(&mut self, def: UnitDefId, category: UnitCategory, urgent: bool, cfg: &AaiConfig) -> bool {
        if !urgent && self.buildqueue.len() as u32 >= cfg.max_buildqueue_size {
            return false;
        }
        if urgent {
            self.buildqueue.insert(0, (def, category));
        } else {
            self.buildqueue.push((def, category));
        }
        true
    }

    #[must_use]
    pub fn buildqueue(&self) -> &[(UnitDefId, UnitCategory)] {
        &self.buildqueue
    }

    /// Whether the economy can sustain pulling a construction-assist
    /// builder off economy duty right now (spec §4.I `check_ressources`):
    /// metal surplus must clear the configured floor, or stockpiles must
    /// already be comfortably above the storage-urgency threshold.
    #[must_use]
    pub fn check_ressources(&self, engine: &dyn EngineApi, cfg: &AaiConfig) -> bool {
        let metal_surplus = engine.metal_income() - engine.metal_usage();
        metal_surplus >= cfg.min_metal_surplus_for_construction_assist || engine.metal() > cfg.min_metal_storage
    }

    /// Pop the next queued build once the economy can afford it and its
    /// caps aren't exhausted (spec §4.I `check_buildqueues`); otherwise
    /// leaves it at the front to retry next tick.
    pub fn check_buildqueues(
        &mut self,
        units: &UnitTable,
        build_tree: &BuildTree,
        engine: &dyn EngineApi,
        cfg: &AaiConfig,
    ) -> Option<(UnitDefId, UnitCategory)> {
        if !self.check_ressources(engine, cfg) {
            return None;
        }
        let &(def, category) = self.buildqueue.first()?;
        if self.under_cap(units, build_tree, def, category, cfg) && self.can_afford(engine, build_tree, def, category) {
            self.buildqueue.remove(0);
            Some((def, category))
        } else {
            None
        }
    }

    /// Pop the next queued build unconditionally (used by callers that have
    /// already run [`Self::check_buildqueues`]'s checks themselves, e.g.
    /// tests).
    pub fn pop_buildqueue(&mut self) -> Option<(UnitDefId, UnitCategory)> {
        if self.buildqueue.is_empty() {
            None
        } else {
            Some(self.buildqueue.remove(0))
        }
    }

    /// Per-factory build-queue ranking (spec §4.I): factories currently
    /// producing rank higher, and shorter queues rank higher, so a fresh
    /// build order goes to the factory that will start it soonest.
    #[must_use]
    pub fn factory_rank(state: FactoryQueueState) -> f32 {
        let active = if state.active { 1.0 } else { 0.0 };
        (1.0 + 2.0 * active) / (state.queue_len as f32 + 3.0)
    }

    pub fn register_factory(&mut self, factory: UnitId) {
        self.factory_queues.entry(factory).or_default();
    }

    pub fn set_factory_active(&mut self, factory: UnitId, active: bool) {
        self.factory_queues.entry(factory).or_default().active = active;
    }

    /// Push an entry onto a specific factory's own queue (distinct from the
    /// AI-wide [`Self::buildqueue`], which holds builds awaiting any free
    /// constructor).
    pub fn push_to_factory(&mut self, factory: UnitId, cfg: &AaiConfig) -> bool {
        let state = self.factory_queues.entry(factory).or_default();
        if state.queue_len >= cfg.max_buildqueue_size {
            return false;
        }
        state.queue_len += 1;
        true
    }

    pub fn pop_from_factory(&mut self, factory: UnitId) {
        if let Some(state) = self.factory_queues.get_mut(&factory) {
            state.queue_len = state.queue_len.saturating_sub(1);
        }
    }

    /// Highest-ranked factory among the given candidates, per
    /// [`Self::factory_rank`].
    #[must_use]
    pub fn best_factory(&self, candidates: &[UnitId]) -> Option<UnitId> {
        candidates
            .iter()
            .map(|&id| (id, Self::factory_rank(self.factory_queues.get(&id).copied().unwrap_or_default())))
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(id, _)| id)
    }

    fn cheapest_of_category(build_tree: &BuildTree, side: u32, category: UnitCategory, cfg: &AaiConfig) -> Option<UnitDefId> {
        build_tree
            .defs_of_category(side, category)
            .into_iter()
            .filter(|&def| {
                build_tree
                    .properties(def)
                    .is_some_and(|p| !cfg.dont_build.iter().any(|n| n == &p.name))
            })
            .min_by(|&a, &b| {
                let ca = build_tree.properties(a).map_or(f32::INFINITY, |p| p.total_cost);
                let cb = build_tree.properties(b).map_or(f32::INFINITY, |p| p.total_cost);
                ca.partial_cmp(&cb).unwrap_or(std::cmp::Ordering::Equal)
            })
    }

    /// Shared body behind every `try_build_*` entry point: if `category`'s
    /// urgency is positive, queue its cheapest available def (respecting
    /// caps), reset the urgency, and report whether a build was queued.
    fn try_build(&mut self, units: &UnitTable, build_tree: &BuildTree, side: u32, category: UnitCategory, cfg: &AaiConfig) -> bool {
        if self.urgency_of(category) <= 0.0 {
            return false;
        }
        let Some(def) = Self::cheapest_of_category(build_tree, side, category, cfg) else {
            return false;
        };
        if !self.under_cap(units, build_tree, def, category, cfg) {
            return false;
        }
        let urgent = self.urgency_of(category) >= URGENT_THRESHOLD;
        if self.add_unit_to_buildqueue(def, category, urgent, cfg) {
            self.reset_urgency(category);
            true
        } else {
            false
        }
    }

    pub fn try_build_power_plant(&mut self, units: &UnitTable, build_tree: &BuildTree, side: u32, cfg: &AaiConfig) -> bool {
        self.try_build(units, build_tree, side, UnitCategory::PowerPlant, cfg)
    }

    pub fn try_build_extractor(&mut self, units: &UnitTable, build_tree: &BuildTree, side: u32, cfg: &AaiConfig) -> bool {
        self.try_build(units, build_tree, side, UnitCategory::MetalExtractor, cfg)
    }

    pub fn try_build_factory(&mut self, units: &UnitTable, build_tree: &BuildTree, side: u32, cfg: &AaiConfig) -> bool {
        self.try_build(units, build_tree, side, UnitCategory::StaticConstructor, cfg)
    }

    pub fn try_build_static_defence(&mut self, units: &UnitTable, build_tree: &BuildTree, side: u32, cfg: &AaiConfig) -> bool {
        self.try_build(units, build_tree, side, UnitCategory::StaticDefence, cfg)
    }

    pub fn try_build_metal_maker(&mut self, units: &UnitTable, build_tree: &BuildTree, side: u32, cfg: &AaiConfig) -> bool {
        self.try_build(units, build_tree, side, UnitCategory::MetalMaker, cfg)
    }

    pub fn try_build_storage(&mut self, units: &UnitTable, build_tree: &BuildTree, side: u32, cfg: &AaiConfig) -> bool {
        self.try_build(units, build_tree, side, UnitCategory::Storage, cfg)
    }

    pub fn try_build_radar(&mut self, units: &UnitTable, build_tree: &BuildTree, side: u32, cfg: &AaiConfig) -> bool {
        self.try_build(units, build_tree, side, UnitCategory::StaticSensor, cfg)
    }

    pub fn try_build_artillery(&mut self, units: &UnitTable, build_tree: &BuildTree, side: u32, cfg: &AaiConfig) -> bool {
        self.try_build(units, build_tree, side, UnitCategory::StaticArtillery, cfg)
    }

    /// Air-base construction. Shares the `StaticSupport` urgency bucket
    /// with jammers since [`UnitCategory`] has no dedicated air-base/jammer
    /// split; both draw down the same urgency value.
    pub fn try_build_air_base(&mut self, units: &UnitTable, build_tree: &BuildTree, side: u32, cfg: &AaiConfig) -> bool {
        self.try_build(units, build_tree, side, UnitCategory::StaticSupport, cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeEngine;
    use crate::types::Pos3;

    #[test]
    fn unit_order_cooldown_suppresses_repeats() {
        let mut exec = Executor::new();
        let mut engine = FakeEngine::two_side_toy();
        let unit = UnitId(1);
        assert!(exec.give_order(&mut engine, unit, EngineCommand::Stop, OrderOptions::default(), 0));
        assert!(!exec.give_order(&mut engine, unit, EngineCommand::Stop, OrderOptions::default(), 2));
        assert!(exec.give_order(&mut engine, unit, EngineCommand::Stop, OrderOptions::default(), 10));
        assert_eq!(engine.orders().len(), 2);
    }

    #[test]
    fn group_order_cooldown_suppresses_repeats() {
        let mut exec = Executor::new();
        let mut engine = FakeEngine::two_side_toy();
        let members = [UnitId(1), UnitId(2)];
        assert!(exec.give_group_order(&mut engine, 0, &members, EngineCommand::Move(Pos3::default()), OrderOptions::default(), 0));
        assert!(!exec.give_group_order(&mut engine, 0, &members, EngineCommand::Move(Pos3::default()), OrderOptions::default(), 10));
        assert_eq!(engine.orders().len(), 2);
    }

    #[test]
    fn buildqueue_respects_max_size_unless_urgent() {
        let mut exec = Executor::new();
        let cfg = AaiConfig { max_buildqueue_size: 1, ..AaiConfig::default() };
        assert!(exec.add_unit_to_buildqueue(UnitDefId(1), UnitCategory::GroundCombat, false, &cfg));
        assert!(!exec.add_unit_to_buildqueue(UnitDefId(2), UnitCategory::GroundCombat, false, &cfg));
        assert!(exec.add_unit_to_buildqueue(UnitDefId(3), UnitCategory::GroundCombat, true, &cfg));
        assert_eq!(exec.pop_buildqueue(), Some((UnitDefId(3), UnitCategory::GroundCombat)));
        assert_eq!(exec.pop_buildqueue(), Some((UnitDefId(1), UnitCategory::GroundCombat)));
    }

    #[test]
    fn urgency_grows_multiplicatively_and_clamps() {
        let mut exec = Executor::new();
        let brain = Brain::new();
        let units = UnitTable::new();
        let cfg = AaiConfig { max_defences: 10, ..AaiConfig::default() };
        for _ in 0..2000 {
            exec.tick_urgencies(&brain, &units, &cfg);
        }
        assert!(exec.urgency_of(UnitCategory::StaticDefence) <= MAX_URGENCY);
        assert!(exec.urgency_of(UnitCategory::StaticDefence) > 0.0);
    }

    #[test]
    fn try_build_is_a_no_op_with_no_matching_def_in_the_build_tree() {
        let mut exec = Executor::new();
        let brain = Brain::new();
        let units = UnitTable::new();
        let build_tree = BuildTree::default();
        let cfg = AaiConfig::default();
        exec.tick_urgencies(&brain, &units, &cfg);
        assert!(exec.urgency_of(UnitCategory::StaticDefence) > 0.0);
        // No defs classified in an empty build tree: try_build can't queue
        // anything, so urgency is left untouched rather than falsely reset.
        assert!(!exec.try_build_static_defence(&units, &build_tree, 1, &cfg));
        assert!(exec.urgency_of(UnitCategory::StaticDefence) > 0.0);
    }

    #[test]
    fn factory_rank_prefers_active_and_shorter_queues() {
        let busy_short = FactoryQueueState { queue_len: 1, active: true };
        let idle_long = FactoryQueueState { queue_len: 5, active: false };
        assert!(Executor::factory_rank(busy_short) > Executor::factory_rank(idle_long));
    }

    #[test]
    fn best_factory_picks_the_highest_ranked_candidate() {
        let mut exec = Executor::new();
        exec.register_factory(UnitId(1));
        exec.register_factory(UnitId(2));
        exec.set_factory_active(UnitId(1), true);
        exec.set_factory_active(UnitId(2), true);
        exec.push_to_factory(UnitId(2), &AaiConfig::default());
        exec.push_to_factory(UnitId(2), &AaiConfig::default());
        assert_eq!(exec.best_factory(&[UnitId(1), UnitId(2)]), Some(UnitId(1)));
    }

    #[test]
    fn under_cap_enforces_the_per_def_builder_cap() {
        let mut units = UnitTable::new();
        let build_tree = BuildTree::default();
        let cfg = AaiConfig { max_builders: 100, max_builders_per_type: 1, ..AaiConfig::default() };
        let exec = Executor::new();
        units.register_requested_def(UnitCategory::StaticConstructor, UnitDefId(1));
        assert!(!exec.under_cap(&units, &build_tree, UnitDefId(1), UnitCategory::StaticConstructor, &cfg));
        assert!(exec.under_cap(&units, &build_tree, UnitDefId(2), UnitCategory::StaticConstructor, &cfg));
    }
}
