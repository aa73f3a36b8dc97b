//! Build tree & unit-type knowledge base (spec §4.A).
//!
//! One-shot [`BuildTree::generate`] classifies every unit def the engine
//! advertises and computes the per-side/per-category statistics every
//! later selection decision reads. After generation the tree is read-only
//! except for combat-power learning and persistence.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::config::AaiConfig;
use crate::engine_api::{EngineApi, UnitDef};
use crate::types::{CombatPower, MovementType, TargetType, UnitCategory, UnitDefId, UnitType};

/// Derived per-unit-def stats, filled once during generation (spec §3
/// `UnitTypeProperties`).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UnitTypeProperties {
    pub total_cost: f32,
    pub buildtime: f32,
    pub health: f32,
    pub footprint: (u32, u32),
    /// Category-dependent: weapon range / LOS / radar range / buildspeed /
    /// metal yield / power generation / metal storage, see spec §3.
    pub primary_ability: f32,
    /// Category-dependent: speed / sonar range / energy storage.
    pub secondary_ability: f32,
    pub name: String,
    pub category: UnitCategory,
    pub movement_type: MovementType,
    pub target_type: TargetType,
    pub unit_type: UnitType,
    pub factory_id: Option<u32>,
    pub side: u32,
}

/// Min/max/avg over a scalar statistic within a side+category bucket.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct MinMaxAvg {
    pub min: f32,
    pub max: f32,
    pub avg: f32,
}

impl MinMaxAvg {
    fn from_values(values: &[f32]) -> Self {
        if values.is_empty() {
            return Self::default();
        }
        let min = values.iter().copied().fold(f32::INFINITY, f32::min);
        let max = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let avg = values.iter().sum::<f32>() / values.len() as f32;
        Self { min, max, avg }
    }
}

/// Min/max/avg of cost/buildtime/primary/secondary ability across every def
/// in a `(side, category)` bucket.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct UnitStatistics {
    pub cost: MinMaxAvg,
    pub buildtime: MinMaxAvg,
    pub primary_ability: MinMaxAvg,
    pub secondary_ability: MinMaxAvg,
}

/// Statistics for sensor-carrying unit defs (radar/sonar/seismic range).
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct SensorStatistics {
    pub range: MinMaxAvg,
}

const MIN_INITIAL_COMBAT_POWER: f32 = 2.0;
const NO_VALID_TARGET_INITIAL_COMBAT_POWER: f32 = 0.1;
const MAX_INITIAL_COMBAT_POWER: f32 = 10.0;
const MIN_ANTI_TARGET_TYPE_COMBAT_POWER: f32 = 1.0;
const MAX_CHANGE_PER_COMBAT: f32 = 2.0;
const MIN_COMBAT_POWER: f32 = CombatPower::MIN;
const MAX_COMBAT_POWER: f32 = CombatPower::MAX;

/// The build tree & unit-type knowledge base.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct BuildTree {
    can_construct: HashMap<UnitDefId, HashSet<UnitDefId>>,
    constructed_by: HashMap<UnitDefId, HashSet<UnitDefId>>,
    side_of_unit_type: HashMap<UnitDefId, u32>,
    properties: HashMap<UnitDefId, UnitTypeProperties>,
    combat_power: HashMap<UnitDefId, CombatPower>,
    /// Per-side, per-category statistics.
    statistics: HashMap<(u32, UnitCategory), UnitStatistics>,
    sensor_statistics: HashMap<u32, SensorStatistics>,
    next_factory_id: u32,
}

impl BuildTree {
    /// One-shot generation from the engine's unit-def catalog (spec §4.A
    /// steps 1-9).
    pub fn generate(engine: &dyn EngineApi, cfg: &AaiConfig) -> Self {
        let n = engine.num_unit_defs();
        let mut tree = BuildTree::default();

        let name_to_id: HashMap<String, UnitDefId> = (1..=n as u32)
            .filter_map(|i| engine.unit_def(UnitDefId(i)))
            .map(|d| (d.name.clone(), d.id))
            .collect();

        // Step 2: can_construct / constructed_by.
        for i in 1..=n as u32 {
            let Some(def) = engine.unit_def(UnitDefId(i)) else { continue };
            let set = tree.can_construct.entry(def.id).or_default();
            for &opt in &def.build_options {
                set.insert(opt);
                tree.constructed_by.entry(opt).or_default().insert(def.id);
            }
            tree.can_construct.entry(def.id).or_default();
            tree.constructed_by.entry(def.id).or_default();
        }

        // Step 3: identify roots, falling back to configured start units.
        let mut roots: Vec<UnitDefId> = tree
            .can_construct
            .iter()
            .filter(|(id, opts)| {
                !opts.is_empty() && tree.constructed_by.get(*id).map_or(true, HashSet::is_empty)
            })
            .map(|(id, _)| *id)
            .collect();
        roots.sort();

        if roots.len() as u32 != cfg.sides {
            roots = cfg
                .start_units
                .iter()
                .filter_map(|name| name_to_id.get(name).copied())
                .collect();
        }

        // Step 4: DFS-propagate side id from each root.
        for (side_idx, root) in roots.iter().enumerate() {
            let side = side_idx as u32 + 1;
            let mut stack = vec![*root];
            while let Some(id) = stack.pop() {
                if tree.side_of_unit_type.contains_key(&id) {
                    continue;
                }
                tree.side_of_unit_type.insert(id, side);
                if let Some(children) = tree.can_construct.get(&id) {
                    stack.extend(children.iter().copied());
                }
            }
        }

        // Step 5+6: fill properties + classify category.
        let mut factory_id = 0u32;
        for i in 1..=n as u32 {
            let Some(def) = engine.unit_def(UnitDefId(i)) else { continue };
            let side = *tree.side_of_unit_type.get(&def.id).unwrap_or(&0);
            if side == 0 {
                continue;
            }
            let movement_type = derive_movement_type(def, cfg);
            let target_type = movement_type.target_type();
            let category = classify(def, cfg, &roots, movement_type);

            let mut unit_type = if movement_type.is_static() {
                UnitType::BUILDING
            } else {
                UnitType::MOBILE_UNIT
            };
            if !tree.can_construct.get(&def.id).map_or(true, HashSet::is_empty) {
                unit_type.insert(if movement_type.is_static() {
                    UnitType::FACTORY
                } else {
                    UnitType::BUILDER
                });
            }
            if def.can_assist {
                unit_type.insert(UnitType::CONSTRUCTION_ASSIST);
            }
            if def.has_radar {
                unit_type.insert(UnitType::RADAR);
            }
            if def.has_sonar {
                unit_type.insert(UnitType::SONAR);
            }
            if def.has_radar_jammer {
                unit_type.insert(UnitType::RADAR_JAMMER);
            }
            if def.has_sonar_jammer {
                unit_type.insert(UnitType::SONAR_JAMMER);
            }

            let fid = if unit_type.contains(UnitType::FACTORY) {
                let id = factory_id;
                factory_id += 1;
                Some(id)
            } else {
                None
            };

            let (primary, secondary) = abilities_for(def, category);

            tree.properties.insert(
                def.id,
                UnitTypeProperties {
                    total_cost: total_cost(def, cfg),
                    buildtime: def.buildtime,
                    health: def.health,
                    footprint: (def.footprint_x, def.footprint_z),
                    primary_ability: primary,
                    secondary_ability: secondary,
                    name: def.name.clone(),
                    category,
                    movement_type,
                    target_type,
                    unit_type,
                    factory_id: fid,
                    side,
                },
            );
        }
        tree.next_factory_id = factory_id;

        // Step 7: AntiX bits, once combat power is initialised.
        tree.init_combat_power(engine);
        tree.update_anti_type_bits();

        // Step 9: per-side statistics.
        tree.compute_statistics();

        tree
    }

    fn init_combat_power(&mut self, engine: &dyn EngineApi) {
        let combat_defs: Vec<UnitDefId> = self
            .properties
            .iter()
            .filter(|(_, p)| p.category.is_combat())
            .map(|(id, _)| *id)
            .collect();

        if combat_defs.is_empty() {
            return;
        }

        let costs: Vec<f32> = combat_defs
            .iter()
            .map(|id| self.properties[id].total_cost)
            .collect();
        let min_cost = costs.iter().copied().fold(f32::INFINITY, f32::min);
        let max_cost = costs.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let cost_range = (max_cost - min_cost).max(1e-6);

        // Count total defs of each target type, across every side, to
        // normalise "targetable fraction".
        let mut total_by_target = [0u32; 5];
        for p in self.properties.values() {
            total_by_target[p.target_type.index()] += 1;
        }

        let base = MIN_INITIAL_COMBAT_POWER - NO_VALID_TARGET_INITIAL_COMBAT_POWER;
        let cost_component = 0.5 * MAX_INITIAL_COMBAT_POWER - MIN_INITIAL_COMBAT_POWER;

        for &def_id in &combat_defs {
            let Some(def) = engine.unit_def(def_id) else { continue };
            let cost = self.properties[&def_id].total_cost;
            let normalised = ((cost - min_cost) / cost_range).clamp(0.0, 1.0);
            let power_component = base + cost_component * normalised;

            let mut cp = CombatPower::floor();
            for t in TargetType::ALL {
                let total = total_by_target[t.index()].max(1);
                let targetable = def
                    .weapons
                    .iter()
                    .filter(|w| w.target_mask.contains(&t))
                    .count() as f32;
                // Every weapon that can hit `t` contributes; normalise by
                // how many distinct defs across all sides present that
                // target type, per spec §4.A.
                let targetable_fraction = if targetable > 0.0 {
                    1.0 / total as f32 * total as f32 // presence-based: any weapon capable of engaging t counts fully
                } else {
                    0.0
                };
                let value = NO_VALID_TARGET_INITIAL_COMBAT_POWER
                    + power_component * targetable_fraction.min(1.0);
                cp.set(t, value);
            }
            self.combat_power.insert(def_id, cp);
        }
    }

    fn update_anti_type_bits(&mut self) {
        let updates: Vec<(UnitDefId, UnitType)> = self
            .combat_power
            .iter()
            .map(|(id, cp)| {
                let mut bits = UnitType::empty();
                if cp.get(TargetType::Surface) > MIN_ANTI_TARGET_TYPE_COMBAT_POWER {
                    bits.insert(UnitType::ANTI_SURFACE);
                }
                if cp.get(TargetType::Air) > MIN_ANTI_TARGET_TYPE_COMBAT_POWER {
                    bits.insert(UnitType::ANTI_AIR);
                }
                if cp.get(TargetType::Floater) > MIN_ANTI_TARGET_TYPE_COMBAT_POWER {
                    bits.insert(UnitType::ANTI_SHIP);
                }
                if cp.get(TargetType::Submerged) > MIN_ANTI_TARGET_TYPE_COMBAT_POWER {
                    bits.insert(UnitType::ANTI_SUBMERGED);
                }
                if cp.get(TargetType::Static) > MIN_ANTI_TARGET_TYPE_COMBAT_POWER {
                    bits.insert(UnitType::ANTI_STATIC);
                }
                (*id, bits)
            })
            .collect();
        for (id, bits) in updates {
            if let Some(p) = self.properties.get_mut(&id) {
                p.unit_type.insert(bits);
            }
        }
    }

    fn compute_statistics(&mut self) {
        use UnitCategory::*;
        let categories = [
            Unknown, StaticDefence, StaticArtillery, Storage, StaticConstructor, StaticSupport,
            StaticSensor, PowerPlant, MetalExtractor, MetalMaker, Commander, GroundCombat,
            AirCombat, HoverCombat, SeaCombat, SubmarineCombat, MobileArtillery, Scout,
            Transport, MobileConstructor, MobileSupport,
        ];
        let sides: HashSet<u32> = self.properties.values().map(|p| p.side).collect();

        for &side in &sides {
            for &cat in &categories {
                let defs: Vec<&UnitTypeProperties> = self
                    .properties
                    .values()
                    .filter(|p| p.side == side && p.category == cat)
                    .collect();
                if defs.is_empty() {
                    continue;
                }
                let cost: Vec<f32> = defs.iter().map(|p| p.total_cost).collect();
                let buildtime: Vec<f32> = defs.iter().map(|p| p.buildtime).collect();
                let primary: Vec<f32> = defs.iter().map(|p| p.primary_ability).collect();
                let secondary: Vec<f32> = defs.iter().map(|p| p.secondary_ability).collect();
                self.statistics.insert(
                    (side, cat),
                    UnitStatistics {
                        cost: MinMaxAvg::from_values(&cost),
                        buildtime: MinMaxAvg::from_values(&buildtime),
                        primary_ability: MinMaxAvg::from_values(&primary),
                        secondary_ability: MinMaxAvg::from_values(&secondary),
                    },
                );
            }

            let sensors: Vec<f32> = self
                .properties
                .values()
                .filter(|p| {
                    p.side == side
                        && p.unit_type
                            .intersects(UnitType::RADAR.union(UnitType::SONAR).union(UnitType::SEISMIC))
                })
                .map(|p| p.primary_ability)
                .collect();
            if !sensors.is_empty() {
                self.sensor_statistics.insert(
                    side,
                    SensorStatistics {
                        range: MinMaxAvg::from_values(&sensors),
                    },
                );
            }
        }
    }

    #[must_use]
    pub fn properties(&self, id: UnitDefId) -> Option<&UnitTypeProperties> {
        self.properties.get(&id)
    }

    #[must_use]
    pub fn can_construct(&self, id: UnitDefId) -> Option<&HashSet<UnitDefId>> {
        self.can_construct.get(&id)
    }

    #[must_use]
    pub fn constructed_by(&self, id: UnitDefId) -> Option<&HashSet<UnitDefId>> {
        self.constructed_by.get(&id)
    }

    #[must_use]
    pub fn side_of(&self, id: UnitDefId) -> u32 {
        *self.side_of_unit_type.get(&id).unwrap_or(&0)
    }

    #[must_use]
    pub fn combat_power(&self, id: UnitDefId) -> CombatPower {
        self.combat_power.get(&id).copied().unwrap_or_default()
    }

    #[must_use]
    pub fn statistics(&self, side: u32, category: UnitCategory) -> Option<&UnitStatistics> {
        self.statistics.get(&(side, category))
    }

    #[must_use]
    pub fn sensor_statistics(&self, side: u32) -> Option<&SensorStatistics> {
        self.sensor_statistics.get(&side)
    }

    #[must_use]
    pub fn num_factories(&self) -> u32 {
        self.next_factory_id
    }

    /// All defs of a (side, category) pair.
    #[must_use]
    pub fn defs_of_category(&self, side: u32, category: UnitCategory) -> Vec<UnitDefId> {
        let mut out: Vec<UnitDefId> = self
            .properties
            .iter()
            .filter(|(_, p)| p.side == side && p.category == category)
            .map(|(id, _)| *id)
            .collect();
        out.sort();
        out
    }

    /// Combat learning update (spec §4.A). Both participants must be
    /// combat-capable for anything to change.
    pub fn update_combat_power_statistics(&mut self, attacker: UnitDefId, killed: UnitDefId, learn_rate: f32) {
        let (Some(attacker_props), Some(killed_props)) =
            (self.properties.get(&attacker), self.properties.get(&killed))
        else {
            return;
        };
        if !attacker_props.category.is_combat() || !killed_props.category.is_combat() {
            return;
        }
        let attacker_target = attacker_props.target_type;
        let killed_target = killed_props.target_type;

        let killed_cp_vs_attacker = self.combat_power(killed).get(attacker_target);
        let attacker_cp_vs_killed = self.combat_power(attacker).get(killed_target).max(CombatPower::MIN);

        let delta = (learn_rate * killed_cp_vs_attacker / attacker_cp_vs_killed).min(MAX_CHANGE_PER_COMBAT);

        let mut attacker_cp = self.combat_power(attacker);
        let new_attacker_value = (attacker_cp.get(killed_target) + delta).clamp(MIN_COMBAT_POWER, MAX_COMBAT_POWER);
        attacker_cp.set(killed_target, new_attacker_value);
        self.combat_power.insert(attacker, attacker_cp);

        let mut killed_cp = self.combat_power(killed);
        let new_killed_value = (killed_cp.get(attacker_target) - delta).clamp(MIN_COMBAT_POWER, MAX_COMBAT_POWER);
        killed_cp.set(attacker_target, new_killed_value);
        self.combat_power.insert(killed, killed_cp);
    }
}

fn total_cost(def: &UnitDef, cfg: &AaiConfig) -> f32 {
    def.metal_cost + def.energy_cost / cfg.metal_energy_ratio
}

fn derive_movement_type(def: &UnitDef, cfg: &AaiConfig) -> MovementType {
    let is_building = def.speed <= 0.0 && !def.can_fly;
    if is_building {
        if def.is_submersible {
            return MovementType::StaticSeaSubmerged;
        }
        if def.is_floater {
            return MovementType::StaticSeaFloater;
        }
        return MovementType::StaticLand;
    }
    if def.can_fly {
        return MovementType::Air;
    }
    if def.is_submersible {
        return MovementType::SeaSubmerged;
    }
    if def.is_floater {
        return MovementType::SeaFloater;
    }
    if def.min_water_depth > cfg.non_amphib_max_waterdepth {
        return MovementType::Amphibious;
    }
    if def.min_water_depth > 0.0 {
        return MovementType::Hover;
    }
    MovementType::Ground
}

fn abilities_for(def: &UnitDef, category: UnitCategory) -> (f32, f32) {
    use UnitCategory::*;
    let best_weapon_range = def.weapons.iter().map(|w| w.range).fold(0.0_f32, f32::max);
    match category {
        StaticDefence | StaticArtillery | GroundCombat | AirCombat | HoverCombat | SeaCombat
        | SubmarineCombat | MobileArtillery => (best_weapon_range, def.speed),
        Scout => (def.los_range, def.speed),
        StaticSensor => (def.radar_range.max(def.sonar_range), def.sonar_range),
        MobileConstructor | StaticConstructor => (def.speed.max(1.0), def.speed),
        MetalExtractor => (def.extracts_metal, 0.0),
        PowerPlant => (def.energy_make.max(-def.energy_upkeep), 0.0),
        Storage => (def.metal_storage, def.energy_storage),
        _ => (0.0, def.speed),
    }
}

#[allow(clippy::too_many_arguments)]
fn classify(def: &UnitDef, cfg: &AaiConfig, roots: &[UnitDefId], movement_type: MovementType) -> UnitCategory {
    use UnitCategory::*;

    let has_weapon = def.weapons.iter().any(|w| w.max_damage > 1.0);
    let has_stockpile = def.weapons.iter().any(|w| w.stockpile);

    if movement_type.is_static() {
        if def.can_assist && def.build_options.is_empty() {
            return StaticSupport;
        }
        if !def.build_options.is_empty() {
            return StaticConstructor;
        }
        if def.extracts_metal > 0.0 {
            return MetalExtractor;
        }
        if def.is_air_base {
            return StaticSupport;
        }
        let generates_energy = def.energy_make >= cfg.min_energy
            || def.is_tidal
            || def.is_wind
            || def.energy_upkeep <= -cfg.min_energy;
        if generates_energy {
            return PowerPlant;
        }
        if has_weapon {
            if has_stockpile || def.has_shield {
                return StaticSupport;
            }
            let best_range = def.weapons.iter().map(|w| w.range).fold(0.0_f32, f32::max);
            return if best_range < cfg.stationary_arty_range {
                StaticDefence
            } else {
                StaticArtillery
            };
        }
        if def.has_radar || def.has_sonar {
            return StaticSensor;
        }
        if def.has_radar_jammer || def.has_sonar_jammer {
            return StaticSupport;
        }
        if def.metal_make > 0.0 {
            return MetalMaker;
        }
        if def.metal_storage >= cfg.min_metal_storage || def.energy_storage >= cfg.min_energy_storage {
            return Storage;
        }
        return Unknown;
    }

    // Mobile.
    if roots.contains(&def.id) {
        return Commander;
    }
    if cfg.scouts.iter().any(|n| n == &def.name) || (def.speed > cfg.scout_speed && !def.can_fly) {
        return Scout;
    }
    if def.is_transport || cfg.transporters.iter().any(|n| n == &def.name) {
        return Transport;
    }
    if !def.build_options.is_empty() || def.can_assist || def.can_resurrect {
        return MobileConstructor;
    }
    if has_weapon {
        if has_stockpile {
            return MobileSupport;
        }
        let best_range = def.weapons.iter().map(|w| w.range).fold(0.0_f32, f32::max);
        return match movement_type {
            MovementType::Ground if best_range > cfg.ground_arty_range => MobileArtillery,
            MovementType::Ground => GroundCombat,
            MovementType::Amphibious if best_range > cfg.ground_arty_range => MobileArtillery,
            MovementType::Amphibious => GroundCombat,
            MovementType::Hover if best_range > cfg.hover_arty_range => MobileArtillery,
            MovementType::Hover => HoverCombat,
            MovementType::Air => AirCombat,
            MovementType::SeaFloater if best_range > cfg.sea_arty_range => MobileArtillery,
            MovementType::SeaFloater => SeaCombat,
            MovementType::SeaSubmerged => SubmarineCombat,
            _ => Unknown,
        };
    }
    if def.has_radar || def.has_sonar || def.has_radar_jammer || def.has_sonar_jammer {
        return MobileSupport;
    }
    Unknown
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeEngine;

    #[test]
    fn roots_become_commanders_and_dfs_assigns_sides() {
        let engine = FakeEngine::two_side_toy();
        let cfg = AaiConfig {
            sides: 2,
            start_units: vec!["armcom".into(), "corcom".into()],
            ..AaiConfig::default()
        };
        let tree = BuildTree::generate(&engine, &cfg);

        let armcom = engine.unit_def_by_name("armcom").unwrap().id;
        let corcom = engine.unit_def_by_name("corcom").unwrap().id;
        assert_eq!(tree.side_of(armcom), 1);
        assert_eq!(tree.side_of(corcom), 2);
        assert_eq!(tree.properties(armcom).unwrap().category, UnitCategory::Commander);
    }

    #[test]
    fn can_construct_and_constructed_by_are_inverse() {
        let engine = FakeEngine::two_side_toy();
        let cfg = AaiConfig {
            sides: 2,
            start_units: vec!["armcom".into(), "corcom".into()],
            ..AaiConfig::default()
        };
        let tree = BuildTree::generate(&engine, &cfg);
        for (&id, children) in &tree.can_construct {
            for &child in children {
                assert!(tree.constructed_by[&child].contains(&id));
            }
        }
    }

    #[test]
    fn factory_ids_are_unique() {
        let engine = FakeEngine::two_side_toy();
        let cfg = AaiConfig {
            sides: 2,
            start_units: vec!["armcom".into(), "corcom".into()],
            ..AaiConfig::default()
        };
        let tree = BuildTree::generate(&engine, &cfg);
        let mut seen = HashSet::new();
        for p in tree.properties.values() {
            if let Some(fid) = p.factory_id {
                assert!(seen.insert(fid), "duplicate factory id {fid}");
            }
        }
    }

    #[test]
    fn combat_learning_moves_powers_in_opposite_directions() {
        let engine = FakeEngine::two_side_toy();
        let cfg = AaiConfig {
            sides: 2,
            start_units: vec!["armcom".into(), "corcom".into()],
            ..AaiConfig::default()
        };
        let mut tree = BuildTree::generate(&engine, &cfg);
        let attacker = engine.unit_def_by_name("armtank").unwrap().id;
        let killed = engine.unit_def_by_name("cortank").unwrap().id;

        let before_attacker = tree.combat_power(attacker);
        let before_killed = tree.combat_power(killed);

        tree.update_combat_power_statistics(attacker, killed, cfg.learn_rate);

        let after_attacker = tree.combat_power(attacker);
        let after_killed = tree.combat_power(killed);
        let killed_target = tree.properties(killed).unwrap().target_type;
        let attacker_target = tree.properties(attacker).unwrap().target_type;

        assert!(after_attacker.get(killed_target) >= before_attacker.get(killed_target));
        assert!(after_killed.get(attacker_target) <= before_killed.get(attacker_target));
    }
}
