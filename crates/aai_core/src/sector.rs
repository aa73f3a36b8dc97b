//! Sector component (spec §4.C): the coarse grid cell Brain/Executor/Attack
//! reason over. Each sector tracks rolling friendly/enemy presence, learned
//! importance, and metal-spot membership.

use serde::{Deserialize, Serialize};

use crate::config::AaiConfig;
use crate::types::{GamePhase, Pos3, TargetType};

/// Coordinates of a sector within [`crate::map::Map`]'s sector grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SectorCoord {
    pub x: u32,
    pub y: u32,
}

/// Per-target-type friendly/enemy combat power observed in a sector this
/// tick, reset every Brain update cycle (spec §4.C).
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LocalCombatPower {
    pub friendly: [f32; 5],
    pub enemy: [f32; 5],
    pub enemy_static: [f32; 5],
}

/// A sector's full learned + transient state.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Sector {
    pub coord: SectorCoord,
    pub water_ratio: f32,
    pub is_water_sector: bool,
    pub metal_spot_indices: Vec<usize>,
    pub occupied_metal_spots: u32,
    pub combat_power: LocalCombatPower,
    /// Learned attacked-by rate, keyed by [`GamePhase`] then [`TargetType`].
    pub attacked_by_rates: [[f32; 5]; GamePhase::COUNT],
    /// Number of own units lost in this sector this game, decayed over time.
    pub lost_units: f32,
    /// Learned base-expansion importance (higher = more valuable to claim).
    pub importance: f32,
    pub is_part_of_base: bool,
    pub distance_to_base: u32,
    pub enemies_scouted_frame: u32,
    /// Number of scouted enemy buildings (static units) currently believed
    /// present, folded by [`Sector::add_scouted_enemy_unit`] and cleared by
    /// [`Sector::reset_scouted_enemies_data`].
    pub enemy_buildings: u32,
    /// Distance (in sectors) from this sector to the nearest map edge; used
    /// by siting and rally-point scoring to prefer interior sectors.
    pub edge_distance: u32,
    /// Scouts lost in this sector, decayed alongside `lost_units`.
    pub lost_scouts: f32,
    /// Bumped every time this sector is evaluated as a scout destination and
    /// not picked; resets to 0 once it is picked.
    pub scout_skip_count: u32,
}

impl Sector {
    #[must_use]
    pub fn new(coord: SectorCoord, water_ratio: f32) -> Self {
        Sector {
            coord,
            water_ratio,
            is_water_sector: water_ratio > 0.8,
            metal_spot_indices: Vec::new(),
            occupied_metal_spots: 0,
            combat_power: LocalCombatPower::default(),
            attacked_by_rates: [[0.0; 5]; GamePhase::COUNT],
            lost_units: 0.0,
            importance: 1.0,
            is_part_of_base: false,
            distance_to_base: u32::MAX,
            enemies_scouted_frame: 0,
            enemy_buildings: 0,
            edge_distance: 0,
            lost_scouts: 0.0,
            scout_skip_count: 0,
        }
    }

    /// Clear this tick's transient combat-power accumulators (spec §4.C
    /// `reset_local_combat_power`). Learned fields (importance,
    /// attacked_by_rates) survive.
    pub fn reset_local_combat_power(&mut self) {
        self.combat_power = LocalCombatPower::default();
    }

    /// Fold in one friendly unit's combat power against `target_type`.
    pub fn add_friendly_unit_data(&mut self, target_type: TargetType, power: f32) {
        self.combat_power.friendly[target_type.index()] += power;
    }

    /// Drop this tick's scouted-enemy accumulator without touching learned
    /// state (called before a fresh enemy-sighting fold).
    pub fn reset_scouted_enemies_data(&mut self) {
        self.combat_power.enemy = [0.0; 5];
        self.combat_power.enemy_static = [0.0; 5];
        self.enemy_buildings = 0;
    }

    /// Fold in one scouted enemy unit's combat power. Static sightings also
    /// count towards `enemy_buildings`, which gates attack-rating and
    /// target-cleared checks.
    pub fn add_scouted_enemy_unit(&mut self, target_type: TargetType, power: f32, is_static: bool, frame: u32) {
        if is_static {
            self.combat_power.enemy_static[target_type.index()] += power;
            self.enemy_buildings += 1;
        } else {
            self.combat_power.enemy[target_type.index()] += power;
        }
        self.enemies_scouted_frame = frame;
    }

    pub fn register_lost_scout(&mut self) {
        self.lost_scouts += 1.0;
    }

    /// Learned loss counter decays by `decay` per call (spec §4.C), never
    /// going below zero.
    pub fn decrease_lost_units(&mut self, decay: f32) {
        self.lost_units = (self.lost_units - decay).max(0.0);
    }

    /// Record a unit lost in this sector and nudge the attacked-by table for
    /// the current phase/target type.
    pub fn register_unit_lost(&mut self, phase: GamePhase, target_type: TargetType, learn_rate: f32) {
        self.lost_units += 1.0;
        let slot = &mut self.attacked_by_rates[phase.index()][target_type.index()];
        *slot = (*slot + learn_rate).min(1000.0);
    }

    /// Register a new metal spot discovered in this sector.
    pub fn add_metal_spot(&mut self, index: usize) {
        self.metal_spot_indices.push(index);
    }

    /// Whether this sector is reachable by an attack wanting `allow_land`
    /// and/or `allow_water` mediums (spec §4.C admissibility rule).
    #[must_use]
    pub fn is_admissible_for(&self, allow_land: bool, allow_water: bool) -> bool {
        (self.water_ratio < 0.35 && allow_land) || (self.water_ratio > 0.65 && allow_water)
    }

    /// Weighted sum of enemy (mobile + static) combat power against the
    /// given target-type weights.
    #[must_use]
    fn enemy_power_vs(&self, weights: &[f32; 5]) -> f32 {
        (0..5).map(|i| self.enemy_power(TargetType::ALL[i]) * weights[i]).sum()
    }

    /// Attack rating: how attractive this sector is as an attack target
    /// (spec §4.C `get_attack_rating`). Returns 0 if unreachable by the
    /// requested mediums or if no enemy buildings have been scouted here;
    /// otherwise `lost_units_total × enemy_buildings / ((1 +
    /// enemy_combat_power_vs(my_target_types)) × (1 + distance))`, where
    /// `distance` is the euclidean distance (in sector units) from the
    /// attacking force's current sector.
    #[must_use]
    pub fn attack_rating(&self, my_target_type_weights: &[f32; 5], distance: f32, allow_land: bool, allow_water: bool) -> f32 {
        if !self.is_admissible_for(allow_land, allow_water) || self.enemy_buildings == 0 {
            return 0.0;
        }
        let enemy_power = self.enemy_power_vs(my_target_type_weights);
        (self.lost_units * self.enemy_buildings as f32) / ((1.0 + enemy_power) * (1.0 + distance.max(0.0)))
    }

    /// How important it would be to place static defence against
    /// `target_type` here (spec §4.C `get_importance_for_static_defence_vs`).
    /// `local_attacks_by`/`brain_attacks_by` are the sector-local and
    /// base-wide attacked-by rates for `(target_type, phase)`;
    /// `friendly_static_defence_power` is the combat power already sited
    /// here against `target_type`. Zero outside the base.
    #[must_use]
    pub fn importance_for_static_defence_vs(
        &self,
        target_type: TargetType,
        phase: GamePhase,
        brain_attacks_by: f32,
        friendly_static_defence_power: f32,
        closer_to_enemy_base_than_own: bool,
        cfg: &AaiConfig,
    ) -> f32 {
        if !self.is_part_of_base {
            return 0.0;
        }
        let local_attacks_by = self.attacked_by_rates[phase.index()][target_type.index()];
        let close_to_base = if self.distance_to_base <= 1 { 1.0 } else { 0.0 };
        let rating = close_to_base + (0.1 + local_attacks_by + brain_attacks_by) / (1.0 + friendly_static_defence_power);
        let mut rating = rating * (2.0 + self.edge_distance as f32) * 2.0 / (self.distance_to_base as f32 + 1.0);
        if closer_to_enemy_base_than_own {
            rating *= 2.0;
        }
        rating.min(cfg.max_sector_importance)
    }

    /// Rating as a scout's next destination (spec §4.C
    /// `get_rating_as_next_scout_destination`). Zero for base sectors,
    /// sectors with allied buildings, or when `move_type_can_reach` is
    /// false. Otherwise bumps the skip counter and returns
    /// `metal_spot_factor × distance_factor × lost_scouts_factor ×
    /// skipped_counter`.
    pub fn rating_as_next_scout_destination(
        &mut self,
        move_type_can_reach: bool,
        scout_pos: Pos3,
        sector_center: Pos3,
        has_allied_buildings: bool,
    ) -> f32 {
        if self.is_part_of_base || !move_type_can_reach || has_allied_buildings {
            return 0.0;
        }
        self.scout_skip_count += 1;
        let metal_spot_factor = 1.0 + self.metal_spot_indices.len() as f32;
        let distance_factor = 1.0 / (1.0 + scout_pos.distance_2d(sector_center));
        let lost_scouts_factor = 1.0 / (1.0 + self.lost_scouts);
        metal_spot_factor * distance_factor * lost_scouts_factor * self.scout_skip_count as f32
    }

    /// Called once this sector is actually picked as a scout destination:
    /// resets the skip counter so future ratings start from 1 again.
    pub fn scout_destination_chosen(&mut self) {
        self.scout_skip_count = 0;
    }

    /// Rating as a rally point for newly built units (spec §4.C
    /// `get_rating_for_rally_point`): combines flatness/water ratio, edge
    /// distance, nearby extractors, and prior attacks. `f32::MIN` outside
    /// the base, for an unreachable move type, or off the requested
    /// continent.
    #[must_use]
    pub fn rating_for_rally_point(&self, move_type_can_reach: bool, on_requested_continent: bool) -> f32 {
        if !self.is_part_of_base || !move_type_can_reach || !on_requested_continent {
            return f32::MIN;
        }
        let flatness = 1.0 - self.water_ratio;
        let extractor_term = self.occupied_metal_spots as f32 * 3.0;
        let total_attacks: f32 = self.attacked_by_rates.iter().flatten().sum();
        flatness * 10.0 + self.edge_distance as f32 * 0.1 + extractor_term - total_attacks * 0.5 - self.lost_units * 5.0
    }

    /// Total enemy combat power (mobile + static) against `target_type`.
    #[must_use]
    pub fn enemy_power(&self, target_type: TargetType) -> f32 {
        self.combat_power.enemy[target_type.index()] + self.combat_power.enemy_static[target_type.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sector() -> Sector {
        Sector::new(SectorCoord { x: 1, y: 2 }, 0.0)
    }

    #[test]
    fn reset_clears_transient_not_learned() {
        let mut s = sector();
        s.add_friendly_unit_data(TargetType::Surface, 10.0);
        s.importance = 5.0;
        s.reset_local_combat_power();
        assert_eq!(s.combat_power.friendly[TargetType::Surface.index()], 0.0);
        assert_eq!(s.importance, 5.0);
    }

    #[test]
    fn lost_units_decay_floors_at_zero() {
        let mut s = sector();
        s.lost_units = 1.0;
        s.decrease_lost_units(0.3);
        assert!((s.lost_units - 0.7).abs() < 1e-6);
        s.decrease_lost_units(5.0);
        assert_eq!(s.lost_units, 0.0);
    }

    #[test]
    fn attack_rating_zero_with_no_enemy() {
        let s = sector();
        let weights = [1.0; 5];
        assert_eq!(s.attack_rating(&weights, 0.0, true, true), 0.0);
    }

    #[test]
    fn attack_rating_positive_with_scouted_building_and_losses() {
        let mut s = sector();
        s.lost_units = 2.0;
        s.add_scouted_enemy_unit(TargetType::Surface, 30.0, true, 0);
        let mut weights = [0.0; 5];
        weights[TargetType::Surface.index()] = 1.0;
        assert!(s.attack_rating(&weights, 0.0, true, true) > 0.0);
        s.reset_scouted_enemies_data();
        assert_eq!(s.attack_rating(&weights, 0.0, true, true), 0.0);
    }

    #[test]
    fn attack_rating_zero_when_medium_inadmissible() {
        let mut s = sector();
        s.lost_units = 2.0;
        s.add_scouted_enemy_unit(TargetType::Surface, 30.0, true, 0);
        let mut weights = [0.0; 5];
        weights[TargetType::Surface.index()] = 1.0;
        // water_ratio is 0.0, so only land attacks are admissible here.
        assert_eq!(s.attack_rating(&weights, 0.0, false, true), 0.0);
    }

    #[test]
    fn importance_for_defence_zero_outside_base() {
        let mut s = sector();
        s.attacked_by_rates[GamePhase::Mid.index()][TargetType::Surface.index()] = 5.0;
        let cfg = AaiConfig::default();
        assert_eq!(
            s.importance_for_static_defence_vs(TargetType::Surface, GamePhase::Mid, 0.0, 0.0, false, &cfg),
            0.0
        );
        s.is_part_of_base = true;
        assert!(s.importance_for_static_defence_vs(TargetType::Surface, GamePhase::Mid, 0.0, 0.0, false, &cfg) > 0.0);
    }

    #[test]
    fn scout_destination_rating_zero_for_base_sector() {
        let mut s = sector();
        s.is_part_of_base = true;
        assert_eq!(s.rating_as_next_scout_destination(true, Pos3::default(), Pos3::default(), false), 0.0);
    }

    #[test]
    fn scout_destination_rating_grows_with_repeated_skips() {
        let mut s = sector();
        let first = s.rating_as_next_scout_destination(true, Pos3::default(), Pos3::default(), false);
        let second = s.rating_as_next_scout_destination(true, Pos3::default(), Pos3::default(), false);
        assert!(second > first);
        s.scout_destination_chosen();
        assert_eq!(s.scout_skip_count, 0);
    }

    #[test]
    fn rally_point_rating_is_min_outside_base() {
        let s = sector();
        assert_eq!(s.rating_for_rally_point(true, true), f32::MIN);
    }
}
