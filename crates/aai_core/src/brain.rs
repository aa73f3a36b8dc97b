//! Brain component (spec §4.H): base sector management, resource-urgency
//! smoothing, and the top-level category mix decisions Executor turns into
//! concrete build orders.

use crate::config::AaiConfig;
use crate::map::MapType;
use crate::sector::SectorCoord;
use crate::types::{GamePhase, UnitCategory};

const SMOOTH_SAMPLES: usize = 16;

/// Ring buffer averaging the last 16 samples of a resource stream (income,
/// usage, or storage fraction), smoothing out single-frame spikes before
/// Brain reacts to them.
#[derive(Clone, Debug)]
pub struct SmoothedData {
    samples: [f32; SMOOTH_SAMPLES],
    next: usize,
    filled: usize,
}

impl Default for SmoothedData {
    fn default() -> Self {
        SmoothedData {
            samples: [0.0; SMOOTH_SAMPLES],
            next: 0,
            filled: 0,
        }
    }
}

impl SmoothedData {
    pub fn push(&mut self, value: f32) {
        self.samples[self.next] = value;
        self.next = (self.next + 1) % SMOOTH_SAMPLES;
        self.filled = (self.filled + 1).min(SMOOTH_SAMPLES);
    }

    #[must_use]
    pub fn average(&self) -> f32 {
        if self.filled == 0 {
            return 0.0;
        }
        self.samples.iter().take(self.filled).sum::<f32>() / self.filled as f32
    }
}

/// Category-mix selection weights for a single `build_units` roll.
#[derive(Clone, Copy, Debug)]
pub struct CategoryMixWeights {
    pub aircraft: f32,
    pub high_range: f32,
    pub fast: f32,
}

/// One candidate sector for `Brain::expand_base`, already carrying the
/// terrain/distance figures the ranking formula needs.
#[derive(Clone, Copy, Debug)]
pub struct ExpansionCandidate {
    pub sector: SectorCoord,
    pub metal_spot_count: u32,
    pub normalised_distance_deviation: f32,
    pub edge_distance: u32,
    pub terrain_bias: f32,
    pub isolated_pond: bool,
}

impl ExpansionCandidate {
    #[must_use]
    pub fn rank(&self) -> f32 {
        self.metal_spot_count as f32
            + 4.0 * self.normalised_distance_deviation
            + 3.0 / (self.edge_distance as f32 + 1.0)
            + 16.0 * self.terrain_bias
    }
}

/// One candidate sector for `Brain::determine_rally_point`.
#[derive(Clone, Copy, Debug)]
pub struct RallyCandidate {
    pub sector: SectorCoord,
    pub total_attacks: f32,
    pub edge_distance: u32,
    pub extractor_count: u32,
    pub existing_rally_points: u32,
    pub terrain_for_move_type: f32,
}

impl RallyCandidate {
    #[must_use]
    pub fn rank(&self) -> f32 {
        self.total_attacks.min(5.0)
            + (2.0 * self.edge_distance as f32).min(6.0)
            + 3.0 * self.extractor_count as f32
            + 4.0 / (2.0 + self.existing_rally_points as f32)
            + 3.0 * self.terrain_for_move_type
    }
}

#[derive(Clone, Debug, Default)]
pub struct Brain {
    pub base_sectors: Vec<SectorCoord>,
    pub metal_income: SmoothedData,
    pub metal_usage: SmoothedData,
    pub energy_income: SmoothedData,
    pub energy_usage: SmoothedData,
    /// Attacked-by histogram, keyed by phase then the five target types,
    /// aggregated across the whole base (distinct from each Sector's own
    /// local table).
    pub attacked_by: [[f32; 5]; GamePhase::COUNT],
}

impl Brain {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update_resources(&mut self, metal_income: f32, metal_usage: f32, energy_income: f32, energy_usage: f32) {
        self.metal_income.push(metal_income);
        self.metal_usage.push(metal_usage);
        self.energy_income.push(energy_income);
        self.energy_usage.push(energy_usage);
    }

    /// Urgency to build more metal production (spec §4.H `get_metal_urgency`):
    /// `active_extractors > 0 → 4 / (2·avg_surplus + 0.5)`, else a flat 8 (no
    /// extractors at all is always urgent).
    #[must_use]
    pub fn metal_urgency(&self, active_extractors: u32) -> f32 {
        if active_extractors == 0 {
            return 8.0;
        }
        let surplus = self.metal_income.average() - self.metal_usage.average();
        4.0 / (2.0 * surplus + 0.5)
    }

    /// Urgency to build more energy production (spec §4.H
    /// `get_energy_urgency`): `surplus > 2000 → 0`; else `active_power_plants
    /// > 0 → 4 / (2·surplus/60 + 0.5)`, else a flat 7.
    #[must_use]
    pub fn energy_urgency(&self, active_power_plants: u32) -> f32 {
        let surplus = self.energy_income.average() - self.energy_usage.average();
        if surplus > 2000.0 {
            return 0.0;
        }
        if active_power_plants == 0 {
            return 7.0;
        }
        4.0 / (2.0 * surplus / 60.0 + 0.5)
    }

    /// Add the highest-ranked expansion candidate to the claimed base,
    /// provided the cap isn't exceeded (spec §4.H `expand_base`). Rank is
    /// `metal_spot_count + 4·normalised_distance_deviation +
    /// 3/(edge_distance+1) + 16·terrain_bias`; isolated ponds are never
    /// admissible regardless of rank.
    pub fn expand_base(&mut self, candidates: &[ExpansionCandidate], cfg: &AaiConfig) -> Option<SectorCoord> {
        if self.base_sectors.len() as u32 >= cfg.max_base_size {
            return None;
        }
        let best = candidates
            .iter()
            .filter(|c| !c.isolated_pond && !self.base_sectors.contains(&c.sector))
            .map(|c| (c.sector, c.rank()))
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))?;
        self.base_sectors.push(best.0);
        Some(best.0)
    }

    /// Pick a rally point among base sectors at distance 1 or 2 (spec §4.H
    /// `determine_rally_point`): rank each candidate by `min(total_attacks,5)
    /// + min(2·edge_distance,6) + 3·extractor_count + 4/(2+existing_rally_points)
    /// + 3·terrain_for_move_type`, take the best two, and return the best
    /// one that actually has a usable move position (falling back to the
    /// second-best when the top pick doesn't).
    #[must_use]
    pub fn determine_rally_point(&self, candidates: &[RallyCandidate], has_move_position: impl Fn(SectorCoord) -> bool) -> Option<SectorCoord> {
        let mut ranked: Vec<(SectorCoord, f32)> = candidates
            .iter()
            .filter(|c| self.base_sectors.contains(&c.sector))
            .map(|c| (c.sector, c.rank()))
            .collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        ranked
            .into_iter()
            .take(2)
            .find(|(sector, _)| has_move_position(*sector))
            .map(|(sector, _)| sector)
    }

    pub fn register_attack(&mut self, phase: GamePhase, target_type_index: usize, amount: f32) {
        self.attacked_by[phase.index()][target_type_index] += amount;
    }

    /// The category Brain wants built next, given rolled probabilities
    /// against configured rates (spec §4.H `build_units`). `roll` is a
    /// caller-supplied uniform(0,1) sample from the AI's seeded PRNG.
    #[must_use]
    pub fn pick_combat_category(&self, cfg: &AaiConfig, roll: f32, movement_roll: f32) -> UnitCategory {
        if !cfg.air_only_mod && roll < cfg.aircraft_rate {
            return UnitCategory::AirCombat;
        }
        if movement_roll < cfg.high_range_units_rate {
            return UnitCategory::MobileArtillery;
        }
        UnitCategory::GroundCombat
    }

    /// Which combat category to queue next (spec §4.H `build_units`),
    /// map-type-driven: land maps build ground combat, water maps build sea
    /// combat, land-water maps pick between the two with probability
    /// proportional to `land_ratio`. A separate air roll can override any of
    /// these, except during the starting phase when no air units are built
    /// yet. `surface_roll`/`aircraft_roll` are caller-supplied uniform(0,1)
    /// samples from the AI's seeded PRNG.
    #[must_use]
    pub fn build_units(
        &self,
        cfg: &AaiConfig,
        map_type: MapType,
        land_ratio: f32,
        phase: GamePhase,
        surface_roll: f32,
        aircraft_roll: f32,
    ) -> UnitCategory {
        if !cfg.air_only_mod && phase != GamePhase::Starting && aircraft_roll < cfg.aircraft_rate {
            return UnitCategory::AirCombat;
        }
        match map_type {
            MapType::LandMap => UnitCategory::GroundCombat,
            MapType::WaterMap => UnitCategory::SeaCombat,
            MapType::LandWaterMap => {
                if surface_roll < land_ratio {
                    UnitCategory::GroundCombat
                } else {
                    UnitCategory::SeaCombat
                }
            }
        }
    }

    /// Cost-bucket pick for a ground-combat build, given a uniform roll and
    /// the configured bucket ratios (spec §4.H assault-cost split).
    #[must_use]
    pub fn pick_assault_bucket(cfg: &AaiConfig, roll: f32) -> AssaultBucket {
        let total = cfg.light_assault_ratio + cfg.medium_assault_ratio + cfg.heavy_assault_ratio + cfg.super_heavy_assault_ratio;
        let scaled = roll * total.max(1e-6);
        let mut acc = cfg.light_assault_ratio;
        if scaled < acc {
            return AssaultBucket::Light;
        }
        acc += cfg.medium_assault_ratio;
        if scaled < acc {
            return AssaultBucket::Medium;
        }
        acc += cfg.heavy_assault_ratio;
        if scaled < acc {
            return AssaultBucket::Heavy;
        }
        AssaultBucket::SuperHeavy
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssaultBucket {
    Light,
    Medium,
    Heavy,
    SuperHeavy,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn smoothed_data_averages_recent_samples() {
        let mut s = SmoothedData::default();
        for v in [10.0, 20.0, 30.0] {
            s.push(v);
        }
        assert!((s.average() - 20.0).abs() < 1e-6);
    }

    #[test]
    fn smoothed_data_only_averages_filled_slots_then_wraps() {
        let mut s = SmoothedData::default();
        for _ in 0..SMOOTH_SAMPLES {
            s.push(10.0);
        }
        s.push(30.0);
        let avg = s.average();
        assert!(avg > 10.0 && avg < 30.0);
    }

    #[test]
    fn metal_urgency_is_flat_high_with_no_active_extractors() {
        let mut b = Brain::new();
        b.update_resources(10.0, 5.0, 50.0, 40.0);
        assert_eq!(b.metal_urgency(0), 8.0);
    }

    #[test]
    fn metal_urgency_falls_as_surplus_grows_once_extractors_are_active() {
        let mut low_surplus = Brain::new();
        low_surplus.update_resources(6.0, 5.0, 50.0, 40.0);
        let mut high_surplus = Brain::new();
        high_surplus.update_resources(20.0, 5.0, 50.0, 40.0);
        assert!(low_surplus.metal_urgency(1) > high_surplus.metal_urgency(1));
    }

    #[test]
    fn energy_urgency_is_zero_once_surplus_passes_the_glut_threshold() {
        let mut b = Brain::new();
        b.update_resources(10.0, 5.0, 3000.0, 5.0);
        assert_eq!(b.energy_urgency(1), 0.0);
    }

    #[test]
    fn energy_urgency_is_flat_high_with_no_active_plants() {
        let mut b = Brain::new();
        b.update_resources(10.0, 5.0, 50.0, 40.0);
        assert_eq!(b.energy_urgency(0), 7.0);
    }

    #[test]
    fn expand_base_respects_cap() {
        let mut b = Brain::new();
        let cfg = AaiConfig {
            max_base_size: 1,
            ..AaiConfig::default()
        };
        let candidates = [
            ExpansionCandidate {
                sector: SectorCoord { x: 0, y: 0 },
                metal_spot_count: 2,
                normalised_distance_deviation: 0.0,
                edge_distance: 1,
                terrain_bias: 0.0,
                isolated_pond: false,
            },
            ExpansionCandidate {
                sector: SectorCoord { x: 1, y: 0 },
                metal_spot_count: 1,
                normalised_distance_deviation: 0.0,
                edge_distance: 1,
                terrain_bias: 0.0,
                isolated_pond: false,
            },
        ];
        assert_eq!(b.expand_base(&candidates, &cfg), Some(SectorCoord { x: 0, y: 0 }));
        assert_eq!(b.expand_base(&candidates, &cfg), None);
    }

    #[test]
    fn expand_base_skips_isolated_ponds() {
        let mut b = Brain::new();
        let cfg = AaiConfig::default();
        let candidates = [ExpansionCandidate {
            sector: SectorCoord { x: 0, y: 0 },
            metal_spot_count: 10,
            normalised_distance_deviation: 0.0,
            edge_distance: 1,
            terrain_bias: 0.0,
            isolated_pond: true,
        }];
        assert_eq!(b.expand_base(&candidates, &cfg), None);
    }

    #[test]
    fn determine_rally_point_falls_back_to_second_best_when_first_has_no_move_position() {
        let mut b = Brain::new();
        let a = SectorCoord { x: 0, y: 0 };
        let c = SectorCoord { x: 1, y: 0 };
        b.base_sectors.push(a);
        b.base_sectors.push(c);
        let candidates = [
            RallyCandidate {
                sector: a,
                total_attacks: 5.0,
                edge_distance: 3,
                extractor_count: 2,
                existing_rally_points: 0,
                terrain_for_move_type: 1.0,
            },
            RallyCandidate {
                sector: c,
                total_attacks: 0.0,
                edge_distance: 0,
                extractor_count: 0,
                existing_rally_points: 0,
                terrain_for_move_type: 0.0,
            },
        ];
        let rally = b.determine_rally_point(&candidates, |s| s != a);
        assert_eq!(rally, Some(c));
    }

    #[test]
    fn build_units_picks_ground_combat_on_a_land_map_outside_the_aircraft_roll() {
        let b = Brain::new();
        let cfg = AaiConfig::default();
        let category = b.build_units(&cfg, MapType::LandMap, 1.0, GamePhase::Mid, 0.5, 0.99);
        assert_eq!(category, UnitCategory::GroundCombat);
    }

    #[test]
    fn build_units_never_picks_air_during_the_starting_phase() {
        let b = Brain::new();
        let cfg = AaiConfig::default();
        let category = b.build_units(&cfg, MapType::LandMap, 1.0, GamePhase::Starting, 0.5, 0.0);
        assert_eq!(category, UnitCategory::GroundCombat);
    }

    #[test]
    fn assault_bucket_picks_light_for_low_roll() {
        let cfg = AaiConfig::default();
        assert_eq!(Brain::pick_assault_bucket(&cfg, 0.0), AssaultBucket::Light);
    }

    proptest::proptest! {
        /// I10: once the window is full of one value, replacing the oldest
        /// sample with a new one shifts the average by exactly
        /// `(new - old) / 16`.
        #[test]
        fn prop_smoothed_data_shift_on_replace(v in -1000.0f32..1000.0, v_prime in -1000.0f32..1000.0) {
            let mut s = SmoothedData::default();
            for _ in 0..SMOOTH_SAMPLES {
                s.push(v);
            }
            proptest::prop_assert!((s.average() - v).abs() < 1e-3);
            s.push(v_prime);
            let expected = v + (v_prime - v) / SMOOTH_SAMPLES as f32;
            proptest::prop_assert!((s.average() - expected).abs() < 1e-2);
        }
    }
}
