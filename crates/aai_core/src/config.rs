//! Per-mod tuning, loaded from a strict `key = value` text format.
//!
//! Unlike the teacher's data tables (RON-deserialized `FactionData` etc.)
//! this config mirrors the source engine's own `.cfg` convention: flat
//! `KEY = value` lines, `//` comments, one array-of-strings syntax for
//! `SIDE_NAMES`/`START_UNITS`/lists. Unknown keywords are a hard
//! [`AaiError::Config`] per spec §6/§7 — the rest of a well-formed file is
//! never partially accepted around a typo.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{AaiError, AaiResult};

/// Full per-mod configuration. Every key from spec §6 is represented; all
/// are optional except [`AaiConfig::sides`] and [`AaiConfig::start_units`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AaiConfig {
    /// Number of playable sides in the mod.
    pub sides: u32,
    /// Human-readable side names, length `sides` (falls back to numbering).
    pub side_names: Vec<String>,
    /// Starting unit (commander) names, one root unit per side.
    pub start_units: Vec<String>,
    /// Names the build tree should classify as [`crate::types::UnitCategory::Scout`].
    pub scouts: Vec<String>,
    /// Names the build tree should classify as [`crate::types::UnitCategory::Transport`].
    pub transporters: Vec<String>,
    /// Names the build tree should classify as [`crate::types::UnitCategory::MetalMaker`].
    pub metal_makers: Vec<String>,
    /// Unit names the AI must never queue.
    pub dont_build: Vec<String>,

    /// Minimum energy production/upkeep magnitude to count as a power plant.
    pub min_energy: f32,
    /// Hard cap on total unit count the AI will try to maintain.
    pub max_units: u32,
    /// Hard cap on concurrent scouts.
    pub max_scouts: u32,
    /// Clamp applied to any sector's learned importance value.
    pub max_sector_importance: f32,
    /// Longest run of occupied tiles allowed on the X axis before inserting
    /// a blocked corridor.
    pub max_xrow: u32,
    /// Longest run of occupied tiles allowed on the Z axis.
    pub max_yrow: u32,
    /// Width (in tiles) of an anti-crowding corridor on the X axis.
    pub x_space: u32,
    /// Width (in tiles) of an anti-crowding corridor on the Z axis.
    pub y_space: u32,

    /// Max size of a homogeneous ground/generic combat group.
    pub max_group_size: u32,
    /// Max size of an air combat group.
    pub max_air_group_size: u32,
    /// Max size of a pure anti-air group.
    pub max_anti_air_group_size: u32,
    /// Max size of a submarine group.
    pub max_submarine_group_size: u32,
    /// Max size of a naval group.
    pub max_naval_group_size: u32,
    /// Max size of an artillery group.
    pub max_arty_group_size: u32,

    /// Cap on total concurrent builders.
    pub max_builders: u32,
    /// Cap on builders of a single type.
    pub max_builders_per_type: u32,
    /// Cap on factories of a single type.
    pub max_factories_per_type: u32,
    /// Cap on entries in a single factory's build queue.
    pub max_buildqueue_size: u32,
    /// Cap on assistants attached to a single construction.
    pub max_assistants: u32,
    /// Minimum remaining buildtime (frames) before assistance is requested.
    pub min_assistance_buildtime: f32,
    /// Minimum buildspeed an assistant must add to be worth enlisting.
    pub min_assistance_buildspeed: f32,

    /// Max number of sectors the base may claim.
    pub max_base_size: u32,
    /// Speed threshold (world units/frame) above which a non-flying mobile
    /// unit is classified as a scout absent explicit config naming.
    pub scout_speed: f32,
    /// Weapon range above which a ground unit counts as mobile artillery.
    pub ground_arty_range: f32,
    /// Weapon range above which a sea unit counts as mobile artillery.
    pub sea_arty_range: f32,
    /// Weapon range above which a hover unit counts as mobile artillery.
    pub hover_arty_range: f32,
    /// Weapon range below which a static weapon counts as defence rather
    /// than artillery.
    pub stationary_arty_range: f32,
    /// Weight given to anti-air coverage in defence siting.
    pub air_defence: f32,

    /// Minimum unused energy-storage capacity below which storage urgency
    /// can trigger.
    pub min_energy_storage: f32,
    /// Minimum unused metal-storage capacity below which storage urgency
    /// can trigger.
    pub min_metal_storage: f32,
    /// Minimum cost for an air unit to be worth building purely for attack.
    pub min_air_attack_cost: f32,
    /// Cap on tracked air-raid targets.
    pub max_air_targets: u32,
    /// Probability-per-roll (0..1) of picking an air unit in Brain's
    /// category mix.
    pub aircraft_rate: f32,
    /// Probability-per-roll of picking a long-range unit.
    pub high_range_units_rate: f32,
    /// Probability-per-roll of picking a fast unit.
    pub fast_units_rate: f32,
    /// Conversion ratio between metal and energy cost (see
    /// [`crate::build_tree::UnitTypeProperties::total_cost`]).
    pub metal_energy_ratio: f32,

    /// Cap on static defences per sector.
    pub max_defences: u32,
    /// Minimum sector threat value worth reacting to.
    pub min_sector_threat: f32,
    /// Cap on stationary artillery count.
    pub max_stat_arty: u32,
    /// Cap on storage building count.
    pub max_storage: u32,
    /// Cap on air-base count.
    pub max_air_base: u32,
    /// When true, ground/sea combat branches are disabled entirely.
    pub air_only_mod: bool,
    /// Cap on metal-maker count.
    pub max_metal_makers: u32,
    /// Minimum energy surplus required to keep a metal-maker toggled on.
    pub min_metal_maker_energy: f32,
    /// Max sector-distance to search for a metal-spot extractor site.
    pub max_mex_distance: u32,
    /// Max sector-distance to consider defending an extractor.
    pub max_mex_defence_distance: u32,
    /// Minimum factory count before static defences are queued at all.
    pub min_factories_for_defences: u32,
    /// Minimum factory count before storage is queued.
    pub min_factories_for_storage: u32,
    /// Minimum factory count before radar/jammer buildings are queued.
    pub min_factories_for_radar_jammer: u32,
    /// Minimum cost-efficiency ratio to justify scrambling air support.
    pub min_air_support_efficiency: f32,
    /// Minimum waterline depth for submarine placement.
    pub min_submarine_waterline: f32,
    /// Minimum metal surplus (income minus usage) below which construction
    /// assistance is withheld so assist builders don't starve economy units.
    pub min_metal_surplus_for_construction_assist: f32,

    /// Cap on simultaneously active attacks.
    pub max_attacks: u32,
    /// Multiplier applied to an attack's own power before comparing it to
    /// the defender's static defence when checking for failure (spec §4.L).
    /// Above 1 the AI presses attacks it is only narrowly winning; below 1
    /// it retreats earlier.
    pub aggressiveness: f32,
    /// Max water depth a non-amphibious land unit may wade through when
    /// computing continent connectivity.
    pub non_amphib_max_waterdepth: f32,

    /// Cost ceiling for the "light" assault-unit cost bucket.
    pub max_cost_light_assault: f32,
    /// Cost ceiling for the "medium" assault-unit cost bucket.
    pub max_cost_medium_assault: f32,
    /// Cost ceiling for the "heavy" assault-unit cost bucket.
    pub max_cost_heavy_assault: f32,
    /// Selection weight for light assault units.
    pub light_assault_ratio: f32,
    /// Selection weight for medium assault units.
    pub medium_assault_ratio: f32,
    /// Selection weight for heavy assault units.
    pub heavy_assault_ratio: f32,
    /// Selection weight for super-heavy assault units.
    pub super_heavy_assault_ratio: f32,
    /// Minimum turn rate for the "fall back and kite" damage response.
    pub min_fallback_turnrate: f32,

    /// Learning rate applied to combat-power adjustments after combat.
    pub learn_rate: f32,
    /// Frames after which an unfinished construction with no progress is
    /// considered timed out.
    pub construction_timeout: u32,
    /// Slope threshold (height delta per 4 tiles) above which a tile is
    /// cliff rather than flat.
    pub cliff_slope: f32,
    /// Water-ratio threshold for classifying a map as a water map.
    pub water_map_ratio: f32,
    /// Water-ratio threshold for classifying a map as a land-water map.
    pub land_water_map_ratio: f32,
}

impl Default for AaiConfig {
    fn default() -> Self {
        Self {
            sides: 2,
            side_names: vec!["Side1".into(), "Side2".into()],
            start_units: Vec::new(),
            scouts: Vec::new(),
            transporters: Vec::new(),
            metal_makers: Vec::new(),
            dont_build: Vec::new(),

            min_energy: 20.0,
            max_units: 1500,
            max_scouts: 6,
            max_sector_importance: 10.0,
            max_xrow: 4,
            max_yrow: 4,
            x_space: 2,
            y_space: 2,

            max_group_size: 8,
            max_air_group_size: 6,
            max_anti_air_group_size: 4,
            max_submarine_group_size: 4,
            max_naval_group_size: 6,
            max_arty_group_size: 4,

            max_builders: 30,
            max_builders_per_type: 8,
            max_factories_per_type: 2,
            max_buildqueue_size: 10,
            max_assistants: 6,
            min_assistance_buildtime: 300.0,
            min_assistance_buildspeed: 50.0,

            max_base_size: 20,
            scout_speed: 90.0,
            ground_arty_range: 700.0,
            sea_arty_range: 800.0,
            hover_arty_range: 700.0,
            stationary_arty_range: 700.0,
            air_defence: 1.0,

            min_energy_storage: 1000.0,
            min_metal_storage: 500.0,
            min_air_attack_cost: 100.0,
            max_air_targets: 10,
            aircraft_rate: 0.2,
            high_range_units_rate: 0.2,
            fast_units_rate: 0.2,
            metal_energy_ratio: 60.0,

            max_defences: 6,
            min_sector_threat: 0.1,
            max_stat_arty: 4,
            max_storage: 3,
            max_air_base: 2,
            air_only_mod: false,
            max_metal_makers: 6,
            min_metal_maker_energy: 300.0,
            max_mex_distance: 4,
            max_mex_defence_distance: 2,
            min_factories_for_defences: 1,
            min_factories_for_storage: 1,
            min_factories_for_radar_jammer: 1,
            min_air_support_efficiency: 0.5,
            min_submarine_waterline: 20.0,
            min_metal_surplus_for_construction_assist: -5.0,

            max_attacks: 3,
            aggressiveness: 1.0,
            non_amphib_max_waterdepth: 20.0,

            max_cost_light_assault: 200.0,
            max_cost_medium_assault: 600.0,
            max_cost_heavy_assault: 1500.0,
            light_assault_ratio: 0.4,
            medium_assault_ratio: 0.3,
            heavy_assault_ratio: 0.2,
            super_heavy_assault_ratio: 0.1,
            min_fallback_turnrate: 0.2,

            learn_rate: 0.1,
            construction_timeout: 36000,
            cliff_slope: 40.0,
            water_map_ratio: 0.8,
            land_water_map_ratio: 0.25,
        }
    }
}

macro_rules! set_field { ($cfg:expr, $field:ident, $v:expr) => { $cfg.$field = $v; } }

impl AaiConfig {
    /// Parse from the strict `KEY = value` text format described in spec §6.
    /// Unknown keys are a hard error; comments start with `//` or `#`.
    pub fn parse(text: &str) -> AaiResult<Self> {
        let mut cfg = AaiConfig::default();
        for (lineno, raw_line) in text.lines().enumerate() {
            let line = strip_comment(raw_line).trim();
            if line.is_empty() {
                continue;
            }
            let (key, value) = line.split_once('=').ok_or_else(|| {
                AaiError::Config(format!("line {}: missing '='", lineno + 1))
            })?;
            let key = key.trim().to_ascii_uppercase();
            let value = value.trim();
            apply_key(&mut cfg, &key, value)?;
        }
        if cfg.start_units.is_empty() {
            return Err(AaiError::Config("START_UNITS is mandatory".into()));
        }
        Ok(cfg)
    }
}

fn strip_comment(line: &str) -> &str {
    if let Some(idx) = line.find("//") {
        &line[..idx]
    } else if let Some(idx) = line.find('#') {
        &line[..idx]
    } else {
        line
    }
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_f32(key: &str, value: &str) -> AaiResult<f32> {
    value
        .parse::<f32>()
        .map_err(|_| AaiError::Config(format!("{key}: expected a number, got '{value}'")))
}

fn parse_u32(key: &str, value: &str) -> AaiResult<u32> {
    value
        .parse::<u32>()
        .map_err(|_| AaiError::Config(format!("{key}: expected an integer, got '{value}'")))
}

fn parse_bool(key: &str, value: &str) -> AaiResult<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        _ => Err(AaiError::Config(format!("{key}: expected a boolean, got '{value}'"))),
    }
}

#[allow(clippy::too_many_lines)]
fn apply_key(cfg: &mut AaiConfig, key: &str, value: &str) -> AaiResult<()> {
    match key {
        "SIDES" => cfg.sides = parse_u32(key, value)?,
        "SIDE_NAMES" => cfg.side_names = parse_list(value),
        "START_UNITS" => cfg.start_units = parse_list(value),
        "SCOUTS" => cfg.scouts = parse_list(value),
        "TRANSPORTERS" => cfg.transporters = parse_list(value),
        "METAL_MAKERS" => cfg.metal_makers = parse_list(value),
        "DONT_BUILD" => cfg.dont_build = parse_list(value),

        "MIN_ENERGY" => set_field!(cfg, min_energy, parse_f32(key, value)?),
        "MAX_UNITS" => set_field!(cfg, max_units, parse_u32(key, value)?),
        "MAX_SCOUTS" => set_field!(cfg, max_scouts, parse_u32(key, value)?),
        "MAX_SECTOR_IMPORTANCE" => set_field!(cfg, max_sector_importance, parse_f32(key, value)?),
        "MAX_XROW" => set_field!(cfg, max_xrow, parse_u32(key, value)?),
        "MAX_YROW" => set_field!(cfg, max_yrow, parse_u32(key, value)?),
        "X_SPACE" => set_field!(cfg, x_space, parse_u32(key, value)?),
        "Y_SPACE" => set_field!(cfg, y_space, parse_u32(key, value)?),

        "MAX_GROUP_SIZE" => set_field!(cfg, max_group_size, parse_u32(key, value)?),
        "MAX_AIR_GROUP_SIZE" => set_field!(cfg, max_air_group_size, parse_u32(key, value)?),
        "MAX_ANTI_AIR_GROUP_SIZE" => set_field!(cfg, max_anti_air_group_size, parse_u32(key, value)?),
        "MAX_SUBMARINE_GROUP_SIZE" => set_field!(cfg, max_submarine_group_size, parse_u32(key, value)?),
        "MAX_NAVAL_GROUP_SIZE" => set_field!(cfg, max_naval_group_size, parse_u32(key, value)?),
        "MAX_ARTY_GROUP_SIZE" => set_field!(cfg, max_arty_group_size, parse_u32(key, value)?),

        "MAX_BUILDERS" => set_field!(cfg, max_builders, parse_u32(key, value)?),
        "MAX_BUILDERS_PER_TYPE" => set_field!(cfg, max_builders_per_type, parse_u32(key, value)?),
        "MAX_FACTORIES_PER_TYPE" => set_field!(cfg, max_factories_per_type, parse_u32(key, value)?),
        "MAX_BUILDQUE_SIZE" => set_field!(cfg, max_buildqueue_size, parse_u32(key, value)?),
        "MAX_ASSISTANTS" => set_field!(cfg, max_assistants, parse_u32(key, value)?),
        "MIN_ASSISTANCE_BUILDTIME" => set_field!(cfg, min_assistance_buildtime, parse_f32(key, value)?),
        "MIN_ASSISTANCE_BUILDSPEED" => set_field!(cfg, min_assistance_buildspeed, parse_f32(key, value)?),

        "MAX_BASE_SIZE" => set_field!(cfg, max_base_size, parse_u32(key, value)?),
        "SCOUT_SPEED" => set_field!(cfg, scout_speed, parse_f32(key, value)?),
        "GROUND_ARTY_RANGE" => set_field!(cfg, ground_arty_range, parse_f32(key, value)?),
        "SEA_ARTY_RANGE" => set_field!(cfg, sea_arty_range, parse_f32(key, value)?),
        "HOVER_ARTY_RANGE" => set_field!(cfg, hover_arty_range, parse_f32(key, value)?),
        "STATIONARY_ARTY_RANGE" => set_field!(cfg, stationary_arty_range, parse_f32(key, value)?),
        "AIR_DEFENCE" => set_field!(cfg, air_defence, parse_f32(key, value)?),

        "MIN_ENERGY_STORAGE" => set_field!(cfg, min_energy_storage, parse_f32(key, value)?),
        "MIN_METAL_STORAGE" => set_field!(cfg, min_metal_storage, parse_f32(key, value)?),
        "MIN_AIR_ATTACK_COST" => set_field!(cfg, min_air_attack_cost, parse_f32(key, value)?),
        "MAX_AIR_TARGETS" => set_field!(cfg, max_air_targets, parse_u32(key, value)?),
        "AIRCRAFT_RATE" => set_field!(cfg, aircraft_rate, parse_f32(key, value)?),
        "HIGH_RANGE_UNITS_RATE" => set_field!(cfg, high_range_units_rate, parse_f32(key, value)?),
        "FAST_UNITS_RATE" => set_field!(cfg, fast_units_rate, parse_f32(key, value)?),
        "METAL_ENERGY_RATIO" => set_field!(cfg, metal_energy_ratio, parse_f32(key, value)?),

        "MAX_DEFENCES" => set_field!(cfg, max_defences, parse_u32(key, value)?),
        "MIN_SECTOR_THREAT" => set_field!(cfg, min_sector_threat, parse_f32(key, value)?),
        "MAX_STAT_ARTY" => set_field!(cfg, max_stat_arty, parse_u32(key, value)?),
        "MAX_STORAGE" => set_field!(cfg, max_storage, parse_u32(key, value)?),
        "MAX_AIR_BASE" => set_field!(cfg, max_air_base, parse_u32(key, value)?),
        "AIR_ONLY_MOD" => set_field!(cfg, air_only_mod, parse_bool(key, value)?),
        "MAX_METAL_MAKERS" => set_field!(cfg, max_metal_makers, parse_u32(key, value)?),
        "MIN_METAL_MAKER_ENERGY" => set_field!(cfg, min_metal_maker_energy, parse_f32(key, value)?),
        "MAX_MEX_DISTANCE" => set_field!(cfg, max_mex_distance, parse_u32(key, value)?),
        "MAX_MEX_DEFENCE_DISTANCE" => set_field!(cfg, max_mex_defence_distance, parse_u32(key, value)?),
        "MIN_FACTORIES_FOR_DEFENCES" => set_field!(cfg, min_factories_for_defences, parse_u32(key, value)?),
        "MIN_FACTORIES_FOR_STORAGE" => set_field!(cfg, min_factories_for_storage, parse_u32(key, value)?),
        "MIN_FACTORIES_FOR_RADAR_JAMMER" => {
            set_field!(cfg, min_factories_for_radar_jammer, parse_u32(key, value)?);
        }
        "MIN_AIR_SUPPORT_EFFICIENCY" => set_field!(cfg, min_air_support_efficiency, parse_f32(key, value)?),
        "MIN_SUBMARINE_WATERLINE" => set_field!(cfg, min_submarine_waterline, parse_f32(key, value)?),
        "MIN_METAL_SURPLUS_FOR_CONSTRUCTION_ASSIST" => {
            set_field!(cfg, min_metal_surplus_for_construction_assist, parse_f32(key, value)?);
        }

        "MAX_ATTACKS" => set_field!(cfg, max_attacks, parse_u32(key, value)?),
        "AGGRESSIVENESS" => set_field!(cfg, aggressiveness, parse_f32(key, value)?),
        "NON_AMPHIB_MAX_WATERDEPTH" => set_field!(cfg, non_amphib_max_waterdepth, parse_f32(key, value)?),

        "MAX_COST_LIGHT_ASSAULT" => set_field!(cfg, max_cost_light_assault, parse_f32(key, value)?),
        "MAX_COST_MEDIUM_ASSAULT" => set_field!(cfg, max_cost_medium_assault, parse_f32(key, value)?),
        "MAX_COST_HEAVY_ASSAULT" => set_field!(cfg, max_cost_heavy_assault, parse_f32(key, value)?),
        "LIGHT_ASSAULT_RATIO" => set_field!(cfg, light_assault_ratio, parse_f32(key, value)?),
        "MEDIUM_ASSAULT_RATIO" => set_field!(cfg, medium_assault_ratio, parse_f32(key, value)?),
        "HEAVY_ASSAULT_RATIO" => set_field!(cfg, heavy_assault_ratio, parse_f32(key, value)?),
        "SUPER_HEAVY_ASSAULT_RATIO" => set_field!(cfg, super_heavy_assault_ratio, parse_f32(key, value)?),
        "MIN_FALLBACK_TURNRATE" => set_field!(cfg, min_fallback_turnrate, parse_f32(key, value)?),

        "LEARN_RATE" => set_field!(cfg, learn_rate, parse_f32(key, value)?),
        "CONSTRUCTION_TIMEOUT" => set_field!(cfg, construction_timeout, parse_u32(key, value)?),
        "CLIFF_SLOPE" => set_field!(cfg, cliff_slope, parse_f32(key, value)?),
        "WATER_MAP_RATIO" => set_field!(cfg, water_map_ratio, parse_f32(key, value)?),
        "LAND_WATER_MAP_RATIO" => set_field!(cfg, land_water_map_ratio, parse_f32(key, value)?),

        other => return Err(AaiError::Config(format!("unknown keyword '{other}'"))),
    }
    Ok(())
}

/// Resolve a unit name through a config-provided name list, warning (not
/// erroring) on unknown names per spec §7 ("unknown unit names are merely
/// warned about and dropped").
#[must_use]
pub fn resolve_known_names(names: &[String], catalog: &HashMap<String, crate::types::UnitDefId>) -> Vec<crate::types::UnitDefId> {
    let mut out = Vec::with_capacity(names.len());
    for name in names {
        match catalog.get(name) {
            Some(&id) => out.push(id),
            None => tracing::warn!(unit = %name, "config referenced unknown unit name, dropping"),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_config() {
        let text = "SIDES = 2\nSTART_UNITS = armcom, corcom\n// comment\nMAX_UNITS = 500\n";
        let cfg = AaiConfig::parse(text).unwrap();
        assert_eq!(cfg.sides, 2);
        assert_eq!(cfg.start_units, vec!["armcom", "corcom"]);
        assert_eq!(cfg.max_units, 500);
    }

    #[test]
    fn rejects_unknown_key() {
        let text = "START_UNITS = armcom\nBOGUS_KEY = 1\n";
        let err = AaiConfig::parse(text).unwrap_err();
        assert!(matches!(err, AaiError::Config(_)));
    }

    #[test]
    fn requires_start_units() {
        let err = AaiConfig::parse("SIDES = 2\n").unwrap_err();
        assert!(matches!(err, AaiError::Config(_)));
    }
}
