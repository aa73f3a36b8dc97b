//! Core identifiers and closed classification types shared across every
//! component: unit/def identity, categories, movement & target types, and
//! the bitset of capability flags attached to a unit definition.

use serde::{Deserialize, Serialize};

/// Identifier for a unit *definition* (unit type), as advertised by the host
/// engine's catalog. `0` is reserved as the "invalid" sentinel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitDefId(pub u32);

impl UnitDefId {
    /// Sentinel value for "no def".
    pub const INVALID: Self = Self(0);

    /// True if this is not the invalid sentinel.
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }
}

/// Identifier for a live unit instance. Bound to exactly one [`UnitDefId`]
/// for its entire life.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitId(pub i32);

impl UnitId {
    /// Sentinel for "no unit" / free table slot.
    pub const INVALID: Self = Self(-1);

    /// True if this is not the invalid sentinel.
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 >= 0
    }
}

/// 2D world position (engine coordinates are world-unit floats; we keep `y`
/// as the elevation axis and `x`/`z` as the ground plane to match the
/// engine's `vec3` convention named in spec §6).
#[derive(Clone, Copy, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct Pos3 {
    /// Ground-plane X.
    pub x: f32,
    /// Elevation.
    pub y: f32,
    /// Ground-plane Z.
    pub z: f32,
}

impl Pos3 {
    /// Construct a position.
    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Squared ground-plane distance (ignores elevation), useful for cheap
    /// comparisons.
    #[must_use]
    pub fn distance_sq_2d(self, other: Self) -> f32 {
        let dx = self.x - other.x;
        let dz = self.z - other.z;
        dx * dx + dz * dz
    }

    /// Ground-plane Euclidean distance.
    #[must_use]
    pub fn distance_2d(self, other: Self) -> f32 {
        self.distance_sq_2d(other).sqrt()
    }
}

/// Coarse categorisation of every unit definition. Exactly one per unit def
/// (except `Unknown`, the default/unclassifiable bucket).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnitCategory {
    /// Unclassified / no definition matched.
    Unknown,
    /// Static anti-surface/anti-air defence.
    StaticDefence,
    /// Static long-range artillery.
    StaticArtillery,
    /// Storage building (metal/energy capacity).
    Storage,
    /// Static building that can construct other buildings/units.
    StaticConstructor,
    /// Static support building (nano turret, nuke/shield, jammer carrier).
    StaticSupport,
    /// Static sensor (radar/sonar/seismic).
    StaticSensor,
    /// Power-generating building.
    PowerPlant,
    /// Metal-extracting building.
    MetalExtractor,
    /// Metal-maker (converts energy to metal).
    MetalMaker,
    /// The player's commander unit.
    Commander,
    /// Mobile ground combat unit.
    GroundCombat,
    /// Mobile air combat unit.
    AirCombat,
    /// Mobile hovercraft combat unit.
    HoverCombat,
    /// Mobile surface-naval combat unit.
    SeaCombat,
    /// Mobile submarine combat unit.
    SubmarineCombat,
    /// Mobile long-range artillery.
    MobileArtillery,
    /// Scout unit.
    Scout,
    /// Transport unit.
    Transport,
    /// Mobile constructor (builder).
    MobileConstructor,
    /// Mobile support unit (sensor/jammer/stockpile carrier).
    MobileSupport,
}

impl Default for UnitCategory {
    fn default() -> Self {
        UnitCategory::Unknown
    }
}

impl UnitCategory {
    /// All categories considered "combat" for combat-power bookkeeping and
    /// group formation purposes (includes static defence).
    #[must_use]
    pub const fn is_combat(self) -> bool {
        matches!(
            self,
            UnitCategory::StaticDefence
                | UnitCategory::StaticArtillery
                | UnitCategory::GroundCombat
                | UnitCategory::AirCombat
                | UnitCategory::HoverCombat
                | UnitCategory::SeaCombat
                | UnitCategory::SubmarineCombat
                | UnitCategory::MobileArtillery
        )
    }

    /// True for any category that can hold a build queue / construct units.
    #[must_use]
    pub const fn is_constructor(self) -> bool {
        matches!(
            self,
            UnitCategory::StaticConstructor | UnitCategory::MobileConstructor
        )
    }

    /// True for categories that are placed buildings rather than mobile
    /// units.
    #[must_use]
    pub const fn is_static(self) -> bool {
        matches!(
            self,
            UnitCategory::StaticDefence
                | UnitCategory::StaticArtillery
                | UnitCategory::Storage
                | UnitCategory::StaticConstructor
                | UnitCategory::StaticSupport
                | UnitCategory::StaticSensor
                | UnitCategory::PowerPlant
                | UnitCategory::MetalExtractor
                | UnitCategory::MetalMaker
        )
    }
}

/// Bitmask of capability flags attached to a unit definition. Hand-rolled
/// rather than pulled from a crate so the flags stay as cheap `u32` copies,
/// matching how the teacher's own `UnitRole` classification bitset works.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct UnitType(u32);

impl UnitType {
    /// Is a placed building.
    pub const BUILDING: Self = Self(1 << 0);
    /// Is a mobile unit.
    pub const MOBILE_UNIT: Self = Self(1 << 1);
    /// Can engage surface targets.
    pub const ANTI_SURFACE: Self = Self(1 << 2);
    /// Can engage air targets.
    pub const ANTI_AIR: Self = Self(1 << 3);
    /// Can engage ships.
    pub const ANTI_SHIP: Self = Self(1 << 4);
    /// Can engage submerged targets.
    pub const ANTI_SUBMERGED: Self = Self(1 << 5);
    /// Can engage static targets.
    pub const ANTI_STATIC: Self = Self(1 << 6);
    /// Carries radar.
    pub const RADAR: Self = Self(1 << 7);
    /// Carries sonar.
    pub const SONAR: Self = Self(1 << 8);
    /// Carries a seismic sensor.
    pub const SEISMIC: Self = Self(1 << 9);
    /// Carries a radar jammer.
    pub const RADAR_JAMMER: Self = Self(1 << 10);
    /// Carries a sonar jammer.
    pub const SONAR_JAMMER: Self = Self(1 << 11);
    /// Can build other units/buildings.
    pub const BUILDER: Self = Self(1 << 12);
    /// Can build and holds a factory-style queue.
    pub const FACTORY: Self = Self(1 << 13);
    /// Can assist ongoing construction without being its owner.
    pub const CONSTRUCTION_ASSIST: Self = Self(1 << 14);

    /// Empty flag set.
    #[must_use]
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Union of two flag sets.
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Set flags from `other` into `self`.
    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    /// True if every bit in `other` is set in `self`.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    /// True if any bit in `other` is set in `self`.
    #[must_use]
    pub const fn intersects(self, other: Self) -> bool {
        (self.0 & other.0) != 0
    }
}

/// The medium a unit travels through, derived once at build-tree generation
/// time from the unit def's travel family + water-depth thresholds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MovementType {
    /// Wheeled/tracked/legged ground unit.
    Ground,
    /// Can cross from land into shallow/deep water.
    Amphibious,
    /// Hovercraft (crosses land and water equally).
    Hover,
    /// Surface-naval vessel.
    SeaFloater,
    /// Submarine.
    SeaSubmerged,
    /// Aircraft.
    Air,
    /// Building placed on land.
    StaticLand,
    /// Building placed on water's surface.
    StaticSeaFloater,
    /// Building placed underwater.
    StaticSeaSubmerged,
}

impl MovementType {
    /// True for the three `Static*` variants (buildings).
    #[must_use]
    pub const fn is_static(self) -> bool {
        matches!(
            self,
            MovementType::StaticLand | MovementType::StaticSeaFloater | MovementType::StaticSeaSubmerged
        )
    }

    /// True if a unit of this movement type is constrained to a single
    /// continent id (ground/hover/amphibious/sea units; air and statics are
    /// not continent-bound in the same sense — air ignores continents
    /// entirely, statics never move).
    #[must_use]
    pub const fn is_continent_bound(self) -> bool {
        matches!(
            self,
            MovementType::Ground
                | MovementType::Amphibious
                | MovementType::Hover
                | MovementType::SeaFloater
                | MovementType::SeaSubmerged
        )
    }

    /// Derive the dispatch classifier a weapon uses against this movement
    /// type (spec §3 TargetType derivation rule).
    #[must_use]
    pub const fn target_type(self) -> TargetType {
        match self {
            MovementType::Ground | MovementType::Amphibious | MovementType::Hover => {
                TargetType::Surface
            }
            MovementType::Air => TargetType::Air,
            MovementType::SeaFloater => TargetType::Floater,
            MovementType::SeaSubmerged => TargetType::Submerged,
            MovementType::StaticLand | MovementType::StaticSeaFloater | MovementType::StaticSeaSubmerged => {
                TargetType::Static
            }
        }
    }

    /// Whether a unit of this movement type, standing on `own_continent`,
    /// may travel to `other_continent` without transport. Air units and
    /// statics answer this trivially; continent-bound mobile units require
    /// an exact continent match (bridging across shallow water is already
    /// folded into continent membership at map-analysis time, see
    /// [`crate::map::Map`]).
    #[must_use]
    pub const fn can_travel_to(self, own_continent: u32, other_continent: u32) -> bool {
        match self {
            MovementType::Air => true,
            _ if self.is_static() => own_continent == other_continent,
            _ => own_continent == other_continent,
        }
    }
}

/// The classifier a weapon dispatches against.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetType {
    /// Ground/hover/amphibious surface targets.
    Surface,
    /// Air targets.
    Air,
    /// Surface-naval targets.
    Floater,
    /// Submerged targets.
    Submerged,
    /// Buildings.
    Static,
}

impl TargetType {
    /// All five target types, in the fixed order used for `[f32; 5]`
    /// combat-power rows and persistence.
    pub const ALL: [TargetType; 5] = [
        TargetType::Surface,
        TargetType::Air,
        TargetType::Floater,
        TargetType::Submerged,
        TargetType::Static,
    ];

    /// Index into a `[T; 5]` combat-power-style array.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            TargetType::Surface => 0,
            TargetType::Air => 1,
            TargetType::Floater => 2,
            TargetType::Submerged => 3,
            TargetType::Static => 4,
        }
    }
}

/// Coarse time bucket used to index learned attacked-by rates and Brain's
/// unit-mix decisions. Thresholds are fractions of a notional "game length"
/// proxy derived from frame count; a fixed frame scale (30 frames/second
/// engine tick, matching the spec's frame-based period table in §4.N) is
/// used directly rather than scaling by map size, since spec.md's periodic
/// schedule is itself expressed purely in frames.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GamePhase {
    /// First few minutes: economy bootstrap, first combat units.
    Starting,
    /// Early expansion and first skirmishes.
    Early,
    /// Mid-game: established base, ongoing attacks.
    Mid,
    /// Late-game: large armies, frequent large-scale attacks.
    Late,
}

impl GamePhase {
    /// Number of phases (fixed dimension for persisted attacked-by tables).
    pub const COUNT: usize = 4;

    /// Frame thresholds, in engine frames at 30 frames/sec: Starting ends at
    /// 5 minutes, Early at 15 minutes, Mid at 35 minutes, everything after
    /// is Late.
    const STARTING_END_FRAME: u32 = 30 * 60 * 5;
    const EARLY_END_FRAME: u32 = 30 * 60 * 15;
    const MID_END_FRAME: u32 = 30 * 60 * 35;

    /// Classify the current frame into a phase.
    #[must_use]
    pub const fn from_frame(frame: u32) -> Self {
        if frame < Self::STARTING_END_FRAME {
            GamePhase::Starting
        } else if frame < Self::EARLY_END_FRAME {
            GamePhase::Early
        } else if frame < Self::MID_END_FRAME {
            GamePhase::Mid
        } else {
            GamePhase::Late
        }
    }

    /// Index into a `[T; 4]` phase-keyed array.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            GamePhase::Starting => 0,
            GamePhase::Early => 1,
            GamePhase::Mid => 2,
            GamePhase::Late => 3,
        }
    }
}

/// Five non-negative floats clamped to `[MIN, MAX]`, one per [`TargetType`].
/// Represents an estimated damage-per-time capability of a unit def against
/// each target type, learned over games.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CombatPower([f32; 5]);

impl CombatPower {
    /// Lower clamp for any combat power entry.
    pub const MIN: f32 = 0.01;
    /// Upper clamp for any combat power entry.
    pub const MAX: f32 = 1000.0;

    /// All-minimum combat power (used as the fallback for non-combat defs).
    #[must_use]
    pub const fn floor() -> Self {
        Self([Self::MIN; 5])
    }

    /// Build from raw values, clamping each into range.
    #[must_use]
    pub fn new(values: [f32; 5]) -> Self {
        let mut out = values;
        for v in &mut out {
            *v = v.clamp(Self::MIN, Self::MAX);
        }
        Self(out)
    }

    /// Read the value for a target type.
    #[must_use]
    pub fn get(&self, t: TargetType) -> f32 {
        self.0[t.index()]
    }

    /// Set (and clamp) the value for a target type.
    pub fn set(&mut self, t: TargetType, value: f32) {
        self.0[t.index()] = value.clamp(Self::MIN, Self::MAX);
    }

    /// Weighted dot product against a per-target-type weight vector, used
    /// throughout Executor/Attack rating math (`attack_power_vs(weights)`).
    #[must_use]
    pub fn weighted_sum(&self, weights: &[f32; 5]) -> f32 {
        self.0.iter().zip(weights.iter()).map(|(a, b)| a * b).sum()
    }

    /// Raw backing array, for persistence.
    #[must_use]
    pub fn raw(&self) -> [f32; 5] {
        self.0
    }
}

impl Default for CombatPower {
    fn default() -> Self {
        Self::floor()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_type_bits_compose() {
        let t = UnitType::BUILDER.union(UnitType::FACTORY);
        assert!(t.contains(UnitType::BUILDER));
        assert!(t.contains(UnitType::FACTORY));
        assert!(!t.contains(UnitType::RADAR));
        assert!(t.intersects(UnitType::FACTORY));
    }

    #[test]
    fn target_type_derivation() {
        assert_eq!(MovementType::Ground.target_type(), TargetType::Surface);
        assert_eq!(MovementType::Air.target_type(), TargetType::Air);
        assert_eq!(MovementType::SeaFloater.target_type(), TargetType::Floater);
        assert_eq!(MovementType::SeaSubmerged.target_type(), TargetType::Submerged);
        assert_eq!(MovementType::StaticLand.target_type(), TargetType::Static);
    }

    #[test]
    fn combat_power_clamps() {
        let mut cp = CombatPower::new([-5.0, 2000.0, 1.0, 1.0, 1.0]);
        assert_eq!(cp.get(TargetType::Surface), CombatPower::MIN);
        assert_eq!(cp.get(TargetType::Air), CombatPower::MAX);
        cp.set(TargetType::Floater, -1.0);
        assert_eq!(cp.get(TargetType::Floater), CombatPower::MIN);
    }

    #[test]
    fn game_phase_thresholds() {
        assert_eq!(GamePhase::from_frame(0), GamePhase::Starting);
        assert_eq!(GamePhase::from_frame(30 * 60 * 10), GamePhase::Early);
        assert_eq!(GamePhase::from_frame(30 * 60 * 20), GamePhase::Mid);
        assert_eq!(GamePhase::from_frame(30 * 60 * 50), GamePhase::Late);
    }
}
