//! The engine callback surface this core consumes (spec §6). This crate
//! only depends on this trait — never on a concrete engine implementation.
//! [`aai_headless`] provides a fake engine implementing it for tests.

use crate::types::{Pos3, TargetType, UnitDefId, UnitId};

/// A single declared weapon on a unit definition: its range and the set of
/// [`TargetType`]s it can engage.
#[derive(Clone, Debug, PartialEq)]
pub struct WeaponInfo {
    /// Max effective range, in world units.
    pub range: f32,
    /// Maximum damage per hit (used to distinguish "has a weapon" from a
    /// cosmetic zero-damage beam).
    pub max_damage: f32,
    /// Target types this weapon's mask permits it to engage.
    pub target_mask: Vec<TargetType>,
    /// True if this is a stockpiled weapon (nuke/anti-nuke style).
    pub stockpile: bool,
}

/// Raw catalog entry for a unit definition, as advertised by the engine.
/// Field meanings are spelled out in spec §3 `UnitTypeProperties`.
#[derive(Clone, Debug, PartialEq)]
pub struct UnitDef {
    pub id: UnitDefId,
    pub name: String,
    pub metal_cost: f32,
    pub energy_cost: f32,
    pub buildtime: f32,
    pub health: f32,
    pub footprint_x: u32,
    pub footprint_z: u32,
    pub speed: f32,
    pub can_fly: bool,
    pub min_water_depth: f32,
    pub is_floater: bool,
    pub is_submersible: bool,
    pub build_options: Vec<UnitDefId>,
    pub can_assist: bool,
    pub can_resurrect: bool,
    pub is_air_base: bool,
    pub extracts_metal: f32,
    pub energy_make: f32,
    pub energy_upkeep: f32,
    pub is_tidal: bool,
    pub is_wind: bool,
    pub metal_make: f32,
    pub metal_storage: f32,
    pub energy_storage: f32,
    pub weapons: Vec<WeaponInfo>,
    pub has_shield: bool,
    pub has_radar: bool,
    pub radar_range: f32,
    pub has_sonar: bool,
    pub sonar_range: f32,
    pub has_radar_jammer: bool,
    pub has_sonar_jammer: bool,
    pub los_range: f32,
    pub is_transport: bool,
    pub transport_capacity: u32,
    pub turn_rate: f32,
}

/// Opaque engine-defined order primitive, per spec §6.
#[derive(Clone, Debug, PartialEq)]
pub enum EngineCommand {
    Move(Pos3),
    Stop,
    Fight(Pos3),
    Attack(UnitId),
    Guard(UnitId),
    Patrol(Pos3),
    Repair(UnitId),
    Reclaim(UnitId),
    Resurrect(UnitId),
    SetCloak(bool),
    SetOnOff(bool),
    /// Build a unit def, optionally at a concrete position (mobile
    /// constructors must supply a position; factories build in-place).
    Build {
        def: UnitDefId,
        at: Option<Pos3>,
    },
}

/// Modifier bit carried alongside an [`EngineCommand`] (queue-append rather
/// than replace the unit's order queue).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OrderOptions {
    pub shift: bool,
}

/// The host engine callback surface consumed by this core (spec §6). All
/// methods are read/command queries against engine-owned state; this core
/// never stores engine state beyond what it copies out here.
pub trait EngineApi {
    fn num_unit_defs(&self) -> usize;
    fn unit_def(&self, id: UnitDefId) -> Option<&UnitDef>;
    fn unit_def_by_name(&self, name: &str) -> Option<&UnitDef>;

    fn unit_pos(&self, unit: UnitId) -> Option<Pos3>;
    fn unit_def_id(&self, unit: UnitId) -> Option<UnitDefId>;
    fn unit_team(&self, unit: UnitId) -> Option<i32>;
    fn my_team(&self) -> i32;
    fn my_ally_team(&self) -> i32;
    fn is_allied(&self, ally_a: i32, ally_b: i32) -> bool;
    fn unit_being_built(&self, unit: UnitId) -> bool;

    fn heightmap(&self) -> &[f32];
    fn map_width_tiles(&self) -> u32;
    fn map_height_tiles(&self) -> u32;
    fn metal_map(&self) -> &[f32];
    fn max_metal(&self) -> f32;
    fn extractor_radius(&self) -> f32;

    fn current_frame(&self) -> u32;
    fn metal(&self) -> f32;
    fn energy(&self) -> f32;
    fn metal_storage(&self) -> f32;
    fn energy_storage(&self) -> f32;
    fn metal_income(&self) -> f32;
    fn metal_usage(&self) -> f32;
    fn energy_income(&self) -> f32;
    fn energy_usage(&self) -> f32;

    fn can_build_at(&self, def: UnitDefId, pos: Pos3) -> bool;
    fn closest_build_site(&self, def: UnitDefId, pos: Pos3, search_radius: f32) -> Option<Pos3>;

    fn give_order(&mut self, unit: UnitId, cmd: EngineCommand, opts: OrderOptions);

    fn enemy_units_in_radius(&self, pos: Pos3, radius: f32) -> Vec<UnitId>;
    fn enemy_units_in_radar_and_los(&self) -> Vec<UnitId>;
    fn friendly_units(&self) -> Vec<UnitId>;

    fn elevation(&self, x: f32, z: f32) -> f32;
    fn send_text_message(&mut self, msg: &str, priority: u8);
}
