//! In-crate test fixtures: a minimal [`EngineApi`] implementation with a toy
//! two-side unit catalog, used by unit tests across every module. Mirrors
//! the role of the teacher's `rts_test_utils::fixtures`, kept local since
//! it's only exercised by `#[cfg(test)]` code within this crate.
#![cfg(test)]

use std::collections::HashMap;

use crate::engine_api::{EngineApi, EngineCommand, OrderOptions, UnitDef, WeaponInfo};
use crate::types::{Pos3, TargetType, UnitDefId, UnitId};

pub struct FakeEngine {
    defs: HashMap<UnitDefId, UnitDef>,
    by_name: HashMap<String, UnitDefId>,
    positions: HashMap<UnitId, Pos3>,
    def_ids: HashMap<UnitId, UnitDefId>,
    heightmap: Vec<f32>,
    metal_map: Vec<f32>,
    width: u32,
    height: u32,
    frame: u32,
    orders: Vec<(UnitId, EngineCommand, OrderOptions)>,
}

fn weapon(range: f32, damage: f32, targets: &[TargetType]) -> WeaponInfo {
    WeaponInfo {
        range,
        max_damage: damage,
        target_mask: targets.to_vec(),
        stockpile: false,
    }
}

impl FakeEngine {
    /// A small two-side catalog: commander, factory, builder, power plant,
    /// extractor, static defence, a ground tank, and a scout per side.
    pub fn two_side_toy() -> Self {
        let mut eng = FakeEngine {
            defs: HashMap::new(),
            by_name: HashMap::new(),
            positions: HashMap::new(),
            def_ids: HashMap::new(),
            heightmap: vec![10.0; 64 * 64],
            metal_map: vec![0.0; 64 * 64],
            width: 64,
            height: 64,
            frame: 0,
            orders: Vec::new(),
        };

        let mut next_id = 1u32;
        let mut add = |eng: &mut FakeEngine, def: UnitDef| {
            eng.by_name.insert(def.name.clone(), def.id);
            eng.defs.insert(def.id, def);
        };

        macro_rules! mkid {
            () => {{
                let id = UnitDefId(next_id);
                next_id += 1;
                id
            }};
        }

        for side in ["arm", "cor"] {
            let factory_id = mkid!();
            let builder_id = mkid!();
            let com_id = mkid!();
            let plant_id = mkid!();
            let extractor_id = mkid!();
            let defence_id = mkid!();
            let tank_id = mkid!();
            let scout_id = mkid!();

            add(
                &mut eng,
                UnitDef {
                    id: com_id,
                    name: format!("{side}com"),
                    metal_cost: 0.0,
                    energy_cost: 0.0,
                    buildtime: 1.0,
                    health: 3000.0,
                    footprint_x: 2,
                    footprint_z: 2,
                    speed: 40.0,
                    can_fly: false,
                    min_water_depth: -100.0,
                    is_floater: false,
                    is_submersible: false,
                    build_options: vec![factory_id, builder_id],
                    can_assist: true,
                    can_resurrect: false,
                    is_air_base: false,
                    extracts_metal: 0.0,
                    energy_make: 0.0,
                    energy_upkeep: 0.0,
                    is_tidal: false,
                    is_wind: false,
                    metal_make: 0.0,
                    metal_storage: 0.0,
                    energy_storage: 0.0,
                    weapons: vec![weapon(300.0, 50.0, &[TargetType::Surface])],
                    has_shield: false,
                    has_radar: false,
                    radar_range: 0.0,
                    has_sonar: false,
                    sonar_range: 0.0,
                    has_radar_jammer: false,
                    has_sonar_jammer: false,
                    los_range: 400.0,
                    is_transport: false,
                    transport_capacity: 0,
                    turn_rate: 1.0,
                },
            );

            add(
                &mut eng,
                UnitDef {
                    id: factory_id,
                    name: format!("{side}lab"),
                    metal_cost: 2000.0,
                    energy_cost: 40000.0,
                    buildtime: 10000.0,
                    health: 5000.0,
                    footprint_x: 6,
                    footprint_z: 6,
                    speed: 0.0,
                    can_fly: false,
                    min_water_depth: -100.0,
                    is_floater: false,
                    is_submersible: false,
                    build_options: vec![tank_id, scout_id],
                    can_assist: false,
                    can_resurrect: false,
                    is_air_base: false,
                    extracts_metal: 0.0,
                    energy_make: 0.0,
                    energy_upkeep: 0.0,
                    is_tidal: false,
                    is_wind: false,
                    metal_make: 0.0,
                    metal_storage: 0.0,
                    energy_storage: 0.0,
                    weapons: vec![],
                    has_shield: false,
                    has_radar: false,
                    radar_range: 0.0,
                    has_sonar: false,
                    sonar_range: 0.0,
                    has_radar_jammer: false,
                    has_sonar_jammer: false,
                    los_range: 200.0,
                    is_transport: false,
                    transport_capacity: 0,
                    turn_rate: 0.0,
                },
            );

            add(
                &mut eng,
                UnitDef {
                    id: builder_id,
                    name: format!("{side}con"),
                    metal_cost: 150.0,
                    energy_cost: 2000.0,
                    buildtime: 2000.0,
                    health: 300.0,
                    footprint_x: 2,
                    footprint_z: 2,
                    speed: 50.0,
                    can_fly: false,
                    min_water_depth: -100.0,
                    is_floater: false,
                    is_submersible: false,
                    build_options: vec![plant_id, extractor_id, defence_id],
                    can_assist: true,
                    can_resurrect: false,
                    is_air_base: false,
                    extracts_metal: 0.0,
                    energy_make: 0.0,
                    energy_upkeep: 0.0,
                    is_tidal: false,
                    is_wind: false,
                    metal_make: 0.0,
                    metal_storage: 0.0,
                    energy_storage: 0.0,
                    weapons: vec![],
                    has_shield: false,
                    has_radar: false,
                    radar_range: 0.0,
                    has_sonar: false,
                    sonar_range: 0.0,
                    has_radar_jammer: false,
                    has_sonar_jammer: false,
                    los_range: 300.0,
                    is_transport: false,
                    transport_capacity: 0,
                    turn_rate: 1.0,
                },
            );

            add(
                &mut eng,
                UnitDef {
                    id: plant_id,
                    name: format!("{side}plant"),
                    metal_cost: 500.0,
                    energy_cost: 0.0,
                    buildtime: 5000.0,
                    health: 1000.0,
                    footprint_x: 4,
                    footprint_z: 4,
                    speed: 0.0,
                    can_fly: false,
                    min_water_depth: -100.0,
                    is_floater: false,
                    is_submersible: false,
                    build_options: vec![],
                    can_assist: false,
                    can_resurrect: false,
                    is_air_base: false,
                    extracts_metal: 0.0,
                    energy_make: 100.0,
                    energy_upkeep: 0.0,
                    is_tidal: false,
                    is_wind: false,
                    metal_make: 0.0,
                    metal_storage: 0.0,
                    energy_storage: 0.0,
                    weapons: vec![],
                    has_shield: false,
                    has_radar: false,
                    radar_range: 0.0,
                    has_sonar: false,
                    sonar_range: 0.0,
                    has_radar_jammer: false,
                    has_sonar_jammer: false,
                    los_range: 100.0,
                    is_transport: false,
                    transport_capacity: 0,
                    turn_rate: 0.0,
                },
            );

            add(
                &mut eng,
                UnitDef {
                    id: extractor_id,
                    name: format!("{side}mex"),
                    metal_cost: 50.0,
                    energy_cost: 0.0,
                    buildtime: 1000.0,
                    health: 200.0,
                    footprint_x: 2,
                    footprint_z: 2,
                    speed: 0.0,
                    can_fly: false,
                    min_water_depth: -100.0,
                    is_floater: false,
                    is_submersible: false,
                    build_options: vec![],
                    can_assist: false,
                    can_resurrect: false,
                    is_air_base: false,
                    extracts_metal: 2.0,
                    energy_make: 0.0,
                    energy_upkeep: 0.0,
                    is_tidal: false,
                    is_wind: false,
                    metal_make: 0.0,
                    metal_storage: 0.0,
                    energy_storage: 0.0,
                    weapons: vec![],
                    has_shield: false,
                    has_radar: false,
                    radar_range: 0.0,
                    has_sonar: false,
                    sonar_range: 0.0,
                    has_radar_jammer: false,
                    has_sonar_jammer: false,
                    los_range: 50.0,
                    is_transport: false,
                    transport_capacity: 0,
                    turn_rate: 0.0,
                },
            );

            add(
                &mut eng,
                UnitDef {
                    id: defence_id,
                    name: format!("{side}defence"),
                    metal_cost: 300.0,
                    energy_cost: 1000.0,
                    buildtime: 3000.0,
                    health: 1500.0,
                    footprint_x: 2,
                    footprint_z: 2,
                    speed: 0.0,
                    can_fly: false,
                    min_water_depth: -100.0,
                    is_floater: false,
                    is_submersible: false,
                    build_options: vec![],
                    can_assist: false,
                    can_resurrect: false,
                    is_air_base: false,
                    extracts_metal: 0.0,
                    energy_make: 0.0,
                    energy_upkeep: 0.0,
                    is_tidal: false,
                    is_wind: false,
                    metal_make: 0.0,
                    metal_storage: 0.0,
                    energy_storage: 0.0,
                    weapons: vec![weapon(400.0, 80.0, &[TargetType::Surface, TargetType::Air])],
                    has_shield: false,
                    has_radar: false,
                    radar_range: 0.0,
                    has_sonar: false,
                    sonar_range: 0.0,
                    has_radar_jammer: false,
                    has_sonar_jammer: false,
                    los_range: 500.0,
                    is_transport: false,
                    transport_capacity: 0,
                    turn_rate: 0.0,
                },
            );

            add(
                &mut eng,
                UnitDef {
                    id: tank_id,
                    name: format!("{side}tank"),
                    metal_cost: 120.0,
                    energy_cost: 600.0,
                    buildtime: 1500.0,
                    health: 500.0,
                    footprint_x: 2,
                    footprint_z: 2,
                    speed: 60.0,
                    can_fly: false,
                    min_water_depth: -100.0,
                    is_floater: false,
                    is_submersible: false,
                    build_options: vec![],
                    can_assist: false,
                    can_resurrect: false,
                    is_air_base: false,
                    extracts_metal: 0.0,
                    energy_make: 0.0,
                    energy_upkeep: 0.0,
                    is_tidal: false,
                    is_wind: false,
                    metal_make: 0.0,
                    metal_storage: 0.0,
                    energy_storage: 0.0,
                    weapons: vec![weapon(250.0, 40.0, &[TargetType::Surface])],
                    has_shield: false,
                    has_radar: false,
                    radar_range: 0.0,
                    has_sonar: false,
                    sonar_range: 0.0,
                    has_radar_jammer: false,
                    has_sonar_jammer: false,
                    los_range: 300.0,
                    is_transport: false,
                    transport_capacity: 0,
                    turn_rate: 5.0,
                },
            );

            add(
                &mut eng,
                UnitDef {
                    id: scout_id,
                    name: format!("{side}scout"),
                    metal_cost: 40.0,
                    energy_cost: 200.0,
                    buildtime: 500.0,
                    health: 80.0,
                    footprint_x: 1,
                    footprint_z: 1,
                    speed: 120.0,
                    can_fly: false,
                    min_water_depth: -100.0,
                    is_floater: false,
                    is_submersible: false,
                    build_options: vec![],
                    can_assist: false,
                    can_resurrect: false,
                    is_air_base: false,
                    extracts_metal: 0.0,
                    energy_make: 0.0,
                    energy_upkeep: 0.0,
                    is_tidal: false,
                    is_wind: false,
                    metal_make: 0.0,
                    metal_storage: 0.0,
                    energy_storage: 0.0,
                    weapons: vec![],
                    has_shield: false,
                    has_radar: false,
                    radar_range: 0.0,
                    has_sonar: false,
                    sonar_range: 0.0,
                    has_radar_jammer: false,
                    has_sonar_jammer: false,
                    los_range: 700.0,
                    is_transport: false,
                    transport_capacity: 0,
                    turn_rate: 10.0,
                },
            );
        }

        eng
    }

    pub fn spawn(&mut self, unit: UnitId, def: UnitDefId, pos: Pos3) {
        self.def_ids.insert(unit, def);
        self.positions.insert(unit, pos);
    }

    pub fn set_frame(&mut self, frame: u32) {
        self.frame = frame;
    }

    pub fn orders(&self) -> &[(UnitId, EngineCommand, OrderOptions)] {
        &self.orders
    }
}

impl EngineApi for FakeEngine {
    fn num_unit_defs(&self) -> usize {
        self.defs.len()
    }

    fn unit_def(&self, id: UnitDefId) -> Option<&UnitDef> {
        self.defs.get(&id)
    }

    fn unit_def_by_name(&self, name: &str) -> Option<&UnitDef> {
        self.by_name.get(name).and_then(|id| self.defs.get(id))
    }

    fn unit_pos(&self, unit: UnitId) -> Option<Pos3> {
        self.positions.get(&unit).copied()
    }

    fn unit_def_id(&self, unit: UnitId) -> Option<UnitDefId> {
        self.def_ids.get(&unit).copied()
    }

    fn unit_team(&self, _unit: UnitId) -> Option<i32> {
        Some(0)
    }

    fn my_team(&self) -> i32 {
        0
    }

    fn my_ally_team(&self) -> i32 {
        0
    }

    fn is_allied(&self, a: i32, b: i32) -> bool {
        a == b
    }

    fn unit_being_built(&self, _unit: UnitId) -> bool {
        false
    }

    fn heightmap(&self) -> &[f32] {
        &self.heightmap
    }

    fn map_width_tiles(&self) -> u32 {
        self.width
    }

    fn map_height_tiles(&self) -> u32 {
        self.height
    }

    fn metal_map(&self) -> &[f32] {
        &self.metal_map
    }

    fn max_metal(&self) -> f32 {
        self.metal_map.iter().copied().fold(0.0, f32::max)
    }

    fn extractor_radius(&self) -> f32 {
        4.0
    }

    fn current_frame(&self) -> u32 {
        self.frame
    }

    fn metal(&self) -> f32 {
        100.0
    }

    fn energy(&self) -> f32 {
        100.0
    }

    fn metal_storage(&self) -> f32 {
        1000.0
    }

    fn energy_storage(&self) -> f32 {
        1000.0
    }

    fn metal_income(&self) -> f32 {
        10.0
    }

    fn metal_usage(&self) -> f32 {
        8.0
    }

    fn energy_income(&self) -> f32 {
        50.0
    }

    fn energy_usage(&self) -> f32 {
        40.0
    }

    fn can_build_at(&self, _def: UnitDefId, _pos: Pos3) -> bool {
        true
    }

    fn closest_build_site(&self, _def: UnitDefId, pos: Pos3, _search_radius: f32) -> Option<Pos3> {
        Some(pos)
    }

    fn give_order(&mut self, unit: UnitId, cmd: EngineCommand, opts: OrderOptions) {
        self.orders.push((unit, cmd, opts));
    }

    fn enemy_units_in_radius(&self, _pos: Pos3, _radius: f32) -> Vec<UnitId> {
        Vec::new()
    }

    fn enemy_units_in_radar_and_los(&self) -> Vec<UnitId> {
        Vec::new()
    }

    fn friendly_units(&self) -> Vec<UnitId> {
        self.positions.keys().copied().collect()
    }

    fn elevation(&self, _x: f32, _z: f32) -> f32 {
        10.0
    }

    fn send_text_message(&mut self, _msg: &str, _priority: u8) {}
}
