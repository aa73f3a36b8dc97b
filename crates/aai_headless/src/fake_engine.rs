//! A standalone [`EngineApi`] implementation driven by a [`crate::scenario::Scenario`]
//! description rather than a live host engine. Mirrors the role of the
//! teacher's headless harness: no rendering, no network, just enough world
//! state to let [`aai_core::root::AaiRoot`] make decisions and issue orders
//! we can record and assert on.

use std::collections::HashMap;

use aai_core::engine_api::{EngineApi, EngineCommand, OrderOptions, UnitDef, WeaponInfo};
use aai_core::types::{Pos3, TargetType, UnitDefId, UnitId};

/// One issued order, timestamped by the frame it was given on.
#[derive(Clone, Debug, PartialEq)]
pub struct RecordedOrder {
    pub frame: u32,
    pub unit: UnitId,
    pub command: EngineCommand,
    pub options: OrderOptions,
}

/// A fully scriptable fake engine: unit catalog and map are provided up
/// front, live units can be spawned/killed by the harness driver loop, and
/// every order the AI issues is recorded for later assertions.
pub struct FakeEngine {
    defs: HashMap<UnitDefId, UnitDef>,
    by_name: HashMap<String, UnitDefId>,
    positions: HashMap<UnitId, Pos3>,
    def_ids: HashMap<UnitId, UnitDefId>,
    teams: HashMap<UnitId, i32>,
    heightmap: Vec<f32>,
    metal_map: Vec<f32>,
    width: u32,
    height: u32,
    frame: u32,
    metal: f32,
    energy: f32,
    metal_storage: f32,
    energy_storage: f32,
    metal_income: f32,
    metal_usage: f32,
    energy_income: f32,
    energy_usage: f32,
    my_team: i32,
    orders: Vec<RecordedOrder>,
    messages: Vec<String>,
}

impl FakeEngine {
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        FakeEngine {
            defs: HashMap::new(),
            by_name: HashMap::new(),
            positions: HashMap::new(),
            def_ids: HashMap::new(),
            teams: HashMap::new(),
            heightmap: vec![10.0; (width * height) as usize],
            metal_map: vec![0.0; (width * height) as usize],
            width,
            height,
            frame: 0,
            metal: 1000.0,
            energy: 1000.0,
            metal_storage: 1000.0,
            energy_storage: 1000.0,
            metal_income: 10.0,
            metal_usage: 8.0,
            energy_income: 50.0,
            energy_usage: 40.0,
            my_team: 0,
            orders: Vec::new(),
            messages: Vec::new(),
        }
    }

    pub fn register_def(&mut self, def: UnitDef) {
        self.by_name.insert(def.name.clone(), def.id);
        self.defs.insert(def.id, def);
    }

    pub fn set_metal_spot(&mut self, x: u32, z: u32, amount: f32) {
        if x < self.width && z < self.height {
            self.metal_map[(z * self.width + x) as usize] = amount;
        }
    }

    pub fn set_frame(&mut self, frame: u32) {
        self.frame = frame;
    }

    pub fn set_resources(&mut self, metal: f32, energy: f32) {
        self.metal = metal;
        self.energy = energy;
    }

    pub fn spawn(&mut self, unit: UnitId, def: UnitDefId, pos: Pos3, team: i32) {
        self.def_ids.insert(unit, def);
        self.positions.insert(unit, pos);
        self.teams.insert(unit, team);
    }

    pub fn kill(&mut self, unit: UnitId) {
        self.def_ids.remove(&unit);
        self.positions.remove(&unit);
        self.teams.remove(&unit);
    }

    #[must_use]
    pub fn orders(&self) -> &[RecordedOrder] {
        &self.orders
    }

    #[must_use]
    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    #[must_use]
    pub fn def_by_name(&self, name: &str) -> Option<UnitDefId> {
        self.by_name.get(name).copied()
    }
}

pub fn weapon(range: f32, damage: f32, targets: &[TargetType]) -> WeaponInfo {
    WeaponInfo {
        range,
        max_damage: damage,
        target_mask: targets.to_vec(),
        stockpile: false,
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

    fn unit_team(&self, unit: UnitId) -> Option<i32> {
        self.teams.get(&unit).copied()
    }

    fn my_team(&self) -> i32 {
        self.my_team
    }

    fn my_ally_team(&self) -> i32 {
        self.my_team
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
        self.metal
    }

    fn energy(&self) -> f32 {
        self.energy
    }

    fn metal_storage(&self) -> f32 {
        self.metal_storage
    }

    fn energy_storage(&self) -> f32 {
        self.energy_storage
    }

    fn metal_income(&self) -> f32 {
        self.metal_income
    }

    fn metal_usage(&self) -> f32 {
        self.metal_usage
    }

    fn energy_income(&self) -> f32 {
        self.energy_income
    }

    fn energy_usage(&self) -> f32 {
        self.energy_usage
    }

    fn can_build_at(&self, _def: UnitDefId, _pos: Pos3) -> bool {
        true
    }

    fn closest_build_site(&self, _def: UnitDefId, pos: Pos3, _search_radius: f32) -> Option<Pos3> {
        Some(pos)
    }

    fn give_order(&mut self, unit: UnitId, cmd: EngineCommand, opts: OrderOptions) {
        self.orders.push(RecordedOrder {
            frame: self.frame,
            unit,
            command: cmd,
            options: opts,
        });
    }

    fn enemy_units_in_radius(&self, pos: Pos3, radius: f32) -> Vec<UnitId> {
        let my_team = self.my_team;
        self.positions
            .iter()
            .filter(|(id, p)| {
                self.teams.get(*id).copied().unwrap_or(my_team) != my_team && p.distance_2d(pos) <= radius
            })
            .map(|(id, _)| *id)
            .collect()
    }

    fn enemy_units_in_radar_and_los(&self) -> Vec<UnitId> {
        let my_team = self.my_team;
        self.positions
            .keys()
            .filter(|id| self.teams.get(*id).copied().unwrap_or(my_team) != my_team)
            .copied()
            .collect()
    }

    fn friendly_units(&self) -> Vec<UnitId> {
        let my_team = self.my_team;
        self.positions
            .keys()
            .filter(|id| self.teams.get(*id).copied().unwrap_or(my_team) == my_team)
            .copied()
            .collect()
    }

    fn elevation(&self, x: f32, z: f32) -> f32 {
        let xi = (x as u32).min(self.width - 1);
        let zi = (z as u32).min(self.height - 1);
        self.heightmap[(zi * self.width + xi) as usize]
    }

    fn send_text_message(&mut self, msg: &str, _priority: u8) {
        self.messages.push(msg.to_string());
    }
}
