//! Small scenario descriptions used to drive [`crate::fake_engine::FakeEngine`]
//! for the integration tests in `tests/` (spec §8's S1-S6 end-to-end
//! properties). A scenario is plain data, not a config-file format: tests
//! build one with the builder below rather than parsing it off disk, since
//! the scenarios here are few and test-local.

use aai_core::engine_api::UnitDef;
use aai_core::types::{CombatPower, Pos3, TargetType, UnitDefId, UnitId};

use crate::fake_engine::FakeEngine;

/// One side's starting unit catalog entry, before a `UnitDefId` is assigned.
#[derive(Clone)]
pub struct DefSpec {
    pub name: String,
    pub metal_cost: f32,
    pub energy_cost: f32,
    pub buildtime: f32,
    pub health: f32,
    pub footprint: u32,
    pub speed: f32,
    pub can_fly: bool,
    pub is_floater: bool,
    pub extracts_metal: f32,
    pub build_options: Vec<String>,
    pub weapon_range: f32,
    pub weapon_damage: f32,
    pub weapon_targets: Vec<TargetType>,
}

impl DefSpec {
    #[must_use]
    pub fn new(name: &str) -> Self {
        DefSpec {
            name: name.to_string(),
            metal_cost: 100.0,
            energy_cost: 100.0,
            buildtime: 1000.0,
            health: 100.0,
            footprint: 2,
            speed: 0.0,
            can_fly: false,
            is_floater: false,
            extracts_metal: 0.0,
            build_options: Vec::new(),
            weapon_range: 0.0,
            weapon_damage: 0.0,
            weapon_targets: Vec::new(),
        }
    }

    #[must_use]
    pub fn builds(mut self, names: &[&str]) -> Self {
        self.build_options = names.iter().map(|s| s.to_string()).collect();
        self
    }

    #[must_use]
    pub fn mobile(mut self, speed: f32) -> Self {
        self.speed = speed;
        self
    }

    #[must_use]
    pub fn extractor(mut self, amount: f32) -> Self {
        self.extracts_metal = amount;
        self
    }

    #[must_use]
    pub fn weapon(mut self, range: f32, damage: f32, targets: &[TargetType]) -> Self {
        self.weapon_range = range;
        self.weapon_damage = damage;
        self.weapon_targets = targets.to_vec();
        self
    }
}

/// Builds a [`FakeEngine`] plus a name-to-id lookup from a flat list of
/// [`DefSpec`]s, resolving `build_options` by name after every def has an id.
pub struct ScenarioBuilder {
    width: u32,
    height: u32,
    specs: Vec<DefSpec>,
}

impl ScenarioBuilder {
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        ScenarioBuilder {
            width,
            height,
            specs: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_def(mut self, spec: DefSpec) -> Self {
        self.specs.push(spec);
        self
    }

    #[must_use]
    pub fn build(self) -> (FakeEngine, std::collections::HashMap<String, UnitDefId>) {
        let mut engine = FakeEngine::new(self.width, self.height);
        let mut ids = std::collections::HashMap::new();
        for (i, spec) in self.specs.iter().enumerate() {
            ids.insert(spec.name.clone(), UnitDefId((i + 1) as u32));
        }
        for spec in &self.specs {
            let id = ids[&spec.name];
            let build_options = spec
                .build_options
                .iter()
                .filter_map(|n| ids.get(n).copied())
                .collect();
            let weapons = if spec.weapon_damage > 0.0 {
                vec![crate::fake_engine::weapon(spec.weapon_range, spec.weapon_damage, &spec.weapon_targets)]
            } else {
                Vec::new()
            };
            engine.register_def(UnitDef {
                id,
                name: spec.name.clone(),
                metal_cost: spec.metal_cost,
                energy_cost: spec.energy_cost,
                buildtime: spec.buildtime,
                health: spec.health,
                footprint_x: spec.footprint,
                footprint_z: spec.footprint,
                speed: spec.speed,
                can_fly: spec.can_fly,
                min_water_depth: 0.0,
                is_floater: spec.is_floater,
                is_submersible: false,
                build_options,
                can_assist: false,
                can_resurrect: false,
                is_air_base: false,
                extracts_metal: spec.extracts_metal,
                energy_make: 0.0,
                energy_upkeep: 0.0,
                is_tidal: false,
                is_wind: false,
                metal_make: 0.0,
                metal_storage: 0.0,
                energy_storage: 0.0,
                weapons,
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
            });
        }
        (engine, ids)
    }
}

/// A standard two-side land-map catalog used by several scenario tests:
/// commander, lab (factory), constructor, metal extractor, static defence,
/// a basic combat unit, and a scout, per side, matching the teacher's own
/// toy-catalog convention in its headless fixtures.
#[must_use]
pub fn two_side_land_catalog(width: u32, height: u32) -> (FakeEngine, std::collections::HashMap<String, UnitDefId>) {
    let mut builder = ScenarioBuilder::new(width, height);
    for side in ["arm", "cor"] {
        builder = builder
            .with_def(
                DefSpec::new(&format!("{side}com"))
                    .builds(&[&format!("{side}lab"), &format!("{side}mex")])
                    .mobile(2.0),
            )
            .with_def(
                DefSpec::new(&format!("{side}lab"))
                    .builds(&[&format!("{side}con"), &format!("{side}tank")]),
            )
            .with_def(
                DefSpec::new(&format!("{side}con"))
                    .builds(&[&format!("{side}mex"), &format!("{side}defence")])
                    .mobile(1.5),
            )
            .with_def(DefSpec::new(&format!("{side}mex")).extractor(2.0))
            .with_def(
                DefSpec::new(&format!("{side}defence")).weapon(300.0, 30.0, &[TargetType::Surface]),
            )
            .with_def(
                DefSpec::new(&format!("{side}tank"))
                    .mobile(3.0)
                    .weapon(200.0, 12.0, &[TargetType::Surface]),
            )
            .with_def(DefSpec::new(&format!("{side}scout")).mobile(5.0));
    }
    builder.build()
}

/// Place a unit at a world position on a given team, returning its id.
pub fn place(engine: &mut FakeEngine, id_source: &mut i32, def: UnitDefId, pos: Pos3, team: i32) -> UnitId {
    let unit = UnitId(*id_source);
    *id_source += 1;
    engine.spawn(unit, def, pos, team);
    unit
}

/// Combat power used for S3/S4's enemy static defence fixtures.
#[must_use]
pub fn combat_power(surface: f32) -> CombatPower {
    CombatPower::new([surface, CombatPower::MIN, CombatPower::MIN, CombatPower::MIN, CombatPower::MIN])
}
