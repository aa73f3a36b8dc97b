//! Map analysis (spec §4.B): buildmap, plateau/continent maps, metal-spot
//! discovery, map-type classification, sector grid, and the defence
//! influence map. Resolution note: the buildmap is one tile per engine
//! build-tile; plateau/continent/defence maps are quarter-resolution as
//! specified.

use serde::{Deserialize, Serialize};

use crate::config::AaiConfig;
use crate::engine_api::EngineApi;
use crate::types::{Pos3, TargetType, UnitDefId};

/// Per-tile bitset (spec §3 `BuildMap tile`).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildTile(u8);

impl BuildTile {
    pub const LAND: Self = Self(1 << 0);
    pub const WATER: Self = Self(1 << 1);
    pub const FLAT: Self = Self(1 << 2);
    pub const CLIFF: Self = Self(1 << 3);
    pub const FREE: Self = Self(1 << 4);
    pub const OCCUPIED: Self = Self(1 << 5);
    pub const BLOCKED: Self = Self(1 << 6);

    fn set(&mut self, f: Self) {
        self.0 |= f.0;
    }
    fn clear(&mut self, f: Self) {
        self.0 &= !f.0;
    }
    fn has(self, f: Self) -> bool {
        (self.0 & f.0) != 0
    }
}

/// A discovered metal extraction spot (spec §3 `MetalSpot`).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MetalSpot {
    pub pos: Pos3,
    pub amount: f32,
    pub occupied: bool,
    pub extractor_unit: Option<i32>,
    pub extractor_def: Option<UnitDefId>,
}

/// Map-type classification (spec §4.B).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MapType {
    LandMap,
    LandWaterMap,
    WaterMap,
}

impl MapType {
    /// Fixed dimension index into the persisted attacked-by-rates table.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            MapType::LandMap => 0,
            MapType::LandWaterMap => 1,
            MapType::WaterMap => 2,
        }
    }
    pub const COUNT: usize = 3;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct ContinentStats {
    pub land_continents: u32,
    pub water_continents: u32,
    pub min_land: u32,
    pub avg_land: u32,
    pub max_land: u32,
    pub min_water: u32,
    pub avg_water: u32,
    pub max_water: u32,
}

#[derive(Clone, Debug)]
pub struct Continent {
    pub id: u32,
    pub size_in_tiles: u32,
    pub water: bool,
}

/// The map analysis singleton: buildmap, continent map, metal spots, sector
/// grid and the per-target-type defence influence map.
#[derive(Clone, Debug)]
pub struct Map {
    pub width_tiles: u32,
    pub height_tiles: u32,
    buildmap: Vec<BuildTile>,
    block_refcount: Vec<u32>,
    /// Quarter-resolution.
    quarter_width: u32,
    quarter_height: u32,
    plateau_map: Vec<f32>,
    continent_map: Vec<i32>,
    continents: Vec<Continent>,
    metal_spots: Vec<MetalSpot>,
    pub metal_map_flag: bool,
    pub water_ratio: f32,
    pub map_type: MapType,
    pub sector_size_tiles: u32,
    pub x_sectors: u32,
    pub y_sectors: u32,
    /// Defence influence map, one per target type, quarter-resolution.
    defence_map: [Vec<f32>; 5],
}

const METAL_SPOT_FRACTION_OF_MAX: f32 = 0.12;
const MAX_ACCEPTED_METAL_SPOTS: usize = 500;

impl Map {
    /// Build-map-sized construction helper.
    fn idx(&self, x: u32, z: u32) -> usize {
        (z * self.width_tiles + x) as usize
    }

    fn qidx(&self, x: u32, z: u32) -> usize {
        (z * self.quarter_width + x) as usize
    }

    /// One-shot analysis from the engine (spec §4.B). `sector_size` is the
    /// configured world-unit sector edge length.
    pub fn analyze(engine: &dyn EngineApi, cfg: &AaiConfig, sector_size: u32) -> Self {
        let width = engine.map_width_tiles();
        let height = engine.map_height_tiles();
        let heightmap = engine.heightmap();

        let mut buildmap = vec![BuildTile::default(); (width * height) as usize];
        let mut water_tiles = 0u32;
        for z in 0..height {
            for x in 0..width {
                let h = heightmap[(z * width + x) as usize];
                let i = (z * width + x) as usize;
                let mut tile = BuildTile::default();
                if h <= 0.0 {
                    tile.set(BuildTile::WATER);
                    water_tiles += 1;
                } else {
                    tile.set(BuildTile::LAND);
                }
                tile.set(BuildTile::FREE);
                let slope = slope_at(heightmap, width, height, x, z);
                if slope.abs() > cfg.cliff_slope {
                    tile.set(BuildTile::CLIFF);
                } else {
                    tile.set(BuildTile::FLAT);
                }
                buildmap[i] = tile;
            }
        }
        let water_ratio = water_tiles as f32 / (width * height).max(1) as f32;

        let qw = (width / 4).max(1);
        let qh = (height / 4).max(1);
        let plateau_map = compute_plateau_map(heightmap, width, height, qw, qh);
        let (continent_map, continents, _stats) =
            compute_continents(heightmap, width, height, qw, qh, cfg.non_amphib_max_waterdepth);

        let metal_map = engine.metal_map();
        let max_metal = engine.max_metal();
        let extractor_radius = engine.extractor_radius();
        let (metal_spots, metal_map_flag) =
            discover_metal_spots(metal_map, width, height, max_metal, extractor_radius, heightmap);

        let map_type = if (continents.iter().filter(|c| !c.water).map(|c| c.size_in_tiles).max().unwrap_or(0) as f32)
            < 0.5 * continents.iter().filter(|c| c.water).map(|c| c.size_in_tiles).max().unwrap_or(0) as f32
            || water_ratio > cfg.water_map_ratio
        {
            MapType::WaterMap
        } else if water_ratio > cfg.land_water_map_ratio {
            MapType::LandWaterMap
        } else {
            MapType::LandMap
        };

        let x_sectors = ((width * 1 /* build tile == world unit proxy */) as f32 / sector_size as f32)
            .round()
            .max(1.0) as u32;
        let y_sectors = ((height as f32) / sector_size as f32).round().max(1.0) as u32;

        let defence_map = [
            vec![0.0; (qw * qh) as usize],
            vec![0.0; (qw * qh) as usize],
            vec![0.0; (qw * qh) as usize],
            vec![0.0; (qw * qh) as usize],
            vec![0.0; (qw * qh) as usize],
        ];

        Map {
            width_tiles: width,
            height_tiles: height,
            block_refcount: vec![0; (width * height) as usize],
            buildmap,
            quarter_width: qw,
            quarter_height: qh,
            plateau_map,
            continent_map,
            continents,
            metal_spots,
            metal_map_flag,
            water_ratio,
            map_type,
            sector_size_tiles: sector_size,
            x_sectors,
            y_sectors,
            defence_map,
        }
    }

    #[must_use]
    pub fn metal_spots(&self) -> &[MetalSpot] {
        &self.metal_spots
    }

    #[must_use]
    pub fn metal_spots_mut(&mut self) -> &mut [MetalSpot] {
        &mut self.metal_spots
    }

    /// `can_build_at` primitive (spec §4.B): every footprint tile must be
    /// Free and of the requested medium.
    #[must_use]
    pub fn can_build_at(&self, x_tile: u32, z_tile: u32, x_size: u32, z_size: u32, water: bool) -> bool {
        if x_tile + x_size > self.width_tiles || z_tile + z_size > self.height_tiles {
            return false;
        }
        for z in z_tile..z_tile + z_size {
            for x in x_tile..x_tile + x_size {
                let tile = self.buildmap[self.idx(x, z)];
                if !tile.has(BuildTile::FREE) {
                    return false;
                }
                let medium_ok = if water {
                    tile.has(BuildTile::WATER)
                } else {
                    tile.has(BuildTile::LAND)
                };
                if !medium_ok {
                    return false;
                }
            }
        }
        true
    }

    /// Scan a rectangle on a stride-2 grid for the first buildable site,
    /// deferring to the engine's own placement rule as a second opinion.
    pub fn buildsite_in_rect(
        &self,
        engine: &dyn EngineApi,
        def: UnitDefId,
        x0: u32,
        z0: u32,
        x1: u32,
        z1: u32,
        x_size: u32,
        z_size: u32,
        water: bool,
    ) -> Option<Pos3> {
        let mut z = z0;
        while z + z_size <= z1 {
            let mut x = x0;
            while x + x_size <= x1 {
                if self.can_build_at(x, z, x_size, z_size, water) {
                    let pos = self.tile_to_pos(x, z);
                    if engine.can_build_at(def, pos) {
                        return Some(pos);
                    }
                }
                x += 2;
            }
            z += 2;
        }
        None
    }

    /// Expanding-square search centred on the rect's middle.
    pub fn center_buildsite(
        &self,
        engine: &dyn EngineApi,
        def: UnitDefId,
        cx: u32,
        cz: u32,
        max_radius: u32,
        x_size: u32,
        z_size: u32,
        water: bool,
    ) -> Option<Pos3> {
        for r in 0..=max_radius {
            let x0 = cx.saturating_sub(r);
            let z0 = cz.saturating_sub(r);
            let x1 = (cx + r).min(self.width_tiles);
            let z1 = (cz + r).min(self.height_tiles);
            if let Some(site) = self.buildsite_in_rect(engine, def, x0, z0, x1, z1, x_size, z_size, water) {
                return Some(site);
            }
        }
        None
    }

    /// Radar/artillery buildsite: among valid sites in rect, maximise
    /// `edge_distance / range + jitter + plateau_value`.
    #[allow(clippy::too_many_arguments)]
    pub fn radar_arty_buildsite(
        &self,
        engine: &dyn EngineApi,
        def: UnitDefId,
        x0: u32,
        z0: u32,
        x1: u32,
        z1: u32,
        x_size: u32,
        z_size: u32,
        range: f32,
        water: bool,
        rng: &mut dyn FnMut() -> f32,
    ) -> Option<Pos3> {
        let mut best: Option<(f32, Pos3)> = None;
        let mut z = z0;
        while z + z_size <= z1 {
            let mut x = x0;
            while x + x_size <= x1 {
                if self.can_build_at(x, z, x_size, z_size, water) {
                    let pos = self.tile_to_pos(x, z);
                    if engine.can_build_at(def, pos) {
                        let edge = self.edge_distance(x, z);
                        let score = edge / range.max(1.0) + rng() + self.plateau_value(x, z);
                        if best.as_ref().map_or(true, |(s, _)| score > *s) {
                            best = Some((score, pos));
                        }
                    }
                }
                x += 2;
            }
            z += 2;
        }
        best.map(|(_, p)| p)
    }

    /// Defence buildsite: maximise `terrain_modifier * plateau - defence_map(t) + jitter`,
    /// penalised quadratically for being too close to the map edge relative
    /// to weapon `range`.
    #[allow(clippy::too_many_arguments)]
    pub fn defence_buildsite(
        &self,
        engine: &dyn EngineApi,
        def: UnitDefId,
        x0: u32,
        z0: u32,
        x1: u32,
        z1: u32,
        x_size: u32,
        z_size: u32,
        target_type: TargetType,
        terrain_modifier: f32,
        range: f32,
        water: bool,
        rng: &mut dyn FnMut() -> f32,
    ) -> Option<Pos3> {
        let mut best: Option<(f32, Pos3)> = None;
        let mut z = z0;
        while z + z_size <= z1 {
            let mut x = x0;
            while x + x_size <= x1 {
                if self.can_build_at(x, z, x_size, z_size, water) {
                    let pos = self.tile_to_pos(x, z);
                    if engine.can_build_at(def, pos) {
                        let edge = self.edge_distance(x, z);
                        let penalty = if edge < range { (range - edge).powi(2) } else { 0.0 };
                        let score = terrain_modifier * self.plateau_value(x, z)
                            - self.defence_at(target_type, x, z)
                            + rng()
                            - penalty * 0.0001;
                        if best.as_ref().map_or(true, |(s, _)| score > *s) {
                            best = Some((score, pos));
                        }
                    }
                }
                x += 2;
            }
            z += 2;
        }
        best.map(|(_, p)| p)
    }

    /// Random-offset buildsite search, up to `tries` attempts.
    pub fn random_buildsite(
        &self,
        engine: &dyn EngineApi,
        def: UnitDefId,
        x0: u32,
        z0: u32,
        x1: u32,
        z1: u32,
        x_size: u32,
        z_size: u32,
        water: bool,
        tries: u32,
        rng: &mut dyn FnMut() -> f32,
    ) -> Option<Pos3> {
        if x1 <= x0 || z1 <= z0 {
            return None;
        }
        for _ in 0..tries {
            let x = x0 + (rng().clamp(0.0, 0.999) * (x1 - x0) as f32) as u32;
            let z = z0 + (rng().clamp(0.0, 0.999) * (z1 - z0) as f32) as u32;
            if x + x_size > self.width_tiles || z + z_size > self.height_tiles {
                continue;
            }
            if self.can_build_at(x, z, x_size, z_size, water) {
                let pos = self.tile_to_pos(x, z);
                if engine.can_build_at(def, pos) {
                    return Some(pos);
                }
            }
        }
        None
    }

    fn tile_to_pos(&self, x: u32, z: u32) -> Pos3 {
        Pos3::new(x as f32, 0.0, z as f32)
    }

    fn edge_distance(&self, x: u32, z: u32) -> f32 {
        let dx = x.min(self.width_tiles.saturating_sub(x));
        let dz = z.min(self.height_tiles.saturating_sub(z));
        dx.min(dz) as f32
    }

    fn plateau_value(&self, x: u32, z: u32) -> f32 {
        let qx = (x / 4).min(self.quarter_width - 1);
        let qz = (z / 4).min(self.quarter_height - 1);
        self.plateau_map[self.qidx(qx, qz)]
    }

    fn defence_at(&self, t: TargetType, x: u32, z: u32) -> f32 {
        let qx = (x / 4).min(self.quarter_width - 1);
        let qz = (z / 4).min(self.quarter_height - 1);
        self.defence_map[t.index()][self.qidx(qx, qz)]
    }

    /// Continent id that the given build-tile position lies on.
    #[must_use]
    pub fn continent_at(&self, x: u32, z: u32) -> u32 {
        let qx = (x / 4).min(self.quarter_width - 1);
        let qz = (z / 4).min(self.quarter_height - 1);
        let v = self.continent_map[self.qidx(qx, qz)];
        if v < 0 {
            u32::MAX
        } else {
            v as u32
        }
    }

    #[must_use]
    pub fn continent(&self, id: u32) -> Option<&Continent> {
        self.continents.iter().find(|c| c.id == id)
    }

    /// Mark footprint tiles Occupied; for factories also reserve an exit
    /// corridor and run anti-crowding row/column blocking (spec §4.B).
    pub fn block_building(&mut self, x: u32, z: u32, x_size: u32, z_size: u32, water: bool, cfg: &AaiConfig, is_factory: bool) {
        for zz in z..(z + z_size).min(self.height_tiles) {
            for xx in x..(x + x_size).min(self.width_tiles) {
                let i = self.idx(xx, zz);
                let tile = &mut self.buildmap[i];
                tile.clear(BuildTile::FREE);
                tile.set(BuildTile::OCCUPIED);
                if water {
                    tile.set(BuildTile::WATER);
                }
            }
        }
        if is_factory {
            let exit_x0 = x + x_size;
            let exit_x1 = (exit_x0 + cfg.x_space).min(self.width_tiles);
            let exit_z1 = ((z_size as f32 * 1.5) as u32 + z).min(self.height_tiles);
            self.add_block(exit_x0, z, exit_x1.saturating_sub(exit_x0), exit_z1.saturating_sub(z));
        }
        self.run_anti_crowding(x, z, x_size, z_size, cfg);
    }

    /// Inverse of [`Map::block_building`].
    pub fn unblock_building(&mut self, x: u32, z: u32, x_size: u32, z_size: u32) {
        for zz in z..(z + z_size).min(self.height_tiles) {
            for xx in x..(x + x_size).min(self.width_tiles) {
                let i = self.idx(xx, zz);
                let tile = &mut self.buildmap[i];
                tile.clear(BuildTile::OCCUPIED);
                tile.set(BuildTile::FREE);
            }
        }
    }

    /// Reference-counted BlockedSpace reservation; overlapping blockers
    /// don't free each other prematurely (spec invariant I4).
    pub fn add_block(&mut self, x: u32, z: u32, w: u32, h: u32) {
        for zz in z..(z + h).min(self.height_tiles) {
            for xx in x..(x + w).min(self.width_tiles) {
                let i = self.idx(xx, zz);
                if self.block_refcount[i] == 0 {
                    self.buildmap[i].clear(BuildTile::FREE);
                    self.buildmap[i].set(BuildTile::BLOCKED);
                }
                self.block_refcount[i] += 1;
            }
        }
    }

    /// Release a previously-added block. Only frees the tile once the
    /// refcount drops to zero.
    pub fn remove_block(&mut self, x: u32, z: u32, w: u32, h: u32) {
        for zz in z..(z + h).min(self.height_tiles) {
            for xx in x..(x + w).min(self.width_tiles) {
                let i = self.idx(xx, zz);
                if self.block_refcount[i] > 0 {
                    self.block_refcount[i] -= 1;
                }
                if self.block_refcount[i] == 0 {
                    self.buildmap[i].clear(BuildTile::BLOCKED);
                    self.buildmap[i].set(BuildTile::FREE);
                }
            }
        }
    }

    fn run_anti_crowding(&mut self, x: u32, z: u32, x_size: u32, z_size: u32, cfg: &AaiConfig) {
        // Count the occupied run through the new building's row/column; if
        // it would exceed MAX_XROW/MAX_YROW, insert a blocked corridor
        // directly after the new footprint on that axis.
        let row_run = self.occupied_run_horizontal(z, x + x_size);
        if row_run >= cfg.max_xrow {
            self.add_block(x + x_size, z, cfg.x_space, z_size);
        }
        let col_run = self.occupied_run_vertical(x, z + z_size);
        if col_run >= cfg.max_yrow {
            self.add_block(x, z + z_size, x_size, cfg.y_space);
        }
    }

    fn occupied_run_horizontal(&self, z: u32, from_x: u32) -> u32 {
        if z >= self.height_tiles {
            return 0;
        }
        let mut run = 0;
        let mut x = from_x;
        while x > 0 && x - 1 < self.width_tiles {
            x -= 1;
            if self.buildmap[self.idx(x, z)].has(BuildTile::OCCUPIED) {
                run += 1;
            } else {
                break;
            }
        }
        run
    }

    fn occupied_run_vertical(&self, x: u32, from_z: u32) -> u32 {
        if x >= self.width_tiles {
            return 0;
        }
        let mut run = 0;
        let mut z = from_z;
        while z > 0 && z - 1 < self.height_tiles {
            z -= 1;
            if self.buildmap[self.idx(x, z)].has(BuildTile::OCCUPIED) {
                run += 1;
            } else {
                break;
            }
        }
        run
    }

    /// Add static-defence influence within `range` of `pos`, plus a large
    /// anti-clustering constant in a tight 5x5 square (spec §4.B).
    pub fn add_defence(&mut self, target_type: TargetType, x: u32, z: u32, range: f32, combat_power: f32) {
        self.apply_defence_disc(target_type, x, z, range, combat_power, 1.0);
        self.apply_defence_square(target_type, x, z, 5000.0, 1.0);
    }

    /// Inverse of [`Map::add_defence`].
    pub fn remove_defence(&mut self, target_type: TargetType, x: u32, z: u32, range: f32, combat_power: f32) {
        self.apply_defence_disc(target_type, x, z, range, combat_power, -1.0);
        self.apply_defence_square(target_type, x, z, 5000.0, -1.0);
    }

    fn apply_defence_disc(&mut self, t: TargetType, x: u32, z: u32, range: f32, value: f32, sign: f32) {
        let qx0 = (x / 4) as i32;
        let qz0 = (z / 4) as i32;
        let qr = ((range / 4.0) as i32).max(1);
        for dz in -qr..=qr {
            for dx in -qr..=qr {
                if dx * dx + dz * dz > qr * qr {
                    continue;
                }
                let qx = qx0 + dx;
                let qz = qz0 + dz;
                if qx < 0 || qz < 0 || qx as u32 >= self.quarter_width || qz as u32 >= self.quarter_height {
                    continue;
                }
                let i = self.qidx(qx as u32, qz as u32);
                self.defence_map[t.index()][i] = (self.defence_map[t.index()][i] + sign * value).max(0.0);
            }
        }
    }

    fn apply_defence_square(&mut self, t: TargetType, x: u32, z: u32, value: f32, sign: f32) {
        let qx0 = (x / 4) as i32;
        let qz0 = (z / 4) as i32;
        for dz in -2..=2 {
            for dx in -2..=2 {
                let qx = qx0 + dx;
                let qz = qz0 + dz;
                if qx < 0 || qz < 0 || qx as u32 >= self.quarter_width || qz as u32 >= self.quarter_height {
                    continue;
                }
                let i = self.qidx(qx as u32, qz as u32);
                self.defence_map[t.index()][i] = (self.defence_map[t.index()][i] + sign * value).max(0.0);
            }
        }
    }

    /// Sum of defence influence for a target type across a sector rectangle
    /// (used by [`crate::threat_map::ThreatMap`]).
    #[must_use]
    pub fn defence_sum_in_sector(&self, t: TargetType, sector_x0: u32, sector_z0: u32, sector_w: u32, sector_h: u32) -> f32 {
        let qx0 = sector_x0 / 4;
        let qz0 = sector_z0 / 4;
        let qx1 = ((sector_x0 + sector_w) / 4).min(self.quarter_width);
        let qz1 = ((sector_z0 + sector_h) / 4).min(self.quarter_height);
        let mut sum = 0.0;
        for z in qz0..qz1 {
            for x in qx0..qx1 {
                sum += self.defence_map[t.index()][self.qidx(x, z)];
            }
        }
        sum
    }
}

fn slope_at(heightmap: &[f32], width: u32, height: u32, x: u32, z: u32) -> f32 {
    let here = heightmap[(z * width + x) as usize];
    let xn = (x + 4).min(width - 1);
    let zn = (z + 4).min(height - 1);
    let dx = heightmap[(z * width + xn) as usize] - here;
    let dz = heightmap[(zn * width + x) as usize] - here;
    dx.abs().max(dz.abs())
}

fn compute_plateau_map(heightmap: &[f32], width: u32, height: u32, qw: u32, qh: u32) -> Vec<f32> {
    let mut out = vec![0.0; (qw * qh) as usize];
    const WINDOW: i32 = 6;
    for qz in 0..qh {
        for qx in 0..qw {
            let x = (qx * 4).min(width - 1);
            let z = (qz * 4).min(height - 1);
            let own = heightmap[(z * width + x) as usize];
            let mut sum = 0.0;
            for dz in -WINDOW..=WINDOW {
                for dx in -WINDOW..=WINDOW {
                    let sx = x as i32 + dx;
                    let sz = z as i32 + dz;
                    if sx < 0 || sz < 0 || sx as u32 >= width || sz as u32 >= height {
                        continue;
                    }
                    sum += heightmap[(sz as u32 * width + sx as u32) as usize] - own;
                }
            }
            out[(qz * qw + qx) as usize] = sum;
        }
    }
    out
}

fn compute_continents(
    heightmap: &[f32],
    width: u32,
    height: u32,
    qw: u32,
    qh: u32,
    non_amphib_max_waterdepth: f32,
) -> (Vec<i32>, Vec<Continent>, ContinentStats) {
    let mut map = vec![-1i32; (qw * qh) as usize];
    let mut continents = Vec::new();
    let mut next_id = 0u32;

    let sample_h = |qx: u32, qz: u32| -> f32 {
        let x = (qx * 4).min(width - 1);
        let z = (qz * 4).min(height - 1);
        heightmap[(z * width + x) as usize]
    };

    // Pass 1: land continents, flood-filling through bridgeable shallow
    // water without crediting those tiles to the continent.
    for start_z in 0..qh {
        for start_x in 0..qw {
            let idx = (start_z * qw + start_x) as usize;
            if map[idx] != -1 {
                continue;
            }
            let h = sample_h(start_x, start_z);
            if h <= 0.0 {
                continue;
            }
            let id = next_id;
            next_id += 1;
            let mut size = 0u32;
            let mut stack = vec![(start_x, start_z)];
            let mut visited = vec![false; (qw * qh) as usize];
            visited[idx] = true;
            while let Some((x, z)) = stack.pop() {
                let i = (z * qw + x) as usize;
                let th = sample_h(x, z);
                if th > 0.0 {
                    if map[i] == -1 {
                        map[i] = id as i32;
                        size += 1;
                    }
                } else if th < -non_amphib_max_waterdepth {
                    continue;
                }
                for (dx, dz) in [(-1i32, 0i32), (1, 0), (0, -1), (0, 1)] {
                    let nx = x as i32 + dx;
                    let nz = z as i32 + dz;
                    if nx < 0 || nz < 0 || nx as u32 >= qw || nz as u32 >= qh {
                        continue;
                    }
                    let (nx, nz) = (nx as u32, nz as u32);
                    let ni = (nz * qw + nx) as usize;
                    if visited[ni] {
                        continue;
                    }
                    visited[ni] = true;
                    stack.push((nx, nz));
                }
            }
            if size > 0 {
                continents.push(Continent { id, size_in_tiles: size, water: false });
            }
        }
    }

    // Pass 2: water continents over tiles still unmarked.
    for start_z in 0..qh {
        for start_x in 0..qw {
            let idx = (start_z * qw + start_x) as usize;
            if map[idx] != -1 {
                continue;
            }
            let h = sample_h(start_x, start_z);
            if h > 0.0 {
                continue;
            }
            let id = next_id;
            next_id += 1;
            let mut size = 0u32;
            let mut stack = vec![(start_x, start_z)];
            let mut visited = vec![false; (qw * qh) as usize];
            visited[idx] = true;
            while let Some((x, z)) = stack.pop() {
                let i = (z * qw + x) as usize;
                let th = sample_h(x, z);
                if th <= 0.0 && map[i] == -1 {
                    map[i] = id as i32;
                    size += 1;
                } else if th > 0.0 {
                    continue;
                }
                for (dx, dz) in [(-1i32, 0i32), (1, 0), (0, -1), (0, 1)] {
                    let nx = x as i32 + dx;
                    let nz = z as i32 + dz;
                    if nx < 0 || nz < 0 || nx as u32 >= qw || nz as u32 >= qh {
                        continue;
                    }
                    let (nx, nz) = (nx as u32, nz as u32);
                    let ni = (nz * qw + nx) as usize;
                    if visited[ni] {
                        continue;
                    }
                    visited[ni] = true;
                    stack.push((nx, nz));
                }
            }
            if size > 0 {
                continents.push(Continent { id, size_in_tiles: size, water: true });
            }
        }
    }

    let mut stats = ContinentStats::default();
    let land_sizes: Vec<u32> = continents.iter().filter(|c| !c.water).map(|c| c.size_in_tiles).collect();
    let water_sizes: Vec<u32> = continents.iter().filter(|c| c.water).map(|c| c.size_in_tiles).collect();
    stats.land_continents = land_sizes.len() as u32;
    stats.water_continents = water_sizes.len() as u32;
    if !land_sizes.is_empty() {
        stats.min_land = *land_sizes.iter().min().unwrap();
        stats.max_land = *land_sizes.iter().max().unwrap();
        stats.avg_land = land_sizes.iter().sum::<u32>() / land_sizes.len() as u32;
    }
    if !water_sizes.is_empty() {
        stats.min_water = *water_sizes.iter().min().unwrap();
        stats.max_water = *water_sizes.iter().max().unwrap();
        stats.avg_water = water_sizes.iter().sum::<u32>() / water_sizes.len() as u32;
    }

    (map, continents, stats)
}

/// Windowed-sum metal-spot discovery (spec §3 `MetalSpot` algorithm).
fn discover_metal_spots(
    metal_map: &[f32],
    width: u32,
    height: u32,
    max_metal: f32,
    extractor_radius: f32,
    _heightmap: &[f32],
) -> (Vec<MetalSpot>, bool) {
    if max_metal <= 0.0 || metal_map.is_empty() {
        return (Vec::new(), false);
    }
    let r = extractor_radius.max(1.0);
    let ri = r.ceil() as i32;

    let idx = |x: i32, z: i32| -> Option<usize> {
        if x < 0 || z < 0 || x as u32 >= width || z as u32 >= height {
            None
        } else {
            Some((z as u32 * width + x as u32) as usize)
        }
    };

    let disc_sum = |center_x: i32, center_z: i32, map: &[f32]| -> f32 {
        let mut sum = 0.0;
        for dz in -ri..=ri {
            for dx in -ri..=ri {
                if (dx * dx + dz * dz) as f32 > r * r {
                    continue;
                }
                if let Some(i) = idx(center_x + dx, center_z + dz) {
                    sum += map[i];
                }
            }
        }
        sum
    };

    let mut working = metal_map.to_vec();
    let threshold = max_metal * METAL_SPOT_FRACTION_OF_MAX;
    let mut spots = Vec::new();

    loop {
        let mut best = (0usize, 0usize, f32::MIN);
        for z in 0..height {
            for x in 0..width {
                let v = disc_sum(x as i32, z as i32, &working);
                if v > best.2 {
                    best = (x as usize, z as usize, v);
                }
            }
        }
        if best.2 < threshold {
            break;
        }
        let (bx, bz, amount) = best;
        spots.push(MetalSpot {
            pos: Pos3::new(bx as f32, 0.0, bz as f32),
            amount,
            occupied: false,
            extractor_unit: None,
            extractor_def: None,
        });
        // Zero out the committed disc, then re-sum discs within 2*radius.
        for dz in -ri..=ri {
            for dx in -ri..=ri {
                if (dx * dx + dz * dz) as f32 > r * r {
                    continue;
                }
                if let Some(i) = idx(bx as i32 + dx, bz as i32 + dz) {
                    working[i] = 0.0;
                }
            }
        }
        if spots.len() > MAX_ACCEPTED_METAL_SPOTS {
            return (Vec::new(), true);
        }
    }

    let flag = spots.len() > MAX_ACCEPTED_METAL_SPOTS;
    if flag {
        (Vec::new(), true)
    } else {
        (spots, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeEngine;

    #[test]
    fn can_build_at_rejects_occupied() {
        let engine = FakeEngine::two_side_toy();
        let cfg = AaiConfig::default();
        let mut map = Map::analyze(&engine, &cfg, 16);
        assert!(map.can_build_at(0, 0, 2, 2, false));
        map.block_building(0, 0, 2, 2, false, &cfg, false);
        assert!(!map.can_build_at(0, 0, 2, 2, false));
    }

    #[test]
    fn block_unblock_round_trips_refcounts() {
        let engine = FakeEngine::two_side_toy();
        let cfg = AaiConfig::default();
        let mut map = Map::analyze(&engine, &cfg, 16);
        map.add_block(4, 4, 3, 3);
        map.add_block(4, 4, 3, 3);
        assert!(!map.can_build_at(4, 4, 1, 1, false));
        map.remove_block(4, 4, 3, 3);
        assert!(!map.can_build_at(4, 4, 1, 1, false));
        map.remove_block(4, 4, 3, 3);
        assert!(map.can_build_at(4, 4, 1, 1, false));
    }

    #[test]
    fn map_type_classifies_all_land_as_land_map() {
        let engine = FakeEngine::two_side_toy();
        let cfg = AaiConfig::default();
        let map = Map::analyze(&engine, &cfg, 16);
        assert_eq!(map.map_type, MapType::LandMap);
        assert!((map.water_ratio - 0.0).abs() < 1e-6);
    }

    #[test]
    fn defence_add_remove_clamps_at_zero() {
        let engine = FakeEngine::two_side_toy();
        let cfg = AaiConfig::default();
        let mut map = Map::analyze(&engine, &cfg, 16);
        map.add_defence(TargetType::Surface, 20, 20, 40.0, 10.0);
        let sum_after_add = map.defence_sum_in_sector(TargetType::Surface, 0, 0, 64, 64);
        assert!(sum_after_add > 0.0);
        map.remove_defence(TargetType::Surface, 20, 20, 40.0, 10.0);
        let sum_after_remove = map.defence_sum_in_sector(TargetType::Surface, 0, 0, 64, 64);
        assert!(sum_after_remove.abs() < 1e-3);
    }
}
