//! Hand-rolled plain-text persistence formats (spec §6): combat-power /
//! attacked-by learning, map cache, continent data, and sector learning.
//! Each format is a magic line (`NAME VERSION`) followed by
//! whitespace-separated fields, one record per line. Chosen over
//! serde+ron/bincode because the host engine's own data directory
//! convention for this AI is plain text it may hand-edit or diff, and
//! round-trips must stay bit-identical to 1e-4 (spec invariant I9), which a
//! fixed `{:.6}` float format trivially satisfies.

use std::fmt::Write as _;

use crate::build_tree::BuildTree;
use crate::error::{AaiError, AaiResult};
use crate::map::MapType;
use crate::sector::{Sector, SectorCoord};
use crate::types::{GamePhase, TargetType, UnitDefId};

const COMBAT_LEARN_MAGIC: &str = "AAI_COMBAT_LEARN";
const COMBAT_LEARN_VERSION: u32 = 1;
const MAP_CACHE_MAGIC: &str = "AAI_MAP_CACHE";
const MAP_CACHE_VERSION: u32 = 1;
const CONTINENT_MAGIC: &str = "AAI_CONTINENT_DATA";
const CONTINENT_VERSION: u32 = 1;
const SECTOR_LEARN_MAGIC: &str = "AAI_SECTOR_LEARN";
const SECTOR_LEARN_VERSION: u32 = 1;

fn parse_magic(path: &str, line: &str, expected_magic: &str, expected_version: u32) -> AaiResult<()> {
    let mut parts = line.split_whitespace();
    let magic = parts.next().ok_or_else(|| AaiError::Parse {
        path: path.into(),
        message: "empty file".into(),
    })?;
    if magic != expected_magic {
        return Err(AaiError::Parse {
            path: path.into(),
            message: format!("expected magic '{expected_magic}', found '{magic}'"),
        });
    }
    let version: u32 = parts
        .next()
        .and_then(|v| v.parse().ok())
        .ok_or_else(|| AaiError::Parse {
            path: path.into(),
            message: "missing or invalid version field".into(),
        })?;
    if version != expected_version {
        return Err(AaiError::CacheVersionMismatch {
            file: path.into(),
            expected: expected_version.to_string(),
            found: version.to_string(),
        });
    }
    Ok(())
}

fn parse_floats(path: &str, lineno: usize, fields: &[&str], start: usize, count: usize) -> AaiResult<Vec<f32>> {
    fields[start..start + count]
        .iter()
        .map(|s| {
            s.parse::<f32>().map_err(|_| AaiError::Parse {
                path: path.into(),
                message: format!("line {}: expected a number, found '{s}'", lineno + 1),
            })
        })
        .collect()
}

/// Write the combat-power table and attacked-by-rates table for every
/// known unit def (spec §6 format 1).
#[must_use]
pub fn write_combat_learn(build_tree: &BuildTree, defs: &[(UnitDefId, &str)], sector_rates: &[[[f32; 5]; GamePhase::COUNT]; MapType::COUNT]) -> String {
    let mut out = String::new();
    writeln!(out, "{COMBAT_LEARN_MAGIC} {COMBAT_LEARN_VERSION}").unwrap();
    for &(id, name) in defs {
        let cp = build_tree.combat_power(id).raw();
        writeln!(
            out,
            "{name} {:.6} {:.6} {:.6} {:.6} {:.6}",
            cp[0], cp[1], cp[2], cp[3], cp[4]
        )
        .unwrap();
    }
    for (map_type_idx, per_phase) in sector_rates.iter().enumerate() {
        for (phase_idx, rates) in per_phase.iter().enumerate() {
            writeln!(
                out,
                "ATTACKED_BY {map_type_idx} {phase_idx} {:.6} {:.6} {:.6} {:.6} {:.6}",
                rates[0], rates[1], rates[2], rates[3], rates[4]
            )
            .unwrap();
        }
    }
    out
}

/// Parsed combat-learn file: per-name combat power rows and the attacked-by
/// table, applied back onto a live [`BuildTree`]/sector set by the caller.
#[derive(Debug, Default)]
pub struct CombatLearnData {
    pub combat_power: Vec<(String, [f32; 5])>,
    pub attacked_by: [[[f32; 5]; GamePhase::COUNT]; MapType::COUNT],
}

pub fn parse_combat_learn(path: &str, text: &str) -> AaiResult<CombatLearnData> {
    let mut lines = text.lines().enumerate();
    let (_, first) = lines.next().ok_or_else(|| AaiError::Parse {
        path: path.into(),
        message: "empty file".into(),
    })?;
    parse_magic(path, first, COMBAT_LEARN_MAGIC, COMBAT_LEARN_VERSION)?;

    let mut data = CombatLearnData::default();
    for (lineno, line) in lines {
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields[0] == "ATTACKED_BY" {
            if fields.len() != 8 {
                return Err(AaiError::Parse {
                    path: path.into(),
                    message: format!("line {}: ATTACKED_BY needs 7 fields", lineno + 1),
                });
            }
            let map_type: usize = fields[1].parse().map_err(|_| AaiError::Parse {
                path: path.into(),
                message: format!("line {}: invalid map type index", lineno + 1),
            })?;
            let phase: usize = fields[2].parse().map_err(|_| AaiError::Parse {
                path: path.into(),
                message: format!("line {}: invalid phase index", lineno + 1),
            })?;
            if map_type >= MapType::COUNT || phase >= GamePhase::COUNT {
                return Err(AaiError::Parse {
                    path: path.into(),
                    message: format!("line {}: index out of range", lineno + 1),
                });
            }
            let vals = parse_floats(path, lineno, &fields, 3, 5)?;
            data.attacked_by[map_type][phase].copy_from_slice(&vals);
        } else {
            if fields.len() != 6 {
                return Err(AaiError::Parse {
                    path: path.into(),
                    message: format!("line {}: expected 'name cp0..cp4'", lineno + 1),
                });
            }
            let vals = parse_floats(path, lineno, &fields, 1, 5)?;
            let mut arr = [0.0f32; 5];
            arr.copy_from_slice(&vals);
            data.combat_power.push((fields[0].to_string(), arr));
        }
    }
    Ok(data)
}

/// Write the map cache (spec §6 format 2): a per-map-checksum-keyed record
/// of the derived continent count and water ratio, so re-analysis can be
/// skipped on a map already seen this install.
#[must_use]
pub fn write_map_cache(checksum: u64, water_ratio: f32, map_type: MapType, land_continents: u32, water_continents: u32) -> String {
    let mut out = String::new();
    writeln!(out, "{MAP_CACHE_MAGIC} {MAP_CACHE_VERSION}").unwrap();
    writeln!(
        out,
        "{checksum} {:.6} {} {land_continents} {water_continents}",
        water_ratio,
        map_type.index()
    )
    .unwrap();
    out
}

#[derive(Debug, Clone, Copy)]
pub struct MapCacheData {
    pub checksum: u64,
    pub water_ratio: f32,
    pub map_type: MapType,
    pub land_continents: u32,
    pub water_continents: u32,
}

pub fn parse_map_cache(path: &str, text: &str) -> AaiResult<MapCacheData> {
    let mut lines = text.lines();
    let first = lines.next().ok_or_else(|| AaiError::Parse {
        path: path.into(),
        message: "empty file".into(),
    })?;
    parse_magic(path, first, MAP_CACHE_MAGIC, MAP_CACHE_VERSION)?;
    let data_line = lines.next().ok_or_else(|| AaiError::Parse {
        path: path.into(),
        message: "missing data line".into(),
    })?;
    let fields: Vec<&str> = data_line.split_whitespace().collect();
    if fields.len() != 5 {
        return Err(AaiError::Parse {
            path: path.into(),
            message: "expected 5 fields on data line".into(),
        });
    }
    let checksum: u64 = fields[0].parse().map_err(|_| AaiError::Parse {
        path: path.into(),
        message: "invalid checksum".into(),
    })?;
    let water_ratio: f32 = fields[1].parse().map_err(|_| AaiError::Parse {
        path: path.into(),
        message: "invalid water ratio".into(),
    })?;
    let map_type_idx: usize = fields[2].parse().map_err(|_| AaiError::Parse {
        path: path.into(),
        message: "invalid map type".into(),
    })?;
    let map_type = match map_type_idx {
        0 => MapType::LandMap,
        1 => MapType::LandWaterMap,
        2 => MapType::WaterMap,
        _ => {
            return Err(AaiError::Parse {
                path: path.into(),
                message: "map type out of range".into(),
            })
        }
    };
    let land_continents: u32 = fields[3].parse().map_err(|_| AaiError::Parse {
        path: path.into(),
        message: "invalid land continent count".into(),
    })?;
    let water_continents: u32 = fields[4].parse().map_err(|_| AaiError::Parse {
        path: path.into(),
        message: "invalid water continent count".into(),
    })?;
    Ok(MapCacheData {
        checksum,
        water_ratio,
        map_type,
        land_continents,
        water_continents,
    })
}

/// Write per-continent tile counts (spec §6 format 3).
#[must_use]
pub fn write_continent_data(continents: &[(u32, u32, bool)]) -> String {
    let mut out = String::new();
    writeln!(out, "{CONTINENT_MAGIC} {CONTINENT_VERSION}").unwrap();
    for &(id, size, water) in continents {
        writeln!(out, "{id} {size} {}", u8::from(water)).unwrap();
    }
    out
}

pub fn parse_continent_data(path: &str, text: &str) -> AaiResult<Vec<(u32, u32, bool)>> {
    let mut lines = text.lines().enumerate();
    let (_, first) = lines.next().ok_or_else(|| AaiError::Parse {
        path: path.into(),
        message: "empty file".into(),
    })?;
    parse_magic(path, first, CONTINENT_MAGIC, CONTINENT_VERSION)?;
    let mut out = Vec::new();
    for (lineno, line) in lines {
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != 3 {
            return Err(AaiError::Parse {
                path: path.into(),
                message: format!("line {}: expected 'id size water'", lineno + 1),
            });
        }
        let id: u32 = fields[0].parse().map_err(|_| AaiError::Parse {
            path: path.into(),
            message: format!("line {}: invalid id", lineno + 1),
        })?;
        let size: u32 = fields[1].parse().map_err(|_| AaiError::Parse {
            path: path.into(),
            message: format!("line {}: invalid size", lineno + 1),
        })?;
        let water = fields[2] == "1";
        out.push((id, size, water));
    }
    Ok(out)
}

/// Write per-sector learned importance and attacked-by rates (spec §6
/// format 4).
#[must_use]
pub fn write_sector_learn(sectors: &[Sector]) -> String {
    let mut out = String::new();
    writeln!(out, "{SECTOR_LEARN_MAGIC} {SECTOR_LEARN_VERSION}").unwrap();
    for s in sectors {
        write!(out, "{} {} {:.6}", s.coord.x, s.coord.y, s.importance).unwrap();
        for phase in 0..GamePhase::COUNT {
            for t in TargetType::ALL {
                write!(out, " {:.6}", s.attacked_by_rates[phase][t.index()]).unwrap();
            }
        }
        writeln!(out).unwrap();
    }
    out
}

#[derive(Debug, Clone)]
pub struct SectorLearnRecord {
    pub coord: SectorCoord,
    pub importance: f32,
    pub attacked_by_rates: [[f32; 5]; GamePhase::COUNT],
}

pub fn parse_sector_learn(path: &str, text: &str) -> AaiResult<Vec<SectorLearnRecord>> {
    let mut lines = text.lines().enumerate();
    let (_, first) = lines.next().ok_or_else(|| AaiError::Parse {
        path: path.into(),
        message: "empty file".into(),
    })?;
    parse_magic(path, first, SECTOR_LEARN_MAGIC, SECTOR_LEARN_VERSION)?;
    let expected_fields = 3 + GamePhase::COUNT * 5;
    let mut out = Vec::new();
    for (lineno, line) in lines {
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != expected_fields {
            return Err(AaiError::Parse {
                path: path.into(),
                message: format!("line {}: expected {expected_fields} fields, found {}", lineno + 1, fields.len()),
            });
        }
        let x: u32 = fields[0].parse().map_err(|_| AaiError::Parse {
            path: path.into(),
            message: format!("line {}: invalid x", lineno + 1),
        })?;
        let y: u32 = fields[1].parse().map_err(|_| AaiError::Parse {
            path: path.into(),
            message: format!("line {}: invalid y", lineno + 1),
        })?;
        let importance: f32 = fields[2].parse().map_err(|_| AaiError::Parse {
            path: path.into(),
            message: format!("line {}: invalid importance", lineno + 1),
        })?;
        let mut rates = [[0.0f32; 5]; GamePhase::COUNT];
        let vals = parse_floats(path, lineno, &fields, 3, GamePhase::COUNT * 5)?;
        for phase in 0..GamePhase::COUNT {
            rates[phase].copy_from_slice(&vals[phase * 5..phase * 5 + 5]);
        }
        out.push(SectorLearnRecord {
            coord: SectorCoord { x, y },
            importance,
            attacked_by_rates: rates,
        });
    }
    Ok(out)
}
