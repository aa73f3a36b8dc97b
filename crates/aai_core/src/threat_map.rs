//! ThreatMap component (spec §4.D): aggregates per-sector enemy combat
//! power and static-defence influence into a single lookup used by
//! pathing/target-selection decisions elsewhere.

use crate::map::Map;
use crate::sector::{Sector, SectorCoord};
use crate::types::TargetType;

/// Per-sector, per-target-type threat snapshot, rebuilt each time
/// [`ThreatMap::rebuild`] is called (spec's periodic Update schedule calls
/// this on its own cadence, distinct from Sector's finer-grained resets).
#[derive(Clone, Debug, Default)]
pub struct ThreatMap {
    width: u32,
    height: u32,
    /// `[target_type][sector index]`.
    threat: [Vec<f32>; 5],
}

impl ThreatMap {
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        let len = (width * height) as usize;
        ThreatMap {
            width,
            height,
            threat: [
                vec![0.0; len],
                vec![0.0; len],
                vec![0.0; len],
                vec![0.0; len],
                vec![0.0; len],
            ],
        }
    }

    fn idx(&self, coord: SectorCoord) -> usize {
        (coord.y * self.width + coord.x) as usize
    }

    /// Recompute every cell from current sector enemy power plus the map's
    /// defence influence (static defence radius bleeds threat into
    /// neighbouring sectors, unlike Sector's own-cell-only bookkeeping).
    pub fn rebuild(&mut self, sectors: &[Sector], map: &Map, sector_size: u32) {
        for t in TargetType::ALL {
            for v in &mut self.threat[t.index()] {
                *v = 0.0;
            }
        }
        for sector in sectors {
            let i = self.idx(sector.coord);
            for t in TargetType::ALL {
                let sx = sector.coord.x * sector_size;
                let sz = sector.coord.y * sector_size;
                let defence = map.defence_sum_in_sector(t, sx, sz, sector_size, sector_size);
                self.threat[t.index()][i] = sector.enemy_power(t) + defence;
            }
        }
    }

    /// Threat value at a sector for a given target type.
    #[must_use]
    pub fn at(&self, coord: SectorCoord, target_type: TargetType) -> f32 {
        if coord.x >= self.width || coord.y >= self.height {
            return f32::MAX;
        }
        self.threat[target_type.index()][self.idx(coord)]
    }

    /// Sum of threat across all target types at a sector, used for coarse
    /// "is this sector dangerous at all" checks.
    #[must_use]
    pub fn total_at(&self, coord: SectorCoord) -> f32 {
        TargetType::ALL.iter().map(|t| self.at(coord, *t)).sum()
    }

    /// Find the lowest-threat sector along a target-type dimension among the
    /// given candidates; used by pathing/retreat logic elsewhere.
    #[must_use]
    pub fn safest_of<'a>(&self, candidates: impl Iterator<Item = &'a SectorCoord>, target_type: TargetType) -> Option<SectorCoord> {
        candidates
            .map(|c| (*c, self.at(*c, target_type)))
            .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(c, _)| c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AaiConfig;
    use crate::test_support::FakeEngine;

    #[test]
    fn rebuild_reflects_sector_enemy_power() {
        let engine = FakeEngine::two_side_toy();
        let cfg = AaiConfig::default();
        let map = Map::analyze(&engine, &cfg, 16);
        let mut sectors = vec![Sector::new(SectorCoord { x: 0, y: 0 }, 0.0), Sector::new(SectorCoord { x: 1, y: 0 }, 0.0)];
        sectors[1].add_scouted_enemy_unit(TargetType::Surface, 42.0, false, 10);

        let mut tm = ThreatMap::new(2, 1);
        tm.rebuild(&sectors, &map, 16);
        assert!(tm.at(SectorCoord { x: 1, y: 0 }, TargetType::Surface) >= 42.0);
        assert_eq!(tm.at(SectorCoord { x: 0, y: 0 }, TargetType::Surface), 0.0);
    }

    #[test]
    fn out_of_bounds_is_maximally_threatening() {
        let tm = ThreatMap::new(2, 2);
        assert_eq!(tm.at(SectorCoord { x: 9, y: 9 }, TargetType::Surface), f32::MAX);
    }

    #[test]
    fn safest_of_picks_minimum() {
        let mut tm = ThreatMap::new(2, 1);
        tm.threat[TargetType::Surface.index()][0] = 5.0;
        tm.threat[TargetType::Surface.index()][1] = 1.0;
        let candidates = [SectorCoord { x: 0, y: 0 }, SectorCoord { x: 1, y: 0 }];
        let safest = tm.safest_of(candidates.iter(), TargetType::Surface).unwrap();
        assert_eq!(safest, SectorCoord { x: 1, y: 0 });
    }
}
