//! AttackManager component (spec §4.L): owns every [`Attack`], assembles new
//! ones out of idle [`crate::group::Group`]s rated against
//! [`crate::sector::Sector::attack_rating`], and retires finished or failed
//! ones each tick.

use crate::attack::{Attack, AttackState};
use crate::config::AaiConfig;
use crate::group::Group;
use crate::sector::{Sector, SectorCoord};

#[derive(Clone, Debug, Default)]
pub struct AttackManager {
    attacks: Vec<Attack>,
    next_id: usize,
}

impl AttackManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn active_count(&self) -> usize {
        self.attacks.iter().filter(|a| !a.is_terminal()).count()
    }

    /// Launch a new attack along a pre-built route if under the configured
    /// concurrency cap (spec §4.L). Groups are attached afterward via
    /// [`Attack::add_group`]; this is the low-level primitive `launch_from_groups`
    /// builds on.
    pub fn launch(&mut self, route: Vec<SectorCoord>, cfg: &AaiConfig) -> Option<usize> {
        if self.active_count() as u32 >= cfg.max_attacks {
            return None;
        }
        let id = self.next_id;
        self.next_id += 1;
        self.attacks.push(Attack::new(id, route));
        Some(id)
    }

    /// Assemble a new attack from the idle-group pool (spec §4.L): pick the
    /// highest-rated admissible sector as target, attach every available
    /// assault group, then attach up to one anti-air group, gated by
    /// `maxNumberOfAntiAirGroups = (maxSpotted_air < 0.2 ? 0 : 1)`.
    ///
    /// `at_rally_point`/`sufficient_attack_power` are supplied by the caller
    /// (root.rs has the live positions and combat-power tables); this
    /// manager only owns group/attack assignment, not unit state.
    pub fn launch_from_groups(
        &mut self,
        groups: &mut [Group],
        sectors: &[Sector],
        cfg: &AaiConfig,
        my_target_type_weights: &[f32; 5],
        at_rally_point: impl Fn(&Group) -> bool,
        sufficient_attack_power: impl Fn(&Group) -> bool,
        max_spotted_air_fraction: f32,
    ) -> Option<usize> {
        if self.active_count() as u32 >= cfg.max_attacks {
            return None;
        }

        let available: Vec<usize> = groups
            .iter()
            .enumerate()
            .filter(|(_, g)| g.is_available_for_attack(at_rally_point(g), sufficient_attack_power(g)))
            .map(|(i, _)| i)
            .collect();
        let (aa_indices, assault_indices): (Vec<usize>, Vec<usize>) =
            available.into_iter().partition(|&i| groups[i].is_pure_anti_air());
        if assault_indices.is_empty() {
            return None;
        }

        let target_coord = best_attack_target(sectors, my_target_type_weights, None)?;

        let id = self.next_id;
        self.next_id += 1;
        let mut attack = Attack::new(id, vec![target_coord]);
        for &i in &assault_indices {
            attack.add_group(&mut groups[i]);
        }
        let max_aa_groups = if max_spotted_air_fraction < 0.2 { 0 } else { 1 };
        for &i in aa_indices.iter().take(max_aa_groups) {
            attack.add_group(&mut groups[i]);
        }
        self.attacks.push(attack);
        Some(id)
    }

    /// Spec §4.L: once an attack clears its current sector, pick the next
    /// best-rated admissible sector to continue into (excluding the one just
    /// cleared).
    #[must_use]
    pub fn determine_sector_to_continue_attack(
        &self,
        attack_id: usize,
        sectors: &[Sector],
        my_target_type_weights: &[f32; 5],
    ) -> Option<SectorCoord> {
        let current = self.get(attack_id)?.current_destination();
        best_attack_target(sectors, my_target_type_weights, current)
    }

    #[must_use]
    pub fn get(&self, id: usize) -> Option<&Attack> {
        self.attacks.iter().find(|a| a.id == id)
    }

    #[must_use]
    pub fn get_mut(&mut self, id: usize) -> Option<&mut Attack> {
        self.attacks.iter_mut().find(|a| a.id == id)
    }

    /// Run each non-terminal attack's failure check against the given power
    /// lookup, advancing it along its route when it's winning its current
    /// sector. An attack that has lost every attached group fails outright
    /// (spec §4.L "no remaining combat groups"). Returns ids that
    /// transitioned to Failed this tick.
    pub fn tick(&mut self, mut power_at: impl FnMut(&Attack) -> (f32, f32)) -> Vec<usize> {
        let mut newly_failed = Vec::new();
        for attack in &mut self.attacks {
            if attack.is_terminal() {
                continue;
            }
            if attack.has_no_remaining_groups() {
                attack.state = AttackState::Failed;
                newly_failed.push(attack.id);
                continue;
            }
            let (own, enemy) = power_at(attack);
            if attack.check_if_failed(own, enemy) {
                newly_failed.push(attack.id);
            } else if own > enemy {
                attack.advance();
            }
        }
        newly_failed
    }

    /// Drop every terminal attack, freeing its slot for a future launch.
    pub fn retire_terminal(&mut self) -> Vec<usize> {
        let (keep, drop): (Vec<Attack>, Vec<Attack>) =
            self.attacks.drain(..).partition(|a| !a.is_terminal());
        self.attacks = keep;
        drop.iter().map(|a| a.id).collect()
    }

    #[must_use]
    pub fn attacks(&self) -> &[Attack] {
        &self.attacks
    }
}

/// Highest `Sector::attack_rating` among admissible sectors, excluding
/// `skip` (the sector an attack just cleared, when continuing an existing
/// route). Shared by `launch_from_groups` and
/// `determine_sector_to_continue_attack`.
fn best_attack_target(
    sectors: &[Sector],
    my_target_type_weights: &[f32; 5],
    skip: Option<SectorCoord>,
) -> Option<SectorCoord> {
    sectors
        .iter()
        .filter(|s| Some(s.coord) != skip)
        .map(|s| (s.coord, s.attack_rating(my_target_type_weights, s.distance_to_base as f32, true, true)))
        .filter(|(_, rating)| *rating > 0.0)
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(coord, _)| coord)
}
