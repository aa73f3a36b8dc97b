//! Deterministic, callback-driven skirmish AI decision core.
//!
//! This crate holds no engine binding and performs no IO beyond the text
//! persistence helpers in [`persistence`]: every external fact (unit
//! catalog, map heightmap, current resources, live orders) is obtained
//! through the [`engine_api::EngineApi`] trait, and every decision is
//! produced synchronously from an [`root::AaiRoot`] method call. This
//! mirrors a dedicated server's simulation core: no background threads, no
//! shared mutable state, one [`root::AaiRoot`] instance per game owning a
//! private PRNG stream.
#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]

pub mod air_force_manager;
pub mod attack;
pub mod attack_manager;
pub mod brain;
pub mod build_task;
pub mod build_tree;
pub mod config;
pub mod constructor;
pub mod engine_api;
pub mod error;
pub mod executor;
pub mod group;
pub mod map;
pub mod persistence;
pub mod root;
pub mod sector;
pub mod threat_map;
pub mod types;
pub mod unit_table;

#[cfg(test)]
mod test_support;

/// Convenience re-exports for callers wiring this crate into a host engine.
pub mod prelude {
    pub use crate::config::AaiConfig;
    pub use crate::engine_api::{EngineApi, EngineCommand, OrderOptions, UnitDef, WeaponInfo};
    pub use crate::error::{AaiError, AaiResult};
    pub use crate::root::AaiRoot;
    pub use crate::types::{CombatPower, GamePhase, MovementType, Pos3, TargetType, UnitCategory, UnitDefId, UnitId, UnitType};
}
