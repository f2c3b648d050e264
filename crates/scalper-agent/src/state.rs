//! Operator control surface: a snapshot of engine state plus runtime-tunable
//! knobs shared between the loops and whatever front end drives them.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use engine_core::{AccountState, DailyStats, EngineContext, Position};

/// Runtime-adjustable parameters, read by the loops each cycle. Floats are
/// stored as bits so readers never block a writer.
pub struct Tunables {
    risk_percentage: AtomicU64,
    confidence_floor: AtomicU64,
    scalping_enabled: AtomicBool,
}

impl Tunables {
    pub fn new(risk_percentage: f64, confidence_floor: f64) -> Self {
        Self {
            risk_percentage: AtomicU64::new(risk_percentage.to_bits()),
            confidence_floor: AtomicU64::new(confidence_floor.to_bits()),
            scalping_enabled: AtomicBool::new(true),
        }
    }

    pub fn risk_percentage(&self) -> f64 {
        f64::from_bits(self.risk_percentage.load(Ordering::SeqCst))
    }

    pub fn confidence_floor(&self) -> f64 {
        f64::from_bits(self.confidence_floor.load(Ordering::SeqCst))
    }

    pub fn scalping_enabled(&self) -> bool {
        self.scalping_enabled.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EngineState {
    pub running: bool,
    pub daily: DailyStats,
    pub positions: Vec<Position>,
    pub account: Option<AccountState>,
    pub risk_percentage: f64,
    pub confidence_floor: f64,
    pub scalping_enabled: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigUpdate {
    pub risk_percentage: Option<f64>,
    pub confidence_floor: Option<f64>,
    pub scalping_enabled: Option<bool>,
    pub run_flag: Option<bool>,
}

/// Handle given to the operator surface. Cloning is cheap; all clones see
/// the same engine.
#[derive(Clone)]
pub struct EngineHandle {
    context: Arc<EngineContext>,
    tunables: Arc<Tunables>,
}

impl EngineHandle {
    pub fn new(context: Arc<EngineContext>, tunables: Arc<Tunables>) -> Self {
        Self { context, tunables }
    }

    pub fn snapshot(&self) -> EngineState {
        EngineState {
            running: self.context.is_running(),
            daily: self.context.daily_snapshot(),
            positions: self
                .context
                .tracked()
                .into_iter()
                .map(|t| t.position)
                .collect(),
            account: self.context.account(),
            risk_percentage: self.tunables.risk_percentage(),
            confidence_floor: self.tunables.confidence_floor(),
            scalping_enabled: self.tunables.scalping_enabled(),
        }
    }

    /// Apply an operator update. `run_flag: true` is the external reset that
    /// re-arms a tripped circuit breaker.
    pub fn apply(&self, update: ConfigUpdate) {
        if let Some(risk) = update.risk_percentage {
            self.tunables
                .risk_percentage
                .store(risk.clamp(0.01, 100.0).to_bits(), Ordering::SeqCst);
            tracing::info!(risk_percentage = risk, "risk percentage updated");
        }
        if let Some(floor) = update.confidence_floor {
            self.tunables
                .confidence_floor
                .store(floor.clamp(0.0, 100.0).to_bits(), Ordering::SeqCst);
            tracing::info!(confidence_floor = floor, "confidence floor updated");
        }
        if let Some(enabled) = update.scalping_enabled {
            self.tunables
                .scalping_enabled
                .store(enabled, Ordering::SeqCst);
            tracing::info!(enabled, "scalping toggled");
        }
        if let Some(running) = update.run_flag {
            self.context.set_running(running);
            tracing::info!(running, "run flag updated by operator");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle() -> EngineHandle {
        EngineHandle::new(
            Arc::new(EngineContext::new()),
            Arc::new(Tunables::new(1.0, 30.0)),
        )
    }

    #[test]
    fn snapshot_reflects_defaults() {
        let state = handle().snapshot();
        assert!(state.running);
        assert!(state.positions.is_empty());
        assert!((state.risk_percentage - 1.0).abs() < 1e-9);
        assert!(state.scalping_enabled);
    }

    #[test]
    fn apply_updates_only_named_fields() {
        let h = handle();
        h.apply(ConfigUpdate {
            confidence_floor: Some(45.0),
            ..Default::default()
        });
        let state = h.snapshot();
        assert!((state.confidence_floor - 45.0).abs() < 1e-9);
        assert!((state.risk_percentage - 1.0).abs() < 1e-9);
    }

    #[test]
    fn run_flag_reset_rearms_a_halted_engine() {
        let h = handle();
        h.context.set_running(false);
        assert!(!h.snapshot().running);
        h.apply(ConfigUpdate {
            run_flag: Some(true),
            ..Default::default()
        });
        assert!(h.snapshot().running);
    }

    #[test]
    fn risk_update_is_clamped() {
        let h = handle();
        h.apply(ConfigUpdate {
            risk_percentage: Some(500.0),
            ..Default::default()
        });
        assert!((h.snapshot().risk_percentage - 100.0).abs() < 1e-9);
    }
}
