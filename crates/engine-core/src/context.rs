use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, RwLock};

use chrono::Utc;

use crate::types::{AccountState, DailyStats, Position};

/// Tracked view of a broker-owned position, refreshed each supervisory pass.
#[derive(Debug, Clone)]
pub struct TrackedPosition {
    pub position: Position,
    /// Breakeven promotion already applied; repeated triggers are no-ops.
    pub breakeven_set: bool,
    pub last_profit: f64,
}

impl TrackedPosition {
    pub fn new(position: Position) -> Self {
        let last_profit = position.profit;
        Self {
            position,
            breakeven_set: false,
            last_profit,
        }
    }
}

/// Shared engine state passed explicitly to every component — no process-wide
/// singletons. The decision loop, the supervisory loop and the control
/// surface all hold an `Arc` to one instance.
///
/// Serialization rules: the tracked-position map has a single writer (the
/// supervisory path, after acknowledged broker responses, plus the executor
/// inserting new entries); `DailyStats` is mutated only by the
/// closure-detection path; the run flag is written by the circuit breaker and
/// the operator surface and read at the top of each decision tick.
pub struct EngineContext {
    run_flag: AtomicBool,
    daily: Mutex<DailyStats>,
    positions: RwLock<HashMap<u64, TrackedPosition>>,
    account: RwLock<Option<AccountState>>,
}

impl EngineContext {
    pub fn new() -> Self {
        Self {
            run_flag: AtomicBool::new(true),
            daily: Mutex::new(DailyStats::for_day(Utc::now().date_naive())),
            positions: RwLock::new(HashMap::new()),
            account: RwLock::new(None),
        }
    }

    pub fn is_running(&self) -> bool {
        self.run_flag.load(Ordering::SeqCst)
    }

    pub fn set_running(&self, running: bool) {
        self.run_flag.store(running, Ordering::SeqCst);
    }

    /// Run a closure against the daily counters, rolling them over first if
    /// the UTC day has changed.
    pub fn with_daily<R>(&self, f: impl FnOnce(&mut DailyStats) -> R) -> R {
        let mut daily = self.daily.lock().expect("daily stats lock poisoned");
        let today = Utc::now().date_naive();
        if daily.day != today {
            *daily = DailyStats::for_day(today);
        }
        f(&mut daily)
    }

    pub fn daily_snapshot(&self) -> DailyStats {
        self.with_daily(|d| *d)
    }

    pub fn track(&self, position: Position) {
        let mut map = self.positions.write().expect("position map lock poisoned");
        map.insert(position.ticket, TrackedPosition::new(position));
    }

    pub fn untrack(&self, ticket: u64) -> Option<TrackedPosition> {
        let mut map = self.positions.write().expect("position map lock poisoned");
        map.remove(&ticket)
    }

    pub fn tracked(&self) -> Vec<TrackedPosition> {
        let map = self.positions.read().expect("position map lock poisoned");
        map.values().cloned().collect()
    }

    pub fn tracked_count(&self, symbol: &str) -> usize {
        let map = self.positions.read().expect("position map lock poisoned");
        map.values().filter(|t| t.position.symbol == symbol).count()
    }

    /// Refresh the tracked view of a broker-reported position, adopting it
    /// if it was opened outside this process. Returns true on adoption.
    /// `breakeven_set` survives the refresh.
    pub fn update_or_adopt(&self, position: &Position) -> bool {
        let mut map = self.positions.write().expect("position map lock poisoned");
        match map.get_mut(&position.ticket) {
            Some(tracked) => {
                let breakeven_set = tracked.breakeven_set;
                tracked.position = position.clone();
                tracked.last_profit = position.profit;
                tracked.breakeven_set = breakeven_set;
                false
            }
            None => {
                map.insert(position.ticket, TrackedPosition::new(position.clone()));
                true
            }
        }
    }

    pub fn update_tracked(&self, ticket: u64, f: impl FnOnce(&mut TrackedPosition)) {
        let mut map = self.positions.write().expect("position map lock poisoned");
        if let Some(tracked) = map.get_mut(&ticket) {
            f(tracked);
        }
    }

    pub fn set_account(&self, state: AccountState) {
        let mut account = self.account.write().expect("account lock poisoned");
        *account = Some(state);
    }

    pub fn account(&self) -> Option<AccountState> {
        *self.account.read().expect("account lock poisoned")
    }
}

impl Default for EngineContext {
    fn default() -> Self {
        Self::new()
    }
}
