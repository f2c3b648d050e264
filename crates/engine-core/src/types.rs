use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// OHLCV bar as delivered by the market-data port.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bar {
    pub open_time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub tick_volume: f64,
}

/// Best bid/ask snapshot.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Tick {
    pub bid: f64,
    pub ask: f64,
}

impl Tick {
    /// Current spread expressed in pips for the given pip value.
    pub fn spread_pips(&self, pip_value: f64) -> f64 {
        if pip_value > 0.0 {
            (self.ask - self.bid) / pip_value
        } else {
            0.0
        }
    }
}

/// Bar granularity requested from the market-data port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    M5,
    M30,
    H1,
    H4,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Buy,
    Sell,
}

impl Direction {
    pub fn opposite(&self) -> Self {
        match self {
            Direction::Buy => Direction::Sell,
            Direction::Sell => Direction::Buy,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Buy => "BUY",
            Direction::Sell => "SELL",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignalSource {
    Pattern,
    Learned,
}

/// A directional trade signal with a 0-100 confidence score.
/// `direction: None` always carries confidence 0.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Signal {
    pub direction: Option<Direction>,
    pub confidence: f64,
    pub source: SignalSource,
}

impl Signal {
    pub fn new(direction: Direction, confidence: f64, source: SignalSource) -> Self {
        Self {
            direction: Some(direction),
            confidence: confidence.clamp(0.0, 100.0),
            source,
        }
    }

    pub fn none(source: SignalSource) -> Self {
        Self {
            direction: None,
            confidence: 0.0,
            source,
        }
    }

    pub fn is_actionable(&self) -> bool {
        self.direction.is_some()
    }
}

/// Derived indicator snapshot for the most recent bar of a window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub price_range: f64,
    pub volume_ratio: f64,
    pub rsi: f64,
    pub trend_flag: f64,
    pub atr: f64,
    pub macd: f64,
    pub macd_signal: f64,
}

impl Default for FeatureVector {
    /// Neutral defaults used when a window is too short to compute indicators.
    fn default() -> Self {
        Self {
            price_range: 0.0,
            volume_ratio: 1.0,
            rsi: 50.0,
            trend_flag: 0.0,
            atr: 0.0,
            macd: 0.0,
            macd_signal: 0.0,
        }
    }
}

/// Distinguishes short-horizon scalps (enforced max holding time) from
/// standard trades.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionTag {
    Scalp,
    Trade,
}

impl PositionTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            PositionTag::Scalp => "Scalp",
            PositionTag::Trade => "Trade",
        }
    }
}

/// Broker-owned open position; the engine holds a read/track view only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub ticket: u64,
    pub symbol: String,
    pub direction: Direction,
    pub volume: f64,
    pub entry_price: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub open_time: DateTime<Utc>,
    pub tag: PositionTag,
    pub profit: f64,
}

impl Position {
    /// Floating profit expressed in pips, measured against the closable price
    /// (bid for longs, ask for shorts).
    pub fn profit_pips(&self, tick: &Tick, pip_value: f64) -> f64 {
        if pip_value <= 0.0 {
            return 0.0;
        }
        match self.direction {
            Direction::Buy => (tick.bid - self.entry_price) / pip_value,
            Direction::Sell => (self.entry_price - tick.ask) / pip_value,
        }
    }
}

/// Account snapshot, read once per cycle and never cached beyond it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AccountState {
    pub balance: f64,
    pub equity: f64,
    pub free_margin: f64,
    pub open_profit: f64,
}

/// Per-day trading counters; reset on UTC day rollover, mutated only by the
/// closure-detection path.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DailyStats {
    pub day: NaiveDate,
    pub total_trades: u32,
    pub wins: u32,
    pub losses: u32,
    pub daily_profit: f64,
    pub daily_loss: f64,
}

impl DailyStats {
    pub fn for_day(day: NaiveDate) -> Self {
        Self {
            day,
            total_trades: 0,
            wins: 0,
            losses: 0,
            daily_profit: 0.0,
            daily_loss: 0.0,
        }
    }

    /// Fold one confirmed closure into the counters.
    pub fn record_close(&mut self, profit: f64) {
        self.total_trades += 1;
        if profit > 0.0 {
            self.wins += 1;
            self.daily_profit += profit;
        } else {
            self.losses += 1;
            self.daily_loss += profit.abs();
        }
    }

    /// Accumulated daily loss as a percentage of the given balance.
    pub fn loss_percent(&self, balance: f64) -> f64 {
        if balance > 0.0 {
            (self.daily_loss / balance) * 100.0
        } else {
            0.0
        }
    }
}
