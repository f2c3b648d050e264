//! Daily-loss circuit breaker. Watches the shared daily counters and clears
//! the run flag once realized losses reach the configured share of balance.
//! The halt is sticky: only an operator reset re-arms trading.

use std::sync::Arc;

use engine_core::EngineContext;

pub struct CircuitBreaker {
    context: Arc<EngineContext>,
    max_daily_loss_percent: f64,
}

impl CircuitBreaker {
    pub fn new(context: Arc<EngineContext>, max_daily_loss_percent: f64) -> Self {
        Self {
            context,
            max_daily_loss_percent,
        }
    }

    pub fn max_daily_loss_percent(&self) -> f64 {
        self.max_daily_loss_percent
    }

    /// Record a closed trade and trip the breaker if the day's realized loss
    /// has reached the limit. Returns true when this call tripped it.
    pub fn record_close(&self, profit: f64, balance: f64) -> bool {
        let loss_percent = self.context.with_daily(|daily| {
            daily.record_close(profit);
            daily.loss_percent(balance)
        });

        if loss_percent >= self.max_daily_loss_percent && self.context.is_running() {
            self.context.set_running(false);
            tracing::warn!(
                loss_percent = format!("{loss_percent:.2}"),
                limit = self.max_daily_loss_percent,
                "daily loss limit reached, trading halted"
            );
            return true;
        }
        false
    }

    pub fn is_halted(&self) -> bool {
        !self.context.is_running()
    }

    /// Operator reset. Re-arms the run flag without touching the counters,
    /// so a further loss the same day trips immediately.
    pub fn reset(&self) {
        tracing::info!("circuit breaker reset by operator");
        self.context.set_running(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breaker(limit: f64) -> CircuitBreaker {
        CircuitBreaker::new(Arc::new(EngineContext::new()), limit)
    }

    #[test]
    fn trips_at_exact_threshold() {
        let b = breaker(5.0);
        // 50 lost on a 1000 balance is exactly 5%.
        assert!(b.record_close(-50.0, 1000.0));
        assert!(b.is_halted());
    }

    #[test]
    fn stays_armed_below_threshold() {
        let b = breaker(5.0);
        assert!(!b.record_close(-49.99, 1000.0));
        assert!(!b.is_halted());
    }

    #[test]
    fn profits_do_not_offset_the_loss_counter() {
        let b = breaker(5.0);
        b.record_close(-30.0, 1000.0);
        b.record_close(100.0, 1000.0);
        // daily_loss still 30; one more 20 loss reaches the limit.
        assert!(b.record_close(-20.0, 1000.0));
    }

    #[test]
    fn halt_persists_until_reset() {
        let b = breaker(5.0);
        b.record_close(-60.0, 1000.0);
        assert!(b.is_halted());
        // further closes do not re-arm, and report not-newly-tripped
        assert!(!b.record_close(10.0, 1000.0));
        assert!(b.is_halted());

        b.reset();
        assert!(!b.is_halted());
        // counters survive the reset, so the next recorded loss trips again
        assert!(b.record_close(-1.0, 1000.0));
    }
}
