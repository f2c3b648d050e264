use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::signal::unix::SignalKind;
use tokio::time;

use engine_core::{BrokerPort, EngineContext, Notifier, SymbolCatalog};
use ml_signaler::{BaselineClassifier, FeatureScaler, LearnedSignaler};
use risk_engine::CircuitBreaker;
use sim_broker::SimBroker;

mod config;
mod cycle;
mod executor;
mod fuser;
mod notify;
mod state;
mod supervisor;

use config::AgentConfig;
use cycle::DecisionEngine;
use executor::TradeExecutor;
use notify::{TelegramNotifier, TracingNotifier};
use state::{EngineHandle, Tunables};
use supervisor::PositionSupervisor;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let json_logging = std::env::var("RUST_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    if json_logging {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .init();
    }

    tracing::info!("Starting SMC scalper agent");

    let config = AgentConfig::from_env()?;
    tracing::info!("Configuration loaded and validated");
    tracing::info!("  Symbols: {}", config.symbols.join(", "));
    tracing::info!("  Timeframe: {:?}", config.timeframe);
    tracing::info!("  Risk per trade: {}%", config.risk_percentage);
    tracing::info!("  Max daily loss: {}%", config.max_daily_loss_percent);
    tracing::info!("  Confidence floor: {}", config.confidence_floor);
    tracing::info!("  Trend mode: {:?}", config.trend_mode);
    tracing::info!(
        "  Loop intervals: decision {}s, supervise {}s",
        config.decision_interval_seconds,
        config.supervise_interval_seconds
    );

    let catalog = Arc::new(match &config.symbol_catalog_path {
        Some(path) => {
            let json = std::fs::read_to_string(path)?;
            let catalog = SymbolCatalog::from_json(&json)?;
            tracing::info!("Symbol catalog loaded from {path} ({} symbols)", catalog.len());
            catalog
        }
        None => SymbolCatalog::builtin(),
    });
    for name in &config.symbols {
        if !catalog.contains(name) {
            anyhow::bail!("symbol {name} is not in the catalog");
        }
    }

    let paper_balance: f64 = std::env::var("PAPER_BALANCE")
        .unwrap_or_else(|_| "10000.0".to_string())
        .parse()?;
    let broker: Arc<dyn BrokerPort> = Arc::new(SimBroker::new(paper_balance));
    if broker.is_paper() {
        tracing::info!(
            "Paper trading mode ({}) with balance {paper_balance:.2}",
            broker.broker_name()
        );
    }

    let notifier: Arc<dyn Notifier> = if config.telegram_webhook_url.is_empty() {
        tracing::info!("No webhook configured, notifications go to the log");
        Arc::new(TracingNotifier)
    } else {
        tracing::info!("Telegram notifier ready");
        Arc::new(TelegramNotifier::new(config.telegram_webhook_url.clone()))
    };

    let context = Arc::new(EngineContext::new());
    let tunables = Arc::new(Tunables::new(
        config.risk_percentage,
        config.confidence_floor,
    ));
    let handle = EngineHandle::new(context.clone(), tunables.clone());

    let account = broker
        .get_account()
        .await
        .map_err(|e| anyhow::anyhow!("broker connectivity check failed: {e}"))?;
    context.set_account(account);
    tracing::info!(
        "Startup check: broker OK (balance {:.2}, equity {:.2})",
        account.balance,
        account.equity
    );

    let signaler = LearnedSignaler::new(Box::new(BaselineClassifier), FeatureScaler::identity())
        .with_floor(config.confidence_floor);
    let executor = TradeExecutor::new(broker.clone(), context.clone(), notifier.clone());
    let mut engine = DecisionEngine::new(
        broker.clone(),
        context.clone(),
        catalog.clone(),
        config.clone(),
        signaler,
        executor,
        tunables.clone(),
    );
    let supervisor = PositionSupervisor::new(
        broker.clone(),
        context.clone(),
        notifier.clone(),
        CircuitBreaker::new(context.clone(), config.max_daily_loss_percent),
        catalog.clone(),
        chrono::Duration::minutes(config.scalp_timeout_minutes),
    );

    tracing::info!(
        "Agent is now running. Deciding every {}s, supervising every {}s. Press Ctrl+C to stop.",
        config.decision_interval_seconds,
        config.supervise_interval_seconds
    );

    let mut decision_interval =
        time::interval(Duration::from_secs(config.decision_interval_seconds));
    let mut supervise_interval =
        time::interval(Duration::from_secs(config.supervise_interval_seconds));
    let mut sigterm = tokio::signal::unix::signal(SignalKind::terminate())?;
    let shutdown = async {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Received SIGINT");
            }
            _ = sigterm.recv() => {
                tracing::info!("Received SIGTERM");
            }
        }
    };
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = decision_interval.tick() => {
                if let Err(e) = engine.run_cycle().await {
                    tracing::error!(error = %e, "decision cycle failed");
                    notifier
                        .notify(&engine_core::TradeEvent::Error {
                            context: "decision cycle".into(),
                            detail: e.to_string(),
                        })
                        .await
                        .ok();
                }
            }
            _ = supervise_interval.tick() => {
                if let Err(e) = supervisor.run_pass().await {
                    tracing::error!(error = %e, "supervisory pass failed");
                }
            }
            _ = &mut shutdown => break,
        }
    }

    let final_state = handle.snapshot();
    tracing::info!(
        "Shutting down: {} open positions, {} trades today ({} wins / {} losses), daily P/L {:+.2}",
        final_state.positions.len(),
        final_state.daily.total_trades,
        final_state.daily.wins,
        final_state.daily.losses,
        final_state.daily.daily_profit - final_state.daily.daily_loss
    );
    Ok(())
}
