// =============================================================================
// Aurum Intraday Engine - Main Entry Point
// =============================================================================
//
// Wires the collaborators together and drives one decision cycle per bar
// interval. Execution goes through the paper broker by default; live order
// routing is a drop-in OrderExecutor implementation.
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod broker;
mod config;
mod exit;
mod forecast;
mod gate;
mod indicators;
mod journal;
mod market_data;
mod ml;
mod orchestrator;
mod position;
mod signals;
mod types;

use std::sync::Arc;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::broker::{OrderExecutor, PaperBroker};
use crate::config::EngineConfig;
use crate::forecast::{EwmaVolatilityForecaster, TrendRegimeClassifier};
use crate::journal::{JsonlJournal, TradeJournal};
use crate::market_data::bridge::BridgeClient;
use crate::market_data::MarketData;
use crate::ml::exit_model::LogisticExitModel;
use crate::orchestrator::Engine;

const CONFIG_PATH: &str = "engine_config.json";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Aurum Intraday Engine starting up");

    let mut config = EngineConfig::load(CONFIG_PATH).unwrap_or_else(|e| {
        warn!(error = %e, "failed to load config, using defaults");
        EngineConfig::default()
    });

    if let Ok(symbol) = std::env::var("AURUM_SYMBOL") {
        let symbol = symbol.trim().to_uppercase();
        if !symbol.is_empty() {
            config.symbol = symbol;
        }
    }

    info!(
        symbol = %config.symbol,
        interval = %config.interval,
        window_bars = config.window_bars,
        "engine configured"
    );

    // ── 2. Collaborators ─────────────────────────────────────────────────
    let bridge_url = std::env::var("AURUM_BRIDGE_URL")
        .unwrap_or_else(|_| "http://127.0.0.1:8080".to_string());
    let api_key = std::env::var("AURUM_BRIDGE_KEY").unwrap_or_default();
    let api_secret = std::env::var("AURUM_BRIDGE_SECRET").unwrap_or_default();

    let market: Arc<dyn MarketData> = Arc::new(BridgeClient::new(bridge_url, api_key, api_secret));
    let broker: Arc<dyn OrderExecutor> = Arc::new(PaperBroker::new());
    let journal: Arc<dyn TradeJournal> = Arc::new(JsonlJournal::new(&config.journal_path));

    // ── 3. Engine assembly ───────────────────────────────────────────────
    let classifiers = ml::baseline::default_ensemble(&config);
    let mut engine = Engine::new(
        config.clone(),
        market,
        broker,
        journal,
        Box::new(EwmaVolatilityForecaster::default()),
        Box::new(TrendRegimeClassifier::default()),
        classifiers,
        Box::new(LogisticExitModel::default()),
    );

    // ── 4. Cycle loop ────────────────────────────────────────────────────
    let interval_secs = config.interval_secs();
    let mut ticker = tokio::time::interval(tokio::time::Duration::from_secs(interval_secs));
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    info!(interval_secs, "cycle loop running, press Ctrl+C to stop");

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match engine.run_cycle().await {
                    Ok(report) => {
                        info!(
                            outcome = ?report.outcome,
                            label = report.decision_label.as_deref().unwrap_or("-"),
                            detail = report.detail.as_deref().unwrap_or("-"),
                            "cycle complete"
                        );
                    }
                    Err(e) => {
                        // A feature-schema mismatch is an operator problem:
                        // entries stay blocked until the packaging is fixed,
                        // but the open position keeps being managed.
                        error!(error = %e, "feature contract violation, check model packaging");
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                warn!("shutdown signal received, stopping between cycles");
                break;
            }
        }
    }

    // ── 5. Graceful shutdown ─────────────────────────────────────────────
    if let Err(e) = config.save(CONFIG_PATH) {
        error!(error = %e, "failed to save config on shutdown");
    }

    info!("Aurum Intraday Engine shut down complete");
    Ok(())
}
