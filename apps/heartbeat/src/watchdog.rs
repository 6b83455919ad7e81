// [apps/heartbeat/src/watchdog.rs]
/*!
 * =================================================================
 * APARATO: POSITION WATCHDOG (V3.0 - EXITS BEFORE ENTRIES)
 * CLASIFICACIÓN: APPLICATION LAYER (ESTRATO L1)
 * RESPONSABILIDAD: MONITOREO DE POSICIONES Y DECISIONES DE SALIDA
 *
 * Reglas de salida, EN ORDEN:
 *  1. Stop-loss (-20%): salida total, crítica.
 *  2. Take-profit nivel 1 (+100%): salida del 50%.
 *  3. Take-profit nivel 2 (+400%): salida del 30%.
 *  4. Trailing stop (caída >=20% desde el pico, en ganancia): total.
 *  5. Decaimiento temporal (>=60 min con |PnL| < 5%): total.
 *  6. Drenaje de liquidez (>50% bajo la entrada): total.
 * La ejecución real del swap se difiere al modo live.
 * =================================================================
 */

use chrono::Utc;
use serde::Serialize;
use tracing::{info, instrument};

use boar_domain_models::TradeConfig;
use boar_infra_feeds::{batch_gather, TokenDataFeed, TokenOverview};
use boar_infra_state::{StateError, StateStore};

/// Umbral de caída desde el pico para el trailing stop.
const TRAILING_STOP_PCT: f64 = 20.0;
/// Take-profit de segundo nivel.
const TIER2_TAKE_PROFIT_PCT: f64 = 400.0;
/// Minutos sin movimiento que activan el decaimiento temporal.
const TIME_DECAY_MINUTES: i64 = 60;
/// |PnL| bajo el cual la posición se considera muerta.
const TIME_DECAY_BAND_PCT: f64 = 5.0;
/// Fracción de la liquidez de entrada que marca drenaje de pool.
const LIQUIDITY_DRAIN_FRACTION: f64 = 0.5;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub enum ExitUrgency {
    Low,
    Normal,
    High,
    Critical,
}

/// Decisión de salida de una posición abierta.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ExitDecision {
    pub token_mint: String,
    pub token_symbol: String,
    pub reason: String,
    pub exit_pct: u8,
    pub urgency: ExitUrgency,
}

/// Monitorea posiciones abiertas y genera decisiones de salida.
///
/// El fetch de precios corre en lote con concurrencia acotada; el pico
/// y las banderas de nivel se persisten bajo el candado del estado.
#[instrument(skip_all)]
pub async fn run_position_watchdog(
    state_store: &StateStore,
    token_data_feed: &dyn TokenDataFeed,
    trade: &TradeConfig,
    max_concurrent_fetch: usize,
) -> Result<Vec<ExitDecision>, StateError> {
    let state = state_store.load().await?;
    if state.positions.is_empty() {
        return Ok(Vec::new());
    }

    // Fetch paralelo acotado de telemetría por posición.
    let mints: Vec<String> =
        state.positions.iter().map(|position| position.token_mint.clone()).collect();
    let overviews: Vec<Option<TokenOverview>> =
        batch_gather(mints.clone(), max_concurrent_fetch, |mint| async move {
            token_data_feed.get_token_overview(&mint).await
        })
        .await;

    let mut exit_decisions: Vec<ExitDecision> = Vec::new();
    // Mutaciones a aplicar bajo candado: (mint, nuevo pico, tier1, tier2).
    let mut position_mutations: Vec<(String, f64, bool, bool)> = Vec::new();

    for (position, overview) in state.positions.iter().zip(overviews.iter()) {
        let Some(overview) = overview else {
            exit_decisions.push(ExitDecision {
                token_mint: position.token_mint.clone(),
                token_symbol: position.token_symbol.clone(),
                reason: "Price fetch failed".into(),
                exit_pct: 100,
                urgency: ExitUrgency::High,
            });
            continue;
        };

        let current_price = overview.price();
        let liquidity = overview.liquidity();

        let mut peak_price = position.peak_price_usd;
        if current_price > peak_price {
            peak_price = current_price;
        }

        let pnl_pct = if position.entry_price_usd > 0.0 {
            (current_price - position.entry_price_usd) / position.entry_price_usd * 100.0
        } else {
            0.0
        };
        let peak_drawdown_pct =
            if peak_price > 0.0 { (current_price - peak_price) / peak_price * 100.0 } else { 0.0 };
        let age_minutes = (Utc::now() - position.entry_time).num_minutes();

        let mut tier1_exited = position.tier1_exited;
        let mut tier2_exited = position.tier2_exited;

        // Reglas de salida en orden de prioridad.
        if pnl_pct <= -trade.stop_loss_pct {
            exit_decisions.push(ExitDecision {
                token_mint: position.token_mint.clone(),
                token_symbol: position.token_symbol.clone(),
                reason: format!("Stop-loss hit: {pnl_pct:.1}%"),
                exit_pct: 100,
                urgency: ExitUrgency::Critical,
            });
        } else if pnl_pct >= trade.take_profit_pct && !tier1_exited {
            exit_decisions.push(ExitDecision {
                token_mint: position.token_mint.clone(),
                token_symbol: position.token_symbol.clone(),
                reason: format!("TP tier 1: {pnl_pct:.1}% (2x)"),
                exit_pct: 50,
                urgency: ExitUrgency::Normal,
            });
            tier1_exited = true;
        } else if pnl_pct >= TIER2_TAKE_PROFIT_PCT && !tier2_exited {
            exit_decisions.push(ExitDecision {
                token_mint: position.token_mint.clone(),
                token_symbol: position.token_symbol.clone(),
                reason: format!("TP tier 2: {pnl_pct:.1}% (5x)"),
                exit_pct: 30,
                urgency: ExitUrgency::Normal,
            });
            tier2_exited = true;
        } else if pnl_pct > 0.0 && peak_drawdown_pct <= -TRAILING_STOP_PCT {
            exit_decisions.push(ExitDecision {
                token_mint: position.token_mint.clone(),
                token_symbol: position.token_symbol.clone(),
                reason: format!("Trailing stop: {peak_drawdown_pct:.1}% from peak"),
                exit_pct: 100,
                urgency: ExitUrgency::High,
            });
        } else if age_minutes >= TIME_DECAY_MINUTES && pnl_pct.abs() < TIME_DECAY_BAND_PCT {
            exit_decisions.push(ExitDecision {
                token_mint: position.token_mint.clone(),
                token_symbol: position.token_symbol.clone(),
                reason: format!("Time decay: {age_minutes}min, {pnl_pct:.1}% PnL"),
                exit_pct: 100,
                urgency: ExitUrgency::Low,
            });
        } else if let Some(entry_liquidity) = position.entry_liquidity_usd {
            if entry_liquidity > 0.0 && liquidity < entry_liquidity * LIQUIDITY_DRAIN_FRACTION {
                exit_decisions.push(ExitDecision {
                    token_mint: position.token_mint.clone(),
                    token_symbol: position.token_symbol.clone(),
                    reason: format!(
                        "Liquidity drop: ${liquidity:.0} (was ${entry_liquidity:.0})"
                    ),
                    exit_pct: 100,
                    urgency: ExitUrgency::High,
                });
            }
        }

        position_mutations.push((position.token_mint.clone(), peak_price, tier1_exited, tier2_exited));
    }

    // Persistencia de picos y banderas de nivel bajo el candado.
    if !position_mutations.is_empty() {
        state_store
            .update(move |state| {
                for (mint, peak, tier1, tier2) in &position_mutations {
                    if let Some(position) =
                        state.positions.iter_mut().find(|p| &p.token_mint == mint)
                    {
                        position.peak_price_usd = *peak;
                        position.tier1_exited = *tier1;
                        position.tier2_exited = *tier2;
                    }
                }
            })
            .await?;
    }

    if !exit_decisions.is_empty() {
        info!("🚪 [WATCHDOG]: {} exit decision(s) this cycle", exit_decisions.len());
    }
    Ok(exit_decisions)
}
