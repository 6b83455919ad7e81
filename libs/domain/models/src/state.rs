// [libs/domain/models/src/state.rs]
/*!
 * =================================================================
 * APARATO: PORTFOLIO STATE CONTRACTS (V3.0)
 * CLASIFICACIÓN: DOMAIN MODELS (ESTRATO L2)
 * RESPONSABILIDAD: FUENTE ÚNICA DE VERDAD DEL ESTADO DEL POTE
 * =================================================================
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lote abierto de trading. Propiedad exclusiva del almacén de estado;
/// mutado únicamente por el watchdog de posiciones.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Position {
    pub token_mint: String,
    pub token_symbol: String,
    pub entry_price_usd: f64,
    pub entry_amount_sol: f64,
    pub entry_time: DateTime<Utc>,
    /// Máximo precio observado desde la entrada (para trailing stop).
    pub peak_price_usd: f64,
    #[serde(default)]
    pub tier1_exited: bool,
    #[serde(default)]
    pub tier2_exited: bool,
    /// Liquidez al momento de la entrada (para detectar drenaje de pool).
    pub entry_liquidity_usd: Option<f64>,
}

impl Position {
    pub fn open(
        token_mint: impl Into<String>,
        token_symbol: impl Into<String>,
        entry_price_usd: f64,
        entry_amount_sol: f64,
        entry_time: DateTime<Utc>,
        entry_liquidity_usd: Option<f64>,
    ) -> Self {
        Self {
            token_mint: token_mint.into(),
            token_symbol: token_symbol.into(),
            entry_price_usd,
            entry_amount_sol,
            entry_time,
            peak_price_usd: entry_price_usd,
            tier1_exited: false,
            tier2_exited: false,
            entry_liquidity_usd,
        }
    }
}

/// Registro persistente singleton: pote, posiciones, contadores diarios,
/// banderas de alto y de dry-run. Serializado a state.json.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct State {
    // Pote
    pub starting_balance_sol: f64,
    pub current_balance_sol: f64,
    pub current_balance_usd: f64,
    pub sol_price_usd: f64,

    // Posiciones
    pub positions: Vec<Position>,

    // Rastreo diario (reiniciado al cambiar la fecha UTC)
    pub daily_exposure_sol: f64,
    pub daily_date: String,
    pub daily_loss_pct: f64,
    pub consecutive_losses: u32,
    pub daily_graduation_count: u32,

    // Estado de alto
    pub halted: bool,
    pub halted_at: Option<DateTime<Utc>>,
    pub halt_reason: String,

    // Estadísticas
    pub total_trades: u64,
    pub total_wins: u64,
    pub total_losses: u64,
    pub last_trade_time: Option<DateTime<Utc>>,
    pub last_heartbeat_time: Option<DateTime<Utc>>,

    // Modo dry-run
    pub dry_run_mode: bool,
    pub dry_run_cycles_completed: u64,
    pub dry_run_target_cycles: u64,
}

impl State {
    /// Reinicia los contadores diarios si la fecha UTC cambió.
    pub fn apply_daily_reset(&mut self, now: DateTime<Utc>) -> bool {
        let today = now.format("%Y-%m-%d").to_string();
        if self.daily_date != today {
            self.daily_date = today;
            self.daily_exposure_sol = 0.0;
            self.daily_loss_pct = 0.0;
            self.daily_graduation_count = 0;
            return true;
        }
        false
    }

    /// PnL global del pote en porcentaje. Cero sin balance inicial.
    pub fn overall_pnl_pct(&self) -> f64 {
        if self.starting_balance_sol > 0.0 {
            (self.current_balance_sol - self.starting_balance_sol) / self.starting_balance_sol
                * 100.0
        } else {
            0.0
        }
    }
}
