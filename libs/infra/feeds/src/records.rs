// [libs/infra/feeds/src/records.rs]
/*!
 * =================================================================
 * APARATO: FEED RECORD CONTRACTS (V3.0 - NULL SAFE)
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: REGISTROS TIPADOS DE LOS PROVEEDORES EXTERNOS
 *
 * Los proveedores devuelven campos nulos con frecuencia: todo campo
 * opcional degrada a 0 / false vía los accesores, jamás a pánico.
 * =================================================================
 */

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ── Telemetría de token ──────────────────────────────────────────────

/// Vista general de un token según el proveedor de telemetría.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct TokenOverview {
    pub symbol: Option<String>,
    pub price_usd: Option<f64>,
    pub liquidity_usd: Option<f64>,
    pub volume_1h_usd: Option<f64>,
    pub volume_24h_usd: Option<f64>,
    pub market_cap_usd: Option<f64>,
    pub created_at: Option<DateTime<Utc>>,
}

impl TokenOverview {
    pub fn symbol_or_unknown(&self) -> String {
        self.symbol.clone().unwrap_or_else(|| "UNKNOWN".to_string())
    }

    pub fn liquidity(&self) -> f64 {
        self.liquidity_usd.unwrap_or(0.0)
    }

    pub fn price(&self) -> f64 {
        self.price_usd.unwrap_or(0.0)
    }

    /// Múltiplo de volumen 1h contra el promedio horario de 24h.
    pub fn volume_spike_ratio(&self) -> f64 {
        let volume_1h = self.volume_1h_usd.unwrap_or(0.0);
        let volume_24h = self.volume_24h_usd.unwrap_or(0.0);
        let hourly_average = volume_24h / 24.0;
        if hourly_average > 0.0 {
            (volume_1h / hourly_average * 10.0).round() / 10.0
        } else {
            0.0
        }
    }
}

/// Datos de seguridad del token (autoridades, concentración, LP).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct TokenSecurity {
    /// Fracción 0.0-1.0 controlada por los 10 mayores holders.
    pub top10_holder_fraction: Option<f64>,
    pub is_mintable: Option<bool>,
    pub is_freezable: Option<bool>,
    pub is_lp_locked: Option<bool>,
    pub is_lp_burned: Option<bool>,
}

impl TokenSecurity {
    pub fn top10_holder_pct(&self) -> f64 {
        self.top10_holder_fraction.unwrap_or(0.0) * 100.0
    }

    pub fn mint_mutable(&self) -> bool {
        self.is_mintable.unwrap_or(false)
    }

    pub fn freeze_mutable(&self) -> bool {
        self.is_freezable.unwrap_or(false)
    }

    pub fn lp_secured(&self) -> bool {
        self.is_lp_locked.unwrap_or(false) || self.is_lp_burned.unwrap_or(false)
    }
}

/// Un trade individual del libro reciente.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct TradeRecord {
    pub block_time: Option<DateTime<Utc>>,
    pub volume_usd: Option<f64>,
}

/// Página de trades recientes de un token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct TradesPage {
    pub items: Vec<TradeRecord>,
}

// ── Señales del oráculo ──────────────────────────────────────────────

/// Inteligencia de flujo (intercambios y billeteras frescas).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct FlowIntel {
    /// Neto hacia exchanges en USD (positivo = distribución).
    pub exchange_net_usd: f64,
    pub fresh_wallet_net_usd: f64,
}

/// Profundidad de compradores smart money.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct BuyerDepth {
    pub smart_money_buyers: u32,
    pub total_buy_volume_usd: f64,
}

/// Señal de acumulación de ballenas (fuente primaria del oráculo).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct WhaleSignal {
    pub token_mint: String,
    pub token_symbol: String,
    pub wallet_count: u32,
    pub total_buy_usd: f64,
    pub confidence: String,
    pub flow_intel: FlowIntel,
    pub buyer_depth: BuyerDepth,
    pub dca_count: u32,
    pub discovery_source: String,
    /// Direcciones de las ballenas observadas (censo de dumpers).
    pub notable_wallets: Vec<String>,
}

/// Candidato de ballenas resuelto vía el agregador secundario.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct MobulaWhaleSignal {
    pub token_mint: String,
    pub token_symbol: String,
    pub accum_24h_usd: f64,
    pub signal_strength: String,
}

/// Candidato del radar de launchpad (Pulse) con señales de calidad.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct PulseCandidate {
    pub token_mint: String,
    pub token_symbol: String,
    pub volume_usd: f64,
    pub confidence: String,
    pub discovery_source: String,
    pub liquidity_usd: Option<f64>,
    pub pulse_ghost_metadata: bool,
    pub pulse_organic_ratio: f64,
    pub pulse_bundler_pct: f64,
    pub pulse_sniper_pct: f64,
    pub pulse_pro_trader_pct: f64,
    pub pulse_deployer_migrations: u32,
    pub pulse_stage: String,
    pub pulse_trending_score: f64,
    pub pulse_dexscreener_boosted: bool,
    pub entry_market_cap_usd: f64,
}

/// Variación de tenencias por token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct HoldingsDelta {
    pub token_mint: String,
    pub holder_delta_pct: f64,
}

/// Cronometraje por fase de la consulta al oráculo.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct PhaseTiming {
    pub phase_milliseconds: BTreeMap<String, u64>,
}

/// Cosecha completa del oráculo en un ciclo. Contrato reconstruido
/// desde los usos del orquestador de latido.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct OracleHarvest {
    pub nansen_signals: Vec<WhaleSignal>,
    pub mobula_signals: Vec<MobulaWhaleSignal>,
    pub pulse_signals: Vec<PulseCandidate>,
    pub holdings_delta: Vec<HoldingsDelta>,
    pub phase_timing: PhaseTiming,
}

// ── Señal narrativa ──────────────────────────────────────────────────

/// Señal de momentum social + volumen para un token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct NarrativeSignal {
    pub token_mint: String,
    pub token_symbol: String,
    pub volume_vs_avg: f64,
    pub kol_mentions: u32,
    pub x_mentions_1h: u32,
}

// ── Razonador externo ────────────────────────────────────────────────

/// Llamada de alpha del razonador externo.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AlphaCall {
    /// Subir a AUTO_EXECUTE.
    Trade,
    /// Permanecer en WATCHLIST.
    Nope,
}

/// Veredicto del razonador. JAMÁS puede anular un VETO.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReasonerVerdict {
    pub call: AlphaCall,
    pub reasoning: String,
    pub confidence: f64,
}

// ── Historial de billetera (detección de dumpers) ────────────────────

/// Transacción de una billetera para el análisis de patrón dumper.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct WalletTransaction {
    pub tx_type: String,
    pub token_address: String,
    pub block_timestamp: i64,
}
