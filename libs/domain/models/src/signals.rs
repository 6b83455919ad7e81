// [libs/domain/models/src/signals.rs]
/*!
 * =================================================================
 * APARATO: CONVICTION SIGNAL CONTRACTS (V3.0 - DUAL PROFILE)
 * CLASIFICACIÓN: DOMAIN MODELS (ESTRATO L2)
 * RESPONSABILIDAD: ENTRADAS Y SALIDAS DEL MOTOR DE CONVICCIÓN
 *
 * # Mathematical Proof (Dual Scoring):
 * ordering_score mide fuerza de señal pura (aprendizaje) y
 * permission_score la fuerza post-penalizaciones (acción). La dualidad
 * permite que el Campo de Sombra conserve candidatos fuertes que las
 * banderas rojas degradaron, sin contaminar la decisión de ejecución.
 * =================================================================
 */

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Clasificación de la oportunidad por ventana temporal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub enum PlayType {
    /// Migración bonding-curve -> DEX real. Minutos, no horas.
    #[serde(rename = "graduation")]
    Graduation,
    /// Acumulación de ballenas en token establecido. Horas a días.
    #[serde(rename = "accumulation")]
    Accumulation,
}

impl PlayType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlayType::Graduation => "graduation",
            PlayType::Accumulation => "accumulation",
        }
    }
}

/// Veredicto agregado del Rug Warden.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum WardenVerdict {
    #[serde(rename = "PASS")]
    Pass,
    #[serde(rename = "WARN")]
    Warn,
    #[serde(rename = "FAIL")]
    Fail,
    #[default]
    #[serde(rename = "UNKNOWN")]
    Unknown,
}

impl WardenVerdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            WardenVerdict::Pass => "PASS",
            WardenVerdict::Warn => "WARN",
            WardenVerdict::Fail => "FAIL",
            WardenVerdict::Unknown => "UNKNOWN",
        }
    }
}

/// Etapa del ciclo de vida en la launchpad reportada por Pulse.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum PulseStage {
    /// Pre-graduación: la jugada.
    #[serde(rename = "bonding")]
    Bonding,
    /// Post-graduación: patrón histórico de pérdida.
    #[serde(rename = "bonded")]
    Bonded,
    #[default]
    #[serde(rename = "")]
    Unknown,
}

/// Flujo de señal independiente que contribuyó materialmente al score.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub enum PrimarySource {
    #[serde(rename = "oracle")]
    Oracle,
    #[serde(rename = "narrative")]
    Narrative,
    #[serde(rename = "warden")]
    Warden,
    #[serde(rename = "pulse")]
    Pulse,
}

impl PrimarySource {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrimarySource::Oracle => "oracle",
            PrimarySource::Narrative => "narrative",
            PrimarySource::Warden => "warden",
            PrimarySource::Pulse => "pulse",
        }
    }
}

/// Recomendación final del motor de convicción.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Recommendation {
    #[serde(rename = "AUTO_EXECUTE")]
    AutoExecute,
    #[serde(rename = "WATCHLIST")]
    Watchlist,
    #[serde(rename = "PAPER_TRADE")]
    PaperTrade,
    #[serde(rename = "DISCARD")]
    Discard,
    #[serde(rename = "VETO")]
    Veto,
}

impl Recommendation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Recommendation::AutoExecute => "AUTO_EXECUTE",
            Recommendation::Watchlist => "WATCHLIST",
            Recommendation::PaperTrade => "PAPER_TRADE",
            Recommendation::Discard => "DISCARD",
            Recommendation::Veto => "VETO",
        }
    }
}

/// Haz estructurado de señales que alimenta al motor de convicción.
/// Los defaults nunca penalizan: campo ausente equivale a señal neutra.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SignalInput {
    /// Ballenas distintas acumulando.
    pub smart_money_whales: u32,
    /// Múltiplo de volumen vs promedio horario.
    pub narrative_volume_spike: f64,
    pub narrative_kol_detected: bool,
    /// Edad de la señal narrativa en minutos.
    pub narrative_age_minutes: i64,
    pub rug_warden_status: WardenVerdict,
    /// Similitud con ganadores pasados (Edge Bank), 0-100.
    pub edge_bank_match_pct: f64,
    /// Flujo neto hacia exchanges en USD (positivo = distribución).
    pub exchange_net_inflow_usd: f64,
    /// Entrada desde billeteras frescas en USD (indicador de bandera roja).
    pub fresh_wallet_inflow_usd: f64,
    pub smart_money_buy_volume_usd: f64,
    /// DCAs activos de smart money.
    pub dca_count: u32,
    /// Sin socials pero con volumen alto (lanzamiento sigiloso).
    pub pulse_ghost_metadata: bool,
    /// organic_volume / total_volume, 0.0-1.0.
    pub pulse_organic_ratio: f64,
    pub pulse_bundler_pct: f64,
    pub pulse_sniper_pct: f64,
    pub pulse_pro_trader_pct: f64,
    /// Migraciones previas del deployer (riesgo de rug).
    pub pulse_deployer_migrations: u32,
    pub pulse_stage: PulseStage,
    /// Cambio porcentual de holders (positivo = creciendo).
    pub holder_delta_pct: f64,
    pub entry_market_cap_usd: f64,
    pub pulse_trending_score: f64,
    pub pulse_dexscreener_boosted: bool,
}

impl Default for SignalInput {
    fn default() -> Self {
        Self {
            smart_money_whales: 0,
            narrative_volume_spike: 0.0,
            narrative_kol_detected: false,
            narrative_age_minutes: 0,
            rug_warden_status: WardenVerdict::Unknown,
            edge_bank_match_pct: 0.0,
            exchange_net_inflow_usd: 0.0,
            fresh_wallet_inflow_usd: 0.0,
            smart_money_buy_volume_usd: 0.0,
            dca_count: 0,
            pulse_ghost_metadata: false,
            pulse_organic_ratio: 1.0,
            pulse_bundler_pct: 0.0,
            pulse_sniper_pct: 0.0,
            pulse_pro_trader_pct: 0.0,
            pulse_deployer_migrations: 0,
            pulse_stage: PulseStage::Unknown,
            holder_delta_pct: 0.0,
            entry_market_cap_usd: 0.0,
            pulse_trending_score: 0.0,
            pulse_dexscreener_boosted: false,
        }
    }
}

/// Veredicto del motor de convicción con desglose completo.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConvictionScore {
    /// Fuerza de señal pura (para aprendizaje).
    pub ordering_score: i64,
    /// Post-penalizaciones y completitud de datos (para acción).
    pub permission_score: i64,
    pub breakdown: BTreeMap<String, i64>,
    /// Contribuciones negativas por bandera.
    pub red_flags: BTreeMap<String, i64>,
    pub primary_sources: BTreeSet<PrimarySource>,
    pub recommendation: Recommendation,
    pub position_size_sol: f64,
    pub reasoning: String,
    pub play_type: PlayType,
}

impl ConvictionScore {
    /// Veredicto de veto terminal con scores en cero.
    pub fn veto(play_type: PlayType, reasoning: impl Into<String>) -> Self {
        Self {
            ordering_score: 0,
            permission_score: 0,
            breakdown: BTreeMap::new(),
            red_flags: BTreeMap::new(),
            primary_sources: BTreeSet::new(),
            recommendation: Recommendation::Veto,
            position_size_sol: 0.0,
            reasoning: reasoning.into(),
            play_type,
        }
    }
}
