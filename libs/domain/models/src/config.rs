// [libs/domain/models/src/config.rs]
/*!
 * =================================================================
 * APARATO: SOVEREIGN CONFIGURATION TREE (V3.0 - TYPED MASTER)
 * CLASIFICACIÓN: DOMAIN MODELS (ESTRATO L2)
 * RESPONSABILIDAD: CONFIGURACIÓN INMUTABLE CONSTRUIDA EN EL ARRANQUE
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. TOTAL TYPING: El núcleo jamás lee YAML crudo; consume este árbol
 *    construido una sola vez en la ignición.
 * 2. DEFAULT SOVEREIGNTY: Todo campo tiene default operativo, de modo
 *    que un YAML parcial produce una configuración completa y válida.
 * =================================================================
 */

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::SchemaViolation;

/// Límites de cartera del estrato de riesgo.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PortfolioConfig {
    /// Drawdown (en % del pote inicial) que dispara el alto.
    pub drawdown_halt_pct: f64,
    pub drawdown_halt_hours: f64,
    /// Exposición diaria máxima como % del balance.
    pub daily_exposure_pct: f64,
    pub max_concurrent_positions: usize,
}

impl Default for PortfolioConfig {
    fn default() -> Self {
        Self {
            drawdown_halt_pct: 50.0,
            drawdown_halt_hours: 24.0,
            daily_exposure_pct: 30.0,
            max_concurrent_positions: 5,
        }
    }
}

/// Cortocircuitos de protección del estrato de riesgo.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CircuitBreakersConfig {
    pub consecutive_losses: u32,
    pub daily_loss_pct: f64,
}

impl Default for CircuitBreakersConfig {
    fn default() -> Self {
        Self { consecutive_losses: 3, daily_loss_pct: 10.0 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct RiskConfig {
    pub portfolio: PortfolioConfig,
    pub circuit_breakers: CircuitBreakersConfig,
}

/// Asignación de puntos por componente del motor de convicción.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ConvictionWeights {
    pub smart_money_oracle: i64,
    pub narrative_hunter: i64,
    pub rug_warden: i64,
    pub edge_bank: i64,
    pub pulse_quality: i64,
}

impl Default for ConvictionWeights {
    fn default() -> Self {
        Self {
            smart_money_oracle: 40,
            narrative_hunter: 30,
            rug_warden: 20,
            edge_bank: 10,
            pulse_quality: 0,
        }
    }
}

impl ConvictionWeights {
    /// Perfil de graduación: Pulse es la señal primaria, el oráculo es
    /// estructuralmente cero (neutral, no penalización).
    pub fn graduation_default() -> Self {
        Self {
            smart_money_oracle: 0,
            narrative_hunter: 30,
            rug_warden: 25,
            edge_bank: 10,
            pulse_quality: 35,
        }
    }
}

/// Umbrales de enrutamiento de recomendación.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ConvictionThresholds {
    pub auto_execute: i64,
    pub auto_execute_graduation: i64,
    pub watchlist: i64,
    pub paper_trade: i64,
}

impl Default for ConvictionThresholds {
    fn default() -> Self {
        Self { auto_execute: 85, auto_execute_graduation: 70, watchlist: 60, paper_trade: 40 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SizingConfig {
    /// Multiplicador base de la fórmula de tamaño de posición.
    pub base_multiplier: f64,
}

impl Default for SizingConfig {
    fn default() -> Self {
        Self { base_multiplier: 0.01 }
    }
}

/// Sublímites específicos de jugadas de graduación.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GraduationConfig {
    pub max_position_usd: f64,
    pub max_daily_plays: u32,
    pub max_mcap_graduation: f64,
    pub bonded_stage_bonus: i64,
}

impl Default for GraduationConfig {
    fn default() -> Self {
        Self {
            max_position_usd: 50.0,
            max_daily_plays: 3,
            max_mcap_graduation: 500_000.0,
            bonded_stage_bonus: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ConvictionConfig {
    pub weights: ConvictionWeights,
    pub weights_graduation: ConvictionWeights,
    pub thresholds: ConvictionThresholds,
    pub sizing: SizingConfig,
    pub graduation: GraduationConfig,
    /// Beads AUTOPSY mínimos para activar el Edge Bank (arranque en frío).
    pub edge_bank_min_beads: u64,
}

impl Default for ConvictionConfig {
    fn default() -> Self {
        Self {
            weights: ConvictionWeights::default(),
            weights_graduation: ConvictionWeights::graduation_default(),
            thresholds: ConvictionThresholds::default(),
            sizing: SizingConfig::default(),
            graduation: GraduationConfig::default(),
            edge_bank_min_beads: 10,
        }
    }
}

/// Umbrales por chequeo del Rug Warden (un perfil por tipo de jugada).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WardenThresholds {
    pub min_liquidity_usd: f64,
    pub max_holder_concentration_pct: f64,
    pub reject_mutable_mint: bool,
    pub min_token_age_seconds: i64,
    pub reject_unlocked_lp: bool,
}

impl Default for WardenThresholds {
    fn default() -> Self {
        Self {
            min_liquidity_usd: 10_000.0,
            max_holder_concentration_pct: 80.0,
            reject_mutable_mint: true,
            min_token_age_seconds: 300,
            reject_unlocked_lp: false,
        }
    }
}

impl WardenThresholds {
    /// Perfil de graduación: los tokens recién migrados tienen liquidez
    /// naciente, de modo que el piso baja un orden de magnitud.
    pub fn graduation_default() -> Self {
        Self { min_liquidity_usd: 1_000.0, ..Self::default() }
    }
}

/// Límites de ejecución de trades.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TradeConfig {
    pub stop_loss_pct: f64,
    pub take_profit_pct: f64,
    /// Tamaño máximo de posición como % del pote.
    pub max_position_pct: f64,
    pub slippage_bps: u32,
}

impl Default for TradeConfig {
    fn default() -> Self {
        Self { stop_loss_pct: 20.0, take_profit_pct: 100.0, max_position_pct: 10.0, slippage_bps: 100 }
    }
}

/// Presupuestos del ciclo de latido.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HeartbeatConfig {
    /// Presupuesto total del ciclo en segundos.
    pub budget_seconds: f64,
    pub watchdog_budget_seconds: f64,
    pub oracle_budget_seconds: f64,
    /// Concurrencia máxima del fetch de posiciones.
    pub max_concurrent_fetch: usize,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            budget_seconds: 120.0,
            watchdog_budget_seconds: 30.0,
            oracle_budget_seconds: 45.0,
            max_concurrent_fetch: 3,
        }
    }
}

/// Árbol de configuración soberano. Construido una vez en la ignición y
/// pasado explícitamente: sin estado mutable a nivel de módulo.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    pub risk: RiskConfig,
    pub conviction: ConvictionConfig,
    pub rug_warden: WardenThresholds,
    pub rug_warden_graduation: WardenThresholds,
    pub trade: TradeConfig,
    pub heartbeat: HeartbeatConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            risk: RiskConfig::default(),
            conviction: ConvictionConfig::default(),
            rug_warden: WardenThresholds::default(),
            rug_warden_graduation: WardenThresholds::graduation_default(),
            trade: TradeConfig::default(),
            heartbeat: HeartbeatConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Deserializa el árbol desde YAML. Campos ausentes toman el default.
    pub fn from_yaml_str(raw: &str) -> Result<Self, SchemaViolation> {
        serde_yaml::from_str(raw).map_err(|e| SchemaViolation::Config(e.to_string()))
    }

    /// Carga desde un archivo YAML en disco.
    pub fn load(path: &Path) -> Result<Self, SchemaViolation> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| SchemaViolation::Config(format!("{}: {e}", path.display())))?;
        Self::from_yaml_str(&raw)
    }

    pub fn warden_profile(&self, graduation: bool) -> &WardenThresholds {
        if graduation {
            &self.rug_warden_graduation
        } else {
            &self.rug_warden
        }
    }
}
