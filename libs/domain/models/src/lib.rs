// [libs/domain/models/src/lib.rs]
/*!
 * =================================================================
 * APARATO: SOVEREIGN DOMAIN CONTRACTS (V3.0 - BEAD FIELD ALIGNED)
 * CLASIFICACIÓN: DOMAIN MODELS (ESTRATO L2)
 * RESPONSABILIDAD: DEFINICIÓN DE CONTRATOS SOBERANOS DEL SUSTRATO
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. BEAD FIELD: Esquema completo del registrador de vuelo cognitivo
 *    (identidad, clase temporal, linaje, atestación, hash canónico).
 * 2. CONVICTION CONTRACTS: Entradas y salidas del motor de convicción
 *    con dualidad ordering/permission.
 * 3. CONFIG SOVEREIGNTY: Árbol de configuración totalmente tipado,
 *    construido una sola vez en el arranque.
 * =================================================================
 */

pub mod bead;
pub mod config;
pub mod errors;
pub mod signals;
pub mod state;

pub use bead::{
    Attestation, Bead, BeadContent, BeadStatus, BeadType, RejectionCategory, SourceRef,
    SourceType, TemporalClass, SIGNING_UNAVAILABLE,
};
pub use config::{
    ConvictionConfig, ConvictionThresholds, ConvictionWeights, EngineConfig, GraduationConfig,
    HeartbeatConfig, PortfolioConfig, RiskConfig, SizingConfig, TradeConfig, WardenThresholds,
};
pub use errors::SchemaViolation;
pub use signals::{
    ConvictionScore, PlayType, PrimarySource, PulseStage, Recommendation, SignalInput,
    WardenVerdict,
};
pub use state::{Position, State};

#[cfg(test)]
mod tests_bead_integrity;
