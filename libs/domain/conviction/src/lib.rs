// [libs/domain/conviction/src/lib.rs]
/*!
 * =================================================================
 * APARATO: CONVICTION DOMAIN ENGINE (V3.0 - DUAL PROFILE)
 * CLASIFICACIÓN: DOMAIN LOGIC (ESTRATO L2)
 * RESPONSABILIDAD: PUNTUACIÓN DETERMINISTA Y RECALL DE PATRONES
 *
 * Dos tipos de jugada fundamentalmente distintos:
 *  - Graduation (velocidad): migraciones launchpad -> DEX. Minutos.
 *  - Accumulation (convicción): acumulación de ballenas. Horas a días.
 * Cada uno con su perfil de pesos, umbral y tope de posición.
 * =================================================================
 */

pub mod edge_bank;
pub mod play_type;
pub mod scorer;

pub use edge_bank::{match_pct_against_autopsies, signal_features};
pub use play_type::detect_play_type;
pub use scorer::{ConvictionScorer, ScoringContext};

#[cfg(test)]
mod tests_dual_profile;
