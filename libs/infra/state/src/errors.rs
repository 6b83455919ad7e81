// [libs/infra/state/src/errors.rs]
/*!
 * =================================================================
 * APARATO: STATE ERROR CATALOG (V3.0)
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: FALLOS DE PERSISTENCIA DEL ESTADO
 * =================================================================
 */

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StateError {
    /// Fallo de E/S sobre el archivo de estado o sus sidecars.
    #[error("[L3_STATE_FAULT]: STATE_IO_FAILURE -> {0}")]
    Io(String),

    /// Estado y respaldo ambos ilegibles: alto con alerta explícita.
    #[error("[L3_STATE_FAULT]: STATE_CORRUPTED -> primary and backup both unreadable")]
    Corrupted,

    /// Fallo de adquisición del candado consultivo.
    #[error("[L3_STATE_FAULT]: LOCK_FAILURE -> {0}")]
    Lock(String),
}
