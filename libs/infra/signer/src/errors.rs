// [libs/infra/signer/src/errors.rs]
/*!
 * =================================================================
 * APARATO: SIGNER ERROR CATALOG (V3.0 - ZERO LEAK)
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: FALLOS DEL FIRMANTE SIN MATERIAL DE LLAVE
 *
 * INVARIANTE: ninguna variante transporta bytes de llave; toda ruta de
 * fallo es genérica por construcción.
 * =================================================================
 */

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SignerError {
    /// Ninguna fuente de llave configurada produjo material.
    #[error("[L3_SIGNER_FAULT]: NO_KEY_SOURCE -> configure a key file path, the platform keychain, or the explicit test env opt-in")]
    NoKeySource,

    /// El archivo de llave configurado no existe o no es legible.
    #[error("[L3_SIGNER_FAULT]: KEY_FILE_UNREADABLE -> {path}")]
    KeyFileUnreadable { path: String },

    /// Fallo de ignición del subproceso firmante.
    #[error("[L3_SIGNER_FAULT]: SPAWN_FAILURE -> {0}")]
    Spawn(String),

    /// El subproceso no respondió dentro del plazo fijo y fue terminado.
    #[error("[L3_SIGNER_FAULT]: SIGNER_TIMEOUT -> subprocess force-terminated after {0}s")]
    Timeout(u64),

    /// El firmante terminó con error. El mensaje es la línea genérica de
    /// stderr: el firmante garantiza que no contiene material de llave.
    #[error("[L3_SIGNER_FAULT]: SIGNER_REJECTED -> {0}")]
    Rejected(String),

    /// El firmante terminó OK pero no produjo salida.
    #[error("[L3_SIGNER_FAULT]: EMPTY_OUTPUT")]
    EmptyOutput,
}
