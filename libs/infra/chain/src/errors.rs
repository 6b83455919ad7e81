// [libs/infra/chain/src/errors.rs]
/*!
 * =================================================================
 * APARATO: CHAIN ERROR CATALOG (V3.0 - SOBERANO)
 * CLASIFICACIÓN: INFRASTRUCTURE CORE (ESTRATO L3)
 * RESPONSABILIDAD: CATALOGACIÓN SEMÁNTICA DE FALLOS DEL LEDGER
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. TAGGED RECOVERY: Variantes explícitas en lugar de excepciones de
 *    control de flujo; el llamador decide por match, nunca por catch-all.
 * 2. PANOPTICON COMPLIANCE: Mensajes con prefijos de estrato para su
 *    renderizado cromático en los reportes de ciclo.
 * =================================================================
 */

use boar_domain_models::SchemaViolation;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChainError {
    /// Error de enlace físico con el motor libSQL.
    #[error("[L3_CHAIN_NET_FAULT]: LEDGER_UPLINK_SEVERED -> {0}")]
    Connection(String),

    /// Error de sintaxis o ejecución devuelto por el motor libSQL.
    #[error("[L3_CHAIN_QUERY_FAULT]: SQL_QUERY_REJECTED -> {0}")]
    Query(#[from] libsql::Error),

    /// Un padre declarado en el linaje no existe en el ledger.
    #[error("[L3_CHAIN_LINEAGE_FAULT]: LINEAGE_MISSING -> parent '{missing_id}' not committed")]
    LineageMissing { missing_id: String },

    /// Contenido estructuralmente inválido. Error de programador: aflora fatal.
    #[error("[L3_CHAIN_SCHEMA_FAULT]: {0}")]
    Schema(#[from] SchemaViolation),

    /// El candado de escritura no se adquirió dentro del plazo.
    #[error("[L3_CHAIN_LOCK_FAULT]: CHAIN_BUSY -> write lock acquisition timed out")]
    ChainBusy,

    /// Integridad rota: alertar y pasar a solo-lectura. JAMÁS auto-reparar.
    #[error("[L3_CHAIN_INTEGRITY_FAULT]: CHAIN_TAMPERED at seq {at_seq} -> {reason}")]
    IntegrityBroken { at_seq: i64, reason: String },

    /// Fallo en la transformación de tipos entre SQLite y el dominio.
    #[error("[L3_CHAIN_MAPPING_FAULT]: DATA_MAPPING_VIOLATION -> {0}")]
    Mapping(String),

    /// Fallo de E/S durante export/import JSONL.
    #[error("[L3_CHAIN_IO_FAULT]: PORTING_FAILURE -> {0}")]
    Io(String),

    /// Fallo de sumisión del ancla externa. Best-effort: el lote local persiste.
    #[error("[L3_CHAIN_ANCHOR_FAULT]: ANCHOR_SUBMISSION_FAILED -> {0}")]
    AnchorSubmission(String),
}
