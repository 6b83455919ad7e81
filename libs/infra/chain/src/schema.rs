// [libs/infra/chain/src/schema.rs]
/*!
 * =================================================================
 * APARATO: LEDGER SCHEMA ENGINE (V3.0 - BI-TEMPORAL STRATA)
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: GOBERNANZA ESTRUCTURAL E IDEMPOTENCIA TOTAL
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. BI-TEMPORAL INDEXES: Índices separados sobre tiempo de conocimiento
 *    y ambos bordes del tiempo de mundo habilitan consultas "as-of" y
 *    "during" sin escaneo completo.
 * 2. NORMALIZED LINEAGE: Tabla de aristas para la travesía del grafo,
 *    redundante con la columna JSON por diseño del registrador de vuelo.
 * 3. IDEMPOTENCIA: CREATE IF NOT EXISTS en todos los estratos.
 * =================================================================
 */

use libsql::Connection;
use tracing::{debug, info, instrument};

use crate::errors::ChainError;

/// ESTRATO 1: SOLIDIFICACIÓN (Génesis de Tablas)
const LEDGER_TABLES: &[(&str, &str)] = &[
    (
        "TABLE_BEADS",
        r#"
        CREATE TABLE IF NOT EXISTS beads (
            seq                      INTEGER PRIMARY KEY AUTOINCREMENT,
            bead_id                  TEXT NOT NULL UNIQUE,
            bead_type                TEXT NOT NULL,
            hash_self                TEXT NOT NULL UNIQUE,
            hash_prev                TEXT,
            merkle_batch_id          TEXT,

            world_time_valid_from    TEXT,
            world_time_valid_to      TEXT,
            knowledge_time_recorded_at TEXT NOT NULL,
            temporal_class           TEXT NOT NULL,

            token_mint               TEXT DEFAULT '',
            status                   TEXT NOT NULL DEFAULT 'ACTIVE',
            tags                     TEXT NOT NULL DEFAULT '[]',

            content                  TEXT NOT NULL,
            lineage                  TEXT NOT NULL,
            source_ref               TEXT NOT NULL,
            attestation              TEXT NOT NULL,
            full_bead                TEXT NOT NULL,

            created_at               TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
        );
    "#,
    ),
    (
        "TABLE_BEAD_LINEAGE",
        r#"
        CREATE TABLE IF NOT EXISTS bead_lineage (
            bead_id     TEXT NOT NULL,
            parent_id   TEXT NOT NULL,
            position    INTEGER NOT NULL,
            PRIMARY KEY (bead_id, parent_id)
        );
    "#,
    ),
    (
        "TABLE_MERKLE_BATCHES",
        r#"
        CREATE TABLE IF NOT EXISTS merkle_batches (
            batch_id      TEXT PRIMARY KEY,
            merkle_root   TEXT NOT NULL,
            bead_count    INTEGER NOT NULL,
            trigger_type  TEXT NOT NULL,
            trigger_bead_id TEXT,
            created_at    TEXT NOT NULL,
            anchor_tx     TEXT
        );
    "#,
    ),
];

/// ESTRATO 2: ENDURECIMIENTO (Índices de Aceleración)
const ACCELERATION_INDEXES: &[(&str, &str)] = &[
    ("IDX_BEADS_TYPE", "CREATE INDEX IF NOT EXISTS idx_beads_type ON beads(bead_type);"),
    ("IDX_BEADS_TOKEN", "CREATE INDEX IF NOT EXISTS idx_beads_token ON beads(token_mint);"),
    ("IDX_BEADS_KT", "CREATE INDEX IF NOT EXISTS idx_beads_kt ON beads(knowledge_time_recorded_at);"),
    ("IDX_BEADS_WT_FROM", "CREATE INDEX IF NOT EXISTS idx_beads_wt_from ON beads(world_time_valid_from);"),
    ("IDX_BEADS_WT_TO", "CREATE INDEX IF NOT EXISTS idx_beads_wt_to ON beads(world_time_valid_to);"),
    ("IDX_BEADS_TEMPORAL", "CREATE INDEX IF NOT EXISTS idx_beads_temporal_class ON beads(temporal_class);"),
    ("IDX_BEADS_STATUS", "CREATE INDEX IF NOT EXISTS idx_beads_status ON beads(status);"),
    ("IDX_BEADS_MERKLE", "CREATE INDEX IF NOT EXISTS idx_beads_merkle ON beads(merkle_batch_id);"),
    ("IDX_LINEAGE_PARENT", "CREATE INDEX IF NOT EXISTS idx_lineage_parent ON bead_lineage(parent_id);"),
];

/// Ejecuta la secuencia maestra de sincronización del esquema del ledger.
///
/// # Errors:
/// Retorna error si alguna tabla base falla en solidificarse, indicando
/// un colapso en el enlace con el motor.
#[instrument(skip(ledger_connection))]
pub async fn apply_ledger_schema(ledger_connection: &Connection) -> Result<(), ChainError> {
    info!("🏗️ [SCHEMA_ENGINE]: Initiating ledger structural synchronization V3.0...");

    for (identifier, sql) in LEDGER_TABLES {
        debug!("  ↳ Solidifying: {}", identifier);
        ledger_connection
            .execute(*sql, ())
            .await
            .map_err(|e| ChainError::Connection(format!("SOLIDIFICATION_FAULT {identifier}: {e}")))?;
    }

    for (identifier, sql) in ACCELERATION_INDEXES {
        debug!("  ↳ Hardening: {}", identifier);
        ledger_connection
            .execute(*sql, ())
            .await
            .map_err(|e| ChainError::Connection(format!("HARDENING_FAULT {identifier}: {e}")))?;
    }

    info!("✅ [SCHEMA_ENGINE]: Bead ledger V3.0 level and certified.");
    Ok(())
}
