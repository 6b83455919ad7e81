// [libs/infra/chain/src/chain.rs]
/*!
 * =================================================================
 * APARATO: BEAD CHAIN MANAGER (V3.0 - BI-TEMPORAL MASTER)
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: LEDGER APPEND-ONLY CON EVIDENCIA DE MANIPULACIÓN
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. LINEARIZED WRITES: Un candado exclusivo de escritura; entre dos
 *    escritores el resultado equivale a algún orden serial.
 * 2. SINGLE TRANSACTION: Bead + aristas de linaje se comprometen en una
 *    transacción; sin commits parciales.
 * 3. BI-TEMPORAL QUERY: "qué sabíamos en t" (knowledge) y "qué cubría
 *    la ventana [a,b]" (world) sobre índices separados.
 * 4. NO AUTO-REPAIR: Integridad rota alerta y degrada a solo-lectura;
 *    el ledger jamás se reescribe a sí mismo.
 * =================================================================
 */

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use libsql::params;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use boar_domain_models::{Bead, BeadStatus, BeadType, RejectionCategory, TemporalClass, SIGNING_UNAVAILABLE};

use crate::client::ChainDbClient;
use crate::errors::ChainError;
use crate::merkle::compute_merkle_root;
use crate::signing::NodeSigner;

/// Plazo de adquisición del candado de escritura antes de ChainBusy.
const WRITE_LOCK_TIMEOUT: Duration = Duration::from_secs(10);

/// Centinelas de ventana temporal para consultas de forma fija.
const TS_FLOOR: &str = "0000-01-01T00:00:00.000000Z";
const TS_CEIL: &str = "9999-12-31T23:59:59.999999Z";

/// Lote mínimo de beads sin anclar que dispara MAX_BEADS.
const ANCHOR_MAX_BEADS: i64 = 500;
/// Segundos desde el último ancla que disparan MAX_TIME.
const ANCHOR_MAX_AGE_SECONDS: i64 = 3_600;

fn fmt_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Texto nullable hacia el motor: None mapea a NULL explícito.
fn opt_text(value: Option<String>) -> libsql::Value {
    match value {
        Some(text) => libsql::Value::Text(text),
        None => libsql::Value::Null,
    }
}

/// Ventana de consulta sobre tiempo de conocimiento.
#[derive(Debug, Clone, Copy)]
pub struct QueryWindow {
    pub limit: u32,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl Default for QueryWindow {
    fn default() -> Self {
        Self { limit: 50, since: None, until: None }
    }
}

impl QueryWindow {
    fn since_bound(&self) -> String {
        self.since.map(fmt_ts).unwrap_or_else(|| TS_FLOOR.to_string())
    }

    fn until_bound(&self) -> String {
        self.until.map(fmt_ts).unwrap_or_else(|| TS_CEIL.to_string())
    }
}

/// Resultado de la verificación de integridad de la cadena.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChainVerifyResult {
    pub valid: bool,
    pub total_beads: u64,
    pub verified_beads: u64,
    pub first_break_seq: Option<i64>,
    pub signature_failures: u64,
    pub message: String,
}

/// Estadísticas de latencia de refinado (KT - fin de WT) para OBSERVATION.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct LatencyStats {
    pub count: u64,
    pub avg_seconds: f64,
    pub p50_seconds: f64,
    pub p95_seconds: f64,
    pub p99_seconds: f64,
}

/// Disparador de anclaje externo, en orden de prioridad.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AnchorTrigger {
    #[serde(rename = "DECISION_BOUNDARY")]
    DecisionBoundary,
    #[serde(rename = "MAX_BEADS")]
    MaxBeads,
    #[serde(rename = "MAX_TIME")]
    MaxTime,
}

impl AnchorTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnchorTrigger::DecisionBoundary => "DECISION_BOUNDARY",
            AnchorTrigger::MaxBeads => "MAX_BEADS",
            AnchorTrigger::MaxTime => "MAX_TIME",
        }
    }
}

/// Registro de un lote Merkle sellado.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MerkleBatch {
    pub batch_id: String,
    pub merkle_root: String,
    pub bead_count: u64,
    pub trigger_type: String,
    pub trigger_bead_id: Option<String>,
    pub created_at: String,
    pub anchor_tx: Option<String>,
    pub seq_start: i64,
    pub seq_end: i64,
}

/// Distribución del Campo de Sombra (rechazos).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ShadowFieldStats {
    pub total_rejections: u64,
    pub category_distribution: std::collections::BTreeMap<String, u64>,
}

/// Estadísticas agregadas del ledger.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ChainStats {
    pub chain_length: u64,
    pub type_counts: std::collections::BTreeMap<String, u64>,
    pub temporal_class_counts: std::collections::BTreeMap<String, u64>,
    pub status_counts: std::collections::BTreeMap<String, u64>,
    pub shadow_field_size: u64,
    pub lineage_edges: u64,
    pub merkle_batch_count: u64,
    pub unanchored_beads: u64,
    pub unique_tokens: u64,
    pub earliest_bead: Option<String>,
    pub latest_bead: Option<String>,
}

/// Veredicto de la verificación de arranque (desde el último ancla).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum BootVerdict {
    Clean { chain_length: u64, last_anchor_seq: Option<i64> },
    Unanchored { chain_length: u64 },
    Tampered { details: String },
}

/// El gestor del ledger. Un escritor a la vez; lectores concurrentes.
pub struct BeadChain {
    client: ChainDbClient,
    node_signer: Arc<NodeSigner>,
    write_gate: Mutex<()>,
}

impl BeadChain {
    /// Abre el ledger y sincroniza el esquema.
    pub async fn open(ledger_database_url: &str, node_signer: NodeSigner) -> Result<Self, ChainError> {
        let client = ChainDbClient::connect(ledger_database_url).await?;
        Ok(Self { client, node_signer: Arc::new(node_signer), write_gate: Mutex::new(()) })
    }

    pub fn node_signer(&self) -> &NodeSigner {
        &self.node_signer
    }

    // ── Escritura ────────────────────────────────────────────────────

    /// Valida, enlaza al tope, atesta, hashea, firma e inserta en una
    /// transacción (bead + aristas de linaje).
    ///
    /// # Errors:
    /// - `LineageMissing` si un padre declarado no está comprometido.
    /// - `Schema` si el contenido viola las invariantes estructurales.
    /// - `ChainBusy` si el candado de escritura no se adquiere a tiempo.
    #[instrument(skip(self, bead), fields(bead_type = bead.bead_type.as_str()))]
    pub async fn write_bead(&self, mut bead: Bead) -> Result<String, ChainError> {
        let _write_permit = tokio::time::timeout(WRITE_LOCK_TIMEOUT, self.write_gate.lock())
            .await
            .map_err(|_| ChainError::ChainBusy)?;

        bead.validate()?;

        let connection = self.client.get_connection()?;

        // Cierre de linaje: todo padre debe existir ya en el ledger.
        for parent_id in &bead.lineage {
            let mut rows = connection
                .query("SELECT 1 FROM beads WHERE bead_id = ?1", params![parent_id.clone()])
                .await?;
            if rows.next().await?.is_none() {
                return Err(ChainError::LineageMissing { missing_id: parent_id.clone() });
            }
        }

        // Enlace al tope actual de la cadena.
        let mut head_rows = connection
            .query("SELECT bead_id FROM beads ORDER BY seq DESC LIMIT 1", ())
            .await?;
        bead.hash_prev = match head_rows.next().await? {
            Some(row) => Some(row.get::<String>(0)?),
            None => None,
        };

        // Sobre de atestación ANTES del hash: node_id y code_hash integran
        // el contenido canónico.
        bead.attestation.node_id = self.node_signer.node_id().to_string();
        bead.attestation.code_hash = self.node_signer.code_hash().to_string();
        bead.hash_self = bead.compute_hash_self();
        bead.attestation.ecdsa_sig = self
            .node_signer
            .sign_hash(&bead.hash_self)
            .unwrap_or_else(|_| SIGNING_UNAVAILABLE.to_string());

        Self::insert_bead_transactional(&connection, &bead).await?;
        Ok(bead.bead_id)
    }

    /// Inserta un bead ya sellado (hash y firma intactos). Ruta del import:
    /// preservar bit a bit es lo que hace válida la ley export→import.
    async fn insert_preserved(&self, bead: &Bead) -> Result<(), ChainError> {
        let _write_permit = tokio::time::timeout(WRITE_LOCK_TIMEOUT, self.write_gate.lock())
            .await
            .map_err(|_| ChainError::ChainBusy)?;
        let connection = self.client.get_connection()?;
        Self::insert_bead_transactional(&connection, bead).await
    }

    async fn insert_bead_transactional(
        connection: &libsql::Connection,
        bead: &Bead,
    ) -> Result<(), ChainError> {
        let full_bead = bead.to_storage_value();
        let content_json = full_bead.get("content").cloned().unwrap_or(Value::Null).to_string();
        let source_ref_json =
            full_bead.get("source_ref").cloned().unwrap_or(Value::Null).to_string();
        let attestation_json =
            full_bead.get("attestation").cloned().unwrap_or(Value::Null).to_string();

        let transaction = connection.transaction().await?;

        transaction
            .execute(
                r#"INSERT INTO beads
                   (bead_id, bead_type, hash_self, hash_prev, merkle_batch_id,
                    world_time_valid_from, world_time_valid_to,
                    knowledge_time_recorded_at, temporal_class,
                    token_mint, status, tags,
                    content, lineage, source_ref, attestation, full_bead)
                   VALUES (?1,?2,?3,?4,?5, ?6,?7,?8,?9, ?10,?11,?12, ?13,?14,?15,?16,?17)"#,
                params![
                    bead.bead_id.clone(),
                    bead.bead_type.as_str(),
                    bead.hash_self.clone(),
                    opt_text(bead.hash_prev.clone()),
                    opt_text(bead.merkle_batch_id.clone()),
                    opt_text(bead.world_time_valid_from.map(fmt_ts)),
                    opt_text(bead.world_time_valid_to.map(fmt_ts)),
                    fmt_ts(bead.knowledge_time_recorded_at),
                    bead.temporal_class.as_str(),
                    bead.token_mint().to_string(),
                    bead.status.as_str(),
                    serde_json::to_string(&bead.tags).unwrap_or_else(|_| "[]".into()),
                    content_json,
                    serde_json::to_string(&bead.lineage).unwrap_or_else(|_| "[]".into()),
                    source_ref_json,
                    attestation_json,
                    full_bead.to_string(),
                ],
            )
            .await?;

        for (position, parent_id) in bead.lineage.iter().enumerate() {
            transaction
                .execute(
                    "INSERT OR IGNORE INTO bead_lineage (bead_id, parent_id, position) VALUES (?1,?2,?3)",
                    params![bead.bead_id.clone(), parent_id.clone(), position as i64],
                )
                .await?;
        }

        transaction.commit().await?;
        Ok(())
    }

    // ── Lectura ──────────────────────────────────────────────────────

    fn bead_from_full_json(raw: &str) -> Result<Bead, ChainError> {
        let value: Value = serde_json::from_str(raw)
            .map_err(|e| ChainError::Mapping(format!("full_bead parse: {e}")))?;
        Bead::from_storage_value(&value).map_err(ChainError::Schema)
    }

    async fn collect_beads(mut rows: libsql::Rows) -> Result<Vec<Bead>, ChainError> {
        let mut beads = Vec::new();
        while let Some(row) = rows.next().await? {
            beads.push(Self::bead_from_full_json(&row.get::<String>(0)?)?);
        }
        Ok(beads)
    }

    pub async fn get_bead(&self, bead_id: &str) -> Result<Option<Bead>, ChainError> {
        let connection = self.client.get_connection()?;
        let mut rows = connection
            .query("SELECT full_bead FROM beads WHERE bead_id = ?1", params![bead_id.to_string()])
            .await?;
        match rows.next().await? {
            Some(row) => Ok(Some(Self::bead_from_full_json(&row.get::<String>(0)?)?)),
            None => Ok(None),
        }
    }

    pub async fn get_chain_head(&self) -> Result<Option<Bead>, ChainError> {
        let connection = self.client.get_connection()?;
        let mut rows = connection
            .query("SELECT full_bead FROM beads ORDER BY seq DESC LIMIT 1", ())
            .await?;
        match rows.next().await? {
            Some(row) => Ok(Some(Self::bead_from_full_json(&row.get::<String>(0)?)?)),
            None => Ok(None),
        }
    }

    pub async fn get_chain_length(&self) -> Result<u64, ChainError> {
        let connection = self.client.get_connection()?;
        let mut rows = connection.query("SELECT COUNT(*) FROM beads", ()).await?;
        let count = match rows.next().await? {
            Some(row) => row.get::<i64>(0)?,
            None => 0,
        };
        Ok(count as u64)
    }

    pub async fn count_by_type(&self, bead_type: BeadType) -> Result<u64, ChainError> {
        let connection = self.client.get_connection()?;
        let mut rows = connection
            .query("SELECT COUNT(*) FROM beads WHERE bead_type = ?1", params![bead_type.as_str()])
            .await?;
        let count = match rows.next().await? {
            Some(row) => row.get::<i64>(0)?,
            None => 0,
        };
        Ok(count as u64)
    }

    /// Consulta genérica filtrada por una columna, descendente por seq,
    /// con ventana opcional sobre tiempo de conocimiento.
    async fn query_column(
        &self,
        column_sql: &str,
        needle: String,
        window: QueryWindow,
    ) -> Result<Vec<Bead>, ChainError> {
        let connection = self.client.get_connection()?;
        let sql = format!(
            "SELECT full_bead FROM beads WHERE {column_sql} \
             AND knowledge_time_recorded_at >= ?2 AND knowledge_time_recorded_at <= ?3 \
             ORDER BY seq DESC LIMIT ?4"
        );
        let rows = connection
            .query(
                &sql,
                params![needle, window.since_bound(), window.until_bound(), window.limit as i64],
            )
            .await?;
        Self::collect_beads(rows).await
    }

    pub async fn query_by_type(
        &self,
        bead_type: BeadType,
        window: QueryWindow,
    ) -> Result<Vec<Bead>, ChainError> {
        self.query_column("bead_type = ?1", bead_type.as_str().to_string(), window).await
    }

    pub async fn query_by_token(
        &self,
        token_mint: &str,
        window: QueryWindow,
    ) -> Result<Vec<Bead>, ChainError> {
        self.query_column("token_mint = ?1", token_mint.to_string(), window).await
    }

    pub async fn query_by_status(
        &self,
        status: BeadStatus,
        window: QueryWindow,
    ) -> Result<Vec<Bead>, ChainError> {
        self.query_column("status = ?1", status.as_str().to_string(), window).await
    }

    pub async fn query_by_temporal_class(
        &self,
        temporal_class: TemporalClass,
        window: QueryWindow,
    ) -> Result<Vec<Bead>, ChainError> {
        self.query_column("temporal_class = ?1", temporal_class.as_str().to_string(), window).await
    }

    pub async fn query_by_tag(&self, tag: &str, window: QueryWindow) -> Result<Vec<Bead>, ChainError> {
        // tags es un arreglo JSON serializado: el patrón captura el literal citado.
        self.query_column("tags LIKE ?1", format!("%\"{tag}\"%"), window).await
    }

    /// Beads más recientes sin filtro (CLI de inspección).
    pub async fn recent(&self, limit: u32) -> Result<Vec<Bead>, ChainError> {
        let connection = self.client.get_connection()?;
        let rows = connection
            .query("SELECT full_bead FROM beads ORDER BY seq DESC LIMIT ?1", params![limit as i64])
            .await?;
        Self::collect_beads(rows).await
    }

    // ── Consultas bi-temporales ──────────────────────────────────────

    /// Beads cuya ventana de mundo solapa [from, to].
    pub async fn query_world_time_range(
        &self,
        world_from: DateTime<Utc>,
        world_to: DateTime<Utc>,
        bead_type: Option<BeadType>,
    ) -> Result<Vec<Bead>, ChainError> {
        let connection = self.client.get_connection()?;
        let type_filter = bead_type.map(|t| t.as_str().to_string()).unwrap_or_default();
        let rows = connection
            .query(
                "SELECT full_bead FROM beads \
                 WHERE world_time_valid_from IS NOT NULL AND world_time_valid_to IS NOT NULL \
                 AND world_time_valid_from <= ?1 AND world_time_valid_to >= ?2 \
                 AND (?3 = '' OR bead_type = ?3) \
                 ORDER BY seq DESC",
                params![fmt_ts(world_to), fmt_ts(world_from), type_filter],
            )
            .await?;
        Self::collect_beads(rows).await
    }

    /// "¿Qué sabíamos en el instante t?" (tiempo de conocimiento <= t).
    pub async fn query_knowledge_at(
        &self,
        knowledge_time: DateTime<Utc>,
        bead_type: Option<BeadType>,
        token_mint: Option<&str>,
    ) -> Result<Vec<Bead>, ChainError> {
        let connection = self.client.get_connection()?;
        let type_filter = bead_type.map(|t| t.as_str().to_string()).unwrap_or_default();
        let token_filter = token_mint.unwrap_or("").to_string();
        let rows = connection
            .query(
                "SELECT full_bead FROM beads \
                 WHERE knowledge_time_recorded_at <= ?1 \
                 AND (?2 = '' OR bead_type = ?2) \
                 AND (?3 = '' OR token_mint = ?3) \
                 ORDER BY seq DESC LIMIT 200",
                params![fmt_ts(knowledge_time), type_filter, token_filter],
            )
            .await?;
        Self::collect_beads(rows).await
    }

    /// Latencia de refinado: percentiles de (KT - fin de WT) para OBSERVATION.
    pub async fn refinery_latency(
        &self,
        bead_type: Option<BeadType>,
        since: Option<DateTime<Utc>>,
    ) -> Result<LatencyStats, ChainError> {
        let connection = self.client.get_connection()?;
        let type_filter = bead_type.map(|t| t.as_str().to_string()).unwrap_or_default();
        let since_bound = since.map(fmt_ts).unwrap_or_else(|| TS_FLOOR.to_string());
        let mut rows = connection
            .query(
                "SELECT world_time_valid_to, knowledge_time_recorded_at FROM beads \
                 WHERE temporal_class = 'OBSERVATION' AND world_time_valid_to IS NOT NULL \
                 AND (?1 = '' OR bead_type = ?1) \
                 AND knowledge_time_recorded_at >= ?2",
                params![type_filter, since_bound],
            )
            .await?;

        let mut deltas: Vec<f64> = Vec::new();
        while let Some(row) = rows.next().await? {
            let wt_to_raw = row.get::<String>(0)?;
            let kt_raw = row.get::<String>(1)?;
            if let (Ok(wt_to), Ok(kt)) = (
                DateTime::parse_from_rfc3339(&wt_to_raw),
                DateTime::parse_from_rfc3339(&kt_raw),
            ) {
                let delta = (kt - wt_to).num_milliseconds() as f64 / 1000.0;
                if delta >= 0.0 {
                    deltas.push(delta);
                }
            }
        }

        if deltas.is_empty() {
            return Ok(LatencyStats::default());
        }

        deltas.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let count = deltas.len();
        let avg = deltas.iter().sum::<f64>() / count as f64;
        let percentile = |pct: f64| -> f64 {
            let index = ((pct / 100.0) * (count as f64 - 1.0)) as usize;
            deltas[index.min(count - 1)]
        };

        Ok(LatencyStats {
            count: count as u64,
            avg_seconds: (avg * 1000.0).round() / 1000.0,
            p50_seconds: percentile(50.0),
            p95_seconds: percentile(95.0),
            p99_seconds: percentile(99.0),
        })
    }

    // ── Travesía del grafo de linaje ─────────────────────────────────

    /// Padres directos, en el orden declarado.
    pub async fn get_lineage(&self, bead_id: &str) -> Result<Vec<Bead>, ChainError> {
        let connection = self.client.get_connection()?;
        let rows = connection
            .query(
                "SELECT b.full_bead FROM bead_lineage l \
                 JOIN beads b ON b.bead_id = l.parent_id \
                 WHERE l.bead_id = ?1 ORDER BY l.position ASC",
                params![bead_id.to_string()],
            )
            .await?;
        Self::collect_beads(rows).await
    }

    /// Beads que declaran a este id en su linaje.
    pub async fn get_descendants(&self, bead_id: &str) -> Result<Vec<Bead>, ChainError> {
        let connection = self.client.get_connection()?;
        let rows = connection
            .query(
                "SELECT b.full_bead FROM bead_lineage l \
                 JOIN beads b ON b.bead_id = l.bead_id \
                 WHERE l.parent_id = ?1 ORDER BY b.seq DESC",
                params![bead_id.to_string()],
            )
            .await?;
        Self::collect_beads(rows).await
    }

    /// Travesía BFS de ancestros hasta `depth`, deduplicada y ordenada
    /// por distancia de descubrimiento (ancestros cercanos primero).
    pub async fn walk_lineage(&self, bead_id: &str, depth: u32) -> Result<Vec<Bead>, ChainError> {
        let mut visited: HashSet<String> = HashSet::new();
        let mut discovered: Vec<Bead> = Vec::new();
        let mut frontier = vec![bead_id.to_string()];

        for _ in 0..depth {
            if frontier.is_empty() {
                break;
            }
            let mut next_frontier = Vec::new();
            for current_id in frontier {
                if !visited.insert(current_id.clone()) {
                    continue;
                }
                for parent in self.get_lineage(&current_id).await? {
                    if !visited.contains(&parent.bead_id) {
                        next_frontier.push(parent.bead_id.clone());
                        discovered.push(parent);
                    }
                }
            }
            frontier = next_frontier;
        }

        // Un mismo ancestro puede llegar por dos rutas: dedupe conservando
        // la primera distancia de descubrimiento.
        let mut seen: HashSet<String> = HashSet::new();
        discovered.retain(|bead| seen.insert(bead.bead_id.clone()));
        Ok(discovered)
    }

    // ── Campo de Sombra ──────────────────────────────────────────────

    /// Rechazos de propuesta, opcionalmente filtrados por categoría.
    pub async fn query_shadow_field(
        &self,
        category: Option<RejectionCategory>,
        window: QueryWindow,
    ) -> Result<Vec<Bead>, ChainError> {
        match category {
            None => self.query_by_type(BeadType::ProposalRejected, window).await,
            Some(cat) => {
                let connection = self.client.get_connection()?;
                let pattern = format!("%\"rejection_category\":\"{}\"%", cat.as_str());
                let rows = connection
                    .query(
                        "SELECT full_bead FROM beads \
                         WHERE bead_type = 'PROPOSAL_REJECTED' AND content LIKE ?1 \
                         AND knowledge_time_recorded_at >= ?2 AND knowledge_time_recorded_at <= ?3 \
                         ORDER BY seq DESC LIMIT ?4",
                        params![
                            pattern,
                            window.since_bound(),
                            window.until_bound(),
                            window.limit as i64
                        ],
                    )
                    .await?;
                Self::collect_beads(rows).await
            }
        }
    }

    pub async fn shadow_field_stats(&self) -> Result<ShadowFieldStats, ChainError> {
        let connection = self.client.get_connection()?;
        let mut rows = connection
            .query("SELECT content FROM beads WHERE bead_type = 'PROPOSAL_REJECTED'", ())
            .await?;

        let mut stats = ShadowFieldStats::default();
        while let Some(row) = rows.next().await? {
            stats.total_rejections += 1;
            let category = serde_json::from_str::<Value>(&row.get::<String>(0)?)
                .ok()
                .and_then(|content| {
                    content
                        .get("rejection_category")
                        .and_then(Value::as_str)
                        .map(str::to_string)
                })
                .unwrap_or_else(|| "PARSE_ERROR".to_string());
            *stats.category_distribution.entry(category).or_insert(0) += 1;
        }
        Ok(stats)
    }

    // ── Integridad ───────────────────────────────────────────────────

    /// Verificación completa: recomputa cada hash, valida el enlace
    /// hash_prev con la fila anterior y verifica cada firma ECDSA.
    pub async fn verify_chain(&self) -> Result<ChainVerifyResult, ChainError> {
        self.verify_from_seq(0).await
    }

    /// Verificación desde una secuencia dada (arranque: desde el último ancla).
    pub async fn verify_from_seq(&self, from_seq: i64) -> Result<ChainVerifyResult, ChainError> {
        let connection = self.client.get_connection()?;
        let mut rows = connection
            .query(
                "SELECT seq, bead_id, hash_self, hash_prev, full_bead FROM beads \
                 WHERE seq >= ?1 ORDER BY seq ASC",
                params![from_seq],
            )
            .await?;

        let mut total: u64 = 0;
        let mut signature_failures: u64 = 0;
        let mut previous_bead_id: Option<String> = None;
        let mut first_row = true;

        while let Some(row) = rows.next().await? {
            total += 1;
            let seq = row.get::<i64>(0)?;
            let bead_id = row.get::<String>(1)?;
            let stored_hash = row.get::<String>(2)?;
            let stored_prev = match row.get_value(3)? {
                libsql::Value::Text(text) => Some(text),
                _ => None,
            };
            let bead = Self::bead_from_full_json(&row.get::<String>(4)?)?;

            let recomputed = bead.compute_hash_self();
            if recomputed != stored_hash {
                return Ok(ChainVerifyResult {
                    valid: false,
                    total_beads: total,
                    verified_beads: total - 1,
                    first_break_seq: Some(seq),
                    signature_failures,
                    message: format!(
                        "Hash mismatch at seq {seq}: stored={}... recomputed={}...",
                        &stored_hash[..16.min(stored_hash.len())],
                        &recomputed[..16]
                    ),
                });
            }

            // El génesis (y el primer bead del rango verificado) acepta
            // hash_prev nulo como frontera válida.
            if !first_row && stored_prev.as_deref() != previous_bead_id.as_deref() {
                return Ok(ChainVerifyResult {
                    valid: false,
                    total_beads: total,
                    verified_beads: total - 1,
                    first_break_seq: Some(seq),
                    signature_failures,
                    message: format!(
                        "Chain break at seq {seq}: expected prev={:?} stored prev={:?}",
                        previous_bead_id.as_deref().map(|p| &p[..8.min(p.len())]),
                        stored_prev.as_deref().map(|p| &p[..8.min(p.len())]),
                    ),
                });
            }

            // Verificación ECDSA best-effort: el centinela queda excluido.
            // Verifica contra la llave del propio nodo; beads de nodos
            // remotos cuentan como fallo hasta que su llave se publique aquí.
            let signature = &bead.attestation.ecdsa_sig;
            if !signature.is_empty() && signature != SIGNING_UNAVAILABLE
                && !self.node_signer.verify_signature(&stored_hash, signature, None)
            {
                signature_failures += 1;
            }

            previous_bead_id = Some(bead_id);
            first_row = false;
        }

        Ok(ChainVerifyResult {
            valid: true,
            total_beads: total,
            verified_beads: total,
            first_break_seq: None,
            signature_failures,
            message: if total == 0 {
                "Empty chain".to_string()
            } else {
                format!(
                    "Chain verified: {total} beads, integrity OK{}",
                    if signature_failures > 0 {
                        format!(" ({signature_failures} sig failures)")
                    } else {
                        String::new()
                    }
                )
            },
        })
    }

    /// Verificación de arranque: cadena desde el último ancla hacia
    /// adelante más recomputación de la raíz Merkle del último lote.
    pub async fn verify_on_boot(&self) -> Result<BootVerdict, ChainError> {
        let chain_length = self.get_chain_length().await?;
        if chain_length == 0 {
            return Ok(BootVerdict::Clean { chain_length: 0, last_anchor_seq: None });
        }

        let last_batch = self.latest_batch().await?;
        let from_seq = last_batch.as_ref().map(|batch| batch.seq_start).unwrap_or(0);

        let verify = self.verify_from_seq(from_seq).await?;
        if !verify.valid {
            return Ok(BootVerdict::Tampered { details: verify.message });
        }

        if let Some(batch) = &last_batch {
            let hashes = self.batch_hashes(&batch.batch_id).await?;
            let recomputed_root = compute_merkle_root(&hashes);
            if recomputed_root != batch.merkle_root {
                return Ok(BootVerdict::Tampered {
                    details: format!(
                        "Merkle root mismatch for batch {}: stored={}... recomputed={}...",
                        batch.batch_id,
                        &batch.merkle_root[..16.min(batch.merkle_root.len())],
                        &recomputed_root[..16]
                    ),
                });
            }
            return Ok(BootVerdict::Clean {
                chain_length,
                last_anchor_seq: Some(batch.seq_end),
            });
        }

        Ok(BootVerdict::Unanchored { chain_length })
    }

    // ── Anclaje Merkle ───────────────────────────────────────────────

    /// Evalúa los disparadores de anclaje en orden de prioridad.
    pub async fn check_anchor_trigger(&self) -> Result<Option<AnchorTrigger>, ChainError> {
        let connection = self.client.get_connection()?;

        let mut unanchored_rows = connection
            .query("SELECT COUNT(*) FROM beads WHERE merkle_batch_id IS NULL", ())
            .await?;
        let unanchored = match unanchored_rows.next().await? {
            Some(row) => row.get::<i64>(0)?,
            None => 0,
        };

        let mut decision_rows = connection
            .query(
                "SELECT COUNT(*) FROM beads WHERE merkle_batch_id IS NULL \
                 AND bead_type IN ('SIGNAL', 'PROPOSAL')",
                (),
            )
            .await?;
        let decision_beads = match decision_rows.next().await? {
            Some(row) => row.get::<i64>(0)?,
            None => 0,
        };

        if decision_beads > 0 {
            return Ok(Some(AnchorTrigger::DecisionBoundary));
        }
        if unanchored >= ANCHOR_MAX_BEADS {
            return Ok(Some(AnchorTrigger::MaxBeads));
        }

        let mut anchor_rows = connection
            .query("SELECT created_at FROM merkle_batches ORDER BY created_at DESC LIMIT 1", ())
            .await?;
        match anchor_rows.next().await? {
            Some(row) => {
                let created_raw = row.get::<String>(0)?;
                if let Ok(created_at) = DateTime::parse_from_rfc3339(&created_raw) {
                    let elapsed = (Utc::now() - created_at.with_timezone(&Utc)).num_seconds();
                    if elapsed >= ANCHOR_MAX_AGE_SECONDS && unanchored > 0 {
                        return Ok(Some(AnchorTrigger::MaxTime));
                    }
                }
                Ok(None)
            }
            // Sin ancla previa: cualquier bead pendiente amerita la primera.
            None if unanchored > 0 => Ok(Some(AnchorTrigger::MaxTime)),
            None => Ok(None),
        }
    }

    /// Sella un lote Merkle sobre los beads sin anclar y les backfillea
    /// el batch_id. Retorna None si no hay beads pendientes.
    #[instrument(skip(self))]
    pub async fn create_merkle_batch(
        &self,
        trigger: AnchorTrigger,
        trigger_bead_id: Option<&str>,
    ) -> Result<Option<String>, ChainError> {
        let _write_permit = tokio::time::timeout(WRITE_LOCK_TIMEOUT, self.write_gate.lock())
            .await
            .map_err(|_| ChainError::ChainBusy)?;
        let connection = self.client.get_connection()?;

        let mut rows = connection
            .query(
                "SELECT bead_id, hash_self FROM beads WHERE merkle_batch_id IS NULL ORDER BY seq ASC",
                (),
            )
            .await?;

        let mut bead_ids: Vec<String> = Vec::new();
        let mut hashes: Vec<String> = Vec::new();
        while let Some(row) = rows.next().await? {
            bead_ids.push(row.get::<String>(0)?);
            hashes.push(row.get::<String>(1)?);
        }

        if bead_ids.is_empty() {
            return Ok(None);
        }

        let merkle_root = compute_merkle_root(&hashes);
        let batch_id = Uuid::now_v7().to_string();

        let transaction = connection.transaction().await?;
        transaction
            .execute(
                "INSERT INTO merkle_batches \
                 (batch_id, merkle_root, bead_count, trigger_type, trigger_bead_id, created_at) \
                 VALUES (?1,?2,?3,?4,?5,?6)",
                params![
                    batch_id.clone(),
                    merkle_root.clone(),
                    bead_ids.len() as i64,
                    trigger.as_str(),
                    opt_text(trigger_bead_id.map(str::to_string)),
                    fmt_ts(Utc::now()),
                ],
            )
            .await?;
        for bead_id in &bead_ids {
            transaction
                .execute(
                    "UPDATE beads SET merkle_batch_id = ?1 WHERE bead_id = ?2",
                    params![batch_id.clone(), bead_id.clone()],
                )
                .await?;
        }
        transaction.commit().await?;

        info!(
            "🧾 [MERKLE]: Batch {} sealed over {} beads (root {}...)",
            batch_id,
            bead_ids.len(),
            &merkle_root[..16]
        );
        Ok(Some(batch_id))
    }

    async fn batch_from_row(&self, row: &libsql::Row) -> Result<MerkleBatch, ChainError> {
        let batch_id = row.get::<String>(0)?;
        let (seq_start, seq_end) = self.batch_seq_range(&batch_id).await?;
        Ok(MerkleBatch {
            batch_id,
            merkle_root: row.get::<String>(1)?,
            bead_count: row.get::<i64>(2)? as u64,
            trigger_type: row.get::<String>(3)?,
            trigger_bead_id: match row.get_value(4)? {
                libsql::Value::Text(text) => Some(text),
                _ => None,
            },
            created_at: row.get::<String>(5)?,
            anchor_tx: match row.get_value(6)? {
                libsql::Value::Text(text) => Some(text),
                _ => None,
            },
            seq_start,
            seq_end,
        })
    }

    async fn batch_seq_range(&self, batch_id: &str) -> Result<(i64, i64), ChainError> {
        let connection = self.client.get_connection()?;
        let mut rows = connection
            .query(
                "SELECT MIN(seq), MAX(seq) FROM beads WHERE merkle_batch_id = ?1",
                params![batch_id.to_string()],
            )
            .await?;
        match rows.next().await? {
            Some(row) => {
                let start = match row.get_value(0)? {
                    libsql::Value::Integer(v) => v,
                    _ => 0,
                };
                let end = match row.get_value(1)? {
                    libsql::Value::Integer(v) => v,
                    _ => 0,
                };
                Ok((start, end))
            }
            None => Ok((0, 0)),
        }
    }

    async fn batch_hashes(&self, batch_id: &str) -> Result<Vec<String>, ChainError> {
        let connection = self.client.get_connection()?;
        let mut rows = connection
            .query(
                "SELECT hash_self FROM beads WHERE merkle_batch_id = ?1 ORDER BY seq ASC",
                params![batch_id.to_string()],
            )
            .await?;
        let mut hashes = Vec::new();
        while let Some(row) = rows.next().await? {
            hashes.push(row.get::<String>(0)?);
        }
        Ok(hashes)
    }

    pub async fn latest_batch(&self) -> Result<Option<MerkleBatch>, ChainError> {
        let connection = self.client.get_connection()?;
        let mut rows = connection
            .query(
                "SELECT batch_id, merkle_root, bead_count, trigger_type, trigger_bead_id, \
                 created_at, anchor_tx FROM merkle_batches ORDER BY created_at DESC LIMIT 1",
                (),
            )
            .await?;
        match rows.next().await? {
            Some(row) => Ok(Some(self.batch_from_row(&row).await?)),
            None => Ok(None),
        }
    }

    /// Lotes sellados pendientes de sumisión externa. La sumisión es
    /// best-effort: el registro persiste y se reintenta en el próximo ciclo.
    pub async fn pending_anchor_batches(&self) -> Result<Vec<MerkleBatch>, ChainError> {
        let connection = self.client.get_connection()?;
        let mut rows = connection
            .query(
                "SELECT batch_id, merkle_root, bead_count, trigger_type, trigger_bead_id, \
                 created_at, anchor_tx FROM merkle_batches WHERE anchor_tx IS NULL \
                 ORDER BY created_at ASC",
                (),
            )
            .await?;
        let mut batches = Vec::new();
        while let Some(row) = rows.next().await? {
            batches.push(self.batch_from_row(&row).await?);
        }
        Ok(batches)
    }

    pub async fn mark_batch_anchored(
        &self,
        batch_id: &str,
        anchor_tx: &str,
    ) -> Result<(), ChainError> {
        let connection = self.client.get_connection()?;
        connection
            .execute(
                "UPDATE merkle_batches SET anchor_tx = ?1 WHERE batch_id = ?2",
                params![anchor_tx.to_string(), batch_id.to_string()],
            )
            .await?;
        Ok(())
    }

    // ── Ciclo de vida ────────────────────────────────────────────────

    /// Escribe el bead sucesor (que DEBE referenciar al viejo en su
    /// linaje) y marca el viejo como SUPERSEDED. Las transiciones son
    /// aditivas: el bead viejo jamás se reescribe en contenido.
    pub async fn supersede(&self, old_bead_id: &str, successor: Bead) -> Result<String, ChainError> {
        if !successor.lineage.iter().any(|parent| parent == old_bead_id) {
            return Err(ChainError::LineageMissing { missing_id: old_bead_id.to_string() });
        }
        let successor_id = self.write_bead(successor).await?;
        self.update_status(old_bead_id, BeadStatus::Superseded).await?;
        Ok(successor_id)
    }

    /// Marcador de almacenamiento frío.
    pub async fn mark_archived(&self, bead_id: &str) -> Result<(), ChainError> {
        self.update_status(bead_id, BeadStatus::Archived).await
    }

    async fn update_status(&self, bead_id: &str, status: BeadStatus) -> Result<(), ChainError> {
        let connection = self.client.get_connection()?;
        // El status vive fuera de la cobertura del hash: la fila conserva
        // su hash_self sellado mientras el full_bead refleja el ciclo de vida.
        let mut rows = connection
            .query("SELECT full_bead FROM beads WHERE bead_id = ?1", params![bead_id.to_string()])
            .await?;
        let Some(row) = rows.next().await? else {
            return Err(ChainError::LineageMissing { missing_id: bead_id.to_string() });
        };
        let mut full: Value = serde_json::from_str(&row.get::<String>(0)?)
            .map_err(|e| ChainError::Mapping(format!("full_bead parse: {e}")))?;
        full["status"] = Value::String(status.as_str().to_string());

        connection
            .execute(
                "UPDATE beads SET status = ?1, full_bead = ?2 WHERE bead_id = ?3",
                params![status.as_str(), full.to_string(), bead_id.to_string()],
            )
            .await?;
        Ok(())
    }

    // ── Export / Import ──────────────────────────────────────────────

    /// Cadena completa como JSONL (una línea por bead, claves ordenadas,
    /// UTF-8, terminado en LF). Apto para git y migración.
    pub async fn export_jsonl(&self, path: &Path) -> Result<usize, ChainError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ChainError::Io(e.to_string()))?;
        }
        let connection = self.client.get_connection()?;
        let mut rows = connection
            .query("SELECT full_bead FROM beads ORDER BY seq ASC", ())
            .await?;

        let mut output = String::new();
        let mut count = 0usize;
        while let Some(row) = rows.next().await? {
            output.push_str(&row.get::<String>(0)?);
            output.push('\n');
            count += 1;
        }
        std::fs::write(path, output).map_err(|e| ChainError::Io(e.to_string()))?;
        Ok(count)
    }

    /// Importa desde JSONL preservando hashes, firmas y linaje bit a bit.
    /// Beads cuyo id ya existe se omiten. Líneas malformadas se saltan.
    pub async fn import_jsonl(&self, path: &Path) -> Result<usize, ChainError> {
        if !path.exists() {
            return Ok(0);
        }
        let raw = std::fs::read_to_string(path).map_err(|e| ChainError::Io(e.to_string()))?;

        let mut imported = 0usize;
        for line in raw.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let bead = match Self::bead_from_full_json(line) {
                Ok(bead) => bead,
                Err(e) => {
                    warn!("⚪ [IMPORT_SKIP]: malformed line ignored: {}", e);
                    continue;
                }
            };
            if self.get_bead(&bead.bead_id).await?.is_some() {
                continue;
            }
            self.insert_preserved(&bead).await?;
            imported += 1;
        }
        Ok(imported)
    }

    // ── Estadísticas ─────────────────────────────────────────────────

    async fn count_grouped(
        connection: &libsql::Connection,
        sql: &str,
    ) -> Result<std::collections::BTreeMap<String, u64>, ChainError> {
        let mut grouped = std::collections::BTreeMap::new();
        let mut rows = connection.query(sql, ()).await?;
        while let Some(row) = rows.next().await? {
            grouped.insert(row.get::<String>(0)?, row.get::<i64>(1)? as u64);
        }
        Ok(grouped)
    }

    async fn count_scalar(
        connection: &libsql::Connection,
        sql: &str,
    ) -> Result<i64, ChainError> {
        let mut rows = connection.query(sql, ()).await?;
        Ok(match rows.next().await? {
            Some(row) => match row.get_value(0)? {
                libsql::Value::Integer(v) => v,
                _ => 0,
            },
            None => 0,
        })
    }

    pub async fn chain_stats(&self) -> Result<ChainStats, ChainError> {
        let connection = self.client.get_connection()?;
        let mut stats = ChainStats { chain_length: self.get_chain_length().await?, ..Default::default() };

        stats.type_counts =
            Self::count_grouped(&connection, "SELECT bead_type, COUNT(*) FROM beads GROUP BY bead_type")
                .await?;
        stats.temporal_class_counts = Self::count_grouped(
            &connection,
            "SELECT temporal_class, COUNT(*) FROM beads GROUP BY temporal_class",
        )
        .await?;
        stats.status_counts =
            Self::count_grouped(&connection, "SELECT status, COUNT(*) FROM beads GROUP BY status")
                .await?;

        stats.shadow_field_size = self.count_by_type(BeadType::ProposalRejected).await?;

        stats.lineage_edges =
            Self::count_scalar(&connection, "SELECT COUNT(*) FROM bead_lineage").await? as u64;
        stats.merkle_batch_count =
            Self::count_scalar(&connection, "SELECT COUNT(*) FROM merkle_batches").await? as u64;
        stats.unanchored_beads = Self::count_scalar(
            &connection,
            "SELECT COUNT(*) FROM beads WHERE merkle_batch_id IS NULL",
        )
        .await? as u64;
        stats.unique_tokens = Self::count_scalar(
            &connection,
            "SELECT COUNT(DISTINCT token_mint) FROM beads WHERE token_mint != ''",
        )
        .await? as u64;

        let mut range_rows = connection
            .query(
                "SELECT MIN(knowledge_time_recorded_at), MAX(knowledge_time_recorded_at) FROM beads",
                (),
            )
            .await?;
        if let Some(row) = range_rows.next().await? {
            stats.earliest_bead = match row.get_value(0)? {
                libsql::Value::Text(text) => Some(text),
                _ => None,
            };
            stats.latest_bead = match row.get_value(1)? {
                libsql::Value::Text(text) => Some(text),
                _ => None,
            };
        }

        Ok(stats)
    }

    // ── Proving grounds ──────────────────────────────────────────────

    /// Corrompe el hash almacenado de una fila. SOLO para certificación
    /// de detección de manipulación; jamás invocado por el pipeline.
    #[doc(hidden)]
    pub async fn tamper_hash_for_tests(&self, seq: i64, forged_hash: &str) -> Result<(), ChainError> {
        let connection = self.client.get_connection()?;
        connection
            .execute(
                "UPDATE beads SET hash_self = ?1 WHERE seq = ?2",
                params![forged_hash.to_string(), seq],
            )
            .await?;
        Ok(())
    }
}
