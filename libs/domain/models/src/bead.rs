// [libs/domain/models/src/bead.rs]
/*!
 * =================================================================
 * APARATO: BEAD FIELD SCHEMA (V3.0 - BI-TEMPORAL MASTER)
 * CLASIFICACIÓN: DOMAIN MODELS (ESTRATO L2)
 * RESPONSABILIDAD: CONTRATO DEL REGISTRO ATÓMICO DEL SUSTRATO
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. SUM TYPE PAYLOADS: Un variante de contenido por tipo de bead,
 *    erradicando mapas sin tipar de las rutas calientes.
 * 2. CANONICAL HASHING: Serialización determinista (claves ordenadas,
 *    separadores compactos, RFC 3339) para que contenido idéntico
 *    produzca hash idéntico en cualquier motor de almacenamiento.
 * 3. TEMPORAL DISCIPLINE: OBSERVATION exige ventana de tiempo de mundo,
 *    PATTERN la prohíbe, DERIVED admite ambas.
 *
 * # Mathematical Proof (Hash Determinism):
 * serde_json sin 'preserve_order' materializa los objetos sobre un
 * BTreeMap: la emisión de claves es lexicográfica y estable. Por tanto
 * hash_self = SHA256(canonical(bead)) es una función pura del contenido.
 * =================================================================
 */

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::errors::SchemaViolation;

/// Centinela de firma cuando la llave de atestación no está disponible.
/// El verificador excluye estos beads del conteo de fallos de firma.
pub const SIGNING_UNAVAILABLE: &str = "signing_unavailable";

// ── Enumeraciones del encabezado ─────────────────────────────────────

/// Conjunto exhaustivo de tipos de bead del sustrato de inteligencia.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum BeadType {
    #[serde(rename = "FACT")]
    Fact,
    #[serde(rename = "CLAIM")]
    Claim,
    #[serde(rename = "SIGNAL")]
    Signal,
    #[serde(rename = "PROPOSAL")]
    Proposal,
    #[serde(rename = "PROPOSAL_REJECTED")]
    ProposalRejected,
    #[serde(rename = "HEARTBEAT")]
    Heartbeat,
    #[serde(rename = "POLICY")]
    Policy,
    #[serde(rename = "MODEL_VERSION")]
    ModelVersion,
    #[serde(rename = "AUTOPSY")]
    Autopsy,
    #[serde(rename = "SKILL")]
    Skill,
}

impl BeadType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BeadType::Fact => "FACT",
            BeadType::Claim => "CLAIM",
            BeadType::Signal => "SIGNAL",
            BeadType::Proposal => "PROPOSAL",
            BeadType::ProposalRejected => "PROPOSAL_REJECTED",
            BeadType::Heartbeat => "HEARTBEAT",
            BeadType::Policy => "POLICY",
            BeadType::ModelVersion => "MODEL_VERSION",
            BeadType::Autopsy => "AUTOPSY",
            BeadType::Skill => "SKILL",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, SchemaViolation> {
        serde_json::from_value(Value::String(raw.to_string())).map_err(|_| {
            SchemaViolation::Malformed {
                field: "bead_type".into(),
                reason: format!("unknown bead type '{raw}'"),
            }
        })
    }

    /// Tipos cuyo linaje debe ser no vacío (INV de cierre de linaje).
    pub fn requires_lineage(&self) -> bool {
        matches!(
            self,
            BeadType::Claim
                | BeadType::Signal
                | BeadType::Proposal
                | BeadType::ProposalRejected
                | BeadType::Autopsy
        )
    }
}

/// Clase temporal del bead dentro del modelo bi-temporal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TemporalClass {
    /// Describe el mundo durante una ventana: exige tiempo de mundo.
    #[serde(rename = "OBSERVATION")]
    Observation,
    /// Inferencia del agente: admite ventana opcional.
    #[serde(rename = "DERIVED")]
    Derived,
    /// Regularidad atemporal: prohíbe ventana de mundo.
    #[serde(rename = "PATTERN")]
    Pattern,
}

impl TemporalClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            TemporalClass::Observation => "OBSERVATION",
            TemporalClass::Derived => "DERIVED",
            TemporalClass::Pattern => "PATTERN",
        }
    }
}

/// Ciclo de vida del bead. Nace ACTIVE; las transiciones son aditivas
/// (un bead nuevo referencia al viejo vía linaje). Sin borrados.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum BeadStatus {
    #[serde(rename = "ACTIVE")]
    Active,
    #[serde(rename = "SUPERSEDED")]
    Superseded,
    #[serde(rename = "ARCHIVED")]
    Archived,
}

impl BeadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BeadStatus::Active => "ACTIVE",
            BeadStatus::Superseded => "SUPERSEDED",
            BeadStatus::Archived => "ARCHIVED",
        }
    }
}

/// Taxonomía del Campo de Sombra (rechazos de propuesta).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RejectionCategory {
    /// Bloqueo por límites de riesgo: exige referencia a bead POLICY.
    #[serde(rename = "RISK_BREACH")]
    RiskBreach,
    #[serde(rename = "WARDEN_VETO")]
    WardenVeto,
    #[serde(rename = "CONVICTION_VETO")]
    ConvictionVeto,
    #[serde(rename = "SCORE_FLOOR")]
    ScoreFloor,
    #[serde(rename = "TIME_MISMATCH")]
    TimeMismatch,
    #[serde(rename = "UNKNOWN")]
    Unknown,
}

impl RejectionCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectionCategory::RiskBreach => "RISK_BREACH",
            RejectionCategory::WardenVeto => "WARDEN_VETO",
            RejectionCategory::ConvictionVeto => "CONVICTION_VETO",
            RejectionCategory::ScoreFloor => "SCORE_FLOOR",
            RejectionCategory::TimeMismatch => "TIME_MISMATCH",
            RejectionCategory::Unknown => "UNKNOWN",
        }
    }
}

/// Procedencia del bead (quién lo produjo).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SourceType {
    #[serde(rename = "agent")]
    Agent,
    #[serde(rename = "market_data")]
    MarketData,
    #[serde(rename = "human")]
    Human,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceRef {
    pub source_type: SourceType,
    pub source_id: String,
}

impl SourceRef {
    pub fn agent(source_id: impl Into<String>) -> Self {
        Self { source_type: SourceType::Agent, source_id: source_id.into() }
    }

    pub fn market_data(source_id: impl Into<String>) -> Self {
        Self { source_type: SourceType::MarketData, source_id: source_id.into() }
    }
}

/// Sobre de atestación: prueba "este nodo produjo este bead".
/// node_id y code_hash entran al hash canónico; ecdsa_sig queda fuera
/// (firma sobre el hash, no parte del contenido hasheado).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Attestation {
    pub node_id: String,
    pub code_hash: String,
    pub ecdsa_sig: String,
}

// ── Cargas tipadas por tipo de bead ──────────────────────────────────

/// FACT: resumen de la salida de una fuente de datos en un ciclo.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FactContent {
    pub symbol: String,
    pub field: String,
    pub value: Value,
    pub as_of_world_time: DateTime<Utc>,
    pub provider: String,
}

/// CLAIM: inferencia intermedia del agente con rastro de razonamiento.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClaimContent {
    pub conclusion: String,
    pub reasoning_trace: String,
    #[serde(default)]
    pub premises_ref: Vec<String>,
    pub confidence_basis: String,
    pub domain: String,
    #[serde(default)]
    pub tokens_referenced: Vec<String>,
}

/// SIGNAL: candidato puntuado con desglose de convicción completo.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SignalContent {
    pub token_mint: String,
    pub token_symbol: String,
    pub play_type: String,
    pub discovery_source: String,
    #[serde(default)]
    pub scoring_breakdown: BTreeMap<String, i64>,
    pub ordering_score: i64,
    pub permission_score: i64,
    pub warden_verdict: String,
    #[serde(default)]
    pub red_flags: BTreeMap<String, i64>,
    #[serde(default)]
    pub primary_sources: Vec<String>,
    pub recommendation: String,
    #[serde(default)]
    pub raw_metrics: BTreeMap<String, Value>,
    #[serde(default)]
    pub supporting_facts: Vec<String>,
    #[serde(default)]
    pub supporting_claims: Vec<String>,
}

/// Plan de salida defensiva adjunto a una propuesta.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StopLossPlan {
    pub stop_loss_pct: f64,
    pub trailing_from_peak_pct: f64,
}

/// PROPOSAL: intención de trade (paper o live).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProposalContent {
    pub signal_ref: String,
    pub action: String,
    pub token_mint: String,
    pub token_symbol: String,
    pub entry_price_fdv: Option<f64>,
    pub position_size_sol: Option<f64>,
    pub execution_venue: String,
    pub gate: String,
    pub stop_loss: Option<StopLossPlan>,
    #[serde(default)]
    pub constraints: Vec<String>,
}

/// PROPOSAL_REJECTED: instantánea completa del rechazo. Este ES el Campo de Sombra.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProposalRejectedContent {
    pub signal_ref: String,
    pub action: String,
    pub token_mint: String,
    pub token_symbol: String,
    pub execution_venue: String,
    pub gate: String,
    pub rejection_source: String,
    pub rejection_reason: String,
    pub rejection_category: RejectionCategory,
    pub rejection_policy_ref: Option<String>,
    #[serde(default)]
    pub scoring_breakdown_at_rejection: BTreeMap<String, i64>,
    pub warden_detail: Option<Value>,
    #[serde(default)]
    pub risk_metrics_at_rejection: BTreeMap<String, Value>,
}

/// Diagnóstico de embudo: cuenta señales por etapa del pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct FunnelDiagnostics {
    pub oracle_raw: u32,
    pub oracle_filtered: u32,
    pub mobula_raw: u32,
    pub mobula_resolved: u32,
    pub pulse_raw: u32,
    pub pulse_filtered: u32,
    pub narrative_raw: u32,
    pub narrative_with_spike: u32,
    pub reached_scorer: u32,
    pub scored_discard: u32,
    pub scored_watchlist: u32,
    pub scored_execute: u32,
    pub scored_veto: u32,
}

/// HEARTBEAT: metadatos de ciclo para el rastro de salud del pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HeartbeatContent {
    pub cycle_number: u64,
    pub signals_found: u32,
    pub signals_vetoed: u32,
    pub proposals_emitted: u32,
    pub pot_sol: f64,
    pub positions_count: u32,
    #[serde(default)]
    pub pipeline_health: BTreeMap<String, String>,
    pub observe_only: bool,
    pub data_completeness: f64,
    #[serde(default)]
    pub errors: Vec<String>,
    pub state_hash: String,
    #[serde(default)]
    pub funnel: FunnelDiagnostics,
    pub previous_heartbeat_id: Option<String>,
}

/// POLICY: instantánea de configuración de riesgo/ejecución.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PolicyContent {
    pub policy_name: String,
    pub policy_type: String,
    pub rules: Value,
    pub effective_from: DateTime<Utc>,
    pub supersedes: Option<String>,
    pub authority: String,
}

/// MODEL_VERSION: configuración del razonador externo en despliegue.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelVersionContent {
    pub model_name: String,
    pub version_hash: String,
    pub purpose: String,
    pub deployment_status: String,
    #[serde(default)]
    pub config_snapshot: BTreeMap<String, Value>,
}

/// AUTOPSY: evaluación post-trade con PnL y reflexión.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AutopsyContent {
    pub trade_bead_id: String,
    pub token_mint: String,
    pub token_symbol: String,
    pub pnl_sol: f64,
    pub pnl_pct: f64,
    pub exit_price: f64,
    pub exit_reason: String,
    pub hold_duration_seconds: i64,
    pub lesson: String,
    pub supports_thesis: Option<bool>,
    /// Etiquetas de señal de la entrada (alimenta el recall del Edge Bank).
    #[serde(default)]
    pub signals: Vec<String>,
}

/// SKILL: diagnóstico de auto-reparación con comando sugerido y compuerta.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SkillContent {
    pub skill_name: String,
    pub root_cause: String,
    pub severity: String,
    pub reasoning: String,
    pub suggested_command: Option<String>,
    pub command_gate: String,
    pub diagnostics_digest: String,
}

/// Unión discriminada de cargas. El discriminante vive en el encabezado
/// (bead_type); la carga serializa únicamente sus campos propios.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum BeadContent {
    Fact(FactContent),
    Claim(ClaimContent),
    Signal(SignalContent),
    Proposal(ProposalContent),
    ProposalRejected(ProposalRejectedContent),
    Heartbeat(HeartbeatContent),
    Policy(PolicyContent),
    ModelVersion(ModelVersionContent),
    Autopsy(AutopsyContent),
    Skill(SkillContent),
}

impl BeadContent {
    /// Tipo de bead implicado por la carga.
    pub fn kind(&self) -> BeadType {
        match self {
            BeadContent::Fact(_) => BeadType::Fact,
            BeadContent::Claim(_) => BeadType::Claim,
            BeadContent::Signal(_) => BeadType::Signal,
            BeadContent::Proposal(_) => BeadType::Proposal,
            BeadContent::ProposalRejected(_) => BeadType::ProposalRejected,
            BeadContent::Heartbeat(_) => BeadType::Heartbeat,
            BeadContent::Policy(_) => BeadType::Policy,
            BeadContent::ModelVersion(_) => BeadType::ModelVersion,
            BeadContent::Autopsy(_) => BeadType::Autopsy,
            BeadContent::Skill(_) => BeadType::Skill,
        }
    }

    /// Reconstrucción desde almacenamiento: el encabezado provee el discriminante.
    pub fn from_value(bead_type: BeadType, raw: Value) -> Result<Self, SchemaViolation> {
        let map_err = |e: serde_json::Error| SchemaViolation::Malformed {
            field: "content".into(),
            reason: e.to_string(),
        };
        Ok(match bead_type {
            BeadType::Fact => BeadContent::Fact(serde_json::from_value(raw).map_err(map_err)?),
            BeadType::Claim => BeadContent::Claim(serde_json::from_value(raw).map_err(map_err)?),
            BeadType::Signal => BeadContent::Signal(serde_json::from_value(raw).map_err(map_err)?),
            BeadType::Proposal => {
                BeadContent::Proposal(serde_json::from_value(raw).map_err(map_err)?)
            }
            BeadType::ProposalRejected => {
                BeadContent::ProposalRejected(serde_json::from_value(raw).map_err(map_err)?)
            }
            BeadType::Heartbeat => {
                BeadContent::Heartbeat(serde_json::from_value(raw).map_err(map_err)?)
            }
            BeadType::Policy => BeadContent::Policy(serde_json::from_value(raw).map_err(map_err)?),
            BeadType::ModelVersion => {
                BeadContent::ModelVersion(serde_json::from_value(raw).map_err(map_err)?)
            }
            BeadType::Autopsy => {
                BeadContent::Autopsy(serde_json::from_value(raw).map_err(map_err)?)
            }
            BeadType::Skill => BeadContent::Skill(serde_json::from_value(raw).map_err(map_err)?),
        })
    }

    /// Extrae el token_mint para el índice desnormalizado del ledger.
    pub fn token_mint(&self) -> &str {
        match self {
            BeadContent::Signal(c) => &c.token_mint,
            BeadContent::Proposal(c) => &c.token_mint,
            BeadContent::ProposalRejected(c) => &c.token_mint,
            BeadContent::Autopsy(c) => &c.token_mint,
            _ => "",
        }
    }
}

// ── El Bead ──────────────────────────────────────────────────────────

/// Borrador de bead previo al compromiso en cadena.
/// El ledger completa hash_prev, atestación, hash_self y firma al escribir.
#[derive(Debug, Clone)]
pub struct BeadDraft {
    pub temporal_class: TemporalClass,
    pub source_ref: SourceRef,
    pub content: BeadContent,
    pub lineage: Vec<String>,
    pub world_time_valid_from: Option<DateTime<Utc>>,
    pub world_time_valid_to: Option<DateTime<Utc>>,
    pub tags: Vec<String>,
}

/// El registro atómico del sustrato de inteligencia.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Bead {
    pub bead_id: String,
    pub bead_type: BeadType,
    pub temporal_class: TemporalClass,
    pub world_time_valid_from: Option<DateTime<Utc>>,
    pub world_time_valid_to: Option<DateTime<Utc>>,
    pub knowledge_time_recorded_at: DateTime<Utc>,
    pub lineage: Vec<String>,
    pub source_ref: SourceRef,
    pub content: BeadContent,
    pub hash_prev: Option<String>,
    pub hash_self: String,
    pub attestation: Attestation,
    pub merkle_batch_id: Option<String>,
    pub status: BeadStatus,
    pub tags: Vec<String>,
}

impl Bead {
    /// Construye un bead validado a partir de un borrador.
    ///
    /// # Errors:
    /// - `TemporalClass`: ventana de mundo ausente (OBSERVATION) o presente (PATTERN).
    /// - `LineageRequired`: linaje vacío en tipos derivados.
    /// - `TemporalOrder`: from > to, o tiempo de conocimiento anterior al de mundo.
    /// - `PolicyRefRequired`: rechazo RISK_BREACH sin referencia de política.
    pub fn create(draft: BeadDraft) -> Result<Self, SchemaViolation> {
        let bead_type = draft.content.kind();
        let knowledge_time = Utc::now();

        let mut tags = draft.tags;
        tags.sort();
        tags.dedup();

        let bead = Bead {
            bead_id: Uuid::now_v7().to_string(),
            bead_type,
            temporal_class: draft.temporal_class,
            world_time_valid_from: draft.world_time_valid_from,
            world_time_valid_to: draft.world_time_valid_to,
            knowledge_time_recorded_at: knowledge_time,
            lineage: draft.lineage,
            source_ref: draft.source_ref,
            content: draft.content,
            hash_prev: None,
            hash_self: String::new(),
            attestation: Attestation::default(),
            merkle_batch_id: None,
            status: BeadStatus::Active,
            tags,
        };
        bead.validate()?;
        Ok(bead)
    }

    /// Revalida las invariantes estructurales del bead.
    pub fn validate(&self) -> Result<(), SchemaViolation> {
        match self.temporal_class {
            TemporalClass::Observation => {
                if self.world_time_valid_from.is_none() || self.world_time_valid_to.is_none() {
                    return Err(SchemaViolation::TemporalClass {
                        field: "world_time".into(),
                        reason: "OBSERVATION requires a world-time window".into(),
                    });
                }
            }
            TemporalClass::Pattern => {
                if self.world_time_valid_from.is_some() || self.world_time_valid_to.is_some() {
                    return Err(SchemaViolation::TemporalClass {
                        field: "world_time".into(),
                        reason: "PATTERN forbids a world-time window".into(),
                    });
                }
            }
            TemporalClass::Derived => {}
        }

        // La ventana es nullable en conjunto: uno sin el otro es malformación.
        if self.world_time_valid_from.is_some() != self.world_time_valid_to.is_some() {
            return Err(SchemaViolation::TemporalClass {
                field: "world_time".into(),
                reason: "world-time bounds must be both present or both absent".into(),
            });
        }

        if let (Some(from), Some(to)) = (self.world_time_valid_from, self.world_time_valid_to) {
            if from > to {
                return Err(SchemaViolation::TemporalOrder {
                    reason: format!("world_time_valid_from {from} > world_time_valid_to {to}"),
                });
            }
            if self.knowledge_time_recorded_at < to {
                return Err(SchemaViolation::TemporalOrder {
                    reason: format!(
                        "knowledge_time {} precedes world_time_valid_to {to}",
                        self.knowledge_time_recorded_at
                    ),
                });
            }
        }

        if self.bead_type.requires_lineage() && self.lineage.is_empty() {
            return Err(SchemaViolation::LineageRequired {
                bead_type: self.bead_type.as_str().into(),
            });
        }

        if let BeadContent::ProposalRejected(rejected) = &self.content {
            if rejected.rejection_category == RejectionCategory::RiskBreach
                && rejected.rejection_policy_ref.is_none()
            {
                return Err(SchemaViolation::PolicyRefRequired);
            }
        }

        if self.content.kind() != self.bead_type {
            return Err(SchemaViolation::ContentTypeMismatch {
                header: self.bead_type.as_str().into(),
                payload: self.content.kind().as_str().into(),
            });
        }

        Ok(())
    }

    /// Serialización canónica del contenido hasheado.
    ///
    /// Cobertura: identidad, tipo, clase temporal, ventana de mundo, tiempo
    /// de conocimiento, linaje, procedencia, contenido, hash_prev y la
    /// atestación sin firma. Excluidos: ecdsa_sig, merkle_batch_id, status y
    /// tags (metadatos de cadena y ciclo de vida: el backfill del lote y las
    /// transiciones de estado no deben invalidar hashes ya sellados).
    pub fn canonical_content(&self) -> String {
        let canonical = serde_json::json!({
            "bead_id": self.bead_id,
            "bead_type": self.bead_type,
            "temporal_class": self.temporal_class,
            "world_time_valid_from": self.world_time_valid_from,
            "world_time_valid_to": self.world_time_valid_to,
            "knowledge_time_recorded_at": self.knowledge_time_recorded_at,
            "lineage": self.lineage,
            "source_ref": self.source_ref,
            "content": self.content,
            "hash_prev": self.hash_prev,
            "attestation": {
                "node_id": self.attestation.node_id,
                "code_hash": self.attestation.code_hash,
            },
        });
        canonical.to_string()
    }

    /// SHA-256 hex del contenido canónico.
    pub fn compute_hash_self(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.canonical_content().as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Mint denormalizado para el índice por token.
    pub fn token_mint(&self) -> &str {
        self.content.token_mint()
    }

    /// Bead completo como JSON para almacenamiento y export JSONL.
    pub fn to_storage_value(&self) -> Value {
        serde_json::json!({
            "bead_id": self.bead_id,
            "bead_type": self.bead_type,
            "temporal_class": self.temporal_class,
            "world_time_valid_from": self.world_time_valid_from,
            "world_time_valid_to": self.world_time_valid_to,
            "knowledge_time_recorded_at": self.knowledge_time_recorded_at,
            "lineage": self.lineage,
            "source_ref": self.source_ref,
            "content": self.content,
            "hash_prev": self.hash_prev,
            "hash_self": self.hash_self,
            "attestation": self.attestation,
            "merkle_batch_id": self.merkle_batch_id,
            "status": self.status,
            "tags": self.tags,
        })
    }

    /// Reconstruye un bead desde su forma almacenada.
    pub fn from_storage_value(raw: &Value) -> Result<Self, SchemaViolation> {
        fn required<'a>(raw: &'a Value, name: &str) -> Result<&'a Value, SchemaViolation> {
            raw.get(name).ok_or_else(|| SchemaViolation::Malformed {
                field: name.into(),
                reason: "missing field".into(),
            })
        }

        fn parse<T: serde::de::DeserializeOwned>(
            name: &str,
            value: &Value,
        ) -> Result<T, SchemaViolation> {
            serde_json::from_value(value.clone()).map_err(|e| SchemaViolation::Malformed {
                field: name.into(),
                reason: e.to_string(),
            })
        }

        let bead_type: BeadType = parse("bead_type", required(raw, "bead_type")?)?;
        let content = BeadContent::from_value(bead_type, required(raw, "content")?.clone())?;

        Ok(Bead {
            bead_id: parse("bead_id", required(raw, "bead_id")?)?,
            bead_type,
            temporal_class: parse("temporal_class", required(raw, "temporal_class")?)?,
            world_time_valid_from: parse(
                "world_time_valid_from",
                raw.get("world_time_valid_from").unwrap_or(&Value::Null),
            )?,
            world_time_valid_to: parse(
                "world_time_valid_to",
                raw.get("world_time_valid_to").unwrap_or(&Value::Null),
            )?,
            knowledge_time_recorded_at: parse(
                "knowledge_time_recorded_at",
                required(raw, "knowledge_time_recorded_at")?,
            )?,
            lineage: parse("lineage", required(raw, "lineage")?)?,
            source_ref: parse("source_ref", required(raw, "source_ref")?)?,
            content,
            hash_prev: parse("hash_prev", raw.get("hash_prev").unwrap_or(&Value::Null))?,
            hash_self: parse("hash_self", required(raw, "hash_self")?)?,
            attestation: parse("attestation", required(raw, "attestation")?)?,
            merkle_batch_id: parse(
                "merkle_batch_id",
                raw.get("merkle_batch_id").unwrap_or(&Value::Null),
            )?,
            status: parse("status", required(raw, "status")?)?,
            tags: parse("tags", required(raw, "tags")?)?,
        })
    }
}
