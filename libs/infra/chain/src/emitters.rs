// [libs/infra/chain/src/emitters.rs]
/*!
 * =================================================================
 * APARATO: BEAD EMITTER SUITE (V3.0 - PIPELINE SAFE)
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: CONSTRUCCIÓN Y EMISIÓN DE BEADS TIPADOS POR ETAPA
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. NEVER BLOCK: Cada emisor construye el contenido con población
 *    completa de campos, fija clase temporal y linaje, y escribe
 *    envuelto en recuperación: un fallo de emisión JAMÁS detiene el
 *    pipeline de decisión.
 * 2. STAGE DISCIPLINE: Un FACT por fuente por ciclo (no por token),
 *    un SIGNAL por candidato puntuado, PROPOSAL o PROPOSAL_REJECTED
 *    según la recomendación.
 * =================================================================
 */

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::warn;

use boar_domain_models::bead::{
    AutopsyContent, Bead, BeadContent, BeadDraft, ClaimContent, FactContent, FunnelDiagnostics,
    HeartbeatContent, ModelVersionContent, PolicyContent, ProposalContent,
    ProposalRejectedContent, SignalContent, SkillContent, StopLossPlan,
};
use boar_domain_models::{ConvictionScore, RejectionCategory, SourceRef, TemporalClass};

use crate::chain::BeadChain;

const AGENT_SOURCE_ID: &str = "boar-engine-v3";

fn agent_source() -> SourceRef {
    SourceRef::agent(AGENT_SOURCE_ID)
}

/// Escribe el bead sin propagar jamás. Retorna el bead_id o None.
async fn safe_write(chain: &BeadChain, draft: BeadDraft) -> Option<String> {
    let bead_type = draft.content.kind();
    let bead = match Bead::create(draft) {
        Ok(bead) => bead,
        Err(e) => {
            warn!("⚪ [EMITTER]: Bead build failed ({}): {}", bead_type.as_str(), e);
            return None;
        }
    };
    match chain.write_bead(bead).await {
        Ok(bead_id) => Some(bead_id),
        Err(e) => {
            warn!("⚪ [EMITTER]: Bead write failed ({}): {}", bead_type.as_str(), e);
            None
        }
    }
}

// ── FACT ─────────────────────────────────────────────────────────────

/// Un FACT por fuente por ciclo resumiendo su salida.
pub async fn emit_fact(
    chain: &BeadChain,
    provider: &str,
    field: &str,
    value: Value,
    cycle_start: DateTime<Utc>,
    cycle_end: DateTime<Utc>,
    source_status: &str,
) -> Option<String> {
    safe_write(
        chain,
        BeadDraft {
            temporal_class: TemporalClass::Observation,
            source_ref: SourceRef::market_data(provider),
            content: BeadContent::Fact(FactContent {
                symbol: "MARKET".into(),
                field: field.into(),
                value,
                as_of_world_time: cycle_end,
                provider: provider.into(),
            }),
            lineage: vec![],
            world_time_valid_from: Some(cycle_start),
            world_time_valid_to: Some(cycle_end),
            tags: vec![format!("source:{provider}"), format!("status:{source_status}")],
        },
    )
    .await
}

// ── CLAIM ────────────────────────────────────────────────────────────

/// CLAIM condicional: solo cuando el agente compromete explícitamente
/// una evaluación (llamada de régimen, condición de mercado).
#[allow(clippy::too_many_arguments)]
pub async fn emit_claim(
    chain: &BeadChain,
    conclusion: &str,
    reasoning_trace: &str,
    confidence_basis: &str,
    domain: &str,
    premises_ref: Vec<String>,
    tokens_referenced: Vec<String>,
    cycle_start: DateTime<Utc>,
    cycle_end: DateTime<Utc>,
) -> Option<String> {
    safe_write(
        chain,
        BeadDraft {
            temporal_class: TemporalClass::Observation,
            source_ref: agent_source(),
            content: BeadContent::Claim(ClaimContent {
                conclusion: conclusion.into(),
                reasoning_trace: reasoning_trace.into(),
                premises_ref: premises_ref.clone(),
                confidence_basis: confidence_basis.into(),
                domain: domain.into(),
                tokens_referenced,
            }),
            lineage: premises_ref,
            world_time_valid_from: Some(cycle_start),
            world_time_valid_to: Some(cycle_end),
            tags: vec![format!("domain:{domain}")],
        },
    )
    .await
}

// ── SIGNAL ───────────────────────────────────────────────────────────

/// Parámetros de emisión de un SIGNAL (candidato puntuado).
pub struct SignalEmission {
    pub token_mint: String,
    pub token_symbol: String,
    pub discovery_source: String,
    pub score: ConvictionScore,
    pub raw_metrics: BTreeMap<String, Value>,
    /// Beads FACT del ciclo que soportan la señal. Linaje del SIGNAL.
    pub fact_bead_ids: Vec<String>,
    pub claim_bead_ids: Vec<String>,
    pub warden_verdict: String,
}

/// Un SIGNAL por candidato puntuado. Linaje = FACTs + CLAIMs del ciclo.
pub async fn emit_signal(chain: &BeadChain, emission: SignalEmission) -> Option<String> {
    let mut lineage = emission.fact_bead_ids.clone();
    lineage.extend(emission.claim_bead_ids.iter().cloned());

    safe_write(
        chain,
        BeadDraft {
            temporal_class: TemporalClass::Derived,
            source_ref: agent_source(),
            content: BeadContent::Signal(SignalContent {
                token_mint: emission.token_mint,
                token_symbol: emission.token_symbol.clone(),
                play_type: emission.score.play_type.as_str().into(),
                discovery_source: emission.discovery_source,
                scoring_breakdown: emission.score.breakdown.clone(),
                ordering_score: emission.score.ordering_score,
                permission_score: emission.score.permission_score,
                warden_verdict: emission.warden_verdict,
                red_flags: emission.score.red_flags.clone(),
                primary_sources: emission
                    .score
                    .primary_sources
                    .iter()
                    .map(|source| source.as_str().to_string())
                    .collect(),
                recommendation: emission.score.recommendation.as_str().into(),
                raw_metrics: emission.raw_metrics,
                supporting_facts: emission.fact_bead_ids,
                supporting_claims: emission.claim_bead_ids,
            }),
            lineage,
            world_time_valid_from: None,
            world_time_valid_to: None,
            tags: vec![
                format!("token:{}", emission.token_symbol),
                format!("play:{}", emission.score.play_type.as_str()),
            ],
        },
    )
    .await
}

// ── PROPOSAL ─────────────────────────────────────────────────────────

pub struct ProposalEmission {
    pub signal_bead_id: String,
    pub action: String,
    pub token_mint: String,
    pub token_symbol: String,
    pub entry_price_fdv: Option<f64>,
    pub position_size_sol: Option<f64>,
    pub execution_venue: String,
    pub gate: String,
    pub stop_loss: Option<StopLossPlan>,
    pub constraints: Vec<String>,
}

/// PROPOSAL para AUTO_EXECUTE / WATCHLIST / PAPER_TRADE.
pub async fn emit_proposal(chain: &BeadChain, emission: ProposalEmission) -> Option<String> {
    safe_write(
        chain,
        BeadDraft {
            temporal_class: TemporalClass::Derived,
            source_ref: agent_source(),
            content: BeadContent::Proposal(ProposalContent {
                signal_ref: emission.signal_bead_id.clone(),
                action: emission.action,
                token_mint: emission.token_mint,
                token_symbol: emission.token_symbol.clone(),
                entry_price_fdv: emission.entry_price_fdv,
                position_size_sol: emission.position_size_sol,
                execution_venue: emission.execution_venue.clone(),
                gate: emission.gate,
                stop_loss: emission.stop_loss,
                constraints: emission.constraints,
            }),
            lineage: vec![emission.signal_bead_id],
            world_time_valid_from: None,
            world_time_valid_to: None,
            tags: vec![
                format!("token:{}", emission.token_symbol),
                format!("venue:{}", emission.execution_venue),
            ],
        },
    )
    .await
}

// ── PROPOSAL_REJECTED ────────────────────────────────────────────────

pub struct RejectionEmission {
    pub signal_bead_id: String,
    pub token_mint: String,
    pub token_symbol: String,
    pub rejection_source: String,
    pub rejection_reason: String,
    pub rejection_category: RejectionCategory,
    pub gate: String,
    pub scoring_breakdown: BTreeMap<String, i64>,
    pub warden_detail: Option<Value>,
    pub risk_metrics: BTreeMap<String, Value>,
    /// Obligatorio cuando la categoría es RISK_BREACH.
    pub policy_ref: Option<String>,
}

/// PROPOSAL_REJECTED para VETO / DISCARD: instantánea completa + contexto.
pub async fn emit_proposal_rejected(
    chain: &BeadChain,
    emission: RejectionEmission,
) -> Option<String> {
    safe_write(
        chain,
        BeadDraft {
            temporal_class: TemporalClass::Derived,
            source_ref: agent_source(),
            content: BeadContent::ProposalRejected(ProposalRejectedContent {
                signal_ref: emission.signal_bead_id.clone(),
                action: "ENTER_LONG".into(),
                token_mint: emission.token_mint,
                token_symbol: emission.token_symbol.clone(),
                execution_venue: "paper".into(),
                gate: emission.gate,
                rejection_source: emission.rejection_source,
                rejection_reason: emission.rejection_reason,
                rejection_category: emission.rejection_category,
                rejection_policy_ref: emission.policy_ref,
                scoring_breakdown_at_rejection: emission.scoring_breakdown,
                warden_detail: emission.warden_detail,
                risk_metrics_at_rejection: emission.risk_metrics,
            }),
            lineage: vec![emission.signal_bead_id],
            world_time_valid_from: None,
            world_time_valid_to: None,
            tags: vec![
                format!("token:{}", emission.token_symbol),
                format!("rejected:{}", emission.rejection_category.as_str()),
            ],
        },
    )
    .await
}

// ── HEARTBEAT ────────────────────────────────────────────────────────

pub struct HeartbeatEmission {
    pub cycle_number: u64,
    pub signals_found: u32,
    pub signals_vetoed: u32,
    pub proposals_emitted: u32,
    pub pot_sol: f64,
    pub positions_count: u32,
    pub pipeline_health: BTreeMap<String, String>,
    pub observe_only: bool,
    pub data_completeness: f64,
    pub errors: Vec<String>,
    pub state_hash: String,
    pub funnel: FunnelDiagnostics,
    pub previous_heartbeat_id: Option<String>,
    pub cycle_start: DateTime<Utc>,
    pub cycle_end: DateTime<Utc>,
}

/// HEARTBEAT al cierre de ciclo, con el latido previo como linaje.
pub async fn emit_heartbeat(chain: &BeadChain, emission: HeartbeatEmission) -> Option<String> {
    let lineage = emission.previous_heartbeat_id.clone().into_iter().collect();
    let cycle_number = emission.cycle_number;

    safe_write(
        chain,
        BeadDraft {
            temporal_class: TemporalClass::Observation,
            source_ref: agent_source(),
            content: BeadContent::Heartbeat(HeartbeatContent {
                cycle_number: emission.cycle_number,
                signals_found: emission.signals_found,
                signals_vetoed: emission.signals_vetoed,
                proposals_emitted: emission.proposals_emitted,
                pot_sol: emission.pot_sol,
                positions_count: emission.positions_count,
                pipeline_health: emission.pipeline_health,
                observe_only: emission.observe_only,
                data_completeness: emission.data_completeness,
                errors: emission.errors,
                state_hash: emission.state_hash,
                funnel: emission.funnel,
                previous_heartbeat_id: emission.previous_heartbeat_id,
            }),
            lineage,
            world_time_valid_from: Some(emission.cycle_start),
            world_time_valid_to: Some(emission.cycle_end),
            tags: vec![format!("cycle:{cycle_number}")],
        },
    )
    .await
}

// ── POLICY ───────────────────────────────────────────────────────────

/// POLICY en el primer latido tras un reinicio o al cambiar la config.
pub async fn emit_policy(
    chain: &BeadChain,
    policy_name: &str,
    policy_type: &str,
    rules: Value,
    authority: &str,
    supersedes: Option<String>,
) -> Option<String> {
    safe_write(
        chain,
        BeadDraft {
            temporal_class: TemporalClass::Pattern,
            source_ref: SourceRef {
                source_type: boar_domain_models::SourceType::Human,
                source_id: authority.into(),
            },
            content: BeadContent::Policy(PolicyContent {
                policy_name: policy_name.into(),
                policy_type: policy_type.into(),
                rules,
                effective_from: Utc::now(),
                supersedes,
                authority: authority.into(),
            }),
            lineage: vec![],
            world_time_valid_from: None,
            world_time_valid_to: None,
            tags: vec![format!("policy:{policy_name}")],
        },
    )
    .await
}

// ── MODEL_VERSION ────────────────────────────────────────────────────

/// MODEL_VERSION en el arranque, o cuando cambia el razonador.
pub async fn emit_model_version(
    chain: &BeadChain,
    model_name: &str,
    version_hash: &str,
    purpose: &str,
    config_snapshot: BTreeMap<String, Value>,
) -> Option<String> {
    safe_write(
        chain,
        BeadDraft {
            temporal_class: TemporalClass::Pattern,
            source_ref: agent_source(),
            content: BeadContent::ModelVersion(ModelVersionContent {
                model_name: model_name.into(),
                version_hash: version_hash.into(),
                purpose: purpose.into(),
                deployment_status: "PRODUCTION".into(),
                config_snapshot,
            }),
            lineage: vec![],
            world_time_valid_from: None,
            world_time_valid_to: None,
            tags: vec![format!("model:{model_name}")],
        },
    )
    .await
}

// ── AUTOPSY ──────────────────────────────────────────────────────────

pub struct AutopsyEmission {
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
    pub signals: Vec<String>,
}

/// AUTOPSY post-trade: alimenta el Edge Bank y el lazo de aprendizaje.
pub async fn emit_autopsy(chain: &BeadChain, emission: AutopsyEmission) -> Option<String> {
    let pnl_tag = if emission.pnl_pct > 0.0 { "pnl:positive" } else { "pnl:negative" };

    safe_write(
        chain,
        BeadDraft {
            temporal_class: TemporalClass::Derived,
            source_ref: agent_source(),
            content: BeadContent::Autopsy(AutopsyContent {
                trade_bead_id: emission.trade_bead_id.clone(),
                token_mint: emission.token_mint,
                token_symbol: emission.token_symbol.clone(),
                pnl_sol: emission.pnl_sol,
                pnl_pct: emission.pnl_pct,
                exit_price: emission.exit_price,
                exit_reason: emission.exit_reason,
                hold_duration_seconds: emission.hold_duration_seconds,
                lesson: emission.lesson,
                supports_thesis: emission.supports_thesis,
                signals: emission.signals,
            }),
            lineage: vec![emission.trade_bead_id],
            world_time_valid_from: None,
            world_time_valid_to: None,
            tags: vec![format!("token:{}", emission.token_symbol), pnl_tag.into()],
        },
    )
    .await
}

// ── SKILL ────────────────────────────────────────────────────────────

/// SKILL: diagnóstico de auto-reparación con comando sugerido-no-ejecutado.
#[allow(clippy::too_many_arguments)]
pub async fn emit_skill(
    chain: &BeadChain,
    skill_name: &str,
    root_cause: &str,
    severity: &str,
    reasoning: &str,
    suggested_command: Option<String>,
    command_gate: &str,
    diagnostics_digest: &str,
) -> Option<String> {
    safe_write(
        chain,
        BeadDraft {
            temporal_class: TemporalClass::Derived,
            source_ref: agent_source(),
            content: BeadContent::Skill(SkillContent {
                skill_name: skill_name.into(),
                root_cause: root_cause.into(),
                severity: severity.into(),
                reasoning: reasoning.into(),
                suggested_command,
                command_gate: command_gate.into(),
                diagnostics_digest: diagnostics_digest.into(),
            }),
            lineage: vec![],
            world_time_valid_from: None,
            world_time_valid_to: None,
            tags: vec![format!("skill:{skill_name}")],
        },
    )
    .await
}
