// [apps/heartbeat/src/cycle.rs]
/*!
 * =================================================================
 * APARATO: HEARTBEAT CYCLE ENGINE (V3.0 - TIME BUDGETED)
 * CLASIFICACIÓN: APPLICATION LAYER (ESTRATO L1)
 * RESPONSABILIDAD: UN CICLO COMPLETO DE TRADING BAJO PRESUPUESTO
 *
 * Estructura del ciclo (presupuesto total T, default 120 s):
 *   estado -> verificación de cadena -> watchdog -> guards ->
 *   oráculo -> narrativa -> guard de datos parciales ->
 *   pipeline por candidato -> emisión de beads -> anclaje ->
 *   persistencia de estado -> bead HEARTBEAT.
 *
 * El orden es estructural: salidas antes de entradas; la escritura de
 * estado va al final para que un crash descarte solo el ciclo vigente.
 * Cada paso corre bajo deadline derivado del presupuesto restante; al
 * expirar, el paso se abandona limpio y el ciclo continúa.
 * =================================================================
 */

use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};

use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use tracing::{info, instrument, warn};

use boar_domain_conviction::{
    detect_play_type, match_pct_against_autopsies, signal_features, ConvictionScorer,
    ScoringContext,
};
use boar_domain_guards::{
    check_drawdown, check_killswitch, check_risk, KillswitchStatus, RiskStatus,
};
use boar_domain_models::bead::{AutopsyContent, BeadContent, FunnelDiagnostics, StopLossPlan};
use boar_domain_models::{
    BeadType, ConvictionScore, PlayType, Recommendation, RejectionCategory, SignalInput, State,
};
use boar_domain_notification::{NotificationSeverity, OperatorNotification};
use boar_domain_warden::run_warden_check;
use boar_infra_chain::emitters::{
    emit_fact, emit_heartbeat, emit_model_version, emit_policy, emit_proposal,
    emit_proposal_rejected, emit_signal, HeartbeatEmission, ProposalEmission, RejectionEmission,
    SignalEmission,
};
use boar_infra_chain::{submit_anchor, BootVerdict, QueryWindow};
use boar_infra_feeds::red_flags::{check_concentrated_volume, count_dumper_wallets};
use boar_infra_feeds::{
    batch_gather, NarrativeSignal, OracleHarvest, PulseCandidate, WalletTransaction, WhaleSignal,
};
use boar_infra_signer::keychain::verify_isolation;
use boar_infra_signer::IsolationStatus;

use crate::kernel::HeartbeatKernel;
use crate::watchdog::{run_position_watchdog, ExitDecision};

/// Presupuesto mínimo para siquiera intentar un paso.
const MIN_STEP_BUDGET: Duration = Duration::from_secs(10);
/// Tokens nuevos a sondear por barrido narrativo.
const NARRATIVE_SWEEP_LIMIT: u32 = 20;
const NARRATIVE_SCAN_DEPTH: usize = 10;
/// Pico de volumen que registra primera detección narrativa.
const NARRATIVE_TRACK_THRESHOLD: f64 = 5.0;

/// Candidato unificado del ciclo (unión de todas las fuentes).
#[derive(Debug, Clone, Default)]
struct Candidate {
    token_mint: String,
    token_symbol: String,
    discovery_source: String,
    whale: Option<WhaleSignal>,
    pulse: Option<PulseCandidate>,
    narrative: Option<NarrativeSignal>,
    holder_delta_pct: f64,
}

/// Oportunidad evaluada, lista para el reporte de ciclo.
#[derive(Debug, Clone, Serialize)]
pub struct Opportunity {
    pub token_mint: String,
    pub token_symbol: String,
    pub play_type: String,
    pub ordering_score: i64,
    pub permission_score: i64,
    pub breakdown: BTreeMap<String, i64>,
    pub red_flags: BTreeMap<String, i64>,
    pub primary_sources: Vec<String>,
    pub recommendation: String,
    pub position_size_sol: f64,
    pub reasoning: String,
    pub signal_bead_id: Option<String>,
}

/// Reporte estructurado de un ciclo completo.
#[derive(Debug, Clone, Serialize, Default)]
pub struct CycleReport {
    pub cycle: u64,
    pub timestamp: String,
    pub dry_run: bool,
    pub chain_status: String,
    pub opportunities: Vec<Opportunity>,
    pub decisions: Vec<String>,
    pub errors: Vec<String>,
    pub exits: Vec<ExitDecision>,
    pub timeout_triggered: bool,
    pub observe_only: bool,
    pub halted: bool,
    pub data_completeness: f64,
    pub sources_failed: Vec<String>,
    pub funnel: FunnelDiagnostics,
    pub heartbeat_bead_id: Option<String>,
}

async fn notify(kernel: &HeartbeatKernel, severity: NotificationSeverity, text: String) {
    kernel.notifier.notify(OperatorNotification::new(severity, text)).await;
}

fn state_content_hash(state: &State) -> String {
    let canonical = serde_json::to_value(state).unwrap_or(Value::Null).to_string();
    hex::encode(Sha256::digest(canonical.as_bytes()))
}

/// Ejecuta el ciclo de latido completo bajo el presupuesto configurado.
#[instrument(skip(kernel))]
pub async fn run_heartbeat(kernel: &HeartbeatKernel) -> CycleReport {
    let cycle_start_instant = Instant::now();
    let cycle_start = Utc::now();
    let total_budget = Duration::from_secs_f64(kernel.config.heartbeat.budget_seconds);
    let remaining =
        |start: Instant| total_budget.saturating_sub(Instant::now().duration_since(start));

    let mut report = CycleReport {
        timestamp: cycle_start.to_rfc3339(),
        data_completeness: 1.0,
        ..Default::default()
    };

    // ── PRECONDICIÓN 0: Killswitch (alto inmediato, sin mutaciones) ──
    if let KillswitchStatus::Active { reason } = check_killswitch(&kernel.killswitch_path) {
        report.halted = true;
        report.observe_only = true;
        report.decisions.push(format!("KILLSWITCH ACTIVE: {reason}"));
        notify(kernel, NotificationSeverity::Critical, format!("KILLSWITCH ACTIVE: {reason}"))
            .await;
        return report;
    }

    // Auditoría continua de aislamiento del firmante.
    let isolation = verify_isolation();
    if isolation.status == IsolationStatus::Violation {
        report.errors.push(format!("Signer isolation violation: {}", isolation.message));
        notify(
            kernel,
            NotificationSeverity::Critical,
            format!("SIGNER ISOLATION VIOLATION: {}", isolation.message),
        )
        .await;
    }

    // ── PASO 1: Carga de estado (candado exclusivo + auto-restauración) ──
    let state = match kernel.state_store.load().await {
        Ok(state) => state,
        Err(e) => {
            report.halted = true;
            report.errors.push(format!("State load failed: {e}"));
            notify(kernel, NotificationSeverity::Critical, format!("STATE CORRUPTED: {e}")).await;
            return report;
        }
    };
    let dry_run = state.dry_run_mode;
    let cycle_number = state.dry_run_cycles_completed + 1;
    report.cycle = cycle_number;
    report.dry_run = dry_run;

    if remaining(cycle_start_instant) < MIN_STEP_BUDGET {
        report.timeout_triggered = true;
        report.observe_only = true;
        report.errors.push("Time budget exhausted before start".into());
        return report;
    }

    // ── PASO 2: Verificación de cadena desde el último ancla ─────────
    let mut chain_read_only = false;
    match kernel.chain.verify_on_boot().await {
        Ok(BootVerdict::Tampered { details }) => {
            chain_read_only = true;
            report.chain_status = "TAMPERED".into();
            report.errors.push(format!("CHAIN TAMPERED: {details}"));
            notify(kernel, NotificationSeverity::Critical, format!("CHAIN TAMPERED: {details}"))
                .await;
        }
        Ok(BootVerdict::Clean { .. }) => report.chain_status = "CLEAN".into(),
        Ok(BootVerdict::Unanchored { .. }) => report.chain_status = "UNANCHORED".into(),
        Err(e) => report.errors.push(format!("Chain verification error: {e}")),
    }

    // Beads POLICY y MODEL_VERSION en el primer ciclo tras el arranque.
    let mut policy_bead_id: Option<String> = None;
    if !chain_read_only {
        if cycle_number == 1 {
            policy_bead_id = emit_policy(
                &kernel.chain,
                "risk-limits",
                "risk",
                serde_json::to_value(&kernel.config.risk).unwrap_or(Value::Null),
                "system_default",
                None,
            )
            .await;
            if let Some(reasoner) = &kernel.reasoner {
                emit_model_version(
                    &kernel.chain,
                    reasoner.model_name(),
                    "unpinned",
                    "alpha-override",
                    BTreeMap::new(),
                )
                .await;
            }
        } else {
            policy_bead_id = kernel
                .chain
                .query_by_type(BeadType::Policy, QueryWindow { limit: 1, ..Default::default() })
                .await
                .ok()
                .and_then(|beads| beads.first().map(|bead| bead.bead_id.clone()));
        }
    }

    // ── PASO 3: Watchdog de posiciones (salidas ANTES de entradas) ───
    let watchdog_budget = Duration::from_secs_f64(kernel.config.heartbeat.watchdog_budget_seconds)
        .min(remaining(cycle_start_instant));
    match tokio::time::timeout(
        watchdog_budget,
        run_position_watchdog(
            &kernel.state_store,
            kernel.token_data_feed.as_ref(),
            &kernel.config.trade,
            kernel.config.heartbeat.max_concurrent_fetch,
        ),
    )
    .await
    {
        Ok(Ok(exits)) => report.exits = exits,
        Ok(Err(e)) => report.errors.push(format!("Watchdog error: {e}")),
        Err(_) => {
            // Deadline: paso abandonado limpio, el ciclo continúa.
            report.errors.push("Watchdog step timeout".into());
            report.timeout_triggered = true;
        }
    }
    // TODO: route exit decisions through execute_swap once live mode ships.

    // ── PASO 4: Guards de drawdown y riesgo (antes de la lógica de entrada) ──
    let mut entries_blocked_by_halt = false;
    match check_drawdown(&kernel.state_store, &kernel.config.risk.portfolio).await {
        Ok(status) if status.is_halted() => {
            entries_blocked_by_halt = true;
            report.decisions.push("DRAWDOWN HALT: entries disabled this cycle".into());
            notify(kernel, NotificationSeverity::Warning, "Drawdown halt active".into()).await;
        }
        Ok(_) => {}
        Err(e) => report.errors.push(format!("Drawdown guard error: {e}")),
    }

    let mut risk_blocked = false;
    let mut sizing_multiplier = 1.0;
    match check_risk(&kernel.state_store, &kernel.config.risk).await {
        Ok(risk_report) => {
            sizing_multiplier = risk_report.sizing_multiplier;
            if risk_report.status == RiskStatus::Blocked {
                risk_blocked = true;
                report.decisions.push(format!("RISK BLOCK: {}", risk_report.message()));
            } else if risk_report.status == RiskStatus::Warning {
                report.decisions.push(format!("RISK WARNING: {}", risk_report.message()));
            }
        }
        Err(e) => report.errors.push(format!("Risk guard error: {e}")),
    }

    // ── PASO 5: Oráculo de smart money ───────────────────────────────
    let mut fact_bead_ids: Vec<String> = Vec::new();
    let mut pipeline_health: BTreeMap<String, String> = BTreeMap::new();

    let oracle_budget = Duration::from_secs_f64(kernel.config.heartbeat.oracle_budget_seconds)
        .min(remaining(cycle_start_instant));
    let mut oracle_failed = false;
    let harvest: OracleHarvest =
        match tokio::time::timeout(oracle_budget, kernel.oracle_feed.query_oracle()).await {
            Ok(Ok(harvest)) => harvest,
            Ok(Err(e)) => {
                oracle_failed = true;
                report.sources_failed.push("oracle".into());
                report.errors.push(format!("Oracle error: {e}"));
                OracleHarvest::default()
            }
            Err(_) => {
                oracle_failed = true;
                report.sources_failed.push("oracle".into());
                report.errors.push("Oracle step timeout".into());
                OracleHarvest::default()
            }
        };
    pipeline_health
        .insert("oracle".into(), if oracle_failed { "FAILED".into() } else { "OK".into() });

    report.funnel.oracle_raw = harvest.nansen_signals.len() as u32;
    report.funnel.oracle_filtered =
        harvest.nansen_signals.iter().filter(|signal| signal.wallet_count >= 1).count() as u32;
    report.funnel.mobula_raw = harvest.mobula_signals.len() as u32;
    report.funnel.mobula_resolved =
        harvest.mobula_signals.iter().filter(|signal| !signal.token_mint.is_empty()).count() as u32;
    report.funnel.pulse_raw = harvest.pulse_signals.len() as u32;
    report.funnel.pulse_filtered =
        harvest.pulse_signals.iter().filter(|signal| !signal.token_mint.is_empty()).count() as u32;

    if !chain_read_only {
        if let Some(fact_id) = emit_fact(
            &kernel.chain,
            "oracle",
            "whale_signals",
            json!(harvest.nansen_signals.len()),
            cycle_start,
            Utc::now(),
            if oracle_failed { "FAILED" } else { "OK" },
        )
        .await
        {
            fact_bead_ids.push(fact_id);
        }
    }

    // ── PASO 6: Cazador de narrativa (solo volumen on-chain) ─────────
    let mut narrative_failed = false;
    let mut narrative_signals: Vec<NarrativeSignal> = Vec::new();

    match kernel.token_data_feed.get_new_pairs(NARRATIVE_SWEEP_LIMIT).await {
        Ok(new_mints) => {
            for mint in new_mints.into_iter().take(NARRATIVE_SCAN_DEPTH) {
                match kernel.token_data_feed.get_token_overview(&mint).await {
                    Ok(overview) => {
                        let volume_ratio = overview.volume_spike_ratio();
                        if volume_ratio >= NARRATIVE_TRACK_THRESHOLD {
                            kernel.narrative_tracker.lock().await.record_detection(&mint);
                        }
                        narrative_signals.push(NarrativeSignal {
                            token_mint: mint,
                            token_symbol: overview.symbol_or_unknown(),
                            volume_vs_avg: volume_ratio,
                            kol_mentions: 0,
                            x_mentions_1h: 0,
                        });
                    }
                    Err(e) => report.errors.push(format!("Narrative probe failed: {e}")),
                }
            }
        }
        Err(e) => {
            narrative_failed = true;
            report.sources_failed.push("narrative".into());
            report.errors.push(format!("Narrative error: {e}"));
        }
    }
    pipeline_health
        .insert("narrative".into(), if narrative_failed { "FAILED".into() } else { "OK".into() });

    report.funnel.narrative_raw = narrative_signals.len() as u32;
    report.funnel.narrative_with_spike = narrative_signals
        .iter()
        .filter(|signal| signal.volume_vs_avg >= NARRATIVE_TRACK_THRESHOLD)
        .count() as u32;

    if !chain_read_only {
        if let Some(fact_id) = emit_fact(
            &kernel.chain,
            "narrative",
            "new_pair_sweep",
            json!(narrative_signals.len()),
            cycle_start,
            Utc::now(),
            if narrative_failed { "FAILED" } else { "OK" },
        )
        .await
        {
            fact_bead_ids.push(fact_id);
        }
    }

    // ── PASO 7: Guard de datos parciales ─────────────────────────────
    if report.sources_failed.len() >= 2 {
        report.observe_only = true;
        report.data_completeness = 0.0;
        report
            .decisions
            .push("OBSERVE-ONLY MODE: >=2 primary sources failed (oracle, narrative)".into());
        notify(
            kernel,
            NotificationSeverity::Critical,
            "DUAL-SOURCE FAILURE: cycle degraded to observe-only".into(),
        )
        .await;
    } else if oracle_failed {
        report.data_completeness = 0.7;
    } else if narrative_failed {
        report.data_completeness = 0.8;
    }

    let skip_entry_logic = report.observe_only || entries_blocked_by_halt;

    // ── PASO 8: Pipeline por candidato ───────────────────────────────
    if !skip_entry_logic {
        let candidates = merge_candidates(&harvest, &narrative_signals);
        report.funnel.reached_scorer = candidates.len() as u32;

        // Contexto de Edge Bank: una consulta por ciclo, no por candidato.
        let autopsy_count = kernel.chain.count_by_type(BeadType::Autopsy).await.unwrap_or(0);
        let recent_autopsies: Vec<AutopsyContent> = kernel
            .chain
            .query_by_type(BeadType::Autopsy, QueryWindow { limit: 50, ..Default::default() })
            .await
            .map(|beads| {
                beads
                    .into_iter()
                    .filter_map(|bead| match bead.content {
                        BeadContent::Autopsy(content) => Some(content),
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default();

        let scorer = ConvictionScorer::from_engine_config(&kernel.config);
        let mut daily_graduation_count = state.daily_graduation_count;
        let data_completeness = report.data_completeness;

        for candidate in candidates {
            let score = evaluate_candidate(
                kernel,
                &scorer,
                &candidate,
                &state,
                &mut report,
                CandidateContext {
                    data_completeness,
                    daily_graduation_count,
                    sizing_multiplier,
                    autopsy_count,
                    recent_autopsies: &recent_autopsies,
                    fact_bead_ids: &fact_bead_ids,
                    chain_read_only,
                    risk_blocked,
                    policy_bead_id: policy_bead_id.as_deref(),
                    dry_run,
                },
            )
            .await;

            if score.recommendation == Recommendation::AutoExecute
                && score.play_type == PlayType::Graduation
            {
                daily_graduation_count += 1;
            }
        }

        // Persistencia del contador de graduation (con reinicio de fecha).
        let graduation_snapshot = daily_graduation_count;
        if let Err(e) = kernel
            .state_store
            .update(move |state| {
                if !state.apply_daily_reset(Utc::now()) {
                    state.daily_graduation_count = graduation_snapshot;
                }
            })
            .await
        {
            report.errors.push(format!("Graduation counter persist failed: {e}"));
        }
    }

    // ── PASO 9: Mantenimiento de anclaje (best-effort) ───────────────
    if !chain_read_only {
        match kernel.chain.check_anchor_trigger().await {
            Ok(Some(trigger)) => match kernel.chain.create_merkle_batch(trigger, None).await {
                Ok(Some(batch_id)) => {
                    report.decisions.push(format!(
                        "MERKLE BATCH sealed: {batch_id} (trigger {})",
                        trigger.as_str()
                    ));
                }
                Ok(None) => {}
                Err(e) => report.errors.push(format!("Merkle batch error: {e}")),
            },
            Ok(None) => {}
            Err(e) => report.errors.push(format!("Anchor trigger error: {e}")),
        }

        // Sumisión externa de lotes pendientes vía el firmante ciego.
        if let Some(keychain) = &kernel.keychain {
            if let Ok(pending) = kernel.chain.pending_anchor_batches().await {
                for batch in pending {
                    match submit_anchor(&kernel.chain, keychain, &batch).await {
                        Ok(outcome) => {
                            report.decisions.push(format!("ANCHOR: {outcome:?}"));
                        }
                        Err(e) => report.errors.push(format!("Anchor submission error: {e}")),
                    }
                }
            }
        }
    }

    // ── PASO 10: Persistencia final de estado (última escritura) ─────
    let persisted_state = kernel
        .state_store
        .update(move |state| {
            if dry_run {
                state.dry_run_cycles_completed = cycle_number;
            }
            state.last_heartbeat_time = Some(Utc::now());
        })
        .await;

    let final_state = match persisted_state {
        Ok(state) => state,
        Err(e) => {
            report.errors.push(format!("State persist failed: {e}"));
            notify(kernel, NotificationSeverity::Critical, format!("STATE PERSIST FAILED: {e}"))
                .await;
            return report;
        }
    };

    let _ = boar_infra_state::summary::write_summary(
        &final_state,
        kernel.state_store.state_path(),
        kernel.config.risk.portfolio.max_concurrent_positions,
    );

    // ── PASO 11: Bead HEARTBEAT (cierre del registrador de vuelo) ────
    if !chain_read_only {
        let previous_heartbeat_id = kernel
            .chain
            .query_by_type(BeadType::Heartbeat, QueryWindow { limit: 1, ..Default::default() })
            .await
            .ok()
            .and_then(|beads| beads.first().map(|bead| bead.bead_id.clone()));

        report.heartbeat_bead_id = emit_heartbeat(
            &kernel.chain,
            HeartbeatEmission {
                cycle_number,
                signals_found: report.opportunities.len() as u32,
                signals_vetoed: report.funnel.scored_veto,
                proposals_emitted: report.funnel.scored_execute + report.funnel.scored_watchlist,
                pot_sol: final_state.current_balance_sol,
                positions_count: final_state.positions.len() as u32,
                pipeline_health,
                observe_only: report.observe_only,
                data_completeness: report.data_completeness,
                errors: report.errors.clone(),
                state_hash: state_content_hash(&final_state),
                funnel: report.funnel.clone(),
                previous_heartbeat_id,
                cycle_start,
                cycle_end: Utc::now(),
            },
        )
        .await;
    }

    info!(
        "💓 [HEARTBEAT]: Cycle {} complete in {:?} ({} opportunities, {} exits, {} errors)",
        cycle_number,
        cycle_start_instant.elapsed(),
        report.opportunities.len(),
        report.exits.len(),
        report.errors.len()
    );

    report
}

/// Fusiona las señales del oráculo (nansen + mobula + pulse) y la
/// narrativa en candidatos únicos por mint.
fn merge_candidates(
    harvest: &OracleHarvest,
    narrative_signals: &[NarrativeSignal],
) -> Vec<Candidate> {
    let mut by_mint: HashMap<String, Candidate> = HashMap::new();
    let mut order: Vec<String> = Vec::new();

    for whale in &harvest.nansen_signals {
        if whale.token_mint.is_empty() {
            continue;
        }
        order.push(whale.token_mint.clone());
        by_mint.insert(
            whale.token_mint.clone(),
            Candidate {
                token_mint: whale.token_mint.clone(),
                token_symbol: whale.token_symbol.clone(),
                discovery_source: whale.discovery_source.clone(),
                whale: Some(whale.clone()),
                ..Default::default()
            },
        );
    }

    // Candidatos mobula: ballena sintética de una sola billetera.
    for mobula in &harvest.mobula_signals {
        if mobula.token_mint.is_empty() || by_mint.contains_key(&mobula.token_mint) {
            continue;
        }
        order.push(mobula.token_mint.clone());
        by_mint.insert(
            mobula.token_mint.clone(),
            Candidate {
                token_mint: mobula.token_mint.clone(),
                token_symbol: mobula.token_symbol.clone(),
                discovery_source: "mobula-whale".into(),
                whale: Some(WhaleSignal {
                    token_mint: mobula.token_mint.clone(),
                    token_symbol: mobula.token_symbol.clone(),
                    wallet_count: 1,
                    total_buy_usd: mobula.accum_24h_usd,
                    confidence: mobula.signal_strength.clone(),
                    discovery_source: "mobula-whale".into(),
                    ..Default::default()
                }),
                ..Default::default()
            },
        );
    }

    for pulse in &harvest.pulse_signals {
        if pulse.token_mint.is_empty() {
            continue;
        }
        match by_mint.get_mut(&pulse.token_mint) {
            Some(existing) => existing.pulse = Some(pulse.clone()),
            None => {
                order.push(pulse.token_mint.clone());
                by_mint.insert(
                    pulse.token_mint.clone(),
                    Candidate {
                        token_mint: pulse.token_mint.clone(),
                        token_symbol: pulse.token_symbol.clone(),
                        discovery_source: if pulse.discovery_source.is_empty() {
                            "pulse-bonding".into()
                        } else {
                            pulse.discovery_source.clone()
                        },
                        pulse: Some(pulse.clone()),
                        ..Default::default()
                    },
                );
            }
        }
    }

    for narrative in narrative_signals {
        if narrative.token_mint.is_empty() {
            continue;
        }
        match by_mint.get_mut(&narrative.token_mint) {
            Some(existing) => existing.narrative = Some(narrative.clone()),
            None => {
                order.push(narrative.token_mint.clone());
                by_mint.insert(
                    narrative.token_mint.clone(),
                    Candidate {
                        token_mint: narrative.token_mint.clone(),
                        token_symbol: narrative.token_symbol.clone(),
                        discovery_source: "dex-trades".into(),
                        narrative: Some(narrative.clone()),
                        ..Default::default()
                    },
                );
            }
        }
    }

    for delta in &harvest.holdings_delta {
        if let Some(existing) = by_mint.get_mut(&delta.token_mint) {
            existing.holder_delta_pct = delta.holder_delta_pct;
        }
    }

    // Orden de descubrimiento estable para reportes deterministas.
    let mut seen = std::collections::HashSet::new();
    order
        .into_iter()
        .filter(|mint| seen.insert(mint.clone()))
        .filter_map(|mint| by_mint.remove(&mint))
        .collect()
}

struct CandidateContext<'a> {
    data_completeness: f64,
    daily_graduation_count: u32,
    sizing_multiplier: f64,
    autopsy_count: u64,
    recent_autopsies: &'a [AutopsyContent],
    fact_bead_ids: &'a [String],
    chain_read_only: bool,
    risk_blocked: bool,
    policy_bead_id: Option<&'a str>,
    dry_run: bool,
}

/// Pipeline completo de un candidato: warden + banderas rojas + score +
/// razonador + emisión de beads. Retorna el veredicto final.
async fn evaluate_candidate(
    kernel: &HeartbeatKernel,
    scorer: &ConvictionScorer,
    candidate: &Candidate,
    state: &State,
    report: &mut CycleReport,
    context: CandidateContext<'_>,
) -> ConvictionScore {
    let mint = &candidate.token_mint;
    let symbol = &candidate.token_symbol;

    // Ensamblaje de la señal estructurada.
    let whales = match &candidate.whale {
        Some(whale) if whale.buyer_depth.smart_money_buyers > 0 => {
            whale.buyer_depth.smart_money_buyers
        }
        Some(whale) => whale.wallet_count,
        None => 0,
    };

    let (volume_spike, kol_detected) = match &candidate.narrative {
        Some(narrative) => (narrative.volume_vs_avg, narrative.kol_mentions > 0),
        None => (0.0, false),
    };
    let age_minutes = kernel.narrative_tracker.lock().await.get_age_minutes(mint);

    let mut signal_input = SignalInput {
        smart_money_whales: whales,
        narrative_volume_spike: volume_spike,
        narrative_kol_detected: kol_detected,
        narrative_age_minutes: age_minutes,
        holder_delta_pct: candidate.holder_delta_pct,
        ..Default::default()
    };

    if let Some(whale) = &candidate.whale {
        signal_input.exchange_net_inflow_usd = whale.flow_intel.exchange_net_usd;
        signal_input.fresh_wallet_inflow_usd = whale.flow_intel.fresh_wallet_net_usd;
        signal_input.smart_money_buy_volume_usd = whale.buyer_depth.total_buy_volume_usd;
        signal_input.dca_count = whale.dca_count;
    }

    if let Some(pulse) = &candidate.pulse {
        signal_input.pulse_ghost_metadata = pulse.pulse_ghost_metadata;
        signal_input.pulse_organic_ratio = pulse.pulse_organic_ratio;
        signal_input.pulse_bundler_pct = pulse.pulse_bundler_pct;
        signal_input.pulse_sniper_pct = pulse.pulse_sniper_pct;
        signal_input.pulse_pro_trader_pct = pulse.pulse_pro_trader_pct;
        signal_input.pulse_deployer_migrations = pulse.pulse_deployer_migrations;
        signal_input.pulse_stage = serde_json::from_value(json!(pulse.pulse_stage.clone()))
            .unwrap_or_default();
        signal_input.pulse_trending_score = pulse.pulse_trending_score;
        signal_input.pulse_dexscreener_boosted = pulse.pulse_dexscreener_boosted;
        signal_input.entry_market_cap_usd = pulse.entry_market_cap_usd;
    }

    // Warden con el perfil del tipo de jugada preliminar.
    let preliminary_play_type = detect_play_type(&signal_input);
    let warden_report = run_warden_check(
        kernel.token_data_feed.as_ref(),
        kernel.config.warden_profile(preliminary_play_type == PlayType::Graduation),
        mint,
        preliminary_play_type,
        candidate.pulse.as_ref().and_then(|pulse| pulse.liquidity_usd),
    )
    .await;
    signal_input.rug_warden_status = warden_report.verdict;

    // Banderas rojas: volumen concentrado.
    let mut concentrated_volume = false;
    match kernel.token_data_feed.get_trades(mint, 100).await {
        Ok(trades) => {
            let (concentrated, _) = check_concentrated_volume(&trades, Utc::now());
            concentrated_volume = concentrated;
        }
        Err(e) => {
            report.errors.push(format!(
                "Volume concentration check failed for {}: {e}",
                &mint[..8.min(mint.len())]
            ));
        }
    }

    // Banderas rojas: censo de billeteras dumper entre las ballenas.
    let mut dumper_wallet_count = 0u32;
    if let Some(whale) = &candidate.whale {
        if !whale.notable_wallets.is_empty() {
            let feed = kernel.token_data_feed.clone();
            let histories: Vec<Option<(String, Vec<WalletTransaction>)>> = batch_gather(
                whale.notable_wallets.clone(),
                kernel.config.heartbeat.max_concurrent_fetch,
                |wallet| {
                    let feed = feed.clone();
                    async move {
                        feed.get_wallet_history(&wallet)
                            .await
                            .map(|history| (wallet, history))
                    }
                },
            )
            .await;
            let census: Vec<(String, Vec<WalletTransaction>)> =
                histories.into_iter().flatten().collect();
            let (count, _) = count_dumper_wallets(&census);
            dumper_wallet_count = count;
        }
    }

    // Desfase temporal: oráculo presente + narrativa recién nacida.
    let time_mismatch =
        whales >= 3 && volume_spike >= 5.0 && age_minutes < 5;

    // Edge Bank: similitud contra autopsias ganadoras.
    signal_input.edge_bank_match_pct = match_pct_against_autopsies(
        &signal_features(&signal_input, preliminary_play_type),
        context.recent_autopsies,
    );

    // Puntuación determinista.
    let mut score = scorer.score(
        &signal_input,
        &ScoringContext {
            pot_balance_sol: state.current_balance_sol,
            volatility_factor: 1.0,
            data_completeness: context.data_completeness,
            concentrated_volume,
            dumper_wallet_count,
            time_mismatch,
            edge_bank_bead_count: context.autopsy_count,
            daily_graduation_count: context.daily_graduation_count,
            sol_price_usd: if state.sol_price_usd > 0.0 { state.sol_price_usd } else { 78.0 },
        },
    );
    score.position_size_sol *= context.sizing_multiplier;

    // Consulta del razonador + arbitraje S5.
    let outcome = crate::arbitration::consult_and_arbitrate(
        kernel.reasoner.as_deref(),
        symbol,
        mint,
        &signal_input,
        &mut score,
    )
    .await;
    if let Some(conflict) = &outcome.s5_conflict {
        report.decisions.push(format!("⚖️ S5 CONFLICT: {conflict}"));
        notify(kernel, NotificationSeverity::Warning, format!("S5 ARBITRATION: {conflict}")).await;
    }

    // Bloqueo de riesgo: la ejecución se rechaza con referencia de política.
    let mut risk_breach = false;
    if context.risk_blocked && score.recommendation == Recommendation::AutoExecute {
        risk_breach = true;
        score.recommendation = Recommendation::Watchlist;
        score.reasoning.push_str(" | RISK BREACH: daily limits block execution");
    }

    // Embudo y decisiones.
    match score.recommendation {
        Recommendation::Veto => {
            report.funnel.scored_veto += 1;
            report.decisions.push(format!(
                "🐗 VETO: {} — {}",
                &mint[..8.min(mint.len())],
                score.reasoning
            ));
        }
        Recommendation::Discard => {
            report.funnel.scored_discard += 1;
            report.decisions.push(format!(
                "🐗 NOPE: {} — permission {} below floor",
                &mint[..8.min(mint.len())],
                score.permission_score
            ));
        }
        Recommendation::Watchlist | Recommendation::PaperTrade => {
            report.funnel.scored_watchlist += 1;
            report.decisions.push(format!(
                "🐗 WATCHLIST: {} — [{}] permission {}, ordering {}, primary {}",
                &mint[..8.min(mint.len())],
                score.play_type.as_str(),
                score.permission_score,
                score.ordering_score,
                score.primary_sources.len()
            ));
        }
        Recommendation::AutoExecute => {
            report.funnel.scored_execute += 1;
            if context.dry_run {
                report.decisions.push(format!(
                    "🐗🔥 DRY-RUN TRADE: {} — [{}] would enter {:.4} SOL (permission {}, ordering {}) OINK!",
                    &mint[..8.min(mint.len())],
                    score.play_type.as_str(),
                    score.position_size_sol,
                    score.permission_score,
                    score.ordering_score
                ));
            } else {
                report.decisions.push(format!(
                    "🐗🔥 EXECUTE: {} — [{}] {:.4} SOL (permission {}, ordering {}) OINK!",
                    &mint[..8.min(mint.len())],
                    score.play_type.as_str(),
                    score.position_size_sol,
                    score.permission_score,
                    score.ordering_score
                ));
                // TODO: route AUTO_EXECUTE proposals through execute_swap once live mode ships.
            }
        }
    }

    // Emisión de beads: SIGNAL siempre; PROPOSAL o PROPOSAL_REJECTED según veredicto.
    let mut signal_bead_id: Option<String> = None;
    if !context.chain_read_only && !context.fact_bead_ids.is_empty() {
        let mut raw_metrics: BTreeMap<String, Value> = BTreeMap::new();
        raw_metrics.insert("whales".into(), json!(whales));
        raw_metrics.insert("volume_spike".into(), json!(volume_spike));
        raw_metrics.insert("kol".into(), json!(kol_detected));
        raw_metrics.insert("age_min".into(), json!(age_minutes));
        raw_metrics.insert("rug".into(), json!(warden_report.verdict.as_str()));
        if let Some(trace) = &outcome.reasoner_trace {
            raw_metrics.insert("reasoner_trace".into(), json!(trace));
        }

        signal_bead_id = emit_signal(
            &kernel.chain,
            SignalEmission {
                token_mint: mint.clone(),
                token_symbol: symbol.clone(),
                discovery_source: candidate.discovery_source.clone(),
                score: score.clone(),
                raw_metrics,
                fact_bead_ids: context.fact_bead_ids.to_vec(),
                claim_bead_ids: vec![],
                warden_verdict: warden_report.verdict.as_str().into(),
            },
        )
        .await;

        if let Some(signal_id) = &signal_bead_id {
            match score.recommendation {
                Recommendation::AutoExecute
                | Recommendation::Watchlist
                | Recommendation::PaperTrade => {
                    if risk_breach {
                        emit_proposal_rejected(
                            &kernel.chain,
                            RejectionEmission {
                                signal_bead_id: signal_id.clone(),
                                token_mint: mint.clone(),
                                token_symbol: symbol.clone(),
                                rejection_source: "risk-guard".into(),
                                rejection_reason: "daily risk limits block execution".into(),
                                rejection_category: RejectionCategory::RiskBreach,
                                gate: "auto".into(),
                                scoring_breakdown: score.breakdown.clone(),
                                warden_detail: serde_json::to_value(&warden_report).ok(),
                                risk_metrics: BTreeMap::new(),
                                policy_ref: context.policy_bead_id.map(str::to_string),
                            },
                        )
                        .await;
                    } else {
                        emit_proposal(
                            &kernel.chain,
                            ProposalEmission {
                                signal_bead_id: signal_id.clone(),
                                action: "ENTER_LONG".into(),
                                token_mint: mint.clone(),
                                token_symbol: symbol.clone(),
                                entry_price_fdv: Some(signal_input.entry_market_cap_usd)
                                    .filter(|mcap| *mcap > 0.0),
                                position_size_sol: Some(score.position_size_sol),
                                execution_venue: "paper".into(),
                                gate: if outcome.reasoner_upgraded {
                                    "escalated".into()
                                } else {
                                    "auto".into()
                                },
                                stop_loss: Some(StopLossPlan {
                                    stop_loss_pct: kernel.config.trade.stop_loss_pct,
                                    trailing_from_peak_pct: 20.0,
                                }),
                                constraints: vec![],
                            },
                        )
                        .await;
                    }
                }
                Recommendation::Veto | Recommendation::Discard => {
                    let category = if score.recommendation == Recommendation::Veto {
                        RejectionCategory::ConvictionVeto
                    } else {
                        RejectionCategory::ScoreFloor
                    };
                    emit_proposal_rejected(
                        &kernel.chain,
                        RejectionEmission {
                            signal_bead_id: signal_id.clone(),
                            token_mint: mint.clone(),
                            token_symbol: symbol.clone(),
                            rejection_source: "conviction".into(),
                            rejection_reason: score.reasoning.clone(),
                            rejection_category: category,
                            gate: "auto".into(),
                            scoring_breakdown: score.breakdown.clone(),
                            warden_detail: serde_json::to_value(&warden_report).ok(),
                            risk_metrics: BTreeMap::new(),
                            policy_ref: None,
                        },
                    )
                    .await;
                }
            }
        }
    } else if !context.chain_read_only {
        warn!("⚪ [CYCLE]: no FACT beads this cycle, SIGNAL emission skipped for {}", symbol);
    }

    report.opportunities.push(Opportunity {
        token_mint: mint.clone(),
        token_symbol: symbol.clone(),
        play_type: score.play_type.as_str().into(),
        ordering_score: score.ordering_score,
        permission_score: score.permission_score,
        breakdown: score.breakdown.clone(),
        red_flags: score.red_flags.clone(),
        primary_sources: score
            .primary_sources
            .iter()
            .map(|source| source.as_str().to_string())
            .collect(),
        recommendation: score.recommendation.as_str().into(),
        position_size_sol: score.position_size_sol,
        reasoning: score.reasoning.clone(),
        signal_bead_id,
    });

    score
}
