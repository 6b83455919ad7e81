// [apps/heartbeat/src/arbitration.rs]
/*!
 * =================================================================
 * APARATO: REASONER ARBITRATION (V3.0 - S5 PROTOCOL)
 * CLASIFICACIÓN: APPLICATION LAYER (ESTRATO L1)
 * RESPONSABILIDAD: CONSULTA DE ALPHA Y ARBITRAJE DE CONFLICTOS
 *
 * El razonador externo solo se consulta para candidatos WATCHLIST con
 * warden PASS; puede subirlos a AUTO_EXECUTE pero JAMÁS anular un
 * VETO. El arbitraje S5 demota la subida cuando la amortiguación por
 * divergencia disparó o el permission quedó bajo 50, y emite alerta.
 * =================================================================
 */

use tracing::{info, warn};

use boar_domain_models::{ConvictionScore, Recommendation, SignalInput, WardenVerdict};
use boar_infra_feeds::{AlphaCall, ReasonerFeed};

/// Piso de permission bajo el cual la subida del razonador no se sostiene.
const S5_PERMISSION_FLOOR: i64 = 50;

/// Resultado de la consulta + arbitraje para un candidato.
#[derive(Debug, Clone, PartialEq)]
pub struct ArbitrationOutcome {
    /// El razonador subió la recomendación a AUTO_EXECUTE.
    pub reasoner_upgraded: bool,
    /// Conflicto S5 que demotó la subida (texto de alerta).
    pub s5_conflict: Option<String>,
    /// Rastro crudo del razonador para el bead SIGNAL.
    pub reasoner_trace: Option<String>,
}

impl ArbitrationOutcome {
    fn untouched() -> Self {
        Self { reasoner_upgraded: false, s5_conflict: None, reasoner_trace: None }
    }
}

fn build_briefing(
    token_symbol: &str,
    token_mint: &str,
    signals: &SignalInput,
    score: &ConvictionScore,
) -> String {
    format!(
        "Token: {token_symbol} ({}...)\n\
         Signals: whales={}, volume_spike={}x, kol={}, age={}min\n\
         Score: ordering={}, permission={}\n\
         Primary sources: {:?}\n\
         Red flags: {:?}\n\
         Reasoning: {}",
        &token_mint[..12.min(token_mint.len())],
        signals.smart_money_whales,
        signals.narrative_volume_spike,
        signals.narrative_kol_detected,
        signals.narrative_age_minutes,
        score.ordering_score,
        score.permission_score,
        score.primary_sources,
        score.red_flags,
        score.reasoning,
    )
}

/// Consulta el razonador y aplica el arbitraje S5 sobre el veredicto.
///
/// Precondición de consulta: recommendation == WATCHLIST y warden PASS.
/// Cualquier otro estado retorna sin tocar el score (en particular, un
/// VETO jamás llega aquí con posibilidad de cambio).
pub async fn consult_and_arbitrate(
    reasoner: Option<&dyn ReasonerFeed>,
    token_symbol: &str,
    token_mint: &str,
    signals: &SignalInput,
    score: &mut ConvictionScore,
) -> ArbitrationOutcome {
    let Some(reasoner) = reasoner else {
        return ArbitrationOutcome::untouched();
    };

    if score.recommendation != Recommendation::Watchlist
        || signals.rug_warden_status != WardenVerdict::Pass
    {
        return ArbitrationOutcome::untouched();
    }

    let briefing = build_briefing(token_symbol, token_mint, signals, score);
    let verdict = match reasoner.consult_alpha(&briefing).await {
        Ok(verdict) => verdict,
        Err(e) => {
            warn!("⚪ [REASONER]: consult failed for {}: {}", token_symbol, e);
            return ArbitrationOutcome::untouched();
        }
    };

    let reasoner_trace = Some(verdict.reasoning.clone());

    match verdict.call {
        AlphaCall::Nope => {
            score.reasoning.push_str(" | REASONER: NOPE, staying WATCHLIST");
            ArbitrationOutcome { reasoner_upgraded: false, s5_conflict: None, reasoner_trace }
        }
        AlphaCall::Trade => {
            score.recommendation = Recommendation::AutoExecute;
            score
                .reasoning
                .push_str(&format!(" | REASONER OVERRIDE: {}", verdict.reasoning));

            // ARBITRAJE S5: la subida no se sostiene contra la evidencia.
            let s5_conflict = if score.red_flags.contains_key("divergence_damping") {
                Some(format!(
                    "S2 damping fired (no narrative) but reasoner says TRADE for {token_symbol}"
                ))
            } else if score.permission_score < S5_PERMISSION_FLOOR {
                Some(format!(
                    "Reasoner says TRADE but permission score only {} for {token_symbol}",
                    score.permission_score
                ))
            } else {
                None
            };

            if let Some(conflict) = &s5_conflict {
                score.recommendation = Recommendation::Watchlist;
                score.reasoning.push_str(&format!(" | S5 ARBITRATION: {conflict}"));
                warn!("⚖️ [S5_ARBITRATION]: {}", conflict);
            } else {
                info!("🐗 [REASONER]: {} upgraded to AUTO_EXECUTE", token_symbol);
            }

            ArbitrationOutcome { reasoner_upgraded: true, s5_conflict, reasoner_trace }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use boar_domain_models::PlayType;
    use boar_infra_feeds::{FeedError, ReasonerVerdict};
    use std::collections::{BTreeMap, BTreeSet};

    struct ScriptedReasoner {
        call: AlphaCall,
    }

    #[async_trait]
    impl ReasonerFeed for ScriptedReasoner {
        async fn consult_alpha(&self, _briefing: &str) -> Result<ReasonerVerdict, FeedError> {
            Ok(ReasonerVerdict {
                call: self.call,
                reasoning: "pattern convergence".into(),
                confidence: 0.8,
            })
        }

        fn model_name(&self) -> &str {
            "scripted-reasoner"
        }
    }

    fn watchlist_score(permission: i64) -> ConvictionScore {
        ConvictionScore {
            ordering_score: permission,
            permission_score: permission,
            breakdown: BTreeMap::new(),
            red_flags: BTreeMap::new(),
            primary_sources: BTreeSet::new(),
            recommendation: Recommendation::Watchlist,
            position_size_sol: 0.1,
            reasoning: "base".into(),
            play_type: PlayType::Accumulation,
        }
    }

    fn pass_signals() -> SignalInput {
        SignalInput { rug_warden_status: WardenVerdict::Pass, ..Default::default() }
    }

    #[tokio::test]
    async fn certify_trade_call_upgrades_watchlist() {
        let reasoner = ScriptedReasoner { call: AlphaCall::Trade };
        let mut score = watchlist_score(70);

        let outcome = consult_and_arbitrate(
            Some(&reasoner),
            "AAA",
            "MintAAAAAAAAAAAA",
            &pass_signals(),
            &mut score,
        )
        .await;

        assert!(outcome.reasoner_upgraded);
        assert_eq!(outcome.s5_conflict, None);
        assert_eq!(score.recommendation, Recommendation::AutoExecute);
    }

    #[tokio::test]
    async fn certify_s5_demotes_on_low_permission() {
        let reasoner = ScriptedReasoner { call: AlphaCall::Trade };
        let mut score = watchlist_score(42);

        let outcome = consult_and_arbitrate(
            Some(&reasoner),
            "AAA",
            "MintAAAAAAAAAAAA",
            &pass_signals(),
            &mut score,
        )
        .await;

        assert!(outcome.reasoner_upgraded);
        assert!(outcome.s5_conflict.is_some());
        assert_eq!(score.recommendation, Recommendation::Watchlist);
        assert!(score.reasoning.contains("S5 ARBITRATION"));
    }

    #[tokio::test]
    async fn certify_s5_demotes_on_divergence_damping() {
        let reasoner = ScriptedReasoner { call: AlphaCall::Trade };
        let mut score = watchlist_score(70);
        score.red_flags.insert("divergence_damping".into(), -25);

        let outcome = consult_and_arbitrate(
            Some(&reasoner),
            "AAA",
            "MintAAAAAAAAAAAA",
            &pass_signals(),
            &mut score,
        )
        .await;

        assert!(outcome.s5_conflict.is_some());
        assert_eq!(score.recommendation, Recommendation::Watchlist);
    }

    #[tokio::test]
    async fn certify_veto_is_never_consulted() {
        let reasoner = ScriptedReasoner { call: AlphaCall::Trade };
        let mut score = watchlist_score(70);
        score.recommendation = Recommendation::Veto;

        let outcome = consult_and_arbitrate(
            Some(&reasoner),
            "AAA",
            "MintAAAAAAAAAAAA",
            &pass_signals(),
            &mut score,
        )
        .await;

        assert!(!outcome.reasoner_upgraded);
        assert_eq!(score.recommendation, Recommendation::Veto, "a veto is terminal");
    }

    #[tokio::test]
    async fn certify_warden_warn_is_never_consulted() {
        let reasoner = ScriptedReasoner { call: AlphaCall::Trade };
        let mut score = watchlist_score(70);
        let signals =
            SignalInput { rug_warden_status: WardenVerdict::Warn, ..Default::default() };

        let outcome =
            consult_and_arbitrate(Some(&reasoner), "AAA", "MintAAAAAAAAAAAA", &signals, &mut score)
                .await;

        assert!(!outcome.reasoner_upgraded);
        assert_eq!(score.recommendation, Recommendation::Watchlist);
    }
}
