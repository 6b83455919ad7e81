// [apps/heartbeat/tests/cycle_e2e.rs]
/*!
 * =================================================================
 * APARATO: HEARTBEAT CYCLE CERTIFIER (V3.0 - END TO END)
 * CLASIFICACIÓN: TRINITY EVIDENCE (ESTRATO L1-HEARTBEAT)
 * RESPONSABILIDAD: CICLO COMPLETO CONTRA FEEDS SINTÉTICOS
 *
 * Certifica el flujo: ingesta -> warden -> score -> decisión ->
 * emisión de beads -> estado -> bead HEARTBEAT, y las degradaciones
 * (fuente única caída, doble fuente caída, killswitch).
 * =================================================================
 */

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tokio::sync::Mutex;

use boar_domain_models::{BeadType, EngineConfig, State};
use boar_domain_notification::{Notifier, OperatorNotification};
use boar_heartbeat::{run_heartbeat, HeartbeatKernel};
use boar_infra_chain::{BeadChain, NodeSigner, QueryWindow};
use boar_infra_feeds::{
    BuyerDepth, FeedError, FlowIntel, NarrativeTracker, OracleFeed, OracleHarvest, TokenDataFeed,
    TokenOverview, TokenSecurity, TradesPage, WalletTransaction, WhaleSignal,
};
use boar_infra_state::StateStore;

const CANDIDATE_MINT: &str = "MintCandidateAlpha";

// ── Feeds sintéticos ─────────────────────────────────────────────────

struct SyntheticOracle {
    healthy: bool,
}

#[async_trait]
impl OracleFeed for SyntheticOracle {
    async fn query_oracle(&self) -> Result<OracleHarvest, FeedError> {
        if !self.healthy {
            return Err(FeedError::ProviderUnavailable { provider: "oracle".into() });
        }
        Ok(OracleHarvest {
            nansen_signals: vec![WhaleSignal {
                token_mint: CANDIDATE_MINT.into(),
                token_symbol: "ALPHA".into(),
                wallet_count: 3,
                total_buy_usd: 42_000.0,
                confidence: "high".into(),
                flow_intel: FlowIntel::default(),
                buyer_depth: BuyerDepth::default(),
                dca_count: 1,
                discovery_source: "oracle-broad".into(),
                notable_wallets: vec![],
            }],
            ..Default::default()
        })
    }
}

struct SyntheticTelemetry {
    healthy: bool,
}

#[async_trait]
impl TokenDataFeed for SyntheticTelemetry {
    async fn get_token_overview(&self, _mint: &str) -> Result<TokenOverview, FeedError> {
        if !self.healthy {
            return Err(FeedError::ProviderUnavailable { provider: "token-telemetry".into() });
        }
        Ok(TokenOverview {
            symbol: Some("ALPHA".into()),
            price_usd: Some(0.0004),
            liquidity_usd: Some(60_000.0),
            // 10x de pico horario contra el promedio de 24h.
            volume_1h_usd: Some(10_000.0),
            volume_24h_usd: Some(24_000.0),
            market_cap_usd: Some(180_000.0),
            created_at: Some(Utc::now() - Duration::hours(8)),
        })
    }

    async fn get_token_security(&self, _mint: &str) -> Result<TokenSecurity, FeedError> {
        Ok(TokenSecurity {
            top10_holder_fraction: Some(0.3),
            is_mintable: Some(false),
            is_freezable: Some(false),
            is_lp_locked: Some(true),
            is_lp_burned: Some(false),
        })
    }

    async fn get_trades(&self, _mint: &str, _limit: u32) -> Result<TradesPage, FeedError> {
        Ok(TradesPage::default())
    }

    async fn get_new_pairs(&self, _limit: u32) -> Result<Vec<String>, FeedError> {
        if !self.healthy {
            return Err(FeedError::ProviderUnavailable { provider: "token-telemetry".into() });
        }
        Ok(vec![CANDIDATE_MINT.to_string()])
    }

    async fn get_wallet_history(
        &self,
        _wallet: &str,
    ) -> Result<Vec<WalletTransaction>, FeedError> {
        Ok(vec![])
    }
}

struct SilentHerald;

#[async_trait]
impl Notifier for SilentHerald {
    async fn notify(&self, _notification: OperatorNotification) {}
}

// ── Arnés de kernel ──────────────────────────────────────────────────

async fn build_kernel(
    memory_label: &str,
    workdir: &tempfile::TempDir,
    oracle_healthy: bool,
    telemetry_healthy: bool,
) -> HeartbeatKernel {
    let chain = BeadChain::open(
        &format!("file:{memory_label}?mode=memory&cache=shared"),
        NodeSigner::ephemeral("boar-node-e2e"),
    )
    .await
    .expect("ledger ignition");

    // Detección narrativa sembrada 10 minutos atrás: la señal ya es
    // orgánica (sin el veto de token naciente) y sin desfase temporal.
    let seeded_cache = serde_json::json!({
        "tokens": {
            CANDIDATE_MINT: {
                "first_seen": (Utc::now() - Duration::minutes(10)).to_rfc3339(),
                "last_seen": (Utc::now() - Duration::minutes(1)).to_rfc3339(),
            }
        }
    });
    std::fs::write(workdir.path().join("narrative_cache.json"), seeded_cache.to_string())
        .expect("seed narrative cache");

    let state_store = StateStore::new(workdir.path().join("state.json"));
    state_store
        .save(&State {
            starting_balance_sol: 14.0,
            current_balance_sol: 14.0,
            sol_price_usd: 78.0,
            dry_run_mode: true,
            daily_date: Utc::now().format("%Y-%m-%d").to_string(),
            ..Default::default()
        })
        .await
        .expect("seed state");

    HeartbeatKernel {
        config: EngineConfig::default(),
        chain: Arc::new(chain),
        state_store,
        oracle_feed: Arc::new(SyntheticOracle { healthy: oracle_healthy }),
        token_data_feed: Arc::new(SyntheticTelemetry { healthy: telemetry_healthy }),
        reasoner: None,
        notifier: Arc::new(SilentHerald),
        narrative_tracker: Mutex::new(NarrativeTracker::open(
            workdir.path().join("narrative_cache.json"),
        )),
        killswitch_path: workdir.path().join("killswitch.txt"),
        keychain: None,
    }
}

#[tokio::test]
async fn certify_full_cycle_emits_decision_trail() {
    let workdir = tempfile::tempdir().expect("workdir");
    let kernel = build_kernel("mem_e2e_clean", &workdir, true, true).await;

    let report = run_heartbeat(&kernel).await;

    assert_eq!(report.cycle, 1);
    assert!(report.dry_run);
    assert!(!report.observe_only, "healthy feeds must not degrade: {:?}", report.errors);
    assert_eq!(report.data_completeness, 1.0);
    assert_eq!(report.funnel.oracle_raw, 1);
    assert_eq!(report.funnel.reached_scorer, 1);

    // El candidato limpio converge a AUTO_EXECUTE en dry-run.
    assert_eq!(report.opportunities.len(), 1);
    let opportunity = &report.opportunities[0];
    assert_eq!(opportunity.recommendation, "AUTO_EXECUTE");
    assert_eq!(opportunity.play_type, "accumulation");
    assert!(opportunity.signal_bead_id.is_some(), "SIGNAL bead must be committed");
    assert!(report.decisions.iter().any(|decision| decision.contains("DRY-RUN TRADE")));

    // Rastro en el ledger: FACTs, SIGNAL, PROPOSAL, POLICY y HEARTBEAT.
    let chain = &kernel.chain;
    assert_eq!(chain.count_by_type(BeadType::Fact).await.expect("count"), 2);
    assert_eq!(chain.count_by_type(BeadType::Signal).await.expect("count"), 1);
    assert_eq!(chain.count_by_type(BeadType::Proposal).await.expect("count"), 1);
    assert_eq!(chain.count_by_type(BeadType::Policy).await.expect("count"), 1);
    assert_eq!(chain.count_by_type(BeadType::Heartbeat).await.expect("count"), 1);
    assert!(report.heartbeat_bead_id.is_some());

    // El SIGNAL hereda linaje de los FACT del ciclo.
    let signals = chain
        .query_by_type(BeadType::Signal, QueryWindow::default())
        .await
        .expect("signal query");
    assert_eq!(signals[0].lineage.len(), 2);

    // La cadena producida por escrituras legítimas verifica.
    let verify = chain.verify_chain().await.expect("verify");
    assert!(verify.valid, "{}", verify.message);

    // El estado quedó sellado con el latido.
    let state = kernel.state_store.load().await.expect("state");
    assert_eq!(state.dry_run_cycles_completed, 1);
    assert!(state.last_heartbeat_time.is_some());
}

#[tokio::test]
async fn certify_single_source_failure_applies_penalty() {
    let workdir = tempfile::tempdir().expect("workdir");
    let kernel = build_kernel("mem_e2e_oracle_down", &workdir, false, true).await;

    let report = run_heartbeat(&kernel).await;

    assert!(!report.observe_only);
    assert_eq!(report.sources_failed, vec!["oracle".to_string()]);
    assert_eq!(report.data_completeness, 0.7);
    // La narrativa sola sigue alimentando candidatos.
    assert_eq!(report.funnel.reached_scorer, 1);
}

#[tokio::test]
async fn certify_dual_source_failure_forces_observe_only() {
    let workdir = tempfile::tempdir().expect("workdir");
    let kernel = build_kernel("mem_e2e_dark", &workdir, false, false).await;

    let report = run_heartbeat(&kernel).await;

    assert!(report.observe_only, "dual failure must force observe-only");
    assert_eq!(report.data_completeness, 0.0);
    assert_eq!(report.funnel.reached_scorer, 0);
    assert!(report.opportunities.is_empty(), "entry logic must be skipped");
    // El latido igualmente queda registrado en el ledger.
    assert_eq!(kernel.chain.count_by_type(BeadType::Heartbeat).await.expect("count"), 1);
}

#[tokio::test]
async fn certify_killswitch_halts_without_mutation() {
    let workdir = tempfile::tempdir().expect("workdir");
    let kernel = build_kernel("mem_e2e_killswitch", &workdir, true, true).await;
    std::fs::write(workdir.path().join("killswitch.txt"), "manual halt").expect("killswitch");

    let report = run_heartbeat(&kernel).await;

    assert!(report.halted);
    assert!(report.observe_only);
    assert!(report.opportunities.is_empty());
    // Sin trades, sin beads, sin mutación de estado.
    assert_eq!(kernel.chain.get_chain_length().await.expect("length"), 0);
    let state = kernel.state_store.load().await.expect("state");
    assert_eq!(state.dry_run_cycles_completed, 0);
    assert!(state.last_heartbeat_time.is_none());
}

#[tokio::test]
async fn certify_second_cycle_links_heartbeat_lineage() {
    let workdir = tempfile::tempdir().expect("workdir");
    let kernel = build_kernel("mem_e2e_lineage", &workdir, true, true).await;

    let first = run_heartbeat(&kernel).await;
    let second = run_heartbeat(&kernel).await;

    assert_eq!(first.cycle, 1);
    assert_eq!(second.cycle, 2);

    let first_heartbeat = first.heartbeat_bead_id.expect("first heartbeat bead");
    let second_heartbeat = second.heartbeat_bead_id.expect("second heartbeat bead");

    let bead = kernel
        .chain
        .get_bead(&second_heartbeat)
        .await
        .expect("read")
        .expect("heartbeat bead exists");
    assert_eq!(
        bead.lineage,
        vec![first_heartbeat],
        "each heartbeat must point to its predecessor"
    );
}
