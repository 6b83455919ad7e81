// [libs/infra/chain/tests/ledger_integrity.rs]
/*!
 * =================================================================
 * APARATO: LEDGER INTEGRITY CERTIFIER (V3.0 - ZENITH)
 * CLASIFICACIÓN: TRINITY EVIDENCE (ESTRATO L3-CHAIN)
 * RESPONSABILIDAD: AUDITORÍA DE LINEALIDAD, LINAJE, MERKLE Y PORTING
 *
 * # Mathematical Proof (Tamper Evidence):
 * Con hash_self = SHA256(canonical(bead)) y hash_prev encadenado, la
 * mutación de cualquier fila es detectable en O(n) recomputando la
 * secuencia: el primer quiebre reporta la coordenada exacta del ataque.
 * =================================================================
 */

use chrono::{Duration, Utc};
use serde_json::json;

use boar_domain_models::bead::{
    Bead, BeadContent, BeadDraft, FactContent, SignalContent, StopLossPlan,
};
use boar_domain_models::{BeadType, SourceRef, TemporalClass};
use boar_infra_chain::{AnchorTrigger, BeadChain, BootVerdict, ChainError, NodeSigner, QueryWindow};

async fn open_test_chain(memory_label: &str) -> BeadChain {
    let url = format!("file:{memory_label}?mode=memory&cache=shared");
    BeadChain::open(&url, NodeSigner::ephemeral("boar-node-test"))
        .await
        .expect("CRITICAL_FAULT: Failed to anchor in-memory ledger.")
}

fn fact_bead(provider: &str) -> Bead {
    let now = Utc::now();
    Bead::create(BeadDraft {
        temporal_class: TemporalClass::Observation,
        source_ref: SourceRef::market_data(provider),
        content: BeadContent::Fact(FactContent {
            symbol: "MARKET".into(),
            field: "volume".into(),
            value: json!(42.5),
            as_of_world_time: now,
            provider: provider.into(),
        }),
        lineage: vec![],
        world_time_valid_from: Some(now - Duration::minutes(2)),
        world_time_valid_to: Some(now),
        tags: vec![format!("source:{provider}")],
    })
    .expect("fact draft must seal")
}

fn signal_bead(mint: &str, lineage: Vec<String>) -> Bead {
    Bead::create(BeadDraft {
        temporal_class: TemporalClass::Derived,
        source_ref: SourceRef::agent("boar-engine-v3"),
        content: BeadContent::Signal(SignalContent {
            token_mint: mint.into(),
            token_symbol: "TEST".into(),
            play_type: "accumulation".into(),
            discovery_source: "oracle".into(),
            scoring_breakdown: Default::default(),
            ordering_score: 75,
            permission_score: 70,
            warden_verdict: "PASS".into(),
            red_flags: Default::default(),
            primary_sources: vec!["oracle".into(), "warden".into()],
            recommendation: "WATCHLIST".into(),
            raw_metrics: Default::default(),
            supporting_facts: lineage.clone(),
            supporting_claims: vec![],
        }),
        lineage,
        world_time_valid_from: None,
        world_time_valid_to: None,
        tags: vec!["token:TEST".into()],
    })
    .expect("signal draft must seal")
}

#[tokio::test]
async fn certify_legitimate_writes_always_verify() {
    let chain = open_test_chain("mem_verify_clean").await;

    let mut previous_fact: Option<String> = None;
    for index in 0..5 {
        let fact_id = chain
            .write_bead(fact_bead(&format!("provider-{index}")))
            .await
            .expect("fact write");
        previous_fact = Some(fact_id);
    }
    chain
        .write_bead(signal_bead("MintClean", vec![previous_fact.expect("at least one fact")]))
        .await
        .expect("signal write");

    let verdict = chain.verify_chain().await.expect("verification path");
    assert!(verdict.valid, "legitimate writes must verify: {}", verdict.message);
    assert_eq!(verdict.total_beads, 6);
    assert_eq!(verdict.verified_beads, 6);
    assert_eq!(verdict.signature_failures, 0, "node signatures must verify");
}

#[tokio::test]
async fn certify_tampered_row_reports_first_break_seq() {
    let chain = open_test_chain("mem_tamper_detection").await;

    for index in 0..5 {
        chain
            .write_bead(fact_bead(&format!("provider-{index}")))
            .await
            .expect("fact write");
    }

    // Ataque: mutación directa del hash almacenado de la fila 3.
    chain
        .tamper_hash_for_tests(3, &"0".repeat(64))
        .await
        .expect("storage mutation");

    let verdict = chain.verify_chain().await.expect("verification path");
    assert!(!verdict.valid, "tampered storage must be detected");
    assert_eq!(verdict.first_break_seq, Some(3));
    assert_eq!(verdict.verified_beads, 2);
}

#[tokio::test]
async fn certify_lineage_closure_is_enforced() {
    let chain = open_test_chain("mem_lineage_closure").await;

    let verdict = chain.write_bead(signal_bead("MintGhost", vec!["phantom-parent".into()])).await;

    match verdict {
        Err(ChainError::LineageMissing { missing_id }) => assert_eq!(missing_id, "phantom-parent"),
        other => panic!("expected LineageMissing, got {other:?}"),
    }
}

#[tokio::test]
async fn certify_lineage_graph_traversal() {
    let chain = open_test_chain("mem_lineage_graph").await;

    let fact_alpha = chain.write_bead(fact_bead("alpha")).await.expect("fact alpha");
    let fact_beta = chain.write_bead(fact_bead("beta")).await.expect("fact beta");
    let signal_id = chain
        .write_bead(signal_bead("MintGraph", vec![fact_alpha.clone(), fact_beta.clone()]))
        .await
        .expect("signal write");

    // Padres directos en orden declarado.
    let parents = chain.get_lineage(&signal_id).await.expect("lineage query");
    assert_eq!(
        parents.iter().map(|bead| bead.bead_id.clone()).collect::<Vec<_>>(),
        vec![fact_alpha.clone(), fact_beta.clone()]
    );

    // Descendientes del fact alpha.
    let descendants = chain.get_descendants(&fact_alpha).await.expect("descendants query");
    assert_eq!(descendants.len(), 1);
    assert_eq!(descendants[0].bead_id, signal_id);

    // Travesía BFS deduplicada.
    let ancestors = chain.walk_lineage(&signal_id, 5).await.expect("walk");
    let ancestor_ids: Vec<String> = ancestors.iter().map(|bead| bead.bead_id.clone()).collect();
    assert_eq!(ancestor_ids, vec![fact_alpha, fact_beta]);
}

#[tokio::test]
async fn certify_chain_linearity_hash_prev_links() {
    let chain = open_test_chain("mem_linearity").await;

    let first = chain.write_bead(fact_bead("one")).await.expect("write one");
    let second = chain.write_bead(fact_bead("two")).await.expect("write two");

    let head = chain.get_chain_head().await.expect("head query").expect("head exists");
    assert_eq!(head.bead_id, second);
    assert_eq!(head.hash_prev.as_deref(), Some(first.as_str()));

    let genesis = chain.get_bead(&first).await.expect("genesis query").expect("genesis exists");
    assert_eq!(genesis.hash_prev, None, "genesis must carry null prev");
}

#[tokio::test]
async fn certify_bi_temporal_queries() {
    let chain = open_test_chain("mem_bi_temporal").await;
    let write_moment = Utc::now();

    chain.write_bead(fact_bead("temporal-probe")).await.expect("fact write");

    // Ventana de mundo que solapa el intervalo del FACT.
    let overlapping = chain
        .query_world_time_range(
            write_moment - Duration::minutes(5),
            write_moment + Duration::minutes(5),
            Some(BeadType::Fact),
        )
        .await
        .expect("world range query");
    assert_eq!(overlapping.len(), 1);

    // Ventana disjunta en el pasado remoto.
    let disjoint = chain
        .query_world_time_range(
            write_moment - Duration::hours(10),
            write_moment - Duration::hours(9),
            None,
        )
        .await
        .expect("world range query");
    assert!(disjoint.is_empty());

    // "Qué sabíamos": antes del write no sabíamos nada.
    let before = chain
        .query_knowledge_at(write_moment - Duration::hours(1), None, None)
        .await
        .expect("knowledge query");
    assert!(before.is_empty());

    let after = chain
        .query_knowledge_at(Utc::now() + Duration::seconds(1), None, None)
        .await
        .expect("knowledge query");
    assert_eq!(after.len(), 1);
}

#[tokio::test]
async fn certify_filtered_queries_and_stats() {
    let chain = open_test_chain("mem_filters").await;

    let fact_id = chain.write_bead(fact_bead("filters")).await.expect("fact write");
    chain.write_bead(signal_bead("MintFilter", vec![fact_id])).await.expect("signal write");

    let signals = chain
        .query_by_type(BeadType::Signal, QueryWindow::default())
        .await
        .expect("type query");
    assert_eq!(signals.len(), 1);

    let by_token = chain
        .query_by_token("MintFilter", QueryWindow::default())
        .await
        .expect("token query");
    assert_eq!(by_token.len(), 1);

    let by_tag =
        chain.query_by_tag("token:TEST", QueryWindow::default()).await.expect("tag query");
    assert_eq!(by_tag.len(), 1);

    let stats = chain.chain_stats().await.expect("stats");
    assert_eq!(stats.chain_length, 2);
    assert_eq!(stats.type_counts.get("FACT"), Some(&1));
    assert_eq!(stats.type_counts.get("SIGNAL"), Some(&1));
    assert_eq!(stats.lineage_edges, 1);
    assert_eq!(stats.unique_tokens, 1);
}

#[tokio::test]
async fn certify_anchor_triggers_and_merkle_batching() {
    let chain = open_test_chain("mem_merkle_batching").await;

    // Un FACT solo no cruza la frontera de decisión.
    let fact_id = chain.write_bead(fact_bead("anchor-probe")).await.expect("fact write");
    assert_eq!(
        chain.check_anchor_trigger().await.expect("trigger check"),
        Some(AnchorTrigger::MaxTime),
        "first unanchored bead with no prior batch amerits the first anchor"
    );

    // Un SIGNAL pendiente dispara DECISION_BOUNDARY.
    chain.write_bead(signal_bead("MintAnchor", vec![fact_id])).await.expect("signal write");
    assert_eq!(
        chain.check_anchor_trigger().await.expect("trigger check"),
        Some(AnchorTrigger::DecisionBoundary)
    );

    let batch_id = chain
        .create_merkle_batch(AnchorTrigger::DecisionBoundary, None)
        .await
        .expect("batch path")
        .expect("batch must seal over pending beads");

    let batch = chain.latest_batch().await.expect("batch query").expect("batch exists");
    assert_eq!(batch.batch_id, batch_id);
    assert_eq!(batch.bead_count, 2);
    assert_eq!((batch.seq_start, batch.seq_end), (1, 2));
    assert_eq!(batch.anchor_tx, None, "submission is deferred, record persists");

    // Sin pendientes, no hay nuevo disparo inmediato.
    assert_eq!(chain.check_anchor_trigger().await.expect("trigger check"), None);

    // La verificación de arranque recomputa la raíz del último lote.
    match chain.verify_on_boot().await.expect("boot verify") {
        BootVerdict::Clean { chain_length, last_anchor_seq } => {
            assert_eq!(chain_length, 2);
            assert_eq!(last_anchor_seq, Some(2));
        }
        other => panic!("expected clean boot, got {other:?}"),
    }

    // Re-sellado vacío: no hay beads sin anclar.
    assert_eq!(
        chain.create_merkle_batch(AnchorTrigger::MaxTime, None).await.expect("batch path"),
        None
    );
}

#[tokio::test]
async fn certify_merkle_root_is_deterministic() {
    use boar_infra_chain::compute_merkle_root;

    let hashes: Vec<String> =
        (0u8..7).map(|i| hex::encode(sha2_digest(&[i]))).collect();

    assert_eq!(compute_merkle_root(&hashes), compute_merkle_root(&hashes));
}

fn sha2_digest(data: &[u8]) -> [u8; 32] {
    use sha2::{Digest, Sha256};
    Sha256::digest(data).into()
}

#[tokio::test]
async fn certify_export_import_roundtrip_preserves_hashes() {
    let workdir = tempfile::tempdir().expect("workdir");
    let key_path = workdir.path().join("node_signing.key");
    let export_path = workdir.path().join("chain_export.jsonl");

    // Ambas cadenas atestan con la MISMA llave de nodo.
    let source_chain = BeadChain::open(
        "file:mem_port_source?mode=memory&cache=shared",
        NodeSigner::ignite(&key_path, "boar-node-port"),
    )
    .await
    .expect("source ledger");

    let mut expected_ids = Vec::new();
    let mut last_fact = None;
    for index in 0..8 {
        let id = source_chain
            .write_bead(fact_bead(&format!("port-{index}")))
            .await
            .expect("fact write");
        last_fact = Some(id.clone());
        expected_ids.push(id);
    }
    for mint in ["MintPortA", "MintPortB"] {
        let id = source_chain
            .write_bead(signal_bead(mint, vec![last_fact.clone().expect("facts exist")]))
            .await
            .expect("signal write");
        expected_ids.push(id);
    }

    let exported = source_chain.export_jsonl(&export_path).await.expect("export");
    assert_eq!(exported, 10);

    let restored_chain = BeadChain::open(
        "file:mem_port_restored?mode=memory&cache=shared",
        NodeSigner::ignite(&key_path, "boar-node-port"),
    )
    .await
    .expect("restored ledger");

    let imported = restored_chain.import_jsonl(&export_path).await.expect("import");
    assert_eq!(imported, 10);

    // Re-import: idempotente por bead_id.
    assert_eq!(restored_chain.import_jsonl(&export_path).await.expect("re-import"), 0);

    let verdict = restored_chain.verify_chain().await.expect("verification");
    assert!(verdict.valid, "restored chain must verify: {}", verdict.message);
    assert_eq!(verdict.total_beads, 10);
    assert_eq!(verdict.signature_failures, 0, "same node key must verify signatures");

    for (index, bead_id) in expected_ids.iter().enumerate() {
        let original = source_chain.get_bead(bead_id).await.expect("source read").expect("exists");
        let restored =
            restored_chain.get_bead(bead_id).await.expect("restored read").expect("exists");
        assert_eq!(original.hash_self, restored.hash_self, "hash drift at bead {index}");
        assert_eq!(original.lineage, restored.lineage, "lineage drift at bead {index}");
        assert_eq!(original.hash_prev, restored.hash_prev, "link drift at bead {index}");
    }
}

#[tokio::test]
async fn certify_supersede_is_additive_and_hash_stable() {
    let chain = open_test_chain("mem_supersede").await;

    let fact_id = chain.write_bead(fact_bead("lifecycle")).await.expect("fact write");
    let original_signal =
        chain.write_bead(signal_bead("MintLife", vec![fact_id])).await.expect("signal write");

    // El sucesor DEBE referenciar al viejo vía linaje.
    let successor = signal_bead("MintLife", vec![original_signal.clone()]);
    let successor_id =
        chain.supersede(&original_signal, successor).await.expect("supersede path");

    let old = chain.get_bead(&original_signal).await.expect("read").expect("exists");
    assert_eq!(old.status.as_str(), "SUPERSEDED");

    let parents = chain.get_lineage(&successor_id).await.expect("lineage");
    assert_eq!(parents[0].bead_id, original_signal);

    // Las transiciones de estado viven fuera del hash: la cadena sigue íntegra.
    let verdict = chain.verify_chain().await.expect("verification");
    assert!(verdict.valid, "{}", verdict.message);

    // Un sucesor sin el linaje obligatorio es rechazado.
    let orphan = signal_bead("MintLife", vec![fact_bead("x").bead_id]);
    assert!(matches!(
        chain.supersede(&successor_id, orphan).await,
        Err(ChainError::LineageMissing { .. })
    ));
}

#[tokio::test]
async fn certify_proposal_stop_loss_plan_roundtrip() {
    // StopLossPlan viaja dentro del PROPOSAL sin pérdida.
    let plan = StopLossPlan { stop_loss_pct: 20.0, trailing_from_peak_pct: 20.0 };
    let raw = serde_json::to_value(&plan).expect("serialize");
    let recovered: StopLossPlan = serde_json::from_value(raw).expect("deserialize");
    assert_eq!(recovered, plan);
}
