// [libs/domain/models/src/tests_bead_integrity.rs]
/*!
 * =================================================================
 * APARATO: BEAD SCHEMA CERTIFIER (V3.0)
 * CLASIFICACIÓN: TRINITY EVIDENCE (ESTRATO L2-MODELS)
 * RESPONSABILIDAD: CERTIFICACIÓN DE INVARIANTES DE ESQUEMA Y HASH
 *
 * # Mathematical Proof (Canonical Stability):
 * Si canonical(bead) es estable bajo el ciclo
 * Struct -> JSON -> Struct, entonces hash_self sobrevive a cualquier
 * número de viajes por el motor de almacenamiento.
 * =================================================================
 */

use chrono::{Duration, Utc};
use serde_json::json;

use crate::bead::{
    Bead, BeadContent, BeadDraft, BeadStatus, BeadType, FactContent, ProposalRejectedContent,
    SourceRef, TemporalClass,
};
use crate::config::EngineConfig;
use crate::errors::SchemaViolation;
use crate::RejectionCategory;

fn fact_draft() -> BeadDraft {
    let now = Utc::now();
    BeadDraft {
        temporal_class: TemporalClass::Observation,
        source_ref: SourceRef::market_data("dex-feed"),
        content: BeadContent::Fact(FactContent {
            symbol: "MARKET".into(),
            field: "new_pairs".into(),
            value: json!(12),
            as_of_world_time: now,
            provider: "dex-feed".into(),
        }),
        lineage: vec![],
        world_time_valid_from: Some(now - Duration::minutes(2)),
        world_time_valid_to: Some(now),
        tags: vec!["source:dex-feed".into()],
    }
}

#[test]
fn certify_observation_demands_world_time_window() {
    let mut draft = fact_draft();
    draft.world_time_valid_from = None;
    draft.world_time_valid_to = None;

    let verdict = Bead::create(draft);
    assert!(matches!(verdict, Err(SchemaViolation::TemporalClass { .. })));
}

#[test]
fn certify_pattern_forbids_world_time_window() {
    let mut draft = fact_draft();
    draft.temporal_class = TemporalClass::Pattern;

    let verdict = Bead::create(draft);
    assert!(matches!(verdict, Err(SchemaViolation::TemporalClass { .. })));
}

#[test]
fn certify_world_time_bounds_are_nullable_together() {
    let mut draft = fact_draft();
    draft.temporal_class = TemporalClass::Derived;
    draft.world_time_valid_to = None;

    let verdict = Bead::create(draft);
    assert!(matches!(verdict, Err(SchemaViolation::TemporalClass { .. })));
}

#[test]
fn certify_derived_types_demand_lineage() {
    let draft = BeadDraft {
        temporal_class: TemporalClass::Derived,
        source_ref: SourceRef::agent("boar-engine"),
        content: BeadContent::ProposalRejected(ProposalRejectedContent {
            signal_ref: "sig-1".into(),
            action: "ENTER_LONG".into(),
            token_mint: "MintA".into(),
            token_symbol: "AAA".into(),
            execution_venue: "paper".into(),
            gate: "auto".into(),
            rejection_source: "conviction".into(),
            rejection_reason: "permission floor".into(),
            rejection_category: RejectionCategory::ScoreFloor,
            rejection_policy_ref: None,
            scoring_breakdown_at_rejection: Default::default(),
            warden_detail: None,
            risk_metrics_at_rejection: Default::default(),
        }),
        lineage: vec![],
        world_time_valid_from: None,
        world_time_valid_to: None,
        tags: vec![],
    };

    let verdict = Bead::create(draft);
    assert!(matches!(verdict, Err(SchemaViolation::LineageRequired { .. })));
}

#[test]
fn certify_risk_breach_rejection_demands_policy_ref() {
    let mut content = ProposalRejectedContent {
        signal_ref: "sig-1".into(),
        action: "ENTER_LONG".into(),
        token_mint: "MintA".into(),
        token_symbol: "AAA".into(),
        execution_venue: "paper".into(),
        gate: "auto".into(),
        rejection_source: "risk-guard".into(),
        rejection_reason: "daily exposure limit".into(),
        rejection_category: RejectionCategory::RiskBreach,
        rejection_policy_ref: None,
        scoring_breakdown_at_rejection: Default::default(),
        warden_detail: None,
        risk_metrics_at_rejection: Default::default(),
    };

    let draft = |c: ProposalRejectedContent| BeadDraft {
        temporal_class: TemporalClass::Derived,
        source_ref: SourceRef::agent("boar-engine"),
        content: BeadContent::ProposalRejected(c),
        lineage: vec!["parent-bead".into()],
        world_time_valid_from: None,
        world_time_valid_to: None,
        tags: vec![],
    };

    assert!(matches!(
        Bead::create(draft(content.clone())),
        Err(SchemaViolation::PolicyRefRequired)
    ));

    // Con referencia de política, el mismo bead es válido.
    content.rejection_policy_ref = Some("policy-bead-id".into());
    let sealed = Bead::create(draft(content)).expect("policy-backed rejection must seal");
    assert_eq!(sealed.bead_type, BeadType::ProposalRejected);
    assert_eq!(sealed.status, BeadStatus::Active);
}

#[test]
fn certify_hash_self_survives_storage_roundtrip() {
    let mut bead = Bead::create(fact_draft()).expect("fact draft must seal");
    bead.attestation.node_id = "boar-node-test".into();
    bead.attestation.code_hash = "cafe".into();
    bead.hash_prev = Some("previous-bead-id".into());
    bead.hash_self = bead.compute_hash_self();

    let stored = bead.to_storage_value();
    let recovered = Bead::from_storage_value(&stored).expect("storage roundtrip must hold");

    assert_eq!(recovered, bead, "L2_DATA_CORRUPTION: roundtrip drift detected");
    assert_eq!(
        recovered.compute_hash_self(),
        bead.hash_self,
        "L2_HASH_DRIFT: canonical serialization is not stable"
    );
}

#[test]
fn certify_hash_ignores_lifecycle_metadata() {
    let mut bead = Bead::create(fact_draft()).expect("fact draft must seal");
    bead.hash_self = bead.compute_hash_self();
    let sealed_hash = bead.hash_self.clone();

    // El backfill del lote Merkle y la firma no deben invalidar el hash.
    bead.merkle_batch_id = Some("batch-1".into());
    bead.attestation.ecdsa_sig = "deadbeef".into();
    bead.status = BeadStatus::Superseded;
    bead.tags.push("extra".into());

    assert_eq!(bead.compute_hash_self(), sealed_hash);
}

#[test]
fn certify_partial_yaml_yields_complete_config() {
    let config = EngineConfig::from_yaml_str(
        "conviction:\n  thresholds:\n    auto_execute: 90\nrisk:\n  portfolio:\n    daily_exposure_pct: 25\n",
    )
    .expect("partial YAML must hydrate");

    assert_eq!(config.conviction.thresholds.auto_execute, 90);
    assert_eq!(config.conviction.thresholds.watchlist, 60);
    assert_eq!(config.risk.portfolio.daily_exposure_pct, 25.0);
    assert_eq!(config.risk.portfolio.max_concurrent_positions, 5);
    assert_eq!(config.conviction.weights_graduation.smart_money_oracle, 0);
    assert_eq!(config.rug_warden_graduation.min_liquidity_usd, 1_000.0);
}
