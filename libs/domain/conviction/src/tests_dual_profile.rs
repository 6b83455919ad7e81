// [libs/domain/conviction/src/tests_dual_profile.rs]
/*!
 * =================================================================
 * APARATO: DUAL PROFILE SCORING CERTIFIER (V3.0 - ZENITH)
 * CLASIFICACIÓN: TRINITY EVIDENCE (ESTRATO L2-CONVICTION)
 * RESPONSABILIDAD: AUDITORÍA DE VETOS, BANDERAS, ENRUTAMIENTO Y TAMAÑO
 * =================================================================
 */

use boar_domain_models::{
    EngineConfig, PlayType, PrimarySource, PulseStage, Recommendation, SignalInput, WardenVerdict,
};

use crate::scorer::{ConvictionScorer, ScoringContext};

fn scorer() -> ConvictionScorer {
    ConvictionScorer::from_engine_config(&EngineConfig::default())
}

fn clean_accumulation_signals() -> SignalInput {
    SignalInput {
        smart_money_whales: 3,
        narrative_volume_spike: 10.0,
        narrative_kol_detected: true,
        narrative_age_minutes: 10,
        rug_warden_status: WardenVerdict::Pass,
        ..Default::default()
    }
}

/// Escenario de aceptación 1: accumulation limpia.
#[test]
fn certify_clean_accumulation_auto_executes() {
    let context = ScoringContext { pot_balance_sol: 14.0, ..Default::default() };
    let verdict = scorer().score(&clean_accumulation_signals(), &context);

    assert_eq!(verdict.play_type, PlayType::Accumulation);
    assert_eq!(verdict.recommendation, Recommendation::AutoExecute);
    assert!(verdict.ordering_score >= 75, "ordering {}", verdict.ordering_score);
    assert!(verdict.primary_sources.contains(&PrimarySource::Oracle));
    assert!(verdict.primary_sources.contains(&PrimarySource::Narrative));
    assert!(verdict.primary_sources.contains(&PrimarySource::Warden));
    assert!(verdict.position_size_sol > 0.0);
    assert!(verdict.red_flags.is_empty(), "clean input must not flag: {:?}", verdict.red_flags);
}

/// Escenario de aceptación 2: veto del warden con todo lo demás al máximo.
#[test]
fn certify_rug_warden_veto_zeroes_everything() {
    let mut signals = clean_accumulation_signals();
    signals.rug_warden_status = WardenVerdict::Fail;
    signals.edge_bank_match_pct = 100.0;

    let context = ScoringContext { pot_balance_sol: 14.0, ..Default::default() };
    let verdict = scorer().score(&signals, &context);

    assert_eq!(verdict.recommendation, Recommendation::Veto);
    assert_eq!(verdict.ordering_score, 0);
    assert_eq!(verdict.permission_score, 0);
    assert_eq!(verdict.position_size_sol, 0.0);
    assert!(
        verdict.reasoning.contains("RUG-WARDEN-VETO"),
        "reasoning must name the veto: {}",
        verdict.reasoning
    );
}

/// Escenario de aceptación 3: graduation con penalizaciones pulse.
#[test]
fn certify_graduation_with_pulse_penalties() {
    let signals = SignalInput {
        smart_money_whales: 0,
        pulse_organic_ratio: 0.8,
        pulse_pro_trader_pct: 15.0,
        pulse_bundler_pct: 25.0,
        pulse_sniper_pct: 35.0,
        rug_warden_status: WardenVerdict::Pass,
        narrative_volume_spike: 10.0,
        narrative_kol_detected: true,
        narrative_age_minutes: 10,
        ..Default::default()
    };

    let context = ScoringContext { pot_balance_sol: 14.0, ..Default::default() };
    let verdict = scorer().score(&signals, &context);

    assert_eq!(verdict.play_type, PlayType::Graduation);
    assert_eq!(verdict.red_flags.get("pulse_bundler"), Some(&-10));
    assert_eq!(verdict.red_flags.get("pulse_sniper"), Some(&-10));
    assert!(
        verdict.permission_score < verdict.ordering_score,
        "penalties must open the ordering/permission gap ({} vs {})",
        verdict.permission_score,
        verdict.ordering_score
    );
}

#[test]
fn certify_veto_order_and_short_circuit() {
    let context = ScoringContext::default();

    // VETO 2: demasiado nuevo con pico fuerte.
    let too_new = SignalInput {
        narrative_age_minutes: 1,
        narrative_volume_spike: 6.0,
        rug_warden_status: WardenVerdict::Pass,
        ..Default::default()
    };
    let verdict = scorer().score(&too_new, &context);
    assert_eq!(verdict.recommendation, Recommendation::Veto);
    assert!(verdict.reasoning.contains("<2min"));

    // VETO 3: deployer serial.
    let serial_deployer = SignalInput {
        pulse_deployer_migrations: 6,
        narrative_age_minutes: 10,
        ..Default::default()
    };
    let verdict = scorer().score(&serial_deployer, &context);
    assert_eq!(verdict.recommendation, Recommendation::Veto);
    assert_eq!(verdict.red_flags.get("pulse_serial_deployer"), Some(&-100));

    // VETO 4: etapa bonded.
    let bonded = SignalInput {
        pulse_stage: PulseStage::Bonded,
        narrative_age_minutes: 10,
        ..Default::default()
    };
    let verdict = scorer().score(&bonded, &context);
    assert_eq!(verdict.recommendation, Recommendation::Veto);
    assert_eq!(verdict.red_flags.get("pulse_post_bonding"), Some(&-100));

    // VETO 5: sublímite diario de graduation agotado.
    let graduation = SignalInput {
        pulse_pro_trader_pct: 15.0,
        pulse_organic_ratio: 0.8,
        rug_warden_status: WardenVerdict::Pass,
        narrative_age_minutes: 10,
        ..Default::default()
    };
    let capped_context = ScoringContext { daily_graduation_count: 3, ..Default::default() };
    let verdict = scorer().score(&graduation, &capped_context);
    assert_eq!(verdict.recommendation, Recommendation::Veto);
    assert!(verdict.reasoning.contains("daily limit"));

    // VETO 6: mcap sobre el techo de graduation.
    let heavy_mcap = SignalInput {
        pulse_pro_trader_pct: 15.0,
        pulse_organic_ratio: 0.8,
        entry_market_cap_usd: 750_000.0,
        rug_warden_status: WardenVerdict::Pass,
        narrative_age_minutes: 10,
        ..Default::default()
    };
    let verdict = scorer().score(&heavy_mcap, &context);
    assert_eq!(verdict.recommendation, Recommendation::Veto);
    assert!(verdict.reasoning.contains("mcap"));
}

#[test]
fn certify_all_dumper_whales_is_terminal_veto() {
    let signals = clean_accumulation_signals();
    let context = ScoringContext {
        pot_balance_sol: 14.0,
        dumper_wallet_count: 3,
        ..Default::default()
    };

    let verdict = scorer().score(&signals, &context);
    assert_eq!(verdict.recommendation, Recommendation::Veto);
    assert_eq!(verdict.permission_score, 0);
    // El ordering sobrevive: el Campo de Sombra conserva la fuerza de señal.
    assert!(verdict.ordering_score > 0);

    // Dumpers parciales degradan sin vetar.
    let partial_context = ScoringContext {
        pot_balance_sol: 14.0,
        dumper_wallet_count: 2,
        ..Default::default()
    };
    let verdict = scorer().score(&signals, &partial_context);
    assert_ne!(verdict.recommendation, Recommendation::Veto);
    assert_eq!(verdict.red_flags.get("dumper_wallets"), Some(&-30));
}

/// Propiedad de frontera: warden PASS con una sola fuente primaria
/// JAMÁS produce AUTO_EXECUTE (compuerta a WATCHLIST).
#[test]
fn certify_permission_gate_demands_two_primary_sources() {
    // Señal fabricada: permission alto pero una sola fuente primaria.
    // Sin ballenas ni narrativa: solo warden PASS + enriquecimientos.
    let signals = SignalInput {
        rug_warden_status: WardenVerdict::Pass,
        holder_delta_pct: 50.0,
        pulse_trending_score: 2_000.0,
        pulse_dexscreener_boosted: true,
        narrative_age_minutes: 10,
        ..Default::default()
    };
    let context = ScoringContext { pot_balance_sol: 14.0, ..Default::default() };
    let verdict = scorer().score(&signals, &context);

    assert_eq!(verdict.play_type, PlayType::Accumulation);
    assert_eq!(verdict.primary_sources.len(), 1);
    assert_ne!(
        verdict.recommendation,
        Recommendation::AutoExecute,
        "single-source candidates must gate to WATCHLIST at most"
    );
}

#[test]
fn certify_divergence_damping_and_unsocialized_volume() {
    // Ballenas sin narrativa: amortiguación S2.
    let diverged = SignalInput {
        smart_money_whales: 3,
        narrative_volume_spike: 1.0,
        narrative_age_minutes: 10,
        rug_warden_status: WardenVerdict::Pass,
        ..Default::default()
    };
    let context = ScoringContext { pot_balance_sol: 14.0, ..Default::default() };
    let verdict = scorer().score(&diverged, &context);
    assert_eq!(verdict.red_flags.get("divergence_damping"), Some(&-25));

    // Pico extremo sin confirmación social: bandera leve.
    let unsocialized = SignalInput {
        smart_money_whales: 3,
        narrative_volume_spike: 25.0,
        narrative_kol_detected: false,
        narrative_age_minutes: 10,
        rug_warden_status: WardenVerdict::Pass,
        ..Default::default()
    };
    let verdict = scorer().score(&unsocialized, &context);
    assert_eq!(verdict.red_flags.get("unsocialized_volume"), Some(&-5));
}

#[test]
fn certify_time_mismatch_downgrades() {
    let signals = clean_accumulation_signals();
    let context = ScoringContext {
        pot_balance_sol: 14.0,
        time_mismatch: true,
        ..Default::default()
    };

    let verdict = scorer().score(&signals, &context);
    assert_eq!(
        verdict.recommendation,
        Recommendation::Watchlist,
        "AUTO_EXECUTE must downgrade to WATCHLIST under time mismatch"
    );
    assert!(verdict.reasoning.contains("TIME MISMATCH"));
}

#[test]
fn certify_data_completeness_scales_permission_only() {
    let signals = clean_accumulation_signals();
    let degraded = ScoringContext {
        pot_balance_sol: 14.0,
        data_completeness: 0.7,
        ..Default::default()
    };
    let full = ScoringContext { pot_balance_sol: 14.0, ..Default::default() };

    let degraded_verdict = scorer().score(&signals, &degraded);
    let full_verdict = scorer().score(&signals, &full);

    assert_eq!(degraded_verdict.ordering_score, full_verdict.ordering_score);
    assert!(degraded_verdict.permission_score < full_verdict.permission_score);
    assert_eq!(
        degraded_verdict.permission_score,
        (full_verdict.permission_score as f64 * 0.7) as i64
    );
}

#[test]
fn certify_scoring_is_idempotent() {
    let signals = clean_accumulation_signals();
    let context = ScoringContext { pot_balance_sol: 14.0, ..Default::default() };

    let first = scorer().score(&signals, &context);
    let second = scorer().score(&signals, &context);

    assert_eq!(first, second, "same input must yield byte-identical output");
    assert_eq!(first.reasoning, second.reasoning);
}

#[test]
fn certify_position_sizing_formula_and_caps() {
    let engine = scorer();

    // Fórmula base: (85/100) x 14 x 0.01 = 0.119 SOL.
    let size = engine.calculate_position_size(85, 14.0, 1.0, PlayType::Accumulation, 78.0);
    assert!((size - 0.119).abs() < 1e-9, "got {size}");

    // La volatilidad divide el tamaño.
    let damped = engine.calculate_position_size(85, 14.0, 2.0, PlayType::Accumulation, 78.0);
    assert!((damped - 0.0595).abs() < 1e-9);

    // Tope de cartera: max_position_pct domina en potes grandes.
    let capped = engine.calculate_position_size(100, 1_000.0, 0.01, PlayType::Accumulation, 78.0);
    assert!((capped - 100.0).abs() < 1e-9, "10% of 1000 SOL, got {capped}");

    // Tope USD de graduation: $50 a $78/SOL.
    let graduation = engine.calculate_position_size(100, 1_000.0, 0.01, PlayType::Graduation, 78.0);
    assert!((graduation - 50.0 / 78.0).abs() < 1e-9, "got {graduation}");
}

#[test]
fn certify_edge_bank_cold_start_redistributes_to_warden() {
    let signals = SignalInput {
        rug_warden_status: WardenVerdict::Pass,
        edge_bank_match_pct: 95.0,
        narrative_age_minutes: 10,
        ..Default::default()
    };

    // Arranque en frío: sin autopsias, el warden absorbe el peso del edge.
    let cold = ScoringContext { pot_balance_sol: 14.0, ..Default::default() };
    let cold_verdict = scorer().score(&signals, &cold);
    assert_eq!(cold_verdict.breakdown.get("rug_warden"), Some(&30));
    assert_eq!(cold_verdict.breakdown.get("edge_bank"), Some(&0));
    assert!(cold_verdict.reasoning.contains("cold start"));

    // Con historial suficiente, el edge puntúa por sí mismo.
    let warm = ScoringContext {
        pot_balance_sol: 14.0,
        edge_bank_bead_count: 25,
        ..Default::default()
    };
    let warm_verdict = scorer().score(&signals, &warm);
    assert_eq!(warm_verdict.breakdown.get("rug_warden"), Some(&20));
    let edge_points = *warm_verdict.breakdown.get("edge_bank").expect("edge component");
    assert!(edge_points > 5, "95% match must clear half points, got {edge_points}");
}

#[test]
fn certify_graduation_warn_profile_is_softer() {
    let warn_graduation = SignalInput {
        pulse_pro_trader_pct: 15.0,
        pulse_organic_ratio: 0.8,
        rug_warden_status: WardenVerdict::Warn,
        narrative_age_minutes: 10,
        ..Default::default()
    };
    let context = ScoringContext { pot_balance_sol: 14.0, ..Default::default() };
    let verdict = scorer().score(&warn_graduation, &context);

    // Perfil graduation con cold start: warden 25 + 10 = 35; WARN al 75%.
    assert_eq!(verdict.breakdown.get("rug_warden"), Some(&26));
    assert!(verdict.primary_sources.contains(&PrimarySource::Warden));
}
