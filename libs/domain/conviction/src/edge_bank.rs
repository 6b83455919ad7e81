// [libs/domain/conviction/src/edge_bank.rs]
/*!
 * =================================================================
 * APARATO: EDGE BANK RECALL (V3.0 - PATTERN MEMORY)
 * CLASIFICACIÓN: DOMAIN LOGIC (ESTRATO L2)
 * RESPONSABILIDAD: SIMILITUD CONTRA AUTOPSIAS GANADORAS DEL PASADO
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. FEATURE OVERLAP: La similitud es el solape de Jaccard entre las
 *    etiquetas de señal discretizadas del candidato y las de cada
 *    autopsia ganadora; determinista y auditable, sin modelo de
 *    embeddings.
 * 2. COLD START: Con menos autopsias que el mínimo configurado, el
 *    motor de convicción redistribuye el peso del Edge Bank al warden.
 * =================================================================
 */

use std::collections::BTreeSet;

use boar_domain_models::bead::AutopsyContent;
use boar_domain_models::{PlayType, SignalInput, WardenVerdict};

/// Discretiza la señal en etiquetas comparables entre ciclos.
/// Estas mismas etiquetas viajan en el AUTOPSY (`signals`) al cerrar
/// la posición, cerrando el lazo de aprendizaje.
pub fn signal_features(signals: &SignalInput, play_type: PlayType) -> Vec<String> {
    let mut features: Vec<String> = Vec::with_capacity(8);

    features.push(format!("play:{}", play_type.as_str()));
    features.push(format!("warden:{}", signals.rug_warden_status.as_str()));

    features.push(match signals.smart_money_whales {
        0 => "whales:none".into(),
        1..=2 => "whales:few".into(),
        _ => "whales:pack".into(),
    });

    features.push(if signals.narrative_volume_spike >= 10.0 {
        "spike:surge".into()
    } else if signals.narrative_volume_spike >= 5.0 {
        "spike:hot".into()
    } else if signals.narrative_volume_spike >= 2.0 {
        "spike:warm".into()
    } else {
        "spike:quiet".into()
    });

    if signals.narrative_kol_detected {
        features.push("narrative:kol".into());
    }
    if signals.pulse_ghost_metadata {
        features.push("pulse:ghost".into());
    }
    if signals.pulse_pro_trader_pct > 10.0 {
        features.push("pulse:pro-traders".into());
    }
    if signals.pulse_organic_ratio >= 0.7 {
        features.push("pulse:organic-high".into());
    } else if signals.pulse_organic_ratio >= 0.3 {
        features.push("pulse:organic-mid".into());
    }
    if signals.rug_warden_status == WardenVerdict::Pass && signals.dca_count > 0 {
        features.push("oracle:dca".into());
    }

    features
}

/// Similitud (0-100) del candidato contra la mejor autopsia GANADORA.
/// Las perdedoras no definen el patrón a repetir; el lazo aprende de
/// ellas vía las banderas rojas, no vía el Edge Bank.
pub fn match_pct_against_autopsies(features: &[String], autopsies: &[AutopsyContent]) -> f64 {
    let candidate: BTreeSet<&str> = features.iter().map(String::as_str).collect();
    if candidate.is_empty() {
        return 0.0;
    }

    autopsies
        .iter()
        .filter(|autopsy| autopsy.pnl_pct > 0.0 && !autopsy.signals.is_empty())
        .map(|autopsy| {
            let winner: BTreeSet<&str> = autopsy.signals.iter().map(String::as_str).collect();
            let intersection = candidate.intersection(&winner).count() as f64;
            let union = candidate.union(&winner).count() as f64;
            if union > 0.0 {
                intersection / union * 100.0
            } else {
                0.0
            }
        })
        .fold(0.0, f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn autopsy(pnl_pct: f64, signals: Vec<&str>) -> AutopsyContent {
        AutopsyContent {
            trade_bead_id: "trade-1".into(),
            token_mint: "MintA".into(),
            token_symbol: "AAA".into(),
            pnl_sol: 0.0,
            pnl_pct,
            exit_price: 0.0,
            exit_reason: "tp1".into(),
            hold_duration_seconds: 900,
            lesson: String::new(),
            supports_thesis: Some(true),
            signals: signals.into_iter().map(str::to_string).collect(),
        }
    }

    #[test]
    fn certify_identical_pattern_scores_full_match() {
        let signals = SignalInput {
            smart_money_whales: 3,
            narrative_volume_spike: 10.0,
            narrative_kol_detected: true,
            rug_warden_status: WardenVerdict::Pass,
            ..Default::default()
        };
        let features = signal_features(&signals, PlayType::Accumulation);

        let winner = autopsy(42.0, features.iter().map(String::as_str).collect());
        assert_eq!(match_pct_against_autopsies(&features, &[winner]), 100.0);
    }

    #[test]
    fn certify_losing_autopsies_never_contribute() {
        let signals = SignalInput { smart_money_whales: 3, ..Default::default() };
        let features = signal_features(&signals, PlayType::Accumulation);

        let loser = autopsy(-30.0, features.iter().map(String::as_str).collect());
        assert_eq!(match_pct_against_autopsies(&features, &[loser]), 0.0);
    }

    #[test]
    fn certify_partial_overlap_is_graded() {
        let signals = SignalInput {
            smart_money_whales: 3,
            narrative_volume_spike: 10.0,
            rug_warden_status: WardenVerdict::Pass,
            ..Default::default()
        };
        let features = signal_features(&signals, PlayType::Accumulation);

        let cousin = autopsy(12.0, vec!["play:accumulation", "warden:PASS", "whales:pack"]);
        let similarity = match_pct_against_autopsies(&features, &[cousin]);
        assert!(similarity > 0.0 && similarity < 100.0, "graded overlap, got {similarity}");
    }
}
