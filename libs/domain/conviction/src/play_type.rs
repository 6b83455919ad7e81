// [libs/domain/conviction/src/play_type.rs]
/*!
 * =================================================================
 * APARATO: PLAY TYPE CLASSIFIER (V3.0 - TOTAL FUNCTION)
 * CLASIFICACIÓN: DOMAIN LOGIC (ESTRATO L2)
 * RESPONSABILIDAD: ENRUTAMIENTO GRADUATION / ACCUMULATION
 *
 * # Mathematical Proof (Totality):
 * La clasificación es una función total: todo SignalInput mapea a
 * exactamente uno de {graduation, accumulation}; la rama por defecto
 * absorbe la convergencia pulse+ballenas y el caso ballenas-solo.
 * =================================================================
 */

use boar_domain_models::{PlayType, PulseStage, SignalInput};

/// Clasifica la oportunidad.
///
/// Graduation: token originado en Pulse sin datos de ballenas (token
/// recién nacido). Accumulation: token establecido con señal de ballenas.
pub fn detect_play_type(signals: &SignalInput) -> PlayType {
    let has_pulse = signals.pulse_pro_trader_pct > 0.0
        || signals.pulse_ghost_metadata
        || signals.pulse_organic_ratio < 1.0
        || signals.pulse_bundler_pct > 0.0
        || signals.pulse_sniper_pct > 0.0
        || signals.pulse_deployer_migrations > 0
        || matches!(signals.pulse_stage, PulseStage::Bonded | PulseStage::Bonding);

    let has_whales = signals.smart_money_whales >= 1;

    if has_pulse && !has_whales {
        return PlayType::Graduation;
    }
    // Convergencia triple (pulse + ballenas) o ballenas-solo: accumulation.
    PlayType::Accumulation
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn certify_classification_is_total() {
        // Entrada virgen: accumulation por defecto.
        assert_eq!(detect_play_type(&SignalInput::default()), PlayType::Accumulation);

        // Señal pulse sin ballenas: graduation.
        let pulse_only =
            SignalInput { pulse_pro_trader_pct: 12.0, ..Default::default() };
        assert_eq!(detect_play_type(&pulse_only), PlayType::Graduation);

        // Convergencia pulse + ballenas: accumulation.
        let converged = SignalInput {
            pulse_pro_trader_pct: 12.0,
            smart_money_whales: 2,
            ..Default::default()
        };
        assert_eq!(detect_play_type(&converged), PlayType::Accumulation);

        // Etapa bonding sola ya es señal pulse.
        let bonding = SignalInput { pulse_stage: PulseStage::Bonding, ..Default::default() };
        assert_eq!(detect_play_type(&bonding), PlayType::Graduation);

        // Organic ratio degradado (< 1.0) también clasifica como pulse.
        let degraded_organic =
            SignalInput { pulse_organic_ratio: 0.4, ..Default::default() };
        assert_eq!(detect_play_type(&degraded_organic), PlayType::Graduation);
    }
}
