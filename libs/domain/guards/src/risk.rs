// [libs/domain/guards/src/risk.rs]
/*!
 * =================================================================
 * APARATO: DAILY RISK GUARD (V3.0 - CIRCUIT BREAKERS)
 * CLASIFICACIÓN: DOMAIN LOGIC (ESTRATO L2)
 * RESPONSABILIDAD: LÍMITES DIARIOS Y CORTOCIRCUITOS PREVIOS A ENTRADA
 *
 * Chequeos: exposición diaria, tope de posiciones concurrentes,
 * racha de pérdidas (advertencia + tamaño a la mitad) y pérdida diaria
 * (bloqueo). Los contadores diarios se reinician al cambiar la fecha UTC.
 * =================================================================
 */

use chrono::Utc;
use serde::Serialize;
use tracing::warn;

use boar_domain_models::RiskConfig;
use boar_infra_state::{StateError, StateStore};

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub enum RiskStatus {
    Clear,
    Warning,
    Blocked,
}

/// Reporte estructurado del guard de riesgo.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RiskReport {
    pub status: RiskStatus,
    pub daily_exposure_pct: f64,
    pub open_positions: usize,
    pub max_positions: usize,
    pub consecutive_losses: u32,
    /// 0.5 con racha de pérdidas activa, 1.0 en condiciones normales.
    pub sizing_multiplier: f64,
    pub issues: Vec<String>,
    pub warnings: Vec<String>,
}

impl RiskReport {
    pub fn message(&self) -> String {
        if self.issues.is_empty() && self.warnings.is_empty() {
            "All risk limits clear.".to_string()
        } else {
            self.issues.iter().chain(self.warnings.iter()).cloned().collect::<Vec<_>>().join("; ")
        }
    }
}

/// Evalúa todos los límites de riesgo. Aplica (y persiste) el reinicio
/// diario antes de medir.
pub async fn check_risk(store: &StateStore, risk: &RiskConfig) -> Result<RiskReport, StateError> {
    let state = store
        .update(|state| {
            state.apply_daily_reset(Utc::now());
        })
        .await?;

    let mut issues: Vec<String> = Vec::new();
    let mut warnings: Vec<String> = Vec::new();

    // Exposición diaria.
    let max_daily_pct = risk.portfolio.daily_exposure_pct;
    let daily_pct = if state.current_balance_sol > 0.0 {
        state.daily_exposure_sol / state.current_balance_sol * 100.0
    } else {
        0.0
    };
    if state.current_balance_sol > 0.0 && daily_pct >= max_daily_pct {
        issues.push(format!(
            "Daily exposure at {daily_pct:.1}% (limit: {max_daily_pct:.0}%). \
             No new entries until tomorrow."
        ));
    }

    // Tope de posiciones concurrentes.
    let max_positions = risk.portfolio.max_concurrent_positions;
    if state.positions.len() >= max_positions {
        issues.push(format!(
            "Max positions reached ({}/{max_positions}). Close a position before opening a new one.",
            state.positions.len()
        ));
    }

    // Cortocircuito de racha de pérdidas: advertir y reducir tamaño.
    let max_consecutive = risk.circuit_breakers.consecutive_losses;
    let mut sizing_multiplier = 1.0;
    if state.consecutive_losses >= max_consecutive {
        sizing_multiplier = 0.5;
        warnings.push(format!(
            "Consecutive losses: {} (threshold: {max_consecutive}). Reduce position size by 50%.",
            state.consecutive_losses
        ));
    }

    // Cortocircuito de pérdida diaria: bloqueo por el resto del día.
    let max_daily_loss = risk.circuit_breakers.daily_loss_pct;
    if state.daily_loss_pct >= max_daily_loss {
        issues.push(format!(
            "Daily loss at {:.1}% (limit: {max_daily_loss:.0}%). Trading halted for rest of day.",
            state.daily_loss_pct
        ));
    }

    let status = if !issues.is_empty() {
        warn!("🔴 [RISK_GUARD]: {}", issues.join("; "));
        RiskStatus::Blocked
    } else if !warnings.is_empty() {
        RiskStatus::Warning
    } else {
        RiskStatus::Clear
    };

    Ok(RiskReport {
        status,
        daily_exposure_pct: (daily_pct * 10.0).round() / 10.0,
        open_positions: state.positions.len(),
        max_positions,
        consecutive_losses: state.consecutive_losses,
        sizing_multiplier,
        issues,
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use boar_domain_models::{Position, State};

    async fn store_with(state: State, workdir: &tempfile::TempDir) -> StateStore {
        let store = StateStore::new(workdir.path().join("state.json"));
        store.save(&state).await.expect("seed state");
        store
    }

    fn today() -> String {
        Utc::now().format("%Y-%m-%d").to_string()
    }

    #[tokio::test]
    async fn certify_clear_when_within_limits() {
        let workdir = tempfile::tempdir().expect("workdir");
        let store = store_with(
            State {
                current_balance_sol: 10.0,
                daily_exposure_sol: 1.0,
                daily_date: today(),
                ..Default::default()
            },
            &workdir,
        )
        .await;

        let report = check_risk(&store, &RiskConfig::default()).await.expect("guard");
        assert_eq!(report.status, RiskStatus::Clear);
        assert_eq!(report.sizing_multiplier, 1.0);
        assert_eq!(report.message(), "All risk limits clear.");
    }

    #[tokio::test]
    async fn certify_daily_exposure_blocks_entries() {
        let workdir = tempfile::tempdir().expect("workdir");
        let store = store_with(
            State {
                current_balance_sol: 10.0,
                daily_exposure_sol: 3.5,
                daily_date: today(),
                ..Default::default()
            },
            &workdir,
        )
        .await;

        let report = check_risk(&store, &RiskConfig::default()).await.expect("guard");
        assert_eq!(report.status, RiskStatus::Blocked);
        assert!(report.issues[0].contains("Daily exposure"));
    }

    #[tokio::test]
    async fn certify_position_cap_blocks_entries() {
        let workdir = tempfile::tempdir().expect("workdir");
        let positions = (0..5)
            .map(|index| {
                Position::open(format!("Mint{index}"), "SYM", 0.001, 0.2, Utc::now(), None)
            })
            .collect();
        let store = store_with(
            State {
                current_balance_sol: 10.0,
                positions,
                daily_date: today(),
                ..Default::default()
            },
            &workdir,
        )
        .await;

        let report = check_risk(&store, &RiskConfig::default()).await.expect("guard");
        assert_eq!(report.status, RiskStatus::Blocked);
        assert_eq!(report.open_positions, 5);
    }

    #[tokio::test]
    async fn certify_loss_streak_warns_and_halves_sizing() {
        let workdir = tempfile::tempdir().expect("workdir");
        let store = store_with(
            State {
                current_balance_sol: 10.0,
                consecutive_losses: 3,
                daily_date: today(),
                ..Default::default()
            },
            &workdir,
        )
        .await;

        let report = check_risk(&store, &RiskConfig::default()).await.expect("guard");
        assert_eq!(report.status, RiskStatus::Warning);
        assert_eq!(report.sizing_multiplier, 0.5);
    }

    #[tokio::test]
    async fn certify_stale_daily_counters_reset_before_measuring() {
        let workdir = tempfile::tempdir().expect("workdir");
        // Exposición de AYER al 90%: debe reiniciarse, no bloquear.
        let store = store_with(
            State {
                current_balance_sol: 10.0,
                daily_exposure_sol: 9.0,
                daily_loss_pct: 50.0,
                daily_date: "2019-01-01".into(),
                ..Default::default()
            },
            &workdir,
        )
        .await;

        let report = check_risk(&store, &RiskConfig::default()).await.expect("guard");
        assert_eq!(report.status, RiskStatus::Clear, "{:?}", report.issues);
        assert_eq!(report.daily_exposure_pct, 0.0);

        let persisted = store.load().await.expect("state");
        assert_eq!(persisted.daily_exposure_sol, 0.0);
        assert_eq!(persisted.daily_date, today());
    }
}
