// [libs/domain/guards/src/drawdown.rs]
/*!
 * =================================================================
 * APARATO: DRAWDOWN GUARD (V3.0 - TIMED HALT)
 * CLASIFICACIÓN: DOMAIN LOGIC (ESTRATO L2)
 * RESPONSABILIDAD: ALTO TEMPORIZADO POR CAÍDA DEL POTE
 *
 * Con el pote bajo (1 - halt_pct) x pote inicial, se sella la bandera
 * de alto con marca de inicio; el alto persiste las horas configuradas
 * y se limpia solo en el siguiente chequeo tras expirar.
 * =================================================================
 */

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

use boar_domain_models::PortfolioConfig;
use boar_infra_state::{StateError, StateStore};

/// Estado del guard de drawdown.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub enum DrawdownStatus {
    Clear { current_pct: f64, message: String },
    Halted { current_pct: f64, hours_remaining: f64, message: String },
}

impl DrawdownStatus {
    pub fn is_halted(&self) -> bool {
        matches!(self, DrawdownStatus::Halted { .. })
    }
}

/// Evalúa (y muta bajo candado) el alto por drawdown.
pub async fn check_drawdown(
    store: &StateStore,
    portfolio: &PortfolioConfig,
) -> Result<DrawdownStatus, StateError> {
    let halt_pct = portfolio.drawdown_halt_pct;
    let halt_hours = portfolio.drawdown_halt_hours;

    let state = store.load().await?;

    // Sin balance inicial no hay base de drawdown.
    if state.starting_balance_sol <= 0.0 {
        return Ok(DrawdownStatus::Clear {
            current_pct: 0.0,
            message: "No starting balance configured. Skipping drawdown check.".into(),
        });
    }

    let current_pct = state.current_balance_sol / state.starting_balance_sol * 100.0;
    let threshold_pct = 100.0 - halt_pct;

    // Alto vigente: ¿expiró la ventana?
    if state.halted && state.halt_reason.starts_with("DRAWDOWN") {
        if let Some(halted_at) = state.halted_at {
            let hours_elapsed = (Utc::now() - halted_at).num_seconds() as f64 / 3_600.0;
            if hours_elapsed < halt_hours {
                return Ok(DrawdownStatus::Halted {
                    current_pct,
                    hours_remaining: ((halt_hours - hours_elapsed) * 10.0).round() / 10.0,
                    message: format!(
                        "Drawdown halt active. Pot at {current_pct:.1}% of starting. \
                         Halt expires in {:.1}h.",
                        halt_hours - hours_elapsed
                    ),
                });
            }
            // Expirado: limpieza bajo candado.
            store
                .update(|state| {
                    state.halted = false;
                    state.halted_at = None;
                    state.halt_reason.clear();
                })
                .await?;
            info!("🟢 [DRAWDOWN]: Halt expired, trading resumed at {:.1}%", current_pct);
            return Ok(DrawdownStatus::Clear {
                current_pct,
                message: format!(
                    "Drawdown halt expired. Pot at {current_pct:.1}% of starting. Trading resumed."
                ),
            });
        }
    }

    // ¿Disparo de un alto nuevo?
    if current_pct <= threshold_pct {
        let reason = format!(
            "DRAWDOWN: pot at {current_pct:.1}% of starting (threshold: {threshold_pct:.0}%)"
        );
        let reason_snapshot = reason.clone();
        store
            .update(move |state| {
                state.halted = true;
                state.halted_at = Some(Utc::now());
                state.halt_reason = reason_snapshot;
            })
            .await?;
        warn!("🔴 [DRAWDOWN]: {}", reason);
        return Ok(DrawdownStatus::Halted {
            current_pct,
            hours_remaining: halt_hours,
            message: format!(
                "DRAWDOWN HALT TRIGGERED. Pot at {current_pct:.1}% of starting \
                 (below {threshold_pct:.0}% threshold). Trading halted for {halt_hours}h."
            ),
        });
    }

    Ok(DrawdownStatus::Clear {
        current_pct,
        message: format!(
            "Pot at {current_pct:.1}% of starting. Above {threshold_pct:.0}% threshold."
        ),
    })
}
