// [libs/infra/state/src/summary.rs]
/*!
 * =================================================================
 * APARATO: PORTFOLIO SUMMARY WRITER (V3.0)
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: RESUMEN HUMANO-LEGIBLE JUNTO AL ESTADO
 * =================================================================
 */

use std::path::Path;

use chrono::Utc;

use boar_domain_models::State;

use crate::errors::StateError;

/// Escribe `latest.md` junto al archivo de estado. Best-effort para el
/// operador; jamás forma parte de la ruta de decisión.
pub fn write_summary(state: &State, state_path: &Path, max_positions: usize) -> Result<(), StateError> {
    let summary_path = state_path.with_file_name("latest.md");
    let now = Utc::now().format("%Y-%m-%d %H:%M UTC");

    let positions_text = if state.positions.is_empty() {
        "None".to_string()
    } else {
        state
            .positions
            .iter()
            .map(|position| {
                format!(
                    "- {} ({}...): entry ${:.6}, peak ${:.6}, {:.4} SOL",
                    position.token_symbol,
                    &position.token_mint[..8.min(position.token_mint.len())],
                    position.entry_price_usd,
                    position.peak_price_usd,
                    position.entry_amount_sol,
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    };

    let halted_text = if state.halted {
        format!("YES: {}", state.halt_reason)
    } else {
        "No".to_string()
    };

    let content = format!(
        "# Boar Engine: Latest State\n\
         Updated: {now}\n\n\
         ## Portfolio\n\
         - Starting: {:.4} SOL\n\
         - Current: {:.4} SOL (${:.2})\n\
         - SOL price: ${:.2}\n\
         - Overall PnL: {:+.1}%\n\n\
         ## Open Positions ({}/{max_positions})\n\
         {positions_text}\n\n\
         ## Today\n\
         - Daily exposure: {:.4} SOL\n\
         - Daily losses: {:.1}%\n\
         - Consecutive losses: {}\n\
         - Graduation plays: {}\n\n\
         ## Status\n\
         - Halted: {halted_text}\n\
         - Total trades: {} (W: {} / L: {})\n\
         - Last heartbeat: {}\n",
        state.starting_balance_sol,
        state.current_balance_sol,
        state.current_balance_usd,
        state.sol_price_usd,
        state.overall_pnl_pct(),
        state.positions.len(),
        state.daily_exposure_sol,
        state.daily_loss_pct,
        state.consecutive_losses,
        state.daily_graduation_count,
        state.total_trades,
        state.total_wins,
        state.total_losses,
        state
            .last_heartbeat_time
            .map(|ts| ts.to_rfc3339())
            .unwrap_or_else(|| "Never".to_string()),
    );

    std::fs::write(summary_path, content).map_err(|e| StateError::Io(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn certify_summary_renders_portfolio_shape() {
        let workdir = tempfile::tempdir().expect("workdir");
        let state_path = workdir.path().join("state.json");

        let state = State {
            starting_balance_sol: 10.0,
            current_balance_sol: 12.5,
            halted: true,
            halt_reason: "DRAWDOWN: pot at 45.0% of starting".into(),
            ..Default::default()
        };

        write_summary(&state, &state_path, 5).expect("summary write");
        let rendered =
            std::fs::read_to_string(workdir.path().join("latest.md")).expect("summary read");

        assert!(rendered.contains("Overall PnL: +25.0%"));
        assert!(rendered.contains("Halted: YES: DRAWDOWN"));
        assert!(rendered.contains("Open Positions (0/5)"));
    }
}
