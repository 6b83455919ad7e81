// [libs/infra/feeds/src/red_flags.rs]
/*!
 * =================================================================
 * APARATO: RED FLAG DETECTORS (V3.0 - NEGATIVE EVIDENCE)
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: DETECCIÓN PURA DE PATRONES DE DISTRIBUCIÓN
 *
 * Detecta:
 * 1. Volumen concentrado (top 3 trades > 70% del volumen de 1h).
 * 2. Billeteras dumper (>=2 dumps rápidos <30min en el historial).
 * Funciones puras sin E/S: los datos llegan ya cosechados.
 * =================================================================
 */

use chrono::{DateTime, Duration, Utc};

use crate::records::{TradesPage, WalletTransaction};

/// Umbral de concentración del volumen horario.
const CONCENTRATION_THRESHOLD_PCT: f64 = 70.0;
/// Minutos máximos de tenencia que cuentan como dump rápido.
const FAST_DUMP_MINUTES: i64 = 30;
/// Dumps rápidos que marcan a una billetera como dumper.
const DUMPER_STRIKE_COUNT: u32 = 2;

/// ¿Está el volumen concentrado en pocos trades grandes?
pub fn check_concentrated_volume(trades: &TradesPage, now: DateTime<Utc>) -> (bool, String) {
    if trades.items.len() < 3 {
        return (false, "Insufficient trade data".into());
    }

    let one_hour_ago = now - Duration::hours(1);
    let mut recent_volumes: Vec<f64> = trades
        .items
        .iter()
        .filter(|trade| trade.block_time.map(|ts| ts >= one_hour_ago).unwrap_or(false))
        .map(|trade| trade.volume_usd.unwrap_or(0.0))
        .collect();

    if recent_volumes.len() < 3 {
        return (false, format!("Only {} trades in last hour", recent_volumes.len()));
    }

    recent_volumes.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
    let top_3_volume: f64 = recent_volumes.iter().take(3).sum();
    let total_volume: f64 = recent_volumes.iter().sum();

    if total_volume == 0.0 {
        return (false, "Zero volume in last hour".into());
    }

    let concentration_pct = top_3_volume / total_volume * 100.0;
    if concentration_pct > CONCENTRATION_THRESHOLD_PCT {
        (
            true,
            format!(
                "Top 3 trades = {concentration_pct:.1}% of 1h volume ({} total trades)",
                recent_volumes.len()
            ),
        )
    } else {
        (false, format!("Top 3 trades = {concentration_pct:.1}% of volume (distributed)"))
    }
}

/// ¿Exhibe la billetera el patrón dumper? (compra y vende el mismo
/// token en menos de 30 minutos, al menos dos veces).
pub fn analyze_dumper_history(transactions: &[WalletTransaction]) -> bool {
    let mut sorted: Vec<&WalletTransaction> = transactions.iter().collect();
    sorted.sort_by_key(|tx| tx.block_timestamp);

    let mut token_buys: std::collections::HashMap<&str, Vec<i64>> =
        std::collections::HashMap::new();
    let mut fast_dumps: u32 = 0;

    for tx in sorted {
        if tx.token_address.is_empty() || tx.block_timestamp == 0 {
            continue;
        }
        match tx.tx_type.as_str() {
            "buy" | "swap_in" => {
                token_buys.entry(tx.token_address.as_str()).or_default().push(tx.block_timestamp);
            }
            "sell" | "swap_out" => {
                if let Some(buys) = token_buys.get_mut(tx.token_address.as_str()) {
                    if let Some(index) = buys.iter().position(|buy_ts| {
                        let hold_minutes = (tx.block_timestamp - buy_ts) / 60;
                        hold_minutes > 0 && hold_minutes <= FAST_DUMP_MINUTES
                    }) {
                        fast_dumps += 1;
                        // Cada compra cuenta una sola vez.
                        buys.remove(index);
                    }
                }
            }
            _ => {}
        }
    }

    fast_dumps >= DUMPER_STRIKE_COUNT
}

/// Cuenta cuántas ballenas del conjunto exhiben patrón dumper.
pub fn count_dumper_wallets(wallet_histories: &[(String, Vec<WalletTransaction>)]) -> (u32, String) {
    let dumpers: Vec<&str> = wallet_histories
        .iter()
        .filter(|(_, history)| analyze_dumper_history(history))
        .map(|(wallet, _)| wallet.as_str())
        .collect();

    let reason = if dumpers.is_empty() {
        "No dumper pattern among whales".to_string()
    } else {
        format!("{} whale(s) with fast-dump history", dumpers.len())
    };
    (dumpers.len() as u32, reason)
}
