// [libs/domain/warden/src/gate.rs]
/*!
 * =================================================================
 * APARATO: SIX POINT VALIDATION GATE (V3.0)
 * CLASIFICACIÓN: DOMAIN LOGIC (ESTRATO L2)
 * RESPONSABILIDAD: AGREGACIÓN PASS / WARN / FAIL POR PERFIL DE JUGADA
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. PROFILE ROUTING: graduation relaja concentración (WARN, no FAIL)
 *    y acepta LP sin candado en silencio: características esperadas de
 *    launchpad, no banderas rojas.
 * 2. PRE-FETCH TRUST: con liquidez pre-cosechada y el proveedor
 *    reportando casi-cero para tokens nacientes, se confía la
 *    pre-cosecha.
 * 3. NULL SAFETY: todo campo nulo degrada a 0 / false vía accesores.
 * =================================================================
 */

use std::collections::BTreeMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{instrument, warn};

use boar_domain_models::{PlayType, WardenThresholds, WardenVerdict};
use boar_infra_feeds::TokenDataFeed;

/// Reporte completo del gate con desglose por chequeo.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WardenReport {
    pub verdict: WardenVerdict,
    pub token_mint: String,
    pub play_type: PlayType,
    pub checks: BTreeMap<String, Value>,
    pub reasons: Vec<String>,
}

impl WardenReport {
    fn failed(token_mint: &str, play_type: PlayType, reason: String) -> Self {
        Self {
            verdict: WardenVerdict::Fail,
            token_mint: token_mint.to_string(),
            play_type,
            checks: BTreeMap::new(),
            reasons: vec![reason],
        }
    }
}

/// Degrada PASS a WARN preservando un FAIL ya sentenciado.
fn soften_to_warn(verdict: &mut WardenVerdict) {
    if *verdict != WardenVerdict::Fail {
        *verdict = WardenVerdict::Warn;
    }
}

/// Ejecuta los seis chequeos del Rug Warden sobre un token.
///
/// `pre_fetched_liquidity_usd`: liquidez ya cosechada aguas arriba
/// (radar de launchpad). Se usa cuando el proveedor retorna casi-cero
/// para tokens recién nacidos.
#[instrument(skip(token_data_feed, thresholds))]
pub async fn run_warden_check(
    token_data_feed: &dyn TokenDataFeed,
    thresholds: &WardenThresholds,
    token_mint: &str,
    play_type: PlayType,
    pre_fetched_liquidity_usd: Option<f64>,
) -> WardenReport {
    let mut checks: BTreeMap<String, Value> = BTreeMap::new();
    let mut reasons: Vec<String> = Vec::new();
    let mut verdict = WardenVerdict::Pass;

    // Superficie del proveedor: cualquier fallo mapea a FAIL.
    let overview = match token_data_feed.get_token_overview(token_mint).await {
        Ok(overview) => overview,
        Err(e) => {
            warn!("🔴 [WARDEN]: overview surface failed for {}: {}", token_mint, e);
            return WardenReport::failed(token_mint, play_type, format!("Check failed: {e}"));
        }
    };
    let security = match token_data_feed.get_token_security(token_mint).await {
        Ok(security) => security,
        Err(e) => {
            warn!("🔴 [WARDEN]: security surface failed for {}: {}", token_mint, e);
            return WardenReport::failed(token_mint, play_type, format!("Check failed: {e}"));
        }
    };

    // 1. Profundidad de liquidez.
    let provider_liquidity = overview.liquidity();
    let liquidity = match pre_fetched_liquidity_usd {
        Some(pre_fetched) if provider_liquidity < 100.0 && pre_fetched > 1_000.0 => {
            checks.insert(
                "liquidity_source".into(),
                json!("pre-fetched (provider returned near-zero)"),
            );
            pre_fetched
        }
        _ => {
            checks.insert("liquidity_source".into(), json!("provider"));
            provider_liquidity
        }
    };
    checks.insert("liquidity_usd".into(), json!(liquidity));
    if liquidity < thresholds.min_liquidity_usd {
        verdict = WardenVerdict::Fail;
        reasons.push(format!(
            "Liquidity ${liquidity:.0} < ${:.0} minimum",
            thresholds.min_liquidity_usd
        ));
    }

    // 2. Concentración de holders.
    let top_holder_pct = security.top10_holder_pct();
    checks.insert("holder_concentration_pct".into(), json!((top_holder_pct * 10.0).round() / 10.0));
    if top_holder_pct > thresholds.max_holder_concentration_pct {
        match play_type {
            // Para graduation la concentración alta es WARN, no FAIL.
            PlayType::Graduation => {
                soften_to_warn(&mut verdict);
                reasons.push(format!(
                    "Top 10 holders control {top_holder_pct:.1}% (> {}%), WARN for graduation",
                    thresholds.max_holder_concentration_pct
                ));
            }
            PlayType::Accumulation => {
                verdict = WardenVerdict::Fail;
                reasons.push(format!(
                    "Top 10 holders control {top_holder_pct:.1}% (> {}%)",
                    thresholds.max_holder_concentration_pct
                ));
            }
        }
    }

    // 3. Autoridad de mint/freeze: ambas deben ser inmutables.
    let mint_mutable = security.mint_mutable();
    let freeze_mutable = security.freeze_mutable();
    checks.insert("mint_authority_mutable".into(), json!(mint_mutable));
    checks.insert("freeze_authority_mutable".into(), json!(freeze_mutable));
    if thresholds.reject_mutable_mint && (mint_mutable || freeze_mutable) {
        verdict = WardenVerdict::Fail;
        reasons.push(format!("Mutable authority: mint={mint_mutable}, freeze={freeze_mutable}"));
    }

    // 4. Simulación honeypot: implementable simulando una ruta de venta
    // a través del enrutador de swap. TODO: conectar cuando la ruta de
    // simulación del firmante quede disponible en live.
    checks.insert("honeypot_simulation".into(), json!("SKIPPED"));

    // 5. Edad del token: joven es WARN.
    match overview.created_at {
        Some(created_at) => {
            let age_seconds = (Utc::now() - created_at).num_seconds();
            checks.insert("token_age_seconds".into(), json!(age_seconds));
            if age_seconds < thresholds.min_token_age_seconds {
                soften_to_warn(&mut verdict);
                reasons.push(format!(
                    "Token age {age_seconds}s < {}s (very new)",
                    thresholds.min_token_age_seconds
                ));
            }
        }
        None => {
            checks.insert("token_age_seconds".into(), json!(-1));
        }
    }

    // 6. Estado del LP: con candado o quemado.
    let lp_secured = security.lp_secured();
    checks.insert("lp_locked".into(), json!(lp_secured));
    if !lp_secured {
        match play_type {
            PlayType::Graduation => {
                // LP sin candado es lo normal en launchpad: aceptación
                // silenciosa salvo rechazo explícito por configuración.
                if thresholds.reject_unlocked_lp {
                    verdict = WardenVerdict::Fail;
                    reasons.push("LP not locked or burned (rejected by config)".into());
                }
            }
            PlayType::Accumulation => {
                if thresholds.reject_unlocked_lp {
                    verdict = WardenVerdict::Fail;
                    reasons.push("LP not locked or burned (rejected by config)".into());
                } else {
                    soften_to_warn(&mut verdict);
                    reasons.push("LP not locked or burned".into());
                }
            }
        }
    }

    WardenReport { verdict, token_mint: token_mint.to_string(), play_type, checks, reasons }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use boar_infra_feeds::{
        FeedError, TokenOverview, TokenSecurity, TradesPage, WalletTransaction,
    };
    use chrono::Duration;

    /// Proveedor sintético de proving grounds.
    struct SyntheticFeed {
        overview: Result<TokenOverview, FeedError>,
        security: Result<TokenSecurity, FeedError>,
    }

    #[async_trait]
    impl TokenDataFeed for SyntheticFeed {
        async fn get_token_overview(&self, _mint: &str) -> Result<TokenOverview, FeedError> {
            self.overview.clone()
        }

        async fn get_token_security(&self, _mint: &str) -> Result<TokenSecurity, FeedError> {
            self.security.clone()
        }

        async fn get_trades(&self, _mint: &str, _limit: u32) -> Result<TradesPage, FeedError> {
            Ok(TradesPage::default())
        }

        async fn get_new_pairs(&self, _limit: u32) -> Result<Vec<String>, FeedError> {
            Ok(vec![])
        }

        async fn get_wallet_history(
            &self,
            _wallet: &str,
        ) -> Result<Vec<WalletTransaction>, FeedError> {
            Ok(vec![])
        }
    }

    fn healthy_overview() -> TokenOverview {
        TokenOverview {
            symbol: Some("AAA".into()),
            price_usd: Some(0.0001),
            liquidity_usd: Some(50_000.0),
            volume_1h_usd: Some(1_000.0),
            volume_24h_usd: Some(12_000.0),
            market_cap_usd: Some(200_000.0),
            created_at: Some(Utc::now() - Duration::hours(6)),
        }
    }

    fn healthy_security() -> TokenSecurity {
        TokenSecurity {
            top10_holder_fraction: Some(0.35),
            is_mintable: Some(false),
            is_freezable: Some(false),
            is_lp_locked: Some(true),
            is_lp_burned: Some(false),
        }
    }

    fn feed(overview: TokenOverview, security: TokenSecurity) -> SyntheticFeed {
        SyntheticFeed { overview: Ok(overview), security: Ok(security) }
    }

    #[tokio::test]
    async fn certify_healthy_token_passes_all_six() {
        let report = run_warden_check(
            &feed(healthy_overview(), healthy_security()),
            &WardenThresholds::default(),
            "MintHealthy",
            PlayType::Accumulation,
            None,
        )
        .await;

        assert_eq!(report.verdict, WardenVerdict::Pass);
        assert!(report.reasons.is_empty(), "{:?}", report.reasons);
        assert_eq!(report.checks.get("honeypot_simulation"), Some(&json!("SKIPPED")));
    }

    #[tokio::test]
    async fn certify_thin_liquidity_fails() {
        let mut overview = healthy_overview();
        overview.liquidity_usd = Some(500.0);

        let report = run_warden_check(
            &feed(overview, healthy_security()),
            &WardenThresholds::default(),
            "MintThin",
            PlayType::Accumulation,
            None,
        )
        .await;

        assert_eq!(report.verdict, WardenVerdict::Fail);
        assert!(report.reasons[0].contains("Liquidity"));
    }

    #[tokio::test]
    async fn certify_prefetched_liquidity_rescues_newborn_tokens() {
        let mut overview = healthy_overview();
        // El proveedor aún no indexa el pool del token naciente.
        overview.liquidity_usd = Some(0.0);

        let report = run_warden_check(
            &feed(overview, healthy_security()),
            &WardenThresholds::graduation_default(),
            "MintNewborn",
            PlayType::Graduation,
            Some(8_000.0),
        )
        .await;

        assert_ne!(report.verdict, WardenVerdict::Fail);
        assert_eq!(
            report.checks.get("liquidity_source"),
            Some(&json!("pre-fetched (provider returned near-zero)"))
        );
    }

    #[tokio::test]
    async fn certify_concentration_profile_split() {
        let mut security = healthy_security();
        security.top10_holder_fraction = Some(0.92);

        // Accumulation: FAIL.
        let report = run_warden_check(
            &feed(healthy_overview(), security.clone()),
            &WardenThresholds::default(),
            "MintConc",
            PlayType::Accumulation,
            None,
        )
        .await;
        assert_eq!(report.verdict, WardenVerdict::Fail);

        // Graduation: WARN, no FAIL.
        let mut overview = healthy_overview();
        overview.liquidity_usd = Some(5_000.0);
        let report = run_warden_check(
            &feed(overview, security),
            &WardenThresholds::graduation_default(),
            "MintConc",
            PlayType::Graduation,
            None,
        )
        .await;
        assert_eq!(report.verdict, WardenVerdict::Warn);
    }

    #[tokio::test]
    async fn certify_mutable_authority_fails() {
        let mut security = healthy_security();
        security.is_mintable = Some(true);

        let report = run_warden_check(
            &feed(healthy_overview(), security),
            &WardenThresholds::default(),
            "MintMutable",
            PlayType::Accumulation,
            None,
        )
        .await;

        assert_eq!(report.verdict, WardenVerdict::Fail);
        assert!(report.reasons.iter().any(|reason| reason.contains("Mutable authority")));
    }

    #[tokio::test]
    async fn certify_young_token_warns() {
        let mut overview = healthy_overview();
        overview.created_at = Some(Utc::now() - Duration::seconds(60));

        let report = run_warden_check(
            &feed(overview, healthy_security()),
            &WardenThresholds::default(),
            "MintYoung",
            PlayType::Accumulation,
            None,
        )
        .await;

        assert_eq!(report.verdict, WardenVerdict::Warn);
        assert!(report.reasons.iter().any(|reason| reason.contains("very new")));
    }

    #[tokio::test]
    async fn certify_unlocked_lp_profile_split() {
        let mut security = healthy_security();
        security.is_lp_locked = Some(false);

        // Accumulation: WARN explícito.
        let report = run_warden_check(
            &feed(healthy_overview(), security.clone()),
            &WardenThresholds::default(),
            "MintLp",
            PlayType::Accumulation,
            None,
        )
        .await;
        assert_eq!(report.verdict, WardenVerdict::Warn);

        // Graduation: aceptación silenciosa (launchpad no bloquea LP).
        let report = run_warden_check(
            &feed(healthy_overview(), security),
            &WardenThresholds::graduation_default(),
            "MintLp",
            PlayType::Graduation,
            None,
        )
        .await;
        assert_eq!(report.verdict, WardenVerdict::Pass);
        assert!(report.reasons.is_empty());
    }

    #[tokio::test]
    async fn certify_provider_failure_is_fail_closed() {
        let broken = SyntheticFeed {
            overview: Err(FeedError::ProviderUnavailable { provider: "telemetry".into() }),
            security: Ok(healthy_security()),
        };

        let report = run_warden_check(
            &broken,
            &WardenThresholds::default(),
            "MintDark",
            PlayType::Accumulation,
            None,
        )
        .await;

        assert_eq!(report.verdict, WardenVerdict::Fail, "the warden never passes blind");
        assert!(report.reasons[0].contains("Check failed"));
    }
}
