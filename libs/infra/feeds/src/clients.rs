// [libs/infra/feeds/src/clients.rs]
/*!
 * =================================================================
 * APARATO: MARKET DATA UPLINK (V3.0 - PROVIDER AGNOSTIC)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: ADAPTADOR HTTP TIPADO TRAS LA COSTURA TokenDataFeed
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. NULL SAFETY: Toda respuesta del proveedor degrada campo a campo;
 *    un nulo jamás tumba el pipeline.
 * 2. FLOW DISCIPLINE: Cada llamada pasa por el token-bucket del
 *    proveedor y por el motor de reintento acotado.
 * =================================================================
 */

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::instrument;

use crate::errors::FeedError;
use crate::rate_limiter::RateLimiter;
use crate::records::{TokenOverview, TokenSecurity, TradeRecord, TradesPage, WalletTransaction};
use crate::retry::with_retry;
use crate::traits::TokenDataFeed;

/// Adaptador HTTP del proveedor de telemetría de tokens.
pub struct MarketDataClient {
    network_session_client: Client,
    provider_base_endpoint: String,
    provider_nominal_name: String,
    rate_limiter: Arc<RateLimiter>,
}

impl MarketDataClient {
    pub fn new(
        base_url: String,
        api_key: String,
        provider_name: String,
        rate_limiter: Arc<RateLimiter>,
    ) -> Self {
        let mut header_map = reqwest::header::HeaderMap::new();
        if let Ok(key_value) = reqwest::header::HeaderValue::from_str(&api_key) {
            header_map.insert("X-API-KEY", key_value);
        }

        Self {
            network_session_client: Client::builder()
                .default_headers(header_map)
                .user_agent("Boar-Engine/V3.0")
                .timeout(Duration::from_secs(15))
                .build()
                .unwrap_or_default(),
            provider_base_endpoint: base_url.trim_end_matches('/').to_string(),
            provider_nominal_name: provider_name,
            rate_limiter,
        }
    }

    async fn fetch_json(&self, path_and_query: &str) -> Result<Value, FeedError> {
        let source = self.provider_nominal_name.clone();
        let target_url = format!("{}{}", self.provider_base_endpoint, path_and_query);

        with_retry(&source, || {
            let source = source.clone();
            let target_url = target_url.clone();
            async move {
                self.rate_limiter.acquire(&source).await;

                let network_response = self
                    .network_session_client
                    .get(&target_url)
                    .send()
                    .await
                    .map_err(|_| FeedError::ProviderUnavailable { provider: source.clone() })?;

                match network_response.status() {
                    StatusCode::TOO_MANY_REQUESTS => {
                        let retry_after_seconds = network_response
                            .headers()
                            .get(reqwest::header::RETRY_AFTER)
                            .and_then(|value| value.to_str().ok())
                            .and_then(|raw| raw.parse::<u64>().ok())
                            .unwrap_or(1);
                        Err(FeedError::ProviderRateLimited { provider: source, retry_after_seconds })
                    }
                    status if status.is_success() => network_response
                        .json::<Value>()
                        .await
                        .map_err(|e| FeedError::MalformedResponse { provider: source, reason: e.to_string() }),
                    _ => Err(FeedError::ProviderUnavailable { provider: source }),
                }
            }
        })
        .await
    }

    fn payload<'a>(raw: &'a Value) -> &'a Value {
        raw.get("data").unwrap_or(raw)
    }

    fn float_field(value: &Value, field: &str) -> Option<f64> {
        value.get(field).and_then(Value::as_f64)
    }

    fn bool_field(value: &Value, field: &str) -> Option<bool> {
        value.get(field).and_then(Value::as_bool)
    }

    fn millis_to_datetime(millis: f64) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(millis as i64).single()
    }
}

#[async_trait]
impl TokenDataFeed for MarketDataClient {
    #[instrument(skip(self))]
    async fn get_token_overview(&self, token_mint: &str) -> Result<TokenOverview, FeedError> {
        let raw = self.fetch_json(&format!("/defi/token_overview?address={token_mint}")).await?;
        let payload = Self::payload(&raw);

        Ok(TokenOverview {
            symbol: payload.get("symbol").and_then(Value::as_str).map(str::to_string),
            price_usd: Self::float_field(payload, "price"),
            liquidity_usd: Self::float_field(payload, "liquidity"),
            volume_1h_usd: Self::float_field(payload, "v1hUSD"),
            volume_24h_usd: Self::float_field(payload, "v24hUSD"),
            market_cap_usd: Self::float_field(payload, "mc"),
            created_at: Self::float_field(payload, "createdAt").and_then(Self::millis_to_datetime),
        })
    }

    #[instrument(skip(self))]
    async fn get_token_security(&self, token_mint: &str) -> Result<TokenSecurity, FeedError> {
        let raw = self.fetch_json(&format!("/defi/token_security?address={token_mint}")).await?;
        let payload = Self::payload(&raw);

        Ok(TokenSecurity {
            top10_holder_fraction: Self::float_field(payload, "top10HolderPercent"),
            is_mintable: Self::bool_field(payload, "isMintable"),
            is_freezable: Self::bool_field(payload, "isFreezable"),
            is_lp_locked: Self::bool_field(payload, "isLpLocked"),
            is_lp_burned: Self::bool_field(payload, "isLpBurned"),
        })
    }

    #[instrument(skip(self))]
    async fn get_trades(&self, token_mint: &str, limit: u32) -> Result<TradesPage, FeedError> {
        let raw = self
            .fetch_json(&format!("/defi/txs/token?address={token_mint}&limit={limit}"))
            .await?;
        let payload = Self::payload(&raw);

        let items = payload
            .get("items")
            .and_then(Value::as_array)
            .map(|entries| {
                entries
                    .iter()
                    .map(|entry| TradeRecord {
                        block_time: Self::float_field(entry, "blockUnixTime")
                            .and_then(|seconds| Utc.timestamp_opt(seconds as i64, 0).single()),
                        volume_usd: Self::float_field(entry, "volumeInUSD"),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(TradesPage { items })
    }

    #[instrument(skip(self))]
    async fn get_new_pairs(&self, limit: u32) -> Result<Vec<String>, FeedError> {
        let raw = self.fetch_json(&format!("/defi/v2/tokens/new_listing?limit={limit}")).await?;
        let payload = Self::payload(&raw);

        Ok(payload
            .get("items")
            .and_then(Value::as_array)
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|entry| {
                        entry
                            .get("address")
                            .or_else(|| entry.get("baseAddress"))
                            .and_then(Value::as_str)
                            .map(str::to_string)
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    #[instrument(skip(self))]
    async fn get_wallet_history(
        &self,
        wallet_address: &str,
    ) -> Result<Vec<WalletTransaction>, FeedError> {
        let raw = self.fetch_json(&format!("/v1/wallet/tx_list?wallet={wallet_address}")).await?;
        let payload = Self::payload(&raw);

        Ok(payload
            .as_array()
            .map(|entries| {
                entries
                    .iter()
                    .map(|entry| WalletTransaction {
                        tx_type: entry
                            .get("tx_type")
                            .and_then(Value::as_str)
                            .unwrap_or_default()
                            .to_string(),
                        token_address: entry
                            .get("token_address")
                            .and_then(Value::as_str)
                            .unwrap_or_default()
                            .to_string(),
                        block_timestamp: entry
                            .get("block_timestamp")
                            .and_then(Value::as_i64)
                            .unwrap_or(0),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }
}

/// Adaptador HTTP del oráculo de smart money. La cosecha llega ya
/// agregada por el servicio del oráculo como JSON tipado.
pub struct OracleHttpClient {
    network_session_client: Client,
    oracle_base_endpoint: String,
    rate_limiter: Arc<RateLimiter>,
}

impl OracleHttpClient {
    pub fn new(base_url: String, api_key: String, rate_limiter: Arc<RateLimiter>) -> Self {
        let mut header_map = reqwest::header::HeaderMap::new();
        if let Ok(key_value) = reqwest::header::HeaderValue::from_str(&api_key) {
            header_map.insert("X-API-KEY", key_value);
        }

        Self {
            network_session_client: Client::builder()
                .default_headers(header_map)
                .user_agent("Boar-Engine/V3.0")
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
            oracle_base_endpoint: base_url.trim_end_matches('/').to_string(),
            rate_limiter,
        }
    }
}

#[async_trait]
impl crate::traits::OracleFeed for OracleHttpClient {
    #[instrument(skip(self))]
    async fn query_oracle(&self) -> Result<crate::records::OracleHarvest, FeedError> {
        let source = "oracle".to_string();
        let target_url = format!("{}/smart-money/harvest", self.oracle_base_endpoint);

        with_retry(&source, || {
            let source = source.clone();
            let target_url = target_url.clone();
            async move {
                self.rate_limiter.acquire(&source).await;

                let network_response = self
                    .network_session_client
                    .get(&target_url)
                    .send()
                    .await
                    .map_err(|_| FeedError::ProviderUnavailable { provider: source.clone() })?;

                if !network_response.status().is_success() {
                    return Err(FeedError::ProviderUnavailable { provider: source });
                }

                network_response
                    .json::<crate::records::OracleHarvest>()
                    .await
                    .map_err(|e| FeedError::MalformedResponse { provider: source, reason: e.to_string() })
            }
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::TokenOverview;

    #[test]
    fn certify_volume_spike_ratio_arithmetic() {
        let overview = TokenOverview {
            volume_1h_usd: Some(10_000.0),
            volume_24h_usd: Some(24_000.0),
            ..Default::default()
        };
        // 10k contra promedio horario de 1k: pico de 10x.
        assert_eq!(overview.volume_spike_ratio(), 10.0);

        let silent = TokenOverview::default();
        assert_eq!(silent.volume_spike_ratio(), 0.0);
    }

    #[test]
    fn certify_null_safety_of_security_accessors() {
        let security = TokenSecurity::default();
        assert_eq!(security.top10_holder_pct(), 0.0);
        assert!(!security.mint_mutable());
        assert!(!security.lp_secured());
    }
}
