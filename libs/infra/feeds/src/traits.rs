// [libs/infra/feeds/src/traits.rs]
/*!
 * =================================================================
 * APARATO: FEED TRAIT CONTRACTS (V3.0 - SEAM LAYER)
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: COSTURAS ASÍNCRONAS HACIA LOS PROVEEDORES
 *
 * Los clientes HTTP concretos viven detrás de estas costuras; el
 * orquestador y el warden consumen únicamente registros tipados.
 * =================================================================
 */

use async_trait::async_trait;

use crate::errors::FeedError;
use crate::records::{
    OracleHarvest, ReasonerVerdict, TokenOverview, TokenSecurity, TradesPage, WalletTransaction,
};

/// Oráculo de smart money: ballenas, agregador y radar de launchpad.
#[async_trait]
pub trait OracleFeed: Send + Sync {
    async fn query_oracle(&self) -> Result<OracleHarvest, FeedError>;
}

/// Telemetría de token: precios, seguridad y libro de trades.
#[async_trait]
pub trait TokenDataFeed: Send + Sync {
    async fn get_token_overview(&self, token_mint: &str) -> Result<TokenOverview, FeedError>;

    async fn get_token_security(&self, token_mint: &str) -> Result<TokenSecurity, FeedError>;

    async fn get_trades(&self, token_mint: &str, limit: u32) -> Result<TradesPage, FeedError>;

    /// Tokens recién listados de baja capitalización (barrido narrativo).
    async fn get_new_pairs(&self, limit: u32) -> Result<Vec<String>, FeedError>;

    /// Historial de una billetera para el análisis de patrón dumper.
    async fn get_wallet_history(
        &self,
        wallet_address: &str,
    ) -> Result<Vec<WalletTransaction>, FeedError>;
}

/// Razonador externo de alpha. Solo consultado para candidatos
/// WATCHLIST con warden PASS; JAMÁS puede anular un VETO.
#[async_trait]
pub trait ReasonerFeed: Send + Sync {
    async fn consult_alpha(&self, briefing: &str) -> Result<ReasonerVerdict, FeedError>;

    /// Identidad del modelo desplegado (bead MODEL_VERSION).
    fn model_name(&self) -> &str;
}
