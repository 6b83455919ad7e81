// [libs/infra/feeds/src/errors.rs]
/*!
 * =================================================================
 * APARATO: FEED ERROR CATALOG (V3.0)
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: FALLOS DE PROVEEDOR COMO VARIANTES ETIQUETADAS
 * =================================================================
 */

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum FeedError {
    /// Transitorio: dispara la penalización de datos parciales del ciclo.
    #[error("[L3_FEED_FAULT]: PROVIDER_UNAVAILABLE -> {provider}")]
    ProviderUnavailable { provider: String },

    /// Transitorio: backoff respetando el retry_after del proveedor.
    #[error("[L3_FEED_FAULT]: PROVIDER_RATE_LIMITED -> {provider} (retry after {retry_after_seconds}s)")]
    ProviderRateLimited { provider: String, retry_after_seconds: u64 },

    /// Respuesta estructuralmente inválida del proveedor.
    #[error("[L3_FEED_FAULT]: MALFORMED_RESPONSE -> {provider}: {reason}")]
    MalformedResponse { provider: String, reason: String },
}

impl FeedError {
    /// Solo los fallos transitorios entran a la política de reintento.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            FeedError::ProviderUnavailable { .. } | FeedError::ProviderRateLimited { .. }
        )
    }

    pub fn source_name(&self) -> &str {
        match self {
            FeedError::ProviderUnavailable { provider } => provider,
            FeedError::ProviderRateLimited { provider, .. } => provider,
            FeedError::MalformedResponse { provider, .. } => provider,
        }
    }
}
