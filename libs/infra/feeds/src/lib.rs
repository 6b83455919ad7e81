// [libs/infra/feeds/src/lib.rs]
/*!
 * =================================================================
 * APARATO: MARKET FEED INFRASTRUCTURE (V3.0 - TYPED UPLINKS)
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: CONTRATOS DE FEEDS, LIMITACIÓN, REINTENTO Y LOTEO
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. NAMED FEEDS: Los proveedores externos quedan detrás de traits con
 *    registros tipados; el núcleo jamás ve JSON crudo de terceros.
 * 2. FLOW DISCIPLINE: Token-bucket por proveedor, backoff exponencial
 *    acotado que jamás cruza la frontera del ciclo, y fan-out con
 *    concurrencia acotada.
 * =================================================================
 */

pub mod batch;
pub mod clients;
pub mod errors;
pub mod narrative_tracker;
pub mod rate_limiter;
pub mod records;
pub mod red_flags;
pub mod retry;
pub mod traits;

pub use batch::batch_gather;
pub use clients::{MarketDataClient, OracleHttpClient};
pub use errors::FeedError;
pub use narrative_tracker::NarrativeTracker;
pub use rate_limiter::RateLimiter;
pub use records::{
    AlphaCall, BuyerDepth, FlowIntel, HoldingsDelta, MobulaWhaleSignal, NarrativeSignal,
    OracleHarvest, PhaseTiming, PulseCandidate, ReasonerVerdict, TokenOverview, TokenSecurity,
    TradeRecord, TradesPage, WalletTransaction, WhaleSignal,
};
pub use retry::with_retry;
pub use traits::{OracleFeed, ReasonerFeed, TokenDataFeed};
