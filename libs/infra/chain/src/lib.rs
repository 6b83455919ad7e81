// [libs/infra/chain/src/lib.rs]
/*!
 * =================================================================
 * APARATO: BEAD CHAIN INFRASTRUCTURE (V3.0 - FLIGHT RECORDER)
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: LEDGER APPEND-ONLY, MERKLE, ATESTACIÓN Y ANCLAJE
 * =================================================================
 */

pub mod anchor;
pub mod chain;
pub mod client;
pub mod emitters;
pub mod errors;
pub mod merkle;
pub mod schema;
pub mod signing;

pub use anchor::{submit_anchor, AnchorOutcome, AnchorPayload};
pub use chain::{
    AnchorTrigger, BeadChain, BootVerdict, ChainStats, ChainVerifyResult, LatencyStats,
    MerkleBatch, QueryWindow, ShadowFieldStats,
};
pub use client::ChainDbClient;
pub use errors::ChainError;
pub use merkle::{build_merkle_tree, compute_merkle_root};
pub use signing::NodeSigner;
