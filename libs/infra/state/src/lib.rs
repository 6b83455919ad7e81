// [libs/infra/state/src/lib.rs]
/*!
 * =================================================================
 * APARATO: ATOMIC STATE VAULT (V3.0 - LOCKED PERSISTENCE)
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: PERSISTENCIA ATÓMICA DEL ESTADO DEL POTE
 * =================================================================
 */

pub mod errors;
pub mod store;
pub mod summary;

pub use errors::StateError;
pub use store::StateStore;
