// [libs/infra/signer/src/lib.rs]
/*!
 * =================================================================
 * APARATO: BLIND KEYMAN BRIDGE (V3.0 - ISOLATION BOUNDARY)
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: PUENTE SEGURO ENTRE EL AGENTE Y EL FIRMANTE AISLADO
 *
 * ESTE MÓDULO HACE CUMPLIR LA FRONTERA DE AISLAMIENTO.
 * La llave de firma JAMÁS entra al espacio de direcciones del agente.
 * =================================================================
 */

pub mod errors;
pub mod keychain;

pub use errors::SignerError;
pub use keychain::{IsolationReport, IsolationStatus, KeychainBridge};
