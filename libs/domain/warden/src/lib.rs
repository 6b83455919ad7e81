// [libs/domain/warden/src/lib.rs]
/*!
 * =================================================================
 * APARATO: RUG WARDEN GATE (V3.0 - FAIL CLOSED)
 * CLASIFICACIÓN: DOMAIN LOGIC (ESTRATO L2)
 * RESPONSABILIDAD: VALIDACIÓN DE SEGURIDAD PRE-TRADE EN SEIS PUNTOS
 *
 * Chequeo de seis puntos:
 *  1. Profundidad de liquidez       4. Simulación honeypot
 *  2. Concentración de holders      5. Edad del token
 *  3. Autoridad de mint/freeze      6. Estado del LP
 *
 * El warden JAMÁS retorna PASS con un proveedor caído: los errores de
 * superficie mapean a FAIL (fail closed por construcción).
 * =================================================================
 */

pub mod gate;

pub use gate::{run_warden_check, WardenReport};
