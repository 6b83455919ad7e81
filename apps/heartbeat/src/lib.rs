// [apps/heartbeat/src/lib.rs]
/*!
 * =================================================================
 * APARATO: HEARTBEAT ORCHESTRATOR LIBRARY (V3.0)
 * CLASIFICACIÓN: APPLICATION LAYER (ESTRATO L1)
 * RESPONSABILIDAD: CICLO DE LATIDO, WATCHDOG, ARBITRAJE Y DIAGNÓSTICO
 * =================================================================
 */

pub mod arbitration;
pub mod cycle;
pub mod diagnostics;
pub mod kernel;
pub mod watchdog;

pub use cycle::{run_heartbeat, CycleReport, Opportunity};
pub use diagnostics::{diagnose_gateway, validate_command, CommandGate, RepairDiagnosis};
pub use kernel::{HeartbeatKernel, KernelIgnition};
pub use watchdog::{run_position_watchdog, ExitDecision, ExitUrgency};
