// [libs/domain/guards/src/lib.rs]
/*!
 * =================================================================
 * APARATO: PRECONDITION GUARD SUITE (V3.0)
 * CLASIFICACIÓN: DOMAIN LOGIC (ESTRATO L2)
 * RESPONSABILIDAD: TRES PRECONDICIONES ORTOGONALES PREVIAS A LA ENTRADA
 *
 * Killswitch (alto inmediato), Drawdown (alto temporizado) y Riesgo
 * Diario (bloqueo de nuevas entradas). Se evalúan ANTES de la lógica
 * de entrada de cada ciclo.
 * =================================================================
 */

pub mod drawdown;
pub mod killswitch;
pub mod risk;

pub use drawdown::{check_drawdown, DrawdownStatus};
pub use killswitch::{check_killswitch, KillswitchStatus};
pub use risk::{check_risk, RiskReport, RiskStatus};
