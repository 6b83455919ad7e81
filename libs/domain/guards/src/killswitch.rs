// [libs/domain/guards/src/killswitch.rs]
/*!
 * =================================================================
 * APARATO: KILLSWITCH GUARD (V3.0)
 * CLASIFICACIÓN: DOMAIN LOGIC (ESTRATO L2)
 * RESPONSABILIDAD: ALTO INMEDIATO POR ARCHIVO DESIGNADO EN DISCO
 *
 * Con el archivo presente, el sistema se detiene de inmediato: sin
 * trades, sin ejecución de skills, sin mutación de estado. El alto es
 * silencioso (sin alerta repetida) pero retorna estatus estructurado.
 * =================================================================
 */

use std::path::Path;

use serde::Serialize;

/// Estado del killswitch. El llamador decide por match, nunca por bool.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub enum KillswitchStatus {
    Clear,
    /// Contenido del archivo como razón humana opcional.
    Active { reason: String },
}

/// Sondea el archivo killswitch.
pub fn check_killswitch(killswitch_path: &Path) -> KillswitchStatus {
    if !killswitch_path.exists() {
        return KillswitchStatus::Clear;
    }

    let reason = std::fs::read_to_string(killswitch_path)
        .map(|raw| raw.trim().to_string())
        .ok()
        .filter(|content| !content.is_empty())
        .unwrap_or_else(|| "No reason given".to_string());

    KillswitchStatus::Active { reason }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn certify_absent_file_is_clear() {
        let workdir = tempfile::tempdir().expect("workdir");
        assert_eq!(
            check_killswitch(&workdir.path().join("killswitch.txt")),
            KillswitchStatus::Clear
        );
    }

    #[test]
    fn certify_present_file_halts_with_reason() {
        let workdir = tempfile::tempdir().expect("workdir");
        let path = workdir.path().join("killswitch.txt");
        std::fs::write(&path, "manual halt: market chaos\n").expect("write");

        assert_eq!(
            check_killswitch(&path),
            KillswitchStatus::Active { reason: "manual halt: market chaos".into() }
        );

        // Archivo vacío: alto igualmente, con razón por defecto.
        std::fs::write(&path, "").expect("write");
        assert_eq!(
            check_killswitch(&path),
            KillswitchStatus::Active { reason: "No reason given".into() }
        );
    }
}
