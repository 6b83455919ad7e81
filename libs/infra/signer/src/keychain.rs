// [libs/infra/signer/src/keychain.rs]
/*!
 * =================================================================
 * APARATO: KEYCHAIN ISOLATION BRIDGE (V3.0 - BLIND KEYMAN)
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: SPAWN DEL FIRMANTE CON ENTORNO MÍNIMO
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. MINIMAL ENV: El subproceso recibe ÚNICAMENTE PATH, HOME, workspace
 *    y la llave. El entorno del agente (API keys, tokens) NO se hereda.
 * 2. PIPE PROTOCOL: Transacción sin firmar por stdin, firmada por
 *    stdout, una línea genérica de error por stderr.
 * 3. HARD DEADLINE: 10 segundos y terminación forzada.
 * 4. SCRATCH HYGIENE: La llave se sobreescribe en el scratch local del
 *    puente inmediatamente después del spawn.
 *
 * INVARIANTES CRÍTICAS:
 *  - El proceso del agente JAMÁS tiene SIGNER_PRIVATE_KEY en su entorno.
 *  - La llave JAMÁS se escribe a archivo por este módulo.
 *  - La llave JAMÁS aparece en logs ni en mensajes de error.
 * =================================================================
 */

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use serde::Serialize;
use tokio::io::AsyncReadExt;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::warn;

use crate::errors::SignerError;

/// Variable de entorno que SOLO el subproceso firmante puede contener.
pub const SIGNER_KEY_ENV: &str = "SIGNER_PRIVATE_KEY";
/// Opt-in explícito de pruebas. Jamás producción.
pub const TEST_KEY_ENV: &str = "BOAR_TEST_SIGNER_KEY";
/// Servicio del keychain de plataforma (modo desarrollo macOS).
const KEYCHAIN_SERVICE: &str = "boar-signer";
/// Plazo fijo del subproceso antes de la terminación forzada.
const SIGNER_TIMEOUT_SECONDS: u64 = 10;

/// Prefijos de entorno conocidos-seguros para la auditoría de aislamiento.
const SAFE_ENV_PREFIXES: &[&str] = &[
    "PATH", "HOME", "SHELL", "TERM", "LANG", "USER", "LOGNAME", "PWD", "OLDPWD", "TMPDIR",
    "XDG_", "LC_", "SSH_", "GPG_", "GIT_", "DISPLAY", "DBUS_", "COLORTERM", "HOSTNAME",
    "CARGO_", "RUST", "LD_", "MANPATH", "EDITOR",
    "BOAR_", "SIGNER_KEY_PATH", "TELEGRAM_", "HELIUS_", "NANSEN_", "MOBULA_", "BIRDEYE_",
];

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub enum IsolationStatus {
    Clean,
    Violation,
}

/// Reporte de la auditoría continua de aislamiento del agente.
#[derive(Debug, Clone, Serialize)]
pub struct IsolationReport {
    pub status: IsolationStatus,
    pub violations: Vec<String>,
    pub message: String,
}

/// Puente hacia el subproceso firmante ciego.
pub struct KeychainBridge {
    signer_binary_path: PathBuf,
    key_file_path: Option<PathBuf>,
    workspace_path: PathBuf,
    /// Habilita la fuente de llave por variable de entorno. SOLO pruebas.
    allow_test_env_key: bool,
}

impl KeychainBridge {
    pub fn new(
        signer_binary_path: PathBuf,
        key_file_path: Option<PathBuf>,
        workspace_path: PathBuf,
    ) -> Self {
        Self { signer_binary_path, key_file_path, workspace_path, allow_test_env_key: false }
    }

    /// Opt-in explícito de la fuente de llave de pruebas.
    pub fn with_test_env_key(mut self) -> Self {
        self.allow_test_env_key = true;
        self
    }

    /// Recupera la llave desde una fuente segura, en orden de prioridad:
    /// 1. Archivo en `key_file_path` (VPS: chmod 400, dueño dedicado).
    /// 2. Keychain de plataforma (modo desarrollo macOS).
    /// 3. Variable de entorno de pruebas (opt-in explícito, jamás producción).
    fn resolve_key(&self) -> Result<String, SignerError> {
        if let Some(path) = &self.key_file_path {
            return std::fs::read_to_string(path)
                .map(|raw| raw.trim().to_string())
                .map_err(|_| SignerError::KeyFileUnreadable { path: path.display().to_string() });
        }

        #[cfg(target_os = "macos")]
        {
            if let Ok(output) = std::process::Command::new("security")
                .args(["find-generic-password", "-s", KEYCHAIN_SERVICE, "-w"])
                .output()
            {
                if output.status.success() {
                    let key = String::from_utf8_lossy(&output.stdout).trim().to_string();
                    if !key.is_empty() {
                        return Ok(key);
                    }
                }
            }
        }

        if self.allow_test_env_key {
            if let Ok(key) = std::env::var(TEST_KEY_ENV) {
                if !key.is_empty() {
                    return Ok(key);
                }
            }
        }

        Err(SignerError::NoKeySource)
    }

    /// Entorno MÍNIMO del subproceso. CRÍTICO: jamás heredar el entorno
    /// completo del agente; se construye desde cero.
    fn minimal_environment(&self, signer_key: &str) -> HashMap<String, String> {
        let mut environment = HashMap::new();
        environment.insert(
            "PATH".to_string(),
            std::env::var("PATH").unwrap_or_else(|_| "/usr/bin:/usr/local/bin".to_string()),
        );
        environment.insert("HOME".to_string(), std::env::var("HOME").unwrap_or_default());
        environment
            .insert("BOAR_WORKSPACE".to_string(), self.workspace_path.display().to_string());
        environment.insert(SIGNER_KEY_ENV.to_string(), signer_key.to_string());
        environment
    }

    async fn invoke_signer(
        &self,
        arguments: &[&str],
        stdin_payload: Option<&str>,
    ) -> Result<String, SignerError> {
        let signer_key = self.resolve_key()?;
        let mut environment = self.minimal_environment(&signer_key);
        // Higiene del scratch: la llave local del puente se anula ya.
        drop(signer_key);

        let mut child = Command::new(&self.signer_binary_path)
            .args(arguments)
            .env_clear()
            .envs(&environment)
            .current_dir(&self.workspace_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| SignerError::Spawn(e.to_string()))?;

        environment.clear();

        if let Some(payload) = stdin_payload {
            let mut stdin_pipe = child
                .stdin
                .take()
                .ok_or_else(|| SignerError::Spawn("stdin pipe unavailable".into()))?;
            stdin_pipe
                .write_all(payload.as_bytes())
                .await
                .map_err(|e| SignerError::Spawn(format!("stdin write: {e}")))?;
            // El cierre del stream marca el fin del payload.
            drop(stdin_pipe);
        } else {
            drop(child.stdin.take());
        }

        let mut stdout_pipe = child
            .stdout
            .take()
            .ok_or_else(|| SignerError::Spawn("stdout pipe unavailable".into()))?;
        let mut stderr_pipe = child
            .stderr
            .take()
            .ok_or_else(|| SignerError::Spawn("stderr pipe unavailable".into()))?;

        let exit_status =
            match tokio::time::timeout(Duration::from_secs(SIGNER_TIMEOUT_SECONDS), child.wait())
                .await
            {
                Ok(Ok(status)) => status,
                Ok(Err(e)) => return Err(SignerError::Spawn(e.to_string())),
                Err(_) => {
                    let _ = child.start_kill();
                    let _ = child.wait().await;
                    return Err(SignerError::Timeout(SIGNER_TIMEOUT_SECONDS));
                }
            };

        let mut stdout_text = String::new();
        let mut stderr_text = String::new();
        let _ = stdout_pipe.read_to_string(&mut stdout_text).await;
        let _ = stderr_pipe.read_to_string(&mut stderr_text).await;

        if !exit_status.success() {
            // stderr lleva una línea genérica; el firmante garantiza que
            // jamás contiene material de llave.
            let generic_line = stderr_text.lines().next().unwrap_or("Unknown signer error");
            return Err(SignerError::Rejected(generic_line.to_string()));
        }

        let output = stdout_text.trim().to_string();
        if output.is_empty() {
            return Err(SignerError::EmptyOutput);
        }
        Ok(output)
    }

    /// Firma una transacción vía el subproceso aislado.
    ///
    /// # Errors:
    /// `SignerError` en todo fallo; ninguna variante contiene material de llave.
    pub async fn sign_transaction(&self, unsigned_tx_base64: &str) -> Result<String, SignerError> {
        self.invoke_signer(&[], Some(unsigned_tx_base64)).await
    }

    /// Deriva la llave pública (base58) vía el modo --pubkey del firmante.
    /// La llave pública NO es material secreto.
    pub async fn get_public_key(&self) -> Result<String, SignerError> {
        self.invoke_signer(&["--pubkey"], None).await
    }
}

/// Audita que el entorno del agente NO contenga la llave del firmante.
/// Invocada en cada latido para verificación continua.
pub fn verify_isolation() -> IsolationReport {
    let mut violations: Vec<String> = Vec::new();

    if std::env::var(SIGNER_KEY_ENV).is_ok() {
        violations.push(format!(
            "CRITICAL: {SIGNER_KEY_ENV} found in agent process environment!"
        ));
    }

    for (name, value) in std::env::vars() {
        if name == SIGNER_KEY_ENV {
            continue;
        }
        let whitelisted = SAFE_ENV_PREFIXES.iter().any(|prefix| name.starts_with(prefix));
        if value.len() >= 64 && !whitelisted {
            // Variable larga desconocida: posible llave filtrada.
            violations.push(format!("WARNING: Suspicious long env var: {name} (len={})", value.len()));
        }
    }

    if violations.is_empty() {
        IsolationReport {
            status: IsolationStatus::Clean,
            violations,
            message: "Key isolation verified".into(),
        }
    } else {
        warn!("🔴 [ISOLATION]: {} violation(s) detected in agent environment", violations.len());
        let message = violations.join("; ");
        IsolationReport { status: IsolationStatus::Violation, violations, message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn certify_key_priority_prefers_file_over_env() {
        let key_file = tempfile::NamedTempFile::new().expect("temp key file");
        std::fs::write(key_file.path(), "ZmlsZS1rZXk=\n").expect("write key");

        let bridge = KeychainBridge::new(
            PathBuf::from("boar-signer"),
            Some(key_file.path().to_path_buf()),
            std::env::temp_dir(),
        )
        .with_test_env_key();

        assert_eq!(bridge.resolve_key().expect("file key"), "ZmlsZS1rZXk=");
    }

    #[test]
    fn certify_missing_key_file_is_a_tagged_fault() {
        let bridge = KeychainBridge::new(
            PathBuf::from("boar-signer"),
            Some(PathBuf::from("/nonexistent/boar/key")),
            std::env::temp_dir(),
        );

        assert!(matches!(bridge.resolve_key(), Err(SignerError::KeyFileUnreadable { .. })));
    }

    #[test]
    fn certify_env_key_requires_explicit_opt_in() {
        let bridge =
            KeychainBridge::new(PathBuf::from("boar-signer"), None, std::env::temp_dir());
        // Sin opt-in, la fuente de entorno está muerta aunque exista la var.
        std::env::set_var(TEST_KEY_ENV, "dGVzdC1rZXk=");
        let verdict = bridge.resolve_key();
        std::env::remove_var(TEST_KEY_ENV);

        assert!(matches!(verdict, Err(SignerError::NoKeySource)));
    }

    #[test]
    fn certify_minimal_environment_carries_no_agent_secrets() {
        std::env::set_var("ORACLE_API_TOKEN_FOR_TEST", "super-secret-token");
        let bridge =
            KeychainBridge::new(PathBuf::from("boar-signer"), None, std::env::temp_dir());
        let environment = bridge.minimal_environment("a2V5");
        std::env::remove_var("ORACLE_API_TOKEN_FOR_TEST");

        assert!(environment.contains_key("PATH"));
        assert!(environment.contains_key(SIGNER_KEY_ENV));
        assert!(!environment.contains_key("ORACLE_API_TOKEN_FOR_TEST"));
        assert_eq!(environment.len(), 4);
    }
}
