// [libs/domain/notification/src/lib.rs]
/*!
 * =================================================================
 * APARATO: HERALD NOTIFICATION ENGINE (V3.0 - FIRE AND FORGET)
 * CLASIFICACIÓN: DOMAIN LOGIC (ESTRATO L2)
 * RESPONSABILIDAD: SEÑALES DE ALERTA HACIA EL OPERADOR
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. CONTRACT SOVEREIGNTY: Gramática inmutable de severidad con
 *    prefijo visual (🟢 info / 🟡 warn / 🔴 critical).
 * 2. NEVER BLOCK: La entrega es best-effort; un canal caído JAMÁS
 *    detiene el pipeline de decisión. Manipulación de cadena, doble
 *    fallo de fuentes y killswitch son siempre críticas.
 * =================================================================
 */

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

/// Clasificación semántica de la urgencia de la señal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum NotificationSeverity {
    /// Información general de ciclo o mantenimiento.
    Info,
    /// Degradación de rendimiento o datos parciales.
    Warning,
    /// Fallos críticos: manipulación de cadena, doble fuente caída,
    /// killswitch activado.
    Critical,
}

impl NotificationSeverity {
    /// Prefijo visual del mensaje saliente.
    pub fn emoji_prefix(&self) -> &'static str {
        match self {
            NotificationSeverity::Info => "🟢",
            NotificationSeverity::Warning => "🟡",
            NotificationSeverity::Critical => "🔴",
        }
    }
}

/// Unidad atómica de comunicación dirigida al operador.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperatorNotification {
    pub identifier: String,
    pub severity_level: NotificationSeverity,
    pub message_text: String,
    pub creation_timestamp_utc: DateTime<Utc>,
}

impl OperatorNotification {
    pub fn new(severity_level: NotificationSeverity, message_text: impl Into<String>) -> Self {
        Self {
            identifier: uuid::Uuid::new_v4().to_string(),
            severity_level,
            message_text: message_text.into(),
            creation_timestamp_utc: Utc::now(),
        }
    }

    /// Texto final con el prefijo de severidad.
    pub fn render(&self) -> String {
        format!("{} {}", self.severity_level.emoji_prefix(), self.message_text)
    }
}

/// Canal de notificación fire-and-forget.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Entrega best-effort: jamás retorna error, jamás bloquea la decisión.
    async fn notify(&self, notification: OperatorNotification);
}

/// Heraldo de consola: degradación cuando Telegram no está configurado.
pub struct TracingHerald;

#[async_trait]
impl Notifier for TracingHerald {
    async fn notify(&self, notification: OperatorNotification) {
        match notification.severity_level {
            NotificationSeverity::Info => info!("📣 [HERALD]: {}", notification.render()),
            NotificationSeverity::Warning => warn!("📣 [HERALD]: {}", notification.render()),
            NotificationSeverity::Critical => error!("📣 [HERALD]: {}", notification.render()),
        }
    }
}

/// Heraldo Telegram: texto opaco hacia el canal del operador.
pub struct TelegramHerald {
    network_session_client: reqwest::Client,
    bot_token: String,
    channel_identifier: String,
}

impl TelegramHerald {
    /// Construye desde el entorno. None cuando faltan credenciales:
    /// el llamador degrada al heraldo de consola.
    pub fn from_env() -> Option<Self> {
        let bot_token = std::env::var("TELEGRAM_BOT_TOKEN").ok().filter(|raw| !raw.is_empty())?;
        let channel_identifier =
            std::env::var("TELEGRAM_CHANNEL_ID").ok().filter(|raw| !raw.is_empty())?;
        Some(Self {
            network_session_client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(10))
                .build()
                .ok()?,
            bot_token,
            channel_identifier,
        })
    }
}

#[async_trait]
impl Notifier for TelegramHerald {
    async fn notify(&self, notification: OperatorNotification) {
        let endpoint = format!("https://api.telegram.org/bot{}/sendMessage", self.bot_token);
        let payload = serde_json::json!({
            "chat_id": self.channel_identifier,
            "text": notification.render(),
        });

        // Best-effort absoluto: el fallo de entrega solo deja rastro local.
        if let Err(e) = self.network_session_client.post(&endpoint).json(&payload).send().await {
            warn!("⚪ [HERALD]: Telegram delivery failed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn certify_severity_prefixes() {
        assert_eq!(NotificationSeverity::Info.emoji_prefix(), "🟢");
        assert_eq!(NotificationSeverity::Warning.emoji_prefix(), "🟡");
        assert_eq!(NotificationSeverity::Critical.emoji_prefix(), "🔴");

        let alert =
            OperatorNotification::new(NotificationSeverity::Critical, "CHAIN TAMPERED at seq 3");
        assert!(alert.render().starts_with("🔴 CHAIN TAMPERED"));
    }

    #[tokio::test]
    async fn certify_tracing_herald_never_fails() {
        let herald = TracingHerald;
        herald
            .notify(OperatorNotification::new(NotificationSeverity::Info, "cycle 7 complete"))
            .await;
    }

    #[test]
    fn certify_telegram_needs_full_credentials() {
        std::env::remove_var("TELEGRAM_BOT_TOKEN");
        std::env::remove_var("TELEGRAM_CHANNEL_ID");
        assert!(TelegramHerald::from_env().is_none());
    }
}
