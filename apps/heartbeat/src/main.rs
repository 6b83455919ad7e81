// [apps/heartbeat/src/main.rs]
/*!
 * =================================================================
 * APARATO: HEARTBEAT SHELL (V3.0 - ZENITH SHELL)
 * CLASIFICACIÓN: APPLICATION LAYER (ENTRY POINT)
 * RESPONSABILIDAD: BOOTSTRAP DE ENTORNO E IGNICIÓN DEL CICLO
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. ARCHITECTURAL PURITY: La lógica del ciclo vive en la librería; el
 *    shell es un switchboard puro de configuración y señales.
 * 2. ZERO ABBREVIATIONS: Nomenclatura nominal absoluta en directivas.
 * 3. EXIT DISCIPLINE: 0 OK, 1 error.
 * =================================================================
 */

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use boar_domain_models::EngineConfig;
use boar_domain_notification::{Notifier, TelegramHerald, TracingHerald};
use boar_heartbeat::{diagnose_gateway, run_heartbeat, HeartbeatKernel, KernelIgnition};
use boar_infra_feeds::{MarketDataClient, OracleHttpClient, RateLimiter};
use boar_infra_signer::KeychainBridge;

/// Directivas de mando del orquestador de latido.
#[derive(Parser, Debug)]
#[command(
    name = "boar-heartbeat",
    version = "3.0.0",
    about = "Boar Engine Heartbeat Orchestrator // Flight Recorder V3"
)]
struct HeartbeatDirectives {
    /// Ciclo end-to-end sin sumisión real de swaps (default).
    #[arg(long, conflicts_with = "live")]
    dry_run: bool,

    /// Habilita la sumisión real de swaps.
    #[arg(long)]
    live: bool,

    /// Ruta del árbol de configuración YAML.
    #[arg(long, env = "BOAR_CONFIG_PATH")]
    config: Option<PathBuf>,

    /// Presupuesto total del ciclo en segundos (override).
    #[arg(long)]
    budget_seconds: Option<f64>,

    /// Ruta de la base del ledger de beads.
    #[arg(long, env = "BOAR_LEDGER_DB", default_value = "state/beads.db")]
    ledger_database: String,

    /// Ruta del archivo de estado del pote.
    #[arg(long, env = "BOAR_STATE_PATH", default_value = "state/state.json")]
    state_path: PathBuf,

    /// Ruta del archivo killswitch.
    #[arg(long, env = "BOAR_KILLSWITCH_PATH", default_value = "killswitch.txt")]
    killswitch_path: PathBuf,

    /// Ruta de la llave de atestación del nodo (secp256r1).
    #[arg(long, env = "BOAR_NODE_KEY_PATH", default_value = "state/node_signing.key")]
    node_key_path: PathBuf,

    /// Identificador del nodo en los sobres de atestación.
    #[arg(long, env = "BOAR_NODE_ID", default_value = "boar-node-01")]
    node_identifier: String,

    /// Solo diagnóstico de gateway (skill de auto-reparación).
    #[arg(long)]
    diagnose: bool,

    /// Con --diagnose: solo estatus, sin análisis del razonador.
    #[arg(long, requires = "diagnose")]
    status_only: bool,
}

fn build_feeds(
    rate_limiter: Arc<RateLimiter>,
) -> (Arc<OracleHttpClient>, Arc<MarketDataClient>) {
    let oracle_feed = Arc::new(OracleHttpClient::new(
        std::env::var("BOAR_ORACLE_URL")
            .unwrap_or_else(|_| "http://localhost:8900".to_string()),
        std::env::var("BOAR_ORACLE_API_KEY").unwrap_or_default(),
        Arc::clone(&rate_limiter),
    ));
    let token_data_feed = Arc::new(MarketDataClient::new(
        std::env::var("BOAR_MARKET_DATA_URL")
            .unwrap_or_else(|_| "https://public-api.market-data.invalid".to_string()),
        std::env::var("BOAR_MARKET_DATA_API_KEY").unwrap_or_default(),
        "token-telemetry".to_string(),
        rate_limiter,
    ));
    (oracle_feed, token_data_feed)
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    boar_shared_heimdall::init_tracing("boar_heartbeat");

    let directives = HeartbeatDirectives::parse();

    // Modo diagnóstico: skill de auto-reparación, sin ciclo de trading.
    if directives.diagnose {
        let diagnosis =
            diagnose_gateway(&directives.killswitch_path, directives.status_only, None).await;
        println!("{}", serde_json::to_string_pretty(&diagnosis)?);
        return Ok(());
    }

    // 1. CONFIGURACIÓN SOBERANA (construida una sola vez).
    let mut config = match &directives.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("CONFIG_FAULT: {}", path.display()))?,
        None => EngineConfig::default(),
    };
    if let Some(budget_seconds) = directives.budget_seconds {
        config.heartbeat.budget_seconds = budget_seconds;
    }

    // 2. FEEDS Y LIMITACIÓN DE FLUJO.
    let rate_limiter = Arc::new(RateLimiter::new(5.0, 1.0));
    rate_limiter.configure("oracle", 3.0, 0.5).await;
    rate_limiter.configure("token-telemetry", 10.0, 2.0).await;
    let (oracle_feed, token_data_feed) = build_feeds(rate_limiter);

    // 3. HERALDO: Telegram si hay credenciales, consola en su defecto.
    let notifier: Arc<dyn Notifier> = match TelegramHerald::from_env() {
        Some(telegram_herald) => Arc::new(telegram_herald),
        None => Arc::new(TracingHerald),
    };

    // 4. PUENTE DEL FIRMANTE CIEGO (opcional: solo para anclaje externo).
    let keychain = std::env::var("SIGNER_KEY_PATH").ok().map(|key_path| {
        let signer_binary = std::env::var("BOAR_SIGNER_BIN")
            .unwrap_or_else(|_| "boar-signer".to_string());
        KeychainBridge::new(
            PathBuf::from(signer_binary),
            Some(PathBuf::from(key_path)),
            std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        )
    });

    // 5. IGNICIÓN DEL KERNEL.
    let kernel = HeartbeatKernel::ignite(
        KernelIgnition {
            config,
            ledger_database_url: directives.ledger_database.clone(),
            node_signing_key_path: directives.node_key_path.clone(),
            node_identifier: directives.node_identifier.clone(),
            state_path: directives.state_path.clone(),
            narrative_cache_path: directives
                .state_path
                .with_file_name("narrative_cache.json"),
            killswitch_path: directives.killswitch_path.clone(),
        },
        oracle_feed,
        token_data_feed,
        None,
        notifier,
        keychain,
    )
    .await?;

    // 6. MODO DE EJECUCIÓN: el estado manda, las directivas lo sellan.
    let live_mode = directives.live && !directives.dry_run;
    info!(
        "🎛️ [SHELL]: Execution mode sealed: {}",
        if live_mode { "LIVE" } else { "DRY-RUN" }
    );
    kernel
        .state_store
        .update(move |state| {
            state.dry_run_mode = !live_mode;
        })
        .await?;

    // 7. UN CICLO COMPLETO DE LATIDO.
    let report = run_heartbeat(&kernel).await;
    info!(
        "🏁 [SHELL]: Cycle {} sealed. observe_only={} errors={}",
        report.cycle,
        report.observe_only,
        report.errors.len()
    );
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
