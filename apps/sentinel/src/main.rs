// [apps/sentinel/src/main.rs]
/*!
 * =================================================================
 * APARATO: SENTINEL GUARD SHELL (V3.0)
 * CLASIFICACIÓN: APPLICATION LAYER (ENTRY POINT)
 * RESPONSABILIDAD: EVALUACIÓN DE GUARDS DESDE LA LÍNEA DE COMANDOS
 *
 * Códigos de salida: 0 = claro (seguro operar), 1 = bloqueado,
 * 2 = advertencia (operar con tamaño reducido). El bloqueo domina a la
 * advertencia cuando ambos disparan.
 * =================================================================
 */

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use boar_domain_guards::{
    check_drawdown, check_killswitch, check_risk, KillswitchStatus, RiskStatus,
};
use boar_domain_models::EngineConfig;
use boar_infra_state::StateStore;

#[derive(Parser, Debug)]
#[command(
    name = "boar-sentinel",
    version = "3.0.0",
    about = "Boar Engine Precondition Guards // exit 0 clear, 1 block, 2 warn"
)]
struct SentinelDirectives {
    /// Ruta del árbol de configuración YAML.
    #[arg(long, env = "BOAR_CONFIG_PATH")]
    config: Option<PathBuf>,

    /// Ruta del archivo de estado del pote.
    #[arg(long, env = "BOAR_STATE_PATH", default_value = "state/state.json")]
    state_path: PathBuf,

    /// Ruta del archivo killswitch.
    #[arg(long, env = "BOAR_KILLSWITCH_PATH", default_value = "killswitch.txt")]
    killswitch_path: PathBuf,

    #[command(subcommand)]
    guard: GuardCommand,
}

#[derive(Subcommand, Debug)]
enum GuardCommand {
    /// Sondea el archivo killswitch.
    Killswitch,
    /// Evalúa el alto por drawdown del pote.
    Drawdown,
    /// Evalúa límites diarios y cortocircuitos.
    Risk,
    /// Evalúa los tres guards en secuencia (el bloqueo domina).
    All,
}

/// Acumulador de veredictos: el bloqueo domina a la advertencia.
#[derive(Default)]
struct GuardTally {
    blocked: bool,
    warned: bool,
}

impl GuardTally {
    fn exit_code(&self) -> ExitCode {
        if self.blocked {
            ExitCode::from(1)
        } else if self.warned {
            ExitCode::from(2)
        } else {
            ExitCode::SUCCESS
        }
    }
}

fn evaluate_killswitch(killswitch_path: &std::path::Path, tally: &mut GuardTally) {
    let status = check_killswitch(killswitch_path);
    println!("{}", serde_json::to_string_pretty(&status).unwrap_or_default());
    if matches!(status, KillswitchStatus::Active { .. }) {
        tally.blocked = true;
    }
}

async fn evaluate_drawdown(
    store: &StateStore,
    config: &EngineConfig,
    tally: &mut GuardTally,
) -> Result<()> {
    let status = check_drawdown(store, &config.risk.portfolio).await?;
    println!("{}", serde_json::to_string_pretty(&status)?);
    if status.is_halted() {
        tally.blocked = true;
    }
    Ok(())
}

async fn evaluate_risk(
    store: &StateStore,
    config: &EngineConfig,
    tally: &mut GuardTally,
) -> Result<()> {
    let report = check_risk(store, &config.risk).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    match report.status {
        RiskStatus::Blocked => tally.blocked = true,
        RiskStatus::Warning => tally.warned = true,
        RiskStatus::Clear => {}
    }
    Ok(())
}

async fn run(directives: SentinelDirectives) -> Result<ExitCode> {
    let config = match &directives.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("CONFIG_FAULT: {}", path.display()))?,
        None => EngineConfig::default(),
    };
    let store = StateStore::new(directives.state_path.clone());
    let mut tally = GuardTally::default();

    match directives.guard {
        GuardCommand::Killswitch => evaluate_killswitch(&directives.killswitch_path, &mut tally),
        GuardCommand::Drawdown => evaluate_drawdown(&store, &config, &mut tally).await?,
        GuardCommand::Risk => evaluate_risk(&store, &config, &mut tally).await?,
        GuardCommand::All => {
            evaluate_killswitch(&directives.killswitch_path, &mut tally);
            evaluate_drawdown(&store, &config, &mut tally).await?;
            evaluate_risk(&store, &config, &mut tally).await?;
        }
    }

    Ok(tally.exit_code())
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let _ = dotenvy::dotenv();
    boar_shared_heimdall::init_tracing("boar_sentinel");

    run(SentinelDirectives::parse()).await
}
