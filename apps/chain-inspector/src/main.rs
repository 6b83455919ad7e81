// [apps/chain-inspector/src/main.rs]
/*!
 * =================================================================
 * APARATO: CHAIN INSPECTOR SHELL (V3.0)
 * CLASIFICACIÓN: APPLICATION LAYER (ENTRY POINT)
 * RESPONSABILIDAD: ESTATUS, VERIFICACIÓN Y VISTA RECIENTE DEL LEDGER
 *
 * Códigos de salida: 0 = cadena íntegra, 1 = integridad rota o error,
 * 2 = íntegra con fallos de firma (advertencia).
 * =================================================================
 */

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use serde_json::json;

use boar_infra_chain::{BeadChain, NodeSigner};

#[derive(Parser, Debug)]
#[command(
    name = "boar-chain-inspector",
    version = "3.0.0",
    about = "Boar Engine Flight Recorder Inspector // status, verify, recent"
)]
struct InspectorDirectives {
    /// Ruta de la base del ledger de beads.
    #[arg(long, env = "BOAR_LEDGER_DB", default_value = "state/beads.db")]
    ledger_database: String,

    /// Ruta de la llave de atestación del nodo.
    #[arg(long, env = "BOAR_NODE_KEY_PATH", default_value = "state/node_signing.key")]
    node_key_path: PathBuf,

    /// Identificador del nodo.
    #[arg(long, env = "BOAR_NODE_ID", default_value = "boar-node-01")]
    node_identifier: String,

    /// Verificación completa: hashes, enlaces y firmas ECDSA.
    #[arg(long)]
    verify: bool,

    /// Muestra los N beads más recientes.
    #[arg(long, value_name = "N")]
    recent: Option<u32>,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let _ = dotenvy::dotenv();
    boar_shared_heimdall::init_tracing("boar_chain_inspector");

    let directives = InspectorDirectives::parse();
    let chain = BeadChain::open(
        &directives.ledger_database,
        NodeSigner::ignite(&directives.node_key_path, directives.node_identifier.clone()),
    )
    .await?;

    // Estatus agregado: siempre presente en la salida.
    let stats = chain.chain_stats().await?;
    let shadow = chain.shadow_field_stats().await?;
    let latency = chain.refinery_latency(None, None).await?;
    let latest_batch = chain.latest_batch().await?;

    let mut output = json!({
        "stats": stats,
        "shadow_field": shadow,
        "refinery_latency": latency,
        "latest_merkle_batch": latest_batch,
    });

    let mut exit_code = ExitCode::SUCCESS;

    if directives.verify {
        let verdict = chain.verify_chain().await?;
        if !verdict.valid {
            exit_code = ExitCode::from(1);
        } else if verdict.signature_failures > 0 {
            exit_code = ExitCode::from(2);
        }
        output["verification"] = serde_json::to_value(&verdict)?;
    }

    if let Some(recent_count) = directives.recent {
        let recent_beads = chain.recent(recent_count).await?;
        output["recent"] = json!(recent_beads
            .iter()
            .map(|bead| json!({
                "bead_id": bead.bead_id,
                "bead_type": bead.bead_type.as_str(),
                "temporal_class": bead.temporal_class.as_str(),
                "knowledge_time": bead.knowledge_time_recorded_at.to_rfc3339(),
                "token_mint": bead.token_mint(),
                "status": bead.status.as_str(),
                "tags": bead.tags,
            }))
            .collect::<Vec<_>>());
    }

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(exit_code)
}
