// [apps/chain-porter/src/main.rs]
/*!
 * =================================================================
 * APARATO: CHAIN PORTER SHELL (V3.0)
 * CLASIFICACIÓN: APPLICATION LAYER (ENTRY POINT)
 * RESPONSABILIDAD: EXPORT / IMPORT JSONL DEL LEDGER DE BEADS
 *
 * Export: una línea por bead, UTF-8, LF, claves ordenadas. Import:
 * preserva hashes y linaje bit a bit; beads ya presentes se omiten.
 * Códigos de salida: 0 OK, 1 error.
 * =================================================================
 */

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use serde_json::json;

use boar_infra_chain::{BeadChain, NodeSigner};

#[derive(Parser, Debug)]
#[command(
    name = "boar-chain-porter",
    version = "3.0.0",
    about = "Boar Engine Flight Recorder Porter // JSONL export and import"
)]
struct PorterDirectives {
    /// Ruta de la base del ledger de beads.
    #[arg(long, env = "BOAR_LEDGER_DB", default_value = "state/beads.db")]
    ledger_database: String,

    /// Ruta de la llave de atestación del nodo.
    #[arg(long, env = "BOAR_NODE_KEY_PATH", default_value = "state/node_signing.key")]
    node_key_path: PathBuf,

    /// Identificador del nodo.
    #[arg(long, env = "BOAR_NODE_ID", default_value = "boar-node-01")]
    node_identifier: String,

    #[command(subcommand)]
    operation: PorterOperation,
}

#[derive(Subcommand, Debug)]
enum PorterOperation {
    /// Exporta la cadena completa a JSONL.
    Export {
        /// Archivo de salida.
        #[arg(long)]
        output: PathBuf,
    },
    /// Importa beads desde JSONL (idempotente por bead_id).
    Import {
        /// Archivo de entrada.
        #[arg(long)]
        input: PathBuf,
        /// Verifica la cadena tras el import.
        #[arg(long)]
        verify: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    boar_shared_heimdall::init_tracing("boar_chain_porter");

    let directives = PorterDirectives::parse();
    let chain = BeadChain::open(
        &directives.ledger_database,
        NodeSigner::ignite(&directives.node_key_path, directives.node_identifier.clone()),
    )
    .await?;

    match directives.operation {
        PorterOperation::Export { output } => {
            let exported = chain.export_jsonl(&output).await?;
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({
                    "operation": "export",
                    "path": output.display().to_string(),
                    "beads": exported,
                }))?
            );
        }
        PorterOperation::Import { input, verify } => {
            let imported = chain.import_jsonl(&input).await?;
            let mut output = json!({
                "operation": "import",
                "path": input.display().to_string(),
                "beads_imported": imported,
            });
            if verify {
                let verdict = chain.verify_chain().await?;
                output["verification"] = serde_json::to_value(&verdict)?;
                if !verdict.valid {
                    println!("{}", serde_json::to_string_pretty(&output)?);
                    anyhow::bail!("CHAIN_TAMPERED: {}", verdict.message);
                }
            }
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}
