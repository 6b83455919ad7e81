// [apps/heartbeat/src/kernel.rs]
/*!
 * =================================================================
 * APARATO: HEARTBEAT SOVEREIGN KERNEL (V3.0 - COMPOSITION ROOT)
 * CLASIFICACIÓN: APPLICATION LAYER (ESTRATO L1)
 * RESPONSABILIDAD: CABLEADO DE INFRAESTRUCTURA E IGNICIÓN DEL CICLO
 *
 * Actúa como la placa base donde se conectan ledger, estado, feeds,
 * razonador, heraldo y el puente del firmante ciego. Sin estado mutable
 * a nivel de módulo: todo se instancia una vez y se pasa explícito.
 * =================================================================
 */

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::info;

use boar_domain_models::EngineConfig;
use boar_domain_notification::Notifier;
use boar_infra_chain::{BeadChain, NodeSigner};
use boar_infra_feeds::{NarrativeTracker, OracleFeed, ReasonerFeed, TokenDataFeed};
use boar_infra_signer::KeychainBridge;
use boar_infra_state::StateStore;

/// Núcleo del orquestador de latido: dependencias selladas en la ignición.
pub struct HeartbeatKernel {
    pub config: EngineConfig,
    pub chain: Arc<BeadChain>,
    pub state_store: StateStore,
    pub oracle_feed: Arc<dyn OracleFeed>,
    pub token_data_feed: Arc<dyn TokenDataFeed>,
    pub reasoner: Option<Arc<dyn ReasonerFeed>>,
    pub notifier: Arc<dyn Notifier>,
    pub narrative_tracker: Mutex<NarrativeTracker>,
    pub killswitch_path: PathBuf,
    /// Puente del firmante ciego para la sumisión de anclas (opcional:
    /// sin puente, los lotes quedan sellados localmente y se difieren).
    pub keychain: Option<KeychainBridge>,
}

/// Parámetros de ignición del kernel.
pub struct KernelIgnition {
    pub config: EngineConfig,
    pub ledger_database_url: String,
    pub node_signing_key_path: PathBuf,
    pub node_identifier: String,
    pub state_path: PathBuf,
    pub narrative_cache_path: PathBuf,
    pub killswitch_path: PathBuf,
}

impl HeartbeatKernel {
    /// Realiza la ignición del ledger y el estado neural. La conexión a
    /// la base se establece antes de levantar cualquier servicio.
    pub async fn ignite(
        ignition: KernelIgnition,
        oracle_feed: Arc<dyn OracleFeed>,
        token_data_feed: Arc<dyn TokenDataFeed>,
        reasoner: Option<Arc<dyn ReasonerFeed>>,
        notifier: Arc<dyn Notifier>,
        keychain: Option<KeychainBridge>,
    ) -> anyhow::Result<Self> {
        let node_signer =
            NodeSigner::ignite(&ignition.node_signing_key_path, ignition.node_identifier);
        let chain = BeadChain::open(&ignition.ledger_database_url, node_signer).await?;

        info!("💠 [KERNEL]: Heartbeat kernel ignition complete. Ledger and state anchored.");

        Ok(Self {
            config: ignition.config,
            chain: Arc::new(chain),
            state_store: StateStore::new(ignition.state_path),
            oracle_feed,
            token_data_feed,
            reasoner,
            notifier,
            narrative_tracker: Mutex::new(NarrativeTracker::open(ignition.narrative_cache_path)),
            killswitch_path: ignition.killswitch_path,
            keychain,
        })
    }
}
