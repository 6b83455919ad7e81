// [libs/infra/chain/src/client.rs]
/*!
 * =================================================================
 * APARATO: LEDGER CONNECTION CLIENT (V3.0 - MEMORY ANCHORED)
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: GESTIÓN DE ENLACES AL MOTOR libSQL Y BOOTSTRAP
 *
 * # Mathematical Proof (In-Memory Consistency):
 * Para garantizar que el esquema sea visible entre conexiones en modo
 * RAM, el cliente detecta URLs de memoria y aplica el ancla de
 * persistencia ANTES de la ejecución del bootstrap, asegurando que las
 * tablas residan en un segmento de memoria compartido.
 * =================================================================
 */

use std::sync::Arc;

use libsql::{Builder, Connection, Database};
use tracing::{error, info, instrument};

use crate::errors::ChainError;
use crate::schema::apply_ledger_schema;

#[derive(Clone)]
pub struct ChainDbClient {
    ledger_database_driver: Arc<Database>,
    /// Mantiene la base de datos viva en memoria evitando que SQLite la purgue.
    _memory_persistence_anchor: Option<Arc<Connection>>,
}

impl ChainDbClient {
    /// Abre (o crea) el ledger local y sincroniza el esquema.
    #[instrument(skip_all, fields(url = %ledger_database_url))]
    pub async fn connect(ledger_database_url: &str) -> Result<Self, ChainError> {
        if ledger_database_url.is_empty() {
            return Err(ChainError::Connection("CRITICAL_FAULT: LEDGER_URL_UNDEFINED".into()));
        }

        info!("🔌 [LEDGER]: Initiating tactical link synchronization to [{}]", ledger_database_url);

        let is_memory = ledger_database_url.contains(":memory:")
            || ledger_database_url.contains("mode=memory");

        let database_driver = Builder::new_local(ledger_database_url)
            .build()
            .await
            .map_err(|e| ChainError::Connection(format!("DRIVER_IGNITION_FAILURE: {e}")))?;

        let shared_driver = Arc::new(database_driver);
        let mut anchor = None;

        if is_memory {
            // En modo memoria, el ancla se abre ANTES que cualquier otra operación.
            let anchor_conn = shared_driver
                .connect()
                .map_err(|e| ChainError::Connection(format!("ANCHOR_FAULT: {e}")))?;

            apply_ledger_schema(&anchor_conn).await?;
            anchor = Some(Arc::new(anchor_conn));
            info!("⚓ [LEDGER]: Memory strata solidified and anchored.");
        } else {
            let bootstrap_conn = shared_driver
                .connect()
                .map_err(|e| ChainError::Connection(format!("BOOTSTRAP_LINK_FAULT: {e}")))?;
            apply_ledger_schema(&bootstrap_conn).await?;
        }

        Ok(Self { ledger_database_driver: shared_driver, _memory_persistence_anchor: anchor })
    }

    pub fn get_connection(&self) -> Result<Connection, ChainError> {
        self.ledger_database_driver.connect().map_err(|e| {
            error!("⚠️ [POOL_FAULT]: Ledger connection allocation failed: {}", e);
            ChainError::Connection(e.to_string())
        })
    }
}
