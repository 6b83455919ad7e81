// [libs/infra/state/src/store.rs]
/*!
 * =================================================================
 * APARATO: LOCKED STATE STORE (V3.0 - CRASH SAFE)
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: LECTURA-MODIFICACIÓN-ESCRITURA ATÓMICA DEL ESTADO
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. SIDECAR DISCIPLINE: candado en <path>.lock, respaldo en
 *    <path>.bak, escritura en <path>.tmp con rename atómico encima
 *    del original.
 * 2. SELF HEALING READ: lectura corrupta restaura desde el respaldo y
 *    reintenta; si el respaldo también falla, alto con alerta.
 * 3. REACTOR HYGIENE: el candado consultivo bloquea; toda adquisición
 *    corre en spawn_blocking para no congelar el reactor.
 * =================================================================
 */

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use tracing::{instrument, warn};

use boar_domain_models::State;

use crate::errors::StateError;

/// Almacén del estado singleton. Toda mutación pasa por el candado
/// exclusivo del sidecar; un escritor a la vez, los lectores esperan.
#[derive(Clone)]
pub struct StateStore {
    state_path: PathBuf,
}

struct LockGuard {
    lock_file: File,
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.lock_file);
    }
}

impl StateStore {
    pub fn new(state_path: PathBuf) -> Self {
        Self { state_path }
    }

    pub fn state_path(&self) -> &Path {
        &self.state_path
    }

    fn sidecar(&self, suffix: &str) -> PathBuf {
        let mut raw = self.state_path.as_os_str().to_owned();
        raw.push(suffix);
        PathBuf::from(raw)
    }

    fn acquire_lock(&self) -> Result<LockGuard, StateError> {
        let lock_path = self.sidecar(".lock");
        if let Some(parent) = lock_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StateError::Io(e.to_string()))?;
        }
        let lock_file = OpenOptions::new()
            .create(true)
            .write(true)
            .open(&lock_path)
            .map_err(|e| StateError::Lock(e.to_string()))?;
        lock_file.lock_exclusive().map_err(|e| StateError::Lock(e.to_string()))?;
        Ok(LockGuard { lock_file })
    }

    fn read_locked(&self) -> Result<State, StateError> {
        let _guard = self.acquire_lock()?;
        self.read_unlocked()
    }

    fn read_unlocked(&self) -> Result<State, StateError> {
        if !self.state_path.exists() {
            return Ok(State::default());
        }

        let raw = std::fs::read_to_string(&self.state_path)
            .map_err(|e| StateError::Io(e.to_string()))?;

        match serde_json::from_str::<State>(&raw) {
            Ok(state) => Ok(state),
            Err(parse_error) => {
                // Estado corrupto: intento de restauración desde el respaldo.
                let backup_path = self.sidecar(".bak");
                warn!(
                    "⚠️ [STATE_VAULT]: Corrupted state detected ({}), restoring from backup",
                    parse_error
                );
                if !backup_path.exists() {
                    return Err(StateError::Corrupted);
                }
                std::fs::copy(&backup_path, &self.state_path)
                    .map_err(|e| StateError::Io(e.to_string()))?;
                let restored = std::fs::read_to_string(&self.state_path)
                    .map_err(|e| StateError::Io(e.to_string()))?;
                serde_json::from_str::<State>(&restored).map_err(|_| StateError::Corrupted)
            }
        }
    }

    fn write_unlocked(&self, state: &State) -> Result<(), StateError> {
        if let Some(parent) = self.state_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StateError::Io(e.to_string()))?;
        }

        // Respaldo previo del contenido vigente.
        if self.state_path.exists() {
            std::fs::copy(&self.state_path, self.sidecar(".bak"))
                .map_err(|e| StateError::Io(e.to_string()))?;
        }

        // Escritura a temporal y rename atómico.
        let temp_path = self.sidecar(".tmp");
        let serialized = serde_json::to_string_pretty(state)
            .map_err(|e| StateError::Io(e.to_string()))?;
        std::fs::write(&temp_path, serialized).map_err(|e| StateError::Io(e.to_string()))?;
        std::fs::rename(&temp_path, &self.state_path).map_err(|e| StateError::Io(e.to_string()))?;
        Ok(())
    }

    fn write_locked(&self, state: &State) -> Result<(), StateError> {
        let _guard = self.acquire_lock()?;
        self.write_unlocked(state)
    }

    /// Carga el estado bajo candado exclusivo. Archivo ausente produce
    /// el estado default; corrupción restaura desde el respaldo.
    #[instrument(skip(self))]
    pub async fn load(&self) -> Result<State, StateError> {
        let store = self.clone();
        tokio::task::spawn_blocking(move || store.read_locked())
            .await
            .map_err(|e| StateError::Lock(e.to_string()))?
    }

    /// Persiste el estado bajo candado exclusivo (respaldo + tmp + rename).
    #[instrument(skip_all)]
    pub async fn save(&self, state: &State) -> Result<(), StateError> {
        let store = self.clone();
        let snapshot = state.clone();
        tokio::task::spawn_blocking(move || store.write_locked(&snapshot))
            .await
            .map_err(|e| StateError::Lock(e.to_string()))?
    }

    /// Lectura-modificación-escritura atómica: el candado cubre el ciclo
    /// completo, de modo que dos mutadores jamás se intercalan.
    #[instrument(skip_all)]
    pub async fn update<F>(&self, mutation: F) -> Result<State, StateError>
    where
        F: FnOnce(&mut State) + Send + 'static,
    {
        let store = self.clone();
        tokio::task::spawn_blocking(move || {
            let _guard = store.acquire_lock()?;
            let mut state = store.read_unlocked()?;
            mutation(&mut state);
            store.write_unlocked(&state)?;
            Ok(state)
        })
        .await
        .map_err(|e| StateError::Lock(e.to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use boar_domain_models::Position;
    use chrono::Utc;

    fn store_in(dir: &tempfile::TempDir) -> StateStore {
        StateStore::new(dir.path().join("state.json"))
    }

    #[tokio::test]
    async fn certify_missing_file_yields_default_state() {
        let workdir = tempfile::tempdir().expect("workdir");
        let state = store_in(&workdir).load().await.expect("load path");
        assert_eq!(state, State::default());
    }

    #[tokio::test]
    async fn certify_save_load_roundtrip_with_backup() {
        let workdir = tempfile::tempdir().expect("workdir");
        let store = store_in(&workdir);

        let mut state = State { current_balance_sol: 14.0, starting_balance_sol: 10.0, ..Default::default() };
        state.positions.push(Position::open("MintA", "AAA", 0.001, 0.5, Utc::now(), Some(25_000.0)));

        store.save(&state).await.expect("first save");
        // La segunda escritura crea el respaldo del contenido vigente.
        store.save(&state).await.expect("second save");

        assert!(workdir.path().join("state.json.bak").exists(), "backup sidecar must exist");
        assert!(!workdir.path().join("state.json.tmp").exists(), "tmp sidecar must be consumed");

        let recovered = store.load().await.expect("load path");
        assert_eq!(recovered, state);
    }

    #[tokio::test]
    async fn certify_corrupted_state_restores_from_backup() {
        let workdir = tempfile::tempdir().expect("workdir");
        let store = store_in(&workdir);

        let state = State { current_balance_sol: 7.5, ..Default::default() };
        store.save(&state).await.expect("seed save");
        store.save(&state).await.expect("backup-producing save");

        // Sabotaje del archivo primario.
        std::fs::write(workdir.path().join("state.json"), "{ not json").expect("sabotage");

        let recovered = store.load().await.expect("self-healing read");
        assert_eq!(recovered.current_balance_sol, 7.5);
    }

    #[tokio::test]
    async fn certify_corruption_without_backup_is_terminal() {
        let workdir = tempfile::tempdir().expect("workdir");
        let store = store_in(&workdir);

        std::fs::write(workdir.path().join("state.json"), "garbage").expect("sabotage");

        assert!(matches!(store.load().await, Err(StateError::Corrupted)));
    }

    #[tokio::test]
    async fn certify_update_is_read_modify_write() {
        let workdir = tempfile::tempdir().expect("workdir");
        let store = store_in(&workdir);

        store
            .update(|state| {
                state.daily_exposure_sol = 1.25;
                state.consecutive_losses = 2;
            })
            .await
            .expect("first update");

        let updated = store
            .update(|state| {
                state.daily_exposure_sol += 0.75;
            })
            .await
            .expect("second update");

        assert_eq!(updated.daily_exposure_sol, 2.0);
        assert_eq!(updated.consecutive_losses, 2, "unrelated fields must persist");
    }

    #[tokio::test]
    async fn certify_read_blocks_during_in_progress_write() {
        let workdir = tempfile::tempdir().expect("workdir");
        let store = store_in(&workdir);
        store.save(&State::default()).await.expect("seed");

        let writer_store = store.clone();
        let writer = tokio::spawn(async move {
            writer_store
                .update(|state| {
                    // Mutación deliberadamente lenta con el candado tomado.
                    std::thread::sleep(std::time::Duration::from_millis(250));
                    state.total_trades = 9;
                })
                .await
                .expect("slow update")
        });

        // El lector parte después de que el escritor tome el candado.
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        let read_start = std::time::Instant::now();
        let observed = store.load().await.expect("blocking read");
        let waited = read_start.elapsed();

        writer.await.expect("writer task");
        assert_eq!(observed.total_trades, 9, "reader must observe the completed write");
        assert!(
            waited >= std::time::Duration::from_millis(100),
            "reader must block until the writer releases the lock (waited {waited:?})"
        );
    }

    #[tokio::test]
    async fn certify_daily_reset_on_date_change() {
        let mut state = State {
            daily_date: "2019-01-01".into(),
            daily_exposure_sol: 3.0,
            daily_loss_pct: 4.0,
            daily_graduation_count: 2,
            ..Default::default()
        };

        assert!(state.apply_daily_reset(Utc::now()));
        assert_eq!(state.daily_exposure_sol, 0.0);
        assert_eq!(state.daily_loss_pct, 0.0);
        assert_eq!(state.daily_graduation_count, 0);

        // Mismo día: sin reinicio.
        assert!(!state.apply_daily_reset(Utc::now()));
    }
}
