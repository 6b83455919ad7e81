// [libs/infra/feeds/src/narrative_tracker.rs]
/*!
 * =================================================================
 * APARATO: NARRATIVE AGE TRACKER (V3.0)
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: PERSISTIR PRIMERAS DETECCIONES PARA CALCULAR EDAD
 *
 * El decaimiento narrativo del motor de convicción necesita saber hace
 * cuánto se detectó cada token por primera vez; la caché sobrevive
 * entre ciclos en disco.
 * =================================================================
 */

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct SeenRecord {
    first_seen: DateTime<Utc>,
    last_seen: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct NarrativeCache {
    tokens: BTreeMap<String, SeenRecord>,
}

/// Rastreador de edad narrativa respaldado en disco.
pub struct NarrativeTracker {
    cache_path: PathBuf,
    cache: NarrativeCache,
}

impl NarrativeTracker {
    pub fn open(cache_path: PathBuf) -> Self {
        let cache = std::fs::read_to_string(&cache_path)
            .ok()
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or_default();
        Self { cache_path, cache }
    }

    fn persist(&self) {
        if let Some(parent) = self.cache_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        match serde_json::to_string_pretty(&self.cache) {
            Ok(serialized) => {
                if let Err(e) = std::fs::write(&self.cache_path, serialized) {
                    warn!("⚪ [NARRATIVE_CACHE]: persist failed: {}", e);
                }
            }
            Err(e) => warn!("⚪ [NARRATIVE_CACHE]: serialize failed: {}", e),
        }
    }

    /// Registra la detección: fija first_seen una sola vez, refresca last_seen.
    pub fn record_detection(&mut self, token_mint: &str) {
        let now = Utc::now();
        self.cache
            .tokens
            .entry(token_mint.to_string())
            .and_modify(|record| record.last_seen = now)
            .or_insert(SeenRecord { first_seen: now, last_seen: now });
        self.persist();
    }

    /// Minutos desde la primera detección. 0 si jamás se vio.
    pub fn get_age_minutes(&self, token_mint: &str) -> i64 {
        self.cache
            .tokens
            .get(token_mint)
            .map(|record| (Utc::now() - record.first_seen).num_minutes())
            .unwrap_or(0)
    }

    /// Purga tokens sin actividad en `max_age_hours`.
    pub fn cleanup_old(&mut self, max_age_hours: i64) {
        let cutoff = Utc::now() - Duration::hours(max_age_hours);
        let stale: Vec<String> = self
            .cache
            .tokens
            .iter()
            .filter(|(_, record)| record.last_seen < cutoff)
            .map(|(mint, _)| mint.clone())
            .collect();

        if !stale.is_empty() {
            for mint in stale {
                self.cache.tokens.remove(&mint);
            }
            self.persist();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn certify_first_seen_is_sticky_and_survives_reload() {
        let workdir = tempfile::tempdir().expect("workdir");
        let cache_path = workdir.path().join("narrative_cache.json");

        let mut tracker = NarrativeTracker::open(cache_path.clone());
        tracker.record_detection("MintSticky");
        let first_age = tracker.get_age_minutes("MintSticky");

        // La segunda detección NO reinicia first_seen.
        tracker.record_detection("MintSticky");
        assert!(tracker.get_age_minutes("MintSticky") >= first_age);

        // La caché recargada conserva el registro.
        let reloaded = NarrativeTracker::open(cache_path);
        assert!(reloaded.cache.tokens.contains_key("MintSticky"));
        assert_eq!(reloaded.get_age_minutes("MintUnknown"), 0);
    }

    #[test]
    fn certify_cleanup_purges_stale_entries() {
        let workdir = tempfile::tempdir().expect("workdir");
        let mut tracker = NarrativeTracker::open(workdir.path().join("cache.json"));

        tracker.record_detection("MintFresh");
        // Entrada envejecida artificialmente.
        tracker.cache.tokens.insert(
            "MintStale".into(),
            SeenRecord {
                first_seen: Utc::now() - Duration::hours(48),
                last_seen: Utc::now() - Duration::hours(48),
            },
        );

        tracker.cleanup_old(24);
        assert!(tracker.cache.tokens.contains_key("MintFresh"));
        assert!(!tracker.cache.tokens.contains_key("MintStale"));
    }
}
