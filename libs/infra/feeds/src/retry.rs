// [libs/infra/feeds/src/retry.rs]
/*!
 * =================================================================
 * APARATO: BOUNDED RETRY ENGINE (V3.0)
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: BACKOFF EXPONENCIAL ACOTADO PARA FEEDS
 *
 * Política: base 1s, techo 10s, máximo 3 intentos. Solo fallos
 * transitorios reintentan; el reintento JAMÁS cruza la frontera del
 * ciclo (los alcances se construyen dentro de cada paso).
 * =================================================================
 */

use std::future::Future;
use std::time::Duration;

use tracing::debug;

use crate::errors::FeedError;

const MAX_ATTEMPTS: u32 = 3;
const BASE_DELAY: Duration = Duration::from_secs(1);
const MAX_DELAY: Duration = Duration::from_secs(10);

/// Ejecuta la operación con backoff exponencial acotado.
///
/// # Errors:
/// El último error del proveedor cuando los intentos se agotan, o el
/// primer error no transitorio.
pub async fn with_retry<T, F, Fut>(source: &str, mut operation: F) -> Result<T, FeedError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, FeedError>>,
{
    let mut delay = BASE_DELAY;

    for attempt in 1..=MAX_ATTEMPTS {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(error) if error.is_transient() && attempt < MAX_ATTEMPTS => {
                // Un proveedor rate-limited dicta su propio mínimo de espera.
                let wait = match &error {
                    FeedError::ProviderRateLimited { retry_after_seconds, .. } => {
                        delay.max(Duration::from_secs(*retry_after_seconds)).min(MAX_DELAY)
                    }
                    _ => delay.min(MAX_DELAY),
                };
                debug!(
                    "🔁 [RETRY]: {} attempt {}/{} failed ({}), backing off {:?}",
                    source, attempt, MAX_ATTEMPTS, error, wait
                );
                tokio::time::sleep(wait).await;
                delay = (delay * 2).min(MAX_DELAY);
            }
            Err(error) => return Err(error),
        }
    }

    Err(FeedError::ProviderUnavailable { provider: source.to_string() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test(start_paused = true)]
    async fn certify_transient_failures_retry_then_succeed() {
        let attempts = AtomicU32::new(0);

        let verdict = with_retry("oracle", || {
            let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if attempt < 3 {
                    Err(FeedError::ProviderUnavailable { provider: "oracle".into() })
                } else {
                    Ok(attempt)
                }
            }
        })
        .await;

        assert_eq!(verdict.expect("third attempt succeeds"), 3);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn certify_attempts_are_bounded() {
        let attempts = AtomicU32::new(0);

        let verdict: Result<(), _> = with_retry("oracle", || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(FeedError::ProviderUnavailable { provider: "oracle".into() }) }
        })
        .await;

        assert!(verdict.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 3, "retries must never exceed the cap");
    }

    #[tokio::test(start_paused = true)]
    async fn certify_non_transient_errors_fail_fast() {
        let attempts = AtomicU32::new(0);

        let verdict: Result<(), _> = with_retry("oracle", || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async {
                Err(FeedError::MalformedResponse {
                    provider: "oracle".into(),
                    reason: "schema drift".into(),
                })
            }
        })
        .await;

        assert!(matches!(verdict, Err(FeedError::MalformedResponse { .. })));
        assert_eq!(attempts.load(Ordering::SeqCst), 1, "programmer errors must not retry");
    }
}
