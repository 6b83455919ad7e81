// [libs/infra/feeds/src/rate_limiter.rs]
/*!
 * =================================================================
 * APARATO: PROVIDER RATE LIMITER (V3.0 - TOKEN BUCKET)
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: DISCIPLINA DE RÁFAGAS POR PROVEEDOR
 *
 * # Mathematical Proof (Token Bucket):
 * Con capacidad C y tasa de recarga r (req/s), la admisión es inmediata
 * mientras tokens >= 1; el caudal sostenido queda acotado por r y las
 * ráfagas por C. La espera ante déficit es (1 - tokens) / r segundos.
 * =================================================================
 */

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

struct TokenBucket {
    tokens: f64,
    capacity: f64,
    refill_per_second: f64,
    last_refill: Instant,
}

impl TokenBucket {
    fn refill(&mut self, now: Instant) {
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_per_second).min(self.capacity);
        self.last_refill = now;
    }
}

/// Limitador por proveedor. Compartido y seguro entre tareas; acotado
/// por el bucket de cada proveedor registrado.
pub struct RateLimiter {
    buckets: Mutex<HashMap<String, TokenBucket>>,
    default_capacity: f64,
    default_refill_per_second: f64,
}

impl RateLimiter {
    pub fn new(default_capacity: f64, default_refill_per_second: f64) -> Self {
        Self { buckets: Mutex::new(HashMap::new()), default_capacity, default_refill_per_second }
    }

    /// Registra límites específicos de un proveedor.
    pub async fn configure(&self, provider: &str, capacity: f64, refill_per_second: f64) {
        let mut buckets = self.buckets.lock().await;
        buckets.insert(
            provider.to_string(),
            TokenBucket {
                tokens: capacity,
                capacity,
                refill_per_second,
                last_refill: Instant::now(),
            },
        );
    }

    /// Admite una llamada al proveedor: inmediata con tokens disponibles,
    /// o durmiendo el déficit exacto.
    pub async fn acquire(&self, provider: &str) {
        loop {
            let wait = {
                let mut buckets = self.buckets.lock().await;
                let bucket = buckets.entry(provider.to_string()).or_insert_with(|| TokenBucket {
                    tokens: self.default_capacity,
                    capacity: self.default_capacity,
                    refill_per_second: self.default_refill_per_second,
                    last_refill: Instant::now(),
                });

                bucket.refill(Instant::now());
                if bucket.tokens >= 1.0 {
                    bucket.tokens -= 1.0;
                    None
                } else {
                    Some(Duration::from_secs_f64(
                        (1.0 - bucket.tokens) / bucket.refill_per_second,
                    ))
                }
            };

            match wait {
                None => return,
                Some(deficit) => {
                    debug!("⏳ [RATE_LIMIT]: {} throttled {:?}", provider, deficit);
                    tokio::time::sleep(deficit).await;
                }
            }
        }
    }

    /// Tokens visibles del bucket (diagnóstico).
    pub async fn available_tokens(&self, provider: &str) -> f64 {
        let mut buckets = self.buckets.lock().await;
        match buckets.get_mut(provider) {
            Some(bucket) => {
                bucket.refill(Instant::now());
                bucket.tokens
            }
            None => self.default_capacity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn certify_immediate_admission_within_capacity() {
        let limiter = RateLimiter::new(3.0, 1.0);

        // Tres admisiones inmediatas consumen la capacidad completa.
        for _ in 0..3 {
            limiter.acquire("oracle").await;
        }
        assert!(limiter.available_tokens("oracle").await < 1.0);
    }

    #[tokio::test(start_paused = true)]
    async fn certify_deficit_sleeps_and_refills() {
        let limiter = RateLimiter::new(1.0, 2.0);

        limiter.acquire("narrative").await;
        let throttled_start = tokio::time::Instant::now();
        // Sin tokens: la segunda admisión duerme ~0.5s (1 token / 2 rps).
        limiter.acquire("narrative").await;
        let waited = throttled_start.elapsed();

        assert!(waited >= Duration::from_millis(400), "expected throttle, waited {waited:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn certify_providers_are_isolated() {
        let limiter = RateLimiter::new(1.0, 0.1);
        limiter.configure("fast-provider", 100.0, 50.0).await;

        limiter.acquire("slow-provider").await;
        // El proveedor rápido no hereda el déficit del lento.
        let start = tokio::time::Instant::now();
        limiter.acquire("fast-provider").await;
        assert!(start.elapsed() < Duration::from_millis(10));
    }
}
