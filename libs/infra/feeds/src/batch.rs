// [libs/infra/feeds/src/batch.rs]
/*!
 * =================================================================
 * APARATO: BOUNDED FAN-OUT ENGINE (V3.0)
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: LOTEO ASÍNCRONO CON CONCURRENCIA ACOTADA
 *
 * # Mathematical Proof (Concurrency Bound):
 * Con N operaciones y cota C, jamás hay más de C en vuelo; el lote
 * completa en al menos ceil(N/C) x latencia_máxima. La cota emerge del
 * buffer del stream, no de contadores manuales.
 * =================================================================
 */

use std::future::Future;

use futures::stream::{self, StreamExt};

/// Ejecuta `operation` sobre cada ítem con a lo sumo `max_concurrent`
/// operaciones en vuelo. Errores degradan a None; el orden de los
/// resultados espeja el orden de los ítems.
pub async fn batch_gather<T, R, E, F, Fut>(
    items: Vec<T>,
    max_concurrent: usize,
    operation: F,
) -> Vec<Option<R>>
where
    F: Fn(T) -> Fut,
    Fut: Future<Output = Result<R, E>>,
{
    stream::iter(items.into_iter().map(|item| operation(item)))
        .buffered(max_concurrent.max(1))
        .map(|outcome| outcome.ok())
        .collect()
        .await
}
