// [libs/infra/chain/src/merkle.rs]
/*!
 * =================================================================
 * APARATO: MERKLE COMPUTATION ENGINE (V3.0 - PURE FUNCTIONS)
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: ÁRBOL BINARIO SHA-256 PARA ANCLAJE DE LOTES
 *
 * # Mathematical Proof (Byte-Level Pairing):
 * La combinación hashea los 32 bytes decodificados de cada par, no las
 * cadenas hex. Hoja impar se duplica (padding estándar). El resultado
 * es una función determinista del vector ordenado de hojas: dos
 * cómputos sobre la misma lista producen raíces idénticas.
 * =================================================================
 */

use sha2::{Digest, Sha256};

/// Raíz de un árbol vacío: centinela de 64 ceros hex.
pub const EMPTY_ROOT: &str =
    "0000000000000000000000000000000000000000000000000000000000000000";

fn sha256_pair(left_hex: &str, right_hex: &str) -> String {
    let mut combined = Vec::with_capacity(64);
    combined.extend_from_slice(&hex::decode(left_hex).unwrap_or_default());
    combined.extend_from_slice(&hex::decode(right_hex).unwrap_or_default());
    hex::encode(Sha256::digest(&combined))
}

/// Raíz Merkle de una lista de hashes hex SHA-256.
pub fn compute_merkle_root(hashes: &[String]) -> String {
    if hashes.is_empty() {
        return EMPTY_ROOT.to_string();
    }

    let mut layer: Vec<String> = hashes.to_vec();
    while layer.len() > 1 {
        let mut next_layer = Vec::with_capacity((layer.len() + 1) / 2);
        for pair in layer.chunks(2) {
            let left = &pair[0];
            let right = pair.get(1).unwrap_or(left);
            next_layer.push(sha256_pair(left, right));
        }
        layer = next_layer;
    }
    layer.remove(0)
}

/// Árbol completo por capas, de hojas (índice 0) a raíz (último índice).
/// Base para generación de pruebas de inclusión.
pub fn build_merkle_tree(hashes: &[String]) -> Vec<Vec<String>> {
    if hashes.is_empty() {
        return vec![vec![EMPTY_ROOT.to_string()]];
    }

    let mut layers: Vec<Vec<String>> = vec![hashes.to_vec()];
    while layers.last().map(Vec::len).unwrap_or(0) > 1 {
        let previous = layers.last().expect("non-empty by construction");
        let mut next_layer = Vec::with_capacity((previous.len() + 1) / 2);
        for pair in previous.chunks(2) {
            let left = &pair[0];
            let right = pair.get(1).unwrap_or(left);
            next_layer.push(sha256_pair(left, right));
        }
        layers.push(next_layer);
    }
    layers
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use sha2::{Digest, Sha256};

    fn leaf(data: &[u8]) -> String {
        hex::encode(Sha256::digest(data))
    }

    #[test]
    fn certify_empty_and_singleton_roots() {
        assert_eq!(compute_merkle_root(&[]), EMPTY_ROOT);

        let single = vec![leaf(b"lonely")];
        assert_eq!(compute_merkle_root(&single), single[0]);
    }

    #[test]
    fn certify_odd_leaf_duplication() {
        let leaves = vec![leaf(b"a"), leaf(b"b"), leaf(b"c")];
        // Con tres hojas la tercera se empareja consigo misma.
        let left = sha256_pair(&leaves[0], &leaves[1]);
        let right = sha256_pair(&leaves[2], &leaves[2]);
        let expected = sha256_pair(&left, &right);

        assert_eq!(compute_merkle_root(&leaves), expected);
    }

    #[test]
    fn certify_tree_layers_converge_to_root() {
        let leaves: Vec<String> = (0u8..6).map(|i| leaf(&[i])).collect();
        let layers = build_merkle_tree(&leaves);

        assert_eq!(layers.first().expect("leaf layer").len(), 6);
        assert_eq!(layers.last().expect("root layer").len(), 1);
        assert_eq!(layers.last().expect("root layer")[0], compute_merkle_root(&leaves));
    }

    proptest! {
        /// Ley: la raíz es determinista y sensible al orden de las hojas.
        #[test]
        fn law_root_is_deterministic(seed_bytes in proptest::collection::vec(any::<u8>(), 1..40)) {
            let leaves: Vec<String> = seed_bytes.iter().map(|b| leaf(&[*b])).collect();
            prop_assert_eq!(compute_merkle_root(&leaves), compute_merkle_root(&leaves));
        }

        #[test]
        fn law_distinct_leaf_sets_diverge(a in any::<u64>(), b in any::<u64>()) {
            prop_assume!(a != b);
            let root_a = compute_merkle_root(&[leaf(&a.to_be_bytes()), leaf(&a.to_be_bytes())]);
            let root_b = compute_merkle_root(&[leaf(&b.to_be_bytes()), leaf(&b.to_be_bytes())]);
            prop_assert_ne!(root_a, root_b);
        }
    }
}
