// [libs/infra/chain/src/signing.rs]
/*!
 * =================================================================
 * APARATO: NODE ATTESTATION SIGNER (V3.0 - secp256r1)
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: PRUEBA CRIPTOGRÁFICA "ESTE NODO PRODUJO ESTE BEAD"
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. CURVE DISCIPLINE: La llave de atestación (secp256r1) es distinta
 *    de la llave de firma de transacciones (ed25519, proceso aislado).
 *    Si un atacante tiene acceso al proceso ya puede escribir beads
 *    arbitrarios: el aislamiento root no añade seguridad aquí.
 * 2. GRACEFUL DEGRADATION: Sin llave disponible, las firmas degradan al
 *    centinela 'signing_unavailable' sin bloquear el pipeline.
 *
 * # Mathematical Proof (Prehash Signing):
 * hash_self ya es un digest SHA-256 de 32 bytes; la firma opera en modo
 * prehash (RFC 6979 determinista) evitando un doble hash que rompería
 * la verificación cruzada con otros nodos.
 * =================================================================
 */

use std::path::{Path, PathBuf};

use p256::ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use p256::ecdsa::{Signature, SigningKey, VerifyingKey};
use p256::pkcs8::{DecodePrivateKey, EncodePrivateKey, LineEnding};
use tracing::{info, warn};

use crate::errors::ChainError;

/// Firmante de atestación del nodo. Carga (o genera) la llave secp256r1
/// en la ignición; la ausencia de llave degrada a modo sin firma.
pub struct NodeSigner {
    node_identifier: String,
    code_hash: String,
    signing_key: Option<SigningKey>,
    verifying_key: Option<VerifyingKey>,
}

impl NodeSigner {
    /// Carga la llave desde `private_key_path` o genera una nueva.
    ///
    /// La llave privada se sella con permisos 0400; la pública se publica
    /// en hex junto a ella (`<path>.pub`, legible por todos).
    pub fn ignite(private_key_path: &Path, node_identifier: impl Into<String>) -> Self {
        let node_identifier = node_identifier.into();
        let code_hash = std::env::var("BOAR_CODE_HASH")
            .unwrap_or_else(|_| env!("CARGO_PKG_VERSION").to_string());

        match Self::load_or_create(private_key_path) {
            Ok(signing_key) => {
                let verifying_key = *signing_key.verifying_key();
                info!("🔏 [ATTESTATION]: Node signing key levelized for [{}]", node_identifier);
                Self {
                    node_identifier,
                    code_hash,
                    signing_key: Some(signing_key),
                    verifying_key: Some(verifying_key),
                }
            }
            Err(e) => {
                warn!("⚠️ [ATTESTATION]: Signing unavailable, degrading to sentinel: {}", e);
                Self { node_identifier, code_hash, signing_key: None, verifying_key: None }
            }
        }
    }

    /// Firmante efímero en memoria (proving grounds).
    pub fn ephemeral(node_identifier: impl Into<String>) -> Self {
        let signing_key = SigningKey::random(&mut rand::rngs::OsRng);
        let verifying_key = *signing_key.verifying_key();
        Self {
            node_identifier: node_identifier.into(),
            code_hash: env!("CARGO_PKG_VERSION").to_string(),
            signing_key: Some(signing_key),
            verifying_key: Some(verifying_key),
        }
    }

    fn load_or_create(path: &Path) -> Result<SigningKey, ChainError> {
        if path.exists() {
            let pem = std::fs::read_to_string(path)
                .map_err(|e| ChainError::Connection(format!("KEY_READ_FAULT: {e}")))?;
            return SigningKey::from_pkcs8_pem(&pem)
                .map_err(|e| ChainError::Connection(format!("KEY_DECODE_FAULT: {e}")));
        }

        let signing_key = SigningKey::random(&mut rand::rngs::OsRng);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ChainError::Connection(format!("KEY_DIR_FAULT: {e}")))?;
        }
        let pem = signing_key
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|e| ChainError::Connection(format!("KEY_ENCODE_FAULT: {e}")))?;
        std::fs::write(path, pem.as_bytes())
            .map_err(|e| ChainError::Connection(format!("KEY_WRITE_FAULT: {e}")))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let _ = std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o400));
        }

        // Publicación de la llave de verificación (no es material secreto).
        let public_path = Self::public_key_path(path);
        let public_hex = hex::encode(
            signing_key.verifying_key().to_encoded_point(false).as_bytes(),
        );
        let _ = std::fs::write(public_path, public_hex);

        Ok(signing_key)
    }

    fn public_key_path(private_key_path: &Path) -> PathBuf {
        let mut public_path = private_key_path.as_os_str().to_owned();
        public_path.push(".pub");
        PathBuf::from(public_path)
    }

    pub fn node_id(&self) -> &str {
        &self.node_identifier
    }

    pub fn code_hash(&self) -> &str {
        &self.code_hash
    }

    /// Llave pública SEC1 sin comprimir en hex (sobre de atestación).
    pub fn public_key_hex(&self) -> Option<String> {
        self.verifying_key
            .as_ref()
            .map(|vk| hex::encode(vk.to_encoded_point(false).as_bytes()))
    }

    /// Firma un hash SHA-256 (hex) en modo prehash. Retorna firma r||s hex.
    pub fn sign_hash(&self, hash_hex: &str) -> Result<String, ChainError> {
        let signing_key = self
            .signing_key
            .as_ref()
            .ok_or_else(|| ChainError::Connection("SIGNING_UNAVAILABLE".into()))?;
        let hash_bytes = hex::decode(hash_hex)
            .map_err(|e| ChainError::Mapping(format!("hash hex decode: {e}")))?;
        let signature: Signature = signing_key
            .sign_prehash(&hash_bytes)
            .map_err(|e| ChainError::Connection(format!("SIGN_FAULT: {e}")))?;
        Ok(hex::encode(signature.to_bytes()))
    }

    /// Verifica una firma contra un hash. Con `public_key_hex` ausente usa
    /// la llave del propio nodo. Cualquier malformación cuenta como inválida.
    pub fn verify_signature(
        &self,
        hash_hex: &str,
        signature_hex: &str,
        public_key_hex: Option<&str>,
    ) -> bool {
        let verifying_key = match public_key_hex {
            Some(raw) => match hex::decode(raw)
                .ok()
                .and_then(|bytes| VerifyingKey::from_sec1_bytes(&bytes).ok())
            {
                Some(vk) => vk,
                None => return false,
            },
            None => match self.verifying_key {
                Some(vk) => vk,
                None => return false,
            },
        };

        let (hash_bytes, signature_bytes) =
            match (hex::decode(hash_hex), hex::decode(signature_hex)) {
                (Ok(h), Ok(s)) => (h, s),
                _ => return false,
            };

        let signature = match Signature::from_slice(&signature_bytes) {
            Ok(s) => s,
            Err(_) => return false,
        };

        verifying_key.verify_prehash(&hash_bytes, &signature).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sha2::{Digest, Sha256};

    #[test]
    fn certify_prehash_sign_verify_roundtrip() {
        let signer = NodeSigner::ephemeral("boar-node-test");
        let digest = hex::encode(Sha256::digest(b"bead canonical content"));

        let signature = signer.sign_hash(&digest).expect("signing key must be live");
        assert!(signer.verify_signature(&digest, &signature, None));

        // Un solo bit de digest alterado debe romper la verificación.
        let mut tampered = digest.clone();
        let flipped = if tampered.ends_with('0') { "1" } else { "0" };
        tampered.replace_range(tampered.len() - 1.., flipped);
        assert!(!signer.verify_signature(&tampered, &signature, None));
    }

    #[test]
    fn certify_foreign_key_verification_path() {
        let node_alpha = NodeSigner::ephemeral("alpha");
        let node_beta = NodeSigner::ephemeral("beta");
        let digest = hex::encode(Sha256::digest(b"cross-node attestation"));

        let signature = node_alpha.sign_hash(&digest).expect("alpha key live");
        let alpha_public = node_alpha.public_key_hex().expect("alpha public key");

        assert!(node_beta.verify_signature(&digest, &signature, Some(&alpha_public)));
        assert!(!node_beta.verify_signature(&digest, &signature, None));
    }
}
