// [apps/signer/src/main.rs]
/*!
 * =================================================================
 * APARATO: BLIND KEYMAN SIGNER (V3.0 - SECURITY CENTERPIECE)
 * CLASIFICACIÓN: APPLICATION LAYER (SUBPROCESO AISLADO)
 * RESPONSABILIDAD: FIRMA ED25519 SIN EXPONER JAMÁS LA LLAVE
 *
 * Este binario corre como SUBPROCESO AISLADO. Lo invoca el agente pero
 * NO comparte su entorno: el puente keychain construye un entorno
 * mínimo donde SOLO este proceso ve SIGNER_PRIVATE_KEY.
 *
 * LO QUE ESTE PROCESO HACE:
 *  - Lee la llave privada de SU PROPIA variable de entorno.
 *  - Lee la transacción sin firmar por stdin (base64).
 *  - Firma el preimage del mensaje versionado (convención Solana).
 *  - Escribe la transacción firmada por stdout (base64) y termina.
 *  - Modo --pubkey: deriva y emite la llave pública base58.
 *
 * LO QUE ESTE PROCESO JAMÁS HACE:
 *  - Escribir a archivo. Escribir a log. Abrir red.
 *  - Imprimir la llave ni ningún derivado de ella.
 *  - Emitir errores con detalle: toda falla es una línea genérica.
 *
 * Códigos de salida: 0 éxito, 1 cualquier error.
 * =================================================================
 */

use std::io::{Read, Write};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use ed25519_dalek::{Signer, SigningKey};

const KEY_ENV: &str = "SIGNER_PRIVATE_KEY";

// Rutas de fallo genéricas. NINGUNA interpola datos: el material de
// llave no puede aparecer en stderr por construcción.
const ERR_NO_KEY: &str = "ERROR: SIGNER_PRIVATE_KEY not set in signer environment";
const ERR_KEY_DECODE: &str = "ERROR: Key decode failed";
const ERR_NO_STDIN: &str = "ERROR: No transaction data on stdin";
const ERR_TX_DECODE: &str = "ERROR: Base64 decode failed";
const ERR_ENVELOPE: &str = "ERROR: Malformed transaction envelope";
const ERR_SIGNING: &str = "ERROR: Signing failed";
const ERR_PUBKEY: &str = "ERROR: Pubkey derivation failed";

fn fail(message: &str) -> ! {
    eprintln!("{message}");
    std::process::exit(1);
}

/// Decodifica un compact-u16 (shortvec) de Solana. Retorna (valor, bytes leídos).
fn decode_shortvec(bytes: &[u8]) -> Option<(usize, usize)> {
    let mut value: usize = 0;
    let mut shift = 0;
    for (index, byte) in bytes.iter().enumerate().take(3) {
        value |= ((byte & 0x7f) as usize) << shift;
        if byte & 0x80 == 0 {
            return Some((value, index + 1));
        }
        shift += 7;
    }
    None
}

/// Materializa la llave de firma desde los bytes decodificados.
/// Acepta el formato keypair de 64 bytes (convención Solana) o la
/// semilla cruda de 32 bytes.
fn signing_key_from_bytes(key_bytes: &[u8]) -> Option<SigningKey> {
    match key_bytes.len() {
        64 => {
            let mut keypair = [0u8; 64];
            keypair.copy_from_slice(key_bytes);
            let key = SigningKey::from_keypair_bytes(&keypair).ok();
            keypair.fill(0);
            key
        }
        32 => {
            let mut seed = [0u8; 32];
            seed.copy_from_slice(key_bytes);
            let key = SigningKey::from_bytes(&seed);
            seed.fill(0);
            Some(key)
        }
        _ => None,
    }
}

fn main() {
    // SEGURIDAD: la llave se lee del entorno de ESTE proceso únicamente.
    let key_b64 = match std::env::var(KEY_ENV) {
        Ok(raw) if !raw.is_empty() => raw,
        _ => fail(ERR_NO_KEY),
    };

    let mut key_bytes = match BASE64.decode(key_b64.trim()) {
        Ok(bytes) => bytes,
        Err(_) => fail(ERR_KEY_DECODE),
    };

    let signing_key = match signing_key_from_bytes(&key_bytes) {
        Some(key) => key,
        None => {
            key_bytes.fill(0);
            fail(ERR_KEY_DECODE)
        }
    };
    // Borrado explícito del scratch de llave.
    key_bytes.fill(0);

    // Modo --pubkey: deriva, emite y termina. La llave pública NO es secreta.
    if std::env::args().any(|argument| argument == "--pubkey") {
        let public_key = bs58::encode(signing_key.verifying_key().to_bytes()).into_string();
        if public_key.is_empty() {
            fail(ERR_PUBKEY);
        }
        let mut stdout = std::io::stdout();
        let _ = stdout.write_all(public_key.as_bytes());
        let _ = stdout.flush();
        std::process::exit(0);
    }

    // Transacción sin firmar por stdin (base64).
    let mut stdin_payload = String::new();
    if std::io::stdin().read_to_string(&mut stdin_payload).is_err() {
        fail(ERR_NO_STDIN);
    }
    let stdin_payload = stdin_payload.trim();
    if stdin_payload.is_empty() {
        fail(ERR_NO_STDIN);
    }

    let mut transaction_bytes = match BASE64.decode(stdin_payload) {
        Ok(bytes) => bytes,
        Err(_) => fail(ERR_TX_DECODE),
    };

    // Sobre de transacción versionada: [shortvec n_firmas][n x 64 bytes][mensaje].
    // El preimage firmado es el mensaje completo, prefijo de versión incluido.
    let Some((signature_count, prefix_length)) = decode_shortvec(&transaction_bytes) else {
        fail(ERR_ENVELOPE);
    };
    if signature_count == 0 {
        fail(ERR_ENVELOPE);
    }
    let message_offset = prefix_length + signature_count * 64;
    if transaction_bytes.len() <= message_offset {
        fail(ERR_ENVELOPE);
    }

    let signature = signing_key.sign(&transaction_bytes[message_offset..]);

    // La firma del pagador ocupa la ranura cero del sobre.
    transaction_bytes[prefix_length..prefix_length + 64].copy_from_slice(&signature.to_bytes());

    let signed_b64 = BASE64.encode(&transaction_bytes);
    if signed_b64.is_empty() {
        fail(ERR_SIGNING);
    }

    // Única salida del proceso. Sin material de llave. Sin logs.
    let mut stdout = std::io::stdout();
    let _ = stdout.write_all(signed_b64.as_bytes());
    let _ = stdout.flush();
    std::process::exit(0);
}
