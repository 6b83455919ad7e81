// [libs/infra/chain/src/anchor.rs]
/*!
 * =================================================================
 * APARATO: ON-CHAIN ANCHOR ENGINE (V3.0 - MEMO PROTOCOL)
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: COMPROMISO EXTERNO DE RAÍCES MERKLE VÍA MEMO
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. BLIND SIGNING: El sobre se firma vía el puente keychain; la llave
 *    jamás toca este proceso.
 * 2. BEST EFFORT: Un fallo de sumisión JAMÁS invalida la cadena local;
 *    el lote persiste sin anchor_tx y se reintenta el próximo ciclo.
 * 3. SELF-CONTAINED WIRE: El mensaje versionado v0 se serializa a mano
 *    (prefijo 0x80, header, llaves, blockhash, instrucción memo,
 *    lookups vacíos) sin arrastrar el SDK completo de la cadena.
 * =================================================================
 */

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use boar_infra_signer::KeychainBridge;

use crate::chain::{BeadChain, MerkleBatch};
use crate::errors::ChainError;

/// Programa Memo SPL en la red objetivo.
const MEMO_PROGRAM_ID: &str = "MemoSq4gqABAXKb96qnH8TysNcWxMyWCqXgDLGmfcHr";

/// Payload del ancla externa, serializado compacto dentro del memo.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AnchorPayload {
    pub v: u32,
    #[serde(rename = "type")]
    pub payload_type: String,
    pub root: String,
    pub range: [i64; 2],
    pub n: u64,
    pub ts: String,
}

impl AnchorPayload {
    pub fn for_batch(batch: &MerkleBatch) -> Self {
        Self {
            v: 1,
            payload_type: "boar_anchor".into(),
            root: batch.merkle_root.clone(),
            range: [batch.seq_start, batch.seq_end],
            n: batch.bead_count,
            ts: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }

    pub fn to_compact_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Resultado de un intento de sumisión de ancla.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnchorOutcome {
    Submitted { batch_id: String, tx_signature: String },
    Deferred { batch_id: String, reason: String },
}

fn encode_shortvec(mut value: usize) -> Vec<u8> {
    let mut encoded = Vec::with_capacity(3);
    loop {
        let mut byte = (value & 0x7f) as u8;
        value >>= 7;
        if value != 0 {
            byte |= 0x80;
        }
        encoded.push(byte);
        if value == 0 {
            return encoded;
        }
    }
}

fn decode_base58_32(raw: &str, field: &str) -> Result<[u8; 32], ChainError> {
    let bytes = bs58_decode(raw)
        .map_err(|e| ChainError::AnchorSubmission(format!("{field} base58: {e}")))?;
    bytes
        .try_into()
        .map_err(|_| ChainError::AnchorSubmission(format!("{field}: expected 32 bytes")))
}

fn bs58_decode(raw: &str) -> Result<Vec<u8>, String> {
    bs58::decode(raw).into_vec().map_err(|e| e.to_string())
}

/// Construye la transacción memo sin firmar como base64.
///
/// Sobre: [shortvec n_firmas=1][64 bytes de ranura cero][mensaje v0].
/// Mensaje v0: prefijo 0x80, header (1 firma requerida, 0 firmadas de
/// solo lectura, 1 sin firmar de solo lectura), llaves [pagador, memo],
/// blockhash reciente, una instrucción memo sin cuentas, lookups vacíos.
pub fn build_memo_transaction(
    memo_data: &str,
    wallet_pubkey: &str,
    recent_blockhash: &str,
) -> Result<String, ChainError> {
    let payer = decode_base58_32(wallet_pubkey, "wallet_pubkey")?;
    let memo_program = decode_base58_32(MEMO_PROGRAM_ID, "memo_program")?;
    let blockhash = decode_base58_32(recent_blockhash, "recent_blockhash")?;

    let mut message: Vec<u8> = Vec::with_capacity(128 + memo_data.len());
    message.push(0x80); // versión 0
    message.push(1); // num_required_signatures
    message.push(0); // num_readonly_signed_accounts
    message.push(1); // num_readonly_unsigned_accounts

    message.extend_from_slice(&encode_shortvec(2));
    message.extend_from_slice(&payer);
    message.extend_from_slice(&memo_program);

    message.extend_from_slice(&blockhash);

    message.extend_from_slice(&encode_shortvec(1));
    message.push(1); // índice del programa memo en las llaves
    message.extend_from_slice(&encode_shortvec(0)); // sin cuentas
    message.extend_from_slice(&encode_shortvec(memo_data.len()));
    message.extend_from_slice(memo_data.as_bytes());

    message.extend_from_slice(&encode_shortvec(0)); // address table lookups

    let mut envelope: Vec<u8> = Vec::with_capacity(65 + message.len());
    envelope.extend_from_slice(&encode_shortvec(1));
    envelope.extend_from_slice(&[0u8; 64]);
    envelope.extend_from_slice(&message);

    Ok(BASE64.encode(envelope))
}

fn rpc_url() -> String {
    match std::env::var("HELIUS_API_KEY") {
        Ok(api_key) if !api_key.is_empty() => {
            format!("https://mainnet.helius-rpc.com/?api-key={api_key}")
        }
        _ => "https://api.mainnet-beta.solana.com".to_string(),
    }
}

async fn rpc_call(method: &str, params: Value) -> Result<Value, ChainError> {
    let payload = json!({ "jsonrpc": "2.0", "id": 1, "method": method, "params": params });
    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(15))
        .build()
        .map_err(|e| ChainError::AnchorSubmission(e.to_string()))?;

    let response = client
        .post(rpc_url())
        .json(&payload)
        .send()
        .await
        .map_err(|e| ChainError::AnchorSubmission(e.to_string()))?;

    response.json::<Value>().await.map_err(|e| ChainError::AnchorSubmission(e.to_string()))
}

/// Flujo completo de ancla para un lote: payload -> memo sin firmar ->
/// firma ciega -> sendTransaction. Cualquier fallo difiere el lote.
pub async fn submit_anchor(
    chain: &BeadChain,
    keychain: &KeychainBridge,
    batch: &MerkleBatch,
) -> Result<AnchorOutcome, ChainError> {
    let payload = AnchorPayload::for_batch(batch).to_compact_json();

    let attempt = async {
        let wallet_pubkey = keychain
            .get_public_key()
            .await
            .map_err(|e| ChainError::AnchorSubmission(e.to_string()))?;

        let blockhash_response =
            rpc_call("getLatestBlockhash", json!([{ "commitment": "finalized" }])).await?;
        if blockhash_response.get("error").is_some() {
            return Err(ChainError::AnchorSubmission(format!(
                "Blockhash fetch failed: {}",
                blockhash_response["error"]
            )));
        }
        let recent_blockhash = blockhash_response["result"]["value"]["blockhash"]
            .as_str()
            .ok_or_else(|| ChainError::AnchorSubmission("blockhash missing".into()))?
            .to_string();

        let unsigned_tx = build_memo_transaction(&payload, &wallet_pubkey, &recent_blockhash)?;

        let signed_tx = keychain
            .sign_transaction(&unsigned_tx)
            .await
            .map_err(|e| ChainError::AnchorSubmission(e.to_string()))?;

        let send_response = rpc_call(
            "sendTransaction",
            json!([signed_tx, { "encoding": "base64", "skipPreflight": false, "preflightCommitment": "confirmed" }]),
        )
        .await?;
        if send_response.get("error").is_some() {
            return Err(ChainError::AnchorSubmission(format!(
                "Transaction send failed: {}",
                send_response["error"]
            )));
        }

        send_response["result"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| ChainError::AnchorSubmission("send result missing".into()))
    };

    match attempt.await {
        Ok(tx_signature) => {
            chain.mark_batch_anchored(&batch.batch_id, &tx_signature).await?;
            info!("⛓️ [ANCHOR]: Batch {} committed externally ({})", batch.batch_id, tx_signature);
            Ok(AnchorOutcome::Submitted { batch_id: batch.batch_id.clone(), tx_signature })
        }
        Err(e) => {
            // El registro local persiste sin anchor_tx: se reintenta luego.
            warn!("🟡 [ANCHOR]: Batch {} deferred: {}", batch.batch_id, e);
            Ok(AnchorOutcome::Deferred { batch_id: batch.batch_id.clone(), reason: e.to_string() })
        }
    }
}
