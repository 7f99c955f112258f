//! Signal proofs
//!
//! A message sent on the source chain is recorded as a signal in the source
//! signal service. The destination bridge accepts it once the caller proves
//! that storage slot against a source block the destination chain has synced.

use alloy::eips::BlockId;
use alloy::primitives::{Address, Bytes, B256};
use alloy::providers::Provider;
use alloy::sol_types::SolValue;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

use crate::client::{read_contract, AlloyContractClient};
use crate::config::BridgeConfig;
use crate::contracts::{ICrossChainSync, ISignalService, SignalProof};
use crate::error::CallError;

/// Produces the proof argument of `processMessage`
#[async_trait]
pub trait SignalProver: Send + Sync {
    async fn generate_proof_to_process_message(
        &self,
        msg_hash: B256,
        src_chain_id: u64,
        dest_chain_id: u64,
    ) -> Result<Bytes, CallError>;
}

/// ABI-encoded single-hop [`SignalProof`] over RLP-encoded storage proof nodes
pub fn encode_signal_proof(height: u64, nodes: &[Bytes]) -> Bytes {
    let mut storage_proof = Vec::new();
    alloy::rlp::encode_list::<_, Bytes>(nodes, &mut storage_proof);

    SignalProof {
        height,
        storageProof: storage_proof.into(),
        hops: Vec::new(),
    }
    .abi_encode()
    .into()
}

/// Prover backed by `eth_getProof` on the source chain
pub struct RpcSignalProver {
    client: Arc<AlloyContractClient>,
    config: Arc<BridgeConfig>,
}

impl RpcSignalProver {
    pub fn new(client: Arc<AlloyContractClient>, config: Arc<BridgeConfig>) -> Self {
        Self { client, config }
    }

    /// Source bridge, source signal service and destination cross-chain sync
    fn contracts(
        &self,
        src_chain_id: u64,
        dest_chain_id: u64,
    ) -> Result<(Address, Address, Address), CallError> {
        let missing = |src: u64, dest: u64| {
            CallError::new(format!("no route configured from {} to {}", src, dest))
        };
        let src = self
            .config
            .route(src_chain_id, dest_chain_id)
            .map_err(|_| missing(src_chain_id, dest_chain_id))?;
        let dest = self
            .config
            .route(dest_chain_id, src_chain_id)
            .map_err(|_| missing(dest_chain_id, src_chain_id))?;
        Ok((src.bridge, src.signal_service, dest.cross_chain_sync))
    }
}

#[async_trait]
impl SignalProver for RpcSignalProver {
    async fn generate_proof_to_process_message(
        &self,
        msg_hash: B256,
        src_chain_id: u64,
        dest_chain_id: u64,
    ) -> Result<Bytes, CallError> {
        let (src_bridge, src_signal_service, dest_cross_chain_sync) =
            self.contracts(src_chain_id, dest_chain_id)?;

        // Latest source block known to the destination chain
        let snippet = read_contract(
            self.client.as_ref(),
            dest_chain_id,
            dest_cross_chain_sync,
            ICrossChainSync::getSyncedSnippetCall { blockId: 0 },
        )
        .await?
        ._0;

        let slot = read_contract(
            self.client.as_ref(),
            src_chain_id,
            src_signal_service,
            ISignalService::getSignalSlotCall {
                chainId: src_chain_id,
                app: src_bridge,
                signal: msg_hash,
            },
        )
        .await?
        ._0;

        debug!(
            msg_hash = %msg_hash,
            slot = %slot,
            block_id = snippet.remoteBlockId,
            block_hash = %snippet.blockHash,
            "Fetching storage proof"
        );

        let proof = self
            .client
            .provider(src_chain_id)?
            .get_proof(src_signal_service, vec![slot])
            .block_id(BlockId::hash(snippet.blockHash))
            .await?;

        let nodes = proof
            .storage_proof
            .first()
            .map(|p| p.proof.clone())
            .ok_or_else(|| CallError::new("eth_getProof returned no storage proof"))?;

        info!(
            msg_hash = %msg_hash,
            height = snippet.remoteBlockId,
            nodes = nodes.len(),
            "Generated signal proof"
        );

        Ok(encode_signal_proof(snippet.remoteBlockId, &nodes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_signal_proof() {
        let nodes = vec![Bytes::from(vec![0xde, 0xad]), Bytes::from(vec![0xbe, 0xef])];
        let encoded = encode_signal_proof(42, &nodes);

        let decoded = SignalProof::abi_decode(&encoded, true).unwrap();
        assert_eq!(decoded.height, 42);
        assert!(decoded.hops.is_empty());
        // list header 0xc6, then two 0x82-prefixed strings
        assert_eq!(
            decoded.storageProof.to_vec(),
            vec![0xc6, 0x82, 0xde, 0xad, 0x82, 0xbe, 0xef]
        );
    }

    #[test]
    fn test_empty_proof_is_empty_list() {
        let decoded = SignalProof::abi_decode(&encode_signal_proof(1, &[]), true).unwrap();
        assert_eq!(decoded.storageProof.to_vec(), vec![0xc0]);
    }
}
