//! Transaction lifecycle helpers shared by the token handlers
//!
//! Every handler follows the same shape: check preconditions, build a
//! request, simulate it, write it. The pieces that do not depend on the token
//! standard live here.

use alloy::primitives::{Address, B256, U256};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::canonical::CanonicalTokenResolver;
use crate::client::{read_contract, ContractClient, ContractRequest};
use crate::config::BridgeConfig;
use crate::contracts::{IBridge, Message};
use crate::error::{BridgeError, CallError, Result};
use crate::prover::SignalProver;
use crate::types::{ClaimArgs, MessageStatus, TxHandle};

/// Collaborators shared by every handler
#[derive(Clone)]
pub struct BridgeContext {
    pub config: Arc<BridgeConfig>,
    pub client: Arc<dyn ContractClient>,
    pub resolver: Arc<dyn CanonicalTokenResolver>,
    pub prover: Arc<dyn SignalProver>,
}

impl BridgeContext {
    pub fn new(
        config: Arc<BridgeConfig>,
        client: Arc<dyn ContractClient>,
        resolver: Arc<dyn CanonicalTokenResolver>,
        prover: Arc<dyn SignalProver>,
    ) -> Self {
        Self {
            config,
            client,
            resolver,
            prover,
        }
    }

    /// Bridge on `src_chain_id` serving the route towards `dest_chain_id`
    pub fn bridge_address(&self, src_chain_id: u64, dest_chain_id: u64) -> Result<Address> {
        Ok(self.config.route(src_chain_id, dest_chain_id)?.bridge)
    }
}

pub async fn is_bridge_paused(ctx: &BridgeContext, chain_id: u64, bridge: Address) -> Result<bool> {
    Ok(read_contract(ctx.client.as_ref(), chain_id, bridge, IBridge::pausedCall {})
        .await?
        ._0)
}

/// Fail with `BridgePaused` if the bridge on `chain_id` is paused
pub async fn ensure_bridge_not_paused(ctx: &BridgeContext, chain_id: u64, bridge: Address) -> Result<()> {
    if is_bridge_paused(ctx, chain_id, bridge).await? {
        warn!(chain_id = chain_id, bridge = %bridge, "Bridge is paused");
        return Err(BridgeError::BridgePaused);
    }
    Ok(())
}

/// Status of `msg_hash` on the bridge at `bridge` on `chain_id`
pub async fn message_status(
    ctx: &BridgeContext,
    chain_id: u64,
    bridge: Address,
    msg_hash: B256,
) -> Result<MessageStatus> {
    let raw = read_contract(
        ctx.client.as_ref(),
        chain_id,
        bridge,
        IBridge::messageStatusCall { msgHash: msg_hash },
    )
    .await?
    ._0;
    Ok(MessageStatus::try_from(raw)?)
}

/// Hash of `message` as computed by the bridge on `chain_id`
pub async fn hash_message(
    ctx: &BridgeContext,
    chain_id: u64,
    bridge: Address,
    message: &Message,
) -> Result<B256> {
    Ok(read_contract(
        ctx.client.as_ref(),
        chain_id,
        bridge,
        IBridge::hashMessageCall {
            message: message.clone(),
        },
    )
    .await?
    ._0)
}

/// Precondition checks for a claim; returns the current message status
pub async fn before_claiming(ctx: &BridgeContext, args: &ClaimArgs) -> Result<MessageStatus> {
    let (account, chain_id) = args.wallet.require()?;
    let dest_chain_id = args.dest_chain_id();
    if chain_id != dest_chain_id {
        return Err(BridgeError::WrongChain {
            expected: dest_chain_id,
            actual: chain_id,
        });
    }

    let bridge = ctx.bridge_address(dest_chain_id, args.src_chain_id())?;
    let status = message_status(ctx, dest_chain_id, bridge, args.msg_hash).await?;
    debug!(msg_hash = %args.msg_hash, status = %status, "Message status");

    match status {
        MessageStatus::Done => Err(BridgeError::MessageStatus {
            status,
            reason: "message already processed",
        }),
        MessageStatus::Failed => Err(BridgeError::MessageStatus {
            status,
            reason: "message failed",
        }),
        MessageStatus::Retriable if account != args.message.user => {
            Err(BridgeError::WrongOwner { account })
        }
        _ => Ok(status),
    }
}

/// Gas limit attached to a transfer for the relayer on the destination chain
pub fn select_gas_limit(
    is_token_already_deployed: bool,
    fee: U256,
    not_deployed_gas_limit: u64,
    no_owner_gas_limit: u64,
) -> U256 {
    if !is_token_already_deployed {
        U256::from(not_deployed_gas_limit)
    } else if fee > U256::ZERO {
        U256::from(no_owner_gas_limit)
    } else {
        U256::ZERO
    }
}

/// Explicit gas for a claim whose message asks for more than `threshold`
pub fn explicit_claim_gas(message_gas_limit: U256, threshold: u64) -> Option<u64> {
    if message_gas_limit > U256::from(threshold) {
        Some(message_gas_limit.saturating_to())
    } else {
        None
    }
}

/// Simulate `request`, logging instead of failing when it would revert
pub async fn simulate_best_effort(ctx: &BridgeContext, request: &ContractRequest) {
    if let Err(e) = ctx.client.simulate(request).await {
        warn!(
            chain_id = request.chain_id,
            to = %request.to,
            error = %e,
            "Simulation failed, sending anyway"
        );
    }
}

/// Simulate then write `request`, wrapping any call failure into `kind`
pub async fn simulate_and_write(
    ctx: &BridgeContext,
    request: &ContractRequest,
    kind: fn(CallError) -> BridgeError,
) -> Result<TxHandle> {
    ctx.client
        .simulate(request)
        .await
        .map_err(|e| BridgeError::wrap(e, kind))?;
    ctx.client
        .write(request)
        .await
        .map_err(|e| BridgeError::wrap(e, kind))
}

/// Re-classify a raw call failure of the send path as `SendFailed`
pub fn into_send_failed(err: BridgeError) -> BridgeError {
    match err {
        BridgeError::Call(e) => BridgeError::wrap(e, BridgeError::SendFailed),
        other => other,
    }
}

/// Claim `args.message` on its destination chain
///
/// Only `NEW` messages are processed; retrying a `RETRIABLE` message is not
/// supported.
pub async fn claim_message(ctx: &BridgeContext, args: &ClaimArgs, gas_threshold: u64) -> Result<TxHandle> {
    let status = before_claiming(ctx, args).await?;
    let (account, _) = args.wallet.require()?;
    let src_chain_id = args.src_chain_id();
    let dest_chain_id = args.dest_chain_id();

    match status {
        MessageStatus::New => {
            let proof = ctx
                .prover
                .generate_proof_to_process_message(args.msg_hash, src_chain_id, dest_chain_id)
                .await
                .map_err(|e| BridgeError::wrap(e, BridgeError::ProcessMessageFailed))?;

            let bridge = ctx.bridge_address(dest_chain_id, src_chain_id)?;
            let gas = explicit_claim_gas(args.message.gasLimit, gas_threshold);
            let request = ContractRequest::new(
                dest_chain_id,
                bridge,
                &IBridge::processMessageCall {
                    message: args.message.clone(),
                    proof,
                },
            )
            .from(account)
            .gas(gas);

            let tx_hash = simulate_and_write(ctx, &request, BridgeError::ProcessMessageFailed).await?;
            info!(
                msg_hash = %args.msg_hash,
                chain_id = dest_chain_id,
                gas = ?gas,
                tx_hash = %tx_hash,
                "Message claim submitted"
            );
            Ok(tx_hash)
        }
        MessageStatus::Retriable => Err(BridgeError::NotImplemented("retrying a retriable message")),
        other => Err(BridgeError::MessageStatus {
            status: other,
            reason: "message cannot be claimed",
        }),
    }
}
