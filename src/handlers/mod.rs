//! Token bridge handlers
//!
//! One handler per token standard. [`TokenBridge`] picks the handler for a
//! [`TokenType`] and forwards each operation to it.

mod erc1155;
mod erc20;
mod erc721;

pub use erc1155::Erc1155Bridge;
pub use erc20::Erc20Bridge;
pub use erc721::Erc721Bridge;

use alloy::primitives::{Address, U256};

use crate::contracts::NFTBridgeTransferOp;
use crate::error::Result;
use crate::lifecycle::BridgeContext;
use crate::types::{ApproveArgs, BridgeTransferArgs, ClaimArgs, TokenType, TxHandle};

/// Handler for one token standard
pub enum TokenBridge {
    Erc20(Erc20Bridge),
    Erc721(Erc721Bridge),
    Erc1155(Erc1155Bridge),
}

impl TokenBridge {
    pub fn new(token_type: TokenType, ctx: BridgeContext) -> Self {
        match token_type {
            TokenType::Erc20 => TokenBridge::Erc20(Erc20Bridge::new(ctx)),
            TokenType::Erc721 => TokenBridge::Erc721(Erc721Bridge::new(ctx)),
            TokenType::Erc1155 => TokenBridge::Erc1155(Erc1155Bridge::new(ctx)),
        }
    }

    pub fn token_type(&self) -> TokenType {
        match self {
            TokenBridge::Erc20(_) => TokenType::Erc20,
            TokenBridge::Erc721(_) => TokenType::Erc721,
            TokenBridge::Erc1155(_) => TokenType::Erc1155,
        }
    }

    /// Whether `args.spender` may already move the token for the wallet account
    pub async fn is_token_approved(&self, args: &ApproveArgs) -> Result<bool> {
        match self {
            TokenBridge::Erc20(h) => h.is_token_approved(args).await,
            TokenBridge::Erc721(h) => h.is_token_approved(args).await,
            TokenBridge::Erc1155(h) => h.is_token_approved(args).await,
        }
    }

    pub async fn estimate_gas(&self, args: &BridgeTransferArgs) -> Result<u64> {
        match self {
            TokenBridge::Erc20(h) => h.estimate_gas(args).await,
            TokenBridge::Erc721(h) => h.estimate_gas(args).await,
            TokenBridge::Erc1155(h) => h.estimate_gas(args).await,
        }
    }

    pub async fn bridge(&self, args: &BridgeTransferArgs) -> Result<TxHandle> {
        match self {
            TokenBridge::Erc20(h) => h.bridge(args).await,
            TokenBridge::Erc721(h) => h.bridge(args).await,
            TokenBridge::Erc1155(h) => h.bridge(args).await,
        }
    }

    pub async fn claim(&self, args: &ClaimArgs) -> Result<TxHandle> {
        match self {
            TokenBridge::Erc20(h) => h.claim(args).await,
            TokenBridge::Erc721(h) => h.claim(args).await,
            TokenBridge::Erc1155(h) => h.claim(args).await,
        }
    }

    /// Releasing a failed message back to the sender is not supported; always `Ok(None)`
    pub async fn release(&self, args: &ClaimArgs) -> Result<Option<TxHandle>> {
        match self {
            TokenBridge::Erc20(h) => h.release(args).await,
            TokenBridge::Erc721(h) => h.release(args).await,
            TokenBridge::Erc1155(h) => h.release(args).await,
        }
    }

    pub async fn approve(&self, args: &ApproveArgs) -> Result<TxHandle> {
        match self {
            TokenBridge::Erc20(h) => h.approve(args).await,
            TokenBridge::Erc721(h) => h.approve(args).await,
            TokenBridge::Erc1155(h) => h.approve(args).await,
        }
    }
}

/// Vault descriptor for an ERC721/ERC1155 transfer, refunding to `account`
pub(crate) fn build_nft_transfer_op(
    args: &BridgeTransferArgs,
    account: Address,
    gas_limit: U256,
) -> NFTBridgeTransferOp {
    NFTBridgeTransferOp {
        destChainId: U256::from(args.dest_chain_id),
        to: args.to,
        token: args.token,
        tokenIds: args.token_ids.clone(),
        amounts: args.amounts.clone(),
        gasLimit: gas_limit,
        fee: args.fee,
        refundTo: account,
        memo: args.memo.clone(),
    }
}
