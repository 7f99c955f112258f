//! Common types for bridge operations
//!
//! Argument structs are built by the caller for a single operation and never
//! mutated afterwards.

use alloy::primitives::{Address, TxHash, B256, U256};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::contracts::Message;
use crate::error::{BridgeError, CallError, Result};

/// Token standards the bridge can move
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TokenType {
    Erc20,
    Erc721,
    Erc1155,
}

impl TokenType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::Erc20 => "ERC20",
            TokenType::Erc721 => "ERC721",
            TokenType::Erc1155 => "ERC1155",
        }
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lifecycle state of a cross-chain message on the destination bridge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageStatus {
    New,
    Retriable,
    Done,
    Failed,
    Recalled,
}

impl MessageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageStatus::New => "new",
            MessageStatus::Retriable => "retriable",
            MessageStatus::Done => "done",
            MessageStatus::Failed => "failed",
            MessageStatus::Recalled => "recalled",
        }
    }
}

impl TryFrom<u8> for MessageStatus {
    type Error = CallError;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        match value {
            0 => Ok(MessageStatus::New),
            1 => Ok(MessageStatus::Retriable),
            2 => Ok(MessageStatus::Done),
            3 => Ok(MessageStatus::Failed),
            4 => Ok(MessageStatus::Recalled),
            other => Err(CallError::new(format!("unknown message status {}", other))),
        }
    }
}

impl fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Connected wallet: account and active chain, either of which may be missing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalletContext {
    pub account: Option<Address>,
    pub chain_id: Option<u64>,
}

impl WalletContext {
    pub fn connected(account: Address, chain_id: u64) -> Self {
        Self {
            account: Some(account),
            chain_id: Some(chain_id),
        }
    }

    /// Account and chain, or `WalletNotConnected`
    pub fn require(&self) -> Result<(Address, u64)> {
        match (self.account, self.chain_id) {
            (Some(account), Some(chain_id)) => Ok((account, chain_id)),
            _ => Err(BridgeError::WalletNotConnected),
        }
    }
}

/// Arguments for sending tokens to the destination chain
#[derive(Debug, Clone)]
pub struct BridgeTransferArgs {
    pub wallet: WalletContext,
    /// Token address on the source chain
    pub token: Address,
    pub src_chain_id: u64,
    pub dest_chain_id: u64,
    /// Vault on the source chain that escrows or burns the token
    pub token_vault: Address,
    /// Recipient on the destination chain
    pub to: Address,
    /// Relayer fee attached as `msg.value`
    pub fee: U256,
    /// NFT token ids (empty for ERC20)
    pub token_ids: Vec<U256>,
    /// NFT amounts (one per id, `1` for ERC721) or a single ERC20 amount
    pub amounts: Vec<U256>,
    pub memo: String,
    /// Whether the bridged counterpart already exists on the destination chain
    pub is_token_already_deployed: bool,
}

/// Arguments for claiming a message on the destination chain
#[derive(Debug, Clone)]
pub struct ClaimArgs {
    pub wallet: WalletContext,
    pub msg_hash: B256,
    pub message: Message,
}

impl ClaimArgs {
    pub fn src_chain_id(&self) -> u64 {
        self.message.srcChainId.saturating_to()
    }

    pub fn dest_chain_id(&self) -> u64 {
        self.message.destChainId.saturating_to()
    }
}

/// Arguments for granting the vault access to a token
#[derive(Debug, Clone)]
pub struct ApproveArgs {
    pub wallet: WalletContext,
    pub token: Address,
    pub spender: Address,
    pub token_id: U256,
    /// ERC20 allowance to grant; ignored for NFTs
    pub amount: U256,
}

/// Hash of a submitted transaction
pub type TxHandle = TxHash;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_status_from_u8() {
        assert_eq!(MessageStatus::try_from(0).unwrap(), MessageStatus::New);
        assert_eq!(MessageStatus::try_from(1).unwrap(), MessageStatus::Retriable);
        assert_eq!(MessageStatus::try_from(2).unwrap(), MessageStatus::Done);
        assert_eq!(MessageStatus::try_from(3).unwrap(), MessageStatus::Failed);
        assert_eq!(MessageStatus::try_from(4).unwrap(), MessageStatus::Recalled);
    }

    #[test]
    fn test_message_status_rejects_unknown() {
        let err = MessageStatus::try_from(9).unwrap_err();
        assert!(err.message.contains("unknown message status 9"));
    }

    #[test]
    fn test_wallet_require() {
        let account = Address::repeat_byte(0x11);
        assert_eq!(
            WalletContext::connected(account, 1).require().unwrap(),
            (account, 1)
        );

        let missing_chain = WalletContext {
            account: Some(account),
            chain_id: None,
        };
        assert!(matches!(
            missing_chain.require(),
            Err(BridgeError::WalletNotConnected)
        ));
        assert!(WalletContext::default().require().is_err());
    }

    #[test]
    fn test_token_type_serde() {
        let json = serde_json::to_string(&TokenType::Erc1155).unwrap();
        assert_eq!(json, "\"ERC1155\"");
        let parsed: TokenType = serde_json::from_str("\"ERC721\"").unwrap();
        assert_eq!(parsed, TokenType::Erc721);
    }
}
