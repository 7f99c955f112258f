//! Canonical token resolution
//!
//! A token's canonical identity is the chain and address it was originally
//! deployed at. A transfer of a token whose canonical identity is the source
//! chain itself moves a native token (the vault escrows it and needs an
//! approval); anything else is a bridged token the vault burns.

use alloy::primitives::Address;
use alloy::sol_types::SolCall;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use crate::client::{read_contract, ContractClient, ContractRequest};
use crate::config::BridgeConfig;
use crate::contracts::{IERC20Vault, INFTVault, ERC165, ERC20};
use crate::error::{CallError, Result};
use crate::types::TokenType;

/// ERC165 interface id of ERC721
pub const ERC721_INTERFACE_ID: [u8; 4] = [0x80, 0xac, 0x58, 0xcd];
/// ERC165 interface id of ERC1155
pub const ERC1155_INTERFACE_ID: [u8; 4] = [0xd9, 0xb6, 0x7a, 0x26];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalInfo {
    pub chain_id: u64,
    pub address: Address,
    pub symbol: Option<String>,
    pub name: Option<String>,
}

impl CanonicalInfo {
    /// Whether `token` on `chain_id` is this canonical token itself
    pub fn is_native(&self, chain_id: u64, token: Address) -> bool {
        self.chain_id == chain_id && self.address == token
    }
}

/// Maps a token on the source chain of a route to its canonical identity
#[async_trait]
pub trait CanonicalTokenResolver: Send + Sync {
    /// `Ok(None)` when the token is unknown on the source chain
    async fn canonical_info(
        &self,
        token: Address,
        token_type: TokenType,
        src_chain_id: u64,
        dest_chain_id: u64,
    ) -> Result<Option<CanonicalInfo>>;
}

/// Resolver backed by the source vault's `bridgedToCanonical` mapping
pub struct VaultCanonicalResolver {
    client: Arc<dyn ContractClient>,
    config: Arc<BridgeConfig>,
}

impl VaultCanonicalResolver {
    pub fn new(client: Arc<dyn ContractClient>, config: Arc<BridgeConfig>) -> Self {
        Self { client, config }
    }

    async fn bridged_to_canonical(
        &self,
        chain_id: u64,
        vault: Address,
        token: Address,
        token_type: TokenType,
    ) -> Result<Option<CanonicalInfo>, CallError> {
        let client = self.client.as_ref();
        let (chain, addr, symbol, name) = match token_type {
            TokenType::Erc20 => {
                let r = read_contract(
                    client,
                    chain_id,
                    vault,
                    IERC20Vault::bridgedToCanonicalCall { btoken: token },
                )
                .await?;
                (r.chainId, r.addr, r.symbol, r.name)
            }
            TokenType::Erc721 | TokenType::Erc1155 => {
                let r = read_contract(
                    client,
                    chain_id,
                    vault,
                    INFTVault::bridgedToCanonicalCall { btoken: token },
                )
                .await?;
                (r.chainId, r.addr, r.symbol, r.name)
            }
        };

        if addr == Address::ZERO {
            return Ok(None);
        }

        Ok(Some(CanonicalInfo {
            chain_id: chain,
            address: addr,
            symbol: Some(symbol),
            name: Some(name),
        }))
    }

    /// Whether `token` answers as a contract of `token_type` on `chain_id`
    ///
    /// `Ok(None)` when it does not; transport failures are returned as errors.
    async fn detect_native_token(
        &self,
        chain_id: u64,
        token: Address,
        token_type: TokenType,
    ) -> Result<Option<Option<String>>, CallError> {
        let client = self.client.as_ref();
        match token_type {
            TokenType::Erc20 => Ok(try_read(client, chain_id, token, ERC20::symbolCall {})
                .await?
                .map(|r| Some(r._0))),
            TokenType::Erc721 | TokenType::Erc1155 => {
                let interface_id = if token_type == TokenType::Erc721 {
                    ERC721_INTERFACE_ID
                } else {
                    ERC1155_INTERFACE_ID
                };
                let supported = try_read(
                    client,
                    chain_id,
                    token,
                    ERC165::supportsInterfaceCall {
                        interfaceId: interface_id.into(),
                    },
                )
                .await?
                .is_some_and(|r| r._0);
                Ok(supported.then_some(None))
            }
        }
    }
}

/// Typed read where a revert or an undecodable answer yields `None`
async fn try_read<C: SolCall + Send>(
    client: &dyn ContractClient,
    chain_id: u64,
    to: Address,
    call: C,
) -> Result<Option<C::Return>, CallError> {
    let request = ContractRequest::new(chain_id, to, &call);
    match client.read(&request).await {
        Ok(data) => Ok(C::abi_decode_returns(&data, true).ok()),
        Err(e) if e.is_revert() => Ok(None),
        Err(e) => Err(e),
    }
}

#[async_trait]
impl CanonicalTokenResolver for VaultCanonicalResolver {
    async fn canonical_info(
        &self,
        token: Address,
        token_type: TokenType,
        src_chain_id: u64,
        dest_chain_id: u64,
    ) -> Result<Option<CanonicalInfo>> {
        let vault = self.config.route(src_chain_id, dest_chain_id)?.vault(token_type);

        if let Some(info) = self
            .bridged_to_canonical(src_chain_id, vault, token, token_type)
            .await?
        {
            debug!(
                token = %token,
                canonical_chain = info.chain_id,
                canonical_address = %info.address,
                "Token is bridged"
            );
            return Ok(Some(info));
        }

        let info = self
            .detect_native_token(src_chain_id, token, token_type)
            .await?
            .map(|symbol| CanonicalInfo {
                chain_id: src_chain_id,
                address: token,
                symbol,
                name: None,
            });

        debug!(token = %token, native = info.is_some(), "Token is not bridged");
        Ok(info)
    }
}
