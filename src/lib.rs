//! Rollup Bridge: client for the L1 <-> L2 token bridge
//!
//! Moves ERC20, ERC721 and ERC1155 tokens and their cross-chain messages by
//! driving pre-deployed bridge and vault contracts:
//!
//! - **Handlers** - per-standard approval check, gas estimate, send, claim, approve
//! - **Lifecycle** - pause check, claim preconditions, gas-limit rules, error wrapping
//! - **Canonical** - maps a token to the chain and address it was deployed at
//! - **Client** - read/estimate/simulate/write primitives over alloy providers
//! - **Prover** - signal proofs for processing a message on the destination chain
//! - **Config** - chains, per-route contract addresses and gas limits
//!
//! ## Feature Flags
//!
//! - `testing` - Expose the in-memory contract client, resolver and prover

pub mod canonical;
pub mod client;
pub mod config;
pub mod contracts;
pub mod error;
pub mod handlers;
pub mod lifecycle;
pub mod prover;
pub mod redact;
pub mod types;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use canonical::{CanonicalInfo, CanonicalTokenResolver, VaultCanonicalResolver};
pub use client::{read_contract, AlloyContractClient, ContractClient, ContractRequest};
pub use config::{BridgeConfig, ChainConfig, GasLimitConfig, RouteConfig, RouteContracts};
pub use error::{BridgeError, CallError, Result};
pub use handlers::{Erc1155Bridge, Erc20Bridge, Erc721Bridge, TokenBridge};
pub use lifecycle::BridgeContext;
pub use prover::{RpcSignalProver, SignalProver};
pub use types::{
    ApproveArgs, BridgeTransferArgs, ClaimArgs, MessageStatus, TokenType, TxHandle, WalletContext,
};
