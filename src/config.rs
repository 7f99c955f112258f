//! Bridge deployment configuration
//!
//! Chains, per-route contract addresses and gas limits. Loaded from a JSON
//! routing file, with gas limits overridable from the environment.
//!
//! # Environment Variable Schema
//!
//! ```text
//! BRIDGE_CONFIG_PATH=bridge.json          # routing file (default: bridge.json)
//! BRIDGE_PRIVATE_KEY=0x...                # signing key, CLI only
//! BRIDGE_NO_OWNER_GAS_LIMIT=140000        # optional gas overrides
//! BRIDGE_ERC20_NOT_DEPLOYED_GAS_LIMIT=3000000
//! BRIDGE_ERC721_NOT_DEPLOYED_GAS_LIMIT=2400000
//! BRIDGE_ERC1155_NOT_DEPLOYED_GAS_LIMIT=3100000
//! BRIDGE_ERC20_CLAIM_GAS_THRESHOLD=2500000
//! BRIDGE_ERC721_CLAIM_GAS_THRESHOLD=3000000
//! BRIDGE_ERC1155_CLAIM_GAS_THRESHOLD=3000000
//! ```

use alloy::primitives::Address;
use eyre::{eyre, Result, WrapErr};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::env;
use std::path::Path;

use crate::error::BridgeError;
use crate::redact::Redacted;
use crate::types::TokenType;

const DEFAULT_CONFIG_PATH: &str = "bridge.json";

/// A chain the client can talk to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainConfig {
    pub chain_id: u64,
    pub name: String,
    pub rpc_url: String,
}

/// Contracts deployed on `src_chain_id` that serve transfers to `dest_chain_id`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteContracts {
    pub bridge: Address,
    pub erc20_vault: Address,
    pub erc721_vault: Address,
    pub erc1155_vault: Address,
    pub signal_service: Address,
    /// Syncs block snapshots of the other chain of the route
    pub cross_chain_sync: Address,
}

impl RouteContracts {
    pub fn vault(&self, token_type: TokenType) -> Address {
        match token_type {
            TokenType::Erc20 => self.erc20_vault,
            TokenType::Erc721 => self.erc721_vault,
            TokenType::Erc1155 => self.erc1155_vault,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteConfig {
    pub src_chain_id: u64,
    pub dest_chain_id: u64,
    #[serde(flatten)]
    pub contracts: RouteContracts,
}

/// Gas limits attached to transfers and claims
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GasLimitConfig {
    /// Limit when a fee is paid and the destination token exists
    #[serde(default = "default_no_owner_gas_limit")]
    pub no_owner_gas_limit: u64,
    #[serde(default = "default_erc20_not_deployed_gas_limit")]
    pub erc20_not_deployed_gas_limit: u64,
    #[serde(default = "default_erc721_not_deployed_gas_limit")]
    pub erc721_not_deployed_gas_limit: u64,
    #[serde(default = "default_erc1155_not_deployed_gas_limit")]
    pub erc1155_not_deployed_gas_limit: u64,
    /// Claims whose message gas limit exceeds the threshold pass it explicitly
    #[serde(default = "default_erc20_claim_gas_threshold")]
    pub erc20_claim_gas_threshold: u64,
    #[serde(default = "default_nft_claim_gas_threshold")]
    pub erc721_claim_gas_threshold: u64,
    #[serde(default = "default_nft_claim_gas_threshold")]
    pub erc1155_claim_gas_threshold: u64,
}

impl Default for GasLimitConfig {
    fn default() -> Self {
        Self {
            no_owner_gas_limit: default_no_owner_gas_limit(),
            erc20_not_deployed_gas_limit: default_erc20_not_deployed_gas_limit(),
            erc721_not_deployed_gas_limit: default_erc721_not_deployed_gas_limit(),
            erc1155_not_deployed_gas_limit: default_erc1155_not_deployed_gas_limit(),
            erc20_claim_gas_threshold: default_erc20_claim_gas_threshold(),
            erc721_claim_gas_threshold: default_nft_claim_gas_threshold(),
            erc1155_claim_gas_threshold: default_nft_claim_gas_threshold(),
        }
    }
}

impl GasLimitConfig {
    pub fn not_deployed_gas_limit(&self, token_type: TokenType) -> u64 {
        match token_type {
            TokenType::Erc20 => self.erc20_not_deployed_gas_limit,
            TokenType::Erc721 => self.erc721_not_deployed_gas_limit,
            TokenType::Erc1155 => self.erc1155_not_deployed_gas_limit,
        }
    }

    pub fn claim_gas_threshold(&self, token_type: TokenType) -> u64 {
        match token_type {
            TokenType::Erc20 => self.erc20_claim_gas_threshold,
            TokenType::Erc721 => self.erc721_claim_gas_threshold,
            TokenType::Erc1155 => self.erc1155_claim_gas_threshold,
        }
    }

    /// Apply `BRIDGE_*` overrides from the environment
    fn apply_env_overrides(&mut self) {
        let overrides: [(&str, &mut u64); 7] = [
            ("BRIDGE_NO_OWNER_GAS_LIMIT", &mut self.no_owner_gas_limit),
            (
                "BRIDGE_ERC20_NOT_DEPLOYED_GAS_LIMIT",
                &mut self.erc20_not_deployed_gas_limit,
            ),
            (
                "BRIDGE_ERC721_NOT_DEPLOYED_GAS_LIMIT",
                &mut self.erc721_not_deployed_gas_limit,
            ),
            (
                "BRIDGE_ERC1155_NOT_DEPLOYED_GAS_LIMIT",
                &mut self.erc1155_not_deployed_gas_limit,
            ),
            (
                "BRIDGE_ERC20_CLAIM_GAS_THRESHOLD",
                &mut self.erc20_claim_gas_threshold,
            ),
            (
                "BRIDGE_ERC721_CLAIM_GAS_THRESHOLD",
                &mut self.erc721_claim_gas_threshold,
            ),
            (
                "BRIDGE_ERC1155_CLAIM_GAS_THRESHOLD",
                &mut self.erc1155_claim_gas_threshold,
            ),
        ];

        for (name, slot) in overrides {
            if let Some(value) = env::var(name).ok().and_then(|v| v.parse().ok()) {
                *slot = value;
            }
        }
    }
}

fn default_no_owner_gas_limit() -> u64 {
    140_000
}

fn default_erc20_not_deployed_gas_limit() -> u64 {
    3_000_000
}

fn default_erc721_not_deployed_gas_limit() -> u64 {
    2_400_000
}

fn default_erc1155_not_deployed_gas_limit() -> u64 {
    3_100_000
}

fn default_erc20_claim_gas_threshold() -> u64 {
    2_500_000
}

fn default_nft_claim_gas_threshold() -> u64 {
    3_000_000
}

/// Main configuration for the bridge client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeConfig {
    pub chains: Vec<ChainConfig>,
    pub routes: Vec<RouteConfig>,
    #[serde(default)]
    pub gas: GasLimitConfig,
}

impl BridgeConfig {
    /// Load `.env` if present, then the routing file named by `BRIDGE_CONFIG_PATH`
    pub fn load() -> Result<Self> {
        if Path::new(".env").exists() {
            dotenvy::dotenv().wrap_err("Failed to load .env file")?;
        }
        let path = env::var("BRIDGE_CONFIG_PATH").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into());
        Self::load_from_file(&path)
    }

    /// Load from a specific routing file, then apply env overrides
    pub fn load_from_file(path: &str) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("Failed to read bridge config from {}", path))?;
        let mut config = Self::from_json(&raw)?;
        config.gas.apply_env_overrides();
        Ok(config)
    }

    /// Parse and validate a routing document
    pub fn from_json(raw: &str) -> Result<Self> {
        let config: BridgeConfig =
            serde_json::from_str(raw).wrap_err("Failed to parse bridge config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn chain(&self, chain_id: u64) -> Option<&ChainConfig> {
        self.chains.iter().find(|c| c.chain_id == chain_id)
    }

    /// Contracts on `src_chain_id` for transfers towards `dest_chain_id`
    pub fn route(
        &self,
        src_chain_id: u64,
        dest_chain_id: u64,
    ) -> std::result::Result<&RouteContracts, BridgeError> {
        self.routes
            .iter()
            .find(|r| r.src_chain_id == src_chain_id && r.dest_chain_id == dest_chain_id)
            .map(|r| &r.contracts)
            .ok_or(BridgeError::MissingContracts {
                src_chain_id,
                dest_chain_id,
            })
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.chains.is_empty() {
            return Err(eyre!("At least one chain must be configured"));
        }

        let mut seen = HashSet::new();
        for chain in &self.chains {
            if !seen.insert(chain.chain_id) {
                return Err(eyre!(
                    "Duplicate chain ID: {} (chain: {})",
                    chain.chain_id,
                    chain.name
                ));
            }
            validate_rpc_url(&chain.rpc_url, &chain.name)?;
        }

        let mut seen_routes = HashSet::new();
        for route in &self.routes {
            if route.src_chain_id == route.dest_chain_id {
                return Err(eyre!(
                    "Route source and destination are both chain {}",
                    route.src_chain_id
                ));
            }
            for chain_id in [route.src_chain_id, route.dest_chain_id] {
                if self.chain(chain_id).is_none() {
                    return Err(eyre!("Route references unknown chain {}", chain_id));
                }
            }
            if !seen_routes.insert((route.src_chain_id, route.dest_chain_id)) {
                return Err(eyre!(
                    "Duplicate route {} -> {}",
                    route.src_chain_id,
                    route.dest_chain_id
                ));
            }
            if route.contracts.bridge == Address::ZERO {
                return Err(eyre!(
                    "Bridge address is zero for route {} -> {}",
                    route.src_chain_id,
                    route.dest_chain_id
                ));
            }
        }

        Ok(())
    }
}

/// Validates that a URL uses http/https and has a host component.
pub fn validate_rpc_url(url_str: &str, name: &str) -> Result<()> {
    let parsed =
        url::Url::parse(url_str).map_err(|e| eyre!("{} RPC URL must be a valid URL: {}", name, e))?;

    let scheme = parsed.scheme();
    if scheme != "http" && scheme != "https" {
        return Err(eyre!(
            "{} RPC URL must use http:// or https:// scheme, got {}",
            name,
            scheme
        ));
    }

    if parsed.host_str().is_none() {
        return Err(eyre!("{} RPC URL must have a host component", name));
    }

    Ok(())
}

/// Read and check the signing key from `BRIDGE_PRIVATE_KEY`
pub fn load_private_key() -> Result<Redacted<String>> {
    let key = env::var("BRIDGE_PRIVATE_KEY")
        .map_err(|_| eyre!("BRIDGE_PRIVATE_KEY environment variable is required"))?;
    validate_private_key(&key)?;
    Ok(Redacted::new(key))
}

fn validate_private_key(key: &str) -> Result<()> {
    let hex_part = key
        .strip_prefix("0x")
        .ok_or_else(|| eyre!("private key must be 0x-prefixed"))?;
    if hex_part.len() != 64 || hex::decode(hex_part).is_err() {
        return Err(eyre!("private key must be 66 chars (0x + 64 hex chars)"));
    }
    Ok(())
}
