//! Contract-call layer
//!
//! [`ContractClient`] is the seam between the bridge workflow and the chain:
//! four primitives (read, estimate, simulate, write) keyed by chain id.
//! [`AlloyContractClient`] implements it over HTTP providers with a local
//! private-key wallet.

use alloy::{
    network::{Ethereum, EthereumWallet, TransactionBuilder},
    primitives::{Address, Bytes, TxHash, U256},
    providers::{
        fillers::{FillProvider, JoinFill, WalletFiller},
        Identity, Provider, ProviderBuilder, RootProvider,
    },
    rpc::types::TransactionRequest,
    signers::local::PrivateKeySigner,
    sol_types::SolCall,
    transports::http::{Client, Http},
};
use async_trait::async_trait;
use eyre::{eyre, Result as EyreResult, WrapErr};
use std::collections::HashMap;
use tracing::{debug, info};

use crate::config::BridgeConfig;
use crate::error::CallError;
use crate::redact::Redacted;

/// A single contract interaction, before it is turned into a read, a
/// simulation or a transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractRequest {
    pub chain_id: u64,
    pub from: Option<Address>,
    pub to: Address,
    pub input: Bytes,
    pub value: U256,
    /// Explicit gas limit; `None` lets the node estimate
    pub gas: Option<u64>,
}

impl ContractRequest {
    /// Encode `call` against the contract at `to` on `chain_id`
    pub fn new<C: SolCall>(chain_id: u64, to: Address, call: &C) -> Self {
        Self {
            chain_id,
            from: None,
            to,
            input: call.abi_encode().into(),
            value: U256::ZERO,
            gas: None,
        }
    }

    pub fn from(mut self, account: Address) -> Self {
        self.from = Some(account);
        self
    }

    pub fn value(mut self, value: U256) -> Self {
        self.value = value;
        self
    }

    pub fn gas(mut self, gas: Option<u64>) -> Self {
        self.gas = gas;
        self
    }

    /// First four bytes of the calldata
    pub fn selector(&self) -> Option<[u8; 4]> {
        self.input.get(..4).and_then(|s| s.try_into().ok())
    }

    /// Decode the calldata back into `C`, if it was encoded from `C`
    pub fn decode<C: SolCall>(&self) -> Option<C> {
        C::abi_decode(&self.input, true).ok()
    }

    fn to_transaction_request(&self) -> TransactionRequest {
        let mut tx = TransactionRequest::default()
            .with_to(self.to)
            .with_input(self.input.clone())
            .with_value(self.value)
            .with_chain_id(self.chain_id);
        if let Some(from) = self.from {
            tx = tx.with_from(from);
        }
        if let Some(gas) = self.gas {
            tx = tx.with_gas_limit(gas);
        }
        tx
    }
}

/// Read, simulate and write primitives against deployed contracts
#[async_trait]
pub trait ContractClient: Send + Sync {
    /// `eth_call` without a sender; returns raw return data
    async fn read(&self, request: &ContractRequest) -> Result<Bytes, CallError>;

    /// Gas the node expects the request to consume
    async fn estimate_gas(&self, request: &ContractRequest) -> Result<u64, CallError>;

    /// `eth_call` from the sender with value and gas; fails if the write would revert
    async fn simulate(&self, request: &ContractRequest) -> Result<Bytes, CallError>;

    /// Sign and broadcast; returns the transaction hash without waiting for inclusion
    async fn write(&self, request: &ContractRequest) -> Result<TxHash, CallError>;
}

/// Typed read: encode `call`, run it, decode its return values
pub async fn read_contract<C: SolCall + Send>(
    client: &dyn ContractClient,
    chain_id: u64,
    to: Address,
    call: C,
) -> Result<C::Return, CallError> {
    let request = ContractRequest::new(chain_id, to, &call);
    let data = client.read(&request).await?;
    Ok(C::abi_decode_returns(&data, true)?)
}

type WalletProvider = FillProvider<
    JoinFill<Identity, WalletFiller<EthereumWallet>>,
    RootProvider<Http<Client>>,
    Http<Client>,
    Ethereum,
>;

/// [`ContractClient`] over alloy HTTP providers, one per configured chain
pub struct AlloyContractClient {
    providers: HashMap<u64, RootProvider<Http<Client>>>,
    signers: HashMap<u64, WalletProvider>,
    account: Option<Address>,
}

impl AlloyContractClient {
    /// Read-only client for every chain in `config`
    pub fn new_readonly(config: &BridgeConfig) -> EyreResult<Self> {
        let mut providers = HashMap::new();
        for chain in &config.chains {
            let url: url::Url = chain
                .rpc_url
                .parse()
                .wrap_err_with(|| format!("Invalid RPC URL for chain {}", chain.chain_id))?;
            providers.insert(chain.chain_id, ProviderBuilder::new().on_http(url));
        }

        info!(chains = providers.len(), "Created read-only contract client");

        Ok(Self {
            providers,
            signers: HashMap::new(),
            account: None,
        })
    }

    /// Client that can also sign and send with `private_key` on every chain
    pub fn new_with_signer(config: &BridgeConfig, private_key: &Redacted<String>) -> EyreResult<Self> {
        let signer: PrivateKeySigner = private_key
            .expose()
            .parse()
            .map_err(|e| eyre!("Invalid private key: {}", e))?;
        let account = signer.address();
        let wallet = EthereumWallet::from(signer);

        let mut client = Self::new_readonly(config)?;
        for chain in &config.chains {
            let url: url::Url = chain
                .rpc_url
                .parse()
                .wrap_err_with(|| format!("Invalid RPC URL for chain {}", chain.chain_id))?;
            let provider = ProviderBuilder::new().wallet(wallet.clone()).on_http(url);
            client.signers.insert(chain.chain_id, provider);
        }
        client.account = Some(account);

        info!(address = %account, "Contract client signer initialized");

        Ok(client)
    }

    /// Address of the signing account, if any
    pub fn account(&self) -> Option<Address> {
        self.account
    }

    /// Read-only provider for `chain_id`
    pub fn provider(&self, chain_id: u64) -> Result<&RootProvider<Http<Client>>, CallError> {
        self.providers
            .get(&chain_id)
            .ok_or_else(|| CallError::new(format!("no RPC configured for chain {}", chain_id)))
    }

    fn signer(&self, chain_id: u64) -> Result<(&WalletProvider, Address), CallError> {
        match (self.signers.get(&chain_id), self.account) {
            (Some(provider), Some(account)) => Ok((provider, account)),
            _ => Err(CallError::new(format!(
                "no signer configured for chain {}",
                chain_id
            ))),
        }
    }
}

#[async_trait]
impl ContractClient for AlloyContractClient {
    async fn read(&self, request: &ContractRequest) -> Result<Bytes, CallError> {
        let provider = self.provider(request.chain_id)?;
        let tx = request.to_transaction_request();
        Ok(provider.call(&tx).await?)
    }

    async fn estimate_gas(&self, request: &ContractRequest) -> Result<u64, CallError> {
        let provider = self.provider(request.chain_id)?;
        let mut tx = request.to_transaction_request();
        if request.from.is_none() {
            if let Some(account) = self.account {
                tx = tx.with_from(account);
            }
        }
        Ok(provider.estimate_gas(&tx).await?)
    }

    async fn simulate(&self, request: &ContractRequest) -> Result<Bytes, CallError> {
        let provider = self.provider(request.chain_id)?;
        let mut tx = request.to_transaction_request();
        if request.from.is_none() {
            if let Some(account) = self.account {
                tx = tx.with_from(account);
            }
        }
        let result = provider.call(&tx).await?;
        debug!(chain_id = request.chain_id, to = %request.to, "Simulation succeeded");
        Ok(result)
    }

    async fn write(&self, request: &ContractRequest) -> Result<TxHash, CallError> {
        let (provider, account) = self.signer(request.chain_id)?;
        let from = request.from.unwrap_or(account);
        if from != account {
            return Err(CallError::new(format!(
                "request sender {} does not match signer {}",
                from, account
            )));
        }

        let mut tx = request.to_transaction_request().with_from(from);

        let nonce = provider.get_transaction_count(from).await?;
        let gas = match request.gas {
            Some(gas) => gas,
            None => provider.estimate_gas(&tx).await?,
        };
        let fees = provider.estimate_eip1559_fees(None).await?;

        tx = tx
            .with_nonce(nonce)
            .with_gas_limit(gas)
            .with_max_fee_per_gas(fees.max_fee_per_gas)
            .with_max_priority_fee_per_gas(fees.max_priority_fee_per_gas);

        let pending = provider.send_transaction(tx).await?;
        let tx_hash = *pending.tx_hash();

        info!(
            chain_id = request.chain_id,
            to = %request.to,
            nonce = nonce,
            gas = gas,
            tx_hash = %tx_hash,
            "Transaction sent"
        );

        Ok(tx_hash)
    }
}
