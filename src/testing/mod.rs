//! Testing Utilities Module
//!
//! In-memory stand-ins for the external collaborators of the bridge workflow:
//!
//! - [`MockContractClient`] - scripted reads, recorded simulations and writes
//! - [`StaticResolver`] - canonical token resolver returning a fixed answer
//! - [`StaticProver`] - signal prover returning a fixed proof

use alloy::primitives::{Address, Bytes, TxHash, B256};
use alloy::sol_types::SolCall;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::canonical::{CanonicalInfo, CanonicalTokenResolver};
use crate::client::{ContractClient, ContractRequest};
use crate::error::{BridgeError, CallError, Result};
use crate::prover::SignalProver;
use crate::types::TokenType;

/// Hash returned by every successful mock write
pub const MOCK_TX_HASH: TxHash = B256::repeat_byte(0xab);

/// Which primitive a recorded request went through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Read,
    EstimateGas,
    Simulate,
    Write,
}

#[derive(Default)]
struct MockState {
    reads: HashMap<(Address, [u8; 4]), Result<Bytes, CallError>>,
    gas_estimate: Option<Result<u64, CallError>>,
    simulate_error: Option<CallError>,
    write_error: Option<CallError>,
    calls: Vec<(CallKind, ContractRequest)>,
}

/// Contract client answering reads from a script and recording every request
#[derive(Default)]
pub struct MockContractClient {
    state: Mutex<MockState>,
}

impl MockContractClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer reads of `C` on `to` with ABI-encoded `data`
    pub fn on_read<C: SolCall>(&self, to: Address, data: Vec<u8>) -> &Self {
        self.lock()
            .reads
            .insert((to, C::SELECTOR), Ok(Bytes::from(data)));
        self
    }

    /// Fail reads of `C` on `to`
    pub fn fail_read<C: SolCall>(&self, to: Address, err: CallError) -> &Self {
        self.lock().reads.insert((to, C::SELECTOR), Err(err));
        self
    }

    pub fn set_gas_estimate(&self, gas: u64) -> &Self {
        self.lock().gas_estimate = Some(Ok(gas));
        self
    }

    pub fn fail_estimate(&self, err: CallError) -> &Self {
        self.lock().gas_estimate = Some(Err(err));
        self
    }

    pub fn fail_simulate(&self, err: CallError) -> &Self {
        self.lock().simulate_error = Some(err);
        self
    }

    pub fn fail_write(&self, err: CallError) -> &Self {
        self.lock().write_error = Some(err);
        self
    }

    /// Every request seen, in order
    pub fn calls(&self) -> Vec<(CallKind, ContractRequest)> {
        self.lock().calls.clone()
    }

    /// Requests that went through `kind`
    pub fn requests(&self, kind: CallKind) -> Vec<ContractRequest> {
        self.lock()
            .calls
            .iter()
            .filter(|(k, _)| *k == kind)
            .map(|(_, r)| r.clone())
            .collect()
    }

    /// Number of reads of `C`
    pub fn read_count<C: SolCall>(&self) -> usize {
        self.requests(CallKind::Read)
            .iter()
            .filter(|r| r.selector() == Some(C::SELECTOR))
            .count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn record(&self, kind: CallKind, request: &ContractRequest) {
        self.lock().calls.push((kind, request.clone()));
    }
}

#[async_trait]
impl ContractClient for MockContractClient {
    async fn read(&self, request: &ContractRequest) -> Result<Bytes, CallError> {
        self.record(CallKind::Read, request);
        let selector = request.selector().unwrap_or_default();
        self.lock()
            .reads
            .get(&(request.to, selector))
            .cloned()
            .unwrap_or_else(|| {
                Err(CallError::new(format!(
                    "no mock response for {} selector 0x{}",
                    request.to,
                    hex::encode(selector)
                )))
            })
    }

    async fn estimate_gas(&self, request: &ContractRequest) -> Result<u64, CallError> {
        self.record(CallKind::EstimateGas, request);
        self.lock().gas_estimate.clone().unwrap_or(Ok(21_000))
    }

    async fn simulate(&self, request: &ContractRequest) -> Result<Bytes, CallError> {
        self.record(CallKind::Simulate, request);
        match self.lock().simulate_error.clone() {
            Some(err) => Err(err),
            None => Ok(Bytes::new()),
        }
    }

    async fn write(&self, request: &ContractRequest) -> Result<TxHash, CallError> {
        self.record(CallKind::Write, request);
        match self.lock().write_error.clone() {
            Some(err) => Err(err),
            None => Ok(MOCK_TX_HASH),
        }
    }
}

/// Resolver returning the same answer for every token
pub struct StaticResolver {
    answer: std::result::Result<Option<CanonicalInfo>, CallError>,
    lookups: AtomicUsize,
}

impl StaticResolver {
    pub fn new(info: Option<CanonicalInfo>) -> Self {
        Self {
            answer: Ok(info),
            lookups: AtomicUsize::new(0),
        }
    }

    /// Every lookup fails with `err`
    pub fn failing(err: CallError) -> Self {
        Self {
            answer: Err(err),
            lookups: AtomicUsize::new(0),
        }
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CanonicalTokenResolver for StaticResolver {
    async fn canonical_info(
        &self,
        _token: Address,
        _token_type: TokenType,
        _src_chain_id: u64,
        _dest_chain_id: u64,
    ) -> crate::error::Result<Option<CanonicalInfo>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.answer.clone().map_err(BridgeError::Call)
    }
}

/// Prover returning a fixed proof and recording what it was asked for
pub struct StaticProver {
    proof: Bytes,
    requests: Mutex<Vec<(B256, u64, u64)>>,
}

impl StaticProver {
    pub fn new(proof: impl Into<Bytes>) -> Self {
        Self {
            proof: proof.into(),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<(B256, u64, u64)> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl SignalProver for StaticProver {
    async fn generate_proof_to_process_message(
        &self,
        msg_hash: B256,
        src_chain_id: u64,
        dest_chain_id: u64,
    ) -> Result<Bytes, CallError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push((msg_hash, src_chain_id, dest_chain_id));
        }
        Ok(self.proof.clone())
    }
}
