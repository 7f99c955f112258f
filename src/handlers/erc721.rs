use alloy::primitives::{Address, U256};
use tracing::{debug, info};

use crate::client::{read_contract, ContractRequest};
use crate::contracts::{INFTVault, ERC721};
use crate::error::{BridgeError, CallError, Result};
use crate::lifecycle::{self, BridgeContext};
use crate::types::{ApproveArgs, BridgeTransferArgs, ClaimArgs, TokenType, TxHandle};

use super::build_nft_transfer_op;

/// ERC721 handler: per-token approval through `approve(vault, tokenId)`
pub struct Erc721Bridge {
    ctx: BridgeContext,
}

impl Erc721Bridge {
    pub fn new(ctx: BridgeContext) -> Self {
        Self { ctx }
    }

    /// Whether `spender` is the approved address of `token_id`
    pub async fn check_approval(
        &self,
        chain_id: u64,
        token: Address,
        spender: Address,
        token_id: U256,
    ) -> Result<bool, CallError> {
        let approved = read_contract(
            self.ctx.client.as_ref(),
            chain_id,
            token,
            ERC721::getApprovedCall { tokenId: token_id },
        )
        .await?
        ._0;
        Ok(approved == spender)
    }

    pub async fn is_token_approved(&self, args: &ApproveArgs) -> Result<bool> {
        let (_, chain_id) = args.wallet.require()?;
        Ok(self
            .check_approval(chain_id, args.token, args.spender, args.token_id)
            .await?)
    }

    fn transfer_request(&self, args: &BridgeTransferArgs, account: Address) -> ContractRequest {
        let gas = &self.ctx.config.gas;
        let gas_limit = lifecycle::select_gas_limit(
            args.is_token_already_deployed,
            args.fee,
            gas.not_deployed_gas_limit(TokenType::Erc721),
            gas.no_owner_gas_limit,
        );
        let op = build_nft_transfer_op(args, account, gas_limit);
        ContractRequest::new(args.src_chain_id, args.token_vault, &INFTVault::sendTokenCall { op })
            .from(account)
            .value(args.fee)
    }

    pub async fn estimate_gas(&self, args: &BridgeTransferArgs) -> Result<u64> {
        let (account, _) = args.wallet.require()?;
        let request = self.transfer_request(args, account);
        let gas = self.ctx.client.estimate_gas(&request).await?;
        debug!(token = %args.token, gas = gas, "Estimated ERC721 transfer gas");
        Ok(gas)
    }

    pub async fn bridge(&self, args: &BridgeTransferArgs) -> Result<TxHandle> {
        let (account, _) = args.wallet.require()?;
        self.prepare(args)
            .await
            .map_err(lifecycle::into_send_failed)?;

        let request = self.transfer_request(args, account);
        lifecycle::simulate_best_effort(&self.ctx, &request).await;

        let tx_hash = self
            .ctx
            .client
            .write(&request)
            .await
            .map_err(|e| BridgeError::wrap(e, BridgeError::SendFailed))?;

        info!(
            token = %args.token,
            token_ids = ?args.token_ids,
            src_chain_id = args.src_chain_id,
            dest_chain_id = args.dest_chain_id,
            tx_hash = %tx_hash,
            "ERC721 transfer sent"
        );
        Ok(tx_hash)
    }

    /// Pause, canonical and approval checks ahead of a send
    async fn prepare(&self, args: &BridgeTransferArgs) -> Result<()> {
        let bridge = self.ctx.bridge_address(args.src_chain_id, args.dest_chain_id)?;
        lifecycle::ensure_bridge_not_paused(&self.ctx, args.src_chain_id, bridge).await?;

        let info = self
            .ctx
            .resolver
            .canonical_info(args.token, TokenType::Erc721, args.src_chain_id, args.dest_chain_id)
            .await?
            .ok_or(BridgeError::NoCanonicalInfoFound { token: args.token })?;

        if !info.is_native(args.src_chain_id, args.token) {
            debug!(token = %args.token, "Bridged token, vault burns it without approval");
            return Ok(());
        }

        // Only the first token id is checked
        let token_id = args
            .token_ids
            .first()
            .copied()
            .ok_or_else(|| BridgeError::SendFailed(CallError::new("no token ids to transfer")))?;
        if !self
            .check_approval(args.src_chain_id, args.token, args.token_vault, token_id)
            .await?
        {
            return Err(BridgeError::NotApproved {
                token: args.token,
                token_id,
            });
        }

        Ok(())
    }

    pub async fn claim(&self, args: &ClaimArgs) -> Result<TxHandle> {
        let threshold = self.ctx.config.gas.claim_gas_threshold(TokenType::Erc721);
        lifecycle::claim_message(&self.ctx, args, threshold).await
    }

    pub async fn release(&self, args: &ClaimArgs) -> Result<Option<TxHandle>> {
        debug!(msg_hash = %args.msg_hash, "ERC721 release is not supported");
        Ok(None)
    }

    pub async fn approve(&self, args: &ApproveArgs) -> Result<TxHandle> {
        let (account, chain_id) = args.wallet.require()?;

        let approved = self
            .check_approval(chain_id, args.token, args.spender, args.token_id)
            .await
            .map_err(|e| BridgeError::wrap(e, BridgeError::ApproveFailed))?;
        if approved {
            return Err(BridgeError::NoApprovalRequired { token: args.token });
        }

        let request = ContractRequest::new(
            chain_id,
            args.token,
            &ERC721::approveCall {
                to: args.spender,
                tokenId: args.token_id,
            },
        )
        .from(account);

        let tx_hash = lifecycle::simulate_and_write(&self.ctx, &request, BridgeError::ApproveFailed).await?;
        info!(
            token = %args.token,
            spender = %args.spender,
            token_id = %args.token_id,
            tx_hash = %tx_hash,
            "ERC721 approval sent"
        );
        Ok(tx_hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::IBridge;
    use crate::handlers::tests::{bridged_info, native_info, token, transfer_args, Harness};
    use crate::lifecycle::tests::{claim_args, l1_contracts, l2_contracts, script_status, user, L1, L2};
    use crate::testing::{CallKind, StaticResolver, MOCK_TX_HASH};
    use crate::types::WalletContext;
    use alloy::sol_types::SolCall;

    fn vault() -> Address {
        l1_contracts().erc721_vault
    }

    fn script_approved(harness: &Harness, approved: Address) {
        harness.mock.on_read::<ERC721::getApprovedCall>(
            token(),
            ERC721::getApprovedCall::abi_encode_returns(&(approved,)),
        );
    }

    fn sent_op(harness: &Harness) -> crate::contracts::NFTBridgeTransferOp {
        let writes = harness.mock.requests(CallKind::Write);
        assert_eq!(writes.len(), 1);
        writes[0].decode::<INFTVault::sendTokenCall>().unwrap().op
    }

    #[tokio::test]
    async fn test_bridge_native_token_without_approval() {
        let harness = Harness::new(Some(native_info())).unpaused();
        script_approved(&harness, Address::ZERO);
        let handler = Erc721Bridge::new(harness.ctx.clone());

        let err = handler.bridge(&transfer_args(vault())).await.unwrap_err();
        assert!(matches!(
            err,
            BridgeError::NotApproved { token_id, .. } if token_id == U256::from(7)
        ));
        assert!(harness.mock.requests(CallKind::Write).is_empty());
    }

    #[tokio::test]
    async fn test_bridge_native_token_with_approval() {
        let harness = Harness::new(Some(native_info())).unpaused();
        script_approved(&harness, vault());
        let handler = Erc721Bridge::new(harness.ctx.clone());

        let tx_hash = handler.bridge(&transfer_args(vault())).await.unwrap();
        assert_eq!(tx_hash, MOCK_TX_HASH);

        let write = &harness.mock.requests(CallKind::Write)[0];
        assert_eq!(write.to, vault());
        assert_eq!(write.chain_id, L1);
        assert_eq!(write.from, Some(user()));
        assert_eq!(sent_op(&harness).refundTo, user());
    }

    #[tokio::test]
    async fn test_bridge_bridged_token_skips_approval() {
        let harness = Harness::new(Some(bridged_info())).unpaused();
        let handler = Erc721Bridge::new(harness.ctx.clone());

        handler.bridge(&transfer_args(vault())).await.unwrap();
        assert_eq!(harness.mock.read_count::<ERC721::getApprovedCall>(), 0);
        assert_eq!(harness.mock.requests(CallKind::Write).len(), 1);
    }

    #[tokio::test]
    async fn test_bridge_only_first_token_id_checked() {
        let harness = Harness::new(Some(native_info())).unpaused();
        script_approved(&harness, vault());
        let handler = Erc721Bridge::new(harness.ctx.clone());

        let mut args = transfer_args(vault());
        args.token_ids = vec![U256::from(7), U256::from(8), U256::from(9)];
        args.amounts = vec![U256::from(1); 3];
        handler.bridge(&args).await.unwrap();

        let reads = harness.mock.requests(CallKind::Read);
        let checked: Vec<U256> = reads
            .iter()
            .filter_map(|r| r.decode::<ERC721::getApprovedCall>())
            .map(|c| c.tokenId)
            .collect();
        assert_eq!(checked, vec![U256::from(7)]);
        assert_eq!(sent_op(&harness).tokenIds.len(), 3);
    }

    #[tokio::test]
    async fn test_bridge_no_canonical_info() {
        let harness = Harness::new(None).unpaused();
        let handler = Erc721Bridge::new(harness.ctx.clone());

        let err = handler.bridge(&transfer_args(vault())).await.unwrap_err();
        assert!(matches!(err, BridgeError::NoCanonicalInfoFound { token: t } if t == token()));
        assert!(harness.mock.requests(CallKind::Write).is_empty());
    }

    #[tokio::test]
    async fn test_bridge_paused_before_token_reads() {
        let harness = Harness::new(Some(native_info()));
        harness.mock.on_read::<IBridge::pausedCall>(
            l1_contracts().bridge,
            IBridge::pausedCall::abi_encode_returns(&(true,)),
        );
        let handler = Erc721Bridge::new(harness.ctx.clone());

        let err = handler.bridge(&transfer_args(vault())).await.unwrap_err();
        assert!(matches!(err, BridgeError::BridgePaused));
        assert_eq!(harness.resolver.lookups(), 0);
        assert_eq!(harness.mock.read_count::<ERC721::getApprovedCall>(), 0);
        assert!(harness.mock.requests(CallKind::Write).is_empty());
    }

    #[tokio::test]
    async fn test_bridge_requires_wallet() {
        let harness = Harness::new(Some(bridged_info())).unpaused();
        let handler = Erc721Bridge::new(harness.ctx.clone());

        let mut args = transfer_args(vault());
        args.wallet = WalletContext::default();
        let err = handler.bridge(&args).await.unwrap_err();
        assert!(matches!(err, BridgeError::WalletNotConnected));
        assert!(harness.mock.calls().is_empty());
    }

    #[tokio::test]
    async fn test_bridge_gas_limit_rule() {
        // not deployed on destination
        let harness = Harness::new(Some(bridged_info())).unpaused();
        let mut args = transfer_args(vault());
        args.is_token_already_deployed = false;
        args.fee = U256::from(100);
        Erc721Bridge::new(harness.ctx.clone()).bridge(&args).await.unwrap();
        assert_eq!(sent_op(&harness).gasLimit, U256::from(2_400_000));
        assert_eq!(harness.mock.requests(CallKind::Write)[0].value, U256::from(100));

        // deployed, fee paid
        let harness = Harness::new(Some(bridged_info())).unpaused();
        args.is_token_already_deployed = true;
        Erc721Bridge::new(harness.ctx.clone()).bridge(&args).await.unwrap();
        assert_eq!(sent_op(&harness).gasLimit, U256::from(140_000));

        // deployed, no fee
        let harness = Harness::new(Some(bridged_info())).unpaused();
        args.fee = U256::ZERO;
        Erc721Bridge::new(harness.ctx.clone()).bridge(&args).await.unwrap();
        assert_eq!(sent_op(&harness).gasLimit, U256::ZERO);
    }

    #[tokio::test]
    async fn test_bridge_simulation_failure_still_sends() {
        let harness = Harness::new(Some(bridged_info())).unpaused();
        harness.mock.fail_simulate(CallError::new("execution reverted"));
        let handler = Erc721Bridge::new(harness.ctx.clone());

        let tx_hash = handler.bridge(&transfer_args(vault())).await.unwrap();
        assert_eq!(tx_hash, MOCK_TX_HASH);
        assert_eq!(harness.mock.requests(CallKind::Simulate).len(), 1);
    }

    #[tokio::test]
    async fn test_bridge_write_failure_is_send_failed() {
        let harness = Harness::new(Some(bridged_info())).unpaused();
        harness.mock.fail_write(CallError::new("nonce too low"));
        let handler = Erc721Bridge::new(harness.ctx.clone());

        let err = handler.bridge(&transfer_args(vault())).await.unwrap_err();
        assert!(matches!(err, BridgeError::SendFailed(_)));
    }

    #[tokio::test]
    async fn test_bridge_approval_read_failure_is_send_failed() {
        let harness = Harness::new(Some(native_info())).unpaused();
        harness.mock.fail_read::<ERC721::getApprovedCall>(token(), CallError::new("timeout"));
        let handler = Erc721Bridge::new(harness.ctx.clone());

        let err = handler.bridge(&transfer_args(vault())).await.unwrap_err();
        assert!(matches!(err, BridgeError::SendFailed(_)));
    }

    #[tokio::test]
    async fn test_bridge_canonical_lookup_failure_is_send_failed() {
        let harness =
            Harness::with_resolver(StaticResolver::failing(CallError::new("timeout"))).unpaused();
        let handler = Erc721Bridge::new(harness.ctx.clone());

        let err = handler.bridge(&transfer_args(vault())).await.unwrap_err();
        assert!(matches!(err, BridgeError::SendFailed(ref e) if e.message == "timeout"));
        assert_eq!(harness.resolver.lookups(), 1);
        assert_eq!(harness.mock.read_count::<ERC721::getApprovedCall>(), 0);
        assert!(harness.mock.requests(CallKind::Write).is_empty());
    }

    #[tokio::test]
    async fn test_user_rejection_from_every_operation() {
        let denied = || CallError::new("MetaMask Tx Signature: User denied transaction signature.");

        let harness = Harness::new(Some(bridged_info())).unpaused();
        harness.mock.fail_write(denied());
        let handler = Erc721Bridge::new(harness.ctx.clone());
        let err = handler.bridge(&transfer_args(vault())).await.unwrap_err();
        assert!(matches!(err, BridgeError::UserRejected(_)));

        let harness = Harness::new(None);
        script_approved(&harness, Address::ZERO);
        harness.mock.fail_simulate(denied());
        let handler = Erc721Bridge::new(harness.ctx.clone());
        let err = handler.approve(&approve_args()).await.unwrap_err();
        assert!(matches!(err, BridgeError::UserRejected(_)));

        let harness = Harness::new(None);
        script_status(&harness.mock, 0);
        harness.mock.fail_write(denied());
        let handler = Erc721Bridge::new(harness.ctx.clone());
        let err = handler
            .claim(&claim_args(WalletContext::connected(user(), L2), 0))
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::UserRejected(_)));
    }

    #[tokio::test]
    async fn test_estimate_gas() {
        let harness = Harness::new(None);
        harness.mock.set_gas_estimate(123_456);
        let handler = Erc721Bridge::new(harness.ctx.clone());

        let mut args = transfer_args(vault());
        args.fee = U256::from(9);
        assert_eq!(handler.estimate_gas(&args).await.unwrap(), 123_456);

        let estimates = harness.mock.requests(CallKind::EstimateGas);
        assert_eq!(estimates.len(), 1);
        assert_eq!(estimates[0].value, U256::from(9));
        assert!(harness.mock.requests(CallKind::Write).is_empty());
    }

    fn approve_args() -> ApproveArgs {
        ApproveArgs {
            wallet: WalletContext::connected(user(), L1),
            token: token(),
            spender: vault(),
            token_id: U256::from(7),
            amount: U256::ZERO,
        }
    }

    #[tokio::test]
    async fn test_approve_already_approved() {
        let harness = Harness::new(None);
        script_approved(&harness, vault());
        let handler = Erc721Bridge::new(harness.ctx.clone());

        assert!(handler.is_token_approved(&approve_args()).await.unwrap());
        let err = handler.approve(&approve_args()).await.unwrap_err();
        assert!(matches!(err, BridgeError::NoApprovalRequired { .. }));
        assert!(harness.mock.requests(CallKind::Write).is_empty());
    }

    #[tokio::test]
    async fn test_approve_sends_approve_call() {
        let harness = Harness::new(None);
        script_approved(&harness, Address::ZERO);
        let handler = Erc721Bridge::new(harness.ctx.clone());

        assert_eq!(handler.approve(&approve_args()).await.unwrap(), MOCK_TX_HASH);

        let writes = harness.mock.requests(CallKind::Write);
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].to, token());
        let call: ERC721::approveCall = writes[0].decode().unwrap();
        assert_eq!(call.to, vault());
        assert_eq!(call.tokenId, U256::from(7));
    }

    #[tokio::test]
    async fn test_approve_failure_wrapped() {
        let harness = Harness::new(None);
        script_approved(&harness, Address::ZERO);
        harness.mock.fail_write(CallError::new("execution reverted"));
        let handler = Erc721Bridge::new(harness.ctx.clone());

        let err = handler.approve(&approve_args()).await.unwrap_err();
        assert!(matches!(err, BridgeError::ApproveFailed(_)));
    }

    #[tokio::test]
    async fn test_claim_above_threshold_passes_gas() {
        let harness = Harness::new(None);
        script_status(&harness.mock, 0);
        let handler = Erc721Bridge::new(harness.ctx.clone());

        let args = claim_args(WalletContext::connected(user(), L2), 3_500_000);
        handler.claim(&args).await.unwrap();

        let simulations = harness.mock.requests(CallKind::Simulate);
        let writes = harness.mock.requests(CallKind::Write);
        assert_eq!(simulations[0].gas, Some(3_500_000));
        assert_eq!(writes[0].gas, Some(3_500_000));
        assert_eq!(writes[0].to, l2_contracts().bridge);
    }

    #[tokio::test]
    async fn test_claim_at_threshold_passes_no_gas() {
        let harness = Harness::new(None);
        script_status(&harness.mock, 0);
        let handler = Erc721Bridge::new(harness.ctx.clone());

        let args = claim_args(WalletContext::connected(user(), L2), 3_000_000);
        handler.claim(&args).await.unwrap();

        assert_eq!(harness.mock.requests(CallKind::Simulate)[0].gas, None);
        assert_eq!(harness.mock.requests(CallKind::Write)[0].gas, None);
        assert_eq!(harness.prover.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_claim_retriable_never_writes() {
        let harness = Harness::new(None);
        script_status(&harness.mock, 1);
        let handler = Erc721Bridge::new(harness.ctx.clone());

        let err = handler
            .claim(&claim_args(WalletContext::connected(user(), L2), 0))
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::NotImplemented(_)));
        assert!(harness.mock.requests(CallKind::Write).is_empty());
    }

    #[tokio::test]
    async fn test_release_returns_none() {
        let harness = Harness::new(None);
        let handler = Erc721Bridge::new(harness.ctx.clone());
        let args = claim_args(WalletContext::connected(user(), L2), 0);
        assert!(handler.release(&args).await.unwrap().is_none());
    }
}
