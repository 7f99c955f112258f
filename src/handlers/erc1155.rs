use alloy::primitives::Address;
use tracing::{debug, info};

use crate::client::{read_contract, ContractRequest};
use crate::contracts::{INFTVault, ERC1155};
use crate::error::{BridgeError, CallError, Result};
use crate::lifecycle::{self, BridgeContext};
use crate::types::{ApproveArgs, BridgeTransferArgs, ClaimArgs, TokenType, TxHandle};

use super::build_nft_transfer_op;

/// ERC1155 handler: operator approval through `setApprovalForAll(vault, true)`
pub struct Erc1155Bridge {
    ctx: BridgeContext,
}

impl Erc1155Bridge {
    pub fn new(ctx: BridgeContext) -> Self {
        Self { ctx }
    }

    pub async fn check_approval(
        &self,
        chain_id: u64,
        token: Address,
        owner: Address,
        operator: Address,
    ) -> Result<bool, CallError> {
        Ok(read_contract(
            self.ctx.client.as_ref(),
            chain_id,
            token,
            ERC1155::isApprovedForAllCall {
                account: owner,
                operator,
            },
        )
        .await?
        ._0)
    }

    pub async fn is_token_approved(&self, args: &ApproveArgs) -> Result<bool> {
        let (account, chain_id) = args.wallet.require()?;
        Ok(self
            .check_approval(chain_id, args.token, account, args.spender)
            .await?)
    }

    fn transfer_request(&self, args: &BridgeTransferArgs, account: Address) -> ContractRequest {
        let gas = &self.ctx.config.gas;
        let gas_limit = lifecycle::select_gas_limit(
            args.is_token_already_deployed,
            args.fee,
            gas.not_deployed_gas_limit(TokenType::Erc1155),
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
        Ok(self.ctx.client.estimate_gas(&request).await?)
    }

    pub async fn bridge(&self, args: &BridgeTransferArgs) -> Result<TxHandle> {
        let (account, _) = args.wallet.require()?;
        self.prepare(args, account)
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
            amounts = ?args.amounts,
            dest_chain_id = args.dest_chain_id,
            tx_hash = %tx_hash,
            "ERC1155 transfer sent"
        );
        Ok(tx_hash)
    }

    async fn prepare(&self, args: &BridgeTransferArgs, account: Address) -> Result<()> {
        let bridge = self.ctx.bridge_address(args.src_chain_id, args.dest_chain_id)?;
        lifecycle::ensure_bridge_not_paused(&self.ctx, args.src_chain_id, bridge).await?;

        let info = self
            .ctx
            .resolver
            .canonical_info(args.token, TokenType::Erc1155, args.src_chain_id, args.dest_chain_id)
            .await?
            .ok_or(BridgeError::NoCanonicalInfoFound { token: args.token })?;

        if !info.is_native(args.src_chain_id, args.token) {
            return Ok(());
        }

        let token_id = args
            .token_ids
            .first()
            .copied()
            .ok_or_else(|| BridgeError::SendFailed(CallError::new("no token ids to transfer")))?;
        if !self
            .check_approval(args.src_chain_id, args.token, account, args.token_vault)
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
        let threshold = self.ctx.config.gas.claim_gas_threshold(TokenType::Erc1155);
        lifecycle::claim_message(&self.ctx, args, threshold).await
    }

    pub async fn release(&self, args: &ClaimArgs) -> Result<Option<TxHandle>> {
        debug!(msg_hash = %args.msg_hash, "ERC1155 release is not supported");
        Ok(None)
    }

    pub async fn approve(&self, args: &ApproveArgs) -> Result<TxHandle> {
        let (account, chain_id) = args.wallet.require()?;

        let approved = self
            .check_approval(chain_id, args.token, account, args.spender)
            .await
            .map_err(|e| BridgeError::wrap(e, BridgeError::ApproveFailed))?;
        if approved {
            return Err(BridgeError::NoApprovalRequired { token: args.token });
        }

        let request = ContractRequest::new(
            chain_id,
            args.token,
            &ERC1155::setApprovalForAllCall {
                operator: args.spender,
                approved: true,
            },
        )
        .from(account);

        let tx_hash = lifecycle::simulate_and_write(&self.ctx, &request, BridgeError::ApproveFailed).await?;
        info!(
            token = %args.token,
            operator = %args.spender,
            tx_hash = %tx_hash,
            "ERC1155 operator approval sent"
        );
        Ok(tx_hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::tests::{bridged_info, native_info, token, transfer_args, Harness};
    use crate::lifecycle::tests::{claim_args, l1_contracts, script_status, user, L1, L2};
    use crate::testing::{CallKind, MOCK_TX_HASH};
    use crate::types::WalletContext;
    use alloy::primitives::U256;
    use alloy::sol_types::SolCall;

    fn vault() -> Address {
        l1_contracts().erc1155_vault
    }

    fn script_operator(harness: &Harness, approved: bool) {
        harness.mock.on_read::<ERC1155::isApprovedForAllCall>(
            token(),
            ERC1155::isApprovedForAllCall::abi_encode_returns(&(approved,)),
        );
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
    async fn test_bridge_native_without_operator_approval() {
        let harness = Harness::new(Some(native_info())).unpaused();
        script_operator(&harness, false);
        let handler = Erc1155Bridge::new(harness.ctx.clone());

        let err = handler.bridge(&transfer_args(vault())).await.unwrap_err();
        assert!(matches!(err, BridgeError::NotApproved { .. }));
        assert!(harness.mock.requests(CallKind::Write).is_empty());
    }

    #[tokio::test]
    async fn test_bridge_checks_owner_and_vault() {
        let harness = Harness::new(Some(native_info())).unpaused();
        script_operator(&harness, true);
        let handler = Erc1155Bridge::new(harness.ctx.clone());

        let mut args = transfer_args(vault());
        args.amounts = vec![U256::from(5)];
        assert_eq!(handler.bridge(&args).await.unwrap(), MOCK_TX_HASH);

        let check = harness
            .mock
            .requests(CallKind::Read)
            .iter()
            .find_map(|r| r.decode::<ERC1155::isApprovedForAllCall>())
            .unwrap();
        assert_eq!(check.account, user());
        assert_eq!(check.operator, vault());

        let op = harness.mock.requests(CallKind::Write)[0]
            .decode::<INFTVault::sendTokenCall>()
            .unwrap()
            .op;
        assert_eq!(op.amounts, vec![U256::from(5)]);
    }

    #[tokio::test]
    async fn test_bridge_bridged_token_skips_approval() {
        let harness = Harness::new(Some(bridged_info())).unpaused();
        let handler = Erc1155Bridge::new(harness.ctx.clone());

        handler.bridge(&transfer_args(vault())).await.unwrap();
        assert_eq!(harness.mock.read_count::<ERC1155::isApprovedForAllCall>(), 0);
    }

    #[tokio::test]
    async fn test_not_deployed_gas_limit() {
        let harness = Harness::new(Some(bridged_info())).unpaused();
        let handler = Erc1155Bridge::new(harness.ctx.clone());

        let mut args = transfer_args(vault());
        args.is_token_already_deployed = false;
        handler.bridge(&args).await.unwrap();

        let op = harness.mock.requests(CallKind::Write)[0]
            .decode::<INFTVault::sendTokenCall>()
            .unwrap()
            .op;
        assert_eq!(op.gasLimit, U256::from(3_100_000));
    }

    #[tokio::test]
    async fn test_approve_sets_operator() {
        let harness = Harness::new(None);
        script_operator(&harness, false);
        let handler = Erc1155Bridge::new(harness.ctx.clone());

        assert!(!handler.is_token_approved(&approve_args()).await.unwrap());
        handler.approve(&approve_args()).await.unwrap();

        let call: ERC1155::setApprovalForAllCall = harness.mock.requests(CallKind::Write)[0]
            .decode()
            .unwrap();
        assert_eq!(call.operator, vault());
        assert!(call.approved);
    }

    #[tokio::test]
    async fn test_approve_already_approved() {
        let harness = Harness::new(None);
        script_operator(&harness, true);
        let handler = Erc1155Bridge::new(harness.ctx.clone());

        let err = handler.approve(&approve_args()).await.unwrap_err();
        assert!(matches!(err, BridgeError::NoApprovalRequired { .. }));
        assert!(harness.mock.requests(CallKind::Write).is_empty());
    }

    #[tokio::test]
    async fn test_claim_uses_erc1155_threshold() {
        let harness = Harness::new(None);
        script_status(&harness.mock, 0);
        let handler = Erc1155Bridge::new(harness.ctx.clone());

        handler
            .claim(&claim_args(WalletContext::connected(user(), L2), 3_000_001))
            .await
            .unwrap();
        assert_eq!(harness.mock.requests(CallKind::Write)[0].gas, Some(3_000_001));
    }
}
