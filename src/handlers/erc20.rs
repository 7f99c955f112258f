use alloy::primitives::{Address, U256};
use tracing::{debug, info};

use crate::client::{read_contract, ContractRequest};
use crate::contracts::{BridgeTransferOp, IERC20Vault, ERC20};
use crate::error::{BridgeError, CallError, Result};
use crate::lifecycle::{self, BridgeContext};
use crate::types::{ApproveArgs, BridgeTransferArgs, ClaimArgs, TokenType, TxHandle};

/// ERC20 handler: allowance-based approval, one amount per transfer
pub struct Erc20Bridge {
    ctx: BridgeContext,
}

impl Erc20Bridge {
    pub fn new(ctx: BridgeContext) -> Self {
        Self { ctx }
    }

    pub async fn allowance(
        &self,
        chain_id: u64,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> Result<U256, CallError> {
        Ok(read_contract(
            self.ctx.client.as_ref(),
            chain_id,
            token,
            ERC20::allowanceCall { owner, spender },
        )
        .await?
        ._0)
    }

    /// Whether the current allowance already covers `args.amount`
    pub async fn is_token_approved(&self, args: &ApproveArgs) -> Result<bool> {
        let (account, chain_id) = args.wallet.require()?;
        let allowance = self
            .allowance(chain_id, args.token, account, args.spender)
            .await?;
        Ok(allowance >= args.amount)
    }

    fn amount(args: &BridgeTransferArgs) -> Result<U256> {
        args.amounts
            .first()
            .copied()
            .ok_or_else(|| BridgeError::SendFailed(CallError::new("no amount to transfer")))
    }

    fn transfer_request(
        &self,
        args: &BridgeTransferArgs,
        account: Address,
        amount: U256,
    ) -> ContractRequest {
        let gas = &self.ctx.config.gas;
        let op = BridgeTransferOp {
            destChainId: U256::from(args.dest_chain_id),
            to: args.to,
            token: args.token,
            amount,
            gasLimit: lifecycle::select_gas_limit(
                args.is_token_already_deployed,
                args.fee,
                gas.not_deployed_gas_limit(TokenType::Erc20),
                gas.no_owner_gas_limit,
            ),
            fee: args.fee,
            refundTo: account,
            memo: args.memo.clone(),
        };
        ContractRequest::new(args.src_chain_id, args.token_vault, &IERC20Vault::sendTokenCall { op })
            .from(account)
            .value(args.fee)
    }

    pub async fn estimate_gas(&self, args: &BridgeTransferArgs) -> Result<u64> {
        let (account, _) = args.wallet.require()?;
        let request = self.transfer_request(args, account, Self::amount(args)?);
        Ok(self.ctx.client.estimate_gas(&request).await?)
    }

    pub async fn bridge(&self, args: &BridgeTransferArgs) -> Result<TxHandle> {
        let (account, _) = args.wallet.require()?;
        let amount = Self::amount(args)?;

        self.prepare(args, account, amount)
            .await
            .map_err(lifecycle::into_send_failed)?;

        let request = self.transfer_request(args, account, amount);
        lifecycle::simulate_best_effort(&self.ctx, &request).await;

        let tx_hash = self
            .ctx
            .client
            .write(&request)
            .await
            .map_err(|e| BridgeError::wrap(e, BridgeError::SendFailed))?;

        info!(
            token = %args.token,
            amount = %amount,
            dest_chain_id = args.dest_chain_id,
            tx_hash = %tx_hash,
            "ERC20 transfer sent"
        );
        Ok(tx_hash)
    }

    async fn prepare(&self, args: &BridgeTransferArgs, account: Address, amount: U256) -> Result<()> {
        let bridge = self.ctx.bridge_address(args.src_chain_id, args.dest_chain_id)?;
        lifecycle::ensure_bridge_not_paused(&self.ctx, args.src_chain_id, bridge).await?;

        let info = self
            .ctx
            .resolver
            .canonical_info(args.token, TokenType::Erc20, args.src_chain_id, args.dest_chain_id)
            .await?
            .ok_or(BridgeError::NoCanonicalInfoFound { token: args.token })?;

        if !info.is_native(args.src_chain_id, args.token) {
            return Ok(());
        }

        let allowance = self
            .allowance(args.src_chain_id, args.token, account, args.token_vault)
            .await?;
        if allowance < amount {
            debug!(token = %args.token, allowance = %allowance, amount = %amount, "Allowance too low");
            return Err(BridgeError::InsufficientAllowance {
                token: args.token,
                required: amount,
            });
        }
        Ok(())
    }

    pub async fn claim(&self, args: &ClaimArgs) -> Result<TxHandle> {
        let threshold = self.ctx.config.gas.claim_gas_threshold(TokenType::Erc20);
        lifecycle::claim_message(&self.ctx, args, threshold).await
    }

    pub async fn release(&self, _args: &ClaimArgs) -> Result<Option<TxHandle>> {
        Ok(None)
    }

    pub async fn approve(&self, args: &ApproveArgs) -> Result<TxHandle> {
        let (account, chain_id) = args.wallet.require()?;

        let allowance = self
            .allowance(chain_id, args.token, account, args.spender)
            .await
            .map_err(|e| BridgeError::wrap(e, BridgeError::ApproveFailed))?;
        if allowance >= args.amount {
            return Err(BridgeError::NoApprovalRequired { token: args.token });
        }

        let request = ContractRequest::new(
            chain_id,
            args.token,
            &ERC20::approveCall {
                spender: args.spender,
                amount: args.amount,
            },
        )
        .from(account);

        let tx_hash = lifecycle::simulate_and_write(&self.ctx, &request, BridgeError::ApproveFailed).await?;
        info!(
            token = %args.token,
            spender = %args.spender,
            amount = %args.amount,
            tx_hash = %tx_hash,
            "ERC20 approval sent"
        );
        Ok(tx_hash)
    }
}
