//! Rollup Bridge CLI
//!
//! Drives the bridge from a terminal with a local private key:
//! - rollup-bridge status          -> pause status of every configured route
//! - rollup-bridge approve         -> grant the vault access to a token
//! - rollup-bridge estimate        -> gas estimate for a transfer
//! - rollup-bridge bridge          -> send tokens to the other chain
//! - rollup-bridge claim           -> process a message on its destination chain
//! - rollup-bridge message-status  -> status of a message on the destination bridge

use alloy::primitives::{Address, Bytes, B256, U256};
use clap::{Parser, Subcommand};
use color_eyre::eyre::{eyre, Result, WrapErr};
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use rollup_bridge::{
    config::load_private_key, contracts::Message, lifecycle, AlloyContractClient, ApproveArgs,
    BridgeConfig, BridgeContext, BridgeTransferArgs, ClaimArgs, ContractClient, RpcSignalProver,
    TokenBridge, TokenType, VaultCanonicalResolver, WalletContext,
};

#[derive(Parser)]
#[command(name = "rollup-bridge")]
#[command(about = "Bridge tokens between an L1 and a rollup L2", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Routing file (overrides BRIDGE_CONFIG_PATH)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show pause status of every configured route
    Status,

    /// Approve the source vault to move a token
    Approve {
        #[command(flatten)]
        route: RouteArgs,

        /// Token address on the source chain
        #[arg(long)]
        token: Address,

        /// NFT token id
        #[arg(long, value_parser = parse_u256, default_value = "0")]
        token_id: U256,

        /// ERC20 allowance to grant
        #[arg(long, value_parser = parse_u256, default_value = "0")]
        amount: U256,
    },

    /// Estimate gas for a transfer
    Estimate {
        #[command(flatten)]
        transfer: TransferArgs,
    },

    /// Send tokens to the destination chain
    Bridge {
        #[command(flatten)]
        transfer: TransferArgs,
    },

    /// Claim a message on its destination chain
    Claim {
        /// JSON file holding the message emitted on the source chain
        #[arg(long)]
        message: PathBuf,

        /// Message hash; computed by the source bridge when omitted
        #[arg(long)]
        msg_hash: Option<B256>,

        #[arg(long, value_parser = parse_token_type, default_value = "ERC721")]
        token_type: TokenType,
    },

    /// Show the status of a message on the destination bridge
    MessageStatus {
        #[command(flatten)]
        route: RouteArgs,

        #[arg(long)]
        msg_hash: B256,
    },
}

#[derive(clap::Args)]
struct RouteArgs {
    #[arg(long, value_parser = parse_token_type, default_value = "ERC721")]
    token_type: TokenType,

    /// Source chain id
    #[arg(long)]
    src: u64,

    /// Destination chain id
    #[arg(long)]
    dest: u64,
}

#[derive(clap::Args)]
struct TransferArgs {
    #[command(flatten)]
    route: RouteArgs,

    /// Token address on the source chain
    #[arg(long)]
    token: Address,

    /// Recipient on the destination chain (defaults to the sender)
    #[arg(long)]
    to: Option<Address>,

    /// Relayer fee in wei
    #[arg(long, value_parser = parse_u256, default_value = "0")]
    fee: U256,

    /// NFT token ids, repeatable
    #[arg(long = "token-id", value_parser = parse_u256)]
    token_ids: Vec<U256>,

    /// Amounts, one per token id (ERC721 defaults to 1 each) or a single ERC20 amount
    #[arg(long = "amount", value_parser = parse_u256)]
    amounts: Vec<U256>,

    #[arg(long, default_value = "")]
    memo: String,

    /// The bridged token does not exist on the destination chain yet
    #[arg(long)]
    not_deployed: bool,
}

/// Message JSON as emitted in the source chain's `MessageSent` event
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessageFile {
    id: U256,
    from: Address,
    src_chain_id: U256,
    dest_chain_id: U256,
    user: Address,
    to: Address,
    refund_to: Address,
    value: U256,
    fee: U256,
    gas_limit: U256,
    data: Bytes,
    memo: String,
}

impl From<MessageFile> for Message {
    fn from(m: MessageFile) -> Self {
        Message {
            id: m.id,
            from: m.from,
            srcChainId: m.src_chain_id,
            destChainId: m.dest_chain_id,
            user: m.user,
            to: m.to,
            refundTo: m.refund_to,
            value: m.value,
            fee: m.fee,
            gasLimit: m.gas_limit,
            data: m.data,
            memo: m.memo,
        }
    }
}

fn parse_u256(s: &str) -> std::result::Result<U256, String> {
    s.parse::<U256>().map_err(|e| e.to_string())
}

fn parse_token_type(s: &str) -> std::result::Result<TokenType, String> {
    match s.to_ascii_uppercase().as_str() {
        "ERC20" => Ok(TokenType::Erc20),
        "ERC721" => Ok(TokenType::Erc721),
        "ERC1155" => Ok(TokenType::Erc1155),
        other => Err(format!("unknown token type {}", other)),
    }
}

/// Everything a command needs: config, signer account and the bridge context
struct Session {
    config: Arc<BridgeConfig>,
    account: Address,
    ctx: BridgeContext,
}

impl Session {
    fn open(config: BridgeConfig) -> Result<Self> {
        let config = Arc::new(config);
        let private_key = load_private_key()?;
        let client = Arc::new(AlloyContractClient::new_with_signer(&config, &private_key)?);
        let account = client
            .account()
            .ok_or_else(|| eyre!("contract client has no signer"))?;

        let contract_client: Arc<dyn ContractClient> = client.clone();
        let resolver = Arc::new(VaultCanonicalResolver::new(
            contract_client.clone(),
            config.clone(),
        ));
        let prover = Arc::new(RpcSignalProver::new(client, config.clone()));
        let ctx = BridgeContext::new(config.clone(), contract_client, resolver, prover);

        Ok(Self {
            config,
            account,
            ctx,
        })
    }

    fn wallet(&self, chain_id: u64) -> WalletContext {
        WalletContext::connected(self.account, chain_id)
    }

    fn transfer_args(&self, transfer: TransferArgs) -> Result<BridgeTransferArgs> {
        let route = &transfer.route;
        let token_vault = self
            .config
            .route(route.src, route.dest)?
            .vault(route.token_type);

        let amounts = if transfer.amounts.is_empty() && route.token_type == TokenType::Erc721 {
            vec![U256::from(1); transfer.token_ids.len()]
        } else {
            transfer.amounts
        };

        Ok(BridgeTransferArgs {
            wallet: self.wallet(route.src),
            token: transfer.token,
            src_chain_id: route.src,
            dest_chain_id: route.dest,
            token_vault,
            to: transfer.to.unwrap_or(self.account),
            fee: transfer.fee,
            token_ids: transfer.token_ids,
            amounts,
            memo: transfer.memo,
            is_token_already_deployed: !transfer.not_deployed,
        })
    }
}

/// Context for commands that only read chain state
fn readonly_context(config: Arc<BridgeConfig>) -> Result<BridgeContext> {
    let client = Arc::new(AlloyContractClient::new_readonly(&config)?);
    let resolver = Arc::new(VaultCanonicalResolver::new(client.clone(), config.clone()));
    let prover = Arc::new(RpcSignalProver::new(client.clone(), config.clone()));
    Ok(BridgeContext::new(config, client, resolver, prover))
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = match &cli.config {
        Some(path) => BridgeConfig::load_from_file(&path.to_string_lossy())?,
        None => BridgeConfig::load()?,
    };

    match cli.command {
        Commands::Status => {
            let config = Arc::new(config);
            let ctx = readonly_context(config.clone())?;

            for route in &config.routes {
                let paused = lifecycle::is_bridge_paused(
                    &ctx,
                    route.src_chain_id,
                    route.contracts.bridge,
                )
                .await;
                let name = |id| {
                    config
                        .chain(id)
                        .map(|c| c.name.clone())
                        .unwrap_or_else(|| id.to_string())
                };
                match paused {
                    Ok(paused) => tracing::info!(
                        src = %name(route.src_chain_id),
                        dest = %name(route.dest_chain_id),
                        bridge = %route.contracts.bridge,
                        paused = paused,
                        "Route status"
                    ),
                    Err(e) => tracing::error!(
                        src = %name(route.src_chain_id),
                        dest = %name(route.dest_chain_id),
                        error = %e,
                        "Route unreachable"
                    ),
                }
            }
        }

        Commands::Approve {
            route,
            token,
            token_id,
            amount,
        } => {
            let session = Session::open(config)?;
            let spender = session
                .config
                .route(route.src, route.dest)?
                .vault(route.token_type);
            let handler = TokenBridge::new(route.token_type, session.ctx.clone());

            let tx_hash = handler
                .approve(&ApproveArgs {
                    wallet: session.wallet(route.src),
                    token,
                    spender,
                    token_id,
                    amount,
                })
                .await?;
            tracing::info!(tx_hash = %tx_hash, "Approval submitted");
        }

        Commands::Estimate { transfer } => {
            let session = Session::open(config)?;
            let handler = TokenBridge::new(transfer.route.token_type, session.ctx.clone());
            let args = session.transfer_args(transfer)?;

            let gas = handler.estimate_gas(&args).await?;
            tracing::info!(gas = gas, "Estimated gas");
        }

        Commands::Bridge { transfer } => {
            let session = Session::open(config)?;
            let handler = TokenBridge::new(transfer.route.token_type, session.ctx.clone());
            let args = session.transfer_args(transfer)?;

            let tx_hash = handler.bridge(&args).await?;
            tracing::info!(tx_hash = %tx_hash, "Transfer submitted");
        }

        Commands::Claim {
            message,
            msg_hash,
            token_type,
        } => {
            let raw = std::fs::read_to_string(&message)
                .wrap_err_with(|| format!("Failed to read message file {}", message.display()))?;
            let message: Message = serde_json::from_str::<MessageFile>(&raw)
                .wrap_err("Failed to parse message file")?
                .into();

            let session = Session::open(config)?;
            let args = ClaimArgs {
                wallet: session.wallet(message.destChainId.saturating_to()),
                msg_hash: B256::ZERO,
                message,
            };
            let msg_hash = match msg_hash {
                Some(hash) => hash,
                None => {
                    let src_bridge = session
                        .ctx
                        .bridge_address(args.src_chain_id(), args.dest_chain_id())?;
                    lifecycle::hash_message(
                        &session.ctx,
                        args.src_chain_id(),
                        src_bridge,
                        &args.message,
                    )
                    .await?
                }
            };
            let args = ClaimArgs { msg_hash, ..args };

            let handler = TokenBridge::new(token_type, session.ctx.clone());
            let tx_hash = handler.claim(&args).await?;
            tracing::info!(msg_hash = %msg_hash, tx_hash = %tx_hash, "Claim submitted");
        }

        Commands::MessageStatus { route, msg_hash } => {
            let ctx = readonly_context(Arc::new(config))?;

            let bridge = ctx.bridge_address(route.dest, route.src)?;
            let status = lifecycle::message_status(&ctx, route.dest, bridge, msg_hash).await?;
            tracing::info!(msg_hash = %msg_hash, status = %status, "Message status");
        }
    }

    Ok(())
}
