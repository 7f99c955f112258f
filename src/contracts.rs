//! Bridge and token contract ABI definitions
//!
//! Uses alloy's sol! macro to generate type-safe call encoders for the bridge,
//! the token vaults and the three token standards. Calls are encoded here and
//! dispatched through [`crate::client::ContractClient`], so no `#[sol(rpc)]`
//! instances are generated.

#![allow(clippy::too_many_arguments)]

use alloy::sol;

sol! {
    // ========================================================================
    // Shared structs
    // ========================================================================

    /// Cross-chain message envelope, as stored by the bridge
    #[derive(Debug, PartialEq, Eq)]
    struct Message {
        uint256 id;
        address from;
        uint256 srcChainId;
        uint256 destChainId;
        address user;
        address to;
        address refundTo;
        uint256 value;
        uint256 fee;
        uint256 gasLimit;
        bytes data;
        string memo;
    }

    /// ERC721/ERC1155 vault transfer descriptor
    #[derive(Debug, PartialEq, Eq)]
    struct NFTBridgeTransferOp {
        uint256 destChainId;
        address to;
        address token;
        uint256[] tokenIds;
        uint256[] amounts;
        uint256 gasLimit;
        uint256 fee;
        address refundTo;
        string memo;
    }

    /// ERC20 vault transfer descriptor
    #[derive(Debug, PartialEq, Eq)]
    struct BridgeTransferOp {
        uint256 destChainId;
        address to;
        address token;
        uint256 amount;
        uint256 gasLimit;
        uint256 fee;
        address refundTo;
        string memo;
    }

    /// Snapshot of a remote chain block synced to this chain
    #[derive(Debug, PartialEq, Eq)]
    struct Snippet {
        uint64 remoteBlockId;
        bytes32 blockHash;
        bytes32 signalRoot;
    }

    /// Intermediate hop of a multi-hop signal proof
    #[derive(Debug, PartialEq, Eq)]
    struct Hop {
        uint64 chainId;
        bytes32 signalRoot;
        bytes storageProof;
    }

    /// Proof that a signal was sent on the source chain
    #[derive(Debug, PartialEq, Eq)]
    struct SignalProof {
        uint64 height;
        bytes storageProof;
        Hop[] hops;
    }

    // ========================================================================
    // Bridge
    // ========================================================================

    interface IBridge {
        /// Process a message on the destination chain
        function processMessage(Message calldata message, bytes calldata proof) external;

        /// Status of a message: 0 NEW, 1 RETRIABLE, 2 DONE, 3 FAILED, 4 RECALLED
        function messageStatus(bytes32 msgHash) external view returns (uint8);

        /// Hash of a message as the bridge computes it
        function hashMessage(Message calldata message) external pure returns (bytes32);

        function paused() external view returns (bool);
    }

    // ========================================================================
    // Vaults
    // ========================================================================

    interface IERC20Vault {
        function sendToken(BridgeTransferOp calldata op) external payable returns (Message memory _message);

        function bridgedToCanonical(address btoken) external view returns (
            uint64 chainId,
            address addr,
            uint8 decimals,
            string symbol,
            string name
        );
    }

    interface INFTVault {
        function sendToken(NFTBridgeTransferOp calldata op) external payable returns (Message memory _message);

        function bridgedToCanonical(address btoken) external view returns (
            uint64 chainId,
            address addr,
            string symbol,
            string name
        );
    }

    // ========================================================================
    // Signal service / cross-chain sync
    // ========================================================================

    interface ISignalService {
        function getSignalSlot(uint64 chainId, address app, bytes32 signal) external pure returns (bytes32);
    }

    interface ICrossChainSync {
        function getSyncedSnippet(uint64 blockId) external view returns (Snippet memory);
    }

    // ========================================================================
    // Token standards
    // ========================================================================

    interface ERC20 {
        function symbol() external view returns (string);
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 amount) external returns (bool);
    }

    interface ERC721 {
        function getApproved(uint256 tokenId) external view returns (address);
        function approve(address to, uint256 tokenId) external;
    }

    interface ERC165 {
        function supportsInterface(bytes4 interfaceId) external view returns (bool);
    }

    interface ERC1155 {
        function isApprovedForAll(address account, address operator) external view returns (bool);
        function setApprovalForAll(address operator, bool approved) external;
    }
}
