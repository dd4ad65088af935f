//! Tourist identity contract interface.
//!
//! Function and event signatures must match the deployed contract exactly;
//! renaming anything here changes selectors and topic hashes.

use alloy::primitives::{Bytes, U256};
use alloy::sol;
use alloy::sol_types::SolCall;

use crate::blockchain::types::{
    BlockchainError, BlockchainResult, CallTarget, LedgerCall, TokenId,
};
use crate::commitment::Commitment;

sol! {
    /// Digital tourist identity registry.
    #[derive(Debug, PartialEq, Eq)]
    interface TouristIdentity {
        /// Emitted when a new identity is minted.
        event TouristIDCreated(uint256 indexed tokenId, address indexed tourist, string idHash);

        function createTouristID(string memory idHash, uint256 validUntil) external returns (uint256);

        function getTouristID(uint256 tokenId) external view returns (string memory idHash, uint256 validUntil, bool active);

        function deactivateTouristID(uint256 tokenId) external;
    }
}

pub use TouristIdentity::{
    createTouristIDCall, deactivateTouristIDCall, getTouristIDCall, getTouristIDReturn,
    TouristIDCreated,
};

pub const OP_CREATE: &str = "create";
pub const OP_READ: &str = "read";
pub const OP_DEACTIVATE: &str = "deactivate";
pub const OP_ANCHOR: &str = "anchor";

/// Identity record as stored on the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnChainRecord {
    /// The stored commitment string (`0x`-prefixed hex).
    pub commitment: String,
    pub valid_until: u64,
    pub active: bool,
}

impl OnChainRecord {
    /// The contract returns zero values for ids it never minted.
    pub fn exists(&self) -> bool {
        !self.commitment.is_empty()
    }
}

/// Encode `createTouristID(commitment, validUntil)`.
pub fn create_call(commitment: &Commitment, valid_until: u64) -> LedgerCall {
    let call = createTouristIDCall {
        idHash: commitment.to_string(),
        validUntil: U256::from(valid_until),
    };
    LedgerCall {
        operation: OP_CREATE,
        target: CallTarget::Contract,
        input: Bytes::from(call.abi_encode()),
    }
}

/// Encode `getTouristID(tokenId)`.
pub fn read_call(token_id: TokenId) -> LedgerCall {
    let call = getTouristIDCall {
        tokenId: token_id.as_u256(),
    };
    LedgerCall {
        operation: OP_READ,
        target: CallTarget::Contract,
        input: Bytes::from(call.abi_encode()),
    }
}

/// Encode `deactivateTouristID(tokenId)`.
pub fn deactivate_call(token_id: TokenId) -> LedgerCall {
    let call = deactivateTouristIDCall {
        tokenId: token_id.as_u256(),
    };
    LedgerCall {
        operation: OP_DEACTIVATE,
        target: CallTarget::Contract,
        input: Bytes::from(call.abi_encode()),
    }
}

/// A zero-value transaction to the signer's own address whose calldata is
/// the raw 32-byte commitment.
pub fn anchor_call(commitment: &Commitment) -> LedgerCall {
    LedgerCall {
        operation: OP_ANCHOR,
        target: CallTarget::SelfAnchor,
        input: Bytes::copy_from_slice(commitment.as_bytes()),
    }
}

/// Decode the return data of `getTouristID`.
pub fn decode_record(data: &[u8]) -> BlockchainResult<OnChainRecord> {
    let ret = getTouristIDCall::abi_decode_returns(data)
        .map_err(|e| BlockchainError::Decode(format!("getTouristID returned malformed data: {}", e)))?;
    let valid_until = u64::try_from(ret.validUntil).map_err(|_| {
        BlockchainError::Decode(format!("validUntil {} exceeds u64", ret.validUntil))
    })?;
    Ok(OnChainRecord {
        commitment: ret.idHash,
        valid_until,
        active: ret.active,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::keccak256;
    use alloy::sol_types::{SolEvent, SolValue};

    #[test]
    fn test_selectors_match_deployed_abi() {
        assert_eq!(
            &createTouristIDCall::SELECTOR[..],
            &keccak256("createTouristID(string,uint256)")[..4]
        );
        assert_eq!(
            &getTouristIDCall::SELECTOR[..],
            &keccak256("getTouristID(uint256)")[..4]
        );
        assert_eq!(
            &deactivateTouristIDCall::SELECTOR[..],
            &keccak256("deactivateTouristID(uint256)")[..4]
        );
        assert_eq!(
            TouristIDCreated::SIGNATURE_HASH,
            keccak256("TouristIDCreated(uint256,address,string)")
        );
    }

    #[test]
    fn test_create_call_carries_hex_commitment() {
        let commitment = Commitment::from_bytes([0x11; 32]);
        let call = create_call(&commitment, 1_700_000_000);
        assert_eq!(call.target, CallTarget::Contract);
        assert_eq!(&call.input[..4], &createTouristIDCall::SELECTOR[..]);

        let decoded = createTouristIDCall::abi_decode(&call.input).unwrap();
        assert_eq!(decoded.idHash, commitment.to_string());
        assert_eq!(decoded.validUntil, U256::from(1_700_000_000u64));
    }

    #[test]
    fn test_anchor_call_is_raw_commitment() {
        let commitment = Commitment::from_bytes([0x22; 32]);
        let call = anchor_call(&commitment);
        assert_eq!(call.target, CallTarget::SelfAnchor);
        assert_eq!(&call.input[..], commitment.as_bytes());
    }

    #[test]
    fn test_decode_record() {
        let encoded = ("0xabc".to_string(), U256::from(1234u64), true).abi_encode_params();
        let record = decode_record(&encoded).unwrap();
        assert_eq!(
            record,
            OnChainRecord {
                commitment: "0xabc".into(),
                valid_until: 1234,
                active: true,
            }
        );
        assert!(record.exists());

        let empty = (String::new(), U256::ZERO, false).abi_encode_params();
        assert!(!decode_record(&empty).unwrap().exists());
    }

    #[test]
    fn test_decode_record_rejects_garbage() {
        assert!(matches!(
            decode_record(&[0x01, 0x02]),
            Err(BlockchainError::Decode(_))
        ));
    }
}
