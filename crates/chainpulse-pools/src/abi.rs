//! ABI plumbing for Uniswap-V2 style pair contracts.
//!
//! Calldata is built and return data decoded with alloy's dynamic ABI types;
//! the node transport only ever sees `0x`-prefixed hex strings.

use alloy_core::dyn_abi::{DynSolType, DynSolValue};
use alloy_primitives::{hex, keccak256, Selector, U256};
use thiserror::Error;

use chainpulse_core::error::TransportError;

pub use alloy_primitives::Address;

pub const GET_RESERVES: &str = "getReserves()";
pub const TOKEN0: &str = "token0()";
pub const TOKEN1: &str = "token1()";
pub const TOTAL_SUPPLY: &str = "totalSupply()";
pub const DECIMALS: &str = "decimals()";
pub const BALANCE_OF: &str = "balanceOf(address)";

const TWO_POW_64: f64 = 18_446_744_073_709_551_616.0;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AbiError {
    #[error("invalid hex: {0}")]
    Hex(String),

    #[error("ABI decode failed: {0}")]
    Decode(String),

    #[error("expected {expected} in return data")]
    Unexpected { expected: &'static str },

    #[error("value does not fit in {bits} bits")]
    Overflow { bits: u32 },
}

impl From<AbiError> for TransportError {
    fn from(e: AbiError) -> Self {
        TransportError::Decode(e.to_string())
    }
}

/// First four bytes of `keccak256(signature)`.
pub fn selector(signature: &str) -> Selector {
    Selector::from_slice(&keccak256(signature)[..4])
}

/// Calldata for `signature` applied to `args`.
pub fn encode_call(signature: &str, args: &[DynSolValue]) -> String {
    let mut data = selector(signature).to_vec();
    if !args.is_empty() {
        data.extend(DynSolValue::Tuple(args.to_vec()).abi_encode());
    }
    hex::encode_prefixed(data)
}

pub fn encode_balance_of(owner: Address) -> String {
    encode_call(BALANCE_OF, &[DynSolValue::Address(owner)])
}

fn decode(data: &str, ty: &DynSolType) -> Result<DynSolValue, AbiError> {
    let digits = data.strip_prefix("0x").unwrap_or(data);
    let bytes = hex::decode(digits).map_err(|e| AbiError::Hex(e.to_string()))?;
    ty.abi_decode(&bytes)
        .map_err(|e| AbiError::Decode(e.to_string()))
}

pub fn decode_uint(data: &str) -> Result<U256, AbiError> {
    match decode(data, &DynSolType::Uint(256))? {
        DynSolValue::Uint(v, _) => Ok(v),
        _ => Err(AbiError::Unexpected { expected: "uint256" }),
    }
}

pub fn decode_u8(data: &str) -> Result<u8, AbiError> {
    u8::try_from(decode_uint(data)?).map_err(|_| AbiError::Overflow { bits: 8 })
}

pub fn decode_address(data: &str) -> Result<Address, AbiError> {
    match decode(data, &DynSolType::Address)? {
        DynSolValue::Address(a) => Ok(a),
        _ => Err(AbiError::Unexpected { expected: "address" }),
    }
}

/// `getReserves()` → `(reserve0, reserve1, blockTimestampLast)`.
pub fn decode_reserves(data: &str) -> Result<(U256, U256, u32), AbiError> {
    let ty = DynSolType::Tuple(vec![
        DynSolType::Uint(112),
        DynSolType::Uint(112),
        DynSolType::Uint(32),
    ]);
    let expected = "(uint112,uint112,uint32)";
    let values = match decode(data, &ty)? {
        DynSolValue::Tuple(values) => values,
        _ => return Err(AbiError::Unexpected { expected }),
    };
    match values.as_slice() {
        [DynSolValue::Uint(r0, _), DynSolValue::Uint(r1, _), DynSolValue::Uint(ts, _)] => {
            let ts = u32::try_from(*ts).map_err(|_| AbiError::Overflow { bits: 32 })?;
            Ok((*r0, *r1, ts))
        }
        _ => Err(AbiError::Unexpected { expected }),
    }
}

/// Nearest `f64` to `raw`.
pub fn to_f64(raw: U256) -> f64 {
    match u128::try_from(raw) {
        Ok(small) => small as f64,
        Err(_) => raw
            .as_limbs()
            .iter()
            .rev()
            .fold(0.0, |acc, &limb| acc * TWO_POW_64 + limb as f64),
    }
}

/// Scale a raw integer amount by `decimals`.
pub fn to_units(raw: U256, decimals: u8) -> f64 {
    to_f64(raw) / 10f64.powi(decimals as i32)
}
