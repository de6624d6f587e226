//! Raw state of one pair contract.

use alloy_primitives::U256;

use chainpulse_core::error::TransportError;
use chainpulse_core::transport::{RpcTransport, RpcTransportExt};

use crate::abi::{self, Address};

/// Everything read from one pair contract in a single attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairState {
    pub address: Address,
    pub token0: Address,
    pub token1: Address,
    pub reserve0: U256,
    pub reserve1: U256,
    pub block_timestamp_last: u32,
    pub total_supply: U256,
    /// Decimals of the LP token itself.
    pub decimals: u8,
}

/// Pair reserves split into the asset of interest and the other side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Oriented {
    pub asset_is_token0: bool,
    pub asset_reserve: U256,
    pub paired_reserve: U256,
    pub paired_token: Address,
}

impl PairState {
    /// Which side holds `asset`; `None` if neither does.
    pub fn orient(&self, asset: &Address) -> Option<Oriented> {
        if self.token0 == *asset {
            Some(Oriented {
                asset_is_token0: true,
                asset_reserve: self.reserve0,
                paired_reserve: self.reserve1,
                paired_token: self.token1,
            })
        } else if self.token1 == *asset {
            Some(Oriented {
                asset_is_token0: false,
                asset_reserve: self.reserve1,
                paired_reserve: self.reserve0,
                paired_token: self.token0,
            })
        } else {
            None
        }
    }
}

/// Read reserves, tokens, supply and decimals of `pair` through one endpoint.
pub async fn read_pair<T>(transport: &T, pair: Address) -> Result<PairState, TransportError>
where
    T: RpcTransport + ?Sized,
{
    let to = pair.to_string();
    let reserves_call = abi::encode_call(abi::GET_RESERVES, &[]);
    let token0_call = abi::encode_call(abi::TOKEN0, &[]);
    let token1_call = abi::encode_call(abi::TOKEN1, &[]);
    let supply_call = abi::encode_call(abi::TOTAL_SUPPLY, &[]);
    let decimals_call = abi::encode_call(abi::DECIMALS, &[]);

    let (reserves, token0, token1, supply, decimals) = tokio::try_join!(
        transport.eth_call(&to, &reserves_call),
        transport.eth_call(&to, &token0_call),
        transport.eth_call(&to, &token1_call),
        transport.eth_call(&to, &supply_call),
        transport.eth_call(&to, &decimals_call),
    )?;

    let (reserve0, reserve1, block_timestamp_last) = abi::decode_reserves(&reserves)?;
    Ok(PairState {
        address: pair,
        token0: abi::decode_address(&token0)?,
        token1: abi::decode_address(&token1)?,
        reserve0,
        reserve1,
        block_timestamp_last,
        total_supply: abi::decode_uint(&supply)?,
        decimals: abi::decode_u8(&decimals)?,
    })
}

/// LP balance of `owner` with the supply it is a share of.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LpHolding {
    pub pair: Address,
    pub balance: U256,
    pub total_supply: U256,
    pub decimals: u8,
}

pub async fn read_holding<T>(
    transport: &T,
    pair: Address,
    owner: Address,
) -> Result<LpHolding, TransportError>
where
    T: RpcTransport + ?Sized,
{
    let to = pair.to_string();
    let balance_call = abi::encode_balance_of(owner);
    let supply_call = abi::encode_call(abi::TOTAL_SUPPLY, &[]);
    let decimals_call = abi::encode_call(abi::DECIMALS, &[]);

    let (balance, supply, decimals) = tokio::try_join!(
        transport.eth_call(&to, &balance_call),
        transport.eth_call(&to, &supply_call),
        transport.eth_call(&to, &decimals_call),
    )?;
    Ok(LpHolding {
        pair,
        balance: abi::decode_uint(&balance)?,
        total_supply: abi::decode_uint(&supply)?,
        decimals: abi::decode_u8(&decimals)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(byte: u8) -> Address {
        Address::repeat_byte(byte)
    }

    fn state(token0: Address, token1: Address) -> PairState {
        PairState {
            address: addr(0xaa),
            token0,
            token1,
            reserve0: U256::from(100u64),
            reserve1: U256::from(7u64),
            block_timestamp_last: 0,
            total_supply: U256::from(10u64),
            decimals: 18,
        }
    }

    #[test]
    fn asset_as_token0() {
        let o = state(addr(1), addr(2)).orient(&addr(1)).unwrap();
        assert!(o.asset_is_token0);
        assert_eq!((o.asset_reserve, o.paired_reserve), (U256::from(100u64), U256::from(7u64)));
        assert_eq!(o.paired_token, addr(2));
    }

    #[test]
    fn asset_as_token1() {
        let o = state(addr(2), addr(1)).orient(&addr(1)).unwrap();
        assert!(!o.asset_is_token0);
        assert_eq!((o.asset_reserve, o.paired_reserve), (U256::from(7u64), U256::from(100u64)));
    }

    #[test]
    fn foreign_pool_has_no_orientation() {
        assert!(state(addr(2), addr(3)).orient(&addr(1)).is_none());
    }
}
