//! Wrappers for the contract entry points the built-in scenarios mutate.

use super::abi::{self, FunctionSignature};
use super::types::{LedgerError, TransactionRequest};
use crate::indexer::Address;
use ethabi::ParamType;

/// A fixed-price minter on the shared minter suite.
#[derive(Debug, Clone)]
pub struct SetPriceMinter {
    pub address: Address,
}

impl SetPriceMinter {
    pub fn new(address: Address) -> Self {
        Self { address }
    }

    /// `updatePricePerTokenInWei(uint256 projectId, address coreContract, uint248 price)`
    pub fn update_price_fn() -> FunctionSignature {
        FunctionSignature::new(
            "updatePricePerTokenInWei",
            vec![ParamType::Uint(256), ParamType::Address, ParamType::Uint(248)],
        )
    }

    /// `resetPricePerTokenInWei(uint256 projectId, address coreContract)`
    pub fn reset_price_fn() -> FunctionSignature {
        FunctionSignature::new(
            "resetPricePerTokenInWei",
            vec![ParamType::Uint(256), ParamType::Address],
        )
    }

    pub fn update_price(
        &self,
        artist: &Address,
        project_number: u64,
        core: &Address,
        price_wei: u128,
    ) -> Result<TransactionRequest, LedgerError> {
        let data = Self::update_price_fn().encode_input(&[
            abi::uint(project_number),
            abi::address(core),
            abi::uint(price_wei),
        ])?;
        Ok(TransactionRequest::new(artist.clone(), self.address.clone()).with_data(data))
    }

    /// Returns the project to the unconfigured state.
    pub fn reset_price(
        &self,
        artist: &Address,
        project_number: u64,
        core: &Address,
    ) -> Result<TransactionRequest, LedgerError> {
        let data = Self::reset_price_fn()
            .encode_input(&[abi::uint(project_number), abi::address(core)])?;
        Ok(TransactionRequest::new(artist.clone(), self.address.clone()).with_data(data))
    }
}

/// A ranked auction minter, where a higher bid on a slot displaces the lowest standing bid.
#[derive(Debug, Clone)]
pub struct RankedAuctionMinter {
    pub address: Address,
}

impl RankedAuctionMinter {
    pub fn new(address: Address) -> Self {
        Self { address }
    }

    /// `createBid(uint256 projectId, address coreContract, uint16 slotIndex)`
    pub fn create_bid_fn() -> FunctionSignature {
        FunctionSignature::new(
            "createBid",
            vec![ParamType::Uint(256), ParamType::Address, ParamType::Uint(16)],
        )
    }

    pub fn create_bid(
        &self,
        bidder: &Address,
        project_number: u64,
        core: &Address,
        slot_index: u16,
        value_wei: u128,
    ) -> Result<TransactionRequest, LedgerError> {
        let data = Self::create_bid_fn().encode_input(&[
            abi::uint(project_number),
            abi::address(core),
            abi::uint(slot_index),
        ])?;
        Ok(TransactionRequest::new(bidder.clone(), self.address.clone())
            .with_data(data)
            .with_value(value_wei))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn core() -> Address {
        Address::parse("0x5fbdb2315678afecb367f032d93f642f64180aa3").unwrap()
    }

    fn artist() -> Address {
        Address::parse("0x70997970c51812dc3a010c7d01b50e0d17dc79c8").unwrap()
    }

    #[test]
    fn bid_carries_value_and_slot() {
        let minter = RankedAuctionMinter::new(
            Address::parse("0xa513e6e4b8f2a923d98304ec87f64353c4d5c853").unwrap(),
        );

        let tx = minter.create_bid(&artist(), 3, &core(), 10, 5_000).unwrap();

        assert_eq!(tx.value, 5_000);
        assert_eq!(tx.from, artist());
        assert_eq!(tx.to, minter.address);
        assert_eq!(
            RankedAuctionMinter::create_bid_fn().signature(),
            "createBid(uint256,address,uint16)"
        );
        assert_eq!(&tx.data[..4], &RankedAuctionMinter::create_bid_fn().selector());
        assert_eq!(tx.data[4 + 31], 3);
        assert_eq!(tx.data[4 + 3 * 32 - 1], 10);
    }

    #[test]
    fn price_update_declares_uint248_and_accepts_large_prices() {
        let minter = SetPriceMinter::new(
            Address::parse("0xe7f1725e7734ce288f8367e1bb143e90bb3f0512").unwrap(),
        );

        assert_eq!(
            SetPriceMinter::update_price_fn().signature(),
            "updatePricePerTokenInWei(uint256,address,uint248)"
        );

        let tx = minter.update_price(&artist(), 0, &core(), u128::MAX).unwrap();
        assert_eq!(tx.value, 0);
        assert_eq!(tx.data.len(), 4 + 3 * 32);
        assert!(tx.data[4 + 64..4 + 80].iter().all(|b| *b == 0));
        assert!(tx.data[4 + 80..].iter().all(|b| *b == 0xff));
    }

    #[test]
    fn reset_encodes_project_and_core_only() {
        let minter = SetPriceMinter::new(core());
        let tx = minter.reset_price(&artist(), 7, &core()).unwrap();

        assert_eq!(&tx.data[..4], &SetPriceMinter::reset_price_fn().selector());
        assert_eq!(tx.data.len(), 4 + 2 * 32);
        assert_eq!(tx.data[4 + 31], 7);
    }
}
