//! Calldata encoding for contract calls, on top of `ethabi`.
//!
//! Arguments are checked against the function's declared input types before encoding, so a
//! wrong arity, a mismatched type or a value too wide for its `uintN` fails here instead of
//! on-chain.

use super::types::LedgerError;
use crate::indexer::Address;
use ethabi::{ParamType, Token};

pub use ethabi::Uint;

/// A contract function's name and input types.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionSignature {
    name: &'static str,
    inputs: Vec<ParamType>,
}

impl FunctionSignature {
    pub fn new(name: &'static str, inputs: Vec<ParamType>) -> Self {
        Self { name, inputs }
    }

    pub fn name(&self) -> &str {
        self.name
    }

    /// Canonical form, e.g. `createBid(uint256,address,uint16)`.
    pub fn signature(&self) -> String {
        let inputs: Vec<String> = self.inputs.iter().map(ParamType::to_string).collect();
        format!("{}({})", self.name, inputs.join(","))
    }

    pub fn selector(&self) -> [u8; 4] {
        ethabi::short_signature(self.name, &self.inputs)
    }

    /// Selector followed by the ABI-encoded arguments.
    pub fn encode_input(&self, args: &[Token]) -> Result<Vec<u8>, LedgerError> {
        if args.len() != self.inputs.len() {
            return Err(LedgerError::Encode(format!(
                "{} takes {} argument(s), got {}",
                self.signature(),
                self.inputs.len(),
                args.len()
            )));
        }
        if !Token::types_check(args, &self.inputs) {
            return Err(LedgerError::Encode(format!(
                "argument types do not match {}",
                self.signature()
            )));
        }
        for (arg, kind) in args.iter().zip(&self.inputs) {
            if let (Token::Uint(value), ParamType::Uint(bits)) = (arg, kind) {
                if value.bits() > *bits {
                    return Err(LedgerError::Encode(format!(
                        "{} does not fit in uint{} for {}",
                        value,
                        bits,
                        self.signature()
                    )));
                }
            }
        }

        let mut data = self.selector().to_vec();
        data.extend(ethabi::encode(args));
        Ok(data)
    }
}

pub fn address(address: &Address) -> Token {
    Token::Address(ethabi::Address::from(address.to_bytes()))
}

pub fn uint(value: impl Into<Uint>) -> Token {
    Token::Uint(value.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transfer() -> FunctionSignature {
        FunctionSignature::new("transfer", vec![ParamType::Address, ParamType::Uint(256)])
    }

    fn to() -> Address {
        Address::parse("0x70997970C51812dc3A010C7d01b50e0d17dc79C8").unwrap()
    }

    #[test]
    fn selector_matches_known_erc20_transfer() {
        assert_eq!(transfer().signature(), "transfer(address,uint256)");
        assert_eq!(hex::encode(transfer().selector()), "a9059cbb");
    }

    #[test]
    fn encodes_arguments_after_the_selector() {
        let data = transfer().encode_input(&[address(&to()), uint(1_000u64)]).unwrap();

        assert_eq!(data.len(), 4 + 64);
        assert_eq!(hex::encode(&data[..4]), "a9059cbb");
        assert_eq!(
            hex::encode(&data[4..36]),
            "00000000000000000000000070997970c51812dc3a010c7d01b50e0d17dc79c8"
        );
        assert_eq!(
            hex::encode(&data[36..]),
            "00000000000000000000000000000000000000000000000000000000000003e8"
        );
    }

    #[test]
    fn values_wider_than_u128_fit_uint248() {
        let f = FunctionSignature::new("setPrice", vec![ParamType::Uint(248)]);
        let wide = Uint::from(u128::MAX) + Uint::from(1u8);

        let data = f.encode_input(&[uint(wide)]).unwrap();
        assert_eq!(data[4 + 15], 1);
        assert!(data[4 + 16..].iter().all(|b| *b == 0));
    }

    #[test]
    fn value_too_wide_for_the_declared_type_is_rejected() {
        let f = FunctionSignature::new("pick", vec![ParamType::Uint(16)]);

        assert!(f.encode_input(&[uint(65_535u32)]).is_ok());
        assert!(matches!(
            f.encode_input(&[uint(65_536u32)]),
            Err(LedgerError::Encode(_))
        ));
    }

    #[test]
    fn arity_and_type_mismatches_are_rejected() {
        assert!(matches!(
            transfer().encode_input(&[address(&to())]),
            Err(LedgerError::Encode(_))
        ));
        assert!(matches!(
            transfer().encode_input(&[uint(1u8), address(&to())]),
            Err(LedgerError::Encode(_))
        ));
    }
}
