pub mod abi;
pub mod number_conversion;
