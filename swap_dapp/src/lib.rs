pub mod account;
pub mod config;
pub mod error;
pub mod server;
pub mod siwe;
pub mod swap;
#[cfg(test)]
pub mod tests;
pub mod utils;
pub mod zero_x;
