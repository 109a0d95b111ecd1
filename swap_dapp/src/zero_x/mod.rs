pub mod zero_x;

// https://0x.org/docs/0x-swap-api/introduction
const ZERO_X_SWAP_PATH: &str = "swap/v1";
const ZERO_X_API_KEY_HEADER: &str = "0x-api-key";

/// The two 0x Swap API endpoints the proxy exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZeroXEndpoint {
    Price,
    Quote,
}

impl ZeroXEndpoint {
    pub fn path(&self) -> &'static str {
        match self {
            ZeroXEndpoint::Price => "price",
            ZeroXEndpoint::Quote => "quote",
        }
    }
}
