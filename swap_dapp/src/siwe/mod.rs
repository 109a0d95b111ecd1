//! Sign-in with Ethereum: message parsing, signature checks and the
//! server-side session store behind `/api/siwe`.

pub mod message;
pub mod session;
pub mod verify;

pub const SESSION_COOKIE: &str = "siwe_session";
