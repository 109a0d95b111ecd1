pub mod constants;
pub mod error;
pub mod log;
pub mod models;
pub mod network;
pub mod uint;
