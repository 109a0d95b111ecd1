pub mod allowance;
pub mod context;
pub mod flow;
pub mod quotes;
pub mod state;
pub mod token_selector;
pub mod wallet;
