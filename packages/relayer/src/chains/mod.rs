//! Chain backends implementing [`EventSource`](crate::source::EventSource)
//! and [`MintSubmitter`](crate::submit::MintSubmitter)

pub mod evm;
pub mod memory;

pub use evm::EvmChain;
pub use memory::InMemoryChain;
