pub mod blockchain;
pub mod state;

pub use blockchain::{BlockId, Blockchain, LedgerError, LedgerResult};
pub use state::State;
