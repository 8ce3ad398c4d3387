mod chain;
mod operation;
mod timestamp;

pub use chain::ChainId;
pub use operation::{Operation, OperationSet};
pub use timestamp::UtcDateTime;
