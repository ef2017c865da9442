//! Background generation: worker pool, completion queues, and the dispatch seam.
#![forbid(unsafe_code)]

mod dispatch;
mod pool;
mod queue;

pub use dispatch::{Dispatch, InlineDispatch, MeshResult};
pub use pool::{Runtime, RuntimeError};
pub use queue::{PendingResult, ResultQueue};
