//! The disposal batch workflow: loading a batch into a working set and
//! driving each record through edit → recompute → submit.

mod batch;
mod loader;

pub use batch::{
    DisposalEngine, EngineError, FieldEdit, Notification, RecomputeRequest, SubmitOutcome,
};
pub use loader::{BatchLoader, LoadError};
