//! Core types - pure abstractions shared across the codebase.

mod layout;
mod stage;
mod state;

pub use layout::{Layout, SCRIPT_OUTPUT, minified_name};
pub use stage::{Failure, IoContext, StageError, StageId, StageSummary};
pub use state::{ShutdownSignal, setup_shutdown_handler};
