//! Bundle invocation: random collapse, delay scheduling, gating and dispatch.

pub mod executor;
pub mod selection;

pub use executor::{BundleExecutor, EMPTY_COMMAND, InvocationHandle, PERMISSION_DENIED};
pub use selection::{collapse_random_group, select_weighted};
