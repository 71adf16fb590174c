//! CLI command implementations.

mod config;
mod guard;
mod start;

pub use config::{run_config, ConfigArgs, ConfigCommand};
pub use guard::{run_guard, GuardArgs, GuardCommand};
pub use start::{init_tracing, run_start, StartArgs};
