//! CLI command implementations (facade).
//!
//! `run.rs` calls the handlers re-exported here. Implementations live in
//! `commands/*`.

mod ask;
mod common;
mod config;
mod count;
mod describe;
mod issue;

pub use ask::execute_ask_command;
pub use config::execute_config_command;
pub use count::execute_count_command;
pub use describe::execute_describe_command;
pub use issue::execute_issue_command;
