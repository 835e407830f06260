//! CLI command handlers
//!
//! This module contains the implementation of CLI commands,
//! bridging the clap argument parsing with the service layer.

pub mod aliases;
pub mod audit;
pub mod cache;
pub mod extract;
pub mod links;
pub mod lookup;
pub mod run;

pub use aliases::{handle_alias_command, AliasCommands};
pub use audit::handle_audit_command;
pub use cache::{handle_cache_command, CacheCommands};
pub use extract::handle_extract_command;
pub use links::handle_links_command;
pub use lookup::handle_lookup_command;
pub use run::{handle_run_command, RunArgs};
