//! Command dispatch framework shared by every resource command.

pub mod command;
pub mod context;
pub mod error;
pub mod flags;
pub mod runner;
pub mod wait;

pub use command::{add_command, Command, CommandTree, Handler};
pub use context::{CmdContext, Prompt, ScriptedPrompt};
pub use error::{CliError, CliResult};
pub use runner::{Io, Runner};
