//! `oceanctl version`

use std::io::Write;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;

use crate::cli::GROUP_CONFIGURE;
use crate::framework::command::{add_command, group, Command};
use crate::framework::context::CmdContext;
use crate::framework::error::CliResult;

pub fn register(root: &mut Command) {
    add_command(
        root,
        Some(run_version),
        "version",
        "Show the current version",
        "The `oceanctl version` command displays the version of the oceanctl software.",
        vec![group(GROUP_CONFIGURE)],
    );
}

fn run_version(c: &mut CmdContext) -> BoxFuture<'_, CliResult<()>> {
    async move {
        writeln!(c.out, "oceanctl version {}", env!("CARGO_PKG_VERSION"))?;
        Ok(())
    }
    .boxed()
}
