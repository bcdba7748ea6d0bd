//! Per-invocation state handed to every handler.

use std::collections::VecDeque;
use std::future::Future;
use std::io::{self, IsTerminal, Write};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

use super::command::CommandInfo;
use super::error::{CliError, CliResult};
use super::wait;
use crate::api::{PartnerAttachmentsService, ProjectsService, Services};
use crate::cli::{ARG_FORCE, ARG_FORMAT, ARG_INTERACTIVE, ARG_NO_HEADER, ARG_OUTPUT};
use crate::config::Config;
use crate::output::{Displayable, Output, OutputFormat};

/// Source of replies to confirmation prompts.
#[async_trait]
pub trait Prompt: Send {
    fn is_interactive(&self) -> bool;

    /// One line of input, `None` at end of input. Cancelled if the invocation is interrupted.
    async fn read_reply(&mut self) -> io::Result<Option<String>>;
}

/// Reads replies from stdin, interactive only when stdin is a terminal.
pub struct StdinPrompt;

#[async_trait]
impl Prompt for StdinPrompt {
    fn is_interactive(&self) -> bool {
        io::stdin().is_terminal()
    }

    async fn read_reply(&mut self) -> io::Result<Option<String>> {
        let mut line = String::new();
        match BufReader::new(tokio::io::stdin()).read_line(&mut line).await? {
            0 => Ok(None),
            _ => Ok(Some(line)),
        }
    }
}

/// Canned replies. Interactive unless built with [`ScriptedPrompt::piped`].
#[derive(Debug)]
pub struct ScriptedPrompt {
    replies: VecDeque<String>,
    interactive: bool,
}

impl Default for ScriptedPrompt {
    fn default() -> Self {
        Self::new(Vec::<String>::new())
    }
}

impl ScriptedPrompt {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: replies.into_iter().map(Into::into).collect(),
            interactive: true,
        }
    }

    /// Replies that arrive on a non-terminal input, as when stdin is piped.
    pub fn piped<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            interactive: false,
            ..Self::new(replies)
        }
    }
}

#[async_trait]
impl Prompt for ScriptedPrompt {
    fn is_interactive(&self) -> bool {
        self.interactive
    }

    async fn read_reply(&mut self) -> io::Result<Option<String>> {
        Ok(self.replies.pop_front())
    }
}

pub struct CmdContext {
    pub ns: String,
    pub args: Vec<String>,
    pub config: Config,
    pub out: Box<dyn Write + Send>,
    pub err: Box<dyn Write + Send>,
    pub verb: String,
    pub command: CommandInfo,
    pub progress_ticks: bool,
    prompt: Box<dyn Prompt>,
    services: Arc<dyn Services>,
}

impl CmdContext {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        ns: String,
        args: Vec<String>,
        config: Config,
        out: Box<dyn Write + Send>,
        err: Box<dyn Write + Send>,
        prompt: Box<dyn Prompt>,
        services: Arc<dyn Services>,
        command: CommandInfo,
        progress_ticks: bool,
    ) -> Self {
        let verb = command.path.last().cloned().unwrap_or_default();
        Self {
            ns,
            args,
            config,
            out,
            err,
            verb,
            command,
            progress_ticks,
            prompt,
            services,
        }
    }

    /// Hand the writers back to the caller, leaving sinks in their place.
    pub fn take_writers(&mut self) -> (Box<dyn Write + Send>, Box<dyn Write + Send>) {
        (
            std::mem::replace(&mut self.out, Box::new(io::sink())),
            std::mem::replace(&mut self.err, Box::new(io::sink())),
        )
    }

    pub fn take_prompt(&mut self) -> Box<dyn Prompt> {
        std::mem::replace(&mut self.prompt, Box::new(ScriptedPrompt::default()))
    }

    fn usage_placeholder(&self) -> String {
        self.command
            .usage
            .split_whitespace()
            .next()
            .unwrap_or("<arg>")
            .to_string()
    }

    /// Exactly one positional argument.
    pub fn ensure_one_arg(&self) -> CliResult<&str> {
        match self.args.as_slice() {
            [] => Err(CliError::MissingArgs(self.usage_placeholder())),
            [one] => Ok(one),
            _ => Err(CliError::invalid_arg(format!(
                "command takes exactly one argument, got {}",
                self.args.len()
            ))),
        }
    }

    /// At least `n` positional arguments.
    pub fn ensure_min_args(&self, n: usize) -> CliResult<&[String]> {
        if self.args.len() < n {
            return Err(CliError::MissingArgs(self.usage_placeholder()));
        }
        Ok(&self.args)
    }

    pub fn get_string(&self, name: &str) -> CliResult<String> {
        self.config.get_string(&self.ns, name)
    }

    pub fn get_int(&self, name: &str) -> CliResult<i64> {
        self.config.get_int(&self.ns, name)
    }

    pub fn get_float(&self, name: &str) -> CliResult<f64> {
        self.config.get_float(&self.ns, name)
    }

    pub fn get_bool(&self, name: &str) -> CliResult<bool> {
        self.config.get_bool(&self.ns, name)
    }

    pub fn get_bool_opt(&self, name: &str) -> CliResult<Option<bool>> {
        self.config.get_bool_opt(&self.ns, name)
    }

    pub fn get_string_slice(&self, name: &str) -> CliResult<Vec<String>> {
        self.config.get_string_slice(&self.ns, name)
    }

    pub fn is_set(&self, name: &str) -> bool {
        self.config.is_set(&self.ns, name)
    }

    /// A string flag's value only when it was explicitly set.
    pub fn string_if_set(&self, name: &str) -> CliResult<Option<String>> {
        if !self.is_set(name) {
            return Ok(None);
        }
        self.get_string(name).map(Some)
    }

    pub fn force(&self) -> CliResult<bool> {
        self.get_bool(ARG_FORCE)
    }

    pub fn output(&self) -> CliResult<Output> {
        Ok(Output {
            format: OutputFormat::parse(&self.get_string(ARG_OUTPUT)?)?,
            spec: self.get_string(ARG_FORMAT)?,
            no_header: self.get_bool(ARG_NO_HEADER)?,
        })
    }

    /// Render a result to the output writer.
    pub fn display(&mut self, item: &dyn Displayable) -> CliResult<()> {
        let output = self.output()?;
        output.display(&mut *self.out, item)?;
        self.out.flush()?;
        Ok(())
    }

    /// Ask before deleting `n` items. Anything but `y`/`yes` is Aborted.
    pub async fn ask_for_confirm_delete(&mut self, noun: &str, n: usize) -> CliResult<()> {
        let interactive = self.get_bool(ARG_INTERACTIVE)? && self.prompt.is_interactive();
        if !interactive {
            debug!(noun, n, "not interactive; declining delete");
            return Err(CliError::Aborted);
        }

        let question = if n == 1 {
            format!("delete this {noun}")
        } else {
            format!("delete {n} {noun}s")
        };
        write!(self.err, "Warning: Are you sure you want to {question}? (y/N) ? ")?;
        self.err.flush()?;

        let reply = self.prompt.read_reply().await?.unwrap_or_default();
        match reply.trim().to_ascii_lowercase().as_str() {
            "y" | "yes" => Ok(()),
            _ => Err(CliError::Aborted),
        }
    }

    /// Poll until `want`, ticking on the error writer.
    pub async fn wait_for_terminal_state<F, Fut>(
        &mut self,
        getter: F,
        id: &str,
        want: &str,
        accept_not_found: bool,
    ) -> CliResult<()>
    where
        F: FnMut(String) -> Fut + Send,
        Fut: Future<Output = CliResult<String>> + Send,
    {
        wait::wait_for_terminal_state(&mut *self.err, self.progress_ticks, getter, id, want, accept_not_found).await
    }

    pub fn projects(&self) -> CliResult<Arc<dyn ProjectsService>> {
        self.services.projects()
    }

    pub fn partner_attachments(&self) -> CliResult<Arc<dyn PartnerAttachmentsService>> {
        self.services.partner_attachments()
    }
}
