//! Runs one invocation: resolve, parse, check, dispatch, report.

use std::collections::HashMap;
use std::future::Future;
use std::io::{self, IsTerminal, Write};
use std::sync::Arc;

use anyhow::anyhow;
use clap::error::ErrorKind;
use tracing::debug;

use super::command::{Command, CommandTree, NS_ROOT, POSITIONAL_ID};
use super::context::{CmdContext, Prompt, ScriptedPrompt, StdinPrompt};
use super::error::{CliError, CliResult};
use super::flags::{from_clap_error, FlagDecl, FlagValue};
use crate::api::{LiveServices, Services};
use crate::cli::{ARG_CONFIG, ARG_FORMAT, ARG_OUTPUT, ARG_TRACE, ARG_VERBOSE};
use crate::config::{self, qualified, Config, ConfigFile, EnvBinding};
use crate::exitcode;
use crate::logging;
use crate::output::OutputFormat;

/// The streams an invocation talks to.
pub struct Io {
    pub out: Box<dyn Write + Send>,
    pub err: Box<dyn Write + Send>,
    pub prompt: Box<dyn Prompt>,
    /// Write `.` ticks while polling.
    pub progress_ticks: bool,
}

impl Io {
    pub fn stdio() -> Self {
        Self {
            out: Box::new(io::stdout()),
            err: Box::new(io::stderr()),
            prompt: Box::new(StdinPrompt),
            progress_ticks: io::stderr().is_terminal(),
        }
    }
}

/// What the error report needs from a finished invocation.
struct Outcome {
    verb: String,
    trace: bool,
    result: CliResult<()>,
}

pub struct Runner {
    tree: CommandTree,
    env_bindings: &'static [EnvBinding],
    env: Option<HashMap<String, String>>,
    services: Option<Arc<dyn Services>>,
}

impl Runner {
    pub fn new(tree: CommandTree, env_bindings: &'static [EnvBinding]) -> Self {
        Self {
            tree,
            env_bindings,
            env: None,
            services: None,
        }
    }

    /// Use these services instead of the HTTP-backed ones.
    pub fn with_services(mut self, services: Arc<dyn Services>) -> Self {
        self.services = Some(services);
        self
    }

    /// Read environment variables from `env` instead of the process.
    pub fn with_env(mut self, env: HashMap<String, String>) -> Self {
        self.env = Some(env);
        self
    }

    pub fn tree(&self) -> &CommandTree {
        &self.tree
    }

    /// Run until completion or Ctrl-C.
    pub async fn run(&self, args: Vec<String>, io: Io) -> i32 {
        let shutdown = async {
            if tokio::signal::ctrl_c().await.is_err() {
                std::future::pending::<()>().await;
            }
        };
        self.run_until(args, io, shutdown).await
    }

    /// Run until completion or until `shutdown` resolves, returning the exit code.
    pub async fn run_until(&self, args: Vec<String>, mut io: Io, shutdown: impl Future<Output = ()>) -> i32 {
        let outcome = self.execute(&args, &mut io, shutdown).await;
        let _ = io.out.flush();

        match outcome.result {
            Ok(()) => exitcode::OK,
            Err(err) => {
                let mut report = format!("{}: {err}\n", outcome.verb);
                if outcome.trace {
                    if let Some(frames) = err.frames() {
                        report.push_str(frames);
                        if !report.ends_with('\n') {
                            report.push('\n');
                        }
                    }
                }
                let _ = io.err.write_all(report.as_bytes());
                let _ = io.err.flush();
                err.exit_code()
            }
        }
    }

    async fn execute(&self, args: &[String], io: &mut Io, shutdown: impl Future<Output = ()>) -> Outcome {
        let resolution = self.tree.resolve(args);
        let cmd = resolution.command;
        let mut outcome = Outcome {
            verb: cmd.name.clone(),
            trace: false,
            result: Ok(()),
        };

        if !cmd.is_leaf() {
            outcome.result = self.print_branch(cmd, &resolution.rest, io);
            return outcome;
        }

        let (own, globals) = self.tree.effective_flags(cmd);
        let known: Vec<&str> = own.iter().chain(&globals).map(|f| f.name.as_str()).collect();
        let parser = self.tree.leaf_parser(cmd, &own.iter().chain(&globals).cloned().collect::<Vec<_>>());
        let matches = match parser.try_get_matches_from(&resolution.rest) {
            Ok(matches) => matches,
            Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
                outcome.result = write!(io.out, "{}", err.render()).map_err(CliError::from);
                return outcome;
            }
            Err(err) => {
                outcome.result = Err(from_clap_error(&err, known));
                return outcome;
            }
        };

        let ns = cmd.namespace();
        let args: Vec<String> = matches
            .get_many::<String>(POSITIONAL_ID)
            .map(|values| values.cloned().collect())
            .unwrap_or_default();
        let mut cli: HashMap<String, FlagValue> = HashMap::new();
        for flag in &own {
            if let Some(value) = flag.extract(&matches) {
                cli.insert(qualified(&ns, &flag.name), value);
            }
        }
        for flag in &globals {
            if let Some(value) = flag.extract(&matches) {
                cli.insert(flag.name.clone(), value);
            }
        }

        // --trace applies to config load failures too
        outcome.trace = matches!(cli.get(ARG_TRACE), Some(FlagValue::Bool(true)));
        let config = match self.build_config(&ns, own.clone(), cli) {
            Ok(config) => config,
            Err(err) => {
                outcome.result = Err(err);
                return outcome;
            }
        };
        outcome.trace = config.get_bool(NS_ROOT, ARG_TRACE).unwrap_or(false);
        logging::init(config.get_bool(NS_ROOT, ARG_VERBOSE).unwrap_or(false), outcome.trace);
        debug!(command = %cmd.path.join(" "), ?args, "dispatching");

        if let Err(err) = self.preflight(cmd, &ns, &config) {
            outcome.result = Err(err);
            return outcome;
        }

        let services: Arc<dyn Services> = match &self.services {
            Some(services) => services.clone(),
            None => match LiveServices::from_config(&config) {
                Ok(live) => Arc::new(live),
                Err(err) => {
                    outcome.result = Err(err);
                    return outcome;
                }
            },
        };
        let Some(handler) = cmd.handler else {
            outcome.result = Err(CliError::internal(anyhow!("leaf {:?} has no handler", cmd.path.join(" "))));
            return outcome;
        };

        let out = std::mem::replace(&mut io.out, Box::new(io::sink()));
        let err = std::mem::replace(&mut io.err, Box::new(io::sink()));
        let prompt = std::mem::replace(&mut io.prompt, Box::new(ScriptedPrompt::default()));
        let mut ctx = CmdContext::new(
            ns,
            args,
            config,
            out,
            err,
            prompt,
            services,
            self.tree.info(cmd),
            io.progress_ticks,
        );

        outcome.result = tokio::select! {
            result = handler(&mut ctx) => result,
            _ = shutdown => {
                debug!("interrupted");
                Err(CliError::Aborted)
            }
        };

        let (out, err) = ctx.take_writers();
        io.out = out;
        io.err = err;
        io.prompt = ctx.take_prompt();
        outcome
    }

    fn print_branch(&self, cmd: &Command, rest: &[String], io: &mut Io) -> CliResult<()> {
        if cmd.path.len() == 1 && rest.iter().any(|t| t == "--version") {
            writeln!(io.out, "{} version {}", cmd.name, env!("CARGO_PKG_VERSION"))?;
            return Ok(());
        }
        write!(io.out, "{}", self.tree.branch_help(cmd))?;
        Ok(())
    }

    fn build_config(&self, ns: &str, own: Vec<FlagDecl>, cli: HashMap<String, FlagValue>) -> CliResult<Config> {
        let vars: HashMap<String, String> = match &self.env {
            Some(env) => env.clone(),
            None => std::env::vars().collect(),
        };
        let explicit = match cli.get(ARG_CONFIG) {
            Some(FlagValue::String(path)) => Some(path.as_str()),
            _ => None,
        };
        let file = match config::config_path(explicit, &vars) {
            Some(path) => ConfigFile::load(&path)?,
            None => ConfigFile::default(),
        };
        let env = config::env_layer(self.env_bindings, &vars);
        Ok(Config::new(ns, own, self.tree.globals().to_vec(), cli, env, file))
    }

    /// Required flags in declaration order, then `--format` against the declared columns.
    fn preflight(&self, cmd: &Command, ns: &str, config: &Config) -> CliResult<()> {
        let (own, globals) = self.tree.effective_flags(cmd);
        for flag in own.iter().chain(&globals).filter(|f| f.required) {
            if !config.is_set(ns, &flag.name) {
                return Err(CliError::MissingFlag(flag.name.clone()));
            }
        }

        if let Some(columns) = &cmd.columns {
            if OutputFormat::parse(&config.get_string(ns, ARG_OUTPUT)?)? == OutputFormat::Table {
                columns.select(&config.get_string(ns, ARG_FORMAT)?)?;
            }
        }
        Ok(())
    }
}
