//! Configuration layering: CLI flags, environment, YAML config file, defaults.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use serde_yaml::Value;
use tracing::debug;

use crate::framework::command::NS_ROOT;
use crate::framework::error::{CliError, CliResult};
use crate::framework::flags::{FlagDecl, FlagKind, FlagValue};

/// Variable naming an alternate config file.
pub const CONFIG_ENV: &str = "OCEANCTL_CONFIG";

/// Top-level config file key holding per-context tokens.
pub const AUTH_CONTEXTS: &str = "auth-contexts";

/// Binds an environment variable to the flag `flag` of `namespace`.
#[derive(Debug, Clone, Copy)]
pub struct EnvBinding {
    pub var: &'static str,
    pub namespace: &'static str,
    pub flag: &'static str,
}

/// Load `.env` from the working directory. Variables already set win.
pub fn load_env() -> CliResult<()> {
    match dotenvy::dotenv() {
        Ok(path) => {
            debug!(path = %path.display(), "loaded .env");
            Ok(())
        }
        Err(err) if err.not_found() => Ok(()),
        Err(err) => Err(CliError::internal(anyhow::Error::new(err).context("Failed to load .env"))),
    }
}

/// Where the config file lives: `--config`, then `OCEANCTL_CONFIG`, then the user config dir.
pub fn config_path(explicit: Option<&str>, vars: &HashMap<String, String>) -> Option<PathBuf> {
    if let Some(path) = explicit.filter(|p| !p.is_empty()) {
        return Some(PathBuf::from(path));
    }
    if let Some(path) = vars.get(CONFIG_ENV).filter(|p| !p.is_empty()) {
        return Some(PathBuf::from(path));
    }
    dirs::config_dir().map(|dir| dir.join("oceanctl").join("config.yaml"))
}

/// Raw values keyed by qualified flag name for each bound variable present in `vars`.
/// Empty values count as unset.
pub fn env_layer(bindings: &[EnvBinding], vars: &HashMap<String, String>) -> HashMap<String, String> {
    bindings
        .iter()
        .filter_map(|b| {
            vars.get(b.var)
                .filter(|v| !v.is_empty())
                .map(|v| (qualified(b.namespace, b.flag), v.clone()))
        })
        .collect()
}

// ============ Config File ============

/// The YAML config file, flattened to dotted keys.
#[derive(Debug, Default, Clone)]
pub struct ConfigFile {
    values: HashMap<String, Value>,
}

impl ConfigFile {
    /// Read and flatten a config file. A missing file yields an empty layer.
    pub fn load(path: &Path) -> CliResult<Self> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no config file");
                return Ok(Self::default());
            }
            Err(err) => {
                return Err(CliError::internal(
                    anyhow::Error::new(err).context(format!("Failed to read config file {}", path.display())),
                ))
            }
        };
        Self::parse(&raw).map_err(|err| CliError::internal(err.context(format!("Malformed config file {}", path.display()))))
    }

    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        let doc: Value = serde_yaml::from_str(raw).context("invalid YAML")?;
        let mut values = HashMap::new();
        match doc {
            Value::Null => {}
            Value::Mapping(_) => flatten("", &doc, &mut values)?,
            _ => return Err(anyhow!("top level must be a mapping")),
        }
        Ok(Self { values })
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn get_string(&self, key: &str) -> Option<String> {
        match self.values.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }
}

fn flatten(prefix: &str, value: &Value, out: &mut HashMap<String, Value>) -> anyhow::Result<()> {
    match value {
        Value::Mapping(map) => {
            for (k, v) in map {
                let k = match k {
                    Value::String(s) => s.clone(),
                    Value::Number(n) => n.to_string(),
                    other => return Err(anyhow!("unsupported key {other:?}")),
                };
                let key = if prefix.is_empty() { k } else { format!("{prefix}.{k}") };
                flatten(&key, v, out)?;
            }
        }
        other => {
            out.insert(prefix.to_string(), other.clone());
        }
    }
    Ok(())
}

/// Join a namespace and a flag name into a config key.
pub fn qualified(ns: &str, name: &str) -> String {
    if ns.is_empty() {
        name.to_string()
    } else {
        format!("{ns}.{name}")
    }
}

// ============ Config Facade ============

/// Where a resolved value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Cli,
    Env,
    File,
    Default,
}

/// Typed, layered lookup of `(namespace, flag)` for one invocation.
#[derive(Debug, Default)]
pub struct Config {
    namespace: String,
    leaf: Vec<FlagDecl>,
    globals: Vec<FlagDecl>,
    cli: HashMap<String, FlagValue>,
    env: HashMap<String, String>,
    file: ConfigFile,
}

impl Config {
    /// `cli` and `env` are keyed by qualified name.
    pub fn new(
        namespace: &str,
        leaf: Vec<FlagDecl>,
        globals: Vec<FlagDecl>,
        cli: HashMap<String, FlagValue>,
        env: HashMap<String, String>,
        file: ConfigFile,
    ) -> Self {
        Self {
            namespace: namespace.to_string(),
            leaf,
            globals,
            cli,
            env,
            file,
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    fn declaration<'a>(&'a self, ns: &'a str, name: &str) -> Option<(&'a str, &'a FlagDecl)> {
        if ns == self.namespace {
            if let Some(decl) = self.leaf.iter().find(|f| f.name == name) {
                return Some((ns, decl));
            }
        }
        self.globals.iter().find(|f| f.name == name).map(|decl| (NS_ROOT, decl))
    }

    /// Resolve a flag through the layers.
    pub fn lookup(&self, ns: &str, name: &str) -> CliResult<(FlagValue, Source)> {
        let (ns, decl) = self
            .declaration(ns, name)
            .ok_or_else(|| CliError::internal(anyhow!("flag --{name} is not declared for {ns:?}")))?;
        let key = qualified(ns, name);

        if let Some(value) = self.cli.get(&key) {
            return Ok((value.clone(), Source::Cli));
        }
        if let Some(raw) = self.env.get(&key) {
            return Ok((coerce_raw(decl.kind(), raw, &key)?, Source::Env));
        }
        if let Some(value) = self.file.get(&key) {
            return Ok((coerce_yaml(decl.kind(), value, &key)?, Source::File));
        }
        Ok((decl.default.clone(), Source::Default))
    }

    /// True when the flag was supplied on the command line, environment or config file.
    pub fn is_set(&self, ns: &str, name: &str) -> bool {
        let Some((ns, _)) = self.declaration(ns, name) else {
            return false;
        };
        let key = qualified(ns, name);
        self.cli.contains_key(&key)
            || self.env.contains_key(&key)
            || self.file.get(&key).is_some()
    }

    pub fn get_string(&self, ns: &str, name: &str) -> CliResult<String> {
        match self.lookup(ns, name)?.0 {
            FlagValue::String(s) => Ok(s),
            other => Err(kind_mismatch(name, FlagKind::String, &other)),
        }
    }

    pub fn get_int(&self, ns: &str, name: &str) -> CliResult<i64> {
        match self.lookup(ns, name)?.0 {
            FlagValue::Int(n) => Ok(n),
            other => Err(kind_mismatch(name, FlagKind::Int, &other)),
        }
    }

    pub fn get_float(&self, ns: &str, name: &str) -> CliResult<f64> {
        match self.lookup(ns, name)?.0 {
            FlagValue::Float(f) => Ok(f),
            other => Err(kind_mismatch(name, FlagKind::Float, &other)),
        }
    }

    pub fn get_bool(&self, ns: &str, name: &str) -> CliResult<bool> {
        match self.lookup(ns, name)?.0 {
            FlagValue::Bool(b) => Ok(b),
            other => Err(kind_mismatch(name, FlagKind::Bool, &other)),
        }
    }

    /// `None` when the flag was not set at all, as opposed to set to false.
    pub fn get_bool_opt(&self, ns: &str, name: &str) -> CliResult<Option<bool>> {
        if !self.is_set(ns, name) {
            return Ok(None);
        }
        self.get_bool(ns, name).map(Some)
    }

    pub fn get_string_slice(&self, ns: &str, name: &str) -> CliResult<Vec<String>> {
        match self.lookup(ns, name)?.0 {
            FlagValue::StringList(items) => Ok(items),
            other => Err(kind_mismatch(name, FlagKind::StringList, &other)),
        }
    }

    /// A raw string from the config file, outside any flag declaration.
    pub fn file_string(&self, key: &str) -> Option<String> {
        self.file.get_string(key)
    }
}

fn kind_mismatch(name: &str, want: FlagKind, got: &FlagValue) -> CliError {
    CliError::internal(anyhow!("flag --{name} read as {want:?} but declared as {:?}", got.kind()))
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

fn coerce_raw(kind: FlagKind, raw: &str, name: &str) -> CliResult<FlagValue> {
    let bad = || CliError::invalid_arg(format!("invalid value {raw:?} for {name} from environment"));
    Ok(match kind {
        FlagKind::String => FlagValue::String(raw.to_string()),
        FlagKind::Int => FlagValue::Int(raw.trim().parse().map_err(|_| bad())?),
        FlagKind::Float => FlagValue::Float(raw.trim().parse().map_err(|_| bad())?),
        FlagKind::Bool => FlagValue::Bool(parse_bool(raw.trim()).ok_or_else(bad)?),
        FlagKind::StringList => FlagValue::StringList(
            raw.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        ),
    })
}

fn coerce_yaml(kind: FlagKind, value: &Value, key: &str) -> CliResult<FlagValue> {
    let bad = || CliError::invalid_arg(format!("config key {key}: expected {}", kind_name(kind)));
    let scalar = |v: &Value| match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    };
    Ok(match kind {
        FlagKind::String => FlagValue::String(scalar(value).ok_or_else(bad)?),
        FlagKind::Int => FlagValue::Int(value.as_i64().ok_or_else(bad)?),
        FlagKind::Float => FlagValue::Float(value.as_f64().ok_or_else(bad)?),
        FlagKind::Bool => FlagValue::Bool(value.as_bool().ok_or_else(bad)?),
        FlagKind::StringList => match value {
            Value::Sequence(items) => FlagValue::StringList(
                items.iter().map(|v| scalar(v).ok_or_else(bad)).collect::<CliResult<_>>()?,
            ),
            Value::String(s) => FlagValue::StringList(
                s.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_string).collect(),
            ),
            _ => return Err(bad()),
        },
    })
}

fn kind_name(kind: FlagKind) -> &'static str {
    match kind {
        FlagKind::String => "a string",
        FlagKind::Int => "an integer",
        FlagKind::Float => "a number",
        FlagKind::Bool => "a boolean",
        FlagKind::StringList => "a list of strings",
    }
}
