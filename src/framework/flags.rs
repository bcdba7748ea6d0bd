//! Typed flag declarations bound to a command, and their translation to clap.

use clap::builder::{PossibleValuesParser, TypedValueParser};
use clap::error::{ContextKind, ContextValue, ErrorKind};
use clap::parser::ValueSource;
use clap::{Arg, ArgAction, ArgMatches};

use super::command::Command;
use super::error::CliError;

/// Largest edit distance at which an unknown flag still gets a suggestion.
const SUGGESTION_DISTANCE: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagKind {
    String,
    Int,
    Float,
    Bool,
    StringList,
}

impl FlagKind {
    fn value_name(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Int => "int",
            Self::Float => "float",
            Self::Bool => "bool",
            Self::StringList => "strings",
        }
    }
}

/// A flag value tagged with its type.
#[derive(Debug, Clone, PartialEq)]
pub enum FlagValue {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    StringList(Vec<String>),
}

impl FlagValue {
    pub fn kind(&self) -> FlagKind {
        match self {
            Self::String(_) => FlagKind::String,
            Self::Int(_) => FlagKind::Int,
            Self::Float(_) => FlagKind::Float,
            Self::Bool(_) => FlagKind::Bool,
            Self::StringList(_) => FlagKind::StringList,
        }
    }

    /// Rendering used in help output; empty for "zero" defaults.
    fn help_default(&self) -> Option<String> {
        match self {
            Self::String(s) if !s.is_empty() => Some(format!("{s:?}")),
            Self::Int(n) if *n != 0 => Some(n.to_string()),
            Self::Float(f) if *f != 0.0 => Some(f.to_string()),
            Self::Bool(true) => Some("true".to_string()),
            Self::StringList(items) if !items.is_empty() => Some(format!("[{}]", items.join(","))),
            _ => None,
        }
    }
}

/// Options applied to a flag when it is declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagOption {
    Required,
    Hidden,
}

pub fn required() -> FlagOption {
    FlagOption::Required
}

pub fn hidden() -> FlagOption {
    FlagOption::Hidden
}

#[derive(Debug, Clone)]
pub struct FlagDecl {
    pub name: String,
    pub short: Option<char>,
    pub default: FlagValue,
    pub description: String,
    pub required: bool,
    pub hidden: bool,
}

impl FlagDecl {
    pub fn kind(&self) -> FlagKind {
        self.default.kind()
    }

    /// Whether `--name value` (as opposed to `--name=value`) consumes the next token.
    pub(crate) fn takes_value(&self) -> bool {
        self.kind() != FlagKind::Bool
    }

    pub(crate) fn to_arg(&self) -> Arg {
        let mut help = self.description.clone();
        if self.required {
            help.push_str(" (required)");
        }
        if let Some(default) = self.default.help_default() {
            help.push_str(&format!(" (default {default})"));
        }

        let mut arg = Arg::new(self.name.clone())
            .long(self.name.clone())
            .help(help)
            .hide(self.hidden)
            .value_name(self.kind().value_name());
        if let Some(short) = self.short {
            arg = arg.short(short);
        }

        match self.kind() {
            FlagKind::String => arg.action(ArgAction::Set),
            FlagKind::Int => arg
                .action(ArgAction::Set)
                .allow_negative_numbers(true)
                .value_parser(clap::value_parser!(i64)),
            FlagKind::Float => arg
                .action(ArgAction::Set)
                .allow_negative_numbers(true)
                .value_parser(clap::value_parser!(f64)),
            FlagKind::Bool => arg
                .action(ArgAction::Set)
                .num_args(0..=1)
                .require_equals(true)
                .default_missing_value("true")
                .value_parser(
                    PossibleValuesParser::new(["true", "false", "1", "0"])
                        .map(|raw| raw == "true" || raw == "1"),
                ),
            FlagKind::StringList => arg.action(ArgAction::Append).value_delimiter(','),
        }
    }

    /// The value given on the command line, if the user supplied one.
    pub(crate) fn extract(&self, matches: &ArgMatches) -> Option<FlagValue> {
        if matches.value_source(&self.name) != Some(ValueSource::CommandLine) {
            return None;
        }
        let id = self.name.as_str();
        let value = match self.kind() {
            FlagKind::String => FlagValue::String(matches.get_one::<String>(id)?.clone()),
            FlagKind::Int => FlagValue::Int(*matches.get_one::<i64>(id)?),
            FlagKind::Float => FlagValue::Float(*matches.get_one::<f64>(id)?),
            FlagKind::Bool => FlagValue::Bool(*matches.get_one::<bool>(id)?),
            FlagKind::StringList => FlagValue::StringList(
                matches
                    .get_many::<String>(id)
                    .map(|values| values.filter(|v| !v.is_empty()).cloned().collect())
                    .unwrap_or_default(),
            ),
        };
        Some(value)
    }
}

fn declare(cmd: &mut Command, name: &str, short: Option<char>, default: FlagValue, desc: &str, opts: &[FlagOption]) {
    let mut decl = FlagDecl {
        name: name.to_string(),
        short,
        default,
        description: desc.to_string(),
        required: false,
        hidden: false,
    };
    for opt in opts {
        match opt {
            FlagOption::Required => decl.required = true,
            FlagOption::Hidden => decl.hidden = true,
        }
    }
    cmd.flags.push(decl);
}

pub fn add_string_flag(cmd: &mut Command, name: &str, short: Option<char>, default: &str, desc: &str, opts: &[FlagOption]) {
    declare(cmd, name, short, FlagValue::String(default.to_string()), desc, opts);
}

pub fn add_int_flag(cmd: &mut Command, name: &str, short: Option<char>, default: i64, desc: &str, opts: &[FlagOption]) {
    declare(cmd, name, short, FlagValue::Int(default), desc, opts);
}

pub fn add_float_flag(cmd: &mut Command, name: &str, short: Option<char>, default: f64, desc: &str, opts: &[FlagOption]) {
    declare(cmd, name, short, FlagValue::Float(default), desc, opts);
}

pub fn add_bool_flag(cmd: &mut Command, name: &str, short: Option<char>, default: bool, desc: &str, opts: &[FlagOption]) {
    declare(cmd, name, short, FlagValue::Bool(default), desc, opts);
}

pub fn add_string_slice_flag(
    cmd: &mut Command,
    name: &str,
    short: Option<char>,
    default: &[&str],
    desc: &str,
    opts: &[FlagOption],
) {
    let default = default.iter().map(|s| (*s).to_string()).collect();
    declare(cmd, name, short, FlagValue::StringList(default), desc, opts);
}

/// Closest known flag name within the suggestion distance.
pub(crate) fn suggest<'a>(unknown: &str, known: impl IntoIterator<Item = &'a str>) -> Option<&'a str> {
    known
        .into_iter()
        .map(|name| (strsim::levenshtein(unknown, name), name))
        .filter(|(distance, _)| *distance <= SUGGESTION_DISTANCE)
        .min_by_key(|(distance, _)| *distance)
        .map(|(_, name)| name)
}

/// Translate a clap parse failure into the error taxonomy.
pub(crate) fn from_clap_error<'a>(err: &clap::Error, known: impl IntoIterator<Item = &'a str>) -> CliError {
    let invalid = match err.get(ContextKind::InvalidArg) {
        Some(ContextValue::String(arg)) => Some(arg.clone()),
        _ => None,
    };

    match (err.kind(), invalid) {
        (ErrorKind::UnknownArgument, Some(arg)) => {
            let bare = arg.trim_start_matches('-');
            let bare = bare.split_once('=').map_or(bare, |(name, _)| name);
            match suggest(bare, known) {
                Some(name) => CliError::invalid_arg(format!("unknown flag: {arg} (did you mean --{name}?)")),
                None => CliError::invalid_arg(format!("unknown flag: {arg}")),
            }
        }
        (ErrorKind::InvalidValue | ErrorKind::ValueValidation, Some(arg)) => {
            let value = match err.get(ContextKind::InvalidValue) {
                Some(ContextValue::String(value)) => value.clone(),
                _ => String::new(),
            };
            CliError::invalid_arg(format!("invalid value {value:?} for flag {arg}"))
        }
        _ => {
            let rendered = err.render().to_string();
            let first = rendered.lines().next().unwrap_or_default();
            CliError::invalid_arg(first.trim_start_matches("error: ").to_string())
        }
    }
}
