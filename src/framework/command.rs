//! The command tree: declaration, validation, argv resolution and branch help.

use std::collections::HashSet;
use std::fmt::Write as _;

use anyhow::anyhow;
use clap::{Arg, ArgAction};
use futures_util::future::BoxFuture;

use super::context::CmdContext;
use super::error::{CliError, CliResult};
use super::flags::FlagDecl;
use crate::output::ColumnSet;

/// Id of the hidden positional that collects a leaf's arguments.
pub(crate) const POSITIONAL_ID: &str = "__args";

/// Namespace of the root command and its global flags.
pub const NS_ROOT: &str = "";

/// A leaf's entry point. Written as `|ctx| async move { ... }.boxed()`.
pub type Handler = for<'a> fn(&'a mut CmdContext) -> BoxFuture<'a, CliResult<()>>;

pub struct Command {
    pub name: String,
    pub usage: String,
    pub aliases: Vec<String>,
    pub short: String,
    pub long: String,
    pub example: Option<String>,
    pub group: Option<String>,
    pub hidden: bool,
    pub flags: Vec<FlagDecl>,
    pub handler: Option<Handler>,
    pub children: Vec<Command>,
    pub columns: Option<ColumnSet>,
    pub help_groups: Vec<(String, String)>,
    /// Names from the root down to this command, assigned when the tree is frozen.
    pub path: Vec<String>,
}

/// Options applied to a command when it is attached to its parent.
#[derive(Debug, Clone)]
pub enum CommandOption {
    Alias(Vec<String>),
    Hidden,
    Displayer(ColumnSet),
    Group(String),
    Example(String),
}

pub fn alias(names: &[&str]) -> CommandOption {
    CommandOption::Alias(names.iter().map(|n| (*n).to_string()).collect())
}

pub fn hidden() -> CommandOption {
    CommandOption::Hidden
}

pub fn displayer(columns: ColumnSet) -> CommandOption {
    CommandOption::Displayer(columns)
}

pub fn group(id: &str) -> CommandOption {
    CommandOption::Group(id.to_string())
}

pub fn example(text: &str) -> CommandOption {
    CommandOption::Example(text.to_string())
}

impl Command {
    /// A detached command built from a use line such as `"get <id>"`.
    pub fn root(use_line: &str, short: &str, long: &str) -> Self {
        let (name, usage) = match use_line.trim().split_once(' ') {
            Some((name, rest)) => (name.to_string(), rest.trim().to_string()),
            None => (use_line.trim().to_string(), String::new()),
        };
        Self {
            name,
            usage,
            aliases: Vec::new(),
            short: short.to_string(),
            long: long.to_string(),
            example: None,
            group: None,
            hidden: false,
            flags: Vec::new(),
            handler: None,
            children: Vec::new(),
            columns: None,
            help_groups: Vec::new(),
            path: Vec::new(),
        }
    }

    pub fn add_help_group(&mut self, id: &str, title: &str) {
        self.help_groups.push((id.to_string(), title.to_string()));
    }

    /// Runnable commands are leaves even when they also group children.
    pub fn is_leaf(&self) -> bool {
        self.handler.is_some()
    }

    pub fn namespace(&self) -> String {
        self.path.iter().skip(1).cloned().collect::<Vec<_>>().join(".")
    }

    /// The full usage line, e.g. `oceanctl projects get <id>`.
    pub fn usage_line(&self) -> String {
        let mut line = self.path.join(" ");
        if !self.usage.is_empty() {
            line.push(' ');
            line.push_str(&self.usage);
        }
        line
    }

    fn matches(&self, token: &str) -> bool {
        self.name == token || self.aliases.iter().any(|a| a == token)
    }

    fn flag(&self, name: &str) -> Option<&FlagDecl> {
        self.flags.iter().find(|f| f.name == name)
    }

    fn flag_by_short(&self, short: char) -> Option<&FlagDecl> {
        self.flags.iter().find(|f| f.short == Some(short))
    }

    fn apply(&mut self, opt: CommandOption) {
        match opt {
            CommandOption::Alias(names) => self.aliases.extend(names),
            CommandOption::Hidden => self.hidden = true,
            CommandOption::Displayer(columns) => self.columns = Some(columns),
            CommandOption::Group(id) => self.group = Some(id),
            CommandOption::Example(text) => self.example = Some(text),
        }
    }
}

/// Attach a child to `parent` and return it for further flag declarations.
pub fn add_command<'a>(
    parent: &'a mut Command,
    handler: Option<Handler>,
    use_line: &str,
    short: &str,
    long: &str,
    opts: Vec<CommandOption>,
) -> &'a mut Command {
    let mut cmd = Command::root(use_line, short, long);
    cmd.handler = handler;
    for opt in opts {
        cmd.apply(opt);
    }
    let idx = parent.children.len();
    parent.children.push(cmd);
    &mut parent.children[idx]
}

/// What a leaf needs to know about itself at run time.
#[derive(Debug, Clone)]
pub struct CommandInfo {
    pub path: Vec<String>,
    pub usage: String,
    pub flags: Vec<FlagDecl>,
    pub columns: Option<ColumnSet>,
}

/// Result of walking argv down the tree.
pub struct Resolution<'t> {
    pub command: &'t Command,
    /// argv minus the tokens consumed as command names.
    pub rest: Vec<String>,
}

/// A frozen, validated command tree.
pub struct CommandTree {
    root: Command,
}

impl CommandTree {
    pub fn new(mut root: Command) -> CliResult<Self> {
        assign_paths(&mut root, &[]);
        validate(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Command {
        &self.root
    }

    pub fn globals(&self) -> &[FlagDecl] {
        &self.root.flags
    }

    pub fn find(&self, path: &[&str]) -> Option<&Command> {
        let mut node = &self.root;
        for name in path {
            node = node.children.iter().find(|c| c.matches(name))?;
        }
        Some(node)
    }

    pub fn resolve(&self, argv: &[String]) -> Resolution<'_> {
        let mut node = &self.root;
        let mut rest = Vec::with_capacity(argv.len());
        let mut i = 0;

        while i < argv.len() {
            let token = argv[i].as_str();
            let skip = self.global_token_width(token);
            if skip > 0 {
                rest.extend(argv[i..(i + skip).min(argv.len())].iter().cloned());
                i += skip;
                continue;
            }
            match node.children.iter().find(|c| c.matches(token)) {
                Some(child) => {
                    node = child;
                    i += 1;
                }
                None => break,
            }
        }
        rest.extend(argv.iter().skip(i).cloned());

        Resolution { command: node, rest }
    }

    /// Number of tokens a global flag (or help switch) occupies at this position; 0 if none.
    fn global_token_width(&self, token: &str) -> usize {
        if token == "-h" || token == "--help" {
            return 1;
        }
        let decl = if let Some(long) = token.strip_prefix("--") {
            match long.split_once('=') {
                Some((name, _)) => return usize::from(self.root.flag(name).is_some()),
                None => self.root.flag(long),
            }
        } else if let Some(short) = token.strip_prefix('-') {
            let mut chars = short.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => self.root.flag_by_short(c),
                _ => None,
            }
        } else {
            None
        };
        match decl {
            Some(decl) if decl.takes_value() => 2,
            Some(_) => 1,
            None => 0,
        }
    }

    /// Flags in effect for a leaf: its own, then globals it does not shadow.
    pub fn effective_flags(&self, leaf: &Command) -> (Vec<FlagDecl>, Vec<FlagDecl>) {
        let own = leaf.flags.clone();
        let mut globals = Vec::new();
        if leaf.path.len() > 1 {
            for flag in &self.root.flags {
                if own.iter().any(|f| f.name == flag.name) {
                    continue;
                }
                let mut flag = flag.clone();
                if flag.short.is_some() && own.iter().any(|f| f.short == flag.short) {
                    flag.short = None;
                }
                globals.push(flag);
            }
        }
        (own, globals)
    }

    /// The clap parser for a leaf's flag tokens.
    pub fn leaf_parser(&self, leaf: &Command, flags: &[FlagDecl]) -> clap::Command {
        let mut parser = clap::Command::new(leaf.path.join(" "))
            .no_binary_name(true)
            .args_override_self(true)
            .disable_version_flag(true)
            .about(leaf.short.clone())
            .override_usage(format!("{} [flags]", leaf.usage_line()))
            .arg(
                Arg::new(POSITIONAL_ID)
                    .num_args(0..)
                    .action(ArgAction::Append)
                    .hide(true),
            );
        if !leaf.long.is_empty() {
            parser = parser.long_about(leaf.long.clone());
        }
        if let Some(example) = &leaf.example {
            parser = parser.after_help(format!("Example:\n{example}"));
        }
        for flag in flags {
            parser = parser.arg(flag.to_arg());
        }
        parser
    }

    pub fn info(&self, leaf: &Command) -> CommandInfo {
        let (own, globals) = self.effective_flags(leaf);
        CommandInfo {
            path: leaf.path.clone(),
            usage: leaf.usage.clone(),
            flags: own.into_iter().chain(globals).collect(),
            columns: leaf.columns,
        }
    }

    /// Help text for a command with children.
    pub fn branch_help(&self, branch: &Command) -> String {
        let mut help = String::new();
        let description = if branch.long.is_empty() { &branch.short } else { &branch.long };
        if !description.is_empty() {
            let _ = writeln!(help, "{}\n", description.trim_end());
        }

        let _ = writeln!(help, "Usage:\n  {} [command]\n", branch.path.join(" "));
        if !branch.aliases.is_empty() {
            let _ = writeln!(help, "Aliases:\n  {}, {}\n", branch.name, branch.aliases.join(", "));
        }
        if let Some(example) = &branch.example {
            let _ = writeln!(help, "Example:\n{}\n", example.trim_end());
        }

        let visible: Vec<&Command> = branch.children.iter().filter(|c| !c.hidden).collect();
        let width = visible.iter().map(|c| c.name.len()).max().unwrap_or(0);
        let mut sections: Vec<(String, Vec<&Command>)> = vec![("Available Commands".to_string(), Vec::new())];
        for (id, title) in &branch.help_groups {
            sections.push((title.clone(), visible.iter().copied().filter(|c| c.group.as_deref() == Some(id)).collect()));
        }
        sections[0].1 = visible.iter().copied().filter(|c| c.group.is_none()).collect();

        for (title, children) in sections.iter().filter(|(_, c)| !c.is_empty()) {
            let _ = writeln!(help, "{title}:");
            for child in children {
                let _ = writeln!(help, "  {:<width$}  {}", child.name, child.short);
            }
            help.push('\n');
        }

        let globals: Vec<&FlagDecl> = self.root.flags.iter().filter(|f| !f.hidden).collect();
        if !globals.is_empty() {
            help.push_str("Global Flags:\n");
            help.push_str(&flag_table(&globals));
            help.push('\n');
        }

        let _ = writeln!(
            help,
            "Use \"{} [command] --help\" for more information about a command.",
            branch.path.join(" ")
        );
        help
    }
}

fn flag_table(flags: &[&FlagDecl]) -> String {
    let lefts: Vec<String> = flags
        .iter()
        .map(|f| {
            let short = f.short.map(|c| format!("-{c}, ")).unwrap_or_else(|| "    ".to_string());
            format!("{short}--{}", f.name)
        })
        .collect();
    let width = lefts.iter().map(String::len).max().unwrap_or(0);
    let mut table = String::new();
    for (left, flag) in lefts.iter().zip(flags) {
        let _ = writeln!(table, "  {left:<width$}   {}", flag.description);
    }
    table
}

fn assign_paths(cmd: &mut Command, parent: &[String]) {
    let mut path = parent.to_vec();
    path.push(cmd.name.clone());
    for child in &mut cmd.children {
        assign_paths(child, &path);
    }
    cmd.path = path;
}

fn validate(cmd: &Command) -> CliResult<()> {
    let at = cmd.path.join(" ");
    if cmd.handler.is_none() && cmd.children.is_empty() {
        return Err(CliError::internal(anyhow!("command {at:?} has neither a handler nor subcommands")));
    }

    let mut names = HashSet::new();
    let mut shorts = HashSet::new();
    for flag in &cmd.flags {
        if !names.insert(flag.name.as_str()) {
            return Err(CliError::internal(anyhow!("flag --{} declared twice on {at:?}", flag.name)));
        }
        if let Some(short) = flag.short {
            if !shorts.insert(short) {
                return Err(CliError::internal(anyhow!("short flag -{short} declared twice on {at:?}")));
            }
        }
    }

    let mut seen = HashSet::new();
    for child in &cmd.children {
        for name in std::iter::once(&child.name).chain(&child.aliases) {
            if !seen.insert(name.as_str()) {
                return Err(CliError::internal(anyhow!("{name:?} is used twice under {at:?}")));
            }
        }
        if let Some(id) = &child.group {
            if !cmd.help_groups.iter().any(|(known, _)| known == id) {
                return Err(CliError::internal(anyhow!(
                    "command {:?} references undeclared help group {id:?}",
                    child.name
                )));
            }
        }
        validate(child)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framework::flags::{add_bool_flag, add_string_flag};
    use futures_util::FutureExt;

    fn noop(_: &mut CmdContext) -> BoxFuture<'_, CliResult<()>> {
        async { Ok(()) }.boxed()
    }

    fn tree() -> CommandTree {
        let mut root = Command::root("oceanctl", "root", "");
        add_string_flag(&mut root, "access-token", Some('t'), "", "API token", &[]);
        add_bool_flag(&mut root, "force", Some('f'), false, "skip confirmation", &[]);
        root.add_help_group("manage", "Manage Resources");

        let projects = add_command(&mut root, None, "projects", "Manage projects", "", vec![group("manage")]);
        add_command(projects, Some(noop), "list", "List projects", "", vec![alias(&["ls"])]);
        add_command(projects, Some(noop), "get <id>", "Get a project", "", vec![alias(&["g"])]);
        add_command(projects, Some(noop), "secret", "Hidden", "", vec![hidden()]);
        let resources = add_command(projects, None, "resources", "Manage resources", "", vec![]);
        add_command(resources, Some(noop), "list <project-id>", "List resources", "", vec![alias(&["ls"])]);

        CommandTree::new(root).expect("valid tree")
    }

    fn argv(tokens: &[&str]) -> Vec<String> {
        tokens.iter().map(|t| (*t).to_string()).collect()
    }

    #[test]
    fn resolves_through_aliases_and_keeps_remaining_tokens() {
        let tree = tree();
        let res = tree.resolve(&argv(&["projects", "resources", "ls", "abc", "--format", "ID"]));
        assert_eq!(res.command.path, ["oceanctl", "projects", "resources", "list"]);
        assert_eq!(res.command.namespace(), "projects.resources.list");
        assert_eq!(res.rest, argv(&["abc", "--format", "ID"]));
    }

    #[test]
    fn global_flags_are_skipped_with_their_values() {
        let tree = tree();
        let res = tree.resolve(&argv(&["-t", "tok", "projects", "--force", "g", "x"]));
        assert_eq!(res.command.name, "get");
        assert_eq!(res.rest, argv(&["-t", "tok", "--force", "x"]));
    }

    #[test]
    fn resolution_stops_at_a_branch_on_unknown_token() {
        let tree = tree();
        let res = tree.resolve(&argv(&["projects", "bogus"]));
        assert_eq!(res.command.name, "projects");
        assert!(!res.command.is_leaf());
    }

    #[test]
    fn parent_with_a_handler_is_runnable() {
        let mut root = Command::root("oceanctl", "", "");
        let apps = add_command(&mut root, Some(noop), "apps", "Apps", "", vec![]);
        add_command(apps, Some(noop), "list", "List apps", "", vec![]);
        let tree = CommandTree::new(root).expect("valid tree");

        let res = tree.resolve(&argv(&["apps", "web"]));
        assert_eq!(res.command.name, "apps");
        assert!(res.command.is_leaf());
        assert_eq!(res.rest, argv(&["web"]));
        assert_eq!(tree.resolve(&argv(&["apps", "list"])).command.name, "list");
    }

    #[test]
    fn branch_help_lists_visible_children() {
        let tree = tree();
        let projects = tree.find(&["projects"]).expect("projects");
        let help = tree.branch_help(projects);
        assert!(help.contains("  list"));
        assert!(help.contains("  resources"));
        assert!(!help.contains("secret"));
        assert!(help.contains("--access-token"));

        let root_help = tree.branch_help(tree.root());
        assert!(root_help.contains("Manage Resources:\n  projects"));
    }

    #[test]
    fn duplicate_alias_under_one_parent_is_rejected() {
        let mut root = Command::root("oceanctl", "", "");
        add_command(&mut root, Some(noop), "list", "", "", vec![alias(&["ls"])]);
        add_command(&mut root, Some(noop), "ls", "", "", vec![]);
        let err = CommandTree::new(root).err().expect("duplicate");
        assert!(matches!(err, CliError::Internal { .. }));
    }

    #[test]
    fn command_without_handler_or_children_is_rejected() {
        let mut root = Command::root("oceanctl", "", "");
        add_command(&mut root, None, "empty", "", "", vec![]);
        assert!(CommandTree::new(root).is_err());
    }

    #[test]
    fn undeclared_help_group_is_rejected() {
        let mut root = Command::root("oceanctl", "", "");
        add_command(&mut root, Some(noop), "list", "", "", vec![group("nope")]);
        assert!(CommandTree::new(root).is_err());
    }

    #[test]
    fn leaf_flags_shadow_globals() {
        let mut root = Command::root("oceanctl", "", "");
        add_string_flag(&mut root, "name", Some('n'), "", "global", &[]);
        add_bool_flag(&mut root, "force", Some('f'), false, "", &[]);
        let leaf = add_command(&mut root, Some(noop), "create", "", "", vec![]);
        add_string_flag(leaf, "name", None, "", "leaf", &[]);
        add_string_flag(leaf, "format", Some('f'), "", "", &[]);
        let tree = CommandTree::new(root).expect("valid");

        let leaf = tree.find(&["create"]).expect("leaf");
        let (own, globals) = tree.effective_flags(leaf);
        assert_eq!(own.len(), 2);
        assert_eq!(globals.len(), 1);
        assert_eq!(globals[0].name, "force");
        assert_eq!(globals[0].short, None);
    }
}
