//! CLI definition: the root command, global flags and environment bindings.

use crate::api::DEFAULT_API_URL;
use crate::commands;
use crate::config::EnvBinding;
use crate::framework::command::{Command, CommandTree, NS_ROOT};
use crate::framework::error::CliResult;
use crate::framework::flags::{add_bool_flag, add_string_flag, hidden};

pub const ARG_ACCESS_TOKEN: &str = "access-token";
pub const ARG_CONTEXT: &str = "context";
pub const ARG_CONFIG: &str = "config";
pub const ARG_OUTPUT: &str = "output";
pub const ARG_FORMAT: &str = "format";
pub const ARG_NO_HEADER: &str = "no-header";
pub const ARG_VERBOSE: &str = "verbose";
pub const ARG_TRACE: &str = "trace";
pub const ARG_FORCE: &str = "force";
pub const ARG_INTERACTIVE: &str = "interactive";
pub const ARG_API_URL: &str = "api-url";

pub const GROUP_MANAGE: &str = "manage";
pub const GROUP_CONFIGURE: &str = "configure";

/// Environment variables read as flags, by namespace.
pub const ENV_BINDINGS: &[EnvBinding] = &[
    EnvBinding { var: "DIGITALOCEAN_ACCESS_TOKEN", namespace: NS_ROOT, flag: ARG_ACCESS_TOKEN },
    EnvBinding { var: "DIGITALOCEAN_CONTEXT", namespace: NS_ROOT, flag: ARG_CONTEXT },
    EnvBinding { var: "DIGITALOCEAN_API_URL", namespace: NS_ROOT, flag: ARG_API_URL },
    EnvBinding { var: "OCEANCTL_OUTPUT", namespace: NS_ROOT, flag: ARG_OUTPUT },
];

const ROOT_LONG: &str = r#"oceanctl is a command-line interface for the DigitalOcean control plane.

Commands follow the pattern `oceanctl <resource> <verb> [args] [flags]`.
Authenticate with --access-token, the DIGITALOCEAN_ACCESS_TOKEN variable,
or an auth context in the config file."#;

/// Build and freeze the full command tree.
pub fn build() -> CliResult<CommandTree> {
    let mut root = Command::root(
        "oceanctl",
        "oceanctl is a command-line interface for the DigitalOcean control plane",
        ROOT_LONG,
    );
    root.add_help_group(GROUP_MANAGE, "Manage Resources");
    root.add_help_group(GROUP_CONFIGURE, "Configure oceanctl");

    add_string_flag(&mut root, ARG_ACCESS_TOKEN, Some('t'), "", "API V2 access token", &[]);
    add_string_flag(&mut root, ARG_CONTEXT, None, "", "Specify a custom authentication context name", &[]);
    add_string_flag(&mut root, ARG_CONFIG, Some('c'), "", "Specify a custom config file", &[]);
    add_string_flag(
        &mut root,
        ARG_OUTPUT,
        Some('o'),
        "table",
        "Desired output format [table|json|template]",
        &[],
    );
    add_string_flag(
        &mut root,
        ARG_FORMAT,
        None,
        "",
        "Columns for output in a comma-separated list, or a template with --output template",
        &[],
    );
    add_bool_flag(&mut root, ARG_NO_HEADER, None, false, "Return raw data with no headers", &[]);
    add_bool_flag(&mut root, ARG_VERBOSE, Some('v'), false, "Enable verbose output", &[]);
    add_bool_flag(&mut root, ARG_TRACE, None, false, "Show a log of network activity", &[]);
    add_bool_flag(&mut root, ARG_FORCE, Some('f'), false, "Skip confirmation prompts", &[]);
    add_bool_flag(&mut root, ARG_INTERACTIVE, None, true, "Enable interactive behavior", &[]);
    add_string_flag(&mut root, ARG_API_URL, Some('u'), DEFAULT_API_URL, "Override default API endpoint", &[hidden()]);

    commands::register(&mut root);

    CommandTree::new(root)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tree_builds_and_exposes_the_skeleton() {
        let tree = build().expect("tree");
        for path in [
            &["projects", "list"][..],
            &["projects", "resources", "assign"],
            &["attachment", "delete"],
            &["version"],
        ] {
            let cmd = tree.find(path).unwrap_or_else(|| panic!("missing {path:?}"));
            assert!(cmd.handler.is_some(), "{path:?} has no handler");
        }
        assert_eq!(tree.find(&["projects", "rm"]).map(|c| c.name.as_str()), Some("delete"));
    }

    #[test]
    fn api_url_is_hidden_from_help() {
        let tree = build().expect("tree");
        let help = tree.branch_help(tree.root());
        assert!(help.contains("--access-token"));
        assert!(!help.contains("--api-url"));
        assert!(help.contains("Manage Resources:"));
    }
}
