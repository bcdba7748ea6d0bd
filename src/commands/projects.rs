//! `oceanctl projects`

use futures_util::future::BoxFuture;
use futures_util::FutureExt;

use crate::api::{ProjectCreate, ProjectUpdate};
use crate::cli::GROUP_MANAGE;
use crate::displayers::{ProjectDisplay, ProjectResourceDisplay};
use crate::framework::command::{add_command, alias, displayer, example, group, Command};
use crate::framework::context::CmdContext;
use crate::framework::error::{CliError, CliResult};
use crate::framework::flags::{add_bool_flag, add_string_flag, add_string_slice_flag, required};

pub const ARG_NAME: &str = "name";
pub const ARG_DESCRIPTION: &str = "description";
pub const ARG_PURPOSE: &str = "purpose";
pub const ARG_ENVIRONMENT: &str = "environment";
pub const ARG_IS_DEFAULT: &str = "is-default";
pub const ARG_RESOURCE: &str = "resource";

/// Scheme prefix of every resource URN.
const URN_SCHEME: &str = "do";

const PROJECT_DETAILS: &str = r#"
- The project's ID
- The project owner's account UUID
- The name of the project
- The project's description
- The project's purpose
- The project's environment (Development, Staging, or Production)
- A boolean indicating whether the project is the default project
- The date and time when the project was created
- The date and time when the project was last updated"#;

pub fn register(root: &mut Command) {
    let cmd = add_command(
        root,
        None,
        "projects",
        "Manage projects and assign resources to them",
        "Projects allow you to organize your resources into groups that fit the way you work. You can group resources (like Droplets, Spaces, load balancers, domains, and floating IPs) in ways that align with the applications you host.",
        vec![group(GROUP_MANAGE)],
    );

    add_command(
        cmd,
        Some(run_projects_list),
        "list",
        "List existing projects",
        &format!("Retrieve a list of all the projects on your account, including:{PROJECT_DETAILS}"),
        vec![
            alias(&["ls"]),
            displayer(ProjectDisplay::COLUMNS),
            example("  oceanctl projects list --format ID,Name"),
        ],
    );

    add_command(
        cmd,
        Some(run_projects_get),
        "get <id>",
        "Retrieve details for a specific project",
        &format!("Retrieve the following details for the given project (use \"default\" for your default project):{PROJECT_DETAILS}"),
        vec![alias(&["g"]), displayer(ProjectDisplay::COLUMNS)],
    );

    let create = add_command(
        cmd,
        Some(run_projects_create),
        "create",
        "Create a new project",
        "Create a new project on your account. A purpose is required.",
        vec![
            alias(&["c"]),
            displayer(ProjectDisplay::COLUMNS),
            example("  oceanctl projects create --name example-project --purpose \"Frontend for example.com\""),
        ],
    );
    add_string_flag(create, ARG_NAME, None, "", "The project's name", &[required()]);
    add_string_flag(create, ARG_PURPOSE, None, "", "The project's purpose", &[required()]);
    add_string_flag(create, ARG_DESCRIPTION, None, "", "A description of the project", &[]);
    add_string_flag(
        create,
        ARG_ENVIRONMENT,
        None,
        "",
        "The environment in which your project resides. Possible values: Development, Staging, or Production",
        &[],
    );

    let update = add_command(
        cmd,
        Some(run_projects_update),
        "update <id>",
        "Update an existing project",
        "Update information about an existing project. Only the fields given as flags are changed.",
        vec![alias(&["u"]), displayer(ProjectDisplay::COLUMNS)],
    );
    add_string_flag(update, ARG_NAME, None, "", "The project's name", &[]);
    add_string_flag(update, ARG_PURPOSE, None, "", "The project's purpose", &[]);
    add_string_flag(update, ARG_DESCRIPTION, None, "", "A description of the project", &[]);
    add_string_flag(
        update,
        ARG_ENVIRONMENT,
        None,
        "",
        "The environment in which your project resides. Possible values: Development, Staging, or Production",
        &[],
    );
    add_bool_flag(update, ARG_IS_DEFAULT, None, false, "Set the specified project as your default project", &[]);

    add_command(
        cmd,
        Some(run_projects_delete),
        "delete <id> [<id>...]",
        "Delete the specified project",
        "Delete one or more projects. A project must have no resources assigned to it before it can be deleted.",
        vec![alias(&["d", "rm"])],
    );

    let resources = add_command(
        cmd,
        None,
        "resources",
        "Manage resources assigned to a project",
        "The subcommands of `oceanctl projects resources` allow you to list and assign resources to your projects.",
        vec![],
    );
    add_command(
        resources,
        Some(run_project_resources_list),
        "list <project-id>",
        "List resources assigned to a project",
        "List all of the resources assigned to the specified project, with each resource's URN, assignment time and status.",
        vec![alias(&["ls"]), displayer(ProjectResourceDisplay::COLUMNS)],
    );
    let assign = add_command(
        resources,
        Some(run_project_resources_assign),
        "assign <project-id> --resource=<urn>",
        "Assign one or more resources to a project",
        "Assign one or more resources to a project. Resources are identified by URN, in the form `do:<resource-type>:<resource-id>`.",
        vec![
            alias(&["a"]),
            displayer(ProjectResourceDisplay::COLUMNS),
            example("  oceanctl projects resources assign 1234 --resource=do:droplet:5678 --resource=do:domain:example.com"),
        ],
    );
    add_string_slice_flag(
        assign,
        ARG_RESOURCE,
        None,
        &[],
        "URNs of the resources to assign to the project",
        &[required()],
    );
}

fn run_projects_list(c: &mut CmdContext) -> BoxFuture<'_, CliResult<()>> {
    async move {
        let projects = c.projects()?.list().await?;
        c.display(&ProjectDisplay(projects))
    }
    .boxed()
}

fn run_projects_get(c: &mut CmdContext) -> BoxFuture<'_, CliResult<()>> {
    async move {
        let id = c.ensure_one_arg()?.to_string();
        let project = c.projects()?.get(&id).await?;
        c.display(&ProjectDisplay(vec![project]))
    }
    .boxed()
}

fn run_projects_create(c: &mut CmdContext) -> BoxFuture<'_, CliResult<()>> {
    async move {
        let req = ProjectCreate {
            name: c.get_string(ARG_NAME)?,
            purpose: c.get_string(ARG_PURPOSE)?,
            description: c.get_string(ARG_DESCRIPTION)?,
            environment: c.get_string(ARG_ENVIRONMENT)?,
        };
        let project = c.projects()?.create(&req).await?;
        c.display(&ProjectDisplay(vec![project]))
    }
    .boxed()
}

fn run_projects_update(c: &mut CmdContext) -> BoxFuture<'_, CliResult<()>> {
    async move {
        let id = c.ensure_one_arg()?.to_string();
        let req = ProjectUpdate {
            name: c.string_if_set(ARG_NAME)?,
            description: c.string_if_set(ARG_DESCRIPTION)?,
            purpose: c.string_if_set(ARG_PURPOSE)?,
            environment: c.string_if_set(ARG_ENVIRONMENT)?,
            is_default: c.get_bool_opt(ARG_IS_DEFAULT)?,
        };
        let project = c.projects()?.update(&id, &req).await?;
        c.display(&ProjectDisplay(vec![project]))
    }
    .boxed()
}

fn run_projects_delete(c: &mut CmdContext) -> BoxFuture<'_, CliResult<()>> {
    async move {
        let ids = c.ensure_min_args(1)?.to_vec();
        if !c.force()? {
            c.ask_for_confirm_delete("project", ids.len()).await?;
        }
        let projects = c.projects()?;
        for id in &ids {
            projects.delete(id).await?;
        }
        Ok(())
    }
    .boxed()
}

fn run_project_resources_list(c: &mut CmdContext) -> BoxFuture<'_, CliResult<()>> {
    async move {
        let id = c.ensure_one_arg()?.to_string();
        let resources = c.projects()?.list_resources(&id).await?;
        c.display(&ProjectResourceDisplay(resources))
    }
    .boxed()
}

fn run_project_resources_assign(c: &mut CmdContext) -> BoxFuture<'_, CliResult<()>> {
    async move {
        let id = c.ensure_one_arg()?.to_string();
        let urns = c.get_string_slice(ARG_RESOURCE)?;
        for urn in &urns {
            validate_urn(urn)?;
        }
        let assigned = c.projects()?.assign_resources(&id, &urns).await?;
        c.display(&ProjectResourceDisplay(assigned))
    }
    .boxed()
}

/// Accept `do:<type>:<id>` with non-empty type and id.
fn validate_urn(urn: &str) -> CliResult<()> {
    let mut parts = urn.splitn(3, ':');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(URN_SCHEME), Some(kind), Some(id)) if !kind.is_empty() && !id.is_empty() => Ok(()),
        _ => Err(CliError::invalid_arg(format!(
            "invalid resource URN {urn:?}; expected {URN_SCHEME}:<resource-type>:<resource-id>"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("do:droplet:1234", true)]
    #[case("do:domain:example.com", true)]
    #[case("do:space:a:b", true)]
    #[case("droplet:1234", false)]
    #[case("do:droplet:", false)]
    #[case("do::1234", false)]
    #[case("aws:droplet:1", false)]
    fn urns_must_follow_the_scheme(#[case] urn: &str, #[case] valid: bool) {
        assert_eq!(validate_urn(urn).is_ok(), valid, "{urn}");
    }
}
