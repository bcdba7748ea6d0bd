//! `oceanctl attachment`

use std::sync::Arc;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;

use crate::api::{Bgp, PartnerAttachmentCreate, PartnerAttachmentUpdate, PartnerAttachmentsService};
use crate::cli::GROUP_MANAGE;
use crate::displayers::PartnerAttachmentDisplay;
use crate::framework::command::{add_command, alias, displayer, example, group, Command};
use crate::framework::context::CmdContext;
use crate::framework::error::CliResult;
use crate::framework::flags::{add_bool_flag, add_int_flag, add_string_flag, add_string_slice_flag, required};

pub const ARG_NAME: &str = "name";
pub const ARG_BANDWIDTH: &str = "connection-bandwidth-in-mbps";
pub const ARG_REGION: &str = "region";
pub const ARG_NAAS_PROVIDER: &str = "naas-provider";
pub const ARG_VPC_IDS: &str = "vpc-ids";
pub const ARG_BGP_LOCAL_ASN: &str = "bgp-local-asn";
pub const ARG_BGP_LOCAL_ROUTER_IP: &str = "bgp-local-router-ip";
pub const ARG_BGP_PEER_ASN: &str = "bgp-peer-asn";
pub const ARG_BGP_PEER_ROUTER_IP: &str = "bgp-peer-router-ip";
pub const ARG_BGP_AUTH_KEY: &str = "bgp-auth-key";
pub const ARG_WAIT: &str = "wait";

pub const STATE_ACTIVE: &str = "ACTIVE";
pub const STATE_DELETED: &str = "DELETED";

const ATTACHMENT_DETAILS: &str = r#"
- The Partner Attachment ID
- The Partner Attachment name
- The Partner Attachment state
- The connection bandwidth in Mbps
- The region
- The NaaS provider
- The VPC network IDs
- The creation date, in ISO8601 combined date and time format
- The BGP local and peer ASNs and router IPs"#;

pub fn register(root: &mut Command) {
    let cmd = add_command(
        root,
        None,
        "attachment",
        "Manage Partner Attachments",
        "The commands under `oceanctl attachment` are for managing your Partner Attachments.\n\nWith the Partner Attachment commands, you can get, list, create, update, or delete Partner Attachments.",
        vec![group(GROUP_MANAGE)],
    );

    let create = add_command(
        cmd,
        Some(run_attachment_create),
        "create",
        "Create a Partner Attachment",
        "Use this command to create a new Partner Attachment on your account.",
        vec![
            alias(&["c"]),
            displayer(PartnerAttachmentDisplay::COLUMNS),
            example("  oceanctl attachment create --name example-pia --connection-bandwidth-in-mbps 50 --naas-provider MEGAPORT --region nyc --vpc-ids c5537207-ebf0-47cb-bc10-6fac717cd672"),
        ],
    );
    add_string_flag(create, ARG_NAME, None, "", "Name of the Partner Attachment", &[required()]);
    add_int_flag(create, ARG_BANDWIDTH, None, 0, "Connection Bandwidth in Mbps", &[required()]);
    add_string_flag(create, ARG_REGION, None, "", "Region", &[required()]);
    add_string_flag(create, ARG_NAAS_PROVIDER, None, "", "NaaS Provider", &[required()]);
    add_string_slice_flag(create, ARG_VPC_IDS, None, &[], "VPC network IDs", &[required()]);
    add_int_flag(create, ARG_BGP_LOCAL_ASN, None, 0, "BGP Local ASN", &[]);
    add_string_flag(create, ARG_BGP_LOCAL_ROUTER_IP, None, "", "BGP Local Router IP", &[]);
    add_int_flag(create, ARG_BGP_PEER_ASN, None, 0, "BGP Peer ASN", &[]);
    add_string_flag(create, ARG_BGP_PEER_ROUTER_IP, None, "", "BGP Peer Router IP", &[]);
    add_string_flag(create, ARG_BGP_AUTH_KEY, None, "", "BGP Auth Key", &[]);
    add_bool_flag(
        create,
        ARG_WAIT,
        None,
        false,
        "Wait for the Partner Attachment to become active before returning control to the terminal",
        &[],
    );

    add_command(
        cmd,
        Some(run_attachment_get),
        "get <partner-attachment-id>",
        "Retrieve a Partner Attachment",
        &format!("Retrieve information about a Partner Attachment, including:{ATTACHMENT_DETAILS}"),
        vec![alias(&["g"]), displayer(PartnerAttachmentDisplay::COLUMNS)],
    );

    add_command(
        cmd,
        Some(run_attachment_list),
        "list",
        "List Partner Attachments",
        &format!("Retrieve a list of the Partner Attachments on your account, including the following information for each:{ATTACHMENT_DETAILS}"),
        vec![
            alias(&["ls"]),
            displayer(PartnerAttachmentDisplay::COLUMNS),
            example("  oceanctl attachment list --format Name,VPCIDs"),
        ],
    );

    let update = add_command(
        cmd,
        Some(run_attachment_update),
        "update <partner-attachment-id>",
        "Update a Partner Attachment's name and configuration",
        "Use this command to update the name and VPC networks of a Partner Attachment. Only the fields given as flags are changed.",
        vec![alias(&["u"]), displayer(PartnerAttachmentDisplay::COLUMNS)],
    );
    add_string_flag(update, ARG_NAME, None, "", "The Partner Attachment name", &[]);
    add_string_slice_flag(update, ARG_VPC_IDS, None, &[], "The Partner Attachment VPC network IDs", &[]);

    let delete = add_command(
        cmd,
        Some(run_attachment_delete),
        "delete <partner-attachment-id>",
        "Delete a Partner Attachment",
        "Delete a Partner Attachment. This is irreversible.",
        vec![alias(&["rm"])],
    );
    add_bool_flag(
        delete,
        ARG_WAIT,
        None,
        false,
        "Wait for the Partner Attachment deletion to complete before returning control to the terminal",
        &[],
    );
}

async fn wait_for_state(
    c: &mut CmdContext,
    attachments: Arc<dyn PartnerAttachmentsService>,
    id: &str,
    want: &str,
    accept_not_found: bool,
) -> CliResult<()> {
    c.wait_for_terminal_state(
        move |id| {
            let attachments = attachments.clone();
            async move { attachments.get(&id).await.map(|pa| pa.state) }
        },
        id,
        want,
        accept_not_found,
    )
    .await
}

fn run_attachment_create(c: &mut CmdContext) -> BoxFuture<'_, CliResult<()>> {
    async move {
        let req = PartnerAttachmentCreate {
            name: c.get_string(ARG_NAME)?,
            connection_bandwidth_in_mbps: c.get_int(ARG_BANDWIDTH)?,
            region: c.get_string(ARG_REGION)?,
            naas_provider: c.get_string(ARG_NAAS_PROVIDER)?,
            vpc_ids: c.get_string_slice(ARG_VPC_IDS)?,
            bgp: Bgp {
                local_asn: c.get_int(ARG_BGP_LOCAL_ASN)?,
                local_router_ip: c.get_string(ARG_BGP_LOCAL_ROUTER_IP)?,
                peer_asn: c.get_int(ARG_BGP_PEER_ASN)?,
                peer_router_ip: c.get_string(ARG_BGP_PEER_ROUTER_IP)?,
                auth_key: c.get_string(ARG_BGP_AUTH_KEY)?,
            },
        };

        let attachments = c.partner_attachments()?;
        let mut created = attachments.create(&req).await?;
        if c.get_bool(ARG_WAIT)? {
            wait_for_state(c, attachments.clone(), &created.id, STATE_ACTIVE, false).await?;
            created = attachments.get(&created.id).await?;
        }
        c.display(&PartnerAttachmentDisplay(vec![created]))
    }
    .boxed()
}

fn run_attachment_get(c: &mut CmdContext) -> BoxFuture<'_, CliResult<()>> {
    async move {
        let id = c.ensure_one_arg()?.to_string();
        let attachment = c.partner_attachments()?.get(&id).await?;
        c.display(&PartnerAttachmentDisplay(vec![attachment]))
    }
    .boxed()
}

fn run_attachment_list(c: &mut CmdContext) -> BoxFuture<'_, CliResult<()>> {
    async move {
        let attachments = c.partner_attachments()?.list().await?;
        c.display(&PartnerAttachmentDisplay(attachments))
    }
    .boxed()
}

fn run_attachment_update(c: &mut CmdContext) -> BoxFuture<'_, CliResult<()>> {
    async move {
        let id = c.ensure_one_arg()?.to_string();
        let req = PartnerAttachmentUpdate {
            name: c.string_if_set(ARG_NAME)?,
            vpc_ids: if c.is_set(ARG_VPC_IDS) {
                Some(c.get_string_slice(ARG_VPC_IDS)?)
            } else {
                None
            },
        };
        let attachment = c.partner_attachments()?.update(&id, &req).await?;
        c.display(&PartnerAttachmentDisplay(vec![attachment]))
    }
    .boxed()
}

fn run_attachment_delete(c: &mut CmdContext) -> BoxFuture<'_, CliResult<()>> {
    async move {
        let id = c.ensure_one_arg()?.to_string();
        if !c.force()? {
            c.ask_for_confirm_delete("Partner Attachment", 1).await?;
        }
        let attachments = c.partner_attachments()?;
        attachments.delete(&id).await?;
        if c.get_bool(ARG_WAIT)? {
            wait_for_state(c, attachments, &id, STATE_DELETED, true).await?;
        }
        Ok(())
    }
    .boxed()
}
