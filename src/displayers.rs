//! Displayers for each resource family.

use serde_json::{json, Value};

use crate::api::{PartnerAttachment, Project, ProjectResource};
use crate::output::{Column, ColumnSet, Displayable, Row};

// ============ Projects ============

pub struct ProjectDisplay(pub Vec<Project>);

impl ProjectDisplay {
    pub const COLUMNS: ColumnSet = ColumnSet {
        all: &[
            Column { key: "ID", header: "ID" },
            Column { key: "OwnerUUID", header: "Owner UUID" },
            Column { key: "OwnerID", header: "Owner ID" },
            Column { key: "Name", header: "Name" },
            Column { key: "Description", header: "Description" },
            Column { key: "Purpose", header: "Purpose" },
            Column { key: "Environment", header: "Environment" },
            Column { key: "IsDefault", header: "Is Default?" },
            Column { key: "CreatedAt", header: "Created At" },
            Column { key: "UpdatedAt", header: "Updated At" },
        ],
        default: &[
            "ID",
            "OwnerUUID",
            "OwnerID",
            "Name",
            "Description",
            "Purpose",
            "Environment",
            "IsDefault",
            "CreatedAt",
            "UpdatedAt",
        ],
    };
}

impl Displayable for ProjectDisplay {
    fn columns(&self) -> &ColumnSet {
        &Self::COLUMNS
    }

    fn rows(&self) -> Vec<Row> {
        self.0
            .iter()
            .map(|p| {
                Row::from([
                    ("ID", json!(p.id)),
                    ("OwnerUUID", json!(p.owner_uuid)),
                    ("OwnerID", json!(p.owner_id)),
                    ("Name", json!(p.name)),
                    ("Description", json!(p.description)),
                    ("Purpose", json!(p.purpose)),
                    ("Environment", json!(p.environment)),
                    ("IsDefault", json!(p.is_default)),
                    ("CreatedAt", json!(p.created_at)),
                    ("UpdatedAt", json!(p.updated_at)),
                ])
            })
            .collect()
    }

    fn json(&self) -> Option<Value> {
        serde_json::to_value(&self.0).ok()
    }
}

pub struct ProjectResourceDisplay(pub Vec<ProjectResource>);

impl ProjectResourceDisplay {
    pub const COLUMNS: ColumnSet = ColumnSet {
        all: &[
            Column { key: "URN", header: "URN" },
            Column { key: "AssignedAt", header: "Assigned At" },
            Column { key: "Status", header: "Status" },
        ],
        default: &["URN", "AssignedAt", "Status"],
    };
}

impl Displayable for ProjectResourceDisplay {
    fn columns(&self) -> &ColumnSet {
        &Self::COLUMNS
    }

    fn rows(&self) -> Vec<Row> {
        self.0
            .iter()
            .map(|r| {
                Row::from([
                    ("URN", json!(r.urn)),
                    ("AssignedAt", json!(r.assigned_at)),
                    ("Status", json!(r.status)),
                ])
            })
            .collect()
    }

    fn json(&self) -> Option<Value> {
        serde_json::to_value(&self.0).ok()
    }
}

// ============ Partner Attachments ============

pub struct PartnerAttachmentDisplay(pub Vec<PartnerAttachment>);

impl PartnerAttachmentDisplay {
    pub const COLUMNS: ColumnSet = ColumnSet {
        all: &[
            Column { key: "ID", header: "ID" },
            Column { key: "Name", header: "Name" },
            Column { key: "State", header: "State" },
            Column { key: "ConnectionBandwidthInMbps", header: "Connection Bandwidth (MBPS)" },
            Column { key: "Region", header: "Region" },
            Column { key: "NaaSProvider", header: "NaaS Provider" },
            Column { key: "VPCIDs", header: "VPC IDs" },
            Column { key: "CreatedAt", header: "Created At" },
            Column { key: "BGPLocalASN", header: "BGP Local ASN" },
            Column { key: "BGPLocalRouterIP", header: "BGP Local Router IP" },
            Column { key: "BGPPeerASN", header: "BGP Peer ASN" },
            Column { key: "BGPPeerRouterIP", header: "BGP Peer Router IP" },
        ],
        default: &[
            "ID",
            "Name",
            "State",
            "ConnectionBandwidthInMbps",
            "Region",
            "NaaSProvider",
            "VPCIDs",
            "CreatedAt",
            "BGPLocalASN",
            "BGPLocalRouterIP",
            "BGPPeerASN",
            "BGPPeerRouterIP",
        ],
    };
}

impl Displayable for PartnerAttachmentDisplay {
    fn columns(&self) -> &ColumnSet {
        &Self::COLUMNS
    }

    fn rows(&self) -> Vec<Row> {
        self.0
            .iter()
            .map(|pa| {
                Row::from([
                    ("ID", json!(pa.id)),
                    ("Name", json!(pa.name)),
                    ("State", json!(pa.state)),
                    ("ConnectionBandwidthInMbps", json!(pa.connection_bandwidth_in_mbps)),
                    ("Region", json!(pa.region)),
                    ("NaaSProvider", json!(pa.naas_provider)),
                    ("VPCIDs", json!(pa.vpc_ids.join(","))),
                    ("CreatedAt", json!(pa.created_at)),
                    ("BGPLocalASN", json!(pa.bgp.local_asn)),
                    ("BGPLocalRouterIP", json!(pa.bgp.local_router_ip)),
                    ("BGPPeerASN", json!(pa.bgp.peer_asn)),
                    ("BGPPeerRouterIP", json!(pa.bgp.peer_router_ip)),
                ])
            })
            .collect()
    }

    fn json(&self) -> Option<Value> {
        serde_json::to_value(&self.0).ok()
    }
}
