//! Partner network attachments.

use async_trait::async_trait;
use reqwest::Method;
use serde::{Deserialize, Serialize};

use super::ApiClient;
use crate::framework::error::CliResult;

const ATTACHMENTS_PATH: &str = "/v2/partner_network_connect/attachments";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Bgp {
    #[serde(default)]
    pub local_asn: i64,
    #[serde(default)]
    pub local_router_ip: String,
    #[serde(default)]
    pub peer_asn: i64,
    #[serde(default)]
    pub peer_router_ip: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub auth_key: String,
}

impl Bgp {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartnerAttachment {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub connection_bandwidth_in_mbps: i64,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub naas_provider: String,
    #[serde(default)]
    pub vpc_ids: Vec<String>,
    #[serde(default)]
    pub bgp: Bgp,
    #[serde(default)]
    pub created_at: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PartnerAttachmentCreate {
    pub name: String,
    pub connection_bandwidth_in_mbps: i64,
    pub region: String,
    pub naas_provider: String,
    pub vpc_ids: Vec<String>,
    #[serde(skip_serializing_if = "Bgp::is_empty")]
    pub bgp: Bgp,
}

/// Partial update; only fields that are `Some` are sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PartnerAttachmentUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vpc_ids: Option<Vec<String>>,
}

#[async_trait]
pub trait PartnerAttachmentsService: Send + Sync {
    async fn list(&self) -> CliResult<Vec<PartnerAttachment>>;
    async fn get(&self, id: &str) -> CliResult<PartnerAttachment>;
    async fn create(&self, req: &PartnerAttachmentCreate) -> CliResult<PartnerAttachment>;
    async fn update(&self, id: &str, req: &PartnerAttachmentUpdate) -> CliResult<PartnerAttachment>;
    async fn delete(&self, id: &str) -> CliResult<()>;
}

/// Partner attachments over HTTP.
pub struct PartnerAttachmentsApi {
    client: ApiClient,
}

impl PartnerAttachmentsApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PartnerAttachmentsService for PartnerAttachmentsApi {
    async fn list(&self) -> CliResult<Vec<PartnerAttachment>> {
        Ok(self.client.list_all(ATTACHMENTS_PATH, "partner_attachments").await?)
    }

    async fn get(&self, id: &str) -> CliResult<PartnerAttachment> {
        let path = format!("{ATTACHMENTS_PATH}/{id}");
        Ok(self.client.get(&path, "partner_attachment").await?)
    }

    async fn create(&self, req: &PartnerAttachmentCreate) -> CliResult<PartnerAttachment> {
        Ok(self
            .client
            .write(Method::POST, ATTACHMENTS_PATH, req, "partner_attachment")
            .await?)
    }

    async fn update(&self, id: &str, req: &PartnerAttachmentUpdate) -> CliResult<PartnerAttachment> {
        let path = format!("{ATTACHMENTS_PATH}/{id}");
        Ok(self.client.write(Method::PATCH, &path, req, "partner_attachment").await?)
    }

    async fn delete(&self, id: &str) -> CliResult<()> {
        Ok(self.client.delete(&format!("{ATTACHMENTS_PATH}/{id}")).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    #[tokio::test]
    async fn create_skips_bgp_when_unset() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path(ATTACHMENTS_PATH).json_body(json!({
                    "name": "edge",
                    "connection_bandwidth_in_mbps": 1000,
                    "region": "nyc",
                    "naas_provider": "MEGAPORT",
                    "vpc_ids": ["v1", "v2"]
                }));
                then.status(202).json_body(json!({
                    "partner_attachment": {
                        "id": "pa-1",
                        "name": "edge",
                        "state": "PROVISIONING",
                        "connection_bandwidth_in_mbps": 1000,
                        "region": "nyc",
                        "naas_provider": "MEGAPORT",
                        "vpc_ids": ["v1", "v2"],
                        "bgp": {"local_asn": 64532, "local_router_ip": "169.254.0.1/29", "peer_asn": 64533, "peer_router_ip": "169.254.0.6/29"},
                        "created_at": "2024-01-01T00:00:00Z"
                    }
                }));
            })
            .await;

        let api = PartnerAttachmentsApi::new(ApiClient::new(&server.base_url(), "tok").unwrap());
        let created = api
            .create(&PartnerAttachmentCreate {
                name: "edge".into(),
                connection_bandwidth_in_mbps: 1000,
                region: "nyc".into(),
                naas_provider: "MEGAPORT".into(),
                vpc_ids: vec!["v1".into(), "v2".into()],
                bgp: Bgp::default(),
            })
            .await
            .unwrap();
        assert_eq!(created.state, "PROVISIONING");
        assert_eq!(created.bgp.peer_asn, 64533);
        mock.assert_async().await;
    }

    #[test]
    fn update_serialises_only_present_fields() {
        let req = PartnerAttachmentUpdate {
            vpc_ids: Some(vec!["v3".into()]),
            ..Default::default()
        };
        assert_eq!(serde_json::to_value(&req).unwrap(), json!({"vpc_ids": ["v3"]}));
    }
}
