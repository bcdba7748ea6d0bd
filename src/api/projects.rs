//! Projects and the resources assigned to them.

use async_trait::async_trait;
use reqwest::Method;
use serde::{Deserialize, Serialize};

use super::ApiClient;
use crate::framework::error::CliResult;

const PROJECTS_PATH: &str = "/v2/projects";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    #[serde(default)]
    pub owner_uuid: String,
    #[serde(default)]
    pub owner_id: u64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub purpose: String,
    #[serde(default)]
    pub environment: String,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectResource {
    pub urn: String,
    #[serde(default)]
    pub assigned_at: String,
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProjectCreate {
    pub name: String,
    pub purpose: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub environment: String,
}

/// Partial update; only fields that are `Some` are sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProjectUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purpose: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_default: Option<bool>,
}

#[derive(Serialize)]
struct AssignRequest<'a> {
    resources: &'a [String],
}

#[async_trait]
pub trait ProjectsService: Send + Sync {
    async fn list(&self) -> CliResult<Vec<Project>>;
    /// `id` may be `default` for the account's default project.
    async fn get(&self, id: &str) -> CliResult<Project>;
    async fn create(&self, req: &ProjectCreate) -> CliResult<Project>;
    async fn update(&self, id: &str, req: &ProjectUpdate) -> CliResult<Project>;
    async fn delete(&self, id: &str) -> CliResult<()>;
    async fn list_resources(&self, id: &str) -> CliResult<Vec<ProjectResource>>;
    async fn assign_resources(&self, id: &str, urns: &[String]) -> CliResult<Vec<ProjectResource>>;
}

/// Projects over HTTP.
pub struct ProjectsApi {
    client: ApiClient,
}

impl ProjectsApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ProjectsService for ProjectsApi {
    async fn list(&self) -> CliResult<Vec<Project>> {
        Ok(self.client.list_all(PROJECTS_PATH, "projects").await?)
    }

    async fn get(&self, id: &str) -> CliResult<Project> {
        Ok(self.client.get(&format!("{PROJECTS_PATH}/{id}"), "project").await?)
    }

    async fn create(&self, req: &ProjectCreate) -> CliResult<Project> {
        Ok(self.client.write(Method::POST, PROJECTS_PATH, req, "project").await?)
    }

    async fn update(&self, id: &str, req: &ProjectUpdate) -> CliResult<Project> {
        let path = format!("{PROJECTS_PATH}/{id}");
        Ok(self.client.write(Method::PATCH, &path, req, "project").await?)
    }

    async fn delete(&self, id: &str) -> CliResult<()> {
        Ok(self.client.delete(&format!("{PROJECTS_PATH}/{id}")).await?)
    }

    async fn list_resources(&self, id: &str) -> CliResult<Vec<ProjectResource>> {
        let path = format!("{PROJECTS_PATH}/{id}/resources");
        Ok(self.client.list_all(&path, "resources").await?)
    }

    async fn assign_resources(&self, id: &str, urns: &[String]) -> CliResult<Vec<ProjectResource>> {
        let path = format!("{PROJECTS_PATH}/{id}/resources");
        let body = AssignRequest { resources: urns };
        Ok(self.client.write(Method::POST, &path, &body, "resources").await?)
    }
}
