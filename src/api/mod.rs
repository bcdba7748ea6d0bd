//! Typed REST client for the cloud control plane.

pub mod attachments;
pub mod projects;

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::cli::{ARG_ACCESS_TOKEN, ARG_API_URL, ARG_CONTEXT};
use crate::config::{Config, Source, AUTH_CONTEXTS};
use crate::framework::command::NS_ROOT;
use crate::framework::error::{CliError, CliResult};
use crate::framework::flags::FlagValue;

pub use attachments::{
    Bgp, PartnerAttachment, PartnerAttachmentCreate, PartnerAttachmentUpdate, PartnerAttachmentsApi,
    PartnerAttachmentsService,
};
pub use projects::{Project, ProjectCreate, ProjectResource, ProjectUpdate, ProjectsApi, ProjectsService};

pub const DEFAULT_API_URL: &str = "https://api.digitalocean.com";

/// Context name that means "use the layered access token".
pub const DEFAULT_CONTEXT: &str = "default";

/// Page size requested from list endpoints.
const PER_PAGE: u32 = 200;

/// Upper bound on pages fetched by one listing.
const MAX_PAGES: usize = 500;

const USER_AGENT: &str = concat!("oceanctl/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{method} {path}: {status} {message}")]
    Status {
        method: Method,
        path: String,
        status: StatusCode,
        id: String,
        message: String,
        request_id: Option<String>,
    },

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected response from {path}: {message}")]
    Decode { path: String, message: String },
}

impl From<ApiError> for CliError {
    fn from(err: ApiError) -> Self {
        match &err {
            ApiError::Status { status, message, .. } if *status == StatusCode::NOT_FOUND => {
                CliError::NotFound(message.clone())
            }
            ApiError::Status { status, message, .. } if *status == StatusCode::CONFLICT => {
                CliError::Conflict(message.clone())
            }
            _ => CliError::Upstream(err.to_string()),
        }
    }
}

/// Error body returned by the API on non-2xx responses.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    id: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    request_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Links {
    #[serde(default)]
    pages: Option<Pages>,
}

#[derive(Debug, Deserialize)]
struct Pages {
    #[serde(default)]
    next: Option<String>,
}

/// Authenticated client bound to one API endpoint.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base: String,
    token: String,
}

impl ApiClient {
    pub fn new(base: &str, token: &str) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self {
            http,
            base: base.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}{}", self.base, path)
        }
    }

    async fn send<B: Serialize + ?Sized>(&self, method: Method, path: &str, body: Option<&B>) -> Result<Value, ApiError> {
        let url = self.url(path);
        debug!(%method, %url, "api request");

        let mut req = self
            .http
            .request(method.clone(), &url)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Content-Type", "application/json");
        if let Some(body) = body {
            req = req.json(body);
        }

        let resp = req.send().await?;
        let status = resp.status();
        let text = resp.text().await?;
        trace!(%status, body = %text, "api response");

        if !status.is_success() {
            let body: ErrorBody = serde_json::from_str(&text).unwrap_or(ErrorBody {
                id: String::new(),
                message: text.trim().to_string(),
                request_id: None,
            });
            return Err(ApiError::Status {
                method,
                path: path.to_string(),
                status,
                id: body.id,
                message: body.message,
                request_id: body.request_id,
            });
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|err| ApiError::Decode {
            path: path.to_string(),
            message: err.to_string(),
        })
    }

    fn take<T: DeserializeOwned>(path: &str, mut body: Value, key: &str) -> Result<T, ApiError> {
        let field = body.get_mut(key).map(Value::take).ok_or_else(|| ApiError::Decode {
            path: path.to_string(),
            message: format!("missing field `{key}`"),
        })?;
        serde_json::from_value(field).map_err(|err| ApiError::Decode {
            path: path.to_string(),
            message: err.to_string(),
        })
    }

    /// GET `path` and decode the object under `key`.
    pub async fn get<T: DeserializeOwned>(&self, path: &str, key: &str) -> Result<T, ApiError> {
        let body = self.send::<()>(Method::GET, path, None).await?;
        Self::take(path, body, key)
    }

    /// GET every page of a list endpoint, following `links.pages.next`.
    /// Stops at a link already fetched or after `MAX_PAGES` pages.
    pub async fn list_all<T: DeserializeOwned>(&self, path: &str, key: &str) -> Result<Vec<T>, ApiError> {
        let mut items = Vec::new();
        let mut fetched = HashSet::new();
        let mut next = Some(format!("{path}?per_page={PER_PAGE}"));
        while let Some(page) = next.take() {
            if fetched.len() >= MAX_PAGES {
                warn!(path, pages = fetched.len(), "page limit reached; listing truncated");
                break;
            }
            if !fetched.insert(page.clone()) {
                debug!(%page, "next link repeats a fetched page");
                break;
            }
            let mut body = self.send::<()>(Method::GET, &page, None).await?;
            let links: Option<Links> = body
                .get_mut("links")
                .map(Value::take)
                .and_then(|l| serde_json::from_value(l).ok());
            let batch: Vec<T> = Self::take(&page, body, key)?;
            items.extend(batch);
            next = links.and_then(|l| l.pages).and_then(|p| p.next);
        }
        Ok(items)
    }

    /// Send `body` with `method` and decode the object under `key`.
    pub async fn write<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: &B,
        key: &str,
    ) -> Result<T, ApiError> {
        let resp = self.send(method, path, Some(body)).await?;
        Self::take(path, resp, key)
    }

    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.send::<()>(Method::DELETE, path, None).await.map(|_| ())
    }
}

/// Factory for the capability contracts a handler may use.
pub trait Services: Send + Sync {
    fn projects(&self) -> CliResult<Arc<dyn ProjectsService>>;

    fn partner_attachments(&self) -> CliResult<Arc<dyn PartnerAttachmentsService>>;
}

/// The token to authenticate with, if any.
///
/// An explicit `--access-token` wins. Otherwise the `default` context uses the
/// layered `access-token` and named contexts read `auth-contexts.<name>`.
pub fn access_token(config: &Config) -> CliResult<Option<String>> {
    let (token, source) = config.lookup(NS_ROOT, ARG_ACCESS_TOKEN)?;
    let token = match token {
        FlagValue::String(token) => token,
        _ => String::new(),
    };
    if source == Source::Cli {
        return Ok(Some(token).filter(|t| !t.is_empty()));
    }

    let context = config.get_string(NS_ROOT, ARG_CONTEXT)?;
    if context.is_empty() || context == DEFAULT_CONTEXT {
        return Ok(Some(token).filter(|t| !t.is_empty()));
    }
    debug!(%context, "using auth context");
    Ok(config
        .file_string(&format!("{AUTH_CONTEXTS}.{context}"))
        .filter(|t| !t.is_empty()))
}

/// HTTP-backed services. The client is built on first use.
pub struct LiveServices {
    api_url: String,
    token: Option<String>,
    client: Mutex<Option<ApiClient>>,
}

impl LiveServices {
    pub fn from_config(config: &Config) -> CliResult<Self> {
        Ok(Self {
            api_url: config.get_string(NS_ROOT, ARG_API_URL)?,
            token: access_token(config)?,
            client: Mutex::new(None),
        })
    }

    fn client(&self) -> CliResult<ApiClient> {
        let mut slot = self
            .client
            .lock()
            .map_err(|_| CliError::internal(anyhow!("API client lock poisoned")))?;
        if let Some(client) = slot.as_ref() {
            return Ok(client.clone());
        }
        let token = self
            .token
            .as_deref()
            .ok_or_else(|| CliError::MissingFlag(ARG_ACCESS_TOKEN.to_string()))?;
        let client = ApiClient::new(&self.api_url, token).map_err(CliError::internal)?;
        *slot = Some(client.clone());
        Ok(client)
    }
}

impl Services for LiveServices {
    fn projects(&self) -> CliResult<Arc<dyn ProjectsService>> {
        Ok(Arc::new(ProjectsApi::new(self.client()?)))
    }

    fn partner_attachments(&self) -> CliResult<Arc<dyn PartnerAttachmentsService>> {
        Ok(Arc::new(PartnerAttachmentsApi::new(self.client()?)))
    }
}
