#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::time::Instant;

use oceanctl::api::{
    PartnerAttachment, PartnerAttachmentCreate, PartnerAttachmentUpdate, PartnerAttachmentsService, Project,
    ProjectCreate, ProjectResource, ProjectUpdate, ProjectsService, Services,
};
use oceanctl::cli;
use oceanctl::framework::{CliError, CliResult, Io, Prompt, Runner, ScriptedPrompt};

/// A writer whose contents stay readable after it is handed away.
#[derive(Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

pub fn project(id: &str) -> Project {
    Project {
        id: id.to_string(),
        owner_uuid: "owner-uuid".to_string(),
        owner_id: 42,
        name: "web".to_string(),
        description: "front end".to_string(),
        purpose: "Web Application".to_string(),
        environment: "Production".to_string(),
        is_default: false,
        created_at: "2024-01-01T00:00:00Z".to_string(),
        updated_at: "2024-01-02T00:00:00Z".to_string(),
    }
}

pub fn attachment(id: &str, state: &str) -> PartnerAttachment {
    PartnerAttachment {
        id: id.to_string(),
        name: "edge".to_string(),
        state: state.to_string(),
        connection_bandwidth_in_mbps: 1000,
        region: "nyc".to_string(),
        naas_provider: "MEGAPORT".to_string(),
        vpc_ids: vec!["v1".to_string(), "v2".to_string()],
        bgp: Default::default(),
        created_at: "2024-01-01T00:00:00Z".to_string(),
    }
}

// ============ Stub Services ============

#[derive(Default)]
pub struct StubProjects {
    pub calls: Mutex<Vec<String>>,
    pub created: Mutex<Vec<ProjectCreate>>,
    pub updates: Mutex<Vec<(String, ProjectUpdate)>>,
    pub deleted: Mutex<Vec<String>>,
    pub assigned: Mutex<Vec<(String, Vec<String>)>>,
}

impl StubProjects {
    fn record(&self, call: &str) {
        self.calls.lock().unwrap().push(call.to_string());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProjectsService for StubProjects {
    async fn list(&self) -> CliResult<Vec<Project>> {
        self.record("list");
        Ok(vec![project("p1"), project("p2")])
    }

    async fn get(&self, id: &str) -> CliResult<Project> {
        self.record("get");
        if id == "missing" {
            return Err(CliError::NotFound("project not found".into()));
        }
        Ok(project(id))
    }

    async fn create(&self, req: &ProjectCreate) -> CliResult<Project> {
        self.record("create");
        self.created.lock().unwrap().push(req.clone());
        Ok(Project {
            name: req.name.clone(),
            ..project("new")
        })
    }

    async fn update(&self, id: &str, req: &ProjectUpdate) -> CliResult<Project> {
        self.record("update");
        self.updates.lock().unwrap().push((id.to_string(), req.clone()));
        Ok(project(id))
    }

    async fn delete(&self, id: &str) -> CliResult<()> {
        self.record("delete");
        self.deleted.lock().unwrap().push(id.to_string());
        Ok(())
    }

    async fn list_resources(&self, _id: &str) -> CliResult<Vec<ProjectResource>> {
        self.record("list_resources");
        Ok(vec![])
    }

    async fn assign_resources(&self, id: &str, urns: &[String]) -> CliResult<Vec<ProjectResource>> {
        self.record("assign_resources");
        self.assigned.lock().unwrap().push((id.to_string(), urns.to_vec()));
        Ok(urns
            .iter()
            .map(|urn| ProjectResource {
                urn: urn.clone(),
                assigned_at: "2024-01-01T00:00:00Z".to_string(),
                status: "assigned".to_string(),
            })
            .collect())
    }
}

/// Attachments whose `get` replays scripted states, then reports not found.
#[derive(Default)]
pub struct StubAttachments {
    pub states: Mutex<VecDeque<String>>,
    /// Returned by `get` once the script is exhausted; not found when unset.
    pub steady_state: Option<String>,
    pub gets: Mutex<Vec<Instant>>,
    pub deleted: Mutex<Vec<String>>,
    pub created: Mutex<Vec<PartnerAttachmentCreate>>,
    pub updates: Mutex<Vec<(String, PartnerAttachmentUpdate)>>,
}

impl StubAttachments {
    pub fn scripted<I: IntoIterator<Item = &'static str>>(states: I) -> Self {
        Self {
            states: Mutex::new(states.into_iter().map(str::to_string).collect()),
            ..Default::default()
        }
    }

    pub fn get_times(&self) -> Vec<Instant> {
        self.gets.lock().unwrap().clone()
    }
}

#[async_trait]
impl PartnerAttachmentsService for StubAttachments {
    async fn list(&self) -> CliResult<Vec<PartnerAttachment>> {
        Ok(vec![attachment("pa-1", "ACTIVE")])
    }

    async fn get(&self, id: &str) -> CliResult<PartnerAttachment> {
        self.gets.lock().unwrap().push(Instant::now());
        let next = self.states.lock().unwrap().pop_front();
        match next.or_else(|| self.steady_state.clone()) {
            Some(state) => Ok(attachment(id, &state)),
            None => Err(CliError::NotFound("partner attachment not found".into())),
        }
    }

    async fn create(&self, req: &PartnerAttachmentCreate) -> CliResult<PartnerAttachment> {
        self.created.lock().unwrap().push(req.clone());
        Ok(attachment("pa-new", "PROVISIONING"))
    }

    async fn update(&self, id: &str, req: &PartnerAttachmentUpdate) -> CliResult<PartnerAttachment> {
        self.updates.lock().unwrap().push((id.to_string(), req.clone()));
        Ok(attachment(id, "ACTIVE"))
    }

    async fn delete(&self, id: &str) -> CliResult<()> {
        self.deleted.lock().unwrap().push(id.to_string());
        Ok(())
    }
}

#[derive(Default)]
pub struct StubServices {
    pub projects: Arc<StubProjects>,
    pub attachments: Arc<StubAttachments>,
    pub requests: Mutex<usize>,
}

impl Services for StubServices {
    fn projects(&self) -> CliResult<Arc<dyn ProjectsService>> {
        *self.requests.lock().unwrap() += 1;
        Ok(self.projects.clone())
    }

    fn partner_attachments(&self) -> CliResult<Arc<dyn PartnerAttachmentsService>> {
        *self.requests.lock().unwrap() += 1;
        Ok(self.attachments.clone())
    }
}

// ============ Harness ============

pub struct Outcome {
    pub code: i32,
    pub out: String,
    pub err: String,
}

/// Environment with no config file and nothing else set.
pub fn isolated_env() -> HashMap<String, String> {
    HashMap::from([(
        "OCEANCTL_CONFIG".to_string(),
        "/nonexistent/oceanctl-tests/config.yaml".to_string(),
    )])
}

pub fn runner(services: Arc<StubServices>, env: HashMap<String, String>) -> Runner {
    let tree = cli::build().expect("command tree");
    Runner::new(tree, cli::ENV_BINDINGS)
        .with_env(env)
        .with_services(services)
}

pub fn io(replies: &[&str], ticks: bool) -> (Io, SharedBuffer, SharedBuffer) {
    io_with_prompt(Box::new(ScriptedPrompt::new(replies.iter().copied())), ticks)
}

pub fn io_with_prompt(prompt: Box<dyn Prompt>, ticks: bool) -> (Io, SharedBuffer, SharedBuffer) {
    let out = SharedBuffer::default();
    let err = SharedBuffer::default();
    let io = Io {
        out: Box::new(out.clone()),
        err: Box::new(err.clone()),
        prompt,
        progress_ticks: ticks,
    };
    (io, out, err)
}

/// A terminal on which the user never answers.
pub struct SilentPrompt;

#[async_trait]
impl Prompt for SilentPrompt {
    fn is_interactive(&self) -> bool {
        true
    }

    async fn read_reply(&mut self) -> io::Result<Option<String>> {
        std::future::pending().await
    }
}

pub fn argv(line: &str) -> Vec<String> {
    line.split_whitespace().map(str::to_string).collect()
}

/// Run one invocation against stub services and an isolated environment.
pub async fn run(services: &Arc<StubServices>, line: &str, replies: &[&str]) -> Outcome {
    run_with(runner(services.clone(), isolated_env()), &argv(line), replies).await
}

pub async fn run_with(runner: Runner, args: &[String], replies: &[&str]) -> Outcome {
    let (io, out, err) = io(replies, true);
    run_io(runner, args, io, out, err).await
}

pub async fn run_io(runner: Runner, args: &[String], io: Io, out: SharedBuffer, err: SharedBuffer) -> Outcome {
    let code = runner
        .run_until(args.to_vec(), io, std::future::pending::<()>())
        .await;
    Outcome {
        code,
        out: out.contents(),
        err: err.contents(),
    }
}
