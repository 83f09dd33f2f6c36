//! # Fake module
//!
//! In-memory [`CloudDatabases`] used by tests.

use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard},
};

use async_trait::async_trait;
use reqwest::StatusCode;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
    task::JoinHandle,
};

use crate::svc::rackspace::{
    client::{Client, ClientError},
    database::{CreateInstanceOpts, DatabaseOpts, Flavor, Instance, Link, Status, UserOpts},
    ext::CloudDatabases,
    Error,
};

pub fn flavors() -> Vec<Flavor> {
    [(1, "512MB Instance", 512), (2, "1GB Instance", 1024), (3, "2GB Instance", 2048)]
        .into_iter()
        .map(|(id, name, ram)| Flavor {
            id,
            name: name.into(),
            ram,
            links: vec![],
        })
        .collect()
}

pub fn instance(id: &str, name: &str, status: Status) -> Instance {
    Instance {
        id: id.into(),
        name: name.into(),
        status,
        flavor: None,
        volume: None,
        hostname: Some(format!("{}.rackspaceclouddb.com", id)),
        links: vec![Link {
            href: format!(
                "https://dfw.databases.api.rackspacecloud.com/v1.0/1234/instances/{}",
                id
            ),
            rel: Some("self".into()),
        }],
    }
}

#[derive(Default, Debug)]
struct State {
    instances: Vec<Instance>,
    /// remaining polls answering `BUILD` per instance
    builds: HashMap<String, usize>,
    databases: Vec<(String, DatabaseOpts)>,
    users: Vec<(String, UserOpts)>,
    created: Vec<CreateInstanceOpts>,
    polls: usize,
}

#[derive(Default, Debug)]
pub struct FakeDatabases {
    state: Mutex<State>,
    build_polls: usize,
    failing_database: Option<String>,
}

impl FakeDatabases {
    /// new instances answer `BUILD` to that many polls before being active
    pub fn with_build_polls(mut self, polls: usize) -> Self {
        self.build_polls = polls;
        self
    }

    /// creating the database with that name fails
    pub fn with_failing_database(mut self, name: &str) -> Self {
        self.failing_database = Some(name.into());
        self
    }

    pub fn insert(&self, instance: Instance) {
        self.state().instances.push(instance);
    }

    pub fn created(&self) -> Vec<CreateInstanceOpts> {
        self.state().created.to_owned()
    }

    pub fn databases(&self) -> Vec<(String, DatabaseOpts)> {
        self.state().databases.to_owned()
    }

    pub fn users(&self) -> Vec<(String, UserOpts)> {
        self.state().users.to_owned()
    }

    pub fn polls(&self) -> usize {
        self.state().polls
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().expect("fake state lock not to be poisoned")
    }

    fn not_found(what: &str) -> Error {
        Error::Client(ClientError::StatusCode(
            StatusCode::NOT_FOUND,
            format!("{{\"itemNotFound\": {{\"message\": \"{} not found\", \"code\": 404}}}}", what),
        ))
    }
}

#[async_trait]
impl CloudDatabases for FakeDatabases {
    async fn flavors(&self) -> Result<Vec<Flavor>, Error> {
        Ok(flavors())
    }

    async fn instances(&self) -> Result<Vec<Instance>, Error> {
        Ok(self.state().instances.to_owned())
    }

    async fn instance(&self, id: &str) -> Result<Instance, Error> {
        let mut state = self.state();
        state.polls += 1;

        let mut instance = state
            .instances
            .iter()
            .find(|instance| instance.id == id)
            .cloned()
            .ok_or_else(|| Self::not_found(id))?;

        if let Some(remaining) = state.builds.get_mut(id) {
            if *remaining > 0 {
                *remaining -= 1;
                instance.status = Status::Build;
                return Ok(instance);
            }
        }

        if instance.status == Status::Build && state.builds.contains_key(id) {
            instance.status = Status::Active;
            if let Some(stored) = state.instances.iter_mut().find(|i| i.id == id) {
                stored.status = Status::Active;
            }
        }

        Ok(instance)
    }

    async fn create_instance(&self, opts: &CreateInstanceOpts) -> Result<Instance, Error> {
        let mut state = self.state();
        let id = format!("instance-{}", state.instances.len() + 1);
        let instance = instance(&id, &opts.name, Status::Build);

        state.instances.push(instance.to_owned());
        state.builds.insert(id, self.build_polls);
        state.created.push(opts.to_owned());
        Ok(instance)
    }

    async fn create_database(&self, instance_id: &str, opts: &DatabaseOpts) -> Result<(), Error> {
        if self.failing_database.as_deref() == Some(opts.name.as_str()) {
            return Err(Error::Client(ClientError::StatusCode(
                StatusCode::BAD_REQUEST,
                r#"{"badRequest": {"message": "database creation failed", "code": 400}}"#.into(),
            )));
        }

        let mut state = self.state();
        if !state.instances.iter().any(|instance| instance.id == instance_id) {
            return Err(Self::not_found(instance_id));
        }

        state.databases.push((instance_id.into(), opts.to_owned()));
        Ok(())
    }

    async fn create_user(&self, instance_id: &str, opts: &UserOpts) -> Result<(), Error> {
        let mut state = self.state();
        if !state.instances.iter().any(|instance| instance.id == instance_id) {
            return Err(Self::not_found(instance_id));
        }

        state.users.push((instance_id.into(), opts.to_owned()));
        Ok(())
    }
}

// -----------------------------------------------------------------------------
// Loopback http server

/// http client that never goes through a proxy
pub fn loopback_client() -> Client {
    Client::builder()
        .no_proxy()
        .build()
        .map(Client::from)
        .expect("http client to be built")
}

/// Answers a single request on a loopback port with the given status and
/// json body. Returns the base url and a handle resolving to the raw request.
pub async fn serve_once(status: StatusCode, body: &'static str) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("loopback listener to be bound");
    let addr = listener.local_addr().expect("listener to have an address");

    let handle = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.expect("connection to be accepted");
        let request = read_request(&mut stream).await;

        let response = format!(
            "HTTP/1.1 {} {}\r\n\
             content-type: application/json\r\n\
             content-length: {}\r\n\
             connection: close\r\n\r\n{}",
            status.as_u16(),
            status.canonical_reason().unwrap_or("Unknown"),
            body.len(),
            body
        );

        stream
            .write_all(response.as_bytes())
            .await
            .expect("response to be written");
        let _ = stream.shutdown().await;
        request
    });

    (format!("http://{}", addr), handle)
}

/// reads the head and, when announced, the body of a request
async fn read_request(stream: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];

    loop {
        let n = stream.read(&mut chunk).await.expect("request to be read");
        if n == 0 {
            break;
        }

        buf.extend_from_slice(&chunk[..n]);
        if let Some(end) = buf.windows(4).position(|window| window == b"\r\n\r\n") {
            let length = String::from_utf8_lossy(&buf[..end])
                .to_lowercase()
                .lines()
                .find_map(|line| {
                    line.strip_prefix("content-length:")
                        .and_then(|value| value.trim().parse().ok())
                })
                .unwrap_or(0usize);

            if buf.len() >= end + 4 + length {
                break;
            }
        }
    }

    String::from_utf8_lossy(&buf).to_string()
}
