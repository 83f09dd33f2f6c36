//! # Extensions module
//!
//! This module provide the [`CloudDatabases`] trait which is the surface the
//! provisioning workflow relies on, its implementation on top of the rackspace
//! apis and helpers built over it.

use std::{future::Future, sync::Arc, time::Duration};

use async_trait::async_trait;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, trace};

use crate::svc::{
    cfg::{Configuration, Provision},
    rackspace::{
        client::Client,
        database::{self, CreateInstanceOpts, DatabaseOpts, Flavor, Instance, Status, UserOpts},
        identity::{self, DATABASE_SERVICE},
        Error,
    },
};

// -----------------------------------------------------------------------------
// CloudDatabases trait

#[async_trait]
pub trait CloudDatabases: Send + Sync {
    async fn flavors(&self) -> Result<Vec<Flavor>, Error>;

    async fn instances(&self) -> Result<Vec<Instance>, Error>;

    async fn instance(&self, id: &str) -> Result<Instance, Error>;

    async fn create_instance(&self, opts: &CreateInstanceOpts) -> Result<Instance, Error>;

    async fn create_database(&self, instance_id: &str, opts: &DatabaseOpts) -> Result<(), Error>;

    async fn create_user(&self, instance_id: &str, opts: &UserOpts) -> Result<(), Error>;

    /// returns true if no instance already carries the given name
    async fn is_instance_name_valid(&self, name: &str) -> Result<bool, Error> {
        Ok(is_instance_name_valid(&self.instances().await?, name))
    }

    /// returns the flavor designated by the user input, if any
    async fn find_flavor(&self, input: &str) -> Result<Option<Flavor>, Error> {
        Ok(find_flavor(&self.flavors().await?, input).cloned())
    }

    async fn suggest_instance_name(&self, name: &str) -> Result<String, Error> {
        Ok(suggest_instance_name(&self.instances().await?, name))
    }
}

// -----------------------------------------------------------------------------
// Service structure

/// cloud databases api of an authenticated account in a region
#[derive(Clone, Debug)]
pub struct Service {
    client: Client,
    endpoint: String,
}

impl Service {
    pub fn new(client: Client, endpoint: String) -> Self {
        Self { client, endpoint }
    }

    /// authenticates with the configured credentials and resolves the cloud
    /// databases endpoint of the configured region
    #[tracing::instrument(skip_all)]
    pub async fn try_from_config(config: Arc<Configuration>) -> Result<Self, Error> {
        let client = Client::try_new()?;
        let access =
            identity::authenticate(&client, &config.api.identity, &config.credentials()).await?;

        let endpoint = access
            .endpoint(DATABASE_SERVICE, &config.api.region)
            .ok_or_else(|| {
                identity::Error::Endpoint(DATABASE_SERVICE.into(), config.api.region.to_owned())
            })?;

        info!(
            region = &config.api.region,
            endpoint = &endpoint,
            "Authenticated against the cloud databases api"
        );
        Ok(Self::new(client.with_token(access.token.id), endpoint))
    }
}

#[async_trait]
impl CloudDatabases for Service {
    async fn flavors(&self) -> Result<Vec<Flavor>, Error> {
        Ok(database::list_flavors(&self.client, &self.endpoint).await?)
    }

    async fn instances(&self) -> Result<Vec<Instance>, Error> {
        Ok(database::list_instances(&self.client, &self.endpoint).await?)
    }

    async fn instance(&self, id: &str) -> Result<Instance, Error> {
        Ok(database::get_instance(&self.client, &self.endpoint, id).await?)
    }

    async fn create_instance(&self, opts: &CreateInstanceOpts) -> Result<Instance, Error> {
        Ok(database::create_instance(&self.client, &self.endpoint, opts).await?)
    }

    async fn create_database(&self, instance_id: &str, opts: &DatabaseOpts) -> Result<(), Error> {
        Ok(database::create_database(&self.client, &self.endpoint, instance_id, opts).await?)
    }

    async fn create_user(&self, instance_id: &str, opts: &UserOpts) -> Result<(), Error> {
        Ok(database::create_user(&self.client, &self.endpoint, instance_id, opts).await?)
    }
}

// -----------------------------------------------------------------------------
// Polling structure

#[derive(PartialEq, Eq, Clone, Debug)]
pub struct Polling {
    pub interval: Duration,
    /// `None` waits forever
    pub timeout: Option<Duration>,
}

impl From<&Provision> for Polling {
    fn from(provision: &Provision) -> Self {
        Self {
            interval: provision.poll_interval(),
            timeout: provision.timeout(),
        }
    }
}

// -----------------------------------------------------------------------------
// helpers

pub fn is_instance_name_valid(instances: &[Instance], name: &str) -> bool {
    !instances.iter().any(|instance| instance.name == name)
}

/// matches the user input against flavor identifiers, input that is not a
/// number never matches
pub fn find_flavor<'a>(flavors: &'a [Flavor], input: &str) -> Option<&'a Flavor> {
    let id = input.trim().parse::<u64>().ok()?;

    flavors.iter().find(|flavor| flavor.id == id)
}

/// returns the first `<name><k>`, k starting at one, that is not taken
pub fn suggest_instance_name(instances: &[Instance], name: &str) -> String {
    (1..)
        .map(|k: u64| format!("{}{}", name, k))
        .find(|candidate| is_instance_name_valid(instances, candidate))
        .unwrap_or_else(|| format!("{}1", name))
}

/// Polls the instance every `polling.interval` until it is `ACTIVE`.
///
/// `on_tick` is called after each poll that did not find the instance ready.
/// The wait ends with an error if the instance reaches `ERROR` or `FAILED`,
/// if the timeout elapses or if `interrupt` completes.
#[tracing::instrument(skip(service, interrupt, on_tick))]
pub async fn wait_until_active<S, I, F>(
    service: &S,
    id: &str,
    polling: &Polling,
    interrupt: I,
    mut on_tick: F,
) -> Result<Instance, Error>
where
    S: CloudDatabases + ?Sized,
    I: Future<Output = ()> + Send,
    F: FnMut(&Instance) + Send,
{
    let begin = Instant::now();
    tokio::pin!(interrupt);

    loop {
        let instance = service.instance(id).await?;

        trace!(id = id, status = instance.status.to_string(), "Got instance status");
        match &instance.status {
            Status::Active => {
                debug!(
                    id = id,
                    duration = begin.elapsed().as_secs(),
                    "Instance is active"
                );
                return Ok(instance);
            }
            status if status.is_terminal_failure() => {
                return Err(Error::Failed(instance.name, status.to_owned()));
            }
            _ => {}
        }

        if let Some(timeout) = polling.timeout {
            if begin.elapsed() >= timeout {
                return Err(Error::Timeout(instance.name, timeout.as_secs()));
            }
        }

        on_tick(&instance);
        tokio::select! {
            _ = sleep(polling.interval) => {}
            _ = &mut interrupt => {
                return Err(Error::Interrupted(instance.name));
            }
        }
    }
}
