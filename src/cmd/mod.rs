//! # Command module
//!
//! This module provide command line interface structures and helpers
use std::{future::pending, path::PathBuf, sync::Arc};

use async_trait::async_trait;
use clap::{ArgAction, Parser, Subcommand};
use tracing::{debug, warn};

use crate::svc::{
    cfg::Configuration,
    rackspace::{self, ext::Service},
};

pub mod flavor;
pub mod instance;
pub mod provision;

// -----------------------------------------------------------------------------
// Executor trait

#[async_trait]
pub trait Executor {
    type Error;

    async fn execute(&self, config: Arc<Configuration>) -> Result<(), Self::Error>;
}

// -----------------------------------------------------------------------------
// ConnectError enum

#[derive(thiserror::Error, Debug)]
pub enum ConnectError {
    #[error("failed to find credentials, provide a username and an api key")]
    MissingCredentials,
    #[error("failed to connect to cloud databases api, {0}")]
    Api(rackspace::Error),
}

// -----------------------------------------------------------------------------
// Error enum

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("failed to execute command '{0}', {1}")]
    Execution(String, Arc<Error>),
    #[error("failed to execute command, {0}")]
    Provision(provision::Error),
    #[error("failed to execute command, {0}")]
    Flavor(flavor::Error),
    #[error("failed to execute command, {0}")]
    Instance(instance::Error),
}

// -----------------------------------------------------------------------------
// Command enum

#[derive(Subcommand, Clone, Debug)]
pub enum Command {
    /// Create a cloud database instance with its databases and users
    #[clap(name = "provision", aliases = &["p"])]
    Provision(provision::Provision),
    /// List available instance flavors
    #[clap(name = "flavors", aliases = &["f"])]
    Flavors(flavor::Flavors),
    /// List existing database instances
    #[clap(name = "instances", aliases = &["i"])]
    Instances(instance::Instances),
}

impl Default for Command {
    fn default() -> Self {
        Self::Provision(provision::Provision::default())
    }
}

#[async_trait]
impl Executor for Command {
    type Error = Error;

    #[tracing::instrument(skip(config))]
    async fn execute(&self, config: Arc<Configuration>) -> Result<(), Self::Error> {
        match self {
            Self::Provision(provision) => provision
                .execute(config)
                .await
                .map_err(Error::Provision)
                .map_err(|err| Error::Execution("provision".into(), Arc::new(err))),
            Self::Flavors(flavors) => flavors
                .execute(config)
                .await
                .map_err(Error::Flavor)
                .map_err(|err| Error::Execution("flavors".into(), Arc::new(err))),
            Self::Instances(instances) => instances
                .execute(config)
                .await
                .map_err(Error::Instance)
                .map_err(|err| Error::Execution("instances".into(), Arc::new(err))),
        }
    }
}

// -----------------------------------------------------------------------------
// Args struct

#[derive(Parser, Clone, Debug)]
#[clap(author, version, about = env!("CARGO_PKG_DESCRIPTION"))]
pub struct Args {
    /// Increase log verbosity
    #[clap(short = 'v', global = true, action = ArgAction::Count)]
    pub verbosity: u8,
    /// Specify location of configuration
    #[clap(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,
    /// Specify location of the credentials file, defaults to
    /// $HOME/.rackspace_cloud_credentials
    #[clap(long = "credentials", global = true)]
    pub credentials: Option<PathBuf>,
    /// Check if configuration is healthy
    #[clap(short = 't', long = "check", global = true)]
    pub check: bool,
    #[clap(subcommand)]
    pub command: Option<Command>,
}

// -----------------------------------------------------------------------------
// helpers

/// authenticates and returns the cloud databases service of the configured
/// region
pub async fn connect(config: Arc<Configuration>) -> Result<Service, ConnectError> {
    if !config.is_complete() {
        return Err(ConnectError::MissingCredentials);
    }

    debug!(
        username = &config.api.username,
        region = &config.api.region,
        "Connect to the cloud databases api"
    );
    Service::try_from_config(config)
        .await
        .map_err(ConnectError::Api)
}

/// completes once the user hits ctrl-c
pub async fn interrupted() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(
            error = err.to_string(),
            "Could not listen for the interruption signal"
        );
        pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;
    use crate::svc::output::Format;

    #[test]
    fn command_line_interface_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn provision_is_the_default_command() {
        let args = Args::parse_from(["cdb-provisioner", "-vv", "--credentials", "/tmp/creds"]);

        assert_eq!(args.verbosity, 2);
        assert_eq!(args.credentials, Some(PathBuf::from("/tmp/creds")));
        assert!(args.command.is_none());
        assert!(matches!(Command::default(), Command::Provision(_)));
    }

    #[test]
    fn provision_answers_are_parsed() {
        let args = Args::parse_from([
            "cdb-provisioner",
            "provision",
            "--flavor",
            "2",
            "--name",
            "staging",
            "--databases",
            "3",
            "-o",
            "json",
        ]);

        match args.command {
            Some(Command::Provision(provision)) => {
                assert_eq!(provision.flavor.as_deref(), Some("2"));
                assert_eq!(provision.name.as_deref(), Some("staging"));
                assert_eq!(provision.databases, Some(3));
                assert_eq!(provision.output, Format::Json);
            }
            command => panic!("unexpected command {:?}", command),
        }
    }

    #[test]
    fn unknown_output_format_is_rejected() {
        assert!(Args::try_parse_from(["cdb-provisioner", "flavors", "-o", "xml"]).is_err());
    }

    #[tokio::test]
    async fn connect_requires_credentials() {
        let config = Configuration {
            api: crate::svc::cfg::Api {
                identity: "http://127.0.0.1:1".into(),
                region: "DFW".into(),
                username: String::new(),
                api_key: String::new(),
            },
            provision: Default::default(),
        };

        assert!(matches!(
            connect(Arc::new(config)).await,
            Err(ConnectError::MissingCredentials)
        ));
    }
}
