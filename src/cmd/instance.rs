//! # Instance module
//!
//! This module provides the instances command line interface function
//! implementation

use std::sync::Arc;

use async_trait::async_trait;
use clap::Args;

use crate::{
    cmd::{connect, ConnectError, Executor},
    svc::{
        cfg::Configuration,
        output::{self, Format},
        provision::instances_table,
        rackspace::{self, ext::CloudDatabases},
    },
};

// -----------------------------------------------------------------------------
// Error enum

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("{0}")]
    Connect(ConnectError),
    #[error("failed to list instances, {0}")]
    List(rackspace::Error),
    #[error("{0}")]
    Output(output::Error),
}

// -----------------------------------------------------------------------------
// Instances structure

#[derive(Args, Clone, Debug, Default)]
pub struct Instances {
    /// Format of the output
    #[clap(short = 'o', long = "output", default_value = "text")]
    pub output: Format,
}

#[async_trait]
impl Executor for Instances {
    type Error = Error;

    #[tracing::instrument(skip(config))]
    async fn execute(&self, config: Arc<Configuration>) -> Result<(), Self::Error> {
        let service = connect(config).await.map_err(Error::Connect)?;
        let instances = service.instances().await.map_err(Error::List)?;

        let out = self
            .output
            .render(&instances, |instances| instances_table(instances))
            .map_err(Error::Output)?;

        println!("{}", out.trim_end());
        Ok(())
    }
}
