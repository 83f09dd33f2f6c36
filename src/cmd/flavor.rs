//! # Flavor module
//!
//! This module provides the flavors command line interface function
//! implementation

use std::sync::Arc;

use async_trait::async_trait;
use clap::Args;

use crate::{
    cmd::{connect, ConnectError, Executor},
    svc::{
        cfg::Configuration,
        output::{self, Format},
        provision::flavors_table,
        rackspace::{self, ext::CloudDatabases},
    },
};

// -----------------------------------------------------------------------------
// Error enum

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("{0}")]
    Connect(ConnectError),
    #[error("failed to list flavors, {0}")]
    List(rackspace::Error),
    #[error("{0}")]
    Output(output::Error),
}

// -----------------------------------------------------------------------------
// Flavors structure

#[derive(Args, Clone, Debug, Default)]
pub struct Flavors {
    /// Format of the output
    #[clap(short = 'o', long = "output", default_value = "text")]
    pub output: Format,
}

#[async_trait]
impl Executor for Flavors {
    type Error = Error;

    #[tracing::instrument(skip(config))]
    async fn execute(&self, config: Arc<Configuration>) -> Result<(), Self::Error> {
        let service = connect(config).await.map_err(Error::Connect)?;
        let flavors = service.flavors().await.map_err(Error::List)?;

        let out = self
            .output
            .render(&flavors, |flavors| flavors_table(flavors))
            .map_err(Error::Output)?;

        println!("{}", out.trim_end());
        Ok(())
    }
}
