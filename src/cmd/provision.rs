//! # Provision module
//!
//! This module provides the provision command line interface function
//! implementation

use std::{
    io::{self, BufReader, Write},
    sync::Arc,
};

use async_trait::async_trait;
use clap::Args;
use tracing::info;

use crate::{
    cmd::{connect, interrupted, ConnectError, Executor},
    svc::{
        cfg::Configuration,
        output::{self, Format},
        prompt::Prompt,
        provision::{self, Answers, Outcome, Provisioner, Report},
    },
};

// -----------------------------------------------------------------------------
// Error enum

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("{0}")]
    Connect(ConnectError),
    #[error("{0}")]
    Provision(provision::Error),
    #[error("{0}")]
    Output(output::Error),
}

// -----------------------------------------------------------------------------
// Provision structure

#[derive(Args, Clone, Debug, Default)]
pub struct Provision {
    /// Identifier of the instance flavor, asked when missing
    #[clap(short = 'f', long = "flavor")]
    pub flavor: Option<String>,
    /// Name of the instance, asked when missing
    #[clap(short = 'n', long = "name")]
    pub name: Option<String>,
    /// Number of databases and users to create, asked when missing
    #[clap(short = 'd', long = "databases")]
    pub databases: Option<u32>,
    /// Format of the report, prompts are written on stderr unless it is text
    #[clap(short = 'o', long = "output", default_value = "text")]
    pub output: Format,
}

impl From<&Provision> for Answers {
    fn from(provision: &Provision) -> Self {
        Self {
            flavor: provision.flavor.to_owned(),
            name: provision.name.to_owned(),
            databases: provision.databases,
        }
    }
}

#[async_trait]
impl Executor for Provision {
    type Error = Error;

    #[tracing::instrument(skip(config))]
    async fn execute(&self, config: Arc<Configuration>) -> Result<(), Self::Error> {
        let service = connect(config.to_owned()).await.map_err(Error::Connect)?;

        let writer: Box<dyn Write + Send> = match self.output {
            Format::Text => Box::new(io::stdout()),
            _ => Box::new(io::stderr()),
        };

        let prompt = Prompt::new(BufReader::new(io::stdin()), writer);
        let mut provisioner = Provisioner::new(&service, prompt, config.provision.to_owned());

        match provisioner
            .run(&Answers::from(self), interrupted())
            .await
            .map_err(Error::Provision)?
        {
            Outcome::Aborted => Ok(()),
            Outcome::Provisioned(report) => {
                info!(
                    id = &report.id,
                    name = &report.name,
                    databases = report.databases.len(),
                    "Instance provisioned"
                );

                let out = self
                    .output
                    .render(&report, Report::text)
                    .map_err(Error::Output)?;

                println!("{}", out.trim_end());
                Ok(())
            }
        }
    }
}
