//! # Provision module
//!
//! This module provides the provisioning workflow: choose a flavor and a free
//! instance name, create the instance, wait for it to be active and then
//! create the databases and their users.

use std::{
    future::Future,
    io::{BufRead, Write},
};

use rand::{distr::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::svc::{
    cfg::Provision,
    prompt::{self, Prompt},
    rackspace::{
        self,
        database::{CreateInstanceOpts, DatabaseName, DatabaseOpts, Flavor, Instance, UserOpts},
        ext::{wait_until_active, CloudDatabases, Polling},
    },
};

// -----------------------------------------------------------------------------
// Constants

pub const DATABASE_PREFIX: &str = "db_name";
pub const USER_PREFIX: &str = "db_user";

// -----------------------------------------------------------------------------
// Error enumeration

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("failed to interact with user, {0}")]
    Prompt(prompt::Error),
    #[error("failed to query cloud databases api, {0}")]
    Api(rackspace::Error),
    #[error("failed to find flavor '{0}' in the list of available flavors")]
    Flavor(String),
    #[error(
        "failed to use instance name '{0}', it already exists, you may choose something like '{1}'"
    )]
    NameTaken(String, String),
    #[error("failed to use instance name, it must not be empty")]
    EmptyName,
    #[error("failed to create instance '{0}', {1}")]
    CreateInstance(String, rackspace::Error),
    #[error("failed to wait for instance '{0}' to be active, {1}")]
    Wait(String, rackspace::Error),
    #[error("failed to create database '{0}' in instance '{1}', {2}")]
    CreateDatabase(String, String, rackspace::Error),
    #[error("failed to create user '{0}' in instance '{1}', {2}")]
    CreateUser(String, String, rackspace::Error),
    #[error(
        "failed to finish instance '{0}', interrupted after {1} database(s), it is left in place"
    )]
    Interrupted(String, usize),
}

impl From<prompt::Error> for Error {
    fn from(err: prompt::Error) -> Self {
        Self::Prompt(err)
    }
}

impl From<rackspace::Error> for Error {
    fn from(err: rackspace::Error) -> Self {
        Self::Api(err)
    }
}

// -----------------------------------------------------------------------------
// Answers structure

/// answers given ahead of time, usually from the command line, they are
/// validated like interactive ones but never re-prompted
#[derive(PartialEq, Eq, Clone, Debug, Default)]
pub struct Answers {
    pub flavor: Option<String>,
    pub name: Option<String>,
    pub databases: Option<u32>,
}

// -----------------------------------------------------------------------------
// Report structures

#[derive(Serialize, Deserialize, PartialEq, Eq, Clone, Debug)]
pub struct Grant {
    #[serde(rename = "database")]
    pub database: String,
    #[serde(rename = "user")]
    pub user: String,
    #[serde(rename = "password")]
    pub password: String,
}

#[derive(Serialize, Deserialize, PartialEq, Eq, Clone, Debug)]
pub struct Report {
    #[serde(rename = "id")]
    pub id: String,
    #[serde(rename = "name")]
    pub name: String,
    #[serde(rename = "flavor")]
    pub flavor: u64,
    #[serde(rename = "url")]
    pub url: Option<String>,
    #[serde(rename = "hostname")]
    pub hostname: Option<String>,
    #[serde(rename = "databases")]
    pub databases: Vec<Grant>,
}

impl Report {
    pub fn new(instance: &Instance, flavor: &Flavor, databases: Vec<Grant>) -> Self {
        Self {
            id: instance.id.to_owned(),
            name: instance.name.to_owned(),
            flavor: flavor.id,
            url: instance.url().map(ToOwned::to_owned),
            hostname: instance.hostname.to_owned(),
            databases,
        }
    }

    pub fn text(&self) -> String {
        let mut lines = vec![
            String::new(),
            "Database Info".to_string(),
            "-------------".to_string(),
            format!("Name: {}", self.name),
            format!("URL:  {}", self.url.as_deref().unwrap_or("<none>")),
        ];

        if let Some(hostname) = &self.hostname {
            lines.push(format!("Host: {}", hostname));
        }

        lines.extend(self.databases.iter().map(|grant| {
            format!(
                "  {} (user: {}, password: {})",
                grant.database, grant.user, grant.password
            )
        }));

        lines.join("\n")
    }
}

#[derive(PartialEq, Eq, Clone, Debug)]
pub enum Outcome {
    Provisioned(Report),
    /// the user declined to go on, nothing was created
    Aborted,
}

// -----------------------------------------------------------------------------
// Listing helpers

pub fn flavors_table(flavors: &[Flavor]) -> String {
    table("Available Instance Flavors", flavors)
}

pub fn instances_table(instances: &[Instance]) -> String {
    table("Available Instances", instances)
}

fn table<T: ToString>(title: &str, rows: &[T]) -> String {
    let mut buf = format!("\n{}\n{}", title, "-".repeat(title.len()));
    for row in rows {
        buf.push('\n');
        buf.push_str(&row.to_string());
    }

    buf
}

/// returns a random alphanumeric password
pub fn generate_password(length: usize) -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(length.max(1))
        .map(char::from)
        .collect()
}

fn interrupted(instance: &Instance, grants: &[Grant]) -> Error {
    warn!(
        id = &instance.id,
        name = &instance.name,
        databases = grants.len(),
        "Provisioning interrupted, the instance is left in place"
    );

    Error::Interrupted(instance.name.to_owned(), grants.len())
}

// -----------------------------------------------------------------------------
// Provisioner structure

pub struct Provisioner<'a, S: ?Sized, R, W> {
    service: &'a S,
    prompt: Prompt<R, W>,
    settings: Provision,
}

impl<'a, S, R, W> Provisioner<'a, S, R, W>
where
    S: CloudDatabases + ?Sized,
    R: BufRead + Send,
    W: Write + Send,
{
    pub fn new(service: &'a S, prompt: Prompt<R, W>, settings: Provision) -> Self {
        Self {
            service,
            prompt,
            settings,
        }
    }

    #[cfg(test)]
    pub fn into_prompt(self) -> Prompt<R, W> {
        self.prompt
    }

    /// Runs the whole workflow. Once the instance creation is requested,
    /// `interrupt` cancels the wait for the instance to become active and the
    /// creation of its databases and users.
    pub async fn run<I>(&mut self, answers: &Answers, interrupt: I) -> Result<Outcome, Error>
    where
        I: Future<Output = ()> + Send,
    {
        tokio::pin!(interrupt);

        let flavor = self.choose_flavor(answers.flavor.as_deref()).await?;
        let name = match self.choose_name(answers.name.as_deref()).await? {
            Some(name) => name,
            None => {
                info!("Provisioning aborted by the user");
                return Ok(Outcome::Aborted);
            }
        };

        let count = self.choose_count(answers.databases)?;
        let instance = self.create_instance(&flavor, &name, &mut interrupt).await?;
        let grants = self.create_databases(&instance, count, &mut interrupt).await?;

        Ok(Outcome::Provisioned(Report::new(&instance, &flavor, grants)))
    }

    async fn choose_flavor(&mut self, preset: Option<&str>) -> Result<Flavor, Error> {
        if let Some(input) = preset {
            return self
                .service
                .find_flavor(input)
                .await?
                .ok_or_else(|| Error::Flavor(input.to_owned()));
        }

        let flavors = self.service.flavors().await?;
        self.prompt.say(&flavors_table(&flavors))?;

        loop {
            let input = self.prompt.ask("Please choose a flavor (ex. 1): ")?;
            if let Some(flavor) = self.service.find_flavor(&input).await? {
                return Ok(flavor);
            }

            self.prompt.say(
                "Mmmm.. i don't think that flavor is in the list. Please choose another one.",
            )?;
        }
    }

    /// returns `None` when the user does not want to go on after a name
    /// collision
    async fn choose_name(&mut self, preset: Option<&str>) -> Result<Option<String>, Error> {
        if let Some(name) = preset {
            if name.is_empty() {
                return Err(Error::EmptyName);
            }

            if !self.service.is_instance_name_valid(name).await? {
                let suggestion = self.service.suggest_instance_name(name).await?;
                return Err(Error::NameTaken(name.to_owned(), suggestion));
            }

            return Ok(Some(name.to_owned()));
        }

        let instances = self.service.instances().await?;
        self.prompt.say(&instances_table(&instances))?;

        let mut suggestion: Option<String> = None;
        loop {
            let question = match &suggestion {
                Some(s) => format!("Please provide an instance name [{}]: ", s),
                None => "Please provide an instance name: ".to_string(),
            };

            let mut name = self.prompt.ask(&question)?;
            if name.is_empty() {
                match &suggestion {
                    Some(s) => name = s.to_owned(),
                    None => {
                        self.prompt.say("An instance name is required.")?;
                        continue;
                    }
                }
            }

            if self.service.is_instance_name_valid(&name).await? {
                return Ok(Some(name));
            }

            let s = self.service.suggest_instance_name(&name).await?;
            self.prompt.say(&format!(
                "Wait, that name already exists. You may choose something like: {}",
                s
            ))?;

            if self.prompt.declines("Do you want to continue? [y|n] ")? {
                return Ok(None);
            }

            suggestion = Some(s);
        }
    }

    fn choose_count(&mut self, preset: Option<u32>) -> Result<u32, Error> {
        if let Some(count) = preset {
            return Ok(count);
        }

        loop {
            let input = self
                .prompt
                .ask("How many instance databases would you like to create? ")?;

            match input.parse::<u32>() {
                Ok(count) => return Ok(count),
                Err(_) => self
                    .prompt
                    .say("Mmmm.. that is not a number of databases. Please try again.")?,
            }
        }
    }

    async fn create_instance<I>(
        &mut self,
        flavor: &Flavor,
        name: &str,
        interrupt: I,
    ) -> Result<Instance, Error>
    where
        I: Future<Output = ()> + Send,
    {
        let opts = CreateInstanceOpts::new(name.to_owned(), flavor, self.settings.volume_size);

        self.prompt.write(&format!("Creating instance: {}", name))?;
        let instance = match self.service.create_instance(&opts).await {
            Ok(instance) => instance,
            Err(err) => {
                self.prompt.say(" failed.")?;
                error!(name = name, error = err.to_string(), "Could not create instance");
                return Err(Error::CreateInstance(name.to_owned(), err));
            }
        };

        info!(id = &instance.id, name = name, "Instance created, waiting for it to be active");

        let polling = Polling::from(&self.settings);
        let prompt = &mut self.prompt;
        let mut output = Ok(());
        let result = wait_until_active(self.service, &instance.id, &polling, interrupt, |_| {
            if output.is_ok() {
                output = prompt.write(".");
            }
        })
        .await;

        output?;
        match result {
            Ok(instance) => {
                self.prompt.say("done.")?;
                Ok(instance)
            }
            Err(err) => {
                self.prompt.say(" failed.")?;
                error!(id = &instance.id, error = err.to_string(), "Instance is not active");
                Err(Error::Wait(name.to_owned(), err))
            }
        }
    }

    async fn create_databases<I>(
        &mut self,
        instance: &Instance,
        count: u32,
        mut interrupt: I,
    ) -> Result<Vec<Grant>, Error>
    where
        I: Future<Output = ()> + Send + Unpin,
    {
        let service = self.service;
        let mut grants = Vec::with_capacity(count as usize);

        for i in 1..=count {
            let database = format!("{}{}", DATABASE_PREFIX, i);
            self.prompt.say(&format!("Creating database: {}", database))?;

            let opts = DatabaseOpts::new(database.to_owned());
            tokio::select! {
                biased;

                _ = &mut interrupt => return Err(interrupted(instance, &grants)),
                result = service.create_database(&instance.id, &opts) => {
                    result.map_err(|err| {
                        error!(
                            database = &database,
                            error = err.to_string(),
                            "Could not create database"
                        );
                        Error::CreateDatabase(database.to_owned(), instance.name.to_owned(), err)
                    })?
                }
            }

            let user = format!("{}{}", USER_PREFIX, i);
            let opts = UserOpts {
                name: user.to_owned(),
                password: self.password(),
                databases: vec![DatabaseName {
                    name: database.to_owned(),
                }],
            };

            self.prompt.say(&format!("Creating user: {}", user))?;
            tokio::select! {
                biased;

                _ = &mut interrupt => return Err(interrupted(instance, &grants)),
                result = service.create_user(&instance.id, &opts) => {
                    result.map_err(|err| {
                        error!(user = &user, error = err.to_string(), "Could not create user");
                        Error::CreateUser(user.to_owned(), instance.name.to_owned(), err)
                    })?
                }
            }

            grants.push(Grant {
                database,
                user,
                password: opts.password,
            });
        }

        Ok(grants)
    }

    fn password(&self) -> String {
        match &self.settings.password {
            Some(password) => password.to_owned(),
            None => generate_password(self.settings.password_length),
        }
    }
}
