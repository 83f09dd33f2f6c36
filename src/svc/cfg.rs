//! # Configuration module
//!
//! This module provide utilities and helpers to interact with the configuration

use std::{
    convert::TryFrom,
    path::{Path, PathBuf},
    time::Duration,
};

use config::{
    builder::DefaultState, Config, ConfigBuilder, ConfigError, Environment, File, FileFormat,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

// -----------------------------------------------------------------------------
// Constants

pub const IDENTITY_ENDPOINT: &str = "https://identity.api.rackspacecloud.com/v2.0";
pub const DEFAULT_REGION: &str = "DFW";
pub const CREDENTIALS_FILE: &str = ".rackspace_cloud_credentials";

// -----------------------------------------------------------------------------
// Api structure

#[derive(Serialize, Deserialize, PartialEq, Eq, Clone, Debug)]
pub struct Api {
    #[serde(rename = "identity")]
    pub identity: String,
    #[serde(rename = "region")]
    pub region: String,
    #[serde(rename = "username", default)]
    pub username: String,
    #[serde(rename = "api_key", default)]
    pub api_key: String,
}

// -----------------------------------------------------------------------------
// Provision structure

#[derive(Serialize, Deserialize, PartialEq, Eq, Clone, Debug)]
#[serde(default)]
pub struct Provision {
    /// seconds to wait between two status polls
    #[serde(rename = "poll_interval")]
    pub poll_interval: u64,
    /// seconds to wait for the instance to become active, zero means forever
    #[serde(rename = "timeout")]
    pub timeout: u64,
    /// size of the instance volume in gigabytes
    #[serde(rename = "volume_size")]
    pub volume_size: u32,
    #[serde(rename = "password_length")]
    pub password_length: usize,
    /// when set, every user receives this password instead of a generated one
    #[serde(rename = "password", skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl Default for Provision {
    fn default() -> Self {
        Self {
            poll_interval: 2,
            timeout: 1800,
            volume_size: 1,
            password_length: 16,
            password: None,
        }
    }
}

impl Provision {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval)
    }

    pub fn timeout(&self) -> Option<Duration> {
        match self.timeout {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

// -----------------------------------------------------------------------------
// Credentials structures

/// mirrors the `[rackspace_cloud]` section of a pyrax credentials file
#[derive(Serialize, Deserialize, PartialEq, Eq, Clone, Debug, Default)]
pub struct Credentials {
    #[serde(rename = "username", default)]
    pub username: String,
    #[serde(rename = "api_key", default)]
    pub api_key: String,
}

#[derive(Deserialize, Clone, Debug, Default)]
struct CredentialsFile {
    #[serde(rename = "rackspace_cloud", default)]
    rackspace_cloud: Credentials,
}

impl Credentials {
    /// Reads an INI credentials file. A missing file yields empty credentials
    /// unless `required` is set.
    pub fn try_from_file(path: &Path, required: bool) -> Result<Self, ConfigurationError> {
        let file: CredentialsFile = Config::builder()
            .add_source(
                File::from(path.to_path_buf())
                    .format(FileFormat::Ini)
                    .required(required),
            )
            .build()
            .map_err(|err| ConfigurationError::Credentials(path.to_path_buf(), err))?
            .try_deserialize()
            .map_err(|err| ConfigurationError::Credentials(path.to_path_buf(), err))?;

        Ok(file.rackspace_cloud)
    }
}

// -----------------------------------------------------------------------------
// ConfigurationError enum

#[derive(thiserror::Error, Debug)]
pub enum ConfigurationError {
    #[error("failed to load file '{0:?}', {1}")]
    File(PathBuf, ConfigError),
    #[error("failed to load configuration, {0}")]
    Cast(ConfigError),
    #[error("failed to set default for key '{0}', {1}")]
    Default(String, ConfigError),
    #[error("failed to build configuration, {0}")]
    Build(ConfigError),
    #[error("failed to load credentials file '{0:?}', {1}")]
    Credentials(PathBuf, ConfigError),
}

// -----------------------------------------------------------------------------
// Configuration structures

#[derive(Serialize, Deserialize, PartialEq, Eq, Clone, Debug)]
pub struct Configuration {
    #[serde(rename = "api")]
    pub api: Api,
    #[serde(rename = "provision", default)]
    pub provision: Provision,
}

impl TryFrom<PathBuf> for Configuration {
    type Error = ConfigurationError;

    fn try_from(path: PathBuf) -> Result<Self, Self::Error> {
        let builder = defaults()?.add_source(File::from(path.to_owned()).required(true));

        builder
            .add_source(environment())
            .build()
            .map_err(|err| ConfigurationError::File(path, err))?
            .try_deserialize()
            .map_err(ConfigurationError::Cast)
    }
}

impl Configuration {
    pub fn try_default() -> Result<Self, ConfigurationError> {
        let mut paths = vec![
            PathBuf::from(format!("/usr/share/{}/config", env!("CARGO_PKG_NAME"))),
            PathBuf::from(format!("/etc/{}/config", env!("CARGO_PKG_NAME"))),
        ];

        if let Some(home) = home() {
            paths.push(home.join(".config").join(env!("CARGO_PKG_NAME")).join("config"));
            paths.push(
                home.join(".local")
                    .join("share")
                    .join(env!("CARGO_PKG_NAME"))
                    .join("config"),
            );
        }

        paths.push(PathBuf::from("config"));

        let mut builder = defaults()?;
        for path in paths {
            builder = builder.add_source(File::from(path).required(false));
        }

        builder
            .add_source(environment())
            .build()
            .map_err(ConfigurationError::Build)?
            .try_deserialize()
            .map_err(ConfigurationError::Cast)
    }

    /// Fills the missing api credentials from the given credentials file, or
    /// from `$HOME/.rackspace_cloud_credentials` when none is given. Values
    /// already present in the configuration win.
    pub fn with_credentials(mut self, path: Option<PathBuf>) -> Result<Self, ConfigurationError> {
        let (path, required) = match path {
            Some(path) => (path, true),
            None => match home() {
                Some(home) => (home.join(CREDENTIALS_FILE), false),
                None => return Ok(self),
            },
        };

        debug!(path = path.display().to_string(), "Load credentials file");
        let credentials = Credentials::try_from_file(&path, required)?;

        if self.api.username.is_empty() {
            self.api.username = credentials.username;
        }

        if self.api.api_key.is_empty() {
            self.api.api_key = credentials.api_key;
        }

        Ok(self)
    }

    pub fn credentials(&self) -> Credentials {
        Credentials {
            username: self.api.username.to_owned(),
            api_key: self.api.api_key.to_owned(),
        }
    }

    /// Logs a hint for each credential field that is still missing.
    pub fn help(&self) {
        if self.api.username.is_empty() {
            warn!(
                "Configuration has no username, set 'api.username', the environment variable '{}__API__USERNAME' or the credentials file",
                prefix()
            );
        }

        if self.api.api_key.is_empty() {
            warn!(
                "Configuration has no api key, set 'api.api_key', the environment variable '{}__API__API_KEY' or the credentials file",
                prefix()
            );
        }
    }

    pub fn is_complete(&self) -> bool {
        !self.api.username.is_empty() && !self.api.api_key.is_empty()
    }
}

// -----------------------------------------------------------------------------
// helpers

fn prefix() -> String {
    env!("CARGO_PKG_NAME").replace('-', "_").to_uppercase()
}

fn home() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}

fn environment() -> Environment {
    Environment::with_prefix(&prefix()).separator("__")
}

fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigurationError> {
    Config::builder()
        .set_default("api.identity", IDENTITY_ENDPOINT)
        .map_err(|err| ConfigurationError::Default("api.identity".into(), err))?
        .set_default("api.region", DEFAULT_REGION)
        .map_err(|err| ConfigurationError::Default("api.region".into(), err))
}
