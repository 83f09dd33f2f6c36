//! # Rackspace module
//!
//! This module provide structures, traits and helpers related to the rackspace
//! identity and cloud databases apis.

use crate::svc::rackspace::client::ClientError;

pub mod client;
pub mod database;
pub mod ext;
#[cfg(test)]
pub mod fake;
pub mod identity;

// -----------------------------------------------------------------------------
// Error enumeration

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("{0}")]
    Client(ClientError),
    #[error("{0}")]
    Identity(identity::Error),
    #[error("instance '{0}' ended up in status '{1}'")]
    Failed(String, database::Status),
    #[error("instance '{0}' is not active after {1} seconds")]
    Timeout(String, u64),
    #[error("interrupted while waiting for instance '{0}'")]
    Interrupted(String),
}

impl From<ClientError> for Error {
    fn from(err: ClientError) -> Self {
        Self::Client(err)
    }
}

impl From<identity::Error> for Error {
    fn from(err: identity::Error) -> Self {
        Self::Identity(err)
    }
}
