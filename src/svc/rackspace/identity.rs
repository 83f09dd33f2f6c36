//! # Identity module
//!
//! This module provide structures and helpers to authenticate against the
//! rackspace identity api and to look up endpoints in the service catalog.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::svc::{
    cfg::Credentials,
    rackspace::client::{Client, ClientError, RestClient},
};

// -----------------------------------------------------------------------------
// Constants

pub const DATABASE_SERVICE: &str = "cloudDatabases";

// -----------------------------------------------------------------------------
// Request structures

#[derive(Serialize, Deserialize, PartialEq, Eq, Clone, Debug)]
pub struct ApiKeyCredentials {
    #[serde(rename = "username")]
    pub username: String,
    #[serde(rename = "apiKey")]
    pub api_key: String,
}

#[derive(Serialize, Deserialize, PartialEq, Eq, Clone, Debug)]
pub struct Auth {
    #[serde(rename = "RAX-KSKEY:apiKeyCredentials")]
    pub credentials: ApiKeyCredentials,
}

#[derive(Serialize, Deserialize, PartialEq, Eq, Clone, Debug)]
pub struct AuthRequest {
    #[serde(rename = "auth")]
    pub auth: Auth,
}

impl From<&Credentials> for AuthRequest {
    fn from(credentials: &Credentials) -> Self {
        Self {
            auth: Auth {
                credentials: ApiKeyCredentials {
                    username: credentials.username.to_owned(),
                    api_key: credentials.api_key.to_owned(),
                },
            },
        }
    }
}

// -----------------------------------------------------------------------------
// Response structures

#[derive(Serialize, Deserialize, PartialEq, Eq, Clone, Debug)]
pub struct Token {
    #[serde(rename = "id")]
    pub id: String,
    #[serde(rename = "expires", default)]
    pub expires: Option<String>,
}

#[derive(Serialize, Deserialize, PartialEq, Eq, Clone, Debug)]
pub struct Endpoint {
    #[serde(rename = "region", default)]
    pub region: Option<String>,
    #[serde(rename = "tenantId", default)]
    pub tenant_id: Option<String>,
    #[serde(rename = "publicURL")]
    pub public_url: String,
}

#[derive(Serialize, Deserialize, PartialEq, Eq, Clone, Debug)]
pub struct Service {
    #[serde(rename = "name")]
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "endpoints", default)]
    pub endpoints: Vec<Endpoint>,
}

#[derive(Serialize, Deserialize, PartialEq, Eq, Clone, Debug)]
pub struct Access {
    #[serde(rename = "token")]
    pub token: Token,
    #[serde(rename = "serviceCatalog", default)]
    pub service_catalog: Vec<Service>,
}

#[derive(Serialize, Deserialize, PartialEq, Eq, Clone, Debug)]
pub struct AuthResponse {
    #[serde(rename = "access")]
    pub access: Access,
}

impl Access {
    /// returns the public url of the service in the given region, a
    /// regionless endpoint is used when the region has none
    pub fn endpoint(&self, service: &str, region: &str) -> Option<String> {
        let endpoints = &self
            .service_catalog
            .iter()
            .find(|svc| svc.name == service)?
            .endpoints;

        endpoints
            .iter()
            .find(|endpoint| {
                endpoint
                    .region
                    .as_deref()
                    .is_some_and(|r| r.eq_ignore_ascii_case(region))
            })
            .or_else(|| endpoints.iter().find(|endpoint| endpoint.region.is_none()))
            .map(|endpoint| endpoint.public_url.trim_end_matches('/').to_string())
    }
}

// -----------------------------------------------------------------------------
// Error enum

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("failed to authenticate user '{0}', credentials were rejected")]
    Unauthorized(String),
    #[error("failed to authenticate user '{0}', {1}")]
    Authenticate(String, ClientError),
    #[error("failed to find endpoint of service '{0}' in region '{1}'")]
    Endpoint(String, String),
}

// -----------------------------------------------------------------------------
// Helpers functions

/// authenticates with the api key and returns the token and service catalog
pub async fn authenticate(
    client: &Client,
    identity: &str,
    credentials: &Credentials,
) -> Result<Access, Error> {
    let path = format!("{}/tokens", identity.trim_end_matches('/'));

    debug!(
        path = &path,
        username = &credentials.username,
        "execute a request to authenticate"
    );
    let res: AuthResponse = client
        .post(&path, &AuthRequest::from(credentials))
        .await
        .map_err(|err| match err.status().map(|status| status.as_u16()) {
            Some(401) | Some(403) => Error::Unauthorized(credentials.username.to_owned()),
            _ => Error::Authenticate(credentials.username.to_owned(), err),
        })?;

    Ok(res.access)
}
