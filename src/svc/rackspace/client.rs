//! # Client module
//!
//! This module provide the http client used to talk to rackspace apis and the
//! traits describing a json rest client

use std::{
    fmt::{self, Debug, Formatter},
    time::Duration,
};

use async_trait::async_trait;
use reqwest::{header, Method, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use tracing::trace;

// -----------------------------------------------------------------------------
// Constants

pub const AUTH_TOKEN_HEADER: &str = "X-Auth-Token";
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

// -----------------------------------------------------------------------------
// Request trait

#[async_trait]
pub trait Request {
    type Error;

    /// executes the request and returns the raw body of a successful response
    async fn request(
        &self,
        method: &Method,
        endpoint: &str,
        payload: Option<Vec<u8>>,
    ) -> Result<Vec<u8>, Self::Error>;
}

// -----------------------------------------------------------------------------
// RestClient trait

#[async_trait]
pub trait RestClient {
    type Error;

    async fn get<T>(&self, endpoint: &str) -> Result<T, Self::Error>
    where
        T: DeserializeOwned + Send + Sync;

    async fn post<T, U>(&self, endpoint: &str, payload: &T) -> Result<U, Self::Error>
    where
        T: Serialize + Send + Sync,
        U: DeserializeOwned + Send + Sync;

    /// posts the payload and ignores the body of the response, used for
    /// endpoints answering `202 Accepted` without content
    async fn post_empty<T>(&self, endpoint: &str, payload: &T) -> Result<(), Self::Error>
    where
        T: Serialize + Send + Sync;
}

// -----------------------------------------------------------------------------
// ClientError enum

#[derive(thiserror::Error, Debug)]
pub enum ClientError {
    #[error("failed to build http client, {0}")]
    Builder(reqwest::Error),
    #[error("failed to execute request, {0}")]
    Request(reqwest::Error),
    #[error("failed to execute request, got status code {0}, {1}")]
    StatusCode(StatusCode, String),
    #[error("failed to read body, {0}")]
    Body(reqwest::Error),
    #[error("failed to serialize body, {0}")]
    Serialize(serde_json::Error),
    #[error("failed to deserialize body, {0}")]
    Deserialize(serde_json::Error),
}

impl ClientError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::StatusCode(status, _) => Some(*status),
            _ => None,
        }
    }
}

// -----------------------------------------------------------------------------
// Client structure

#[derive(Clone)]
pub struct Client {
    inner: reqwest::Client,
    token: Option<String>,
}

impl Debug for Client {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("inner", &self.inner)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[async_trait]
impl Request for Client {
    type Error = ClientError;

    async fn request(
        &self,
        method: &Method,
        endpoint: &str,
        payload: Option<Vec<u8>>,
    ) -> Result<Vec<u8>, Self::Error> {
        let mut builder = self
            .inner
            .request(method.to_owned(), endpoint)
            .header(header::ACCEPT, "application/json");

        if let Some(token) = &self.token {
            builder = builder.header(AUTH_TOKEN_HEADER, token);
        }

        trace!(
            endpoint = endpoint,
            method = method.to_string(),
            body = payload
                .as_ref()
                .map(|buf| String::from_utf8_lossy(buf).to_string())
                .unwrap_or_else(|| "<none>".to_string()),
            "execute request"
        );

        if let Some(buf) = payload {
            builder = builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(buf);
        }

        let res = builder.send().await.map_err(ClientError::Request)?;
        let status = res.status();
        let buf = res.bytes().await.map_err(ClientError::Body)?;

        trace!(
            endpoint = endpoint,
            method = method.to_string(),
            status = status.as_u16(),
            "got response"
        );

        if !status.is_success() {
            return Err(ClientError::StatusCode(
                status,
                String::from_utf8_lossy(&buf).to_string(),
            ));
        }

        Ok(buf.to_vec())
    }
}

#[async_trait]
impl RestClient for Client {
    type Error = ClientError;

    async fn get<T>(&self, endpoint: &str) -> Result<T, Self::Error>
    where
        T: DeserializeOwned + Send + Sync,
    {
        let buf = self.request(&Method::GET, endpoint, None).await?;

        serde_json::from_slice(&buf).map_err(ClientError::Deserialize)
    }

    async fn post<T, U>(&self, endpoint: &str, payload: &T) -> Result<U, Self::Error>
    where
        T: Serialize + Send + Sync,
        U: DeserializeOwned + Send + Sync,
    {
        let payload = serde_json::to_vec(payload).map_err(ClientError::Serialize)?;
        let buf = self.request(&Method::POST, endpoint, Some(payload)).await?;

        serde_json::from_slice(&buf).map_err(ClientError::Deserialize)
    }

    async fn post_empty<T>(&self, endpoint: &str, payload: &T) -> Result<(), Self::Error>
    where
        T: Serialize + Send + Sync,
    {
        let payload = serde_json::to_vec(payload).map_err(ClientError::Serialize)?;

        self.request(&Method::POST, endpoint, Some(payload)).await?;
        Ok(())
    }
}

impl From<reqwest::Client> for Client {
    fn from(inner: reqwest::Client) -> Self {
        Self { inner, token: None }
    }
}

impl Client {
    pub fn try_new() -> Result<Self, ClientError> {
        Self::builder()
            .build()
            .map(Self::from)
            .map_err(ClientError::Builder)
    }

    /// returns a builder carrying the user agent and request timeout
    pub fn builder() -> reqwest::ClientBuilder {
        reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
    }

    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    pub fn with_token(mut self, token: String) -> Self {
        self.set_token(Some(token));
        self
    }
}
