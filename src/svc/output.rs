//! # Output module
//!
//! This module provides the formats used to print results on the standard
//! output

use std::{
    error::Error as StdError,
    fmt::{self, Display, Formatter},
    str::FromStr,
};

use serde::Serialize;

// -----------------------------------------------------------------------------
// Error enumeration

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("failed to serialize output as json, {0}")]
    Json(serde_json::Error),
    #[error("failed to serialize output as yaml, {0}")]
    Yaml(serde_yaml::Error),
}

// -----------------------------------------------------------------------------
// Format enum

#[derive(PartialEq, Eq, Clone, Copy, Debug, Default)]
pub enum Format {
    #[default]
    Text,
    Json,
    Yaml,
}

impl FromStr for Format {
    type Err = Box<dyn StdError + Send + Sync>;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            "yaml" => Ok(Self::Yaml),
            _ => Err(format!(
                "failed to parse '{}', available options are 'text', 'json' or 'yaml'",
                s
            )
            .into()),
        }
    }
}

impl Display for Format {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
            Self::Yaml => write!(f, "yaml"),
        }
    }
}

impl Format {
    /// renders the value in the format, `text` is only computed for the text
    /// format
    pub fn render<T, F>(&self, value: &T, text: F) -> Result<String, Error>
    where
        T: Serialize,
        F: FnOnce(&T) -> String,
    {
        match self {
            Self::Text => Ok(text(value)),
            Self::Json => serde_json::to_string_pretty(value).map_err(Error::Json),
            Self::Yaml => serde_yaml::to_string(value).map_err(Error::Yaml),
        }
    }
}
