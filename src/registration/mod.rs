//! Application-service registration loading.
//!
//! The registration file is the YAML document a bridge hands to its
//! homeserver. These tools only need the sender localpart, the `as_token` and
//! the user namespaces, but the remaining fields are accepted so an existing
//! bridge registration loads unchanged.

mod validation;

pub use validation::{UncompiledRegex, ValidationError, uncompiled_regexes, validate};

use serde::{Deserialize, Deserializer};
use std::path::Path;
use thiserror::Error;

/// Registration loading errors.
#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("failed to read registration file")]
    Io(#[from] std::io::Error),
    #[error("failed to parse registration")]
    Parse(#[from] serde_yaml::Error),
    #[error("invalid registration: {}", join_errors(.0))]
    Invalid(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Application-service registration.
#[derive(Debug, Clone, Deserialize)]
pub struct Registration {
    /// Registration id.
    #[serde(default)]
    pub id: Option<String>,
    /// URL the homeserver pushes transactions to (unused here).
    #[serde(default)]
    pub url: Option<String>,
    /// Token the application service authenticates with.
    pub as_token: String,
    /// Token the homeserver authenticates with (unused here).
    #[serde(default)]
    pub hs_token: Option<String>,
    /// Localpart of the bridge bot user.
    pub sender_localpart: String,
    /// Whether requests from the bridge are rate limited.
    #[serde(default)]
    pub rate_limited: Option<bool>,
    /// Third-party protocols the bridge provides.
    #[serde(default, deserialize_with = "null_as_default")]
    pub protocols: Vec<String>,
    /// Namespaces claimed by the bridge.
    #[serde(default, deserialize_with = "null_as_default")]
    pub namespaces: Namespaces,
}

/// Namespaces claimed by an application service.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Namespaces {
    #[serde(default, deserialize_with = "null_as_default")]
    pub users: Vec<Namespace>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub aliases: Vec<Namespace>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub rooms: Vec<Namespace>,
}

/// An explicit `null` reads the same as an absent key.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A single namespace declaration.
#[derive(Debug, Clone, Deserialize)]
pub struct Namespace {
    /// Whether the namespace is reserved exclusively for the bridge.
    #[serde(default)]
    pub exclusive: bool,
    /// Regular expression matching ids in the namespace.
    pub regex: String,
}

impl Registration {
    /// Load and validate a registration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, RegistrationError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse and validate a registration from YAML text.
    pub fn from_yaml(content: &str) -> Result<Self, RegistrationError> {
        let registration: Registration = serde_yaml::from_str(content)?;
        validate(&registration).map_err(RegistrationError::Invalid)?;
        Ok(registration)
    }

    /// Full user id of the bridge bot on `domain`.
    pub fn sender_user_id(&self, domain: &str) -> String {
        format!("@{}:{}", self.sender_localpart, domain)
    }
}
