//! Registration validation.
//!
//! Catches structurally valid YAML that still cannot drive the tools.
//! Namespace regexes are the homeserver's business: one this crate's regex
//! engine cannot compile (look-around, for instance) is only reported.

use super::Registration;
use regex::Regex;
use thiserror::Error;
use tracing::warn;

/// Validation errors for a registration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("as_token is required")]
    MissingAsToken,
    #[error("sender_localpart is required")]
    MissingSenderLocalpart,
}

/// A namespace regex the local regex engine cannot compile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UncompiledRegex {
    pub kind: &'static str,
    pub index: usize,
    pub reason: String,
}

/// Validate a registration, returning all errors found.
pub fn validate(registration: &Registration) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if registration.as_token.trim().is_empty() {
        errors.push(ValidationError::MissingAsToken);
    }
    if registration.sender_localpart.trim().is_empty() {
        errors.push(ValidationError::MissingSenderLocalpart);
    }

    for uncompiled in uncompiled_regexes(registration) {
        warn!(
            kind = uncompiled.kind,
            index = uncompiled.index,
            reason = %uncompiled.reason,
            "Namespace regex not understood locally, leaving it to the homeserver"
        );
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Namespace regexes that do not compile with the `regex` crate.
pub fn uncompiled_regexes(registration: &Registration) -> Vec<UncompiledRegex> {
    let groups = [
        ("users", &registration.namespaces.users),
        ("aliases", &registration.namespaces.aliases),
        ("rooms", &registration.namespaces.rooms),
    ];
    groups
        .into_iter()
        .flat_map(|(kind, namespaces)| {
            namespaces
                .iter()
                .enumerate()
                .filter_map(move |(index, namespace)| {
                    Regex::new(&namespace.regex).err().map(|e| UncompiledRegex {
                        kind,
                        index,
                        reason: e.to_string(),
                    })
                })
        })
        .collect()
}
