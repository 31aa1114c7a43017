//! Ghost user prefix resolution.

use crate::error::PrefixError;
use crate::registration::Registration;

/// Suffix a users namespace regex must end with to be turned into a prefix.
pub const WILDCARD_SUFFIX: &str = ".*";

/// Determine the user id prefix shared by the bridge's ghost users.
///
/// An explicit prefix is used verbatim. Otherwise the first users namespace
/// of the registration is taken and its trailing `.*` stripped. Only that
/// exact wildcard form is recognised.
pub fn resolve_user_prefix(
    explicit: Option<&str>,
    registration: &Registration,
) -> Result<String, PrefixError> {
    if let Some(prefix) = explicit {
        return Ok(prefix.to_string());
    }

    let namespace = registration
        .namespaces
        .users
        .first()
        .ok_or(PrefixError::MissingNamespace)?;

    namespace
        .regex
        .strip_suffix(WILDCARD_SUFFIX)
        .map(str::to_string)
        .ok_or_else(|| PrefixError::UnrecognizedRegex(namespace.regex.clone()))
}
