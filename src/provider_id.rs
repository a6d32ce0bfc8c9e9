//! Canonical provider-ID formatting and parsing
//!
//! The orchestrator addresses a Linode instance by the string
//! `linode://<decimal-instance-id>`. Parsing is strict: anything that does
//! not begin with the exact prefix, or whose remainder is not a plain
//! base-10 integer, is rejected.

use crate::{Error, Result};

/// Scheme prefix of every Linode provider ID
pub const PROVIDER_ID_PREFIX: &str = "linode://";

/// Format an instance ID as a provider-ID string
pub fn format_provider_id(instance_id: i64) -> String {
    format!("{PROVIDER_ID_PREFIX}{instance_id}")
}

/// Parse a provider-ID string back into an instance ID
///
/// Rejects a missing or different scheme and any remainder that is not a
/// base-10 integer (no sign, no whitespace) with
/// [`Error::InvalidProviderId`] carrying the rejected value.
pub fn parse_provider_id(provider_id: &str) -> Result<i64> {
    let rest = provider_id
        .strip_prefix(PROVIDER_ID_PREFIX)
        .ok_or_else(|| Error::invalid_provider_id(provider_id))?;

    if rest.is_empty() || !rest.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::invalid_provider_id(provider_id));
    }

    rest.parse::<i64>()
        .map_err(|_| Error::invalid_provider_id(provider_id))
}

/// Check whether a provider-ID string uses the Linode scheme
///
/// Used by the lookup facade to decide between provider-ID resolution and
/// falling back to label matching for IDs minted by other providers.
pub fn is_linode_provider_id(provider_id: &str) -> bool {
    provider_id.starts_with(PROVIDER_ID_PREFIX)
}
