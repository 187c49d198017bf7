use std::fmt;

use super::slug::TenantSlug;

/// Every tenant partition starts with this token; system schemas never do.
pub const PARTITION_PREFIX: &str = "tenant_";

/// Physical partition (PostgreSQL schema) holding one tenant's tables.
///
/// Only constructed from a validated [`TenantSlug`] or a stored name that
/// passes [`PartitionName::from_stored`], so it is always a safe identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PartitionName(String);

/// `sourabh-upadhyay` -> `tenant_sourabh_upadhyay`.
pub fn partition_name(slug: &TenantSlug) -> PartitionName {
    PartitionName(format!(
        "{}{}",
        PARTITION_PREFIX,
        slug.as_str().to_lowercase().replace('-', "_")
    ))
}

impl PartitionName {
    /// Accepts a partition name read back from storage (e.g. the central
    /// registry) if it has the tenant prefix and the restricted charset.
    pub fn from_stored(raw: &str) -> Option<Self> {
        let rest = raw.strip_prefix(PARTITION_PREFIX)?;
        let valid = !rest.is_empty()
            && rest
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
        valid.then(|| Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Reverse mapping for debugging and operator tooling.
    pub fn slug(&self) -> Option<TenantSlug> {
        let rest = self.0.strip_prefix(PARTITION_PREFIX)?;
        TenantSlug::parse(&rest.replace('_', "-")).ok()
    }
}

impl fmt::Display for PartitionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
