use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::TenantError;

/// Shortest slug accepted for a restaurant.
pub const MIN_SLUG_LEN: usize = 2;

/// Longest slug accepted. `tenant_` + 56 bytes stays inside PostgreSQL's
/// 63-byte identifier limit.
pub const MAX_SLUG_LEN: usize = 56;

/// Used when a display name has nothing slug-worthy in it (e.g. only emoji).
const FALLBACK_SLUG: &str = "restaurant";

/// URL-safe restaurant identifier: lowercase `[a-z0-9-]`, no leading or
/// trailing hyphen. Underscores are rejected so that the partition namer's
/// `-` -> `_` substitution can never map two slugs to the same partition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TenantSlug(String);

impl TenantSlug {
    pub fn parse(raw: &str) -> Result<Self, TenantError> {
        if raw.len() < MIN_SLUG_LEN || raw.len() > MAX_SLUG_LEN {
            return Err(TenantError::InvalidTenantIdentifier(format!(
                "tenant slug must be between {} and {} characters",
                MIN_SLUG_LEN, MAX_SLUG_LEN
            )));
        }

        if !raw
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        {
            return Err(TenantError::InvalidTenantIdentifier(
                "tenant slug may only contain lowercase letters, digits and hyphens".to_string(),
            ));
        }

        if raw.starts_with('-') || raw.ends_with('-') {
            return Err(TenantError::InvalidTenantIdentifier(
                "tenant slug cannot start or end with a hyphen".to_string(),
            ));
        }

        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Numeric disambiguation used at signup: `spice-garden` -> `spice-garden-2`.
    /// The base is shortened when needed so the result is still a valid slug.
    pub fn with_suffix(&self, n: u32) -> TenantSlug {
        let suffix = format!("-{}", n);
        let keep = MAX_SLUG_LEN.saturating_sub(suffix.len()).min(self.0.len());
        let base = self.0[..keep].trim_end_matches('-');
        TenantSlug(format!("{}{}", base, suffix))
    }
}

/// Derive a slug from a restaurant's display name.
///
/// Lowercases ASCII alphanumerics and collapses every other run of
/// characters into a single hyphen. Always returns a valid slug.
pub fn slugify(display_name: &str) -> TenantSlug {
    let mut slug = String::with_capacity(display_name.len());

    for c in display_name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }

    slug.truncate(MAX_SLUG_LEN);
    let slug = slug.trim_end_matches('-');

    if slug.len() < MIN_SLUG_LEN {
        return TenantSlug(FALLBACK_SLUG.to_string());
    }
    TenantSlug(slug.to_string())
}

impl fmt::Display for TenantSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for TenantSlug {
    type Err = TenantError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for TenantSlug {
    type Error = TenantError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<TenantSlug> for String {
    fn from(slug: TenantSlug) -> Self {
        slug.0
    }
}

impl AsRef<str> for TenantSlug {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
