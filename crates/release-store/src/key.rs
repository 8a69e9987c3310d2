//! Release keys: `<name>.v<version>`

use std::fmt;
use std::str::FromStr;

use crate::error::{StoreError, StoreResult};

/// Separator between the release name and its version.
pub const KEY_SEPARATOR: &str = ".v";

/// Composite identifier of one release version.
///
/// Fields are private so a `ReleaseKey` is always valid: non-empty name,
/// positive version, and a name that splits back out of the formatted key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReleaseKey {
    name: String,
    version: u32,
}

impl ReleaseKey {
    /// Build a key from its parts.
    pub fn new(name: impl Into<String>, version: u32) -> StoreResult<Self> {
        let name = name.into();
        if name.is_empty() || name.contains(KEY_SEPARATOR) || version == 0 {
            return Err(StoreError::InvalidKey {
                key: format!("{name}{KEY_SEPARATOR}{version}"),
            });
        }
        Ok(Self { name, version })
    }

    /// Parse `raw`, rejecting anything that does not split into exactly
    /// a name and an all-digit positive version.
    pub fn parse(raw: &str) -> StoreResult<Self> {
        let invalid = || StoreError::InvalidKey {
            key: raw.to_string(),
        };

        let parts: Vec<&str> = raw.split(KEY_SEPARATOR).collect();
        let [name, version] = parts.as_slice() else {
            return Err(invalid());
        };
        if name.is_empty() || version.is_empty() || !version.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let version: u32 = version.parse().map_err(|_| invalid())?;
        if version == 0 {
            return Err(invalid());
        }

        Ok(Self {
            name: (*name).to_string(),
            version,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> u32 {
        self.version
    }
}

impl fmt::Display for ReleaseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.name, KEY_SEPARATOR, self.version)
    }
}

impl FromStr for ReleaseKey {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_name_and_version() {
        let key = ReleaseKey::parse("smug-pigeon.v12").unwrap();
        assert_eq!(key.name(), "smug-pigeon");
        assert_eq!(key.version(), 12);
        assert_eq!(key.to_string(), "smug-pigeon.v12");
    }

    #[test]
    fn canonicalises_leading_zeros() {
        let key: ReleaseKey = "app.v007".parse().unwrap();
        assert_eq!(key.to_string(), "app.v7");
    }

    #[test]
    fn rejects_malformed_keys() {
        for raw in [
            "",
            "app",
            "app.v",
            ".v1",
            "app.vone",
            "app.v-1",
            "app.v+1",
            "app.v1.5",
            "app.v0",
            "app.v1.v2",
            "app.v99999999999",
        ] {
            let err = ReleaseKey::parse(raw).unwrap_err();
            assert_eq!(
                err,
                StoreError::InvalidKey {
                    key: raw.to_string()
                },
                "{raw:?} should be rejected"
            );
        }
    }

    #[test]
    fn new_rejects_unsplittable_names() {
        assert!(ReleaseKey::new("", 1).is_err());
        assert!(ReleaseKey::new("app", 0).is_err());
        assert!(ReleaseKey::new("my.vault", 1).is_err());
        assert!(ReleaseKey::new("my.app", 1).is_ok());
    }
}
