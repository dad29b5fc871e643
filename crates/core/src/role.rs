//! Role identifiers.

use core::str::FromStr;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::CoreError;

/// Opaque numeric role identifier.
///
/// Two values are reserved: [`RoleId::ADMIN`] (root authority) and
/// [`RoleId::PUBLIC`] (no restriction). Every other value is application-defined.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct RoleId(u64);

impl RoleId {
    pub const ADMIN: RoleId = RoleId(0);
    pub const PUBLIC: RoleId = RoleId(u64::MAX);

    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub const fn get(self) -> u64 {
        self.0
    }

    pub const fn is_admin(self) -> bool {
        self.0 == Self::ADMIN.0
    }

    pub const fn is_public(self) -> bool {
        self.0 == Self::PUBLIC.0
    }
}

impl From<u64> for RoleId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl core::fmt::Display for RoleId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match *self {
            Self::ADMIN => f.write_str("ADMIN"),
            Self::PUBLIC => f.write_str("PUBLIC"),
            Self(id) => write!(f, "{id}"),
        }
    }
}

impl FromStr for RoleId {
    type Err = CoreError;

    /// Accepts `ADMIN`, `PUBLIC` (any case) or a decimal integer.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("admin") {
            return Ok(Self::ADMIN);
        }
        if s.eq_ignore_ascii_case("public") {
            return Ok(Self::PUBLIC);
        }
        s.parse::<u64>()
            .map(Self)
            .map_err(|e| CoreError::invalid_role(format!("{s:?}: {e}")))
    }
}

impl<'de> Deserialize<'de> for RoleId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        // Policy documents may spell roles as numbers or as reserved names.
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Id(u64),
            Name(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Id(id) => Ok(Self(id)),
            Repr::Name(name) => name.parse().map_err(serde::de::Error::custom),
        }
    }
}
