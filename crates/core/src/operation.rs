//! Operation identifiers (4-byte selectors).

use core::str::FromStr;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

use crate::error::CoreError;

/// Fixed-width identifier naming one callable entry point on a target.
///
/// Derived deterministically from the operation's signature and carried as the
/// first [`OperationId::LEN`] bytes of every encoded call.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OperationId([u8; 4]);

impl OperationId {
    pub const LEN: usize = 4;

    pub const fn from_bytes(bytes: [u8; 4]) -> Self {
        Self(bytes)
    }

    /// First four bytes of SHA-256 over the signature text, e.g. `"increment()"`.
    pub fn from_signature(signature: &str) -> Self {
        let digest = Sha256::digest(signature.as_bytes());
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(&digest[..Self::LEN]);
        Self(bytes)
    }

    /// Reads the selector prefix of an encoded call.
    ///
    /// Returns `None` when the call is shorter than a selector.
    pub fn from_call(call: &[u8]) -> Option<Self> {
        let prefix = call.get(..Self::LEN)?;
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(prefix);
        Some(Self(bytes))
    }

    /// Accepts either a `0x`-prefixed selector or a signature to derive one from.
    pub fn resolve(text: &str) -> Result<Self, CoreError> {
        let text = text.trim();
        if text.starts_with("0x") {
            text.parse()
        } else if text.is_empty() {
            Err(CoreError::invalid_operation("empty signature"))
        } else {
            Ok(Self::from_signature(text))
        }
    }

    pub const fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }

    /// Encodes a call: selector followed by `args`.
    pub fn encode_call(&self, args: &[u8]) -> Vec<u8> {
        let mut call = Vec::with_capacity(Self::LEN + args.len());
        call.extend_from_slice(&self.0);
        call.extend_from_slice(args);
        call
    }
}

impl core::fmt::Display for OperationId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "0x{:08x}", u32::from_be_bytes(self.0))
    }
}

impl core::fmt::Debug for OperationId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "OperationId({self})")
    }
}

impl FromStr for OperationId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s
            .strip_prefix("0x")
            .ok_or_else(|| CoreError::invalid_operation(format!("{s:?}: missing 0x prefix")))?;
        if hex.len() != 8 {
            return Err(CoreError::invalid_operation(format!(
                "{s:?}: expected 8 hex digits"
            )));
        }
        let value = u32::from_str_radix(hex, 16)
            .map_err(|e| CoreError::invalid_operation(format!("{s:?}: {e}")))?;
        Ok(Self(value.to_be_bytes()))
    }
}

impl Serialize for OperationId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for OperationId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}
