//! DID and DID key URL identifiers.
//!
//! Both are validated newtypes so a malformed identifier cannot reach the
//! signature or registry layers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// A decentralized identifier: `did:<method>:<method-specific-id>`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Did(String);

impl Did {
    /// Parse and validate a DID.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        let rest = s
            .strip_prefix("did:")
            .ok_or_else(|| CoreError::InvalidDid(s.to_string()))?;
        let (method, id) = rest
            .split_once(':')
            .ok_or_else(|| CoreError::InvalidDid(s.to_string()))?;

        let method_ok = !method.is_empty()
            && method
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit());
        let id_ok = !id.is_empty()
            && !id.ends_with(':')
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | ':' | '%'));

        if method_ok && id_ok {
            Ok(Self(s.to_string()))
        } else {
            Err(CoreError::InvalidDid(s.to_string()))
        }
    }

    /// The DID method name.
    pub fn method(&self) -> &str {
        self.0[4..].split(':').next().unwrap_or_default()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Build the key URL for a key id inside this DID's document.
    pub fn key_url(&self, key_id: &str) -> DidKeyUrl {
        DidKeyUrl {
            did: self.clone(),
            version_id: None,
            key_id: key_id.to_string(),
        }
    }
}

impl fmt::Debug for Did {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Did({})", self.0)
    }
}

impl fmt::Display for Did {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Did {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Did {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<Did> for String {
    fn from(did: Did) -> Self {
        did.0
    }
}

/// A DID key URL: `<did>[?versionId=<n>]#<key-id>`.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DidKeyUrl {
    did: Did,
    version_id: Option<u64>,
    key_id: String,
}

impl DidKeyUrl {
    /// Parse and validate a key URL.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        let invalid = || CoreError::InvalidDidKeyUrl(s.to_string());

        let (base, key_id) = s.split_once('#').ok_or_else(invalid)?;
        if key_id.is_empty()
            || !key_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        {
            return Err(invalid());
        }

        let (did_part, version_id) = match base.split_once('?') {
            Some((did_part, query)) => {
                let version = query
                    .strip_prefix("versionId=")
                    .and_then(|v| v.parse::<u64>().ok())
                    .ok_or_else(invalid)?;
                (did_part, Some(version))
            }
            None => (base, None),
        };

        let did = Did::parse(did_part).map_err(|_| invalid())?;
        Ok(Self {
            did,
            version_id,
            key_id: key_id.to_string(),
        })
    }

    /// The DID this key belongs to.
    pub fn did(&self) -> &Did {
        &self.did
    }

    /// The fragment naming the key (e.g. `keyagree`).
    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// The document version pinned by the URL, if any.
    pub fn version_id(&self) -> Option<u64> {
        self.version_id
    }

    /// Pin this URL to a document version.
    pub fn with_version(mut self, version_id: u64) -> Self {
        self.version_id = Some(version_id);
        self
    }
}

impl fmt::Debug for DidKeyUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DidKeyUrl({})", self)
    }
}

impl fmt::Display for DidKeyUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.version_id {
            Some(v) => write!(f, "{}?versionId={}#{}", self.did, v, self.key_id),
            None => write!(f, "{}#{}", self.did, self.key_id),
        }
    }
}

impl FromStr for DidKeyUrl {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for DidKeyUrl {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<DidKeyUrl> for String {
    fn from(url: DidKeyUrl) -> Self {
        url.to_string()
    }
}
