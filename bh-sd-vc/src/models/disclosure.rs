// Copyright (C) 2020-2026  The Blockhouse Technology Limited (TBTL).
//
// This program is free software: you can redistribute it and/or modify it
// under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or (at your
// option) any later version.
//
// This program is distributed in the hope that it will be useful, but
// WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public
// License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use core::fmt;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use bherror::{
    traits::{ErrorContext as _, ForeignError as _},
    Error,
};
use serde_json::Value;

use crate::{error::FormatError, utils, Hasher};

/// Base64url encoded disclosure hash salt.
pub type Salt = String;

/// Base64url encoded hash value of a disclosure.
pub type Digest = String;

/// A disclosure concealing a single object property, in both parsed form and
/// the original serialized form.
///
/// The serialized form decodes to a JSON array `[<salt>, <key>, <value>]`.
/// Digests are always computed over the serialized form a disclosure was
/// first seen in, so re-encoding variations (whitespace, string escapes)
/// cannot silently change its identity.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Disclosure {
    salt: Salt,
    key: String,
    value: Value,
    // serialized-as-hashed
    serialized: String,
}

impl Disclosure {
    /// Construct a new [`Disclosure`] from the given `salt`, claim `key` and
    /// claim `value`.
    pub fn new(salt: Salt, key: String, value: Value) -> Self {
        let array = Value::Array(vec![
            Value::String(salt.clone()),
            Value::String(key.clone()),
            value.clone(),
        ]);

        let serialized = bh_jws_utils::base64_url_encode(array.to_string());

        Self {
            salt,
            key,
            value,
            serialized,
        }
    }

    /// The hash salt of the disclosure.
    pub fn salt(&self) -> &str {
        &self.salt
    }

    /// The claim name the disclosure conceals.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The claim value the disclosure conceals.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Serialized form of [`Self`].
    pub fn as_str(&self) -> &str {
        &self.serialized
    }

    /// Serialize [`Self`] into an owned [`String`].
    pub fn into_string(self) -> String {
        self.serialized
    }

    /// The `base64url`-encoded hash digest of the serialized disclosure, as
    /// embedded in `_sd` arrays.
    pub fn digest(&self, hasher: impl Hasher) -> Digest {
        utils::base64_url_digest(self.serialized.as_bytes(), hasher)
    }
}

impl TryFrom<String> for Disclosure {
    type Error = Error<FormatError>;

    fn try_from(serialized: String) -> Result<Self, Self::Error> {
        let decoded = URL_SAFE_NO_PAD
            .decode(&serialized)
            .foreign_err(|| {
                FormatError::InvalidDisclosure("provided string is not base64".to_string())
            })
            .ctx(|| serialized.clone())?;

        let array: Vec<Value> = serde_json::from_slice(&decoded)
            .foreign_err(|| {
                FormatError::InvalidDisclosure(
                    "decoded disclosure is not a JSON array".to_string(),
                )
            })
            .ctx(|| serialized.clone())?;

        if array.len() != 3 {
            return Err(Error::root(FormatError::InvalidDisclosure(format!(
                "deserialized disclosure array has invalid length {}",
                array.len(),
            ))))
            .ctx(|| serialized.clone());
        }

        let [salt, key, value]: [Value; 3] = array.try_into().unwrap();

        let Value::String(salt) = salt else {
            return Err(Error::root(FormatError::InvalidDisclosure(
                "salt value is not a string".to_string(),
            )))
            .ctx(|| serialized.clone());
        };
        let Value::String(key) = key else {
            return Err(Error::root(FormatError::InvalidDisclosure(
                "key value is not a string".to_string(),
            )))
            .ctx(|| serialized.clone());
        };

        Ok(Self {
            salt,
            key,
            value,
            serialized,
        })
    }
}

impl fmt::Display for Disclosure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}, {}]", self.salt, self.key, self.value)
    }
}
