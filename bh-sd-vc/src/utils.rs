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

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use bherror::{traits::ForeignError as _, Error};
use serde_json::Value;

use crate::{error::FormatError, Hasher, JsonObject, RESERVED_CLAIM_NAMES};

/// The field name of the hash algorithm used to hide the claims, as specified
/// [here].
///
/// [here]: https://datatracker.ietf.org/doc/html/draft-ietf-oauth-selective-disclosure-jwt-07#name-hash-function-claim
pub(crate) const SD_ALG_FIELD_NAME: &str = "_sd_alg";

/// Returns the `base64url`-encoded hash digest of the given `input` using the
/// provided [`Hasher`] to calculate the digest.
pub fn base64_url_digest(input: &[u8], hasher: impl Hasher) -> String {
    let digest = hasher.digest(input);

    bh_jws_utils::base64_url_encode(digest)
}

/// Decodes a `base64url` JWT segment into a JSON object.
pub(crate) fn decode_base64_json_object(
    segment: &str,
) -> bherror::Result<JsonObject, FormatError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .foreign_err(|| FormatError::NonParseableJwt)?;

    let value: Value =
        serde_json::from_slice(&bytes).foreign_err(|| FormatError::NonParseableJwt)?;

    match value {
        Value::Object(object) => Ok(object),
        _ => Err(Error::root(FormatError::NonParseableJwt)),
    }
}

/// The current time as seconds since the Unix epoch.
pub(crate) fn unix_timestamp() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Checks if the provided `key` is one of [RESERVED_CLAIM_NAMES].
pub(crate) fn is_reserved_claim_name(key: &str) -> Option<&'static str> {
    RESERVED_CLAIM_NAMES
        .iter()
        .find(|&name| key.eq(*name))
        .copied()
}

/// Recursively scans the `object` for any use of a reserved claim name.
///
/// The SD-JWT payload MUST NOT contain the reserved claims `_sd` and `_sd_alg`
/// except for the purposes of encoding SD-JWT hash pointers.
///
/// [Reference](https://datatracker.ietf.org/doc/html/draft-ietf-oauth-selective-disclosure-jwt#section-5.1-3.7)
pub(crate) fn find_reserved_claim_name(object: &JsonObject) -> Option<&'static str> {
    for (claim_name, claim_value) in object {
        if let Some(name) = is_reserved_claim_name(claim_name) {
            return Some(name);
        }
        if let Some(name) = find_reserved_claim_name_in_value(claim_value) {
            return Some(name);
        }
    }
    None
}

fn find_reserved_claim_name_in_value(value: &Value) -> Option<&'static str> {
    match value {
        Value::Object(object) => find_reserved_claim_name(object),
        Value::Array(array) => array.iter().find_map(find_reserved_claim_name_in_value),
        _ => None,
    }
}
