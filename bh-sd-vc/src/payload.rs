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

//! The SD-JWT payload engine: issuance-time redaction of a claim set, and
//! reconstruction, filtering and consistency checking of disclosures.

use std::collections::{BTreeMap, HashSet};
use std::str::FromStr;

use bherror::{traits::PropagateError as _, Error};
use rand_core::CryptoRngCore;
use serde_json::Value;

use crate::{
    utils::{self, SD_ALG_FIELD_NAME},
    DecodingError, DecodingResult, Digest, Disclosure, HashingAlgorithm, JsonObject, SdField,
    SdMap, Sha256, SD,
};

/// Payload of an SD-JWT: the undisclosed claim set as contained in the JWT
/// body, plus the disclosures appended to the JWT token, keyed by their
/// digests.
///
/// An [`SdPayload`] is immutable; presentation-time operations
/// ([`with_selective_disclosures`](Self::with_selective_disclosures),
/// [`without_disclosures`](Self::without_disclosures)) return new instances.
#[derive(Debug, Clone, PartialEq)]
pub struct SdPayload {
    undisclosed_payload: JsonObject,
    digested_disclosures: BTreeMap<Digest, Disclosure>,
}

impl SdPayload {
    pub(crate) fn from_parts(
        undisclosed_payload: JsonObject,
        digested_disclosures: BTreeMap<Digest, Disclosure>,
    ) -> Self {
        Self {
            undisclosed_payload,
            digested_disclosures,
        }
    }

    /// Create an [`SdPayload`] from the full claim set and a disclosure
    /// policy.
    ///
    /// Every field the policy marks with `sd = true` is removed from the
    /// payload and replaced by the digest of a freshly salted disclosure,
    /// collected in the `_sd` array of its nesting level. A nested object
    /// with its own policy is redacted first, so that when its parent is
    /// itself disclosable, the disclosure conceals the *already redacted*
    /// object and the nested fields stay independently hidden. Decoy digests
    /// are appended per each level's [`DecoyPolicy`](crate::DecoyPolicy).
    ///
    /// # Errors
    ///
    /// Fails if the payload uses the reserved claim names `_sd` or `_sd_alg`.
    pub fn issue<R: CryptoRngCore + ?Sized>(
        full_payload: &JsonObject,
        sd_map: &SdMap,
        rng: &mut R,
    ) -> DecodingResult<Self> {
        if let Some(name) = utils::find_reserved_claim_name(full_payload) {
            return Err(Error::root(DecodingError::ReservedClaimName(name)));
        }

        let mut digested_disclosures = BTreeMap::new();
        let undisclosed_payload =
            generate_undisclosed_object(full_payload, sd_map, &mut digested_disclosures, rng);

        Ok(Self {
            undisclosed_payload,
            digested_disclosures,
        })
    }

    /// Parse an [`SdPayload`] from a `base64url` JWT body and the disclosure
    /// strings appended to the JWT token.
    ///
    /// The hash algorithm is taken from the `_sd_alg` claim of the body
    /// (`sha-256` when absent). Exact duplicate disclosure strings are
    /// collapsed; distinct disclosures hashing to the same digest are
    /// rejected. The structure of every `_sd` array, in the body as well as
    /// inside disclosure values, is validated here once, so all later queries
    /// on the payload are infallible.
    pub fn parse(jwt_body: &str, disclosures: &[String]) -> crate::Result<Self, crate::Error> {
        let undisclosed_payload = utils::decode_base64_json_object(jwt_body)
            .match_err(|error| crate::Error::Format(error.clone()))?;

        let hasher = fetch_hashing_algorithm(&undisclosed_payload)
            .match_err(|error| crate::Error::Decoding(error.clone()))?
            .hasher();

        validate_object_structure(&undisclosed_payload, true)
            .match_err(|error| crate::Error::Decoding(error.clone()))?;

        let mut digested_disclosures = BTreeMap::new();
        let mut seen: HashSet<&str> = HashSet::new();
        for serialized in disclosures {
            if !seen.insert(serialized.as_str()) {
                continue;
            }

            let disclosure = Disclosure::try_from(serialized.clone())
                .match_err(|error| crate::Error::Format(error.clone()))?;

            validate_disclosure(&disclosure)
                .match_err(|error| crate::Error::Decoding(error.clone()))?;

            let digest = disclosure.digest(&hasher);
            if digested_disclosures.insert(digest, disclosure).is_some() {
                return Err(Error::root(crate::Error::Decoding(
                    DecodingError::DisclosureDigestCollision,
                )));
            }
        }

        Ok(Self {
            undisclosed_payload,
            digested_disclosures,
        })
    }

    /// The undisclosed claim set, as contained in the JWT body.
    pub fn undisclosed_payload(&self) -> &JsonObject {
        &self.undisclosed_payload
    }

    /// The disclosures appended to the JWT token, keyed by their digests.
    pub fn digested_disclosures(&self) -> &BTreeMap<Digest, Disclosure> {
        &self.digested_disclosures
    }

    /// Iterate over the disclosures appended to the JWT token.
    pub fn disclosures(&self) -> impl Iterator<Item = &Disclosure> {
        self.digested_disclosures.values()
    }

    /// The full claim set, with all attached disclosures resolved
    /// recursively.
    ///
    /// Digests without a matching disclosure (decoys, or disclosures the
    /// holder chose not to attach) are silently dropped; that silence is the
    /// hiding mechanism.
    pub fn full_payload(&self) -> JsonObject {
        let mut matched = HashSet::new();
        self.disclose_object(&self.undisclosed_payload, &mut matched)
    }

    /// The disclosure policy regenerated from the undisclosed payload and the
    /// attached disclosures.
    pub fn sd_map(&self) -> SdMap {
        self.regenerate_sd_map(&self.undisclosed_payload)
    }

    /// New payload with the attached disclosures restricted to the ones the
    /// given presentation policy selects.
    ///
    /// The undisclosed payload is unchanged; digests stay in place and only
    /// the set of attached disclosures shrinks.
    pub fn with_selective_disclosures(&self, sd_map: &SdMap) -> SdPayload {
        let selected = self.filter_disclosures(&self.undisclosed_payload, sd_map);

        SdPayload {
            undisclosed_payload: self.undisclosed_payload.clone(),
            digested_disclosures: self
                .digested_disclosures
                .iter()
                .filter(|(_, disclosure)| selected.contains(disclosure.as_str()))
                .map(|(digest, disclosure)| (digest.clone(), disclosure.clone()))
                .collect(),
        }
    }

    /// New payload with no disclosures attached at all (full redaction).
    pub fn without_disclosures(&self) -> SdPayload {
        SdPayload {
            undisclosed_payload: self.undisclosed_payload.clone(),
            digested_disclosures: BTreeMap::new(),
        }
    }

    /// Verify that the attached disclosures and the digests in the payload
    /// are mutually consistent.
    ///
    /// Returns `true` iff every attached disclosure is referenced by some
    /// digest reachable in the payload; an orphaned disclosure is a tamper
    /// signal.
    pub fn verify_disclosures(&self) -> bool {
        let mut matched = HashSet::new();
        self.disclose_object(&self.undisclosed_payload, &mut matched);

        self.digested_disclosures
            .keys()
            .all(|digest| matched.contains(digest.as_str()))
    }

    fn disclose_object<'p>(
        &'p self,
        payload: &'p JsonObject,
        matched: &mut HashSet<&'p str>,
    ) -> JsonObject {
        let mut object = JsonObject::new();

        for (key, value) in payload {
            if key == SD {
                // Validated to be an array of strings at construction.
                for digest in value.as_array().into_iter().flatten() {
                    let Some(digest) = digest.as_str() else {
                        continue;
                    };
                    let Some((digest, disclosure)) =
                        self.digested_disclosures.get_key_value(digest)
                    else {
                        continue;
                    };
                    matched.insert(digest.as_str());

                    let disclosed_value = match disclosure.value() {
                        Value::Object(nested) => {
                            Value::Object(self.disclose_object(nested, matched))
                        }
                        other => other.clone(),
                    };
                    object.insert(disclosure.key().to_owned(), disclosed_value);
                }
            } else if let Value::Object(nested) = value {
                object.insert(
                    key.clone(),
                    Value::Object(self.disclose_object(nested, matched)),
                );
            } else {
                object.insert(key.clone(), value.clone());
            }
        }

        object
    }

    /// Recursively collect the serialized disclosures that the presentation
    /// policy selects within `current`.
    ///
    /// Nested objects are descended into even when the field itself is not
    /// selected, since their own fields may be.
    fn filter_disclosures<'p>(
        &'p self,
        current: &'p JsonObject,
        sd_map: &SdMap,
    ) -> HashSet<&'p str> {
        let mut selected = HashSet::new();

        for (key, value) in current {
            if key == SD {
                continue;
            }
            let Value::Object(nested) = value else {
                continue;
            };
            if let Some(children) = sd_map.get(key).and_then(SdField::nonempty_children) {
                selected.extend(self.filter_disclosures(nested, children));
            }
        }

        for digest in current.get(SD).and_then(Value::as_array).into_iter().flatten() {
            let Some(disclosure) = digest.as_str().and_then(|digest| {
                self.digested_disclosures.get(digest)
            }) else {
                continue;
            };
            let Some(field) = sd_map.get(disclosure.key()) else {
                continue;
            };
            if !field.sd {
                continue;
            }

            selected.insert(disclosure.as_str());

            if let Value::Object(nested) = disclosure.value() {
                if let Some(children) = field.nonempty_children() {
                    selected.extend(self.filter_disclosures(nested, children));
                }
            }
        }

        selected
    }

    fn regenerate_sd_map(&self, payload: &JsonObject) -> SdMap {
        let mut fields = Vec::new();

        for digest in payload.get(SD).and_then(Value::as_array).into_iter().flatten() {
            let Some(disclosure) = digest.as_str().and_then(|digest| {
                self.digested_disclosures.get(digest)
            }) else {
                continue;
            };
            fields.push((
                disclosure.key().to_owned(),
                self.regenerate_sd_field(true, disclosure.value()),
            ));
        }

        for (key, value) in payload {
            if key == SD {
                continue;
            }
            fields.push((key.clone(), self.regenerate_sd_field(false, value)));
        }

        SdMap::new(fields)
    }

    fn regenerate_sd_field(&self, sd: bool, value: &Value) -> SdField {
        match value {
            Value::Object(object) => SdField::with_children(sd, self.regenerate_sd_map(object)),
            _ => SdField::new(sd),
        }
    }
}

fn generate_undisclosed_object<R: CryptoRngCore + ?Sized>(
    payload: &JsonObject,
    sd_map: &SdMap,
    digested_disclosures: &mut BTreeMap<Digest, Disclosure>,
    rng: &mut R,
) -> JsonObject {
    let mut object = JsonObject::new();
    let mut digests: Vec<Digest> = Vec::new();

    for (key, value) in payload {
        let field = sd_map.get(key);
        let sd = field.is_some_and(|field| field.sd);
        let children = field.and_then(|field| field.nonempty_children());

        match (value, children) {
            (Value::Object(nested), Some(children)) => {
                let nested_undisclosed =
                    generate_undisclosed_object(nested, children, digested_disclosures, rng);
                if sd {
                    // The parent conceals the already-redacted nested object.
                    digests.push(conceal_claim(
                        key,
                        Value::Object(nested_undisclosed),
                        digested_disclosures,
                        rng,
                    ));
                } else {
                    object.insert(key.clone(), Value::Object(nested_undisclosed));
                }
            }
            _ if sd => {
                digests.push(conceal_claim(key, value.clone(), digested_disclosures, rng));
            }
            _ => {
                object.insert(key.clone(), value.clone());
            }
        }
    }

    if !digests.is_empty() {
        for _ in 0..sd_map.decoys().sample_count(rng) {
            digests.push(decoy_digest(rng));
        }
        object.insert(SD.to_owned(), digests.into_iter().map(Value::String).collect());
    }

    object
}

fn conceal_claim<R: CryptoRngCore + ?Sized>(
    key: &str,
    value: Value,
    digested_disclosures: &mut BTreeMap<Digest, Disclosure>,
    rng: &mut R,
) -> Digest {
    let disclosure = Disclosure::new(generate_salt(rng), key.to_owned(), value);
    let digest = disclosure.digest(Sha256);
    digested_disclosures.insert(digest.clone(), disclosure);
    digest
}

/// A decoy digest is the digest of a fresh salt; no disclosure exists for it.
fn decoy_digest<R: CryptoRngCore + ?Sized>(rng: &mut R) -> Digest {
    utils::base64_url_digest(generate_salt(rng).as_bytes(), Sha256)
}

/// Generate a salt for the SD-JWT disclosure hashes.
///
/// The salt **MUST** be highly unpredictable; see draft sections [11.3] and
/// [11.4].
///
/// [11.3]: https://datatracker.ietf.org/doc/html/draft-ietf-oauth-selective-disclosure-jwt#name-entropy-of-the-salt
/// [11.4]: https://datatracker.ietf.org/doc/html/draft-ietf-oauth-selective-disclosure-jwt#name-minimum-length-of-the-salt
fn generate_salt<R: CryptoRngCore + ?Sized>(rng: &mut R) -> String {
    let mut salt = [0; SALT_ENTROPY_BYTES];
    rng.fill_bytes(&mut salt);
    bh_jws_utils::base64_url_encode(salt)
}

const SALT_ENTROPY_BYTES: usize = 16;

/// Identifies the hashing algorithm used for the disclosure digests, from the
/// `_sd_alg` claim of the undisclosed payload.
fn fetch_hashing_algorithm(payload: &JsonObject) -> DecodingResult<HashingAlgorithm> {
    let Some(value) = payload.get(SD_ALG_FIELD_NAME) else {
        return Ok(HashingAlgorithm::default());
    };

    let name = value
        .as_str()
        .ok_or_else(|| Error::root(DecodingError::InvalidHashAlgorithmName(value.to_string())))?;

    HashingAlgorithm::from_str(name)
}

/// Validates every use of the reserved claim names within the given object:
/// `_sd` must hold an array of strings, and `_sd_alg` may only appear at the
/// top level of the JWT body.
fn validate_object_structure(object: &JsonObject, top_level: bool) -> DecodingResult<()> {
    for (key, value) in object {
        if key == SD {
            let digests = value
                .as_array()
                .ok_or_else(|| Error::root(DecodingError::MalformedDigest(value.to_string())))?;
            for digest in digests {
                if !digest.is_string() {
                    return Err(Error::root(DecodingError::MalformedDigest(
                        digest.to_string(),
                    )));
                }
            }
            continue;
        }
        if key == SD_ALG_FIELD_NAME {
            if !top_level {
                return Err(Error::root(DecodingError::ReservedClaimName(
                    SD_ALG_FIELD_NAME,
                )));
            }
            continue;
        }
        validate_value_structure(value)?;
    }
    Ok(())
}

fn validate_value_structure(value: &Value) -> DecodingResult<()> {
    match value {
        Value::Object(object) => validate_object_structure(object, false),
        Value::Array(array) => array.iter().try_for_each(validate_value_structure),
        _ => Ok(()),
    }
}

/// A disclosure must not conceal a claim under a reserved name, and any `_sd`
/// arrays inside its value must be structurally valid.
fn validate_disclosure(disclosure: &Disclosure) -> DecodingResult<()> {
    if let Some(name) = utils::is_reserved_claim_name(disclosure.key()) {
        return Err(Error::root(DecodingError::ReservedClaimName(name)));
    }
    validate_value_structure(disclosure.value())
}
