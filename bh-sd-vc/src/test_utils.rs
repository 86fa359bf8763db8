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
use serde_json::Value;

use crate::{
    json_object, utils, AsyncJwtCryptoProvider, JsonObject, JwtCryptoProvider,
    JwtVerificationOutcome, SdField, SdJwt, SdMap, SdPayload, Sha256, SignatureError,
};

/// Symbolic JWT crypto provider in lieu of a real signature algorithm.
///
/// The "signature" records which key signed which signing input. Bulky, but
/// it tests the important thing: over which message and using which key the
/// signature was produced, regardless of the (correctness of the)
/// implementation of the signature algorithm.
pub(crate) struct SymbolicCryptoProvider {
    pub(crate) default_kid: String,
}

impl Default for SymbolicCryptoProvider {
    fn default() -> Self {
        Self {
            default_kid: "test-key".to_owned(),
        }
    }
}

impl SymbolicCryptoProvider {
    fn symbolic_signature(kid: &str, signing_input: &str) -> String {
        bh_jws_utils::base64_url_encode(
            serde_json::json!({
                "kid": kid,
                "digest": utils::base64_url_digest(signing_input.as_bytes(), Sha256),
            })
            .to_string(),
        )
    }
}

impl JwtCryptoProvider for SymbolicCryptoProvider {
    fn sign(
        &self,
        payload: &JsonObject,
        key_id: Option<&str>,
        typ: &str,
        additional_headers: &JsonObject,
    ) -> crate::Result<String, SignatureError> {
        let kid = key_id.unwrap_or(&self.default_kid);

        let mut header = json_object!({
            "alg": "ES256",
            "typ": typ,
            "kid": kid,
        });
        header.extend(additional_headers.clone());

        let signing_input = format!(
            "{}.{}",
            bh_jws_utils::base64_url_encode(serde_json::to_string(&header).unwrap()),
            bh_jws_utils::base64_url_encode(serde_json::to_string(payload).unwrap()),
        );
        let signature = Self::symbolic_signature(kid, &signing_input);

        Ok(format!("{signing_input}.{signature}"))
    }

    fn verify(&self, jwt: &str, key_id: Option<&str>) -> JwtVerificationOutcome {
        let Ok((header, body, signature)) = crate::sd_jwt::split_jwt_segments(jwt) else {
            return JwtVerificationOutcome::failure("malformed JWT");
        };

        let Some(kid) = URL_SAFE_NO_PAD.decode(signature)
            .ok()
            .and_then(|bytes| serde_json::from_slice::<Value>(&bytes).ok())
            .and_then(|value| Some(value.get("kid")?.as_str()?.to_owned()))
        else {
            return JwtVerificationOutcome::failure("malformed signature");
        };

        if let Some(expected) = key_id {
            if expected != kid {
                return JwtVerificationOutcome::failure(format!("unknown key: {expected}"));
            }
        }

        let signing_input = format!("{header}.{body}");
        if signature != Self::symbolic_signature(&kid, &signing_input) {
            return JwtVerificationOutcome::failure("signature does not match payload");
        }

        JwtVerificationOutcome::success()
    }
}

/// Async wrapper delegating to [`SymbolicCryptoProvider`].
#[derive(Default)]
pub(crate) struct SymbolicAsyncProvider(SymbolicCryptoProvider);

impl AsyncJwtCryptoProvider for SymbolicAsyncProvider {
    async fn sign(
        &self,
        payload: &JsonObject,
        key_id: Option<&str>,
        typ: &str,
        additional_headers: &JsonObject,
    ) -> crate::Result<String, SignatureError> {
        self.0.sign(payload, key_id, typ, additional_headers)
    }

    async fn verify(&self, jwt: &str, key_id: Option<&str>) -> JwtVerificationOutcome {
        self.0.verify(jwt, key_id)
    }
}

/// A signed SD-JWT over a small claim set with flat and nested disclosures,
/// along with the original full payload.
pub(crate) fn issue_test_token() -> (SdJwt, JsonObject) {
    let provider = SymbolicCryptoProvider::default();

    let full_payload = json_object!({
        "sub": "user_42",
        "given_name": "John",
        "family_name": "Doe",
        "address": { "street_address": "123 Main St", "country": "US" }
    });
    let sd_map = SdMap::new([
        ("given_name".to_owned(), SdField::new(true)),
        ("family_name".to_owned(), SdField::new(true)),
        (
            "address".to_owned(),
            SdField::with_children(
                true,
                SdMap::new([("street_address".to_owned(), SdField::new(true))]),
            ),
        ),
    ]);

    let sd_payload = SdPayload::issue(&full_payload, &sd_map, &mut rand::thread_rng()).unwrap();
    let sd_jwt = SdJwt::sign(sd_payload, &provider, None, "JWT", &JsonObject::new()).unwrap();

    (sd_jwt, full_payload)
}
