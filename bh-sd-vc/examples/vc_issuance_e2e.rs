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

//! End-to-end walkthrough: an issuer signs an SD-JWT VC with selectively
//! disclosable claims, the holder presents a subset with a key binding
//! proof, and the verifier checks the result.

use std::collections::HashMap;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use bh_jws_utils::{Es256Signer, Es256Verifier, JwkPublic, SignatureVerifier, Signer};
use bh_sd_vc::{
    json_object, DecoyPolicy, HolderBinding, JsonObject, JwtCryptoProvider,
    JwtVerificationOutcome, SdField, SdJwtVc, SdMap, SdPayload, SignatureError, VcClaims,
};
use bherror::{traits::ForeignBoxed as _, Error};

const ISSUER_KID: &str = "issuer-key-1";
const HOLDER_KID: &str = "holder-key-1";

const AUDIENCE: &str = "https://example.com/verifier";
const NONCE: &str = "8f2f5d2c-1f6a-4c3b";

fn main() {
    let issuer_signer = Es256Signer::generate(ISSUER_KID.to_owned()).unwrap();
    let holder_signer = Es256Signer::generate(HOLDER_KID.to_owned()).unwrap();
    let holder_jwk = holder_signer.public_jwk().unwrap();

    let provider = JoseCryptoProvider::new(vec![issuer_signer, holder_signer]);

    // Issuer: redact the claim set and sign it as an SD-JWT VC.
    let full_payload = json_object!({
        "given_name": "Erika",
        "family_name": "Mustermann",
        "birthdate": "1963-08-12",
        "address": {
            "street_address": "Heidestraße 17",
            "locality": "Köln",
            "country": "DE"
        }
    });
    let sd_map = SdMap::with_decoys(
        [
            ("given_name".to_owned(), SdField::new(true)),
            ("family_name".to_owned(), SdField::new(true)),
            ("birthdate".to_owned(), SdField::new(true)),
            (
                "address".to_owned(),
                SdField::with_children(
                    true,
                    SdMap::new([
                        ("street_address".to_owned(), SdField::new(true)),
                        ("locality".to_owned(), SdField::new(true)),
                    ]),
                ),
            ),
        ],
        DecoyPolicy::Fixed(2),
    );

    let sd_payload = SdPayload::issue(&full_payload, &sd_map, &mut rand::thread_rng()).unwrap();

    let mut claims = VcClaims::new(
        "https://example.com/issuer".to_owned(),
        HolderBinding::Jwk(holder_jwk),
        "https://credentials.example.com/identity_credential".to_owned(),
    );
    claims.expiration = Some(now() + 365 * 24 * 60 * 60);

    let vc = SdJwtVc::sign(
        sd_payload,
        &provider,
        claims,
        Some(ISSUER_KID),
        &JsonObject::new(),
    )
    .unwrap();

    println!("Issued SD-JWT VC:\n{}\n", vc);

    // Holder: reveal the name and the address locality, nothing else.
    let held = SdJwtVc::parse(&vc.to_string()).unwrap();
    let presentation_map = SdMap::from_json_paths(
        ["given_name", "family_name", "address", "address.locality"],
        DecoyPolicy::None,
    );
    let presentation = held
        .present_with_key_binding(
            Some(&presentation_map),
            AUDIENCE,
            NONCE,
            &provider,
            Some(HOLDER_KID),
        )
        .unwrap();

    println!("Presentation:\n{}\n", presentation);

    // Verifier: parse and verify, then read the disclosed claims.
    let (received, result) = SdJwtVc::parse_and_verify(
        &presentation.to_string(),
        &provider,
        true,
        Some(AUDIENCE),
        Some(NONCE),
    )
    .unwrap();

    println!(
        "Verified: {} (signature: {}, disclosures: {}, vc checks: {})",
        result.verified(),
        result.sd_jwt_result.signature_verified,
        result.sd_jwt_result.disclosures_verified,
        result.vc_verified,
    );
    assert!(result.verified());

    let disclosed = received.full_payload();
    println!(
        "Disclosed claims:\n{}",
        serde_json::to_string_pretty(&disclosed).unwrap()
    );
    assert_eq!(disclosed["address"]["locality"], "Köln");
    assert!(disclosed["address"].get("street_address").is_none());
    assert!(disclosed.get("birthdate").is_none());
}

/// A [`JwtCryptoProvider`] backed by the `openssl` ES256 implementation of
/// `bh-jws-utils`, holding one key pair per key ID.
struct JoseCryptoProvider {
    signers: HashMap<String, Es256Signer>,
    public_keys: HashMap<String, JwkPublic>,
}

impl JoseCryptoProvider {
    fn new(signers: Vec<Es256Signer>) -> Self {
        let mut by_kid = HashMap::new();
        let mut public_keys = HashMap::new();
        for signer in signers {
            let jwk = signer.public_jwk().unwrap();
            let kid = jwk["kid"].as_str().unwrap().to_owned();
            public_keys.insert(kid.clone(), jwk);
            by_kid.insert(kid, signer);
        }
        Self {
            signers: by_kid,
            public_keys,
        }
    }
}

impl JwtCryptoProvider for JoseCryptoProvider {
    fn sign(
        &self,
        payload: &JsonObject,
        key_id: Option<&str>,
        typ: &str,
        additional_headers: &JsonObject,
    ) -> Result<String, Error<SignatureError>> {
        let signer = key_id
            .and_then(|kid| self.signers.get(kid))
            .ok_or_else(|| Error::root(SignatureError::SigningFailed))?;

        let mut header = json_object!({
            "alg": "ES256",
            "typ": typ,
            "kid": key_id,
        });
        header.extend(additional_headers.clone());

        let signing_input = format!(
            "{}.{}",
            bh_jws_utils::base64_url_encode(serde_json::to_string(&header).unwrap()),
            bh_jws_utils::base64_url_encode(serde_json::to_string(payload).unwrap()),
        );

        let signature = signer
            .sign(signing_input.as_bytes())
            .foreign_boxed_err(|| SignatureError::SigningFailed)?;

        Ok(format!(
            "{signing_input}.{}",
            bh_jws_utils::base64_url_encode(signature)
        ))
    }

    fn verify(&self, jwt: &str, key_id: Option<&str>) -> JwtVerificationOutcome {
        let parts: Vec<&str> = jwt.split('.').collect();
        let [header_b64, body_b64, signature_b64] = parts.as_slice() else {
            return JwtVerificationOutcome::failure("malformed JWT");
        };

        // Resolve the key: an explicit hint wins over the header `kid`.
        let kid = key_id.map(str::to_owned).or_else(|| {
            let header: JsonObject =
                serde_json::from_slice(&URL_SAFE_NO_PAD.decode(header_b64).ok()?).ok()?;
            Some(header.get("kid")?.as_str()?.to_owned())
        });
        let Some(public_key) = kid.as_deref().and_then(|kid| self.public_keys.get(kid)) else {
            return JwtVerificationOutcome::failure("unknown signing key");
        };

        let Ok(signature) = URL_SAFE_NO_PAD.decode(signature_b64) else {
            return JwtVerificationOutcome::failure("malformed signature");
        };

        let message = format!("{header_b64}.{body_b64}");
        match Es256Verifier.verify(message.as_bytes(), &signature, public_key) {
            Ok(true) => JwtVerificationOutcome::success(),
            Ok(false) => JwtVerificationOutcome::failure("invalid signature"),
            Err(error) => JwtVerificationOutcome::failure(error.to_string()),
        }
    }
}

fn now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_secs()
}
