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

//! The SD-JWT VC profile: Verifiable Credential claims and verification on
//! top of the basic [`SdJwt`] container.

use bh_status_list::StatusClaim;
use serde_json::Value;

use crate::{utils, JsonObject, JwtCryptoProvider, SdJwt, SdPayload, VerificationResult};

/// The JWT header `typ` value of an SD-JWT VC, as specified [here].
///
/// [here]: https://datatracker.ietf.org/doc/html/draft-ietf-oauth-sd-jwt-vc-03#section-3.2.2.1.1
pub const SD_JWT_VC_TYPE_HEADER: &str = "vc+sd-jwt";

/// The holder key the credential is bound to, placed in the `cnf` claim.
///
/// Exactly one binding form exists per credential; the variants are mutually
/// exclusive by construction.
#[derive(Debug, Clone, PartialEq)]
pub enum HolderBinding {
    /// Binding via the holder's DID, placed under `cnf.kid`.
    ///
    /// Note that verification of DID-bound credentials is not supported; see
    /// [`SdJwtVc::verify_vc`].
    Did(String),
    /// Binding via the holder's public key JWK, placed under `cnf.jwk`.
    Jwk(JsonObject),
}

impl HolderBinding {
    fn cnf(&self) -> JsonObject {
        match self {
            HolderBinding::Did(did) => crate::json_object!({ "kid": did }),
            HolderBinding::Jwk(jwk) => crate::json_object!({ "jwk": jwk }),
        }
    }
}

/// The Verifiable Credential claims merged into the undisclosed payload at
/// issuance.
#[derive(Debug, Clone, PartialEq)]
pub struct VcClaims {
    /// The Issuer identifier (`iss`).
    pub issuer: String,
    /// The holder key binding (`cnf`).
    pub holder_binding: HolderBinding,
    /// The credential type identifier (`vct`).
    pub vct: String,
    /// Start of the validity window (`nbf`), if any.
    pub not_before: Option<u64>,
    /// End of the validity window (`exp`), if any.
    pub expiration: Option<u64>,
    /// The credential status reference (`status`), if any.
    pub status: Option<StatusClaim>,
    /// The subject identifier (`sub`), if any.
    pub subject: Option<String>,
}

impl VcClaims {
    /// Claims with the mandatory fields set and every optional one absent.
    pub fn new(issuer: String, holder_binding: HolderBinding, vct: String) -> Self {
        Self {
            issuer,
            holder_binding,
            vct,
            not_before: None,
            expiration: None,
            status: None,
            subject: None,
        }
    }
}

/// An SD-JWT VC: an [`SdJwt`] whose payload carries Verifiable Credential
/// claims (issuer, validity window, credential type and holder key binding).
///
/// The credential semantics live next to the base token, which stays
/// reachable through [`Deref`](std::ops::Deref) and
/// [`sd_jwt`](Self::sd_jwt).
#[derive(Debug, Clone)]
pub struct SdJwtVc {
    sd_jwt: SdJwt,
}

/// The outcome of verifying an [`SdJwtVc`].
///
/// The base token result and the credential-level checks are reported
/// individually; [`verified`](Self::verified) is their conjunction.
#[derive(Debug, Clone, PartialEq)]
pub struct VcVerificationResult {
    /// The outcome of the base SD-JWT verification.
    pub sd_jwt_result: VerificationResult,
    /// Whether the credential-level checks (validity window, `vct`, holder
    /// key binding) all passed.
    pub vc_verified: bool,
    /// Accumulated reasons for failed credential-level checks.
    pub message: Option<String>,
}

impl VcVerificationResult {
    /// Whether the credential verified as a whole.
    pub fn verified(&self) -> bool {
        self.sd_jwt_result.verified() && self.vc_verified
    }
}

impl SdJwtVc {
    /// Wrap a parsed [`SdJwt`] as a Verifiable Credential.
    pub fn new(sd_jwt: SdJwt) -> Self {
        Self { sd_jwt }
    }

    /// Parse an SD-JWT VC from its compact serialization.
    pub fn parse(value: &str) -> crate::Result<Self, crate::Error> {
        Ok(Self::new(SdJwt::parse(value)?))
    }

    /// Sign the given payload as an SD-JWT VC.
    ///
    /// The [`VcClaims`] are merged into the undisclosed payload together with
    /// the `_sd_alg` claim, and the JWT header `typ` is set to
    /// [`SD_JWT_VC_TYPE_HEADER`]. The payload's disclosures are unaffected.
    pub fn sign(
        sd_payload: SdPayload,
        provider: &impl JwtCryptoProvider,
        claims: VcClaims,
        issuer_key_id: Option<&str>,
        additional_headers: &JsonObject,
    ) -> crate::Result<Self, crate::Error> {
        let mut undisclosed = sd_payload.undisclosed_payload().clone();
        for (key, value) in default_payload_properties(&claims) {
            undisclosed.insert(key, value);
        }

        let sd_payload =
            SdPayload::from_parts(undisclosed, sd_payload.digested_disclosures().clone());

        SdJwt::sign(
            sd_payload,
            provider,
            issuer_key_id,
            SD_JWT_VC_TYPE_HEADER,
            additional_headers,
        )
        .map(Self::new)
    }

    /// The underlying SD-JWT.
    pub fn sd_jwt(&self) -> &SdJwt {
        &self.sd_jwt
    }

    /// The `cnf` claim object, if present.
    pub fn cnf_object(&self) -> Option<&JsonObject> {
        self.undisclosed_payload()
            .get("cnf")
            .and_then(Value::as_object)
    }

    /// The holder DID from `cnf.kid`, if the credential is DID-bound.
    pub fn holder_did(&self) -> Option<&str> {
        self.cnf_object()?.get("kid")?.as_str()
    }

    /// The holder public key JWK from `cnf.jwk`, if the credential is
    /// JWK-bound.
    pub fn holder_key_jwk(&self) -> Option<&JsonObject> {
        self.cnf_object()?.get("jwk")?.as_object()
    }

    /// The Issuer identifier (`iss`), if present.
    pub fn issuer(&self) -> Option<&str> {
        self.undisclosed_payload().get("iss").and_then(Value::as_str)
    }

    /// The start of the validity window (`nbf`), if present.
    pub fn not_before(&self) -> Option<u64> {
        self.undisclosed_payload().get("nbf").and_then(Value::as_u64)
    }

    /// The end of the validity window (`exp`), if present.
    pub fn expiration(&self) -> Option<u64> {
        self.undisclosed_payload().get("exp").and_then(Value::as_u64)
    }

    /// The credential type identifier (`vct`), if present.
    pub fn vct(&self) -> Option<&str> {
        self.undisclosed_payload().get("vct").and_then(Value::as_str)
    }

    /// The credential status reference (`status`), if present.
    pub fn status(&self) -> Option<&JsonObject> {
        self.undisclosed_payload()
            .get("status")
            .and_then(Value::as_object)
    }

    /// The hash algorithm claim (`_sd_alg`), if present.
    pub fn sd_alg(&self) -> Option<&str> {
        self.undisclosed_payload()
            .get(utils::SD_ALG_FIELD_NAME)
            .and_then(Value::as_str)
    }

    /// Verify this credential:
    ///
    /// 1. the base SD-JWT verification (signature and disclosures), keyed by
    ///    the header `kid` falling back to the `iss` claim;
    /// 2. the validity window: `now >= nbf` and `now < exp`, where present;
    /// 3. the presence of a non-empty `vct` claim;
    /// 4. the holder key binding, per the rules of
    ///    [`verify_holder_binding`](Self::verify_holder_binding).
    ///
    /// Every failed credential-level check appends a reason to the result
    /// message; nothing is raised as an error.
    pub fn verify_vc(
        &self,
        provider: &impl JwtCryptoProvider,
        requires_holder_binding: bool,
        audience: Option<&str>,
        nonce: Option<&str>,
    ) -> VcVerificationResult {
        let key_id = self.key_id().or_else(|| self.issuer());
        let sd_jwt_result = self.sd_jwt.verify(provider, key_id);

        let now = utils::unix_timestamp();
        let mut reasons: Vec<String> = Vec::new();

        if let Some(not_before) = self.not_before() {
            if now < not_before {
                reasons.push(format!("VC is not valid before {not_before}"));
            }
        }
        if let Some(expiration) = self.expiration() {
            if now >= expiration {
                reasons.push(format!("VC is not valid after {expiration}"));
            }
        }
        if self.vct().map_or(true, str::is_empty) {
            reasons.push("VC has no verifiable credential type property (vct)".to_owned());
        }
        if !self.verify_holder_binding(provider, requires_holder_binding, audience, nonce) {
            reasons.push("holder key binding could not be verified".to_owned());
        }

        VcVerificationResult {
            sd_jwt_result,
            vc_verified: reasons.is_empty(),
            message: (!reasons.is_empty()).then(|| reasons.join(", ")),
        }
    }

    /// Check the holder key binding of this credential.
    ///
    /// - A DID-bound credential (`cnf.kid`) always fails the check:
    ///   resolving holder keys from DIDs is not supported by this crate, and
    ///   the limitation must surface rather than pass silently.
    /// - A JWK-bound credential (`cnf.jwk`) requires this token to be a
    ///   presentation carrying a Key Binding JWT that verifies against the
    ///   supplied `audience` and `nonce`, with the bound JWK's `kid` as the
    ///   key hint.
    /// - Without a declared binding, the check passes iff
    ///   `requires_holder_binding` is not set.
    fn verify_holder_binding(
        &self,
        provider: &impl JwtCryptoProvider,
        requires_holder_binding: bool,
        audience: Option<&str>,
        nonce: Option<&str>,
    ) -> bool {
        if self.holder_did().is_some_and(|did| !did.is_empty()) {
            tracing::warn!("DID-bound holder key verification is not supported");
            return false;
        }

        if let Some(jwk) = self.holder_key_jwk() {
            let (Some(audience), Some(nonce)) = (
                audience.filter(|audience| !audience.is_empty()),
                nonce.filter(|nonce| !nonce.is_empty()),
            ) else {
                return false;
            };
            let Some(key_binding_jwt) = self.key_binding_jwt() else {
                return false;
            };

            return self.is_presentation()
                && key_binding_jwt.verify_kb(
                    provider,
                    audience,
                    nonce,
                    &self.sd_jwt,
                    jwk.get("kid").and_then(Value::as_str),
                );
        }

        !requires_holder_binding
    }

    /// Parse an SD-JWT VC from its compact serialization and verify it.
    pub fn parse_and_verify(
        value: &str,
        provider: &impl JwtCryptoProvider,
        requires_holder_binding: bool,
        audience: Option<&str>,
        nonce: Option<&str>,
    ) -> crate::Result<(Self, VcVerificationResult), crate::Error> {
        let vc = Self::parse(value)?;
        let result = vc.verify_vc(provider, requires_holder_binding, audience, nonce);
        Ok((vc, result))
    }

    /// Check whether the given string is an SD-JWT VC presentation.
    pub fn is_sd_jwt_vc_presentation(value: &str) -> bool {
        Self::parse(value).map_or(false, |vc| vc.is_presentation())
    }
}

impl std::ops::Deref for SdJwtVc {
    type Target = SdJwt;

    fn deref(&self) -> &Self::Target {
        &self.sd_jwt
    }
}

impl From<SdJwt> for SdJwtVc {
    fn from(sd_jwt: SdJwt) -> Self {
        Self::new(sd_jwt)
    }
}

impl std::fmt::Display for SdJwtVc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.sd_jwt.fmt(f)
    }
}

/// The default claim set merged into the undisclosed payload of every SD-JWT
/// VC.
fn default_payload_properties(claims: &VcClaims) -> JsonObject {
    let mut properties = crate::json_object!({
        "_sd_alg": crate::HashingAlgorithm::Sha256.as_str(),
        "iss": claims.issuer,
        "cnf": claims.holder_binding.cnf(),
        "vct": claims.vct,
    });

    if let Some(not_before) = claims.not_before {
        properties.insert("nbf".to_owned(), not_before.into());
    }
    if let Some(expiration) = claims.expiration {
        properties.insert("exp".to_owned(), expiration.into());
    }
    if let Some(status) = &claims.status {
        let status = serde_json::to_value(status)
            .expect("Implementation error: cannot serialize as JSON");
        properties.insert("status".to_owned(), status);
    }
    if let Some(subject) = &claims.subject {
        properties.insert("sub".to_owned(), subject.clone().into());
    }

    properties
}

#[cfg(test)]
mod tests {
    use bh_status_list::UriBuf;
    use serde_json::json;

    use super::*;
    use crate::{
        json_object,
        test_utils::SymbolicCryptoProvider,
        SdField, SdMap,
    };

    const VCT: &str = "https://credentials.example.com/identity_credential";

    fn holder_jwk() -> JsonObject {
        json_object!({
            "kty": "EC",
            "crv": "P-256",
            "kid": "holder-key",
            "x": "TCAER19Zvu3OHF4j4W4vfSVoHIP1ILilDls7vCeGemc",
            "y": "ZxjiWWbZMQGHVWKVQ4hbSIirsVfuecCE6t4jT9F2HZQ"
        })
    }

    fn issue_vc(claims: VcClaims) -> SdJwtVc {
        let provider = SymbolicCryptoProvider::default();
        let full_payload = json_object!({
            "given_name": "John",
            "birthdate": "1940-01-01"
        });
        let sd_map = SdMap::new([("given_name".to_owned(), SdField::new(true))]);
        let sd_payload =
            SdPayload::issue(&full_payload, &sd_map, &mut rand::thread_rng()).unwrap();

        SdJwtVc::sign(sd_payload, &provider, claims, Some("issuer-key"), &JsonObject::new())
            .unwrap()
    }

    fn default_claims() -> VcClaims {
        let mut claims = VcClaims::new(
            "https://issuer.example.com".to_owned(),
            HolderBinding::Jwk(holder_jwk()),
            VCT.to_owned(),
        );
        claims.not_before = Some(utils::unix_timestamp() - 10);
        claims.expiration = Some(utils::unix_timestamp() + 3600);
        claims
    }

    #[test]
    fn sign_merges_default_vc_claims() {
        let mut claims = default_claims();
        claims.status = Some(StatusClaim::new(
            UriBuf::new(b"https://example.com/statuslists/1".to_vec()).unwrap(),
            94,
        ));
        claims.subject = Some("user_42".to_owned());

        let vc = issue_vc(claims);

        assert_eq!(vc.typ(), Some(SD_JWT_VC_TYPE_HEADER));
        assert_eq!(vc.issuer(), Some("https://issuer.example.com"));
        assert_eq!(vc.vct(), Some(VCT));
        assert_eq!(vc.sd_alg(), Some("sha-256"));
        assert_eq!(vc.holder_key_jwk(), Some(&holder_jwk()));
        assert_eq!(vc.holder_did(), None);
        assert!(vc.not_before().is_some());
        assert!(vc.expiration().is_some());
        assert_eq!(vc.undisclosed_payload()["sub"], json!("user_42"));
        assert_eq!(
            vc.status().unwrap()["status_list"]["idx"],
            json!(94)
        );

        // The selectively disclosable claim is hidden, not among the
        // defaults.
        assert!(!vc.undisclosed_payload().contains_key("given_name"));
        assert_eq!(vc.full_payload()["given_name"], json!("John"));
    }

    #[test]
    fn verify_vc_accepts_a_bound_presentation() {
        let provider = SymbolicCryptoProvider::default();
        let vc = issue_vc(default_claims());

        let presented = vc
            .present_all_with_key_binding(
                true,
                "https://verifier.example.org",
                "n-1",
                &provider,
                Some("holder-key"),
            )
            .unwrap();
        let presented = SdJwtVc::parse(&presented.to_string()).unwrap();

        let result = presented.verify_vc(
            &provider,
            true,
            Some("https://verifier.example.org"),
            Some("n-1"),
        );

        assert!(result.sd_jwt_result.verified(), "{:?}", result);
        assert!(result.vc_verified, "{:?}", result);
        assert!(result.verified());
        assert_eq!(result.message, None);
    }

    #[test]
    fn verify_vc_rejects_a_replayed_challenge() {
        let provider = SymbolicCryptoProvider::default();
        let vc = issue_vc(default_claims());

        let presented = vc
            .present_all_with_key_binding(
                true,
                "https://verifier.example.org",
                "n-1",
                &provider,
                Some("holder-key"),
            )
            .unwrap();
        let presented = SdJwtVc::parse(&presented.to_string()).unwrap();

        let result = presented.verify_vc(
            &provider,
            true,
            Some("https://verifier.example.org"),
            Some("a-different-nonce"),
        );

        assert!(!result.vc_verified);
        assert!(result
            .message
            .as_deref()
            .unwrap()
            .contains("holder key binding"));
    }

    #[test]
    fn verify_vc_requires_a_presentation_for_jwk_binding() {
        let provider = SymbolicCryptoProvider::default();
        let vc = issue_vc(default_claims());

        // The issued (non-presented) credential has no key binding proof.
        let result = vc.verify_vc(&provider, true, Some("aud"), Some("n"));

        assert!(result.sd_jwt_result.verified());
        assert!(!result.vc_verified);
    }

    #[test]
    fn verify_vc_rejects_an_expired_credential() {
        let mut claims = default_claims();
        claims.expiration = Some(utils::unix_timestamp() - 100);
        let provider = SymbolicCryptoProvider::default();
        let vc = issue_vc(claims);

        let result = vc.verify_vc(&provider, false, None, None);

        assert!(!result.vc_verified);
        assert!(result.message.as_deref().unwrap().contains("not valid after"));
    }

    #[test]
    fn verify_vc_rejects_a_not_yet_valid_credential() {
        let mut claims = default_claims();
        claims.not_before = Some(utils::unix_timestamp() + 3600);
        let provider = SymbolicCryptoProvider::default();
        let vc = issue_vc(claims);

        let result = vc.verify_vc(&provider, false, None, None);

        assert!(!result.vc_verified);
        assert!(result.message.as_deref().unwrap().contains("not valid before"));
    }

    #[test]
    fn verify_vc_accumulates_every_failure_reason() {
        let provider = SymbolicCryptoProvider::default();

        // Not a VC at all: no vct, no cnf, already expired.
        let payload = SdPayload::issue(
            &json_object!({ "exp": 1, "iss": "https://issuer.example.com" }),
            &SdMap::default(),
            &mut rand::thread_rng(),
        )
        .unwrap();
        let sd_jwt =
            SdJwt::sign(payload, &provider, None, "JWT", &JsonObject::new()).unwrap();
        let vc = SdJwtVc::new(sd_jwt);

        let result = vc.verify_vc(&provider, true, None, None);

        assert!(!result.vc_verified);
        let message = result.message.unwrap();
        assert!(message.contains("not valid after"));
        assert!(message.contains("vct"));
        assert!(message.contains("holder key binding"));
    }

    #[test]
    fn verify_vc_without_binding_only_passes_when_not_required() {
        let provider = SymbolicCryptoProvider::default();

        let payload = SdPayload::issue(
            &json_object!({ "name": "John" }),
            &SdMap::default(),
            &mut rand::thread_rng(),
        )
        .unwrap();
        let mut undisclosed = payload.undisclosed_payload().clone();
        undisclosed.insert("vct".to_owned(), json!(VCT));
        let payload = SdPayload::from_parts(undisclosed, Default::default());
        let sd_jwt =
            SdJwt::sign(payload, &provider, None, "JWT", &JsonObject::new()).unwrap();
        let vc = SdJwtVc::new(sd_jwt);

        assert!(vc.verify_vc(&provider, false, None, None).verified());
        assert!(!vc.verify_vc(&provider, true, None, None).verified());
    }

    #[test]
    fn did_bound_credentials_never_verify_holder_binding() {
        let mut claims = default_claims();
        claims.holder_binding = HolderBinding::Did("did:key:z6Mkn3gV8V63bRpB".to_owned());
        let provider = SymbolicCryptoProvider::default();
        let vc = issue_vc(claims);

        assert_eq!(vc.holder_did(), Some("did:key:z6Mkn3gV8V63bRpB"));
        assert_eq!(vc.holder_key_jwk(), None);

        // DID resolution is unsupported, so the binding check fails even
        // when a binding is not required.
        let result = vc.verify_vc(&provider, false, None, None);
        assert!(!result.vc_verified);
        assert!(result
            .message
            .as_deref()
            .unwrap()
            .contains("holder key binding"));
    }

    #[test]
    fn presentation_flag_round_trips() {
        let vc = issue_vc(default_claims());

        assert!(!SdJwtVc::is_sd_jwt_vc_presentation(&vc.to_string()));

        let presented = vc.present_all(false, None);
        assert!(SdJwtVc::is_sd_jwt_vc_presentation(&presented.to_string()));
    }
}
