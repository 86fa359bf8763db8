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

//! The compact `SD-JWT` token container: parsing, serialization,
//! presentation and verification.

use bherror::{traits::PropagateError as _, Error};

use crate::{
    error::FormatError, AsyncJwtCryptoProvider, Disclosure, JsonObject, JwtCryptoProvider,
    KeyBindingJwt, SdMap, SdPayload,
};

pub(crate) const SD_JWT_DELIMITER: char = '~';

/// An `SD-JWT` token, composed of:
/// - an Issuer-signed JWT,
/// - zero or more Disclosures,
/// - an optional Key Binding JWT (`KB-JWT`) proving holder key possession.
///
/// Instances are parsed from the compact serialization
/// (`<JWT>~<Disclosure 1>~...~[<KB-JWT>]`) or created by
/// [signing](Self::sign) an [`SdPayload`]. An instance is never mutated;
/// [presenting](Self::present) returns a new token with a reduced disclosure
/// set.
#[derive(Debug, Clone)]
pub struct SdJwt {
    jwt: String,
    header: JsonObject,
    sd_payload: SdPayload,
    key_binding_jwt: Option<KeyBindingJwt>,
    is_presentation: bool,
}

/// The outcome of verifying an [`SdJwt`].
///
/// Both the signature check and the disclosure consistency check are reported
/// individually; [`verified`](Self::verified) is their conjunction. Invalid
/// tokens produce a result, not an error.
#[derive(Debug, Clone, PartialEq)]
pub struct VerificationResult {
    /// Whether the Issuer-signed JWT signature is valid.
    pub signature_verified: bool,
    /// Whether the attached disclosures match the digests in the payload.
    pub disclosures_verified: bool,
    /// Optional explanation of a failed signature verification.
    pub message: Option<String>,
}

impl VerificationResult {
    /// Whether the token verified as a whole.
    pub fn verified(&self) -> bool {
        self.signature_verified && self.disclosures_verified
    }
}

impl SdJwt {
    /// Parse an `SD-JWT` from its compact serialization.
    ///
    /// The token is split on `~`; the first part must be a three-segment JWT,
    /// the following parts are Disclosures, and a final three-segment part is
    /// the Key Binding JWT. A lone trailing `~` marks a presentation without
    /// key binding.
    ///
    /// No signature check is performed here.
    pub fn parse(value: &str) -> crate::Result<Self, crate::Error> {
        let parts: Vec<&str> = value.split(SD_JWT_DELIMITER).collect();

        let (header_b64, body_b64, _) = split_jwt_segments(parts[0])
            .match_err(|error| crate::Error::Format(error.clone()))?;
        let header = crate::utils::decode_base64_json_object(header_b64)
            .match_err(|error| crate::Error::Format(error.clone()))?;

        let rest = &parts[1..];
        let (disclosure_parts, kb_part) = match rest.split_last() {
            None => (rest, None),
            Some((last, init)) if last.is_empty() => (init, None),
            Some((last, init)) if last.contains('.') => (init, Some(*last)),
            _ => (rest, None),
        };

        if disclosure_parts
            .iter()
            .any(|part| part.is_empty() || part.contains('.'))
        {
            return Err(Error::root(crate::Error::Format(
                FormatError::InvalidSdJwtFormat,
            )));
        }

        let disclosures: Vec<String> =
            disclosure_parts.iter().map(|&part| part.to_owned()).collect();
        let sd_payload = SdPayload::parse(body_b64, &disclosures)?;

        let key_binding_jwt = kb_part
            .map(KeyBindingJwt::parse)
            .transpose()
            .match_err(|error| crate::Error::Format(error.clone()))?;

        let is_presentation =
            key_binding_jwt.is_some() || value.ends_with(SD_JWT_DELIMITER);

        Ok(Self {
            jwt: parts[0].to_owned(),
            header,
            sd_payload,
            key_binding_jwt,
            is_presentation,
        })
    }

    /// Sign the given payload as an `SD-JWT` using the provided crypto
    /// provider, optionally with the specified key ID.
    ///
    /// Only the undisclosed payload is signed; the disclosures travel next to
    /// the JWT and are bound to it through their digests.
    pub fn sign(
        sd_payload: SdPayload,
        provider: &impl JwtCryptoProvider,
        key_id: Option<&str>,
        typ: &str,
        additional_headers: &JsonObject,
    ) -> crate::Result<Self, crate::Error> {
        let jwt = provider
            .sign(sd_payload.undisclosed_payload(), key_id, typ, additional_headers)
            .match_err(|error| crate::Error::Signature(error.clone()))?;

        Self::from_signed_jwt(jwt, sd_payload)
    }

    /// Asynchronous analog of [`SdJwt::sign`].
    pub async fn sign_async(
        sd_payload: SdPayload,
        provider: &impl AsyncJwtCryptoProvider,
        key_id: Option<&str>,
        typ: &str,
        additional_headers: &JsonObject,
    ) -> crate::Result<Self, crate::Error> {
        let jwt = provider
            .sign(sd_payload.undisclosed_payload(), key_id, typ, additional_headers)
            .await
            .match_err(|error| crate::Error::Signature(error.clone()))?;

        Self::from_signed_jwt(jwt, sd_payload)
    }

    fn from_signed_jwt(jwt: String, sd_payload: SdPayload) -> crate::Result<Self, crate::Error> {
        let header = {
            let (header_b64, _, _) = split_jwt_segments(&jwt)
                .match_err(|error| crate::Error::Format(error.clone()))?;
            crate::utils::decode_base64_json_object(header_b64)
                .match_err(|error| crate::Error::Format(error.clone()))?
        };

        Ok(Self {
            jwt,
            header,
            sd_payload,
            key_binding_jwt: None,
            is_presentation: false,
        })
    }

    /// The Issuer-signed JWT in the compact serialization.
    pub fn jwt(&self) -> &str {
        &self.jwt
    }

    /// The decoded JWT header.
    pub fn header(&self) -> &JsonObject {
        &self.header
    }

    /// The payload with its attached disclosures.
    pub fn sd_payload(&self) -> &SdPayload {
        &self.sd_payload
    }

    /// The attached Key Binding JWT, if any.
    pub fn key_binding_jwt(&self) -> Option<&KeyBindingJwt> {
        self.key_binding_jwt.as_ref()
    }

    /// Whether this token is a presentation (as opposed to an issued
    /// credential).
    pub fn is_presentation(&self) -> bool {
        self.is_presentation
    }

    /// Iterate over the disclosures attached to this token.
    pub fn disclosures(&self) -> impl Iterator<Item = &Disclosure> {
        self.sd_payload.disclosures()
    }

    /// The undisclosed payload, as contained in the JWT body.
    pub fn undisclosed_payload(&self) -> &JsonObject {
        self.sd_payload.undisclosed_payload()
    }

    /// The full payload, with all attached disclosures resolved recursively.
    pub fn full_payload(&self) -> JsonObject {
        self.sd_payload.full_payload()
    }

    /// The disclosure policy regenerated from the payload.
    pub fn sd_map(&self) -> SdMap {
        self.sd_payload.sd_map()
    }

    /// Signature algorithm from the JWT header.
    pub fn algorithm(&self) -> Option<&str> {
        self.header.get("alg").and_then(|value| value.as_str())
    }

    /// Signature key ID from the JWT header, if present.
    pub fn key_id(&self) -> Option<&str> {
        self.header.get("kid").and_then(|value| value.as_str())
    }

    /// The `typ` value from the JWT header, if present.
    pub fn typ(&self) -> Option<&str> {
        self.header.get("typ").and_then(|value| value.as_str())
    }

    /// Present this `SD-JWT` with the selection of disclosures.
    ///
    /// The `sd_map` indicates for each field recursively whether it should be
    /// disclosed; `None` presents with every disclosure withheld. The
    /// optionally supplied Key Binding JWT replaces an already attached one.
    pub fn present(&self, sd_map: Option<&SdMap>, key_binding_jwt: Option<KeyBindingJwt>) -> SdJwt {
        SdJwt {
            jwt: self.jwt.clone(),
            header: self.header.clone(),
            sd_payload: match sd_map {
                Some(sd_map) => self.sd_payload.with_selective_disclosures(sd_map),
                None => self.sd_payload.without_disclosures(),
            },
            key_binding_jwt: key_binding_jwt.or_else(|| self.key_binding_jwt.clone()),
            is_presentation: true,
        }
    }

    /// Shortcut to presenting the `SD-JWT` with all disclosures selected or
    /// withheld.
    pub fn present_all(
        &self,
        disclose_all: bool,
        key_binding_jwt: Option<KeyBindingJwt>,
    ) -> SdJwt {
        SdJwt {
            jwt: self.jwt.clone(),
            header: self.header.clone(),
            sd_payload: if disclose_all {
                self.sd_payload.clone()
            } else {
                self.sd_payload.without_disclosures()
            },
            key_binding_jwt: key_binding_jwt.or_else(|| self.key_binding_jwt.clone()),
            is_presentation: true,
        }
    }

    /// Present this `SD-JWT` with the selection of disclosures and a freshly
    /// signed Key Binding JWT for the given `audience` and `nonce`.
    ///
    /// The Key Binding JWT commits to the exact serialization of the
    /// presentation it is attached to.
    pub fn present_with_key_binding(
        &self,
        sd_map: Option<&SdMap>,
        audience: &str,
        nonce: &str,
        provider: &impl JwtCryptoProvider,
        key_id: Option<&str>,
    ) -> crate::Result<SdJwt, crate::Error> {
        let presented = self.present(sd_map, None);
        let key_binding_jwt = KeyBindingJwt::sign(
            &presented.serialize(true, false),
            audience,
            nonce,
            provider,
            key_id,
        )?;

        Ok(self.present(sd_map, Some(key_binding_jwt)))
    }

    /// Analog of [`SdJwt::present_with_key_binding`] with all disclosures
    /// selected or withheld.
    pub fn present_all_with_key_binding(
        &self,
        disclose_all: bool,
        audience: &str,
        nonce: &str,
        provider: &impl JwtCryptoProvider,
        key_id: Option<&str>,
    ) -> crate::Result<SdJwt, crate::Error> {
        let presented = self.present_all(disclose_all, None);
        let key_binding_jwt = KeyBindingJwt::sign(
            &presented.serialize(true, false),
            audience,
            nonce,
            provider,
            key_id,
        )?;

        Ok(self.present_all(disclose_all, Some(key_binding_jwt)))
    }

    /// Serialize this token into the compact format.
    ///
    /// When `with_key_binding` is set and a Key Binding JWT is attached, it
    /// forms the last part; otherwise, a presentation ends with a lone
    /// trailing `~` to signal the absence of key binding.
    pub fn serialize(&self, for_presentation: bool, with_key_binding: bool) -> String {
        let mut parts: Vec<&str> = Vec::with_capacity(self.sd_payload.digested_disclosures().len() + 2);

        parts.push(&self.jwt);
        parts.extend(self.sd_payload.disclosures().map(Disclosure::as_str));

        match &self.key_binding_jwt {
            Some(key_binding_jwt) if with_key_binding => parts.push(key_binding_jwt.as_str()),
            _ if for_presentation => parts.push(""),
            _ => {}
        }

        parts.join("~")
    }

    /// Verify this `SD-JWT` by checking the JWT signature through the given
    /// crypto provider and matching the attached disclosures against the
    /// digests in the payload.
    ///
    /// When no `key_id` is supplied, the `kid` value of the JWT header is
    /// passed to the provider.
    pub fn verify(
        &self,
        provider: &impl JwtCryptoProvider,
        key_id: Option<&str>,
    ) -> VerificationResult {
        let outcome = provider.verify(&self.jwt, key_id.or_else(|| self.key_id()));
        if !outcome.verified {
            tracing::debug!("SD-JWT signature verification failed");
        }

        VerificationResult {
            signature_verified: outcome.verified,
            disclosures_verified: self.sd_payload.verify_disclosures(),
            message: outcome.message,
        }
    }

    /// Asynchronous analog of [`SdJwt::verify`].
    pub async fn verify_async(
        &self,
        provider: &impl AsyncJwtCryptoProvider,
        key_id: Option<&str>,
    ) -> VerificationResult {
        let outcome = provider
            .verify(&self.jwt, key_id.or_else(|| self.key_id()))
            .await;

        VerificationResult {
            signature_verified: outcome.verified,
            disclosures_verified: self.sd_payload.verify_disclosures(),
            message: outcome.message,
        }
    }

    /// Parse an `SD-JWT` from its compact serialization and verify it.
    pub fn parse_and_verify(
        value: &str,
        provider: &impl JwtCryptoProvider,
        key_id: Option<&str>,
    ) -> crate::Result<(Self, VerificationResult), crate::Error> {
        let sd_jwt = Self::parse(value)?;
        let result = sd_jwt.verify(provider, key_id);
        Ok((sd_jwt, result))
    }

    /// Check whether the given string matches the compact `SD-JWT` format.
    ///
    /// With `sd_only` set, plain JWTs without any `~` part are not accepted.
    pub fn is_sd_jwt(value: &str, sd_only: bool) -> bool {
        Self::parse(value).is_ok() && (!sd_only || value.contains(SD_JWT_DELIMITER))
    }
}

impl std::fmt::Display for SdJwt {
    /// Serialize the token in the compact format, keeping an attached Key
    /// Binding JWT.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.serialize(self.is_presentation, true))
    }
}

/// Splits a compact JWT into its three `base64url` segments.
pub(crate) fn split_jwt_segments(jwt: &str) -> crate::Result<(&str, &str, &str), FormatError> {
    let mut segments = jwt.split('.');

    let (Some(header), Some(body), Some(signature), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return Err(Error::root(FormatError::InvalidSdJwtFormat));
    };

    if header.is_empty() || body.is_empty() || signature.is_empty() {
        return Err(Error::root(FormatError::InvalidSdJwtFormat));
    }

    Ok((header, body, signature))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{
        json_object,
        test_utils::{issue_test_token, SymbolicAsyncProvider, SymbolicCryptoProvider},
        SdField,
    };

    /// A real-world issued SD-JWT credential, used as an interoperability
    /// fixture.
    const INTEROP_SD_JWT: &str = "eyJraWQiOiJkaWQ6a2V5Ono2TWtuM2dWOFY2M2JScEJNdEFwbm5BaWhDTXZEYVBlcno2aWFyMURwZE5LZTNrMSN6Nk1rbjNnVjhWNjNiUnBCTXRBcG5uQWloQ012RGFQZXJ6NmlhcjFEcGROS2UzazEiLCJ0eXAiOiJKV1QiLCJhbGciOiJFZERTQSJ9.eyJzdWIiOiJkaWQ6a2V5Ono2TWtuM2dWOFY2M2JScEJNdEFwbm5BaWhDTXZEYVBlcno2aWFyMURwZE5LZTNrMSIsIm5iZiI6MTY4NDkxOTg2NCwiaXNzIjoiZGlkOmtleTp6Nk1rbjNnVjhWNjNiUnBCTXRBcG5uQWloQ012RGFQZXJ6NmlhcjFEcGROS2UzazEiLCJpYXQiOjE2ODQ5MTk4NjQsInZjIjp7InR5cGUiOlsiVmVyaWZpYWJsZUNyZWRlbnRpYWwiLCJWZXJpZmlhYmxlQXR0ZXN0YXRpb24iLCJWZXJpZmlhYmxlSWQiXSwiQGNvbnRleHQiOlsiaHR0cHM6Ly93d3cudzMub3JnLzIwMTgvY3JlZGVudGlhbHMvdjEiXSwiaWQiOiJ1cm46dXVpZDplMDNjMDY2OC0yMDhmLTRkNzctYTBjNi02ZDBkZjAxYWRmYWQiLCJpc3N1ZXIiOiJkaWQ6a2V5Ono2TWtuM2dWOFY2M2JScEJNdEFwbm5BaWhDTXZEYVBlcno2aWFyMURwZE5LZTNrMSIsImlzc3VhbmNlRGF0ZSI6IjIwMjMtMDUtMjRUMDk6MTc6NDRaIiwiaXNzdWVkIjoiMjAyMy0wNS0yNFQwOToxNzo0NFoiLCJ2YWxpZEZyb20iOiIyMDIzLTA1LTI0VDA5OjE3OjQ0WiIsImNyZWRlbnRpYWxTY2hlbWEiOnsiaWQiOiJodHRwczovL3Jhdy5naXRodWJ1c2VyY29udGVudC5jb20vd2FsdC1pZC93YWx0aWQtc3Npa2l0LXZjbGliL21hc3Rlci9zcmMvdGVzdC9yZXNvdXJjZXMvc2NoZW1hcy9WZXJpZmlhYmxlSWQuanNvbiIsInR5cGUiOiJGdWxsSnNvblNjaGVtYVZhbGlkYXRvcjIwMjEifSwiZXZpZGVuY2UiOlt7ImRvY3VtZW50UHJlc2VuY2UiOlsiUGh5c2ljYWwiXSwiZXZpZGVuY2VEb2N1bWVudCI6WyJQYXNzcG9ydCJdLCJzdWJqZWN0UHJlc2VuY2UiOiJQaHlzaWNhbCIsInR5cGUiOlsiRG9jdW1lbnRWZXJpZmljYXRpb24iXSwidmVyaWZpZXIiOiJkaWQ6ZWJzaToyQTlCWjlTVWU2QmF0YWNTcHZzMVY1Q2RqSHZMcFE3YkVzaTJKYjZMZEhLblF4YU4ifV0sIl9zZCI6WyJzRkoxY1BOR2d5NktrRzAxOW9tdFBvVm5GYXR6clRXQkV0Si1yQmpzQU1VIl19LCJqdGkiOiJ1cm46dXVpZDplMDNjMDY2OC0yMDhmLTRkNzctYTBjNi02ZDBkZjAxYWRmYWQifQ.XqhNYYB9CITa0KCMOj1v1tbQvj3sfuDmGaKL3sDDJndQPGEa_QosbunSnBef5O4optTslUOSaplR7BiTiY2cCQ~WyJfZ2RWc3dIS2U2b3ZVMElYT3NXQ1Z3IiwiZGF0ZU9mQmlydGgiLCIxOTgzLTA3LTA1Il0~WyJsYVpHcU5rczE1YU5USEFvYnFfWEx3IiwiZmlyc3ROYW1lIiwiU2V2ZXJpbiJd~WyJDc1FfVkFaeUVzVmxSWWQ1YjJPNWhRIiwiY3JlZGVudGlhbFN1YmplY3QiLHsiaWQiOiJkaWQ6a2V5Ono2TWtuM2dWOFY2M2JScEJNdEFwbm5BaWhDTXZEYVBlcno2aWFyMURwZE5LZTNrMSIsImN1cnJlbnRBZGRyZXNzIjpbIlZpZW5uYSJdLCJmYW1pbHlOYW1lIjoiU3RhbXBsZXIiLCJnZW5kZXIiOiJtYWxlIiwibmFtZUFuZEZhbWlseU5hbWVBdEJpcnRoIjoiSmFuZSBET0UiLCJwZXJzb25hbElkZW50aWZpZXIiOiIwOTA0MDA4MDg0SCIsInBsYWNlT2ZCaXJ0aCI6IkdyYXoiLCJfc2QiOlsiUXh4ZXlNbHk3dU9feWNRaThuU2Zmb2VUb2JQSDRVZ0JfVGh3LUMyMTJDNCIsImNJeXVGWVNBUjAtZ2JpMGxQbmZTWVQySExEdlpsTlBOSGoxUGY0am9uek0iXX1d";

    #[test]
    fn parse_interop_token() {
        let sd_jwt = SdJwt::parse(INTEROP_SD_JWT).unwrap();

        assert!(!sd_jwt.is_presentation());
        assert_eq!(sd_jwt.algorithm(), Some("EdDSA"));
        assert_eq!(sd_jwt.typ(), Some("JWT"));
        assert_eq!(sd_jwt.disclosures().count(), 3);

        let undisclosed = sd_jwt.undisclosed_payload();
        assert!(undisclosed.contains_key("sub"));
        let vc = undisclosed["vc"].as_object().unwrap();
        assert!(vc.contains_key("_sd"));
        assert!(!vc.contains_key("credentialSubject"));

        let full = sd_jwt.full_payload();
        let vc = full["vc"].as_object().unwrap();
        let subject = vc["credentialSubject"].as_object().unwrap();
        assert_eq!(subject["familyName"], json!("Stampler"));
        // `dateOfBirth` and `firstName` hide one level deeper.
        assert_eq!(subject["firstName"], json!("Severin"));
        assert_eq!(subject["dateOfBirth"], json!("1983-07-05"));
    }

    #[test]
    fn parse_rejects_malformed_input() {
        for input in [
            "",
            "no-dots-here",
            "a.b",
            "a.b.c.d",
            ".b.c",
            "a.b.c~~WyJzIiwiayIsInYiXQ",
        ] {
            assert!(SdJwt::parse(input).is_err(), "accepted {input:?}");
        }
    }

    #[test]
    fn parse_forms_and_round_trips() {
        let (sd_jwt, _) = issue_test_token();
        let issued = sd_jwt.serialize(false, false);
        assert!(!issued.ends_with(SD_JWT_DELIMITER));

        // Issued form: disclosures, no trailing tilde, not a presentation.
        let parsed = SdJwt::parse(&issued).unwrap();
        assert!(!parsed.is_presentation());
        assert_eq!(parsed.disclosures().count(), sd_jwt.disclosures().count());
        assert_eq!(parsed.undisclosed_payload(), sd_jwt.undisclosed_payload());
        assert_eq!(parsed.serialize(false, false), issued);

        // Presentation form: the trailing tilde marks it.
        let presented = sd_jwt.present_all(true, None);
        let presented_str = presented.to_string();
        assert!(presented_str.ends_with(SD_JWT_DELIMITER));
        let parsed = SdJwt::parse(&presented_str).unwrap();
        assert!(parsed.is_presentation());
        assert!(parsed.key_binding_jwt().is_none());

        // A bare JWT parses as an SD-JWT without disclosures.
        let bare = sd_jwt.jwt().to_string();
        let parsed = SdJwt::parse(&bare).unwrap();
        assert!(!parsed.is_presentation());
        assert_eq!(parsed.disclosures().count(), 0);
    }

    #[test]
    fn verify_round_trip() {
        let provider = SymbolicCryptoProvider::default();
        let (sd_jwt, full_payload) = issue_test_token();

        let parsed = SdJwt::parse(&sd_jwt.to_string()).unwrap();
        let result = parsed.verify(&provider, None);

        assert!(result.signature_verified);
        assert!(result.disclosures_verified);
        assert!(result.verified());
        assert_eq!(parsed.full_payload(), full_payload);
    }

    #[test]
    fn verify_detects_tampered_jwt() {
        let provider = SymbolicCryptoProvider::default();
        let (sd_jwt, _) = issue_test_token();

        // Truncating the signature invalidates it.
        let serialized = sd_jwt.to_string();
        let tampered = serialized.replacen('~', "x~", 1);

        let parsed = SdJwt::parse(&tampered).unwrap();
        let result = parsed.verify(&provider, None);

        assert!(!result.signature_verified);
        assert!(result.disclosures_verified);
        assert!(!result.verified());
        assert!(result.message.is_some());
    }

    #[test]
    fn verify_detects_foreign_disclosure() {
        let provider = SymbolicCryptoProvider::default();
        let (sd_jwt, _) = issue_test_token();

        let foreign = Disclosure::new("salt".into(), "intruder".into(), json!(true));
        let tampered = format!("{}~{}", sd_jwt.serialize(false, false), foreign.as_str());

        let parsed = SdJwt::parse(&tampered).unwrap();
        let result = parsed.verify(&provider, None);

        assert!(result.signature_verified);
        assert!(!result.disclosures_verified);
        assert!(!result.verified());
    }

    #[test]
    fn present_withholds_unselected_disclosures() {
        let (sd_jwt, _) = issue_test_token();

        let redacted = sd_jwt.present(None, None);
        assert!(redacted.is_presentation());
        assert_eq!(redacted.disclosures().count(), 0);

        let sd_map = SdMap::new([("given_name".to_owned(), SdField::new(true))]);
        let partial = sd_jwt.present(Some(&sd_map), None);
        assert_eq!(partial.disclosures().count(), 1);
        assert_eq!(partial.disclosures().next().unwrap().key(), "given_name");

        // Presentation keeps the signed JWT byte-for-byte.
        assert_eq!(partial.jwt(), sd_jwt.jwt());
    }

    #[test]
    fn present_with_key_binding_attaches_kb_jwt() {
        let provider = SymbolicCryptoProvider::default();
        let (sd_jwt, _) = issue_test_token();

        let presented = sd_jwt
            .present_with_key_binding(
                None,
                "https://verifier.example.org",
                "n-123",
                &provider,
                None,
            )
            .unwrap();

        let serialized = presented.to_string();
        assert!(!serialized.ends_with(SD_JWT_DELIMITER));

        let parsed = SdJwt::parse(&serialized).unwrap();
        assert!(parsed.is_presentation());
        let kb = parsed.key_binding_jwt().unwrap();
        assert_eq!(kb.aud(), Some("https://verifier.example.org"));
        assert_eq!(kb.nonce(), Some("n-123"));
        assert!(kb.verify_kb(
            &provider,
            "https://verifier.example.org",
            "n-123",
            &parsed,
            None
        ));
    }

    #[tokio::test]
    async fn sign_and_verify_async() {
        let provider = SymbolicAsyncProvider::default();
        let full_payload = json_object!({ "given_name": "John", "age": 42 });
        let sd_map = SdMap::new([("given_name".to_owned(), SdField::new(true))]);
        let sd_payload =
            SdPayload::issue(&full_payload, &sd_map, &mut rand::thread_rng()).unwrap();

        let sd_jwt = SdJwt::sign_async(sd_payload, &provider, None, "JWT", &JsonObject::new())
            .await
            .unwrap();
        let result = sd_jwt.verify_async(&provider, None).await;

        assert!(result.verified());
        assert_eq!(sd_jwt.full_payload(), full_payload);
    }

    #[test]
    fn is_sd_jwt_pattern_check() {
        let (sd_jwt, _) = issue_test_token();
        let serialized = sd_jwt.to_string();

        assert!(SdJwt::is_sd_jwt(&serialized, false));
        assert!(SdJwt::is_sd_jwt(&serialized, true));
        assert!(SdJwt::is_sd_jwt(sd_jwt.jwt(), false));
        assert!(!SdJwt::is_sd_jwt(sd_jwt.jwt(), true));
        assert!(!SdJwt::is_sd_jwt("definitely not", false));
    }
}
