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

use std::future::Future;

use crate::{JsonObject, SignatureError};

/// The outcome of verifying a JWT signature at the crypto provider boundary.
///
/// Verification failures are values, not errors; a provider that cannot
/// validate a signature for whatever reason reports `verified: false` with an
/// optional human-readable reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JwtVerificationOutcome {
    /// Whether the JWT signature is valid.
    pub verified: bool,
    /// Optional explanation of a failed verification.
    pub message: Option<String>,
}

impl JwtVerificationOutcome {
    /// A successful verification outcome.
    pub fn success() -> Self {
        Self {
            verified: true,
            message: None,
        }
    }

    /// A failed verification outcome with the given reason.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            verified: false,
            message: Some(message.into()),
        }
    }
}

/// An external backend implementing standard JWT signing and signature
/// verification.
///
/// This crate never touches key material itself; issuance and verification of
/// SD-JWTs delegate all signature operations to an implementation of this
/// trait.
///
/// # Security
///
/// The implementation MUST reject the `none` algorithm and MUST resolve the
/// verification key from trusted sources only (e.g. pinned issuer metadata);
/// otherwise there is no integrity guarantee for would-be-issuer-signed data.
pub trait JwtCryptoProvider {
    /// Sign the given claim set, producing a JWT in the compact serialization.
    ///
    /// The `typ` value is to be set in the JWT header, along with any
    /// `additional_headers`. The `key_id` selects the signing key, if the
    /// implementation manages more than one.
    fn sign(
        &self,
        payload: &JsonObject,
        key_id: Option<&str>,
        typ: &str,
        additional_headers: &JsonObject,
    ) -> crate::Result<String, SignatureError>;

    /// Verify the signature of the given compact-serialized JWT.
    ///
    /// The `key_id` is a hint for selecting the verification key; an
    /// implementation may ignore it.
    fn verify(&self, jwt: &str, key_id: Option<&str>) -> JwtVerificationOutcome;
}

/// Asynchronous analog of [`JwtCryptoProvider`], for backends whose key
/// operations suspend (remote KMS, HSM services and similar).
///
/// The synchronous core algorithms are unaffected; only the signature
/// operations themselves await.
pub trait AsyncJwtCryptoProvider: Sync {
    /// Sign the given claim set, producing a JWT in the compact serialization.
    fn sign(
        &self,
        payload: &JsonObject,
        key_id: Option<&str>,
        typ: &str,
        additional_headers: &JsonObject,
    ) -> impl Future<Output = crate::Result<String, SignatureError>> + Send;

    /// Verify the signature of the given compact-serialized JWT.
    fn verify(
        &self,
        jwt: &str,
        key_id: Option<&str>,
    ) -> impl Future<Output = JwtVerificationOutcome> + Send;
}
