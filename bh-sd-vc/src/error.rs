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

use crate::DecodingError;

/// Top-level error type for the SD-JWT crate.
///
/// Note that *verification outcomes* (an invalid signature, inconsistent
/// disclosures, an expired credential) are not errors; they are reported
/// through [`VerificationResult`](crate::VerificationResult) and
/// [`VcVerificationResult`](crate::VcVerificationResult).
#[derive(strum_macros::Display, Debug, PartialEq)]
pub enum Error {
    /// Format error, e.g. invalid SD-JWT format or non-parsable JWT.
    #[strum(to_string = "Format error: {0}")]
    Format(FormatError),

    /// Signature error, e.g. the external signing backend failed.
    #[strum(to_string = "Signature error: {0}")]
    Signature(SignatureError),

    /// Decoding error, e.g. issues with the digests or disclosures of an
    /// SD-JWT payload.
    #[strum(to_string = "Decoding error: {0}")]
    Decoding(DecodingError),
}

impl bherror::BhError for Error {}

/// Format error related to parsing SD-JWTs and their parts.
#[derive(strum_macros::Display, Debug, PartialEq, Clone)]
pub enum FormatError {
    /// Error indicating that the SD-JWT compact serialization is invalid.
    #[strum(to_string = "Invalid SD-JWT format")]
    InvalidSdJwtFormat,

    /// Error indicating that a JWT is not parsable.
    #[strum(to_string = "Provided JWT is not parsable")]
    NonParseableJwt,

    /// Error indicating that the disclosure data is in an invalid format.
    #[strum(to_string = "Invalid disclosure: {0}")]
    InvalidDisclosure(String),
}

impl bherror::BhError for FormatError {}

/// Error type for failures of the external signing backend.
#[derive(strum_macros::Display, Debug, PartialEq, Clone)]
pub enum SignatureError {
    /// Error indicating that the crypto provider failed to produce a JWT.
    #[strum(to_string = "Jwt signing failed")]
    SigningFailed,
}

impl bherror::BhError for SignatureError {}

/// Result type used across the crate.
pub type Result<T, E> = bherror::Result<T, E>;
