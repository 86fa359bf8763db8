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

/// Error type defining possible structural defects of an SD-JWT payload and
/// its disclosures.
#[derive(strum_macros::Display, Debug, PartialEq, Clone)]
pub enum DecodingError {
    /// Error indicating that a digest entry is not in the expected format.
    #[strum(to_string = "Malformed digest: {0}")]
    MalformedDigest(String),

    /// Error indicating that two distinct disclosures share a digest.
    #[strum(to_string = "Disclosure digest collision")]
    DisclosureDigestCollision,

    /// Error indicating that a reserved claim name is being used
    /// inappropriately.
    #[strum(to_string = "Reserved claim name {0} usage")]
    ReservedClaimName(&'static str),

    /// Error indicating that the hash algorithm name is invalid or not
    /// supported.
    #[strum(to_string = "Invalid hash algorithm name: {0}")]
    InvalidHashAlgorithmName(String),
}

impl bherror::BhError for DecodingError {}

pub(crate) type DecodingResult<T> = bherror::Result<T, DecodingError>;
