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

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! This crate implements policy-driven Selective Disclosure JSON Web Tokens.
//!
//! It provides the building blocks to issue, present, and verify JWTs whose
//! individual claims can be selectively revealed by the holder, following the
//! IETF drafts [Selective Disclosure for JWTs (SD-JWT)][1] and [SD-JWT-based
//! Verifiable Credentials (SD-JWT VC)][2].
//!
//! [1]: <https://datatracker.ietf.org/doc/html/draft-ietf-oauth-selective-disclosure-jwt>
//! [2]: <https://datatracker.ietf.org/doc/html/draft-ietf-oauth-sd-jwt-vc>
//!
//! # Details
//!
//! The main components of this crate are the following.
//!
//! * [`SdPayload`] -- Redacts a claim set according to an [`SdMap`] disclosure
//!   policy, reconstructs it from disclosures, and checks their consistency.
//! * [`SdJwt`] -- The compact `<JWT>~<disclosure>~...` token container, with
//!   presentation and verification on top of a pluggable
//!   [`JwtCryptoProvider`].
//! * [`SdJwtVc`] -- The Verifiable Credential profile: issuer, validity
//!   window, credential type, and holder key binding.
//! * [`metadata`] -- Passive discovery documents for issuers and credential
//!   types.
//!
//! Signature creation and verification are never performed by this crate; they
//! are delegated to the [`JwtCryptoProvider`] / [`AsyncJwtCryptoProvider`]
//! boundary implemented by the caller.
//!
//! # Examples
//!
//! The repository contains a full issuance/presentation/verification
//! walkthrough under `examples/`, showing how the pieces fit together.

// Re-export the `bh-jws-utils` crate
pub use bh_jws_utils;
pub use error::{Error, FormatError, Result, SignatureError};

mod error;
mod key_binding;
mod models;
mod payload;
mod sd_jwt;
#[cfg(test)]
mod test_utils;
mod traits;
mod utils;
mod vc;

pub mod metadata;

pub use key_binding::KeyBindingJwt;
pub use models::*;
pub use payload::SdPayload;
pub use sd_jwt::{SdJwt, VerificationResult};
pub use traits::*;
pub use utils::base64_url_digest;
pub use vc::{HolderBinding, SdJwtVc, VcClaims, VcVerificationResult, SD_JWT_VC_TYPE_HEADER};
