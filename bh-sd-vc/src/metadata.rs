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

//! Passive discovery documents around SD-JWT VCs: issuer metadata and
//! credential type metadata.
//!
//! These types only model the documents; retrieving them (and validating the
//! `#integrity` digests of referenced resources) is up to the caller.

use bh_jws_utils::JwkSet;
use iref::UriBuf;
use serde::{Deserialize, Serialize};

use crate::JsonObject;

/// Models JWT VC Issuer Metadata, specified [here], containing:
///
/// - `issuer` : The Issuer identifier, which MUST be identical to the `iss`
///   value in the JWT;
///
/// exactly one of:
/// - `jwks` : The Issuer's JSON Web Key Set with its public keys,
/// - `jwks_uri` : HTTPS URL of an endpoint serving the former;
///
/// and:
/// - `params` : any additional configuration parameters.
///
/// [here]: https://datatracker.ietf.org/doc/html/draft-ietf-oauth-sd-jwt-vc-03#name-jwt-vc-issuer-metadata
#[derive(Serialize, Deserialize, Debug, PartialEq)]
#[serde(try_from = "JwtVcIssuerMetadataUnverified")]
pub struct JwtVcIssuerMetadata {
    /// The Issuer Identifier (`iss`).
    pub issuer: String,
    /// Either `jwks` or `jwks_uri`.
    #[serde(flatten)]
    pub jwks_param: JwksParam,
    /// Other optional configuration parameters.
    #[serde(flatten)]
    pub params: JsonObject,
}

/// Represents either the `jwks` or the `jwks_uri` parameter.
#[derive(Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JwksParam {
    /// `jwks` variant.
    Jwks(JwkSet),
    /// `jwks_uri` variant.
    JwksUri(UriBuf),
}

/// This is a "shadow" type whose sole purpose of existence is to be able to
/// verify validity of deserialized [`JwtVcIssuerMetadata`] without writing
/// deserialization manually. This is achieved with misusage of the `TryFrom`
/// trait. For more info see this [github issue].
///
/// [github issue]: https://github.com/serde-rs/serde/issues/642
#[derive(Deserialize, Debug)]
struct JwtVcIssuerMetadataUnverified {
    issuer: String,
    #[serde(flatten)]
    jwks_param: JwksParam,
    #[serde(flatten)]
    params: JsonObject,
}

impl TryFrom<JwtVcIssuerMetadataUnverified> for JwtVcIssuerMetadata {
    type Error = &'static str;

    fn try_from(value: JwtVcIssuerMetadataUnverified) -> Result<Self, Self::Error> {
        // Due to how serde implements Deserialize, the other (2nd in the
        // processing order) variant will (if present) actually end up in
        // `params`.
        if value.params.contains_key("jwks_uri") || value.params.contains_key("jwks") {
            return Err("`jwks` and `jwks_uri` are mutually exclusive");
        }

        Ok(JwtVcIssuerMetadata {
            issuer: value.issuer,
            jwks_param: value.jwks_param,
            params: value.params,
        })
    }
}

/// Models SD-JWT VC Type Metadata, specified [here]: a document describing
/// the credential type named by the `vct` claim.
///
/// A type either embeds its `schema` or points to it via `schema_uri`
/// (never both); URI-referenced resources carry `#integrity` digest
/// companions as defined by [SRI].
///
/// [here]: https://datatracker.ietf.org/doc/html/draft-ietf-oauth-sd-jwt-vc#name-sd-jwt-vc-type-metadata
/// [SRI]: https://www.w3.org/TR/SRI/
#[derive(Serialize, Deserialize, Debug, PartialEq)]
#[serde(try_from = "SdJwtVcTypeMetadataUnverified")]
pub struct SdJwtVcTypeMetadata {
    /// The credential type this document describes.
    pub vct: String,

    /// Human-readable name of the credential type.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Human-readable description of the credential type.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// URI of another type this one extends.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extends: Option<UriBuf>,

    /// Integrity digest of the extended type document.
    #[serde(rename = "extends#integrity", skip_serializing_if = "Option::is_none")]
    pub extends_integrity: Option<String>,

    /// Embedded JSON schema for credentials of this type.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<JsonObject>,

    /// URI of the JSON schema for credentials of this type.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_uri: Option<UriBuf>,

    /// Integrity digest of the referenced schema document.
    #[serde(rename = "schema_uri#integrity", skip_serializing_if = "Option::is_none")]
    pub schema_uri_integrity: Option<String>,

    /// Any further parameters of the document.
    #[serde(flatten)]
    pub params: JsonObject,
}

#[derive(Deserialize, Debug)]
struct SdJwtVcTypeMetadataUnverified {
    vct: String,
    name: Option<String>,
    description: Option<String>,
    extends: Option<UriBuf>,
    #[serde(rename = "extends#integrity")]
    extends_integrity: Option<String>,
    schema: Option<JsonObject>,
    schema_uri: Option<UriBuf>,
    #[serde(rename = "schema_uri#integrity")]
    schema_uri_integrity: Option<String>,
    #[serde(flatten)]
    params: JsonObject,
}

impl TryFrom<SdJwtVcTypeMetadataUnverified> for SdJwtVcTypeMetadata {
    type Error = &'static str;

    fn try_from(value: SdJwtVcTypeMetadataUnverified) -> Result<Self, Self::Error> {
        if value.schema.is_some() && value.schema_uri.is_some() {
            return Err("`schema` and `schema_uri` are mutually exclusive");
        }
        if value.schema_uri_integrity.is_some() && value.schema_uri.is_none() {
            return Err("`schema_uri#integrity` requires `schema_uri`");
        }
        if value.extends_integrity.is_some() && value.extends.is_none() {
            return Err("`extends#integrity` requires `extends`");
        }

        Ok(SdJwtVcTypeMetadata {
            vct: value.vct,
            name: value.name,
            description: value.description,
            extends: value.extends,
            extends_integrity: value.extends_integrity,
            schema: value.schema,
            schema_uri: value.schema_uri,
            schema_uri_integrity: value.schema_uri_integrity,
            params: value.params,
        })
    }
}
