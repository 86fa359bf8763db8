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

use std::collections::{BTreeMap, HashSet};

use rand_core::CryptoRngCore;
use serde::{Deserialize, Serialize};

/// Policy for adding decoy digests to a single nesting level of an SD-JWT
/// payload.
///
/// Decoys make the `_sd` array longer than the number of actually concealed
/// claims, so an observer cannot learn how many disclosable fields exist at
/// that level.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecoyPolicy {
    /// No decoy digests.
    #[default]
    None,
    /// Exactly the given number of decoy digests.
    Fixed(u32),
    /// A uniformly random number of decoy digests between 1 and the given
    /// maximum (inclusive).
    Random(u32),
}

impl DecoyPolicy {
    /// The number of decoys to add at one nesting level.
    pub(crate) fn sample_count<R: CryptoRngCore + ?Sized>(&self, rng: &mut R) -> u32 {
        match *self {
            DecoyPolicy::None => 0,
            DecoyPolicy::Fixed(count) => count,
            DecoyPolicy::Random(0) => 0,
            DecoyPolicy::Random(max) => 1 + rng.next_u32() % max,
        }
    }
}

/// Disclosure decision for a single payload field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SdField {
    /// Whether the field is selectively disclosable (at issuance), or
    /// selected for disclosure (at presentation).
    pub sd: bool,

    /// Nested policy, present only if the field's value is itself an object
    /// whose fields have their own disclosure decisions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<SdMap>,
}

impl SdField {
    /// A field decision without a nested policy.
    pub fn new(sd: bool) -> Self {
        Self { sd, children: None }
    }

    /// A field decision with a nested policy for the field's object value.
    pub fn with_children(sd: bool, children: SdMap) -> Self {
        Self {
            sd,
            children: Some(children),
        }
    }

    pub(crate) fn nonempty_children(&self) -> Option<&SdMap> {
        self.children.as_ref().filter(|children| !children.is_empty())
    }
}

/// Selective disclosure map, describing for each payload field recursively
/// whether it should be selectively disclosable (issuance) or selected for
/// disclosure (presentation), along with the [`DecoyPolicy`] for this nesting
/// level.
///
/// Decoy settings apply per nesting level; each nested [`SdMap`] carries its
/// own.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct SdMap {
    fields: BTreeMap<String, SdField>,
    #[serde(default, skip_serializing_if = "is_no_decoys")]
    decoys: DecoyPolicy,
}

fn is_no_decoys(decoys: &DecoyPolicy) -> bool {
    *decoys == DecoyPolicy::None
}

impl SdMap {
    /// Construct a map without decoys.
    pub fn new(fields: impl IntoIterator<Item = (String, SdField)>) -> Self {
        Self::with_decoys(fields, DecoyPolicy::None)
    }

    /// Construct a map with the given [`DecoyPolicy`] for this nesting level.
    pub fn with_decoys(
        fields: impl IntoIterator<Item = (String, SdField)>,
        decoys: DecoyPolicy,
    ) -> Self {
        Self {
            fields: fields.into_iter().collect(),
            decoys,
        }
    }

    /// The decoy policy of this nesting level.
    pub fn decoys(&self) -> DecoyPolicy {
        self.decoys
    }

    /// The field decision for the given key, if any.
    pub fn get(&self, key: &str) -> Option<&SdField> {
        self.fields.get(key)
    }

    /// Whether the map contains no field decisions.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// The number of field decisions at this level.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Iterate over the field decisions at this level.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &SdField)> {
        self.fields.iter().map(|(key, field)| (key.as_str(), field))
    }

    /// Generate a map from simplified JSON paths of the fields that should be
    /// selectively disclosable, e.g. `"credentialSubject.firstName"`.
    ///
    /// Every path component becomes an entry; only the full paths themselves
    /// are marked disclosable, intermediate components merely carry the nested
    /// policy. The decoy policy is applied to every nesting level the paths
    /// touch.
    pub fn from_json_paths<'a>(
        paths: impl IntoIterator<Item = &'a str>,
        decoys: DecoyPolicy,
    ) -> Self {
        let paths: Vec<&str> = paths.into_iter().collect();
        let sd_paths: HashSet<&str> = paths.iter().copied().collect();
        Self::from_paths_under(&paths, &sd_paths, "", decoys)
    }

    fn from_paths_under(
        paths: &[&str],
        sd_paths: &HashSet<&str>,
        parent: &str,
        decoys: DecoyPolicy,
    ) -> Self {
        let mut groups: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for path in paths {
            let (head, rest) = match path.split_once('.') {
                Some((head, rest)) => (head, Some(rest)),
                None => (*path, None),
            };
            let group = groups.entry(head).or_default();
            if let Some(rest) = rest.filter(|rest| !rest.is_empty()) {
                group.push(rest);
            }
        }

        let fields = groups.into_iter().map(|(key, rests)| {
            let current = if parent.is_empty() {
                key.to_owned()
            } else {
                format!("{parent}.{key}")
            };
            let sd = sd_paths.contains(current.as_str());
            let children = (!rests.is_empty())
                .then(|| Self::from_paths_under(&rests, sd_paths, &current, decoys));
            (key.to_owned(), SdField { sd, children })
        });

        Self::with_decoys(fields, decoys)
    }
}

impl FromIterator<(String, SdField)> for SdMap {
    fn from_iter<I: IntoIterator<Item = (String, SdField)>>(iter: I) -> Self {
        Self::new(iter)
    }
}
