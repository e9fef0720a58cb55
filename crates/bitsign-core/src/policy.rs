//! Family Policy Registry.
//!
//! Every device family has an immutable [`FamilyPolicy`]: which content types
//! it accepts and the permission bit each requires, the signing-chain entry
//! bounds, the size of its signature region and the cancellation IDs it
//! honours. Policies are validated once, when the registry is built; a bad
//! table is a startup error and never surfaces while handling a bitstream.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::{AuthError, Result};
use crate::extension::FamilyKind;
use crate::layout::MAX_SIGNATURE_SIZE;

/// Identifier of the built-in PAC card family.
pub const PAC_CARD: &str = "PAC_CARD";

/// One entry of a family's content type table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentType {
    /// Upper-case type name, e.g. `BMC_FW`.
    pub name: String,
    /// Value stored at header offset 0x08.
    pub code: u8,
    /// Permission bit(s) a signing chain must grant to sign this type.
    pub required_permission: u32,
}

impl ContentType {
    pub fn new(name: impl Into<String>, code: u8, required_permission: u32) -> Self {
        Self {
            name: name.into(),
            code,
            required_permission,
        }
    }
}

/// Unvalidated description of a family, as found in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FamilyPolicySpec {
    pub id: String,

    /// `None` for a typeless family.
    #[serde(default)]
    pub content_types: Option<Vec<ContentType>>,

    pub min_chain_entries: u32,
    pub max_chain_entries: u32,

    /// Bytes reserved for the signing chain, starting at offset 0x90.
    pub signature_max_size: usize,

    /// `None` if the family does not support key cancellation.
    #[serde(default)]
    pub cancellation_ids: Option<Vec<u32>>,

    pub extension: FamilyKind,
}

/// Validated, immutable policy of one family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FamilyPolicy {
    id: String,
    content_types: Option<Vec<ContentType>>,
    min_chain_entries: u32,
    max_chain_entries: u32,
    signature_max_size: usize,
    cancellation_ids: Option<BTreeSet<u32>>,
    extension: FamilyKind,
}

impl FamilyPolicy {
    /// Validate a spec and freeze it into a policy.
    pub fn from_spec(spec: FamilyPolicySpec) -> Result<Self> {
        let FamilyPolicySpec {
            id,
            content_types,
            min_chain_entries,
            max_chain_entries,
            signature_max_size,
            cancellation_ids,
            extension,
        } = spec;

        if max_chain_entries < min_chain_entries {
            return Err(AuthError::InvalidConfiguration(format!(
                "family {id}: impossible code signing key entry count [min: {min_chain_entries}, max: {max_chain_entries}]"
            )));
        }

        if signature_max_size == 0
            || signature_max_size > MAX_SIGNATURE_SIZE
            || signature_max_size % 4 != 0
        {
            return Err(AuthError::InvalidConfiguration(format!(
                "family {id}: maximum signature size must be greater than zero, at most {MAX_SIGNATURE_SIZE} bytes and a multiple of 4, found {signature_max_size}"
            )));
        }

        let content_types = match content_types {
            Some(types) => Some(normalize_types(&id, types)?),
            None => None,
        };

        Ok(Self {
            id,
            content_types,
            min_chain_entries,
            max_chain_entries,
            signature_max_size,
            cancellation_ids: cancellation_ids.map(|ids| ids.into_iter().collect()),
            extension,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Whether headers of this family carry a content type.
    pub fn is_typed(&self) -> bool {
        self.content_types.is_some()
    }

    /// The content type table, `None` if the family is typeless.
    pub fn content_types(&self) -> Option<&[ContentType]> {
        self.content_types.as_deref()
    }

    /// Look up a content type by name, ignoring ASCII case.
    pub fn content_type(&self, name: &str) -> Option<&ContentType> {
        self.content_types
            .as_ref()?
            .iter()
            .find(|t| t.name.eq_ignore_ascii_case(name))
    }

    /// Reverse lookup from the header's type byte.
    pub fn content_type_for_enum(&self, code: u8) -> Option<&ContentType> {
        self.content_types.as_ref()?.iter().find(|t| t.code == code)
    }

    /// Name of the type stored as `code`, or `None` if unmapped.
    pub fn type_name_for_enum(&self, code: u8) -> Option<&str> {
        self.content_type_for_enum(code).map(|t| t.name.as_str())
    }

    /// Permission bits required to sign `name`.
    pub fn required_permission(&self, name: &str) -> Option<u32> {
        self.content_type(name).map(|t| t.required_permission)
    }

    pub fn min_chain_entries(&self) -> u32 {
        self.min_chain_entries
    }

    pub fn max_chain_entries(&self) -> u32 {
        self.max_chain_entries
    }

    /// Whether a signing chain with `entries` code signing keys is acceptable.
    pub fn accepts_chain_len(&self, entries: u32) -> bool {
        (self.min_chain_entries..=self.max_chain_entries).contains(&entries)
    }

    pub fn signature_max_size(&self) -> usize {
        self.signature_max_size
    }

    /// Whether `id` is a valid cancellation ID for this family.
    pub fn supports_cancellation(&self, id: u32) -> bool {
        self.cancellation_ids
            .as_ref()
            .is_some_and(|ids| ids.contains(&id))
    }

    pub fn extension(&self) -> FamilyKind {
        self.extension
    }
}

fn normalize_types(family: &str, types: Vec<ContentType>) -> Result<Vec<ContentType>> {
    let mut names = BTreeSet::new();
    let mut codes = BTreeSet::new();
    let mut out = Vec::with_capacity(types.len());

    for mut ty in types {
        ty.name = ty.name.to_ascii_uppercase();
        if ty.name.is_empty() {
            return Err(AuthError::InvalidConfiguration(format!(
                "family {family}: empty content type name"
            )));
        }
        if !names.insert(ty.name.clone()) {
            return Err(AuthError::InvalidConfiguration(format!(
                "family {family}: duplicate content type {}",
                ty.name
            )));
        }
        if !codes.insert(ty.code) {
            return Err(AuthError::InvalidConfiguration(format!(
                "family {family}: content type enum {} used twice",
                ty.code
            )));
        }
        out.push(ty);
    }

    Ok(out)
}

/// Spec of the built-in PAC card family.
pub fn pac_card_spec() -> FamilyPolicySpec {
    FamilyPolicySpec {
        id: PAC_CARD.to_string(),
        content_types: Some(vec![
            ContentType::new("BBS", 0, 0x1),
            ContentType::new("BMC_FW", 1, 0x2),
            ContentType::new("GBS", 2, 0x4),
        ]),
        min_chain_entries: 1,
        max_chain_entries: 1,
        signature_max_size: MAX_SIGNATURE_SIZE,
        cancellation_ids: Some((0..128).collect()),
        extension: FamilyKind::PacCard,
    }
}

/// Immutable table of family policies, built once and passed by reference.
#[derive(Debug, Clone, Default)]
pub struct FamilyRegistry {
    families: BTreeMap<String, FamilyPolicy>,
}

impl FamilyRegistry {
    /// Registry holding only the built-in families.
    pub fn builtin() -> Result<Self> {
        Self::from_specs([pac_card_spec()])
    }

    /// Build a registry, validating every spec.
    pub fn from_specs<I>(specs: I) -> Result<Self>
    where
        I: IntoIterator<Item = FamilyPolicySpec>,
    {
        Self::default().with_specs(specs)
    }

    /// Extend this registry with more families.
    pub fn with_specs<I>(mut self, specs: I) -> Result<Self>
    where
        I: IntoIterator<Item = FamilyPolicySpec>,
    {
        for spec in specs {
            let policy = FamilyPolicy::from_spec(spec)?;
            if self.families.contains_key(policy.id()) {
                return Err(AuthError::InvalidConfiguration(format!(
                    "family {} registered twice",
                    policy.id()
                )));
            }
            self.families.insert(policy.id().to_string(), policy);
        }
        Ok(self)
    }

    /// Policy of `family`, or `UnknownFamily`.
    pub fn lookup(&self, family: &str) -> Result<&FamilyPolicy> {
        self.families.get(family).ok_or_else(|| {
            AuthError::UnknownFamily(format!(
                "supported families are {:?}, but found {family}",
                self.family_ids().collect::<Vec<_>>()
            ))
        })
    }

    /// Registered family ids, sorted.
    pub fn family_ids(&self) -> impl Iterator<Item = &str> {
        self.families.keys().map(String::as_str)
    }
}
