//! Identifier mapping: business method descriptors to collision-free wire names
//!
//! The mapping is a pipeline of pure passes over the full candidate list:
//!
//! ```text
//! dedupe → fold properties → case-fold mangling → escape → overloads → owner name → accessor prefixes
//! ```
//!
//! Candidates are processed in signature order, so the result depends only
//! on the set of descriptors and never on the order they were supplied in.

pub mod idl;
mod passes;

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::model::{MethodDescriptor, TypeHierarchy};
use passes::Candidate;

pub use idl::{idl_type_name, java_string_hash, repository_id, rmi_repository_id};

pub type NamingResult<T> = Result<T, NamingError>;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum NamingError {
    #[error("naming conflict between '{first}' and '{second}': {reason}")]
    Conflict {
        first: String,
        second: String,
        reason: String,
    },
}

/// A protocol-legal operation name on the remote surface of one unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct WireName {
    pub name: String,
    /// Legacy spelling also accepted by the skeleton (compatibility mode).
    pub alias: Option<String>,
    /// Property the method was folded into, if it is an accessor.
    pub property: Option<String>,
}

impl WireName {
    pub fn as_str(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for WireName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl AsRef<str> for WireName {
    fn as_ref(&self) -> &str {
        &self.name
    }
}

impl PartialEq<&str> for WireName {
    fn eq(&self, other: &&str) -> bool {
        self.name == *other
    }
}

#[derive(Debug, Clone, Copy)]
pub struct NameMapper<'h> {
    hierarchy: &'h TypeHierarchy,
    compat: bool,
}

impl<'h> NameMapper<'h> {
    pub fn new(hierarchy: &'h TypeHierarchy) -> Self {
        Self { hierarchy, compat: false }
    }

    pub fn with_compat(mut self, compat: bool) -> Self {
        self.compat = compat;
        self
    }

    /// One WireName per descriptor, in input order. Descriptors with the
    /// same signature (an operation inherited through several interfaces)
    /// share a name.
    pub fn map(&self, descriptors: &[MethodDescriptor], owner: Option<&str>) -> NamingResult<Vec<WireName>> {
        let mut unique: BTreeMap<String, Candidate> = BTreeMap::new();
        for d in descriptors {
            unique.entry(d.signature_key()).or_insert_with(|| Candidate::new(d));
        }
        let cands: Vec<Candidate> = unique.into_values().collect();

        let cands = passes::fold_properties(cands, self.hierarchy)?;
        log::trace!("naming: folded {:?}", names(&cands));
        let cands = passes::fold_case(cands);
        let cands = passes::escape(cands);
        let cands = passes::disambiguate_overloads(cands);
        log::trace!("naming: overloads {:?}", names(&cands));
        let cands = passes::avoid_owner(cands, owner, self.compat)?;
        let cands = passes::prefix_accessors(cands);
        passes::check_unique(&cands)?;

        let by_key: BTreeMap<&str, &Candidate> = cands.iter().map(|c| (c.key.as_str(), c)).collect();
        descriptors
            .iter()
            .map(|d| {
                let key = d.signature_key();
                by_key
                    .get(key.as_str())
                    .map(|c| WireName {
                        name: c.name.clone(),
                        alias: c.alias.clone(),
                        property: c.property.clone(),
                    })
                    .ok_or_else(|| NamingError::Conflict {
                        first: d.to_string(),
                        second: d.to_string(),
                        reason: "descriptor lost during mapping".to_string(),
                    })
            })
            .collect()
    }
}

fn names(cands: &[Candidate]) -> Vec<&str> {
    cands.iter().map(|c| c.name.as_str()).collect()
}

/// Map with the well-known type hierarchy and compatibility mode off.
pub fn map(descriptors: &[MethodDescriptor], owner: Option<&str>) -> NamingResult<Vec<WireName>> {
    NameMapper::new(TypeHierarchy::builtin()).map(descriptors, owner)
}
