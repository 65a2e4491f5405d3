//! The mapping passes. Each takes the full candidate list and returns a new one.

use std::collections::{BTreeMap, BTreeSet};

use super::idl::{escape_identifier, idl_type_name};
use super::{NamingError, NamingResult};
use crate::model::{MethodDescriptor, TypeHierarchy};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) enum Role {
    Plain,
    Getter,
    Setter,
}

impl Role {
    fn prefix(self) -> &'static str {
        match self {
            Role::Plain => "",
            Role::Getter => "get_",
            Role::Setter => "set_",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Candidate {
    pub key: String,
    pub method: MethodDescriptor,
    pub name: String,
    pub role: Role,
    pub property: Option<String>,
    pub alias: Option<String>,
}

impl Candidate {
    pub fn new(method: &MethodDescriptor) -> Self {
        Self {
            key: method.signature_key(),
            method: method.clone(),
            name: method.name.clone(),
            role: Role::Plain,
            property: None,
            alias: None,
        }
    }

    fn wire(&self, name: &str) -> String {
        format!("{}{}", self.role.prefix(), name)
    }
}

fn conflict(first: &MethodDescriptor, second: &MethodDescriptor, reason: impl Into<String>) -> NamingError {
    NamingError::Conflict {
        first: first.to_string(),
        second: second.to_string(),
        reason: reason.into(),
    }
}

/// `URL` stays `URL`, `Name` becomes `name`.
pub(crate) fn decapitalize(text: &str) -> String {
    let mut chars = text.chars();
    let (Some(first), second) = (chars.next(), chars.next()) else {
        return String::new();
    };
    if first.is_uppercase() && second.map(char::is_uppercase).unwrap_or(false) {
        return text.to_string();
    }
    let mut out: String = first.to_lowercase().collect();
    out.push_str(&text[first.len_utf8()..]);
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReaderKind {
    Get,
    Is,
}

struct Reader {
    index: usize,
    kind: ReaderKind,
    suffix: String,
}

fn reader(method: &MethodDescriptor, hierarchy: &TypeHierarchy) -> Option<(ReaderKind, String)> {
    if !method.params.is_empty() || method.return_type.is_void() {
        return None;
    }
    if !method.exceptions.iter().all(|e| e.array_dims == 0 && hierarchy.is_protocol_native(&e.name)) {
        return None;
    }
    if let Some(suffix) = method.name.strip_prefix("get") {
        if !suffix.is_empty() {
            return Some((ReaderKind::Get, suffix.to_string()));
        }
    }
    if let Some(suffix) = method.name.strip_prefix("is") {
        if !suffix.is_empty() && method.return_type.is_boolean() {
            return Some((ReaderKind::Is, suffix.to_string()));
        }
    }
    None
}

fn writer_suffix(method: &MethodDescriptor) -> Option<String> {
    if method.params.len() != 1 || !method.return_type.is_void() {
        return None;
    }
    method.name.strip_prefix("set").filter(|s| !s.is_empty()).map(str::to_string)
}

/// Pass 1: fold `getX`/`isX`/`setX` into properties.
pub(crate) fn fold_properties(mut cands: Vec<Candidate>, hierarchy: &TypeHierarchy) -> NamingResult<Vec<Candidate>> {
    let mut readers: BTreeMap<String, Vec<Reader>> = BTreeMap::new();
    for (index, c) in cands.iter().enumerate() {
        if let Some((kind, suffix)) = reader(&c.method, hierarchy) {
            readers.entry(decapitalize(&suffix)).or_default().push(Reader { index, kind, suffix });
        }
    }

    // One reader per property: identical spellings prefer `is`, differing ones conflict.
    let mut chosen: BTreeMap<String, Reader> = BTreeMap::new();
    for (property, mut group) in readers {
        if let Some(odd) = group.iter().find(|r| r.suffix != group[0].suffix) {
            return Err(conflict(
                &cands[group[0].index].method,
                &cands[odd.index].method,
                format!("both map to property '{property}' with different casing"),
            ));
        }
        group.sort_by_key(|r| (r.kind != ReaderKind::Is, cands[r.index].key.clone()));
        let winner = group.swap_remove(0);
        chosen.insert(property, winner);
    }

    let mut setters = Vec::new();
    for (index, c) in cands.iter().enumerate() {
        let Some(suffix) = writer_suffix(&c.method) else { continue };
        let property = decapitalize(&suffix);
        let Some(r) = chosen.get(&property) else { continue };
        let read = &cands[r.index].method;
        if r.suffix == suffix && read.return_type == c.method.params[0] {
            setters.push((index, property));
        }
    }

    for (property, r) in &chosen {
        let c = &mut cands[r.index];
        c.name = property.clone();
        c.role = Role::Getter;
        c.property = Some(property.clone());
    }
    for (index, property) in setters {
        let c = &mut cands[index];
        c.name = property.clone();
        c.role = Role::Setter;
        c.property = Some(property);
    }
    Ok(cands)
}

/// `Foo` -> `Foo_0`, `fOO` -> `fOO_1_2`, `foo` -> `foo_`.
pub(crate) fn case_mangle(name: &str) -> String {
    let indices: Vec<String> = name
        .chars()
        .enumerate()
        .filter(|(_, c)| c.is_uppercase())
        .map(|(i, _)| i.to_string())
        .collect();
    format!("{}_{}", name, indices.join("_"))
}

/// Pass 2: names equal ignoring case but spelled differently are mangled.
pub(crate) fn fold_case(mut cands: Vec<Candidate>) -> Vec<Candidate> {
    let mut spellings: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for c in &cands {
        spellings.entry(c.name.to_lowercase()).or_default().insert(c.name.clone());
    }
    for c in &mut cands {
        if spellings.get(&c.name.to_lowercase()).map(BTreeSet::len).unwrap_or(0) > 1 {
            c.name = case_mangle(&c.name);
        }
    }
    cands
}

/// Pass 3: escape characters illegal in IDL identifiers.
pub(crate) fn escape(mut cands: Vec<Candidate>) -> Vec<Candidate> {
    for c in &mut cands {
        c.name = escape_identifier(&c.name);
    }
    cands
}

/// Pass 4: true overloads get their parameter types appended.
pub(crate) fn disambiguate_overloads(mut cands: Vec<Candidate>) -> Vec<Candidate> {
    let mut counts: BTreeMap<(Role, String), usize> = BTreeMap::new();
    for c in &cands {
        *counts.entry((c.role, c.name.clone())).or_default() += 1;
    }
    for c in &mut cands {
        if counts.get(&(c.role, c.name.clone())).copied().unwrap_or(0) > 1 {
            let params: Vec<String> = c.method.params.iter().map(idl_type_name).collect();
            c.name = format!("{}__{}", c.name, params.join("__"));
        }
    }
    cands
}

/// Pass 5: a member named like its owner gets a trailing `_`.
pub(crate) fn avoid_owner(mut cands: Vec<Candidate>, owner: Option<&str>, compat: bool) -> NamingResult<Vec<Candidate>> {
    let Some(owner) = owner else { return Ok(cands) };
    let owner = owner.rsplit('.').next().unwrap_or(owner).to_lowercase();

    for i in 0..cands.len() {
        if cands[i].wire(&cands[i].name).to_lowercase() != owner {
            continue;
        }
        let legacy = cands[i].name.clone();
        let corrected = format!("{legacy}_");
        let corrected_wire = cands[i].wire(&corrected).to_lowercase();
        let clash = cands
            .iter()
            .enumerate()
            .find(|(j, other)| *j != i && other.wire(&other.name).to_lowercase() == corrected_wire)
            .map(|(j, _)| j);
        match clash {
            None => cands[i].name = corrected,
            Some(j) if compat => {
                log::warn!(
                    "owner-name fix for {} collides with {}; keeping legacy name '{}' with alias '{}'",
                    cands[i].method,
                    cands[j].method,
                    legacy,
                    corrected
                );
                cands[i].alias = Some(corrected);
            }
            Some(j) => {
                return Err(conflict(
                    &cands[i].method,
                    &cands[j].method,
                    format!("'{legacy}' matches owner name and its replacement '{corrected}' is taken"),
                ))
            }
        }
    }
    Ok(cands)
}

/// Pass 6: accessor prefixes.
pub(crate) fn prefix_accessors(mut cands: Vec<Candidate>) -> Vec<Candidate> {
    for c in &mut cands {
        c.name = c.wire(&c.name);
        if let Some(alias) = c.alias.take() {
            c.alias = Some(c.wire(&alias));
        }
    }
    cands
}

/// Final names must be unique, ignoring case.
pub(crate) fn check_unique(cands: &[Candidate]) -> NamingResult<()> {
    let mut seen: BTreeMap<String, &Candidate> = BTreeMap::new();
    for c in cands {
        if let Some(prev) = seen.insert(c.name.to_lowercase(), c) {
            return Err(conflict(
                &prev.method,
                &c.method,
                format!("both map to wire name '{}'", c.name),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decapitalize_follows_bean_rules() {
        assert_eq!(decapitalize("Name"), "name");
        assert_eq!(decapitalize("URL"), "URL");
        assert_eq!(decapitalize("X"), "x");
        assert_eq!(decapitalize("already"), "already");
    }

    #[test]
    fn case_mangle_lists_uppercase_positions() {
        assert_eq!(case_mangle("Foo"), "Foo_0");
        assert_eq!(case_mangle("foo"), "foo_");
        assert_eq!(case_mangle("fOO"), "fOO_1_2");
    }
}
