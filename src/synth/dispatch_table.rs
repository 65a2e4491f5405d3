//! DispatchId assignment

use std::collections::{BTreeMap, BTreeSet};

use crate::error::{Error, Result};
use crate::model::{DispatchId, MethodDescriptor};

/// Signature key to DispatchId for one request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchTable {
    ids: BTreeMap<String, DispatchId>,
}

impl DispatchTable {
    /// Ids are positions in the container's method table when one is
    /// supplied. Otherwise the implementation's signature-sorted method set
    /// is numbered first and exposed methods it lacks follow in signature
    /// order, so every view of one implementation agrees on an id.
    /// Methods sharing a signature share an id.
    pub fn build(
        component: &str,
        exposed: &[MethodDescriptor],
        implementation: &[MethodDescriptor],
        all_methods: &[MethodDescriptor],
    ) -> Result<Self> {
        let keys: BTreeSet<String> = exposed.iter().map(MethodDescriptor::signature_key).collect();
        if all_methods.is_empty() {
            let implemented: BTreeSet<String> = implementation.iter().map(MethodDescriptor::signature_key).collect();
            let extra: Vec<String> = keys.iter().filter(|k| !implemented.contains(*k)).cloned().collect();
            let numbered: BTreeMap<String, DispatchId> = implemented.into_iter().chain(extra).zip(0..).collect();
            let ids = numbered.into_iter().filter(|(k, _)| keys.contains(k)).collect();
            return Ok(Self { ids });
        }

        let mut positions: BTreeMap<String, DispatchId> = BTreeMap::new();
        for (index, m) in (0..).zip(all_methods) {
            positions.entry(m.signature_key()).or_insert(index);
        }
        let mut ids = BTreeMap::new();
        for key in keys {
            let id = positions.get(&key).copied().ok_or_else(|| {
                Error::configuration(
                    component,
                    "method-table",
                    format!("exposed method {key} is missing from the container method table"),
                )
            })?;
            ids.insert(key, id);
        }
        Ok(Self { ids })
    }

    pub fn id_of(&self, method: &MethodDescriptor) -> Option<DispatchId> {
        self.ids.get(&method.signature_key()).copied()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// (signature key, id) in signature order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, DispatchId)> {
        self.ids.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dense_ids_follow_signature_order() {
        let exposed = vec![
            MethodDescriptor::new("withdraw").param("long"),
            MethodDescriptor::new("balance"),
            MethodDescriptor::new("deposit").param("long"),
        ];
        let table = DispatchTable::build("Account", &exposed, &[], &[]).unwrap();
        assert_eq!(table.id_of(&exposed[1]), Some(0));
        assert_eq!(table.id_of(&exposed[2]), Some(1));
        assert_eq!(table.id_of(&exposed[0]), Some(2));
    }

    #[test]
    fn container_table_positions_win() {
        let all = vec![
            MethodDescriptor::new("remove"),
            MethodDescriptor::new("deposit").param("long"),
            MethodDescriptor::new("balance"),
        ];
        let exposed = vec![MethodDescriptor::new("balance").owned_by("acme.Account")];
        let table = DispatchTable::build("Account", &exposed, &[], &all).unwrap();
        assert_eq!(table.id_of(&exposed[0]), Some(2));
    }

    #[test]
    fn missing_table_entry_is_a_configuration_error() {
        let all = vec![MethodDescriptor::new("remove")];
        let exposed = vec![MethodDescriptor::new("balance")];
        let err = DispatchTable::build("Account", &exposed, &[], &all).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn views_of_one_implementation_agree_on_ids() {
        let bean = vec![
            MethodDescriptor::new("close"),
            MethodDescriptor::new("audit"),
            MethodDescriptor::new("balance"),
        ];
        let local = vec![MethodDescriptor::new("audit"), MethodDescriptor::new("balance")];
        let remote = vec![MethodDescriptor::new("balance"), MethodDescriptor::new("close")];
        let a = DispatchTable::build("Account", &local, &bean, &[]).unwrap();
        let b = DispatchTable::build("Account", &remote, &bean, &[]).unwrap();
        assert_eq!(a.id_of(&local[1]), Some(1));
        assert_eq!(b.id_of(&remote[0]), Some(1));
        assert_eq!(a.len(), 2);
        assert_eq!(b.id_of(&remote[1]), Some(2));
    }

    #[test]
    fn exposed_methods_outside_the_implementation_follow_it() {
        let bean = vec![MethodDescriptor::new("balance")];
        let home = vec![MethodDescriptor::new("create"), MethodDescriptor::new("balance")];
        let table = DispatchTable::build("Account", &home, &bean, &[]).unwrap();
        assert_eq!(table.id_of(&home[1]), Some(0));
        assert_eq!(table.id_of(&home[0]), Some(1));
    }
}
