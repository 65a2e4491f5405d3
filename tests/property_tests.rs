use std::collections::{BTreeMap, BTreeSet};

use proptest::prelude::*;
use proptest::sample::{select, Index};

use jitdeploy::classify::{is_subtype_ordered, Classifier};
use jitdeploy::consts::*;
use jitdeploy::model::{ClassInfo, MethodDescriptor, TypeHierarchy, TypeRef};
use jitdeploy::naming::NameMapper;

fn descriptor() -> impl Strategy<Value = MethodDescriptor> {
    let prefix = select(vec!["", "get", "is", "set"]);
    let stem = select(vec!["Foo", "foo", "FOO", "Name", "name", "URL", "account", "Account", "x", "X", "a$b"]);
    let params = select(vec![vec![], vec!["long"], vec!["boolean"], vec![STRING], vec!["int", STRING]]);
    let ret = select(vec!["void", "long", "boolean", STRING]);
    (prefix, stem, params, ret).prop_map(|(prefix, stem, params, ret)| {
        params
            .iter()
            .fold(MethodDescriptor::new(format!("{prefix}{stem}")), |m, p| m.param(*p))
            .returns(ret)
    })
}

/// Distinct signatures, in generation order.
fn descriptor_set() -> impl Strategy<Value = Vec<MethodDescriptor>> {
    prop::collection::vec(descriptor(), 1..10).prop_map(|all| {
        let mut seen = BTreeSet::new();
        all.into_iter().filter(|d| seen.insert(d.signature_key())).collect()
    })
}

/// Distinct lowercase operation names, some overloaded. No property
/// prefixes or owner spellings, so mapping never conflicts.
fn conflict_free_set() -> impl Strategy<Value = Vec<MethodDescriptor>> {
    let overloads = select(vec![vec![vec![]], vec![vec!["long"]], vec![vec![], vec![STRING]], vec![vec!["int"], vec!["long", STRING]]]);
    prop::collection::btree_map("[a-z]{1,8}", overloads, 1..8).prop_map(|stems| {
        stems
            .into_iter()
            .flat_map(|(stem, lists)| {
                lists.into_iter().map(move |params| {
                    params.iter().fold(MethodDescriptor::new(format!("op{stem}")), |m, p| m.param(*p)).returns("long")
                })
            })
            .collect()
    })
}

fn by_key(descriptors: &[MethodDescriptor], names: Vec<jitdeploy::WireName>) -> BTreeMap<String, String> {
    descriptors.iter().map(|d| d.signature_key()).zip(names.into_iter().map(|n| n.name)).collect()
}

proptest! {
    #[test]
    fn wire_names_do_not_depend_on_order(
        (set, shuffled) in descriptor_set().prop_flat_map(|v| (Just(v.clone()), Just(v).prop_shuffle())),
        owner in select(vec![None, Some("Account"), Some("acme.Foo")]),
    ) {
        let h = TypeHierarchy::builtin();
        let mapper = NameMapper::new(h);
        let first = mapper.map(&set, owner);
        let again = mapper.map(&set, owner);
        let reordered = mapper.map(&shuffled, owner);
        prop_assert_eq!(&first, &again);
        match (first, reordered) {
            (Ok(a), Ok(b)) => prop_assert_eq!(by_key(&set, a), by_key(&shuffled, b)),
            (Err(_), Err(_)) => {}
            (a, b) => prop_assert!(false, "order changed the outcome: {:?} vs {:?}", a, b),
        }
    }

    #[test]
    fn wire_names_are_unique(set in descriptor_set(), compat in any::<bool>()) {
        let h = TypeHierarchy::builtin();
        if let Ok(names) = NameMapper::new(h).with_compat(compat).map(&set, Some("Account")) {
            let lowered: BTreeSet<String> = names.iter().map(|n| n.name.to_lowercase()).collect();
            prop_assert_eq!(lowered.len(), names.len(), "{:?}", names);
        }
    }

    #[test]
    fn conflict_free_sets_map_to_unique_names(set in conflict_free_set(), compat in any::<bool>()) {
        let h = TypeHierarchy::builtin();
        let result = NameMapper::new(h).with_compat(compat).map(&set, Some("Account"));
        prop_assert!(result.is_ok(), "{:?} for {:?}", result, set);
        let names = result.unwrap();
        prop_assert_eq!(names.len(), set.len());
        let lowered: BTreeSet<String> = names.iter().map(|n| n.name.to_lowercase()).collect();
        prop_assert_eq!(lowered.len(), names.len(), "{:?}", names);
    }

    #[test]
    fn application_failures_list_subtypes_first(
        parents in prop::collection::vec(any::<Index>(), 1..8),
        picks in prop::collection::vec(any::<Index>(), 0..10),
        extras in prop::collection::vec(select(vec![EXCEPTION, RUNTIME_EXCEPTION, REMOTE_EXCEPTION, IO_EXCEPTION]), 0..3),
        remote_style in any::<bool>(),
    ) {
        // E0..En, each extending Exception or an earlier Ei.
        let names: Vec<String> = (0..parents.len()).map(|i| format!("acme.E{i}")).collect();
        let infos = parents.iter().enumerate().map(|(i, p)| {
            let parent = match p.index(i + 1) {
                0 => EXCEPTION.to_string(),
                k => names[k - 1].clone(),
            };
            ClassInfo::class(&names[i], &parent)
        });
        let h = TypeHierarchy::with_classes(infos);

        let mut declared: Vec<TypeRef> = picks.iter().map(|p| TypeRef::new(names[p.index(names.len())].clone())).collect();
        declared.extend(extras.iter().map(|e| TypeRef::new(*e)));

        let c = Classifier::new(&h).classify(&declared, remote_style);
        prop_assert!(is_subtype_ordered(&c.application_checked, &h), "{:?}", c.application_checked);
        prop_assert!(c.application_checked.iter().all(|t| declared.contains(t)));
        let distinct: BTreeSet<&TypeRef> = c.application_checked.iter().collect();
        prop_assert_eq!(distinct.len(), c.application_checked.len());
    }
}
