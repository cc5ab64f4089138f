use std::collections::HashSet;

use crate::{bindings::Bindings, defs::FsRef, store::{Slot, Store}, value::Value};

/// The structure that finally absorbed `fs`, or `fs` itself.
pub(super) fn deref_struct(store: &Store, fs: FsRef) -> FsRef {
    let mut fs = fs;
    while let Some(next) = store.node(fs).forward {
        fs = next;
    }
    fs
}

/// Replace every reference to an absorbed structure reachable from `value`
/// by its survivor, so that the merged graph no longer needs the forward
/// markers.
pub(super) fn apply_forwards(store: &mut Store, value: &Value, visited: &mut HashSet<Value>) -> Value {
    match value {
        Value::Struct(fs) => {
            let fs = deref_struct(store, *fs);
            if visited.insert(Value::Struct(fs)) {
                let children = store
                    .features(fs)
                    .map(|(name, child)| (name.to_owned(), child.clone()))
                    .collect::<Vec<_>>();
                for (name, child) in children {
                    let resolved = apply_forwards(store, &child, visited);
                    if resolved != child {
                        store.set_feature(fs, name, resolved);
                    }
                }
            }
            Value::Struct(fs)
        }
        Value::Var(var) => {
            let root = store.forwarded_self(*var);
            if visited.insert(Value::Var(root)) {
                if let Slot::Bound(bound) = store.slot(root).clone() {
                    let resolved = apply_forwards(store, &bound, visited);
                    if resolved != bound {
                        store.set_slot(root, Slot::Bound(resolved));
                    }
                }
            }
            value.clone()
        }
        Value::Atom(_) => value.clone(),
    }
}

pub(super) fn apply_forwards_to_bindings(store: &mut Store, bindings: &mut Bindings, visited: &mut HashSet<Value>) {
    for value in bindings.values_mut() {
        *value = apply_forwards(store, value, visited);
    }
}

/// Replace bound variables reachable from `value` by their values, and
/// unbound ones by the variable at the end of their chain.
pub(super) fn lookup_values(store: &mut Store, value: &Value, visited: &mut HashSet<FsRef>) -> Value {
    match store.deref(value) {
        Value::Struct(fs) => {
            let fs = deref_struct(store, fs);
            if visited.insert(fs) {
                let children = store
                    .features(fs)
                    .map(|(name, child)| (name.to_owned(), child.clone()))
                    .collect::<Vec<_>>();
                for (name, child) in children {
                    let resolved = lookup_values(store, &child, visited);
                    if resolved != child {
                        store.set_feature(fs, name, resolved);
                    }
                }
            }
            Value::Struct(fs)
        }
        unbound_or_atom => unbound_or_atom,
    }
}

/// Like [`lookup_values`], for every entry of `bindings`. A name left mapped
/// to an unbound variable of the same name says nothing and is dropped.
pub(super) fn lookup_bindings(store: &mut Store, bindings: &mut Bindings, visited: &mut HashSet<FsRef>) {
    for name in bindings.names() {
        let Some(value) = bindings.get(&name).cloned() else {
            continue;
        };
        match lookup_values(store, &value, visited) {
            Value::Var(var) if store.var_name(var) == name => {
                bindings.remove(&name);
            }
            resolved => {
                bindings.insert(name, resolved);
            }
        }
    }
}
