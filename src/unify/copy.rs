use std::collections::HashMap;

use crate::{bindings::Bindings, store::Store, value::Value};

/// Copy `value` into fresh store nodes that the merge may then destroy.
///
/// `memo` maps every node already copied (and every copy) to its copy, so a
/// node reached twice, from either operand, is copied once. Variables are
/// looked up in `bindings` by name: a name bound to a value is replaced by a
/// copy of that value, an unbound one by a fresh variable which is recorded
/// in `bindings` when the name was not there yet.
pub(super) fn copy_and_bind(
    store: &mut Store,
    value: &Value,
    mut bindings: Option<&mut Bindings>,
    memo: &mut HashMap<Value, Value>,
) -> Value {
    if let Some(copy) = memo.get(value) {
        return copy.clone();
    }
    let copy = match value {
        Value::Atom(_) => return value.clone(),
        Value::Struct(fs) => {
            let copy = store.alloc_struct();
            // Remember before descending, in case the structure is cyclic.
            remember(memo, value, Value::Struct(copy));
            let features = store
                .features(*fs)
                .map(|(name, child)| (name.to_owned(), child.clone()))
                .collect::<Vec<_>>();
            for (name, child) in features {
                let child = copy_and_bind(store, &child, bindings.as_deref_mut(), memo);
                store.set_feature(copy, name, child);
            }
            return Value::Struct(copy);
        }
        Value::Var(var) => match bindings {
            Some(bindings) => {
                let name = store.var_name(*var).to_owned();
                copy_in_scope(store, name, value, bindings, memo)
            }
            None => copy_unscoped(store, value, memo),
        },
    };
    remember(memo, value, copy.clone());
    copy
}

/// Copy the variable `occurrence`, called `name` in `bindings`.
///
/// An entry that is an alias for another unbound variable (`x: ?y`) is
/// followed to the entry for `y`, and so on, so that every name along the
/// chain ends up mapped to the same copy.
fn copy_in_scope(
    store: &mut Store,
    name: String,
    occurrence: &Value,
    bindings: &mut Bindings,
    memo: &mut HashMap<Value, Value>,
) -> Value {
    let mut chain = vec![name];
    let mut last_entry = None;
    let copy = loop {
        let Some(current) = chain.last() else {
            break copy_unscoped(store, occurrence, memo);
        };
        let Some(entry) = bindings.get(current).cloned() else {
            break match &last_entry {
                Some(alias) => copy_and_bind(store, alias, None, memo),
                None => copy_unscoped(store, occurrence, memo),
            };
        };
        match store.deref(&entry) {
            Value::Var(alias) if !chain.iter().any(|seen| seen == store.var_name(alias)) => {
                chain.push(store.var_name(alias).to_owned());
                last_entry = Some(entry);
            }
            _ => break copy_and_bind(store, &entry, None, memo),
        }
    };
    for name in chain {
        bindings.insert(name, copy.clone());
    }
    copy
}

/// Copy a variable outside of any scope: its value if it has one, otherwise a
/// fresh variable standing in for the end of its forwarding chain.
fn copy_unscoped(store: &mut Store, value: &Value, memo: &mut HashMap<Value, Value>) -> Value {
    match store.deref(value) {
        Value::Var(var) => {
            let root = Value::Var(var);
            if let Some(copy) = memo.get(&root) {
                return copy.clone();
            }
            let copy = Value::Var(store.copy_var(var));
            remember(memo, &root, copy.clone());
            copy
        }
        bound => copy_and_bind(store, &bound, None, memo),
    }
}

fn remember(memo: &mut HashMap<Value, Value>, original: &Value, copy: Value) {
    if original.is_node() {
        memo.insert(original.clone(), copy.clone());
    }
    if copy.is_node() {
        memo.insert(copy.clone(), copy);
    }
}

/// Point every binding that names a node just copied at the copy instead.
pub(super) fn sync_bindings(bindings: &mut Bindings, memo: &HashMap<Value, Value>) {
    for value in bindings.values_mut() {
        if let Some(copy) = memo.get(value) {
            *value = copy.clone();
        }
    }
}
