use std::{
    collections::{BTreeMap, HashMap, HashSet},
    fmt,
};

use crate::{store::Store, value::Value};

/// A variable scope: what each variable name currently stands for.
///
/// An entry maps a name either to a variable (unbound, or an alias such as
/// `x -> ?y`) or to the value the name was resolved to.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bindings {
    map: BTreeMap<String, Value>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.map.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.map.contains_key(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.map.insert(name.into(), value.into())
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.map.remove(name)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> + '_ {
        self.map.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub(crate) fn values_mut(&mut self) -> impl Iterator<Item = &mut Value> + '_ {
        self.map.values_mut()
    }

    pub(crate) fn names(&self) -> Vec<String> {
        self.map.keys().cloned().collect()
    }

    pub fn display<'a>(&'a self, store: &'a Store) -> DisplayBindings<'a> {
        DisplayBindings {
            bindings: self,
            store,
        }
    }
}

pub struct DisplayBindings<'a> {
    bindings: &'a Bindings,
    store: &'a Store,
}

impl fmt::Display for DisplayBindings<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (name, value)) in self.bindings.iter().enumerate() {
            if i != 0 {
                write!(f, ", ")?;
            }
            write!(f, "{name}: {}", self.store.display(value.clone()))?;
        }
        write!(f, "}}")
    }
}

/// Replace every variable in `value` that `bindings` knows about by what it is
/// bound to, following aliases, without unifying anything.
///
/// The input is left untouched; structures on the way are copied (keeping
/// their reentrances) into `store`. Variables unknown to `bindings` stay as
/// they are, unless they are themselves bound.
pub fn substitute_bindings(store: &mut Store, value: &Value, bindings: &Bindings) -> Value {
    let mut memo = HashMap::new();
    substitute(store, value, bindings, &mut memo)
}

fn substitute(
    store: &mut Store,
    value: &Value,
    bindings: &Bindings,
    memo: &mut HashMap<Value, Value>,
) -> Value {
    if let Some(done) = memo.get(value) {
        return done.clone();
    }
    match value {
        Value::Atom(_) => value.clone(),
        Value::Var(_) => {
            let replacement = resolve_var(store, value, bindings);
            let result = match &replacement {
                Value::Struct(_) => substitute(store, &replacement, bindings, memo),
                _ => replacement,
            };
            memo.insert(value.clone(), result.clone());
            result
        }
        Value::Struct(fs) => {
            let copy = store.alloc_struct();
            memo.insert(value.clone(), Value::Struct(copy));
            let features = store
                .features(*fs)
                .map(|(name, child)| (name.to_owned(), child.clone()))
                .collect::<Vec<_>>();
            for (name, child) in features {
                let child = substitute(store, &child, bindings, memo);
                store.set_feature(copy, name, child);
            }
            Value::Struct(copy)
        }
    }
}

/// Follow `value` through `bindings` by name and through the store's own
/// forwarding, until it is no longer a variable that either knows more about.
fn resolve_var(store: &Store, value: &Value, bindings: &Bindings) -> Value {
    let mut replacement = value.clone();
    let mut seen = HashSet::new();
    while let Value::Var(var) = &replacement {
        let name = store.var_name(*var);
        match bindings.get(name) {
            Some(bound) if seen.insert(name.to_owned()) => replacement = bound.clone(),
            _ => {
                let resolved = store.deref(&replacement);
                if resolved == replacement {
                    break;
                }
                replacement = resolved;
            }
        }
    }
    replacement
}
