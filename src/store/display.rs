use std::{collections::HashMap, fmt};

use crate::{defs::FsRef, store::Store, value::Value};

/// Renders a value in the single-line literal syntax accepted by
/// [`crate::literal::parse`]. Features are sorted by name; a structure reachable
/// by several paths is tagged `(n)` where it is first printed and referenced
/// as `->(n)` afterwards, so cycles print finitely.
pub struct DisplayValue<'a> {
    store: &'a Store,
    value: Value,
}

impl Store {
    pub fn display(&self, value: impl Into<Value>) -> DisplayValue<'_> {
        DisplayValue {
            store: self,
            value: value.into(),
        }
    }
}

impl fmt::Display for DisplayValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = self.store.deref(&self.value);
        let mut reentrant = HashMap::new();
        if let Value::Struct(fs) = value {
            self.store.count_paths(fs, &mut reentrant);
        }
        let mut ids = HashMap::new();
        self.write_value(f, &value, &reentrant, &mut ids)
    }
}

impl DisplayValue<'_> {
    fn write_value(
        &self,
        f: &mut fmt::Formatter<'_>,
        value: &Value,
        reentrant: &HashMap<FsRef, bool>,
        ids: &mut HashMap<FsRef, usize>,
    ) -> fmt::Result {
        match self.store.deref(value) {
            Value::Atom(atom) => write!(f, "{atom}"),
            Value::Var(var) => write!(f, "?{}", self.store.var_name(var)),
            Value::Struct(fs) => {
                if reentrant.get(&fs).copied().unwrap_or(false) {
                    let id = ids.len() + 1;
                    ids.insert(fs, id);
                    write!(f, "({id})")?;
                }
                write!(f, "[")?;
                for (i, (name, child)) in self.store.features(fs).enumerate() {
                    if i != 0 {
                        write!(f, ", ")?;
                    }
                    match self.store.deref(child) {
                        Value::Struct(target) if ids.contains_key(&target) => {
                            write!(f, "{name}->({})", ids[&target])?;
                        }
                        child => {
                            write!(f, "{name}=")?;
                            self.write_value(f, &child, reentrant, ids)?;
                        }
                    }
                }
                write!(f, "]")
            }
        }
    }
}
