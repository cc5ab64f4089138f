use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use crate::{
    defs::{FsRef, VarRef},
    value::Value,
};

pub mod display;
pub mod equality;

pub use display::DisplayValue;

/// The arena that owns every feature structure and variable.
///
/// Outside of a unification call nodes are never mutated; the unifier only
/// writes to the private copies it allocates here.
#[derive(Debug, Default, Clone)]
pub struct Store {
    pub(crate) structs: Vec<StructNode>,
    pub(crate) vars: Vec<VarNode>,
}

#[derive(Debug, Default, Clone)]
pub(crate) struct StructNode {
    pub(crate) features: BTreeMap<String, Value>,
    /// Set only while a unification is in progress: this node was absorbed
    /// into the target.
    pub(crate) forward: Option<FsRef>,
}

#[derive(Debug, Clone)]
pub(crate) struct VarNode {
    pub(crate) name: String,
    pub(crate) slot: Slot,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Slot {
    Unbound,
    Bound(Value),
    Forward(VarRef),
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a structure from `(name, value)` pairs. A repeated name keeps
    /// the last value.
    pub fn new_struct<K, V>(&mut self, features: impl IntoIterator<Item = (K, V)>) -> FsRef
    where
        K: Into<String>,
        V: Into<Value>,
    {
        let fs = self.alloc_struct();
        let node = &mut self.structs[fs.0];
        for (name, value) in features {
            node.features.insert(name.into(), value.into());
        }
        fs
    }

    /// A fresh unbound variable. Without a name, the variable is named after
    /// its id.
    pub fn new_var(&mut self, name: Option<&str>) -> VarRef {
        let var = VarRef(self.vars.len());
        let name = match name {
            Some(name) => name.to_owned(),
            None => format!("_{}", var.0),
        };
        self.vars.push(VarNode {
            name,
            slot: Slot::Unbound,
        });
        var
    }

    pub(crate) fn alloc_struct(&mut self) -> FsRef {
        let fs = FsRef(self.structs.len());
        self.structs.push(StructNode::default());
        fs
    }

    pub(crate) fn node(&self, fs: FsRef) -> &StructNode {
        &self.structs[fs.0]
    }

    pub(crate) fn node_mut(&mut self, fs: FsRef) -> &mut StructNode {
        &mut self.structs[fs.0]
    }

    pub(crate) fn set_feature(&mut self, fs: FsRef, name: impl Into<String>, value: Value) {
        self.structs[fs.0].features.insert(name.into(), value);
    }

    pub(crate) fn slot(&self, var: VarRef) -> &Slot {
        &self.vars[var.0].slot
    }

    pub(crate) fn set_slot(&mut self, var: VarRef, slot: Slot) {
        self.vars[var.0].slot = slot;
    }

    /// Number of structure nodes allocated so far.
    pub fn struct_count(&self) -> usize {
        self.structs.len()
    }

    /// Number of variable nodes allocated so far.
    pub fn var_count(&self) -> usize {
        self.vars.len()
    }

    pub fn get(&self, fs: FsRef, name: &str) -> Option<&Value> {
        self.node(fs).features.get(name)
    }

    /// Features of `fs`, sorted by name.
    pub fn features(&self, fs: FsRef) -> impl Iterator<Item = (&str, &Value)> + '_ {
        self.node(fs)
            .features
            .iter()
            .map(|(name, value)| (name.as_str(), value))
    }

    pub fn feature_count(&self, fs: FsRef) -> usize {
        self.node(fs).features.len()
    }

    /// Follow a feature path through nested structures. Bound variables met
    /// along the way are dereferenced.
    pub fn get_path(&self, fs: FsRef, path: &[&str]) -> Option<Value> {
        let mut current = Value::Struct(fs);
        for name in path {
            let Value::Struct(node) = self.deref(&current) else {
                return None;
            };
            current = self.get(node, name)?.clone();
        }
        Some(self.deref(&current))
    }

    pub fn var_name(&self, var: VarRef) -> &str {
        &self.vars[var.0].name
    }

    /// The value `var` is ultimately bound to, walking the whole forwarding
    /// chain. `None` if the chain ends in an unbound variable.
    pub fn var_value(&self, var: VarRef) -> Option<Value> {
        let mut var = var;
        loop {
            match self.slot(var) {
                Slot::Unbound => return None,
                Slot::Bound(value) => return Some(value.clone()),
                Slot::Forward(next) => var = *next,
            }
        }
    }

    /// The variable at the end of `var`'s forwarding chain, i.e. the one that
    /// actually stores the shared value.
    pub fn forwarded_self(&self, var: VarRef) -> VarRef {
        let mut var = var;
        while let Slot::Forward(next) = self.slot(var) {
            var = *next;
        }
        var
    }

    pub fn is_bound(&self, var: VarRef) -> bool {
        self.var_value(var).is_some()
    }

    /// A fresh variable with the same name and current resolved value as
    /// `var`.
    pub fn copy_var(&mut self, var: VarRef) -> VarRef {
        let slot = match self.var_value(var) {
            Some(value) => Slot::Bound(value),
            None => Slot::Unbound,
        };
        let name = self.var_name(var).to_owned();
        let copy = VarRef(self.vars.len());
        self.vars.push(VarNode { name, slot });
        copy
    }

    /// Replace a bound variable by its value; an unbound one by the variable
    /// at the end of its chain. Other values are returned as is.
    pub fn deref(&self, value: &Value) -> Value {
        match value {
            Value::Var(var) => match self.var_value(*var) {
                Some(bound) => bound,
                None => Value::Var(self.forwarded_self(*var)),
            },
            other => other.clone(),
        }
    }

    /// Structures reachable from `fs` (itself included) by more than one path.
    pub fn reentrances(&self, fs: FsRef) -> Vec<FsRef> {
        let mut seen = HashMap::new();
        self.count_paths(fs, &mut seen);
        let mut shared = seen
            .into_iter()
            .filter_map(|(node, reentrant)| reentrant.then_some(node))
            .collect::<Vec<_>>();
        shared.sort();
        shared
    }

    /// Walk every structure below `fs`, recording `true` for nodes met more
    /// than once.
    pub(crate) fn count_paths(&self, fs: FsRef, seen: &mut HashMap<FsRef, bool>) {
        if let Some(reentrant) = seen.get_mut(&fs) {
            *reentrant = true;
            return;
        }
        seen.insert(fs, false);
        for value in self.node(fs).features.values() {
            if let Value::Struct(child) = self.deref(value) {
                self.count_paths(child, seen);
            }
        }
    }

    /// The unbound variables reachable from `value`.
    pub fn variables(&self, value: &Value) -> BTreeSet<VarRef> {
        let mut vars = BTreeSet::new();
        let mut visited = HashSet::new();
        self.collect_vars(value, &mut vars, &mut visited);
        vars
    }

    /// A copy of `value` in which every unbound variable whose name is in
    /// `used` is replaced by a fresh variable with an unused name: the old
    /// name with its trailing digits replaced by the lowest free number from
    /// 2 up (`x` and `x1` both become `x2`, or `x3` if `x2` is taken).
    ///
    /// `renamed` maps old names to their replacements. Names already in it
    /// are replaced without consulting `used`, and new replacements are added
    /// to it, so passing the same map for several values renames them
    /// consistently. Variables with other names are kept as they are.
    /// Reentrances are preserved.
    pub fn rename_variables(
        &mut self,
        value: &Value,
        renamed: &mut HashMap<String, VarRef>,
        used: &BTreeSet<String>,
    ) -> Value {
        let mut used = used.clone();
        used.extend(renamed.values().map(|var| self.var_name(*var).to_owned()));
        let mut copies = HashMap::new();
        self.rename_rec(value, renamed, &mut used, &mut copies)
    }

    fn rename_rec(
        &mut self,
        value: &Value,
        renamed: &mut HashMap<String, VarRef>,
        used: &mut BTreeSet<String>,
        copies: &mut HashMap<FsRef, FsRef>,
    ) -> Value {
        match self.deref(value) {
            Value::Struct(fs) => {
                if let Some(copy) = copies.get(&fs) {
                    return Value::Struct(*copy);
                }
                let copy = self.alloc_struct();
                copies.insert(fs, copy);
                let features = self
                    .features(fs)
                    .map(|(name, child)| (name.to_owned(), child.clone()))
                    .collect::<Vec<_>>();
                for (name, child) in features {
                    let child = self.rename_rec(&child, renamed, used, copies);
                    self.set_feature(copy, name, child);
                }
                Value::Struct(copy)
            }
            Value::Var(var) => {
                let name = self.var_name(var).to_owned();
                if let Some(new) = renamed.get(&name) {
                    return Value::Var(*new);
                }
                if !used.contains(&name) {
                    return Value::Var(var);
                }
                let fresh = fresh_name(&name, used);
                let new = self.new_var(Some(fresh.as_str()));
                used.insert(fresh);
                renamed.insert(name, new);
                Value::Var(new)
            }
            atom @ Value::Atom(_) => atom,
        }
    }

    fn collect_vars(&self, value: &Value, vars: &mut BTreeSet<VarRef>, visited: &mut HashSet<FsRef>) {
        match self.deref(value) {
            Value::Var(var) => {
                vars.insert(var);
            }
            Value::Struct(fs) => {
                if !visited.insert(fs) {
                    return;
                }
                for child in self.node(fs).features.values() {
                    self.collect_vars(child, vars, visited);
                }
            }
            Value::Atom(_) => {}
        }
    }
}

fn fresh_name(name: &str, used: &BTreeSet<String>) -> String {
    let stem = name.trim_end_matches(|c: char| c.is_ascii_digit());
    let mut n = 2;
    loop {
        let candidate = format!("{stem}{n}");
        if !used.contains(&candidate) {
            return candidate;
        }
        n += 1;
    }
}
