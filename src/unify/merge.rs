use crate::{
    defs::{FsRef, VarRef},
    error::Failure,
    store::Slot,
    value::Value,
};

use super::{resolve::deref_struct, Unifier};

impl Unifier<'_> {
    /// Destructively merge two copied values, returning the survivor.
    pub(crate) fn merge(&mut self, a: Value, b: Value) -> Result<Value, Failure> {
        let key = (a.clone(), b.clone());
        if let Some(merged) = self.memo.get(&key) {
            return Ok(merged.clone());
        }

        self.depth += 1;
        if self.depth > self.config.max_depth {
            tracing::warn!(
                limit = self.config.max_depth,
                path = %self.path.join("."),
                "unification depth limit exceeded",
            );
            return Err(Failure::MaxRecursionExceeded {
                limit: self.config.max_depth,
                path: self.path.clone(),
            });
        }
        let merged = self.merge_uncached(a, b);
        self.depth -= 1;

        let merged = merged?;
        if key.0.is_node() || key.1.is_node() {
            self.memo.insert(key, merged.clone());
        }
        Ok(merged)
    }

    fn merge_uncached(&mut self, a: Value, b: Value) -> Result<Value, Failure> {
        if a.is_none() {
            return Ok(b);
        }
        if b.is_none() {
            return Ok(a);
        }

        let a = self.canonical(a);
        let b = self.canonical(b);
        if a == b {
            return Ok(a);
        }

        match (a, b) {
            (Value::Var(x), Value::Var(y)) => {
                tracing::trace!(
                    "unifying var `{}` and var `{}`",
                    self.store.var_name(x),
                    self.store.var_name(y),
                );
                self.forward_to(x, y)
            }
            (Value::Var(x), concrete) => {
                tracing::trace!(
                    "unifying var `{}` and concrete `{}`",
                    self.store.var_name(x),
                    self.store.display(concrete.clone()),
                );
                self.bind_value(x, concrete)?;
                Ok(Value::Var(x))
            }
            (concrete, Value::Var(y)) => {
                tracing::trace!(
                    "unifying concrete `{}` and var `{}`",
                    self.store.display(concrete.clone()),
                    self.store.var_name(y),
                );
                self.bind_value(y, concrete)?;
                Ok(Value::Var(y))
            }
            (Value::Atom(left), Value::Atom(right)) => {
                if left == right {
                    Ok(Value::Atom(left))
                } else {
                    Err(self.mismatch(Value::Atom(left), Value::Atom(right)))
                }
            }
            (Value::Struct(s), Value::Struct(t)) => self.merge_structs(s, t),
            // Written out so a new `Value` variant fails to compile here.
            (left @ Value::Struct(_), right @ Value::Atom(_)) => Err(self.mismatch(left, right)),
            (left @ Value::Atom(_), right @ Value::Struct(_)) => Err(self.mismatch(left, right)),
        }
    }

    /// The node a value currently stands for: the survivor of a forwarded
    /// structure, the end of a variable's chain.
    fn canonical(&self, value: Value) -> Value {
        match value {
            Value::Struct(fs) => Value::Struct(deref_struct(self.store, fs)),
            Value::Var(var) => Value::Var(self.store.forwarded_self(var)),
            atom @ Value::Atom(_) => atom,
        }
    }

    /// Forward `t` to `s`, then fold each of `t`'s features into `s`.
    fn merge_structs(&mut self, s: FsRef, t: FsRef) -> Result<Value, Failure> {
        tracing::trace!("absorbing structure {t} into {s}");
        let node = self.store.node_mut(t);
        node.forward = Some(s);
        let theirs = node
            .features
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect::<Vec<_>>();

        for (name, their_value) in theirs {
            // `s` may itself have been absorbed by a nested merge.
            let target = deref_struct(self.store, s);
            let our_value = self
                .store
                .get(target, &name)
                .cloned()
                .unwrap_or(Value::NONE);

            self.path.push(name.clone());
            let merged = self.merge(our_value, their_value);
            self.path.pop();

            let target = deref_struct(self.store, s);
            self.store.set_feature(target, name, merged?);
        }

        Ok(Value::Struct(deref_struct(self.store, s)))
    }

    /// Bind `var` to `value`. A variable that already has a value keeps the
    /// merge of the old and the new one.
    fn bind_value(&mut self, var: VarRef, value: Value) -> Result<(), Failure> {
        let root = self.store.forwarded_self(var);
        let bound = match self.store.slot(root).clone() {
            Slot::Bound(existing) => self.merge(existing, value)?,
            Slot::Unbound | Slot::Forward(_) => value,
        };
        let root = self.store.forwarded_self(root);
        self.store.set_slot(root, Slot::Bound(bound));
        Ok(())
    }

    /// Make `x` an alias of `y`. Whatever `x` was bound to moves over to `y`.
    fn forward_to(&mut self, x: VarRef, y: VarRef) -> Result<Value, Failure> {
        let carried = match self.store.slot(x) {
            Slot::Bound(value) => Some(value.clone()),
            Slot::Unbound | Slot::Forward(_) => None,
        };
        // Forward first so that anything reaching `x` while the value is
        // merged sees `y`.
        self.store.set_slot(x, Slot::Forward(y));
        if let Some(value) = carried {
            self.bind_value(y, value)?;
        }
        Ok(Value::Var(y))
    }

    fn mismatch(&self, left: Value, right: Value) -> Failure {
        let failure = Failure::StructureMismatch {
            path: self.path.clone(),
            left: self.store.display(left).to_string(),
            right: self.store.display(right).to_string(),
        };
        tracing::trace!(%failure, "cannot unify");
        failure
    }
}
