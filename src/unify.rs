//! Destructive graph unification of feature structures.
//!
//! A call runs in four phases:
//!
//! 1. Both operands are copied into the store (one copy memo for both, so
//!    substructure shared within or between them stays shared), replacing
//!    variables according to their bindings.
//! 2. The copies are merged in place. When two structures meet, the second is
//!    forwarded to the first, which absorbs its features.
//! 3. Forward pointers are resolved away.
//! 4. Bound variables are replaced by their values, in the result and in the
//!    bindings.
//!
//! The operands themselves are never modified.

use std::collections::HashMap;

use crate::{
    bindings::Bindings,
    config::UnifyConfig,
    error::Failure,
    store::Store,
    value::Value,
};

mod copy;
mod merge;
mod resolve;

#[cfg(test)]
mod tests;

/// Results of earlier unifications, keyed by the identity of the two
/// operands. Thread one through [`Unifier::with_cache`] to skip repeated work
/// when the same pair is unified again under the same bindings.
#[derive(Debug, Default)]
pub struct UnifyCache {
    entries: HashMap<(Value, Value), Outcome>,
}

#[derive(Debug, Clone)]
struct Outcome {
    result: Result<Value, Failure>,
    left: Bindings,
    right: Bindings,
}

impl UnifyCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// The variable scopes of the two operands. Both operands may share one.
enum Scopes<'b> {
    Shared(&'b mut Bindings),
    Split(&'b mut Bindings, &'b mut Bindings),
}

impl Scopes<'_> {
    fn left(&mut self) -> &mut Bindings {
        match self {
            Scopes::Shared(b) => &mut **b,
            Scopes::Split(left, _) => &mut **left,
        }
    }

    fn right(&mut self) -> &mut Bindings {
        match self {
            Scopes::Shared(b) => &mut **b,
            Scopes::Split(_, right) => &mut **right,
        }
    }

    fn for_each(&mut self, mut f: impl FnMut(&mut Bindings)) {
        match self {
            Scopes::Shared(b) => f(&mut **b),
            Scopes::Split(left, right) => {
                f(&mut **left);
                f(&mut **right);
            }
        }
    }

    fn snapshot(&mut self) -> (Bindings, Bindings) {
        (self.left().clone(), self.right().clone())
    }

    fn restore(&mut self, (left, right): (Bindings, Bindings)) {
        match self {
            Scopes::Shared(b) => **b = left,
            Scopes::Split(l, r) => {
                **l = left;
                **r = right;
            }
        }
    }
}

/// One unification session over a [`Store`].
///
/// The merge memo and depth counter live here and are reset by every
/// top-level call; nothing is shared between sessions unless a
/// [`UnifyCache`] is passed in explicitly.
pub struct Unifier<'s> {
    pub(crate) store: &'s mut Store,
    pub(crate) config: UnifyConfig,
    cache: Option<&'s mut UnifyCache>,
    /// Merge results keyed by the identity of the pair being merged.
    pub(crate) memo: HashMap<(Value, Value), Value>,
    pub(crate) depth: usize,
    /// Feature names from the roots down to the merge in progress.
    pub(crate) path: Vec<String>,
}

impl<'s> Unifier<'s> {
    pub fn new(store: &'s mut Store) -> Self {
        Self::with_config(store, UnifyConfig::default())
    }

    pub fn with_config(store: &'s mut Store, config: UnifyConfig) -> Self {
        Self {
            store,
            config,
            cache: None,
            memo: HashMap::new(),
            depth: 0,
            path: Vec::new(),
        }
    }

    pub fn with_cache(mut self, cache: &'s mut UnifyCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Unify with a separate, empty scope for each operand.
    pub fn unify(&mut self, a: impl Into<Value>, b: impl Into<Value>) -> Result<Value, Failure> {
        let (mut left, mut right) = (Bindings::new(), Bindings::new());
        self.run(a.into(), b.into(), Scopes::Split(&mut left, &mut right))
    }

    /// Unify with one scope for both operands: `?x` on either side is the
    /// same variable.
    pub fn unify_in(
        &mut self,
        a: impl Into<Value>,
        b: impl Into<Value>,
        bindings: &mut Bindings,
    ) -> Result<Value, Failure> {
        self.run(a.into(), b.into(), Scopes::Shared(bindings))
    }

    /// Unify with a scope per operand. On success each scope records what its
    /// variables were bound to; on failure both are left as they were.
    pub fn unify_scoped(
        &mut self,
        a: impl Into<Value>,
        b: impl Into<Value>,
        left: &mut Bindings,
        right: &mut Bindings,
    ) -> Result<Value, Failure> {
        self.run(a.into(), b.into(), Scopes::Split(left, right))
    }

    fn run(&mut self, a: Value, b: Value, mut scopes: Scopes<'_>) -> Result<Value, Failure> {
        let _span = tracing::trace_span!(
            "unifying",
            a = %self.store.display(a.clone()),
            b = %self.store.display(b.clone()),
        )
        .entered();

        let key = (a.clone(), b.clone());
        if let Some(hit) = self.cache.as_deref().and_then(|cache| cache.entries.get(&key)) {
            tracing::debug!("unification result cached");
            if hit.result.is_ok() {
                scopes.restore((hit.left.clone(), hit.right.clone()));
            }
            return hit.result.clone();
        }

        let snapshot = scopes.snapshot();
        let mark = (self.store.structs.len(), self.store.vars.len());
        self.memo.clear();
        self.depth = 0;
        self.path.clear();

        let result = self.unify_copies(&a, &b, &mut scopes);

        match &result {
            Ok(value) => {
                tracing::debug!(result = %self.store.display(value.clone()), "unification succeeded");
                // The absorbed copies are unreachable now; drop their markers.
                for node in &mut self.store.structs[mark.0..] {
                    node.forward = None;
                }
            }
            Err(failure) => {
                tracing::debug!(%failure, "unification failed");
                scopes.restore(snapshot);
                self.store.structs.truncate(mark.0);
                self.store.vars.truncate(mark.1);
            }
        }
        self.memo.clear();

        if let Some(cache) = self.cache.as_deref_mut() {
            cache.entries.insert(
                key,
                Outcome {
                    result: result.clone(),
                    left: scopes.left().clone(),
                    right: scopes.right().clone(),
                },
            );
        }
        result
    }

    fn unify_copies(&mut self, a: &Value, b: &Value, scopes: &mut Scopes<'_>) -> Result<Value, Failure> {
        let mut copies = HashMap::new();
        let a = copy::copy_and_bind(self.store, a, Some(scopes.left()), &mut copies);
        let b = copy::copy_and_bind(self.store, b, Some(scopes.right()), &mut copies);
        scopes.for_each(|bindings| copy::sync_bindings(bindings, &copies));

        let merged = self.merge(a, b)?;

        let mut visited = Default::default();
        let merged = resolve::apply_forwards(self.store, &merged, &mut visited);
        scopes.for_each(|bindings| resolve::apply_forwards_to_bindings(self.store, bindings, &mut visited));

        let mut visited = Default::default();
        let merged = resolve::lookup_values(self.store, &merged, &mut visited);
        scopes.for_each(|bindings| resolve::lookup_bindings(self.store, bindings, &mut visited));
        Ok(merged)
    }
}

/// Unify `a` and `b`, each in its own empty scope.
pub fn unify(store: &mut Store, a: impl Into<Value>, b: impl Into<Value>) -> Result<Value, Failure> {
    Unifier::new(store).unify(a, b)
}

/// Unify `a` and `b` in one shared scope.
pub fn unify_in(
    store: &mut Store,
    a: impl Into<Value>,
    b: impl Into<Value>,
    bindings: &mut Bindings,
) -> Result<Value, Failure> {
    Unifier::new(store).unify_in(a, b, bindings)
}

/// Unify `a` and `b`, each in its own caller-supplied scope.
pub fn unify_scoped(
    store: &mut Store,
    a: impl Into<Value>,
    b: impl Into<Value>,
    left: &mut Bindings,
    right: &mut Bindings,
) -> Result<Value, Failure> {
    Unifier::new(store).unify_scoped(a, b, left, right)
}

/// Does `general` carry no information that `specific` lacks, i.e. does
/// unifying them give back `specific`?
pub fn subsumes(store: &mut Store, general: impl Into<Value>, specific: impl Into<Value>) -> Result<bool, Failure> {
    let specific = specific.into();
    match unify(store, general, specific.clone()) {
        Ok(unified) => Ok(store.equal(&unified, &specific)),
        Err(failure) if failure.is_fatal() => Err(failure),
        Err(_) => Ok(false),
    }
}
