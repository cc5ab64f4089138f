use std::collections::{HashMap, HashSet};

use crate::{defs::FsRef, store::Store, value::Value};

/// Pairs of structures already being compared. Meeting a pair again means the
/// comparison has gone around a cycle, and the pair is taken to be equal.
#[derive(Default)]
struct Assumed {
    pairs: HashSet<(FsRef, FsRef)>,
    /// Only used when reentrance must match too.
    bijection: Option<(HashMap<FsRef, FsRef>, HashMap<FsRef, FsRef>)>,
}

impl Store {
    /// Structural equality: the same feature names with recursively equal
    /// values. Bound variables compare as their values, unbound variables by
    /// name. Shared and copied substructure are not distinguished.
    pub fn equal(&self, a: &Value, b: &Value) -> bool {
        self.equal_rec(a, b, &mut Assumed::default())
    }

    /// Like [`Store::equal`], but also requires both sides to share
    /// substructure in the same places.
    pub fn equal_with_reentrance(&self, a: &Value, b: &Value) -> bool {
        let mut assumed = Assumed {
            bijection: Some(Default::default()),
            ..Default::default()
        };
        self.equal_rec(a, b, &mut assumed)
    }

    fn equal_rec(&self, a: &Value, b: &Value, assumed: &mut Assumed) -> bool {
        match (self.deref(a), self.deref(b)) {
            (Value::Atom(a), Value::Atom(b)) => a == b,
            (Value::Var(a), Value::Var(b)) => a == b || self.var_name(a) == self.var_name(b),
            (Value::Struct(s), Value::Struct(t)) => {
                if let Some((left, right)) = &mut assumed.bijection {
                    match (left.get(&s), right.get(&t)) {
                        (Some(&t2), _) if t2 != t => return false,
                        (_, Some(&s2)) if s2 != s => return false,
                        _ => {
                            left.insert(s, t);
                            right.insert(t, s);
                        }
                    }
                }
                if !assumed.pairs.insert((s, t)) {
                    return true;
                }
                let (s_node, t_node) = (self.node(s), self.node(t));
                if s_node.features.len() != t_node.features.len() {
                    return false;
                }
                let pairs = s_node
                    .features
                    .iter()
                    .map(|(name, value)| (value.clone(), t_node.features.get(name).cloned()))
                    .collect::<Vec<_>>();
                pairs.into_iter().all(|(left, right)| match right {
                    Some(right) => self.equal_rec(&left, &right, assumed),
                    None => false,
                })
            }
            _ => false,
        }
    }
}
