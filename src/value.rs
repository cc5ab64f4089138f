use derive_more::From;
use serde::{Deserialize, Serialize};

use crate::defs::{FsRef, VarRef};

/// An opaque scalar. Atoms compare by value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Atom {
    /// The absence of information. Unifies with anything and yields the other
    /// side.
    None,
    Bool(bool),
    Int(i64),
    Str(String),
}

impl std::fmt::Display for Atom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Atom::None => write!(f, "None"),
            Atom::Bool(true) => write!(f, "True"),
            Atom::Bool(false) => write!(f, "False"),
            Atom::Int(i) => write!(f, "{i}"),
            Atom::Str(s) => {
                write!(f, "\"")?;
                for c in s.chars() {
                    match c {
                        '"' => write!(f, "\\\"")?,
                        '\\' => write!(f, "\\\\")?,
                        '\n' => write!(f, "\\n")?,
                        '\t' => write!(f, "\\t")?,
                        c => write!(f, "{c}")?,
                    }
                }
                write!(f, "\"")
            }
        }
    }
}

impl From<&str> for Atom {
    fn from(s: &str) -> Self {
        Atom::Str(s.to_owned())
    }
}

impl From<String> for Atom {
    fn from(s: String) -> Self {
        Atom::Str(s)
    }
}

impl From<i64> for Atom {
    fn from(i: i64) -> Self {
        Atom::Int(i)
    }
}

impl From<bool> for Atom {
    fn from(b: bool) -> Self {
        Atom::Bool(b)
    }
}

/// A feature value.
///
/// Equality and hashing are by value for atoms and by identity for
/// structures and variables, which makes a `(Value, Value)` pair usable as an
/// identity-keyed memo key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, From)]
pub enum Value {
    Atom(Atom),
    Struct(FsRef),
    Var(VarRef),
}

impl Value {
    /// The wildcard: specifies nothing, acts as the identity of unification.
    pub const NONE: Value = Value::Atom(Atom::None);

    pub fn is_none(&self) -> bool {
        matches!(self, Value::Atom(Atom::None))
    }

    pub fn as_struct(&self) -> Option<FsRef> {
        match self {
            Value::Struct(fs) => Some(*fs),
            _ => None,
        }
    }

    pub fn as_var(&self) -> Option<VarRef> {
        match self {
            Value::Var(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_atom(&self) -> Option<&Atom> {
        match self {
            Value::Atom(a) => Some(a),
            _ => None,
        }
    }

    /// Is this a structure or variable node, i.e. does it have an identity?
    pub(crate) fn is_node(&self) -> bool {
        !matches!(self, Value::Atom(_))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Atom(s.into())
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Atom(i.into())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Atom(b.into())
    }
}
