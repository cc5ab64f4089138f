use derive_more::Display;

/// A handle to a feature structure node in a [`Store`](crate::store::Store).
///
/// Handles compare by identity: two handles are equal only if they name the
/// same node, no matter what the nodes contain.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[display(fmt = "#{}", _0)]
pub struct FsRef(pub(crate) usize);

/// A handle to a variable node in a [`Store`](crate::store::Store).
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[display(fmt = "_{}", _0)]
pub struct VarRef(pub(crate) usize);

impl FsRef {
    pub fn usize(self) -> usize {
        self.0
    }
}

impl VarRef {
    pub fn usize(self) -> usize {
        self.0
    }
}

impl From<usize> for FsRef {
    fn from(idx: usize) -> Self {
        Self(idx)
    }
}

impl From<usize> for VarRef {
    fn from(idx: usize) -> Self {
        Self(idx)
    }
}
