use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Tuning for a [`Unifier`](crate::unify::Unifier).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnifyConfig {
    /// How deeply merges may nest before the problem is declared ill-founded.
    pub max_depth: usize,
}

impl UnifyConfig {
    pub const DEFAULT_MAX_DEPTH: usize = 50;

    /// Read a config written in RON, e.g. `(max_depth: 200)`. Missing fields
    /// take their defaults.
    pub fn from_ron(text: &str) -> Result<Self> {
        Ok(ron::from_str(text)?)
    }
}

impl Default for UnifyConfig {
    fn default() -> Self {
        Self {
            max_depth: Self::DEFAULT_MAX_DEPTH,
        }
    }
}
