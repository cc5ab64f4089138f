use derive_more::From;
use std::fmt;

/// Why a unification did not produce a result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    /// Two atoms differ, or a structure met an atom. An ordinary outcome:
    /// the operands are incompatible.
    StructureMismatch {
        /// Feature names leading from the operands' roots to the conflict.
        path: Vec<String>,
        left: String,
        right: String,
    },
    /// Merges nested deeper than the configured limit. This is not an
    /// incompatibility but a malformed problem, and it aborts the whole call.
    MaxRecursionExceeded { limit: usize, path: Vec<String> },
}

impl Failure {
    pub fn is_fatal(&self) -> bool {
        matches!(self, Failure::MaxRecursionExceeded { .. })
    }

    pub fn path(&self) -> &[String] {
        match self {
            Failure::StructureMismatch { path, .. } | Failure::MaxRecursionExceeded { path, .. } => path,
        }
    }
}

struct DisplayPath<'a>(&'a [String]);

impl fmt::Display for DisplayPath<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            write!(f, "<root>")
        } else {
            write!(f, "{}", self.0.join("."))
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Failure::StructureMismatch { path, left, right } => write!(
                f,
                "Structure mismatch at `{}`: `{left}` does not unify with `{right}`.",
                DisplayPath(path)
            ),
            Failure::MaxRecursionExceeded { limit, path } => write!(
                f,
                "Unification nested deeper than {limit} levels (at `{}`); the operands do not form a well-founded problem.",
                DisplayPath(path)
            ),
        }
    }
}

impl std::error::Error for Failure {}

/// A literal could not be parsed. Nothing is built when this is returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseSyntaxError {
    pub expected: String,
    /// Character offset into the literal.
    pub position: usize,
}

impl fmt::Display for ParseSyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Syntax error at offset {}: expected {}.",
            self.position, self.expected
        )
    }
}

impl std::error::Error for ParseSyntaxError {}

#[derive(Debug, From)]
pub enum Error {
    #[from]
    Unify(Failure),
    #[from]
    Parse(ParseSyntaxError),
    #[from]
    Config(ron::de::SpannedError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Unify(e) => write!(f, "Unification failed: {e}"),
            Error::Parse(e) => write!(f, "Parse error: {e}"),
            Error::Config(e) => write!(f, "Error while reading config: {e}"),
        }
    }
}

impl std::error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;
