#![deny(
    clippy::undocumented_unsafe_blocks,
    clippy::multiple_unsafe_ops_per_block,
    clippy::missing_safety_doc,
    clippy::default_union_representation
)]

//! Feature structures (attribute-value matrices) and their graph
//! unification.
//!
//! Structures and variables live in a [`Store`] and are addressed by
//! [`FsRef`] and [`VarRef`] handles. Build them by hand or from the literal
//! syntax with [`literal::parse`], then combine them with [`unify()`].

pub mod bindings;
pub mod config;
pub mod defs;
pub mod error;
pub mod literal;
pub mod store;
pub mod unify;
pub mod value;

pub use bindings::{substitute_bindings, Bindings};
pub use config::UnifyConfig;
pub use defs::{FsRef, VarRef};
pub use error::{Error, Failure, ParseSyntaxError};
pub use literal::{parse, parse_value};
pub use store::Store;
pub use unify::{subsumes, unify, unify_in, unify_scoped, UnifyCache, Unifier};
pub use value::{Atom, Value};
