use std::collections::HashMap;

use crate::{
    defs::FsRef,
    error::ParseSyntaxError,
    store::Store,
    value::Value,
};

use super::{FeatureBody, Literal, StructLiteral, Tag};

/// Turns a literal syntax tree into store nodes.
///
/// Reentrance identifiers are resolved strictly left to right: an identifier
/// must be introduced before it is referenced, and only once. A structure's
/// own identifier is usable inside it, which is how cyclic literals are
/// written.
#[derive(Default, Debug)]
pub struct Builder {
    reentrances: HashMap<String, Value>,
}

impl Builder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build `literal`, or on error roll `store` back to how it was.
    pub fn build_atomically(
        &mut self,
        literal: &Literal,
        store: &mut Store,
    ) -> Result<Value, ParseSyntaxError> {
        let mark = (store.structs.len(), store.vars.len());
        self.build(literal, None, store).inspect_err(|_| {
            store.structs.truncate(mark.0);
            store.vars.truncate(mark.1);
        })
    }

    pub fn build_struct_atomically(
        &mut self,
        literal: &StructLiteral,
        store: &mut Store,
    ) -> Result<FsRef, ParseSyntaxError> {
        let mark = (store.structs.len(), store.vars.len());
        self.build_struct(literal, None, store).inspect_err(|_| {
            store.structs.truncate(mark.0);
            store.vars.truncate(mark.1);
        })
    }

    fn build(
        &mut self,
        literal: &Literal,
        outer_tag: Option<&Tag>,
        store: &mut Store,
    ) -> Result<Value, ParseSyntaxError> {
        let value = match literal {
            Literal::Struct(s) => return Ok(Value::Struct(self.build_struct(s, outer_tag, store)?)),
            Literal::Atom(atom) => Value::Atom(atom.clone()),
            // Every occurrence is its own variable; bindings tie equal names.
            Literal::Var(name) => Value::Var(store.new_var(Some(name))),
        };
        if let Some(tag) = outer_tag {
            self.introduce(tag, value.clone())?;
        }
        Ok(value)
    }

    fn build_struct(
        &mut self,
        literal: &StructLiteral,
        outer_tag: Option<&Tag>,
        store: &mut Store,
    ) -> Result<FsRef, ParseSyntaxError> {
        let fs = store.alloc_struct();
        for tag in outer_tag.into_iter().chain(&literal.tag) {
            self.introduce(tag, Value::Struct(fs))?;
        }

        for feature in &literal.features {
            let value = match &feature.body {
                FeatureBody::Reentrance((id, span)) => {
                    self.reentrances
                        .get(id)
                        .cloned()
                        .ok_or_else(|| ParseSyntaxError {
                            expected: format!("a bound identifier (`({id})` is not yet defined)"),
                            position: span.start,
                        })?
                }
                FeatureBody::Assign { tag, value } => self.build(value, tag.as_ref(), store)?,
            };
            store.set_feature(fs, feature.name.clone(), value);
        }

        Ok(fs)
    }

    fn introduce(&mut self, (id, span): &Tag, value: Value) -> Result<(), ParseSyntaxError> {
        if self.reentrances.contains_key(id) {
            return Err(ParseSyntaxError {
                expected: format!("a new identifier (`({id})` is already defined)"),
                position: span.start,
            });
        }
        self.reentrances.insert(id.clone(), value);
        Ok(())
    }
}
