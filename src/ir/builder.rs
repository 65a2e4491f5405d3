use super::{Body, LocalDecl, LocalId, Stmt};
use crate::model::TypeRef;

/// Allocates locals while a method body is assembled.
#[derive(Debug, Default)]
pub struct BodyBuilder {
    locals: Vec<LocalDecl>,
}

impl BodyBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn local(&mut self, name: &str, ty: TypeRef) -> LocalId {
        self.locals.push(LocalDecl { name: name.to_string(), ty });
        self.locals.len() - 1
    }

    pub fn local_of(&mut self, name: &str, ty: &str) -> LocalId {
        self.local(name, TypeRef::new(ty))
    }

    pub fn finish(self, stmts: Vec<Stmt>) -> Body {
        Body { locals: self.locals, stmts }
    }
}
