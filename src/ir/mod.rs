//! Structured unit descriptions handed to the module emitter
//!
//! A unit is a class: ancestor, interfaces, fields and methods. Method bodies
//! are structured statements. Exceptional control flow is expressed with
//! [`TryRegion`]: a guarded body, ordered handlers and an optional
//! [`ExitRegion`] that runs exactly once on every path out of the region.
//!
//! Exit region shape:
//!
//! ```text
//!            ┌──────── body ────────┐
//!  entry ──► │  normal / return /   │──┐
//!            │  handler k (throw)   │  │   every exit path
//!            └──────────────────────┘  ▼
//!                               in_flight := failure | null
//!                               exit body (once)
//!                               resume: continue / return / rethrow in_flight
//! ```

mod builder;
mod check;

pub use builder::BodyBuilder;
pub use check::{check_unit, terminates};

use crate::codegen::access_flags;
use crate::model::{DispatchId, Primitive, TypeRef};

pub type LocalId = usize;

#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    Null,
    Bool(bool),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Str(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvokeKind {
    Virtual,
    Interface,
    Special,
    Static,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub kind: InvokeKind,
    pub owner: String,
    pub name: String,
    pub params: Vec<TypeRef>,
    pub ret: TypeRef,
    pub receiver: Option<Box<Expr>>,
    pub args: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Const(Constant),
    Local(LocalId),
    This,
    Arg(usize),
    GetField {
        owner: String,
        name: String,
        ty: TypeRef,
        target: Box<Expr>,
    },
    New {
        class: String,
        params: Vec<TypeRef>,
        args: Vec<Expr>,
    },
    /// `new T[] { .. }` of a reference element type.
    NewArray(TypeRef, Vec<Expr>),
    /// `array[index]` of an `Object[]`.
    Index(Box<Expr>, i32),
    ClassLiteral(TypeRef),
    /// Box a primitive-typed expression.
    Box(Box<Expr>),
    /// Cast to the wrapper class and read the primitive value.
    Unbox(Primitive, Box<Expr>),
    Cast(TypeRef, Box<Expr>),
    Call(Box<Call>),
}

impl Expr {
    pub fn null() -> Self {
        Expr::Const(Constant::Null)
    }

    pub fn int(value: i32) -> Self {
        Expr::Const(Constant::Int(value))
    }

    pub fn bool(value: bool) -> Self {
        Expr::Const(Constant::Bool(value))
    }

    pub fn str(value: impl Into<String>) -> Self {
        Expr::Const(Constant::Str(value.into()))
    }

    pub fn local(id: LocalId) -> Self {
        Expr::Local(id)
    }

    pub fn field(owner: &str, name: &str, ty: &str, target: Expr) -> Self {
        Expr::GetField {
            owner: owner.to_string(),
            name: name.to_string(),
            ty: TypeRef::new(ty),
            target: Box::new(target),
        }
    }

    pub fn new_object(class: &str, params: &[TypeRef], args: Vec<Expr>) -> Self {
        Expr::New { class: class.to_string(), params: params.to_vec(), args }
    }

    /// `new Object[] { .. }`; primitive elements must already be boxed.
    pub fn object_array(items: Vec<Expr>) -> Self {
        Expr::NewArray(TypeRef::object(), items)
    }

    pub fn cast(ty: TypeRef, expr: Expr) -> Self {
        Expr::Cast(ty, Box::new(expr))
    }

    fn call(kind: InvokeKind, owner: &str, name: &str, params: &[TypeRef], ret: TypeRef, receiver: Option<Expr>, args: Vec<Expr>) -> Self {
        Expr::Call(Box::new(Call {
            kind,
            owner: owner.to_string(),
            name: name.to_string(),
            params: params.to_vec(),
            ret,
            receiver: receiver.map(Box::new),
            args,
        }))
    }

    pub fn invoke_virtual(receiver: Expr, owner: &str, name: &str, params: &[TypeRef], ret: TypeRef, args: Vec<Expr>) -> Self {
        Self::call(InvokeKind::Virtual, owner, name, params, ret, Some(receiver), args)
    }

    pub fn invoke_interface(receiver: Expr, owner: &str, name: &str, params: &[TypeRef], ret: TypeRef, args: Vec<Expr>) -> Self {
        Self::call(InvokeKind::Interface, owner, name, params, ret, Some(receiver), args)
    }

    pub fn invoke_special(receiver: Expr, owner: &str, name: &str, params: &[TypeRef], ret: TypeRef, args: Vec<Expr>) -> Self {
        Self::call(InvokeKind::Special, owner, name, params, ret, Some(receiver), args)
    }

    pub fn invoke_static(owner: &str, name: &str, params: &[TypeRef], ret: TypeRef, args: Vec<Expr>) -> Self {
        Self::call(InvokeKind::Static, owner, name, params, ret, None, args)
    }

    /// The `false | 0 | null` a return value local starts with.
    pub fn zero(ty: &TypeRef) -> Self {
        Expr::Const(match ty.primitive() {
            Some(Primitive::Boolean) => Constant::Bool(false),
            Some(Primitive::Long) => Constant::Long(0),
            Some(Primitive::Float) => Constant::Float(0.0),
            Some(Primitive::Double) => Constant::Double(0.0),
            Some(_) => Constant::Int(0),
            None => Constant::Null,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Cond {
    True(Expr),
    False(Expr),
    Null(Expr),
    NotNull(Expr),
    InstanceOf(Expr, String),
    /// Reference identity.
    Same(Expr, Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Assign(LocalId, Expr),
    SetField {
        owner: String,
        name: String,
        ty: TypeRef,
        target: Expr,
        value: Expr,
    },
    /// Evaluate for effect; a produced value is discarded.
    Eval(Expr),
    If {
        cond: Cond,
        then: Vec<Stmt>,
        otherwise: Vec<Stmt>,
    },
    /// Integer switch without fall-through.
    Switch {
        key: Expr,
        cases: Vec<(i32, Vec<Stmt>)>,
        default: Vec<Stmt>,
    },
    Throw(Expr),
    Return(Option<Expr>),
    Try(TryRegion),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TryRegion {
    pub body: Vec<Stmt>,
    pub handlers: Vec<Handler>,
    pub exit: Option<ExitRegion>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Handler {
    /// Caught class; `None` catches everything.
    pub catch: Option<String>,
    pub binding: LocalId,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExitRegion {
    /// Receives the failure in flight, or null on normal and return paths.
    pub in_flight: Option<LocalId>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LocalDecl {
    pub name: String,
    pub ty: TypeRef,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Body {
    pub locals: Vec<LocalDecl>,
    pub stmts: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodDecl {
    pub name: String,
    pub params: Vec<TypeRef>,
    pub ret: TypeRef,
    pub throws: Vec<TypeRef>,
    pub access: u16,
    pub body: Option<Body>,
    pub dispatch_id: Option<DispatchId>,
}

impl MethodDecl {
    pub fn new(name: impl Into<String>, params: Vec<TypeRef>, ret: TypeRef) -> Self {
        Self {
            name: name.into(),
            params,
            ret,
            throws: Vec::new(),
            access: access_flags::ACC_PUBLIC,
            body: None,
            dispatch_id: None,
        }
    }

    pub fn with_body(mut self, body: Body) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_throws(mut self, throws: Vec<TypeRef>) -> Self {
        self.throws = throws;
        self
    }

    pub fn with_access(mut self, access: u16) -> Self {
        self.access = access;
        self
    }

    pub fn is_static(&self) -> bool {
        self.access & access_flags::ACC_STATIC != 0
    }

    pub fn descriptor(&self) -> String {
        crate::codegen::descriptor::method_descriptor(&self.params, &self.ret)
    }

    /// Static type of `expr` inside this method of `unit`.
    pub fn type_of(&self, unit: &str, expr: &Expr) -> TypeRef {
        match expr {
            Expr::Const(c) => match c {
                Constant::Null => TypeRef::object(),
                Constant::Bool(_) => TypeRef::prim(Primitive::Boolean),
                Constant::Int(_) => TypeRef::prim(Primitive::Int),
                Constant::Long(_) => TypeRef::prim(Primitive::Long),
                Constant::Float(_) => TypeRef::prim(Primitive::Float),
                Constant::Double(_) => TypeRef::prim(Primitive::Double),
                Constant::Str(_) => TypeRef::string(),
            },
            Expr::Local(id) => self
                .body
                .as_ref()
                .and_then(|b| b.locals.get(*id))
                .map(|l| l.ty.clone())
                .unwrap_or_else(TypeRef::object),
            Expr::This => TypeRef::new(unit),
            Expr::Arg(i) => self.params.get(*i).cloned().unwrap_or_else(TypeRef::object),
            Expr::GetField { ty, .. } => ty.clone(),
            Expr::New { class, .. } => TypeRef::new(class.clone()),
            Expr::NewArray(element, _) => TypeRef::array(element.name.clone(), element.array_dims + 1),
            Expr::Index(..) => TypeRef::object(),
            Expr::ClassLiteral(_) => TypeRef::new(crate::consts::CLASS),
            Expr::Box(inner) => match self.type_of(unit, inner).primitive() {
                Some(p) => TypeRef::new(p.box_class()),
                None => self.type_of(unit, inner),
            },
            Expr::Unbox(p, _) => TypeRef::prim(*p),
            Expr::Cast(ty, _) => ty.clone(),
            Expr::Call(call) => call.ret.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDecl {
    pub name: String,
    pub ty: TypeRef,
    pub access: u16,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnitDescription {
    /// Dotted binary name.
    pub name: String,
    pub ancestor: String,
    pub interfaces: Vec<String>,
    pub access: u16,
    pub fields: Vec<FieldDecl>,
    pub methods: Vec<MethodDecl>,
}

impl UnitDescription {
    pub fn new(name: impl Into<String>, ancestor: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ancestor: ancestor.into(),
            interfaces: Vec::new(),
            access: access_flags::ACC_PUBLIC | access_flags::ACC_SUPER,
            fields: Vec::new(),
            methods: Vec::new(),
        }
    }

    pub fn method(&self, name: &str) -> Option<&MethodDecl> {
        self.methods.iter().find(|m| m.name == name)
    }

    pub fn find_method(&self, name: &str, params: &[TypeRef]) -> Option<&MethodDecl> {
        self.methods.iter().find(|m| m.name == name && m.params == params)
    }
}

/// Every unit produced by one generation request.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ModuleDescription {
    pub units: Vec<UnitDescription>,
}

/// An emitted, loadable unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadableUnit {
    pub name: String,
    pub bytes: Vec<u8>,
}
