use super::{ObjectRef, Runtime, Thrown, Value};
use crate::consts::*;
use crate::ir::{Call, Cond, Expr, InvokeKind, MethodDecl, Stmt, TryRegion, UnitDescription};
use crate::model::TypeRef;
use crate::naming::java_string_hash;

/// Nested calls on `this` before the interpreter gives up.
const MAX_DEPTH: usize = 64;

enum Flow {
    Normal,
    Return(Value),
}

struct Frame {
    args: Vec<Value>,
    locals: Vec<Value>,
}

/// Executes the methods of one unit.
///
/// Calls, field accesses and object creation go to the [`Runtime`], except
/// calls on `this` that the unit itself declares (super calls excluded) and
/// `String.hashCode` / `String.equals`.
pub struct Interpreter<'a> {
    unit: &'a UnitDescription,
    runtime: &'a mut dyn Runtime,
    this: ObjectRef,
    depth: usize,
}

impl<'a> Interpreter<'a> {
    pub fn new(unit: &'a UnitDescription, runtime: &'a mut dyn Runtime) -> Self {
        let this = runtime.allocate(&unit.name);
        Self::with_this(unit, runtime, this)
    }

    /// Interpret on behalf of an existing instance of the unit.
    pub fn with_this(unit: &'a UnitDescription, runtime: &'a mut dyn Runtime, this: ObjectRef) -> Self {
        Self { unit, runtime, this, depth: 0 }
    }

    pub fn this(&self) -> &ObjectRef {
        &self.this
    }

    /// Run the first method named `name` that has a body.
    pub fn call(&mut self, name: &str, args: Vec<Value>) -> Result<Value, Thrown> {
        let unit: &'a UnitDescription = self.unit;
        match unit.methods.iter().find(|m| m.name == name && m.body.is_some()) {
            Some(method) => self.run(method, args),
            None => Err(self.fail(ABSTRACT_METHOD_ERROR)),
        }
    }

    pub fn run(&mut self, method: &MethodDecl, args: Vec<Value>) -> Result<Value, Thrown> {
        let Some(body) = &method.body else {
            return Err(self.fail(ABSTRACT_METHOD_ERROR));
        };
        if self.depth >= MAX_DEPTH {
            return Err(self.fail(STACK_OVERFLOW_ERROR));
        }
        log::trace!("exec {}.{} ({} args)", self.unit.name, method.name, args.len());
        let mut frame = Frame { args, locals: body.locals.iter().map(|l| Value::zero(&l.ty)).collect() };
        self.depth += 1;
        let flow = self.block(&body.stmts, &mut frame);
        self.depth -= 1;
        match flow? {
            Flow::Return(v) => Ok(v),
            Flow::Normal => Ok(Value::Void),
        }
    }

    /// A fresh failure of `class` created through the runtime.
    fn fail(&mut self, class: &str) -> Thrown {
        match self.runtime.new_object(class, &[], &[]) {
            Ok(Value::Object(o)) => Thrown(o),
            Ok(_) => Thrown(self.runtime.allocate(class)),
            Err(thrown) => thrown,
        }
    }

    fn block(&mut self, stmts: &[Stmt], frame: &mut Frame) -> Result<Flow, Thrown> {
        for stmt in stmts {
            if let Flow::Return(v) = self.stmt(stmt, frame)? {
                return Ok(Flow::Return(v));
            }
        }
        Ok(Flow::Normal)
    }

    fn stmt(&mut self, stmt: &Stmt, frame: &mut Frame) -> Result<Flow, Thrown> {
        match stmt {
            Stmt::Assign(id, expr) => {
                let v = self.eval(expr, frame)?;
                if let Some(slot) = frame.locals.get_mut(*id) {
                    *slot = v;
                }
            }
            Stmt::SetField { owner, name, target, value, .. } => {
                let target = self.eval(target, frame)?;
                let target = self.dereference(target)?;
                let value = self.eval(value, frame)?;
                self.runtime.set_field(&target, owner, name, value)?;
            }
            Stmt::Eval(expr) => {
                self.eval(expr, frame)?;
            }
            Stmt::If { cond, then, otherwise } => {
                let branch = if self.test(cond, frame)? { then } else { otherwise };
                return self.block(branch, frame);
            }
            Stmt::Switch { key, cases, default } => {
                let key = match self.eval(key, frame)? {
                    Value::Int(k) => k,
                    _ => return Err(self.fail(CLASS_CAST_EXCEPTION)),
                };
                let branch = cases.iter().find(|(k, _)| *k == key).map(|(_, body)| body).unwrap_or(default);
                return self.block(branch, frame);
            }
            Stmt::Throw(expr) => {
                return match self.eval(expr, frame)? {
                    Value::Object(o) => Err(Thrown(o)),
                    Value::Null => Err(self.fail(NULL_POINTER_EXCEPTION)),
                    _ => Err(self.fail(CLASS_CAST_EXCEPTION)),
                };
            }
            Stmt::Return(expr) => {
                let v = match expr {
                    Some(e) => self.eval(e, frame)?,
                    None => Value::Void,
                };
                return Ok(Flow::Return(v));
            }
            Stmt::Try(region) => return self.region(region, frame),
        }
        Ok(Flow::Normal)
    }

    /// First matching handler wins. The exit body runs once with the
    /// outcome so far; an exit body that returns or throws replaces it.
    fn region(&mut self, region: &TryRegion, frame: &mut Frame) -> Result<Flow, Thrown> {
        let mut outcome = self.block(&region.body, frame);
        if let Err(thrown) = &outcome {
            let thrown = thrown.clone();
            let handler = region.handlers.iter().find(|h| match &h.catch {
                None => true,
                Some(class) => self.runtime.is_subtype(thrown.class(), class),
            });
            if let Some(handler) = handler {
                if let Some(slot) = frame.locals.get_mut(handler.binding) {
                    *slot = thrown.value();
                }
                outcome = self.block(&handler.body, frame);
            }
        }
        let Some(exit) = &region.exit else {
            return outcome;
        };
        if let Some(id) = exit.in_flight {
            let in_flight = match &outcome {
                Err(thrown) => thrown.value(),
                Ok(_) => Value::Null,
            };
            if let Some(slot) = frame.locals.get_mut(id) {
                *slot = in_flight;
            }
        }
        match self.block(&exit.body, frame)? {
            Flow::Normal => outcome,
            returned => Ok(returned),
        }
    }

    fn test(&mut self, cond: &Cond, frame: &mut Frame) -> Result<bool, Thrown> {
        Ok(match cond {
            Cond::True(e) => self.eval(e, frame)?.truthy(),
            Cond::False(e) => !self.eval(e, frame)?.truthy(),
            Cond::Null(e) => self.eval(e, frame)?.is_null(),
            Cond::NotNull(e) => !self.eval(e, frame)?.is_null(),
            Cond::InstanceOf(e, class) => match self.eval(e, frame)?.class_name() {
                Some(actual) => self.runtime.is_subtype(actual, class),
                None => false,
            },
            Cond::Same(a, b) => {
                let a = self.eval(a, frame)?;
                let b = self.eval(b, frame)?;
                a.same(&b)
            }
        })
    }

    fn eval_all(&mut self, exprs: &[Expr], frame: &mut Frame) -> Result<Vec<Value>, Thrown> {
        exprs.iter().map(|e| self.eval(e, frame)).collect()
    }

    fn dereference(&mut self, value: Value) -> Result<ObjectRef, Thrown> {
        match value {
            Value::Object(o) => Ok(o),
            Value::Null => Err(self.fail(NULL_POINTER_EXCEPTION)),
            _ => Err(self.fail(CLASS_CAST_EXCEPTION)),
        }
    }

    fn eval(&mut self, expr: &Expr, frame: &mut Frame) -> Result<Value, Thrown> {
        match expr {
            Expr::Const(c) => Ok(Value::from(c)),
            Expr::Local(id) => Ok(frame.locals.get(*id).cloned().unwrap_or(Value::Null)),
            Expr::This => Ok(Value::Object(self.this.clone())),
            Expr::Arg(i) => Ok(frame.args.get(*i).cloned().unwrap_or(Value::Null)),
            Expr::GetField { owner, name, ty, target } => {
                let target = self.eval(target, frame)?;
                let target = self.dereference(target)?;
                self.runtime.get_field(&target, owner, name, ty)
            }
            Expr::New { class, params, args } => {
                let args = self.eval_all(args, frame)?;
                self.runtime.new_object(class, params, &args)
            }
            Expr::NewArray(_, items) => Ok(Value::Array(self.eval_all(items, frame)?)),
            Expr::Index(array, index) => match self.eval(array, frame)? {
                Value::Array(items) => match usize::try_from(*index).ok().and_then(|i| items.get(i)) {
                    Some(v) => Ok(v.clone()),
                    None => Err(self.fail(INDEX_OUT_OF_BOUNDS)),
                },
                Value::Null => Err(self.fail(NULL_POINTER_EXCEPTION)),
                _ => Err(self.fail(CLASS_CAST_EXCEPTION)),
            },
            Expr::ClassLiteral(ty) => Ok(Value::Class(ty.clone())),
            Expr::Box(inner) => self.eval(inner, frame),
            // Opaque objects made up by a runtime unbox to zero.
            Expr::Unbox(p, inner) => match self.eval(inner, frame)? {
                Value::Null => Err(self.fail(NULL_POINTER_EXCEPTION)),
                v if v.is_primitive() => Ok(v),
                _ => Ok(Value::zero(&TypeRef::prim(*p))),
            },
            Expr::Cast(ty, inner) => {
                let v = self.eval(inner, frame)?;
                self.cast(v, ty)
            }
            Expr::Call(call) => self.invoke(call, frame),
        }
    }

    /// Objects only know the type they were made up as, so a downcast
    /// narrows them instead of failing.
    fn cast(&mut self, value: Value, ty: &TypeRef) -> Result<Value, Thrown> {
        match value {
            Value::Object(o) if !ty.is_array() => {
                if self.runtime.is_subtype(&o.class, &ty.name) {
                    Ok(Value::Object(o))
                } else if self.runtime.is_subtype(&ty.name, &o.class) {
                    Ok(Value::Object(ObjectRef { id: o.id, class: ty.name.clone() }))
                } else {
                    Err(self.fail(CLASS_CAST_EXCEPTION))
                }
            }
            other => Ok(other),
        }
    }

    fn own_method(&self, call: &Call) -> Option<&'a MethodDecl> {
        let unit: &'a UnitDescription = self.unit;
        if call.kind == InvokeKind::Special && call.owner != unit.name {
            return None;
        }
        unit.find_method(&call.name, &call.params).filter(|m| m.body.is_some())
    }

    fn invoke(&mut self, call: &Call, frame: &mut Frame) -> Result<Value, Thrown> {
        let receiver = match &call.receiver {
            Some(r) => Some(self.eval(r, frame)?),
            None => None,
        };
        let args = self.eval_all(&call.args, frame)?;
        match &receiver {
            Some(Value::Null) => return Err(self.fail(NULL_POINTER_EXCEPTION)),
            Some(Value::Str(s)) => match call.name.as_str() {
                "hashCode" => return Ok(Value::Int(java_string_hash(s))),
                "equals" => return Ok(Value::Bool(args.first() == Some(&Value::Str(s.clone())))),
                _ => {}
            },
            Some(Value::Object(o)) if o.id == self.this.id => {
                if let Some(method) = self.own_method(call) {
                    return self.run(method, args);
                }
            }
            _ => {}
        }
        self.runtime.invoke(call, receiver.as_ref(), &args)
    }
}
