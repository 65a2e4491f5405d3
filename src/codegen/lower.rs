//! Lowering of structured method bodies to bytecode
//!
//! Exit regions are compiled the way javac compiles `finally` without
//! JSR/RET: the exit body is copied onto the normal completion path of the
//! guarded statements and of every handler, onto every `return` that leaves
//! the region, and into a catch-any handler that stores the failure in
//! flight, runs the exit body and rethrows. Every copy is a gap in the
//! protected ranges, so a failure raised by the exit body itself is never
//! caught by the region it belongs to.

use super::bytecode::opcodes::*;
use super::code::{Code, CodeResult, Label};
use super::constpool::{ConstantPool, PoolResult};
use super::descriptor::{class_entry_name, method_descriptor, reflective_name, type_to_descriptor};
use crate::consts;
use crate::ir::{Call, Cond, Constant, Expr, ExitRegion, InvokeKind, MethodDecl, Stmt, TryRegion};
use crate::model::{Primitive, TypeRef};

/// Lowered method body, ready for a Code attribute.
#[derive(Debug)]
pub struct LoweredBody {
    pub code: Code,
}

/// A try region whose guarded statements or handlers are being lowered.
struct ActiveTry {
    exit: Option<ExitRegion>,
    /// Code copied in for exit regions, excluded from this region's ranges.
    gaps: Vec<(usize, usize)>,
}

pub struct Lowering<'a> {
    unit: &'a str,
    method: &'a MethodDecl,
    cp: &'a mut ConstantPool,
    code: Code,
    /// Slot of each declared local.
    slots: Vec<u16>,
    /// Slot of each argument.
    arg_slots: Vec<u16>,
    next_slot: u16,
    tries: Vec<ActiveTry>,
    /// Class constants in `ldc` need major version 49.
    ldc_class: bool,
}

fn pool(r: PoolResult) -> CodeResult<u16> {
    r.map_err(|_| "constant pool overflow".to_string())
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Slot {
    Int,
    Long,
    Float,
    Double,
    Ref,
}

fn slot_kind(ty: &TypeRef) -> Slot {
    match ty.primitive() {
        Some(Primitive::Long) => Slot::Long,
        Some(Primitive::Float) => Slot::Float,
        Some(Primitive::Double) => Slot::Double,
        Some(_) => Slot::Int,
        None => Slot::Ref,
    }
}

fn return_op(ty: &TypeRef) -> u8 {
    if ty.is_void() {
        return RETURN;
    }
    match slot_kind(ty) {
        Slot::Int => IRETURN,
        Slot::Long => LRETURN,
        Slot::Float => FRETURN,
        Slot::Double => DRETURN,
        Slot::Ref => ARETURN,
    }
}

/// `segment` minus every gap inside it.
fn subtract_gaps(segment: (usize, usize), gaps: &[(usize, usize)]) -> Vec<(usize, usize)> {
    let mut sorted: Vec<_> = gaps.iter().copied().filter(|(s, e)| *e > segment.0 && *s < segment.1).collect();
    sorted.sort_unstable();
    let mut out = Vec::new();
    let mut cursor = segment.0;
    for (s, e) in sorted {
        if s > cursor {
            out.push((cursor, s));
        }
        cursor = cursor.max(e);
    }
    if cursor < segment.1 {
        out.push((cursor, segment.1));
    }
    out
}

impl<'a> Lowering<'a> {
    pub fn new(unit: &'a str, method: &'a MethodDecl, cp: &'a mut ConstantPool, major: u16) -> Self {
        let mut next_slot = if method.is_static() { 0 } else { 1 };
        let mut arg_slots = Vec::with_capacity(method.params.len());
        for p in &method.params {
            arg_slots.push(next_slot);
            next_slot += p.slots();
        }
        let mut slots = Vec::new();
        if let Some(body) = &method.body {
            for local in &body.locals {
                slots.push(next_slot);
                next_slot += local.ty.slots().max(1);
            }
        }
        Self {
            unit,
            method,
            cp,
            code: Code::new(next_slot),
            slots,
            arg_slots,
            next_slot,
            tries: Vec::new(),
            ldc_class: major >= 49,
        }
    }

    pub fn lower(mut self) -> CodeResult<LoweredBody> {
        let method = self.method;
        let body = method.body.as_ref().ok_or_else(|| "method has no body".to_string())?;
        self.stmts(&body.stmts)?;
        if self.code.is_alive() {
            if !method.ret.is_void() {
                return Err("control reaches the end of a non-void method".to_string());
            }
            self.code.emitop(RETURN, 0)?;
        }
        self.code.max_locals = self.next_slot;
        self.code.finish()?;
        Ok(LoweredBody { code: self.code })
    }

    fn temp(&mut self, ty: &TypeRef) -> u16 {
        let slot = self.next_slot;
        self.next_slot += ty.slots().max(1);
        slot
    }

    fn local_slot(&self, id: usize) -> CodeResult<u16> {
        self.slots.get(id).copied().ok_or_else(|| format!("local #{id} is not declared"))
    }

    fn local_type(&self, id: usize) -> CodeResult<TypeRef> {
        self.method
            .body
            .as_ref()
            .and_then(|b| b.locals.get(id))
            .map(|l| l.ty.clone())
            .ok_or_else(|| format!("local #{id} is not declared"))
    }

    fn type_of(&self, expr: &Expr) -> TypeRef {
        self.method.type_of(self.unit, expr)
    }

    fn load(&mut self, ty: &TypeRef, slot: u16) -> CodeResult<()> {
        let (op, base) = match slot_kind(ty) {
            Slot::Int => (ILOAD, ILOAD_0),
            Slot::Long => (LLOAD, LLOAD_0),
            Slot::Float => (FLOAD, FLOAD_0),
            Slot::Double => (DLOAD, DLOAD_0),
            Slot::Ref => (ALOAD, ALOAD_0),
        };
        self.code.emit_local(op, base, slot, ty.slots() as i32)
    }

    fn store(&mut self, ty: &TypeRef, slot: u16) -> CodeResult<()> {
        let (op, base) = match slot_kind(ty) {
            Slot::Int => (ISTORE, ISTORE_0),
            Slot::Long => (LSTORE, LSTORE_0),
            Slot::Float => (FSTORE, FSTORE_0),
            Slot::Double => (DSTORE, DSTORE_0),
            Slot::Ref => (ASTORE, ASTORE_0),
        };
        self.code.emit_local(op, base, slot, -(ty.slots() as i32))
    }

    fn push_int(&mut self, value: i32) -> CodeResult<()> {
        match value {
            -1..=5 => self.code.emitop((ICONST_0 as i32 + value) as u8, 1),
            -128..=127 => self.code.emitop1(BIPUSH, value as i8 as u8, 1),
            -32768..=32767 => self.code.emitop2(SIPUSH, value as i16 as u16, 1),
            _ => {
                let idx = pool(self.cp.add_integer(value))?;
                self.ldc(idx, 1)
            }
        }
    }

    fn ldc(&mut self, idx: u16, width: i32) -> CodeResult<()> {
        if width == 2 {
            self.code.emitop2(LDC2_W, idx, 2)
        } else if idx <= u8::MAX as u16 {
            self.code.emitop1(LDC, idx as u8, 1)
        } else {
            self.code.emitop2(LDC_W, idx, 1)
        }
    }

    // ---- statements ----

    fn stmts(&mut self, stmts: &[Stmt]) -> CodeResult<()> {
        for stmt in stmts {
            if !self.code.is_alive() {
                break;
            }
            self.stmt(stmt)?;
        }
        Ok(())
    }

    fn stmt(&mut self, stmt: &Stmt) -> CodeResult<()> {
        match stmt {
            Stmt::Assign(id, expr) => {
                let slot = self.local_slot(*id)?;
                let ty = self.local_type(*id)?;
                self.expr(expr)?;
                self.store(&ty, slot)
            }
            Stmt::SetField { owner, name, ty, target, value } => {
                self.expr(target)?;
                self.expr(value)?;
                let idx = pool(self.cp.add_field_ref(owner, name, &type_to_descriptor(ty)))?;
                self.code.emitop2(PUTFIELD, idx, -(1 + ty.slots() as i32))
            }
            Stmt::Eval(expr) => {
                self.expr(expr)?;
                match self.type_of(expr).slots() {
                    0 => Ok(()),
                    1 => self.code.emitop(POP, -1),
                    _ => self.code.emitop(POP2, -2),
                }
            }
            Stmt::If { cond, then, otherwise } => {
                let else_label = self.code.new_label();
                self.branch_unless(cond, else_label)?;
                self.stmts(then)?;
                if otherwise.is_empty() {
                    self.code.resolve(else_label);
                } else {
                    let end = self.code.new_label();
                    if self.code.is_alive() {
                        self.code.branch(GOTO, end, 0)?;
                    }
                    self.code.resolve(else_label);
                    self.stmts(otherwise)?;
                    self.code.resolve(end);
                }
                Ok(())
            }
            Stmt::Switch { key, cases, default } => {
                self.expr(key)?;
                let end = self.code.new_label();
                let default_label = self.code.new_label();
                let labels: Vec<(i32, Label)> = cases.iter().map(|(k, _)| (*k, self.code.new_label())).collect();
                self.code.lookupswitch(default_label, &labels)?;
                for ((_, label), (_, body)) in labels.iter().zip(cases) {
                    self.code.resolve(*label);
                    self.stmts(body)?;
                    if self.code.is_alive() {
                        self.code.branch(GOTO, end, 0)?;
                    }
                }
                self.code.resolve(default_label);
                self.stmts(default)?;
                self.code.resolve(end);
                Ok(())
            }
            Stmt::Throw(expr) => {
                self.expr(expr)?;
                self.code.emitop(ATHROW, -1)
            }
            Stmt::Return(value) => self.lower_return(value.as_ref()),
            Stmt::Try(region) => self.lower_try(region),
        }
    }

    fn lower_return(&mut self, value: Option<&Expr>) -> CodeResult<()> {
        let ret = self.method.ret.clone();
        let has_exits = self.tries.iter().any(|t| t.exit.is_some());
        if let Some(expr) = value {
            self.expr(expr)?;
            if has_exits {
                let tmp = self.temp(&ret);
                self.store(&ret, tmp)?;
                self.inline_exits()?;
                if !self.code.is_alive() {
                    return Ok(());
                }
                self.load(&ret, tmp)?;
            }
            return self.code.emitop(return_op(&ret), -(ret.slots() as i32));
        }
        if has_exits {
            self.inline_exits()?;
            if !self.code.is_alive() {
                return Ok(());
            }
        }
        self.code.emitop(RETURN, 0)
    }

    /// Copy every enclosing exit body, innermost first, before a `return`.
    fn inline_exits(&mut self) -> CodeResult<()> {
        for k in (0..self.tries.len()).rev() {
            let Some(exit) = self.tries[k].exit.clone() else { continue };
            let start = self.code.cur_cp();
            let inner = self.tries.split_off(k);
            let result = self.exit_copy(&exit);
            self.tries.extend(inner);
            result?;
            let end = self.code.cur_cp();
            for t in &mut self.tries[k..] {
                t.gaps.push((start, end));
            }
            if !self.code.is_alive() {
                break;
            }
        }
        Ok(())
    }

    /// Exit body for a path with no failure in flight.
    fn exit_copy(&mut self, exit: &ExitRegion) -> CodeResult<()> {
        if let Some(id) = exit.in_flight {
            let slot = self.local_slot(id)?;
            self.code.emitop(ACONST_NULL, 1)?;
            self.code.emit_local(ASTORE, ASTORE_0, slot, -1)?;
        }
        self.stmts(&exit.body)
    }

    /// Normal completion of the innermost region: run its exit body with the
    /// region itself no longer active, then leave.
    fn complete_normally(&mut self, after: Label) -> CodeResult<()> {
        if !self.code.is_alive() {
            return Ok(());
        }
        let Some(current) = self.tries.pop() else { return Err("no active try region".to_string()) };
        let result = match &current.exit {
            Some(exit) => self.exit_copy(exit),
            None => Ok(()),
        };
        self.tries.push(current);
        result?;
        if self.code.is_alive() {
            self.code.branch(GOTO, after, 0)?;
        }
        Ok(())
    }

    fn lower_try(&mut self, region: &TryRegion) -> CodeResult<()> {
        let after = self.code.new_label();
        self.tries.push(ActiveTry { exit: region.exit.clone(), gaps: Vec::new() });

        let body_start = self.code.cur_cp();
        self.stmts(&region.body)?;
        let body_end = self.code.cur_cp();
        self.complete_normally(after)?;

        let mut handler_segments = Vec::new();
        let mut handler_pcs = Vec::new();
        for handler in &region.handlers {
            let start = self.code.cur_cp();
            handler_pcs.push(start);
            self.code.entry_point(1)?;
            let slot = self.local_slot(handler.binding)?;
            self.code.emit_local(ASTORE, ASTORE_0, slot, -1)?;
            self.stmts(&handler.body)?;
            handler_segments.push((start, self.code.cur_cp()));
            self.complete_normally(after)?;
        }

        let current = self.tries.pop().ok_or_else(|| "try region stack underflow".to_string())?;
        let body_ranges = subtract_gaps((body_start, body_end), &current.gaps);
        for (handler, pc) in region.handlers.iter().zip(&handler_pcs) {
            let catch_type = match &handler.catch {
                Some(class) => pool(self.cp.add_class(class))?,
                None => 0,
            };
            for (s, e) in &body_ranges {
                self.code.add_catch(*s, *e, *pc, catch_type);
            }
        }

        if let Some(exit) = &region.exit {
            let handler_pc = self.code.cur_cp();
            self.code.entry_point(1)?;
            let slot = match exit.in_flight {
                Some(id) => self.local_slot(id)?,
                None => self.temp(&TypeRef::new(consts::THROWABLE)),
            };
            self.code.emit_local(ASTORE, ASTORE_0, slot, -1)?;
            self.stmts(&exit.body)?;
            if self.code.is_alive() {
                self.code.emit_local(ALOAD, ALOAD_0, slot, 1)?;
                self.code.emitop(ATHROW, -1)?;
            }
            let mut covered = body_ranges.clone();
            for seg in &handler_segments {
                covered.extend(subtract_gaps(*seg, &current.gaps));
            }
            for (s, e) in covered {
                self.code.add_catch(s, e, handler_pc, 0);
            }
        }
        self.code.resolve(after);
        Ok(())
    }

    fn branch_unless(&mut self, cond: &Cond, target: Label) -> CodeResult<()> {
        match cond {
            Cond::True(e) => {
                self.expr(e)?;
                self.code.branch(IFEQ, target, -1)
            }
            Cond::False(e) => {
                self.expr(e)?;
                self.code.branch(IFNE, target, -1)
            }
            Cond::Null(e) => {
                self.expr(e)?;
                self.code.branch(IFNONNULL, target, -1)
            }
            Cond::NotNull(e) => {
                self.expr(e)?;
                self.code.branch(IFNULL, target, -1)
            }
            Cond::InstanceOf(e, class) => {
                self.expr(e)?;
                let idx = pool(self.cp.add_class(class))?;
                self.code.emitop2(INSTANCEOF, idx, 0)?;
                self.code.branch(IFEQ, target, -1)
            }
            Cond::Same(a, b) => {
                self.expr(a)?;
                self.expr(b)?;
                self.code.branch(IF_ACMPNE, target, -2)
            }
        }
    }

    // ---- expressions ----

    fn expr(&mut self, expr: &Expr) -> CodeResult<()> {
        match expr {
            Expr::Const(c) => self.constant(c),
            Expr::Local(id) => {
                let slot = self.local_slot(*id)?;
                let ty = self.local_type(*id)?;
                self.load(&ty, slot)
            }
            Expr::This => {
                if self.method.is_static() {
                    return Err("'this' used in static method".to_string());
                }
                self.code.emitop(ALOAD_0, 1)
            }
            Expr::Arg(i) => {
                let slot = *self.arg_slots.get(*i).ok_or_else(|| format!("argument #{i} out of range"))?;
                let ty = self.method.params[*i].clone();
                self.load(&ty, slot)
            }
            Expr::GetField { owner, name, ty, target } => {
                self.expr(target)?;
                let idx = pool(self.cp.add_field_ref(owner, name, &type_to_descriptor(ty)))?;
                self.code.emitop2(GETFIELD, idx, ty.slots() as i32 - 1)
            }
            Expr::New { class, params, args } => {
                let idx = pool(self.cp.add_class(class))?;
                self.code.emitop2(NEW, idx, 1)?;
                self.code.emitop(DUP, 1)?;
                for a in args {
                    self.expr(a)?;
                }
                let desc = method_descriptor(params, &TypeRef::void());
                let init = pool(self.cp.add_method_ref(class, "<init>", &desc))?;
                let arg_slots: i32 = params.iter().map(|p| p.slots() as i32).sum();
                self.code.emitop2(INVOKESPECIAL, init, -(arg_slots + 1))
            }
            Expr::NewArray(element, items) => {
                self.push_int(items.len() as i32)?;
                let idx = pool(self.cp.add_class(&class_entry_name(element)))?;
                self.code.emitop2(ANEWARRAY, idx, 0)?;
                for (i, item) in items.iter().enumerate() {
                    if self.type_of(item).primitive().is_some() {
                        return Err(format!("array element #{i} must be boxed"));
                    }
                    self.code.emitop(DUP, 1)?;
                    self.push_int(i as i32)?;
                    self.expr(item)?;
                    self.code.emitop(AASTORE, -3)?;
                }
                Ok(())
            }
            Expr::Index(array, index) => {
                self.expr(array)?;
                self.push_int(*index)?;
                self.code.emitop(AALOAD, -1)
            }
            Expr::ClassLiteral(ty) => self.class_literal(ty),
            Expr::Box(inner) => {
                self.expr(inner)?;
                match self.type_of(inner).primitive() {
                    Some(p) => {
                        let desc = format!("({}){}", p.descriptor(), type_to_descriptor(&TypeRef::new(p.box_class())));
                        let idx = pool(self.cp.add_method_ref(p.box_class(), "valueOf", &desc))?;
                        self.code.emitop2(INVOKESTATIC, idx, 1 - p.slots() as i32)
                    }
                    None => Ok(()),
                }
            }
            Expr::Unbox(p, inner) => {
                self.expr(inner)?;
                if !self.type_of(inner).is_class(p.box_class()) {
                    let idx = pool(self.cp.add_class(p.box_class()))?;
                    self.code.emitop2(CHECKCAST, idx, 0)?;
                }
                let desc = format!("(){}", p.descriptor());
                let idx = pool(self.cp.add_method_ref(p.box_class(), p.unbox_method(), &desc))?;
                self.code.emitop2(INVOKEVIRTUAL, idx, p.slots() as i32 - 1)
            }
            Expr::Cast(ty, inner) => {
                self.expr(inner)?;
                let from = self.type_of(inner);
                if &from == ty {
                    return Ok(());
                }
                if !ty.is_reference() || !from.is_reference() {
                    return Err(format!("cannot cast {from} to {ty}"));
                }
                if ty.is_class(consts::OBJECT) {
                    return Ok(());
                }
                let idx = pool(self.cp.add_class(&class_entry_name(ty)))?;
                self.code.emitop2(CHECKCAST, idx, 0)
            }
            Expr::Call(call) => self.call(call),
        }
    }

    fn constant(&mut self, c: &Constant) -> CodeResult<()> {
        match c {
            Constant::Null => self.code.emitop(ACONST_NULL, 1),
            Constant::Bool(b) => self.push_int(*b as i32),
            Constant::Int(v) => self.push_int(*v),
            Constant::Long(v) if *v == 0 || *v == 1 => self.code.emitop(LCONST_0 + *v as u8, 2),
            Constant::Long(v) => {
                let idx = pool(self.cp.add_long(*v))?;
                self.ldc(idx, 2)
            }
            Constant::Float(v) if v.to_bits() == 0 || *v == 1.0 || *v == 2.0 => {
                self.code.emitop(FCONST_0 + *v as u8, 1)
            }
            Constant::Float(v) => {
                let idx = pool(self.cp.add_float(*v))?;
                self.ldc(idx, 1)
            }
            Constant::Double(v) if v.to_bits() == 0 || *v == 1.0 => self.code.emitop(DCONST_0 + *v as u8, 2),
            Constant::Double(v) => {
                let idx = pool(self.cp.add_double(*v))?;
                self.ldc(idx, 2)
            }
            Constant::Str(s) => {
                let idx = pool(self.cp.add_string(s))?;
                self.ldc(idx, 1)
            }
        }
    }

    fn class_literal(&mut self, ty: &TypeRef) -> CodeResult<()> {
        let class_desc = type_to_descriptor(&TypeRef::new(consts::CLASS));
        if let Some(p) = ty.primitive() {
            let idx = pool(self.cp.add_field_ref(p.box_class(), "TYPE", &class_desc))?;
            return self.code.emitop2(GETSTATIC, idx, 1);
        }
        if ty.is_void() {
            let idx = pool(self.cp.add_field_ref("java.lang.Void", "TYPE", &class_desc))?;
            return self.code.emitop2(GETSTATIC, idx, 1);
        }
        if self.ldc_class {
            let idx = pool(self.cp.add_class(&class_entry_name(ty)))?;
            return self.ldc(idx, 1);
        }
        let idx = pool(self.cp.add_string(&reflective_name(ty)))?;
        self.ldc(idx, 1)?;
        let desc = format!("(Ljava/lang/String;){class_desc}");
        let for_name = pool(self.cp.add_method_ref(consts::CLASS, "forName", &desc))?;
        self.code.emitop2(INVOKESTATIC, for_name, 0)
    }

    fn call(&mut self, call: &Call) -> CodeResult<()> {
        let has_receiver = call.kind != InvokeKind::Static;
        match (&call.receiver, has_receiver) {
            (Some(r), true) => self.expr(r)?,
            (None, false) => {}
            (None, true) => return Err(format!("call to {} needs a receiver", call.name)),
            (Some(_), false) => return Err(format!("static call to {} has a receiver", call.name)),
        }
        for a in &call.args {
            self.expr(a)?;
        }
        let desc = method_descriptor(&call.params, &call.ret);
        let arg_slots: i32 = call.params.iter().map(|p| p.slots() as i32).sum();
        let delta = call.ret.slots() as i32 - arg_slots - has_receiver as i32;
        match call.kind {
            InvokeKind::Interface => {
                let idx = pool(self.cp.add_interface_method_ref(&call.owner, &call.name, &desc))?;
                self.code.emit_invokeinterface(idx, (arg_slots + 1) as u8, delta)
            }
            kind => {
                let op = match kind {
                    InvokeKind::Virtual => INVOKEVIRTUAL,
                    InvokeKind::Special => INVOKESPECIAL,
                    _ => INVOKESTATIC,
                };
                let idx = pool(self.cp.add_method_ref(&call.owner, &call.name, &desc))?;
                self.code.emitop2(op, idx, delta)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gaps_split_segments() {
        assert_eq!(subtract_gaps((0, 10), &[(3, 5)]), vec![(0, 3), (5, 10)]);
        assert_eq!(subtract_gaps((0, 10), &[(0, 10)]), vec![]);
        assert_eq!(subtract_gaps((4, 8), &[(0, 2), (7, 12)]), vec![(4, 7)]);
    }
}
