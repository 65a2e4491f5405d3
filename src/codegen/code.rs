//! Bytecode buffer with stack accounting and forward labels
//!
//! Modelled on javac's `Code`: instructions are appended through `emitop*`,
//! the buffer tracks whether the current position is reachable (`alive`) and
//! the operand stack depth, and jumps to labels not yet placed are patched
//! when the method is finished.

use super::attribute::ExceptionTableEntry;
use super::bytecode::{is_terminal, opcodes};

/// Largest code array a method may carry.
pub const MAX_CODE: usize = 65535;

/// Stack depth bookkeeping (javac State equivalent)
#[derive(Debug, Clone, Default)]
pub struct State {
    pub stacksize: u16,
    pub max_stacksize: u16,
}

impl State {
    fn adjust(&mut self, delta: i32) -> Result<(), String> {
        let next = self.stacksize as i32 + delta;
        if next < 0 {
            return Err(format!("operand stack underflow ({} {delta:+})", self.stacksize));
        }
        self.stacksize = next as u16;
        self.max_stacksize = self.max_stacksize.max(self.stacksize);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Label(usize);

#[derive(Debug, Clone, Copy)]
struct Fixup {
    /// Opcode position the offset is relative to.
    from: usize,
    /// Position of the offset operand.
    at: usize,
    wide: bool,
    label: Label,
}

#[derive(Debug, Clone)]
struct LabelSlot {
    pc: Option<usize>,
    /// Stack depth on entry, recorded by the first jump that targets it.
    depth: Option<u16>,
}

#[derive(Debug, Default)]
pub struct Code {
    pub code: Vec<u8>,
    pub state: State,
    pub max_locals: u16,
    pub exception_table: Vec<ExceptionTableEntry>,
    alive: bool,
    labels: Vec<LabelSlot>,
    fixups: Vec<Fixup>,
}

pub type CodeResult<T> = Result<T, String>;

impl Code {
    pub fn new(max_locals: u16) -> Self {
        Self { max_locals, alive: true, ..Self::default() }
    }

    pub fn cur_cp(&self) -> usize {
        self.code.len()
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    pub fn mark_dead(&mut self) {
        self.alive = false;
    }

    pub fn stacksize(&self) -> u16 {
        self.state.stacksize
    }

    pub fn emit1(&mut self, b: u8) {
        self.code.push(b);
    }

    pub fn emit2(&mut self, v: u16) {
        self.code.extend_from_slice(&v.to_be_bytes());
    }

    pub fn emit4(&mut self, v: i32) {
        self.code.extend_from_slice(&v.to_be_bytes());
    }

    fn after(&mut self, op: u8, delta: i32) -> CodeResult<()> {
        self.state.adjust(delta)?;
        if is_terminal(op) {
            self.alive = false;
            self.state.stacksize = 0;
        }
        Ok(())
    }

    pub fn emitop(&mut self, op: u8, delta: i32) -> CodeResult<()> {
        self.emit1(op);
        self.after(op, delta)
    }

    pub fn emitop1(&mut self, op: u8, operand: u8, delta: i32) -> CodeResult<()> {
        self.emit1(op);
        self.emit1(operand);
        self.after(op, delta)
    }

    pub fn emitop2(&mut self, op: u8, operand: u16, delta: i32) -> CodeResult<()> {
        self.emit1(op);
        self.emit2(operand);
        self.after(op, delta)
    }

    /// `invokeinterface` carries the argument slot count and a zero byte.
    pub fn emit_invokeinterface(&mut self, index: u16, arg_slots: u8, delta: i32) -> CodeResult<()> {
        self.emit1(opcodes::INVOKEINTERFACE);
        self.emit2(index);
        self.emit1(arg_slots);
        self.emit1(0);
        self.after(opcodes::INVOKEINTERFACE, delta)
    }

    /// Local variable load/store, using the short, plain or `wide` form.
    pub fn emit_local(&mut self, op: u8, short_base: u8, slot: u16, delta: i32) -> CodeResult<()> {
        if slot <= 3 {
            self.emitop(short_base + slot as u8, delta)
        } else if slot <= u8::MAX as u16 {
            self.emitop1(op, slot as u8, delta)
        } else {
            self.emit1(opcodes::WIDE);
            self.emitop2(op, slot, delta)
        }
    }

    pub fn new_label(&mut self) -> Label {
        self.labels.push(LabelSlot { pc: None, depth: None });
        Label(self.labels.len() - 1)
    }

    fn note_depth(&mut self, label: Label) -> CodeResult<()> {
        let depth = self.state.stacksize;
        let slot = &mut self.labels[label.0];
        match slot.depth {
            Some(d) if d != depth => Err(format!("inconsistent stack depth at jump target ({d} vs {depth})")),
            _ => {
                slot.depth = Some(depth);
                Ok(())
            }
        }
    }

    /// Conditional or unconditional jump to `label`. `delta` is the stack
    /// effect of the jump instruction itself.
    pub fn branch(&mut self, op: u8, label: Label, delta: i32) -> CodeResult<()> {
        let from = self.cur_cp();
        self.emit1(op);
        self.state.adjust(delta)?;
        self.note_depth(label)?;
        self.fixups.push(Fixup { from, at: self.cur_cp(), wide: false, label });
        self.emit2(0);
        if op == opcodes::GOTO {
            self.alive = false;
            self.state.stacksize = 0;
        }
        Ok(())
    }

    /// `lookupswitch` over sorted keys; pops the key.
    pub fn lookupswitch(&mut self, default: Label, cases: &[(i32, Label)]) -> CodeResult<()> {
        let from = self.cur_cp();
        self.emit1(opcodes::LOOKUPSWITCH);
        while self.cur_cp() % 4 != 0 {
            self.emit1(0);
        }
        self.state.adjust(-1)?;
        self.note_depth(default)?;
        self.fixups.push(Fixup { from, at: self.cur_cp(), wide: true, label: default });
        self.emit4(0);
        self.emit4(cases.len() as i32);
        let mut sorted = cases.to_vec();
        sorted.sort_by_key(|(k, _)| *k);
        for (key, label) in sorted {
            self.emit4(key);
            self.note_depth(label)?;
            self.fixups.push(Fixup { from, at: self.cur_cp(), wide: true, label });
            self.emit4(0);
        }
        self.alive = false;
        self.state.stacksize = 0;
        Ok(())
    }

    /// Place `label` at the current position. Code after it is reachable.
    pub fn resolve(&mut self, label: Label) {
        let pc = self.cur_cp();
        let slot = &mut self.labels[label.0];
        slot.pc = Some(pc);
        if let Some(depth) = slot.depth {
            if !self.alive {
                self.state.stacksize = depth;
            }
            self.alive = true;
        }
    }

    /// Start of an exception handler: reachable with the failure on the stack.
    pub fn entry_point(&mut self, stack: u16) -> CodeResult<()> {
        self.alive = true;
        self.state.stacksize = 0;
        self.state.adjust(stack as i32)
    }

    pub fn add_catch(&mut self, start: usize, end: usize, handler: usize, catch_type: u16) {
        if start < end {
            self.exception_table
                .push(ExceptionTableEntry::new(start as u16, end as u16, handler as u16, catch_type));
        }
    }

    /// Patch jump offsets and hand back the finished code array.
    pub fn finish(&mut self) -> CodeResult<()> {
        if self.code.is_empty() {
            return Err("empty code array".to_string());
        }
        if self.code.len() > MAX_CODE {
            return Err(format!("code array of {} bytes is too large", self.code.len()));
        }
        for fixup in std::mem::take(&mut self.fixups) {
            let target = self.labels[fixup.label.0]
                .pc
                .ok_or_else(|| "jump to a label that was never placed".to_string())?;
            let offset = target as i64 - fixup.from as i64;
            if fixup.wide {
                self.code[fixup.at..fixup.at + 4].copy_from_slice(&(offset as i32).to_be_bytes());
            } else {
                let short = i16::try_from(offset).map_err(|_| format!("branch offset {offset} out of range"))?;
                self.code[fixup.at..fixup.at + 2].copy_from_slice(&short.to_be_bytes());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_jump_is_patched_relative_to_opcode() {
        let mut code = Code::new(1);
        let end = code.new_label();
        code.emitop(opcodes::ACONST_NULL, 1).unwrap();
        code.branch(opcodes::IFNULL, end, -1).unwrap();
        code.emitop(opcodes::ACONST_NULL, 1).unwrap();
        code.emitop(opcodes::ATHROW, -1).unwrap();
        assert!(!code.is_alive());
        code.resolve(end);
        assert!(code.is_alive());
        code.emitop(opcodes::RETURN, 0).unwrap();
        code.finish().unwrap();
        assert_eq!(&code.code[1..4], &[opcodes::IFNULL, 0, 5]);
        assert_eq!(code.state.max_stacksize, 1);
    }

    #[test]
    fn lookupswitch_is_aligned() {
        let mut code = Code::new(1);
        let a = code.new_label();
        let d = code.new_label();
        code.emitop(opcodes::ICONST_0, 1).unwrap();
        code.lookupswitch(d, &[(7, a)]).unwrap();
        assert_eq!(code.cur_cp() % 4, 0);
        code.resolve(a);
        code.emitop(opcodes::RETURN, 0).unwrap();
        code.resolve(d);
        code.emitop(opcodes::RETURN, 0).unwrap();
        code.finish().unwrap();
        // opcode at 1, padding to 4, default offset first
        assert_eq!(i32::from_be_bytes(code.code[4..8].try_into().unwrap()), 21 - 1);
    }

    #[test]
    fn underflow_is_reported() {
        let mut code = Code::new(0);
        assert!(code.emitop(opcodes::POP, -1).is_err());
    }
}
