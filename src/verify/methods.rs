use std::collections::BTreeSet;

use crate::codegen::attribute::CodeAttribute;
use crate::codegen::bytecode::{access_flags, opcodes};
use crate::codegen::class::ClassFile;
use crate::codegen::constpool::Constant;
use crate::codegen::method::MethodInfo;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum MethodVerifyError {
    #[error("Invalid constant pool index {0}")]
    InvalidConstantPoolIndex(u16),
    #[error("Invalid constant pool index type {0}")]
    InvalidConstantPoolIndexType(u16),
    #[error("Method must have Code attribute unless abstract or native")]
    MissingCodeAttribute,
    #[error("Abstract or native method must not have Code attribute")]
    ForbiddenCodeAttribute,
    #[error("Unknown or unsupported opcode 0x{op:02x} at {pc}")]
    UnsupportedOpcode { op: u8, pc: usize },
    #[error("Instruction at {0} runs past the end of the code array")]
    TruncatedInstruction(usize),
    #[error("Jump at {from} targets {to}, which is not an instruction boundary")]
    BadJumpTarget { from: usize, to: i64 },
    #[error("Operand of instruction at {pc} refers to constant {index} of the wrong kind")]
    BadOperand { pc: usize, index: u16 },
    #[error("Exception table entry {0} has an invalid range")]
    BadExceptionRange(usize),
    #[error("Exception table entry {0} catches a non-class constant")]
    BadCatchType(usize),
    #[error("Return opcode does not match descriptor: expected {expected}, found 0x{found:02x}")]
    ReturnMismatch { expected: &'static str, found: u8 },
    #[error("Last instruction falls off the end of the code array")]
    FallsOffEnd,
    #[error("Local slot {slot} exceeds max_locals {max}")]
    LocalOutOfRange { slot: u16, max: u16 },
}

pub type Result<T> = std::result::Result<T, MethodVerifyError>;

/// Verify one method of the class file
pub fn verify_method(class_file: &ClassFile, method: &MethodInfo) -> Result<()> {
    verify_utf8_index(class_file, method.name_index)?;
    verify_utf8_index(class_file, method.descriptor_index)?;
    for &ex in &method.exceptions(&class_file.constant_pool) {
        match class_file.constant_pool.get(ex) {
            Some(Constant::Class(_)) => {}
            None => return Err(MethodVerifyError::InvalidConstantPoolIndex(ex)),
            _ => return Err(MethodVerifyError::InvalidConstantPoolIndexType(ex)),
        }
    }
    verify_code(class_file, method)
}

fn verify_utf8_index(class_file: &ClassFile, index: u16) -> Result<()> {
    match class_file.constant_pool.get(index) {
        Some(Constant::Utf8(_)) => Ok(()),
        None => Err(MethodVerifyError::InvalidConstantPoolIndex(index)),
        _ => Err(MethodVerifyError::InvalidConstantPoolIndexType(index)),
    }
}

fn verify_code(class_file: &ClassFile, method: &MethodInfo) -> Result<()> {
    let bodiless = method.access_flags & (access_flags::ACC_ABSTRACT | access_flags::ACC_NATIVE) != 0;
    let code = method.code(&class_file.constant_pool);
    let code = match (bodiless, code) {
        (true, None) => return Ok(()),
        (true, Some(_)) => return Err(MethodVerifyError::ForbiddenCodeAttribute),
        (false, None) => return Err(MethodVerifyError::MissingCodeAttribute),
        (false, Some(code)) => code,
    };
    let descriptor = class_file.constant_pool.utf8(method.descriptor_index).unwrap_or_default();
    let expected_return = return_opcode(descriptor);
    let starts = walk(class_file, &code, expected_return)?;
    verify_exception_table(class_file, &code, &starts)
}

/// Return opcode matching the descriptor's return type.
fn return_opcode(descriptor: &str) -> (u8, &'static str) {
    let ret = descriptor.rsplit(')').next().unwrap_or("V");
    match ret.as_bytes().first() {
        Some(b'V') => (opcodes::RETURN, "return"),
        Some(b'J') => (opcodes::LRETURN, "lreturn"),
        Some(b'F') => (opcodes::FRETURN, "freturn"),
        Some(b'D') => (opcodes::DRETURN, "dreturn"),
        Some(b'L') | Some(b'[') => (opcodes::ARETURN, "areturn"),
        _ => (opcodes::IRETURN, "ireturn"),
    }
}

fn is_return(op: u8) -> bool {
    (opcodes::IRETURN..=opcodes::RETURN).contains(&op)
}

fn read_u16(code: &[u8], at: usize) -> Option<u16> {
    code.get(at..at + 2).map(|b| u16::from_be_bytes([b[0], b[1]]))
}

fn read_i32(code: &[u8], at: usize) -> Option<i32> {
    code.get(at..at + 4).map(|b| i32::from_be_bytes([b[0], b[1], b[2], b[3]]))
}

/// Constant kinds an instruction operand may name.
#[derive(Clone, Copy)]
enum Operand {
    Loadable,
    Wide,
    Class,
    Field,
    Method,
    InterfaceMethod,
}

impl Operand {
    fn accepts(self, c: &Constant) -> bool {
        match self {
            Operand::Loadable => {
                matches!(c, Constant::Integer(_) | Constant::Float(_) | Constant::String(_) | Constant::Class(_))
            }
            Operand::Wide => matches!(c, Constant::Long(_) | Constant::Double(_)),
            Operand::Class => matches!(c, Constant::Class(_)),
            Operand::Field => matches!(c, Constant::FieldRef(..)),
            Operand::Method => matches!(c, Constant::MethodRef(..)),
            Operand::InterfaceMethod => matches!(c, Constant::InterfaceMethodRef(..)),
        }
    }
}

/// Decode every instruction, checking operands and the return kind.
/// Returns the set of instruction start offsets.
fn walk(class_file: &ClassFile, attr: &CodeAttribute, expected_return: (u8, &'static str)) -> Result<BTreeSet<usize>> {
    use opcodes::*;
    let code = &attr.code;
    let mut starts = BTreeSet::new();
    let mut jumps: Vec<(usize, i64)> = Vec::new();
    let mut pc = 0;
    let mut last = None;
    let truncated = |pc| MethodVerifyError::TruncatedInstruction(pc);
    let check_local = |slot: u16| {
        if slot >= attr.max_locals {
            Err(MethodVerifyError::LocalOutOfRange { slot, max: attr.max_locals })
        } else {
            Ok(())
        }
    };
    let check_cp = |pc: usize, index: u16, kind: Operand| match class_file.constant_pool.get(index) {
        Some(c) if kind.accepts(c) => Ok(()),
        _ => Err(MethodVerifyError::BadOperand { pc, index }),
    };

    while pc < code.len() {
        starts.insert(pc);
        let op = code[pc];
        last = Some(op);
        let len = match op {
            ACONST_NULL..=DCONST_0 | AALOAD | AASTORE | POP | POP2 | DUP | ATHROW => 1,
            IRETURN..=RETURN => {
                if op != expected_return.0 {
                    return Err(MethodVerifyError::ReturnMismatch { expected: expected_return.1, found: op });
                }
                1
            }
            BIPUSH => 2,
            SIPUSH => 3,
            LDC => {
                let index = *code.get(pc + 1).ok_or_else(|| truncated(pc))? as u16;
                check_cp(pc, index, Operand::Loadable)?;
                2
            }
            LDC_W | LDC2_W => {
                let index = read_u16(code, pc + 1).ok_or_else(|| truncated(pc))?;
                check_cp(pc, index, if op == LDC_W { Operand::Loadable } else { Operand::Wide })?;
                3
            }
            ILOAD..=ALOAD | ISTORE..=ASTORE => {
                let slot = *code.get(pc + 1).ok_or_else(|| truncated(pc))? as u16;
                let wide_kind = matches!(op, LLOAD | DLOAD | LSTORE | DSTORE);
                check_local(slot + wide_kind as u16)?;
                2
            }
            ILOAD_0..=0x2d | ISTORE_0..=0x4e => {
                let base = if op >= ISTORE_0 { op - ISTORE_0 } else { op - ILOAD_0 };
                let slot = (base % 4) as u16;
                // lload_n/dload_n occupy two slots
                let wide_kind = matches!(base / 4, 1 | 3);
                check_local(slot + wide_kind as u16)?;
                1
            }
            IFEQ | IFNE | IF_ACMPEQ | IF_ACMPNE | GOTO | IFNULL | IFNONNULL => {
                let raw = read_u16(code, pc + 1).ok_or_else(|| truncated(pc))? as i16;
                jumps.push((pc, pc as i64 + raw as i64));
                3
            }
            LOOKUPSWITCH => {
                let mut at = pc + 1;
                while at % 4 != 0 {
                    at += 1;
                }
                let default = read_i32(code, at).ok_or_else(|| truncated(pc))?;
                jumps.push((pc, pc as i64 + default as i64));
                let pairs = read_i32(code, at + 4).ok_or_else(|| truncated(pc))?;
                if pairs < 0 {
                    return Err(truncated(pc));
                }
                at += 8;
                for _ in 0..pairs {
                    let offset = read_i32(code, at + 4).ok_or_else(|| truncated(pc))?;
                    jumps.push((pc, pc as i64 + offset as i64));
                    at += 8;
                }
                at - pc
            }
            GETSTATIC | GETFIELD | PUTFIELD => {
                let index = read_u16(code, pc + 1).ok_or_else(|| truncated(pc))?;
                check_cp(pc, index, Operand::Field)?;
                3
            }
            INVOKEVIRTUAL | INVOKESPECIAL | INVOKESTATIC => {
                let index = read_u16(code, pc + 1).ok_or_else(|| truncated(pc))?;
                check_cp(pc, index, Operand::Method)?;
                3
            }
            INVOKEINTERFACE => {
                let index = read_u16(code, pc + 1).ok_or_else(|| truncated(pc))?;
                check_cp(pc, index, Operand::InterfaceMethod)?;
                if code.get(pc + 3).copied().unwrap_or(0) == 0 || code.get(pc + 4) != Some(&0) {
                    return Err(MethodVerifyError::BadOperand { pc, index });
                }
                5
            }
            NEW | ANEWARRAY | CHECKCAST | INSTANCEOF => {
                let index = read_u16(code, pc + 1).ok_or_else(|| truncated(pc))?;
                check_cp(pc, index, Operand::Class)?;
                3
            }
            WIDE => {
                let inner = *code.get(pc + 1).ok_or_else(|| truncated(pc))?;
                if !matches!(inner, ILOAD..=ALOAD | ISTORE..=ASTORE) {
                    return Err(MethodVerifyError::UnsupportedOpcode { op: inner, pc: pc + 1 });
                }
                let slot = read_u16(code, pc + 2).ok_or_else(|| truncated(pc))?;
                check_local(slot)?;
                4
            }
            _ => return Err(MethodVerifyError::UnsupportedOpcode { op, pc }),
        };
        if pc + len > code.len() {
            return Err(truncated(pc));
        }
        pc += len;
    }

    for (from, to) in jumps {
        if to < 0 || !starts.contains(&(to as usize)) {
            return Err(MethodVerifyError::BadJumpTarget { from, to });
        }
    }
    match last {
        Some(op) if op == opcodes::GOTO || op == opcodes::ATHROW || op == opcodes::LOOKUPSWITCH || is_return(op) => {
            Ok(starts)
        }
        _ => Err(MethodVerifyError::FallsOffEnd),
    }
}

fn verify_exception_table(class_file: &ClassFile, attr: &CodeAttribute, starts: &BTreeSet<usize>) -> Result<()> {
    let boundary = |pc: u16| starts.contains(&(pc as usize));
    for (i, entry) in attr.exception_table.iter().enumerate() {
        let end_ok = entry.end_pc as usize == attr.code.len() || boundary(entry.end_pc);
        if entry.start_pc >= entry.end_pc || !boundary(entry.start_pc) || !end_ok || !boundary(entry.handler_pc) {
            return Err(MethodVerifyError::BadExceptionRange(i));
        }
        if entry.catch_type != 0
            && !matches!(class_file.constant_pool.get(entry.catch_type), Some(Constant::Class(_)))
        {
            return Err(MethodVerifyError::BadCatchType(i));
        }
    }
    Ok(())
}
