use crate::codegen::class::ClassFile;
use crate::codegen::constpool::Constant;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConstantPoolVerifyError {
    #[error("Invalid constant pool index {0}")]
    InvalidConstantPoolIndex(u16),
    #[error("Invalid constant pool index type {0}")]
    InvalidConstantPoolIndexType(u16),
    #[error("Unusable slot at {0} does not follow a long or double")]
    StrayUnusable(u16),
    #[error("Malformed {kind} descriptor '{descriptor}' at {index}")]
    MalformedDescriptor {
        index: u16,
        kind: &'static str,
        descriptor: String,
    },
}

pub type Result<T> = std::result::Result<T, ConstantPoolVerifyError>;

/// Verify the ClassFile ConstantPool
pub fn verify(class_file: &ClassFile) -> Result<()> {
    verify_slots(class_file)?;
    verify_constant_indexes(class_file)?;
    Ok(())
}

fn verify_slots(class_file: &ClassFile) -> Result<()> {
    let mut previous_wide = false;
    for (index, constant) in class_file.constant_pool.entries() {
        match constant {
            Constant::Unusable if !previous_wide => return Err(ConstantPoolVerifyError::StrayUnusable(index)),
            _ => {}
        }
        previous_wide = matches!(constant, Constant::Long(_) | Constant::Double(_));
    }
    Ok(())
}

fn expect(class_file: &ClassFile, owner: u16, target: u16, ok: fn(&Constant) -> bool) -> Result<()> {
    match class_file.constant_pool.get(target) {
        Some(c) if ok(c) => Ok(()),
        None => Err(ConstantPoolVerifyError::InvalidConstantPoolIndex(owner)),
        _ => Err(ConstantPoolVerifyError::InvalidConstantPoolIndexType(owner)),
    }
}

fn is_utf8(c: &Constant) -> bool {
    matches!(c, Constant::Utf8(_))
}

fn verify_constant_indexes(class_file: &ClassFile) -> Result<()> {
    let pool = &class_file.constant_pool;
    for (index, constant) in pool.entries() {
        match constant {
            Constant::Class(name) | Constant::String(name) => expect(class_file, index, *name, is_utf8)?,
            Constant::FieldRef(class, nat)
            | Constant::MethodRef(class, nat)
            | Constant::InterfaceMethodRef(class, nat) => {
                expect(class_file, index, *class, |c| matches!(c, Constant::Class(_)))?;
                expect(class_file, index, *nat, |c| matches!(c, Constant::NameAndType(..)))?;
                if let Some(Constant::NameAndType(_, desc)) = pool.get(*nat) {
                    let descriptor = pool.utf8(*desc).unwrap_or_default();
                    let (kind, valid) = match constant {
                        Constant::FieldRef(..) => ("field", is_field_descriptor(descriptor)),
                        _ => ("method", is_method_descriptor(descriptor)),
                    };
                    if !valid {
                        return Err(ConstantPoolVerifyError::MalformedDescriptor {
                            index,
                            kind,
                            descriptor: descriptor.to_string(),
                        });
                    }
                }
            }
            Constant::NameAndType(name, desc) => {
                expect(class_file, index, *name, is_utf8)?;
                expect(class_file, index, *desc, is_utf8)?;
            }
            _ => {}
        }
    }
    Ok(())
}

/// Length of the field type at the start of `d`, if it is one.
fn field_type_len(d: &str) -> Option<usize> {
    let bytes = d.as_bytes();
    let mut i = 0;
    while bytes.get(i) == Some(&b'[') {
        i += 1;
    }
    match bytes.get(i)? {
        b'B' | b'C' | b'D' | b'F' | b'I' | b'J' | b'S' | b'Z' => Some(i + 1),
        b'L' => {
            let end = d[i..].find(';')?;
            (end > 1).then_some(i + end + 1)
        }
        _ => None,
    }
}

pub fn is_field_descriptor(d: &str) -> bool {
    field_type_len(d) == Some(d.len())
}

pub fn is_method_descriptor(d: &str) -> bool {
    let Some(mut rest) = d.strip_prefix('(') else { return false };
    while !rest.starts_with(')') {
        match field_type_len(rest) {
            Some(n) => rest = &rest[n..],
            None => return false,
        }
    }
    let ret = &rest[1..];
    ret == "V" || is_field_descriptor(ret)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_shapes() {
        assert!(is_method_descriptor("(I[Ljava/lang/String;J)V"));
        assert!(is_method_descriptor("()Ljava/lang/Object;"));
        assert!(!is_method_descriptor("(L;)V"));
        assert!(!is_method_descriptor("(I"));
        assert!(is_field_descriptor("[[D"));
        assert!(!is_field_descriptor("V"));
    }
}
