//! Utilities to build method/field descriptors

use crate::model::TypeRef;

/// Internal form of a dotted binary class name.
pub fn internal_name(name: &str) -> String {
    name.replace('.', "/")
}

pub fn type_to_descriptor(ty: &TypeRef) -> String {
    let mut desc = String::new();
    for _ in 0..ty.array_dims {
        desc.push('[');
    }
    let base = match ty.name.as_str() {
        "int" => "I",
        "long" => "J",
        "float" => "F",
        "double" => "D",
        "boolean" => "Z",
        "char" => "C",
        "byte" => "B",
        "short" => "S",
        "void" => "V",
        _ => return format!("{}L{};", desc, internal_name(&ty.name)),
    };
    desc.push_str(base);
    desc
}

pub fn method_descriptor(params: &[TypeRef], ret: &TypeRef) -> String {
    let mut d = String::new();
    d.push('(');
    for p in params {
        d.push_str(&type_to_descriptor(p));
    }
    d.push(')');
    d.push_str(&type_to_descriptor(ret));
    d
}

/// Name stored in a Class constant: the internal name for classes, the
/// descriptor for arrays.
pub fn class_entry_name(ty: &TypeRef) -> String {
    if ty.is_array() {
        type_to_descriptor(ty)
    } else {
        internal_name(&ty.name)
    }
}

/// Name accepted by `Class.forName`: dotted for classes, descriptor with
/// dots for arrays.
pub fn reflective_name(ty: &TypeRef) -> String {
    if ty.is_array() {
        type_to_descriptor(ty).replace('/', ".")
    } else {
        ty.name.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn array_and_object_descriptors() {
        let params = [TypeRef::new("int"), TypeRef::array("java.lang.String", 2)];
        assert_eq!(
            method_descriptor(&params, &TypeRef::void()),
            "(I[[Ljava/lang/String;)V"
        );
        assert_eq!(class_entry_name(&TypeRef::array("long", 1)), "[J");
        assert_eq!(reflective_name(&TypeRef::array("acme.Item", 1)), "[Lacme.Item;");
    }
}
