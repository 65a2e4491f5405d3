//! IDL spellings of Java types: overload suffixes, repository ids, hashes

use crate::consts;
use crate::model::{Primitive, TypeRef};

/// Escape characters outside `[A-Za-z0-9_]` as `U` plus four hex digits
/// per UTF-16 unit, and prefix a leading underscore with `J`.
pub fn escape_identifier(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    if name.starts_with('_') {
        out.push('J');
    }
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() || ch == '_' {
            out.push(ch);
        } else {
            let mut units = [0u16; 2];
            for unit in ch.encode_utf16(&mut units) {
                out.push_str(&format!("U{:04X}", unit));
            }
        }
    }
    out
}

fn primitive_idl(p: Primitive) -> &'static str {
    match p {
        Primitive::Boolean => "boolean",
        Primitive::Char => "wchar",
        Primitive::Byte => "octet",
        Primitive::Short => "short",
        Primitive::Int => "long",
        Primitive::Long => "long_long",
        Primitive::Float => "float",
        Primitive::Double => "double",
    }
}

/// (module path, simple name) of a non-array type, both already escaped.
fn idl_parts(ty: &TypeRef) -> (Option<String>, String) {
    if let Some(p) = ty.primitive() {
        return (None, primitive_idl(p).to_string());
    }
    match ty.name.as_str() {
        consts::STRING => (Some("CORBA".to_string()), "WStringValue".to_string()),
        consts::CLASS => (Some("javax_rmi_CORBA".to_string()), "ClassDesc".to_string()),
        consts::CORBA_OBJECT => (None, "Object".to_string()),
        name => {
            let mut segments: Vec<String> = name.split('.').map(escape_identifier).collect();
            let simple = segments.pop().unwrap_or_default();
            let module = (!segments.is_empty()).then(|| segments.join("_"));
            (module, simple)
        }
    }
}

/// Type name used by overload disambiguation.
///
/// `int` is `long`, `String` is `CORBA_WStringValue`, `acme.Item[][]` is
/// `org_omg_boxedRMI_acme_seq2_Item`.
pub fn idl_type_name(ty: &TypeRef) -> String {
    let (module, simple) = idl_parts(&ty.element());
    if ty.is_array() {
        let mut out = String::from("org_omg_boxedRMI_");
        if let Some(module) = module {
            out.push_str(&module);
            out.push('_');
        }
        out.push_str(&format!("seq{}_{}", ty.array_dims, simple));
        out
    } else {
        match module {
            Some(module) => format!("{module}_{simple}"),
            None => simple,
        }
    }
}

/// Repository id a skeleton writes ahead of an application failure, and
/// that the stub compares against: `IDL:acme/LimitEx:1.0`.
pub fn repository_id(failure: &TypeRef) -> String {
    let simple = failure.simple_name();
    let simple = simple.strip_suffix("Exception").map(|s| format!("{s}Ex")).unwrap_or_else(|| simple.to_string());
    match failure.package() {
        Some(pkg) => format!("IDL:{}/{}:1.0", pkg.replace('.', "/"), simple),
        None => format!("IDL:{simple}:1.0"),
    }
}

/// Type id a stub advertises through `_ids()`: `RMI:acme.Account:0000000000000000`.
pub fn rmi_repository_id(interface: &str) -> String {
    format!("RMI:{interface}:0000000000000000")
}

/// `java.lang.String.hashCode()` of `text`.
pub fn java_string_hash(text: &str) -> i32 {
    text.encode_utf16()
        .fold(0i32, |h, unit| h.wrapping_mul(31).wrapping_add(unit as i32))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stub_type_ids() {
        assert_eq!(rmi_repository_id("acme.Account"), "RMI:acme.Account:0000000000000000");
    }

    #[test]
    fn overload_type_names() {
        assert_eq!(idl_type_name(&TypeRef::new("int")), "long");
        assert_eq!(idl_type_name(&TypeRef::new("long")), "long_long");
        assert_eq!(idl_type_name(&TypeRef::string()), "CORBA_WStringValue");
        assert_eq!(idl_type_name(&TypeRef::new("acme.Item")), "acme_Item");
        assert_eq!(idl_type_name(&TypeRef::array("int", 1)), "org_omg_boxedRMI_seq1_long");
        assert_eq!(idl_type_name(&TypeRef::array(consts::STRING, 1)), "org_omg_boxedRMI_CORBA_seq1_WStringValue");
        assert_eq!(idl_type_name(&TypeRef::array("acme.Item", 2)), "org_omg_boxedRMI_acme_seq2_Item");
    }

    #[test]
    fn escaping() {
        assert_eq!(escape_identifier("a$b"), "aU0024b");
        assert_eq!(escape_identifier("_x"), "J_x");
        assert_eq!(escape_identifier("caf\u{e9}"), "cafU00E9");
    }

    #[test]
    fn repository_ids() {
        assert_eq!(repository_id(&TypeRef::new(consts::CREATE_EXCEPTION)), "IDL:javax/ejb/CreateEx:1.0");
        assert_eq!(repository_id(&TypeRef::new("Oops")), "IDL:Oops:1.0");
    }

    #[test]
    fn string_hash_matches_java() {
        assert_eq!(java_string_hash(""), 0);
        assert_eq!(java_string_hash("a"), 97);
        assert_eq!(java_string_hash("hello"), 99162322);
    }
}
