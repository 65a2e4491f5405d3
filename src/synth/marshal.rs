//! Per-type marshalling rules shared by stubs and skeletons

use crate::consts::*;
use crate::ir::Expr;
use crate::model::{Primitive, TypeHierarchy, TypeRef};

/// How a value crosses the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarshalRule {
    /// Written directly with the stream's primitive operation.
    Primitive(Primitive),
    /// `Object`, `Serializable`, `Externalizable`: a self-describing any.
    Any,
    /// A remote interface: by reference, narrowed on the receiving side.
    Reference,
    /// Everything else, including `String` and arrays: by value.
    Value,
}

impl MarshalRule {
    pub fn for_type(ty: &TypeRef, h: &TypeHierarchy) -> Self {
        if let Some(p) = ty.primitive() {
            return MarshalRule::Primitive(p);
        }
        if ty.is_array() {
            return MarshalRule::Value;
        }
        if ty.is_class(OBJECT) || ty.is_class(SERIALIZABLE) || ty.is_class(EXTERNALIZABLE) {
            return MarshalRule::Any;
        }
        if h.is_subtype(&ty.name, REMOTE) {
            return MarshalRule::Reference;
        }
        MarshalRule::Value
    }
}

/// The local fast path must copy this value to keep by-value semantics.
/// Strings are immutable and travel as-is.
pub fn needs_copy(ty: &TypeRef, h: &TypeHierarchy) -> bool {
    match MarshalRule::for_type(ty, h) {
        MarshalRule::Any | MarshalRule::Value => !ty.is_class(STRING),
        MarshalRule::Primitive(_) | MarshalRule::Reference => false,
    }
}

/// Suffix of the stream operation for a primitive: `write_<suffix>`.
pub fn primitive_op(p: Primitive) -> &'static str {
    match p {
        Primitive::Boolean => "boolean",
        Primitive::Char => "wchar",
        Primitive::Byte => "octet",
        Primitive::Short => "short",
        Primitive::Int => "long",
        Primitive::Long => "longlong",
        Primitive::Float => "float",
        Primitive::Double => "double",
    }
}

/// Expression writing `value` of type `ty` onto `out`. Evaluates to void.
pub fn write(ty: &TypeRef, out: Expr, value: Expr, h: &TypeHierarchy) -> Expr {
    let void = TypeRef::void();
    match MarshalRule::for_type(ty, h) {
        MarshalRule::Primitive(p) => Expr::invoke_virtual(
            out,
            PORTABLE_OUTPUT_STREAM,
            &format!("write_{}", primitive_op(p)),
            &[ty.clone()],
            void,
            vec![value],
        ),
        MarshalRule::Any => Expr::invoke_static(
            CORBA_UTIL,
            "writeAny",
            &[TypeRef::new(PORTABLE_OUTPUT_STREAM), TypeRef::object()],
            void,
            vec![out, value],
        ),
        MarshalRule::Reference => Expr::invoke_static(
            CORBA_UTIL,
            "writeRemoteObject",
            &[TypeRef::new(PORTABLE_OUTPUT_STREAM), TypeRef::object()],
            void,
            vec![out, value],
        ),
        MarshalRule::Value => Expr::invoke_virtual(
            out,
            OUTPUT_STREAM,
            "write_value",
            &[TypeRef::new(SERIALIZABLE), TypeRef::new(CLASS)],
            void,
            vec![Expr::cast(TypeRef::new(SERIALIZABLE), value), Expr::ClassLiteral(ty.clone())],
        ),
    }
}

/// Expression reading a value of type `ty` from `input`, typed `ty`.
pub fn read(ty: &TypeRef, input: Expr, h: &TypeHierarchy) -> Expr {
    match MarshalRule::for_type(ty, h) {
        MarshalRule::Primitive(p) => Expr::invoke_virtual(
            input,
            PORTABLE_INPUT_STREAM,
            &format!("read_{}", primitive_op(p)),
            &[],
            ty.clone(),
            vec![],
        ),
        MarshalRule::Any => {
            let any = Expr::invoke_static(
                CORBA_UTIL,
                "readAny",
                &[TypeRef::new(PORTABLE_INPUT_STREAM)],
                TypeRef::object(),
                vec![input],
            );
            super::from_object(any, ty)
        }
        MarshalRule::Reference => {
            let object =
                Expr::invoke_virtual(input, PORTABLE_INPUT_STREAM, "read_Object", &[], TypeRef::new(CORBA_OBJECT), vec![]);
            let narrowed = Expr::invoke_static(
                PORTABLE_REMOTE_OBJECT,
                "narrow",
                &[TypeRef::object(), TypeRef::new(CLASS)],
                TypeRef::object(),
                vec![object, Expr::ClassLiteral(ty.clone())],
            );
            Expr::cast(ty.clone(), narrowed)
        }
        MarshalRule::Value => {
            let value = Expr::invoke_virtual(
                input,
                INPUT_STREAM,
                "read_value",
                &[TypeRef::new(CLASS)],
                TypeRef::new(SERIALIZABLE),
                vec![Expr::ClassLiteral(ty.clone())],
            );
            Expr::cast(ty.clone(), value)
        }
    }
}

/// `Util.copyObject(value, orb)`, typed `Object`.
pub fn copy_object(value: Expr, orb: Expr) -> Expr {
    Expr::invoke_static(
        CORBA_UTIL,
        "copyObject",
        &[TypeRef::object(), TypeRef::new(ORB)],
        TypeRef::object(),
        vec![value, orb],
    )
}

/// `Util.copyObjects(values, orb)`, typed `Object[]`.
pub fn copy_objects(values: Expr, orb: Expr) -> Expr {
    let array = TypeRef::array(OBJECT, 1);
    Expr::invoke_static(
        CORBA_UTIL,
        "copyObjects",
        &[array.clone(), TypeRef::new(ORB)],
        array,
        vec![values, orb],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ClassInfo;

    #[test]
    fn rules_by_type() {
        let h = TypeHierarchy::with_classes([
            ClassInfo::interface("acme.Account", &[REMOTE]),
            ClassInfo::class("acme.Item", OBJECT).implementing(&[SERIALIZABLE]),
        ]);
        assert_eq!(MarshalRule::for_type(&TypeRef::new("int"), &h), MarshalRule::Primitive(Primitive::Int));
        assert_eq!(MarshalRule::for_type(&TypeRef::object(), &h), MarshalRule::Any);
        assert_eq!(MarshalRule::for_type(&TypeRef::new("acme.Account"), &h), MarshalRule::Reference);
        assert_eq!(MarshalRule::for_type(&TypeRef::new("acme.Item"), &h), MarshalRule::Value);
        assert_eq!(MarshalRule::for_type(&TypeRef::array("acme.Account", 1), &h), MarshalRule::Value);
        assert_eq!(MarshalRule::for_type(&TypeRef::string(), &h), MarshalRule::Value);
    }

    #[test]
    fn copies_skip_immutable_and_remote_values() {
        let h = TypeHierarchy::with_classes([ClassInfo::interface("acme.Account", &[REMOTE])]);
        assert!(!needs_copy(&TypeRef::string(), &h));
        assert!(!needs_copy(&TypeRef::new("long"), &h));
        assert!(!needs_copy(&TypeRef::new("acme.Account"), &h));
        assert!(needs_copy(&TypeRef::new("acme.Item"), &h));
        assert!(needs_copy(&TypeRef::object(), &h));
    }

    #[test]
    fn primitive_stream_operations() {
        let h = TypeHierarchy::builtin();
        let Expr::Call(call) = write(&TypeRef::new("long"), Expr::Arg(0), Expr::Arg(1), h) else {
            panic!("expected a call")
        };
        assert_eq!(call.name, "write_longlong");
        let Expr::Call(call) = read(&TypeRef::new("char"), Expr::Arg(0), h) else { panic!("expected a call") };
        assert_eq!(call.name, "read_wchar");
    }
}
