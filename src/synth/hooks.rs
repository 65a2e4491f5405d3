//! Container entry points reached from generated code
//!
//! Each hook is a fixed method reference on a container class. Generated
//! bodies only ever call the container through this table, which keeps the
//! descriptors in one place.

use crate::consts::*;
use crate::ir::Expr;
use crate::model::{TypeRef, WrapperBaseAccess, WrapperKind};

/// A method on a container runtime class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hook {
    pub owner: &'static str,
    pub name: &'static str,
    pub params: &'static [&'static str],
    pub ret: &'static str,
}

impl Hook {
    pub fn param_types(&self) -> Vec<TypeRef> {
        self.params.iter().map(|p| TypeRef::from(*p)).collect()
    }

    pub fn ret_type(&self) -> TypeRef {
        TypeRef::from(self.ret)
    }

    pub fn invoke(&self, receiver: Expr, args: Vec<Expr>) -> Expr {
        Expr::invoke_virtual(receiver, self.owner, self.name, &self.param_types(), self.ret_type(), args)
    }

    pub fn invoke_static(&self, args: Vec<Expr>) -> Expr {
        Expr::invoke_static(self.owner, self.name, &self.param_types(), self.ret_type(), args)
    }

    /// Non-virtual call on `this`, for methods inherited from the ancestor.
    pub fn invoke_inherited(&self, args: Vec<Expr>) -> Expr {
        Expr::invoke_special(Expr::This, self.owner, self.name, &self.param_types(), self.ret_type(), args)
    }
}

const OBJECT_ARRAY: &str = "java.lang.Object[]";

pub const PRE_INVOKE: Hook = Hook {
    owner: EJS_CONTAINER,
    name: "EjbPreInvoke",
    params: &[EJS_WRAPPER_BASE, "int", DEPLOYED_SUPPORT, OBJECT_ARRAY],
    ret: OBJECT,
};

pub const PRE_INVOKE_STATELESS_CREATE: Hook = Hook { name: "EjbPreInvokeForStatelessCreate", ..PRE_INVOKE };

pub const PRE_INVOKE_MANAGED_BEAN: Hook = Hook {
    owner: EJS_CONTAINER,
    name: "EjbPreInvokeForManagedBean",
    params: &[EJS_WRAPPER_BASE, "int", DEPLOYED_SUPPORT, BEAN_O, OBJECT_ARRAY],
    ret: OBJECT,
};

pub const POST_INVOKE: Hook = Hook {
    owner: EJS_CONTAINER,
    name: "postInvoke",
    params: &[EJS_WRAPPER_BASE, "int", DEPLOYED_SUPPORT],
    ret: "void",
};

pub const POST_INVOKE_STATELESS_CREATE: Hook = Hook { name: "EjbPostInvokeForStatelessCreate", ..POST_INVOKE };

pub const FAILURE_CLEANUP: Hook = Hook {
    owner: EJS_CONTAINER,
    name: "failureCleanup",
    params: &[DEPLOYED_SUPPORT],
    ret: "void",
};

/// Runs the interceptor chain. The timer argument is always null here.
pub const INVOKE_CHAIN: Hook = Hook {
    owner: EJS_CONTAINER,
    name: "invoke",
    params: &[DEPLOYED_SUPPORT, TIMER],
    ret: OBJECT,
};

pub const NEEDS_ARGUMENTS: Hook = Hook {
    owner: EJS_CONTAINER,
    name: "doesJaccNeedsEJBArguments",
    params: &[EJS_WRAPPER_BASE],
    ret: "boolean",
};

pub const SCHEDULE_ASYNC: Hook = Hook {
    owner: EJS_CONTAINER,
    name: "scheduleAsynchMethod",
    params: &[EJS_WRAPPER_BASE, "int", OBJECT_ARRAY],
    ret: FUTURE,
};

pub const SET_CHECKED: Hook = Hook {
    owner: DEPLOYED_SUPPORT,
    name: "setCheckedException",
    params: &[EXCEPTION],
    ret: "void",
};

pub const SET_UNCHECKED_REMOTE: Hook = Hook {
    owner: DEPLOYED_SUPPORT,
    name: "setUncheckedException",
    params: &[THROWABLE],
    ret: "void",
};

pub const SET_UNCHECKED_LOCAL: Hook = Hook { name: "setUncheckedLocalException", ..SET_UNCHECKED_REMOTE };

pub const CHECK_STATE: Hook = Hook {
    owner: MESSAGE_ENDPOINT_BASE,
    name: "checkState",
    params: &["int", METHOD, "byte"],
    ret: "void",
};

pub const MDB_PRE_INVOKE: Hook = Hook {
    owner: MESSAGE_ENDPOINT_BASE,
    name: "mdbMethodPreInvoke",
    params: &["int", OBJECT_ARRAY],
    ret: OBJECT,
};

pub const MDB_POST_INVOKE: Hook = Hook {
    owner: MESSAGE_ENDPOINT_BASE,
    name: "mdbMethodPostInvoke",
    params: &[],
    ret: "void",
};

pub const BEFORE_DELIVERY: Hook = Hook {
    owner: MESSAGE_ENDPOINT_BASE,
    name: "beforeDelivery",
    params: &[METHOD],
    ret: "void",
};

pub const AFTER_DELIVERY: Hook = Hook {
    owner: MESSAGE_ENDPOINT_BASE,
    name: "afterDelivery",
    params: &[],
    ret: "void",
};

pub const RELEASE: Hook = Hook {
    owner: MESSAGE_ENDPOINT_BASE,
    name: "release",
    params: &[],
    ret: "void",
};

pub const GET_BEAN_INSTANCE: Hook = Hook {
    owner: BEAN_O,
    name: "getBeanInstance",
    params: &[],
    ret: OBJECT,
};

/// `MessageEndpointBase.checkState` delivery state for a business method.
pub const MDB_BUSINESS_METHOD: i32 = 3;

/// The `EJSWrapperBase` the generated `unit` hands to the container.
pub fn wrapper_base(kind: WrapperKind, unit: &str) -> Expr {
    match kind.wrapper_base() {
        WrapperBaseAccess::This => Expr::This,
        WrapperBaseAccess::Field(name, ty) => Expr::field(unit, name, ty, Expr::This),
    }
}

/// `wrapperBase.container`
pub fn container(kind: WrapperKind, unit: &str) -> Expr {
    Expr::field(EJS_WRAPPER_BASE, CONTAINER_FIELD, EJS_CONTAINER, wrapper_base(kind, unit))
}

/// `wrapperBase.ivEJSDeployedSupport`, the context record endpoints reuse.
pub fn endpoint_support(kind: WrapperKind, unit: &str) -> Expr {
    Expr::field(MESSAGE_ENDPOINT_BASE, DEPLOYED_SUPPORT_FIELD, DEPLOYED_SUPPORT, wrapper_base(kind, unit))
}

/// Unchecked failure recorder for the calling convention.
pub fn set_unchecked(rmi_remote: bool) -> Hook {
    if rmi_remote {
        SET_UNCHECKED_REMOTE
    } else {
        SET_UNCHECKED_LOCAL
    }
}
