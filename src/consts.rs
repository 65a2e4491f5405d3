// Well-known type names, in dotted binary form. The emitter converts them to
// internal form when writing the constant pool.

pub const OBJECT: &str = "java.lang.Object";
pub const STRING: &str = "java.lang.String";
pub const CLASS: &str = "java.lang.Class";
pub const SYSTEM: &str = "java.lang.System";
pub const THROWABLE: &str = "java.lang.Throwable";
pub const EXCEPTION: &str = "java.lang.Exception";
pub const RUNTIME_EXCEPTION: &str = "java.lang.RuntimeException";
pub const ERROR: &str = "java.lang.Error";
pub const IO_EXCEPTION: &str = "java.io.IOException";
pub const SERIALIZABLE: &str = "java.io.Serializable";
pub const EXTERNALIZABLE: &str = "java.io.Externalizable";
pub const REMOTE: &str = "java.rmi.Remote";
pub const REMOTE_EXCEPTION: &str = "java.rmi.RemoteException";
pub const UNEXPECTED_EXCEPTION: &str = "java.rmi.UnexpectedException";
pub const COLLECTION: &str = "java.util.Collection";
pub const ENUMERATION: &str = "java.util.Enumeration";
pub const FUTURE: &str = "java.util.concurrent.Future";
pub const METHOD: &str = "java.lang.reflect.Method";
pub const ITERABLE: &str = "java.lang.Iterable";
pub const NULL_POINTER_EXCEPTION: &str = "java.lang.NullPointerException";
pub const CLASS_CAST_EXCEPTION: &str = "java.lang.ClassCastException";
pub const INDEX_OUT_OF_BOUNDS: &str = "java.lang.ArrayIndexOutOfBoundsException";
pub const ABSTRACT_METHOD_ERROR: &str = "java.lang.AbstractMethodError";
pub const STACK_OVERFLOW_ERROR: &str = "java.lang.StackOverflowError";

// javax.ejb
pub const EJB_OBJECT: &str = "javax.ejb.EJBObject";
pub const EJB_LOCAL_OBJECT: &str = "javax.ejb.EJBLocalObject";
pub const EJB_HOME: &str = "javax.ejb.EJBHome";
pub const EJB_LOCAL_HOME: &str = "javax.ejb.EJBLocalHome";
pub const EJB_EXCEPTION: &str = "javax.ejb.EJBException";
pub const CREATE_EXCEPTION: &str = "javax.ejb.CreateException";
pub const FINDER_EXCEPTION: &str = "javax.ejb.FinderException";
pub const REMOVE_EXCEPTION: &str = "javax.ejb.RemoveException";
pub const RESOURCE_EXCEPTION: &str = "javax.resource.ResourceException";
pub const NO_SUCH_METHOD_EXCEPTION: &str = "java.lang.NoSuchMethodException";
pub const MESSAGE_ENDPOINT: &str = "javax.resource.spi.endpoint.MessageEndpoint";
pub const TIMER: &str = "javax.ejb.Timer";

// Container runtime
pub const EJS_CONTAINER: &str = "com.ibm.ejs.container.EJSContainer";
pub const EJS_WRAPPER_BASE: &str = "com.ibm.ejs.container.EJSWrapperBase";
pub const EJS_WRAPPER: &str = "com.ibm.ejs.container.EJSWrapper";
pub const EJS_LOCAL_WRAPPER: &str = "com.ibm.ejs.container.EJSLocalWrapper";
pub const BUSINESS_LOCAL_WRAPPER: &str = "com.ibm.ejs.container.BusinessLocalWrapper";
pub const BUSINESS_REMOTE_WRAPPER: &str = "com.ibm.ejs.container.BusinessRemoteWrapper";
pub const LOCAL_BEAN_WRAPPER: &str = "com.ibm.ejs.container.LocalBeanWrapper";
pub const DEPLOYED_SUPPORT: &str = "com.ibm.ejs.container.EJSDeployedSupport";
pub const BEAN_O: &str = "com.ibm.ejs.container.BeanO";
pub const EJS_HOME: &str = "com.ibm.ejs.container.EJSHome";
pub const ENTITY_BEAN_O: &str = "com.ibm.ejs.container.EntityBeanO";
pub const CREATE_FAILURE_EXCEPTION: &str = "com.ibm.ejs.container.CreateFailureException";
pub const BEAN_ID: &str = "com.ibm.ejs.container.BeanId";
pub const MESSAGE_ENDPOINT_BASE: &str = "com.ibm.ws.ejbcontainer.mdb.MessageEndpointBase";

// RMI-IIOP / CORBA
pub const CORBA_STUB: &str = "javax.rmi.CORBA.Stub";
pub const CORBA_TIE: &str = "javax.rmi.CORBA.Tie";
pub const CORBA_UTIL: &str = "javax.rmi.CORBA.Util";
pub const PORTABLE_REMOTE_OBJECT: &str = "javax.rmi.PortableRemoteObject";
pub const OBJECT_IMPL: &str = "org.omg.CORBA_2_3.portable.ObjectImpl";
pub const INPUT_STREAM: &str = "org.omg.CORBA_2_3.portable.InputStream";
pub const OUTPUT_STREAM: &str = "org.omg.CORBA_2_3.portable.OutputStream";
pub const PORTABLE_INPUT_STREAM: &str = "org.omg.CORBA.portable.InputStream";
pub const PORTABLE_OUTPUT_STREAM: &str = "org.omg.CORBA.portable.OutputStream";
pub const RESPONSE_HANDLER: &str = "org.omg.CORBA.portable.ResponseHandler";
pub const APPLICATION_EXCEPTION: &str = "org.omg.CORBA.portable.ApplicationException";
pub const REMARSHAL_EXCEPTION: &str = "org.omg.CORBA.portable.RemarshalException";
pub const SERVANT_OBJECT: &str = "org.omg.CORBA.portable.ServantObject";
pub const SYSTEM_EXCEPTION: &str = "org.omg.CORBA.SystemException";
pub const BAD_OPERATION: &str = "org.omg.CORBA.BAD_OPERATION";
pub const MARSHAL: &str = "org.omg.CORBA.MARSHAL";
pub const UNKNOWN_EXCEPTION: &str = "org.omg.CORBA.portable.UnknownException";
pub const CORBA_OBJECT: &str = "org.omg.CORBA.Object";
pub const ORB: &str = "org.omg.CORBA.ORB";

// Generated member names
pub const WRAPPER_BASE_FIELD: &str = "ivWrapperBase";
pub const MANAGED_BEAN_O_FIELD: &str = "ivBeanO";
pub const ENDPOINT_BASE_FIELD: &str = "ivMessageEndpointBase";
pub const CONTAINER_FIELD: &str = "container";
pub const DEPLOYED_SUPPORT_FIELD: &str = "ivEJSDeployedSupport";
pub const TIE_TARGET_FIELD: &str = "target";

pub const NON_PUBLIC_METHOD_MESSAGE: &str =
    "Only public methods of the bean class may be invoked through the no-interface view";

/// Suffix appended to factory implementation methods reached from a local home.
pub const LOCAL_SUFFIX: &str = "_Local";
