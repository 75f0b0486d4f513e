//! Method resolution and call-chain engine for a dynamic, class-based
//! object system: the class graph, its linearization cache, the chain
//! builder, the call-chain cache, the method-name enumerator, and the
//! definition mutators that keep all of the above coherent.
//!
//! The invoker that actually drives a built chain lives in the sibling
//! `objsys-invoke` crate; this crate only builds chains, it does not run
//! them.

pub mod arena;
pub mod cache;
pub mod chain;
pub mod enumerate;
pub mod error;
pub mod foundation;
pub mod graph;
pub mod intern;
pub mod linearize;
pub mod mutate;
pub mod reachability;
pub mod symbol;

pub use cache::{get_context, MethodCache};
pub use chain::{
    build_method_context, build_special_context, object_context_is_filtering, object_context_method,
    object_context_object, object_context_skipped_args, CallContext, ChainEntry, ContextFlags, DispatchRequest,
    InvocationInfo,
};
pub use enumerate::{sorted_method_names, EnumerateRequest};
pub use error::{DispatchError, Result};
pub use foundation::Foundation;
pub use graph::{
    Class, ClassId, ForwardMethod, Lang, Method, MethodBody, MethodImpl, Object, ObjectId, PrefixableArgs,
    SpecialMethod, Visibility,
};
pub use intern::{InternKey, InternTable};
pub use linearize::ensure_hierarchy;
pub use mutate::{
    change_object_class, class_of_object, delete_class_method, delete_object_method, export_class_method,
    export_object_method, install_class_method, install_object_method, new_forward_class_method,
    new_forward_object_method, rename_class_method, rename_object_method, set_class_filters, set_class_mixins,
    set_constructor, set_destructor, set_object_filters, set_object_mixins, set_superclasses,
};
pub use reachability::{is_reachable_via_mixins, is_reachable_via_superclasses};
pub use symbol::Symbol;
