use std::any::Any;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::arena::identifier;
use crate::chain::InvocationInfo;
use crate::symbol::Symbol;

identifier! {
    /// A node in the object graph. Every class also has exactly one
    /// representative object; `ObjectId` covers both plain instances and
    /// those representatives.
    struct ObjectId
}

identifier! {
    /// A node in the class graph.
    struct ClassId
}

/// The host-supplied argument/result shape a method body closes over. The
/// method-body evaluator (out of scope here) provides the concrete type;
/// this crate only ever moves values of these types around, never inspects
/// them.
pub trait Lang: Sized + std::fmt::Debug {
    type Args;
    type Outcome;
}

/// How a method body is actually run. Implemented by the (out-of-scope)
/// method-body evaluator: a script procedure, a forward-to-command shim, or
/// a native callback. `next` calls back into the chain the invoker is
/// driving; a leaf method that never calls it simply ignores the parameter.
/// `info` is the read-only handle to the currently executing step (§6's
/// `objectContext*` accessors) so a method body can implement introspection
/// without reaching back into the cache or chain builder.
pub trait MethodImpl<L: Lang>: std::fmt::Debug {
    fn call(
        &self,
        info: InvocationInfo<'_, L>,
        args: L::Args,
        next: &mut dyn FnMut(L::Args) -> crate::error::Result<L::Outcome>,
    ) -> crate::error::Result<L::Outcome>;
}

/// Bound used only by [`new_forward_object_method`](crate::mutate::new_forward_object_method)
/// and its class-level equivalent: the host's argument type must support
/// having a prefix value list spliced onto the front, mirroring Tcl's
/// `oo::define forward` list-splicing (§6 `newForwardMethod`).
pub trait PrefixableArgs: Sized {
    type Value: Clone;
    fn with_prefix(prefix: &[Self::Value], rest: Self) -> Self;
}

/// A method body that rewrites its arguments by prepending a fixed prefix
/// and hands the result to a host-supplied dispatcher — "call the host
/// command named by the prefix with the prefix prepended to the args"
/// (§6). The core never resolves the prefix to a command itself; that
/// lookup is the out-of-scope command registry's job, plugged in here as
/// `dispatch`.
pub struct ForwardMethod<L: Lang>
where
    L::Args: PrefixableArgs,
{
    prefix: Vec<<L::Args as PrefixableArgs>::Value>,
    dispatch: Box<dyn Fn(L::Args) -> crate::error::Result<L::Outcome>>,
}

impl<L: Lang> ForwardMethod<L>
where
    L::Args: PrefixableArgs,
{
    pub fn new(
        prefix: Vec<<L::Args as PrefixableArgs>::Value>,
        dispatch: Box<dyn Fn(L::Args) -> crate::error::Result<L::Outcome>>,
    ) -> Self {
        Self { prefix, dispatch }
    }
}

impl<L: Lang> std::fmt::Debug for ForwardMethod<L>
where
    L::Args: PrefixableArgs,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ForwardMethod")
            .field("prefix_len", &self.prefix.len())
            .finish()
    }
}

impl<L: Lang> MethodImpl<L> for ForwardMethod<L>
where
    L::Args: PrefixableArgs,
{
    fn call(
        &self,
        _info: InvocationInfo<'_, L>,
        args: L::Args,
        _next: &mut dyn FnMut(L::Args) -> crate::error::Result<L::Outcome>,
    ) -> crate::error::Result<L::Outcome> {
        let rewritten = <L::Args as PrefixableArgs>::with_prefix(&self.prefix, args);
        (self.dispatch)(rewritten)
    }
}

#[derive(Debug, Clone)]
pub enum MethodBody<L: Lang> {
    /// Reference-counted rather than boxed: when a method is added to a
    /// chain it is pinned by cloning this handle into the chain entry, so a
    /// method body that deletes its own record mid-call (§4.9, scenario S6)
    /// does not invalidate the step currently executing.
    Implemented(Rc<dyn MethodImpl<L>>),
    /// Carries only a visibility flag; skipped by the chain builder, but
    /// still consulted to shadow an inherited method's public/private state.
    Placeholder,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Visibility {
    Public,
    Protected,
    Private,
}

impl Visibility {
    pub fn is_public(self) -> bool {
        matches!(self, Visibility::Public)
    }

    pub fn is_private(self) -> bool {
        matches!(self, Visibility::Private)
    }
}

#[derive(Debug, Clone)]
pub struct Method<L: Lang> {
    pub name: Symbol,
    pub body: MethodBody<L>,
    pub visibility: Visibility,
    /// `None` when declared directly on an object rather than a class.
    pub declaring_class: Option<ClassId>,
}

impl<L: Lang> Method<L> {
    pub fn is_placeholder(&self) -> bool {
        matches!(self.body, MethodBody::Placeholder)
    }

    /// `methodIsPublic` (§6).
    pub fn is_public(&self) -> bool {
        self.visibility.is_public()
    }

    /// `methodName` (§6).
    pub fn name(&self) -> Symbol {
        self.name
    }

    /// `methodDeclarerClass` (§6): `None` when declared on an object.
    pub fn declarer_class(&self) -> Option<ClassId> {
        self.declaring_class
    }

    /// `methodDeclarerObject` (§6): the declaring object, when this method
    /// was installed directly on `object` rather than on a class.
    pub fn declarer_object(&self, object: ObjectId) -> Option<ObjectId> {
        self.declaring_class.is_none().then_some(object)
    }
}

/// Slot used for `constructor`/`destructor`, which are looked up positionally
/// rather than by name (§4.4).
#[derive(Debug, Clone)]
pub struct SpecialMethod<L: Lang>(pub Method<L>);

#[derive(Debug, Default, Clone, Copy)]
pub struct ObjectFlags {
    /// Scoped save/restore flag set by the invoker while a filter step of
    /// the chain is executing; suppresses re-injection of filters on a
    /// recursive dispatch against the same object.
    pub filter_handling: bool,
}

pub struct Object<L: Lang> {
    pub self_cls: ClassId,
    /// `Some` iff this object is also a class's representative object.
    pub class_ptr: Option<ClassId>,
    pub methods: Option<IndexMap<Symbol, Method<L>>>,
    pub mixins: Vec<ClassId>,
    pub filters: Vec<Symbol>,
    pub epoch: u64,
    pub creation_epoch: u64,
    pub flags: ObjectFlags,
    /// Opaque per-type extension slot (§6 "class/object get/set metadata").
    /// The core never reads it; it exists purely so the host can stash a
    /// `typeDescriptor`-shaped value alongside an object without a second
    /// side table.
    pub metadata: Option<Box<dyn Any>>,
}

impl<L: Lang> std::fmt::Debug for Object<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Object")
            .field("self_cls", &self.self_cls)
            .field("class_ptr", &self.class_ptr)
            .field("methods", &self.methods)
            .field("mixins", &self.mixins)
            .field("filters", &self.filters)
            .field("epoch", &self.epoch)
            .field("creation_epoch", &self.creation_epoch)
            .field("flags", &self.flags)
            .field("metadata", &self.metadata.is_some())
            .finish()
    }
}

impl<L: Lang> Object<L> {
    pub fn new(self_cls: ClassId, creation_epoch: u64) -> Self {
        Self {
            self_cls,
            class_ptr: None,
            methods: None,
            mixins: Vec::new(),
            filters: Vec::new(),
            epoch: 0,
            creation_epoch,
            flags: ObjectFlags::default(),
            metadata: None,
        }
    }

    pub fn is_class(&self) -> bool {
        self.class_ptr.is_some()
    }
}

pub struct Class<L: Lang> {
    pub this: ObjectId,
    pub superclasses: Vec<ClassId>,
    pub subclasses: Vec<ClassId>,
    pub mixins: Vec<ClassId>,
    pub mixin_subs: Vec<ClassId>,
    pub instances: Vec<ObjectId>,
    pub class_methods: IndexMap<Symbol, Method<L>>,
    pub filters: Vec<Symbol>,
    pub constructor: Option<SpecialMethod<L>>,
    pub destructor: Option<SpecialMethod<L>>,
    /// Cached linearization; see [`crate::linearize`].
    pub hierarchy: Vec<ClassId>,
    pub hierarchy_epoch: u64,
    /// Opaque per-type extension slot (§6), same contract as
    /// [`Object::metadata`].
    pub metadata: Option<Box<dyn Any>>,
}

impl<L: Lang> std::fmt::Debug for Class<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Class")
            .field("this", &self.this)
            .field("superclasses", &self.superclasses)
            .field("subclasses", &self.subclasses)
            .field("mixins", &self.mixins)
            .field("mixin_subs", &self.mixin_subs)
            .field("instances", &self.instances)
            .field("class_methods", &self.class_methods)
            .field("filters", &self.filters)
            .field("hierarchy", &self.hierarchy)
            .field("hierarchy_epoch", &self.hierarchy_epoch)
            .field("metadata", &self.metadata.is_some())
            .finish()
    }
}

impl<L: Lang> Class<L> {
    pub fn new(this: ObjectId) -> Self {
        Self {
            this,
            superclasses: Vec::new(),
            subclasses: Vec::new(),
            mixins: Vec::new(),
            mixin_subs: Vec::new(),
            instances: Vec::new(),
            class_methods: IndexMap::new(),
            filters: Vec::new(),
            constructor: None,
            destructor: None,
            hierarchy: Vec::new(),
            hierarchy_epoch: 0,
            metadata: None,
        }
    }

    /// A class with no dependents may mutate without invalidating anyone
    /// else's cached chains (§4.1).
    pub fn has_no_dependents(&self) -> bool {
        self.subclasses.is_empty() && self.instances.is_empty() && self.mixin_subs.is_empty()
    }
}
