//! Builds the ordered method chain for one dispatch (§4.3-4.5).

use rustc_hash::FxHashSet;
use smallvec::SmallVec;

use crate::foundation::Foundation;
use crate::graph::{Class, ClassId, Lang, Method, MethodBody, Object, ObjectId, Visibility};
use crate::linearize::ensure_hierarchy;
use crate::symbol::Symbol;

/// What a single step of the chain is allowed to run, and how it was found.
#[derive(Clone)]
pub struct ChainEntry<L: Lang> {
    pub implementation: std::rc::Rc<dyn crate::graph::MethodImpl<L>>,
    pub is_filter: bool,
    pub filter_declarer: Option<ClassId>,
    pub name: Symbol,
    /// `None` when the step resolved to an instance (object-level) method.
    pub declaring_class: Option<ClassId>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContextFlags {
    pub public_method: bool,
    pub private_method: bool,
    pub constructor: bool,
    pub destructor: bool,
    pub filter_handling: bool,
    pub unknown_method: bool,
}

/// One built call chain, ready to be driven by an invoker.
///
/// Deliberately carries no cursor/index of its own: the same context may be
/// shared (via the cache, or a recursive self-dispatch that hits the same
/// cache slot) while a previous invocation of it is still in progress, so
/// the position within the chain lives in a per-invocation cursor in the
/// `objsys-invoke` crate instead.
pub struct CallContext<L: Lang> {
    pub object: ObjectId,
    pub chain: SmallVec<[ChainEntry<L>; 4]>,
    pub flags: ContextFlags,
    /// Number of leading argument slots the invoker should strip before
    /// presenting the argument vector to a method body.
    pub skip: usize,
    /// `-1` (sentinel, [`UNCACHEABLE`]) means this context must never be stashed.
    pub global_epoch: i64,
    pub local_epoch: u64,
}

pub const UNCACHEABLE: i64 = -1;

/// Read-only handle to the currently executing step, threaded into
/// [`MethodImpl::call`](crate::graph::MethodImpl::call) so a method body can
/// implement introspection (`self filter`, `self target`, `self caller`)
/// without reaching back into the cache or chain builder. `objsys-invoke`
/// constructs one of these per step; this crate only defines its shape and
/// the `objectContext*` accessors over it (§6).
#[derive(Clone, Copy)]
pub struct InvocationInfo<'a, L: Lang> {
    pub object: ObjectId,
    pub flags: ContextFlags,
    pub skip: usize,
    pub entry: &'a ChainEntry<L>,
}

/// `objectContextIsFiltering` (§6).
pub fn object_context_is_filtering<L: Lang>(info: &InvocationInfo<'_, L>) -> bool {
    info.entry.is_filter
}

/// `objectContextMethod` (§6).
pub fn object_context_method<L: Lang>(info: &InvocationInfo<'_, L>) -> Symbol {
    info.entry.name
}

/// `objectContextObject` (§6).
pub fn object_context_object<L: Lang>(info: &InvocationInfo<'_, L>) -> ObjectId {
    info.object
}

/// `objectContextSkippedArgs` (§6).
pub fn object_context_skipped_args<L: Lang>(info: &InvocationInfo<'_, L>) -> usize {
    info.skip
}

/// Caller-supplied request driving chain construction.
#[derive(Debug, Clone, Copy, Default)]
pub struct DispatchRequest {
    pub public_only: bool,
    pub allow_private: bool,
}

/// `getContext` minus the cache layer (see [`crate::cache`] for that). Builds
/// a fresh chain for `(object, name)` under `request`, or `None` if the
/// object does not exist.
pub fn build_method_context<L: Lang>(
    foundation: &mut Foundation<L>,
    object: ObjectId,
    name: Symbol,
    request: DispatchRequest,
) -> Option<CallContext<L>> {
    if foundation.objects().get(object).is_none() {
        return None;
    }

    let self_cls = foundation.objects()[object].self_cls;
    ensure_hierarchy(foundation, self_cls);

    let mut builder = Builder {
        foundation,
        chain: SmallVec::new(),
        filter_len: 0,
    };

    let filter_handling_active = builder.foundation.objects()[object].flags.filter_handling;
    let mut flags = ContextFlags {
        public_method: request.public_only,
        private_method: request.allow_private,
        ..Default::default()
    };

    if !filter_handling_active {
        builder.run_filter_phase(object, self_cls, request.allow_private);
    }
    builder.filter_len = builder.chain.len();

    builder.add_simple_chain(object, name, false, None, request);

    let mut global_epoch = builder.foundation.epoch() as i64;
    if builder.chain[builder.filter_len..].is_empty() {
        let unknown = builder.foundation.unknown;
        builder.add_simple_chain(object, unknown, false, None, request);
        flags.unknown_method = true;
        global_epoch = UNCACHEABLE;
    }

    if builder.chain.is_empty() {
        return None;
    }

    let local_epoch = builder.foundation.objects()[object].epoch;
    Some(CallContext {
        object,
        chain: builder.chain,
        flags,
        skip: 2,
        global_epoch,
        local_epoch,
    })
}

/// Builds the chain for a class's constructor or destructor, which are
/// looked up positionally (§4.4) rather than by name. Never cacheable by
/// name since there is no method-name value to stash it on; the host is
/// expected to cache these itself if it wants to, keyed on its own notion
/// of "currently constructing/destroying".
pub fn build_special_context<L: Lang>(
    foundation: &mut Foundation<L>,
    object: ObjectId,
    destructor: bool,
) -> Option<CallContext<L>> {
    if foundation.objects().get(object).is_none() {
        return None;
    }
    let self_cls = foundation.objects()[object].self_cls;

    let mut builder = Builder {
        foundation,
        chain: SmallVec::new(),
        filter_len: 0,
    };
    builder.add_special_class_chain(self_cls, self_cls, destructor);

    if builder.chain.is_empty() {
        return None;
    }

    let flags = ContextFlags {
        constructor: !destructor,
        destructor,
        ..Default::default()
    };
    Some(CallContext {
        object,
        chain: builder.chain,
        flags,
        skip: 1,
        global_epoch: UNCACHEABLE,
        local_epoch: 0,
    })
}

struct Builder<'f, L: Lang> {
    foundation: &'f mut Foundation<L>,
    chain: SmallVec<[ChainEntry<L>; 4]>,
    /// Boundary before which the late-wins dedup scan in
    /// [`Builder::add_method`] does not look; frozen at the end of the
    /// filter phase (zero while filters are still being added, so the same
    /// scan also dedupes filters against each other).
    filter_len: usize,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Gate {
    Unknown,
    Public,
    Protected,
}

impl<'f, L: Lang> Builder<'f, L> {
    fn run_filter_phase(&mut self, object: ObjectId, self_cls: ClassId, allow_private: bool) {
        let mut done = FxHashSet::default();
        let mixins = self.foundation.objects()[object].mixins.clone();
        for mixin in mixins {
            self.add_class_filters(object, mixin, &mut done);
        }
        let instance_filters = self.foundation.objects()[object].filters.clone();
        for name in instance_filters {
            if done.insert(name) {
                let req = DispatchRequest { public_only: false, allow_private };
                self.add_simple_chain(object, name, true, None, req);
            }
        }
        self.add_class_filters(object, self_cls, &mut done);
    }

    /// Recurses into `class.mixins` first, then this class's own filter
    /// names (name-deduped via `done`), then its superclasses (§4.5).
    ///
    /// Filter names are resolved as a simple chain rooted at the dispatching
    /// `object`, not at `class`'s own representative object: a class's
    /// representative object is an instance of the metaclass, so walking its
    /// hierarchy would never reach `class.class_methods` at all.
    fn add_class_filters(&mut self, object: ObjectId, class: ClassId, done: &mut FxHashSet<Symbol>) {
        let Some(data) = self.foundation.classes().get(class) else {
            return;
        };
        let mixins = data.mixins.clone();
        let filters = data.filters.clone();
        let superclasses = data.superclasses.clone();

        for mixin in mixins {
            self.add_class_filters(object, mixin, done);
        }
        for name in filters {
            if done.insert(name) {
                let req = DispatchRequest::default();
                self.add_simple_chain(object, name, true, Some(class), req);
            }
        }
        for superclass in superclasses {
            self.add_class_filters(object, superclass, done);
        }
    }

    /// §4.4: the per-object, per-name walk shared by the core method, every
    /// filter name, and (transitively) every class-level name lookup that
    /// bottoms out at an object.
    fn add_simple_chain(
        &mut self,
        object: ObjectId,
        name: Symbol,
        is_filter: bool,
        filter_declarer: Option<ClassId>,
        request: DispatchRequest,
    ) {
        let mut gate = Gate::Unknown;

        let has_instance_method = self.foundation.objects()[object]
            .methods
            .as_ref()
            .is_some_and(|m| m.contains_key(&name));
        if has_instance_method {
            let public = self.foundation.objects()[object]
                .methods
                .as_ref()
                .unwrap()
                .get(&name)
                .unwrap()
                .visibility
                .is_public();
            if request.public_only && !public {
                return;
            }
            gate = if public { Gate::Public } else { Gate::Protected };
        }

        let self_cls = self.foundation.objects()[object].self_cls;
        let mixins = self.foundation.objects()[object].mixins.clone();
        for mixin in &mixins {
            self.add_class_chain(*mixin, self_cls, name, is_filter, filter_declarer, request, gate);
        }

        let self_cls_mixins = self.foundation.classes()[self_cls].mixins.clone();
        for mixin in &self_cls_mixins {
            self.add_class_chain(*mixin, self_cls, name, is_filter, filter_declarer, request, gate);
        }

        // Transitive mixin propagation: every ancestor's mixins participate
        // as though mixed into `self_cls` directly (§4.4 step 4).
        let ancestry = self.foundation.classes()[self_cls].hierarchy.clone();
        for ancestor in &ancestry {
            let ancestor_mixins = self.foundation.classes()[*ancestor].mixins.clone();
            for mixin in &ancestor_mixins {
                self.add_class_chain(*mixin, self_cls, name, is_filter, filter_declarer, request, gate);
            }
        }

        if has_instance_method {
            let method = self.foundation.objects()[object]
                .methods
                .as_ref()
                .unwrap()
                .get(&name)
                .unwrap()
                .clone();
            self.add_method(&method, is_filter, filter_declarer, request.allow_private, None, self_cls);
        }

        self.add_class_chain(self_cls, self_cls, name, is_filter, filter_declarer, request, gate);
    }

    fn add_class_chain(
        &mut self,
        class: ClassId,
        self_cls: ClassId,
        name: Symbol,
        is_filter: bool,
        filter_declarer: Option<ClassId>,
        request: DispatchRequest,
        mut gate: Gate,
    ) {
        let Some(data) = self.foundation.classes().get(class) else {
            return;
        };

        if let Some(method) = data.class_methods.get(&name) {
            if gate == Gate::Unknown {
                let public = method.visibility.is_public();
                if request.public_only && !public {
                    // Invisible from this class and everything above it.
                    return;
                }
                gate = if public { Gate::Public } else { Gate::Protected };
            }
            let method = method.clone();
            self.add_method(&method, is_filter, filter_declarer, request.allow_private, Some(class), self_cls);
        }

        let superclasses = data.superclasses.clone();
        for superclass in superclasses {
            self.add_class_chain(superclass, self_cls, name, is_filter, filter_declarer, request, gate);
        }
    }

    fn add_special_class_chain(&mut self, class: ClassId, self_cls: ClassId, destructor: bool) {
        let Some(data) = self.foundation.classes().get(class) else {
            return;
        };
        let special = if destructor { &data.destructor } else { &data.constructor };
        if let Some(special) = special {
            let method = special.0.clone();
            self.add_method(&method, false, None, true, None, self_cls);
        }
        let superclasses = data.superclasses.clone();
        for superclass in superclasses {
            self.add_special_class_chain(superclass, self_cls, destructor);
        }
    }

    /// §4.4 "Adding a single method to the chain": drops placeholders and
    /// gated private methods, then applies the late-wins dedup.
    fn add_method(
        &mut self,
        method: &Method<L>,
        is_filter: bool,
        filter_declarer: Option<ClassId>,
        allow_private: bool,
        declaring_class: Option<ClassId>,
        self_cls: ClassId,
    ) {
        let MethodBody::Implemented(implementation) = &method.body else {
            return;
        };

        // A private method is only visible to the exact class that declared
        // it dispatching on its own instances; reached through a subclass
        // (even directly) it stays invisible unless the caller already has
        // private access. Gated against the dispatching object's own
        // `self_cls`, not the class the lookup happened to find it on.
        if method.visibility.is_private() && !allow_private {
            if let Some(owner) = method.declaring_class {
                if owner != self_cls {
                    return;
                }
            }
        }

        let identity = (declaring_class, method.name);
        if let Some(pos) = self.chain[self.filter_len..]
            .iter()
            .position(|entry| (entry.declaring_class, entry.name) == identity)
        {
            let pos = self.filter_len + pos;
            let entry = self.chain.remove(pos);
            self.chain.push(entry);
            return;
        }

        self.chain.push(ChainEntry {
            implementation: implementation.clone(),
            is_filter,
            filter_declarer,
            name: method.name,
            declaring_class,
        });
    }
}
