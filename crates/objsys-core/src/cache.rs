//! Per-object call-chain cache (§4.3, §3 "CallContext").
//!
//! The original keys a fast path off the method-name value's own internal
//! representation, in addition to a per-object hash slot. That value-stash
//! is a property of the host's string/value objects, which are out of
//! scope here (§1); this cache folds both paths into one per-object slot
//! map and relies on `Rc` sharing for the "three independent holders"
//! refcounting the data model calls for — the cache, an invoking frame, and
//! any other clone all keep the chain alive until the last one drops.

use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::chain::{build_method_context, CallContext, DispatchRequest, UNCACHEABLE};
use crate::foundation::Foundation;
use crate::graph::{Lang, ObjectId};
use crate::symbol::Symbol;

#[derive(Default)]
pub struct MethodCache<L: Lang> {
    slots: FxHashMap<(ObjectId, Symbol), Rc<CallContext<L>>>,
}

impl<L: Lang> MethodCache<L> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops every cached chain for `object`. Called when the object itself
    /// is deleted; the caller is responsible for the epoch bump that
    /// invalidates everyone else's view of it.
    pub fn forget_object(&mut self, object: ObjectId) {
        self.slots.retain(|(o, _), _| *o != object);
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// `getContext` (§4.3): returns a shared, validated chain for `(object,
/// name)`, rebuilding and (if cacheable) restashing it if stale or absent.
pub fn get_context<L: Lang>(
    foundation: &mut Foundation<L>,
    cache: &mut MethodCache<L>,
    object: ObjectId,
    name: Symbol,
    request: DispatchRequest,
) -> Option<Rc<CallContext<L>>> {
    let filter_handling_active = foundation
        .objects()
        .get(object)
        .map(|o| o.flags.filter_handling)
        .unwrap_or(false);

    // Recursive re-entry while already inside a filter step never touches
    // the cache: it must not see (or pollute) the outer dispatch's cache
    // entry for the same name.
    if filter_handling_active {
        return build_method_context(foundation, object, name, request).map(Rc::new);
    }

    if let Some(cached) = cache.slots.get(&(object, name)) {
        let current_global = foundation.epoch() as i64;
        let current_local = foundation
            .objects()
            .get(object)
            .map(|o| o.epoch)
            .unwrap_or(u64::MAX);
        let same_request = cached.flags.public_method == request.public_only
            && cached.flags.private_method == request.allow_private;
        if cached.global_epoch != UNCACHEABLE
            && cached.global_epoch == current_global
            && cached.local_epoch == current_local
            && same_request
        {
            return Some(Rc::clone(cached));
        }
    }

    let built = build_method_context(foundation, object, name, request)?;
    let context = Rc::new(built);
    if context.global_epoch != UNCACHEABLE {
        cache.slots.insert((object, name), Rc::clone(&context));
    } else {
        cache.slots.remove(&(object, name));
    }
    Some(context)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Method, MethodBody, MethodImpl, Visibility};

    #[derive(Debug)]
    struct TestLang;
    impl Lang for TestLang {
        type Args = ();
        type Outcome = ();
    }

    #[derive(Debug)]
    struct Noop;
    impl MethodImpl<TestLang> for Noop {
        fn call(
            &self,
            _info: crate::chain::InvocationInfo<'_, TestLang>,
            _args: (),
            _next: &mut dyn FnMut(()) -> crate::error::Result<()>,
        ) -> crate::error::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn cache_hit_returns_same_allocation_until_epoch_changes() {
        let mut f = Foundation::<TestLang>::new();
        let a = f.new_class();
        f.classes.get_mut(a).unwrap().superclasses.push(f.root_class);
        let m = f.intern("m");
        f.classes.get_mut(a).unwrap().class_methods.insert(
            m,
            Method {
                name: m,
                body: MethodBody::Implemented(Rc::new(Noop)),
                visibility: Visibility::Public,
                declaring_class: Some(a),
            },
        );
        let obj = f.new_object(a);
        let mut cache = MethodCache::new();

        let first = get_context(&mut f, &mut cache, obj, m, DispatchRequest::default()).unwrap();
        let second = get_context(&mut f, &mut cache, obj, m, DispatchRequest::default()).unwrap();
        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);

        f.bump_epoch();
        let third = get_context(&mut f, &mut cache, obj, m, DispatchRequest::default()).unwrap();
        assert!(!Rc::ptr_eq(&first, &third));
    }

    #[test]
    fn filter_handling_bypasses_the_cache_entirely() {
        let mut f = Foundation::<TestLang>::new();
        let a = f.new_class();
        f.classes.get_mut(a).unwrap().superclasses.push(f.root_class);
        let m = f.intern("m");
        f.classes.get_mut(a).unwrap().class_methods.insert(
            m,
            Method {
                name: m,
                body: MethodBody::Implemented(Rc::new(Noop)),
                visibility: Visibility::Public,
                declaring_class: Some(a),
            },
        );
        let obj = f.new_object(a);
        f.objects.get_mut(obj).unwrap().flags.filter_handling = true;
        let mut cache = MethodCache::new();

        let first = get_context(&mut f, &mut cache, obj, m, DispatchRequest::default()).unwrap();
        let second = get_context(&mut f, &mut cache, obj, m, DispatchRequest::default()).unwrap();
        assert!(!Rc::ptr_eq(&first, &second));
        assert!(cache.is_empty());
    }

    /// A chain built for one `DispatchRequest` (e.g. `public_only`) must
    /// never be handed back to a later call with a different request on the
    /// same `(object, name)`: the visibility gate baked into the cached
    /// chain depends on the flags it was built under.
    #[test]
    fn cache_key_distinguishes_by_request_flags() {
        let mut f = Foundation::<TestLang>::new();
        let a = f.new_class();
        f.classes.get_mut(a).unwrap().superclasses.push(f.root_class);
        let m = f.intern("m");
        f.classes.get_mut(a).unwrap().class_methods.insert(
            m,
            Method {
                name: m,
                body: MethodBody::Implemented(Rc::new(Noop)),
                visibility: Visibility::Protected,
                declaring_class: Some(a),
            },
        );
        let unknown = f.unknown;
        f.classes.get_mut(a).unwrap().class_methods.insert(
            unknown,
            Method {
                name: unknown,
                body: MethodBody::Implemented(Rc::new(Noop)),
                visibility: Visibility::Public,
                declaring_class: Some(a),
            },
        );
        let obj = f.new_object(a);
        let mut cache = MethodCache::new();

        let permissive = DispatchRequest { public_only: false, allow_private: false };
        let restricted = DispatchRequest { public_only: true, allow_private: false };

        let first = get_context(&mut f, &mut cache, obj, m, permissive).unwrap();
        assert!(!first.flags.unknown_method);

        let second = get_context(&mut f, &mut cache, obj, m, restricted).unwrap();
        assert!(
            second.flags.unknown_method,
            "public_only dispatch must not reuse the protected-method chain cached under the permissive request"
        );

        let third = get_context(&mut f, &mut cache, obj, m, permissive).unwrap();
        assert!(!third.flags.unknown_method);
    }

    #[test]
    fn forget_object_drops_only_that_objects_slots() {
        let mut f = Foundation::<TestLang>::new();
        let a = f.new_class();
        f.classes.get_mut(a).unwrap().superclasses.push(f.root_class);
        let m = f.intern("m");
        f.classes.get_mut(a).unwrap().class_methods.insert(
            m,
            Method {
                name: m,
                body: MethodBody::Implemented(Rc::new(Noop)),
                visibility: Visibility::Public,
                declaring_class: Some(a),
            },
        );
        let obj1 = f.new_object(a);
        let obj2 = f.new_object(a);
        let mut cache = MethodCache::new();
        get_context(&mut f, &mut cache, obj1, m, DispatchRequest::default()).unwrap();
        get_context(&mut f, &mut cache, obj2, m, DispatchRequest::default()).unwrap();
        assert_eq!(cache.len(), 2);

        cache.forget_object(obj1);
        assert_eq!(cache.len(), 1);
    }
}
