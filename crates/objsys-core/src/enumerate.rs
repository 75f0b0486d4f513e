//! Sorted, deduplicated method-name enumeration (§4.6).

use indexmap::IndexMap;
use rustc_hash::FxHashSet;

use crate::foundation::Foundation;
use crate::graph::{ClassId, Lang, ObjectId};
use crate::symbol::Symbol;

#[derive(Debug, Clone, Copy, Default)]
pub struct EnumerateRequest {
    pub public_only: bool,
    pub allow_private: bool,
}

#[derive(Default, Clone, Copy)]
struct Entry {
    in_list: bool,
    has_implementation: bool,
}

/// `getSortedMethodList` (§4.6): every method name visible on `object` under
/// `request`, sorted by the same byte-lexicographic-including-terminator
/// order as the original (which, for names without an embedded NUL byte,
/// coincides with ordinary string ordering: a shorter name that is a prefix
/// of a longer one still sorts first).
pub fn sorted_method_names<L: Lang>(
    foundation: &Foundation<L>,
    object: ObjectId,
    request: EnumerateRequest,
) -> Vec<String> {
    let Some(obj) = foundation.objects().get(object) else {
        return Vec::new();
    };

    let mut names: IndexMap<Symbol, Entry> = IndexMap::new();

    if let Some(methods) = &obj.methods {
        for (name, method) in methods {
            let public = method.visibility.is_public();
            let entry = names.entry(*name).or_default();
            if !request.public_only || public {
                entry.in_list = true;
            }
            if !method.is_placeholder() {
                entry.has_implementation = true;
            }
        }
    }

    let self_cls = obj.self_cls;
    let mut visited = FxHashSet::default();
    collect_class_methods(foundation, self_cls, self_cls, request, &mut names, &mut visited);
    for mixin in &obj.mixins {
        collect_class_methods(foundation, *mixin, self_cls, request, &mut names, &mut visited);
    }

    let mut visible: Vec<String> = names
        .into_iter()
        .filter(|(_, entry)| entry.in_list && entry.has_implementation)
        .filter_map(|(sym, _)| foundation.symbols().resolve(sym).cloned())
        .collect();
    visible.sort();
    visible.dedup();
    visible
}

fn collect_class_methods<L: Lang>(
    foundation: &Foundation<L>,
    class: ClassId,
    self_cls: ClassId,
    request: EnumerateRequest,
    names: &mut IndexMap<Symbol, Entry>,
    visited: &mut FxHashSet<ClassId>,
) {
    if !visited.insert(class) {
        return;
    }
    let Some(data) = foundation.classes().get(class) else {
        return;
    };

    for (name, method) in &data.class_methods {
        if method.visibility.is_private() && !(class == self_cls && request.allow_private) {
            continue;
        }
        let public = method.visibility.is_public();
        let entry = names.entry(*name).or_default();
        if !request.public_only || public {
            entry.in_list = true;
        }
        if !method.is_placeholder() {
            entry.has_implementation = true;
        }
    }

    for mixin in &data.mixins {
        collect_class_methods(foundation, *mixin, self_cls, request, names, visited);
    }
    for superclass in &data.superclasses {
        collect_class_methods(foundation, *superclass, self_cls, request, names, visited);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Method, MethodBody, MethodImpl, Visibility};
    use std::rc::Rc;

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

    fn define(f: &mut Foundation<TestLang>, class: ClassId, name: &str, visibility: Visibility) {
        let sym = f.intern(name);
        f.classes.get_mut(class).unwrap().class_methods.insert(
            sym,
            Method {
                name: sym,
                body: MethodBody::Implemented(Rc::new(Noop)),
                visibility,
                declaring_class: Some(class),
            },
        );
    }

    #[test]
    fn names_are_sorted_with_shorter_prefix_first() {
        let mut f = Foundation::<TestLang>::new();
        let a = f.new_class();
        f.classes.get_mut(a).unwrap().superclasses.push(f.root_class);
        define(&mut f, a, "ab", Visibility::Public);
        define(&mut f, a, "a", Visibility::Public);
        let obj = f.new_object(a);

        let names = sorted_method_names(&f, obj, EnumerateRequest::default());
        assert_eq!(names, vec!["a".to_string(), "ab".to_string()]);
    }

    #[test]
    fn private_methods_hidden_from_subclass_instances() {
        let mut f = Foundation::<TestLang>::new();
        let a = f.new_class();
        f.classes.get_mut(a).unwrap().superclasses.push(f.root_class);
        let b = f.new_class();
        f.classes.get_mut(b).unwrap().superclasses.push(a);
        define(&mut f, a, "p", Visibility::Private);
        let obj = f.new_object(b);

        let names = sorted_method_names(&f, obj, EnumerateRequest::default());
        assert!(names.is_empty());
    }

    #[test]
    fn private_methods_visible_on_their_own_class_with_allow_private() {
        let mut f = Foundation::<TestLang>::new();
        let a = f.new_class();
        f.classes.get_mut(a).unwrap().superclasses.push(f.root_class);
        define(&mut f, a, "p", Visibility::Private);
        let obj = f.new_object(a);

        let hidden = sorted_method_names(&f, obj, EnumerateRequest::default());
        assert!(hidden.is_empty());

        let request = EnumerateRequest {
            public_only: false,
            allow_private: true,
        };
        let names = sorted_method_names(&f, obj, request);
        assert_eq!(names, vec!["p".to_string()]);
    }

    /// A name exported (visibility-only placeholder) on a subclass but with
    /// its actual implementation still living on an ancestor must remain
    /// visible: the placeholder only withholds the name when no real
    /// implementation backs it up anywhere in the chain.
    #[test]
    fn placeholder_name_stays_visible_when_a_real_implementation_exists_elsewhere() {
        let mut f = Foundation::<TestLang>::new();
        let a = f.new_class();
        f.classes.get_mut(a).unwrap().superclasses.push(f.root_class);
        define(&mut f, a, "m", Visibility::Public);

        let b = f.new_class();
        f.classes.get_mut(b).unwrap().superclasses.push(a);
        let m = f.intern("m");
        f.classes.get_mut(b).unwrap().class_methods.insert(
            m,
            Method {
                name: m,
                body: MethodBody::Placeholder,
                visibility: Visibility::Public,
                declaring_class: Some(b),
            },
        );

        let obj = f.new_object(b);
        let names = sorted_method_names(&f, obj, EnumerateRequest::default());
        assert_eq!(names, vec!["m".to_string()]);
    }

    /// A name with only a placeholder anywhere in the chain (no backing
    /// implementation at all) never appears in the enumeration.
    #[test]
    fn placeholder_only_name_never_appears() {
        let mut f = Foundation::<TestLang>::new();
        let a = f.new_class();
        f.classes.get_mut(a).unwrap().superclasses.push(f.root_class);
        let ghost = f.intern("ghost");
        f.classes.get_mut(a).unwrap().class_methods.insert(
            ghost,
            Method {
                name: ghost,
                body: MethodBody::Placeholder,
                visibility: Visibility::Public,
                declaring_class: Some(a),
            },
        );
        let obj = f.new_object(a);

        let names = sorted_method_names(&f, obj, EnumerateRequest::default());
        assert!(names.is_empty());
    }

    /// A method reachable only through a mixin attached directly to the
    /// object (not its class) is still enumerated.
    #[test]
    fn mixin_methods_are_enumerated() {
        let mut f = Foundation::<TestLang>::new();
        let a = f.new_class();
        f.classes.get_mut(a).unwrap().superclasses.push(f.root_class);
        let mixin = f.new_class();
        f.classes.get_mut(mixin).unwrap().superclasses.push(f.root_class);
        define(&mut f, mixin, "mixed-in", Visibility::Public);

        let obj = f.new_object(a);
        f.objects.get_mut(obj).unwrap().mixins.push(mixin);

        let names = sorted_method_names(&f, obj, EnumerateRequest::default());
        assert_eq!(names, vec!["mixed-in".to_string()]);
    }
}
