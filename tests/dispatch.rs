//! Integration-level exercise of the public `objsys` facade: build a small
//! class graph purely through the definition mutators, dispatch through the
//! invoker, and check the scenarios from spec §8 end to end rather than
//! unit-by-unit.

use objsys::{
    sorted_method_names, ClassId, DispatchError, DispatchRequest, EnumerateRequest, Foundation, Lang, MethodCache,
    MethodImpl, Visibility,
};

#[derive(Debug)]
struct Script;
impl Lang for Script {
    type Args = Vec<String>;
    type Outcome = String;
}

#[derive(Debug)]
struct Body(&'static str);
impl MethodImpl<Script> for Body {
    fn call(
        &self,
        _info: objsys::InvocationInfo<'_, Script>,
        args: Vec<String>,
        next: &mut dyn FnMut(Vec<String>) -> objsys::Result<String>,
    ) -> objsys::Result<String> {
        match next(args) {
            Ok(rest) if !rest.is_empty() => Ok(format!("{} {}", self.0, rest)),
            Ok(_) => Ok(self.0.to_string()),
            Err(objsys::DispatchError::NoNextMethod) => Ok(self.0.to_string()),
            Err(other) => Err(other),
        }
    }
}

fn define(f: &mut Foundation<Script>, class: ClassId, name: &str, visibility: Visibility, label: &'static str) {
    let sym = f.intern(name);
    objsys::install_class_method(f, class, sym, visibility, Box::new(Body(label)));
}

fn subclass_of(f: &mut Foundation<Script>, parents: &[ClassId]) -> ClassId {
    let class = f.new_class();
    objsys::set_superclasses(f, class, parents.to_vec()).unwrap();
    class
}

/// S2: diamond inheritance dispatches most-derived first, each level
/// reaching its ancestors through `next`.
#[test]
fn diamond_dispatch_end_to_end() {
    let mut f = Foundation::<Script>::new();
    let root = f.root_class;
    let a = subclass_of(&mut f, &[root]);
    let b = subclass_of(&mut f, &[a]);
    let c = subclass_of(&mut f, &[a]);
    let d = subclass_of(&mut f, &[b, c]);

    define(&mut f, a, "m", Visibility::Public, "A");
    define(&mut f, b, "m", Visibility::Public, "B");
    define(&mut f, c, "m", Visibility::Public, "C");
    define(&mut f, d, "m", Visibility::Public, "D");

    let obj = f.new_object(d);
    let m = f.intern("m");
    let mut cache = MethodCache::new();
    let out = objsys::invoke::dispatch(&mut f, &mut cache, obj, m, DispatchRequest::default(), vec![]).unwrap();
    assert_eq!(out, "D B C A");
}

/// S4: a private method is invisible to a public dispatch reaching it
/// through a subclass instance; the `unknown` fallback picks it up instead.
#[test]
fn private_method_is_invisible_to_public_dispatch() {
    let mut f = Foundation::<Script>::new();
    let root = f.root_class;
    let base = subclass_of(&mut f, &[root]);
    let derived = subclass_of(&mut f, &[base]);

    define(&mut f, base, "p", Visibility::Private, "private-impl");
    let unknown = f.unknown;
    objsys::install_class_method(&mut f, base, unknown, Visibility::Public, Box::new(Body("unknown-impl")));

    let obj = f.new_object(derived);
    let p = f.intern("p");
    let mut cache = MethodCache::new();
    let request = DispatchRequest {
        public_only: true,
        allow_private: false,
    };
    let out = objsys::invoke::dispatch(&mut f, &mut cache, obj, p, request, vec![]).unwrap();
    assert_eq!(out, "unknown-impl");
}

/// S6: redefining a class method bumps the epoch that guards the cached
/// chain; the next dispatch for the same object observes the new body.
#[test]
fn redefining_a_method_invalidates_the_cache() {
    let mut f = Foundation::<Script>::new();
    let root = f.root_class;
    let c = subclass_of(&mut f, &[root]);
    define(&mut f, c, "m", Visibility::Public, "first");

    let obj = f.new_object(c);
    let m = f.intern("m");
    let mut cache = MethodCache::new();
    let first = objsys::invoke::dispatch(&mut f, &mut cache, obj, m, DispatchRequest::default(), vec![]).unwrap();
    assert_eq!(first, "first");

    define(&mut f, c, "m", Visibility::Public, "second");
    let second = objsys::invoke::dispatch(&mut f, &mut cache, obj, m, DispatchRequest::default(), vec![]).unwrap();
    assert_eq!(second, "second");
}

/// A dispatch against a name with no implementation anywhere (and no
/// `unknown` handler declared) surfaces `NoSuchMethod`.
#[test]
fn truly_missing_method_is_an_error() {
    let mut f = Foundation::<Script>::new();
    let root = f.root_class;
    let c = subclass_of(&mut f, &[root]);
    let obj = f.new_object(c);
    let mut cache = MethodCache::new();
    let missing = f.intern("nope");
    let err =
        objsys::invoke::dispatch(&mut f, &mut cache, obj, missing, DispatchRequest::default(), vec![]).unwrap_err();
    assert!(matches!(err, DispatchError::NoSuchMethod(_)));
}

/// §4.6: the sorted enumerator never reports a name whose only record in
/// the graph is a visibility-only placeholder installed by `export`.
#[test]
fn enumerator_hides_unimplemented_placeholders() {
    let mut f = Foundation::<Script>::new();
    let root = f.root_class;
    let c = subclass_of(&mut f, &[root]);
    define(&mut f, c, "m", Visibility::Public, "m");
    let ghost = f.intern("ghost");
    objsys::export_class_method(&mut f, c, ghost, true);

    let obj = f.new_object(c);
    let names = sorted_method_names(&f, obj, EnumerateRequest::default());
    assert_eq!(names, vec!["m".to_string()]);
}
