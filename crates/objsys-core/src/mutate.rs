//! Definition Mutator Contract (§4.8), with the epoch-bump policy of §4.1
//! and the ordering/placeholder details supplemented from the original in
//! §4.9.

use crate::error::{DispatchError, Result};
use crate::graph::{ClassId, ForwardMethod, Lang, Method, MethodBody, ObjectId, PrefixableArgs, SpecialMethod, Visibility};
use crate::reachability::{is_reachable_via_mixins, is_reachable_via_superclasses};
use crate::symbol::Symbol;
use crate::Foundation;

/// §4.1's bump-policy table for a class mutation: a class with no
/// subclasses, instances, or mixinSubs only needs its own representative
/// object's epoch bumped, and only then if that object itself has mixins
/// (its own per-object cache is keyed off its own epoch independent of the
/// class's structural epoch); every other class mutation bumps the global
/// epoch.
fn bump_for_class<L: Lang>(foundation: &mut Foundation<L>, class: ClassId) {
    let Some(data) = foundation.classes().get(class) else {
        return;
    };
    let this = data.this;
    let leaf = data.has_no_dependents();
    if leaf {
        let this_has_mixins = foundation
            .objects()
            .get(this)
            .map(|o| !o.mixins.is_empty())
            .unwrap_or(false);
        if this_has_mixins {
            if let Some(o) = foundation.objects.get_mut(this) {
                o.epoch += 1;
            }
        }
    } else {
        foundation.bump_epoch();
    }
}

fn bump_for_object<L: Lang>(foundation: &mut Foundation<L>, object: ObjectId) {
    if let Some(o) = foundation.objects.get_mut(object) {
        o.epoch += 1;
    }
}

pub fn set_object_filters<L: Lang>(foundation: &mut Foundation<L>, object: ObjectId, names: Vec<Symbol>) {
    if let Some(o) = foundation.objects.get_mut(object) {
        o.filters = names;
    }
    bump_for_object(foundation, object);
}

pub fn set_class_filters<L: Lang>(foundation: &mut Foundation<L>, class: ClassId, names: Vec<Symbol>) {
    if let Some(c) = foundation.classes.get_mut(class) {
        c.filters = names;
    }
    bump_for_class(foundation, class);
}

pub fn set_object_mixins<L: Lang>(
    foundation: &mut Foundation<L>,
    object: ObjectId,
    classes: Vec<ClassId>,
) {
    let old = foundation
        .objects()
        .get(object)
        .map(|o| o.mixins.clone())
        .unwrap_or_default();
    for class in &old {
        remove_instance(foundation, *class, object);
    }
    for class in &classes {
        add_instance(foundation, *class, object);
    }
    if let Some(o) = foundation.objects.get_mut(object) {
        o.mixins = classes;
    }
    bump_for_object(foundation, object);
}

pub fn set_class_mixins<L: Lang>(
    foundation: &mut Foundation<L>,
    class: ClassId,
    mixins: Vec<ClassId>,
) -> Result<()> {
    for mixin in &mixins {
        if *mixin == class || is_reachable_via_mixins(foundation, *mixin, class) {
            return Err(DispatchError::CircularMixin);
        }
    }

    let old = foundation
        .classes()
        .get(class)
        .map(|c| c.mixins.clone())
        .unwrap_or_default();
    for mixin in &old {
        remove_mixin_sub(foundation, *mixin, class);
    }
    for mixin in &mixins {
        add_mixin_sub(foundation, *mixin, class);
    }
    if let Some(c) = foundation.classes.get_mut(class) {
        c.mixins = mixins;
    }
    bump_for_class(foundation, class);
    Ok(())
}

fn add_instance<L: Lang>(foundation: &mut Foundation<L>, class: ClassId, object: ObjectId) {
    if let Some(c) = foundation.classes.get_mut(class) {
        if !c.instances.contains(&object) {
            c.instances.push(object);
        }
    }
}

fn remove_instance<L: Lang>(foundation: &mut Foundation<L>, class: ClassId, object: ObjectId) {
    if let Some(c) = foundation.classes.get_mut(class) {
        c.instances.retain(|o| *o != object);
    }
}

fn add_mixin_sub<L: Lang>(foundation: &mut Foundation<L>, mixin: ClassId, sub: ClassId) {
    if let Some(c) = foundation.classes.get_mut(mixin) {
        if !c.mixin_subs.contains(&sub) {
            c.mixin_subs.push(sub);
        }
    }
}

fn remove_mixin_sub<L: Lang>(foundation: &mut Foundation<L>, mixin: ClassId, sub: ClassId) {
    if let Some(c) = foundation.classes.get_mut(mixin) {
        c.mixin_subs.retain(|s| *s != sub);
    }
}

/// §4.8: rejects a duplicate entry in the new list and any superclass that
/// would close a cycle, before touching any back-edge.
pub fn set_superclasses<L: Lang>(
    foundation: &mut Foundation<L>,
    class: ClassId,
    superclasses: Vec<ClassId>,
) -> Result<()> {
    if class == foundation.root_class {
        return Err(DispatchError::RootModification);
    }
    for (i, sup) in superclasses.iter().enumerate() {
        if superclasses[..i].contains(sup) {
            return Err(DispatchError::DuplicateSuperclass);
        }
        if *sup == class || is_reachable_via_superclasses(foundation, *sup, class) {
            return Err(DispatchError::CircularSuperclass);
        }
    }

    let old = foundation
        .classes()
        .get(class)
        .map(|c| c.superclasses.clone())
        .unwrap_or_default();
    for sup in &old {
        if let Some(c) = foundation.classes.get_mut(*sup) {
            c.subclasses.retain(|s| *s != class);
        }
    }
    for sup in &superclasses {
        if let Some(c) = foundation.classes.get_mut(*sup) {
            if !c.subclasses.contains(&class) {
                c.subclasses.push(class);
            }
        }
    }
    if let Some(c) = foundation.classes.get_mut(class) {
        c.superclasses = superclasses;
    }
    bump_for_class(foundation, class);
    Ok(())
}

/// Is `class` itself a subclass of (or equal to) the class-of-classes? Only
/// instances of such a class can serve as the `selfCls` of an object that is
/// itself a class, since a class must remain an instance of a class that
/// itself descends from `oo::class` (§4.8's "class-ness is not convertible").
fn is_metaclass<L: Lang>(foundation: &Foundation<L>, class: ClassId) -> bool {
    class == foundation.class_of_classes
        || is_reachable_via_superclasses(foundation, class, foundation.class_of_classes)
}

/// §4.8/§4.9: rejects reclassing the root object or the class-of-classes,
/// and rejects a class-ness mismatch (an object cannot become a class, or
/// vice versa, by this route). Bumps the epoch scope of the *new* class
/// when the object being reclassed is itself a class (matching the
/// original's asymmetric choice, §4.9), else just the object's own epoch.
pub fn change_object_class<L: Lang>(
    foundation: &mut Foundation<L>,
    object: ObjectId,
    new_class: ClassId,
) -> Result<()> {
    if object == foundation.root_object || object == foundation.classes()[foundation.class_of_classes].this {
        return Err(DispatchError::RootModification);
    }

    let object_is_class = foundation.objects()[object].class_ptr.is_some();
    if object_is_class != is_metaclass(foundation, new_class) {
        return Err(DispatchError::ClassnessImmutable);
    }
    let old_class = foundation.objects()[object].self_cls;
    remove_instance(foundation, old_class, object);
    add_instance(foundation, new_class, object);
    if let Some(o) = foundation.objects.get_mut(object) {
        o.self_cls = new_class;
    }

    if object_is_class {
        bump_for_class(foundation, new_class);
    } else {
        bump_for_object(foundation, object);
    }
    Ok(())
}

/// Resolves an object handle to the class it represents, for callers that
/// only have an `ObjectId` in hand (e.g. from a generic "configure this
/// thing" entry point) but need a `ClassId` to call `set_superclasses` or
/// `set_class_mixins`.
pub fn class_of_object<L: Lang>(foundation: &Foundation<L>, object: ObjectId) -> Result<ClassId> {
    foundation
        .objects()
        .get(object)
        .and_then(|o| o.class_ptr)
        .ok_or(DispatchError::NotAClass)
}

/// §4.8: installs or overwrites an object's instance method.
pub fn install_object_method<L: Lang>(
    foundation: &mut Foundation<L>,
    object: ObjectId,
    name: Symbol,
    visibility: Visibility,
    body: Box<dyn crate::graph::MethodImpl<L>>,
) {
    if let Some(o) = foundation.objects.get_mut(object) {
        let methods = o.methods.get_or_insert_with(Default::default);
        methods.insert(
            name,
            Method {
                name,
                body: MethodBody::Implemented(std::rc::Rc::from(body)),
                visibility,
                declaring_class: None,
            },
        );
    }
    bump_for_object(foundation, object);
}

/// §4.8: installs or overwrites a class method.
pub fn install_class_method<L: Lang>(
    foundation: &mut Foundation<L>,
    class: ClassId,
    name: Symbol,
    visibility: Visibility,
    body: Box<dyn crate::graph::MethodImpl<L>>,
) {
    if let Some(c) = foundation.classes.get_mut(class) {
        c.class_methods.insert(
            name,
            Method {
                name,
                body: MethodBody::Implemented(std::rc::Rc::from(body)),
                visibility,
                declaring_class: Some(class),
            },
        );
    }
    bump_for_class(foundation, class);
}

pub fn delete_object_method<L: Lang>(foundation: &mut Foundation<L>, object: ObjectId, name: Symbol) -> Result<()> {
    let existed = foundation
        .objects
        .get_mut(object)
        .and_then(|o| o.methods.as_mut())
        .map(|m| m.shift_remove(&name).is_some())
        .unwrap_or(false);
    if !existed {
        return Err(DispatchError::NoSuchMethod(name));
    }
    bump_for_object(foundation, object);
    Ok(())
}

pub fn delete_class_method<L: Lang>(foundation: &mut Foundation<L>, class: ClassId, name: Symbol) -> Result<()> {
    let existed = foundation
        .classes
        .get_mut(class)
        .map(|c| c.class_methods.shift_remove(&name).is_some())
        .unwrap_or(false);
    if !existed {
        return Err(DispatchError::NoSuchMethod(name));
    }
    bump_for_class(foundation, class);
    Ok(())
}

/// §4.8/§4.9: validates the source exists and the destination is free (or
/// is the same name) before mutating either slot.
pub fn rename_class_method<L: Lang>(
    foundation: &mut Foundation<L>,
    class: ClassId,
    from: Symbol,
    to: Symbol,
) -> Result<()> {
    if from == to {
        return Err(DispatchError::RenameToSelf(from));
    }
    let Some(data) = foundation.classes.get_mut(class) else {
        return Err(DispatchError::NoSuchMethod(from));
    };
    if !data.class_methods.contains_key(&from) {
        return Err(DispatchError::NoSuchMethod(from));
    }
    if data.class_methods.contains_key(&to) {
        return Err(DispatchError::RenameCollision(to));
    }
    let (_, mut method) = data.class_methods.shift_remove_entry(&from).unwrap();
    method.name = to;
    data.class_methods.insert(to, method);
    bump_for_class(foundation, class);
    Ok(())
}

pub fn rename_object_method<L: Lang>(
    foundation: &mut Foundation<L>,
    object: ObjectId,
    from: Symbol,
    to: Symbol,
) -> Result<()> {
    if from == to {
        return Err(DispatchError::RenameToSelf(from));
    }
    let Some(obj) = foundation.objects.get_mut(object) else {
        return Err(DispatchError::NoSuchMethod(from));
    };
    let Some(methods) = obj.methods.as_mut() else {
        return Err(DispatchError::NoSuchMethod(from));
    };
    if !methods.contains_key(&from) {
        return Err(DispatchError::NoSuchMethod(from));
    }
    if methods.contains_key(&to) {
        return Err(DispatchError::RenameCollision(to));
    }
    let (_, mut method) = methods.shift_remove_entry(&from).unwrap();
    method.name = to;
    methods.insert(to, method);
    bump_for_object(foundation, object);
    Ok(())
}

/// §4.8/§4.9: sets or clears the `PUBLIC_METHOD` bit; if no method record
/// exists locally yet, installs a visibility-only placeholder purely to
/// carry the flag.
pub fn export_class_method<L: Lang>(foundation: &mut Foundation<L>, class: ClassId, name: Symbol, public: bool) {
    if let Some(c) = foundation.classes.get_mut(class) {
        match c.class_methods.get_mut(&name) {
            Some(method) => {
                method.visibility = if public { Visibility::Public } else { Visibility::Protected };
            }
            None => {
                c.class_methods.insert(
                    name,
                    Method {
                        name,
                        body: MethodBody::Placeholder,
                        visibility: if public { Visibility::Public } else { Visibility::Protected },
                        declaring_class: Some(class),
                    },
                );
            }
        }
    }
    bump_for_class(foundation, class);
}

pub fn export_object_method<L: Lang>(foundation: &mut Foundation<L>, object: ObjectId, name: Symbol, public: bool) {
    if let Some(o) = foundation.objects.get_mut(object) {
        let methods = o.methods.get_or_insert_with(Default::default);
        match methods.get_mut(&name) {
            Some(method) => {
                method.visibility = if public { Visibility::Public } else { Visibility::Protected };
            }
            None => {
                methods.insert(
                    name,
                    Method {
                        name,
                        body: MethodBody::Placeholder,
                        visibility: if public { Visibility::Public } else { Visibility::Protected },
                        declaring_class: None,
                    },
                );
            }
        }
    }
    bump_for_object(foundation, object);
}

/// `newForwardMethod` (§6) on a class: installs a method whose body
/// prepends `prefix` to its arguments and hands them to `dispatch`, rather
/// than running a script body.
pub fn new_forward_class_method<L: Lang>(
    foundation: &mut Foundation<L>,
    class: ClassId,
    name: Symbol,
    visibility: Visibility,
    prefix: Vec<<L::Args as PrefixableArgs>::Value>,
    dispatch: Box<dyn Fn(L::Args) -> crate::error::Result<L::Outcome>>,
) where
    L::Args: PrefixableArgs,
{
    install_class_method(
        foundation,
        class,
        name,
        visibility,
        Box::new(ForwardMethod::new(prefix, dispatch)),
    );
}

/// `newForwardMethod` (§6) on an object instance.
pub fn new_forward_object_method<L: Lang>(
    foundation: &mut Foundation<L>,
    object: ObjectId,
    name: Symbol,
    visibility: Visibility,
    prefix: Vec<<L::Args as PrefixableArgs>::Value>,
    dispatch: Box<dyn Fn(L::Args) -> crate::error::Result<L::Outcome>>,
) where
    L::Args: PrefixableArgs,
{
    install_object_method(
        foundation,
        object,
        name,
        visibility,
        Box::new(ForwardMethod::new(prefix, dispatch)),
    );
}

/// A constructor/destructor is looked up positionally, never by name; it
/// still needs *some* `Symbol` to satisfy `Method`, so it borrows the
/// interned `unknown` name as an inert placeholder the invoker never reads.
pub fn set_constructor<L: Lang>(foundation: &mut Foundation<L>, class: ClassId, body: Option<Box<dyn crate::graph::MethodImpl<L>>>) {
    let placeholder_name = foundation.unknown;
    if let Some(c) = foundation.classes.get_mut(class) {
        c.constructor = body.map(|body| {
            SpecialMethod(Method {
                name: placeholder_name,
                body: MethodBody::Implemented(std::rc::Rc::from(body)),
                visibility: Visibility::Public,
                declaring_class: Some(class),
            })
        });
    }
    bump_for_class(foundation, class);
}

pub fn set_destructor<L: Lang>(foundation: &mut Foundation<L>, class: ClassId, body: Option<Box<dyn crate::graph::MethodImpl<L>>>) {
    let placeholder_name = foundation.unknown;
    if let Some(c) = foundation.classes.get_mut(class) {
        c.destructor = body.map(|body| {
            SpecialMethod(Method {
                name: placeholder_name,
                body: MethodBody::Implemented(std::rc::Rc::from(body)),
                visibility: Visibility::Public,
                declaring_class: Some(class),
            })
        });
    }
    bump_for_class(foundation, class);
}
