//! Drives a [`CallContext`] one step at a time, exposing a `next`-style
//! cooperative continuation to method bodies (§4.7).
//!
//! This crate is deliberately small: `objsys-core` already pins every chain
//! entry's method implementation behind an `Rc` the moment the chain is
//! built (§4.9's "chain entries are pinned for the entire outer invocation"
//! falls out of that for free — see `ChainEntry::implementation` in
//! `objsys-core::chain`). The only state this crate owns is the recursion
//! that walks the chain and the scoped save/restore of the object's
//! `FILTER_HANDLING` flag around each step.

use std::rc::Rc;

use objsys_core::{CallContext, DispatchError, Foundation, InvocationInfo, Lang, MethodCache, ObjectId, Result, Symbol};

/// `getContext` + `invokeContext` fused into one call: the shape a host's
/// command dispatcher actually wants (look up or build a chain for `name`
/// on `object`, then run it). Returns [`DispatchError::NoSuchMethod`] if no
/// chain could be built at all (§7) — note `objsys_core::get_context`
/// already falls back to the interned `unknown` method before returning
/// `None`, so this only fires when neither `name` nor `unknown` resolves.
pub fn dispatch<L: Lang>(
    foundation: &mut Foundation<L>,
    cache: &mut MethodCache<L>,
    object: ObjectId,
    name: Symbol,
    request: objsys_core::DispatchRequest,
    args: L::Args,
) -> Result<L::Outcome> {
    let context = objsys_core::get_context(foundation, cache, object, name, request).ok_or(DispatchError::NoSuchMethod(name))?;
    invoke_context(foundation, &context, args)
}

/// `invokeContext` (§6): runs a built chain from its first step. Builds the
/// outermost [`ChainPin`], so the chain's shared `Rc` (and, transitively,
/// every step's method implementation) outlives the whole invocation even
/// if a step deletes its own method or mutates the class graph mid-call
/// (§8 scenario S6).
pub fn invoke_context<L: Lang>(
    foundation: &mut Foundation<L>,
    context: &Rc<CallContext<L>>,
    args: L::Args,
) -> Result<L::Outcome> {
    let _pin = ChainPin::new(context);
    run_step(foundation, context, 0, args)
}

/// Builds a constructor/destructor chain and runs it immediately; these are
/// never cacheable by name (§4.3 fast path 1), so there is no separate
/// `getContext` step worth exposing to the host.
pub fn invoke_special<L: Lang>(
    foundation: &mut Foundation<L>,
    object: ObjectId,
    destructor: bool,
    args: L::Args,
) -> Result<L::Outcome> {
    let context = objsys_core::build_special_context(foundation, object, destructor)
        .ok_or(DispatchError::NoSuchMethod(foundation.unknown))?;
    invoke_context(foundation, &Rc::new(context), args)
}

/// RAII guard built in [`invoke_context`]'s outermost frame (§5.1, §4.7
/// "only the outermost invocation owns pinning"). Holding a clone of the
/// `Rc<CallContext>` keeps every chain entry's `Rc<dyn MethodImpl>` alive
/// for the duration of the call on every exit path: a method body
/// propagating an error with `?`, returning early without calling `next`,
/// or deleting its own method record mid-call all still see this guard
/// dropped (and thus pins released) exactly once, when the outer call
/// returns.
struct ChainPin<L: Lang> {
    _context: Rc<CallContext<L>>,
}

impl<L: Lang> ChainPin<L> {
    fn new(context: &Rc<CallContext<L>>) -> Self {
        Self {
            _context: Rc::clone(context),
        }
    }
}

/// Runs `context.chain[step]`, handing it a `next` closure that recurses
/// into `step + 1`. A method body that never calls `next` simply never
/// triggers the recursion; a method body that calls `next` past the last
/// entry gets [`DispatchError::NoNextMethod`] (§4.7).
fn run_step<L: Lang>(
    foundation: &mut Foundation<L>,
    context: &Rc<CallContext<L>>,
    step: usize,
    args: L::Args,
) -> Result<L::Outcome> {
    let Some(entry) = context.chain.get(step) else {
        return Err(DispatchError::NoNextMethod);
    };

    let object = context.object;
    let was_in_filter = foundation
        .objects()
        .get(object)
        .map(|o| o.flags.filter_handling)
        .unwrap_or(false);
    let now_in_filter = entry.is_filter || context.flags.filter_handling;
    set_filter_handling(foundation, object, now_in_filter);

    let implementation = Rc::clone(&entry.implementation);
    let info = InvocationInfo {
        object,
        flags: context.flags,
        skip: context.skip,
        entry,
    };

    let mut next = |next_args: L::Args| -> Result<L::Outcome> { run_step(foundation, context, step + 1, next_args) };

    let result = implementation.call(info, args, &mut next);

    // `foundation` was reborrowed into `next` above; by now that closure has
    // been dropped (its one call completed), so this use is unambiguous.
    set_filter_handling(foundation, object, was_in_filter);

    result
}

fn set_filter_handling<L: Lang>(foundation: &mut Foundation<L>, object: ObjectId, value: bool) {
    if let Some(o) = foundation.objects.get_mut(object) {
        o.flags.filter_handling = value;
    }
}
