//! Method resolution and call-chain engine for a dynamic, class-based object system.
//!
//! This crate re-exports [`objsys_core`] (the class graph, linearization, chain
//! builder, call-chain cache, enumerator, and definition mutators) and, with the
//! `invoke` feature (on by default), [`objsys_invoke`] (the `next`-style invoker).
//! The host interpreter that embeds this engine owns method bodies, script
//! parsing, and the object namespace; none of that lives here.

pub use objsys_core::*;

#[cfg(feature = "invoke")]
pub use objsys_invoke as invoke;
