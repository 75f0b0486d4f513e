use std::fmt::Debug;
use std::hash::Hash;

/// Raw index into an [`Arena`](super::data::Arena). Never exposed directly;
/// callers go through a newtype produced by [`identifier!`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Id(pub(crate) usize);

impl Id {
    pub fn raw(&self) -> usize {
        self.0
    }
}

/// Marker for a typed arena key. Implemented by the newtypes [`identifier!`] generates.
pub trait Identifier: Sized + Clone + Copy + Hash + Debug + PartialEq + Eq + From<Id> + Into<Id> {}

/// Declares a `Copy` newtype identifier backed by [`Id`], with the `Identifier`
/// impl and the plumbing `From`/`Into` conversions wired up.
macro_rules! identifier {
    ($(#[$meta:meta])* struct $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        pub struct $name($crate::arena::id::Id);

        impl From<$crate::arena::id::Id> for $name {
            fn from(id: $crate::arena::id::Id) -> Self {
                Self(id)
            }
        }

        impl From<$name> for $crate::arena::id::Id {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl $crate::arena::id::Identifier for $name {}
    };
}

pub(crate) use identifier;
