use crate::intern::InternKey;

/// An interned method or filter name. Cheap to copy, compare, and hash; the
/// call-chain cache and every chain-building comparison key off this rather
/// than the underlying string.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Symbol(usize);

impl From<usize> for Symbol {
    fn from(value: usize) -> Self {
        Self(value)
    }
}

impl From<Symbol> for usize {
    fn from(value: Symbol) -> Self {
        value.0
    }
}

impl InternKey for Symbol {}
