use super::data::Arena;
use super::id::{Id, Identifier};

/// Maps old ids to their post-compaction id, produced by [`Arena::gc`].
pub struct IdMap<I: Identifier>(Vec<Option<I>>);

impl<I: Identifier> IdMap<I> {
    pub fn get(&self, old: I) -> Option<I> {
        self.0
            .get(old.into().raw())
            .copied()
            .unwrap_or_else(|| panic!("unexpected Id"))
    }
}

impl<I: Identifier, T> Arena<I, T> {
    /// Drops deleted slots and renumbers the rest, returning the old-to-new map.
    ///
    /// Nothing in this crate calls this on its own: a live chain or a cached
    /// call context embeds ids from before the gc and would silently dangle.
    /// Only the host, between dispatches with no chains outstanding, should
    /// compact.
    pub fn gc(&mut self) -> IdMap<I> {
        let mut map = Vec::with_capacity(self.items.len());
        let mut next = 0usize;
        for item in &self.items {
            if item.deleted() {
                map.push(None);
            } else {
                map.push(Some(I::from(Id(next))));
                next += 1;
            }
        }
        self.items.retain(|item| !item.deleted());
        IdMap(map)
    }
}
